//! Reading and writing `.mem` memory-initialization files.
//!
//! A `.mem` file holds whitespace-separated hex words, MSB first, in address
//! order. Lines may also contain `@<hex>` address markers and `//` comments.
//! Words are written one per line without leading zeros.

use crate::error::MemError;
use mempatch_common::BitVec;
use mempatch_map::{InitImage, MemoryShape};
use std::path::Path;

/// Parses `.mem` text into an image of `shape`.
///
/// Words the file does not give are zero.
///
/// # Errors
///
/// Returns an error for bad hex, words wider than `shape.bits`, and words
/// past `shape.words`.
pub fn parse_mem(text: &str, shape: MemoryShape) -> Result<InitImage, MemError> {
    let mut image = InitImage::new(shape.words, shape.bits);
    let mut address: u32 = 0;

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let content = line.split("//").next().unwrap_or("");
        for token in content.split_whitespace() {
            if let Some(addr) = token.strip_prefix('@') {
                address = u32::from_str_radix(addr, 16).map_err(|_| MemError::InvalidAddress {
                    line: line_no,
                    text: token.to_string(),
                })?;
                continue;
            }
            if address >= shape.words {
                return Err(MemError::PastEnd {
                    line: line_no,
                    word: address,
                    words: shape.words,
                });
            }
            let word = BitVec::from_hex_str(token, shape.bits).map_err(|source| {
                MemError::InvalidWord {
                    line: line_no,
                    source,
                }
            })?;
            for (b, bit) in word.iter().enumerate() {
                if bit {
                    image.set(address, b as u32, true);
                }
            }
            address += 1;
        }
    }
    Ok(image)
}

/// Reads a `.mem` file into an image of `shape`.
///
/// # Errors
///
/// See [`parse_mem`].
pub fn read_mem(path: &Path, shape: MemoryShape) -> Result<InitImage, MemError> {
    parse_mem(&std::fs::read_to_string(path)?, shape)
}

/// Renders the first `words` words of `image`, one lowercase hex word per line.
pub fn render_mem(image: &InitImage, words: u32) -> String {
    let mut out = String::new();
    for w in 0..words {
        let mut word = BitVec::new(image.bits());
        for b in 0..image.bits() {
            if image.get(w, b) {
                word.set(b, true);
            }
        }
        let hex = word.to_hex_string();
        let trimmed = hex.trim_start_matches('0');
        out.push_str(if trimmed.is_empty() { "0" } else { trimmed });
        out.push('\n');
    }
    out
}

/// Writes the first `words` words of `image` to `path`, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns [`MemError::Io`] if the file cannot be written.
pub fn write_mem(path: &Path, image: &InitImage, words: u32) -> Result<(), MemError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_mem(image, words))?;
    Ok(())
}
