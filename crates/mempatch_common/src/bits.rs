//! Packed two-state bit vectors with LSB-first indexing.
//!
//! Every memory word and feature row in mempatch is a [`BitVec`]. Index 0 is
//! the least significant bit. Text formats (init files, FASM values) print the
//! most significant bit first; the conversion between the two orders lives
//! only in the `from_*_str` / `to_*_string` functions of this module, so the
//! rest of the workspace never reverses a bit string by hand.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of bits packed per storage word.
const BITS_PER_WORD: u32 = 64;

/// A fixed-width vector of bits, index 0 = least significant.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitVec {
    width: u32,
    data: Vec<u64>,
}

/// Errors produced when parsing MSB-first bit text into a [`BitVec`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BitsParseError {
    /// The text was empty.
    #[error("empty bit value")]
    Empty,
    /// A character was not a digit of the expected radix.
    #[error("invalid {radix} digit '{digit}' in '{text}'")]
    InvalidDigit {
        /// The radix name ("binary" or "hex").
        radix: &'static str,
        /// The offending character.
        digit: char,
        /// The full text being parsed.
        text: String,
    },
    /// A set bit falls outside the requested width.
    #[error("value '{text}' does not fit in {width} bits")]
    Overflow {
        /// The full text being parsed.
        text: String,
        /// The requested width.
        width: u32,
    },
}

impl BitVec {
    /// Creates a new all-zero vector of the given width.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            data: vec![0; word_count(width)],
        }
    }

    /// Returns the number of bits in this vector.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Gets the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> bool {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word = (index / BITS_PER_WORD) as usize;
        (self.data[word] >> (index % BITS_PER_WORD)) & 1 != 0
    }

    /// Sets the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: bool) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word = (index / BITS_PER_WORD) as usize;
        let mask = 1u64 << (index % BITS_PER_WORD);
        if value {
            self.data[word] |= mask;
        } else {
            self.data[word] &= !mask;
        }
    }

    /// Creates a vector from the low `width` bits of `value`.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width.min(64) {
            if (value >> i) & 1 != 0 {
                v.set(i, true);
            }
        }
        v
    }

    /// Returns the value as a `u64`, or `None` if wider than 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        Some(self.data.first().copied().unwrap_or(0))
    }

    /// Returns true if no bit is set.
    pub fn is_all_zero(&self) -> bool {
        self.data.iter().all(|&w| w == 0)
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.data.iter().map(|w| w.count_ones()).sum()
    }

    /// Iterates over the bits from index 0 upward.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.width).map(move |i| self.get(i))
    }

    /// Parses MSB-first binary text (`"0101"`) into a vector of `width` bits.
    ///
    /// Shorter text is zero-extended; longer text is accepted only if the
    /// excess leading digits are zero. Underscores are ignored.
    pub fn from_binary_str(text: &str, width: u32) -> Result<Self, BitsParseError> {
        let digits: Vec<char> = text.chars().filter(|&c| c != '_').collect();
        if digits.is_empty() {
            return Err(BitsParseError::Empty);
        }
        let mut v = Self::new(width);
        for (i, &c) in digits.iter().rev().enumerate() {
            let bit = match c {
                '0' => false,
                '1' => true,
                _ => {
                    return Err(BitsParseError::InvalidDigit {
                        radix: "binary",
                        digit: c,
                        text: text.to_string(),
                    })
                }
            };
            if !bit {
                continue;
            }
            let i = i as u32;
            if i >= width {
                return Err(BitsParseError::Overflow {
                    text: text.to_string(),
                    width,
                });
            }
            v.set(i, true);
        }
        Ok(v)
    }

    /// Parses MSB-first hex text (`"a5"`, `"0x1F"`) into a vector of `width` bits.
    ///
    /// Shorter text is zero-extended; set bits beyond `width` are an error.
    pub fn from_hex_str(text: &str, width: u32) -> Result<Self, BitsParseError> {
        let body = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        let digits: Vec<char> = body.chars().filter(|&c| c != '_').collect();
        if digits.is_empty() {
            return Err(BitsParseError::Empty);
        }
        let mut v = Self::new(width);
        for (nibble_idx, &c) in digits.iter().rev().enumerate() {
            let nibble = c.to_digit(16).ok_or_else(|| BitsParseError::InvalidDigit {
                radix: "hex",
                digit: c,
                text: text.to_string(),
            })?;
            for bit in 0..4 {
                if nibble & (1 << bit) == 0 {
                    continue;
                }
                let i = nibble_idx as u32 * 4 + bit;
                if i >= width {
                    return Err(BitsParseError::Overflow {
                        text: text.to_string(),
                        width,
                    });
                }
                v.set(i, true);
            }
        }
        Ok(v)
    }

    /// Renders all `width` bits MSB-first.
    pub fn to_binary_string(&self) -> String {
        (0..self.width)
            .rev()
            .map(|i| if self.get(i) { '1' } else { '0' })
            .collect()
    }

    /// Renders MSB-first binary without leading zeros (`"0"` when all zero).
    pub fn to_trimmed_binary_string(&self) -> String {
        match (0..self.width).rev().find(|&i| self.get(i)) {
            Some(top) => (0..=top)
                .rev()
                .map(|i| if self.get(i) { '1' } else { '0' })
                .collect(),
            None => "0".to_string(),
        }
    }

    /// Renders lowercase hex, MSB-first, zero-padded to `ceil(width / 4)` digits.
    pub fn to_hex_string(&self) -> String {
        let digits = self.width.div_ceil(4).max(1);
        let mut out = String::with_capacity(digits as usize);
        for d in (0..digits).rev() {
            let mut nibble = 0u32;
            for bit in 0..4 {
                let i = d * 4 + bit;
                if i < self.width && self.get(i) {
                    nibble |= 1 << bit;
                }
            }
            out.push(char::from_digit(nibble, 16).unwrap_or('0'));
        }
        out
    }
}

impl fmt::Display for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_binary_string())
    }
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVec({}'h{})", self.width, self.to_hex_string())
    }
}

/// Returns the number of u64 words needed to store `width` bits.
fn word_count(width: u32) -> usize {
    width.div_ceil(BITS_PER_WORD) as usize
}
