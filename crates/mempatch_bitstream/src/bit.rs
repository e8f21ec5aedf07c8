//! Xilinx BIT reading and debug-bitstream writing.
//!
//! BIT files contain a TLV-encoded header with design metadata, followed by
//! a synchronization word and a packet stream that programs configuration
//! frames through the FAR and FDRI registers. The reader ignores the header,
//! walks type-1 and type-2 packets, and records every FDRI payload as
//! consecutive frames starting at the current frame address.

use crate::crc::crc32_words;
use crate::error::BitstreamError;
use crate::frames::FrameImage;
use std::path::Path;

/// Xilinx sync word (marks start of configuration commands).
const SYNC_WORD: u32 = 0xAA99_5566;

/// Xilinx NOOP command.
const NOOP: u32 = 0x2000_0000;

/// Type 1 write packet header builder.
fn type1_write(reg: u32, word_count: u32) -> u32 {
    0x3000_0000 | (reg << 13) | (word_count & 0x7FF)
}

/// Type 2 write packet header (for payloads of more than 2047 words).
fn type2_write(word_count: u32) -> u32 {
    0x5000_0000 | (word_count & 0x07FF_FFFF)
}

// Xilinx configuration register addresses
/// CRC register.
const REG_CRC: u32 = 0x00;
/// Frame Address Register.
const REG_FAR: u32 = 0x01;
/// Frame Data Register Input.
const REG_FDRI: u32 = 0x02;
/// Command register.
const REG_CMD: u32 = 0x04;

// Command register values
/// Write Configuration.
const CMD_WCFG: u32 = 0x01;
/// Reset CRC.
const CMD_RCRC: u32 = 0x07;
/// Desync: end of configuration.
const CMD_DESYNC: u32 = 0x0D;

const OP_WRITE: u32 = 0x2;

/// Header field tag 'a' (design name).
const FIELD_DESIGN: u8 = b'a';
/// Header field tag 'b' (device name).
const FIELD_DEVICE: u8 = b'b';
/// Header field tag 'e' (data length).
const FIELD_DATA_LEN: u8 = b'e';

/// Reads a BIT file from disk and extracts its frames.
pub fn load_frames(path: &Path, words_per_frame: u32) -> Result<FrameImage, BitstreamError> {
    let data = std::fs::read(path)?;
    read_frames(&data, words_per_frame)
}

/// Extracts every frame written by a bitstream.
///
/// Each FAR write sets the current frame address. Each FDRI write is cut into
/// `words_per_frame`-word frames stored at consecutive addresses, after which
/// the current address points past the last frame written. A frame written
/// twice keeps its last content.
pub fn read_frames(data: &[u8], words_per_frame: u32) -> Result<FrameImage, BitstreamError> {
    let start = find_sync(data).ok_or(BitstreamError::NoSyncWord)?;
    let words: Vec<u32> = data[start..]
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    let mut image = FrameImage::new(words_per_frame);
    let mut far = 0u32;
    let mut last_reg: Option<u32> = None;
    let mut i = 0usize;

    while i < words.len() {
        let header = words[i];
        let offset = start + i * 4;
        i += 1;

        let (reg, count) = match header >> 29 {
            1 => {
                let reg = (header >> 13) & 0x3FFF;
                last_reg = Some(reg);
                (reg, (header & 0x7FF) as usize)
            }
            2 => {
                let reg = last_reg.ok_or(BitstreamError::OrphanType2 { offset })?;
                (reg, (header & 0x07FF_FFFF) as usize)
            }
            // Dummy or padding words between packets.
            _ => continue,
        };
        let opcode = (header >> 27) & 0x3;
        if opcode != OP_WRITE || count == 0 {
            continue;
        }
        if i + count > words.len() {
            return Err(BitstreamError::Truncated {
                offset,
                needed: i + count - words.len(),
            });
        }
        let payload = &words[i..i + count];
        i += count;

        match reg {
            REG_FAR => far = payload[0],
            REG_FDRI => {
                let wpf = words_per_frame as usize;
                if payload.len() % wpf != 0 {
                    return Err(BitstreamError::PartialFrame {
                        words: payload.len(),
                        words_per_frame,
                    });
                }
                for frame in payload.chunks_exact(wpf) {
                    image.insert_frame(far, frame.to_vec())?;
                    far = far.wrapping_add(1);
                }
            }
            _ => {}
        }
    }
    Ok(image)
}

/// Returns the byte index just past the sync word.
fn find_sync(data: &[u8]) -> Option<usize> {
    let sync = SYNC_WORD.to_be_bytes();
    data.windows(4).position(|w| w == sync).map(|p| p + 4)
}

/// Writes a debug bitstream containing every frame of `image`.
///
/// This is a fixture writer: no command emits bitstreams, but tests across
/// the workspace build their inputs with it and read them back through
/// [`read_frames`].
///
/// Layout:
/// 1. TLV header (design name, device, data length)
/// 2. Padding (16-byte alignment)
/// 3. Sync word (0xAA995566)
/// 4. Reset CRC, Write Configuration
/// 5. For each frame in address order: FAR, FDRI with the frame words, CRC
/// 6. DESYNC
pub fn write_debug_bit(image: &FrameImage, device_name: &str, design_name: &str) -> Vec<u8> {
    let mut body: Vec<u32> = Vec::new();

    body.extend_from_slice(&[NOOP, NOOP]);
    body.extend_from_slice(&[type1_write(REG_CMD, 1), CMD_RCRC, NOOP]);
    body.extend_from_slice(&[type1_write(REG_CMD, 1), CMD_WCFG, NOOP]);

    let wpf = image.words_per_frame();
    for (address, words) in image.iter() {
        body.extend_from_slice(&[type1_write(REG_FAR, 1), address]);
        if wpf <= 0x7FF {
            body.push(type1_write(REG_FDRI, wpf));
        } else {
            body.push(type1_write(REG_FDRI, 0));
            body.push(type2_write(wpf));
        }
        body.extend_from_slice(words);
        body.extend_from_slice(&[type1_write(REG_CRC, 1), crc32_words(words)]);
    }

    body.extend_from_slice(&[type1_write(REG_CMD, 1), CMD_DESYNC]);
    body.extend_from_slice(&[NOOP; 4]);

    let mut data = Vec::new();
    let payload_len = ((body.len() + 1) * 4) as u32;
    write_header(&mut data, design_name, device_name, payload_len);
    while data.len() % 16 != 0 {
        data.push(0xFF);
    }
    data.extend_from_slice(&SYNC_WORD.to_be_bytes());
    for word in body {
        data.extend_from_slice(&word.to_be_bytes());
    }
    data
}

/// Writes the TLV header with design metadata.
fn write_header(data: &mut Vec<u8>, design_name: &str, device_name: &str, payload_len: u32) {
    let preamble = [
        0x00, 0x09, 0x0F, 0xF0, 0x0F, 0xF0, 0x0F, 0xF0, 0x0F, 0xF0, 0x00,
    ];
    data.extend_from_slice(&preamble);
    write_tlv_field(data, FIELD_DESIGN, design_name.as_bytes());
    write_tlv_field(data, FIELD_DEVICE, device_name.as_bytes());
    data.push(FIELD_DATA_LEN);
    data.extend_from_slice(&payload_len.to_be_bytes());
}

/// Writes a single TLV field (tag + 2-byte length + null-terminated value).
fn write_tlv_field(data: &mut Vec<u8>, tag: u8, value: &[u8]) {
    data.push(tag);
    let len = (value.len() + 1) as u16;
    data.extend_from_slice(&len.to_be_bytes());
    data.extend_from_slice(value);
    data.push(0);
}
