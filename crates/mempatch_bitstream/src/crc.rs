//! CRC-32 for Xilinx configuration packets.
//!
//! Only [`write_debug_bit`](crate::bit::write_debug_bit) emits CRC packets;
//! the reader skips them.

/// CRC-32 polynomial used by Xilinx bitstream formats (IEEE 802.3).
const CRC32_POLY: u32 = 0x04C1_1DB7;

/// Precomputed CRC-32 lookup table (256 entries).
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            if crc & 0x8000_0000 != 0 {
                crc = (crc << 1) ^ CRC32_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Computes CRC-32 over the given byte slice.
///
/// Polynomial 0x04C11DB7, MSB-first, zero initial value.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0;
    for &byte in data {
        let idx = ((crc >> 24) ^ byte as u32) as usize;
        crc = (crc << 8) ^ CRC32_TABLE[idx];
    }
    crc
}

/// Computes CRC-32 over big-endian 32-bit words.
pub fn crc32_words(words: &[u32]) -> u32 {
    let mut data = Vec::with_capacity(words.len() * 4);
    for &w in words {
        data.extend_from_slice(&w.to_be_bytes());
    }
    crc32(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_empty() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn crc32_single_byte_is_table_entry() {
        assert_eq!(crc32(&[0x01]), CRC32_POLY);
    }

    #[test]
    fn crc32_different_data() {
        assert_ne!(crc32(b"frame a"), crc32(b"frame b"));
    }

    #[test]
    fn crc32_words_matches_bytes() {
        let words = [0x0102_0304u32, 0x0506_0708u32];
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(crc32_words(&words), crc32(&bytes));
    }
}
