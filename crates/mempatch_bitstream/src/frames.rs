//! Frame images: frame address to packed 32-bit configuration words.

use crate::error::BitstreamError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Words per configuration frame on 7-series devices.
pub const FRAME_WORDS: u32 = 101;

/// The configuration frames of a bitstream, keyed by frame address.
///
/// Bit `n` of a frame lives in word `n / 32` at bit position `n % 32`
/// (weight `1 << (n % 32)`). Frames are kept sorted so that writers emit them
/// in ascending address order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameImage {
    frames: BTreeMap<u32, Vec<u32>>,
    words_per_frame: u32,
}

impl FrameImage {
    /// Creates an empty image whose frames hold `words_per_frame` words.
    pub fn new(words_per_frame: u32) -> Self {
        Self {
            frames: BTreeMap::new(),
            words_per_frame,
        }
    }

    /// Returns the configured frame length in words.
    pub fn words_per_frame(&self) -> u32 {
        self.words_per_frame
    }

    /// Returns the number of frames present.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no frame has been loaded or written.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns true if the frame at `address` is present.
    pub fn contains_frame(&self, address: u32) -> bool {
        self.frames.contains_key(&address)
    }

    /// Stores a whole frame, replacing any previous content.
    pub fn insert_frame(&mut self, address: u32, words: Vec<u32>) -> Result<(), BitstreamError> {
        if words.len() != self.words_per_frame as usize {
            return Err(BitstreamError::FrameLength {
                frame: address,
                expected: self.words_per_frame,
                found: words.len(),
            });
        }
        self.frames.insert(address, words);
        Ok(())
    }

    /// Returns the words of a frame.
    pub fn frame(&self, address: u32) -> Option<&[u32]> {
        self.frames.get(&address).map(Vec::as_slice)
    }

    /// Returns one word of a frame.
    pub fn word(&self, address: u32, index: u32) -> Option<u32> {
        self.frame(address)?.get(index as usize).copied()
    }

    /// Returns one bit of a frame, or `None` if the frame is absent or the
    /// offset lies past its end.
    pub fn bit(&self, address: u32, bit_offset: u32) -> Option<bool> {
        let word = self.word(address, bit_offset / 32)?;
        Some((word >> (bit_offset % 32)) & 1 != 0)
    }

    /// Sets one bit, creating a zero-filled frame if needed.
    pub fn set_bit(
        &mut self,
        address: u32,
        bit_offset: u32,
        value: bool,
    ) -> Result<(), BitstreamError> {
        if bit_offset >= self.words_per_frame * 32 {
            return Err(BitstreamError::BitOutOfFrame {
                frame: address,
                bit_offset,
            });
        }
        let word_count = self.words_per_frame as usize;
        let frame = self
            .frames
            .entry(address)
            .or_insert_with(|| vec![0u32; word_count]);
        let word = &mut frame[(bit_offset / 32) as usize];
        let mask = 1u32 << (bit_offset % 32);
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
        Ok(())
    }

    /// Iterates over `(address, words)` in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u32])> {
        self.frames.iter().map(|(&a, w)| (a, w.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_extraction_uses_word_and_shift() {
        let mut image = FrameImage::new(FRAME_WORDS);
        let mut words = vec![0u32; 101];
        words[10] = 1 << 7;
        image.insert_frame(0x00c0_000f, words).unwrap();
        assert_eq!(image.bit(0x00c0_000f, 327), Some(true));
        assert_eq!(image.bit(0x00c0_000f, 326), Some(false));
        assert_eq!(image.word(0x00c0_000f, 10), Some(0x80));
    }

    #[test]
    fn missing_frame_is_none() {
        let image = FrameImage::new(FRAME_WORDS);
        assert_eq!(image.bit(5, 0), None);
        assert!(!image.contains_frame(5));
    }

    #[test]
    fn offset_past_frame_is_none() {
        let mut image = FrameImage::new(2);
        image.insert_frame(0, vec![0, 0]).unwrap();
        assert_eq!(image.bit(0, 63), Some(false));
        assert_eq!(image.bit(0, 64), None);
    }

    #[test]
    fn insert_wrong_length_errors() {
        let mut image = FrameImage::new(FRAME_WORDS);
        let err = image.insert_frame(1, vec![0; 3]).unwrap_err();
        assert!(matches!(err, BitstreamError::FrameLength { found: 3, .. }));
    }

    #[test]
    fn set_bit_creates_and_clears() {
        let mut image = FrameImage::new(4);
        image.set_bit(7, 33, true).unwrap();
        assert_eq!(image.word(7, 1), Some(2));
        image.set_bit(7, 33, false).unwrap();
        assert_eq!(image.word(7, 1), Some(0));
        assert_eq!(image.frame_count(), 1);
    }

    #[test]
    fn set_bit_out_of_frame_errors() {
        let mut image = FrameImage::new(1);
        assert!(matches!(
            image.set_bit(0, 32, true).unwrap_err(),
            BitstreamError::BitOutOfFrame { bit_offset: 32, .. }
        ));
    }

    #[test]
    fn iter_is_sorted() {
        let mut image = FrameImage::new(1);
        image.set_bit(9, 0, true).unwrap();
        image.set_bit(2, 0, true).unwrap();
        let addrs: Vec<u32> = image.iter().map(|(a, _)| a).collect();
        assert_eq!(addrs, vec![2, 9]);
    }

    #[test]
    fn serde_roundtrip() {
        let mut image = FrameImage::new(2);
        image.set_bit(3, 40, true).unwrap();
        let json = serde_json::to_string(&image).unwrap();
        let back: FrameImage = serde_json::from_str(&json).unwrap();
        assert_eq!(image, back);
    }
}
