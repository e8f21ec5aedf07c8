//! Logical memory contents as LSB-first words.

use crate::table::MemoryShape;
use mempatch_common::BitVec;

/// The contents of a logical memory, `words × bits`.
///
/// Bit `b` of word `w` has weight `2^b`. Words past the end of the image read
/// as zero, as a short init file leaves the remaining words uninitialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitImage {
    bits: u32,
    words: Vec<BitVec>,
}

impl InitImage {
    /// An all-zero image.
    pub fn new(words: u32, bits: u32) -> Self {
        Self {
            bits,
            words: (0..words).map(|_| BitVec::new(bits)).collect(),
        }
    }

    /// Builds an image from parsed words.
    ///
    /// Words narrower than `bits` are zero-extended; wider words are cut.
    pub fn from_words(bits: u32, words: Vec<BitVec>) -> Self {
        let words = words
            .into_iter()
            .map(|w| {
                if w.width() == bits {
                    return w;
                }
                let mut v = BitVec::new(bits);
                for i in 0..bits.min(w.width()) {
                    v.set(i, w.get(i));
                }
                v
            })
            .collect();
        Self { bits, words }
    }

    /// Bits per word.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of words held.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true if no word is held.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Reads bit `bit` of word `word`; positions outside the image read as zero.
    pub fn get(&self, word: u32, bit: u32) -> bool {
        self.words
            .get(word as usize)
            .is_some_and(|w| bit < w.width() && w.get(bit))
    }

    /// Writes bit `bit` of word `word`, growing the image with zero words if
    /// needed.
    ///
    /// # Panics
    ///
    /// Panics if `bit >= self.bits()`.
    pub fn set(&mut self, word: u32, bit: u32, value: bool) {
        while self.words.len() <= word as usize {
            self.words.push(BitVec::new(self.bits));
        }
        self.words[word as usize].set(bit, value);
    }

    /// All words in address order.
    pub fn words(&self) -> &[BitVec] {
        &self.words
    }

    /// First `(word, bit)` inside `shape` where the two images differ.
    pub fn first_difference(&self, other: &InitImage, shape: MemoryShape) -> Option<(u32, u32)> {
        (0..shape.words)
            .flat_map(|w| (0..shape.bits).map(move |b| (w, b)))
            .find(|&(w, b)| self.get(w, b) != other.get(w, b))
    }
}
