//! Three-way verification of init file, FASM rows and bitstream frames.

use crate::error::MapError;
use crate::feature::FeatureRows;
use crate::init::InitImage;
use crate::table::{BitMapping, MappingTable};
use mempatch_bitstream::FrameImage;
use std::fmt;

/// Result of a passing verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifySummary {
    /// Primitives of the memory.
    pub cells: usize,
    /// Bits compared.
    pub bits_checked: usize,
}

/// The first bit on which the three sources disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Logical word.
    pub word: u32,
    /// Logical bit.
    pub bit: u32,
    /// Value in the init file.
    pub init: bool,
    /// Value in the FASM rows.
    pub feature: bool,
    /// Value in the bitstream.
    pub frame: bool,
    /// The 32-bit frame word holding the bitstream value.
    pub frame_word: u32,
    /// Full mapping of the bit.
    pub mapping: BitMapping,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bit mismatch at word {} bit {}: init={} fasm={} bitstream={} ({} -> {})",
            self.word,
            self.bit,
            self.init as u8,
            self.feature as u8,
            self.frame as u8,
            self.mapping.feature,
            self.mapping.location
        )
    }
}

/// Verifier progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyState {
    /// Comparing; `next` is the index of the next mapping to check.
    Checking {
        /// Next mapping index.
        next: usize,
    },
    /// Every bit agreed.
    Done(VerifySummary),
    /// A bit disagreed. Terminal.
    Mismatch(Box<Mismatch>),
}

/// Compares every bit of a memory across its three representations.
///
/// Stops at the first disagreement.
pub struct Verifier<'a> {
    table: &'a MappingTable,
    init: &'a InitImage,
    features: &'a FeatureRows,
    frames: &'a FrameImage,
    state: VerifyState,
}

impl<'a> Verifier<'a> {
    /// Prepares a verification pass.
    pub fn new(
        table: &'a MappingTable,
        init: &'a InitImage,
        features: &'a FeatureRows,
        frames: &'a FrameImage,
    ) -> Self {
        Self {
            table,
            init,
            features,
            frames,
            state: VerifyState::Checking { next: 0 },
        }
    }

    /// Current state.
    pub fn state(&self) -> &VerifyState {
        &self.state
    }

    /// Checks one bit. Terminal states are returned unchanged.
    pub fn step(&mut self) -> Result<&VerifyState, MapError> {
        let next = match self.state {
            VerifyState::Checking { next } => next,
            _ => return Ok(&self.state),
        };
        let Some(m) = self.table.entries().get(next) else {
            self.state = VerifyState::Done(VerifySummary {
                cells: self.table.records().len(),
                bits_checked: next,
            });
            return Ok(&self.state);
        };

        let init = self.init.get(m.word, m.bit);
        let feature = self
            .features
            .get_bit(&m.tile, m.physical_half, m.region, m.row, m.column);
        let missing = || MapError::MissingFrame {
            frame: m.location.frame,
            word: m.word,
            bit: m.bit,
        };
        let words = self.frames.frame(m.location.frame).ok_or_else(missing)?;
        let frame = m.location.extract(words).ok_or_else(missing)?;
        let frame_word = words[m.location.word_index() as usize];

        self.state = if init == feature && feature == frame {
            VerifyState::Checking { next: next + 1 }
        } else {
            VerifyState::Mismatch(Box::new(Mismatch {
                word: m.word,
                bit: m.bit,
                init,
                feature,
                frame,
                frame_word,
                mapping: m.clone(),
            }))
        };
        Ok(&self.state)
    }

    /// Runs to completion.
    ///
    /// A mismatch is returned as [`MapError::VerificationFailure`].
    pub fn run(mut self) -> Result<VerifySummary, MapError> {
        loop {
            match self.step()? {
                VerifyState::Checking { .. } => continue,
                VerifyState::Done(summary) => return Ok(*summary),
                VerifyState::Mismatch(m) => {
                    return Err(MapError::VerificationFailure(m.clone()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::tests::half_record;
    use crate::reconstruct::Reconstructor;
    use crate::table::tests::synthetic_segments;
    use crate::table::MemoryShape;
    use mempatch_bitstream::FRAME_WORDS;

    fn table() -> MappingTable {
        MappingTable::build(
            vec![half_record()],
            MemoryShape { words: 128, bits: 1 },
            &synthetic_segments(),
        )
        .unwrap()
    }

    fn sources(table: &MappingTable) -> (InitImage, FeatureRows, FrameImage) {
        let mut init = InitImage::new(128, 1);
        for w in (0..128).step_by(3) {
            init.set(w, 0, true);
        }
        let r = Reconstructor::new(table);
        let features = r.features_from_init(&init).unwrap();
        let frames = r.frames_from_init(&init, FRAME_WORDS).unwrap();
        (init, features, frames)
    }

    #[test]
    fn agreeing_sources_pass() {
        let table = table();
        let (init, features, frames) = sources(&table);
        let summary = Verifier::new(&table, &init, &features, &frames).run().unwrap();
        assert_eq!(
            summary,
            VerifySummary {
                cells: 1,
                bits_checked: 128
            }
        );
    }

    #[test]
    fn first_mismatch_reported() {
        let table = table();
        let (init, features, mut frames) = sources(&table);
        let m = table.lookup(7, 0).unwrap();
        frames
            .set_bit(m.location.frame, m.location.bit_offset, true)
            .unwrap();

        let err = Verifier::new(&table, &init, &features, &frames)
            .run()
            .unwrap_err();
        match err {
            MapError::VerificationFailure(mm) => {
                assert_eq!((mm.word, mm.bit), (7, 0));
                assert_eq!((mm.init, mm.feature, mm.frame), (false, false, true));
                assert_eq!(mm.mapping.row, 0);
                assert_eq!(mm.mapping.column, 112);
                assert!(mm.to_string().contains("init=0 fasm=0 bitstream=1"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mismatch_is_terminal() {
        let table = table();
        let (mut init, features, frames) = sources(&table);
        init.set(0, 0, false);
        let mut v = Verifier::new(&table, &init, &features, &frames);
        assert!(matches!(v.step().unwrap(), VerifyState::Mismatch(_)));
        assert!(matches!(v.step().unwrap(), VerifyState::Mismatch(_)));
    }

    #[test]
    fn step_walks_then_finishes() {
        let table = table();
        let (init, features, frames) = sources(&table);
        let mut v = Verifier::new(&table, &init, &features, &frames);
        assert_eq!(v.step().unwrap(), &VerifyState::Checking { next: 1 });
        for _ in 1..128 {
            v.step().unwrap();
        }
        assert!(matches!(v.step().unwrap(), VerifyState::Done(_)));
    }

    #[test]
    fn missing_frame_errors() {
        let table = table();
        let (init, features, _) = sources(&table);
        let frames = FrameImage::new(FRAME_WORDS);
        let err = Verifier::new(&table, &init, &features, &frames)
            .run()
            .unwrap_err();
        assert!(matches!(err, MapError::MissingFrame { word: 0, bit: 0, .. }));
    }
}
