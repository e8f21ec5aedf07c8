//! Rebuilding one representation of a memory from another.
//!
//! Every direction walks the mapping table once, reading each logical bit
//! from the source and writing it at its mapped position in the target.
//! Target positions no mapping touches keep their previous value (zero for
//! freshly created targets).

use crate::error::MapError;
use crate::feature::FeatureRows;
use crate::init::InitImage;
use crate::mapper::{FeatureCoord, Region};
use crate::table::MappingTable;
use mempatch_bitstream::FrameImage;
use mempatch_common::BitVec;
use std::collections::HashMap;

/// Converts between init images, feature rows and frame images.
#[derive(Debug, Clone, Copy)]
pub struct Reconstructor<'a> {
    table: &'a MappingTable,
}

impl<'a> Reconstructor<'a> {
    /// Creates a reconstructor over a built table.
    pub fn new(table: &'a MappingTable) -> Self {
        Self { table }
    }

    fn empty_init(&self) -> InitImage {
        let shape = self.table.shape();
        InitImage::new(shape.words, shape.bits)
    }

    /// Rebuilds the init image from FASM rows.
    ///
    /// Each primitive's region is read as one INIT string (RAMB36 rows
    /// interleaved from both halves) and indexed by linear offset.
    pub fn init_from_features(&self, features: &FeatureRows) -> InitImage {
        let records = self.table.records();
        let mut strings: HashMap<(usize, Region), BitVec> = HashMap::new();
        let mut init = self.empty_init();
        for m in self.table {
            let record = &records[m.record];
            let string = strings.entry((m.record, m.region)).or_insert_with(|| {
                features.init_string(&record.tile, record.kind, m.physical_half, m.region)
            });
            let coord = FeatureCoord {
                region: m.region,
                row: m.row,
                column: m.column,
                half_selector: m.half_selector,
            };
            if string.get(coord.linear_offset(record.kind)) {
                init.set(m.word, m.bit, true);
            }
        }
        init
    }

    /// Rebuilds the init image from bitstream frames.
    pub fn init_from_frames(&self, frames: &FrameImage) -> Result<InitImage, MapError> {
        let mut init = self.empty_init();
        for m in self.table {
            let value = frames
                .bit(m.location.frame, m.location.bit_offset)
                .ok_or(MapError::MissingFrame {
                    frame: m.location.frame,
                    word: m.word,
                    bit: m.bit,
                })?;
            if value {
                init.set(m.word, m.bit, true);
            }
        }
        Ok(init)
    }

    /// Builds FASM rows holding the init image.
    ///
    /// Every row touched by the memory is present, zero rows included.
    pub fn features_from_init(&self, init: &InitImage) -> Result<FeatureRows, MapError> {
        let mut rows = FeatureRows::new();
        for m in self.table {
            rows.set_bit(
                &m.tile,
                m.physical_half,
                m.region,
                m.row,
                m.column,
                init.get(m.word, m.bit),
            )?;
        }
        Ok(rows)
    }

    /// Writes the init image into existing frames.
    ///
    /// Bits outside the memory are left untouched; absent frames are created
    /// zero-filled.
    pub fn patch_frames(&self, init: &InitImage, frames: &mut FrameImage) -> Result<(), MapError> {
        for m in self.table {
            frames.set_bit(
                m.location.frame,
                m.location.bit_offset,
                init.get(m.word, m.bit),
            )?;
        }
        Ok(())
    }

    /// Builds frames holding only the init image.
    pub fn frames_from_init(
        &self,
        init: &InitImage,
        words_per_frame: u32,
    ) -> Result<FrameImage, MapError> {
        let mut frames = FrameImage::new(words_per_frame);
        self.patch_frames(init, &mut frames)?;
        Ok(frames)
    }
}
