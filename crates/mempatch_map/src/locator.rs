//! Frame location of feature bits through the segbits offset table.

use crate::error::MapError;
use crate::feature::FeatureId;
use crate::placement::PlacementRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Position of a feature bit relative to its tile's frame segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentOffset {
    /// Frame offset from the tile's base address.
    pub frame_offset: u32,
    /// Bit offset inside the frame, before the tile's word offset.
    pub bit_offset: u32,
}

/// Feature bit to segment offset, for both tile sides.
///
/// Loaded once from the segbits files and shared read-only by every record.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    entries: HashMap<FeatureId, SegmentOffset>,
}

impl SegmentTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry, returning the previous offset.
    pub fn insert(&mut self, feature: FeatureId, offset: SegmentOffset) -> Option<SegmentOffset> {
        self.entries.insert(feature, offset)
    }

    /// Looks up a feature bit.
    pub fn get(&self, feature: &FeatureId) -> Option<SegmentOffset> {
        self.entries.get(feature).copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(FeatureId, SegmentOffset)> for SegmentTable {
    fn from_iter<I: IntoIterator<Item = (FeatureId, SegmentOffset)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A bit in the configuration bitstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameLocation {
    /// Frame address.
    pub frame: u32,
    /// Bit offset inside the frame.
    pub bit_offset: u32,
}

impl FrameLocation {
    /// Index of the 32-bit word holding the bit.
    pub fn word_index(&self) -> u32 {
        self.bit_offset / 32
    }

    /// Position of the bit inside its word.
    pub fn bit_in_word(&self) -> u32 {
        self.bit_offset % 32
    }

    /// Reads the bit from a frame's words.
    pub fn extract(&self, words: &[u32]) -> Option<bool> {
        let word = words.get(self.word_index() as usize)?;
        Some((word >> self.bit_in_word()) & 1 != 0)
    }
}

impl fmt::Display for FrameLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}:{}", self.frame, self.bit_offset)
    }
}

/// Resolves feature bits of placed primitives to frame locations.
#[derive(Debug, Clone, Copy)]
pub struct FrameLocator<'a> {
    segments: &'a SegmentTable,
}

impl<'a> FrameLocator<'a> {
    /// Creates a locator over a loaded table.
    pub fn new(segments: &'a SegmentTable) -> Self {
        Self { segments }
    }

    /// Locates `feature` inside the tile of `record`.
    pub fn locate(
        &self,
        record: &PlacementRecord,
        feature: &FeatureId,
    ) -> Result<FrameLocation, MapError> {
        let offset = self
            .segments
            .get(feature)
            .ok_or_else(|| MapError::UnresolvedFeature {
                feature: feature.to_string(),
            })?;
        Ok(FrameLocation {
            frame: record.segment.base_address + offset.frame_offset,
            bit_offset: offset.bit_offset + record.segment.word_offset * 32,
        })
    }
}
