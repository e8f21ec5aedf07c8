//! Placement records: the geometry of one block-RAM primitive.

use crate::error::MapError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two supported block-RAM primitive geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// A RAMB18E1/E2: one 18 Kb half of a block-RAM tile.
    Half,
    /// A RAMB36E1/E2: both halves of a tile, bit-interleaved.
    Wide,
}

impl PrimitiveKind {
    /// Recognizes a vendor cell type such as `RAMB36E1`.
    pub fn from_cell_type(cell_type: &str) -> Option<Self> {
        match cell_type {
            "RAMB18E1" | "RAMB18E2" => Some(PrimitiveKind::Half),
            "RAMB36E1" | "RAMB36E2" => Some(PrimitiveKind::Wide),
            _ => None,
        }
    }

    /// Bits in one feature row before the Y0/Y1 split.
    pub fn row_capacity(self) -> u32 {
        match self {
            PrimitiveKind::Half => 256,
            PrimitiveKind::Wide => 512,
        }
    }

    /// Total data bits of the primitive.
    pub fn data_capacity(self) -> u32 {
        match self {
            PrimitiveKind::Half => 16384,
            PrimitiveKind::Wide => 32768,
        }
    }

    /// Total parity bits of the primitive.
    pub fn parity_capacity(self) -> u32 {
        match self {
            PrimitiveKind::Half => 2048,
            PrimitiveKind::Wide => 4096,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveKind::Half => write!(f, "RAMB18"),
            PrimitiveKind::Wide => write!(f, "RAMB36"),
        }
    }
}

/// Which column type a block-RAM tile sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileSide {
    /// `BRAM_L` tiles.
    Left,
    /// `BRAM_R` tiles.
    Right,
}

impl TileSide {
    /// The side letter used in tile type names.
    pub fn letter(self) -> char {
        match self {
            TileSide::Left => 'L',
            TileSide::Right => 'R',
        }
    }

    /// Parses the side letter.
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'L' => Some(TileSide::Left),
            'R' => Some(TileSide::Right),
            _ => None,
        }
    }
}

/// An inclusive `[begin, end]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InclusiveRange {
    /// First value in the range.
    pub begin: u32,
    /// Last value in the range.
    pub end: u32,
}

impl InclusiveRange {
    /// Creates a range. `end` may be below `begin`, giving an empty span.
    pub fn new(begin: u32, end: u32) -> Self {
        Self { begin, end }
    }

    /// Number of values covered.
    pub fn span(&self) -> u32 {
        if self.end < self.begin {
            0
        } else {
            self.end - self.begin + 1
        }
    }

    /// Returns true if `value` lies in the range.
    pub fn contains(&self, value: u32) -> bool {
        self.begin <= value && value <= self.end
    }
}

impl fmt::Display for InclusiveRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.end, self.begin)
    }
}

/// Where a tile's block-RAM configuration lives in the bitstream.
///
/// Comes from the tile's `BLOCK_RAM` entry in `tilegrid.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSegment {
    /// Address of the first frame.
    pub base_address: u32,
    /// Number of frames.
    pub frame_count: u32,
    /// Offset of the tile's first word inside each frame.
    pub word_offset: u32,
    /// Number of words the tile occupies in each frame.
    pub word_count: u32,
}

/// One block-RAM primitive of a logical memory.
///
/// Assembled once from an MDD cell and its tile's frame segment, then never
/// changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    /// Hierarchical cell name from the placement description.
    pub cell: String,
    /// Tile name, e.g. `BRAM_L_X6Y5`.
    pub tile: String,
    /// Primitive geometry.
    pub kind: PrimitiveKind,
    /// Word addresses this primitive holds.
    pub addr: InclusiveRange,
    /// Bit lanes this primitive holds.
    pub slice: InclusiveRange,
    /// Configured read width of port A.
    pub read_width: u32,
    /// Logical bits stored in the parity region.
    pub parity_bits: u32,
    /// Logical bits stored in the data region.
    pub data_bits: u32,
    /// Y coordinate of the site, e.g. 41 for `RAMB18_X0Y41`.
    pub placement_row: u32,
    /// Location of the tile's configuration frames.
    pub segment: FrameSegment,
}

impl PlacementRecord {
    /// Tile type prefix, e.g. `BRAM_L` for `BRAM_L_X6Y5`.
    pub fn tile_base(&self) -> Result<&str, MapError> {
        let (base, coords) = self
            .tile
            .rsplit_once('_')
            .ok_or_else(|| self.invalid_tile())?;
        if !coords.starts_with('X') || !base.starts_with("BRAM_") {
            return Err(self.invalid_tile());
        }
        Ok(base)
    }

    /// Side of the tile, taken from the letter after `BRAM_`.
    pub fn side(&self) -> Result<TileSide, MapError> {
        let letter = self
            .tile_base()?
            .strip_prefix("BRAM_")
            .ok_or_else(|| self.invalid_tile())?;
        let mut chars = letter.chars();
        match (chars.next().and_then(TileSide::from_letter), chars.next()) {
            (Some(side), None) => Ok(side),
            _ => Err(self.invalid_tile()),
        }
    }

    /// Returns true if this primitive stores `(word, bit)`.
    pub fn covers(&self, word: u32, bit: u32) -> bool {
        self.addr.contains(word) && self.slice.contains(bit)
    }

    fn invalid_tile(&self) -> MapError {
        MapError::InvalidTile {
            tile: self.tile.clone(),
        }
    }
}
