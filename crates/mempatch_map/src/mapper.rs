//! Address mapping between logical `(word, bit)` pairs and feature coordinates.
//!
//! A primitive splits each word into a data lane group and a parity lane
//! group. Each group is packed into fixed-capacity rows (256 bits for a
//! RAMB18, 512 for a RAMB36) word after word. A RAMB36 row is then split
//! between the Y0 and Y1 halves: even raw columns go to Y0, odd to Y1.

use crate::error::{GeometryInvariant, MapError};
use crate::geometry::PrimitiveGeometry;
use crate::placement::{PlacementRecord, PrimitiveKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data or parity portion of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    /// `INIT_xx` rows.
    Data,
    /// `INITP_xx` rows.
    Parity,
}

impl Region {
    /// FASM keyword for the region.
    pub fn keyword(self) -> &'static str {
        match self {
            Region::Data => "INIT",
            Region::Parity => "INITP",
        }
    }

    /// Rows per RAMB18 half: 64 data, 8 parity.
    pub fn row_count(self) -> u32 {
        match self {
            Region::Data => 64,
            Region::Parity => 8,
        }
    }

    /// Returns true for the parity region.
    pub fn is_parity(self) -> bool {
        self == Region::Parity
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Position of a bit in feature space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureCoord {
    /// Data or parity.
    pub region: Region,
    /// Row index (`INIT_xx` / `INITP_xx`).
    pub row: u32,
    /// Bit within the 256-bit row.
    pub column: u32,
    /// RAMB36 half holding the bit; always 0 for a RAMB18.
    pub half_selector: u8,
}

impl FeatureCoord {
    /// Column in the row before the Y0/Y1 split.
    pub fn raw_column(&self, kind: PrimitiveKind) -> u32 {
        match kind {
            PrimitiveKind::Half => self.column,
            PrimitiveKind::Wide => self.column * 2 + u32::from(self.half_selector),
        }
    }

    /// Offset in the region's INIT string, all rows concatenated from row 0.
    pub fn linear_offset(&self, kind: PrimitiveKind) -> u32 {
        self.row * kind.row_capacity() + self.raw_column(kind)
    }
}

/// Maps bits of one validated primitive.
#[derive(Debug, Clone, Copy)]
pub struct AddressMapper<'a> {
    record: &'a PlacementRecord,
    geometry: PrimitiveGeometry,
}

impl<'a> AddressMapper<'a> {
    /// Validates `record` and prepares it for mapping.
    pub fn new(record: &'a PlacementRecord) -> Result<Self, MapError> {
        Ok(Self {
            record,
            geometry: PrimitiveGeometry::validate(record)?,
        })
    }

    /// The record being mapped.
    pub fn record(&self) -> &'a PlacementRecord {
        self.record
    }

    /// The validated geometry.
    pub fn geometry(&self) -> &PrimitiveGeometry {
        &self.geometry
    }

    fn violation(&self, violation: GeometryInvariant) -> MapError {
        MapError::GeometryInvariantViolation {
            cell: self.record.cell.clone(),
            tile: self.record.tile.clone(),
            violation,
        }
    }

    /// Maps `(word, bit)` to feature space.
    ///
    /// Returns `Ok(None)` when this primitive does not hold the bit.
    pub fn map(&self, word: u32, bit: u32) -> Result<Option<FeatureCoord>, MapError> {
        if !self.record.covers(word, bit) {
            return Ok(None);
        }
        let widths = self.geometry.widths;
        let lane = bit - self.record.slice.begin;
        let (region, lane) = if lane >= widths.data {
            (Region::Parity, lane - widths.data)
        } else {
            (Region::Data, lane)
        };
        let width = widths.of(region);
        let words_per_row = match self.geometry.words_per_row(region) {
            Some(n) if lane < width => n,
            _ => {
                return Err(self.violation(GeometryInvariant::LaneOverflow {
                    region,
                    lane,
                    slice_width: width,
                }))
            }
        };

        let offset = word - self.record.addr.begin;
        let row = offset / words_per_row;
        if row >= region.row_count() {
            return Err(self.violation(GeometryInvariant::RowLimit { region, row }));
        }
        let raw_column = (offset % words_per_row) * width + lane;

        let (column, half_selector) = match self.geometry.kind {
            PrimitiveKind::Half => (raw_column, 0),
            PrimitiveKind::Wide => (raw_column / 2, (raw_column % 2) as u8),
        };
        Ok(Some(FeatureCoord {
            region,
            row,
            column,
            half_selector,
        }))
    }

    /// Maps a feature coordinate back to `(word, bit)`.
    ///
    /// Returns `None` for padding positions that hold no logical bit.
    pub fn unmap(&self, coord: FeatureCoord) -> Option<(u32, u32)> {
        let kind = self.geometry.kind;
        if kind == PrimitiveKind::Half && coord.half_selector != 0 {
            return None;
        }
        let words_per_row = self.geometry.words_per_row(coord.region)?;
        let width = self.geometry.widths.of(coord.region);
        let raw_column = coord.raw_column(kind);
        if raw_column >= kind.row_capacity() || coord.row >= coord.region.row_count() {
            return None;
        }

        let offset = coord.row * words_per_row + raw_column / width;
        let lane = match coord.region {
            Region::Data => raw_column % width,
            Region::Parity => self.geometry.widths.data + raw_column % width,
        };
        if offset >= self.geometry.depth || lane >= self.geometry.slice_width {
            return None;
        }
        Some((
            self.record.addr.begin + offset,
            self.record.slice.begin + lane,
        ))
    }
}

/// Maps one bit of `record`.
///
/// Out-of-range bits give `Ok(None)` before the record is validated; for
/// bits inside the record's window the geometry is validated first.
pub fn map_bit(
    record: &PlacementRecord,
    word: u32,
    bit: u32,
) -> Result<Option<FeatureCoord>, MapError> {
    if !record.covers(word, bit) {
        return Ok(None);
    }
    AddressMapper::new(record)?.map(word, bit)
}
