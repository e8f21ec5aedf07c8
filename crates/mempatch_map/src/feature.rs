//! Feature space: identifiers, FASM row names, row storage and the RAMB36
//! half interleave.

use crate::error::MapError;
use crate::mapper::{FeatureCoord, Region};
use crate::placement::{PlacementRecord, PrimitiveKind, TileSide};
use mempatch_common::BitVec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Bits in one `INIT_xx` / `INITP_xx` row of a RAMB18 half.
pub const ROW_BITS: u32 = 256;

/// One bit of a block-RAM tile's INIT or INITP feature space.
///
/// Displayed in segbits form, e.g. `BRAM_L.RAMB18_Y1.INITP_07[255]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId {
    /// Tile column type.
    pub side: TileSide,
    /// RAMB18 half (0 or 1).
    pub half: u8,
    /// Data or parity.
    pub region: Region,
    /// Row index.
    pub row: u32,
    /// Bit within the row.
    pub column: u32,
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BRAM_{}.RAMB18_Y{}.{}_{:02X}[{:03}]",
            self.side.letter(),
            self.half,
            self.region.keyword(),
            self.row,
            self.column
        )
    }
}

/// A string that is not a block-RAM INIT/INITP feature bit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed feature identifier '{0}'")]
pub struct ParseFeatureError(pub String);

impl FromStr for FeatureId {
    type Err = ParseFeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFeatureError(s.to_string());
        let mut parts = s.splitn(3, '.');
        let (tile, site, feature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(y), Some(f)) => (t, y, f),
            _ => return Err(err()),
        };

        let side = tile
            .strip_prefix("BRAM_")
            .and_then(|l| {
                let mut chars = l.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => TileSide::from_letter(c),
                    _ => None,
                }
            })
            .ok_or_else(err)?;
        let half = match site {
            "RAMB18_Y0" => 0,
            "RAMB18_Y1" => 1,
            _ => return Err(err()),
        };

        let (name, index) = feature
            .strip_suffix(']')
            .and_then(|f| f.split_once('['))
            .ok_or_else(err)?;
        let (keyword, row) = name.split_once('_').ok_or_else(err)?;
        let region = match keyword {
            "INIT" => Region::Data,
            "INITP" => Region::Parity,
            _ => return Err(err()),
        };
        let row = u32::from_str_radix(row, 16).map_err(|_| err())?;
        let column: u32 = index.parse().map_err(|_| err())?;
        if row >= region.row_count() || column >= ROW_BITS {
            return Err(err());
        }
        Ok(FeatureId {
            side,
            half,
            region,
            row,
            column,
        })
    }
}

impl Serialize for FeatureId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FeatureId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// FASM name of one row of a tile, e.g. `BRAM_L_X6Y5.RAMB18_Y0.INIT_07`.
pub fn feature_line_name(tile: &str, half: u8, region: Region, row: u32) -> String {
    format!("{tile}.RAMB18_Y{half}.{}_{row:02X}", region.keyword())
}

/// The RAMB18 half that physically holds a mapped bit.
///
/// A RAMB36 uses both halves as chosen by the mapper; a RAMB18 sits in the
/// half given by the parity of its site row.
pub fn physical_half(record: &PlacementRecord, coord: &FeatureCoord) -> u8 {
    match record.kind {
        PrimitiveKind::Wide => coord.half_selector,
        PrimitiveKind::Half => (record.placement_row % 2) as u8,
    }
}

/// Merges two 256-bit half rows into one 512-bit RAMB36 row.
///
/// Even bits come from `y0`, odd bits from `y1`.
pub fn interleave(y0: &BitVec, y1: &BitVec) -> BitVec {
    let width = y0.width().max(y1.width());
    let mut out = BitVec::new(width * 2);
    for i in 0..width {
        if i < y0.width() && y0.get(i) {
            out.set(2 * i, true);
        }
        if i < y1.width() && y1.get(i) {
            out.set(2 * i + 1, true);
        }
    }
    out
}

/// Splits a RAMB36 row into its Y0 (even bits) and Y1 (odd bits) halves.
pub fn deinterleave(row: &BitVec) -> (BitVec, BitVec) {
    let width = row.width().div_ceil(2);
    let mut y0 = BitVec::new(width);
    let mut y1 = BitVec::new(width);
    for i in 0..row.width() {
        if row.get(i) {
            if i % 2 == 0 {
                y0.set(i / 2, true);
            } else {
                y1.set(i / 2, true);
            }
        }
    }
    (y0, y1)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct RowKey {
    tile: String,
    half: u8,
    region: Region,
}

/// INIT and INITP rows of one or more tiles.
///
/// Rows never given read as all zero, so a FASM file that omits zero rows
/// needs no special handling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureRows {
    rows: BTreeMap<RowKey, BTreeMap<u32, BitVec>>,
}

impl FeatureRows {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores one row. Values narrower than a row are zero-extended.
    pub fn insert_row(
        &mut self,
        tile: &str,
        half: u8,
        region: Region,
        row: u32,
        value: BitVec,
    ) -> Result<(), MapError> {
        let invalid = |reason: String| MapError::InvalidFeatureRow {
            name: feature_line_name(tile, half, region, row),
            reason,
        };
        if half > 1 {
            return Err(invalid(format!("half {half} does not exist")));
        }
        if row >= region.row_count() {
            return Err(invalid(format!(
                "{} has only {} rows",
                region.keyword(),
                region.row_count()
            )));
        }
        if value.width() > ROW_BITS {
            return Err(invalid(format!("{} bits exceed the row", value.width())));
        }
        let value = if value.width() == ROW_BITS {
            value
        } else {
            let mut wide = BitVec::new(ROW_BITS);
            for i in 0..value.width() {
                wide.set(i, value.get(i));
            }
            wide
        };
        self.rows
            .entry(RowKey {
                tile: tile.to_string(),
                half,
                region,
            })
            .or_default()
            .insert(row, value);
        Ok(())
    }

    /// Reads one bit; absent rows read as zero.
    pub fn get_bit(&self, tile: &str, half: u8, region: Region, row: u32, column: u32) -> bool {
        self.row(tile, half, region, row)
            .is_some_and(|r| column < r.width() && r.get(column))
    }

    /// Writes one bit, creating a zero row if needed.
    pub fn set_bit(
        &mut self,
        tile: &str,
        half: u8,
        region: Region,
        row: u32,
        column: u32,
        value: bool,
    ) -> Result<(), MapError> {
        if column >= ROW_BITS {
            return Err(MapError::InvalidFeatureRow {
                name: feature_line_name(tile, half, region, row),
                reason: format!("column {column} is past the end of the row"),
            });
        }
        let key = RowKey {
            tile: tile.to_string(),
            half,
            region,
        };
        if self.rows.get(&key).and_then(|r| r.get(&row)).is_none() {
            self.insert_row(tile, half, region, row, BitVec::new(ROW_BITS))?;
        }
        if let Some(r) = self.rows.get_mut(&key).and_then(|r| r.get_mut(&row)) {
            r.set(column, value);
        }
        Ok(())
    }

    /// One stored row, if present.
    pub fn row(&self, tile: &str, half: u8, region: Region, row: u32) -> Option<&BitVec> {
        self.rows
            .get(&RowKey {
                tile: tile.to_string(),
                half,
                region,
            })?
            .get(&row)
    }

    /// All rows of a region, padded with zero rows to the full row count.
    pub fn rows(&self, tile: &str, half: u8, region: Region) -> Vec<BitVec> {
        (0..region.row_count())
            .map(|r| {
                self.row(tile, half, region, r)
                    .cloned()
                    .unwrap_or_else(|| BitVec::new(ROW_BITS))
            })
            .collect()
    }

    /// The region's rows concatenated from row 0, as the mapper's linear
    /// offsets index them.
    ///
    /// For a RAMB36 each row is the Y0/Y1 interleave and `half` is ignored.
    pub fn init_string(&self, tile: &str, kind: PrimitiveKind, half: u8, region: Region) -> BitVec {
        let rows: Vec<BitVec> = match kind {
            PrimitiveKind::Half => self.rows(tile, half, region),
            PrimitiveKind::Wide => self
                .rows(tile, 0, region)
                .iter()
                .zip(self.rows(tile, 1, region).iter())
                .map(|(y0, y1)| interleave(y0, y1))
                .collect(),
        };
        let mut out = BitVec::new(kind.row_capacity() * region.row_count());
        for (r, row) in rows.iter().enumerate() {
            let base = r as u32 * kind.row_capacity();
            for i in 0..row.width() {
                if row.get(i) {
                    out.set(base + i, true);
                }
            }
        }
        out
    }

    /// Tiles that have at least one stored row, sorted.
    pub fn tiles(&self) -> Vec<&str> {
        let mut tiles: Vec<&str> = self.rows.keys().map(|k| k.tile.as_str()).collect();
        tiles.dedup();
        tiles
    }

    /// Iterates over stored rows as `(tile, half, region, row, value)`, sorted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u8, Region, u32, &BitVec)> {
        self.rows.iter().flat_map(|(k, rows)| {
            rows.iter()
                .map(move |(&r, v)| (k.tile.as_str(), k.half, k.region, r, v))
        })
    }

    /// Returns true if no row is stored.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
