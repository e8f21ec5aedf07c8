//! The per-bit mapping table of one logical memory.

use crate::error::MapError;
use crate::feature::{feature_line_name, physical_half, FeatureId};
use crate::locator::{FrameLocation, FrameLocator, SegmentTable};
use crate::mapper::{AddressMapper, Region};
use crate::placement::{PlacementRecord, PrimitiveKind};
use serde::{Deserialize, Serialize};

/// Dimensions of a logical memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryShape {
    /// Number of words.
    pub words: u32,
    /// Bits per word.
    pub bits: u32,
}

impl MemoryShape {
    /// The smallest shape holding every record's window, or `None` if there
    /// are no records.
    pub fn covering(records: &[PlacementRecord]) -> Option<Self> {
        let words = records.iter().map(|r| r.addr.end).max()? + 1;
        let bits = records.iter().map(|r| r.slice.end).max()? + 1;
        Some(Self { words, bits })
    }

    /// Total number of bits.
    pub fn len(&self) -> usize {
        self.words as usize * self.bits as usize
    }

    /// Returns true if the shape holds no bits.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `(word, bit)` lies inside the shape.
    pub fn contains(&self, word: u32, bit: u32) -> bool {
        word < self.words && bit < self.bits
    }
}

/// Where one logical bit lives in feature space and in the bitstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitMapping {
    /// Logical word.
    pub word: u32,
    /// Logical bit.
    pub bit: u32,
    /// Tile of the owning primitive.
    pub tile: String,
    /// Kind of the owning primitive.
    pub kind: PrimitiveKind,
    /// Index of the owning record in the table.
    pub record: usize,
    /// Data or parity.
    pub region: Region,
    /// Row index.
    pub row: u32,
    /// Bit within the 256-bit row.
    pub column: u32,
    /// RAMB36 half chosen by the mapper.
    pub half_selector: u8,
    /// RAMB18 half that physically holds the bit.
    pub physical_half: u8,
    /// Segbits identifier of the feature bit.
    ///
    /// Named after `physical_half` rather than `half_selector`: a RAMB18 on
    /// an odd site row reads `RAMB18_Y1`, although its selector is always 0.
    pub feature: FeatureId,
    /// Location in the bitstream.
    pub location: FrameLocation,
}

impl BitMapping {
    /// Returns true for parity-region bits.
    pub fn is_parity(&self) -> bool {
        self.region.is_parity()
    }

    /// FASM name of the row holding this bit.
    pub fn line_name(&self) -> String {
        feature_line_name(&self.tile, self.physical_half, self.region, self.row)
    }
}

/// Every bit mapping of a memory, in `word * bits + bit` order.
#[derive(Debug, Clone)]
pub struct MappingTable {
    shape: MemoryShape,
    records: Vec<PlacementRecord>,
    entries: Vec<BitMapping>,
}

impl MappingTable {
    /// Maps every bit of a memory.
    ///
    /// All records are validated before any bit is mapped. Each `(word, bit)`
    /// of `shape` must be held by exactly one record.
    pub fn build(
        records: Vec<PlacementRecord>,
        shape: MemoryShape,
        segments: &SegmentTable,
    ) -> Result<Self, MapError> {
        let mappers = records
            .iter()
            .map(AddressMapper::new)
            .collect::<Result<Vec<_>, MapError>>()?;
        let sides = records
            .iter()
            .map(PlacementRecord::side)
            .collect::<Result<Vec<_>, MapError>>()?;
        let locator = FrameLocator::new(segments);

        let mut entries = Vec::with_capacity(shape.len());
        for word in 0..shape.words {
            for bit in 0..shape.bits {
                let mut owner: Option<usize> = None;
                for (i, record) in records.iter().enumerate() {
                    if !record.covers(word, bit) {
                        continue;
                    }
                    if let Some(first) = owner {
                        return Err(MapError::CoverageOverlap {
                            word,
                            bit,
                            first: records[first].cell.clone(),
                            second: record.cell.clone(),
                        });
                    }
                    owner = Some(i);
                }
                let index = owner.ok_or(MapError::CoverageGap { word, bit })?;
                let record = &records[index];
                let coord = mappers[index]
                    .map(word, bit)?
                    .ok_or(MapError::CoverageGap { word, bit })?;
                let half = physical_half(record, &coord);
                let feature = FeatureId {
                    side: sides[index],
                    half,
                    region: coord.region,
                    row: coord.row,
                    column: coord.column,
                };
                let location = locator.locate(record, &feature)?;
                entries.push(BitMapping {
                    word,
                    bit,
                    tile: record.tile.clone(),
                    kind: record.kind,
                    record: index,
                    region: coord.region,
                    row: coord.row,
                    column: coord.column,
                    half_selector: coord.half_selector,
                    physical_half: half,
                    feature,
                    location,
                });
            }
        }
        Ok(Self {
            shape,
            records,
            entries,
        })
    }

    /// The mapping of `(word, bit)`.
    pub fn lookup(&self, word: u32, bit: u32) -> Result<&BitMapping, MapError> {
        if !self.shape.contains(word, bit) {
            return Err(MapError::OutOfRange {
                word,
                bit,
                words: self.shape.words,
                bits: self.shape.bits,
            });
        }
        let index = word as usize * self.shape.bits as usize + bit as usize;
        self.entries.get(index).ok_or(MapError::OutOfRange {
            word,
            bit,
            words: self.shape.words,
            bits: self.shape.bits,
        })
    }

    /// The memory shape.
    pub fn shape(&self) -> MemoryShape {
        self.shape
    }

    /// The placement records, indexed by [`BitMapping::record`].
    pub fn records(&self) -> &[PlacementRecord] {
        &self.records
    }

    /// All mappings in `word * bits + bit` order.
    pub fn entries(&self) -> &[BitMapping] {
        &self.entries
    }

    /// Iterates over all mappings in order.
    pub fn iter(&self) -> std::slice::Iter<'_, BitMapping> {
        self.entries.iter()
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no mappings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tiles used by the memory, sorted and deduplicated.
    pub fn tiles(&self) -> Vec<&str> {
        let mut tiles: Vec<&str> = self.records.iter().map(|r| r.tile.as_str()).collect();
        tiles.sort_unstable();
        tiles.dedup();
        tiles
    }
}

impl<'a> IntoIterator for &'a MappingTable {
    type Item = &'a BitMapping;
    type IntoIter = std::slice::Iter<'a, BitMapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::GeometryInvariant;
    use crate::locator::SegmentOffset;
    use crate::placement::tests::half_record;
    use crate::placement::{InclusiveRange, TileSide};

    /// A segment table giving every feature bit of both sides a distinct
    /// location: 1024 bits per frame, data before parity, Y0 before Y1.
    pub(crate) fn synthetic_segments() -> SegmentTable {
        let mut table = SegmentTable::new();
        for side in [TileSide::Left, TileSide::Right] {
            for half in 0..2u8 {
                for region in [Region::Data, Region::Parity] {
                    for row in 0..region.row_count() {
                        for column in 0..256 {
                            let region_base = match region {
                                Region::Data => 0,
                                Region::Parity => 64 * 256,
                            };
                            let linear = u32::from(half) * 72 * 256 + region_base + row * 256 + column;
                            table.insert(
                                FeatureId {
                                    side,
                                    half,
                                    region,
                                    row,
                                    column,
                                },
                                SegmentOffset {
                                    frame_offset: linear / 1024,
                                    bit_offset: linear % 1024,
                                },
                            );
                        }
                    }
                }
            }
        }
        table
    }

    #[test]
    fn covering_shape() {
        let mut a = half_record();
        a.slice = InclusiveRange::new(0, 3);
        let mut b = half_record();
        b.addr = InclusiveRange::new(128, 511);
        assert_eq!(
            MemoryShape::covering(&[a, b]),
            Some(MemoryShape { words: 512, bits: 4 })
        );
        assert_eq!(MemoryShape::covering(&[]), None);
    }

    #[test]
    fn build_single_primitive() {
        let segments = synthetic_segments();
        let table = MappingTable::build(
            vec![half_record()],
            MemoryShape { words: 128, bits: 1 },
            &segments,
        )
        .unwrap();
        assert_eq!(table.len(), 128);

        let m = table.lookup(16, 0).unwrap();
        assert_eq!((m.row, m.column, m.physical_half), (1, 0, 0));
        assert_eq!(m.feature.to_string(), "BRAM_L.RAMB18_Y0.INIT_01[000]");
        assert_eq!(m.location.frame, 0x00c0_0000);
        assert_eq!(m.location.bit_offset, 256);
        assert_eq!(m.line_name(), "BRAM_L_X6Y5.RAMB18_Y0.INIT_01");
        assert_eq!(table.tiles(), vec!["BRAM_L_X6Y5"]);
    }

    #[test]
    fn lookup_order_is_row_major() {
        let mut rec = half_record();
        rec.slice = InclusiveRange::new(0, 1);
        rec.data_bits = 2;
        let table = MappingTable::build(
            vec![rec],
            MemoryShape { words: 128, bits: 2 },
            &synthetic_segments(),
        )
        .unwrap();
        for (i, m) in table.iter().enumerate() {
            assert_eq!(i, (m.word * 2 + m.bit) as usize);
        }
        assert!(matches!(
            table.lookup(128, 0),
            Err(MapError::OutOfRange { words: 128, bits: 2, .. })
        ));
        assert!(table.lookup(0, 2).is_err());
    }

    #[test]
    fn gap_detected() {
        let err = MappingTable::build(
            vec![half_record()],
            MemoryShape { words: 129, bits: 1 },
            &synthetic_segments(),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::CoverageGap { word: 128, bit: 0 }));
    }

    #[test]
    fn overlap_detected() {
        let mut b = half_record();
        b.cell = "mem/ram_reg_1".to_string();
        b.addr = InclusiveRange::new(64, 191);
        let err = MappingTable::build(
            vec![half_record(), b],
            MemoryShape { words: 192, bits: 1 },
            &synthetic_segments(),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::CoverageOverlap { word: 64, bit: 0, .. }));
    }

    #[test]
    fn invalid_record_fails_before_mapping() {
        let mut bad = half_record();
        bad.addr = InclusiveRange::new(128, 255);
        bad.parity_bits = 3;
        let err = MappingTable::build(
            vec![half_record(), bad],
            MemoryShape { words: 256, bits: 1 },
            &SegmentTable::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MapError::GeometryInvariantViolation {
                violation: GeometryInvariant::SliceWidth { .. },
                ..
            }
        ));
    }

    #[test]
    fn invalid_tile_rejected() {
        let mut rec = half_record();
        rec.tile = "DSP_L_X1Y1".to_string();
        let err = MappingTable::build(
            vec![rec],
            MemoryShape { words: 128, bits: 1 },
            &synthetic_segments(),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::InvalidTile { .. }));
    }

    #[test]
    fn unresolved_feature() {
        let err = MappingTable::build(
            vec![half_record()],
            MemoryShape { words: 128, bits: 1 },
            &SegmentTable::new(),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::UnresolvedFeature { .. }));
    }

    #[test]
    fn odd_site_row_uses_y1() {
        let mut rec = half_record();
        rec.placement_row = 3;
        let table = MappingTable::build(
            vec![rec],
            MemoryShape { words: 128, bits: 1 },
            &synthetic_segments(),
        )
        .unwrap();
        let m = table.lookup(0, 0).unwrap();
        assert_eq!(m.half_selector, 0);
        assert_eq!(m.physical_half, 1);
        assert_eq!(m.feature.to_string(), "BRAM_L.RAMB18_Y1.INIT_00[000]");
    }

    #[test]
    fn mapping_serializes() {
        let table = MappingTable::build(
            vec![half_record()],
            MemoryShape { words: 128, bits: 1 },
            &synthetic_segments(),
        )
        .unwrap();
        let json = serde_json::to_value(table.lookup(1, 0).unwrap()).unwrap();
        assert_eq!(json["feature"], "BRAM_L.RAMB18_Y0.INIT_00[016]");
        assert_eq!(json["region"], "Data");
        assert_eq!(json["location"]["bit_offset"], 16);
    }
}
