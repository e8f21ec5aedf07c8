//! Primitive geometry: slice widths from the read width and their checks.

use crate::error::{GeometryInvariant, MapError};
use crate::mapper::Region;
use crate::placement::{PlacementRecord, PrimitiveKind};

/// Data and parity slice widths for one read width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceWidths {
    /// Bits per word in the data region.
    pub data: u32,
    /// Bits per word in the parity region.
    pub parity: u32,
}

impl SliceWidths {
    /// Looks up the vendor width table.
    ///
    /// Read widths 72, 36, 18 and 9 carry parity; any other width is all data.
    pub fn for_read_width(read_width: u32) -> Self {
        let (data, parity) = match read_width {
            72 => (64, 8),
            36 => (32, 4),
            18 => (16, 2),
            9 => (8, 1),
            w => (w, 0),
        };
        Self { data, parity }
    }

    /// Width of one region.
    pub fn of(&self, region: Region) -> u32 {
        match region {
            Region::Data => self.data,
            Region::Parity => self.parity,
        }
    }
}

/// A validated primitive geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveGeometry {
    /// Primitive kind.
    pub kind: PrimitiveKind,
    /// Region slice widths.
    pub widths: SliceWidths,
    /// Bit lanes the primitive holds.
    pub slice_width: u32,
    /// Words in the address window.
    pub depth: u32,
}

impl PrimitiveGeometry {
    /// Checks a record against the width table and the primitive capacity.
    ///
    /// The slice-width rule is checked before anything else. Depth is checked
    /// as an upper bound: the vendor flow maps small memories onto a full
    /// primitive, so the window may use only part of a region.
    pub fn validate(record: &PlacementRecord) -> Result<Self, MapError> {
        let fail = |violation| MapError::GeometryInvariantViolation {
            cell: record.cell.clone(),
            tile: record.tile.clone(),
            violation,
        };

        let slice_width = record.slice.span();
        if slice_width != record.parity_bits + record.data_bits {
            return Err(fail(GeometryInvariant::SliceWidth {
                slice_span: slice_width,
                parity_bits: record.parity_bits,
                data_bits: record.data_bits,
            }));
        }
        if record.read_width == 72 && record.kind == PrimitiveKind::Half {
            return Err(fail(GeometryInvariant::Width72OnHalf));
        }

        let kind = record.kind;
        let widths = SliceWidths::for_read_width(record.read_width);
        let depth = record.addr.span();
        for region in [Region::Data, Region::Parity] {
            let width = widths.of(region);
            if width == 0 {
                if region == Region::Data {
                    return Err(fail(GeometryInvariant::UnevenRow {
                        region,
                        row_capacity: kind.row_capacity(),
                        slice_width: 0,
                    }));
                }
                continue;
            }
            if kind.row_capacity() % width != 0 {
                return Err(fail(GeometryInvariant::UnevenRow {
                    region,
                    row_capacity: kind.row_capacity(),
                    slice_width: width,
                }));
            }
            let capacity = match region {
                Region::Data => kind.data_capacity(),
                Region::Parity => kind.parity_capacity(),
            };
            if u64::from(width) * u64::from(depth) > u64::from(capacity) {
                return Err(fail(GeometryInvariant::Depth {
                    region,
                    slice_width: width,
                    depth,
                    capacity,
                }));
            }
        }

        Ok(Self {
            kind,
            widths,
            slice_width,
            depth,
        })
    }

    /// Words that fit in one row of `region`, or `None` if the region is empty.
    pub fn words_per_row(&self, region: Region) -> Option<u32> {
        match self.widths.of(region) {
            0 => None,
            w => Some(self.kind.row_capacity() / w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::tests::half_record;
    use crate::placement::InclusiveRange;

    #[test]
    fn width_table() {
        assert_eq!(SliceWidths::for_read_width(72), SliceWidths { data: 64, parity: 8 });
        assert_eq!(SliceWidths::for_read_width(36), SliceWidths { data: 32, parity: 4 });
        assert_eq!(SliceWidths::for_read_width(18), SliceWidths { data: 16, parity: 2 });
        assert_eq!(SliceWidths::for_read_width(9), SliceWidths { data: 8, parity: 1 });
        assert_eq!(SliceWidths::for_read_width(4), SliceWidths { data: 4, parity: 0 });
        assert_eq!(SliceWidths::for_read_width(1), SliceWidths { data: 1, parity: 0 });
    }

    #[test]
    fn boundary_record_is_valid() {
        let g = PrimitiveGeometry::validate(&half_record()).unwrap();
        assert_eq!(g.widths, SliceWidths { data: 16, parity: 2 });
        assert_eq!(g.depth, 128);
        assert_eq!(g.words_per_row(Region::Data), Some(16));
        assert_eq!(g.words_per_row(Region::Parity), Some(128));
    }

    #[test]
    fn slice_width_checked_first() {
        let mut rec = half_record();
        rec.slice = InclusiveRange::new(0, 3);
        rec.read_width = 72;
        let err = PrimitiveGeometry::validate(&rec).unwrap_err();
        assert!(matches!(
            err,
            MapError::GeometryInvariantViolation {
                violation: GeometryInvariant::SliceWidth { slice_span: 4, .. },
                ..
            }
        ));
    }

    #[test]
    fn width_72_on_half_rejected() {
        let mut rec = half_record();
        rec.read_width = 72;
        let err = PrimitiveGeometry::validate(&rec).unwrap_err();
        assert!(matches!(
            err,
            MapError::GeometryInvariantViolation {
                violation: GeometryInvariant::Width72OnHalf,
                ..
            }
        ));
    }

    #[test]
    fn uneven_row_rejected() {
        let mut rec = half_record();
        rec.read_width = 3;
        let err = PrimitiveGeometry::validate(&rec).unwrap_err();
        assert!(matches!(
            err,
            MapError::GeometryInvariantViolation {
                violation: GeometryInvariant::UnevenRow { slice_width: 3, .. },
                ..
            }
        ));
    }

    #[test]
    fn depth_beyond_capacity_rejected() {
        let mut rec = half_record();
        rec.addr = InclusiveRange::new(0, 1024);
        let err = PrimitiveGeometry::validate(&rec).unwrap_err();
        assert!(matches!(
            err,
            MapError::GeometryInvariantViolation {
                violation: GeometryInvariant::Depth { depth: 1025, .. },
                ..
            }
        ));
    }

    #[test]
    fn full_depth_accepted() {
        let mut rec = half_record();
        rec.addr = InclusiveRange::new(1024, 2047);
        assert!(PrimitiveGeometry::validate(&rec).is_ok());
    }

    #[test]
    fn zero_read_width_rejected() {
        let mut rec = half_record();
        rec.read_width = 0;
        assert!(PrimitiveGeometry::validate(&rec).is_err());
    }
}
