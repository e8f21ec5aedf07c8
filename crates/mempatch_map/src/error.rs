//! Engine errors and their diagnostic form.
//!
//! Every failure here is deterministic: it means the placement description,
//! the tile database or the compared files disagree with the address
//! arithmetic. Nothing is retried.

use crate::mapper::Region;
use crate::verify::Mismatch;
use mempatch_bitstream::BitstreamError;
use mempatch_diagnostics::{Category, Diagnostic, DiagnosticCode};
use std::fmt;

/// A primitive geometry that the vendor width table cannot produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryInvariant {
    /// The slice span differs from `parity_bits + data_bits`.
    SliceWidth {
        /// Span of the slice range.
        slice_span: u32,
        /// Declared parity bits.
        parity_bits: u32,
        /// Declared data bits.
        data_bits: u32,
    },
    /// Read width 72 is only available on a Wide primitive.
    Width72OnHalf,
    /// A region's slice width does not divide the row capacity.
    UnevenRow {
        /// Region being laid out.
        region: Region,
        /// Row capacity in bits.
        row_capacity: u32,
        /// Slice width of the region.
        slice_width: u32,
    },
    /// The address window needs more bits than the region holds.
    Depth {
        /// Region being laid out.
        region: Region,
        /// Slice width of the region.
        slice_width: u32,
        /// Words in the address window.
        depth: u32,
        /// Bits available in the region.
        capacity: u32,
    },
    /// A bit lane falls outside the slice width of its region.
    LaneOverflow {
        /// Region being laid out.
        region: Region,
        /// Lane offset inside the region.
        lane: u32,
        /// Slice width of the region.
        slice_width: u32,
    },
    /// A computed row exceeds the last row of its region.
    RowLimit {
        /// Region being laid out.
        region: Region,
        /// Computed row.
        row: u32,
    },
}

impl fmt::Display for GeometryInvariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryInvariant::SliceWidth {
                slice_span,
                parity_bits,
                data_bits,
            } => write!(
                f,
                "slice spans {slice_span} bits but parity ({parity_bits}) + data ({data_bits}) = {}",
                parity_bits + data_bits
            ),
            GeometryInvariant::Width72OnHalf => {
                write!(f, "read width 72 requires a RAMB36 primitive")
            }
            GeometryInvariant::UnevenRow {
                region,
                row_capacity,
                slice_width,
            } => write!(
                f,
                "{region} slice width {slice_width} does not divide the {row_capacity}-bit row"
            ),
            GeometryInvariant::Depth {
                region,
                slice_width,
                depth,
                capacity,
            } => write!(
                f,
                "{depth} words of {slice_width} {region} bits exceed the {capacity}-bit capacity"
            ),
            GeometryInvariant::LaneOverflow {
                region,
                lane,
                slice_width,
            } => write!(
                f,
                "lane {lane} is outside the {slice_width}-bit {region} slice"
            ),
            GeometryInvariant::RowLimit { region, row } => write!(
                f,
                "{region} row 0x{row:02X} exceeds the last row 0x{:02X}",
                region.row_count() - 1
            ),
        }
    }
}

/// Errors raised by the translation engine.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// A primitive's dimensions are inconsistent with the vendor width table.
    #[error("geometry invariant violated by '{cell}' on {tile}: {violation}")]
    GeometryInvariantViolation {
        /// Cell name.
        cell: String,
        /// Tile name.
        tile: String,
        /// The violated rule.
        violation: GeometryInvariant,
    },

    /// No primitive stores this bit.
    #[error("no primitive covers word {word} bit {bit}")]
    CoverageGap {
        /// Logical word.
        word: u32,
        /// Logical bit.
        bit: u32,
    },

    /// Two primitives claim the same bit.
    #[error("word {word} bit {bit} is covered by both '{first}' and '{second}'")]
    CoverageOverlap {
        /// Logical word.
        word: u32,
        /// Logical bit.
        bit: u32,
        /// First covering cell.
        first: String,
        /// Second covering cell.
        second: String,
    },

    /// The segment table has no entry for a feature bit.
    #[error("feature {feature} is not in the segment table")]
    UnresolvedFeature {
        /// Canonical identifier of the missing feature bit.
        feature: String,
    },

    /// A lookup outside the memory shape.
    #[error("word {word} bit {bit} is outside the {words}x{bits} memory")]
    OutOfRange {
        /// Requested word.
        word: u32,
        /// Requested bit.
        bit: u32,
        /// Words in the memory.
        words: u32,
        /// Bits per word.
        bits: u32,
    },

    /// The three representations disagree on a bit.
    #[error("{0}")]
    VerificationFailure(Box<Mismatch>),

    /// A tile name without a recognizable L/R side.
    #[error("tile '{tile}' is not a BRAM_L or BRAM_R tile")]
    InvalidTile {
        /// The tile name.
        tile: String,
    },

    /// A mapped frame is absent from the bitstream.
    #[error("frame 0x{frame:08x} holding word {word} bit {bit} is not in the bitstream")]
    MissingFrame {
        /// Frame address.
        frame: u32,
        /// Logical word.
        word: u32,
        /// Logical bit.
        bit: u32,
    },

    /// A FASM row name or width that no primitive can have.
    #[error("invalid feature row {name}: {reason}")]
    InvalidFeatureRow {
        /// FASM line name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A frame image rejected a write.
    #[error(transparent)]
    Bitstream(#[from] BitstreamError),
}

impl MapError {
    /// Stable diagnostic code for this error kind.
    pub fn code(&self) -> DiagnosticCode {
        let number = match self {
            MapError::GeometryInvariantViolation { .. } => 1,
            MapError::CoverageGap { .. } => 2,
            MapError::CoverageOverlap { .. } => 3,
            MapError::UnresolvedFeature { .. } => 4,
            MapError::OutOfRange { .. } => 5,
            MapError::VerificationFailure(_) => 6,
            MapError::InvalidTile { .. } => 7,
            MapError::MissingFrame { .. } => 8,
            MapError::InvalidFeatureRow { .. } => 9,
            MapError::Bitstream(_) => 10,
        };
        DiagnosticCode::new(Category::Mapping, number)
    }

    /// Converts this error into an error diagnostic located at `location`.
    pub fn to_diagnostic(&self, location: &str) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string()).at(location);
        match self {
            MapError::GeometryInvariantViolation { .. } => diag
                .with_help("the placement description does not match the RAMB width table"),
            MapError::CoverageGap { .. } | MapError::CoverageOverlap { .. } => {
                diag.with_help("the MDD cells do not tile the memory exactly once")
            }
            MapError::UnresolvedFeature { .. } => {
                diag.with_help("check that the database family matches the part")
            }
            MapError::VerificationFailure(m) => diag
                .with_note(format!(
                    "init={} fasm={} bitstream={}",
                    m.init as u8, m.feature as u8, m.frame as u8
                ))
                .with_note(format!(
                    "feature {} -> frame 0x{:08x} bit {} (word {} = 0x{:08x})",
                    m.mapping.feature,
                    m.mapping.location.frame,
                    m.mapping.location.bit_offset,
                    m.mapping.location.word_index(),
                    m.frame_word
                )),
            _ => diag,
        }
    }
}
