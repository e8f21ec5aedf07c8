//! Block-RAM bit-address translation for Xilinx 7-series devices.
//!
//! A logical memory is backed by one or more block-RAM primitives, each
//! described by a [`PlacementRecord`]. For every `(word, bit)` of the memory
//! this crate computes where the bit lives in FASM feature space (an
//! `INIT_xx`/`INITP_xx` row and column of one RAMB18 half) and in the
//! configuration bitstream (a frame address and a bit offset inside it).
//!
//! Components, leaf first:
//!
//! - [`mapper`]: `(record, word, bit)` to [`FeatureCoord`] and back
//! - [`feature`]: feature identifiers, row padding, Y0/Y1 interleave
//! - [`locator`]: feature identifiers to frame locations via a [`SegmentTable`]
//! - [`table`]: the per-bit [`MappingTable`] of one memory
//! - [`verify`]: three-way init / FASM / bitstream cross check
//! - [`reconstruct`]: rebuilding one representation from another
//!
//! Everything here is pure arithmetic over structured records. Parsing of
//! MDD, FASM, segbits and BIT files lives in the adapter crates.

#![warn(missing_docs)]

pub mod error;
pub mod feature;
pub mod geometry;
pub mod init;
pub mod locator;
pub mod mapper;
pub mod placement;
pub mod reconstruct;
pub mod table;
pub mod verify;

pub use error::{GeometryInvariant, MapError};
pub use feature::{
    deinterleave, feature_line_name, interleave, physical_half, FeatureId, FeatureRows,
    ParseFeatureError, ROW_BITS,
};
pub use geometry::{PrimitiveGeometry, SliceWidths};
pub use init::InitImage;
pub use locator::{FrameLocation, FrameLocator, SegmentOffset, SegmentTable};
pub use mapper::{map_bit, AddressMapper, FeatureCoord, Region};
pub use placement::{FrameSegment, InclusiveRange, PlacementRecord, PrimitiveKind, TileSide};
pub use reconstruct::Reconstructor;
pub use table::{BitMapping, MappingTable, MemoryShape};
pub use verify::{Mismatch, Verifier, VerifyState, VerifySummary};
