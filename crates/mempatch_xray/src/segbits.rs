//! Parser for Project X-Ray block-RAM segbits files.
//!
//! The `segbits_bram_{l,r}.block_ram.db` files map every INIT/INITP bit of a
//! BRAM tile to one position in the tile's frame segment.
//!
//! # Format
//!
//! ```text
//! BRAM_L.RAMB18_Y0.INIT_00[000] 00_0
//! BRAM_L.RAMB18_Y1.INITP_07[255] 127_319
//! BRAM_L.RAMB18_Y0.IN_USE 27_100 !27_101
//! ```
//!
//! Each bit entry has the format `[!]frame_bit`, where `frame` is the frame
//! offset from the tile's base address and `bit` is the bit position inside
//! the tile's words of that frame. Features other than INIT/INITP bits are
//! skipped.

use mempatch_map::{FeatureId, SegmentOffset, SegmentTable, TileSide};

/// A single bit position within a segbits entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegBitEntry {
    /// Frame offset relative to the tile's base address.
    pub frame_offset: u32,
    /// Bit position within the tile's word range in that frame.
    pub bit_position: u32,
    /// If true, the bit must be 0 for the feature to be active.
    pub inverted: bool,
}

/// Parses a single bit specifier like "00_14" or "!01_42".
///
/// # Errors
///
/// Returns an error string if the format is invalid.
pub fn parse_bit_spec(spec: &str) -> Result<SegBitEntry, String> {
    let (inverted, rest) = match spec.strip_prefix('!') {
        Some(s) => (true, s),
        None => (false, spec),
    };

    let (frame, bit) = rest.split_once('_').ok_or_else(|| {
        format!("invalid bit spec '{spec}': expected format 'frame_bit' or '!frame_bit'")
    })?;
    let frame_offset = frame
        .parse::<u32>()
        .map_err(|e| format!("invalid frame offset in '{spec}': {e}"))?;
    let bit_position = bit
        .parse::<u32>()
        .map_err(|e| format!("invalid bit position in '{spec}': {e}"))?;

    Ok(SegBitEntry {
        frame_offset,
        bit_position,
        inverted,
    })
}

/// Returns true if `feature` names an INIT or INITP bit.
fn is_init_feature(feature: &str) -> bool {
    feature
        .splitn(3, '.')
        .nth(2)
        .is_some_and(|f| f.starts_with("INIT_") || f.starts_with("INITP_"))
}

/// Parses a block-RAM segbits file and adds its INIT/INITP bits to `table`.
///
/// Returns the number of entries added. Empty lines and `#` comments are
/// skipped, as are features that are not INIT/INITP bits.
///
/// # Errors
///
/// Returns an error string if an INIT/INITP line is malformed, has other
/// than one non-inverted bit, or repeats a feature.
pub fn parse_segbits_into(content: &str, table: &mut SegmentTable) -> Result<usize, String> {
    let mut added = 0;
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(feature) = parts.next() else {
            continue;
        };
        if !is_init_feature(feature) {
            continue;
        }

        let id: FeatureId = feature
            .parse()
            .map_err(|e| format!("line {}: {e}", line_no + 1))?;
        let bits = parts
            .map(parse_bit_spec)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("line {}: {e}", line_no + 1))?;
        let entry = match bits.as_slice() {
            [entry] if !entry.inverted => *entry,
            _ => {
                return Err(format!(
                    "line {}: feature '{feature}' must map to exactly one non-inverted bit",
                    line_no + 1
                ))
            }
        };

        let offset = SegmentOffset {
            frame_offset: entry.frame_offset,
            bit_offset: entry.bit_position,
        };
        if table.insert(id, offset).is_some() {
            return Err(format!(
                "line {}: duplicate feature '{feature}'",
                line_no + 1
            ));
        }
        added += 1;
    }
    Ok(added)
}

/// Parses a block-RAM segbits file into a new [`SegmentTable`].
///
/// # Errors
///
/// See [`parse_segbits_into`].
pub fn parse_segbits(content: &str) -> Result<SegmentTable, String> {
    let mut table = SegmentTable::new();
    parse_segbits_into(content, &mut table)?;
    Ok(table)
}

/// Returns the segbits file name for BRAM tiles of the given side.
pub fn segbits_filename(side: TileSide) -> String {
    format!(
        "segbits_bram_{}.block_ram.db",
        side.letter().to_ascii_lowercase()
    )
}
