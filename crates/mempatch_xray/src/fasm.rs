//! Reading and writing the block-RAM INIT/INITP lines of FASM files.
//!
//! FASM is a line-oriented text format where each line sets one feature of
//! the FPGA configuration. Block-RAM content appears as 256-bit rows:
//!
//! ```text
//! BRAM_L_X6Y5.RAMB18_Y0.INIT_07[255:0] = 256'b1011...
//! BRAM_L_X6Y5.RAMB18_Y1.INITP_00[15:0] = 16'h8001
//! BRAM_L_X6Y5.RAMB18_Y0.INIT_00[3]
//! ```
//!
//! Values are MSB first and rows that are all zero are usually omitted.
//! Every other line is passed through untouched when patching.

use mempatch_common::BitVec;
use mempatch_map::{feature_line_name, FeatureRows, Region, ROW_BITS};
use std::collections::BTreeSet;

/// One INIT or INITP assignment in a FASM file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FasmInitLine {
    /// Tile name, e.g. `BRAM_L_X6Y5`.
    pub tile: String,
    /// RAMB18 half (0 or 1).
    pub half: u8,
    /// Data (`INIT`) or parity (`INITP`).
    pub region: Region,
    /// Row index.
    pub row: u32,
    /// Lowest column the value is written to.
    pub low: u32,
    /// Value, LSB at column `low`.
    pub value: BitVec,
}

impl FasmInitLine {
    /// Builds the line for a whole row, or `None` if the row is all zero.
    pub fn from_row(tile: &str, half: u8, region: Region, row: u32, value: &BitVec) -> Option<Self> {
        if value.is_all_zero() {
            return None;
        }
        Some(Self {
            tile: tile.to_string(),
            half,
            region,
            row,
            low: 0,
            value: value.clone(),
        })
    }

    /// Parses one FASM line.
    ///
    /// Returns `Ok(None)` for blank lines, comments and features that are not
    /// block-RAM INIT/INITP rows.
    ///
    /// # Errors
    ///
    /// Returns an error string if an INIT/INITP line has a bad row, range or
    /// value.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (lhs, rhs) = match line.split_once('=') {
            Some((l, r)) => (l.trim(), Some(r.trim())),
            None => (line, None),
        };

        let mut parts = lhs.splitn(3, '.');
        let (tile, site, feature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(s), Some(f)) => (t, s, f),
            _ => return Ok(None),
        };
        if !tile.starts_with("BRAM_") {
            return Ok(None);
        }
        let half = match site {
            "RAMB18_Y0" => 0,
            "RAMB18_Y1" => 1,
            _ => return Ok(None),
        };
        let (name, range) = match feature.split_once('[') {
            Some((n, r)) => (n, Some(r)),
            None => (feature, None),
        };
        let (region, row) = if let Some(row) = name.strip_prefix("INITP_") {
            (Region::Parity, row)
        } else if let Some(row) = name.strip_prefix("INIT_") {
            (Region::Data, row)
        } else {
            return Ok(None);
        };

        let row = u32::from_str_radix(row, 16).map_err(|_| format!("bad row in '{lhs}'"))?;
        if row >= region.row_count() {
            return Err(format!(
                "'{lhs}': {} has only {} rows",
                region.keyword(),
                region.row_count()
            ));
        }
        let (high, low) = match range {
            None => (ROW_BITS - 1, 0),
            Some(r) => parse_range(r).ok_or_else(|| format!("bad bit range in '{lhs}'"))?,
        };
        if low > high || high >= ROW_BITS {
            return Err(format!("bit range of '{lhs}' is outside the row"));
        }

        let width = high - low + 1;
        let value = match rhs {
            None => BitVec::from_u64(1, width),
            Some(v) => parse_value(v, width).map_err(|e| format!("'{lhs}': {e}"))?,
        };
        Ok(Some(Self {
            tile: tile.to_string(),
            half,
            region,
            row,
            low,
            value,
        }))
    }

    /// FASM name of the row, e.g. `BRAM_L_X6Y5.RAMB18_Y0.INIT_07`.
    pub fn feature_name(&self) -> String {
        feature_line_name(&self.tile, self.half, self.region, self.row)
    }

    /// Formats this assignment as a FASM line.
    ///
    /// Leading zeros are trimmed and the range shrinks to match, e.g.
    /// `BRAM_L_X6Y5.RAMB18_Y0.INIT_07[4:0] = 5'b10110`.
    pub fn to_fasm_line(&self) -> String {
        let bits = self.value.to_trimmed_binary_string();
        let n = bits.len() as u32;
        format!(
            "{}[{}:{}] = {n}'b{bits}",
            self.feature_name(),
            self.low + n - 1,
            self.low
        )
    }
}

/// Parses `hi:lo` or `n` followed by `]`.
fn parse_range(range: &str) -> Option<(u32, u32)> {
    let range = range.strip_suffix(']')?;
    match range.split_once(':') {
        Some((hi, lo)) => Some((hi.trim().parse().ok()?, lo.trim().parse().ok()?)),
        None => {
            let bit = range.trim().parse().ok()?;
            Some((bit, bit))
        }
    }
}

/// Parses a Verilog-style literal (`16'hbeef`, `4'b1010`, `'b1`) or a plain
/// decimal number into `width` bits.
fn parse_value(text: &str, width: u32) -> Result<BitVec, String> {
    if let Some((_, literal)) = text.split_once('\'') {
        let mut chars = literal.chars();
        let base = chars.next().map(|c| c.to_ascii_lowercase());
        let digits = chars.as_str();
        let parsed = match base {
            Some('b') => BitVec::from_binary_str(digits, width),
            Some('h') => BitVec::from_hex_str(digits, width),
            Some('d') => {
                let n: u64 = digits
                    .parse()
                    .map_err(|_| format!("bad decimal value '{text}'"))?;
                return decimal(n, width, text);
            }
            _ => return Err(format!("unsupported value '{text}'")),
        };
        return parsed.map_err(|e| e.to_string());
    }
    let n: u64 = text.parse().map_err(|_| format!("bad value '{text}'"))?;
    decimal(n, width, text)
}

fn decimal(n: u64, width: u32, text: &str) -> Result<BitVec, String> {
    if width < 64 && n >> width != 0 {
        return Err(format!("value '{text}' does not fit in {width} bits"));
    }
    Ok(BitVec::from_u64(n, width))
}

/// Reads every block-RAM INIT/INITP row from FASM text.
///
/// A line assigns only the columns of its range; later lines for the same
/// row overwrite earlier ones where they overlap.
///
/// # Errors
///
/// Returns an error string, prefixed with the line number, for malformed
/// INIT/INITP lines.
pub fn read_init_rows(text: &str) -> Result<FeatureRows, String> {
    let mut rows = FeatureRows::new();
    for (line_no, line) in text.lines().enumerate() {
        let parsed =
            FasmInitLine::parse(line).map_err(|e| format!("line {}: {e}", line_no + 1))?;
        let Some(init) = parsed else {
            continue;
        };
        let mut row = rows
            .row(&init.tile, init.half, init.region, init.row)
            .cloned()
            .unwrap_or_else(|| BitVec::new(ROW_BITS));
        for (i, bit) in init.value.iter().enumerate() {
            row.set(init.low + i as u32, bit);
        }
        rows.insert_row(&init.tile, init.half, init.region, init.row, row)
            .map_err(|e| format!("line {}: {e}", line_no + 1))?;
    }
    Ok(rows)
}

/// Renders the non-zero rows of `rows` as FASM lines, sorted by tile, half,
/// region and row.
pub fn render_init_lines(rows: &FeatureRows) -> Vec<FasmInitLine> {
    rows.iter()
        .filter_map(|(tile, half, region, row, value)| {
            FasmInitLine::from_row(tile, half, region, row, value)
        })
        .collect()
}

/// Replaces the INIT/INITP content of a FASM file with `rows`.
///
/// Every existing line of a (tile, half, region) present in `rows` is
/// removed, then the non-zero rows are inserted into their tile's block in
/// sorted position. With `partial`, only lines of the patched tiles are kept,
/// with a blank line between tiles.
///
/// # Errors
///
/// Returns an error string if the original contains a malformed INIT/INITP
/// line.
pub fn patch_fasm(original: &str, rows: &FeatureRows, partial: bool) -> Result<String, String> {
    let owned: BTreeSet<(&str, u8, Region)> = rows
        .iter()
        .map(|(tile, half, region, _, _)| (tile, half, region))
        .collect();

    let mut lines: Vec<String> = Vec::new();
    for (line_no, line) in original.lines().enumerate() {
        let parsed =
            FasmInitLine::parse(line).map_err(|e| format!("line {}: {e}", line_no + 1))?;
        let replaced = parsed.is_some_and(|l| owned.contains(&(l.tile.as_str(), l.half, l.region)));
        if !replaced {
            lines.push(line.to_string());
        }
    }

    for init in render_init_lines(rows) {
        let text = init.to_fasm_line();
        let prefix = format!("{}.", init.tile);
        let at = lines
            .iter()
            .position(|l| l.starts_with(&prefix) && *l > text)
            .or_else(|| {
                lines
                    .iter()
                    .rposition(|l| l.starts_with(&prefix))
                    .map(|i| i + 1)
            })
            .unwrap_or(lines.len());
        lines.insert(at, text);
    }

    let mut out = String::new();
    if partial {
        let tiles = rows.tiles();
        let mut current: Option<&str> = None;
        for line in &lines {
            let Some(tile) = tiles
                .iter()
                .find(|t| line.strip_prefix(**t).is_some_and(|r| r.starts_with('.')))
            else {
                continue;
            };
            if current.is_some_and(|c| c != *tile) {
                out.push('\n');
            }
            current = Some(*tile);
            out.push_str(line);
            out.push('\n');
        }
    } else {
        for line in &lines {
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> FasmInitLine {
        FasmInitLine::parse(line).unwrap().unwrap()
    }

    #[test]
    fn parse_binary_row() {
        let l = parse("BRAM_L_X6Y5.RAMB18_Y0.INIT_07[255:0] = 256'b101");
        assert_eq!(l.tile, "BRAM_L_X6Y5");
        assert_eq!((l.half, l.region, l.row, l.low), (0, Region::Data, 7, 0));
        assert_eq!(l.value.width(), 256);
        assert!(l.value.get(0));
        assert!(!l.value.get(1));
        assert!(l.value.get(2));
    }

    #[test]
    fn parse_hex_parity_row() {
        let l = parse("BRAM_R_X7Y5.RAMB18_Y1.INITP_05[15:0] = 16'h8001");
        assert_eq!((l.half, l.region, l.row), (1, Region::Parity, 5));
        assert_eq!(l.value.to_u64(), Some(0x8001));
    }

    #[test]
    fn parity_row_limit() {
        assert!(FasmInitLine::parse("BRAM_R_X7Y5.RAMB18_Y1.INITP_07[15:0] = 16'h1").is_ok());
        let err = FasmInitLine::parse("BRAM_R_X7Y5.RAMB18_Y1.INITP_0A[15:0] = 16'h8001")
            .unwrap_err();
        assert!(err.contains("INITP has only 8 rows"), "{err}");
    }

    #[test]
    fn parse_single_bit_feature() {
        let l = parse("BRAM_L_X6Y5.RAMB18_Y1.INIT_3F[200]");
        assert_eq!((l.row, l.low), (63, 200));
        assert_eq!(l.value.width(), 1);
        assert!(l.value.get(0));
    }

    #[test]
    fn parse_decimal_value() {
        let l = parse("BRAM_L_X6Y5.RAMB18_Y0.INIT_00[7:4] = 9");
        assert_eq!(l.low, 4);
        assert_eq!(l.value.to_u64(), Some(9));
        assert!(FasmInitLine::parse("BRAM_L_X6Y5.RAMB18_Y0.INIT_00[7:4] = 4'd16").is_err());
    }

    #[test]
    fn other_lines_are_skipped() {
        for line in [
            "",
            "# comment",
            "BRAM_L_X6Y5.RAMB18_Y0.IN_USE",
            "BRAM_L_X6Y5.RAMB18_Y0.READ_WIDTH_A_18",
            "CLBLL_L_X2Y5.SLICEL_X0.ALUT.INIT[63:0] = 64'h1",
            "BRAM_L_X6Y5.RAMB36.EN_ECC_READ",
        ] {
            assert_eq!(FasmInitLine::parse(line).unwrap(), None, "{line}");
        }
    }

    #[test]
    fn malformed_init_lines() {
        assert!(FasmInitLine::parse("BRAM_L_X6Y5.RAMB18_Y0.INIT_40[255:0] = 1'b1").is_err());
        assert!(FasmInitLine::parse("BRAM_L_X6Y5.RAMB18_Y0.INITP_08[255:0] = 1'b1").is_err());
        assert!(FasmInitLine::parse("BRAM_L_X6Y5.RAMB18_Y0.INIT_00[256:0] = 1'b1").is_err());
        assert!(FasmInitLine::parse("BRAM_L_X6Y5.RAMB18_Y0.INIT_00[3:0] = 4'b10000").is_err());
        assert!(FasmInitLine::parse("BRAM_L_X6Y5.RAMB18_Y0.INIT_00[3:0] = 4'q1").is_err());
    }

    #[test]
    fn line_renders_trimmed() {
        let mut v = BitVec::new(256);
        v.set(1, true);
        v.set(4, true);
        let l = FasmInitLine::from_row("BRAM_L_X6Y5", 0, Region::Data, 10, &v).unwrap();
        assert_eq!(l.to_fasm_line(), "BRAM_L_X6Y5.RAMB18_Y0.INIT_0A[4:0] = 5'b10010");
        assert!(FasmInitLine::from_row("T", 0, Region::Data, 0, &BitVec::new(256)).is_none());
    }

    #[test]
    fn rendered_line_parses_back() {
        let mut v = BitVec::new(256);
        v.set(255, true);
        v.set(17, true);
        let l = FasmInitLine::from_row("BRAM_R_X7Y5", 1, Region::Parity, 3, &v).unwrap();
        let back = parse(&l.to_fasm_line());
        let rows = read_init_rows(&l.to_fasm_line()).unwrap();
        assert_eq!(back.value.width(), 256);
        assert_eq!(rows.row("BRAM_R_X7Y5", 1, Region::Parity, 3), Some(&v));
    }

    #[test]
    fn read_rows_merges_ranges() {
        let text = "\
BRAM_L_X6Y5.RAMB18_Y0.INIT_00[7:0] = 8'hff
BRAM_L_X6Y5.RAMB18_Y0.INIT_00[3:0] = 4'h0
BRAM_L_X6Y5.RAMB18_Y0.INIT_00[100]
";
        let rows = read_init_rows(text).unwrap();
        let row = rows.row("BRAM_L_X6Y5", 0, Region::Data, 0).unwrap();
        assert_eq!(row.count_ones(), 5);
        assert!(!row.get(3));
        assert!(row.get(4));
        assert!(row.get(100));
    }

    #[test]
    fn read_rows_reports_line_number() {
        let text = "BRAM_L_X6Y5.RAMB18_Y0.IN_USE\nBRAM_L_X6Y5.RAMB18_Y0.INIT_00[0:0] = 1'bx\n";
        let err = read_init_rows(text).unwrap_err();
        assert!(err.starts_with("line 2:"));
    }

    fn rows_with(tile: &str, half: u8, region: Region, row: u32, bits: &[u32]) -> FeatureRows {
        let mut rows = FeatureRows::new();
        let mut v = BitVec::new(256);
        for &b in bits {
            v.set(b, true);
        }
        rows.insert_row(tile, half, region, row, v).unwrap();
        rows
    }

    const ORIGINAL: &str = "\
BRAM_L_X6Y5.RAMB18_Y0.INIT_00[0:0] = 1'b1
BRAM_L_X6Y5.RAMB18_Y0.INIT_02[1:0] = 2'b11
BRAM_L_X6Y5.RAMB18_Y0.IN_USE
BRAM_L_X6Y5.RAMB18_Y1.INIT_00[0:0] = 1'b1
CLBLL_L_X2Y5.SLICEL_X0.AFF.ZINI
";

    #[test]
    fn patch_replaces_owned_rows_in_place() {
        let rows = rows_with("BRAM_L_X6Y5", 0, Region::Data, 1, &[2]);
        let out = patch_fasm(ORIGINAL, &rows, false).unwrap();
        assert_eq!(
            out,
            "\
BRAM_L_X6Y5.RAMB18_Y0.INIT_01[2:0] = 3'b100
BRAM_L_X6Y5.RAMB18_Y0.IN_USE
BRAM_L_X6Y5.RAMB18_Y1.INIT_00[0:0] = 1'b1
CLBLL_L_X2Y5.SLICEL_X0.AFF.ZINI
"
        );
    }

    #[test]
    fn patch_appends_new_tile() {
        let rows = rows_with("BRAM_R_X7Y5", 1, Region::Parity, 0, &[0]);
        let out = patch_fasm(ORIGINAL, &rows, false).unwrap();
        assert!(out.starts_with(ORIGINAL));
        assert!(out.ends_with("BRAM_R_X7Y5.RAMB18_Y1.INITP_00[0:0] = 1'b1\n"));
    }

    #[test]
    fn patch_partial_keeps_patched_tiles() {
        let mut rows = rows_with("BRAM_L_X6Y5", 1, Region::Data, 0, &[1]);
        rows.insert_row("BRAM_R_X7Y5", 0, Region::Data, 0, BitVec::from_u64(1, 1))
            .unwrap();
        let out = patch_fasm(ORIGINAL, &rows, true).unwrap();
        assert_eq!(
            out,
            "\
BRAM_L_X6Y5.RAMB18_Y0.INIT_00[0:0] = 1'b1
BRAM_L_X6Y5.RAMB18_Y0.INIT_02[1:0] = 2'b11
BRAM_L_X6Y5.RAMB18_Y0.IN_USE
BRAM_L_X6Y5.RAMB18_Y1.INIT_00[1:0] = 2'b10

BRAM_R_X7Y5.RAMB18_Y0.INIT_00[0:0] = 1'b1
"
        );
    }

    #[test]
    fn patch_with_zero_rows_clears_lines() {
        let mut rows = FeatureRows::new();
        rows.insert_row("BRAM_L_X6Y5", 0, Region::Data, 0, BitVec::new(256))
            .unwrap();
        let out = patch_fasm(ORIGINAL, &rows, false).unwrap();
        assert!(!out.contains("RAMB18_Y0.INIT_"));
        assert!(out.contains("RAMB18_Y1.INIT_00"));
    }
}
