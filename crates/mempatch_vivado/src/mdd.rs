//! Parser for Vivado memory design description (`.mdd`) files.
//!
//! An MDD file lists one block per block-RAM cell:
//!
//! ```text
//! CELL mem/ram_reg_0
//!   CELLTYPE                   RAMB18E1
//!   TILE                       BRAM_L_X6Y5
//!   LOC                        RAMB18_X0Y2
//!   MEM.PORTA.DATA_BIT_LAYOUT  p0_d1
//!   RTL_RAM_NAME               ram
//!   RAM_MODE                   TDP
//!   READ_WIDTH_A               18
//!   BRAM_ADDR_BEGIN            0
//!   BRAM_ADDR_END              127
//!   BRAM_SLICE_BEGIN           0
//!   BRAM_SLICE_END             0
//! ENDCELL
//! ```
//!
//! Keys not listed above are kept but not interpreted.

use crate::error::MddError;
use mempatch_map::{
    FrameSegment, InclusiveRange, MemoryShape, PlacementRecord, PrimitiveKind,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

/// One block-RAM cell of a design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MddCell {
    /// Hierarchical cell name, e.g. `mem/ram_reg_0`.
    pub name: String,
    /// `CELLTYPE`, e.g. `RAMB36E1`.
    pub cell_type: String,
    /// Primitive geometry derived from the cell type.
    pub kind: PrimitiveKind,
    /// `TILE`, e.g. `BRAM_L_X6Y5`.
    pub tile: String,
    /// Site, e.g. `RAMB18_X0Y2`.
    pub loc: String,
    /// Y coordinate of the site.
    pub placement_row: u32,
    /// Logical bits in the parity region.
    pub parity_bits: u32,
    /// Logical bits in the data region.
    pub data_bits: u32,
    /// `RTL_RAM_NAME`.
    pub ram_name: String,
    /// `RAM_MODE`, e.g. `TDP` or `SDP`.
    pub ram_mode: String,
    /// `READ_WIDTH_A`.
    pub read_width: u32,
    /// Logical words held by the cell.
    pub addr: InclusiveRange,
    /// Logical bit lanes held by the cell.
    pub slice: InclusiveRange,
    /// Every key of the block, as written.
    #[serde(skip)]
    pub keys: BTreeMap<String, String>,
}

impl MddCell {
    fn from_keys(name: String, keys: BTreeMap<String, String>) -> Result<Self, MddError> {
        let get = |key: &'static str| {
            keys.get(key)
                .map(String::as_str)
                .ok_or_else(|| MddError::MissingKey {
                    cell: name.clone(),
                    key,
                })
        };
        let invalid = |key: &'static str, value: &str| MddError::InvalidValue {
            cell: name.clone(),
            key,
            value: value.to_string(),
        };
        let number = |key: &'static str| -> Result<u32, MddError> {
            let value = get(key)?;
            value.parse().map_err(|_| invalid(key, value))
        };

        let cell_type = get("CELLTYPE")?.to_string();
        let kind = PrimitiveKind::from_cell_type(&cell_type).ok_or_else(|| {
            MddError::UnsupportedCellType {
                cell: name.clone(),
                cell_type: cell_type.clone(),
            }
        })?;

        let loc = match keys.get("LOC").or_else(|| keys.get("CELLPLACEMENT")) {
            Some(loc) => loc.clone(),
            None => {
                return Err(MddError::MissingKey {
                    cell: name.clone(),
                    key: "LOC",
                })
            }
        };
        let placement_row = loc
            .rsplit_once('Y')
            .and_then(|(_, y)| y.parse().ok())
            .ok_or_else(|| invalid("LOC", &loc))?;

        let layout = get("MEM.PORTA.DATA_BIT_LAYOUT")?;
        let (parity_bits, data_bits) =
            parse_layout(layout).ok_or_else(|| invalid("MEM.PORTA.DATA_BIT_LAYOUT", layout))?;

        let addr = InclusiveRange::new(number("BRAM_ADDR_BEGIN")?, number("BRAM_ADDR_END")?);
        let slice = InclusiveRange::new(number("BRAM_SLICE_BEGIN")?, number("BRAM_SLICE_END")?);
        if addr.end < addr.begin {
            return Err(invalid("BRAM_ADDR_END", &addr.end.to_string()));
        }
        if slice.end < slice.begin {
            return Err(invalid("BRAM_SLICE_END", &slice.end.to_string()));
        }

        let tile = get("TILE")?.to_string();
        let ram_name = get("RTL_RAM_NAME")?.to_string();
        let read_width = number("READ_WIDTH_A")?;
        let ram_mode = keys.get("RAM_MODE").cloned().unwrap_or_default();

        Ok(Self {
            name,
            cell_type,
            kind,
            tile,
            loc,
            placement_row,
            parity_bits,
            data_bits,
            ram_name,
            ram_mode,
            read_width,
            addr,
            slice,
            keys,
        })
    }

    /// Logical memory the cell belongs to: the cell's parent path joined with
    /// its RTL RAM name, e.g. `mem/ram` for `mem/ram_reg_0_0` of RAM `ram`.
    pub fn memory_name(&self) -> String {
        match self.name.rsplit_once('/') {
            Some((parent, _)) => format!("{parent}/{}", self.ram_name),
            None => self.ram_name.clone(),
        }
    }

    /// Data bit layout as written in the MDD, e.g. `p4_d32`.
    pub fn layout(&self) -> String {
        format!("p{}_d{}", self.parity_bits, self.data_bits)
    }

    /// Assembles the placement record once the tile's segment is known.
    pub fn to_placement(&self, segment: FrameSegment) -> PlacementRecord {
        PlacementRecord {
            cell: self.name.clone(),
            tile: self.tile.clone(),
            kind: self.kind,
            addr: self.addr,
            slice: self.slice,
            read_width: self.read_width,
            parity_bits: self.parity_bits,
            data_bits: self.data_bits,
            placement_row: self.placement_row,
            segment,
        }
    }
}

impl fmt::Display for MddCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} rw{} addr {} slice {}",
            self.name,
            self.cell_type,
            self.tile,
            self.loc,
            self.layout(),
            self.read_width,
            self.addr,
            self.slice
        )
    }
}

/// Parses `p<P>_d<D>`.
fn parse_layout(layout: &str) -> Option<(u32, u32)> {
    let (p, d) = layout.split_once('_')?;
    Some((p.strip_prefix('p')?.parse().ok()?, d.strip_prefix('d')?.parse().ok()?))
}

/// Parses MDD text into cells, in file order.
///
/// # Errors
///
/// Returns an error for nested or unterminated `CELL` blocks, keys outside a
/// block, and cells missing a required key.
pub fn parse_mdd(text: &str) -> Result<Vec<MddCell>, MddError> {
    let mut cells = Vec::new();
    let mut current: Option<(String, BTreeMap<String, String>)> = None;

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else {
            continue;
        };
        let value = fields.next();
        let syntax = |message: String| MddError::Syntax {
            line: line_no,
            message,
        };

        match key {
            "CELL" => {
                if let Some((name, _)) = &current {
                    return Err(syntax(format!("CELL inside unterminated cell '{name}'")));
                }
                let name = value.ok_or_else(|| syntax("CELL without a name".to_string()))?;
                current = Some((name.to_string(), BTreeMap::new()));
            }
            "ENDCELL" => match current.take() {
                Some((name, keys)) => cells.push(MddCell::from_keys(name, keys)?),
                None => return Err(syntax("ENDCELL without CELL".to_string())),
            },
            _ => match current.as_mut() {
                Some((_, keys)) => {
                    keys.insert(key.to_string(), value.unwrap_or_default().to_string());
                }
                None if key.starts_with('#') => {}
                None => return Err(syntax(format!("'{key}' outside a CELL block"))),
            },
        }
    }

    match current {
        Some((name, _)) => Err(MddError::Syntax {
            line: text.lines().count(),
            message: format!("cell '{name}' has no ENDCELL"),
        }),
        None => Ok(cells),
    }
}

/// Reads and parses an MDD file.
///
/// # Errors
///
/// See [`parse_mdd`].
pub fn read_mdd(path: &Path) -> Result<Vec<MddCell>, MddError> {
    parse_mdd(&std::fs::read_to_string(path)?)
}

/// Every logical memory in `cells` with its covering shape, sorted by name.
pub fn memories(cells: &[MddCell]) -> BTreeMap<String, MemoryShape> {
    let mut shapes: BTreeMap<String, MemoryShape> = BTreeMap::new();
    for cell in cells {
        let shape = shapes.entry(cell.memory_name()).or_insert(MemoryShape {
            words: 0,
            bits: 0,
        });
        shape.words = shape.words.max(cell.addr.end + 1);
        shape.bits = shape.bits.max(cell.slice.end + 1);
    }
    shapes
}

/// The cells of one logical memory, in file order.
///
/// # Errors
///
/// Returns [`MddError::UnknownMemory`] if no cell belongs to `memory`.
pub fn select_memory<'a>(cells: &'a [MddCell], memory: &str) -> Result<Vec<&'a MddCell>, MddError> {
    let selected: Vec<&MddCell> = cells.iter().filter(|c| c.memory_name() == memory).collect();
    if selected.is_empty() {
        let available: Vec<String> = memories(cells).into_keys().collect();
        return Err(MddError::UnknownMemory {
            memory: memory.to_string(),
            available: available.join(", "),
        });
    }
    Ok(selected)
}

/// Groups cells by tile, for tile-level listings.
pub fn cells_by_tile<'a>(cells: &[&'a MddCell]) -> HashMap<&'a str, Vec<&'a MddCell>> {
    let mut tiles: HashMap<&str, Vec<&MddCell>> = HashMap::new();
    for &cell in cells {
        tiles.entry(cell.tile.as_str()).or_default().push(cell);
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    const MDD: &str = "\
CELL mem/ram_reg_0
  CELLTYPE                   RAMB36E1
  TILE                       BRAM_L_X6Y5
  LOC                        RAMB36_X0Y1
  MEM.PORTA.DATA_BIT_LAYOUT  p4_d32
  RTL_RAM_NAME               ram
  RAM_MODE                   TDP
  READ_WIDTH_A               36
  WRITE_WIDTH_A              36
  BRAM_ADDR_BEGIN            0
  BRAM_ADDR_END              1023
  BRAM_SLICE_BEGIN           0
  BRAM_SLICE_END             35
ENDCELL
CELL mem/ram_reg_1
  CELLTYPE                   RAMB18E1
  TILE                       BRAM_R_X7Y5
  LOC                        RAMB18_X1Y11
  MEM.PORTA.DATA_BIT_LAYOUT  p2_d16
  RTL_RAM_NAME               ram
  RAM_MODE                   TDP
  READ_WIDTH_A               18
  BRAM_ADDR_BEGIN            0
  BRAM_ADDR_END              1023
  BRAM_SLICE_BEGIN           36
  BRAM_SLICE_END             53
ENDCELL
CELL fifo/buf_reg
  CELLTYPE                   RAMB18E1
  TILE                       BRAM_L_X6Y10
  LOC                        RAMB18_X0Y20
  MEM.PORTA.DATA_BIT_LAYOUT  p0_d8
  RTL_RAM_NAME               buf
  READ_WIDTH_A               9
  BRAM_ADDR_BEGIN            0
  BRAM_ADDR_END              2047
  BRAM_SLICE_BEGIN           0
  BRAM_SLICE_END             7
ENDCELL
";

    #[test]
    fn parse_cells_in_order() {
        let cells = parse_mdd(MDD).unwrap();
        assert_eq!(cells.len(), 3);

        let c = &cells[0];
        assert_eq!(c.name, "mem/ram_reg_0");
        assert_eq!(c.kind, PrimitiveKind::Wide);
        assert_eq!(c.tile, "BRAM_L_X6Y5");
        assert_eq!(c.placement_row, 1);
        assert_eq!((c.parity_bits, c.data_bits), (4, 32));
        assert_eq!(c.read_width, 36);
        assert_eq!(c.addr, InclusiveRange::new(0, 1023));
        assert_eq!(c.slice, InclusiveRange::new(0, 35));
        assert_eq!(c.keys["WRITE_WIDTH_A"], "36");

        assert_eq!(cells[1].kind, PrimitiveKind::Half);
        assert_eq!(cells[1].placement_row, 11);
        assert_eq!(cells[2].ram_mode, "");
    }

    #[test]
    fn memory_names() {
        let cells = parse_mdd(MDD).unwrap();
        assert_eq!(cells[0].memory_name(), "mem/ram");
        assert_eq!(cells[2].memory_name(), "fifo/buf");

        let mems = memories(&cells);
        assert_eq!(mems.len(), 2);
        assert_eq!(mems["mem/ram"], MemoryShape { words: 1024, bits: 54 });
        assert_eq!(mems["fifo/buf"], MemoryShape { words: 2048, bits: 8 });
    }

    #[test]
    fn select_known_and_unknown_memory() {
        let cells = parse_mdd(MDD).unwrap();
        let selected = select_memory(&cells, "mem/ram").unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(cells_by_tile(&selected).len(), 2);

        let err = select_memory(&cells, "top/none").unwrap_err();
        match err {
            MddError::UnknownMemory { available, .. } => assert_eq!(available, "fifo/buf, mem/ram"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn to_placement_carries_geometry() {
        let cells = parse_mdd(MDD).unwrap();
        let segment = FrameSegment {
            base_address: 0x0080_0100,
            frame_count: 128,
            word_offset: 20,
            word_count: 10,
        };
        let record = cells[1].to_placement(segment);
        assert_eq!(record.cell, "mem/ram_reg_1");
        assert_eq!(record.slice, InclusiveRange::new(36, 53));
        assert_eq!(record.placement_row, 11);
        assert_eq!(record.segment, segment);
    }

    #[test]
    fn display_line() {
        let cells = parse_mdd(MDD).unwrap();
        assert_eq!(
            cells[2].to_string(),
            "fifo/buf_reg RAMB18E1 BRAM_L_X6Y10 RAMB18_X0Y20 p0_d8 rw9 addr 2047:0 slice 7:0"
        );
    }

    #[test]
    fn cellplacement_is_accepted_for_loc() {
        let text = MDD.replacen("  LOC                        RAMB36_X0Y1", "  CELLPLACEMENT RAMB36_X0Y7", 1);
        let cells = parse_mdd(&text).unwrap();
        assert_eq!(cells[0].placement_row, 7);
    }

    #[test]
    fn missing_key() {
        let text = MDD.replacen("  TILE                       BRAM_L_X6Y5\n", "", 1);
        let err = parse_mdd(&text).unwrap_err();
        assert!(matches!(err, MddError::MissingKey { key: "TILE", .. }));
    }

    #[test]
    fn invalid_layout() {
        let text = MDD.replacen("p4_d32", "d32", 1);
        let err = parse_mdd(&text).unwrap_err();
        assert!(matches!(
            err,
            MddError::InvalidValue {
                key: "MEM.PORTA.DATA_BIT_LAYOUT",
                ..
            }
        ));
    }

    #[test]
    fn unsupported_cell_type() {
        let text = MDD.replacen("RAMB36E1", "DSP48E1", 1);
        let err = parse_mdd(&text).unwrap_err();
        assert!(matches!(err, MddError::UnsupportedCellType { .. }));
    }

    #[test]
    fn block_structure_errors() {
        let err = parse_mdd("CELL a\nCELL b\n").unwrap_err();
        assert!(matches!(err, MddError::Syntax { line: 2, .. }));
        let err = parse_mdd("ENDCELL\n").unwrap_err();
        assert!(matches!(err, MddError::Syntax { line: 1, .. }));
        let err = parse_mdd("TILE X\n").unwrap_err();
        assert!(matches!(err, MddError::Syntax { line: 1, .. }));
        let err = parse_mdd("CELL a\n  TILE X\n").unwrap_err();
        assert!(err.to_string().contains("no ENDCELL"));
    }

    #[test]
    fn serializes_without_raw_keys() {
        let cells = parse_mdd(MDD).unwrap();
        let json = serde_json::to_value(&cells[0]).unwrap();
        assert_eq!(json["tile"], "BRAM_L_X6Y5");
        assert!(json.get("keys").is_none());
    }

    #[test]
    fn read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design.mdd");
        std::fs::write(&path, MDD).unwrap();
        assert_eq!(read_mdd(&path).unwrap().len(), 3);
        assert!(matches!(
            read_mdd(&dir.path().join("missing.mdd")),
            Err(MddError::Io(_))
        ));
    }
}
