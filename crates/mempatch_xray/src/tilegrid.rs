//! Parser for Project X-Ray `tilegrid.json` files.
//!
//! Only the `BLOCK_RAM` bus matters for memory patching: it tells where a BRAM
//! tile's INIT content lives in the configuration frames.

use mempatch_map::FrameSegment;
use serde::Deserialize;
use std::collections::HashMap;

/// Name of the tilegrid bus that carries block-RAM content.
pub const BLOCK_RAM_BUS: &str = "BLOCK_RAM";

/// A single tile entry from the tilegrid.
#[derive(Debug, Clone)]
pub struct TileGridEntry {
    /// Frame segments indexed by bus name (e.g., "CLB_IO_CLK", "BLOCK_RAM").
    pub bits: HashMap<String, FrameSegment>,
    /// Column position in the tile grid.
    pub grid_x: u32,
    /// Row position in the tile grid.
    pub grid_y: u32,
    /// The tile type string (e.g., "BRAM_L").
    pub tile_type: String,
    /// Sites within this tile, mapping site name to site type.
    pub sites: HashMap<String, String>,
}

/// The complete tilegrid for a device, mapping tile names to their entries.
pub type TileGrid = HashMap<String, TileGridEntry>;

#[derive(Deserialize)]
struct RawBitSegment {
    baseaddr: String,
    frames: u32,
    offset: u32,
    words: u32,
}

#[derive(Deserialize)]
struct RawTileEntry {
    #[serde(default)]
    bits: HashMap<String, RawBitSegment>,
    grid_x: u32,
    grid_y: u32,
    #[serde(rename = "type")]
    tile_type: String,
    #[serde(default)]
    sites: HashMap<String, String>,
}

/// Parses a hex string like "0x00c00000" into a u32.
fn parse_hex_addr(s: &str) -> Result<u32, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex address '{s}': {e}"))
}

/// Parses a tilegrid JSON string into a [`TileGrid`].
///
/// # Errors
///
/// Returns an error string if the JSON is malformed or contains invalid
/// hex base addresses.
pub fn parse_tilegrid(json: &str) -> Result<TileGrid, String> {
    let raw: HashMap<String, RawTileEntry> =
        serde_json::from_str(json).map_err(|e| format!("tilegrid JSON parse error: {e}"))?;

    let mut grid = HashMap::with_capacity(raw.len());
    for (tile_name, raw_entry) in raw {
        let mut bits = HashMap::with_capacity(raw_entry.bits.len());
        for (bus_name, raw_seg) in raw_entry.bits {
            let base_address = parse_hex_addr(&raw_seg.baseaddr)
                .map_err(|e| format!("tile {tile_name}, bus {bus_name}: {e}"))?;
            bits.insert(
                bus_name,
                FrameSegment {
                    base_address,
                    frame_count: raw_seg.frames,
                    word_offset: raw_seg.offset,
                    word_count: raw_seg.words,
                },
            );
        }
        grid.insert(
            tile_name,
            TileGridEntry {
                bits,
                grid_x: raw_entry.grid_x,
                grid_y: raw_entry.grid_y,
                tile_type: raw_entry.tile_type,
                sites: raw_entry.sites,
            },
        );
    }
    Ok(grid)
}

/// Returns the `BLOCK_RAM` segment of `tile`.
///
/// # Errors
///
/// Returns an error string if the tile is not in the grid or has no
/// block-RAM bus.
pub fn block_ram_segment(grid: &TileGrid, tile: &str) -> Result<FrameSegment, String> {
    let entry = grid
        .get(tile)
        .ok_or_else(|| format!("tile {tile} not found in tilegrid"))?;
    entry
        .bits
        .get(BLOCK_RAM_BUS)
        .copied()
        .ok_or_else(|| format!("tile {tile} ({}) has no {BLOCK_RAM_BUS} bus", entry.tile_type))
}
