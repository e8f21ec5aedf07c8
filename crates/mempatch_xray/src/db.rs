//! Block-RAM view of a Project X-Ray database.
//!
//! Combines the part's tilegrid with both block-RAM segbits files into a
//! single [`BramDatabase`]. The expected directory structure is:
//!
//! ```text
//! database/
//! └── artix7/
//!     ├── segbits_bram_l.block_ram.db
//!     ├── segbits_bram_r.block_ram.db
//!     └── xc7a50tfgg484-1/
//!         └── tilegrid.json
//! ```

use crate::segbits;
use crate::tilegrid::{self, TileGrid};
use mempatch_config::DatabaseConfig;
use mempatch_map::{FrameSegment, SegmentTable, TileSide};
use std::path::{Path, PathBuf};

/// Tilegrid and segment table for one part.
#[derive(Debug, Clone)]
pub struct BramDatabase {
    /// The device part name (e.g., "xc7a50tfgg484-1").
    pub part: String,
    /// The tilegrid mapping tile names to their frame segments.
    pub tilegrid: TileGrid,
    /// INIT/INITP feature bits of both tile sides.
    pub segments: SegmentTable,
    /// Words per configuration frame.
    pub words_per_frame: u32,
    /// The family directory the database was loaded from.
    pub family_dir: PathBuf,
}

impl BramDatabase {
    /// Loads the database named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the configuration is incomplete or a
    /// required file cannot be read or parsed.
    pub fn load(config: &DatabaseConfig) -> Result<Self, String> {
        config.validate().map_err(|e| e.to_string())?;
        let mut db = Self::load_from(&config.family_dir(), &config.part)?;
        db.words_per_frame = config.words_per_frame;
        Ok(db)
    }

    /// Loads the database for `part` from a family directory.
    ///
    /// # Errors
    ///
    /// Returns an error string if a required file cannot be read or parsed.
    pub fn load_from(family_dir: &Path, part: &str) -> Result<Self, String> {
        let part_dir = family_dir.join(part);
        if !part_dir.is_dir() {
            return Err(format!(
                "X-Ray database directory not found: {}",
                part_dir.display()
            ));
        }

        let tilegrid_path = part_dir.join("tilegrid.json");
        let tilegrid_json = std::fs::read_to_string(&tilegrid_path).map_err(|e| {
            format!(
                "failed to read tilegrid at {}: {e}",
                tilegrid_path.display()
            )
        })?;
        let tilegrid = tilegrid::parse_tilegrid(&tilegrid_json)?;

        let mut segments = SegmentTable::new();
        for side in [TileSide::Left, TileSide::Right] {
            let filename = segbits::segbits_filename(side);
            let path = family_dir.join(&filename);
            let content = std::fs::read_to_string(&path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            segbits::parse_segbits_into(&content, &mut segments)
                .map_err(|e| format!("failed to parse {filename}: {e}"))?;
        }

        Ok(Self {
            part: part.to_string(),
            tilegrid,
            segments,
            words_per_frame: mempatch_config::DEFAULT_WORDS_PER_FRAME,
            family_dir: family_dir.to_path_buf(),
        })
    }

    /// Returns the `BLOCK_RAM` frame segment of `tile`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the tile is unknown or has no block-RAM bus.
    pub fn segment(&self, tile: &str) -> Result<FrameSegment, String> {
        tilegrid::block_ram_segment(&self.tilegrid, tile)
    }
}
