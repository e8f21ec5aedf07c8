//! A synthetic X-Ray database and design directory for command tests.
//!
//! The database has one tile per side. Feature bits are laid out linearly:
//! `half * 18432 + (parity ? 64 * 256 : 0) + row * 256 + column`, split into
//! 320-bit frame slices. The design `d1` holds a 1024x54 memory on a RAMB36
//! (lanes 0..=35) and a RAMB18 (lanes 36..=53), with its init file, FASM and
//! bitstream all generated from the same pattern.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use mempatch_bitstream::{write_debug_bit, FRAME_WORDS};
use mempatch_config::{resolve_design, DesignConfig, ResolvedDesign, ToolConfig, DEFAULT_MEMORY};
use mempatch_map::{InitImage, Reconstructor};
use mempatch_vivado::render_mem;
use mempatch_xray::{patch_fasm, BramDatabase};
use tempfile::TempDir;

use crate::pipeline::{load_design, open_database};
use crate::GlobalArgs;

const TILEGRID: &str = r#"{
    "BRAM_L_X6Y5": {
        "bits": {"BLOCK_RAM": {"baseaddr": "0x00800000", "frames": 128, "offset": 0, "words": 10}},
        "grid_x": 13, "grid_y": 50, "type": "BRAM_L"
    },
    "BRAM_R_X7Y5": {
        "bits": {"BLOCK_RAM": {"baseaddr": "0x00800100", "frames": 128, "offset": 20, "words": 10}},
        "grid_x": 20, "grid_y": 50, "type": "BRAM_R"
    },
    "CLBLL_L_X2Y3": {"bits": {}, "grid_x": 4, "grid_y": 50, "type": "CLBLL_L"}
}"#;

const MDD: &str = "\
CELL mem/ram_reg_0
  CELLTYPE                   RAMB36E1
  TILE                       BRAM_L_X6Y5
  LOC                        RAMB36_X0Y1
  MEM.PORTA.DATA_BIT_LAYOUT  p4_d32
  RTL_RAM_NAME               ram
  RAM_MODE                   TDP
  READ_WIDTH_A               36
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
";

/// Non-INIT lines the patched FASM must keep.
const FASM_BASE: &str = "\
BRAM_L_X6Y5.RAMB18_Y0.IN_USE
BRAM_L_X6Y5.RAMB18_Y1.IN_USE
BRAM_R_X7Y5.RAMB18_Y1.IN_USE
CLBLL_L_X2Y3.SLICEL_X0.ALUT.INIT[63:0] = 64'b1
";

/// A temporary database plus one design directory.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// Writes the database and the `d1` design.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Self { dir };
        fixture.write_database();
        fixture.write_design();
        fixture
    }

    /// Root of the temporary tree.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The `d1` design directory.
    pub fn design_dir(&self) -> PathBuf {
        self.root().join("designs").join("d1")
    }

    /// Global flags pointing at a database root.
    pub fn global_for(db_root: &Path) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: None,
            db_root: Some(db_root.to_path_buf()),
            family: Some("artix7".to_string()),
            part: Some("xc7a50t".to_string()),
        }
    }

    /// Global flags pointing at this fixture's database.
    pub fn global(&self) -> GlobalArgs {
        Self::global_for(&self.root().join("database"))
    }

    /// The opened database.
    pub fn database(&self) -> BramDatabase {
        open_database(&ToolConfig::default(), &self.global()).unwrap()
    }

    /// The `d1` design with default paths.
    pub fn resolved(&self) -> ResolvedDesign {
        resolve_design(&DesignConfig::from_dir(self.design_dir(), DEFAULT_MEMORY).unwrap())
    }

    /// The reference init pattern.
    pub fn pattern() -> InitImage {
        let mut init = InitImage::new(1024, 54);
        for w in 0..1024 {
            for b in 0..54 {
                if (w * 7 + b * 13) % 11 < 4 {
                    init.set(w, b, true);
                }
            }
        }
        init
    }

    fn write_database(&self) {
        let family = self.root().join("database").join("artix7");
        fs::create_dir_all(family.join("xc7a50t")).unwrap();
        fs::write(family.join("xc7a50t").join("tilegrid.json"), TILEGRID).unwrap();
        for side in ['L', 'R'] {
            let path = family.join(format!("segbits_bram_{}.block_ram.db", side.to_ascii_lowercase()));
            fs::write(path, segbits(side)).unwrap();
        }
    }

    fn write_design(&self) {
        let dir = self.design_dir();
        fs::create_dir_all(dir.join("init")).unwrap();
        fs::create_dir_all(dir.join("vivado")).unwrap();
        fs::write(dir.join("d1.mdd"), MDD).unwrap();

        let init = Self::pattern();
        fs::write(dir.join("init").join("init.mem"), render_mem(&init, 1024)).unwrap();

        let loaded = load_design(&self.resolved(), &self.database()).unwrap();
        let rc = Reconstructor::new(&loaded.table);
        let rows = rc.features_from_init(&init).unwrap();
        fs::write(dir.join("real.fasm"), patch_fasm(FASM_BASE, &rows, false).unwrap()).unwrap();

        let frames = rc.frames_from_init(&init, FRAME_WORDS).unwrap();
        fs::write(
            dir.join("vivado").join("d1.bit"),
            write_debug_bit(&frames, "xc7a50t", "d1"),
        )
        .unwrap();
    }
}

/// Every INIT/INITP bit of one tile side.
fn segbits(side: char) -> String {
    let mut out = String::new();
    for half in 0..2u32 {
        for (keyword, base, rows) in [("INIT", 0, 64u32), ("INITP", 64 * 256, 8)] {
            for row in 0..rows {
                for column in 0..256u32 {
                    let linear = half * 18432 + base + row * 256 + column;
                    writeln!(
                        out,
                        "BRAM_{side}.RAMB18_Y{half}.{keyword}_{row:02X}[{column:03}] {:02}_{}",
                        linear / 320,
                        linear % 320
                    )
                    .unwrap();
                }
            }
        }
    }
    out.push_str(&format!("BRAM_{side}.RAMB18_Y0.IN_USE 27_100\n"));
    out
}
