//! Project X-Ray database and FASM adapters for 7-series block RAM.
//!
//! This crate reads the parts of the [Project X-Ray](https://github.com/f4pga/prjxray)
//! database that block-RAM address translation needs, and reads and writes the
//! INIT/INITP lines of FASM files.
//!
//! # Database files
//!
//! - `<family>/<part>/tilegrid.json`: each tile's `BLOCK_RAM` frame segment
//! - `<family>/segbits_bram_l.block_ram.db` and
//!   `<family>/segbits_bram_r.block_ram.db`: INIT/INITP feature bit to
//!   frame offset and bit offset
//!
//! # Usage
//!
//! Point `database.root` in `mempatch.toml` at the `database/` directory of a
//! prjxray checkout:
//!
//! ```text
//! [database]
//! root = "/opt/prjxray/database"
//! family = "artix7"
//! part = "xc7a50tfgg484-1"
//! ```

#![warn(missing_docs)]

pub mod db;
pub mod fasm;
pub mod segbits;
pub mod tilegrid;

pub use db::BramDatabase;
pub use fasm::{patch_fasm, read_init_rows, render_init_lines, FasmInitLine};
