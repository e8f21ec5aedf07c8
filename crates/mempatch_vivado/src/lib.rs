//! Adapters for files written by the Vivado flow.
//!
//! - [`mdd`]: the memory design description (`.mdd`) listing every block-RAM
//!   cell of a design with its placement and the logical window it holds
//! - [`mem`]: hex memory-initialization files (`.mem`)

#![warn(missing_docs)]

pub mod error;
pub mod mdd;
pub mod mem;

pub use error::{MddError, MemError};
pub use mdd::{cells_by_tile, memories, parse_mdd, read_mdd, select_memory, MddCell};
pub use mem::{parse_mem, read_mem, render_mem, write_mem};
