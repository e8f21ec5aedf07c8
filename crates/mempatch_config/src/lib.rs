//! Parsing and validation of `mempatch.toml` tool configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`ToolConfig`]: where the X-Ray database lives, which part to use, and an
//! optional list of designs for batch checking. [`resolve_design`] turns a
//! design entry into concrete file paths.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_design, ResolvedDesign};
pub use types::*;
