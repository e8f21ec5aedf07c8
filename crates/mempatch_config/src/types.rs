//! Configuration types deserialized from `mempatch.toml`.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;

/// Number of 32-bit words in one 7-series configuration frame.
pub const DEFAULT_WORDS_PER_FRAME: u32 = 101;

/// Logical memory name used when a design entry does not name one.
pub const DEFAULT_MEMORY: &str = "mem/ram";

/// The top-level configuration parsed from `mempatch.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolConfig {
    /// Location of the X-Ray database.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Designs checked by `check-all` when no directory is given.
    #[serde(default)]
    pub designs: Vec<DesignConfig>,
}

impl ToolConfig {
    /// Finds a design entry by name.
    pub fn design(&self, name: &str) -> Result<&DesignConfig, ConfigError> {
        self.designs
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ConfigError::UnknownDesign(name.to_string()))
    }
}

/// Where to find the tilegrid and segbits files.
///
/// Segbits live in `<root>/<family>/`, the tilegrid in
/// `<root>/<family>/<part>/tilegrid.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// The database root directory (the `database/` folder of a Project X-Ray checkout).
    #[serde(default)]
    pub root: PathBuf,
    /// Device family subdirectory, e.g. "artix7".
    #[serde(default)]
    pub family: String,
    /// Part subdirectory, e.g. "xc7a50tfgg484-1".
    #[serde(default)]
    pub part: String,
    /// Words per configuration frame.
    #[serde(default = "default_words_per_frame")]
    pub words_per_frame: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            family: String::new(),
            part: String::new(),
            words_per_frame: DEFAULT_WORDS_PER_FRAME,
        }
    }
}

impl DatabaseConfig {
    /// Applies command-line overrides on top of the file values.
    pub fn with_overrides(
        mut self,
        root: Option<PathBuf>,
        family: Option<String>,
        part: Option<String>,
    ) -> Self {
        if let Some(root) = root {
            self.root = root;
        }
        if let Some(family) = family {
            self.family = family;
        }
        if let Some(part) = part {
            self.part = part;
        }
        self
    }

    /// Checks that every field needed to open the database is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("database.root".to_string()));
        }
        if self.family.is_empty() {
            return Err(ConfigError::MissingField("database.family".to_string()));
        }
        if self.part.is_empty() {
            return Err(ConfigError::MissingField("database.part".to_string()));
        }
        if self.words_per_frame == 0 {
            return Err(ConfigError::ValidationError(
                "database.words_per_frame must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory holding the family's segbits files.
    pub fn family_dir(&self) -> PathBuf {
        self.root.join(&self.family)
    }

    /// Path of the part's `tilegrid.json`.
    pub fn tilegrid_path(&self) -> PathBuf {
        self.family_dir().join(&self.part).join("tilegrid.json")
    }
}

/// One design directory produced by the vendor flow.
///
/// File names default to the usual layout: `<name>.mdd`, `init/init.mem`,
/// `real.fasm` and `vivado/<name>.bit`, all relative to `dir`.
#[derive(Debug, Clone, Deserialize)]
pub struct DesignConfig {
    /// Design name, also the stem of the MDD and bitstream files.
    pub name: String,
    /// Design directory.
    pub dir: PathBuf,
    /// Logical memory to process.
    #[serde(default = "default_memory")]
    pub memory: String,
    /// MDD file override.
    #[serde(default)]
    pub mdd: Option<PathBuf>,
    /// Init file override.
    #[serde(default)]
    pub init: Option<PathBuf>,
    /// FASM file override.
    #[serde(default)]
    pub fasm: Option<PathBuf>,
    /// Bitstream file override.
    #[serde(default)]
    pub bitstream: Option<PathBuf>,
}

impl DesignConfig {
    /// Creates an entry for `dir` with every file at its default location.
    ///
    /// The design name is the last component of `dir`.
    pub fn from_dir(dir: impl Into<PathBuf>, memory: &str) -> Result<Self, ConfigError> {
        let dir = dir.into();
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "cannot derive a design name from '{}'",
                    dir.display()
                ))
            })?
            .to_string();
        Ok(Self {
            name,
            dir,
            memory: memory.to_string(),
            mdd: None,
            init: None,
            fasm: None,
            bitstream: None,
        })
    }
}

fn default_words_per_frame() -> u32 {
    DEFAULT_WORDS_PER_FRAME
}

fn default_memory() -> String {
    DEFAULT_MEMORY.to_string()
}
