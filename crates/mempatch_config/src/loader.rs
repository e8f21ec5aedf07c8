//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ToolConfig;
use std::collections::HashSet;
use std::path::Path;

/// File name looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "mempatch.toml";

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<ToolConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `mempatch.toml` configuration from a string.
///
/// The database section may be incomplete here since command-line flags can
/// fill it in later; [`DatabaseConfig::validate`](crate::DatabaseConfig::validate)
/// is checked when the database is opened.
pub fn load_config_from_str(content: &str) -> Result<ToolConfig, ConfigError> {
    let config: ToolConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ToolConfig) -> Result<(), ConfigError> {
    if config.database.words_per_frame == 0 {
        return Err(ConfigError::ValidationError(
            "database.words_per_frame must be non-zero".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for (i, design) in config.designs.iter().enumerate() {
        if design.name.is_empty() {
            return Err(ConfigError::MissingField(format!("designs[{i}].name")));
        }
        if design.memory.is_empty() {
            return Err(ConfigError::MissingField(format!("designs[{i}].memory")));
        }
        if !seen.insert(design.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "design '{}' is listed more than once",
                design.name
            )));
        }
    }
    Ok(())
}
