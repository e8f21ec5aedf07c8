//! Shared pipeline helpers for CLI commands.
//!
//! Contains the steps every command goes through: loading `mempatch.toml`,
//! opening the X-Ray database, resolving a design, and turning its MDD cells
//! into a mapping table. Also holds design discovery for `check-all` and
//! `summary`, and diagnostic rendering.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mempatch_bitstream::{load_frames, BitstreamError, FrameImage};
use mempatch_config::{
    load_config, resolve_design, ConfigError, DesignConfig, ResolvedDesign, ToolConfig,
    CONFIG_FILE_NAME, DEFAULT_MEMORY,
};
use mempatch_diagnostics::{
    Category, Diagnostic, DiagnosticCode, DiagnosticRenderer, DiagnosticSink, JsonRenderer,
    TerminalRenderer,
};
use mempatch_map::{FeatureRows, InitImage, MapError, MappingTable, MemoryShape};
use mempatch_vivado::{read_mdd, read_mem, select_memory, MddCell, MddError, MemError};
use mempatch_xray::{read_init_rows, BramDatabase};

use crate::{DesignArgs, GlobalArgs, ReportFormat};

/// Errors raised while processing one design.
#[derive(Debug, thiserror::Error)]
pub enum DesignError {
    /// The configuration could not be loaded or is incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The X-Ray database could not be opened or lacks a tile.
    #[error("{0}")]
    Database(String),

    /// The MDD file could not be read.
    #[error("{}: {source}", path.display())]
    Mdd {
        /// The MDD file.
        path: PathBuf,
        /// What went wrong.
        source: MddError,
    },

    /// An init file could not be read or written.
    #[error("{}: {source}", path.display())]
    Mem {
        /// The init file.
        path: PathBuf,
        /// What went wrong.
        source: MemError,
    },

    /// The bitstream could not be read.
    #[error("{}: {source}", path.display())]
    Bitstream {
        /// The bitstream file.
        path: PathBuf,
        /// What went wrong.
        source: BitstreamError,
    },

    /// A FASM file could not be parsed.
    #[error("{}: {message}", path.display())]
    Fasm {
        /// The FASM file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// A file could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// What went wrong.
        source: io::Error,
    },

    /// The translation engine rejected the design.
    #[error(transparent)]
    Map(#[from] MapError),

    /// A rebuilt init file differs from the reference.
    #[error("{} differs from the reference at word {word} bit {bit}", path.display())]
    InitMismatch {
        /// The reference init file.
        path: PathBuf,
        /// First differing word.
        word: u32,
        /// First differing bit.
        bit: u32,
    },

    /// A rebuilt FASM file differs from the reference.
    #[error("{} differs from the reference at line {line}", path.display())]
    FasmMismatch {
        /// The reference FASM file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// The reference line.
        expected: String,
        /// The rebuilt line.
        actual: String,
    },
}

impl DesignError {
    /// Stable diagnostic code for this error kind.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            DesignError::Config(_) => DiagnosticCode::new(Category::Config, 1),
            DesignError::Database(_) => DiagnosticCode::new(Category::Config, 2),
            DesignError::Mdd { .. } => DiagnosticCode::new(Category::Input, 1),
            DesignError::Mem { .. } => DiagnosticCode::new(Category::Input, 2),
            DesignError::Bitstream { .. } => DiagnosticCode::new(Category::Input, 3),
            DesignError::Fasm { .. } => DiagnosticCode::new(Category::Input, 4),
            DesignError::Io { .. } => DiagnosticCode::new(Category::Input, 5),
            DesignError::Map(e) => e.code(),
            DesignError::InitMismatch { .. } => DiagnosticCode::new(Category::Mapping, 11),
            DesignError::FasmMismatch { .. } => DiagnosticCode::new(Category::Mapping, 12),
        }
    }

    /// Converts this error into an error diagnostic located at `location`.
    pub fn to_diagnostic(&self, location: &str) -> Diagnostic {
        match self {
            DesignError::Map(e) => e.to_diagnostic(location),
            DesignError::Mdd {
                source: MddError::UnknownMemory { .. },
                ..
            } => Diagnostic::error(self.code(), self.to_string())
                .at(location)
                .with_help("select another memory with --memory"),
            DesignError::Database(_) | DesignError::Config(_) => {
                Diagnostic::error(self.code(), self.to_string())
                    .at(location)
                    .with_help("set [database] in mempatch.toml or pass --db-root/--family/--part")
            }
            DesignError::FasmMismatch {
                expected, actual, ..
            } => Diagnostic::error(self.code(), self.to_string())
                .at(location)
                .with_note(format!("expected: {expected}"))
                .with_note(format!("  actual: {actual}")),
            _ => Diagnostic::error(self.code(), self.to_string()).at(location),
        }
    }
}

/// A design whose memory has been mapped.
#[derive(Debug)]
pub struct LoadedDesign {
    /// Resolved file paths.
    pub design: ResolvedDesign,
    /// The MDD cells of the selected memory, in file order.
    pub cells: Vec<MddCell>,
    /// The per-bit mapping of the memory.
    pub table: MappingTable,
}

impl LoadedDesign {
    /// Dimensions of the mapped memory.
    pub fn shape(&self) -> MemoryShape {
        self.table.shape()
    }

    /// Reads an init file shaped like this memory.
    pub fn read_init(&self, path: &Path) -> Result<InitImage, DesignError> {
        read_mem(path, self.shape()).map_err(|source| DesignError::Mem {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Loads the tool configuration.
///
/// Uses `--config` when given, otherwise `mempatch.toml` in the current
/// directory if present, otherwise an empty configuration.
pub fn load_tool_config(global: &GlobalArgs) -> Result<ToolConfig, ConfigError> {
    match global.config {
        Some(ref path) => load_config(Path::new(path)),
        None => {
            let local = Path::new(CONFIG_FILE_NAME);
            if local.is_file() {
                load_config(local)
            } else {
                Ok(ToolConfig::default())
            }
        }
    }
}

/// Opens the X-Ray database named by the configuration and CLI overrides.
pub fn open_database(config: &ToolConfig, global: &GlobalArgs) -> Result<BramDatabase, DesignError> {
    let db_config = config.database.clone().with_overrides(
        global.db_root.clone(),
        global.family.clone(),
        global.part.clone(),
    );
    db_config.validate()?;
    BramDatabase::load(&db_config).map_err(DesignError::Database)
}

/// Resolves a design argument.
///
/// An existing directory is used with the default file layout; anything else
/// is looked up by name in the configuration. `--memory` overrides the
/// configured memory.
pub fn resolve(target: &DesignArgs, config: &ToolConfig) -> Result<ResolvedDesign, DesignError> {
    let path = Path::new(&target.design);
    let mut design = if path.is_dir() {
        DesignConfig::from_dir(path, DEFAULT_MEMORY)?
    } else {
        config.design(&target.design)?.clone()
    };
    if let Some(ref memory) = target.memory {
        design.memory = memory.clone();
    }
    Ok(resolve_design(&design))
}

/// Reads the MDD of a design and maps its selected memory.
pub fn load_design(design: &ResolvedDesign, db: &BramDatabase) -> Result<LoadedDesign, DesignError> {
    let mdd_error = |source| DesignError::Mdd {
        path: design.mdd.clone(),
        source,
    };
    let all = read_mdd(&design.mdd).map_err(mdd_error)?;
    let cells: Vec<MddCell> = select_memory(&all, &design.memory)
        .map_err(mdd_error)?
        .into_iter()
        .cloned()
        .collect();

    let records = cells
        .iter()
        .map(|cell| {
            db.segment(&cell.tile)
                .map(|segment| cell.to_placement(segment))
                .map_err(|e| DesignError::Database(format!("cell '{}': {e}", cell.name)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let shape = MemoryShape::covering(&records).ok_or(MapError::CoverageGap { word: 0, bit: 0 })?;
    let table = MappingTable::build(records, shape, &db.segments)?;

    Ok(LoadedDesign {
        design: design.clone(),
        cells,
        table,
    })
}

/// Reads the INIT/INITP rows of a FASM file.
pub fn read_fasm_rows(path: &Path) -> Result<FeatureRows, DesignError> {
    let text = read_text(path)?;
    read_init_rows(&text).map_err(|message| DesignError::Fasm {
        path: path.to_path_buf(),
        message,
    })
}

/// Reads the configuration frames of a bitstream.
pub fn read_bitstream(path: &Path, words_per_frame: u32) -> Result<FrameImage, DesignError> {
    load_frames(path, words_per_frame).map_err(|source| DesignError::Bitstream {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a text file.
pub fn read_text(path: &Path) -> Result<String, DesignError> {
    fs::read_to_string(path).map_err(|source| DesignError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a text file, creating parent directories.
pub fn write_text(path: &Path, text: &str) -> Result<(), DesignError> {
    let io_error = |source| DesignError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, text).map_err(io_error)
}

/// Finds the design directories directly under `dir`.
///
/// A subdirectory is a design if it contains `<name>.mdd`. Results are
/// sorted by name.
pub fn discover_designs(dir: &Path, memory: &str) -> Result<Vec<DesignConfig>, DesignError> {
    let io_error = |source| DesignError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut designs = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if !path.is_dir() {
            continue;
        }
        let design = DesignConfig::from_dir(&path, memory)?;
        if path.join(format!("{}.mdd", design.name)).is_file() {
            designs.push(design);
        }
    }
    designs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(designs)
}

/// Renders all collected diagnostics to stderr.
pub fn render_diagnostics(sink: &DiagnosticSink, color: bool, format: ReportFormat) {
    let renderer: Box<dyn DiagnosticRenderer> = match format {
        ReportFormat::Text => Box::new(TerminalRenderer::new(color)),
        ReportFormat::Json => Box::new(JsonRenderer),
    };
    for diag in sink.take_all() {
        eprint!("{}", renderer.render(&diag));
    }
}

/// Reports a failed design: emits its diagnostic and prints it.
pub fn report_failure(error: &DesignError, location: &str, global: &GlobalArgs) -> i32 {
    let sink = DiagnosticSink::new();
    sink.emit(error.to_diagnostic(location));
    render_diagnostics(&sink, global.color, ReportFormat::Text);
    1
}
