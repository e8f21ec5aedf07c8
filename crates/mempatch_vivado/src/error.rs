//! Error types for the Vivado file adapters.

use mempatch_common::BitsParseError;
use thiserror::Error;

/// Errors reading a memory design description.
#[derive(Debug, Error)]
pub enum MddError {
    /// An I/O error occurred reading the file.
    #[error("failed to read MDD file: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be understood.
    #[error("line {line}: {message}")]
    Syntax {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// A cell lacks a key needed to place it.
    #[error("cell '{cell}' has no {key}")]
    MissingKey {
        /// The cell name.
        cell: String,
        /// The missing key.
        key: &'static str,
    },

    /// A key has a value that cannot be parsed.
    #[error("cell '{cell}': invalid {key} '{value}'")]
    InvalidValue {
        /// The cell name.
        cell: String,
        /// The key.
        key: &'static str,
        /// The offending value.
        value: String,
    },

    /// The cell is not a block-RAM primitive.
    #[error("cell '{cell}' has unsupported type {cell_type}")]
    UnsupportedCellType {
        /// The cell name.
        cell: String,
        /// The `CELLTYPE` value.
        cell_type: String,
    },

    /// No cell belongs to the requested memory.
    #[error("no memories found in MDD for '{memory}' (available: {available})")]
    UnknownMemory {
        /// The requested memory name.
        memory: String,
        /// Comma-separated names that do exist.
        available: String,
    },
}

/// Errors reading a memory-initialization file.
#[derive(Debug, Error)]
pub enum MemError {
    /// An I/O error occurred reading or writing the file.
    #[error("init file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A word is not valid hex or does not fit the word width.
    #[error("line {line}: {source}")]
    InvalidWord {
        /// 1-based line number.
        line: usize,
        /// The parse failure.
        source: BitsParseError,
    },

    /// An `@address` line is not valid hex.
    #[error("line {line}: invalid address '{text}'")]
    InvalidAddress {
        /// 1-based line number.
        line: usize,
        /// The address text.
        text: String,
    },

    /// A word lies past the end of the memory.
    #[error("line {line}: word {word} is past the end of a {words}-word memory")]
    PastEnd {
        /// 1-based line number.
        line: usize,
        /// Address of the word.
        word: u32,
        /// Memory depth.
        words: u32,
    },
}
