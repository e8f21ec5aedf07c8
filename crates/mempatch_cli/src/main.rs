//! mempatch: the command-line interface for block-RAM init patching.
//!
//! Provides `mempatch map` to print where every memory bit lives,
//! `mempatch check` and `mempatch check-all` to cross-check init files, FASM
//! and bitstreams, `fasm2init`, `bits2init` and `init2fasm` to rebuild one
//! representation from another, and `tiles` / `summary` listings.

#![warn(missing_docs)]

mod check;
mod convert;
mod map;
mod pipeline;
mod tiles;

#[cfg(test)]
mod fixture;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// mempatch: translate block-RAM contents between init files, FASM and bitstreams.
#[derive(Parser, Debug)]
#[command(name = "mempatch", version, about = "Block-RAM init patching for 7-series FPGAs")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print each primitive as it is mapped.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `mempatch.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// X-Ray database root, overriding `database.root`.
    #[arg(long, global = true)]
    pub db_root: Option<PathBuf>,

    /// Device family, overriding `database.family`.
    #[arg(long, global = true)]
    pub family: Option<String>,

    /// Part name, overriding `database.part`.
    #[arg(long, global = true)]
    pub part: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the frame and feature location of every memory bit.
    Map(MapArgs),
    /// Verify that init file, FASM and bitstream agree for one design.
    Check(DesignArgs),
    /// Verify every design under a directory (or every configured design).
    CheckAll(CheckAllArgs),
    /// Rebuild the init file from the design's FASM (`init/fromFasm.mem`).
    Fasm2init(ConvertArgs),
    /// Rebuild the init file from the design's bitstream (`init/new.mem`).
    Bits2init(ConvertArgs),
    /// Write `new.fasm` with the INIT lines of a memory file patched in.
    Init2fasm(Init2FasmArgs),
    /// List the block-RAM tiles of a memory with their frame segments.
    Tiles(DesignArgs),
    /// List the block-RAM cells of every design under a directory.
    Summary(SummaryArgs),
}

/// Selects one design and one of its memories.
#[derive(Parser, Debug)]
pub struct DesignArgs {
    /// Design directory, or the name of a design in `mempatch.toml`.
    pub design: String,

    /// Logical memory to process (default: `mem/ram`).
    #[arg(short, long)]
    pub memory: Option<String>,
}

/// Arguments for the `mempatch map` subcommand.
#[derive(Parser, Debug)]
pub struct MapArgs {
    /// The design to map.
    #[command(flatten)]
    pub target: DesignArgs,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Write the mapping to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `mempatch check-all` subcommand.
#[derive(Parser, Debug)]
pub struct CheckAllArgs {
    /// Directory whose subdirectories are designs. Defaults to the designs
    /// listed in `mempatch.toml`.
    pub dir: Option<PathBuf>,

    /// Logical memory to process in every design (default: `mem/ram`).
    #[arg(short, long)]
    pub memory: Option<String>,

    /// Worker threads (0 = one per core).
    #[arg(short = 'j', long, default_value_t = 0)]
    pub jobs: usize,

    /// Diagnostic output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for `fasm2init` and `bits2init`.
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// The design to convert.
    #[command(flatten)]
    pub target: DesignArgs,

    /// Compare the result with the design's `init/init.mem`.
    #[arg(long)]
    pub check: bool,
}

/// Arguments for the `mempatch init2fasm` subcommand.
#[derive(Parser, Debug)]
pub struct Init2FasmArgs {
    /// The design to patch.
    #[command(flatten)]
    pub target: DesignArgs,

    /// Memory file to patch in, relative to the design directory.
    pub memfile: PathBuf,

    /// Compare the result line by line with the design's `real.fasm`.
    #[arg(long, conflicts_with = "partial")]
    pub check: bool,

    /// Only write the lines of the memory's tiles.
    #[arg(long)]
    pub partial: bool,
}

/// Arguments for the `mempatch summary` subcommand.
#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Directory whose subdirectories are designs.
    pub dir: PathBuf,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Output format for mappings and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print per-primitive progress.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a configuration file.
    pub config: Option<String>,
    /// Database root override.
    pub db_root: Option<PathBuf>,
    /// Family override.
    pub family: Option<String>,
    /// Part override.
    pub part: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::env::var("TERM").is_ok_and(|t| t != "dumb"),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
        db_root: cli.db_root,
        family: cli.family,
        part: cli.part,
    };

    let result = match cli.command {
        Command::Map(ref args) => map::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
        Command::CheckAll(ref args) => check::run_all(args, &global),
        Command::Fasm2init(ref args) => convert::fasm2init(args, &global),
        Command::Bits2init(ref args) => convert::bits2init(args, &global),
        Command::Init2fasm(ref args) => convert::init2fasm(args, &global),
        Command::Tiles(ref args) => tiles::run(args, &global),
        Command::Summary(ref args) => tiles::summary(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
