//! The `fasm2init`, `bits2init` and `init2fasm` commands.
//!
//! Each rebuilds one representation of the selected memory from another
//! through the mapping table and writes it next to the design's inputs.
//! With `--check`, the result is compared against the reference file the
//! vendor flow produced.

use std::path::Path;

use mempatch_map::{InitImage, Reconstructor};
use mempatch_vivado::{read_mem, write_mem};
use mempatch_xray::{patch_fasm, BramDatabase};

use crate::pipeline::{
    load_design, load_tool_config, open_database, read_bitstream, read_fasm_rows, read_text,
    report_failure, resolve, write_text, DesignError, LoadedDesign,
};
use crate::{ConvertArgs, DesignArgs, GlobalArgs, Init2FasmArgs};

/// Runs the `mempatch fasm2init` command.
pub fn fasm2init(args: &ConvertArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    with_design(&args.target, global, |loaded, _| {
        let rows = read_fasm_rows(&loaded.design.fasm)?;
        let init = Reconstructor::new(&loaded.table).init_from_features(&rows);
        finish_init(loaded, &init, &loaded.design.init_from_fasm, args.check, global)
    })
}

/// Runs the `mempatch bits2init` command.
pub fn bits2init(args: &ConvertArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    with_design(&args.target, global, |loaded, db| {
        let frames = read_bitstream(&loaded.design.bitstream, db.words_per_frame)?;
        let init = Reconstructor::new(&loaded.table).init_from_frames(&frames)?;
        finish_init(loaded, &init, &loaded.design.init_from_bits, args.check, global)
    })
}

/// Runs the `mempatch init2fasm` command.
pub fn init2fasm(args: &Init2FasmArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    with_design(&args.target, global, |loaded, _| {
        let design = &loaded.design;
        let memfile = design.dir.join(&args.memfile);
        let init = read_mem(&memfile, loaded.shape()).map_err(|source| DesignError::Mem {
            path: memfile.clone(),
            source,
        })?;
        let rows = Reconstructor::new(&loaded.table).features_from_init(&init)?;
        let original = read_text(&design.fasm)?;
        let patched = patch_fasm(&original, &rows, args.partial).map_err(|message| {
            DesignError::Fasm {
                path: design.fasm.clone(),
                message,
            }
        })?;
        write_text(&design.new_fasm, &patched)?;
        if !global.quiet {
            eprintln!("   Wrote {}", design.new_fasm.display());
        }
        if args.check {
            compare_fasm(&design.fasm, &original, &patched)?;
            if !global.quiet {
                eprintln!("   {} matches {}", design.new_fasm.display(), design.fasm.display());
            }
        }
        Ok(())
    })
}

/// Loads the design and runs `body`, turning failures into diagnostics.
fn with_design<F>(
    target: &DesignArgs,
    global: &GlobalArgs,
    body: F,
) -> Result<i32, Box<dyn std::error::Error>>
where
    F: FnOnce(&LoadedDesign, &BramDatabase) -> Result<(), DesignError>,
{
    let config = load_tool_config(global)?;
    let result = open_database(&config, global).and_then(|db| {
        let design = resolve(target, &config)?;
        let loaded = load_design(&design, &db)?;
        if global.verbose {
            for cell in &loaded.cells {
                eprintln!("   {cell}");
            }
        }
        body(&loaded, &db)
    });
    match result {
        Ok(()) => Ok(0),
        Err(e) => Ok(report_failure(&e, &target.design, global)),
    }
}

/// Writes a rebuilt init image and optionally compares it with the reference.
fn finish_init(
    loaded: &LoadedDesign,
    init: &InitImage,
    path: &Path,
    check: bool,
    global: &GlobalArgs,
) -> Result<(), DesignError> {
    let shape = loaded.shape();
    write_mem(path, init, shape.words).map_err(|source| DesignError::Mem {
        path: path.to_path_buf(),
        source,
    })?;
    if !global.quiet {
        eprintln!("   Wrote {}", path.display());
    }
    if check {
        let reference = loaded.read_init(&loaded.design.init)?;
        if let Some((word, bit)) = init.first_difference(&reference, shape) {
            return Err(DesignError::InitMismatch {
                path: loaded.design.init.clone(),
                word,
                bit,
            });
        }
        if !global.quiet {
            eprintln!("   {} matches {}", path.display(), loaded.design.init.display());
        }
    }
    Ok(())
}

/// Compares two FASM texts line by line.
fn compare_fasm(path: &Path, expected: &str, actual: &str) -> Result<(), DesignError> {
    let mut expected_lines = expected.lines();
    let mut actual_lines = actual.lines();
    let mut line = 0;
    loop {
        line += 1;
        match (expected_lines.next(), actual_lines.next()) {
            (None, None) => return Ok(()),
            (e, a) if e == a => continue,
            (e, a) => {
                return Err(DesignError::FasmMismatch {
                    path: path.to_path_buf(),
                    line,
                    expected: e.unwrap_or("<end of file>").to_string(),
                    actual: a.unwrap_or("<end of file>").to_string(),
                })
            }
        }
    }
}
