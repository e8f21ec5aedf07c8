//! The `mempatch check` and `mempatch check-all` commands.
//!
//! For every bit of the memory, the init file, the FASM rows and the
//! bitstream frames must agree at the mapped positions. `check-all` runs the
//! same check over many designs on a rayon thread pool and prints one
//! PASS/FAIL line per design in name order.

use mempatch_config::{resolve_design, DesignConfig, ResolvedDesign, DEFAULT_MEMORY};
use mempatch_diagnostics::DiagnosticSink;
use mempatch_map::{Verifier, VerifySummary};
use mempatch_xray::BramDatabase;
use rayon::prelude::*;

use crate::pipeline::{
    discover_designs, load_design, load_tool_config, open_database, read_bitstream,
    read_fasm_rows, render_diagnostics, report_failure, resolve, DesignError, LoadedDesign,
};
use crate::{CheckAllArgs, DesignArgs, GlobalArgs};

/// Result of checking a single design.
#[derive(Debug)]
pub struct CheckResult {
    /// The design name.
    pub name: String,
    /// The memory checked.
    pub memory: String,
    /// Cells and bits checked, or the first failure.
    pub outcome: Result<VerifySummary, DesignError>,
}

impl CheckResult {
    /// Returns true if every bit agreed.
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Runs the `mempatch check` command.
pub fn run(args: &DesignArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_tool_config(global)?;
    let db = match open_database(&config, global) {
        Ok(db) => db,
        Err(e) => return Ok(report_failure(&e, "database", global)),
    };
    let design = match resolve(args, &config) {
        Ok(d) => d,
        Err(e) => return Ok(report_failure(&e, &args.design, global)),
    };

    if !global.quiet {
        eprintln!("   Checking {} ({})", design.name, design.memory);
    }
    let result = check_one(&design, &db, global.verbose);
    if !global.quiet {
        print_check_result(&result);
    }
    match result.outcome {
        Ok(_) => Ok(0),
        Err(ref e) => Ok(report_failure(e, &design.name, global)),
    }
}

/// Runs the `mempatch check-all` command.
pub fn run_all(args: &CheckAllArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_tool_config(global)?;
    let db = match open_database(&config, global) {
        Ok(db) => db,
        Err(e) => return Ok(report_failure(&e, "database", global)),
    };

    let memory = args.memory.as_deref().unwrap_or(DEFAULT_MEMORY);
    let designs: Vec<DesignConfig> = match args.dir {
        Some(ref dir) => match discover_designs(dir, memory) {
            Ok(d) => d,
            Err(e) => return Ok(report_failure(&e, &dir.display().to_string(), global)),
        },
        None => config
            .designs
            .iter()
            .cloned()
            .map(|mut d| {
                if let Some(ref m) = args.memory {
                    d.memory = m.clone();
                }
                d
            })
            .collect(),
    };
    if designs.is_empty() {
        eprintln!("warning: no designs found");
        return Ok(0);
    }
    if !global.quiet {
        eprintln!("   Found {} design(s)", designs.len());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs)
        .build()?;
    let results: Vec<CheckResult> = pool.install(|| {
        designs
            .par_iter()
            .map(|d| check_one(&resolve_design(d), &db, false))
            .collect()
    });

    let sink = DiagnosticSink::new();
    for result in &results {
        if !global.quiet {
            print_check_result(result);
        }
        if let Err(ref e) = result.outcome {
            sink.emit(e.to_diagnostic(&result.name));
        }
    }
    render_diagnostics(&sink, global.color, args.format);

    let passed = results.iter().filter(|r| r.passed()).count();
    let failed = results.len() - passed;
    if !global.quiet {
        eprintln!();
        eprintln!("   Result: {passed} passed, {failed} failed");
    }
    Ok(if failed > 0 { 1 } else { 0 })
}

/// Maps and verifies one design.
pub fn check_one(design: &ResolvedDesign, db: &BramDatabase, verbose: bool) -> CheckResult {
    let outcome = load_design(design, db).and_then(|loaded| {
        if verbose {
            for cell in &loaded.cells {
                eprintln!("   {cell}");
            }
        }
        verify(&loaded, db.words_per_frame)
    });
    CheckResult {
        name: design.name.clone(),
        memory: design.memory.clone(),
        outcome,
    }
}

/// Verifies a mapped design against its init file, FASM and bitstream.
pub fn verify(loaded: &LoadedDesign, words_per_frame: u32) -> Result<VerifySummary, DesignError> {
    let design = &loaded.design;
    let init = loaded.read_init(&design.init)?;
    let rows = read_fasm_rows(&design.fasm)?;
    let frames = read_bitstream(&design.bitstream, words_per_frame)?;
    Ok(Verifier::new(&loaded.table, &init, &rows, &frames).run()?)
}

fn print_check_result(result: &CheckResult) {
    match result.outcome {
        Ok(summary) => eprintln!(
            "   PASS  {} ({}): {} cells, {} bits",
            result.name, result.memory, summary.cells, summary.bits_checked
        ),
        Err(ref e) => eprintln!("   FAIL  {} ({}): {e}", result.name, result.memory),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Fixture;
    use crate::ReportFormat;
    use std::fs;

    fn design_args(f: &Fixture) -> DesignArgs {
        DesignArgs {
            design: f.design_dir().to_string_lossy().into_owned(),
            memory: None,
        }
    }

    #[test]
    fn consistent_design_passes() {
        let f = Fixture::new();
        let result = check_one(&f.resolved(), &f.database(), false);
        let summary = result.outcome.unwrap();
        assert_eq!(summary.cells, 2);
        assert_eq!(summary.bits_checked, 1024 * 54);
        assert_eq!(run(&design_args(&f), &f.global()).unwrap(), 0);
    }

    #[test]
    fn flipped_init_word_fails() {
        let f = Fixture::new();
        let path = f.design_dir().join("init").join("init.mem");
        let text = fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        let word = u64::from_str_radix(&lines[17], 16).unwrap() ^ 1;
        lines[17] = format!("{word:x}");
        fs::write(&path, lines.join("\n")).unwrap();

        let result = check_one(&f.resolved(), &f.database(), false);
        match result.outcome {
            Err(DesignError::Map(mempatch_map::MapError::VerificationFailure(m))) => {
                assert_eq!((m.word, m.bit), (17, 0));
                assert_eq!(m.feature, m.frame);
                assert_ne!(m.init, m.feature);
            }
            other => panic!("expected verification failure, got {other:?}"),
        }
        assert_eq!(run(&design_args(&f), &f.global()).unwrap(), 1);
    }

    #[test]
    fn missing_bitstream_fails() {
        let f = Fixture::new();
        fs::remove_file(f.design_dir().join("vivado").join("d1.bit")).unwrap();
        let result = check_one(&f.resolved(), &f.database(), false);
        assert!(matches!(result.outcome, Err(DesignError::Bitstream { .. })));
    }

    #[test]
    fn check_all_reports_each_design() {
        let f = Fixture::new();
        let designs = f.root().join("designs");
        let copy = designs.join("d2");
        fs::create_dir_all(copy.join("init")).unwrap();
        fs::create_dir_all(copy.join("vivado")).unwrap();
        let src = f.design_dir();
        fs::copy(src.join("d1.mdd"), copy.join("d2.mdd")).unwrap();
        fs::copy(src.join("init").join("init.mem"), copy.join("init").join("init.mem")).unwrap();
        fs::copy(src.join("vivado").join("d1.bit"), copy.join("vivado").join("d2.bit")).unwrap();
        fs::write(copy.join("real.fasm"), "").unwrap();

        let mut args = CheckAllArgs {
            dir: Some(designs.clone()),
            memory: None,
            jobs: 2,
            format: ReportFormat::Json,
        };
        assert_eq!(run_all(&args, &f.global()).unwrap(), 1);

        fs::copy(src.join("real.fasm"), copy.join("real.fasm")).unwrap();
        args.format = ReportFormat::Text;
        assert_eq!(run_all(&args, &f.global()).unwrap(), 0);
    }

    #[test]
    fn check_all_empty_directory() {
        let f = Fixture::new();
        let empty = f.root().join("nothing");
        fs::create_dir_all(&empty).unwrap();
        let args = CheckAllArgs {
            dir: Some(empty),
            memory: None,
            jobs: 1,
            format: ReportFormat::Text,
        };
        assert_eq!(run_all(&args, &f.global()).unwrap(), 0);
    }
}
