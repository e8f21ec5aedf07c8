//! The `mempatch map` command: prints where every memory bit lives.

use std::fmt::Write as _;

use mempatch_map::MappingTable;

use crate::pipeline::{
    load_design, load_tool_config, open_database, report_failure, resolve, write_text,
};
use crate::{GlobalArgs, MapArgs, ReportFormat};

/// Runs the `mempatch map` command.
pub fn run(args: &MapArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_tool_config(global)?;
    let loaded = match open_database(&config, global)
        .and_then(|db| resolve(&args.target, &config).and_then(|d| load_design(&d, &db)))
    {
        Ok(l) => l,
        Err(e) => return Ok(report_failure(&e, &args.target.design, global)),
    };

    if global.verbose {
        for cell in &loaded.cells {
            eprintln!("   {cell}");
        }
    }

    let text = match args.format {
        ReportFormat::Text => render_text(&loaded.table),
        ReportFormat::Json => format!("{}\n", serde_json::to_string_pretty(loaded.table.entries())?),
    };
    match args.output {
        Some(ref path) => {
            if let Err(e) = write_text(path, &text) {
                return Ok(report_failure(&e, &args.target.design, global));
            }
            if !global.quiet {
                eprintln!(
                    "   Wrote {} mappings to {}",
                    loaded.table.len(),
                    path.display()
                );
            }
        }
        None => print!("{text}"),
    }
    Ok(0)
}

/// One line per bit: logical position, FASM feature and frame location.
pub fn render_text(table: &MappingTable) -> String {
    let mut out = String::new();
    for m in table {
        let _ = writeln!(
            out,
            "{:>6} {:>3}  {}[{:03}]  {}  frame 0x{:08x} word {:>3} bit {:>2}",
            m.word,
            m.bit,
            m.line_name(),
            m.column,
            m.feature,
            m.location.frame,
            m.location.word_index(),
            m.location.bit_in_word()
        );
    }
    out
}
