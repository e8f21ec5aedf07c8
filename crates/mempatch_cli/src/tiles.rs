//! The `mempatch tiles` and `mempatch summary` commands.

use std::fmt::Write as _;
use std::path::Path;

use mempatch_config::{resolve_design, DEFAULT_MEMORY};
use mempatch_vivado::{cells_by_tile, memories, read_mdd};
use mempatch_xray::BramDatabase;

use crate::pipeline::{
    discover_designs, load_design, load_tool_config, open_database, report_failure, resolve,
    DesignError, LoadedDesign,
};
use crate::{DesignArgs, GlobalArgs, SummaryArgs};

/// Runs the `mempatch tiles` command.
pub fn run(args: &DesignArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_tool_config(global)?;
    let result = open_database(&config, global).and_then(|db| {
        let design = resolve(args, &config)?;
        let loaded = load_design(&design, &db)?;
        render_tiles(&loaded, &db)
    });
    match result {
        Ok(text) => {
            print!("{text}");
            Ok(0)
        }
        Err(e) => Ok(report_failure(&e, &args.design, global)),
    }
}

/// Lists each tile of the memory with its frame segment and cells.
pub fn render_tiles(loaded: &LoadedDesign, db: &BramDatabase) -> Result<String, DesignError> {
    let refs: Vec<_> = loaded.cells.iter().collect();
    let mut tiles: Vec<_> = cells_by_tile(&refs).into_iter().collect();
    tiles.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    for (tile, cells) in tiles {
        let seg = db.segment(tile).map_err(DesignError::Database)?;
        let _ = writeln!(
            out,
            "{tile}  base 0x{:08x}  frames {}  words {}+{}",
            seg.base_address, seg.frame_count, seg.word_offset, seg.word_count
        );
        for cell in cells {
            let _ = writeln!(out, "    {cell}");
        }
    }
    Ok(out)
}

/// Runs the `mempatch summary` command.
pub fn summary(args: &SummaryArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    match render_summary(&args.dir) {
        Ok(text) => {
            print!("{text}");
            Ok(0)
        }
        Err(e) => Ok(report_failure(&e, &args.dir.display().to_string(), global)),
    }
}

/// Lists every memory of every design under `dir`.
pub fn render_summary(dir: &Path) -> Result<String, DesignError> {
    let mut out = String::new();
    for design in discover_designs(dir, DEFAULT_MEMORY)? {
        let resolved = resolve_design(&design);
        let cells = read_mdd(&resolved.mdd).map_err(|source| DesignError::Mdd {
            path: resolved.mdd.clone(),
            source,
        })?;
        let _ = writeln!(out, "{} ({} cells)", design.name, cells.len());
        for (memory, shape) in memories(&cells) {
            let members: Vec<_> = cells.iter().filter(|c| c.memory_name() == memory).collect();
            let _ = writeln!(
                out,
                "    {memory}  {}x{}  {} cell(s)",
                shape.words,
                shape.bits,
                members.len()
            );
            for cell in members {
                let _ = writeln!(out, "        {cell}");
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Fixture;
    use std::fs;

    #[test]
    fn tiles_lists_segments_in_order() {
        let f = Fixture::new();
        let db = f.database();
        let loaded = load_design(&f.resolved(), &db).unwrap();
        let text = render_tiles(&loaded, &db).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "BRAM_L_X6Y5  base 0x00800000  frames 128  words 0+10");
        assert!(lines[1].starts_with("    mem/ram_reg_0 RAMB36E1 BRAM_L_X6Y5"));
        assert_eq!(lines[2], "BRAM_R_X7Y5  base 0x00800100  frames 128  words 20+10");
        assert!(lines[3].contains("p2_d16 rw18"));
    }

    #[test]
    fn summary_lists_memories() {
        let f = Fixture::new();
        let text = render_summary(&f.root().join("designs")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "d1 (2 cells)");
        assert_eq!(lines[1], "    mem/ram  1024x54  2 cell(s)");
        assert_eq!(
            lines[2],
            "        mem/ram_reg_0 RAMB36E1 BRAM_L_X6Y5 RAMB36_X0Y1 p4_d32 rw36 addr 1023:0 slice 35:0"
        );
    }

    #[test]
    fn summary_reports_bad_mdd() {
        let f = Fixture::new();
        fs::write(f.design_dir().join("d1.mdd"), "ENDCELL\n").unwrap();
        let err = render_summary(&f.root().join("designs")).unwrap_err();
        assert!(matches!(err, DesignError::Mdd { .. }));
        let args = SummaryArgs {
            dir: f.root().join("designs"),
        };
        assert_eq!(summary(&args, &f.global()).unwrap(), 1);
    }
}
