//! Design resolution: turning a design entry into concrete file paths.

use crate::types::DesignConfig;
use std::path::{Path, PathBuf};

/// A design with every input and output path filled in.
///
/// Overrides from the configuration are taken relative to the design
/// directory; absolute overrides are used as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDesign {
    /// The design name.
    pub name: String,
    /// The design directory.
    pub dir: PathBuf,
    /// The logical memory to process.
    pub memory: String,
    /// Vivado memory description.
    pub mdd: PathBuf,
    /// Reference init file.
    pub init: PathBuf,
    /// FASM produced from the reference bitstream.
    pub fasm: PathBuf,
    /// Reference bitstream.
    pub bitstream: PathBuf,
    /// Where `fasm2init` writes its result.
    pub init_from_fasm: PathBuf,
    /// Where `bits2init` writes its result.
    pub init_from_bits: PathBuf,
    /// Where `init2fasm` writes its result.
    pub new_fasm: PathBuf,
}

/// Resolves a design entry against its directory.
pub fn resolve_design(design: &DesignConfig) -> ResolvedDesign {
    let dir = design.dir.clone();
    let pick = |over: &Option<PathBuf>, default: PathBuf| match over {
        Some(p) => dir.join(p),
        None => dir.join(default),
    };
    ResolvedDesign {
        name: design.name.clone(),
        memory: design.memory.clone(),
        mdd: pick(&design.mdd, PathBuf::from(format!("{}.mdd", design.name))),
        init: pick(&design.init, Path::new("init").join("init.mem")),
        fasm: pick(&design.fasm, PathBuf::from("real.fasm")),
        bitstream: pick(
            &design.bitstream,
            Path::new("vivado").join(format!("{}.bit", design.name)),
        ),
        init_from_fasm: dir.join("init").join("fromFasm.mem"),
        init_from_bits: dir.join("init").join("new.mem"),
        new_fasm: dir.join("new.fasm"),
        dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_MEMORY;

    #[test]
    fn default_layout() {
        let design = DesignConfig::from_dir("designs/128b1", DEFAULT_MEMORY).unwrap();
        let r = resolve_design(&design);
        let dir = PathBuf::from("designs/128b1");
        assert_eq!(r.name, "128b1");
        assert_eq!(r.mdd, dir.join("128b1.mdd"));
        assert_eq!(r.init, dir.join("init").join("init.mem"));
        assert_eq!(r.fasm, dir.join("real.fasm"));
        assert_eq!(r.bitstream, dir.join("vivado").join("128b1.bit"));
        assert_eq!(r.init_from_fasm, dir.join("init").join("fromFasm.mem"));
        assert_eq!(r.init_from_bits, dir.join("init").join("new.mem"));
        assert_eq!(r.new_fasm, dir.join("new.fasm"));
    }

    #[test]
    fn overrides_relative_and_absolute() {
        let mut design = DesignConfig::from_dir("d/x", DEFAULT_MEMORY).unwrap();
        design.fasm = Some(PathBuf::from("out/top.fasm"));
        design.bitstream = Some(PathBuf::from("/abs/top.bit"));
        let r = resolve_design(&design);
        assert_eq!(r.fasm, PathBuf::from("d/x/out/top.fasm"));
        assert_eq!(r.bitstream, PathBuf::from("/abs/top.bit"));
    }
}
