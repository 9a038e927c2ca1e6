//! Argument lists for the group hinter subcommands.

use std::path::{Path, PathBuf};

use crate::runner::path_arg;

/// Files of one regional font as it moves through hinting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintFiles {
    /// Structured dump of the autohinted font.
    pub dump: PathBuf,
    /// Computed hints side-car.
    pub hints: PathBuf,
    /// Synthesized instructions side-car.
    pub instructions: PathBuf,
    /// Structured form with instructions integrated.
    pub integrated: PathBuf,
}

impl HintFiles {
    pub fn new(dump_dir: &Path, integrate_dir: &Path, stem: &str) -> Self {
        Self {
            dump: dump_dir.join(format!("{stem}.otd")),
            hints: dump_dir.join(format!("{stem}.hint.gz")),
            instructions: dump_dir.join(format!("{stem}.instr.gz")),
            integrated: integrate_dir.join(format!("{stem}.otd")),
        }
    }
}

/// `<otd> <hint>` pairs for the `hint` subcommand.
pub fn hint_pairs(files: &[HintFiles]) -> Vec<String> {
    files.iter().flat_map(|f| [path_arg(&f.dump), path_arg(&f.hints)]).collect()
}

/// `<otd> <hint> <instr>` triples for the `instruct` subcommand.
pub fn instruct_triples(files: &[HintFiles]) -> Vec<String> {
    files
        .iter()
        .flat_map(|f| [path_arg(&f.dump), path_arg(&f.hints), path_arg(&f.instructions)])
        .collect()
}

/// `<instr> <otd-in> <otd-out>` for the `integrate` subcommand.
pub fn integrate_args(files: &HintFiles) -> Vec<String> {
    vec![path_arg(&files.instructions), path_arg(&files.dump), path_arg(&files.integrated)]
}
