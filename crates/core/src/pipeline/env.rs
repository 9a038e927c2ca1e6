//! Host tool availability.

use std::path::PathBuf;

use log::debug;

use crate::context::Toolchain;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub role: &'static str,
    pub program: String,
    /// Resolved location, `None` if the program cannot be found.
    pub location: Option<PathBuf>,
}

impl ToolStatus {
    pub fn is_found(&self) -> bool {
        self.location.is_some()
    }
}

/// Resolve every distinct program of `tools` and print one line per tool.
///
/// Missing programs are reported, never treated as an error.
pub fn check_env(tools: &Toolchain) -> Vec<ToolStatus> {
    let mut statuses: Vec<ToolStatus> = Vec::new();

    for (role, tool) in tools.all() {
        if let Some(seen) = statuses.iter().find(|s| s.program == tool.program) {
            debug!("{role}: same program as {}", seen.role);
            continue;
        }
        let location = which::which(&tool.program).ok();
        match &location {
            Some(path) => println!("  ✓ {role}: {} ({})", tool.program, path.display()),
            None => println!("  ✗ {role}: {} not found", tool.program),
        }
        statuses.push(ToolStatus { role, program: tool.program.clone(), location });
    }

    let missing = statuses.iter().filter(|s| !s.is_found()).count();
    if missing == 0 {
        println!("All {} tools found", statuses.len());
    } else {
        println!("{missing} of {} tools missing", statuses.len());
    }
    statuses
}
