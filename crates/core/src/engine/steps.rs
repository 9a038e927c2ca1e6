//! Execution of individual task steps.

use std::{
    fs::{create_dir_all, remove_file, rename},
    io::ErrorKind,
    path::PathBuf,
};

use log::{debug, error};

use super::archive::write_archive;
use crate::{
    error::TaskError,
    graph::Step,
    runner::{CommandRunner, ToolCommand},
};

/// Run `step`, returning files it produced beyond the task's declared outputs.
pub fn run_step(step: &Step, runner: &dyn CommandRunner) -> Result<Vec<PathBuf>, TaskError> {
    match step {
        Step::CreateDir(dir) => {
            create_dir_all(dir).map_err(|e| TaskError::io(dir, e))?;
            Ok(Vec::new())
        }
        Step::Run(command) => {
            run_tool(command, runner)?;
            Ok(Vec::new())
        }
        Step::Remove(path) => match remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(TaskError::io(path, e)),
            _ => Ok(Vec::new()),
        },
        Step::MoveIfPresent { from, to } => {
            if !from.exists() {
                debug!("{} not present, skipped", from.display());
                return Ok(Vec::new());
            }
            match remove_file(to) {
                Err(e) if e.kind() != ErrorKind::NotFound => return Err(TaskError::io(to, e)),
                _ => {}
            }
            rename(from, to).map_err(|e| TaskError::io(from, e))?;
            Ok(vec![to.clone()])
        }
        Step::AssertExists(path) => {
            if path.exists() {
                Ok(Vec::new())
            } else {
                Err(TaskError::MissingInput(path.clone()))
            }
        }
        Step::Archive { output, dir, pattern } => {
            write_archive(output, dir, pattern)?;
            Ok(Vec::new())
        }
    }
}

fn run_tool(command: &ToolCommand, runner: &dyn CommandRunner) -> Result<(), TaskError> {
    let output = runner
        .run(command)
        .map_err(|source| TaskError::Spawn { tool: command.program.clone(), source })?;

    if output.is_success() {
        return Ok(());
    }

    error!("{command}");
    for line in output.stderr.lines() {
        error!("  {line}");
    }
    Err(TaskError::ToolFailed {
        tool: command.program.clone(),
        code: output.code,
        stderr: output.stderr,
    })
}
