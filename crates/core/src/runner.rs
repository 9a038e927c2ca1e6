//! External tool invocation.
//!
//! Tasks describe commands as [`ToolCommand`] values; a [`CommandRunner`]
//! executes them. The engine only ever talks to the trait, so tests can
//! substitute a runner that records invocations instead of spawning tools.

use std::{
    fmt, io,
    path::{Path, PathBuf},
    process::Command,
};

use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path(self, path: &Path) -> Self {
        self.arg(path_arg(path))
    }

    pub fn paths<'a>(self, paths: impl IntoIterator<Item = &'a PathBuf>) -> Self {
        self.args(paths.into_iter().map(|p| path_arg(p)))
    }

}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Exit status and captured output of one tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success() -> Self {
        Self { code: Some(0), ..Self::default() }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self { code: Some(code), stdout: String::new(), stderr: stderr.into() }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner: Sync {
    /// Run `command` to completion.
    ///
    /// `Err` means the tool could not be launched at all; a tool that ran and
    /// failed is reported through [`ToolOutput::code`].
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput>;
}

/// Runs tools as child processes of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        debug!("exec: {command}");

        let output = Command::new(&command.program).args(&command.args).output()?;
        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
