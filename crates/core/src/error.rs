//! Error types for configuration loading and task execution.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Problems with the build configuration. Fatal before any task runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("hint parameters for weight '{weight}' missing at {path}")]
    MissingHintConfig { weight: String, path: PathBuf },

    #[error("invalid release version '{0}', expected YYYY-MM-DD or YYYY-MM-DD.N")]
    Version(String),
}

/// Why a single task did not complete.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{tool} exited with {}", exit_label(.code))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("missing input {0}")]
    MissingInput(PathBuf),

    #[error("task finished without producing {0}")]
    MissingOutput(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("invalid glob pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

impl TaskError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// A requested task cannot be declared against the current configuration.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("task {0} is missing its weight or region")]
    MalformedKey(String),

    #[error("weight '{0}' is not configured")]
    UnknownWeight(String),

    #[error("region '{0}' is not configured")]
    UnknownRegion(String),

    #[error("dependency cycle through {0}")]
    Cycle(String),
}
