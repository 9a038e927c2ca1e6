//! Error types for name table synthesis.

use std::{io, path::PathBuf, result};

use read_fonts::ReadError;
use write_fonts::BuilderError;

use crate::Locale;

#[derive(Debug, thiserror::Error)]
pub enum NamingError {
    #[error("no family name configured for locale {0}")]
    MissingLocale(Locale),

    #[error("failed to parse font: {0}")]
    Parse(#[from] ReadError),

    #[error("failed to build font: {0}")]
    Build(#[from] BuilderError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = result::Result<T, NamingError>;
