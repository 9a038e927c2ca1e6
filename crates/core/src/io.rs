//! Shared file utilities.

use std::{
    fs::{File, create_dir_all},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use glob::glob;

use crate::error::TaskError;

/// Files in `dir` matching a glob `pattern`, in sorted order.
pub fn glob_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, TaskError> {
    let pattern = dir.join(pattern).to_string_lossy().into_owned();
    let paths = glob(&pattern).map_err(|source| TaskError::Pattern { pattern, source })?;
    let mut files: Vec<PathBuf> = paths.filter_map(Result::ok).filter(|p| p.is_file()).collect();
    files.sort();
    Ok(files)
}

/// Create the parent directory of `path` if it doesn't exist.
pub fn ensure_parent_dir(path: &Path) -> Result<(), TaskError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
    }
    Ok(())
}

/// Content hash of a file. A missing file is reported as a missing input.
pub fn hash_file(path: &Path) -> Result<blake3::Hash, TaskError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(TaskError::MissingInput(path.to_path_buf()));
        }
        Err(e) => return Err(TaskError::io(path, e)),
    };
    let mut hasher = blake3::Hasher::new();
    hasher.update_reader(&mut file).map_err(|e| TaskError::io(path, e))?;
    Ok(hasher.finalize())
}
