//! Release archive writer.

use std::{
    fs::{File, remove_file},
    io::copy,
    path::{Path, PathBuf},
};

use log::debug;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    error::TaskError,
    io::{ensure_parent_dir, glob_files},
};

/// Zip every file in `dir` matching `pattern` into `output`, stored flat.
///
/// Returns the archived files.
pub fn write_archive(output: &Path, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, TaskError> {
    let files = glob_files(dir, pattern)?;
    ensure_parent_dir(output)?;

    // A partial archive from an earlier run must not be mistaken for a result.
    match remove_file(output) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            return Err(TaskError::io(output, e));
        }
        _ => {}
    }

    let archive_err = |source| TaskError::Archive { path: output.to_path_buf(), source };
    let file = File::create(output).map_err(|e| TaskError::io(output, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    for path in &files {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        debug!("archive {}: {name}", output.display());
        zip.start_file(name, options).map_err(archive_err)?;
        let mut source = File::open(path).map_err(|e| TaskError::io(path, e))?;
        copy(&mut source, &mut zip).map_err(|e| TaskError::io(path, e))?;
    }

    zip.finish().map_err(archive_err)?;
    Ok(files)
}
