//! Filesystem helpers shared by the tasks.

use std::path::{Path, PathBuf};

use crate::TaskError;

/// Files (not directories) under `base` matching `pattern`, sorted.
///
/// `pattern` is relative to `base`, e.g. `**/*.html`.
pub(crate) fn glob_files(base: &Path, pattern: &str) -> Result<Vec<PathBuf>, TaskError> {
    let full = format!(
        "{}/{pattern}",
        glob::Pattern::escape(&base.to_string_lossy())
    );

    let mut files = Vec::new();
    for entry in glob::glob(&full)? {
        let path = entry.map_err(|e| TaskError::Io {
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// `path` relative to `base`, or an error when it lies outside.
pub(crate) fn relative_to<'a>(path: &'a Path, base: &Path) -> Result<&'a Path, TaskError> {
    path.strip_prefix(base).map_err(|_| TaskError::OutsideBase {
        path: path.to_path_buf(),
        base: base.to_path_buf(),
    })
}

/// Write `contents` to `path`, creating parent directories.
pub(crate) async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(TaskError::io(parent))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(TaskError::io(path))
}
