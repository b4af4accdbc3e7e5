//! Task error types.

use std::path::{Path, PathBuf};

/// Error that aborts a task and the composition it belongs to.
///
/// Stylesheet compile errors and per-image codec errors are not represented
/// here: they are logged by the task and never abort the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Filesystem error on a specific path.
    #[error("{}: {source}", path.display())]
    Io {
        /// Path that could not be read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid glob pattern.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Browser target queries could not be resolved.
    #[error("Invalid browser targets {queries:?}: {message}")]
    Targets {
        /// Queries as configured.
        queries: Vec<String>,
        /// Resolver message.
        message: String,
    },

    /// Input file lies outside the base directory it is packaged relative to.
    #[error("{} is outside of {}", path.display(), base.display())]
    OutsideBase {
        /// Offending file.
        path: PathBuf,
        /// Base directory.
        base: PathBuf,
    },

    /// Spawned or blocking work panicked or was cancelled.
    #[error("Task execution failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Failure reported by a task defined outside this crate.
    #[error(transparent)]
    External(Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Wrap an error from a task implemented in another crate.
    pub fn external(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::External(Box::new(err))
    }
}
