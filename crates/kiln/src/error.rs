//! CLI error types.

use kiln_config::ConfigError;
use kiln_tasks::TaskError;
use kiln_watch::WatchError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Task(#[from] TaskError),

    #[error("{0}")]
    Watch(#[from] WatchError),
}
