//! Watcher errors.

/// Error raised while setting up or running the watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// A watch glob failed to parse.
    #[error("Invalid watch glob '{pattern}': {source}")]
    Pattern {
        /// Glob as configured, including any `!` prefix.
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// The platform watcher could not be created or attached.
    #[error("File watcher failed: {0}")]
    Notify(#[from] notify::Error),
}
