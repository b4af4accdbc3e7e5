//! Server errors.

/// Error that stops the dev server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// `host:port` as configured.
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}
