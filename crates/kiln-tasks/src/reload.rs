//! Live reload signalling.
//!
//! Tasks report finished outputs through a [`ReloadSink`]. The dev server
//! provides the real implementation; one-shot commands use [`NoReload`].

use std::path::PathBuf;

/// Change announced to connected browsers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReloadEvent {
    /// A stylesheet was rewritten and can be swapped in place.
    Css {
        /// Filesystem path of the stylesheet.
        path: PathBuf,
    },
    /// Anything else changed; the page must reload.
    Reload {
        /// Filesystem path that changed.
        path: PathBuf,
    },
}

impl ReloadEvent {
    /// Filesystem path carried by the event.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Css { path } | Self::Reload { path } => path,
        }
    }
}

/// Process-scoped handle that forwards reload events to browsers.
pub trait ReloadSink: Send + Sync {
    /// Announce a change. Must not block.
    fn notify(&self, event: ReloadEvent);
}

/// Sink used when no dev server is running.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReload;

impl ReloadSink for NoReload {
    fn notify(&self, event: ReloadEvent) {
        tracing::debug!(path = %event.path().display(), "No live reload server, dropping event");
    }
}
