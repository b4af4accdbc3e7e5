//! Application state.

use std::path::PathBuf;
use std::sync::Arc;

use crate::live_reload::LiveReloadHub;

/// State shared across all handlers.
pub(crate) struct AppState {
    /// Directory served at `/`.
    pub(crate) root: PathBuf,
    /// Live reload hub, `None` when live reload is disabled.
    pub(crate) live_reload: Option<Arc<LiveReloadHub>>,
}
