//! Development server for kiln.
//!
//! Serves the working tree over HTTP with live reload:
//!
//! - Static files from the app directory, `index.html` for directories
//! - `/__kiln/livereload.js`: browser client, injected into every HTML page
//! - `/__kiln/livereload`: WebSocket that forwards [`LiveReloadHub`] events
//!
//! ```text
//! Tasks ──ReloadSink──► LiveReloadHub ──broadcast──► WebSocket ──► Browser
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use kiln_server::{LiveReloadHub, ServerConfig, run_server};
//!
//! let config = ServerConfig {
//!     host: "localhost".to_owned(),
//!     port: 3000,
//!     root_dir: PathBuf::from("app"),
//!     live_reload_enabled: true,
//! };
//! let hub = Arc::new(LiveReloadHub::new(config.root_dir.clone()));
//! run_server(&config, Some(hub), shutdown_signal()).await?;
//! ```

mod app;
mod error;
mod live_reload;
mod middleware;
mod state;
mod static_files;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use kiln_config::Config;
use kiln_tasks::{Task, TaskError};

pub use error::ServerError;
pub use live_reload::LiveReloadHub;

use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory served at `/`.
    pub root_dir: PathBuf,
    /// Inject the reload client and expose the WebSocket.
    pub live_reload_enabled: bool,
}

impl ServerConfig {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            root_dir: config.paths_resolved.app_dir.clone(),
            live_reload_enabled: config.live_reload.enabled,
        }
    }

    /// Browser URL of the server.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

/// Run the server until `shutdown` completes.
///
/// `hub` is attached only when live reload is enabled.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or serving fails.
pub async fn run_server(
    config: &ServerConfig,
    hub: Option<Arc<LiveReloadHub>>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let state = Arc::new(AppState {
        root: config.root_dir.clone(),
        live_reload: hub.filter(|_| config.live_reload_enabled),
    });
    let app = app::create_router(state);

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
    tracing::info!(
        address = %address,
        root = %config.root_dir.display(),
        "Serving {}",
        config.url()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}

/// Wait for Ctrl-C.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// The dev server as a pipeline task, running until Ctrl-C.
pub struct ServeTask {
    config: ServerConfig,
    hub: Arc<LiveReloadHub>,
}

impl ServeTask {
    /// Serve with `hub` as the live reload source. Tasks that should trigger
    /// reloads must be given the same hub.
    pub fn new(config: ServerConfig, hub: Arc<LiveReloadHub>) -> Self {
        Self { config, hub }
    }
}

#[async_trait]
impl Task for ServeTask {
    fn name(&self) -> &str {
        "browsersync"
    }

    async fn run(&self) -> Result<(), TaskError> {
        run_server(&self.config, Some(Arc::clone(&self.hub)), shutdown_signal())
            .await
            .map_err(TaskError::external)
    }
}
