//! Live reload: the event hub, its WebSocket endpoint and the browser client.

mod hub;
mod websocket;

use axum::http::header;
use axum::response::IntoResponse;

pub use hub::LiveReloadHub;
pub(crate) use websocket::ws_handler;

/// URL of the browser client.
pub(crate) const CLIENT_PATH: &str = "/__kiln/livereload.js";
/// URL of the WebSocket endpoint.
pub(crate) const SOCKET_PATH: &str = "/__kiln/livereload";

const CLIENT_SCRIPT: &str = include_str!("client.js");

pub(crate) async fn client_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/javascript")], CLIENT_SCRIPT)
}
