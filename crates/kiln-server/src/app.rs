//! Router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::live_reload;
use crate::middleware::headers;
use crate::state::AppState;
use crate::static_files;

/// Create the application router.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();

    if state.live_reload.is_some() {
        router = router
            .route(live_reload::SOCKET_PATH, get(live_reload::ws_handler))
            .route(live_reload::CLIENT_PATH, get(live_reload::client_script));
    }

    router
        .fallback(static_files::serve_file)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(headers::no_store_layer())
                .layer(headers::content_type_options_layer()),
        )
        .with_state(state)
}
