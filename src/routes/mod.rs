//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the game websocket and a health probe. Every other path falls back
//! to the static client bundle, which the core never inspects.

pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router: `/ws`, `/healthz`, static fallback.
pub fn app(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
