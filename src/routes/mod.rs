//! API Routes
//!
//! - `/api/testTool/chat/upload/stream` - Answer with the file embedded in the prompt
//! - `/api/testTool/chat/upload/stream-with-tool` - Answer through the file reader tool
//! - `/api/health` - Health checks

pub mod chat;
pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let max_upload_bytes = state.config.server.max_upload_bytes;
    let allowed_origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(chat::router(state.clone()))
        .merge(health::router(state))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &allowed_origins)
}
