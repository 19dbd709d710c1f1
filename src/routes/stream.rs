//! Media-stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media-stream WebSocket router
///
/// # Endpoints
///
/// - `GET <stream_path>/{call_id}` - WebSocket upgrade for one call
/// - `GET <stream_path>` - accepted too; the call id is then missing or
///   unknown and the connection is closed right after the upgrade
///
/// # Protocol
///
/// The telephony platform sends JSON frames tagged by `event`
/// (`connected`, `start`, `media`, `stop`); the relay answers with
/// `media` frames carrying model audio for the call's `streamSid`.
pub fn create_stream_router(stream_path: &str) -> Router<Arc<AppState>> {
    let stream_path = stream_path.trim_end_matches('/');
    Router::new()
        .route(stream_path, get(media_stream_handler))
        .route(
            &format!("{stream_path}/{{*call_path}}"),
            get(media_stream_handler),
        )
        .layer(TraceLayer::new_for_http())
}
