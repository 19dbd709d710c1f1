pub mod api;
pub mod stream;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Assemble the full application router.
pub fn create_app(state: Arc<AppState>) -> Router {
    let stream_router = stream::create_stream_router(&state.config.stream_path);

    Router::new()
        .merge(api::create_api_router())
        .merge(stream_router)
        .with_state(state)
}
