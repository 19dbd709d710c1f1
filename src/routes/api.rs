use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, incoming};
use crate::state::AppState;
use std::sync::Arc;

/// Create the REST router
///
/// - `GET /` - health check
/// - `POST /answer-call` - incoming-call webhook, answers with call-control markup
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/answer-call", post(incoming::answer_call))
        .layer(TraceLayer::new_for_http())
}
