//! Answer-call webhook.
//!
//! The telephony platform posts here when a call comes in. The handler
//! records a session for the call and answers with markup that connects the
//! call to this relay's media-stream listener.

use axum::{
    Form,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::core::media_stream::markup::{call_stream_url, connect_stream_response};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Form fields of the incoming-call webhook that the relay reads.
#[derive(Debug, Default, Deserialize)]
pub struct AnswerCallForm {
    #[serde(rename = "CallSid", default)]
    pub call_sid: Option<String>,
    #[serde(rename = "From", default)]
    pub from: Option<String>,
}

/// `POST /answer-call`
pub async fn answer_call(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AnswerCallForm>,
) -> AppResult<Response> {
    let call_id = form
        .call_sid
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingField("CallSid"))?;

    if !is_valid_call_id(call_id) {
        return Err(AppError::InvalidCallId(call_id.to_string()));
    }

    let stream_url = call_stream_url(&state.config.ws_server_uri, call_id);
    state.sessions.create(call_id);

    info!(
        call_id = %call_id,
        from = ?form.from,
        stream_url = %stream_url,
        "Answering call"
    );

    let body = connect_stream_response(&stream_url, &state.config.fallback_phrase)?;
    Ok(([(header::CONTENT_TYPE, "text/xml")], body).into_response())
}

/// Call ids become a URL path segment, so only URL-safe characters pass.
fn is_valid_call_id(call_id: &str) -> bool {
    call_id.len() <= 128
        && call_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
