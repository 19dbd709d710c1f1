//! Media-stream WebSocket handler
//!
//! The telephony platform connects here once per call, at the URL returned
//! by the answer-call webhook. Each connection gets its own relay.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::Uri,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::time::{Duration, timeout};
use tracing::{debug, error, info, trace, warn};

use crate::core::media_stream::{
    InboundSignal, STREAM_CHANNEL_CAPACITY, StreamRoute, stream_channel,
};
use crate::core::relay::relay_call;
use crate::state::AppState;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// How long the writer may take to flush its close frame after the relay ends
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Media-stream WebSocket handler
///
/// Upgrades the connection and hands it to a relay keyed by the last path
/// segment.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Response {
    let path = uri.path().to_string();
    debug!(path = %path, "Media stream upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_stream_socket(socket, state, path))
}

/// Run one media-stream connection to completion.
async fn handle_media_stream_socket(socket: WebSocket, state: Arc<AppState>, path: String) {
    info!(path = %path, "Media stream connection established");

    let (mut sender, receiver) = socket.split();
    let (inbound, mut outlet) = stream_channel(STREAM_CHANNEL_CAPACITY);

    // Sender task for outgoing frames
    let sender_task = tokio::spawn(async move {
        while let Some(route) = outlet.next().await {
            let result = match route {
                StreamRoute::Frame(frame) => match serde_json::to_string(&frame) {
                    Ok(json) => sender.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outbound frame: {}", e);
                        continue;
                    }
                },
                StreamRoute::Close => {
                    debug!("Closing media stream connection");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                warn!("Failed to send media stream frame: {}", e);
                break;
            }
        }
    });

    let signals = receiver.filter_map(|message| async move { inbound_signal(message) });
    let signals = std::pin::pin!(signals);

    let outcome = relay_call(
        &path,
        &state.sessions,
        state.connector.as_ref(),
        state.relay_settings.clone(),
        inbound,
        signals,
    )
    .await;

    match outcome {
        Ok(stats) => debug!(path = %path, ?stats, "Media stream relay complete"),
        Err(e) if e.is_correlation_failure() => {
            warn!(path = %path, error = %e, "Rejected media stream connection")
        }
        Err(e) => error!(path = %path, error = %e, "Media stream relay failed"),
    }

    if timeout(WRITER_DRAIN_TIMEOUT, sender_task).await.is_err() {
        debug!(path = %path, "Media stream writer did not drain in time");
    }
}

/// Map a raw WebSocket message to what the relay consumes.
fn inbound_signal(message: Result<Message, axum::Error>) -> Option<InboundSignal> {
    match message {
        Ok(Message::Text(text)) => Some(InboundSignal::Text(text.as_str().to_owned())),
        Ok(Message::Close(frame)) => {
            debug!(?frame, "Media stream closed by peer");
            Some(InboundSignal::Closed)
        }
        Ok(Message::Binary(data)) => {
            trace!(len = data.len(), "Ignoring binary media stream frame");
            None
        }
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
        Err(e) => Some(InboundSignal::Error(e.to_string())),
    }
}
