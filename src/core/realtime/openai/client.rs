//! OpenAI Realtime API connector.
//!
//! Dials the Realtime WebSocket on a background task and bridges it to a
//! [`RemoteEndpoint`]. The task owns the socket; the session only ever sees
//! the [`RemoteHandle`](crate::core::realtime::RemoteHandle) half.

use futures::{SinkExt, StreamExt};
use http::HeaderValue;
use http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::Message;
use url::Url;

use super::config::{OPENAI_BETA_HEADER, OPENAI_REALTIME_URL};
use super::messages::ServerEvent;
use crate::core::realtime::base::{
    REMOTE_CHANNEL_CAPACITY, RealtimeConnector, RealtimeError, RealtimeResult, RemoteConnection,
    RemoteEndpoint, remote_pair,
};

/// Connector for the OpenAI Realtime API.
#[derive(Debug, Clone)]
pub struct OpenAIRealtimeConnector {
    base_url: String,
}

impl OpenAIRealtimeConnector {
    /// Create a connector against the given `ws://` or `wss://` endpoint.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Endpoint this connector dials.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for OpenAIRealtimeConnector {
    fn default() -> Self {
        Self::new(OPENAI_REALTIME_URL)
    }
}

impl RealtimeConnector for OpenAIRealtimeConnector {
    fn open(&self, credential: &str, model: &str) -> RemoteConnection {
        let (connection, endpoint) = remote_pair(REMOTE_CHANNEL_CAPACITY);
        let request = build_connect_request(&self.base_url, credential, model);
        let model = model.to_string();

        tokio::spawn(async move {
            run_connection(request, endpoint, &model).await;
        });

        connection
    }
}

/// Build the endpoint URL with the model selected through the query string.
pub fn build_connect_url(base_url: &str, model: &str) -> RealtimeResult<Url> {
    let mut url = Url::parse(base_url).map_err(|e| {
        RealtimeError::InvalidConfiguration(format!("Invalid realtime URL '{base_url}': {e}"))
    })?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "Realtime URL must use ws or wss, got '{other}'"
            )));
        }
    }

    url.query_pairs_mut().append_pair("model", model);
    Ok(url)
}

/// Build the WebSocket handshake request.
///
/// Carries the bearer credential and the `OpenAI-Beta` protocol marker on
/// top of the standard upgrade headers.
pub fn build_connect_request(
    base_url: &str,
    credential: &str,
    model: &str,
) -> RealtimeResult<Request> {
    let url = build_connect_url(base_url, model)?;
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;

    let mut bearer = HeaderValue::from_str(&format!("Bearer {credential}")).map_err(|_| {
        RealtimeError::InvalidConfiguration("API key contains invalid header characters".into())
    })?;
    bearer.set_sensitive(true);

    let headers = request.headers_mut();
    headers.insert(AUTHORIZATION, bearer);
    headers.insert("OpenAI-Beta", HeaderValue::from_static(OPENAI_BETA_HEADER));

    Ok(request)
}

async fn run_connection(
    request: RealtimeResult<Request>,
    mut endpoint: RemoteEndpoint,
    model: &str,
) {
    let request = match request {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(model, error = %e, "Cannot build realtime handshake");
            endpoint.failed(e).await;
            endpoint.closed().await;
            return;
        }
    };

    let shutdown = endpoint.shutdown_token();

    let ws_stream = tokio::select! {
        _ = shutdown.cancelled() => {
            tracing::debug!(model, "Realtime connection cancelled during handshake");
            endpoint.closed().await;
            return;
        }
        result = tokio_tungstenite::connect_async(request) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                tracing::error!(model, error = %e, "Failed to connect to OpenAI Realtime API");
                endpoint
                    .failed(RealtimeError::ConnectionFailed(e.to_string()))
                    .await;
                endpoint.closed().await;
                return;
            }
        }
    };

    tracing::info!(model, "Connected to OpenAI Realtime API");

    let (mut ws_sink, mut ws_source) = ws_stream.split();
    endpoint.opened().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("Closing realtime connection on request");
                if let Err(e) = ws_sink.send(Message::Close(None)).await {
                    tracing::debug!("Close frame not delivered: {}", e);
                }
                break;
            }

            // Handle outgoing messages
            command = endpoint.next_command() => {
                let Some(event) = command else {
                    let _ = ws_sink.send(Message::Close(None)).await;
                    break;
                };

                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(event = event.event_type(), "Failed to serialize event: {}", e);
                        continue;
                    }
                };

                if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                    tracing::error!("Failed to send WebSocket message: {}", e);
                    endpoint
                        .failed(RealtimeError::WebSocketError(e.to_string()))
                        .await;
                    break;
                }
            }

            // Handle incoming messages
            frame = ws_source.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match ServerEvent::parse(text.as_str()) {
                        Ok(event) => endpoint.deliver(event).await,
                        Err(e) => {
                            tracing::warn!("Skipping malformed server event: {} - {}", e, text.as_str());
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                            tracing::error!("Failed to send pong: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "WebSocket closed by server");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        endpoint
                            .failed(RealtimeError::WebSocketError(e.to_string()))
                            .await;
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    endpoint.closed().await;
}
