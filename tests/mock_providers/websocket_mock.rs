//! WebSocket Mock Server for the realtime model
//!
//! Speaks enough of the OpenAI Realtime protocol for the relay:
//! - announces `session.created` after the handshake
//! - answers `session.update` with `session.updated`
//! - echoes `input_audio_buffer.append` audio back as `response.audio.delta`

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

/// What the mock saw during one WebSocket handshake.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub path_and_query: String,
    pub authorization: Option<String>,
    pub openai_beta: Option<String>,
}

/// How the mock treats incoming connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Accept and run the protocol
    Accept,
    /// Refuse the handshake with 401
    RejectHandshake,
}

/// Running mock realtime server.
pub struct MockRealtimeServer {
    pub url: String,
    handshakes: Arc<Mutex<Vec<Handshake>>>,
    received: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
}

impl MockRealtimeServer {
    pub async fn start() -> Self {
        Self::start_with(MockBehavior::Accept).await
    }

    pub async fn start_with(behavior: MockBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock realtime server");
        let addr = listener.local_addr().expect("mock local addr");

        let handshakes = Arc::new(Mutex::new(Vec::new()));
        let received = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let handshakes = handshakes.clone();
            let received = received.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let handshakes = handshakes.clone();
                    let received = received.clone();
                    tokio::spawn(async move {
                        let _ = handle_connection(stream, behavior, handshakes, received).await;
                    });
                }
            })
        };

        Self {
            url: format!("ws://{addr}/v1/realtime"),
            handshakes,
            received,
            task,
        }
    }

    pub fn handshakes(&self) -> Vec<Handshake> {
        self.handshakes.lock().clone()
    }

    /// Client events received so far, in arrival order.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    pub fn received_types(&self) -> Vec<String> {
        self.received()
            .iter()
            .filter_map(|event| event["type"].as_str().map(str::to_string))
            .collect()
    }

    /// Poll until a client event of `event_type` has arrived.
    pub async fn wait_for(&self, event_type: &str, within: Duration) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            if let Some(event) = self
                .received()
                .into_iter()
                .find(|event| event["type"] == event_type)
            {
                return Some(event);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for MockRealtimeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn header(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn handle_connection(
    stream: TcpStream,
    behavior: MockBehavior,
    handshakes: Arc<Mutex<Vec<Handshake>>>,
    received: Arc<Mutex<Vec<Value>>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        handshakes.lock().push(Handshake {
            path_and_query: request
                .uri()
                .path_and_query()
                .map(|pq| pq.to_string())
                .unwrap_or_default(),
            authorization: header(request, "authorization"),
            openai_beta: header(request, "openai-beta"),
        });

        match behavior {
            MockBehavior::Accept => Ok(response),
            MockBehavior::RejectHandshake => {
                let mut rejection = ErrorResponse::new(Some("invalid api key".to_string()));
                *rejection.status_mut() = StatusCode::UNAUTHORIZED;
                Err(rejection)
            }
        }
    };

    let ws_stream = accept_hdr_async(stream, callback).await?;
    let (mut write, mut read) = ws_stream.split();

    let created = json!({
        "type": "session.created",
        "session": { "id": "sess_mock", "model": "mock-realtime" }
    });
    write.send(Message::Text(created.to_string().into())).await?;

    while let Some(msg) = read.next().await {
        match msg? {
            Message::Text(text) => {
                let Ok(event) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };
                received.lock().push(event.clone());

                let reply = match event["type"].as_str() {
                    Some("session.update") => Some(json!({
                        "type": "session.updated",
                        "session": {
                            "id": "sess_mock",
                            "voice": event["session"]["voice"],
                            "output_audio_format": event["session"]["output_audio_format"],
                        }
                    })),
                    Some("input_audio_buffer.append") => Some(json!({
                        "type": "response.audio.delta",
                        "response_id": "resp_mock",
                        "item_id": "item_mock",
                        "delta": event["audio"],
                    })),
                    _ => None,
                };

                if let Some(reply) = reply {
                    write.send(Message::Text(reply.to_string().into())).await?;
                }
            }
            Message::Ping(data) => write.send(Message::Pong(data)).await?,
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}
