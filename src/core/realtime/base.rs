//! Base types for the remote realtime model connection.
//!
//! A connection is split in two halves that talk over channels:
//!
//! - [`RemoteHandle`] is held by the call session. It reports whether the
//!   connection is open, queues client events, and requests a close.
//! - [`RemoteEndpoint`] is held by the transport task. It drains queued
//!   client events and reports lifecycle changes and server events back as
//!   [`RemoteEvent`]s.
//!
//! [`RealtimeConnector`] is the seam between the relay and the transport: the
//! production implementation dials the OpenAI Realtime API, tests plug in an
//! in-process fake.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::openai::messages::{ClientEvent, ServerEvent};

/// Buffer size for the channels on either side of a remote connection.
pub const REMOTE_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur on the remote model connection.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// Outbound queue is full; the event was not queued
    #[error("Send queue full")]
    QueueFull,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Connection State
// =============================================================================

/// Connection state of the remote model link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Handshake in progress
    #[default]
    Connecting,
    /// Connected and ready
    Connected,
    /// Closed by either side
    Disconnected,
    /// Connection failed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

/// Lifecycle and protocol events reported by the transport task.
#[derive(Debug)]
pub enum RemoteEvent {
    /// The handshake completed and client events may be sent
    Open,
    /// A server event arrived
    Message(ServerEvent),
    /// The connection ended; always the last event
    Closed,
    /// Transport failure; followed by `Closed`
    Error(RealtimeError),
}

// =============================================================================
// Handle / Endpoint
// =============================================================================

/// Session-side handle to a remote model connection.
#[derive(Debug, Clone)]
pub struct RemoteHandle {
    commands: mpsc::Sender<ClientEvent>,
    state: Arc<RwLock<ConnectionState>>,
    shutdown: CancellationToken,
    close_requested: Arc<AtomicBool>,
}

impl RemoteHandle {
    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// True once the handshake completed and until the link closes.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Connected && !self.shutdown.is_cancelled()
    }

    /// Queue a client event for the transport task.
    pub async fn send(&self, event: ClientEvent) -> RealtimeResult<()> {
        if !self.is_open() {
            return Err(RealtimeError::NotConnected);
        }
        self.commands
            .send(event)
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }

    /// Queue a client event without waiting for queue space.
    ///
    /// Used for per-frame audio so a stalled transport drops frames instead
    /// of stalling the relay.
    pub fn try_send(&self, event: ClientEvent) -> RealtimeResult<()> {
        if !self.is_open() {
            return Err(RealtimeError::NotConnected);
        }
        self.commands.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RealtimeError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => RealtimeError::NotConnected,
        })
    }

    /// Request the connection to close.
    ///
    /// Returns `true` only for the call that actually initiated the close.
    pub fn close(&self) -> bool {
        if self.close_requested.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shutdown.cancel();
        true
    }
}

/// Transport-side half of a remote model connection.
#[derive(Debug)]
pub struct RemoteEndpoint {
    commands: mpsc::Receiver<ClientEvent>,
    events: mpsc::Sender<RemoteEvent>,
    state: Arc<RwLock<ConnectionState>>,
    shutdown: CancellationToken,
}

impl RemoteEndpoint {
    /// Mark the link open and announce it.
    pub async fn opened(&self) {
        *self.state.write() = ConnectionState::Connected;
        self.emit(RemoteEvent::Open).await;
    }

    /// Forward a parsed server event.
    pub async fn deliver(&self, event: ServerEvent) {
        self.emit(RemoteEvent::Message(event)).await;
    }

    /// Report a transport failure.
    pub async fn failed(&self, error: RealtimeError) {
        *self.state.write() = ConnectionState::Failed;
        self.emit(RemoteEvent::Error(error)).await;
    }

    /// Mark the link closed and announce it.
    pub async fn closed(&self) {
        {
            let mut state = self.state.write();
            if *state != ConnectionState::Failed {
                *state = ConnectionState::Disconnected;
            }
        }
        self.emit(RemoteEvent::Closed).await;
    }

    /// Next queued client event, or `None` once every handle is gone.
    pub async fn next_command(&mut self) -> Option<ClientEvent> {
        self.commands.recv().await
    }

    /// Token cancelled when the session side asks for a close.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    async fn emit(&self, event: RemoteEvent) {
        // The relay may already be gone during teardown.
        let _ = self.events.send(event).await;
    }
}

/// What a connector hands back to the relay.
#[derive(Debug)]
pub struct RemoteConnection {
    pub handle: RemoteHandle,
    pub events: mpsc::Receiver<RemoteEvent>,
}

/// Create both halves of a remote connection.
pub fn remote_pair(capacity: usize) -> (RemoteConnection, RemoteEndpoint) {
    let (command_tx, command_rx) = mpsc::channel(capacity);
    let (event_tx, event_rx) = mpsc::channel(capacity);
    let state = Arc::new(RwLock::new(ConnectionState::Connecting));
    let shutdown = CancellationToken::new();

    let handle = RemoteHandle {
        commands: command_tx,
        state: state.clone(),
        shutdown: shutdown.clone(),
        close_requested: Arc::new(AtomicBool::new(false)),
    };
    let endpoint = RemoteEndpoint {
        commands: command_rx,
        events: event_tx,
        state,
        shutdown,
    };

    (
        RemoteConnection {
            handle,
            events: event_rx,
        },
        endpoint,
    )
}

// =============================================================================
// Connector
// =============================================================================

/// Opens connections to a realtime speech-to-speech model.
pub trait RealtimeConnector: Send + Sync {
    /// Start opening a connection.
    ///
    /// Returns immediately; the handshake runs on a background task and its
    /// outcome arrives on [`RemoteConnection::events`]. Must be called from
    /// within a Tokio runtime.
    fn open(&self, credential: &str, model: &str) -> RemoteConnection;
}

// =============================================================================
// Tests
// =============================================================================
