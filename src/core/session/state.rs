//! Per-call session state.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::core::media_stream::StreamHandle;
use crate::core::realtime::RemoteHandle;

// =============================================================================
// Conversation log
// =============================================================================

/// Role of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One role-tagged entry of a call's conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

// =============================================================================
// Phase
// =============================================================================

/// Lifecycle phase of a call session.
///
/// `Uninitialized -> RemoteConnecting -> RemoteConfigured -> Streaming`, and
/// any phase may move to the terminal `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Created by the webhook, no connections yet
    #[default]
    Uninitialized,
    /// Remote model connection requested, not yet configured
    RemoteConnecting,
    /// Session configuration sent, stream id still unknown
    RemoteConfigured,
    /// Configured and the stream id is known
    Streaming,
    /// Torn down
    Closed,
}

impl SessionPhase {
    /// Whether `next` is a legal successor of this phase.
    pub fn can_advance_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, next),
            (Uninitialized, RemoteConnecting)
                | (RemoteConnecting, RemoteConfigured)
                | (RemoteConfigured, Streaming)
                | (Uninitialized | RemoteConnecting | RemoteConfigured | Streaming, Closed)
        )
    }

    /// True once the session configuration frame has been sent.
    pub fn is_configured(self) -> bool {
        matches!(self, SessionPhase::RemoteConfigured | SessionPhase::Streaming)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Uninitialized => write!(f, "uninitialized"),
            SessionPhase::RemoteConnecting => write!(f, "remote-connecting"),
            SessionPhase::RemoteConfigured => write!(f, "remote-configured"),
            SessionPhase::Streaming => write!(f, "streaming"),
            SessionPhase::Closed => write!(f, "closed"),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

#[derive(Debug, Default)]
struct SessionInner {
    phase: SessionPhase,
    stream_sid: Option<String>,
    messages: Vec<ConversationMessage>,
    inbound: Option<StreamHandle>,
    remote: Option<RemoteHandle>,
}

impl SessionInner {
    fn advance(&mut self, next: SessionPhase) -> bool {
        if self.phase.can_advance_to(next) {
            self.phase = next;
            true
        } else {
            false
        }
    }
}

/// Point-in-time copy of a session, for logging and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub call_id: String,
    pub phase: SessionPhase,
    pub stream_sid: Option<String>,
    pub messages: Vec<ConversationMessage>,
    pub has_inbound: bool,
    pub has_remote: bool,
}

/// State of one telephone call.
///
/// The call id is fixed at creation. Everything else is mutated by the call's
/// relay as connections and the stream id become available.
#[derive(Debug)]
pub struct CallSession {
    call_id: String,
    created_at: Instant,
    inner: Mutex<SessionInner>,
}

impl CallSession {
    pub fn new(call_id: impl Into<String>, messages: Vec<ConversationMessage>) -> Self {
        Self {
            call_id: call_id.into(),
            created_at: Instant::now(),
            inner: Mutex::new(SessionInner {
                messages,
                ..Default::default()
            }),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Time since the webhook created the session.
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().phase
    }

    pub fn is_configured(&self) -> bool {
        self.phase().is_configured()
    }

    pub fn stream_sid(&self) -> Option<String> {
        self.inner.lock().stream_sid.clone()
    }

    pub fn messages(&self) -> Vec<ConversationMessage> {
        self.inner.lock().messages.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            call_id: self.call_id.clone(),
            phase: inner.phase,
            stream_sid: inner.stream_sid.clone(),
            messages: inner.messages.clone(),
            has_inbound: inner.inbound.is_some(),
            has_remote: inner.remote.is_some(),
        }
    }

    pub fn inbound(&self) -> Option<StreamHandle> {
        self.inner.lock().inbound.clone()
    }

    pub fn remote(&self) -> Option<RemoteHandle> {
        self.inner.lock().remote.clone()
    }

    /// Attach the inbound stream connection.
    ///
    /// A session takes exactly one stream: refused once a stream is attached,
    /// a remote connection exists, or the session is closed. The handle of
    /// a refused stream is left to the caller.
    pub fn attach_inbound(&self, handle: StreamHandle) -> bool {
        let mut inner = self.inner.lock();
        if inner.phase != SessionPhase::Uninitialized || inner.inbound.is_some() {
            return false;
        }
        inner.inbound = Some(handle);
        true
    }

    /// True while the webhook has answered but no stream has bound yet.
    pub fn is_awaiting_stream(&self) -> bool {
        let inner = self.inner.lock();
        inner.phase == SessionPhase::Uninitialized && inner.inbound.is_none()
    }

    /// Attach the remote model connection and enter `RemoteConnecting`.
    ///
    /// Only one remote connection is ever attached per session.
    pub fn attach_remote(&self, handle: RemoteHandle) -> bool {
        let mut inner = self.inner.lock();
        if inner.remote.is_some() || !inner.advance(SessionPhase::RemoteConnecting) {
            drop(inner);
            handle.close();
            return false;
        }
        inner.remote = Some(handle);
        true
    }

    /// Record the stream id from the `start` event.
    ///
    /// Moves a configured session on to `Streaming`.
    pub fn set_stream_sid(&self, stream_sid: impl Into<String>) -> SessionPhase {
        let mut inner = self.inner.lock();
        if inner.phase == SessionPhase::Closed {
            return inner.phase;
        }
        inner.stream_sid = Some(stream_sid.into());
        if inner.phase == SessionPhase::RemoteConfigured {
            inner.advance(SessionPhase::Streaming);
        }
        inner.phase
    }

    /// Claim the one-time session configuration.
    ///
    /// Returns `true` exactly once per session, on the transition out of
    /// `RemoteConnecting`; every later call returns `false`.
    pub fn mark_configured(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.advance(SessionPhase::RemoteConfigured) {
            return false;
        }
        if inner.stream_sid.is_some() {
            inner.advance(SessionPhase::Streaming);
        }
        true
    }

    /// Stream id and inbound handle, if model audio can be delivered now.
    pub fn outbound_route(&self) -> Option<(String, StreamHandle)> {
        let inner = self.inner.lock();
        let stream_sid = inner.stream_sid.clone()?;
        let inbound = inner.inbound.as_ref().filter(|h| h.is_open())?.clone();
        Some((stream_sid, inbound))
    }

    pub fn clear_messages(&self) {
        self.inner.lock().messages.clear();
    }

    /// Enter `Closed` and release both connection handles.
    ///
    /// Idempotent; returns `false` if the session was already closed.
    pub fn close(&self) -> bool {
        let (inbound, remote) = {
            let mut inner = self.inner.lock();
            if !inner.advance(SessionPhase::Closed) {
                return false;
            }
            (inner.inbound.take(), inner.remote.take())
        };
        if let Some(remote) = remote {
            remote.close();
        }
        if let Some(inbound) = inbound {
            inbound.close();
        }
        true
    }
}
