//! In-memory session store keyed by call identifier.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::state::{CallSession, ConversationMessage};

/// Process-wide map from call id to [`CallSession`].
///
/// Only the map itself is locked here; each session guards its own fields.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<CallSession>>>,
    initial_messages: Vec<ConversationMessage>,
}

impl SessionStore {
    /// Create a store whose sessions start with `initial_messages`.
    pub fn new(initial_messages: Vec<ConversationMessage>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            initial_messages,
        }
    }

    /// Insert a fresh session, replacing any existing one for the same id.
    ///
    /// A replaced session is closed so its connections are not leaked.
    pub fn create(&self, call_id: &str) -> Arc<CallSession> {
        let session = Arc::new(CallSession::new(call_id, self.initial_messages.clone()));
        let replaced = self
            .sessions
            .lock()
            .insert(call_id.to_string(), session.clone());

        if let Some(replaced) = replaced {
            tracing::warn!(call_id, "Session recreated; closing the previous one");
            replaced.close();
        }
        tracing::debug!(call_id, "Session created");
        session
    }

    pub fn get(&self, call_id: &str) -> Option<Arc<CallSession>> {
        self.sessions.lock().get(call_id).cloned()
    }

    /// Remove a session and release its connections. No-op if absent.
    pub fn delete(&self, call_id: &str) {
        let removed = self.sessions.lock().remove(call_id);
        if let Some(session) = removed {
            session.close();
            tracing::debug!(call_id, "Session deleted");
        }
    }

    /// Clear the conversation log, then delete the session.
    pub fn reset(&self, call_id: &str) {
        if let Some(session) = self.get(call_id) {
            session.clear_messages();
        }
        self.delete(call_id);
    }

    /// Reset `session` if it is still the one stored under its call id.
    ///
    /// A session replaced by a newer webhook call is closed but the newer
    /// entry is left alone. Returns whether the stored entry was removed.
    pub fn release(&self, session: &Arc<CallSession>) -> bool {
        session.clear_messages();
        let removed = {
            let mut sessions = self.sessions.lock();
            let is_current = sessions
                .get(session.call_id())
                .is_some_and(|current| Arc::ptr_eq(current, session));
            if is_current {
                sessions.remove(session.call_id())
            } else {
                None
            }
        };
        session.close();
        removed.is_some()
    }

    /// Remove sessions that have waited at least `max_age` for a media stream.
    ///
    /// Returns the removed call ids.
    pub fn expire_unstreamed(&self, max_age: Duration) -> Vec<String> {
        let expired: Vec<Arc<CallSession>> = {
            let mut sessions = self.sessions.lock();
            let stale: Vec<String> = sessions
                .iter()
                .filter(|(_, session)| session.is_awaiting_stream() && session.age() >= max_age)
                .map(|(call_id, _)| call_id.clone())
                .collect();
            stale
                .iter()
                .filter_map(|call_id| sessions.remove(call_id))
                .collect()
        };

        expired
            .into_iter()
            .map(|session| {
                session.clear_messages();
                session.close();
                tracing::info!(
                    call_id = %session.call_id(),
                    age_ms = session.age().as_millis() as u64,
                    "Session expired without a media stream"
                );
                session.call_id().to_string()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn call_ids(&self) -> Vec<String> {
        self.sessions.lock().keys().cloned().collect()
    }
}
