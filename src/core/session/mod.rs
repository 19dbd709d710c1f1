//! Call sessions.
//!
//! A session is created by the answer-call webhook, bound to a media stream
//! and a remote model connection by the relay, and removed when the relay
//! ends.

mod state;
mod store;

pub use state::{CallSession, ConversationMessage, MessageRole, SessionPhase, SessionSnapshot};
pub use store::SessionStore;
