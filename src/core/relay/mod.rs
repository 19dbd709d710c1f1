//! Call relay.
//!
//! One relay runs per accepted media-stream connection. It binds the stream
//! to the call's session, opens the remote model connection, translates
//! frames in both directions and tears both sides down together.
//!
//! # Lifecycle
//!
//! 1. Identify the call from the stream path; unknown calls are rejected
//!    before any remote connection is opened.
//! 2. Open the remote connection. On its open event, wait the settle delay
//!    and send the session configuration, once.
//! 3. Relay `media` frames to the model and model audio back to the call.
//! 4. Either side closing or failing, or the setup deadline passing, ends
//!    the relay: both connections are closed and the session is reset.

mod controller;

pub use controller::{CallRelay, RelayStats, TeardownReason, bind, relay_call};

use std::fmt;
use std::time::Duration;
use zeroize::Zeroize;

use crate::config::ServerConfig;
use crate::core::realtime::SessionConfig;

/// Per-process relay settings derived from [`ServerConfig`].
#[derive(Clone)]
pub struct RelaySettings {
    /// Bearer credential for the remote model
    pub api_key: String,
    /// Model identifier requested at connect time
    pub model: String,
    /// Payload of the one-time `session.update`
    pub session: SessionConfig,
    /// Pause between the remote open event and the configuration frame
    pub settle_delay: Duration,
    /// Bound on reaching the configured phase; `None` waits forever
    pub setup_timeout: Option<Duration>,
}

impl RelaySettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
            model: config.realtime_model.clone(),
            session: config.session_defaults().to_session_config(),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            setup_timeout: (config.setup_timeout_secs > 0)
                .then(|| Duration::from_secs(config.setup_timeout_secs)),
        }
    }
}

impl fmt::Debug for RelaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaySettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("settle_delay", &self.settle_delay)
            .field("setup_timeout", &self.setup_timeout)
            .finish_non_exhaustive()
    }
}

impl Drop for RelaySettings {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}
