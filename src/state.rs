use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::core::realtime::{OpenAIRealtimeConnector, RealtimeConnector};
use crate::core::relay::RelaySettings;
use crate::core::session::{ConversationMessage, SessionStore};

/// Shared application state handed to every handler.
pub struct AppState {
    pub config: ServerConfig,
    pub sessions: SessionStore,
    pub connector: Arc<dyn RealtimeConnector>,
    pub relay_settings: Arc<RelaySettings>,
}

impl AppState {
    /// Build state that dials the configured OpenAI Realtime endpoint.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let connector = Arc::new(OpenAIRealtimeConnector::new(config.realtime_url.clone()));
        Self::with_connector(config, connector)
    }

    /// Build state around a specific connector.
    pub fn with_connector(config: ServerConfig, connector: Arc<dyn RealtimeConnector>) -> Arc<Self> {
        let relay_settings = Arc::new(RelaySettings::from_config(&config));
        let sessions = SessionStore::new(vec![ConversationMessage::system(
            config.instructions.clone(),
        )]);

        Arc::new(Self {
            config,
            sessions,
            connector,
            relay_settings,
        })
    }

    /// Start the background task that drops sessions whose media stream
    /// never arrived within the setup timeout.
    ///
    /// Returns `None` when the setup timeout is disabled. The task stops on
    /// its own once the state is dropped.
    pub fn spawn_session_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let max_age = self.relay_settings.setup_timeout?;
        let state = Arc::downgrade(self);
        Some(tokio::spawn(sweep_unstreamed_sessions(state, max_age)))
    }
}

async fn sweep_unstreamed_sessions(state: Weak<AppState>, max_age: Duration) {
    info!(max_age_ms = max_age.as_millis() as u64, "Session sweeper started");
    let mut ticker = interval(max_age);

    loop {
        ticker.tick().await;
        let Some(state) = state.upgrade() else {
            break;
        };
        let expired = state.sessions.expire_unstreamed(max_age);
        if !expired.is_empty() {
            debug!(count = expired.len(), "Swept sessions without a media stream");
        }
    }

    debug!("Session sweeper stopped");
}
