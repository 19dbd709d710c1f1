use futures::{Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Sleep, sleep};
use tracing::{debug, error, info, trace, warn};

use super::RelaySettings;
use crate::core::media_stream::{
    InboundSignal, OutboundFrame, StreamEvent, StreamHandle, call_id_from_path,
};
use crate::core::realtime::{
    ClientEvent, RealtimeConnector, RemoteEvent, RemoteHandle, ServerEvent,
};
use crate::core::session::{CallSession, SessionPhase, SessionStore};
use crate::errors::relay_error::{RelayError, RelayResult};

/// Frame counters kept for the lifetime of one relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// `media` frames received from the call
    pub media_in: u64,
    /// Caller audio appended to the remote input buffer
    pub media_forwarded: u64,
    /// Caller audio dropped because the remote was not open
    pub media_dropped: u64,
    /// Model audio chunks sent back to the call
    pub audio_out: u64,
    /// Model audio dropped for lack of a stream id or open inbound
    pub audio_dropped: u64,
    /// Inbound frames that failed to parse
    pub malformed_frames: u64,
    /// Whether the session configuration frame was sent
    pub session_configured: bool,
}

/// Why a relay ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownReason {
    InboundClosed,
    InboundError(String),
    RemoteClosed,
    RemoteError(String),
    SetupTimeout,
}

impl fmt::Display for TeardownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownReason::InboundClosed => write!(f, "inbound stream closed"),
            TeardownReason::InboundError(e) => write!(f, "inbound stream error: {e}"),
            TeardownReason::RemoteClosed => write!(f, "remote model connection closed"),
            TeardownReason::RemoteError(e) => write!(f, "remote model connection error: {e}"),
            TeardownReason::SetupTimeout => write!(f, "remote model setup timed out"),
        }
    }
}

/// Relay bound to one call.
///
/// Owns the stream and remote handles it attached; teardown never touches
/// connections another relay brought.
pub struct CallRelay {
    session: Arc<CallSession>,
    settings: Arc<RelaySettings>,
    inbound: StreamHandle,
    remote: RemoteHandle,
    remote_events: mpsc::Receiver<RemoteEvent>,
    stats: RelayStats,
}

/// Identify the call behind `request_path`, attach `inbound` to its session
/// and start opening the remote model connection.
///
/// On error nothing was opened; the caller should close `inbound`.
pub fn bind(
    request_path: &str,
    sessions: &SessionStore,
    connector: &dyn RealtimeConnector,
    settings: Arc<RelaySettings>,
    inbound: StreamHandle,
) -> RelayResult<CallRelay> {
    let call_id = call_id_from_path(request_path)
        .ok_or_else(|| RelayError::MissingCallId(request_path.to_string()))?;
    let session = sessions
        .get(call_id)
        .ok_or_else(|| RelayError::UnknownCall(call_id.to_string()))?;

    if !session.attach_inbound(inbound.clone()) {
        return Err(match session.phase() {
            SessionPhase::Closed => RelayError::UnknownCall(call_id.to_string()),
            _ => RelayError::StreamAlreadyBound(call_id.to_string()),
        });
    }

    let connection = connector.open(&settings.api_key, &settings.model);
    if !session.attach_remote(connection.handle.clone()) {
        return Err(match session.phase() {
            SessionPhase::Closed => RelayError::UnknownCall(call_id.to_string()),
            _ => RelayError::StreamAlreadyBound(call_id.to_string()),
        });
    }

    info!(
        call_id = %session.call_id(),
        model = %settings.model,
        "Media stream bound, opening remote model connection"
    );

    Ok(CallRelay {
        session,
        settings,
        inbound,
        remote: connection.handle,
        remote_events: connection.events,
        stats: RelayStats::default(),
    })
}

/// Bind and run a relay to completion.
///
/// A stream that cannot be bound is closed right away and the error is
/// returned; otherwise returns the relay's counters once it has ended.
pub async fn relay_call<S>(
    request_path: &str,
    sessions: &SessionStore,
    connector: &dyn RealtimeConnector,
    settings: Arc<RelaySettings>,
    inbound: StreamHandle,
    signals: S,
) -> RelayResult<RelayStats>
where
    S: Stream<Item = InboundSignal> + Unpin,
{
    match bind(request_path, sessions, connector, settings, inbound.clone()) {
        Ok(relay) => Ok(relay.run(signals, sessions).await),
        Err(e) => {
            inbound.close();
            Err(e)
        }
    }
}

impl CallRelay {
    pub fn session(&self) -> &Arc<CallSession> {
        &self.session
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Drive the relay until either side ends it, then tear down.
    pub async fn run<S>(mut self, mut inbound: S, sessions: &SessionStore) -> RelayStats
    where
        S: Stream<Item = InboundSignal> + Unpin,
    {
        let mut settle: Option<Pin<Box<Sleep>>> = None;
        let setup_deadline = self.settings.setup_timeout;
        let setup_timer = sleep(setup_deadline.unwrap_or_default());
        tokio::pin!(setup_timer);

        let reason = loop {
            tokio::select! {
                signal = inbound.next() => match signal {
                    Some(InboundSignal::Text(text)) => self.on_inbound_text(&text).await,
                    Some(InboundSignal::Closed) | None => break TeardownReason::InboundClosed,
                    Some(InboundSignal::Error(e)) => break TeardownReason::InboundError(e),
                },

                event = self.remote_events.recv() => match event {
                    Some(RemoteEvent::Open) => {
                        debug!(call_id = %self.session.call_id(), "Remote model connection open");
                        if settle.is_none() && !self.session.is_configured() {
                            settle = Some(Box::pin(sleep(self.settings.settle_delay)));
                        }
                    }
                    Some(RemoteEvent::Message(event)) => self.on_remote_event(event).await,
                    Some(RemoteEvent::Error(e)) => break TeardownReason::RemoteError(e.to_string()),
                    Some(RemoteEvent::Closed) | None => break TeardownReason::RemoteClosed,
                },

                _ = async {
                    if let Some(timer) = settle.as_mut() {
                        timer.as_mut().await;
                    }
                }, if settle.is_some() => {
                    settle = None;
                    self.send_session_config().await;
                }

                _ = &mut setup_timer, if setup_deadline.is_some() && !self.session.is_configured() => {
                    break TeardownReason::SetupTimeout;
                }
            }
        };

        self.teardown(reason, sessions);
        self.stats
    }

    /// Handle one text frame from the telephony side.
    pub async fn on_inbound_text(&mut self, text: &str) {
        let event = match StreamEvent::parse(text) {
            Ok(event) => event,
            Err(e) => {
                self.stats.malformed_frames += 1;
                let e = RelayError::from(e);
                error!(call_id = %self.session.call_id(), error = %e, "Dropping inbound frame");
                return;
            }
        };

        match event {
            StreamEvent::Connected { protocol, .. } => {
                debug!(call_id = %self.session.call_id(), ?protocol, "Media stream connected");
            }
            StreamEvent::Start { start, .. } => {
                info!(
                    call_id = %self.session.call_id(),
                    stream_sid = %start.stream_sid,
                    "Media stream started"
                );
                let phase = self.session.set_stream_sid(start.stream_sid);
                debug!(call_id = %self.session.call_id(), %phase, "Session phase");
            }
            StreamEvent::Media { media, .. } => self.forward_media(media.payload),
            StreamEvent::Stop | StreamEvent::Closed => {
                info!(call_id = %self.session.call_id(), "Media stream ending, closing remote model connection");
                self.remote.close();
            }
            StreamEvent::Unrecognized => {
                debug!(call_id = %self.session.call_id(), frame = %text, "Unrecognized media stream event");
            }
        }
    }

    /// Handle one event from the remote model.
    pub async fn on_remote_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::AudioDelta {
                delta: Some(delta), ..
            } if !delta.is_empty() => self.forward_audio(delta),
            ServerEvent::SessionUpdated { session } => {
                info!(
                    call_id = %self.session.call_id(),
                    remote_session = ?session.id,
                    "Remote model session configured"
                );
            }
            ServerEvent::SessionCreated { session } => {
                debug!(call_id = %self.session.call_id(), remote_session = ?session.id, "Remote model session created");
            }
            ServerEvent::Error { error } => {
                warn!(
                    call_id = %self.session.call_id(),
                    error_type = %error.error_type,
                    code = ?error.code,
                    "Remote model reported: {}",
                    error.message
                );
            }
            ServerEvent::AudioTranscriptDone { transcript, .. } => {
                debug!(call_id = %self.session.call_id(), role = "assistant", %transcript, "Transcript");
            }
            ServerEvent::InputAudioTranscriptionCompleted { transcript, .. } => {
                debug!(call_id = %self.session.call_id(), role = "user", %transcript, "Transcript");
            }
            other => trace!(call_id = %self.session.call_id(), event = ?other, "Ignoring remote event"),
        }
    }

    /// Send the session configuration if it has not been sent yet.
    ///
    /// The session only counts as configured once the frame is queued.
    pub async fn send_session_config(&mut self) -> bool {
        if self.session.is_configured() {
            return false;
        }

        let update = ClientEvent::SessionUpdate {
            session: self.settings.session.clone(),
        };
        match self.remote.send(update).await {
            Ok(()) => {
                if !self.session.mark_configured() {
                    return false;
                }
                self.stats.session_configured = true;
                info!(call_id = %self.session.call_id(), "Sent session configuration");
                true
            }
            Err(e) => {
                warn!(call_id = %self.session.call_id(), error = %e, "Session configuration not sent");
                false
            }
        }
    }

    fn forward_media(&mut self, payload: String) {
        self.stats.media_in += 1;

        if !self.remote.is_open() {
            self.stats.media_dropped += 1;
            debug!(
                call_id = %self.session.call_id(),
                remote_state = %self.remote.state(),
                "Remote model not open, dropping caller audio"
            );
            return;
        }

        match self
            .remote
            .try_send(ClientEvent::InputAudioBufferAppend { audio: payload })
        {
            Ok(()) => self.stats.media_forwarded += 1,
            Err(e) => {
                self.stats.media_dropped += 1;
                debug!(call_id = %self.session.call_id(), error = %e, "Caller audio not forwarded");
            }
        }
    }

    fn forward_audio(&mut self, delta: String) {
        let Some((stream_sid, inbound)) = self.session.outbound_route() else {
            self.stats.audio_dropped += 1;
            trace!(call_id = %self.session.call_id(), "No stream id or inbound closed, dropping model audio");
            return;
        };

        match inbound.try_send(OutboundFrame::media(stream_sid, delta)) {
            Ok(()) => self.stats.audio_out += 1,
            Err(e) => {
                self.stats.audio_dropped += 1;
                debug!(call_id = %self.session.call_id(), error = %e, "Model audio not delivered");
            }
        }
    }

    fn teardown(&mut self, reason: TeardownReason, sessions: &SessionStore) {
        let call_id = self.session.call_id().to_string();
        match &reason {
            TeardownReason::InboundClosed | TeardownReason::RemoteClosed => {
                info!(call_id = %call_id, %reason, "Ending relay");
            }
            TeardownReason::SetupTimeout => {
                warn!(call_id = %call_id, phase = %self.session.phase(), %reason, "Ending relay");
            }
            TeardownReason::InboundError(_) | TeardownReason::RemoteError(_) => {
                error!(call_id = %call_id, %reason, "Ending relay");
            }
        }

        self.remote.close();
        self.inbound.close();
        sessions.release(&self.session);

        let stats = self.stats;
        info!(
            call_id = %call_id,
            media_in = stats.media_in,
            media_forwarded = stats.media_forwarded,
            media_dropped = stats.media_dropped,
            audio_out = stats.audio_out,
            audio_dropped = stats.audio_dropped,
            malformed_frames = stats.malformed_frames,
            duration_ms = self.session.age().as_millis() as u64,
            "Relay finished"
        );
    }
}
