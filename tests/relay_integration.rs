//! Relay Integration Tests
//!
//! Full call scenarios through the public relay API with an in-process
//! connector standing in for the realtime model transport.

use std::sync::Arc;
use std::time::Duration;

use futures::channel::mpsc::{UnboundedSender, unbounded};
use parking_lot::Mutex;
use serde_json::json;
use waav_call_relay::RelayError;
use waav_call_relay::core::media_stream::{InboundSignal, StreamOutlet, StreamRoute, stream_channel};
use waav_call_relay::core::realtime::{
    ClientEvent, RealtimeConnector, RemoteConnection, RemoteEndpoint, ServerEvent, SessionConfig,
    remote_pair,
};
use waav_call_relay::core::relay::{RelaySettings, relay_call};
use waav_call_relay::core::session::{ConversationMessage, SessionPhase, SessionStore};

const WAIT: Duration = Duration::from_secs(5);

/// Connector that hands each transport half to the test.
#[derive(Default)]
struct InProcessConnector {
    endpoints: Mutex<Vec<RemoteEndpoint>>,
    opened: Mutex<usize>,
}

impl InProcessConnector {
    async fn endpoint(&self) -> RemoteEndpoint {
        tokio::time::timeout(WAIT, async {
            loop {
                if let Some(endpoint) = self.endpoints.lock().pop() {
                    return endpoint;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("relay never opened a remote connection")
    }

    fn opened(&self) -> usize {
        *self.opened.lock()
    }
}

impl RealtimeConnector for InProcessConnector {
    fn open(&self, _credential: &str, _model: &str) -> RemoteConnection {
        let (connection, endpoint) = remote_pair(16);
        self.endpoints.lock().push(endpoint);
        *self.opened.lock() += 1;
        connection
    }
}

fn settings(setup_timeout: Option<Duration>) -> Arc<RelaySettings> {
    Arc::new(RelaySettings {
        api_key: "sk-test".into(),
        model: "gpt-test".into(),
        session: SessionConfig {
            voice: Some("alloy".into()),
            input_audio_format: Some("g711_ulaw".into()),
            output_audio_format: Some("g711_ulaw".into()),
            ..Default::default()
        },
        settle_delay: Duration::from_millis(5),
        setup_timeout,
    })
}

fn store() -> SessionStore {
    SessionStore::new(vec![ConversationMessage::system("Be brief.")])
}

fn send(tx: &UnboundedSender<InboundSignal>, frame: serde_json::Value) {
    tx.unbounded_send(InboundSignal::Text(frame.to_string()))
        .expect("relay stopped reading");
}

async fn next_command(endpoint: &mut RemoteEndpoint) -> ClientEvent {
    tokio::time::timeout(WAIT, endpoint.next_command())
        .await
        .expect("timed out waiting for client event")
        .expect("command channel closed")
}

async fn next_route(outlet: &mut StreamOutlet) -> Option<StreamRoute> {
    tokio::time::timeout(WAIT, outlet.next())
        .await
        .expect("timed out waiting for outbound frame")
}

/// A full call: start, configure, audio both ways, stop, teardown
#[tokio::test]
async fn test_full_call_relays_audio_both_ways() {
    let sessions = store();
    sessions.create("CA100");
    let connector = InProcessConnector::default();
    let (handle, mut outlet) = stream_channel(16);
    let (tx, rx) = unbounded();

    let relay = relay_call(
        "/media-stream/CA100",
        &sessions,
        &connector,
        settings(Some(WAIT)),
        handle,
        rx,
    );

    let driver = async {
        let mut endpoint = connector.endpoint().await;
        endpoint.opened().await;

        send(&tx, json!({"event": "connected", "protocol": "Call", "version": "1.0.0"}));
        send(
            &tx,
            json!({
                "event": "start",
                "sequenceNumber": "1",
                "start": {
                    "streamSid": "MZabc",
                    "callSid": "CA100",
                    "accountSid": "AC1",
                    "tracks": ["inbound"],
                    "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
                },
                "streamSid": "MZabc"
            }),
        );

        match next_command(&mut endpoint).await {
            ClientEvent::SessionUpdate { session } => {
                assert_eq!(session.voice.as_deref(), Some("alloy"));
                assert_eq!(session.output_audio_format.as_deref(), Some("g711_ulaw"));
            }
            other => panic!("expected session.update, got {other:?}"),
        }

        send(
            &tx,
            json!({
                "event": "media",
                "sequenceNumber": "2",
                "media": {"track": "inbound", "chunk": "1", "timestamp": "20", "payload": "f39/fw=="},
                "streamSid": "MZabc"
            }),
        );
        assert_eq!(
            next_command(&mut endpoint).await,
            ClientEvent::InputAudioBufferAppend {
                audio: "f39/fw==".into()
            }
        );

        let delta = ServerEvent::parse(
            r#"{"type":"response.audio.delta","response_id":"r1","item_id":"i1","delta":"AAEC"}"#,
        )
        .unwrap();
        endpoint.deliver(delta).await;

        match next_route(&mut outlet).await {
            Some(StreamRoute::Frame(frame)) => {
                assert_eq!(
                    serde_json::to_value(&frame).unwrap(),
                    json!({"event": "media", "streamSid": "MZabc", "media": {"payload": "AAEC"}})
                );
            }
            other => panic!("expected media frame, got {other:?}"),
        }

        send(&tx, json!({"event": "stop", "sequenceNumber": "3", "streamSid": "MZabc"}));
        tokio::time::timeout(WAIT, endpoint.shutdown_token().cancelled())
            .await
            .expect("stop did not close the remote connection");
        endpoint.closed().await;

        assert_eq!(next_route(&mut outlet).await, Some(StreamRoute::Close));
        assert_eq!(next_route(&mut outlet).await, None);
    };

    let (result, ()) = tokio::join!(relay, driver);
    let stats = result.unwrap();

    assert_eq!(stats.media_in, 1);
    assert_eq!(stats.media_forwarded, 1);
    assert_eq!(stats.audio_out, 1);
    assert!(stats.session_configured);
    assert!(sessions.get("CA100").is_none());
}

/// Streams for calls nobody answered are closed without dialing the model
#[tokio::test]
async fn test_unknown_call_closed_without_remote() {
    let sessions = store();
    let connector = InProcessConnector::default();
    let (handle, mut outlet) = stream_channel(16);
    let (_tx, rx) = unbounded();

    let result = relay_call(
        "/media-stream/call-123",
        &sessions,
        &connector,
        settings(None),
        handle,
        rx,
    )
    .await;

    assert!(matches!(result, Err(RelayError::UnknownCall(id)) if id == "call-123"));
    assert_eq!(connector.opened(), 0);
    assert_eq!(next_route(&mut outlet).await, Some(StreamRoute::Close));
}

/// Caller audio that arrives before the model is ready is dropped
#[tokio::test]
async fn test_media_before_open_is_dropped() {
    let sessions = store();
    sessions.create("CA200");
    let connector = InProcessConnector::default();
    let (handle, _outlet) = stream_channel(16);
    let (tx, rx) = unbounded();

    let relay = relay_call(
        "/media-stream/CA200",
        &sessions,
        &connector,
        settings(None),
        handle,
        rx,
    );

    let driver = async {
        let mut endpoint = connector.endpoint().await;
        send(
            &tx,
            json!({"event": "media", "media": {"payload": "AAAA"}, "streamSid": "MZ2"}),
        );
        // Let the relay consume the frame before the link opens.
        tokio::time::sleep(Duration::from_millis(20)).await;

        endpoint.opened().await;
        assert!(matches!(
            next_command(&mut endpoint).await,
            ClientEvent::SessionUpdate { .. }
        ));

        tx.unbounded_send(InboundSignal::Closed).unwrap();
        tokio::time::timeout(WAIT, endpoint.shutdown_token().cancelled())
            .await
            .expect("inbound close did not close the remote connection");
    };

    let (result, ()) = tokio::join!(relay, driver);
    let stats = result.unwrap();
    assert_eq!(stats.media_in, 1);
    assert_eq!(stats.media_dropped, 1);
    assert_eq!(stats.media_forwarded, 0);
}

/// Model audio before `start` has no stream id to address and is dropped
#[tokio::test]
async fn test_audio_before_start_is_dropped() {
    let sessions = store();
    sessions.create("CA300");
    let connector = InProcessConnector::default();
    let (handle, mut outlet) = stream_channel(16);
    let (tx, rx) = unbounded();

    let relay = relay_call(
        "/media-stream/CA300",
        &sessions,
        &connector,
        settings(None),
        handle,
        rx,
    );

    let driver = async {
        let endpoint = connector.endpoint().await;
        endpoint.opened().await;
        endpoint
            .deliver(ServerEvent::parse(r#"{"type":"response.audio.delta","delta":"AAEC"}"#).unwrap())
            .await;
        endpoint.closed().await;

        assert_eq!(next_route(&mut outlet).await, Some(StreamRoute::Close));
        drop(tx);
    };

    let (result, ()) = tokio::join!(relay, driver);
    let stats = result.unwrap();
    assert_eq!(stats.audio_out, 0);
    assert_eq!(stats.audio_dropped, 1);
    assert!(sessions.get("CA300").is_none());
}

/// A model that never opens is abandoned after the setup deadline
#[tokio::test]
async fn test_setup_timeout_tears_down_call() {
    let sessions = store();
    let session = sessions.create("CA400");
    let connector = InProcessConnector::default();
    let (handle, mut outlet) = stream_channel(16);
    let (_tx, rx) = unbounded();

    let stats = relay_call(
        "/media-stream/CA400",
        &sessions,
        &connector,
        settings(Some(Duration::from_millis(50))),
        handle,
        rx,
    )
    .await
    .unwrap();

    assert!(!stats.session_configured);
    assert_eq!(session.phase(), SessionPhase::Closed);
    assert!(sessions.is_empty());
    assert_eq!(next_route(&mut outlet).await, Some(StreamRoute::Close));

    let endpoint = connector.endpoint().await;
    assert!(endpoint.shutdown_token().is_cancelled());
}

/// A second call's session survives the first call's teardown
#[tokio::test]
async fn test_teardown_leaves_other_calls_alone() {
    let sessions = store();
    sessions.create("CA500");
    sessions.create("CA501");
    let connector = InProcessConnector::default();
    let (handle, _outlet) = stream_channel(16);
    let (tx, rx) = unbounded();

    let relay = relay_call(
        "/media-stream/CA500",
        &sessions,
        &connector,
        settings(None),
        handle,
        rx,
    );
    let driver = async {
        let _endpoint = connector.endpoint().await;
        tx.unbounded_send(InboundSignal::Error("connection reset".into()))
            .unwrap();
    };

    let (result, ()) = tokio::join!(relay, driver);
    result.unwrap();

    assert!(sessions.get("CA500").is_none());
    let survivor = sessions.get("CA501").expect("other call removed");
    assert_eq!(survivor.phase(), SessionPhase::Uninitialized);
    assert_eq!(survivor.messages(), vec![ConversationMessage::system("Be brief.")]);
}

/// A duplicate stream for a live call is refused and the call carries on
#[tokio::test]
async fn test_duplicate_stream_keeps_live_call() {
    let sessions = store();
    sessions.create("CA600");
    let connector = InProcessConnector::default();
    let (handle, mut outlet) = stream_channel(16);
    let (tx, rx) = unbounded();

    let relay = relay_call(
        "/media-stream/CA600",
        &sessions,
        &connector,
        settings(Some(WAIT)),
        handle,
        rx,
    );

    let driver = async {
        let mut endpoint = connector.endpoint().await;
        endpoint.opened().await;
        send(&tx, json!({"event": "start", "start": {"streamSid": "MZ6"}}));
        assert!(matches!(
            next_command(&mut endpoint).await,
            ClientEvent::SessionUpdate { .. }
        ));

        let (duplicate, mut duplicate_outlet) = stream_channel(16);
        let (_duplicate_tx, duplicate_rx) = unbounded();
        let rejected = relay_call(
            "/media-stream/CA600",
            &sessions,
            &connector,
            settings(Some(WAIT)),
            duplicate,
            duplicate_rx,
        )
        .await;
        assert!(matches!(rejected, Err(RelayError::StreamAlreadyBound(id)) if id == "CA600"));
        assert_eq!(next_route(&mut duplicate_outlet).await, Some(StreamRoute::Close));
        assert_eq!(connector.opened(), 1);
        assert!(!endpoint.shutdown_token().is_cancelled());

        send(
            &tx,
            json!({"event": "media", "media": {"payload": "AAAA"}, "streamSid": "MZ6"}),
        );
        assert_eq!(
            next_command(&mut endpoint).await,
            ClientEvent::InputAudioBufferAppend {
                audio: "AAAA".into()
            }
        );
        endpoint
            .deliver(ServerEvent::parse(r#"{"type":"response.audio.delta","delta":"AAEC"}"#).unwrap())
            .await;
        assert!(matches!(
            next_route(&mut outlet).await,
            Some(StreamRoute::Frame(_))
        ));

        send(&tx, json!({"event": "stop", "streamSid": "MZ6"}));
        tokio::time::timeout(WAIT, endpoint.shutdown_token().cancelled())
            .await
            .expect("stop did not close the remote connection");
        endpoint.closed().await;
    };

    let (result, ()) = tokio::join!(relay, driver);
    let stats = result.unwrap();
    assert_eq!(stats.media_forwarded, 1);
    assert_eq!(stats.audio_out, 1);
    assert!(sessions.get("CA600").is_none());
}
