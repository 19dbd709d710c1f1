pub mod media_stream;
pub mod realtime;
pub mod relay;
pub mod session;

// Re-export commonly used types for convenience
pub use media_stream::{InboundSignal, OutboundFrame, StreamEvent, StreamHandle};
pub use realtime::{
    OpenAIRealtimeConnector, RealtimeConnector, RealtimeError, RealtimeResult, RemoteEvent,
    RemoteHandle,
};
pub use relay::{CallRelay, RelaySettings, RelayStats};
pub use session::{CallSession, SessionPhase, SessionStore};
