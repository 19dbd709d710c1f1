//! Mock Provider Servers
//!
//! In-process stand-ins for the remote realtime model, bound to an ephemeral
//! localhost port so tests never reach the real API.

// Each test binary uses a different subset of the mock.
#![allow(dead_code)]

pub mod websocket_mock;

pub use websocket_mock::{Handshake, MockBehavior, MockRealtimeServer};
