//! Session-side handle to the inbound media-stream connection.
//!
//! The WebSocket itself is owned by the handler's writer task. The session
//! holds a [`StreamHandle`] that queues outbound frames and can request a
//! close; the writer task drains the matching [`StreamOutlet`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::messages::OutboundFrame;
use crate::errors::relay_error::{RelayError, RelayResult};

/// Buffer size for outbound frames toward the telephony platform.
pub const STREAM_CHANNEL_CAPACITY: usize = 256;

/// Inputs read from the inbound connection, as seen by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundSignal {
    /// A text frame
    Text(String),
    /// The peer closed the connection
    Closed,
    /// Transport failure
    Error(String),
}

/// What the writer task should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRoute {
    /// Serialize and send this frame
    Frame(OutboundFrame),
    /// Send a close frame and stop
    Close,
}

/// Cloneable handle for writing to the inbound connection.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    frames: mpsc::Sender<OutboundFrame>,
    shutdown: CancellationToken,
    close_requested: Arc<AtomicBool>,
}

impl StreamHandle {
    /// True until a close was requested or the writer went away.
    pub fn is_open(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.frames.is_closed()
    }

    /// Queue a frame for the writer task without waiting for queue space.
    pub fn try_send(&self, frame: OutboundFrame) -> RelayResult<()> {
        if !self.is_open() {
            return Err(RelayError::StreamClosed);
        }
        self.frames.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RelayError::StreamFull,
            mpsc::error::TrySendError::Closed(_) => RelayError::StreamClosed,
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

/// Writer-side half, drained by the task that owns the WebSocket sink.
#[derive(Debug)]
pub struct StreamOutlet {
    frames: mpsc::Receiver<OutboundFrame>,
    shutdown: CancellationToken,
    finished: bool,
}

impl StreamOutlet {
    /// Next action for the writer.
    ///
    /// A requested close wins over queued frames and is reported once;
    /// afterwards, and once every handle is dropped, this yields `None`.
    pub async fn next(&mut self) -> Option<StreamRoute> {
        if self.finished {
            return None;
        }

        tokio::select! {
            biased;

            _ = self.shutdown.cancelled() => {
                self.finished = true;
                Some(StreamRoute::Close)
            }
            frame = self.frames.recv() => match frame {
                Some(frame) => Some(StreamRoute::Frame(frame)),
                None => {
                    self.finished = true;
                    None
                }
            }
        }
    }
}

/// Create a handle and outlet pair.
pub fn stream_channel(capacity: usize) -> (StreamHandle, StreamOutlet) {
    let (tx, rx) = mpsc::channel(capacity);
    let shutdown = CancellationToken::new();

    (
        StreamHandle {
            frames: tx,
            shutdown: shutdown.clone(),
            close_requested: Arc::new(AtomicBool::new(false)),
        },
        StreamOutlet {
            frames: rx,
            shutdown,
            finished: false,
        },
    )
}
