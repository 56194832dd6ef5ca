//! Seam to the external streaming engine.
//!
//! The engine does capture, encoding and the RTMP transport. This crate
//! only drives it through [`StreamEngine`] and listens to the
//! [`EngineEvent`]s it emits on its own worker threads.

use crate::consent::CaptureGrant;
use crate::{DisplayError, Result};
use tokio::sync::mpsc;

mod endpoint;
pub mod testing;

pub use endpoint::{Endpoint, Protocol};

/// Asynchronous connection status reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Handshake finished and media is flowing
    ConnectionSuccess,
    /// Connection attempt or established connection failed
    ConnectionFailed(String),
    /// Connection closed, by either side
    Disconnect,
    /// Server rejected the credentials
    AuthError,
    /// Server accepted the credentials
    AuthSuccess,
    /// Encoder bitrate changed, in bits per second
    NewBitrate(u64),
}

impl EngineEvent {
    /// The connection failure this event reports, if it is one.
    pub fn failure(&self) -> Option<DisplayError> {
        match self {
            EngineEvent::ConnectionFailed(reason) => {
                Some(DisplayError::EngineConnectionFailure(reason.clone()))
            }
            EngineEvent::AuthError => Some(DisplayError::EngineConnectionFailure(
                "authentication rejected".into(),
            )),
            _ => None,
        }
    }
}

/// An [`EngineEvent`] tagged with the generation of the engine instance
/// that emitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSignal {
    /// Generation of the emitting engine
    pub generation: u64,
    /// What happened
    pub event: EngineEvent,
}

/// Receiving half of the engine event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<EngineSignal>;

/// Callback handle given to an engine at construction time.
///
/// Sending never blocks, so the engine may call it from any thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<EngineSignal>,
}

impl EventSender {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<EngineSignal>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the engine this sender belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queues `event`. Returns false once the session side is gone.
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx
            .send(EngineSignal {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    /// Reports [`EngineEvent::ConnectionSuccess`].
    pub fn connection_success(&self) -> bool {
        self.send(EngineEvent::ConnectionSuccess)
    }

    /// Reports [`EngineEvent::ConnectionFailed`].
    pub fn connection_failed(&self, reason: impl Into<String>) -> bool {
        self.send(EngineEvent::ConnectionFailed(reason.into()))
    }

    /// Reports [`EngineEvent::Disconnect`].
    pub fn disconnect(&self) -> bool {
        self.send(EngineEvent::Disconnect)
    }

    /// Reports [`EngineEvent::AuthError`].
    pub fn auth_error(&self) -> bool {
        self.send(EngineEvent::AuthError)
    }

    /// Reports [`EngineEvent::AuthSuccess`].
    pub fn auth_success(&self) -> bool {
        self.send(EngineEvent::AuthSuccess)
    }

    /// Reports [`EngineEvent::NewBitrate`].
    pub fn new_bitrate(&self, bitrate: u64) -> bool {
        self.send(EngineEvent::NewBitrate(bitrate))
    }
}

/// Operations of the external streaming engine.
///
/// Calls return immediately; the outcome of `start_stream` is reported
/// later through the engine's [`EventSender`].
pub trait StreamEngine: Send {
    /// Hands the capture consent to the engine's video source.
    fn set_capture_grant(&mut self, grant: &CaptureGrant);

    /// Sets up the video capture and encoder. False when unavailable.
    fn prepare_video(&mut self) -> bool;

    /// Sets up the audio capture and encoder. False when unavailable.
    fn prepare_audio(&mut self) -> bool;

    /// Begins connecting to `url` and streaming once connected.
    fn start_stream(&mut self, url: &str);

    /// Stops the stream and closes the connection.
    fn stop_stream(&mut self);

    /// Whether a stream is running or connecting.
    fn is_streaming(&self) -> bool;

    /// Whether the engine is writing a local recording.
    fn is_recording(&self) -> bool;
}

/// Construction strategy for engines, one per supported [`Protocol`].
pub trait EngineFactory: Send + Sync {
    /// Builds a fresh engine bound to `protocol` that reports through `events`.
    fn create(&self, protocol: Protocol, events: EventSender) -> Result<Box<dyn StreamEngine>>;
}
