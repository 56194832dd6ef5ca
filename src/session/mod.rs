//! Streaming session state and the controller that owns it.

use crate::consent::CaptureGrant;
use crate::engine::{Endpoint, StreamEngine};
use chrono::{DateTime, Utc};
use log::debug;
use std::fmt;

mod controller;

pub use controller::SessionController;

/// Lifecycle status of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// No stream requested
    #[default]
    Idle,
    /// Engine prepared or started, waiting for the connection
    Preparing,
    /// Engine reported a live connection
    Streaming,
    /// Engine reported a connection or auth failure
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Idle => write!(f, "idle"),
            Status::Preparing => write!(f, "preparing"),
            Status::Streaming => write!(f, "streaming"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

/// Mutable session state. Only ever touched under the controller's lock.
#[derive(Default)]
pub(crate) struct Session {
    pub(crate) endpoint: Option<Endpoint>,
    pub(crate) engine: Option<Box<dyn StreamEngine>>,
    pub(crate) grant: Option<CaptureGrant>,
    pub(crate) status: Status,
    /// Bumped for every engine constructed, tags its events
    pub(crate) generation: u64,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) last_bitrate: Option<u64>,
}

impl Session {
    /// Drops the current engine, if any.
    pub(crate) fn release_engine(&mut self) {
        if self.engine.take().is_some() {
            debug!("Released engine generation {}", self.generation);
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            endpoint: self.endpoint.clone(),
            generation: self.generation,
            started_at: self.started_at,
            last_bitrate: self.last_bitrate,
            has_engine: self.engine.is_some(),
            has_grant: self.grant.is_some(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("has_engine", &self.engine.is_some())
            .field("has_grant", &self.grant.is_some())
            .field("status", &self.status)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Point-in-time copy of the session for callers that poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Lifecycle status
    pub status: Status,
    /// Destination of the current or last prepared stream
    pub endpoint: Option<Endpoint>,
    /// Generation of the newest engine constructed
    pub generation: u64,
    /// When the engine last reported a successful connection
    pub started_at: Option<DateTime<Utc>>,
    /// Last bitrate reported by the engine, in bits per second
    pub last_bitrate: Option<u64>,
    /// Whether an engine is held
    pub has_engine: bool,
    /// Whether a capture grant is recorded
    pub has_grant: bool,
}

impl SessionSnapshot {
    /// Time since the connection came up, while streaming.
    pub fn uptime(&self) -> Option<chrono::Duration> {
        match (self.status, self.started_at) {
            (Status::Streaming, Some(started)) => Some(Utc::now() - started),
            _ => None,
        }
    }
}
