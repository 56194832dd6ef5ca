use std::fmt;
use thiserror::Error;

/// Engine capability that has to be prepared before a stream can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Display/camera video capture and encoder
    Video,
    /// Microphone capture and encoder
    Audio,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Video => write!(f, "video"),
            Capability::Audio => write!(f, "audio"),
        }
    }
}

/// Errors raised by session and bridge operations. None of them is fatal.
#[derive(Error, Debug)]
pub enum DisplayError {
    /// Prepare attempted before capture consent was recorded
    #[error("capture consent has not been granted")]
    ConsentMissing,

    /// The engine could not prepare video or audio
    #[error("{0} preparation failed")]
    CapabilityPrepareFailed(Capability),

    /// Start requested while a stream is running
    #[error("stream already running")]
    DuplicateStart,

    /// Connection failure reported by the engine
    #[error("engine connection failure: {0}")]
    EngineConnectionFailure(String),

    /// Endpoint string is empty
    #[error("endpoint is empty")]
    EmptyEndpoint,

    /// Endpoint string is not a usable URL
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Endpoint scheme has no engine strategy
    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    /// Start requested for a different endpoint than the prepared one
    #[error("stream prepared for {prepared}, cannot start {requested}")]
    EndpointMismatch {
        /// Endpoint bound by the last prepare
        prepared: String,
        /// Endpoint passed to start
        requested: String,
    },

    /// Start requested before any prepare
    #[error("stream has not been prepared")]
    NotPrepared,

    /// No engine exists or one could not be constructed
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Invalid configuration value
    #[error("config error: {0}")]
    Config(String),

    /// I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias using [`DisplayError`].
pub type Result<T> = std::result::Result<T, DisplayError>;
