//! User-visible status notices.
//!
//! Notices are plain text for the host's notification surface. Engine
//! events are turned into notices on the event pump task, so a
//! [`Notifier`] must tolerate being called from threads other than the UI
//! thread. [`ChannelNotifier`] hands everything to a mailbox owned by the
//! UI side.

use log::{info, warn};
use std::fmt;
use tokio::sync::mpsc;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Normal progress
    Info,
    /// Request refused, nothing broken
    Warning,
    /// Stream could not be established or was lost
    Error,
}

/// A one-shot status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Engine connected
    StreamStarted,
    /// Engine could not connect, with its reason
    ConnectionFailed(String),
    /// Engine disconnected
    StreamStopped,
    /// Server rejected the credentials
    AuthError,
    /// Server accepted the credentials
    AuthSuccess,
    /// Start requested while streaming
    AlreadyStreaming,
    /// Capture consent denied
    NoPermission,
    /// Endpoint rejected before any engine work
    InvalidEndpoint(String),
    /// No engine could be used
    EngineUnavailable(String),
}

impl Notice {
    /// Severity used when rendering the notice.
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::StreamStarted | Notice::StreamStopped | Notice::AuthSuccess => {
                NoticeLevel::Info
            }
            Notice::AlreadyStreaming | Notice::NoPermission => NoticeLevel::Warning,
            Notice::ConnectionFailed(_)
            | Notice::AuthError
            | Notice::InvalidEndpoint(_)
            | Notice::EngineUnavailable(_) => NoticeLevel::Error,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::StreamStarted => write!(f, "Stream started"),
            Notice::ConnectionFailed(reason) => write!(f, "Stream connection failed: {}", reason),
            Notice::StreamStopped => write!(f, "Stream stopped"),
            Notice::AuthError => write!(f, "Stream auth error"),
            Notice::AuthSuccess => write!(f, "Stream auth success"),
            Notice::AlreadyStreaming => write!(f, "You are already streaming"),
            Notice::NoPermission => write!(f, "No permissions available"),
            Notice::InvalidEndpoint(reason) => write!(f, "Invalid stream endpoint: {}", reason),
            Notice::EngineUnavailable(reason) => write!(f, "Streaming unavailable: {}", reason),
        }
    }
}

/// Persistent notifications that stay up until cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ongoing {
    /// Foreground notice keeping the capture service alive
    KeepAlive,
    /// "Streaming" indicator shown while a stream is requested
    Streaming,
}

/// Sink for notices. Must be callable from any thread.
pub trait Notifier: Send + Sync {
    /// Shows a one-shot notice.
    fn post(&self, notice: Notice);

    /// Shows a persistent notification. Showing it twice is harmless.
    fn show_ongoing(&self, _ongoing: Ongoing) {}

    /// Removes a persistent notification, if shown.
    fn cancel_ongoing(&self, _ongoing: Ongoing) {}
}

/// Messages delivered by [`ChannelNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierMessage {
    /// [`Notifier::post`]
    Post(Notice),
    /// [`Notifier::show_ongoing`]
    Show(Ongoing),
    /// [`Notifier::cancel_ongoing`]
    Cancel(Ongoing),
}

/// Mailbox notifier: forwards everything to whoever owns the receiver.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<NotifierMessage>,
}

impl ChannelNotifier {
    /// Creates the notifier and the mailbox it delivers to.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotifierMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn deliver(&self, message: NotifierMessage) {
        if self.tx.send(message).is_err() {
            warn!("Notice receiver dropped, discarding notice");
        }
    }
}

impl Notifier for ChannelNotifier {
    fn post(&self, notice: Notice) {
        self.deliver(NotifierMessage::Post(notice));
    }

    fn show_ongoing(&self, ongoing: Ongoing) {
        self.deliver(NotifierMessage::Show(ongoing));
    }

    fn cancel_ongoing(&self, ongoing: Ongoing) {
        self.deliver(NotifierMessage::Cancel(ongoing));
    }
}

/// Writes notices to the log under a fixed title.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    title: String,
}

impl LogNotifier {
    /// Logs under `title`.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl Notifier for LogNotifier {
    fn post(&self, notice: Notice) {
        match notice.level() {
            NoticeLevel::Info => info!("[{}] {}", self.title, notice),
            NoticeLevel::Warning | NoticeLevel::Error => warn!("[{}] {}", self.title, notice),
        }
    }

    fn show_ongoing(&self, ongoing: Ongoing) {
        info!("[{}] showing {:?} notification", self.title, ongoing);
    }

    fn cancel_ongoing(&self, ongoing: Ongoing) {
        info!("[{}] cancelling {:?} notification", self.title, ongoing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_notice_text() {
        assert_eq!(Notice::StreamStarted.to_string(), "Stream started");
        assert_eq!(
            Notice::ConnectionFailed("timeout".into()).to_string(),
            "Stream connection failed: timeout"
        );
        assert_eq!(Notice::NoPermission.level(), NoticeLevel::Warning);
        assert_eq!(Notice::AuthError.level(), NoticeLevel::Error);
    }

    #[test]
    fn test_channel_notifier_from_other_thread() {
        let (notifier, mut rx) = ChannelNotifier::new();

        let remote = notifier.clone();
        std::thread::spawn(move || {
            remote.show_ongoing(Ongoing::Streaming);
            remote.post(Notice::StreamStarted);
        })
        .join()
        .unwrap();
        notifier.cancel_ongoing(Ongoing::Streaming);

        assert_eq!(rx.try_recv().unwrap(), NotifierMessage::Show(Ongoing::Streaming));
        assert_eq!(rx.try_recv().unwrap(), NotifierMessage::Post(Notice::StreamStarted));
        assert_eq!(rx.try_recv().unwrap(), NotifierMessage::Cancel(Ongoing::Streaming));
        assert!(rx.try_recv().is_err());
    }
}
