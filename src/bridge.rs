//! Adapts host lifecycle events to session operations and engine events to
//! notices.

use crate::config::Config;
use crate::consent::{ConsentProvider, ConsentResult};
use crate::engine::{EngineEvent, EngineSignal, EventReceiver};
use crate::notify::{Notice, Notifier, Ongoing};
use crate::session::{SessionController, Status};
use crate::{DisplayError, Result};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Command that starts the capture service. The endpoint is the only
/// accepted field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartCommand {
    /// Stream destination; a command without one does nothing
    pub endpoint: Option<String>,
}

impl StartCommand {
    /// Command carrying `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
        }
    }
}

/// Notice shown for an engine event, if any.
pub fn notice_for(event: &EngineEvent) -> Option<Notice> {
    match event {
        EngineEvent::ConnectionSuccess => Some(Notice::StreamStarted),
        EngineEvent::ConnectionFailed(reason) => Some(Notice::ConnectionFailed(reason.clone())),
        EngineEvent::Disconnect => Some(Notice::StreamStopped),
        EngineEvent::AuthError => Some(Notice::AuthError),
        EngineEvent::AuthSuccess => Some(Notice::AuthSuccess),
        EngineEvent::NewBitrate(_) => None,
    }
}

/// Glue between the host's capture service and the session.
///
/// Owns the ongoing notifications: `KeepAlive` while the service runs,
/// `Streaming` while a stream is requested.
pub struct LifecycleBridge {
    controller: Arc<SessionController>,
    notifier: Arc<dyn Notifier>,
    consent: Arc<dyn ConsentProvider>,
    config: Config,
    service_running: AtomicBool,
}

impl LifecycleBridge {
    /// Bridge with the service not yet created.
    pub fn new(
        controller: Arc<SessionController>,
        notifier: Arc<dyn Notifier>,
        consent: Arc<dyn ConsentProvider>,
        config: Config,
    ) -> Self {
        Self {
            controller,
            notifier,
            consent,
            config,
            service_running: AtomicBool::new(false),
        }
    }

    /// The session controller driven by this bridge.
    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    /// Settings the bridge was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Service created: keep it in the foreground and make sure an engine exists.
    pub fn on_service_create(&self) {
        info!("Capture service created");
        self.service_running.store(true, Ordering::SeqCst);
        self.notifier.show_ongoing(Ongoing::KeepAlive);
        self.controller.initialize();
    }

    /// Service destroyed: release everything.
    pub fn on_service_destroy(&self) {
        info!("Capture service destroyed");
        self.service_running.store(false, Ordering::SeqCst);
        self.controller.teardown();
        self.notifier.cancel_ongoing(Ongoing::Streaming);
        self.notifier.cancel_ongoing(Ongoing::KeepAlive);
    }

    /// The start/stop button.
    ///
    /// When idle, asks for capture consent and starts streaming to the
    /// configured endpoint. When streaming, stops and releases the session.
    pub async fn toggle(&self) -> Status {
        if !self.controller.is_streaming() {
            let result = self.consent.request_consent().await;
            self.on_consent_result(result);
        } else {
            self.controller.stop();
            self.on_service_destroy();
        }

        if !self.controller.is_streaming() && !self.controller.is_recording() {
            self.notifier.cancel_ongoing(Ongoing::Streaming);
        }
        self.controller.status()
    }

    /// Whether the capture service is between create and destroy.
    pub fn is_service_running(&self) -> bool {
        self.service_running.load(Ordering::SeqCst)
    }

    /// Answer of the consent dialog. Returns whether a start was attempted.
    ///
    /// Recreates the capture service first if an earlier stop destroyed it.
    pub fn on_consent_result(&self, result: ConsentResult) -> bool {
        let grant = match result.into_grant() {
            Some(grant) => grant,
            None => {
                warn!("Capture consent denied");
                self.notifier.post(Notice::NoPermission);
                return false;
            }
        };

        if !self.is_service_running() {
            self.on_service_create();
        }
        self.notifier.show_ongoing(Ongoing::Streaming);
        self.controller
            .record_consent(grant.result_code(), grant.payload().clone());

        let command = StartCommand::new(self.config.endpoint.clone());
        // Failures are already reported to the user
        let _ = self.handle_start_command(command);
        true
    }

    /// Runs a start command: prepare and start in one locked sequence.
    pub fn handle_start_command(&self, command: StartCommand) -> Result<()> {
        let Some(endpoint) = command.endpoint else {
            debug!("Start command without endpoint, nothing to do");
            return Ok(());
        };

        self.controller
            .prepare_and_start(&endpoint)
            .inspect_err(|e| self.report(e))
    }

    /// Applies an engine event and posts its notice.
    pub fn on_engine_event(&self, signal: EngineSignal) -> Option<Status> {
        let status = self.controller.apply_event(&signal)?;
        if let Some(notice) = notice_for(&signal.event) {
            self.notifier.post(notice);
        }
        Some(status)
    }

    /// Drains engine events on a tokio task until the bridge or the
    /// channel goes away.
    pub fn spawn_event_pump(self: &Arc<Self>, mut events: EventReceiver) -> JoinHandle<()> {
        let bridge = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(signal) = events.recv().await {
                let Some(bridge) = bridge.upgrade() else {
                    break;
                };
                bridge.on_engine_event(signal);
            }
            debug!("Engine event pump finished");
        })
    }

    fn report(&self, error: &DisplayError) {
        match error {
            DisplayError::ConsentMissing | DisplayError::CapabilityPrepareFailed(_) => {
                warn!("Stream start abandoned: {}", error);
            }
            DisplayError::DuplicateStart => debug!("Duplicate start already reported"),
            DisplayError::EmptyEndpoint
            | DisplayError::InvalidEndpoint(_)
            | DisplayError::UnsupportedScheme(_)
            | DisplayError::EndpointMismatch { .. } => {
                warn!("Rejected endpoint: {}", error);
                self.notifier.post(Notice::InvalidEndpoint(error.to_string()));
            }
            DisplayError::EngineUnavailable(_) | DisplayError::NotPrepared => {
                warn!("Cannot stream: {}", error);
                self.notifier
                    .post(Notice::EngineUnavailable(error.to_string()));
            }
            other => warn!("Stream start failed: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{EngineScript, FixedConsent, RecordingNotifier, ScriptedFactory};
    use pretty_assertions::assert_eq;

    fn bridge_with(
        consent: FixedConsent,
    ) -> (LifecycleBridge, ScriptedFactory, Arc<RecordingNotifier>, EventReceiver) {
        bridge_scripted(consent, EngineScript::default())
    }

    fn bridge_scripted(
        consent: FixedConsent,
        script: EngineScript,
    ) -> (LifecycleBridge, ScriptedFactory, Arc<RecordingNotifier>, EventReceiver) {
        let factory = ScriptedFactory::with_script(script);
        let notifier = Arc::new(RecordingNotifier::new());
        let (controller, rx) = SessionController::new(Arc::new(factory.clone()), notifier.clone());
        let bridge = LifecycleBridge::new(
            Arc::new(controller),
            notifier.clone(),
            Arc::new(consent),
            Config::default(),
        );
        (bridge, factory, notifier, rx)
    }

    #[test]
    fn test_event_notices() {
        assert_eq!(notice_for(&EngineEvent::ConnectionSuccess), Some(Notice::StreamStarted));
        assert_eq!(
            notice_for(&EngineEvent::ConnectionFailed("refused".into())),
            Some(Notice::ConnectionFailed("refused".into()))
        );
        assert_eq!(notice_for(&EngineEvent::NewBitrate(1000)), None);
    }

    #[test]
    fn test_start_command_without_endpoint() {
        let (bridge, factory, notifier, _rx) = bridge_with(FixedConsent::granting());
        assert!(bridge.handle_start_command(StartCommand::default()).is_ok());
        assert!(factory.calls().is_empty());
        assert!(notifier.notices().is_empty());
    }

    #[test]
    fn test_unsupported_endpoint_is_reported() {
        let (bridge, factory, notifier, _rx) = bridge_with(FixedConsent::granting());
        bridge.controller().record_consent(crate::consent::RESULT_OK, &b"token"[..]);

        let result = bridge.handle_start_command(StartCommand::new("srt://host:9000"));
        assert!(matches!(result, Err(DisplayError::UnsupportedScheme(_))));
        assert_eq!(factory.created(), 0);
        assert!(matches!(notifier.notices().as_slice(), [Notice::InvalidEndpoint(_)]));
    }

    #[test]
    fn test_denied_consent_never_touches_engine() {
        let (bridge, factory, notifier, _rx) = bridge_with(FixedConsent::denying());
        bridge.on_service_create();

        assert!(!bridge.on_consent_result(ConsentResult::denied()));
        assert_eq!(notifier.notices(), vec![Notice::NoPermission]);
        assert!(factory.calls().is_empty());
        assert!(!notifier.is_showing(Ongoing::Streaming));
        assert!(notifier.is_showing(Ongoing::KeepAlive));
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let (bridge, factory, notifier, _rx) = bridge_with(FixedConsent::granting());
        bridge.on_service_create();

        assert_eq!(bridge.toggle().await, Status::Preparing);
        assert!(bridge.controller().is_streaming());
        assert!(notifier.is_showing(Ongoing::Streaming));
        assert_eq!(factory.start_calls(), vec![Config::default().endpoint]);

        assert_eq!(bridge.toggle().await, Status::Idle);
        assert!(!bridge.controller().is_streaming());
        assert!(!notifier.is_showing(Ongoing::Streaming));
        assert!(!notifier.is_showing(Ongoing::KeepAlive));
        assert_eq!(factory.live(), 0);
    }

    #[tokio::test]
    async fn test_restart_after_stop_restores_keep_alive() {
        let (bridge, factory, notifier, _rx) = bridge_with(FixedConsent::granting());
        bridge.on_service_create();

        bridge.toggle().await;
        assert_eq!(bridge.toggle().await, Status::Idle);
        assert!(!bridge.is_service_running());
        assert!(!notifier.is_showing(Ongoing::KeepAlive));

        assert_eq!(bridge.toggle().await, Status::Preparing);
        assert!(bridge.is_service_running());
        assert!(notifier.is_showing(Ongoing::KeepAlive));
        assert!(notifier.is_showing(Ongoing::Streaming));
        assert!(bridge.controller().is_streaming());
        assert_eq!(factory.live(), 1);
    }

    #[tokio::test]
    async fn test_recording_keeps_streaming_indicator() {
        let (bridge, _, notifier, _rx) = bridge_scripted(
            FixedConsent::granting(),
            EngineScript {
                audio_ok: false,
                recording: true,
                ..EngineScript::default()
            },
        );
        bridge.on_service_create();

        assert_eq!(bridge.toggle().await, Status::Preparing);
        assert!(!bridge.controller().is_streaming());
        assert!(bridge.controller().is_recording());
        assert!(notifier.is_showing(Ongoing::Streaming));
    }

    #[test]
    fn test_endpoint_mismatch_is_reported() {
        let (bridge, factory, notifier, _rx) = bridge_with(FixedConsent::granting());
        let controller = bridge.controller();
        controller.record_consent(crate::consent::RESULT_OK, &b"token"[..]);
        controller.prepare("rtmp://a.example.com/app/s").unwrap();

        let result = controller
            .start("rtmp://b.example.com/app/s")
            .inspect_err(|e| bridge.report(e));
        assert!(matches!(result, Err(DisplayError::EndpointMismatch { .. })));
        assert!(factory.start_calls().is_empty());
        assert!(matches!(notifier.notices().as_slice(), [Notice::InvalidEndpoint(_)]));
    }
}
