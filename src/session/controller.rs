use super::{Session, SessionSnapshot, Status};
use crate::consent::CaptureGrant;
use crate::engine::{
    Endpoint, EngineEvent, EngineFactory, EngineSignal, EventReceiver, EventSender, Protocol,
    StreamEngine,
};
use crate::error::Capability;
use crate::notify::{Notice, Notifier};
use crate::{DisplayError, Result};
use bytes::Bytes;
use chrono::Utc;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Single authority over engine construction and start/stop ordering.
///
/// Every operation takes the session lock for its whole duration, so
/// requests coming from the UI and events coming from the engine are
/// applied one at a time. Engine calls are fire-and-forget; connection
/// outcomes arrive later as [`EngineSignal`]s on the receiver returned by
/// [`SessionController::new`] and are fed back through
/// [`SessionController::apply_event`].
pub struct SessionController {
    session: Mutex<Session>,
    factory: Arc<dyn EngineFactory>,
    notifier: Arc<dyn Notifier>,
    events: mpsc::UnboundedSender<EngineSignal>,
}

impl SessionController {
    /// Creates an idle controller and the receiver its engines report to.
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, EventReceiver) {
        let (events, rx) = mpsc::unbounded_channel();
        let controller = Self {
            session: Mutex::new(Session::default()),
            factory,
            notifier,
            events,
        };
        (controller, rx)
    }

    /// Creates the default RTMP engine if none exists yet.
    ///
    /// A construction failure is only logged; the missing engine surfaces
    /// on the next stream attempt.
    pub fn initialize(&self) {
        let mut session = self.session.lock();
        if session.engine.is_some() {
            debug!("Session already initialized");
            return;
        }

        match self.construct(&mut session, Protocol::Rtmp) {
            Ok(engine) => {
                session.engine = Some(engine);
                info!("Session initialized (engine generation {})", session.generation);
            }
            Err(e) => error!("Engine unavailable at initialization: {}", e),
        }
    }

    /// Stores the capture consent. Only the latest grant is honored.
    pub fn record_consent(&self, result_code: i32, payload: impl Into<Bytes>) {
        let mut session = self.session.lock();
        if session.grant.is_some() {
            debug!("Replacing previous capture grant");
        }
        session.grant = Some(CaptureGrant::new(result_code, payload));
    }

    /// Replaces the engine with a fresh one bound to `endpoint`'s protocol.
    ///
    /// Any active stream is stopped and its engine dropped before the new
    /// engine is constructed.
    pub fn prepare(&self, endpoint: &str) -> Result<()> {
        let mut session = self.session.lock();
        self.prepare_locked(&mut session, endpoint).map(|_| ())
    }

    /// Prepares the capabilities and starts streaming to `endpoint`.
    ///
    /// `endpoint` must be the one given to the last `prepare`, otherwise
    /// `EndpointMismatch` is returned. Posts an "already streaming" notice
    /// and returns `DuplicateStart` without touching the engine if a stream
    /// is running.
    pub fn start(&self, endpoint: &str) -> Result<()> {
        let endpoint = Endpoint::parse(endpoint)?;
        let result = {
            let mut session = self.session.lock();
            self.start_locked(&mut session, &endpoint)
        };
        self.announce(result)
    }

    /// `prepare` followed by `start` without releasing the lock in between.
    pub fn prepare_and_start(&self, endpoint: &str) -> Result<()> {
        let result = {
            let mut session = self.session.lock();
            self.prepare_locked(&mut session, endpoint)
                .and_then(|endpoint| self.start_locked(&mut session, &endpoint))
        };
        self.announce(result)
    }

    /// Stops the stream if one is running. Safe to call in any state.
    pub fn stop(&self) {
        let mut session = self.session.lock();
        Self::stop_locked(&mut session);
    }

    /// Stops, releases the engine and forgets endpoint and consent.
    pub fn teardown(&self) {
        let mut session = self.session.lock();
        Self::stop_locked(&mut session);
        session.release_engine();
        session.endpoint = None;
        session.grant = None;
        session.status = Status::Idle;
        session.last_bitrate = None;
        info!("Session torn down");
    }

    /// Applies an engine event to the session status.
    ///
    /// Returns the resulting status, or `None` when the event was discarded:
    /// it came from an engine that has since been replaced or released, or
    /// it reports a failure while no stream is `Preparing` or `Streaming`.
    /// Events never change the endpoint or the engine handle.
    ///
    /// `ConnectionFailed` and `AuthError` stop the engine if it still
    /// reports streaming before the session is marked `Failed`. Nothing is
    /// retried.
    pub fn apply_event(&self, signal: &EngineSignal) -> Option<Status> {
        let mut session = self.session.lock();
        if signal.generation != session.generation || session.engine.is_none() {
            debug!(
                "Discarding {:?} from stale engine generation {}",
                signal.event, signal.generation
            );
            return None;
        }

        let engine_streaming = session
            .engine
            .as_ref()
            .map(|engine| engine.is_streaming())
            .unwrap_or(false);

        match &signal.event {
            EngineEvent::ConnectionSuccess => {
                if engine_streaming {
                    session.status = Status::Streaming;
                    session.started_at = Some(Utc::now());
                    info!("Stream connected");
                } else {
                    warn!("Connection success reported while engine is not streaming");
                }
            }
            EngineEvent::ConnectionFailed(_) | EngineEvent::AuthError => {
                if !matches!(session.status, Status::Preparing | Status::Streaming) {
                    debug!(
                        "Ignoring {:?} while session is {}",
                        signal.event, session.status
                    );
                    return None;
                }
                if let Some(failure) = signal.event.failure() {
                    warn!("{}", failure);
                }
                Self::fail_locked(&mut session);
            }
            EngineEvent::Disconnect => {
                if session.status != Status::Failed {
                    session.status = Status::Idle;
                }
                session.started_at = None;
                info!("Stream disconnected");
            }
            EngineEvent::AuthSuccess => debug!("Stream authentication accepted"),
            EngineEvent::NewBitrate(bitrate) => {
                debug!("Engine bitrate {} bps", bitrate);
                session.last_bitrate = Some(*bitrate);
            }
        }

        Some(session.status)
    }

    /// Whether the engine reports an active stream. False without an engine.
    pub fn is_streaming(&self) -> bool {
        self.session
            .lock()
            .engine
            .as_ref()
            .map(|engine| engine.is_streaming())
            .unwrap_or(false)
    }

    /// Whether the engine reports an active recording. False without an engine.
    pub fn is_recording(&self) -> bool {
        self.session
            .lock()
            .engine
            .as_ref()
            .map(|engine| engine.is_recording())
            .unwrap_or(false)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> Status {
        self.session.lock().status
    }

    /// Destination of the current or last prepared stream.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.session.lock().endpoint.clone()
    }

    /// Copy of the session state for polling callers.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().snapshot()
    }

    /// Posts the duplicate-start notice. Runs after the session lock is
    /// released, so a notifier may call back into the controller.
    fn announce(&self, result: Result<()>) -> Result<()> {
        if let Err(DisplayError::DuplicateStart) = &result {
            self.notifier.post(Notice::AlreadyStreaming);
        }
        result
    }

    // Helpers below expect the session lock to be held.

    fn construct(&self, session: &mut Session, protocol: Protocol) -> Result<Box<dyn StreamEngine>> {
        session.release_engine();
        session.generation += 1;
        let events = EventSender::new(session.generation, self.events.clone());
        debug!(
            "Constructing {} engine, generation {}",
            protocol, session.generation
        );
        self.factory.create(protocol, events)
    }

    fn prepare_locked(&self, session: &mut Session, endpoint: &str) -> Result<Endpoint> {
        let endpoint = Endpoint::parse(endpoint)?;
        let grant = match session.grant.clone() {
            Some(grant) => grant,
            None => {
                warn!("Prepare for {} rejected: no capture consent", endpoint);
                return Err(DisplayError::ConsentMissing);
            }
        };

        Self::stop_locked(session);

        let mut engine = match self.construct(session, endpoint.protocol()) {
            Ok(engine) => engine,
            Err(e) => {
                error!("Failed to construct {} engine: {}", endpoint.protocol(), e);
                session.endpoint = None;
                session.status = Status::Idle;
                return Err(match e {
                    e @ DisplayError::EngineUnavailable(_) => e,
                    other => DisplayError::EngineUnavailable(other.to_string()),
                });
            }
        };
        engine.set_capture_grant(&grant);

        session.engine = Some(engine);
        session.endpoint = Some(endpoint.clone());
        session.status = Status::Preparing;
        session.last_bitrate = None;
        info!("Prepared {} stream to {}", endpoint.protocol(), endpoint);
        Ok(endpoint)
    }

    fn start_locked(&self, session: &mut Session, endpoint: &Endpoint) -> Result<()> {
        let already_streaming = match session.engine.as_ref() {
            Some(engine) => engine.is_streaming(),
            None => {
                return Err(DisplayError::EngineUnavailable(
                    "no engine has been created".into(),
                ))
            }
        };
        if already_streaming {
            warn!("Start requested while already streaming");
            return Err(DisplayError::DuplicateStart);
        }
        match session.endpoint.as_ref() {
            None => return Err(DisplayError::NotPrepared),
            Some(prepared) if prepared.as_str() != endpoint.as_str() => {
                warn!("Start for {} rejected: prepared for {}", endpoint, prepared);
                return Err(DisplayError::EndpointMismatch {
                    prepared: prepared.to_string(),
                    requested: endpoint.to_string(),
                });
            }
            Some(_) => {}
        }

        session.status = Status::Preparing;
        let engine = session
            .engine
            .as_mut()
            .ok_or_else(|| DisplayError::EngineUnavailable("no engine has been created".into()))?;

        if !engine.prepare_video() {
            warn!("Video preparation failed, abandoning start");
            return Err(DisplayError::CapabilityPrepareFailed(Capability::Video));
        }
        if !engine.prepare_audio() {
            warn!("Audio preparation failed, abandoning start");
            return Err(DisplayError::CapabilityPrepareFailed(Capability::Audio));
        }

        info!("Starting stream to {}", endpoint);
        engine.start_stream(endpoint.as_str());
        Ok(())
    }

    fn stop_locked(session: &mut Session) {
        let status = session.status;
        if let Some(engine) = session.engine.as_mut() {
            if status == Status::Streaming || engine.is_streaming() {
                info!("Stopping stream");
                engine.stop_stream();
            }
        }
        session.status = Status::Idle;
        session.started_at = None;
    }

    fn fail_locked(session: &mut Session) {
        if let Some(engine) = session.engine.as_mut() {
            if engine.is_streaming() {
                engine.stop_stream();
            }
        }
        session.status = Status::Failed;
        session.started_at = None;
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &*self.session.lock())
            .finish()
    }
}
