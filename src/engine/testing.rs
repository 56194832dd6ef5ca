//! Scripted collaborators for exercising a session without a real engine.
//!
//! [`ScriptedFactory`] hands out [`ScriptedEngine`]s that record every
//! command they receive and keep count of how many instances are alive.

use super::{EngineFactory, EventSender, Protocol, StreamEngine};
use crate::consent::{CaptureGrant, ConsentProvider, ConsentResult};
use crate::notify::{Notice, Notifier, Ongoing};
use crate::{DisplayError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// A command received by a scripted engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    /// `set_capture_grant` with the grant's result code
    SetCaptureGrant(i32),
    /// `prepare_video`
    PrepareVideo,
    /// `prepare_audio`
    PrepareAudio,
    /// `start_stream` with the URL
    StartStream(String),
    /// `stop_stream`
    StopStream,
}

/// Canned answers for the engines a factory creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineScript {
    /// Answer of `prepare_video`
    pub video_ok: bool,
    /// Answer of `prepare_audio`
    pub audio_ok: bool,
    /// Make the factory refuse to construct engines
    pub fail_create: bool,
    /// Answer of `is_recording`
    pub recording: bool,
}

impl Default for EngineScript {
    fn default() -> Self {
        Self {
            video_ok: true,
            audio_ok: true,
            fail_create: false,
            recording: false,
        }
    }
}

#[derive(Debug, Default)]
struct FactoryState {
    script: EngineScript,
    calls: Vec<(u64, EngineCall)>,
    protocols: Vec<Protocol>,
    senders: Vec<EventSender>,
    created: u64,
    live: usize,
    max_live: usize,
}

/// Factory handing out [`ScriptedEngine`]s. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl ScriptedFactory {
    /// Factory with the default script: everything succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose engines follow `script`.
    pub fn with_script(script: EngineScript) -> Self {
        let factory = Self::default();
        factory.state.lock().script = script;
        factory
    }

    /// Script for engines created from now on.
    pub fn set_script(&self, script: EngineScript) {
        self.state.lock().script = script;
    }

    /// Every command received, in order, across all engines.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().calls.iter().map(|(_, c)| c.clone()).collect()
    }

    /// Commands received by the engine with the given creation index (from 1).
    pub fn calls_for(&self, instance: u64) -> Vec<EngineCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(id, _)| *id == instance)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// URLs passed to `start_stream`, in order.
    pub fn start_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::StartStream(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Forgets the recorded commands.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Number of engines constructed so far.
    pub fn created(&self) -> u64 {
        self.state.lock().created
    }

    /// Number of engines not yet dropped.
    pub fn live(&self) -> usize {
        self.state.lock().live
    }

    /// Highest number of engines alive at the same time.
    pub fn max_live(&self) -> usize {
        self.state.lock().max_live
    }

    /// Protocol of every construction, in order.
    pub fn protocols(&self) -> Vec<Protocol> {
        self.state.lock().protocols.clone()
    }

    /// Callback handle of the most recently created engine.
    pub fn last_sender(&self) -> Option<EventSender> {
        self.state.lock().senders.last().cloned()
    }
}

impl EngineFactory for ScriptedFactory {
    fn create(&self, protocol: Protocol, events: EventSender) -> Result<Box<dyn StreamEngine>> {
        let mut state = self.state.lock();
        if state.script.fail_create {
            return Err(DisplayError::EngineUnavailable(format!(
                "{} engine cannot be created",
                protocol
            )));
        }

        state.created += 1;
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        state.protocols.push(protocol);
        state.senders.push(events);

        Ok(Box::new(ScriptedEngine {
            id: state.created,
            script: state.script,
            streaming: false,
            state: Arc::clone(&self.state),
        }))
    }
}

/// Engine double that follows its [`EngineScript`].
#[derive(Debug)]
pub struct ScriptedEngine {
    id: u64,
    script: EngineScript,
    streaming: bool,
    state: Arc<Mutex<FactoryState>>,
}

impl ScriptedEngine {
    fn record(&self, call: EngineCall) {
        self.state.lock().calls.push((self.id, call));
    }
}

impl StreamEngine for ScriptedEngine {
    fn set_capture_grant(&mut self, grant: &CaptureGrant) {
        self.record(EngineCall::SetCaptureGrant(grant.result_code()));
    }

    fn prepare_video(&mut self) -> bool {
        self.record(EngineCall::PrepareVideo);
        self.script.video_ok
    }

    fn prepare_audio(&mut self) -> bool {
        self.record(EngineCall::PrepareAudio);
        self.script.audio_ok
    }

    fn start_stream(&mut self, url: &str) {
        self.record(EngineCall::StartStream(url.to_string()));
        self.streaming = true;
    }

    fn stop_stream(&mut self) {
        self.record(EngineCall::StopStream);
        self.streaming = false;
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn is_recording(&self) -> bool {
        self.script.recording
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.live = state.live.saturating_sub(1);
    }
}

/// Notifier that keeps everything it was given.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    ongoing: Mutex<Vec<Ongoing>>,
}

impl RecordingNotifier {
    /// Notifier with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Posted notices, oldest first.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// How often `notice` was posted.
    pub fn count(&self, notice: &Notice) -> usize {
        self.notices.lock().iter().filter(|n| *n == notice).count()
    }

    /// Whether `ongoing` is shown and not cancelled.
    pub fn is_showing(&self, ongoing: Ongoing) -> bool {
        self.ongoing.lock().contains(&ongoing)
    }

    /// Forgets posted notices. Ongoing notifications stay.
    pub fn clear(&self) {
        self.notices.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn post(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }

    fn show_ongoing(&self, ongoing: Ongoing) {
        let mut shown = self.ongoing.lock();
        if !shown.contains(&ongoing) {
            shown.push(ongoing);
        }
    }

    fn cancel_ongoing(&self, ongoing: Ongoing) {
        self.ongoing.lock().retain(|o| *o != ongoing);
    }
}

/// Consent flow that always answers with the same result.
#[derive(Debug, Clone)]
pub struct FixedConsent {
    result: ConsentResult,
}

impl FixedConsent {
    /// Always answers `result`.
    pub fn new(result: ConsentResult) -> Self {
        Self { result }
    }

    /// Always accepts with a dummy token.
    pub fn granting() -> Self {
        Self::new(ConsentResult::granted(&b"projection-token"[..]))
    }

    /// Always dismisses the dialog.
    pub fn denying() -> Self {
        Self::new(ConsentResult::denied())
    }
}

#[async_trait]
impl ConsentProvider for FixedConsent {
    async fn request_consent(&self) -> ConsentResult {
        self.result.clone()
    }
}
