//! Controller
//!
//! The surface a UI or CLI drives: one [`EventCapture`] and one
//! [`ReplayEngine`] behind plain start/stop/play calls with boolean results.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::capture::EventCapture;
use crate::config::Config;
use crate::data::{ActionRecord, Timeline};
use crate::replay::{
    InputInjector, PlaybackEvent, RdevSink, RepeatCount, ReplayEngine, ReplayStatus, TargetGate,
};
use crate::target::frontmost_gate;

pub struct Controller {
    capture: Mutex<EventCapture>,
    engine: ReplayEngine,
    gate: Mutex<Option<TargetGate>>,
}

impl Controller {
    pub fn new(capture: EventCapture, engine: ReplayEngine) -> Self {
        Self {
            capture: Mutex::new(capture),
            engine,
            gate: Mutex::new(None),
        }
    }

    /// Production wiring: OS hook, `rdev` injection and the configured target gate
    pub fn from_config(config: &Config) -> Self {
        let engine = ReplayEngine::new(
            InputInjector::new(Arc::new(RdevSink)),
            config.gate_poll_interval(),
        );
        let controller = Self::new(EventCapture::with_default_backend(), engine);

        if let Some(target) = config.replay.target_app.as_deref() {
            info!("Replay gated on target application {:?}", target);
            controller.set_gate(Some(frontmost_gate(target)));
        }

        controller
    }

    fn capture(&self) -> MutexGuard<'_, EventCapture> {
        self.capture.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start recording into a fresh timeline. False if the hook is unavailable.
    pub fn start_capture(&self) -> bool {
        match self.capture().start() {
            Ok(()) => true,
            Err(e) => {
                warn!("Cannot start capture: {}", e);
                false
            }
        }
    }

    pub fn stop_capture(&self) {
        self.capture().stop();
    }

    /// Play `timeline`. Any running capture is stopped first so injected
    /// input is never recorded back.
    pub async fn play(&self, timeline: impl Into<Arc<Timeline>>, repeat: RepeatCount) -> bool {
        self.stop_capture();
        let gate = self
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.engine.play(timeline, repeat, gate).await
    }

    /// Play whatever the last capture session collected
    pub async fn play_recorded(&self, repeat: RepeatCount) -> bool {
        let timeline = {
            let mut capture = self.capture();
            capture.stop();
            capture.timeline()
        };
        self.play(timeline, repeat).await
    }

    pub async fn pause(&self) -> bool {
        self.engine.pause().await
    }

    pub async fn resume(&self) -> bool {
        self.engine.resume().await
    }

    pub async fn stop(&self) -> bool {
        self.engine.stop().await
    }

    /// Resolve once no replay session is active
    pub async fn finished(&self) {
        self.engine.finished().await
    }

    pub fn is_recording(&self) -> bool {
        self.capture().is_recording()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.engine.is_paused()
    }

    pub fn recorded_timeline(&self) -> Timeline {
        self.capture().timeline()
    }

    /// Move the recorded timeline out, leaving the capture empty
    pub fn take_recorded_timeline(&self) -> Timeline {
        self.capture().take_timeline()
    }

    pub fn subscribe_records(&self) -> broadcast::Receiver<ActionRecord> {
        self.capture().subscribe()
    }

    pub fn subscribe_playback(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.engine.subscribe()
    }

    pub fn watch_playback(&self) -> watch::Receiver<ReplayStatus> {
        self.engine.watch_state()
    }

    /// Gate used by subsequent `play` calls. A running session keeps its gate.
    pub fn set_gate(&self, gate: Option<TargetGate>) {
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = gate;
    }
}
