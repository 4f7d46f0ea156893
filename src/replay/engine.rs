//! Replay engine
//!
//! Plays a [`Timeline`] through an [`InputInjector`], reconstructing the waits
//! between records from their timestamps. Every wait is a cancellable
//! suspension point, so `stop()` and `pause()` take effect without waiting
//! out the current delay.
//!
//! Only one session runs at a time. Starting a new one cancels the running
//! session and waits for it to unwind before the new session's first record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::data::{ActionKind, Timeline};

use super::injector::{InputInjector, InputSink};
use super::session::{
    evaluate_gate, monitor_gate, Cancelled, IdleOnExit, ReplayStatus, SessionControl, Shared,
};
use super::{PlaybackEvent, RepeatCount, ReplayState, StopReason, TargetGate};

/// Pause between two passes of a repeating session
pub const INTER_REPEAT_PAUSE: Duration = Duration::from_millis(100);

/// Default period for polling a target gate
pub const DEFAULT_GATE_POLL_INTERVAL: Duration = Duration::from_millis(100);

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug)]
struct ActiveSession {
    control: Arc<SessionControl>,
    handle: JoinHandle<()>,
}

struct Inner {
    injector: InputInjector,
    shared: Arc<Shared>,
    /// Serializes play/pause/resume/stop; never locked by session tasks
    active: Mutex<Option<ActiveSession>>,
    next_session: AtomicU64,
    gate_poll_interval: Duration,
}

/// Cloneable handle to the replay engine
#[derive(Clone)]
pub struct ReplayEngine {
    inner: Arc<Inner>,
}

impl ReplayEngine {
    pub fn new(injector: InputInjector, gate_poll_interval: Duration) -> Self {
        let (status, _) = watch::channel(ReplayStatus::default());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                injector,
                shared: Arc::new(Shared { status, events }),
                active: Mutex::new(None),
                next_session: AtomicU64::new(1),
                gate_poll_interval,
            }),
        }
    }

    pub fn with_sink(sink: Arc<dyn InputSink>) -> Self {
        Self::new(InputInjector::new(sink), DEFAULT_GATE_POLL_INTERVAL)
    }

    /// Start playing `timeline`.
    ///
    /// Returns false (and changes nothing) for an empty timeline. A session
    /// that is already running is cancelled and joined first.
    pub async fn play(
        &self,
        timeline: impl Into<Arc<Timeline>>,
        repeat: RepeatCount,
        gate: Option<TargetGate>,
    ) -> bool {
        let timeline = timeline.into();
        if timeline.is_empty() {
            debug!("Ignoring play request for an empty timeline");
            return false;
        }

        let mut active = self.inner.active.lock().await;
        if let Some(previous) = active.take() {
            if self.is_live(&previous) {
                info!(
                    "Cancelling replay session {} for a new session",
                    previous.control.id()
                );
            }
            join_session(previous).await;
        }

        let id = self.inner.next_session.fetch_add(1, Ordering::SeqCst);
        let control = Arc::new(SessionControl::new(id, self.inner.shared.clone()));

        self.inner.shared.status.send_replace(ReplayStatus {
            session: id,
            state: ReplayState::Playing,
        });
        control.emit(PlaybackEvent::Started { session: id });
        info!(
            "Replay session {} started: {} records, repeat {:?}, gated: {}",
            id,
            timeline.len(),
            repeat,
            gate.is_some()
        );

        let handle = tokio::spawn(run_session(
            control.clone(),
            timeline,
            repeat,
            gate,
            self.inner.injector.clone(),
            self.inner.gate_poll_interval,
        ));
        *active = Some(ActiveSession { control, handle });
        true
    }

    /// Pause the running session. False if nothing is playing.
    pub async fn pause(&self) -> bool {
        let active = self.inner.active.lock().await;
        match active.as_ref() {
            Some(session) if self.is_live(session) => {
                session.control.set_user_paused(true)
            }
            _ => {
                debug!("Ignoring pause: no replay session running");
                false
            }
        }
    }

    /// Lift a user pause. The session stays paused while its gate is closed.
    pub async fn resume(&self) -> bool {
        let active = self.inner.active.lock().await;
        match active.as_ref() {
            Some(session) if self.is_live(session) => {
                session.control.set_user_paused(false)
            }
            _ => {
                debug!("Ignoring resume: no replay session running");
                false
            }
        }
    }

    /// Cancel the running session and wait for it to unwind.
    ///
    /// Returns false, without any notification, when already idle.
    pub async fn stop(&self) -> bool {
        let mut active = self.inner.active.lock().await;
        let Some(session) = active.take() else {
            return false;
        };

        let was_running = self.is_live(&session);
        join_session(session).await;
        was_running
    }

    /// The session still owns the status and has not published Idle
    fn is_live(&self, session: &ActiveSession) -> bool {
        let status = self.inner.shared.status.borrow();
        !session.control.is_retired()
            && status.session == session.control.id()
            && status.state != ReplayState::Idle
    }

    pub fn state(&self) -> ReplayState {
        self.inner.shared.status.borrow().state
    }

    /// A session is active (playing or paused)
    pub fn is_playing(&self) -> bool {
        self.state() != ReplayState::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.state() == ReplayState::Paused
    }

    pub fn watch_state(&self) -> watch::Receiver<ReplayStatus> {
        self.inner.shared.status.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.shared.events.subscribe()
    }

    /// Resolve once the engine is idle
    pub async fn finished(&self) {
        let mut status = self.watch_state();
        let _ = status.wait_for(|s| s.state == ReplayState::Idle).await;
    }
}

async fn join_session(session: ActiveSession) {
    session.control.cancel();
    if let Err(e) = session.handle.await {
        error!("Replay session {} task failed: {}", session.control.id(), e);
    }
    // The task normally retired itself; make sure nothing it left behind keeps the engine busy
    session.control.retire();
}

async fn run_session(
    control: Arc<SessionControl>,
    timeline: Arc<Timeline>,
    repeat: RepeatCount,
    gate: Option<TargetGate>,
    injector: InputInjector,
    gate_poll_interval: Duration,
) {
    let _idle = IdleOnExit(control.clone());

    // Cancelled when this function returns, which also stops the gate monitor
    let helpers = control.child_token();
    let _helpers_guard = helpers.clone().drop_guard();

    if let Some(gate) = gate {
        // Decide before the first record instead of waiting for the first poll
        if let Some(open) = evaluate_gate(&gate).await {
            control.set_gate_open(open);
        }
        tokio::spawn(monitor_gate(
            control.clone(),
            gate,
            gate_poll_interval,
            helpers,
        ));
    }

    let reason = match play_passes(&control, &timeline, repeat, &injector).await {
        Ok(()) => StopReason::Completed,
        Err(Cancelled) => StopReason::Cancelled,
    };
    control.finish(reason);
}

async fn play_passes(
    control: &SessionControl,
    timeline: &Timeline,
    repeat: RepeatCount,
    injector: &InputInjector,
) -> Result<(), Cancelled> {
    let mut completed = 0u32;
    loop {
        play_pass(control, timeline, injector, completed).await?;
        completed = completed.saturating_add(1);
        control.emit(PlaybackEvent::Progress {
            session: control.id(),
            completed,
        });

        if repeat.is_exhausted(completed) {
            return Ok(());
        }
        control.sleep(INTER_REPEAT_PAUSE).await?;
    }
}

async fn play_pass(
    control: &SessionControl,
    timeline: &Timeline,
    injector: &InputInjector,
    pass: u32,
) -> Result<(), Cancelled> {
    for ((index, record), wait) in timeline.iter().enumerate().zip(timeline.waits()) {
        control.sleep(wait).await?;
        if record.kind == ActionKind::Delay {
            control.sleep(Duration::from_millis(record.delay_ms)).await?;
        }
        control.wait_until_running().await?;

        if !injector.inject(record).await {
            debug!("Record {} of pass {} was not fully injected", index, pass);
        }
        trace!("Injected {}", record);
        control.emit(PlaybackEvent::RecordInjected {
            session: control.id(),
            pass,
            index,
        });
    }
    Ok(())
}
