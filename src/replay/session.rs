//! Replay session token
//!
//! A [`SessionControl`] is the only handle through which a running session is
//! paused, resumed or cancelled. The engine owns at most one; replacing it
//! cancels the previous holder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{PauseReason, PlaybackEvent, ReplayState, SessionId, StopReason, TargetGate};

/// Engine state tagged with the session it belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStatus {
    pub session: SessionId,
    pub state: ReplayState,
}

/// Channels shared by the engine and all of its sessions
#[derive(Debug)]
pub(crate) struct Shared {
    pub status: watch::Sender<ReplayStatus>,
    pub events: broadcast::Sender<PlaybackEvent>,
}

/// Returned by suspension points when the session was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cancelled;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PauseFlags {
    user: bool,
    gate_closed: bool,
}

impl PauseFlags {
    fn paused(self) -> bool {
        self.user || self.gate_closed
    }

    fn reason(self) -> PauseReason {
        if self.user {
            PauseReason::User
        } else {
            PauseReason::TargetInactive
        }
    }
}

enum Transition {
    Paused(PauseReason),
    Resumed,
}

#[derive(Debug)]
pub(crate) struct SessionControl {
    id: SessionId,
    cancel: CancellationToken,
    flags: watch::Sender<PauseFlags>,
    /// Set once the session published Idle; it never leaves Idle again
    retired: AtomicBool,
    shared: Arc<Shared>,
}

impl SessionControl {
    pub fn new(id: SessionId, shared: Arc<Shared>) -> Self {
        let (flags, _) = watch::channel(PauseFlags::default());
        Self {
            id,
            cancel: CancellationToken::new(),
            flags,
            retired: AtomicBool::new(false),
            shared,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token cancelled together with this session, for helper tasks
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine
        let _ = self.shared.events.send(event);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    /// Publish `state` (and `event` with it) unless a newer session owns the
    /// status or this one is retired.
    ///
    /// Both happen under the status lock, so a late pause or gate flip can
    /// neither overwrite Idle nor be announced after `Stopped`.
    fn publish(&self, state: ReplayState, event: Option<PlaybackEvent>) -> bool {
        let mut event = event;
        self.shared.status.send_if_modified(|status| {
            if state == ReplayState::Idle {
                // The first retirement announces the end even if the status moved on
                if !self.retired.swap(true, Ordering::SeqCst) {
                    if let Some(event) = event.take() {
                        self.emit(event);
                    }
                }
            } else if self.is_retired() {
                return false;
            }

            if status.session != self.id || status.state == state {
                return false;
            }
            status.state = state;
            if let Some(event) = event.take() {
                self.emit(event);
            }
            true
        })
    }

    /// Publish Idle without an event; later flag changes are ignored
    pub fn retire(&self) {
        self.publish(ReplayState::Idle, None);
    }

    pub fn set_user_paused(&self, paused: bool) -> bool {
        self.update(|flags| flags.user = paused)
    }

    pub fn set_gate_open(&self, open: bool) -> bool {
        self.update(|flags| flags.gate_closed = !open)
    }

    /// Apply a flag change; publishes Paused/Resumed when the effective state flips
    fn update(&self, change: impl FnOnce(&mut PauseFlags)) -> bool {
        if self.is_cancelled() || self.is_retired() {
            return false;
        }

        let mut transition = None;
        let changed = self.flags.send_if_modified(|flags| {
            let before = *flags;
            change(flags);
            if before.paused() != flags.paused() {
                transition = Some(if flags.paused() {
                    Transition::Paused(flags.reason())
                } else {
                    Transition::Resumed
                });
            }
            before != *flags
        });

        match transition {
            Some(Transition::Paused(reason)) => {
                let event = PlaybackEvent::Paused {
                    session: self.id,
                    reason,
                };
                if self.publish(ReplayState::Paused, Some(event)) {
                    info!("Replay session {} paused ({:?})", self.id, reason);
                }
            }
            Some(Transition::Resumed) => {
                let event = PlaybackEvent::Resumed { session: self.id };
                if self.publish(ReplayState::Playing, Some(event)) {
                    info!("Replay session {} resumed", self.id);
                }
            }
            None => {}
        }

        changed && !self.is_retired()
    }

    /// Cancellable sleep
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        if duration.is_zero() {
            return if self.is_cancelled() { Err(Cancelled) } else { Ok(()) };
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Resolve once the session is neither user-paused nor gated
    pub async fn wait_until_running(&self) -> Result<(), Cancelled> {
        let mut flags = self.flags.subscribe();
        loop {
            if self.is_cancelled() {
                return Err(Cancelled);
            }
            if !flags.borrow_and_update().paused() {
                return Ok(());
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Cancelled),
                changed = flags.changed() => {
                    if changed.is_err() {
                        return Err(Cancelled);
                    }
                }
            }
        }
    }

    /// Publish the end of the session
    pub fn finish(&self, reason: StopReason) {
        match reason {
            StopReason::Completed => info!("Replay session {} completed", self.id),
            StopReason::Cancelled => info!("Replay session {} cancelled", self.id),
        }
        self.publish(
            ReplayState::Idle,
            Some(PlaybackEvent::Stopped {
                session: self.id,
                reason,
            }),
        );
    }
}

/// Publishes Idle for the session when dropped, so a panicking session task
/// cannot leave the engine looking busy.
pub(crate) struct IdleOnExit(pub Arc<SessionControl>);

impl Drop for IdleOnExit {
    fn drop(&mut self) {
        self.0.retire();
    }
}

/// Run `gate` on the blocking pool; gates may shell out or call into the OS.
/// `None` if the predicate panicked.
pub(crate) async fn evaluate_gate(gate: &TargetGate) -> Option<bool> {
    let gate = gate.clone();
    match tokio::task::spawn_blocking(move || gate()).await {
        Ok(open) => Some(open),
        Err(e) => {
            warn!("Target gate check failed: {}", e);
            None
        }
    }
}

/// Poll `gate` until `token` is cancelled, pausing the session while it is false
pub(crate) async fn monitor_gate(
    control: Arc<SessionControl>,
    gate: TargetGate,
    period: Duration,
    token: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                if let Some(open) = evaluate_gate(&gate).await {
                    control.set_gate_open(open);
                }
            }
        }
    }

    debug!("Gate monitor for replay session {} stopped", control.id());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(session: SessionId) -> Arc<Shared> {
        let (status, _) = watch::channel(ReplayStatus {
            session,
            state: ReplayState::Playing,
        });
        let (events, _) = broadcast::channel(16);
        Arc::new(Shared { status, events })
    }

    #[test]
    fn test_flag_changes_after_finish_are_ignored() {
        let shared = shared(7);
        let mut events = shared.events.subscribe();
        let control = SessionControl::new(7, shared.clone());

        control.finish(StopReason::Completed);
        assert!(!control.set_user_paused(true));
        assert!(!control.set_gate_open(false));

        assert_eq!(shared.status.borrow().state, ReplayState::Idle);
        assert_eq!(
            events.try_recv().unwrap(),
            PlaybackEvent::Stopped {
                session: 7,
                reason: StopReason::Completed
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_stopped_is_announced_once() {
        let shared = shared(3);
        let mut events = shared.events.subscribe();
        let control = Arc::new(SessionControl::new(3, shared.clone()));

        let guard = IdleOnExit(control.clone());
        control.finish(StopReason::Cancelled);
        drop(guard);
        control.retire();

        assert!(matches!(
            events.try_recv(),
            Ok(PlaybackEvent::Stopped { session: 3, .. })
        ));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_pause_is_announced_with_state() {
        let shared = shared(1);
        let mut events = shared.events.subscribe();
        let control = SessionControl::new(1, shared.clone());

        assert!(control.set_gate_open(false));
        assert!(control.set_user_paused(true));
        assert_eq!(shared.status.borrow().state, ReplayState::Paused);

        // Gate reopening keeps the user pause
        assert!(control.set_gate_open(true));
        assert_eq!(shared.status.borrow().state, ReplayState::Paused);
        assert!(control.set_user_paused(false));
        assert_eq!(shared.status.borrow().state, ReplayState::Playing);

        assert_eq!(
            events.try_recv().unwrap(),
            PlaybackEvent::Paused {
                session: 1,
                reason: PauseReason::TargetInactive
            }
        );
        assert_eq!(events.try_recv().unwrap(), PlaybackEvent::Resumed { session: 1 });
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_stale_session_leaves_newer_status_alone() {
        let shared = shared(2);
        let stale = SessionControl::new(1, shared.clone());

        stale.set_user_paused(true);
        stale.finish(StopReason::Cancelled);
        assert_eq!(
            *shared.status.borrow(),
            ReplayStatus {
                session: 2,
                state: ReplayState::Playing
            }
        );
    }
}
