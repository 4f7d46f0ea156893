//! Replay engine - reproduces a timeline through synthetic input

mod engine;
mod injector;
mod session;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use engine::{ReplayEngine, DEFAULT_GATE_POLL_INTERVAL, INTER_REPEAT_PAUSE};
pub use injector::{InputInjector, InputSink, RdevSink, KEY_PRESS_SETTLE};
pub use session::ReplayStatus;

/// Identifier of one replay session
pub type SessionId = u64;

/// "Is the replay target active" predicate, polled while a session runs.
///
/// Must return quickly; it is called from the async runtime.
pub type TargetGate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Engine state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplayState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// How many passes to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum RepeatCount {
    /// Exactly this many passes (at least one)
    Times(u32),
    /// Until stopped
    Forever,
}

impl RepeatCount {
    pub const ONCE: Self = Self::Times(1);

    /// Whether `completed` passes finish the session
    pub fn is_exhausted(self, completed: u32) -> bool {
        match self {
            Self::Times(n) => completed >= n.max(1),
            Self::Forever => false,
        }
    }
}

impl Default for RepeatCount {
    fn default() -> Self {
        Self::ONCE
    }
}

/// Boundary encoding: 0 means forever
impl From<u32> for RepeatCount {
    fn from(count: u32) -> Self {
        match count {
            0 => Self::Forever,
            n => Self::Times(n),
        }
    }
}

impl From<RepeatCount> for u32 {
    fn from(count: RepeatCount) -> Self {
        match count {
            RepeatCount::Times(n) => n,
            RepeatCount::Forever => 0,
        }
    }
}

/// Why a session is paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Explicit `pause()`
    User,
    /// The target gate reported the target inactive
    TargetInactive,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// All passes played
    Completed,
    /// `stop()` or a newer session took over. Not an error.
    Cancelled,
}

/// Notifications broadcast by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started { session: SessionId },
    Paused { session: SessionId, reason: PauseReason },
    Resumed { session: SessionId },
    Stopped { session: SessionId, reason: StopReason },
    /// A pass finished; `completed` counts finished passes
    Progress { session: SessionId, completed: u32 },
    /// Record `index` of pass `pass` (0-based) was handed to the injector
    RecordInjected {
        session: SessionId,
        pass: u32,
        index: usize,
    },
}

impl PlaybackEvent {
    pub fn session(&self) -> SessionId {
        match *self {
            Self::Started { session }
            | Self::Paused { session, .. }
            | Self::Resumed { session }
            | Self::Stopped { session, .. }
            | Self::Progress { session, .. }
            | Self::RecordInjected { session, .. } => session,
        }
    }
}
