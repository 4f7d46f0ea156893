//! Action record data structures

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::input::keycode::key_from_code;

/// Kind of a recorded or authored action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    KeyDown,
    KeyUp,
    /// Down, settle wait, up. Never produced by capture, only by authoring.
    KeyPress,
    MouseLeftDown,
    MouseLeftUp,
    MouseRightDown,
    MouseRightUp,
    MouseMove,
    /// Explicit pause of `delay_ms`.
    ///
    /// Replay first waits out the gap to this record's timestamp like any
    /// other record, then waits `delay_ms` on top of it. A delay inserted
    /// with the same timestamp as its predecessor therefore waits exactly
    /// `delay_ms`.
    Delay,
}

impl ActionKind {
    pub fn is_key(self) -> bool {
        matches!(self, Self::KeyDown | Self::KeyUp | Self::KeyPress)
    }

    pub fn is_mouse(self) -> bool {
        matches!(
            self,
            Self::MouseLeftDown
                | Self::MouseLeftUp
                | Self::MouseRightDown
                | Self::MouseRightUp
                | Self::MouseMove
        )
    }
}

/// One captured or authored input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub kind: ActionKind,

    /// Virtual key code (key kinds only)
    #[serde(default)]
    pub code: u32,

    /// Absolute screen X coordinate (mouse kinds only)
    #[serde(default)]
    pub x: i32,

    /// Absolute screen Y coordinate (mouse kinds only)
    #[serde(default)]
    pub y: i32,

    /// Explicit wait, only meaningful for [`ActionKind::Delay`]
    #[serde(default)]
    pub delay_ms: u64,

    /// Milliseconds since the recording session started
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl ActionRecord {
    fn new(kind: ActionKind, timestamp_ms: u64) -> Self {
        Self {
            kind,
            code: 0,
            x: 0,
            y: 0,
            delay_ms: 0,
            timestamp_ms,
        }
    }

    fn with_code(kind: ActionKind, code: u32, timestamp_ms: u64) -> Self {
        Self {
            code,
            ..Self::new(kind, timestamp_ms)
        }
    }

    fn with_position(kind: ActionKind, x: i32, y: i32, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            ..Self::new(kind, timestamp_ms)
        }
    }

    pub fn key_down(code: u32, timestamp_ms: u64) -> Self {
        Self::with_code(ActionKind::KeyDown, code, timestamp_ms)
    }

    pub fn key_up(code: u32, timestamp_ms: u64) -> Self {
        Self::with_code(ActionKind::KeyUp, code, timestamp_ms)
    }

    pub fn key_press(code: u32, timestamp_ms: u64) -> Self {
        Self::with_code(ActionKind::KeyPress, code, timestamp_ms)
    }

    pub fn mouse_left_down(x: i32, y: i32, timestamp_ms: u64) -> Self {
        Self::with_position(ActionKind::MouseLeftDown, x, y, timestamp_ms)
    }

    pub fn mouse_left_up(x: i32, y: i32, timestamp_ms: u64) -> Self {
        Self::with_position(ActionKind::MouseLeftUp, x, y, timestamp_ms)
    }

    pub fn mouse_right_down(x: i32, y: i32, timestamp_ms: u64) -> Self {
        Self::with_position(ActionKind::MouseRightDown, x, y, timestamp_ms)
    }

    pub fn mouse_right_up(x: i32, y: i32, timestamp_ms: u64) -> Self {
        Self::with_position(ActionKind::MouseRightUp, x, y, timestamp_ms)
    }

    pub fn mouse_move(x: i32, y: i32, timestamp_ms: u64) -> Self {
        Self::with_position(ActionKind::MouseMove, x, y, timestamp_ms)
    }

    pub fn delay(delay_ms: u64, timestamp_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::new(ActionKind::Delay, timestamp_ms)
        }
    }
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = || format!("{:?} ({})", key_from_code(self.code), self.code);
        match self.kind {
            ActionKind::KeyDown => write!(f, "Key down {}", key())?,
            ActionKind::KeyUp => write!(f, "Key up {}", key())?,
            ActionKind::KeyPress => write!(f, "Press {}", key())?,
            ActionKind::MouseLeftDown => write!(f, "Left down at ({}, {})", self.x, self.y)?,
            ActionKind::MouseLeftUp => write!(f, "Left up at ({}, {})", self.x, self.y)?,
            ActionKind::MouseRightDown => write!(f, "Right down at ({}, {})", self.x, self.y)?,
            ActionKind::MouseRightUp => write!(f, "Right up at ({}, {})", self.x, self.y)?,
            ActionKind::MouseMove => write!(f, "Move to ({}, {})", self.x, self.y)?,
            ActionKind::Delay => write!(f, "Wait {}ms", self.delay_ms)?,
        }
        write!(f, " @ {}ms", self.timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_default_to_zero() {
        let record: ActionRecord =
            serde_json::from_str(r#"{"kind":"KeyDown","code":65,"timestampMs":12}"#).unwrap();
        assert_eq!(record, ActionRecord::key_down(65, 12));
        assert_eq!(record.x, 0);
        assert_eq!(record.delay_ms, 0);
    }

    #[test]
    fn test_field_names_on_the_wire() {
        let json = serde_json::to_value(ActionRecord::delay(250, 40)).unwrap();
        assert_eq!(json["kind"], "Delay");
        assert_eq!(json["delayMs"], 250);
        assert_eq!(json["timestampMs"], 40);
        assert_eq!(json["x"], 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ActionRecord::key_press(65, 120).to_string(),
            "Press KeyA (65) @ 120ms"
        );
        assert_eq!(
            ActionRecord::mouse_left_down(10, 20, 5).to_string(),
            "Left down at (10, 20) @ 5ms"
        );
        assert_eq!(ActionRecord::delay(300, 40).to_string(), "Wait 300ms @ 40ms");
    }

    #[test]
    fn test_kind_groups() {
        assert!(ActionKind::KeyPress.is_key());
        assert!(!ActionKind::KeyPress.is_mouse());
        assert!(ActionKind::MouseMove.is_mouse());
        assert!(!ActionKind::Delay.is_key() && !ActionKind::Delay.is_mouse());
    }
}
