//! Hook-side half of event capture
//!
//! [`CaptureSink::handle`] runs on the hook thread for every raw OS event. It
//! only tracks the pointer, timestamps, appends and broadcasts; anything slower
//! belongs to the subscribers.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rdev::{Button, EventType};
use tokio::sync::broadcast;
use tracing::trace;

use crate::data::{ActionKind, ActionRecord, Timeline};
use crate::input::keycode::virtual_code;
use crate::input::pointer::pointer_position;

/// Capacity of the "record captured" broadcast ring
const RECORD_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug)]
struct Session {
    armed: bool,
    /// Timestamp origin of the current recording
    started_at: Instant,
    timeline: Timeline,
}

/// Where the pointer is right now, queried when a recording starts
pub type PointerSource = Arc<dyn Fn() -> Option<(i32, i32)> + Send + Sync>;

/// State shared between the hook thread and [`super::EventCapture`]
pub struct CaptureSink {
    session: Mutex<Session>,
    /// Last pointer position seen by the hook, used for button records
    cursor_x: AtomicI32,
    cursor_y: AtomicI32,
    pointer: PointerSource,
    records_tx: broadcast::Sender<ActionRecord>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::with_pointer_source(Arc::new(pointer_position))
    }

    pub fn with_pointer_source(pointer: PointerSource) -> Self {
        let (records_tx, _) = broadcast::channel(RECORD_CHANNEL_CAPACITY);
        Self {
            session: Mutex::new(Session {
                armed: false,
                started_at: Instant::now(),
                timeline: Timeline::new(),
            }),
            cursor_x: AtomicI32::new(0),
            cursor_y: AtomicI32::new(0),
            pointer,
            records_tx,
        }
    }

    /// Handle one raw event from the hook thread
    pub fn handle(&self, event: &EventType) {
        if let EventType::MouseMove { x, y } = *event {
            self.cursor_x.store(x as i32, Ordering::Relaxed);
            self.cursor_y.store(y as i32, Ordering::Relaxed);
            return;
        }

        let Some((kind, code)) = classify(event) else {
            return;
        };

        let Ok(mut session) = self.session.lock() else {
            return;
        };
        if !session.armed {
            return;
        }

        // Read the clock under the lock so append order and timestamp order agree
        let timestamp_ms = session.started_at.elapsed().as_millis() as u64;
        let record = ActionRecord {
            kind,
            code,
            x: if kind.is_mouse() { self.cursor_x.load(Ordering::Relaxed) } else { 0 },
            y: if kind.is_mouse() { self.cursor_y.load(Ordering::Relaxed) } else { 0 },
            delay_ms: 0,
            timestamp_ms,
        };
        session.timeline.push(record);
        drop(session);

        // No receivers is fine
        let _ = self.records_tx.send(record);
        trace!("Captured {}", record);
    }

    /// Start a new recording: empty timeline, clock at zero, pointer seeded
    /// from the OS so a click before any move lands where the pointer is
    pub(crate) fn arm(&self) {
        match (self.pointer)() {
            Some((x, y)) => {
                self.cursor_x.store(x, Ordering::Relaxed);
                self.cursor_y.store(y, Ordering::Relaxed);
            }
            None => trace!("Pointer position unavailable, keeping last known"),
        }

        if let Ok(mut session) = self.session.lock() {
            session.timeline.clear();
            session.started_at = Instant::now();
            session.armed = true;
        }
    }

    pub(crate) fn disarm(&self) {
        if let Ok(mut session) = self.session.lock() {
            session.armed = false;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.session.lock().map(|s| s.armed).unwrap_or(false)
    }

    pub fn timeline(&self) -> Timeline {
        self.session
            .lock()
            .map(|s| s.timeline.clone())
            .unwrap_or_default()
    }

    pub(crate) fn take_timeline(&self) -> Timeline {
        self.session
            .lock()
            .map(|mut s| std::mem::take(&mut s.timeline))
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActionRecord> {
        self.records_tx.subscribe()
    }
}

impl std::fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSink")
            .field("session", &self.session)
            .field("cursor_x", &self.cursor_x)
            .field("cursor_y", &self.cursor_y)
            .finish_non_exhaustive()
    }
}

impl Default for CaptureSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Record kind and key code for events that are recorded at all
fn classify(event: &EventType) -> Option<(ActionKind, u32)> {
    match *event {
        EventType::KeyPress(key) => match virtual_code(key) {
            Some(code) => Some((ActionKind::KeyDown, code)),
            None => {
                trace!("Skipping key without virtual code: {:?}", key);
                None
            }
        },
        EventType::KeyRelease(key) => virtual_code(key).map(|code| (ActionKind::KeyUp, code)),
        EventType::ButtonPress(Button::Left) => Some((ActionKind::MouseLeftDown, 0)),
        EventType::ButtonRelease(Button::Left) => Some((ActionKind::MouseLeftUp, 0)),
        EventType::ButtonPress(Button::Right) => Some((ActionKind::MouseRightDown, 0)),
        EventType::ButtonRelease(Button::Right) => Some((ActionKind::MouseRightUp, 0)),
        // Mouse moves only update the tracked position; wheel and other buttons are not recorded
        _ => None,
    }
}
