//! Synthetic input injection

use std::sync::Arc;
use std::time::Duration;

use rdev::{Button, EventType};
use tracing::warn;

use crate::data::{ActionKind, ActionRecord};
use crate::error::InjectionError;
use crate::input::keycode::key_from_code;

/// Wait between the down and up halves of a [`ActionKind::KeyPress`]
pub const KEY_PRESS_SETTLE: Duration = Duration::from_millis(30);

/// Platform boundary: emits one synthetic OS input event
pub trait InputSink: Send + Sync {
    fn send(&self, event: &EventType) -> Result<(), InjectionError>;
}

/// Injects through `rdev::simulate`
#[derive(Debug, Default, Clone, Copy)]
pub struct RdevSink;

impl InputSink for RdevSink {
    fn send(&self, event: &EventType) -> Result<(), InjectionError> {
        rdev::simulate(event).map_err(|_| InjectionError::Rejected { event: *event })
    }
}

/// Turns action records into synthetic input. Holds no state of its own.
#[derive(Clone)]
pub struct InputInjector {
    sink: Arc<dyn InputSink>,
}

impl InputInjector {
    pub fn new(sink: Arc<dyn InputSink>) -> Self {
        Self { sink }
    }

    /// Inject `record`. Returns false if any OS call was rejected; the
    /// failure is logged and the caller carries on with the next record.
    pub async fn inject(&self, record: &ActionRecord) -> bool {
        let move_to = || EventType::MouseMove {
            x: record.x as f64,
            y: record.y as f64,
        };
        let key = key_from_code(record.code);

        match record.kind {
            ActionKind::KeyDown => self.send(EventType::KeyPress(key)),
            ActionKind::KeyUp => self.send(EventType::KeyRelease(key)),
            ActionKind::KeyPress => {
                let down = self.send(EventType::KeyPress(key));
                tokio::time::sleep(KEY_PRESS_SETTLE).await;
                // Release even if the press was rejected so no key is left held
                let up = self.send(EventType::KeyRelease(key));
                down && up
            }
            ActionKind::MouseLeftDown => self.click(move_to(), EventType::ButtonPress(Button::Left)),
            ActionKind::MouseLeftUp => self.click(move_to(), EventType::ButtonRelease(Button::Left)),
            ActionKind::MouseRightDown => {
                self.click(move_to(), EventType::ButtonPress(Button::Right))
            }
            ActionKind::MouseRightUp => {
                self.click(move_to(), EventType::ButtonRelease(Button::Right))
            }
            ActionKind::MouseMove => self.send(move_to()),
            // Delays are scheduled by the engine
            ActionKind::Delay => true,
        }
    }

    fn click(&self, move_to: EventType, button: EventType) -> bool {
        let moved = self.send(move_to);
        let clicked = self.send(button);
        moved && clicked
    }

    fn send(&self, event: EventType) -> bool {
        match self.sink.send(&event) {
            Ok(()) => true,
            Err(e) => {
                warn!("Injection failed, skipping: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rdev::Key;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Sink that remembers what was injected and when (on tokio's clock)
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub events: Mutex<Vec<(Instant, EventType)>>,
        /// Events matching this are rejected
        pub reject: Option<EventType>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<EventType> {
            self.events.lock().unwrap().iter().map(|(_, e)| *e).collect()
        }

        pub fn times(&self) -> Vec<Instant> {
            self.events.lock().unwrap().iter().map(|(t, _)| *t).collect()
        }
    }

    impl InputSink for RecordingSink {
        fn send(&self, event: &EventType) -> Result<(), InjectionError> {
            if self.reject.as_ref() == Some(event) {
                return Err(InjectionError::Rejected { event: *event });
            }
            self.events.lock().unwrap().push((Instant::now(), *event));
            Ok(())
        }
    }

    fn injector() -> (InputInjector, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (InputInjector::new(sink.clone()), sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_transitions() {
        let (injector, sink) = injector();
        assert!(injector.inject(&ActionRecord::key_down(0x41, 0)).await);
        assert!(injector.inject(&ActionRecord::key_up(0x41, 0)).await);
        assert_eq!(
            sink.events(),
            vec![EventType::KeyPress(Key::KeyA), EventType::KeyRelease(Key::KeyA)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_press_waits_settle_time() {
        let (injector, sink) = injector();
        assert!(injector.inject(&ActionRecord::key_press(0x0D, 0)).await);
        assert_eq!(
            sink.events(),
            vec![EventType::KeyPress(Key::Return), EventType::KeyRelease(Key::Return)]
        );
        let times = sink.times();
        assert_eq!(times[1] - times[0], KEY_PRESS_SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mouse_moves_before_button() {
        let (injector, sink) = injector();
        injector
            .inject(&ActionRecord::mouse_right_down(30, 40, 0))
            .await;
        injector.inject(&ActionRecord::mouse_move(5, 6, 0)).await;
        assert_eq!(
            sink.events(),
            vec![
                EventType::MouseMove { x: 30.0, y: 40.0 },
                EventType::ButtonPress(Button::Right),
                EventType::MouseMove { x: 5.0, y: 6.0 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_injects_nothing() {
        let (injector, sink) = injector();
        let before = Instant::now();
        assert!(injector.inject(&ActionRecord::delay(5000, 0)).await);
        assert!(sink.events().is_empty());
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_press_still_releases() {
        let sink = Arc::new(RecordingSink {
            reject: Some(EventType::KeyPress(Key::KeyC)),
            ..Default::default()
        });
        let injector = InputInjector::new(sink.clone());
        assert!(!injector.inject(&ActionRecord::key_press(0x43, 0)).await);
        assert_eq!(sink.events(), vec![EventType::KeyRelease(Key::KeyC)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_code_is_passed_through() {
        let (injector, sink) = injector();
        injector.inject(&ActionRecord::key_down(0xFE, 0)).await;
        assert_eq!(sink.events(), vec![EventType::KeyPress(Key::Unknown(0xFE))]);
    }
}
