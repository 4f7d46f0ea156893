//! Recording sessions on top of an input backend

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::data::{ActionRecord, Timeline};
use crate::error::CaptureError;
use crate::input::{create_input_backend, InputBackend};

use super::CaptureSink;

/// Records keyboard and mouse-button input into a [`Timeline`]
pub struct EventCapture {
    backend: Box<dyn InputBackend>,
    sink: Arc<CaptureSink>,
}

impl EventCapture {
    pub fn new(backend: Box<dyn InputBackend>) -> Self {
        Self {
            backend,
            sink: Arc::new(CaptureSink::new()),
        }
    }

    /// Capture through the platform's default backend
    pub fn with_default_backend() -> Self {
        Self::new(create_input_backend())
    }

    /// Start a recording session.
    ///
    /// No-op when already recording. Otherwise installs the hook if needed,
    /// then resets the timeline and restarts the clock at zero.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.sink.is_armed() {
            debug!("Input capture already running");
            return Ok(());
        }

        if self.backend.is_installed() {
            debug!("Reusing installed input hook");
        } else if let Err(e) = self.backend.install(self.sink.clone()) {
            warn!("Input capture unavailable: {}", e);
            return Err(e);
        }

        self.sink.arm();
        info!("Input capture started");
        Ok(())
    }

    /// Stop the session. The collected timeline is kept.
    pub fn stop(&mut self) {
        if !self.sink.is_armed() {
            return;
        }

        self.sink.disarm();
        info!("Input capture stopped ({} records)", self.sink.timeline().len());
    }

    pub fn is_recording(&self) -> bool {
        self.sink.is_armed()
    }

    /// Copy of the records collected so far
    pub fn timeline(&self) -> Timeline {
        self.sink.timeline()
    }

    /// Move the collected records out, leaving an empty timeline
    pub fn take_timeline(&mut self) -> Timeline {
        self.sink.take_timeline()
    }

    /// Subscribe to "record captured" notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ActionRecord> {
        self.sink.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ActionKind;
    use rdev::{Button, EventType, Key};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Backend that hands the sink to the test instead of hooking the OS
    #[derive(Default)]
    struct ScriptedBackend {
        refuse: bool,
        installs: Arc<Mutex<u32>>,
        sink: Arc<Mutex<Option<Arc<CaptureSink>>>>,
    }

    impl InputBackend for ScriptedBackend {
        fn install(&mut self, sink: Arc<CaptureSink>) -> Result<(), CaptureError> {
            if self.refuse {
                return Err(CaptureError::Unavailable("access denied".into()));
            }
            *self.installs.lock().unwrap() += 1;
            *self.sink.lock().unwrap() = Some(sink);
            Ok(())
        }

        fn is_installed(&self) -> bool {
            self.sink.lock().unwrap().is_some()
        }
    }

    fn capture() -> (EventCapture, Arc<Mutex<Option<Arc<CaptureSink>>>>) {
        let backend = ScriptedBackend::default();
        let sink = backend.sink.clone();
        (EventCapture::new(Box::new(backend)), sink)
    }

    /// Deliver events from a separate thread, as the OS hook would
    fn hook(sink: &Arc<Mutex<Option<Arc<CaptureSink>>>>, events: Vec<EventType>) {
        let sink = sink.lock().unwrap().clone().expect("hook installed");
        std::thread::spawn(move || {
            for event in events {
                sink.handle(&event);
            }
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_keys_become_down_and_up_records() {
        let (mut capture, sink) = capture();
        capture.start().unwrap();
        hook(
            &sink,
            vec![EventType::KeyPress(Key::KeyA), EventType::KeyRelease(Key::KeyA)],
        );
        capture.stop();

        let records: Vec<_> = capture.timeline().into_iter().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, ActionKind::KeyDown);
        assert_eq!(records[0].code, 65);
        assert_eq!(records[1].kind, ActionKind::KeyUp);
        assert_eq!((records[1].x, records[1].y), (0, 0));
    }

    #[test]
    fn test_buttons_use_last_pointer_position_and_moves_are_not_recorded() {
        let (mut capture, sink) = capture();
        capture.start().unwrap();
        hook(
            &sink,
            vec![
                EventType::MouseMove { x: 100.0, y: 200.0 },
                EventType::ButtonPress(Button::Left),
                EventType::MouseMove { x: 150.4, y: 220.9 },
                EventType::ButtonRelease(Button::Left),
                EventType::ButtonPress(Button::Right),
                EventType::ButtonRelease(Button::Right),
                EventType::ButtonPress(Button::Middle),
                EventType::Wheel {
                    delta_x: 0,
                    delta_y: 1,
                },
            ],
        );

        let records: Vec<_> = capture.timeline().into_iter().collect();
        let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::MouseLeftDown,
                ActionKind::MouseLeftUp,
                ActionKind::MouseRightDown,
                ActionKind::MouseRightUp,
            ]
        );
        assert_eq!((records[0].x, records[0].y), (100, 200));
        assert_eq!((records[1].x, records[1].y), (150, 220));
    }

    #[test]
    fn test_timestamps_are_non_decreasing() {
        let (mut capture, sink) = capture();
        capture.start().unwrap();
        let shared = sink.lock().unwrap().clone().unwrap();
        let writer = std::thread::spawn(move || {
            for i in 0..200 {
                let key = if i % 2 == 0 { Key::KeyQ } else { Key::KeyW };
                shared.handle(&EventType::KeyPress(key));
                if i % 25 == 0 {
                    std::thread::sleep(Duration::from_millis(3));
                }
            }
        });
        writer.join().unwrap();

        let timeline = capture.timeline();
        assert_eq!(timeline.len(), 200);
        let stamps: Vec<u64> = timeline.iter().map(|r| r.timestamp_ms).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(timeline.duration_ms() >= 3 * 7);
    }

    #[test]
    fn test_start_is_idempotent_and_restart_resets() {
        let (mut capture, sink) = capture();
        capture.start().unwrap();
        hook(&sink, vec![EventType::KeyPress(Key::Space)]);
        capture.start().unwrap();
        assert_eq!(capture.timeline().len(), 1, "repeat start must not reset");

        capture.stop();
        capture.stop();
        assert!(!capture.is_recording());
        assert_eq!(capture.timeline().len(), 1, "stop keeps the timeline");

        hook(&sink, vec![EventType::KeyPress(Key::Tab)]);
        assert_eq!(capture.timeline().len(), 1, "events after stop are ignored");

        capture.start().unwrap();
        assert!(capture.timeline().is_empty());
    }

    #[test]
    fn test_restart_reuses_installed_hook() {
        let backend = ScriptedBackend::default();
        let installs = backend.installs.clone();
        let mut capture = EventCapture::new(Box::new(backend));

        capture.start().unwrap();
        capture.stop();
        capture.start().unwrap();
        assert!(capture.is_recording());
        assert_eq!(*installs.lock().unwrap(), 1);
    }

    #[test]
    fn test_unavailable_backend_is_reported() {
        let backend = ScriptedBackend {
            refuse: true,
            ..Default::default()
        };
        let mut capture = EventCapture::new(Box::new(backend));
        assert_eq!(
            capture.start(),
            Err(CaptureError::Unavailable("access denied".into()))
        );
        assert!(!capture.is_recording());
    }

    #[test]
    fn test_subscribers_receive_each_record() {
        let (mut capture, sink) = capture();
        let mut records = capture.subscribe();
        capture.start().unwrap();
        hook(
            &sink,
            vec![EventType::KeyPress(Key::KeyZ), EventType::KeyRelease(Key::KeyZ)],
        );

        let first = records.try_recv().unwrap();
        let second = records.try_recv().unwrap();
        assert_eq!(first.kind, ActionKind::KeyDown);
        assert_eq!(second.kind, ActionKind::KeyUp);
        assert_eq!(first.code, 0x5A);
        assert!(records.try_recv().is_err());
    }

    #[test]
    fn test_take_timeline_leaves_empty() {
        let (mut capture, sink) = capture();
        capture.start().unwrap();
        hook(&sink, vec![EventType::KeyPress(Key::KeyB)]);
        capture.stop();

        assert_eq!(capture.take_timeline().len(), 1);
        assert!(capture.timeline().is_empty());
    }
}
