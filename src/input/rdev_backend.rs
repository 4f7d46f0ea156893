//! rdev-based input interception backend
//! Works on Windows, macOS, and Linux (X11)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use crate::capture::CaptureSink;
use crate::error::CaptureError;
use crate::input::InputBackend;

/// How long `install` waits for `rdev::listen` to fail before assuming the hook is live.
/// rdev reports permission and display errors right away; success never returns.
const INSTALL_GRACE: Duration = Duration::from_millis(150);

/// rdev-based input hook.
///
/// rdev has no way to unhook, so once installed the listener thread lives for
/// the rest of the process and the sink decides whether events are recorded.
pub struct RdevBackend {
    /// Cleared by the listener thread when `rdev::listen` returns
    hook_alive: Arc<AtomicBool>,
}

impl RdevBackend {
    pub fn new() -> Self {
        Self {
            hook_alive: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for RdevBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBackend for RdevBackend {
    fn install(&mut self, sink: Arc<CaptureSink>) -> Result<(), CaptureError> {
        if self.hook_alive.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.hook_alive.store(true, Ordering::SeqCst);
        let hook_alive = self.hook_alive.clone();
        let (failure_tx, failure_rx) = mpsc::channel::<String>();

        let spawned = thread::Builder::new()
            .name("macroreel-input-hook".into())
            .spawn(move || {
                info!("rdev input hook started");

                // Runs inside the OS hook: no blocking, no logging above trace.
                let callback = move |event: rdev::Event| sink.handle(&event.event_type);

                if let Err(e) = rdev::listen(callback) {
                    error!("rdev listen error: {:?}", e);
                    let _ = failure_tx.send(format!("{:?}", e));
                }

                hook_alive.store(false, Ordering::SeqCst);
                info!("rdev input hook stopped");
            });

        if let Err(e) = spawned {
            self.hook_alive.store(false, Ordering::SeqCst);
            return Err(CaptureError::Unavailable(format!(
                "failed to spawn input hook thread: {}",
                e
            )));
        }

        match failure_rx.recv_timeout(INSTALL_GRACE) {
            Err(RecvTimeoutError::Timeout) => Ok(()),
            Ok(reason) => Err(CaptureError::Unavailable(reason)),
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::Unavailable(
                "input hook thread exited during install".to_string(),
            )),
        }
    }

    fn is_installed(&self) -> bool {
        self.hook_alive.load(Ordering::SeqCst)
    }
}
