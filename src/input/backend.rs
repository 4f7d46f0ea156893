//! Input interception backend trait

use std::sync::Arc;

use crate::capture::CaptureSink;
use crate::error::CaptureError;

/// A process-wide input hook feeding a [`CaptureSink`]
pub trait InputBackend: Send + Sync {
    /// Install the hook if it is not installed yet.
    ///
    /// Raw events are delivered to `sink` from the hook's own thread. Calling
    /// this again while the hook is alive is a no-op.
    fn install(&mut self, sink: Arc<CaptureSink>) -> Result<(), CaptureError>;

    /// Whether the hook is currently delivering events
    fn is_installed(&self) -> bool;
}

/// Create the input backend for the current platform
pub fn create_input_backend() -> Box<dyn InputBackend> {
    tracing::info!("Using rdev backend for input capture");
    Box::new(super::rdev_backend::RdevBackend::new())
}
