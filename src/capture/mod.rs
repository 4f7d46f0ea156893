//! Event capture
//!
//! Installs process-wide input interception and turns keyboard and
//! mouse-button notifications into [`ActionRecord`](crate::data::ActionRecord)s
//! stamped relative to the start of the recording.
//!
//! Mouse moves are deliberately not recorded to bound event volume; the hook
//! only uses them to know where the pointer was when a button changed.

mod event_capture;
mod sink;

pub use event_capture::EventCapture;
pub use sink::CaptureSink;
