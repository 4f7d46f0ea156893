//! Error types of the capture and replay core

use thiserror::Error;

/// Input interception could not be installed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// The OS refused the hook (missing permission, no display server, ...)
    #[error("input interception unavailable: {0}")]
    Unavailable(String),
}

/// A single synthetic input call was rejected by the OS
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InjectionError {
    #[error("failed to simulate {event:?}")]
    Rejected { event: rdev::EventType },
}
