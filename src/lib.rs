//! macroreel
//!
//! Records keyboard and mouse-button input into timelines and replays them
//! through synthetic OS input with their original cadence.

pub mod capture;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod input;
pub mod logging;
pub mod replay;
pub mod target;

pub use controller::Controller;
