//! Input interception backends, key code mapping and pointer queries

mod backend;
pub mod keycode;
pub mod pointer;
pub(crate) mod rdev_backend;

pub use backend::*;
