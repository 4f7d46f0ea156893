//! Data structures and serialization for recorded macros

mod format;
mod record;
mod timeline;

pub use format::*;
pub use record::*;
pub use timeline::*;
