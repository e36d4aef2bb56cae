//! HTTP request handlers.

pub mod artifacts;
pub mod builds;
pub mod status;

pub use artifacts::*;
pub use builds::*;
pub use status::*;
