//! Common test utilities and fixtures.
//!
//! Each test file compiles `common/` separately and uses a different subset.

#![allow(dead_code)]

pub mod fixtures;
pub mod server;
pub mod sources;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use server::*;
#[allow(unused_imports)]
pub use sources::*;
