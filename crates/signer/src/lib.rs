//! Signed access tokens for depot.
//!
//! This crate provides:
//! - Secret salt management
//! - HMAC signing of (method, path) pairs into self-verifying URLs
//! - Path tokens for the path-scoped request gate
//!
//! Nothing issued here is persisted. Rotating the salt revokes every
//! outstanding URL and token at once.

pub mod error;
pub mod key;
pub mod signer;

pub use error::{SignerError, SignerResult};
pub use key::Salt;
pub use signer::{SIGNATURE_PARAM, UrlSigner};
