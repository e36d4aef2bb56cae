//! URL and path-token signing.
//!
//! A signature is `hex(HMAC-SHA256(salt, canonical))`. For URLs the
//! canonical string is `"{METHOD}\n{path}"` with the query string removed;
//! for path tokens it is the bare sub-path. Nothing about issued signatures
//! is stored: verification recomputes and compares.

use crate::key::Salt;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Query parameter carrying a URL signature.
pub const SIGNATURE_PARAM: &str = "signature";

/// Issues and verifies signed URLs and path tokens.
#[derive(Clone, Debug)]
pub struct UrlSigner {
    salt: Salt,
}

impl UrlSigner {
    /// Create a signer keyed by `salt`.
    pub fn new(salt: Salt) -> Self {
        Self { salt }
    }

    /// Signature for a request method and path.
    pub fn sign(&self, method: &str, path: &str) -> String {
        hex::encode(self.mac(&canonical_request(method, path)).finalize().into_bytes())
    }

    /// Path with the signature appended as a query parameter.
    pub fn sign_path(&self, method: &str, path: &str) -> String {
        let path = strip_query(path);
        format!("{path}?{SIGNATURE_PARAM}={}", self.sign(method, path))
    }

    /// Check a provided URL signature.
    ///
    /// Returns `false` for any mismatch, including malformed input; callers
    /// must not distinguish the cases.
    pub fn verify(&self, method: &str, path: &str, signature: &str) -> bool {
        self.verify_hex(&canonical_request(method, path), signature)
    }

    /// Token for the path-scoped gate.
    pub fn path_token(&self, rest: &str) -> String {
        hex::encode(self.mac(rest).finalize().into_bytes())
    }

    /// Check a path token against the remainder of the path it guards.
    pub fn verify_path_token(&self, rest: &str, token: &str) -> bool {
        self.verify_hex(rest, token)
    }

    fn mac(&self, message: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.salt.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(message.as_bytes());
        mac
    }

    fn verify_hex(&self, message: &str, provided: &str) -> bool {
        let Ok(provided) = hex::decode(provided) else {
            return false;
        };
        // Constant-time comparison.
        self.mac(message).verify_slice(&provided).is_ok()
    }
}

fn strip_query(path: &str) -> &str {
    path.split_once('?').map(|(p, _)| p).unwrap_or(path)
}

fn canonical_request(method: &str, path: &str) -> String {
    format!("{}\n{}", method.to_ascii_uppercase(), strip_query(path))
}
