//! Secret salt.

use crate::error::{SignerError, SignerResult};
use rand::RngCore;
use std::fmt;

/// Number of random bytes in a generated salt.
const GENERATED_SALT_BYTES: usize = 32;

/// Process-wide secret used to key every signature.
#[derive(Clone)]
pub struct Salt {
    bytes: Vec<u8>,
}

impl Salt {
    /// Use a configured secret.
    pub fn new(secret: impl AsRef<[u8]>) -> SignerResult<Self> {
        let bytes = secret.as_ref().to_vec();
        if bytes.is_empty() {
            return Err(SignerError::InvalidSalt("salt must not be empty".to_string()));
        }
        Ok(Self { bytes })
    }

    /// Generate a new random salt using a cryptographically secure RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; GENERATED_SALT_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self {
            bytes: hex::encode(bytes).into_bytes(),
        }
    }

    /// Load the salt from a file, trimming surrounding whitespace.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> SignerResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::new(data.trim())
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt([REDACTED])")
    }
}
