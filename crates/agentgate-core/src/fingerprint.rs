use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of the hex prefix retained from the SHA-256 digest. 32 hex chars
/// = 128 bits, considered negligible collision risk at the O(10^4)-identity
/// target scale (see DESIGN.md Open Question 4).
const FINGERPRINT_HEX_LEN: usize = 32;

/// A deterministic, one-way, truncated digest of an upstream API key.
///
/// Never reversed to recover the key; the key itself is never stored
/// anywhere in the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint of an upstream API key.
    ///
    /// Deterministic, fixed-length, and does not contain the key as a
    /// substring (it's a cryptographic digest, truncated).
    pub fn of(key: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        let full_hex = hex::encode(digest);
        Self(full_hex[..FINGERPRINT_HEX_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Fingerprint {
    /// Wrap an already-computed fingerprint string (e.g. loaded from storage).
    fn from(s: String) -> Self {
        Self(s)
    }
}
