//! Page content hashing.
//!
//! All content hashing uses SHA-256. The writer records a hash in each page
//! reference when a page is persisted; the reader verifies against the same
//! function, so both sides must share this module.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 content hash of a serialized page (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PageHash([u8; 32]);

impl PageHash {
    /// All-zero hash, used as a placeholder before a page is persisted.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a hash from raw bytes.
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw hash bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageHash(")?;
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

impl From<[u8; 32]> for PageHash {
    #[inline]
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Computes the SHA-256 content hash of serialized page bytes.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> PageHash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    PageHash(hasher.finalize().into())
}
