//! Content hashing for source fragments and syntax trees
//!
//! [`ContentHash`] is a 32-byte Blake3 digest. Source text and serialized
//! values are hashed under separate derivation contexts, so a fragment and a
//! JSON document that happen to share bytes never share a hash.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const TEXT_CONTEXT: &str = "canonize 2024 source text";
const VALUE_CONTEXT: &str = "canonize 2024 serialized value";

/// Digest of a source fragment, a printed tree, or a serialized value
///
/// Serializes as a 64-character lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap raw digest bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Digest bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash source text exactly as given; whitespace and comments count
    #[must_use]
    pub fn of_text(text: &str) -> Self {
        Self::derived(TEXT_CONTEXT, text.as_bytes())
    }

    /// Hash the JSON encoding of `value`
    ///
    /// Stable only for values whose serialization is ordered, such as
    /// `BTreeMap`-backed property sets.
    ///
    /// # Errors
    /// Returns [`HashError::Serialization`] if `value` cannot be encoded
    pub fn compute_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self, HashError> {
        let json = serde_json::to_vec(value)?;
        Ok(Self::derived(VALUE_CONTEXT, &json))
    }

    fn derived(context: &str, data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(context);
        hasher.update(data);
        Self(*hasher.finalize().as_bytes())
    }

    /// First 8 bytes as hex, for log lines
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = hex::decode(s)?;
        let bytes: [u8; 32] =
            decoded
                .as_slice()
                .try_into()
                .map_err(|_| HashError::InvalidLength {
                    expected: 32,
                    actual: decoded.len(),
                })?;
        Ok(Self(bytes))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors from hashing or decoding a [`ContentHash`]
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Decoded digest has the wrong size
    #[error("hash must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Decoded length
        actual: usize,
    },

    /// Not a hex string
    #[error("invalid hex digest: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Value could not be encoded for hashing
    #[error("cannot encode value for hashing: {0}")]
    Serialization(#[from] serde_json::Error),
}
