//! Content digests.
//!
//! Every node in an envelope tree is identified by a 32-byte Blake3 digest.
//! Composite nodes combine the raw bytes of their children's digests.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use subtle::ConstantTimeEq;

use crate::error::{EnvelopeError, Result};

/// A 32-byte Blake3 digest.
///
/// Equality is constant time. Ordering is lexicographic over the raw bytes
/// and is what places assertions in canonical order.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Length of a digest in bytes.
    pub const LEN: usize = 32;

    /// Hash an image.
    pub fn from_image(image: &[u8]) -> Self {
        Self(*blake3::hash(image).as_bytes())
    }

    /// Hash the concatenation of several digests.
    ///
    /// Order matters: callers are responsible for presenting children in
    /// canonical order.
    pub fn combine<'a, I>(digests: I) -> Self
    where
        I: IntoIterator<Item = &'a Digest>,
    {
        let mut hasher = blake3::Hasher::new();
        for d in digests {
            hasher.update(&d.0);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| EnvelopeError::format(format!("digest must be 32 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check that this digest is the digest of `image`.
    pub fn validate(&self, image: &[u8]) -> bool {
        *self == Self::from_image(image)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The first eight bytes as hex, for display.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl PartialEq for Digest {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for Digest {}

impl Hash for Digest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialOrd for Digest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Digest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = EnvelopeError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_slice(bytes)
    }
}

/// Anything that has a digest.
pub trait DigestProvider {
    fn digest(&self) -> Digest;
}

impl DigestProvider for Digest {
    fn digest(&self) -> Digest {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_json_roundtrip() {
        let digest = Digest::from_image(b"serde");
        let json = serde_json::to_string(&digest).unwrap();
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }

    #[test]
    fn test_from_image_deterministic() {
        let d1 = Digest::from_image(b"Hello");
        let d2 = Digest::from_image(b"Hello");
        assert_eq!(d1, d2);
        assert_ne!(d1, Digest::from_image(b"hello"));
        assert!(d1.validate(b"Hello"));
        assert!(!d1.validate(b"Hello!"));
    }

    #[test]
    fn test_combine_is_concatenation_hash() {
        let a = Digest::from_image(b"a");
        let b = Digest::from_image(b"b");

        let mut concat = Vec::new();
        concat.extend_from_slice(a.as_bytes());
        concat.extend_from_slice(b.as_bytes());

        assert_eq!(Digest::combine([&a, &b]), Digest::from_image(&concat));
    }

    #[test]
    fn test_combine_order_sensitive() {
        let a = Digest::from_image(b"a");
        let b = Digest::from_image(b"b");
        assert_ne!(Digest::combine([&a, &b]), Digest::combine([&b, &a]));
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut low = [0u8; 32];
        let mut high = [0u8; 32];
        low[31] = 0xff;
        high[0] = 0x01;
        assert!(Digest(low) < Digest(high));
    }

    #[test]
    fn test_hex_roundtrip() {
        let d = Digest::from_image(b"roundtrip");
        assert_eq!(Digest::from_hex(&d.to_hex()).unwrap(), d);
        assert!(Digest::from_hex("abcd").is_err());
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(Digest::from_slice(&[0u8; 31]).is_err());
        assert!(Digest::from_slice(&[0u8; 32]).is_ok());
    }
}
