//! Identifiers and opaque references.

use ciborium::value::Value;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::canonical::{expect_fixed_bytes, expect_tag, tagged, tags, CborDecode, CborEncode};
use crate::digest::{Digest, DigestProvider};
use crate::error::Result;

/// A 32-byte random identifier naming a stable thing (a person, a
/// credential) independently of any one envelope's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier(pub [u8; 32]);

impl Identifier {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID({})", &self.to_hex()[..16])
    }
}

impl CborEncode for Identifier {
    fn to_cbor(&self) -> Value {
        tagged(tags::IDENTIFIER, Value::Bytes(self.0.to_vec()))
    }
}

impl CborDecode for Identifier {
    fn from_cbor(value: &Value) -> Result<Self> {
        let inner = expect_tag(value, tags::IDENTIFIER)?;
        Ok(Self(expect_fixed_bytes::<32>(inner, "identifier")?))
    }
}

/// A pointer to content by digest.
///
/// References stand in for elided content and for externally held
/// documents. Two references are equal when their digests are equal,
/// whatever identifier they carry.
#[derive(Clone, Copy)]
pub enum Reference {
    Digest(Digest),
    Identified { id: Identifier, digest: Digest },
}

impl Reference {
    /// The identifier, if this reference carries one.
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            Reference::Digest(_) => None,
            Reference::Identified { id, .. } => Some(id),
        }
    }
}

impl DigestProvider for Reference {
    fn digest(&self) -> Digest {
        match self {
            Reference::Digest(digest) | Reference::Identified { digest, .. } => *digest,
        }
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.digest() == other.digest()
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digest().hash(state);
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Digest(d) => write!(f, "Reference({d:?})"),
            Reference::Identified { id, digest } => write!(f, "Reference({id:?}, {digest:?})"),
        }
    }
}

impl From<Digest> for Reference {
    fn from(digest: Digest) -> Self {
        Reference::Digest(digest)
    }
}
