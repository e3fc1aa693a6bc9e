//! Signing primitives.
//!
//! Ed25519 via `ed25519-dalek`. Envelopes sign subject digests, so every
//! message handed to [`Keypair::sign`] here is 32 bytes long, but nothing
//! below depends on that.

use ciborium::value::Value;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::{CryptoRng, RngCore};
use std::fmt;

use crate::canonical::{
    expect_array, expect_discriminator, expect_fixed_bytes, expect_tag, tagged, tags, CborDecode,
    CborEncode,
};
use crate::error::{EnvelopeError, Result};

/// An Ed25519 signing key.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            signing_key: SigningKey::generate(rng),
        }
    }

    /// The seed is used as the secret key directly; no derivation happens.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::Ed25519(Ed25519Signature(self.signing_key.sign(message).to_bytes()))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// The verifying half of a [`Keypair`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check `signature` over `message`.
    ///
    /// Bytes that are not a valid curve point give `InvalidKey`; a
    /// signature that does not verify gives `InvalidSignature`.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<()> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| EnvelopeError::InvalidKey)?;
        key.verify(message, &ed25519_dalek::Signature::from_bytes(&signature.0))
            .map_err(|_| EnvelopeError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519PublicKey({})", hex::encode(&self.0[..8]))
    }
}

/// Raw Ed25519 signature bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Signature({}..)", hex::encode(&self.0[..8]))
    }
}

/// A signature carried in a `verifiedBy` assertion.
///
/// Encoded as `tag(61, [scheme, bytes])`. Only Ed25519 (scheme 1) exists
/// today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Ed25519(Ed25519Signature),
}

impl Signature {
    const ED25519: u64 = 1;

    /// Verify over `message` with `key`.
    pub fn verify(&self, message: &[u8], key: &Ed25519PublicKey) -> bool {
        match self {
            Signature::Ed25519(sig) => key.verify(message, sig).is_ok(),
        }
    }
}

impl CborEncode for Signature {
    fn to_cbor(&self) -> Value {
        match self {
            Signature::Ed25519(sig) => tagged(
                tags::SIGNATURE,
                Value::Array(vec![
                    Value::Integer(Self::ED25519.into()),
                    Value::Bytes(sig.0.to_vec()),
                ]),
            ),
        }
    }
}

impl CborDecode for Signature {
    fn from_cbor(value: &Value) -> Result<Self> {
        let items = expect_array(expect_tag(value, tags::SIGNATURE)?, "signature")?;
        if items.len() != 2 {
            return Err(EnvelopeError::format("signature: expected 2 elements"));
        }
        expect_discriminator(&items[0], Self::ED25519)?;
        let bytes = expect_fixed_bytes::<64>(&items[1], "signature")?;
        Ok(Signature::Ed25519(Ed25519Signature(bytes)))
    }
}
