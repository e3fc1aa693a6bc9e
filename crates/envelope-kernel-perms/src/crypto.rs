//! X25519 key agreement for sealed messages.
//!
//! A sender agrees a key with an ephemeral secret and the recipient's
//! public key; the recipient repeats the agreement with its static secret
//! and the ephemeral public key carried in the message.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use envelope_kernel_core::SymmetricKey;

const SEALED_MESSAGE_CONTEXT: &str = "envelope-kernel-v1 sealed message";

/// A recipient's (or an ephemeral sender's) agreement key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct X25519PublicKey([u8; 32]);

impl X25519PublicKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn point(&self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl fmt::Debug for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519PublicKey({})", hex::encode(&self.0[..8]))
    }
}

impl From<&StaticSecret> for X25519PublicKey {
    fn from(secret: &StaticSecret) -> Self {
        Self(PublicKey::from(secret).to_bytes())
    }
}

/// The long-lived agreement secret that sealed messages are opened with.
///
/// Never used for signing.
#[derive(Clone)]
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(StaticSecret::random_from_rng(rng))
    }

    /// Use `seed` as the secret scalar (clamped by X25519).
    pub fn from_bytes(seed: [u8; 32]) -> Self {
        Self(StaticSecret::from(seed))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(&self.0)
    }

    pub fn diffie_hellman(&self, peer: &X25519PublicKey) -> SharedKey {
        SharedKey(self.0.diffie_hellman(&peer.point()).to_bytes())
    }
}

impl fmt::Debug for X25519StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X25519StaticSecret")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Raw X25519 output. Only ever used through [`SharedKey::derive_key`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The content-encryption key for one sealed message.
    ///
    /// Both public keys are mixed in, binding the key to this exchange.
    pub fn derive_key(
        &self,
        ephemeral_public: &X25519PublicKey,
        recipient_public: &X25519PublicKey,
    ) -> SymmetricKey {
        let mut hasher = blake3::Hasher::new_derive_key(SEALED_MESSAGE_CONTEXT);
        hasher.update(&self.0);
        hasher.update(ephemeral_public.as_bytes());
        hasher.update(recipient_public.as_bytes());
        SymmetricKey::from_bytes(*hasher.finalize().as_bytes())
    }
}

/// A single-use sender key. Sealing one message consumes it.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let secret = EphemeralSecret::random_from_rng(rng);
        let public = X25519PublicKey(PublicKey::from(&secret).to_bytes());
        Self { secret, public }
    }

    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    pub fn diffie_hellman(self, peer: &X25519PublicKey) -> SharedKey {
        SharedKey(self.secret.diffie_hellman(&peer.point()).to_bytes())
    }
}
