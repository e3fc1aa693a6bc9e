//! Symmetric authenticated encryption.
//!
//! ChaCha20-Poly1305 (IETF variant) with the authentication tag kept
//! separately from the ciphertext, so an [`EncryptedMessage`] carries its
//! ciphertext, nonce, tag and associated data as distinct fields.

use bytes::Bytes;
use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Key, Tag,
};
use ciborium::value::Value;
use rand::{CryptoRng, RngCore};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::canonical::{
    expect_array, expect_bytes, expect_discriminator, expect_fixed_bytes, expect_tag, tagged,
    tags, CborDecode, CborEncode,
};
use crate::error::{EnvelopeError, Result};

/// A 256-bit symmetric key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; 32]);

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for SymmetricKey {}

impl SymmetricKey {
    const VERSION: u64 = 1;

    /// Generate a new random key.
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| EnvelopeError::InvalidKey)?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt `plaintext`, binding `aad`, with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<EncryptedMessage> {
        self.encrypt_with_nonce(plaintext, aad, Nonce::generate())
    }

    /// Encrypt with a caller-chosen nonce.
    ///
    /// A nonce must never be reused with the same key.
    pub fn encrypt_with_nonce(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        nonce: Nonce,
    ) -> Result<EncryptedMessage> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.0));
        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(
                chacha20poly1305::Nonce::from_slice(&nonce.0),
                aad,
                &mut buffer,
            )
            .map_err(|_| EnvelopeError::InvalidOperation("plaintext too long to encrypt".into()))?;
        let mut auth = [0u8; 16];
        auth.copy_from_slice(tag.as_slice());

        Ok(EncryptedMessage {
            ciphertext: Bytes::from(buffer),
            nonce,
            auth: AuthTag(auth),
            aad: Bytes::copy_from_slice(aad),
        })
    }

    /// Decrypt and authenticate a message.
    ///
    /// Fails with [`EnvelopeError::InvalidKey`] if authentication fails.
    pub fn decrypt(&self, message: &EncryptedMessage) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.0));
        let mut buffer = message.ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(
                chacha20poly1305::Nonce::from_slice(&message.nonce.0),
                &message.aad,
                &mut buffer,
                Tag::from_slice(&message.auth.0),
            )
            .map_err(|_| EnvelopeError::InvalidKey)?;
        Ok(buffer)
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

impl CborEncode for SymmetricKey {
    fn to_cbor(&self) -> Value {
        tagged(
            tags::SYMMETRIC_KEY,
            Value::Array(vec![
                Value::Integer(Self::VERSION.into()),
                Value::Bytes(self.0.to_vec()),
            ]),
        )
    }
}

impl CborDecode for SymmetricKey {
    fn from_cbor(value: &Value) -> Result<Self> {
        let items = expect_array(expect_tag(value, tags::SYMMETRIC_KEY)?, "symmetric key")?;
        if items.len() != 2 {
            return Err(EnvelopeError::format("symmetric key: expected 2 elements"));
        }
        expect_discriminator(&items[0], Self::VERSION)?;
        Ok(Self(expect_fixed_bytes::<32>(&items[1], "symmetric key")?))
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce(pub [u8; 12]);

impl Nonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// A 128-bit Poly1305 authentication tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTag(pub [u8; 16]);

/// The output of symmetric encryption.
///
/// Encoded as `tag(48, [ciphertext, nonce, auth])`, with a fourth `aad`
/// element only when the associated data is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMessage {
    ciphertext: Bytes,
    nonce: Nonce,
    auth: AuthTag,
    aad: Bytes,
}

impl EncryptedMessage {
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    pub fn auth(&self) -> &AuthTag {
        &self.auth
    }

    pub fn aad(&self) -> &[u8] {
        &self.aad
    }
}

impl CborEncode for EncryptedMessage {
    fn to_cbor(&self) -> Value {
        let mut items = vec![
            Value::Bytes(self.ciphertext.to_vec()),
            Value::Bytes(self.nonce.0.to_vec()),
            Value::Bytes(self.auth.0.to_vec()),
        ];
        if !self.aad.is_empty() {
            items.push(Value::Bytes(self.aad.to_vec()));
        }
        tagged(tags::ENCRYPTED_MESSAGE, Value::Array(items))
    }
}

impl CborDecode for EncryptedMessage {
    fn from_cbor(value: &Value) -> Result<Self> {
        let items = expect_array(
            expect_tag(value, tags::ENCRYPTED_MESSAGE)?,
            "encrypted message",
        )?;
        if !(3..=4).contains(&items.len()) {
            return Err(EnvelopeError::format(
                "encrypted message: expected 3 or 4 elements",
            ));
        }
        let aad = match items.get(3) {
            Some(v) => Bytes::copy_from_slice(expect_bytes(v, "aad")?),
            None => Bytes::new(),
        };
        Ok(Self {
            ciphertext: Bytes::copy_from_slice(expect_bytes(&items[0], "ciphertext")?),
            nonce: Nonce(expect_fixed_bytes::<12>(&items[1], "nonce")?),
            auth: AuthTag(expect_fixed_bytes::<16>(&items[2], "auth")?),
            aad,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = SymmetricKey::generate();
        let message = key.encrypt(b"hello, world!", b"context").unwrap();
        assert_ne!(message.ciphertext(), b"hello, world!");
        assert_eq!(message.ciphertext().len(), 13);
        assert_eq!(key.decrypt(&message).unwrap(), b"hello, world!");
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let key1 = SymmetricKey::generate();
        let key2 = SymmetricKey::generate();
        let message = key1.encrypt(b"secret", b"").unwrap();
        assert_eq!(key2.decrypt(&message), Err(EnvelopeError::InvalidKey));
    }

    #[test]
    fn test_tampered_aad_fails() {
        let key = SymmetricKey::generate();
        let message = key.encrypt(b"secret", b"aad-one").unwrap();
        let mut tampered = message.clone();
        tampered.aad = Bytes::from_static(b"aad-two");
        assert_eq!(key.decrypt(&tampered), Err(EnvelopeError::InvalidKey));
    }

    #[test]
    fn test_fixed_nonce_is_deterministic() {
        let key = SymmetricKey::from_bytes([3; 32]);
        let nonce = Nonce::from_bytes([9; 12]);
        let a = key.encrypt_with_nonce(b"data", b"", nonce).unwrap();
        let b = key.encrypt_with_nonce(b"data", b"", nonce).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_message_cbor_with_and_without_aad() {
        let key = SymmetricKey::generate();
        for aad in [&b""[..], &b"digest"[..]] {
            let message = key.encrypt(b"payload", aad).unwrap();
            let decoded = EncryptedMessage::from_cbor_bytes(&message.to_cbor_bytes()).unwrap();
            assert_eq!(decoded, message);
            assert_eq!(key.decrypt(&decoded).unwrap(), b"payload");
        }
    }

    #[test]
    fn test_symmetric_key_cbor() {
        let key = SymmetricKey::from_bytes([5; 32]);
        let decoded = SymmetricKey::from_cbor_bytes(&key.to_cbor_bytes()).unwrap();
        assert_eq!(decoded, key);
    }
}
