//! Sealed messages: a payload encrypted to one recipient's X25519 key.
//!
//! A fresh ephemeral key pair is generated per message. The recipient
//! repeats the key agreement with the ephemeral public key, which travels
//! alongside the ciphertext. The recipient's own key is not recorded, so a
//! holder of several sealed messages learns nothing about who they are for.

use ciborium::value::Value;
use rand::{CryptoRng, RngCore};

use envelope_kernel_core::canonical::{
    expect_array, expect_discriminator, expect_fixed_bytes, expect_tag, tagged, tags,
};
use envelope_kernel_core::{
    CborDecode, CborEncode, EncryptedMessage, Envelope, EnvelopeError, Nonce,
};

use crate::crypto::{EphemeralKeyPair, X25519PublicKey, X25519StaticSecret};
use crate::error::Result;

/// A message only the holder of a specific X25519 secret can open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    message: EncryptedMessage,
    ephemeral_public: X25519PublicKey,
}

impl SealedMessage {
    const VERSION: u64 = 1;

    /// Seal `plaintext` to `recipient`.
    pub fn seal(plaintext: &[u8], recipient: &X25519PublicKey) -> Result<Self> {
        Self::seal_with_rng(plaintext, recipient, &mut rand::thread_rng())
    }

    pub fn seal_with_rng<R: RngCore + CryptoRng>(
        plaintext: &[u8],
        recipient: &X25519PublicKey,
        rng: &mut R,
    ) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate_with_rng(rng);
        let ephemeral_public = ephemeral.public_key();
        let key = ephemeral
            .diffie_hellman(recipient)
            .derive_key(&ephemeral_public, recipient);

        let mut nonce = [0u8; 12];
        rng.fill_bytes(&mut nonce);
        let message = key.encrypt_with_nonce(
            plaintext,
            ephemeral_public.as_bytes(),
            Nonce::from_bytes(nonce),
        )?;

        Ok(Self {
            message,
            ephemeral_public,
        })
    }

    /// Open with the recipient's secret.
    ///
    /// Fails with [`EnvelopeError::InvalidKey`] if the message was sealed
    /// to someone else.
    pub fn open(&self, recipient: &X25519StaticSecret) -> Result<Vec<u8>> {
        let key = recipient
            .diffie_hellman(&self.ephemeral_public)
            .derive_key(&self.ephemeral_public, &recipient.public_key());
        key.decrypt(&self.message)
    }

    pub fn message(&self) -> &EncryptedMessage {
        &self.message
    }

    pub fn ephemeral_public(&self) -> &X25519PublicKey {
        &self.ephemeral_public
    }
}

impl CborEncode for SealedMessage {
    fn to_cbor(&self) -> Value {
        tagged(
            tags::SEALED_MESSAGE,
            Value::Array(vec![
                Value::Integer(Self::VERSION.into()),
                self.message.to_cbor(),
                Value::Bytes(self.ephemeral_public.as_bytes().to_vec()),
            ]),
        )
    }
}

impl CborDecode for SealedMessage {
    fn from_cbor(value: &Value) -> Result<Self> {
        let items = expect_array(expect_tag(value, tags::SEALED_MESSAGE)?, "sealed message")?;
        if items.len() != 3 {
            return Err(EnvelopeError::format("sealed message: expected 3 elements"));
        }
        expect_discriminator(&items[0], Self::VERSION)?;
        Ok(Self {
            message: EncryptedMessage::from_cbor(&items[1])?,
            ephemeral_public: X25519PublicKey::from_bytes(expect_fixed_bytes::<32>(
                &items[2],
                "ephemeral public key",
            )?),
        })
    }
}

impl From<SealedMessage> for Envelope {
    fn from(sealed: SealedMessage) -> Self {
        Envelope::leaf(&sealed)
    }
}

impl From<&SealedMessage> for Envelope {
    fn from(sealed: &SealedMessage) -> Self {
        Envelope::leaf(sealed)
    }
}
