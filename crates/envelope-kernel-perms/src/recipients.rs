//! Public-key recipients for encrypted envelopes.
//!
//! The content key that encrypts a subject is sealed once per recipient
//! and attached as a `hasRecipient` assertion. Recipients are unordered
//! and unlabelled; a reader tries every sealed message in turn.

use tracing::debug;

use envelope_kernel_core::{
    CborDecode, CborEncode, Envelope, EnvelopeError, Predicate, SymmetricKey,
};

use crate::crypto::{X25519PublicKey, X25519StaticSecret};
use crate::error::Result;
use crate::sealed::SealedMessage;

/// Recipient operations on [`Envelope`].
pub trait RecipientExt {
    /// Seal `content_key` to `recipient` and attach it as `hasRecipient`.
    ///
    /// Leaves the subject as it is; encrypt it with the same key separately.
    fn add_recipient(
        &self,
        recipient: &X25519PublicKey,
        content_key: &SymmetricKey,
    ) -> Result<Envelope>;

    /// Every sealed message attached with `hasRecipient`.
    fn recipients(&self) -> Result<Vec<SealedMessage>>;

    /// Find a sealed message `recipient` can open and decrypt the subject
    /// with the content key inside it.
    ///
    /// `hasRecipient` objects that are not readable sealed messages (for
    /// example elided ones) are skipped. Fails with
    /// [`EnvelopeError::InvalidRecipient`] if none opens.
    fn decrypt_to_recipient(&self, recipient: &X25519StaticSecret) -> Result<Envelope>;
}

impl RecipientExt for Envelope {
    fn add_recipient(
        &self,
        recipient: &X25519PublicKey,
        content_key: &SymmetricKey,
    ) -> Result<Envelope> {
        let sealed = SealedMessage::seal(&content_key.to_cbor_bytes(), recipient)?;
        Ok(self.add(Predicate::HAS_RECIPIENT, sealed))
    }

    fn recipients(&self) -> Result<Vec<SealedMessage>> {
        self.objects_for_predicate(Predicate::HAS_RECIPIENT)
            .iter()
            .map(Envelope::extract::<SealedMessage>)
            .collect()
    }

    fn decrypt_to_recipient(&self, recipient: &X25519StaticSecret) -> Result<Envelope> {
        let sealed_messages: Vec<SealedMessage> = self
            .objects_for_predicate(Predicate::HAS_RECIPIENT)
            .iter()
            .filter_map(|object| object.extract::<SealedMessage>().ok())
            .collect();
        let content_key = sealed_messages
            .iter()
            .find_map(|sealed| sealed.open(recipient).ok())
            .and_then(|plaintext| SymmetricKey::from_cbor_bytes(&plaintext).ok());

        match content_key {
            Some(key) => {
                debug!(candidates = sealed_messages.len(), "recipient content key recovered");
                self.decrypt(&key)
            }
            None => {
                debug!(candidates = sealed_messages.len(), "no sealed message opened");
                Err(EnvelopeError::InvalidRecipient)
            }
        }
    }
}
