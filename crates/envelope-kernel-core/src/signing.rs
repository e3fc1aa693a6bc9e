//! Signatures over envelope subjects.
//!
//! A signature covers the subject's digest only, so assertions added after
//! signing (including other signatures) leave it valid, and so does eliding
//! or encrypting the subject.

use crate::crypto::{Ed25519PublicKey, Keypair, Signature};
use crate::digest::DigestProvider;
use crate::envelope::Envelope;
use crate::error::{EnvelopeError, Result};
use crate::predicate::Predicate;

impl Envelope {
    /// Sign the subject and attach a `verifiedBy` assertion.
    pub fn sign(&self, signer: &Keypair) -> Envelope {
        self.sign_with_note(signer, None)
    }

    /// Sign the subject, attaching `note` to the signature if given.
    ///
    /// Produces `verifiedBy: Signature [note: "..."]`.
    pub fn sign_with_note(&self, signer: &Keypair, note: Option<&str>) -> Envelope {
        let signature = signer.sign(self.subject().digest().as_bytes());
        let mut verification = Envelope::new(signature);
        if let Some(note) = note {
            verification = verification.add(Predicate::NOTE, note);
        }
        self.add(Predicate::VERIFIED_BY, verification)
    }

    /// Sign with several keys at once.
    pub fn sign_all(&self, signers: &[&Keypair]) -> Envelope {
        signers
            .iter()
            .fold(self.clone(), |envelope, signer| envelope.sign(signer))
    }

    /// Every signature attached with `verifiedBy`.
    ///
    /// Fails if any `verifiedBy` object is not a signature.
    pub fn signatures(&self) -> Result<Vec<Signature>> {
        self.objects_for_predicate(Predicate::VERIFIED_BY)
            .iter()
            .map(Envelope::extract::<Signature>)
            .collect()
    }

    /// Whether `signature` is a valid signature of this subject by `key`.
    pub fn is_valid_signature(&self, signature: &Signature, key: &Ed25519PublicKey) -> bool {
        signature.verify(self.subject().digest().as_bytes(), key)
    }

    /// Whether any attached signature verifies with `key`.
    ///
    /// `verifiedBy` objects that are not readable signatures (for example
    /// elided ones) are skipped.
    pub fn has_valid_signature(&self, key: &Ed25519PublicKey) -> bool {
        self.objects_for_predicate(Predicate::VERIFIED_BY)
            .iter()
            .filter_map(|object| object.extract::<Signature>().ok())
            .any(|signature| self.is_valid_signature(&signature, key))
    }

    /// Whether at least `threshold` of `keys` have signed (all of them when
    /// `threshold` is `None`).
    ///
    /// At least one valid signature is always required: an empty key list or
    /// a zero threshold never passes.
    pub fn has_valid_signatures(&self, keys: &[Ed25519PublicKey], threshold: Option<usize>) -> bool {
        let threshold = threshold.unwrap_or(keys.len());
        if keys.is_empty() || threshold == 0 || threshold > keys.len() {
            return false;
        }
        let mut count = 0;
        for key in keys {
            if self.has_valid_signature(key) {
                count += 1;
                if count >= threshold {
                    return true;
                }
            }
        }
        false
    }

    pub fn validate_signature(&self, key: &Ed25519PublicKey) -> Result<()> {
        if self.has_valid_signature(key) {
            Ok(())
        } else {
            Err(EnvelopeError::InvalidSignature)
        }
    }

    pub fn validate_signatures(
        &self,
        keys: &[Ed25519PublicKey],
        threshold: Option<usize>,
    ) -> Result<()> {
        if self.has_valid_signatures(keys, threshold) {
            Ok(())
        } else {
            Err(EnvelopeError::InvalidSignature)
        }
    }
}
