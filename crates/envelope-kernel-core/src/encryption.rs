//! Envelope-level symmetric encryption.
//!
//! Only the subject is encrypted. Assertions stay readable, and the
//! envelope digest does not change.

use crate::encrypted::{Nonce, SymmetricKey};
use crate::envelope::Envelope;
use crate::error::Result;

impl Envelope {
    /// Encrypt the subject with `key` and a fresh random nonce.
    pub fn encrypt(&self, key: &SymmetricKey) -> Result<Envelope> {
        self.encrypt_with_nonce(key, Nonce::generate())
    }

    /// Encrypt the subject with a caller-chosen nonce.
    pub fn encrypt_with_nonce(&self, key: &SymmetricKey, nonce: Nonce) -> Result<Envelope> {
        let subject = self.subject().encrypt_with_nonce(key, nonce)?;
        Ok(self.with_subject(subject))
    }

    /// Decrypt the subject.
    pub fn decrypt(&self, key: &SymmetricKey) -> Result<Envelope> {
        let subject = self.subject().decrypt(key)?;
        Ok(self.with_subject(subject))
    }

    /// Enclose the whole envelope, then encrypt it, so the assertions are
    /// hidden too.
    pub fn encrypt_whole(&self, key: &SymmetricKey) -> Result<Envelope> {
        self.enclose().encrypt(key)
    }
}
