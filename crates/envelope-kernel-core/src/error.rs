//! Error types for the Envelope Kernel Core.

use thiserror::Error;

/// Errors that can occur while building, decoding, decrypting or verifying
/// envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The input does not have the expected structure.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A tag or variant discriminator was not the one expected here.
    #[error("unexpected tag or discriminator: {0}")]
    InvalidTag(u64),

    /// A recomputed digest did not match the stored one.
    #[error("digest mismatch")]
    InvalidDigest,

    /// No signature verified against the given key(s).
    #[error("invalid signature")]
    InvalidSignature,

    /// Decryption failed, or key material was malformed.
    #[error("invalid key")]
    InvalidKey,

    /// The operation is not valid for this subject.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// None of the sealed messages could be opened with the given key.
    #[error("not a recipient of this envelope")]
    InvalidRecipient,

    /// The supplied shares could not be combined.
    #[error("invalid shares: {0}")]
    InvalidShares(String),

    /// An exact-one lookup found zero or several matches.
    #[error("expected exactly one assertion, found {count}")]
    AmbiguousOrMissingAssertion { count: usize },
}

impl EnvelopeError {
    /// Shorthand for [`EnvelopeError::InvalidFormat`].
    pub fn format(reason: impl Into<String>) -> Self {
        Self::InvalidFormat(reason.into())
    }
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
