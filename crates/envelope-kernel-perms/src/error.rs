//! Error types for the permit layer.

use thiserror::Error;

use envelope_kernel_core::EnvelopeError;

/// Errors raised by the SSKR splitting and combining primitive.
///
/// These surface to envelope callers as [`EnvelopeError::InvalidShares`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SskrError {
    /// Secret length must be even and between 16 and 32 bytes.
    #[error("invalid secret length: {0} bytes")]
    InvalidSecretLength(usize),

    /// No groups, or more than 16.
    #[error("group count out of range: {0}")]
    GroupCountOutOfRange(usize),

    /// No members in a group, or more than 16.
    #[error("member count out of range: {0}")]
    MemberCountOutOfRange(usize),

    /// A threshold of zero, or one above its count.
    #[error("threshold {threshold} invalid for count {count}")]
    InvalidThreshold { threshold: usize, count: usize },

    /// No shares were supplied.
    #[error("no shares supplied")]
    NoShares,

    /// Too few shares or groups to meet a threshold.
    #[error("not enough shares: need {needed}, have {have}")]
    NotEnoughShares { needed: usize, have: usize },

    /// Shares disagree about identifier, thresholds, or value length.
    #[error("inconsistent shares: {0}")]
    InconsistentShares(String),

    /// The recovered secret failed its checksum.
    #[error("share checksum mismatch")]
    ChecksumMismatch,

    /// A share's bytes could not be parsed.
    #[error("malformed share: {0}")]
    MalformedShare(String),
}

impl From<SskrError> for EnvelopeError {
    fn from(e: SskrError) -> Self {
        EnvelopeError::InvalidShares(e.to_string())
    }
}

/// Result type for SSKR operations.
pub type SskrResult<T> = std::result::Result<T, SskrError>;

/// Result type for permit operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
