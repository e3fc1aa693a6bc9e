//! Error types for the Kernel.

use envelope_kernel_core::EnvelopeError;
use thiserror::Error;

/// Errors that can occur during Kernel operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// Envelope error.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Sealing needs at least one recipient.
    #[error("no recipients given")]
    NoRecipients,
}

/// Result type for Kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
