//! # Envelope Kernel
//!
//! The unified API for envelopes: verifiable, redactable, encryptable
//! documents.
//!
//! ## Overview
//!
//! An envelope is a subject plus a set of assertions about it. Every part
//! is identified by a digest, and the digest tree lets a holder:
//!
//! - **Sign**: signatures cover the subject digest, so they survive later
//!   additions and elision
//! - **Elide**: remove any part while keeping every digest above it intact
//! - **Encrypt**: hide the subject; the digest does not change
//! - **Seal**: hand the content key to recipients by public key
//! - **Back up**: split the content key into SSKR shares
//!
//! ## Usage
//!
//! ```rust
//! use envelope_kernel::{Kernel, KernelConfig, PrivateKeyBase};
//! use envelope_kernel::core::Envelope;
//!
//! let alice = Kernel::new(PrivateKeyBase::generate(), KernelConfig::default());
//! let bob = Kernel::new(PrivateKeyBase::generate(), KernelConfig::default());
//!
//! let signed = alice.sign(&Envelope::new("Hello."));
//! let sealed = alice.seal_to(&signed, &[bob.public_keys()]).unwrap();
//!
//! let opened = bob.open(&sealed).unwrap();
//! bob.verify_from(&opened, &alice.public_keys()).unwrap();
//! assert_eq!(opened.digest(), signed.digest());
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `envelope_kernel::core` - Envelope model, digests, elision, signing
//! - `envelope_kernel::perms` - Recipients, permits, SSKR sharing

pub mod error;
pub mod kernel;
pub mod keys;

// Re-export component crates
pub use envelope_kernel_core as core;
pub use envelope_kernel_perms as perms;

// Re-export main types for convenience
pub use error::{KernelError, Result};
pub use kernel::{Kernel, KernelConfig};
pub use keys::{PrivateKeyBase, PublicKeyBase};

// Re-export commonly used core types
pub use envelope_kernel_core::{
    Assertion, Digest, DigestProvider, Envelope, EnvelopeError, Identifier, Predicate,
    PredicateRegistry, Subject, SymmetricKey,
};
pub use envelope_kernel_perms::{PermitExt, RecipientExt, SharingExt};
