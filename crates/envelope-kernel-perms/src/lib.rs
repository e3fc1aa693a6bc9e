//! # Envelope Kernel Permits
//!
//! Ways to hand out the key to an encrypted envelope.
//!
//! ## Overview
//!
//! An envelope's subject is encrypted with a symmetric content key. The
//! permit layer decides who can get hold of that key:
//!
//! - **Symmetric**: the key is shared out of band
//! - **Recipients**: the key is sealed to each recipient's X25519 public key
//!   and attached as `hasRecipient` assertions
//! - **Shares**: the key is split with SSKR and each share travels in its
//!   own copy of the envelope as an `sskrShare` assertion
//!
//! ## Usage
//!
//! ```rust
//! use envelope_kernel_core::{Envelope, SymmetricKey};
//! use envelope_kernel_perms::{RecipientExt, X25519StaticSecret};
//!
//! let bob = X25519StaticSecret::generate();
//! let content_key = SymmetricKey::generate();
//!
//! let envelope = Envelope::new("meet at noon")
//!     .encrypt(&content_key)
//!     .unwrap()
//!     .add_recipient(&bob.public_key(), &content_key)
//!     .unwrap();
//!
//! let opened = envelope.decrypt_to_recipient(&bob).unwrap();
//! assert_eq!(opened.extract::<String>().unwrap(), "meet at noon");
//! ```

pub mod crypto;
pub mod error;
pub mod permit;
pub mod recipients;
pub mod sealed;
pub mod shamir;
pub mod sharing;
pub mod sskr;

pub use crypto::{EphemeralKeyPair, SharedKey, X25519PublicKey, X25519StaticSecret};
pub use error::{Result, SskrError, SskrResult};
pub use permit::{Permit, PermitExt};
pub use recipients::RecipientExt;
pub use sealed::SealedMessage;
pub use sharing::{reconstruct, shares, SharingExt};
pub use sskr::{sskr_combine, sskr_generate, GroupSpec, SskrShare, SskrSpec};
