//! # Envelope Kernel Core
//!
//! The envelope model: a subject with a set of assertions about it, all
//! bound together by a Merkle-like digest tree.
//!
//! This crate contains no I/O and no networking. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Envelope`] - A subject plus zero or more assertions
//! - [`Subject`] - Plaintext, nested envelope, encrypted, or elided
//! - [`Assertion`] - A predicate/object pair, both envelopes
//! - [`Digest`] - Blake3 digest identifying any node in the tree
//!
//! ## Digest Stability
//!
//! Eliding, encrypting, or decrypting any part of an envelope leaves its
//! digest unchanged, and signatures cover subject digests. Adding or
//! revoking an assertion changes it.
//!
//! ## Canonicalization
//!
//! Envelopes are encoded as deterministic CBOR. See the [`canonical`] module.

pub mod assertion;
pub mod canonical;
pub mod crypto;
pub mod digest;
pub mod encrypted;
pub mod encryption;
pub mod envelope;
pub mod error;
pub mod format;
pub mod predicate;
pub mod redaction;
pub mod reference;
pub mod signing;
pub mod subject;

pub use assertion::Assertion;
pub use canonical::{tags, CborDecode, CborEncode};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair, Signature};
pub use digest::{Digest, DigestProvider};
pub use encrypted::{AuthTag, EncryptedMessage, Nonce, SymmetricKey};
pub use envelope::Envelope;
pub use error::{EnvelopeError, Result};
pub use format::{EnvelopeFormatter, FormatItem, FormatOptions};
pub use predicate::{Predicate, PredicateRegistry};
pub use reference::{Identifier, Reference};
pub use subject::{Leaf, Subject};
