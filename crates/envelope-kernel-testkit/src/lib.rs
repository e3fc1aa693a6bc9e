//! # Envelope Kernel Testkit
//!
//! Testing utilities for the Envelope Kernel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed inputs with their expected rendering, checked for
//!   determinism and round trip
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Deterministic parties (Alice, Bob, Carol) for scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use envelope_kernel_testkit::vectors::verify_all_vectors;
//!
//! for report in verify_all_vectors() {
//!     assert!(report.format_matches && report.roundtrip_matches, "{}", report.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use envelope_kernel_testkit::generators::{EnvelopeParams, envelope_from_params};
//!
//! proptest! {
//!     #[test]
//!     fn digest_is_deterministic(params: EnvelopeParams) {
//!         let e1 = envelope_from_params(&params);
//!         let e2 = envelope_from_params(&params);
//!         prop_assert_eq!(e1.digest(), e2.digest());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use envelope_kernel_testkit::fixtures::TestFixture;
//!
//! let alice = TestFixture::alice();
//! let bob = TestFixture::bob();
//! let sealed = alice.make_sealed("for Bob", &[&bob]).unwrap();
//! assert!(bob.kernel.open(&sealed).is_ok());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture};
pub use generators::{envelope_from_params, EnvelopeParams};
pub use vectors::{all_vectors, generate_envelope_from_vector, verify_all_vectors, GoldenVector};
