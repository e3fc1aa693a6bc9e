//! Golden test vectors for deterministic verification.
//!
//! Each vector describes how to build an envelope from fixed inputs and
//! the text rendering it must produce. Ed25519 signing is deterministic,
//! so signed vectors are reproducible too.

use serde::Serialize;

use envelope_kernel_core::{CborDecode, CborEncode, Keypair};
use envelope_kernel::{Envelope, PredicateRegistry};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Text subject.
    pub subject: &'static str,
    /// Text predicate/object pairs added to the subject.
    pub assertions: &'static [(&'static str, &'static str)],
    /// Enclose before signing.
    pub enclose: bool,
    /// Seed of the signing key, if the vector is signed.
    pub signer_seed: Option<[u8; 32]>,
    /// Elide the subject after building.
    pub elide_subject: bool,
    /// Expected rendering with the well-known predicate names.
    pub expected_format: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "plaintext subject",
            subject: "Hello.",
            assertions: &[],
            enclose: false,
            signer_seed: None,
            elide_subject: false,
            expected_format: "\"Hello.\"",
        },
        GoldenVector {
            name: "two assertions",
            subject: "Alice",
            assertions: &[("knows", "Carol"), ("knows", "Bob")],
            enclose: false,
            signer_seed: None,
            elide_subject: false,
            expected_format: "\"Alice\" [\n    \"knows\": \"Bob\"\n    \"knows\": \"Carol\"\n]",
        },
        GoldenVector {
            name: "signed plaintext",
            subject: "Hello.",
            assertions: &[],
            enclose: false,
            signer_seed: Some([0xa1; 32]),
            elide_subject: false,
            expected_format: "\"Hello.\" [\n    verifiedBy: Signature\n]",
        },
        GoldenVector {
            name: "enclosed and signed",
            subject: "Hello.",
            assertions: &[],
            enclose: true,
            signer_seed: Some([0xa1; 32]),
            elide_subject: false,
            expected_format: "{\n    \"Hello.\"\n} [\n    verifiedBy: Signature\n]",
        },
        GoldenVector {
            name: "signed with elided subject",
            subject: "Hello.",
            assertions: &[],
            enclose: false,
            signer_seed: Some([0xa1; 32]),
            elide_subject: true,
            expected_format: "REDACTED [\n    verifiedBy: Signature\n]",
        },
        GoldenVector {
            name: "elided without assertions",
            subject: "Hello.",
            assertions: &[],
            enclose: false,
            signer_seed: None,
            elide_subject: true,
            expected_format: "REDACTED",
        },
    ]
}

/// Build the envelope a vector describes.
pub fn generate_envelope_from_vector(vector: &GoldenVector) -> Envelope {
    let mut envelope = vector
        .assertions
        .iter()
        .fold(Envelope::new(vector.subject), |e, (p, o)| e.add(*p, *o));
    if vector.enclose {
        envelope = envelope.enclose();
    }
    if let Some(seed) = &vector.signer_seed {
        envelope = envelope.sign(&Keypair::from_seed(seed));
    }
    if vector.elide_subject {
        envelope = envelope.redact_subject();
    }
    envelope
}

/// The outcome of checking one vector.
#[derive(Debug, Clone, Serialize)]
pub struct VectorReport {
    pub name: String,
    pub digest: String,
    pub cbor: String,
    /// Rendering matched `expected_format`.
    pub format_matches: bool,
    /// Decoding the CBOR reproduced the same bytes.
    pub roundtrip_matches: bool,
}

/// Check every vector.
pub fn verify_all_vectors() -> Vec<VectorReport> {
    let registry = PredicateRegistry::with_known_predicates();
    all_vectors()
        .iter()
        .map(|v| {
            let envelope = generate_envelope_from_vector(v);
            let bytes = envelope.to_cbor_bytes();
            let roundtrip_matches = Envelope::from_cbor_bytes(&bytes)
                .map(|decoded| decoded.to_cbor_bytes() == bytes)
                .unwrap_or(false);

            VectorReport {
                name: v.name.to_string(),
                digest: envelope.digest().to_hex(),
                cbor: hex::encode(&bytes),
                format_matches: envelope.format(&registry) == v.expected_format,
                roundtrip_matches,
            }
        })
        .collect()
}

/// The vector reports as pretty-printed JSON, for comparing against other
/// implementations.
pub fn report_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&verify_all_vectors())
}
