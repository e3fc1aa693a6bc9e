//! The envelope: a subject plus a canonically ordered set of assertions.
//!
//! Envelopes are immutable. Every operation returns a new envelope and
//! shares unchanged subtrees with the original through an `Arc`.

use ciborium::value::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::assertion::Assertion;
use crate::canonical::{expect_array, expect_tag, tagged, tags, CborDecode, CborEncode};
use crate::crypto::Signature;
use crate::digest::{Digest, DigestProvider};
use crate::encrypted::SymmetricKey;
use crate::error::{EnvelopeError, Result};
use crate::predicate::Predicate;
use crate::reference::{Identifier, Reference};
use crate::subject::Subject;

/// A node in the envelope tree.
///
/// The digest is `combine(subject.digest, assertion digests in ascending
/// order)`. An envelope whose subject is a reference and which carries no
/// assertions is an *elided* envelope, and its digest is the reference's
/// digest.
#[derive(Clone)]
pub struct Envelope(Arc<Node>);

struct Node {
    subject: Subject,
    assertions: Vec<Assertion>,
    digest: Digest,
}

impl Envelope {
    /// Wrap anything convertible to an envelope.
    ///
    /// Plain values become leaf subjects; an envelope is returned as is
    /// (use [`Envelope::enclose`] to nest one).
    pub fn new(subject: impl Into<Envelope>) -> Self {
        subject.into()
    }

    /// An envelope with a plaintext leaf subject.
    pub fn leaf<T: CborEncode + ?Sized>(value: &T) -> Self {
        Self::from_subject(Subject::leaf(value.to_cbor()))
    }

    /// An envelope with the given subject and no assertions.
    pub fn from_subject(subject: Subject) -> Self {
        Self::from_parts(subject, Vec::new())
    }

    /// An envelope whose subject is a well-known predicate.
    pub fn from_predicate(predicate: Predicate) -> Self {
        Self::leaf(&predicate)
    }

    /// An elided envelope standing in for content with `digest`.
    pub fn elided(digest: Digest) -> Self {
        Self::from_subject(Subject::reference(digest))
    }

    /// An envelope whose subject is an identified reference.
    pub fn identified(id: Identifier, digest: Digest) -> Self {
        Self::from_subject(Subject::identified_reference(id, digest))
    }

    pub(crate) fn from_parts(subject: Subject, mut assertions: Vec<Assertion>) -> Self {
        assertions.sort();
        assertions.dedup();
        let digest = Self::compute_digest(&subject, &assertions);
        Self(Arc::new(Node {
            subject,
            assertions,
            digest,
        }))
    }

    fn compute_digest(subject: &Subject, assertions: &[Assertion]) -> Digest {
        if assertions.is_empty() {
            if let Subject::Reference(reference) = subject {
                return reference.digest();
            }
        }
        let mut digests = Vec::with_capacity(assertions.len() + 1);
        digests.push(subject.digest());
        digests.extend(assertions.iter().map(Assertion::digest));
        Digest::combine(&digests)
    }

    /// Replace the subject, keeping the assertions.
    pub(crate) fn with_subject(&self, subject: Subject) -> Self {
        Self::from_parts(subject, self.0.assertions.clone())
    }

    /// Replace the assertions, keeping the subject.
    pub(crate) fn with_assertions(&self, assertions: Vec<Assertion>) -> Self {
        Self::from_parts(self.0.subject.clone(), assertions)
    }

    pub fn subject(&self) -> &Subject {
        &self.0.subject
    }

    /// The assertions in canonical (ascending digest) order.
    pub fn assertions(&self) -> &[Assertion] {
        &self.0.assertions
    }

    /// True for an elided envelope: a reference subject and no assertions.
    pub fn is_elided(&self) -> bool {
        self.0.assertions.is_empty() && self.0.subject.is_reference()
    }

    pub fn is_encrypted(&self) -> bool {
        self.0.subject.is_encrypted()
    }

    /// The plaintext leaf value, if the subject is a leaf.
    pub fn leaf_value(&self) -> Option<&Value> {
        self.0.subject.leaf_value()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Building
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a `predicate: object` assertion.
    pub fn add(&self, predicate: impl Into<Envelope>, object: impl Into<Envelope>) -> Self {
        self.add_assertion(Assertion::new(predicate, object))
    }

    /// Add an assertion. Adding one already present is a no-op.
    pub fn add_assertion(&self, assertion: Assertion) -> Self {
        if self.0.assertions.contains(&assertion) {
            return self.clone();
        }
        let mut assertions = self.0.assertions.clone();
        assertions.push(assertion);
        self.with_assertions(assertions)
    }

    pub fn add_assertions(&self, assertions: impl IntoIterator<Item = Assertion>) -> Self {
        let mut all = self.0.assertions.clone();
        all.extend(assertions);
        self.with_assertions(all)
    }

    /// Add the assertion only when `condition` holds.
    pub fn add_if(
        &self,
        condition: bool,
        predicate: impl Into<Envelope>,
        object: impl Into<Envelope>,
    ) -> Self {
        if condition {
            self.add(predicate, object)
        } else {
            self.clone()
        }
    }

    /// Remove the assertion with `digest`.
    ///
    /// Unlike elision this changes the envelope's digest. Removing an
    /// assertion that is not present is a no-op.
    pub fn revoke(&self, digest: &Digest) -> Self {
        if !self.0.assertions.iter().any(|a| a.digest() == *digest) {
            return self.clone();
        }
        let assertions = self
            .0
            .assertions
            .iter()
            .filter(|a| a.digest() != *digest)
            .cloned()
            .collect();
        self.with_assertions(assertions)
    }

    /// Nest this envelope as the subject of a new, assertion-free envelope,
    /// so further assertions apply to the whole of it.
    pub fn enclose(&self) -> Self {
        Self::from_subject(Subject::Envelope(self.clone()))
    }

    /// Inverse of [`Envelope::enclose`].
    pub fn extract_envelope(&self) -> Result<Envelope> {
        self.0
            .subject
            .envelope()
            .cloned()
            .ok_or_else(|| EnvelopeError::format("subject is not an envelope"))
    }

    /// Decode the leaf subject as `T`.
    pub fn extract<T: CborDecode>(&self) -> Result<T> {
        match &self.0.subject {
            Subject::Leaf(leaf) => T::from_cbor(leaf.value()),
            _ => Err(EnvelopeError::format("subject is not a plaintext leaf")),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// All assertions whose predicate has the digest of `predicate`.
    pub fn assertions_with_predicate(&self, predicate: impl Into<Envelope>) -> Vec<Assertion> {
        let digest = predicate.into().digest();
        self.0
            .assertions
            .iter()
            .filter(|a| a.predicate().digest() == digest)
            .cloned()
            .collect()
    }

    /// The single assertion with `predicate`.
    ///
    /// Fails with [`EnvelopeError::AmbiguousOrMissingAssertion`] unless
    /// exactly one matches.
    pub fn assertion_with_predicate(&self, predicate: impl Into<Envelope>) -> Result<Assertion> {
        let mut matches = self.assertions_with_predicate(predicate);
        if matches.len() != 1 {
            return Err(EnvelopeError::AmbiguousOrMissingAssertion {
                count: matches.len(),
            });
        }
        Ok(matches.remove(0))
    }

    /// The object of the single assertion with `predicate`.
    pub fn object_for_predicate(&self, predicate: impl Into<Envelope>) -> Result<Envelope> {
        Ok(self.assertion_with_predicate(predicate)?.object().clone())
    }

    /// The objects of every assertion with `predicate`.
    pub fn objects_for_predicate(&self, predicate: impl Into<Envelope>) -> Vec<Envelope> {
        self.assertions_with_predicate(predicate)
            .into_iter()
            .map(|a| a.object().clone())
            .collect()
    }

    /// Decode the object of the single assertion with `predicate`.
    pub fn extract_object<T: CborDecode>(&self, predicate: impl Into<Envelope>) -> Result<T> {
        self.object_for_predicate(predicate)?.extract()
    }
}

impl DigestProvider for Envelope {
    fn digest(&self) -> Digest {
        self.0.digest
    }
}

impl Envelope {
    pub fn digest(&self) -> Digest {
        self.0.digest
    }
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.0.digest == other.0.digest
    }
}

impl Eq for Envelope {}

impl Hash for Envelope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.digest.hash(state);
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("digest", &self.0.digest)
            .field("subject", &self.0.subject)
            .field("assertions", &self.0.assertions)
            .finish()
    }
}

impl CborEncode for Envelope {
    fn to_cbor(&self) -> Value {
        let mut items = Vec::with_capacity(self.0.assertions.len() + 1);
        items.push(self.0.subject.to_cbor());
        items.extend(self.0.assertions.iter().map(CborEncode::to_cbor));
        tagged(tags::ENVELOPE, Value::Array(items))
    }
}

impl CborDecode for Envelope {
    fn from_cbor(value: &Value) -> Result<Self> {
        let items = expect_array(expect_tag(value, tags::ENVELOPE)?, "envelope")?;
        let (subject, assertions) = items
            .split_first()
            .ok_or_else(|| EnvelopeError::format("envelope: empty array"))?;
        let subject = Subject::from_cbor(subject)?;
        let assertions = assertions
            .iter()
            .map(Assertion::from_cbor)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_parts(subject, assertions))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversions into envelopes
// ─────────────────────────────────────────────────────────────────────────────

impl From<&Envelope> for Envelope {
    fn from(envelope: &Envelope) -> Self {
        envelope.clone()
    }
}

impl From<Subject> for Envelope {
    fn from(subject: Subject) -> Self {
        Envelope::from_subject(subject)
    }
}

impl From<Reference> for Envelope {
    fn from(reference: Reference) -> Self {
        Envelope::from_subject(Subject::Reference(reference))
    }
}

macro_rules! impl_envelope_from_leaf {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Envelope {
                fn from(value: $t) -> Self {
                    Envelope::leaf(&value)
                }
            }
        )*
    };
}

impl_envelope_from_leaf!(
    String, bool, u8, u16, u32, u64, i8, i16, i32, i64, Vec<u8>, Value, Digest, Identifier,
    Predicate, Signature, SymmetricKey
);

impl From<&str> for Envelope {
    fn from(value: &str) -> Self {
        Envelope::leaf(value)
    }
}

impl From<&String> for Envelope {
    fn from(value: &String) -> Self {
        Envelope::leaf(value)
    }
}

impl From<&[u8]> for Envelope {
    fn from(value: &[u8]) -> Self {
        Envelope::leaf(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello() -> Envelope {
        Envelope::new("Hello")
    }

    #[test]
    fn test_leaf_envelope_digest() {
        let envelope = hello();
        let subject_digest = Digest::from_image(&"Hello".to_cbor_bytes());
        assert_eq!(envelope.subject().digest(), subject_digest);
        assert_eq!(envelope.digest(), Digest::combine([&subject_digest]));
    }

    #[test]
    fn test_from_predicate() {
        let envelope = Envelope::from_predicate(Predicate::NOTE);
        assert_eq!(envelope.digest(), Envelope::new(Predicate::NOTE).digest());
        assert_eq!(envelope.extract::<Predicate>().unwrap(), Predicate::NOTE);
    }

    #[test]
    fn test_assertion_order_independent() {
        let id = Identifier::from_bytes([0x11; 32]);
        let a = hello().add(Predicate::NOTE, "World").add(Predicate::ID, id);
        let b = hello().add(Predicate::ID, id).add(Predicate::NOTE, "World");
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.to_cbor_bytes(), b.to_cbor_bytes());
    }

    #[test]
    fn test_assertions_sorted_by_digest() {
        let envelope = hello()
            .add("a", 1u64)
            .add("b", 2u64)
            .add("c", 3u64)
            .add("d", 4u64);
        let digests: Vec<_> = envelope.assertions().iter().map(|a| a.digest()).collect();
        let mut sorted = digests.clone();
        sorted.sort();
        assert_eq!(digests, sorted);
    }

    #[test]
    fn test_duplicate_assertion_is_noop() {
        let once = hello().add(Predicate::NOTE, "World");
        let twice = once.add(Predicate::NOTE, "World");
        assert_eq!(once.digest(), twice.digest());
        assert_eq!(twice.assertions().len(), 1);
    }

    #[test]
    fn test_revoke_changes_digest() {
        let envelope = hello().add(Predicate::NOTE, "World").add("knows", "Bob");
        let target = Assertion::new(Predicate::NOTE, "World");
        let revoked = envelope.revoke(&target.digest());

        assert_ne!(revoked.digest(), envelope.digest());
        assert_eq!(revoked.assertions().len(), 1);
        assert_eq!(revoked.digest(), hello().add("knows", "Bob").digest());

        // Unknown digest leaves the envelope alone
        let same = envelope.revoke(&Digest::from_image(b"nothing"));
        assert_eq!(same.digest(), envelope.digest());
    }

    #[test]
    fn test_enclose_extract() {
        let inner = hello().add(Predicate::NOTE, "World");
        let outer = inner.enclose();
        assert_eq!(outer.subject().digest(), inner.digest());
        assert_ne!(outer.digest(), inner.digest());
        assert_eq!(outer.extract_envelope().unwrap(), inner);
        assert!(hello().extract_envelope().is_err());
    }

    #[test]
    fn test_extract_leaf() {
        assert_eq!(hello().extract::<String>().unwrap(), "Hello");
        assert!(hello().extract::<u64>().is_err());
        assert_eq!(Envelope::new(42u64).extract::<u64>().unwrap(), 42);
    }

    #[test]
    fn test_predicate_lookup() {
        let envelope = Envelope::new("Alice")
            .add("knows", "Bob")
            .add("knows", "Carol")
            .add(Predicate::NOTE, "friendly");

        assert_eq!(envelope.assertions_with_predicate("knows").len(), 2);
        assert_eq!(envelope.assertions_with_predicate("hates").len(), 0);
        assert_eq!(
            envelope.extract_object::<String>(Predicate::NOTE).unwrap(),
            "friendly"
        );
        assert_eq!(
            envelope.assertion_with_predicate("knows").unwrap_err(),
            EnvelopeError::AmbiguousOrMissingAssertion { count: 2 }
        );
        assert_eq!(
            envelope.assertion_with_predicate("hates").unwrap_err(),
            EnvelopeError::AmbiguousOrMissingAssertion { count: 0 }
        );
    }

    #[test]
    fn test_elided_envelope_digest() {
        let original = hello().add(Predicate::NOTE, "World");
        let elided = Envelope::elided(original.digest());
        assert!(elided.is_elided());
        assert_eq!(elided.digest(), original.digest());
    }

    #[test]
    fn test_cbor_roundtrip() {
        let envelope = hello()
            .add(Predicate::NOTE, "World")
            .add(Predicate::ID, Identifier::from_bytes([3; 32]))
            .enclose()
            .add("wrapped", true);

        let bytes = envelope.to_cbor_bytes();
        let decoded = Envelope::from_cbor_bytes(&bytes).unwrap();
        assert_eq!(decoded.digest(), envelope.digest());
        assert_eq!(decoded.to_cbor_bytes(), bytes);
    }

    #[test]
    fn test_decode_wrong_tag() {
        let bytes = Digest::from_image(b"x").to_cbor_bytes();
        assert_eq!(
            Envelope::from_cbor_bytes(&bytes).unwrap_err(),
            EnvelopeError::InvalidTag(tags::DIGEST)
        );
    }

    #[test]
    fn test_decode_bad_shape() {
        let value = tagged(tags::ENVELOPE, Value::Array(vec![]));
        assert!(matches!(
            Envelope::from_cbor(&value),
            Err(EnvelopeError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_structural_sharing() {
        let inner = hello().add(Predicate::NOTE, "World");
        let outer = inner.enclose();
        let extracted = outer.extract_envelope().unwrap();
        assert!(Arc::ptr_eq(&inner.0, &extracted.0));
    }

    mod properties {
        use std::collections::HashSet;

        use proptest::prelude::*;

        use super::*;
        use crate::encrypted::SymmetricKey;

        fn pairs() -> impl Strategy<Value = Vec<(String, String)>> {
            prop::collection::vec(("[a-z]{1,8}", "[a-zA-Z0-9 ]{0,16}"), 0..6)
        }

        fn build(subject: &str, pairs: &[(String, String)]) -> Envelope {
            pairs
                .iter()
                .fold(Envelope::new(subject), |e, (p, o)| e.add(p.as_str(), o.as_str()))
        }

        proptest! {
            #[test]
            fn digest_ignores_assertion_order(subject in "[a-z]{1,12}", pairs in pairs()) {
                let forward = build(&subject, &pairs);
                let mut reversed_pairs = pairs.clone();
                reversed_pairs.reverse();
                let reversed = build(&subject, &reversed_pairs);

                prop_assert_eq!(forward.digest(), reversed.digest());
                prop_assert_eq!(forward.to_cbor_bytes(), reversed.to_cbor_bytes());
            }

            #[test]
            fn duplicate_assertions_collapse(subject in "[a-z]{1,12}", pairs in pairs()) {
                let once = build(&subject, &pairs);
                let twice = build(&subject, &[pairs.clone(), pairs.clone()].concat());
                prop_assert_eq!(once.digest(), twice.digest());
                prop_assert_eq!(once.assertions().len(), twice.assertions().len());
            }

            #[test]
            fn elision_keeps_digest(
                subject in "[a-z]{1,12}",
                pairs in pairs(),
                pick in any::<prop::sample::Index>(),
            ) {
                let envelope = build(&subject, &pairs);
                let digests: Vec<Digest> = envelope.deep_digests().into_iter().collect();
                let target = digests[pick.index(digests.len())];

                let redacted = envelope.redact_items(&HashSet::from([target]));
                prop_assert_eq!(redacted.digest(), envelope.digest());

                let decoded = Envelope::from_cbor_bytes(&redacted.to_cbor_bytes()).unwrap();
                prop_assert_eq!(decoded.digest(), envelope.digest());
            }

            #[test]
            fn encryption_roundtrip(
                subject in "[a-z]{1,12}",
                pairs in pairs(),
                key_bytes in any::<[u8; 32]>(),
            ) {
                let key = SymmetricKey::from_bytes(key_bytes);
                let envelope = build(&subject, &pairs);
                let encrypted = envelope.encrypt(&key).unwrap();
                prop_assert_eq!(encrypted.digest(), envelope.digest());

                let decrypted = encrypted.decrypt(&key).unwrap();
                prop_assert_eq!(decrypted.to_cbor_bytes(), envelope.to_cbor_bytes());
            }
        }
    }
}
