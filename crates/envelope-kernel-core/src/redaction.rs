//! Elision: removing content while keeping its digest.
//!
//! Any subtree can be replaced by an elided envelope carrying the same
//! digest, so every ancestor digest (and every signature over one) still
//! checks out. Compare [`Envelope::revoke`], which removes an assertion
//! and changes the digest.

use std::collections::{HashMap, HashSet};

use crate::assertion::Assertion;
use crate::digest::{Digest, DigestProvider};
use crate::envelope::Envelope;
use crate::subject::Subject;

impl Subject {
    /// Replace this subject with a reference to its digest.
    pub fn redact(&self) -> Subject {
        match self {
            Subject::Reference(_) => self.clone(),
            _ => Subject::reference(self.digest()),
        }
    }

    /// Elide this subject, or anything inside it, whose digest is in `items`.
    pub fn redact_items(&self, items: &HashSet<Digest>) -> Subject {
        match self {
            Subject::Envelope(envelope) => Subject::Envelope(envelope.redact_items(items)),
            Subject::Leaf(..) | Subject::Encrypted(..) if items.contains(&self.digest()) => {
                self.redact()
            }
            _ => self.clone(),
        }
    }

    /// Elide everything in this subject whose digest is not in `items`.
    pub fn redact_revealing(&self, items: &HashSet<Digest>) -> Subject {
        match self {
            Subject::Envelope(envelope) => Subject::Envelope(envelope.redact_revealing(items)),
            Subject::Leaf(..) | Subject::Encrypted(..) if !items.contains(&self.digest()) => {
                self.redact()
            }
            _ => self.clone(),
        }
    }

    pub fn deep_digests(&self) -> HashSet<Digest> {
        match self {
            Subject::Envelope(envelope) => envelope.deep_digests(),
            _ => HashSet::from([self.digest()]),
        }
    }
}

impl Assertion {
    /// Elide both the predicate and the object.
    pub fn redact(&self) -> Assertion {
        Assertion::new(
            Envelope::elided(self.predicate().digest()),
            Envelope::elided(self.object().digest()),
        )
    }

    pub fn redact_items(&self, items: &HashSet<Digest>) -> Assertion {
        if items.contains(&self.digest()) {
            return self.redact();
        }
        Assertion::new(
            self.predicate().redact_items(items),
            self.object().redact_items(items),
        )
    }

    pub fn redact_revealing(&self, items: &HashSet<Digest>) -> Assertion {
        if !items.contains(&self.digest()) {
            return self.redact();
        }
        Assertion::new(
            self.predicate().redact_revealing(items),
            self.object().redact_revealing(items),
        )
    }

    /// The digests needed to reveal this assertion's predicate and object
    /// but nothing nested below them.
    pub fn shallow_digests(&self) -> HashSet<Digest> {
        let mut result = HashSet::from([self.digest()]);
        result.extend(self.predicate().shallow_digests());
        result.extend(self.object().shallow_digests());
        result
    }

    pub fn deep_digests(&self) -> HashSet<Digest> {
        let mut result = HashSet::from([self.digest()]);
        result.extend(self.predicate().deep_digests());
        result.extend(self.object().deep_digests());
        result
    }
}

impl Envelope {
    /// Elide the whole envelope.
    pub fn redact(&self) -> Envelope {
        Envelope::elided(self.digest())
    }

    /// Elide the subject, keeping the assertions.
    ///
    /// An envelope without assertions is indistinguishable from its subject
    /// once elided, so in that case the whole envelope is elided.
    pub fn redact_subject(&self) -> Envelope {
        self.rebuild(self.subject().redact(), self.assertions().to_vec())
    }

    /// Elide every node whose digest is in `items`.
    pub fn redact_items(&self, items: &HashSet<Digest>) -> Envelope {
        if items.contains(&self.digest()) {
            return self.redact();
        }
        let subject = self.subject().redact_items(items);
        let assertions = self
            .assertions()
            .iter()
            .map(|a| a.redact_items(items))
            .collect();
        self.rebuild(subject, assertions)
    }

    /// Elide every node whose digest is not in `items`.
    pub fn redact_revealing(&self, items: &HashSet<Digest>) -> Envelope {
        if !items.contains(&self.digest()) {
            return self.redact();
        }
        let subject = self.subject().redact_revealing(items);
        let assertions = self
            .assertions()
            .iter()
            .map(|a| a.redact_revealing(items))
            .collect();
        self.rebuild(subject, assertions)
    }

    fn rebuild(&self, subject: Subject, assertions: Vec<Assertion>) -> Envelope {
        if assertions.is_empty() && subject.is_reference() {
            return self.redact();
        }
        Envelope::from_parts(subject, assertions)
    }

    /// This envelope's digest and its subject's digest.
    ///
    /// Passing these to [`Envelope::redact_revealing`] reveals the subject
    /// and elides every assertion.
    pub fn shallow_digests(&self) -> HashSet<Digest> {
        HashSet::from([self.digest(), self.subject().digest()])
    }

    /// Every digest in the tree rooted here.
    pub fn deep_digests(&self) -> HashSet<Digest> {
        let mut result = HashSet::from([self.digest()]);
        result.extend(self.subject().deep_digests());
        for assertion in self.assertions() {
            result.extend(assertion.deep_digests());
        }
        result
    }

    /// Put elided content back.
    ///
    /// Every elided node whose digest matches one of `known` is replaced by
    /// it; an elided subject is replaced by the subject of a known envelope
    /// with that subject digest. The result has the same digest.
    pub fn reveal(&self, known: &[Envelope]) -> Envelope {
        let by_digest: HashMap<Digest, &Envelope> = known.iter().map(|e| (e.digest(), e)).collect();
        let by_subject: HashMap<Digest, &Subject> = known
            .iter()
            .filter(|e| !e.subject().is_reference())
            .map(|e| (e.subject().digest(), e.subject()))
            .collect();
        self.reveal_with(&by_digest, &by_subject)
    }

    fn reveal_with(
        &self,
        by_digest: &HashMap<Digest, &Envelope>,
        by_subject: &HashMap<Digest, &Subject>,
    ) -> Envelope {
        if self.is_elided() {
            return match by_digest.get(&self.digest()) {
                Some(known) => (*known).clone(),
                None => self.clone(),
            };
        }
        let subject = match self.subject() {
            Subject::Reference(reference) => {
                let digest = reference.digest();
                if let Some(known) = by_subject.get(&digest) {
                    (*known).clone()
                } else if let Some(known) = by_digest.get(&digest) {
                    Subject::Envelope((*known).clone())
                } else {
                    self.subject().clone()
                }
            }
            Subject::Envelope(inner) => Subject::Envelope(inner.reveal_with(by_digest, by_subject)),
            other => other.clone(),
        };
        let assertions = self
            .assertions()
            .iter()
            .map(|a| {
                Assertion::new(
                    a.predicate().reveal_with(by_digest, by_subject),
                    a.object().reveal_with(by_digest, by_subject),
                )
            })
            .collect();
        Envelope::from_parts(subject, assertions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::CborEncode;
    use crate::encrypted::SymmetricKey;
    use crate::predicate::Predicate;

    fn alice() -> Envelope {
        Envelope::new("Alice")
            .add("knows", "Bob")
            .add("knows", "Carol")
            .add(Predicate::NOTE, "private")
    }

    #[test]
    fn test_redact_whole_envelope() {
        let envelope = alice();
        let redacted = envelope.redact();
        assert!(redacted.is_elided());
        assert_eq!(redacted.digest(), envelope.digest());
    }

    #[test]
    fn test_redact_subject_keeps_digest() {
        let envelope = alice();
        let redacted = envelope.redact_subject();
        assert!(redacted.subject().is_reference());
        assert_eq!(redacted.assertions().len(), 3);
        assert_eq!(redacted.digest(), envelope.digest());
    }

    #[test]
    fn test_redact_subject_without_assertions() {
        let envelope = Envelope::new("lonely");
        let redacted = envelope.redact_subject();
        assert!(redacted.is_elided());
        assert_eq!(redacted.digest(), envelope.digest());
    }

    #[test]
    fn test_redact_each_assertion_keeps_digest() {
        let envelope = alice();
        for assertion in envelope.assertions() {
            let redacted = envelope.redact_items(&HashSet::from([assertion.digest()]));
            assert_eq!(redacted.digest(), envelope.digest());
        }
    }

    #[test]
    fn test_redact_object_only() {
        let envelope = alice();
        let note = Envelope::new("private");
        let redacted = envelope.redact_items(&HashSet::from([note.digest()]));
        assert_eq!(redacted.digest(), envelope.digest());
        assert!(redacted
            .object_for_predicate(Predicate::NOTE)
            .unwrap()
            .is_elided());
    }

    #[test]
    fn test_redact_encrypted_subject() {
        let key = SymmetricKey::generate();
        let envelope = Envelope::new("secret").add("a", "b");
        let encrypted = envelope.encrypt(&key).unwrap();
        let redacted = encrypted.redact_items(&HashSet::from([envelope.subject().digest()]));
        assert!(redacted.subject().is_reference());
        assert_eq!(redacted.digest(), envelope.digest());
    }

    #[test]
    fn test_redact_revealing_subject_only() {
        let envelope = alice();
        let revealed = envelope.redact_revealing(&envelope.shallow_digests());

        assert_eq!(revealed.digest(), envelope.digest());
        assert_eq!(revealed.extract::<String>().unwrap(), "Alice");
        assert!(revealed
            .assertions()
            .iter()
            .all(|a| a.predicate().is_elided() && a.object().is_elided()));
    }

    #[test]
    fn test_redact_revealing_one_assertion() {
        let envelope = alice();
        let note = envelope.assertion_with_predicate(Predicate::NOTE).unwrap();

        let mut reveal = envelope.shallow_digests();
        reveal.extend(note.shallow_digests());
        let disclosed = envelope.redact_revealing(&reveal);

        assert_eq!(disclosed.digest(), envelope.digest());
        assert_eq!(
            disclosed.extract_object::<String>(Predicate::NOTE).unwrap(),
            "private"
        );
        // Elided predicates keep their digests, so lookups still find them
        let knows = disclosed.assertions_with_predicate("knows");
        assert_eq!(knows.len(), 2);
        assert!(knows.iter().all(|a| a.object().is_elided()));
    }

    #[test]
    fn test_deep_digests_reveal_everything() {
        let envelope = alice().enclose().add("wrapped", true);
        let revealed = envelope.redact_revealing(&envelope.deep_digests());
        assert_eq!(revealed.to_cbor_bytes(), envelope.to_cbor_bytes());
    }

    #[test]
    fn test_reveal_restores_elided_content() {
        let envelope = alice();
        let note = Envelope::new("private");
        let redacted = envelope.redact_items(&HashSet::from([note.digest()]));
        assert_ne!(redacted.to_cbor_bytes(), envelope.to_cbor_bytes());

        let restored = redacted.reveal(&[note]);
        assert_eq!(restored.digest(), envelope.digest());
        assert_eq!(restored.to_cbor_bytes(), envelope.to_cbor_bytes());
    }

    #[test]
    fn test_reveal_restores_elided_subject() {
        let envelope = alice();
        let redacted = envelope.redact_subject();
        let restored = redacted.reveal(&[Envelope::new("Alice")]);
        assert_eq!(restored.to_cbor_bytes(), envelope.to_cbor_bytes());
    }
}
