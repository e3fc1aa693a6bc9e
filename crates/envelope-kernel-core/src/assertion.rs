//! Predicate/object pairs attached to an envelope.

use ciborium::value::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::canonical::{expect_array, CborDecode, CborEncode};
use crate::digest::{Digest, DigestProvider};
use crate::envelope::Envelope;
use crate::error::{EnvelopeError, Result};

/// A claim about an envelope's subject.
///
/// The digest is `combine(predicate.digest, object.digest)`. Assertions
/// compare and order by digest.
#[derive(Clone)]
pub struct Assertion {
    predicate: Envelope,
    object: Envelope,
    digest: Digest,
}

impl Assertion {
    pub fn new(predicate: impl Into<Envelope>, object: impl Into<Envelope>) -> Self {
        let predicate = predicate.into();
        let object = object.into();
        let digest = Digest::combine([&predicate.digest(), &object.digest()]);
        Self {
            predicate,
            object,
            digest,
        }
    }

    pub fn predicate(&self) -> &Envelope {
        &self.predicate
    }

    pub fn object(&self) -> &Envelope {
        &self.object
    }
}

impl DigestProvider for Assertion {
    fn digest(&self) -> Digest {
        self.digest
    }
}

impl PartialEq for Assertion {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for Assertion {}

impl Hash for Assertion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digest.hash(state);
    }
}

impl PartialOrd for Assertion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Assertion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.digest.cmp(&other.digest)
    }
}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assertion")
            .field("predicate", &self.predicate)
            .field("object", &self.object)
            .finish()
    }
}

impl CborEncode for Assertion {
    fn to_cbor(&self) -> Value {
        Value::Array(vec![self.predicate.to_cbor(), self.object.to_cbor()])
    }
}

impl CborDecode for Assertion {
    fn from_cbor(value: &Value) -> Result<Self> {
        match expect_array(value, "assertion")? {
            [predicate, object] => Ok(Assertion::new(
                Envelope::from_cbor(predicate)?,
                Envelope::from_cbor(object)?,
            )),
            _ => Err(EnvelopeError::format("assertion: expected 2 elements")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;

    #[test]
    fn test_assertion_digest() {
        let assertion = Assertion::new(Predicate::NOTE, "World");
        let expected = Digest::combine([
            &Envelope::new(Predicate::NOTE).digest(),
            &Envelope::new("World").digest(),
        ]);
        assert_eq!(assertion.digest(), expected);
    }

    #[test]
    fn test_assertion_equality_by_digest() {
        let a = Assertion::new("knows", "Bob");
        let b = Assertion::new(Envelope::new("knows"), Envelope::new("Bob"));
        assert_eq!(a, b);
        assert_ne!(a, Assertion::new("knows", "Carol"));
    }

    #[test]
    fn test_assertion_cbor() {
        let assertion = Assertion::new(Predicate::ID, 42u64);
        let decoded = Assertion::from_cbor(&assertion.to_cbor()).unwrap();
        assert_eq!(decoded, assertion);
        assert_eq!(decoded.object().extract::<u64>().unwrap(), 42);
    }
}
