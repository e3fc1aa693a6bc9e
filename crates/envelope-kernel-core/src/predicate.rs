//! Well-known predicates and the predicate name registry.

use ciborium::value::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::canonical::{expect_tag, expect_uint, tagged, tags, CborDecode, CborEncode};
use crate::error::Result;

/// A numeric predicate, encoded as `tag(59, n)`.
///
/// Numeric predicates keep assertions compact; free-form predicates can
/// still be expressed as any other leaf (usually text).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Predicate(pub u64);

impl Predicate {
    pub const ID: Self = Self(1);
    pub const IS_A: Self = Self(2);
    pub const VERIFIED_BY: Self = Self(3);
    pub const NOTE: Self = Self(4);
    pub const HAS_RECIPIENT: Self = Self(5);
    pub const SSKR_SHARE: Self = Self(6);
    pub const CONTROLLER: Self = Self(7);
    pub const PUBLIC_KEYS: Self = Self(8);
    pub const DEREFERENCE_VIA: Self = Self(9);
    pub const ENTITY: Self = Self(10);
    pub const HAS_NAME: Self = Self(11);
    pub const LANGUAGE: Self = Self(12);
    pub const ISSUER: Self = Self(13);
    pub const HOLDER: Self = Self(14);

    const KNOWN: [(Predicate, &'static str); 14] = [
        (Self::ID, "id"),
        (Self::IS_A, "isA"),
        (Self::VERIFIED_BY, "verifiedBy"),
        (Self::NOTE, "note"),
        (Self::HAS_RECIPIENT, "hasRecipient"),
        (Self::SSKR_SHARE, "sskrShare"),
        (Self::CONTROLLER, "controller"),
        (Self::PUBLIC_KEYS, "publicKeys"),
        (Self::DEREFERENCE_VIA, "dereferenceVia"),
        (Self::ENTITY, "entity"),
        (Self::HAS_NAME, "hasName"),
        (Self::LANGUAGE, "language"),
        (Self::ISSUER, "issuer"),
        (Self::HOLDER, "holder"),
    ];
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.0)
    }
}

impl CborEncode for Predicate {
    fn to_cbor(&self) -> Value {
        tagged(tags::PREDICATE, Value::Integer(self.0.into()))
    }
}

impl CborDecode for Predicate {
    fn from_cbor(value: &Value) -> Result<Self> {
        let inner = expect_tag(value, tags::PREDICATE)?;
        Ok(Self(expect_uint(inner, "predicate")?))
    }
}

/// Names for numeric predicates, used when rendering envelopes.
///
/// Build one with [`PredicateRegistry::with_known_predicates`], add any
/// application predicates, and pass it by reference to whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct PredicateRegistry {
    names: BTreeMap<Predicate, String>,
}

impl PredicateRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the well-known predicates.
    pub fn with_known_predicates() -> Self {
        let mut registry = Self::new();
        for (predicate, name) in Predicate::KNOWN {
            registry.insert(predicate, name);
        }
        registry
    }

    /// Register (or rename) a predicate.
    pub fn insert(&mut self, predicate: Predicate, name: impl Into<String>) {
        self.names.insert(predicate, name.into());
    }

    pub fn name(&self, predicate: Predicate) -> Option<&str> {
        self.names.get(&predicate).map(String::as_str)
    }

    /// Reverse lookup by name.
    pub fn predicate(&self, name: &str) -> Option<Predicate> {
        self.names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(p, _)| *p)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_predicates() {
        let registry = PredicateRegistry::with_known_predicates();
        assert_eq!(registry.len(), 14);
        assert_eq!(registry.name(Predicate::VERIFIED_BY), Some("verifiedBy"));
        assert_eq!(registry.predicate("holder"), Some(Predicate::HOLDER));
        assert_eq!(registry.name(Predicate(99)), None);
    }

    #[test]
    fn test_application_predicates() {
        let mut registry = PredicateRegistry::with_known_predicates();
        registry.insert(Predicate(100), "dateOfBirth");
        assert_eq!(registry.name(Predicate(100)), Some("dateOfBirth"));
        assert!(PredicateRegistry::new().is_empty());
    }

    #[test]
    fn test_predicate_cbor() {
        let bytes = Predicate::NOTE.to_cbor_bytes();
        assert_eq!(bytes, vec![0xd8, 59, 0x04]);
        assert_eq!(Predicate::from_cbor_bytes(&bytes).unwrap(), Predicate::NOTE);
    }
}
