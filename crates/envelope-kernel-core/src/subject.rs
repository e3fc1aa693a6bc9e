//! The payload of an envelope node.

use ciborium::value::Value;

use crate::canonical::{
    encode_canonical, expect_array, expect_uint, normalize, CborDecode, CborEncode,
};
use crate::digest::{Digest, DigestProvider};
use crate::encrypted::{EncryptedMessage, Nonce, SymmetricKey};
use crate::envelope::Envelope;
use crate::error::{EnvelopeError, Result};
use crate::reference::{Identifier, Reference};

/// Subject discriminators on the wire.
mod kind {
    pub const PLAINTEXT: u64 = 1;
    pub const ENCRYPTED: u64 = 2;
    pub const REFERENCE: u64 = 3;
    pub const ENVELOPE: u64 = 4;
}

/// A plaintext value together with the digest of its canonical encoding.
///
/// Only [`Subject::leaf`] builds one, so the digest always matches the value.
#[derive(Debug, Clone)]
pub struct Leaf {
    value: Value,
    digest: Digest,
}

impl Leaf {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }
}

/// What an envelope is about.
///
/// Every variant exposes a digest, and encrypting or eliding a subject
/// never changes it.
#[derive(Debug, Clone)]
pub enum Subject {
    /// A plaintext value.
    Leaf(Leaf),
    /// A nested envelope.
    Envelope(Envelope),
    /// An encrypted leaf or envelope, with the digest of the plaintext
    /// subject.
    Encrypted(EncryptedMessage, Digest),
    /// Elided or external content, known only by digest.
    Reference(Reference),
}

impl Subject {
    /// A plaintext leaf.
    ///
    /// The value is first brought to the form it takes after a trip through
    /// the wire encoding, so a decoded leaf hashes the same bytes.
    pub fn leaf(value: Value) -> Self {
        let value = normalize(value);
        let digest = Digest::from_image(&encode_canonical(&value));
        Subject::Leaf(Leaf { value, digest })
    }

    /// A bare digest reference.
    pub fn reference(digest: Digest) -> Self {
        Subject::Reference(Reference::Digest(digest))
    }

    /// A reference that also names the identity it describes.
    pub fn identified_reference(id: Identifier, digest: Digest) -> Self {
        Subject::Reference(Reference::Identified { id, digest })
    }

    pub fn leaf_value(&self) -> Option<&Value> {
        match self {
            Subject::Leaf(leaf) => Some(leaf.value()),
            _ => None,
        }
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Subject::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Subject::Encrypted(..))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Subject::Reference(_))
    }

    /// Encrypt this subject with a fresh random nonce.
    pub fn encrypt(&self, key: &SymmetricKey) -> Result<Subject> {
        self.encrypt_with_nonce(key, Nonce::generate())
    }

    /// Encrypt this subject.
    ///
    /// The plaintext is the canonical encoding of the subject and its digest
    /// is bound as associated data. Encrypted and reference subjects cannot
    /// be encrypted again.
    pub fn encrypt_with_nonce(&self, key: &SymmetricKey, nonce: Nonce) -> Result<Subject> {
        match self {
            Subject::Leaf(..) | Subject::Envelope(_) => {
                let digest = self.digest();
                let plaintext = self.to_cbor_bytes();
                let message = key.encrypt_with_nonce(&plaintext, digest.as_bytes(), nonce)?;
                Ok(Subject::Encrypted(message, digest))
            }
            Subject::Encrypted(..) => Err(EnvelopeError::InvalidOperation(
                "subject is already encrypted".into(),
            )),
            Subject::Reference(_) => Err(EnvelopeError::InvalidOperation(
                "cannot encrypt an elided subject".into(),
            )),
        }
    }

    /// Decrypt an encrypted subject.
    ///
    /// Fails with [`EnvelopeError::InvalidKey`] if the key is wrong and with
    /// [`EnvelopeError::InvalidDigest`] if the plaintext does not hash to the
    /// digest the subject was carrying.
    pub fn decrypt(&self, key: &SymmetricKey) -> Result<Subject> {
        let (message, digest) = match self {
            Subject::Encrypted(message, digest) => (message, digest),
            _ => {
                return Err(EnvelopeError::InvalidOperation(
                    "subject is not encrypted".into(),
                ))
            }
        };

        let plaintext = key.decrypt(message)?;
        let subject = Subject::from_cbor_bytes(&plaintext)?;
        if !matches!(subject, Subject::Leaf(..) | Subject::Envelope(_)) {
            return Err(EnvelopeError::format(
                "encrypted payload must be a leaf or an envelope",
            ));
        }
        if subject.digest() != *digest {
            return Err(EnvelopeError::InvalidDigest);
        }
        Ok(subject)
    }
}

impl DigestProvider for Subject {
    fn digest(&self) -> Digest {
        match self {
            Subject::Leaf(leaf) => leaf.digest,
            Subject::Encrypted(_, digest) => *digest,
            Subject::Envelope(envelope) => envelope.digest(),
            Subject::Reference(reference) => reference.digest(),
        }
    }
}

impl PartialEq for Subject {
    fn eq(&self, other: &Self) -> bool {
        self.digest() == other.digest()
    }
}

impl Eq for Subject {}

impl CborEncode for Subject {
    fn to_cbor(&self) -> Value {
        let items = match self {
            Subject::Leaf(leaf) => {
                vec![Value::Integer(kind::PLAINTEXT.into()), leaf.value.clone()]
            }
            Subject::Encrypted(message, digest) => vec![
                Value::Integer(kind::ENCRYPTED.into()),
                message.to_cbor(),
                digest.to_cbor(),
            ],
            Subject::Reference(Reference::Digest(digest)) => {
                vec![Value::Integer(kind::REFERENCE.into()), digest.to_cbor()]
            }
            Subject::Reference(Reference::Identified { id, digest }) => vec![
                Value::Integer(kind::REFERENCE.into()),
                digest.to_cbor(),
                id.to_cbor(),
            ],
            Subject::Envelope(envelope) => {
                vec![Value::Integer(kind::ENVELOPE.into()), envelope.to_cbor()]
            }
        };
        Value::Array(items)
    }
}

impl CborDecode for Subject {
    fn from_cbor(value: &Value) -> Result<Self> {
        let items = expect_array(value, "subject")?;
        let (first, rest) = items
            .split_first()
            .ok_or_else(|| EnvelopeError::format("subject: empty array"))?;

        match expect_uint(first, "subject discriminator")? {
            kind::PLAINTEXT => match rest {
                [value] => Ok(Subject::leaf(value.clone())),
                _ => Err(EnvelopeError::format("plaintext subject: expected 1 element")),
            },
            kind::ENCRYPTED => match rest {
                [message, digest] => Ok(Subject::Encrypted(
                    EncryptedMessage::from_cbor(message)?,
                    Digest::from_cbor(digest)?,
                )),
                _ => Err(EnvelopeError::format("encrypted subject: expected 2 elements")),
            },
            kind::REFERENCE => match rest {
                [digest] => Ok(Subject::reference(Digest::from_cbor(digest)?)),
                [digest, id] => Ok(Subject::identified_reference(
                    Identifier::from_cbor(id)?,
                    Digest::from_cbor(digest)?,
                )),
                _ => Err(EnvelopeError::format(
                    "reference subject: expected 1 or 2 elements",
                )),
            },
            kind::ENVELOPE => match rest {
                [envelope] => Ok(Subject::Envelope(Envelope::from_cbor(envelope)?)),
                _ => Err(EnvelopeError::format("envelope subject: expected 1 element")),
            },
            other => Err(EnvelopeError::InvalidTag(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_digest_is_hash_of_canonical_encoding() {
        let subject = Subject::leaf(Value::Text("Hello".into()));
        assert_eq!(subject.digest(), Digest::from_image(&"Hello".to_cbor_bytes()));
        match &subject {
            Subject::Leaf(leaf) => {
                assert_eq!(leaf.digest(), Digest::from_image(&encode_canonical(leaf.value())));
            }
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    #[test]
    fn test_bignum_leaf_survives_roundtrip() {
        let small = Value::Tag(2, Box::new(Value::Bytes(vec![1])));
        let subject = Subject::leaf(small);
        let decoded = Subject::from_cbor_bytes(&subject.to_cbor_bytes()).unwrap();
        assert_eq!(decoded.digest(), subject.digest());
        assert_eq!(decoded.to_cbor_bytes(), subject.to_cbor_bytes());

        let negative = Value::Tag(3, Box::new(Value::Bytes(vec![0x01, 0x00])));
        let subject = Subject::leaf(negative);
        let decoded = Subject::from_cbor_bytes(&subject.to_cbor_bytes()).unwrap();
        assert_eq!(decoded.digest(), subject.digest());
    }

    #[test]
    fn test_bignum_leaf_decrypts() {
        let key = SymmetricKey::generate();
        let subject = Subject::leaf(Value::Tag(2, Box::new(Value::Bytes(vec![0x2a]))));
        let decrypted = subject.encrypt(&key).unwrap().decrypt(&key).unwrap();
        assert_eq!(decrypted.digest(), subject.digest());
    }

    #[test]
    fn test_encrypt_preserves_digest() {
        let key = SymmetricKey::generate();
        let subject = Subject::leaf(Value::Text("secret".into()));
        let encrypted = subject.encrypt(&key).unwrap();

        assert!(encrypted.is_encrypted());
        assert_eq!(encrypted.digest(), subject.digest());

        let decrypted = encrypted.decrypt(&key).unwrap();
        assert_eq!(decrypted.leaf_value(), subject.leaf_value());
    }

    #[test]
    fn test_encrypt_twice_is_invalid() {
        let key = SymmetricKey::generate();
        let encrypted = Subject::leaf(Value::Bool(true)).encrypt(&key).unwrap();
        assert!(matches!(
            encrypted.encrypt(&key),
            Err(EnvelopeError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_encrypt_reference_is_invalid() {
        let key = SymmetricKey::generate();
        let reference = Subject::reference(Digest::from_image(b"x"));
        assert!(matches!(
            reference.encrypt(&key),
            Err(EnvelopeError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_decrypt_plaintext_is_invalid() {
        let key = SymmetricKey::generate();
        assert!(matches!(
            Subject::leaf(Value::Null).decrypt(&key),
            Err(EnvelopeError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let subject = Subject::leaf(Value::Text("secret".into()));
        let encrypted = subject.encrypt(&SymmetricKey::generate()).unwrap();
        assert_eq!(
            encrypted.decrypt(&SymmetricKey::generate()).unwrap_err(),
            EnvelopeError::InvalidKey
        );
    }

    #[test]
    fn test_decrypt_detects_digest_substitution() {
        let key = SymmetricKey::generate();
        let subject = Subject::leaf(Value::Text("secret".into()));
        let message = key
            .encrypt(&subject.to_cbor_bytes(), Digest::from_image(b"other").as_bytes())
            .unwrap();
        let forged = Subject::Encrypted(message, Digest::from_image(b"other"));
        assert_eq!(forged.decrypt(&key).unwrap_err(), EnvelopeError::InvalidDigest);
    }

    #[test]
    fn test_unknown_discriminator() {
        let value = Value::Array(vec![Value::Integer(9.into()), Value::Null]);
        assert_eq!(
            Subject::from_cbor(&value).unwrap_err(),
            EnvelopeError::InvalidTag(9)
        );
    }

    #[test]
    fn test_identified_reference_roundtrip() {
        let subject =
            Subject::identified_reference(Identifier::from_bytes([4; 32]), Digest::from_image(b"d"));
        let decoded = Subject::from_cbor(&subject.to_cbor()).unwrap();
        match decoded {
            Subject::Reference(reference) => {
                assert_eq!(reference.identifier(), Some(&Identifier::from_bytes([4; 32])));
                assert_eq!(reference.digest(), Digest::from_image(b"d"));
            }
            other => panic!("expected reference, got {other:?}"),
        }
    }
}
