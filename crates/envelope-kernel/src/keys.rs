//! Key bases: one party's signing and agreement keys together.

use ciborium::value::Value;

use envelope_kernel_core::canonical::{
    expect_array, expect_discriminator, expect_fixed_bytes, expect_tag, tagged, tags,
};
use envelope_kernel_core::{CborDecode, CborEncode, Ed25519PublicKey, Envelope, EnvelopeError, Keypair};
use envelope_kernel_perms::{X25519PublicKey, X25519StaticSecret};

/// A party's private keys: Ed25519 for signing, X25519 for receiving
/// sealed messages.
#[derive(Debug, Clone)]
pub struct PrivateKeyBase {
    signing: Keypair,
    agreement: X25519StaticSecret,
}

impl PrivateKeyBase {
    /// Generate fresh random keys.
    pub fn generate() -> Self {
        Self {
            signing: Keypair::generate(),
            agreement: X25519StaticSecret::generate(),
        }
    }

    /// Build from two independent 32-byte seeds.
    pub fn from_seeds(signing_seed: &[u8; 32], agreement_seed: [u8; 32]) -> Self {
        Self {
            signing: Keypair::from_seed(signing_seed),
            agreement: X25519StaticSecret::from_bytes(agreement_seed),
        }
    }

    pub fn signing_keypair(&self) -> &Keypair {
        &self.signing
    }

    pub fn agreement_secret(&self) -> &X25519StaticSecret {
        &self.agreement
    }

    pub fn public_keys(&self) -> PublicKeyBase {
        PublicKeyBase::new(self.signing.public_key(), self.agreement.public_key())
    }
}

/// The public half of a [`PrivateKeyBase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyBase {
    signing: Ed25519PublicKey,
    agreement: X25519PublicKey,
}

impl PublicKeyBase {
    const VERSION: u64 = 1;

    pub fn new(signing: Ed25519PublicKey, agreement: X25519PublicKey) -> Self {
        Self { signing, agreement }
    }

    /// Key that verifies this party's signatures.
    pub fn signing(&self) -> &Ed25519PublicKey {
        &self.signing
    }

    /// Key that messages are sealed to.
    pub fn agreement(&self) -> &X25519PublicKey {
        &self.agreement
    }
}

impl CborEncode for PublicKeyBase {
    fn to_cbor(&self) -> Value {
        tagged(
            tags::PUBLIC_KEY_BASE,
            Value::Array(vec![
                Value::Integer(Self::VERSION.into()),
                Value::Bytes(self.signing.as_bytes().to_vec()),
                Value::Bytes(self.agreement.as_bytes().to_vec()),
            ]),
        )
    }
}

impl CborDecode for PublicKeyBase {
    fn from_cbor(value: &Value) -> envelope_kernel_core::Result<Self> {
        let items = expect_array(expect_tag(value, tags::PUBLIC_KEY_BASE)?, "public key base")?;
        if items.len() != 3 {
            return Err(EnvelopeError::format("public key base: expected 3 elements"));
        }
        expect_discriminator(&items[0], Self::VERSION)?;
        Ok(Self {
            signing: Ed25519PublicKey::from_bytes(expect_fixed_bytes::<32>(
                &items[1],
                "signing key",
            )?),
            agreement: X25519PublicKey::from_bytes(expect_fixed_bytes::<32>(
                &items[2],
                "agreement key",
            )?),
        })
    }
}

impl From<PublicKeyBase> for Envelope {
    fn from(keys: PublicKeyBase) -> Self {
        Envelope::leaf(&keys)
    }
}

#[cfg(test)]
mod tests {
    use envelope_kernel_core::{Predicate, PredicateRegistry};

    use super::*;

    #[test]
    fn test_from_seeds_is_deterministic() {
        let a = PrivateKeyBase::from_seeds(&[1; 32], [2; 32]);
        let b = PrivateKeyBase::from_seeds(&[1; 32], [2; 32]);
        assert_eq!(a.public_keys(), b.public_keys());
        assert_ne!(a.public_keys(), PrivateKeyBase::generate().public_keys());
    }

    #[test]
    fn test_public_key_base_cbor() {
        let keys = PrivateKeyBase::from_seeds(&[3; 32], [4; 32]).public_keys();
        let bytes = keys.to_cbor_bytes();
        assert_eq!(&bytes[..2], &[0xd8, 51]);
        assert_eq!(PublicKeyBase::from_cbor_bytes(&bytes).unwrap(), keys);
    }

    #[test]
    fn test_public_keys_as_assertion_object() {
        let keys = PrivateKeyBase::from_seeds(&[5; 32], [6; 32]).public_keys();
        let envelope = Envelope::new("Alice").add(Predicate::PUBLIC_KEYS, keys);

        assert_eq!(
            envelope.extract_object::<PublicKeyBase>(Predicate::PUBLIC_KEYS).unwrap(),
            keys
        );
        let formatted = envelope.format(&PredicateRegistry::with_known_predicates());
        assert_eq!(formatted, "\"Alice\" [\n    publicKeys: PublicKeyBase\n]");
    }
}
