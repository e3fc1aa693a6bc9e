//! Test fixtures and helpers.
//!
//! Deterministic parties for integration tests. Alice, Bob, and Carol
//! always have the same keys, so signatures over the same content are
//! byte-identical from run to run.

use rand::RngCore;

use envelope_kernel::{
    Envelope, Identifier, Kernel, KernelConfig, Predicate, PrivateKeyBase, PublicKeyBase, Result,
};

/// A named party with deterministic keys.
#[derive(Debug)]
pub struct TestFixture {
    pub name: String,
    pub keys: PrivateKeyBase,
    pub kernel: Kernel,
}

impl TestFixture {
    /// Create a fixture with random keys.
    pub fn new(name: &str) -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::with_seed(name, seed)
    }

    /// Create with deterministic keys from a seed.
    ///
    /// The agreement key is seeded with the complement of `seed`.
    pub fn with_seed(name: &str, seed: [u8; 32]) -> Self {
        let keys = PrivateKeyBase::from_seeds(&seed, seed.map(|b| !b));
        Self {
            name: name.to_string(),
            kernel: Kernel::new(keys.clone(), KernelConfig::default()),
            keys,
        }
    }

    pub fn alice() -> Self {
        Self::with_seed("Alice", [0xa1; 32])
    }

    pub fn bob() -> Self {
        Self::with_seed("Bob", [0xb0; 32])
    }

    pub fn carol() -> Self {
        Self::with_seed("Carol", [0xc0; 32])
    }

    pub fn public_keys(&self) -> PublicKeyBase {
        self.keys.public_keys()
    }

    /// A stable identifier for this party, derived from its name.
    pub fn identifier(&self) -> Identifier {
        let mut bytes = [0u8; 32];
        for (slot, b) in bytes.iter_mut().zip(self.name.bytes().cycle()) {
            *slot = b;
        }
        Identifier::from_bytes(bytes)
    }

    /// `subject`, signed by this party.
    pub fn make_signed(&self, subject: &str) -> Envelope {
        self.kernel.sign(&Envelope::new(subject))
    }

    /// `subject`, signed by this party and sealed to `recipients`.
    pub fn make_sealed(&self, subject: &str, recipients: &[&TestFixture]) -> Result<Envelope> {
        let keys: Vec<PublicKeyBase> = recipients.iter().map(|r| r.public_keys()).collect();
        self.kernel.seal_to(&self.make_signed(subject), &keys)
    }

    /// A credential issued by this party about `holder`, enclosed and signed.
    pub fn make_credential(&self, holder: &TestFixture, claims: &[(&str, &str)]) -> Envelope {
        let body = claims.iter().fold(
            Envelope::new(holder.identifier())
                .add(Predicate::ISSUER, self.name.as_str())
                .add(Predicate::HOLDER, holder.name.as_str()),
            |envelope, (predicate, object)| envelope.add(*predicate, *object),
        );
        self.kernel.sign(&body.enclose())
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(&format!("party-{i}"), seed)
        })
        .collect()
}
