//! Proptest generators for property-based testing.

use proptest::prelude::*;

use envelope_kernel_core::{Ed25519PublicKey, Keypair};
use envelope_kernel::{Digest, Envelope, Identifier, Predicate, SymmetricKey};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random Ed25519PublicKey.
pub fn public_key() -> impl Strategy<Value = Ed25519PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate a random content key.
pub fn symmetric_key() -> impl Strategy<Value = SymmetricKey> {
    any::<[u8; 32]>().prop_map(SymmetricKey::from_bytes)
}

pub fn digest() -> impl Strategy<Value = Digest> {
    any::<[u8; 32]>().prop_map(Digest::from_bytes)
}

pub fn identifier() -> impl Strategy<Value = Identifier> {
    any::<[u8; 32]>().prop_map(Identifier::from_bytes)
}

/// A well-known predicate or an application-defined one.
pub fn predicate() -> impl Strategy<Value = Predicate> {
    prop_oneof![
        (1u64..=14).prop_map(Predicate),
        (1000u64..=2000).prop_map(Predicate),
    ]
}

/// Short printable text, suitable for subjects and objects.
pub fn text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 .,]{0,24}".prop_map(String::from)
}

/// The shape of an assertion's predicate.
#[derive(Debug, Clone)]
pub enum PredicateParam {
    Known(Predicate),
    Text(String),
}

/// The shape of an assertion's object.
#[derive(Debug, Clone)]
pub enum ObjectParam {
    Text(String),
    Number(u64),
    Identifier(Identifier),
}

fn predicate_param() -> impl Strategy<Value = PredicateParam> {
    prop_oneof![
        predicate().prop_map(PredicateParam::Known),
        "[a-z][a-zA-Z]{0,11}".prop_map(PredicateParam::Text),
    ]
}

fn object_param() -> impl Strategy<Value = ObjectParam> {
    prop_oneof![
        text().prop_map(ObjectParam::Text),
        any::<u64>().prop_map(ObjectParam::Number),
        identifier().prop_map(ObjectParam::Identifier),
    ]
}

/// Parameters for generating an envelope.
#[derive(Debug, Clone)]
pub struct EnvelopeParams {
    pub subject: String,
    pub assertions: Vec<(PredicateParam, ObjectParam)>,
    /// Enclose the result and add these assertions to the outer envelope.
    pub outer: Option<Vec<(PredicateParam, ObjectParam)>>,
}

impl Arbitrary for EnvelopeParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        let assertions = || prop::collection::vec((predicate_param(), object_param()), 0..6);
        (text(), assertions(), prop::option::of(assertions()))
            .prop_map(|(subject, assertions, outer)| EnvelopeParams {
                subject,
                assertions,
                outer,
            })
            .boxed()
    }
}

fn add_all(envelope: Envelope, assertions: &[(PredicateParam, ObjectParam)]) -> Envelope {
    assertions.iter().fold(envelope, |envelope, (predicate, object)| {
        let predicate = match predicate {
            PredicateParam::Known(p) => Envelope::new(*p),
            PredicateParam::Text(t) => Envelope::new(t.as_str()),
        };
        let object = match object {
            ObjectParam::Text(t) => Envelope::new(t.as_str()),
            ObjectParam::Number(n) => Envelope::new(*n),
            ObjectParam::Identifier(id) => Envelope::new(*id),
        };
        envelope.add(predicate, object)
    })
}

/// Generate an envelope from parameters.
pub fn envelope_from_params(params: &EnvelopeParams) -> Envelope {
    let inner = add_all(Envelope::new(params.subject.as_str()), &params.assertions);
    match &params.outer {
        Some(outer) => add_all(inner.enclose(), outer),
        None => inner,
    }
}

/// Generate an envelope.
pub fn envelope() -> impl Strategy<Value = Envelope> {
    any::<EnvelopeParams>().prop_map(|params| envelope_from_params(&params))
}
