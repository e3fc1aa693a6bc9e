//! Permits: how the key for an encrypted subject can be obtained.

use ciborium::value::Value;

use envelope_kernel_core::canonical::{expect_array, expect_tag, expect_uint, tagged, tags};
use envelope_kernel_core::{CborDecode, CborEncode, Envelope, EnvelopeError, Predicate};

use crate::error::Result;
use crate::sealed::SealedMessage;
use crate::sskr::SskrShare;

/// The route to an encrypted subject's content key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permit {
    /// The key is held out of band.
    Symmetric,
    /// The key is sealed to one or more public keys.
    Recipients(Vec<SealedMessage>),
    /// The key is split, and this envelope carries one share.
    Share(SskrShare),
}

mod discriminator {
    pub const SYMMETRIC: u64 = 1;
    pub const RECIPIENTS: u64 = 2;
    pub const SHARE: u64 = 3;
}

impl CborEncode for Permit {
    fn to_cbor(&self) -> Value {
        let items = match self {
            Permit::Symmetric => vec![Value::Integer(discriminator::SYMMETRIC.into())],
            Permit::Recipients(sealed) => vec![
                Value::Integer(discriminator::RECIPIENTS.into()),
                Value::Array(sealed.iter().map(CborEncode::to_cbor).collect()),
            ],
            Permit::Share(share) => vec![
                Value::Integer(discriminator::SHARE.into()),
                share.to_cbor(),
            ],
        };
        tagged(tags::PERMIT, Value::Array(items))
    }
}

impl CborDecode for Permit {
    fn from_cbor(value: &Value) -> Result<Self> {
        let items = expect_array(expect_tag(value, tags::PERMIT)?, "permit")?;
        let kind = items
            .first()
            .ok_or_else(|| EnvelopeError::format("permit: empty"))
            .and_then(|v| expect_uint(v, "permit discriminator"))?;
        match (kind, items.len()) {
            (discriminator::SYMMETRIC, 1) => Ok(Permit::Symmetric),
            (discriminator::RECIPIENTS, 2) => Ok(Permit::Recipients(
                expect_array(&items[1], "permit recipients")?
                    .iter()
                    .map(SealedMessage::from_cbor)
                    .collect::<Result<_>>()?,
            )),
            (discriminator::SHARE, 2) => Ok(Permit::Share(SskrShare::from_cbor(&items[1])?)),
            (discriminator::SYMMETRIC..=discriminator::SHARE, n) => Err(EnvelopeError::format(
                format!("permit {kind}: unexpected {n} elements"),
            )),
            (other, _) => Err(EnvelopeError::InvalidTag(other)),
        }
    }
}

impl From<Permit> for Envelope {
    fn from(permit: Permit) -> Self {
        Envelope::leaf(&permit)
    }
}

/// Permit inspection on [`Envelope`].
pub trait PermitExt {
    /// The permit for this envelope's encrypted subject, or `None` if the
    /// subject is not encrypted.
    ///
    /// A share takes precedence over recipients; with neither, the key is
    /// assumed to be held out of band.
    fn permit(&self) -> Result<Option<Permit>>;
}

impl PermitExt for Envelope {
    fn permit(&self) -> Result<Option<Permit>> {
        if !self.is_encrypted() {
            return Ok(None);
        }
        let shares = readable_objects(self, Predicate::SSKR_SHARE);
        if let Some(object) = shares.first() {
            return Ok(Some(Permit::Share(object.extract()?)));
        }
        let slots = self.objects_for_predicate(Predicate::HAS_RECIPIENT);
        if slots.is_empty() {
            return Ok(Some(Permit::Symmetric));
        }
        let recipients = readable_objects(self, Predicate::HAS_RECIPIENT)
            .iter()
            .map(Envelope::extract::<SealedMessage>)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Permit::Recipients(recipients)))
    }
}

/// Objects for `predicate`, leaving out elided ones.
fn readable_objects(envelope: &Envelope, predicate: Predicate) -> Vec<Envelope> {
    envelope
        .objects_for_predicate(predicate)
        .into_iter()
        .filter(|object| !object.is_elided())
        .collect()
}
