//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - Floats always encoded as 64-bit
//!
//! The canonical encoding is what leaf digests are computed over: the same
//! value must produce identical bytes (and thus identical digests) on every
//! platform. Decoding goes through `ciborium`.

use ciborium::value::{Integer, Value};

use crate::digest::Digest;
use crate::error::{EnvelopeError, Result};

/// CBOR tags used by the envelope wire format.
pub mod tags {
    pub const DATE: u64 = 1;
    pub const URI: u64 = 32;
    pub const ENCRYPTED_MESSAGE: u64 = 48;
    pub const ENVELOPE: u64 = 49;
    pub const PUBLIC_KEY_BASE: u64 = 51;
    pub const SEALED_MESSAGE: u64 = 55;
    pub const DIGEST: u64 = 56;
    pub const SYMMETRIC_KEY: u64 = 57;
    pub const IDENTIFIER: u64 = 58;
    pub const PREDICATE: u64 = 59;
    pub const SIGNATURE: u64 = 61;
    pub const PERMIT: u64 = 63;
    pub const SSKR_SHARE: u64 = 309;
}

/// Types with a canonical CBOR representation.
pub trait CborEncode {
    /// Convert to a CBOR value.
    fn to_cbor(&self) -> Value;

    /// Encode to canonical bytes.
    fn to_cbor_bytes(&self) -> Vec<u8> {
        encode_canonical(&self.to_cbor())
    }
}

/// Types that can be rebuilt from CBOR.
pub trait CborDecode: Sized {
    /// Convert from a CBOR value.
    fn from_cbor(value: &Value) -> Result<Self>;

    /// Decode from bytes.
    fn from_cbor_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_cbor(&decode_value(bytes)?)
    }
}

/// Encode a CBOR Value to canonical bytes.
pub fn encode_canonical(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Decode a single CBOR item, rejecting trailing bytes.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    let mut reader = bytes;
    let value: Value =
        ciborium::from_reader(&mut reader).map_err(|e| EnvelopeError::format(e.to_string()))?;
    if !reader.is_empty() {
        return Err(EnvelopeError::format(format!(
            "{} trailing bytes after CBOR item",
            reader.len()
        )));
    }
    Ok(value)
}

/// The value `decode_value` yields for this value's canonical bytes.
///
/// Decoding is lossy for some shapes (bignums that fit an integer come
/// back as integers), so leaves are hashed in this form.
pub fn normalize(value: Value) -> Value {
    decode_value(&encode_canonical(&value)).unwrap_or(value)
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Tag(tag, inner) => {
            encode_uint(buf, 6, *tag);
            encode_value_to(buf, inner);
        }
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(f) => {
            buf.push(0xfb);
            buf.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        other => {
            // Vec writes are infallible.
            let _ = ciborium::into_writer(other, &mut *buf);
        }
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| (encode_canonical(k), v))
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoding helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Wrap a value in a tag.
pub fn tagged(tag: u64, value: Value) -> Value {
    Value::Tag(tag, Box::new(value))
}

/// Unwrap a tagged value, checking the tag number.
pub fn expect_tag(value: &Value, tag: u64) -> Result<&Value> {
    match value {
        Value::Tag(found, inner) if *found == tag => Ok(&**inner),
        Value::Tag(found, _) => Err(EnvelopeError::InvalidTag(*found)),
        _ => Err(EnvelopeError::format(format!("expected tag {tag}"))),
    }
}

pub fn expect_array<'a>(value: &'a Value, what: &str) -> Result<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items.as_slice()),
        _ => Err(EnvelopeError::format(format!("{what}: expected array"))),
    }
}

pub fn expect_bytes<'a>(value: &'a Value, what: &str) -> Result<&'a [u8]> {
    match value {
        Value::Bytes(b) => Ok(b.as_slice()),
        _ => Err(EnvelopeError::format(format!("{what}: expected byte string"))),
    }
}

/// Read a byte string of exactly `N` bytes.
pub fn expect_fixed_bytes<const N: usize>(value: &Value, what: &str) -> Result<[u8; N]> {
    let bytes = expect_bytes(value, what)?;
    bytes.try_into().map_err(|_| {
        EnvelopeError::format(format!("{what}: expected {N} bytes, got {}", bytes.len()))
    })
}

pub fn expect_uint(value: &Value, what: &str) -> Result<u64> {
    match value {
        Value::Integer(i) => {
            u64::try_from(*i).map_err(|_| EnvelopeError::format(format!("{what}: out of range")))
        }
        _ => Err(EnvelopeError::format(format!("{what}: expected unsigned integer"))),
    }
}

/// Check the leading discriminator of a variant-encoded array.
pub fn expect_discriminator(value: &Value, expected: u64) -> Result<()> {
    let found = expect_uint(value, "discriminator")?;
    if found != expected {
        return Err(EnvelopeError::InvalidTag(found));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Leaf value conversions
// ─────────────────────────────────────────────────────────────────────────────

impl CborEncode for Value {
    fn to_cbor(&self) -> Value {
        self.clone()
    }
}

impl CborDecode for Value {
    fn from_cbor(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl CborEncode for str {
    fn to_cbor(&self) -> Value {
        Value::Text(self.to_owned())
    }
}

impl CborEncode for String {
    fn to_cbor(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl CborDecode for String {
    fn from_cbor(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            _ => Err(EnvelopeError::format("expected text")),
        }
    }
}

impl CborEncode for bool {
    fn to_cbor(&self) -> Value {
        Value::Bool(*self)
    }
}

impl CborDecode for bool {
    fn from_cbor(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(EnvelopeError::format("expected bool")),
        }
    }
}

impl CborEncode for [u8] {
    fn to_cbor(&self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl CborEncode for Vec<u8> {
    fn to_cbor(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl CborDecode for Vec<u8> {
    fn from_cbor(value: &Value) -> Result<Self> {
        expect_bytes(value, "bytes").map(<[u8]>::to_vec)
    }
}

macro_rules! impl_cbor_integer {
    ($($t:ty),*) => {
        $(
            impl CborEncode for $t {
                fn to_cbor(&self) -> Value {
                    Value::Integer((*self).into())
                }
            }

            impl CborDecode for $t {
                fn from_cbor(value: &Value) -> Result<Self> {
                    match value {
                        Value::Integer(i) => <$t>::try_from(*i).map_err(|_| {
                            EnvelopeError::format(concat!("integer out of range for ", stringify!($t)))
                        }),
                        _ => Err(EnvelopeError::format("expected integer")),
                    }
                }
            }
        )*
    };
}

impl_cbor_integer!(u8, u16, u32, u64, i8, i16, i32, i64);

impl CborEncode for Digest {
    fn to_cbor(&self) -> Value {
        tagged(tags::DIGEST, Value::Bytes(self.0.to_vec()))
    }
}

impl CborDecode for Digest {
    fn from_cbor(value: &Value) -> Result<Self> {
        let inner = expect_tag(value, tags::DIGEST)?;
        Ok(Digest(expect_fixed_bytes::<32>(inner, "digest")?))
    }
}
