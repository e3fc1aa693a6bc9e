//! Sharded secret key reconstruction (SSKR).
//!
//! A secret is split into groups, and each group's secret is split again
//! into member shares. Recovering needs `member_threshold` shares from each
//! of at least `group_threshold` groups.
//!
//! ## Share Layout
//!
//! ```text
//! byte 0-1  identifier (big endian)
//! byte 2    (group_threshold - 1) << 4 | (group_count - 1)
//! byte 3    group_index << 4 | (member_threshold - 1)
//! byte 4    member_index (high nibble reserved, zero)
//! byte 5..  share value
//! ```

use std::collections::BTreeMap;
use std::fmt;

use ciborium::value::Value;
use rand::{CryptoRng, RngCore};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use envelope_kernel_core::canonical::{expect_bytes, expect_tag, tagged, tags};
use envelope_kernel_core::{CborDecode, CborEncode, Envelope};

use crate::error::{SskrError, SskrResult};
use crate::shamir::{self, MAX_SHARE_COUNT};

pub const MIN_SECRET_LEN: usize = 16;
pub const MAX_SECRET_LEN: usize = 32;
pub const MAX_GROUPS: usize = MAX_SHARE_COUNT;
pub const MAX_MEMBERS: usize = MAX_SHARE_COUNT;

const HEADER_LEN: usize = 5;

/// Threshold and size of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSpec {
    member_threshold: usize,
    member_count: usize,
}

impl GroupSpec {
    pub fn new(member_threshold: usize, member_count: usize) -> SskrResult<Self> {
        if member_count == 0 || member_count > MAX_MEMBERS {
            return Err(SskrError::MemberCountOutOfRange(member_count));
        }
        if member_threshold == 0 || member_threshold > member_count {
            return Err(SskrError::InvalidThreshold {
                threshold: member_threshold,
                count: member_count,
            });
        }
        Ok(Self {
            member_threshold,
            member_count,
        })
    }

    pub fn member_threshold(&self) -> usize {
        self.member_threshold
    }

    pub fn member_count(&self) -> usize {
        self.member_count
    }
}

/// A validated split configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SskrSpec {
    group_threshold: usize,
    groups: Vec<GroupSpec>,
}

impl SskrSpec {
    /// `groups` lists `(member_threshold, member_count)` per group.
    pub fn new(group_threshold: usize, groups: &[(usize, usize)]) -> SskrResult<Self> {
        if groups.is_empty() || groups.len() > MAX_GROUPS {
            return Err(SskrError::GroupCountOutOfRange(groups.len()));
        }
        if group_threshold == 0 || group_threshold > groups.len() {
            return Err(SskrError::InvalidThreshold {
                threshold: group_threshold,
                count: groups.len(),
            });
        }
        let groups = groups
            .iter()
            .map(|&(threshold, count)| GroupSpec::new(threshold, count))
            .collect::<SskrResult<Vec<_>>>()?;
        Ok(Self {
            group_threshold,
            groups,
        })
    }

    pub fn group_threshold(&self) -> usize {
        self.group_threshold
    }

    pub fn groups(&self) -> &[GroupSpec] {
        &self.groups
    }

    /// Total number of shares a split produces.
    pub fn share_count(&self) -> usize {
        self.groups.iter().map(GroupSpec::member_count).sum()
    }
}

/// One member share.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SskrShare {
    identifier: u16,
    group_index: u8,
    group_threshold: u8,
    group_count: u8,
    member_index: u8,
    member_threshold: u8,
    value: Vec<u8>,
}

impl SskrShare {
    /// Identifier shared by every share of one split.
    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn group_index(&self) -> u8 {
        self.group_index
    }

    pub fn group_threshold(&self) -> u8 {
        self.group_threshold
    }

    pub fn group_count(&self) -> u8 {
        self.group_count
    }

    pub fn member_index(&self) -> u8 {
        self.member_index
    }

    pub fn member_threshold(&self) -> u8 {
        self.member_threshold
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.value.len());
        out.extend_from_slice(&self.identifier.to_be_bytes());
        out.push(((self.group_threshold - 1) << 4) | (self.group_count - 1));
        out.push((self.group_index << 4) | (self.member_threshold - 1));
        out.push(self.member_index);
        out.extend_from_slice(&self.value);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> SskrResult<Self> {
        if bytes.len() < HEADER_LEN + MIN_SECRET_LEN {
            return Err(SskrError::MalformedShare(format!(
                "{} bytes is too short",
                bytes.len()
            )));
        }
        let identifier = u16::from_be_bytes([bytes[0], bytes[1]]);
        let group_threshold = (bytes[2] >> 4) + 1;
        let group_count = (bytes[2] & 0x0f) + 1;
        let group_index = bytes[3] >> 4;
        let member_threshold = (bytes[3] & 0x0f) + 1;
        if bytes[4] >> 4 != 0 {
            return Err(SskrError::MalformedShare("reserved bits set".into()));
        }
        let member_index = bytes[4] & 0x0f;

        if group_threshold > group_count {
            return Err(SskrError::MalformedShare(
                "group threshold exceeds group count".into(),
            ));
        }
        if group_index >= group_count {
            return Err(SskrError::MalformedShare("group index out of range".into()));
        }

        Ok(Self {
            identifier,
            group_index,
            group_threshold,
            group_count,
            member_index,
            member_threshold,
            value: bytes[HEADER_LEN..].to_vec(),
        })
    }
}

impl fmt::Debug for SskrShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SskrShare")
            .field("identifier", &self.identifier)
            .field("group", &(self.group_index, self.group_threshold, self.group_count))
            .field("member", &(self.member_index, self.member_threshold))
            .finish_non_exhaustive()
    }
}

impl CborEncode for SskrShare {
    fn to_cbor(&self) -> Value {
        tagged(tags::SSKR_SHARE, Value::Bytes(self.to_bytes()))
    }
}

impl CborDecode for SskrShare {
    fn from_cbor(value: &Value) -> envelope_kernel_core::Result<Self> {
        let bytes = expect_bytes(expect_tag(value, tags::SSKR_SHARE)?, "sskr share")?;
        Ok(Self::from_bytes(bytes)?)
    }
}

impl From<SskrShare> for Envelope {
    fn from(share: SskrShare) -> Self {
        Envelope::leaf(&share)
    }
}

fn validate_secret(secret: &[u8]) -> SskrResult<()> {
    let len = secret.len();
    if !(MIN_SECRET_LEN..=MAX_SECRET_LEN).contains(&len) || len % 2 != 0 {
        return Err(SskrError::InvalidSecretLength(len));
    }
    Ok(())
}

/// Split `secret` according to `spec`, one inner vector per group.
pub fn sskr_generate<R: RngCore + CryptoRng>(
    spec: &SskrSpec,
    secret: &[u8],
    rng: &mut R,
) -> SskrResult<Vec<Vec<SskrShare>>> {
    validate_secret(secret)?;

    let identifier = (rng.next_u32() & 0xffff) as u16;
    let group_secrets =
        shamir::split_secret(spec.group_threshold, spec.groups.len(), secret, rng)?;

    let mut result = Vec::with_capacity(spec.groups.len());
    let groups = spec.groups.iter().zip(group_secrets).enumerate();
    for (group_index, (group, mut group_secret)) in groups {
        let member_values = shamir::split_secret(
            group.member_threshold,
            group.member_count,
            &group_secret,
            rng,
        );
        group_secret.zeroize();
        let shares = member_values?
            .into_iter()
            .enumerate()
            .map(|(member_index, value)| SskrShare {
                identifier,
                group_index: group_index as u8,
                group_threshold: spec.group_threshold as u8,
                group_count: spec.groups.len() as u8,
                member_index: member_index as u8,
                member_threshold: group.member_threshold as u8,
                value,
            })
            .collect();
        result.push(shares);
    }
    Ok(result)
}

/// Recover the secret from shares of a single split.
///
/// Duplicate shares are ignored. Groups whose shares do not combine are
/// skipped, as long as enough other groups do.
pub fn sskr_combine(shares: &[SskrShare]) -> SskrResult<Vec<u8>> {
    let first = shares.first().ok_or(SskrError::NoShares)?;

    let mut groups: BTreeMap<u8, (u8, BTreeMap<u8, &[u8]>)> = BTreeMap::new();
    for share in shares {
        if share.identifier != first.identifier
            || share.group_threshold != first.group_threshold
            || share.group_count != first.group_count
        {
            warn!(
                identifier = first.identifier,
                other = share.identifier,
                "shares from different splits"
            );
            return Err(SskrError::InconsistentShares(
                "shares belong to different splits".into(),
            ));
        }

        let (member_threshold, members) = groups
            .entry(share.group_index)
            .or_insert_with(|| (share.member_threshold, BTreeMap::new()));
        if *member_threshold != share.member_threshold {
            warn!(group = share.group_index, "member thresholds disagree");
            return Err(SskrError::InconsistentShares(
                "member thresholds disagree within a group".into(),
            ));
        }
        if let Some(existing) = members.insert(share.member_index, &share.value) {
            if existing != share.value.as_slice() {
                warn!(
                    group = share.group_index,
                    member = share.member_index,
                    "conflicting duplicate share"
                );
                return Err(SskrError::InconsistentShares(
                    "conflicting shares for one member".into(),
                ));
            }
        }
    }

    let mut group_secrets: Vec<(u8, Vec<u8>)> = Vec::new();
    for (group_index, (member_threshold, members)) in &groups {
        let points: Vec<(u8, &[u8])> = members.iter().map(|(&i, &v)| (i, v)).collect();
        match shamir::recover_secret(*member_threshold as usize, &points) {
            Ok(secret) => group_secrets.push((*group_index, secret)),
            Err(e) => debug!(group = group_index, error = %e, "group did not combine"),
        }
    }

    let needed = first.group_threshold as usize;
    if group_secrets.len() < needed {
        return Err(SskrError::NotEnoughShares {
            needed,
            have: group_secrets.len(),
        });
    }

    let points: Vec<(u8, &[u8])> = group_secrets
        .iter()
        .map(|(i, secret)| (*i, secret.as_slice()))
        .collect();
    let secret = shamir::recover_secret(needed, &points);
    for (_, group_secret) in &mut group_secrets {
        group_secret.zeroize();
    }
    secret
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    const SECRET: &[u8; 16] = b"my sixteen bytes";

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x55)
    }

    #[test]
    fn test_single_group_two_of_three() {
        let spec = SskrSpec::new(1, &[(2, 3)]).unwrap();
        let groups = sskr_generate(&spec, SECRET, &mut rng()).unwrap();
        assert_eq!(groups.len(), 1);
        let shares = &groups[0];
        assert_eq!(shares.len(), 3);

        for (a, b) in [(0, 1), (0, 2), (1, 2)] {
            let pair = [shares[a].clone(), shares[b].clone()];
            assert_eq!(sskr_combine(&pair).unwrap(), SECRET);
        }
        assert_eq!(
            sskr_combine(&shares[..1]).unwrap_err(),
            SskrError::NotEnoughShares { needed: 1, have: 0 }
        );
    }

    #[test]
    fn test_two_of_three_groups() {
        let spec = SskrSpec::new(2, &[(1, 1), (2, 3), (2, 3)]).unwrap();
        assert_eq!(spec.share_count(), 7);
        let groups = sskr_generate(&spec, SECRET, &mut rng()).unwrap();

        let mut shares = vec![groups[0][0].clone()];
        shares.extend(groups[2][1..].iter().cloned());
        assert_eq!(sskr_combine(&shares).unwrap(), SECRET);

        // One member of the second group is not enough for that group
        let partial = vec![groups[0][0].clone(), groups[1][0].clone()];
        assert!(sskr_combine(&partial).is_err());
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let spec = SskrSpec::new(1, &[(2, 3)]).unwrap();
        let groups = sskr_generate(&spec, SECRET, &mut rng()).unwrap();
        let shares = vec![groups[0][0].clone(), groups[0][0].clone(), groups[0][2].clone()];
        assert_eq!(sskr_combine(&shares).unwrap(), SECRET);
    }

    #[test]
    fn test_mixed_splits_are_rejected() {
        let spec = SskrSpec::new(1, &[(2, 3)]).unwrap();
        let mut r = rng();
        let a = sskr_generate(&spec, SECRET, &mut r).unwrap();
        let b = sskr_generate(&spec, SECRET, &mut r).unwrap();
        assert!(sskr_combine(&[a[0][0].clone(), b[0][1].clone()]).is_err());

        let mut other_threshold = a[0][1].to_bytes();
        other_threshold[2] = 0x11;
        let forged = SskrShare::from_bytes(&other_threshold).unwrap();
        assert!(matches!(
            sskr_combine(&[a[0][0].clone(), forged]),
            Err(SskrError::InconsistentShares(_))
        ));
    }

    #[test]
    fn test_invalid_specs() {
        assert_eq!(
            SskrSpec::new(1, &[]).unwrap_err(),
            SskrError::GroupCountOutOfRange(0)
        );
        assert_eq!(
            SskrSpec::new(3, &[(1, 1), (1, 1)]).unwrap_err(),
            SskrError::InvalidThreshold { threshold: 3, count: 2 }
        );
        assert_eq!(
            SskrSpec::new(1, &[(0, 2)]).unwrap_err(),
            SskrError::InvalidThreshold { threshold: 0, count: 2 }
        );
        assert_eq!(
            SskrSpec::new(1, &[(1, 17)]).unwrap_err(),
            SskrError::MemberCountOutOfRange(17)
        );
    }

    #[test]
    fn test_invalid_secret_lengths() {
        let spec = SskrSpec::new(1, &[(1, 1)]).unwrap();
        for len in [0, 15, 17, 34] {
            assert_eq!(
                sskr_generate(&spec, &vec![0u8; len], &mut rng()).unwrap_err(),
                SskrError::InvalidSecretLength(len)
            );
        }
        assert!(sskr_generate(&spec, &[0u8; 32], &mut rng()).is_ok());
    }

    #[test]
    fn test_share_bytes_layout() {
        let spec = SskrSpec::new(2, &[(1, 1), (3, 5), (2, 2)]).unwrap();
        let groups = sskr_generate(&spec, SECRET, &mut rng()).unwrap();
        let share = &groups[1][4];
        let bytes = share.to_bytes();

        assert_eq!(bytes[2], (1 << 4) | 2);
        assert_eq!(bytes[3], (1 << 4) | 2);
        assert_eq!(bytes[4], 4);
        assert_eq!(SskrShare::from_bytes(&bytes).unwrap(), *share);
    }

    #[test]
    fn test_share_cbor_tag() {
        let spec = SskrSpec::new(1, &[(1, 1)]).unwrap();
        let share = sskr_generate(&spec, SECRET, &mut rng()).unwrap()[0][0].clone();
        let bytes = share.to_cbor_bytes();
        assert_eq!(&bytes[..3], &[0xd9, 0x01, 0x35]);
        assert_eq!(SskrShare::from_cbor_bytes(&bytes).unwrap(), share);
    }

    #[test]
    fn test_malformed_share_bytes() {
        assert!(matches!(
            SskrShare::from_bytes(&[0u8; 8]),
            Err(SskrError::MalformedShare(_))
        ));
        let mut bytes = vec![0u8; HEADER_LEN + 24];
        bytes[4] = 0x10;
        assert!(matches!(
            SskrShare::from_bytes(&bytes),
            Err(SskrError::MalformedShare(_))
        ));
    }
}
