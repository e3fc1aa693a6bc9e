//! Threshold sharing of an encrypted envelope's content key.
//!
//! Splitting yields one envelope per share. Each keeps the same encrypted
//! subject and carries a single `sskrShare` assertion, so the shares can
//! be handed to different custodians as ordinary envelopes.

use std::collections::BTreeMap;

use rand::{CryptoRng, RngCore};
use tracing::debug;
use zeroize::Zeroize;

use envelope_kernel_core::{DigestProvider, Envelope, EnvelopeError, Predicate, SymmetricKey};

use crate::error::Result;
use crate::sskr::{sskr_combine, sskr_generate, SskrShare, SskrSpec};

/// SSKR operations on [`Envelope`].
pub trait SharingExt {
    fn add_sskr_share(&self, share: &SskrShare) -> Envelope;

    /// Split `content_key` and attach one share to each copy of this
    /// envelope. `groups` lists `(member_threshold, member_count)`.
    ///
    /// The subject is expected to already be encrypted with `content_key`.
    fn split(
        &self,
        group_threshold: usize,
        groups: &[(usize, usize)],
        content_key: &SymmetricKey,
    ) -> Result<Vec<Vec<Envelope>>>;

    fn split_with_rng<R: RngCore + CryptoRng>(
        &self,
        group_threshold: usize,
        groups: &[(usize, usize)],
        content_key: &SymmetricKey,
        rng: &mut R,
    ) -> Result<Vec<Vec<Envelope>>>;

    /// Drop every `sskrShare` assertion.
    fn remove_sskr_shares(&self) -> Envelope;
}

impl SharingExt for Envelope {
    fn add_sskr_share(&self, share: &SskrShare) -> Envelope {
        self.add(Predicate::SSKR_SHARE, share.clone())
    }

    fn split(
        &self,
        group_threshold: usize,
        groups: &[(usize, usize)],
        content_key: &SymmetricKey,
    ) -> Result<Vec<Vec<Envelope>>> {
        self.split_with_rng(group_threshold, groups, content_key, &mut rand::thread_rng())
    }

    fn split_with_rng<R: RngCore + CryptoRng>(
        &self,
        group_threshold: usize,
        groups: &[(usize, usize)],
        content_key: &SymmetricKey,
        rng: &mut R,
    ) -> Result<Vec<Vec<Envelope>>> {
        let spec = SskrSpec::new(group_threshold, groups)?;
        let shares = sskr_generate(&spec, content_key.as_bytes(), rng)?;
        Ok(shares
            .iter()
            .map(|group| group.iter().map(|share| self.add_sskr_share(share)).collect())
            .collect())
    }

    fn remove_sskr_shares(&self) -> Envelope {
        self.assertions_with_predicate(Predicate::SSKR_SHARE)
            .iter()
            .fold(self.clone(), |envelope, assertion| envelope.revoke(&assertion.digest()))
    }
}

/// Shares grouped by identifier, each with the index of the first envelope
/// that carried that identifier.
fn collect_shares(envelopes: &[Envelope]) -> Result<BTreeMap<u16, (usize, Vec<SskrShare>)>> {
    let mut result: BTreeMap<u16, (usize, Vec<SskrShare>)> = BTreeMap::new();
    for (index, envelope) in envelopes.iter().enumerate() {
        for object in envelope.objects_for_predicate(Predicate::SSKR_SHARE) {
            let share = object.extract::<SskrShare>()?;
            result
                .entry(share.identifier())
                .or_insert_with(|| (index, Vec::new()))
                .1
                .push(share);
        }
    }
    Ok(result)
}

/// Every SSKR share found in `envelopes`, grouped by split identifier.
pub fn shares(envelopes: &[Envelope]) -> Result<BTreeMap<u16, Vec<SskrShare>>> {
    Ok(collect_shares(envelopes)?
        .into_iter()
        .map(|(identifier, (_, shares))| (identifier, shares))
        .collect())
}

/// Recombine share envelopes into the envelope that was split.
///
/// Identifiers are tried in order; the first whose shares meet their
/// thresholds and whose key decrypts its subject wins. Fails with
/// [`EnvelopeError::InvalidShares`] if `envelopes` is empty or no
/// identifier recovers.
pub fn reconstruct(envelopes: &[Envelope]) -> Result<Envelope> {
    if envelopes.is_empty() {
        return Err(EnvelopeError::InvalidShares("no share envelopes".into()));
    }

    for (identifier, (container, shares)) in collect_shares(envelopes)? {
        let mut secret = match sskr_combine(&shares) {
            Ok(secret) => secret,
            Err(e) => {
                debug!(identifier, error = %e, "share set did not combine");
                continue;
            }
        };
        let content_key = SymmetricKey::from_slice(&secret);
        secret.zeroize();

        match content_key.and_then(|key| envelopes[container].decrypt(&key)) {
            Ok(decrypted) => {
                debug!(identifier, shares = shares.len(), "reconstructed envelope from shares");
                return Ok(decrypted.remove_sskr_shares());
            }
            Err(e) => {
                debug!(identifier, error = %e, "recovered key did not decrypt");
            }
        }
    }

    Err(EnvelopeError::InvalidShares(
        "no share set reached its threshold".into(),
    ))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn secret_envelope() -> (Envelope, Envelope, SymmetricKey) {
        let key = SymmetricKey::from_bytes([0x5a; 32]);
        let original = Envelope::new("Dark purple aether").add(Predicate::NOTE, "backup");
        let encrypted = original.encrypt(&key).unwrap();
        (original, encrypted, key)
    }

    #[test]
    fn test_two_of_three_reconstruct() {
        let (original, encrypted, key) = secret_envelope();
        let groups = encrypted.split(1, &[(2, 3)], &key).unwrap();
        let shares = &groups[0];
        assert_eq!(shares.len(), 3);
        for share in shares {
            assert_eq!(share.subject().digest(), encrypted.subject().digest());
        }

        for (a, b) in [(0, 1), (0, 2), (1, 2)] {
            let recovered = reconstruct(&[shares[a].clone(), shares[b].clone()]).unwrap();
            assert_eq!(recovered.digest(), original.digest());
            assert_eq!(recovered.extract::<String>().unwrap(), "Dark purple aether");
        }
    }

    #[test]
    fn test_one_share_is_not_enough() {
        let (_, encrypted, key) = secret_envelope();
        let groups = encrypted.split(1, &[(2, 3)], &key).unwrap();
        assert!(matches!(
            reconstruct(&groups[0][..1]),
            Err(EnvelopeError::InvalidShares(_))
        ));
    }

    #[test]
    fn test_empty_input_is_invalid_shares() {
        assert!(matches!(reconstruct(&[]), Err(EnvelopeError::InvalidShares(_))));
    }

    #[test]
    fn test_envelopes_without_shares() {
        let (_, encrypted, _) = secret_envelope();
        assert!(shares(&[encrypted.clone()]).unwrap().is_empty());
        assert!(matches!(
            reconstruct(&[encrypted]),
            Err(EnvelopeError::InvalidShares(_))
        ));
    }

    #[test]
    fn test_multi_group_split() {
        let (original, encrypted, key) = secret_envelope();
        let mut rng = StdRng::seed_from_u64(9);
        let groups = encrypted
            .split_with_rng(2, &[(1, 1), (2, 3), (3, 5)], &key, &mut rng)
            .unwrap();
        assert_eq!(groups.iter().map(Vec::len).collect::<Vec<_>>(), vec![1, 3, 5]);

        let mut chosen = vec![groups[0][0].clone()];
        chosen.extend(groups[2][2..].iter().cloned());
        let recovered = reconstruct(&chosen).unwrap();
        assert_eq!(recovered.digest(), original.digest());

        let grouped = shares(&chosen).unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped.values().next().unwrap().len(), 4);
    }

    #[test]
    fn test_unrelated_split_is_skipped() {
        let (original, encrypted, key) = secret_envelope();
        let good = encrypted.split(1, &[(2, 3)], &key).unwrap();
        let other_key = SymmetricKey::from_bytes([0x11; 32]);
        let other = Envelope::new("other").encrypt(&other_key).unwrap();
        let unrelated = other.split(1, &[(2, 3)], &other_key).unwrap();

        let mut mixed = vec![unrelated[0][0].clone()];
        mixed.extend(good[0][..2].iter().cloned());
        let recovered = reconstruct(&mixed).unwrap();
        assert_eq!(recovered.digest(), original.digest());
    }

    #[test]
    fn test_undecryptable_group_is_skipped() {
        let (original, encrypted, key) = secret_envelope();
        let good = encrypted
            .split_with_rng(1, &[(2, 3)], &key, &mut StdRng::seed_from_u64(1))
            .unwrap();
        // Shares of a key that does not match the subject combine fine but
        // cannot decrypt it.
        let wrong_key = SymmetricKey::from_bytes([0x33; 32]);
        let bad = encrypted
            .split_with_rng(1, &[(2, 3)], &wrong_key, &mut StdRng::seed_from_u64(2))
            .unwrap();
        let bad_only = reconstruct(&bad[0][..2]);
        assert!(matches!(bad_only, Err(EnvelopeError::InvalidShares(_))));

        let mut mixed: Vec<Envelope> = bad[0][..2].to_vec();
        mixed.extend(good[0][1..].iter().cloned());
        let recovered = reconstruct(&mixed).unwrap();
        assert_eq!(recovered.digest(), original.digest());
    }

    #[test]
    fn test_invalid_split_parameters() {
        let (_, encrypted, key) = secret_envelope();
        assert!(matches!(
            encrypted.split(2, &[(2, 3)], &key),
            Err(EnvelopeError::InvalidShares(_))
        ));
    }
}
