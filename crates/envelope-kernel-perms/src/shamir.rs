//! Shamir secret sharing over GF(2^8).
//!
//! Field arithmetic uses the AES reduction polynomial
//! x^8 + x^4 + x^3 + x + 1 (0x11B). Each byte of the secret is shared with
//! its own random polynomial; share `i` is the evaluation at `x = i + 1`.
//!
//! A 4-byte Blake3 checksum is appended to the secret before splitting,
//! so recovering from shares of different splits is detected instead of
//! silently yielding garbage.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::error::{SskrError, SskrResult};

/// Maximum number of shares produced by one split.
pub const MAX_SHARE_COUNT: usize = 16;

/// Bytes of checksum appended to every shared secret.
pub const CHECKSUM_LEN: usize = 4;

/// Multiply in GF(2^8), without data-dependent branches.
fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    for _ in 0..8 {
        product ^= (b & 1).wrapping_neg() & a;
        let carry = (a >> 7).wrapping_neg() & 0x1b;
        a = (a << 1) ^ carry;
        b >>= 1;
    }
    product
}

/// Multiplicative inverse in GF(2^8), as `a^254`. Maps 0 to 0.
fn gf_inv(a: u8) -> u8 {
    let mut result = 1u8;
    let mut base = a;
    let mut exp = 254u8;
    while exp > 0 {
        if exp & 1 == 1 {
            result = gf_mul(result, base);
        }
        base = gf_mul(base, base);
        exp >>= 1;
    }
    result
}

fn checksum(secret: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = blake3::hash(secret);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash.as_bytes()[..CHECKSUM_LEN]);
    out
}

/// Evaluate the polynomial with `coefficients` (constant term first) at `x`.
fn evaluate(coefficients: &[u8], x: u8) -> u8 {
    coefficients
        .iter()
        .rev()
        .fold(0u8, |acc, &c| gf_mul(acc, x) ^ c)
}

/// Split `secret` into `count` shares, any `threshold` of which recover it.
///
/// Each share is `secret.len() + CHECKSUM_LEN` bytes long.
pub fn split_secret<R: RngCore + CryptoRng>(
    threshold: usize,
    count: usize,
    secret: &[u8],
    rng: &mut R,
) -> SskrResult<Vec<Vec<u8>>> {
    if count == 0 || count > MAX_SHARE_COUNT {
        return Err(SskrError::MemberCountOutOfRange(count));
    }
    if threshold == 0 || threshold > count {
        return Err(SskrError::InvalidThreshold { threshold, count });
    }

    let mut payload = secret.to_vec();
    payload.extend_from_slice(&checksum(secret));

    let mut shares = vec![vec![0u8; payload.len()]; count];
    let mut coefficients = vec![0u8; threshold];
    for (position, &byte) in payload.iter().enumerate() {
        coefficients[0] = byte;
        rng.fill_bytes(&mut coefficients[1..]);
        for (index, share) in shares.iter_mut().enumerate() {
            share[position] = evaluate(&coefficients, index as u8 + 1);
        }
    }
    coefficients.zeroize();
    payload.zeroize();

    Ok(shares)
}

/// Recover a secret from `(index, share)` pairs produced by [`split_secret`].
///
/// Exactly the first `threshold` shares are used. Fails with
/// [`SskrError::ChecksumMismatch`] if they do not belong together.
pub fn recover_secret(threshold: usize, shares: &[(u8, &[u8])]) -> SskrResult<Vec<u8>> {
    if threshold == 0 {
        return Err(SskrError::InvalidThreshold {
            threshold,
            count: shares.len(),
        });
    }
    if shares.len() < threshold {
        return Err(SskrError::NotEnoughShares {
            needed: threshold,
            have: shares.len(),
        });
    }
    let shares = &shares[..threshold];

    let len = shares[0].1.len();
    if len <= CHECKSUM_LEN || shares.iter().any(|(_, s)| s.len() != len) {
        return Err(SskrError::InconsistentShares("share lengths differ".into()));
    }
    let xs: Vec<u8> = shares.iter().map(|(i, _)| i.wrapping_add(1)).collect();
    for (i, x) in xs.iter().enumerate() {
        if xs[..i].contains(x) {
            return Err(SskrError::InconsistentShares("duplicate share index".into()));
        }
    }

    // Lagrange basis values at zero; subtraction is xor in GF(2^8)
    let basis: Vec<u8> = xs
        .iter()
        .enumerate()
        .map(|(i, &xi)| {
            xs.iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .fold(1u8, |acc, (_, &xj)| gf_mul(acc, gf_mul(xj, gf_inv(xi ^ xj))))
        })
        .collect();

    let mut payload: Vec<u8> = (0..len)
        .map(|position| {
            shares
                .iter()
                .zip(&basis)
                .fold(0u8, |acc, ((_, share), &b)| acc ^ gf_mul(share[position], b))
        })
        .collect();

    let secret_len = len - CHECKSUM_LEN;
    let valid = checksum(&payload[..secret_len])[..] == payload[secret_len..];
    if !valid {
        payload.zeroize();
        return Err(SskrError::ChecksumMismatch);
    }
    payload.truncate(secret_len);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_field_inverse() {
        for a in 1..=255u8 {
            assert_eq!(gf_mul(a, gf_inv(a)), 1, "inverse of {a}");
        }
        assert_eq!(gf_mul(0x53, 0xca), 1);
    }

    #[test]
    fn test_threshold_one_copies_secret() {
        let mut rng = StdRng::seed_from_u64(1);
        let shares = split_secret(1, 3, b"0123456789abcdef", &mut rng).unwrap();
        for (i, share) in shares.iter().enumerate() {
            assert_eq!(
                recover_secret(1, &[(i as u8, share.as_slice())]).unwrap(),
                b"0123456789abcdef"
            );
        }
    }

    #[test]
    fn test_too_few_shares() {
        let mut rng = StdRng::seed_from_u64(2);
        let shares = split_secret(3, 5, b"0123456789abcdef", &mut rng).unwrap();
        let err = recover_secret(3, &[(0, &shares[0][..]), (1, &shares[1][..])]).unwrap_err();
        assert_eq!(err, SskrError::NotEnoughShares { needed: 3, have: 2 });
    }

    #[test]
    fn test_mixed_splits_fail_checksum() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = split_secret(2, 3, b"0123456789abcdef", &mut rng).unwrap();
        let b = split_secret(2, 3, b"fedcba9876543210", &mut rng).unwrap();
        let err = recover_secret(2, &[(0, &a[0][..]), (1, &b[1][..])]).unwrap_err();
        assert_eq!(err, SskrError::ChecksumMismatch);
    }

    #[test]
    fn test_invalid_parameters() {
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(
            split_secret(0, 3, b"0123456789abcdef", &mut rng).unwrap_err(),
            SskrError::InvalidThreshold { threshold: 0, count: 3 }
        );
        assert_eq!(
            split_secret(4, 3, b"0123456789abcdef", &mut rng).unwrap_err(),
            SskrError::InvalidThreshold { threshold: 4, count: 3 }
        );
        assert_eq!(
            split_secret(1, 17, b"0123456789abcdef", &mut rng).unwrap_err(),
            SskrError::MemberCountOutOfRange(17)
        );
    }

    proptest! {
        #[test]
        fn any_threshold_subset_recovers(
            secret in prop::collection::vec(any::<u8>(), 16..=32),
            (threshold, count) in (1usize..=6).prop_flat_map(|c| (1..=c, Just(c))),
            seed in any::<u64>(),
            shuffle in any::<prop::sample::Index>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let shares = split_secret(threshold, count, &secret, &mut rng).unwrap();

            let start = shuffle.index(count);
            let picked: Vec<(u8, &[u8])> = (0..threshold)
                .map(|k| {
                    let i = (start + k) % count;
                    (i as u8, shares[i].as_slice())
                })
                .collect();
            prop_assert_eq!(recover_secret(threshold, &picked).unwrap(), secret);
        }
    }
}
