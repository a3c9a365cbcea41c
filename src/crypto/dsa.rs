use num_bigint::{traits::ModInverse, BigUint, RandBigInt};
use num_traits::Zero;
use rand::{CryptoRng, Rng};

use crate::errors::Result;

/// Implements bits2int as defined in RFC6979: take the leftmost
/// qlen bits of the digest.
///
/// Reference: https://tools.ietf.org/html/rfc6979#section-2.3.2
fn bits_to_int(data: &[u8], q: &BigUint) -> BigUint {
    let excess_bits = (data.len() * 8).saturating_sub(q.bits());
    BigUint::from_bytes_be(data) >> excess_bits
}

/// Equivalent to `bits_to_int(data, q) % q`, but cheaper.
fn bits_to_int_mod(data: &[u8], q: &BigUint) -> BigUint {
    let tmp = bits_to_int(data, q);
    if &tmp >= q {
        tmp - q
    } else {
        tmp
    }
}

/// Calculate the modular inverse of i mod q. Requires 0 < i < q.
///
/// If this fails q is not prime, meaning q is not part of a valid DSA key.
fn inverse(i: &BigUint, q: &BigUint) -> Result<BigUint> {
    match i.mod_inverse(q).and_then(|x| x.to_biguint()) {
        Some(x) => Ok(x),
        _ => bail!("invalid key"),
    }
}

/// Produce a DSA signature over an already computed digest.
pub fn sign<R: CryptoRng + Rng>(
    rng: &mut R,
    p: &BigUint,
    q: &BigUint,
    g: &BigUint,
    x: &BigUint,
    hashed: &[u8],
) -> Result<(BigUint, BigUint)> {
    ensure!(!q.is_zero(), "invalid key");
    let h = bits_to_int_mod(hashed, q);

    loop {
        let k = rng.gen_biguint_below(q);
        if k.is_zero() {
            continue;
        }

        let k_inv = inverse(&k, q)?;

        let r = g.modpow(&k, p) % q;
        if r.is_zero() {
            continue;
        }

        let s = (k_inv * (&h + x * &r)) % q;
        if s.is_zero() {
            continue;
        }

        return Ok((r, s));
    }
}

/// Verify a DSA signature.
pub fn verify(
    p: &BigUint,
    q: &BigUint,
    g: &BigUint,
    y: &BigUint,
    hashed: &[u8],
    r: &BigUint,
    s: &BigUint,
) -> Result<()> {
    ensure!(
        &BigUint::zero() < r && r < q && &BigUint::zero() < s && s < q,
        "invalid signature"
    );

    let h = bits_to_int_mod(hashed, q);

    let w = inverse(s, q)?;
    let u1 = (h * &w) % q;
    let u2 = (r * &w) % q;
    let v = ((g.modpow(&u1, p) * y.modpow(&u2, p)) % p) % q;

    ensure!(&v == r, "invalid signature");

    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    // A deliberately tiny schoolbook group: p = 24007, q = 4001
    // (primes, q | p-1), g = 2^((p-1)/q) mod p. Enough to exercise
    // the signature equations without dragging in parameter
    // generation.
    fn test_key() -> (BigUint, BigUint, BigUint, BigUint, BigUint) {
        let p = BigUint::from(24007u32);
        let q = BigUint::from(4001u32);
        let g = BigUint::from(2u32).modpow(&BigUint::from(6u32), &p);
        let x = BigUint::from(57u32);
        let y = g.modpow(&x, &p);

        (p, q, g, x, y)
    }

    #[test]
    fn sign_verify_roundtrip() {
        let (p, q, g, x, y) = test_key();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let digest = HashAlgorithm::SHA2_256.digest(b"sample").unwrap();
        let (r, s) = sign(&mut rng, &p, &q, &g, &x, &digest).unwrap();
        verify(&p, &q, &g, &y, &digest, &r, &s).unwrap();

        let other = HashAlgorithm::SHA2_256.digest(b"other").unwrap();
        assert!(verify(&p, &q, &g, &y, &other, &r, &s).is_err());
    }

    #[test]
    fn rejects_out_of_range_signature() {
        let (p, q, g, _, y) = test_key();
        let digest = HashAlgorithm::SHA1.digest(b"sample").unwrap();
        assert!(verify(&p, &q, &g, &y, &digest, &BigUint::zero(), &q).is_err());
    }
}
