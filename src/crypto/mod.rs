pub mod checksum;
pub mod dsa;
pub mod ecc_curve;
pub mod ecdsa;
pub mod eddsa;
pub mod hash;
pub mod public_key;
pub mod rsa;
pub mod sym;

pub use self::ecc_curve::EccCurve;
pub use self::hash::HashAlgorithm;
pub use self::public_key::PublicKeyAlgorithm;
pub use self::sym::SymmetricKeyAlgorithm;

use rand::{CryptoRng, Rng};

use crate::errors::{Error, Result};
use crate::types::{Mpi, PlainSecretParams, PublicParams};

fn inconsistent() -> Error {
    Error::bad_state("secret material does not match the public algorithm")
}

/// Signs an already computed digest with the given key material.
///
/// The RNG is only consumed by algorithms that need per-signature
/// randomness (DSA); the deterministic schemes ignore it.
pub fn sign<R: CryptoRng + Rng>(
    rng: &mut R,
    public: &PublicParams,
    secret: &PlainSecretParams,
    hash_alg: HashAlgorithm,
    digest: &[u8],
) -> Result<Vec<Mpi>> {
    match (public, secret) {
        (PublicParams::Rsa { n, e }, PlainSecretParams::Rsa { d, p, q, .. }) => {
            rsa::sign(n, e, d, p, q, hash_alg, digest)
        }
        (PublicParams::Dsa { p, q, g, .. }, PlainSecretParams::Dsa { x }) => {
            let (r, s) = dsa::sign(
                rng,
                &p.to_biguint(),
                &q.to_biguint(),
                &g.to_biguint(),
                &x.to_biguint(),
                digest,
            )?;
            Ok(vec![Mpi::from_biguint(&r), Mpi::from_biguint(&s)])
        }
        (PublicParams::Ecdsa { curve, .. }, PlainSecretParams::Ec { x }) => {
            let (r, s) = ecdsa::sign(curve, x, digest)?;
            Ok(vec![r, s])
        }
        (PublicParams::Eddsa { curve, .. }, PlainSecretParams::Ec { x }) => {
            ensure_eq!(curve, &EccCurve::Ed25519, "unsupported eddsa curve");
            let (r, s) = eddsa::sign(x, digest)?;
            Ok(vec![r, s])
        }
        (PublicParams::Elgamal { .. }, _) => {
            unsupported_err!("signing with Elgamal keys")
        }
        (PublicParams::Sm2 { .. }, _) => {
            unimplemented_err!("SM2 signatures")
        }
        _ => Err(inconsistent()),
    }
}

/// Verifies a signature (as its MPI parts) over an already computed digest.
pub fn verify(
    public: &PublicParams,
    hash_alg: HashAlgorithm,
    digest: &[u8],
    sig: &[Mpi],
) -> Result<()> {
    match public {
        PublicParams::Rsa { n, e } => rsa::verify(n, e, hash_alg, digest, sig),
        PublicParams::Dsa { p, q, g, y } => {
            ensure_eq!(sig.len(), 2, "DSA signatures consist of two MPIs");
            dsa::verify(
                &p.to_biguint(),
                &q.to_biguint(),
                &g.to_biguint(),
                &y.to_biguint(),
                digest,
                &sig[0].to_biguint(),
                &sig[1].to_biguint(),
            )
        }
        PublicParams::Ecdsa { curve, point } => {
            ensure_eq!(sig.len(), 2, "ECDSA signatures consist of two MPIs");
            ecdsa::verify(curve, point, digest, &sig[0], &sig[1])
        }
        PublicParams::Eddsa { curve, point } => {
            ensure_eq!(curve, &EccCurve::Ed25519, "unsupported eddsa curve");
            ensure_eq!(sig.len(), 2, "EdDSA signatures consist of two MPIs");
            eddsa::verify(point, digest, &sig[0], &sig[1])
        }
        PublicParams::Elgamal { .. } => {
            unsupported_err!("verification of Elgamal signatures")
        }
        PublicParams::Sm2 { .. } => {
            unimplemented_err!("SM2 signatures")
        }
        PublicParams::Ecdh { .. } => {
            unsupported_err!("verification with Ecdh keys")
        }
    }
}

/// The weakest hash acceptable for DSA with a subgroup of the given size.
fn dsa_min_hash(q_bits: usize) -> HashAlgorithm {
    if q_bits <= 160 {
        HashAlgorithm::SHA1
    } else if q_bits <= 224 {
        HashAlgorithm::SHA2_224
    } else if q_bits <= 256 {
        HashAlgorithm::SHA2_256
    } else {
        HashAlgorithm::SHA2_512
    }
}

/// Raises the requested hash to the weakest one the key can carry.
///
/// DSA requires the digest to be at least as long as the subgroup
/// order; ECDSA requires a digest matching the curve. All other
/// algorithms take any hash, so the request passes through.
pub fn adjust_hash_to_key(hash: HashAlgorithm, public: &PublicParams) -> HashAlgorithm {
    let min = match public {
        PublicParams::Dsa { q, .. } => dsa_min_hash(q.bits()),
        PublicParams::Ecdsa { curve, .. } => curve.min_hash(),
        _ => return hash,
    };

    if hash.digest_size() < min.digest_size() {
        min
    } else {
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dsa_params_with_q_bits(bits: usize) -> PublicParams {
        // only q matters for the hash adjustment
        let mut q = vec![0x80u8];
        q.extend(vec![0u8; (bits - 1) / 8]);
        PublicParams::Dsa {
            p: Mpi::from_slice(&[1]),
            q: Mpi::from_slice(&q),
            g: Mpi::from_slice(&[2]),
            y: Mpi::from_slice(&[3]),
        }
    }

    #[test]
    fn dsa_hash_is_raised_to_q_size() {
        let params = dsa_params_with_q_bits(256);
        assert_eq!(
            adjust_hash_to_key(HashAlgorithm::SHA1, &params),
            HashAlgorithm::SHA2_256
        );
        assert_eq!(
            adjust_hash_to_key(HashAlgorithm::SHA2_512, &params),
            HashAlgorithm::SHA2_512
        );

        let small = dsa_params_with_q_bits(160);
        assert_eq!(
            adjust_hash_to_key(HashAlgorithm::SHA1, &small),
            HashAlgorithm::SHA1
        );
    }

    #[test]
    fn ecdsa_hash_is_curve_dependent() {
        let params = PublicParams::Ecdsa {
            curve: EccCurve::P384,
            point: Mpi::from_slice(&[4]),
        };
        assert_eq!(
            adjust_hash_to_key(HashAlgorithm::SHA2_256, &params),
            HashAlgorithm::SHA2_384
        );
        assert_eq!(
            adjust_hash_to_key(HashAlgorithm::SHA2_512, &params),
            HashAlgorithm::SHA2_512
        );
    }

    #[test]
    fn rsa_hash_passes_through() {
        let params = PublicParams::Rsa {
            n: Mpi::from_slice(&[5]),
            e: Mpi::from_slice(&[1, 0, 1]),
        };
        assert_eq!(
            adjust_hash_to_key(HashAlgorithm::MD5, &params),
            HashAlgorithm::MD5
        );
    }
}
