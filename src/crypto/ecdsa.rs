use signature::hazmat::{PrehashSigner, PrehashVerifier};

use crate::crypto::ecc_curve::EccCurve;
use crate::errors::Result;
use crate::types::Mpi;

/// ECDSA signature over an already computed digest.
/// Returns the `r` and `s` scalars.
pub fn sign(curve: &EccCurve, x: &Mpi, digest: &[u8]) -> Result<(Mpi, Mpi)> {
    match curve {
        EccCurve::P256 => {
            let raw = x.left_padded(curve.field_size())?;
            let key = p256::ecdsa::SigningKey::from_slice(&raw)?;
            let sig: p256::ecdsa::Signature = key.sign_prehash(digest)?;
            let (r, s) = sig.split_bytes();
            Ok((Mpi::from_slice(&r), Mpi::from_slice(&s)))
        }
        EccCurve::P384 => {
            let raw = x.left_padded(curve.field_size())?;
            let key = p384::ecdsa::SigningKey::from_slice(&raw)?;
            let sig: p384::ecdsa::Signature = key.sign_prehash(digest)?;
            let (r, s) = sig.split_bytes();
            Ok((Mpi::from_slice(&r), Mpi::from_slice(&s)))
        }
        _ => unsupported_err!("curve {:?} for ECDSA", curve.name()),
    }
}

/// Verifies an ECDSA signature over the given digest.
pub fn verify(curve: &EccCurve, point: &Mpi, digest: &[u8], r: &Mpi, s: &Mpi) -> Result<()> {
    match curve {
        EccCurve::P256 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point.as_ref())?;
            let r: [u8; 32] = r.left_padded(32)?.try_into().expect("fixed size");
            let s: [u8; 32] = s.left_padded(32)?.try_into().expect("fixed size");
            let sig = p256::ecdsa::Signature::from_scalars(r, s)?;
            key.verify_prehash(digest, &sig)?;
            Ok(())
        }
        EccCurve::P384 => {
            let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point.as_ref())?;
            let r: [u8; 48] = r.left_padded(48)?.try_into().expect("fixed size");
            let s: [u8; 48] = s.left_padded(48)?.try_into().expect("fixed size");
            let sig = p384::ecdsa::Signature::from_scalars(r, s)?;
            key.verify_prehash(digest, &sig)?;
            Ok(())
        }
        _ => unsupported_err!("curve {:?} for ECDSA", curve.name()),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    #[test]
    fn p256_sign_verify_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let secret = p256::ecdsa::SigningKey::random(&mut rng);
        let point = secret.verifying_key().to_encoded_point(false);

        let x = Mpi::from_slice(&secret.to_bytes());
        let point = Mpi::from_slice(point.as_bytes());

        let digest = HashAlgorithm::SHA2_256.digest(b"data to bind").unwrap();
        let (r, s) = sign(&EccCurve::P256, &x, &digest).unwrap();
        verify(&EccCurve::P256, &point, &digest, &r, &s).unwrap();

        let other = HashAlgorithm::SHA2_256.digest(b"tampered").unwrap();
        assert!(verify(&EccCurve::P256, &point, &other, &r, &s).is_err());
    }
}
