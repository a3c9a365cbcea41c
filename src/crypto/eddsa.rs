use ed25519_dalek::{Signer, Verifier};

use crate::errors::{Error, Result};
use crate::types::Mpi;

/// In EdDSA key packets the public point is prefixed with 0x40,
/// marking the native (compressed-only) encoding.
const NATIVE_PREFIX: u8 = 0x40;

/// EdDSA signature over an already computed digest.
/// Returns the `r` and `s` halves.
pub fn sign(x: &Mpi, digest: &[u8]) -> Result<(Mpi, Mpi)> {
    let raw: [u8; 32] = x
        .left_padded(32)?
        .try_into()
        .expect("padded to fixed size");
    let key = ed25519_dalek::SigningKey::from_bytes(&raw);

    let sig = key.sign(digest).to_bytes();

    Ok((Mpi::from_slice(&sig[..32]), Mpi::from_slice(&sig[32..])))
}

/// Verifies an EdDSA signature over the given digest.
pub fn verify(point: &Mpi, digest: &[u8], r: &Mpi, s: &Mpi) -> Result<()> {
    let point = point.as_ref();
    if point.len() != 33 || point[0] != NATIVE_PREFIX {
        return Err(Error::bad_format("invalid eddsa public point encoding"));
    }
    let pk: [u8; 32] = point[1..].try_into().expect("length checked");
    let key = ed25519_dalek::VerifyingKey::from_bytes(&pk)?;

    let mut sig = [0u8; 64];
    sig[..32].copy_from_slice(&r.left_padded(32)?);
    sig[32..].copy_from_slice(&s.left_padded(32)?);

    key.verify(digest, &ed25519_dalek::Signature::from_bytes(&sig))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    #[test]
    fn sign_verify_roundtrip() {
        let secret = [3u8; 32];
        let key = ed25519_dalek::SigningKey::from_bytes(&secret);

        let mut point = vec![NATIVE_PREFIX];
        point.extend_from_slice(key.verifying_key().as_bytes());

        let x = Mpi::from_slice(&secret);
        let point = Mpi::from_slice(&point);

        let digest = HashAlgorithm::SHA2_256.digest(b"payload").unwrap();
        let (r, s) = sign(&x, &digest).unwrap();
        verify(&point, &digest, &r, &s).unwrap();

        let other = HashAlgorithm::SHA2_256.digest(b"tampered").unwrap();
        assert!(verify(&point, &other, &r, &s).is_err());
    }
}
