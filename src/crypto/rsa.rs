use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

use crate::crypto::hash::HashAlgorithm;
use crate::errors::Result;
use crate::types::Mpi;

fn pkcs1v15_padding(hash: HashAlgorithm) -> Result<Pkcs1v15Sign> {
    let padding = match hash {
        HashAlgorithm::MD5 => Pkcs1v15Sign::new::<md5::Md5>(),
        HashAlgorithm::SHA1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
        HashAlgorithm::SHA2_224 => Pkcs1v15Sign::new::<sha2::Sha224>(),
        HashAlgorithm::SHA2_256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashAlgorithm::SHA2_384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        HashAlgorithm::SHA2_512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        HashAlgorithm::SHA3_256 => Pkcs1v15Sign::new::<sha3::Sha3_256>(),
        HashAlgorithm::SHA3_512 => Pkcs1v15Sign::new::<sha3::Sha3_512>(),
        _ => unsupported_err!("hash {:?} for RSA signatures", hash),
    };
    Ok(padding)
}

/// RSA signature over an already computed digest, PKCS1v15 padded.
pub fn sign(
    n: &Mpi,
    e: &Mpi,
    d: &Mpi,
    p: &Mpi,
    q: &Mpi,
    hash: HashAlgorithm,
    digest: &[u8],
) -> Result<Vec<Mpi>> {
    let key = RsaPrivateKey::from_components(
        n.to_biguint(),
        e.to_biguint(),
        d.to_biguint(),
        vec![p.to_biguint(), q.to_biguint()],
    )?;

    let sig = key.sign(pkcs1v15_padding(hash)?, digest)?;

    Ok(vec![Mpi::from_slice(&sig)])
}

/// Verifies an RSA signature over the given digest.
pub fn verify(n: &Mpi, e: &Mpi, hash: HashAlgorithm, digest: &[u8], sig: &[Mpi]) -> Result<()> {
    ensure_eq!(sig.len(), 1, "RSA signatures consist of exactly one MPI");

    let key = RsaPublicKey::new(n.to_biguint(), e.to_biguint())?;
    // the MPI may have shed leading zeros; the raw signature is key-sized
    let sig_bytes = sig[0].left_padded(key.size())?;

    key.verify(pkcs1v15_padding(hash)?, digest, &sig_bytes)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rsa::traits::PrivateKeyParts;

    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();

        let n = Mpi::from_slice(&key.n().to_bytes_be());
        let e = Mpi::from_slice(&key.e().to_bytes_be());
        let d = Mpi::from_slice(&key.d().to_bytes_be());
        let p = Mpi::from_slice(&key.primes()[0].to_bytes_be());
        let q = Mpi::from_slice(&key.primes()[1].to_bytes_be());

        let digest = HashAlgorithm::SHA2_256.digest(b"binding data").unwrap();
        let sig = sign(&n, &e, &d, &p, &q, HashAlgorithm::SHA2_256, &digest).unwrap();

        verify(&n, &e, HashAlgorithm::SHA2_256, &digest, &sig).unwrap();

        let other = HashAlgorithm::SHA2_256.digest(b"other data").unwrap();
        assert!(verify(&n, &e, HashAlgorithm::SHA2_256, &other, &sig).is_err());
    }
}
