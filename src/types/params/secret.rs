use std::fmt;
use std::io::{self, BufRead};

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::checksum;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::ser::Serialize;
use crate::types::{Mpi, S2kUsage, StringToKey};

/// Cleartext secret MPIs, tagged by the algorithm family.
///
/// All elliptic curve algorithms store a single scalar, the way the
/// wire format does; the algorithm distinction lives in the key
/// packet. Values are scrubbed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum PlainSecretParams {
    Rsa { d: Mpi, p: Mpi, q: Mpi, u: Mpi },
    Dsa { x: Mpi },
    Elgamal { x: Mpi },
    Ec { x: Mpi },
}

impl PlainSecretParams {
    /// Parses the cleartext secret MPI region, without its checksum trailer.
    pub fn try_from_reader<B: BufRead>(alg: PublicKeyAlgorithm, i: &mut B) -> Result<Self> {
        let params = match alg {
            PublicKeyAlgorithm::RSA
            | PublicKeyAlgorithm::RSAEncrypt
            | PublicKeyAlgorithm::RSASign => PlainSecretParams::Rsa {
                d: Mpi::try_from_reader(i)?,
                p: Mpi::try_from_reader(i)?,
                q: Mpi::try_from_reader(i)?,
                u: Mpi::try_from_reader(i)?,
            },
            PublicKeyAlgorithm::DSA => PlainSecretParams::Dsa {
                x: Mpi::try_from_reader(i)?,
            },
            PublicKeyAlgorithm::ElgamalEncrypt | PublicKeyAlgorithm::Elgamal => {
                PlainSecretParams::Elgamal {
                    x: Mpi::try_from_reader(i)?,
                }
            }
            PublicKeyAlgorithm::ECDSA
            | PublicKeyAlgorithm::EdDSA
            | PublicKeyAlgorithm::ECDH
            | PublicKeyAlgorithm::SM2 => PlainSecretParams::Ec {
                x: Mpi::try_from_reader(i)?,
            },
            PublicKeyAlgorithm::Unknown(raw) => {
                unsupported_err!("secret params for public key algorithm {}", raw)
            }
        };

        Ok(params)
    }

    /// Writes the raw MPI stream, without any checksum trailer.
    pub fn to_writer_raw<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PlainSecretParams::Rsa { d, p, q, u } => {
                d.to_writer(writer)?;
                p.to_writer(writer)?;
                q.to_writer(writer)?;
                u.to_writer(writer)?;
            }
            PlainSecretParams::Dsa { x }
            | PlainSecretParams::Elgamal { x }
            | PlainSecretParams::Ec { x } => {
                x.to_writer(writer)?;
            }
        }

        Ok(())
    }

    pub fn write_len_raw(&self) -> usize {
        match self {
            PlainSecretParams::Rsa { d, p, q, u } => {
                d.write_len() + p.write_len() + q.write_len() + u.write_len()
            }
            PlainSecretParams::Dsa { x }
            | PlainSecretParams::Elgamal { x }
            | PlainSecretParams::Ec { x } => x.write_len(),
        }
    }

    pub fn checksum_simple(&self) -> Result<u16> {
        let mut buf = zeroize::Zeroizing::new(Vec::new());
        self.to_writer_raw(&mut *buf)?;
        Ok(checksum::calculate_simple(&buf))
    }

    pub fn checksum_sha1(&self) -> Result<[u8; 20]> {
        let mut buf = zeroize::Zeroizing::new(Vec::new());
        self.to_writer_raw(&mut *buf)?;
        Ok(checksum::calculate_sha1(&buf))
    }
}

impl fmt::Debug for PlainSecretParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlainSecretParams::Rsa { .. } => write!(f, "PlainSecretParams(RSA)"),
            PlainSecretParams::Dsa { .. } => write!(f, "PlainSecretParams(DSA)"),
            PlainSecretParams::Elgamal { .. } => write!(f, "PlainSecretParams(Elgamal)"),
            PlainSecretParams::Ec { .. } => write!(f, "PlainSecretParams(EC)"),
        }
    }
}

/// Only CFB is ever produced; the enum exists so a parsed protection
/// can be rejected in one place if a future format adds more modes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    #[default]
    Cfb,
}

/// How the stored secret blob of a key packet is protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretProtection {
    pub usage: S2kUsage,
    pub sym_alg: SymmetricKeyAlgorithm,
    pub cipher_mode: CipherMode,
    pub s2k: StringToKey,
    pub iv: Vec<u8>,
}

impl SecretProtection {
    /// Protection of a cleartext secret key.
    pub fn unprotected() -> Self {
        SecretProtection {
            usage: S2kUsage::None,
            sym_alg: SymmetricKeyAlgorithm::Plaintext,
            cipher_mode: CipherMode::Cfb,
            s2k: StringToKey::legacy_md5(),
            iv: Vec::new(),
        }
    }

    /// The protection used when locking keys: AES-256 CFB under an
    /// iterated & salted s2k, with the SHA-1 integrity trailer.
    pub fn new_default<R: rand::CryptoRng + rand::Rng>(rng: &mut R) -> Self {
        SecretProtection {
            usage: S2kUsage::EncryptedAndHashed,
            sym_alg: SymmetricKeyAlgorithm::AES256,
            cipher_mode: CipherMode::Cfb,
            s2k: StringToKey::new_default(rng),
            iv: Vec::new(),
        }
    }

    /// The cipher in effect, honoring the legacy usage form.
    pub fn effective_sym_alg(&self) -> SymmetricKeyAlgorithm {
        match self.usage {
            S2kUsage::LegacyCipher(alg) => alg,
            _ => self.sym_alg,
        }
    }

    /// Parses the protection header: usage octet, optional cipher
    /// algorithm and s2k, and the IV.
    pub fn try_from_reader<B: BufRead>(i: &mut B) -> Result<Self> {
        use crate::parsing_reader::BufReadParsing;

        let usage = S2kUsage::from_u8(i.read_u8()?);
        let protection = match usage {
            S2kUsage::None => SecretProtection::unprotected(),
            S2kUsage::Encrypted | S2kUsage::EncryptedAndHashed => {
                let sym_alg = SymmetricKeyAlgorithm::from(i.read_u8()?);
                let s2k = StringToKey::try_from_reader(i)?;
                let iv = i.take_bytes(sym_alg.block_size())?.to_vec();
                SecretProtection {
                    usage,
                    sym_alg,
                    cipher_mode: CipherMode::Cfb,
                    s2k,
                    iv,
                }
            }
            S2kUsage::LegacyCipher(sym_alg) => {
                ensure!(
                    sym_alg.block_size() > 0,
                    "legacy s2k usage with unknown cipher {:?}",
                    sym_alg
                );
                let iv = i.take_bytes(sym_alg.block_size())?.to_vec();
                SecretProtection {
                    usage,
                    sym_alg,
                    cipher_mode: CipherMode::Cfb,
                    s2k: StringToKey::legacy_md5(),
                    iv,
                }
            }
        };

        Ok(protection)
    }

    /// True when the SHA-1 trailer protects the secret MPIs, false for sum16.
    pub fn uses_sha1_checksum(&self) -> bool {
        self.usage == S2kUsage::EncryptedAndHashed
    }
}

impl Serialize for SecretProtection {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.usage.to_u8()])?;
        match self.usage {
            S2kUsage::None => {}
            S2kUsage::Encrypted | S2kUsage::EncryptedAndHashed => {
                writer.write_all(&[u8::from(self.sym_alg)])?;
                self.s2k.to_writer(writer)?;
                writer.write_all(&self.iv)?;
            }
            S2kUsage::LegacyCipher(_) => {
                // the usage octet already is the algorithm
                writer.write_all(&self.iv)?;
            }
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        match self.usage {
            S2kUsage::None => 1,
            S2kUsage::Encrypted | S2kUsage::EncryptedAndHashed => {
                1 + 1 + self.s2k.write_len() + self.iv.len()
            }
            S2kUsage::LegacyCipher(_) => 1 + self.iv.len(),
        }
    }
}

impl SecretProtection {
    /// Only CFB-protected (or cleartext) keys can be handled.
    pub(crate) fn ensure_supported(&self) -> Result<()> {
        if self.usage.is_protected() && self.cipher_mode != CipherMode::Cfb {
            return Err(Error::bad_parameters("unsupported secret key cipher mode"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn protection_header_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut protection = SecretProtection::new_default(&mut rng);
        protection.iv = vec![0xAB; protection.sym_alg.block_size()];

        let buf = protection.to_bytes().unwrap();
        assert_eq!(buf.len(), protection.write_len());
        assert_eq!(buf[0], 254);

        let back = SecretProtection::try_from_reader(&mut &buf[..]).unwrap();
        assert_eq!(protection, back);
    }

    #[test]
    fn unprotected_header_is_one_byte() {
        let protection = SecretProtection::unprotected();
        assert_eq!(protection.to_bytes().unwrap(), vec![0]);
    }

    #[test]
    fn legacy_usage_parses_cipher_and_iv() {
        // usage octet 9 = AES256, then a bare 16 byte IV
        let mut data = vec![9u8];
        data.extend_from_slice(&[1u8; 16]);

        let protection = SecretProtection::try_from_reader(&mut &data[..]).unwrap();
        assert_eq!(
            protection.effective_sym_alg(),
            SymmetricKeyAlgorithm::AES256
        );
        assert_eq!(protection.iv.len(), 16);
        assert_eq!(protection.to_bytes().unwrap(), data);
    }
}
