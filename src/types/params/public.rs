use std::io::{self, BufRead};

use crate::crypto::ecc_curve::EccCurve;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::Mpi;

/// The public parameters of a key, in the algorithm-defined MPI order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicParams {
    Rsa {
        n: Mpi,
        e: Mpi,
    },
    Dsa {
        p: Mpi,
        q: Mpi,
        g: Mpi,
        y: Mpi,
    },
    Elgamal {
        p: Mpi,
        g: Mpi,
        y: Mpi,
    },
    Ecdsa {
        curve: EccCurve,
        point: Mpi,
    },
    Eddsa {
        curve: EccCurve,
        point: Mpi,
    },
    Sm2 {
        curve: EccCurve,
        point: Mpi,
    },
    Ecdh {
        curve: EccCurve,
        point: Mpi,
        hash: HashAlgorithm,
        alg_sym: SymmetricKeyAlgorithm,
    },
}

fn read_curve<B: BufRead>(i: &mut B) -> Result<EccCurve> {
    let oid_len = i.read_u8()?;
    // 0 and 0xFF are reserved for future extension
    if oid_len == 0 || oid_len == 0xFF {
        return Err(Error::bad_format(format!("invalid curve oid length {}", oid_len)));
    }
    let oid = i.take_bytes(usize::from(oid_len))?;
    Ok(EccCurve::from_oid(&oid))
}

impl PublicParams {
    pub fn try_from_reader<B: BufRead>(alg: PublicKeyAlgorithm, i: &mut B) -> Result<Self> {
        let params = match alg {
            PublicKeyAlgorithm::RSA
            | PublicKeyAlgorithm::RSAEncrypt
            | PublicKeyAlgorithm::RSASign => PublicParams::Rsa {
                n: Mpi::try_from_reader(i)?,
                e: Mpi::try_from_reader(i)?,
            },
            PublicKeyAlgorithm::DSA => PublicParams::Dsa {
                p: Mpi::try_from_reader(i)?,
                q: Mpi::try_from_reader(i)?,
                g: Mpi::try_from_reader(i)?,
                y: Mpi::try_from_reader(i)?,
            },
            PublicKeyAlgorithm::ElgamalEncrypt | PublicKeyAlgorithm::Elgamal => {
                PublicParams::Elgamal {
                    p: Mpi::try_from_reader(i)?,
                    g: Mpi::try_from_reader(i)?,
                    y: Mpi::try_from_reader(i)?,
                }
            }
            PublicKeyAlgorithm::ECDSA => PublicParams::Ecdsa {
                curve: read_curve(i)?,
                point: Mpi::try_from_reader(i)?,
            },
            PublicKeyAlgorithm::EdDSA => PublicParams::Eddsa {
                curve: read_curve(i)?,
                point: Mpi::try_from_reader(i)?,
            },
            PublicKeyAlgorithm::SM2 => PublicParams::Sm2 {
                curve: read_curve(i)?,
                point: Mpi::try_from_reader(i)?,
            },
            PublicKeyAlgorithm::ECDH => {
                let curve = read_curve(i)?;
                let point = Mpi::try_from_reader(i)?;
                let kdf_len = i.read_u8()?;
                ensure_eq!(kdf_len, 3, "invalid ecdh kdf parameter length");
                let reserved = i.read_u8()?;
                ensure_eq!(reserved, 1, "invalid ecdh kdf parameter version");
                let hash = HashAlgorithm::from(i.read_u8()?);
                let alg_sym = SymmetricKeyAlgorithm::from(i.read_u8()?);
                PublicParams::Ecdh {
                    curve,
                    point,
                    hash,
                    alg_sym,
                }
            }
            PublicKeyAlgorithm::Unknown(raw) => {
                unsupported_err!("public key algorithm {}", raw)
            }
        };

        Ok(params)
    }

    pub fn curve(&self) -> Option<&EccCurve> {
        match self {
            PublicParams::Ecdsa { curve, .. }
            | PublicParams::Eddsa { curve, .. }
            | PublicParams::Sm2 { curve, .. }
            | PublicParams::Ecdh { curve, .. } => Some(curve),
            _ => None,
        }
    }
}

impl Serialize for PublicParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PublicParams::Rsa { n, e } => {
                n.to_writer(writer)?;
                e.to_writer(writer)?;
            }
            PublicParams::Dsa { p, q, g, y } => {
                p.to_writer(writer)?;
                q.to_writer(writer)?;
                g.to_writer(writer)?;
                y.to_writer(writer)?;
            }
            PublicParams::Elgamal { p, g, y } => {
                p.to_writer(writer)?;
                g.to_writer(writer)?;
                y.to_writer(writer)?;
            }
            PublicParams::Ecdsa { curve, point }
            | PublicParams::Eddsa { curve, point }
            | PublicParams::Sm2 { curve, point } => {
                let oid = curve.oid();
                writer.write_all(&[oid.len() as u8])?;
                writer.write_all(oid)?;
                point.to_writer(writer)?;
            }
            PublicParams::Ecdh {
                curve,
                point,
                hash,
                alg_sym,
            } => {
                let oid = curve.oid();
                writer.write_all(&[oid.len() as u8])?;
                writer.write_all(oid)?;
                point.to_writer(writer)?;
                writer.write_all(&[3, 1, u8::from(*hash), u8::from(*alg_sym)])?;
            }
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            PublicParams::Rsa { n, e } => n.write_len() + e.write_len(),
            PublicParams::Dsa { p, q, g, y } => {
                p.write_len() + q.write_len() + g.write_len() + y.write_len()
            }
            PublicParams::Elgamal { p, g, y } => p.write_len() + g.write_len() + y.write_len(),
            PublicParams::Ecdsa { curve, point }
            | PublicParams::Eddsa { curve, point }
            | PublicParams::Sm2 { curve, point } => 1 + curve.oid().len() + point.write_len(),
            PublicParams::Ecdh { curve, point, .. } => {
                1 + curve.oid().len() + point.write_len() + 4
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsa_roundtrip() {
        let params = PublicParams::Rsa {
            n: Mpi::from_slice(&[0xAA; 128]),
            e: Mpi::from_slice(&[0x01, 0x00, 0x01]),
        };
        let buf = params.to_bytes().unwrap();
        assert_eq!(buf.len(), params.write_len());

        let back = PublicParams::try_from_reader(PublicKeyAlgorithm::RSA, &mut &buf[..]).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn ecdh_roundtrip() {
        let params = PublicParams::Ecdh {
            curve: EccCurve::Curve25519,
            point: Mpi::from_slice(&[0x40; 33]),
            hash: HashAlgorithm::SHA2_256,
            alg_sym: SymmetricKeyAlgorithm::AES128,
        };
        let buf = params.to_bytes().unwrap();
        assert_eq!(buf.len(), params.write_len());

        let back = PublicParams::try_from_reader(PublicKeyAlgorithm::ECDH, &mut &buf[..]).unwrap();
        assert_eq!(params, back);
    }
}
