use std::io::{self, BufRead};

use byteorder::{BigEndian, WriteBytesExt};
use num_enum::{FromPrimitive, IntoPrimitive};
use smallvec::SmallVec;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::packet::signature::Signature;
use crate::packet::PacketHeader;
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, Fingerprint, KeyFlags, KeyId, Tag};
use crate::util::read_string_lossy;

/// Reason codes of the revocation reason subpacket.
/// Ref: https://tools.ietf.org/html/rfc4880.html#section-5.2.3.23
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum RevocationCode {
    NoReason = 0,
    KeySuperseded = 1,
    KeyCompromised = 2,
    KeyRetired = 3,
    UserIdInvalid = 32,

    #[num_enum(catch_all)]
    Other(u8),
}

impl RevocationCode {
    /// Human readable stand-in used when a revocation carries no text.
    pub fn default_reason(self) -> &'static str {
        match self {
            RevocationCode::NoReason => "No reason specified",
            RevocationCode::KeySuperseded => "Key is superseded",
            RevocationCode::KeyCompromised => "Key material has been compromised",
            RevocationCode::KeyRetired => "Key is retired and no longer used",
            RevocationCode::UserIdInvalid => "User ID information is no longer valid",
            RevocationCode::Other(_) => "Unknown revocation reason",
        }
    }
}

/// One signature subpacket with its criticality bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subpacket {
    pub is_critical: bool,
    pub data: SubpacketData,
}

impl Subpacket {
    /// A regular (non-critical) subpacket.
    pub fn regular(data: SubpacketData) -> Self {
        Subpacket {
            is_critical: false,
            data,
        }
    }
}

/// Decoded subpacket payloads. Types this crate does not interpret
/// are carried verbatim in `Other` so nothing is dropped on rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubpacketData {
    /// The time the signature was made (seconds since the epoch).
    SignatureCreationTime(u32),
    /// Seconds after creation at which the signature expires; 0 never.
    SignatureExpirationTime(u32),
    /// Seconds after key creation at which the key expires; 0 never.
    KeyExpirationTime(u32),
    IssuerKeyId(KeyId),
    IssuerFingerprint(Fingerprint),
    PreferredSymmetricAlgorithms(SmallVec<[SymmetricKeyAlgorithm; 8]>),
    PreferredHashAlgorithms(SmallVec<[HashAlgorithm; 8]>),
    PreferredCompressionAlgorithms(SmallVec<[CompressionAlgorithm; 8]>),
    KeyServerPreferences(SmallVec<[u8; 4]>),
    PreferredKeyServer(String),
    PrimaryUserId(bool),
    KeyFlags(KeyFlags),
    RevocationReason(RevocationCode, Vec<u8>),
    EmbeddedSignature(Box<Signature>),
    Other(u8, Vec<u8>),
}

// wire type ids
const SIG_CREATION_TIME: u8 = 2;
const SIG_EXPIRATION_TIME: u8 = 3;
const KEY_EXPIRATION_TIME: u8 = 9;
const PREFERRED_SYMMETRIC: u8 = 11;
const ISSUER_KEY_ID: u8 = 16;
const PREFERRED_HASH: u8 = 21;
const PREFERRED_COMPRESSION: u8 = 22;
const KEY_SERVER_PREFS: u8 = 23;
const PREFERRED_KEY_SERVER: u8 = 24;
const PRIMARY_USER_ID: u8 = 25;
const KEY_FLAGS: u8 = 27;
const REVOCATION_REASON: u8 = 29;
const EMBEDDED_SIGNATURE: u8 = 32;
const ISSUER_FINGERPRINT: u8 = 33;

impl SubpacketData {
    pub fn typ(&self) -> u8 {
        match self {
            SubpacketData::SignatureCreationTime(_) => SIG_CREATION_TIME,
            SubpacketData::SignatureExpirationTime(_) => SIG_EXPIRATION_TIME,
            SubpacketData::KeyExpirationTime(_) => KEY_EXPIRATION_TIME,
            SubpacketData::PreferredSymmetricAlgorithms(_) => PREFERRED_SYMMETRIC,
            SubpacketData::IssuerKeyId(_) => ISSUER_KEY_ID,
            SubpacketData::PreferredHashAlgorithms(_) => PREFERRED_HASH,
            SubpacketData::PreferredCompressionAlgorithms(_) => PREFERRED_COMPRESSION,
            SubpacketData::KeyServerPreferences(_) => KEY_SERVER_PREFS,
            SubpacketData::PreferredKeyServer(_) => PREFERRED_KEY_SERVER,
            SubpacketData::PrimaryUserId(_) => PRIMARY_USER_ID,
            SubpacketData::KeyFlags(_) => KEY_FLAGS,
            SubpacketData::RevocationReason(_, _) => REVOCATION_REASON,
            SubpacketData::EmbeddedSignature(_) => EMBEDDED_SIGNATURE,
            SubpacketData::IssuerFingerprint(_) => ISSUER_FINGERPRINT,
            SubpacketData::Other(typ, _) => *typ,
        }
    }

    fn body_write_len(&self) -> usize {
        match self {
            SubpacketData::SignatureCreationTime(_)
            | SubpacketData::SignatureExpirationTime(_)
            | SubpacketData::KeyExpirationTime(_) => 4,
            SubpacketData::IssuerKeyId(_) => 8,
            SubpacketData::IssuerFingerprint(fp) => 1 + fp.len(),
            SubpacketData::PreferredSymmetricAlgorithms(algs) => algs.len(),
            SubpacketData::PreferredHashAlgorithms(algs) => algs.len(),
            SubpacketData::PreferredCompressionAlgorithms(algs) => algs.len(),
            SubpacketData::KeyServerPreferences(prefs) => prefs.len(),
            SubpacketData::PreferredKeyServer(url) => url.len(),
            SubpacketData::PrimaryUserId(_) => 1,
            SubpacketData::KeyFlags(_) => 1,
            SubpacketData::RevocationReason(_, reason) => 1 + reason.len(),
            SubpacketData::EmbeddedSignature(sig) => sig.write_len(),
            SubpacketData::Other(_, body) => body.len(),
        }
    }

    fn body_to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            SubpacketData::SignatureCreationTime(t)
            | SubpacketData::SignatureExpirationTime(t)
            | SubpacketData::KeyExpirationTime(t) => {
                writer.write_u32::<BigEndian>(*t)?;
            }
            SubpacketData::IssuerKeyId(id) => {
                writer.write_all(id.as_ref())?;
            }
            SubpacketData::IssuerFingerprint(fp) => {
                writer.write_u8(fp.version().into())?;
                writer.write_all(fp.as_bytes())?;
            }
            SubpacketData::PreferredSymmetricAlgorithms(algs) => {
                for alg in algs {
                    writer.write_u8((*alg).into())?;
                }
            }
            SubpacketData::PreferredHashAlgorithms(algs) => {
                for alg in algs {
                    writer.write_u8((*alg).into())?;
                }
            }
            SubpacketData::PreferredCompressionAlgorithms(algs) => {
                for alg in algs {
                    writer.write_u8((*alg).into())?;
                }
            }
            SubpacketData::KeyServerPreferences(prefs) => {
                writer.write_all(prefs)?;
            }
            SubpacketData::PreferredKeyServer(url) => {
                writer.write_all(url.as_bytes())?;
            }
            SubpacketData::PrimaryUserId(primary) => {
                writer.write_u8(u8::from(*primary))?;
            }
            SubpacketData::KeyFlags(flags) => {
                writer.write_u8(flags.bits())?;
            }
            SubpacketData::RevocationReason(code, reason) => {
                writer.write_u8((*code).into())?;
                writer.write_all(reason)?;
            }
            SubpacketData::EmbeddedSignature(sig) => {
                sig.to_writer(writer)?;
            }
            SubpacketData::Other(_, body) => {
                writer.write_all(body)?;
            }
        }
        Ok(())
    }
}

impl Serialize for Subpacket {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let len = self.data.body_write_len() + 1;
        write_subpacket_len(len, writer)?;

        let mut typ = self.data.typ();
        if self.is_critical {
            typ |= 0b1000_0000;
        }
        writer.write_u8(typ)?;

        self.data.body_to_writer(writer)
    }

    fn write_len(&self) -> usize {
        let len = self.data.body_write_len() + 1;
        subpacket_len_encoding_len(len) + len
    }
}

/// Parses a whole subpacket area.
pub(crate) fn read_subpackets(area: &[u8]) -> Result<Vec<Subpacket>> {
    let mut i = area;
    let mut subpackets = Vec::new();
    while i.has_remaining()? {
        subpackets.push(read_subpacket(&mut i)?);
    }
    Ok(subpackets)
}

/// Serializes a subpacket list into an area buffer.
pub(crate) fn write_subpackets(subpackets: &[Subpacket]) -> Result<Vec<u8>> {
    let mut area = Vec::with_capacity(subpackets.iter().map(Serialize::write_len).sum());
    for sp in subpackets {
        sp.to_writer(&mut area)?;
    }
    Ok(area)
}

fn read_subpacket<B: BufRead>(i: &mut B) -> Result<Subpacket> {
    let len = read_subpacket_len(i)?;
    ensure!(len > 0, "empty signature subpacket");

    let typ_raw = i.read_u8()?;
    let is_critical = typ_raw & 0b1000_0000 != 0;
    let typ = typ_raw & 0b0111_1111;

    let body = i.take_bytes(len - 1)?;
    let mut b = &body[..];

    let data = match typ {
        SIG_CREATION_TIME => SubpacketData::SignatureCreationTime(b.read_be_u32()?),
        SIG_EXPIRATION_TIME => SubpacketData::SignatureExpirationTime(b.read_be_u32()?),
        KEY_EXPIRATION_TIME => SubpacketData::KeyExpirationTime(b.read_be_u32()?),
        ISSUER_KEY_ID => SubpacketData::IssuerKeyId(KeyId::from_slice(&b.read_array::<8>()?)?),
        ISSUER_FINGERPRINT => {
            let _key_version = b.read_u8()?;
            let fp = b.rest()?;
            SubpacketData::IssuerFingerprint(Fingerprint::from_bytes(&fp)?)
        }
        PREFERRED_SYMMETRIC => SubpacketData::PreferredSymmetricAlgorithms(
            body[..].iter().map(|v| SymmetricKeyAlgorithm::from(*v)).collect(),
        ),
        PREFERRED_HASH => SubpacketData::PreferredHashAlgorithms(
            body[..].iter().map(|v| HashAlgorithm::from(*v)).collect(),
        ),
        PREFERRED_COMPRESSION => SubpacketData::PreferredCompressionAlgorithms(
            body[..].iter().map(|v| CompressionAlgorithm::from(*v)).collect(),
        ),
        KEY_SERVER_PREFS => {
            SubpacketData::KeyServerPreferences(SmallVec::from_slice(&body))
        }
        PREFERRED_KEY_SERVER => {
            SubpacketData::PreferredKeyServer(read_string_lossy(&body))
        }
        PRIMARY_USER_ID => SubpacketData::PrimaryUserId(b.read_u8()? != 0),
        KEY_FLAGS => {
            // additional octets are reserved; only the first carries flags
            SubpacketData::KeyFlags(KeyFlags::from_bits(b.read_u8()?))
        }
        REVOCATION_REASON => {
            let code = RevocationCode::from(b.read_u8()?);
            let reason = b.rest()?.to_vec();
            SubpacketData::RevocationReason(code, reason)
        }
        EMBEDDED_SIGNATURE => {
            let header = PacketHeader::from_tag(Tag::Signature);
            let sig = Signature::try_from_reader(header, &mut b)?;
            SubpacketData::EmbeddedSignature(Box::new(sig))
        }
        _ => SubpacketData::Other(typ, body.to_vec()),
    };

    Ok(Subpacket { is_critical, data })
}

/// Subpacket length framing.
/// Ref: https://tools.ietf.org/html/rfc4880.html#section-5.2.3.1
fn read_subpacket_len<B: BufRead>(i: &mut B) -> Result<usize> {
    let olen = i.read_u8()?;
    let len = match olen {
        0..=191 => usize::from(olen),
        192..=254 => {
            let a = i.read_u8()?;
            ((usize::from(olen) - 192) << 8) + 192 + usize::from(a)
        }
        255 => i.read_be_u32()?.try_into()?,
    };
    Ok(len)
}

fn write_subpacket_len<W: io::Write>(len: usize, writer: &mut W) -> Result<()> {
    if len < 192 {
        writer.write_u8(len as u8)?;
    } else if len < 16320 {
        writer.write_u8((((len - 192) >> 8) + 192) as u8)?;
        writer.write_u8(((len - 192) & 0xFF) as u8)?;
    } else {
        writer.write_u8(255)?;
        writer.write_u32::<BigEndian>(u32::try_from(len).map_err(|_| {
            Error::bad_parameters("subpacket too large")
        })?)?;
    }
    Ok(())
}

fn subpacket_len_encoding_len(len: usize) -> usize {
    if len < 192 {
        1
    } else if len < 16320 {
        2
    } else {
        5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(sp: Subpacket) {
        let mut buf = Vec::new();
        sp.to_writer(&mut buf).unwrap();
        assert_eq!(buf.len(), sp.write_len());

        let back = read_subpacket(&mut &buf[..]).unwrap();
        assert_eq!(sp, back);
    }

    #[test]
    fn simple_subpackets_roundtrip() {
        roundtrip(Subpacket::regular(SubpacketData::SignatureCreationTime(
            1_600_000_000,
        )));
        roundtrip(Subpacket::regular(SubpacketData::KeyExpirationTime(86400)));
        roundtrip(Subpacket::regular(SubpacketData::IssuerKeyId(
            KeyId::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap(),
        )));
        roundtrip(Subpacket::regular(SubpacketData::PrimaryUserId(true)));
        roundtrip(Subpacket::regular(SubpacketData::KeyFlags(
            KeyFlags::CERTIFY | KeyFlags::SIGN,
        )));
        roundtrip(Subpacket::regular(SubpacketData::PreferredSymmetricAlgorithms(
            [SymmetricKeyAlgorithm::AES256, SymmetricKeyAlgorithm::AES128]
                .into_iter()
                .collect(),
        )));
        roundtrip(Subpacket::regular(SubpacketData::PreferredKeyServer(
            "hkps://keys.example.com".to_string(),
        )));
        roundtrip(Subpacket::regular(SubpacketData::RevocationReason(
            RevocationCode::KeyRetired,
            b"moved to new hardware".to_vec(),
        )));
        roundtrip(Subpacket {
            is_critical: true,
            data: SubpacketData::Other(100, vec![1, 2, 3]),
        });
    }

    #[test]
    fn issuer_fingerprint_carries_version_octet() {
        let fp = Fingerprint::from_bytes(&[0xCD; 20]).unwrap();
        let sp = Subpacket::regular(SubpacketData::IssuerFingerprint(fp));

        let mut buf = Vec::new();
        sp.to_writer(&mut buf).unwrap();
        // len, type, version octet, 20 bytes
        assert_eq!(buf.len(), 1 + 1 + 1 + 20);
        assert_eq!(buf[2], 4);

        roundtrip(sp);
    }

    #[test]
    fn area_roundtrip() {
        let subpackets = vec![
            Subpacket::regular(SubpacketData::SignatureCreationTime(12345)),
            Subpacket::regular(SubpacketData::KeyFlags(KeyFlags::ENCRYPT)),
        ];
        let area = write_subpackets(&subpackets).unwrap();
        let back = read_subpackets(&area).unwrap();
        assert_eq!(subpackets, back);
    }
}
