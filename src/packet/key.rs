use std::io::{self, BufRead};

use byteorder::{BigEndian, WriteBytesExt};
use chrono::{DateTime, TimeZone, Utc};

use crate::crypto::checksum;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::{
    Fingerprint, KeyGrip, KeyId, KeyVersion, PlainSecretParams, PublicParams, SecretProtection,
    Tag,
};

/// A primary key or subkey packet, public or secret.
///
/// For secret tags the stored blob and its protection ride along;
/// the cleartext MPIs only exist after a successful
/// [`decrypt_secret_key`](KeyPacket::decrypt_secret_key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPacket {
    packet_header: PacketHeader,
    version: KeyVersion,
    created_at: DateTime<Utc>,
    /// v3 only: days until expiration, 0 for never.
    expiration_days: u16,
    algorithm: PublicKeyAlgorithm,
    public_params: PublicParams,
    secret: Option<SecretFields>,
}

/// The secret layer of a secret key packet.
#[derive(Debug, Clone)]
pub struct SecretFields {
    pub protection: SecretProtection,
    /// The stored secret blob: encrypted, or cleartext MPIs plus
    /// checksum trailer when unprotected.
    pub data: Vec<u8>,
    /// Decrypted secret material; `None` while locked.
    pub plain: Option<PlainSecretParams>,
}

/// Key equality is over the packet bytes; whether the secret MPIs
/// happen to be decrypted right now does not change the packet.
impl PartialEq for SecretFields {
    fn eq(&self, other: &Self) -> bool {
        self.protection == other.protection && self.data == other.data
    }
}

impl Eq for SecretFields {}

pub(crate) fn timestamp_to_datetime(secs: u32) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(i64::from(secs), 0)
        .single()
        .ok_or_else(|| Error::bad_format(format!("invalid timestamp {}", secs)))
}

impl KeyPacket {
    /// A fresh v4 public (sub)key packet.
    pub fn new_v4_public(
        tag: Tag,
        created_at: DateTime<Utc>,
        algorithm: PublicKeyAlgorithm,
        public_params: PublicParams,
    ) -> Result<Self> {
        ensure!(
            tag == Tag::PublicKey || tag == Tag::PublicSubkey,
            "not a public key tag: {:?}",
            tag
        );
        Ok(KeyPacket {
            packet_header: PacketHeader::from_tag(tag),
            version: KeyVersion::V4,
            created_at: truncate_to_secs(created_at)?,
            expiration_days: 0,
            algorithm,
            public_params,
            secret: None,
        })
    }

    /// A fresh v4 secret (sub)key packet with cleartext secret material.
    pub fn new_v4_secret(
        tag: Tag,
        created_at: DateTime<Utc>,
        algorithm: PublicKeyAlgorithm,
        public_params: PublicParams,
        plain: PlainSecretParams,
    ) -> Result<Self> {
        ensure!(tag.is_secret_key(), "not a secret key tag: {:?}", tag);
        let mut pkt = KeyPacket {
            packet_header: PacketHeader::from_tag(tag),
            version: KeyVersion::V4,
            created_at: truncate_to_secs(created_at)?,
            expiration_days: 0,
            algorithm,
            public_params,
            secret: Some(SecretFields {
                protection: SecretProtection::unprotected(),
                data: Vec::new(),
                plain: Some(plain),
            }),
        };
        pkt.rebuild_cleartext_data()?;
        Ok(pkt)
    }

    /// Parses a key packet body; the tag comes from the header.
    pub fn try_from_reader<B: BufRead>(packet_header: PacketHeader, i: &mut B) -> Result<Self> {
        let tag = packet_header.tag();
        ensure!(tag.is_key(), "not a key packet tag: {:?}", tag);

        let version = KeyVersion::try_from_u8(i.read_u8()?)?;
        let created_at = timestamp_to_datetime(i.read_be_u32()?)?;
        let expiration_days = match version {
            KeyVersion::V3 => i.read_be_u16()?,
            KeyVersion::V4 => 0,
        };
        let algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
        let public_params = PublicParams::try_from_reader(algorithm, i)?;

        let secret = if tag.is_secret_key() {
            if version == KeyVersion::V3 && !algorithm.is_rsa() {
                return Err(Error::bad_format(
                    "v3 secret keys must use an RSA algorithm",
                ));
            }
            let protection = SecretProtection::try_from_reader(i)?;
            protection.ensure_supported()?;
            let data = i.rest()?.to_vec();
            Some(SecretFields {
                protection,
                data,
                plain: None,
            })
        } else {
            None
        };

        Ok(KeyPacket {
            packet_header,
            version,
            created_at,
            expiration_days,
            algorithm,
            public_params,
            secret,
        })
    }

    pub fn version(&self) -> KeyVersion {
        self.version
    }

    pub fn tag(&self) -> Tag {
        self.packet_header.tag()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expiration_days(&self) -> u16 {
        self.expiration_days
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    pub fn public_params(&self) -> &PublicParams {
        &self.public_params
    }

    pub fn is_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// True when the stored secret blob is password protected.
    pub fn is_protected(&self) -> bool {
        self.secret
            .as_ref()
            .map(|s| s.protection.usage.is_protected())
            .unwrap_or(false)
    }

    /// True once the cleartext secret MPIs are available.
    pub fn has_secret_material(&self) -> bool {
        self.secret
            .as_ref()
            .map(|s| s.plain.is_some())
            .unwrap_or(false)
    }

    pub fn protection(&self) -> Option<&SecretProtection> {
        self.secret.as_ref().map(|s| &s.protection)
    }

    pub fn set_protection(&mut self, protection: SecretProtection) -> Result<()> {
        let secret = self
            .secret
            .as_mut()
            .ok_or_else(|| Error::bad_parameters("not a secret key packet"))?;
        secret.protection = protection;
        Ok(())
    }

    pub fn secret_params(&self) -> Option<&PlainSecretParams> {
        self.secret.as_ref().and_then(|s| s.plain.as_ref())
    }

    pub(crate) fn secret_fields(&self) -> Option<&SecretFields> {
        self.secret.as_ref()
    }

    pub(crate) fn secret_fields_mut(&mut self) -> Option<&mut SecretFields> {
        self.secret.as_mut()
    }

    /// Scrubs the cleartext secret MPIs; the stored blob remains.
    pub fn forget_secret_material(&mut self) {
        if let Some(secret) = self.secret.as_mut() {
            // PlainSecretParams zeroizes on drop
            secret.plain = None;
        }
    }

    /// A copy with the public tag and without any secret material.
    pub fn pubonly(&self) -> KeyPacket {
        KeyPacket {
            packet_header: self.packet_header.with_tag(self.tag().as_public()),
            version: self.version,
            created_at: self.created_at,
            expiration_days: self.expiration_days,
            algorithm: self.algorithm,
            public_params: self.public_params.clone(),
            secret: None,
        }
    }

    /// Compares the public halves, ignoring tags and secret material.
    pub fn pub_eq(&self, other: &KeyPacket) -> bool {
        self.version == other.version
            && self.created_at == other.created_at
            && self.expiration_days == other.expiration_days
            && self.algorithm == other.algorithm
            && self.public_params == other.public_params
    }

    /// Writes the canonical public key body: the serialization that
    /// fingerprints and signature hashes are computed over.
    pub fn to_public_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version.into())?;
        writer.write_u32::<BigEndian>(self.created_at.timestamp() as u32)?;
        if self.version == KeyVersion::V3 {
            writer.write_u16::<BigEndian>(self.expiration_days)?;
        }
        writer.write_u8(self.algorithm.into())?;
        self.public_params.to_writer(writer)?;

        Ok(())
    }

    pub fn public_write_len(&self) -> usize {
        let mut len = 1 + 4 + 1 + self.public_params.write_len();
        if self.version == KeyVersion::V3 {
            len += 2;
        }
        len
    }

    pub fn fingerprint(&self) -> Result<Fingerprint> {
        match self.version {
            KeyVersion::V4 => {
                let mut hasher = HashAlgorithm::SHA1.new_hasher()?;
                let mut body = Vec::with_capacity(self.public_write_len());
                self.to_public_writer(&mut body)?;

                hasher.update(&[0x99, (body.len() >> 8) as u8, body.len() as u8]);
                hasher.update(&body);

                Fingerprint::new(KeyVersion::V4, &hasher.finish())
            }
            KeyVersion::V3 => match &self.public_params {
                PublicParams::Rsa { n, e } => {
                    let mut hasher = HashAlgorithm::MD5.new_hasher()?;
                    hasher.update(n.as_ref());
                    hasher.update(e.as_ref());
                    Fingerprint::new(KeyVersion::V3, &hasher.finish())
                }
                _ => Err(Error::bad_parameters("v3 fingerprints require RSA keys")),
            },
        }
    }

    pub fn key_id(&self) -> Result<KeyId> {
        match self.version {
            KeyVersion::V4 => self
                .fingerprint()?
                .key_id()
                .ok_or_else(|| Error::bad_state("v4 fingerprint without key id")),
            KeyVersion::V3 => match &self.public_params {
                PublicParams::Rsa { n, .. } => {
                    let bytes = n.as_ref();
                    ensure!(bytes.len() >= 8, "rsa modulus too short");
                    KeyId::from_slice(&bytes[bytes.len() - 8..])
                }
                _ => Err(Error::bad_parameters("v3 key ids require RSA keys")),
            },
        }
    }

    /// The grip: SHA-1 over the raw public key material, independent
    /// of creation time and framing.
    pub fn grip(&self) -> Result<KeyGrip> {
        let material = self.public_params.to_bytes()?;
        KeyGrip::from_slice(&checksum::calculate_sha1(&material))
    }
}

fn truncate_to_secs(time: DateTime<Utc>) -> Result<DateTime<Utc>> {
    timestamp_to_datetime(u32::try_from(time.timestamp())?)
}

impl Serialize for KeyPacket {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.to_public_writer(writer)?;

        if let Some(secret) = &self.secret {
            secret.protection.to_writer(writer)?;
            writer.write_all(&secret.data)?;
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut len = self.public_write_len();
        if let Some(secret) = &self.secret {
            len += secret.protection.write_len() + secret.data.len();
        }
        len
    }
}

impl PacketTrait for KeyPacket {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mpi;

    fn test_public_packet(tag: Tag) -> KeyPacket {
        KeyPacket::new_v4_public(
            tag,
            timestamp_to_datetime(1_600_000_000).unwrap(),
            PublicKeyAlgorithm::RSA,
            PublicParams::Rsa {
                n: Mpi::from_slice(&[0xAB; 256]),
                e: Mpi::from_slice(&[0x01, 0x00, 0x01]),
            },
        )
        .unwrap()
    }

    #[test]
    fn public_roundtrip() {
        let pkt = test_public_packet(Tag::PublicKey);
        let body = pkt.to_bytes().unwrap();
        assert_eq!(body.len(), pkt.write_len());

        let back =
            KeyPacket::try_from_reader(*pkt.packet_header(), &mut &body[..]).unwrap();
        assert_eq!(pkt, back);
    }

    #[test]
    fn secret_roundtrip() {
        let pkt = KeyPacket::new_v4_secret(
            Tag::SecretKey,
            timestamp_to_datetime(1_600_000_000).unwrap(),
            PublicKeyAlgorithm::EdDSA,
            PublicParams::Eddsa {
                curve: crate::crypto::EccCurve::Ed25519,
                point: Mpi::from_slice(&[0x40; 33]),
            },
            PlainSecretParams::Ec {
                x: Mpi::from_slice(&[7u8; 32]),
            },
        )
        .unwrap();

        let body = pkt.to_bytes().unwrap();
        let mut back =
            KeyPacket::try_from_reader(*pkt.packet_header(), &mut &body[..]).unwrap();

        // the blob is cleartext, unlocking without a password restores the MPIs
        back.decrypt_secret_key(None).unwrap();
        assert_eq!(pkt, back);
    }

    #[test]
    fn fingerprint_grip_and_key_id_are_stable_across_pubonly() {
        let pkt = test_public_packet(Tag::PublicKey);
        let secretish = KeyPacket::new_v4_secret(
            Tag::SecretKey,
            pkt.created_at(),
            PublicKeyAlgorithm::RSA,
            pkt.public_params().clone(),
            PlainSecretParams::Rsa {
                d: Mpi::from_slice(&[1]),
                p: Mpi::from_slice(&[2]),
                q: Mpi::from_slice(&[3]),
                u: Mpi::from_slice(&[4]),
            },
        )
        .unwrap();

        assert_eq!(pkt.fingerprint().unwrap(), secretish.fingerprint().unwrap());
        assert_eq!(pkt.key_id().unwrap(), secretish.key_id().unwrap());
        assert_eq!(pkt.grip().unwrap(), secretish.grip().unwrap());

        let pubonly = secretish.pubonly();
        assert_eq!(pubonly.tag(), Tag::PublicKey);
        assert!(!pubonly.is_secret());
        assert!(pubonly.pub_eq(&secretish));
    }

    #[test]
    fn v3_secret_non_rsa_is_rejected() {
        // v3 secret key packet body with a DSA algorithm id
        let mut body = vec![3u8];
        body.extend_from_slice(&1_600_000_000u32.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        body.push(17); // DSA
        for _ in 0..4 {
            // minimal p, q, g, y
            body.extend_from_slice(&[0x00, 0x01, 0x01]);
        }
        body.push(0); // unprotected secret layer

        let header = PacketHeader::from_tag(Tag::SecretKey);
        let err = KeyPacket::try_from_reader(header, &mut &body[..]).unwrap_err();
        assert!(matches!(err, Error::BadFormat { .. }), "{:?}", err);
    }
}
