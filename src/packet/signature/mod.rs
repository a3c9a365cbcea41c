pub mod subpacket;

pub use self::subpacket::{RevocationCode, Subpacket, SubpacketData};

use std::io::{self, BufRead};

use byteorder::{BigEndian, WriteBytesExt};
use chrono::{DateTime, Duration, Utc};
use num_enum::{FromPrimitive, IntoPrimitive};
use rand::{CryptoRng, Rng};
use smallvec::SmallVec;

use crate::crypto::hash::{HashAlgorithm, Hasher};
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::packet::key::{timestamp_to_datetime, KeyPacket};
use crate::packet::{PacketHeader, PacketTrait, UserIdPacket};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::{
    CompressionAlgorithm, Fingerprint, KeyFlags, KeyId, Mpi, PlainSecretParams, PublicParams, Tag,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureVersion {
    V2,
    V3,
    V4,
}

impl From<SignatureVersion> for u8 {
    fn from(version: SignatureVersion) -> u8 {
        match version {
            SignatureVersion::V2 => 2,
            SignatureVersion::V3 => 3,
            SignatureVersion::V4 => 4,
        }
    }
}

/// Signature types.
/// Ref: https://tools.ietf.org/html/rfc4880.html#section-5.2.1
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SignatureType {
    Binary = 0x00,
    Text = 0x01,
    Standalone = 0x02,
    CertGeneric = 0x10,
    CertPersona = 0x11,
    CertCasual = 0x12,
    CertPositive = 0x13,
    SubkeyBinding = 0x18,
    /// Back-signature by a signing subkey over (primary, subkey).
    PrimaryKeyBinding = 0x19,
    /// Direct-key signature over the primary key alone.
    Key = 0x1F,
    KeyRevocation = 0x20,
    SubkeyRevocation = 0x28,
    CertRevocation = 0x30,
    Timestamp = 0x40,
    ThirdParty = 0x50,

    #[num_enum(catch_all)]
    Other(u8),
}

impl SignatureType {
    pub fn is_certification(self) -> bool {
        matches!(
            self,
            SignatureType::CertGeneric
                | SignatureType::CertPersona
                | SignatureType::CertCasual
                | SignatureType::CertPositive
        )
    }
}

/// A signature packet.
///
/// The hashed and unhashed subpacket regions are kept both as raw
/// bytes (the exact representation equality and hashing are defined
/// over) and as decoded lists for the typed accessors. Setters used
/// by the signature generator keep the two in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    packet_header: PacketHeader,
    version: SignatureVersion,
    typ: SignatureType,
    pub_alg: PublicKeyAlgorithm,
    hash_alg: HashAlgorithm,
    hashed_area: Vec<u8>,
    unhashed_area: Vec<u8>,
    hashed_subpackets: Vec<Subpacket>,
    unhashed_subpackets: Vec<Subpacket>,
    /// v2/v3 only: creation time and signer key id live in the body.
    created_v3: u32,
    signer_v3: Option<KeyId>,
    left16: [u8; 2],
    sigs: Vec<Mpi>,
}

impl Signature {
    /// An empty v4 signature shell, ready for the generator.
    pub fn new_v4(
        typ: SignatureType,
        pub_alg: PublicKeyAlgorithm,
        hash_alg: HashAlgorithm,
    ) -> Self {
        Signature {
            packet_header: PacketHeader::from_tag(Tag::Signature),
            version: SignatureVersion::V4,
            typ,
            pub_alg,
            hash_alg,
            hashed_area: Vec::new(),
            unhashed_area: Vec::new(),
            hashed_subpackets: Vec::new(),
            unhashed_subpackets: Vec::new(),
            created_v3: 0,
            signer_v3: None,
            left16: [0u8; 2],
            sigs: Vec::new(),
        }
    }

    /// Parses a signature packet body.
    pub fn try_from_reader<B: BufRead>(packet_header: PacketHeader, i: &mut B) -> Result<Self> {
        ensure!(
            packet_header.tag() == Tag::Signature,
            "not a signature packet tag: {:?}",
            packet_header.tag()
        );

        let version = i.read_u8()?;
        match version {
            2 | 3 => {
                let version = if version == 2 {
                    SignatureVersion::V2
                } else {
                    SignatureVersion::V3
                };
                let hashed_len = i.read_u8()?;
                ensure_eq!(hashed_len, 5, "invalid v3 signature hashed length");
                let typ = SignatureType::from(i.read_u8()?);
                let created_v3 = i.read_be_u32()?;
                let signer_v3 = KeyId::from_slice(&i.read_array::<8>()?)?;
                let pub_alg = PublicKeyAlgorithm::from(i.read_u8()?);
                let hash_alg = HashAlgorithm::from(i.read_u8()?);
                let left16 = i.read_array::<2>()?;
                let sigs = read_sig_mpis(i)?;

                Ok(Signature {
                    packet_header,
                    version,
                    typ,
                    pub_alg,
                    hash_alg,
                    hashed_area: Vec::new(),
                    unhashed_area: Vec::new(),
                    hashed_subpackets: Vec::new(),
                    unhashed_subpackets: Vec::new(),
                    created_v3,
                    signer_v3: Some(signer_v3),
                    left16,
                    sigs,
                })
            }
            4 => {
                let typ = SignatureType::from(i.read_u8()?);
                let pub_alg = PublicKeyAlgorithm::from(i.read_u8()?);
                let hash_alg = HashAlgorithm::from(i.read_u8()?);

                let hashed_len = i.read_be_u16()?;
                let hashed_area = i.take_bytes(usize::from(hashed_len))?.to_vec();
                let unhashed_len = i.read_be_u16()?;
                let unhashed_area = i.take_bytes(usize::from(unhashed_len))?.to_vec();

                let left16 = i.read_array::<2>()?;
                let sigs = read_sig_mpis(i)?;

                let hashed_subpackets = subpacket::read_subpackets(&hashed_area)?;
                let unhashed_subpackets = subpacket::read_subpackets(&unhashed_area)?;

                Ok(Signature {
                    packet_header,
                    version: SignatureVersion::V4,
                    typ,
                    pub_alg,
                    hash_alg,
                    hashed_area,
                    unhashed_area,
                    hashed_subpackets,
                    unhashed_subpackets,
                    created_v3: 0,
                    signer_v3: None,
                    left16,
                    sigs,
                })
            }
            _ => unsupported_err!("signature version {}", version),
        }
    }

    pub fn version(&self) -> SignatureVersion {
        self.version
    }

    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    pub fn pub_alg(&self) -> PublicKeyAlgorithm {
        self.pub_alg
    }

    pub fn hash_alg(&self) -> HashAlgorithm {
        self.hash_alg
    }

    pub fn left16(&self) -> [u8; 2] {
        self.left16
    }

    pub fn sigs(&self) -> &[Mpi] {
        &self.sigs
    }

    pub fn hashed_subpackets(&self) -> &[Subpacket] {
        &self.hashed_subpackets
    }

    pub fn unhashed_subpackets(&self) -> &[Subpacket] {
        &self.unhashed_subpackets
    }

    /// Packet equality as the merge algebra defines it: both
    /// subpacket regions, the signature MPIs, and the fixed fields.
    /// The header encoding is irrelevant.
    pub fn pkt_eq(&self, other: &Signature) -> bool {
        self.version == other.version
            && self.typ == other.typ
            && self.pub_alg == other.pub_alg
            && self.hash_alg == other.hash_alg
            && self.hashed_area == other.hashed_area
            && self.unhashed_area == other.unhashed_area
            && self.created_v3 == other.created_v3
            && self.signer_v3 == other.signer_v3
            && self.left16 == other.left16
            && self.sigs == other.sigs
    }

    // -- typed subpacket accessors ------------------------------------

    fn find_subpacket<'a, T>(&'a self, f: impl Fn(&'a SubpacketData) -> Option<T>) -> Option<T> {
        self.hashed_subpackets
            .iter()
            .chain(self.unhashed_subpackets.iter())
            .find_map(|sp| f(&sp.data))
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        let secs = match self.version {
            SignatureVersion::V2 | SignatureVersion::V3 => Some(self.created_v3),
            SignatureVersion::V4 => self.find_subpacket(|data| match data {
                SubpacketData::SignatureCreationTime(t) => Some(*t),
                _ => None,
            }),
        }?;
        timestamp_to_datetime(secs).ok()
    }

    /// Signature expiration in seconds after creation, when present
    /// and non-zero.
    pub fn sig_expiration(&self) -> Option<u32> {
        self.find_subpacket(|data| match data {
            SubpacketData::SignatureExpirationTime(t) if *t > 0 => Some(*t),
            _ => None,
        })
    }

    /// Key expiration in seconds after key creation, when present
    /// and non-zero.
    pub fn key_expiration(&self) -> Option<u32> {
        self.find_subpacket(|data| match data {
            SubpacketData::KeyExpirationTime(t) if *t > 0 => Some(*t),
            _ => None,
        })
    }

    pub fn issuer_key_id(&self) -> Option<KeyId> {
        if let Some(id) = self.signer_v3 {
            return Some(id);
        }
        self.find_subpacket(|data| match data {
            SubpacketData::IssuerKeyId(id) => Some(*id),
            _ => None,
        })
    }

    pub fn issuer_fingerprint(&self) -> Option<&Fingerprint> {
        self.find_subpacket(|data| match data {
            SubpacketData::IssuerFingerprint(fp) => Some(fp),
            _ => None,
        })
    }

    pub fn has_issuer_fingerprint(&self) -> bool {
        self.issuer_fingerprint().is_some()
    }

    pub fn has_issuer_key_id(&self) -> bool {
        self.issuer_key_id().is_some()
    }

    pub fn key_flags(&self) -> Option<KeyFlags> {
        self.find_subpacket(|data| match data {
            SubpacketData::KeyFlags(flags) => Some(*flags),
            _ => None,
        })
    }

    pub fn is_primary_uid(&self) -> bool {
        self.find_subpacket(|data| match data {
            SubpacketData::PrimaryUserId(primary) => Some(*primary),
            _ => None,
        })
        .unwrap_or(false)
    }

    pub fn preferred_symmetric_algs(&self) -> &[SymmetricKeyAlgorithm] {
        self.find_subpacket(|data| match data {
            SubpacketData::PreferredSymmetricAlgorithms(algs) => Some(&algs[..]),
            _ => None,
        })
        .unwrap_or(&[])
    }

    pub fn preferred_hash_algs(&self) -> &[HashAlgorithm] {
        self.find_subpacket(|data| match data {
            SubpacketData::PreferredHashAlgorithms(algs) => Some(&algs[..]),
            _ => None,
        })
        .unwrap_or(&[])
    }

    pub fn preferred_compression_algs(&self) -> &[CompressionAlgorithm] {
        self.find_subpacket(|data| match data {
            SubpacketData::PreferredCompressionAlgorithms(algs) => Some(&algs[..]),
            _ => None,
        })
        .unwrap_or(&[])
    }

    pub fn key_server_prefs(&self) -> Option<&[u8]> {
        self.find_subpacket(|data| match data {
            SubpacketData::KeyServerPreferences(prefs) => Some(&prefs[..]),
            _ => None,
        })
    }

    pub fn preferred_key_server(&self) -> Option<&str> {
        self.find_subpacket(|data| match data {
            SubpacketData::PreferredKeyServer(url) => Some(url.as_str()),
            _ => None,
        })
    }

    pub fn revocation_reason(&self) -> Option<(RevocationCode, &[u8])> {
        self.find_subpacket(|data| match data {
            SubpacketData::RevocationReason(code, reason) => Some((*code, &reason[..])),
            _ => None,
        })
    }

    pub fn embedded_signature(&self) -> Option<&Signature> {
        self.find_subpacket(|data| match data {
            SubpacketData::EmbeddedSignature(sig) => Some(sig.as_ref()),
            _ => None,
        })
    }

    /// Whether the signature itself has lapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.created(), self.sig_expiration()) {
            (Some(created), Some(expiration)) => {
                created + Duration::seconds(i64::from(expiration)) < now
            }
            _ => false,
        }
    }

    // -- subpacket setters (signature generation) ---------------------

    fn push_hashed(&mut self, data: SubpacketData) -> Result<()> {
        self.hashed_subpackets.push(Subpacket::regular(data));
        self.hashed_area = subpacket::write_subpackets(&self.hashed_subpackets)?;
        Ok(())
    }

    fn push_unhashed(&mut self, data: SubpacketData) -> Result<()> {
        self.unhashed_subpackets.push(Subpacket::regular(data));
        self.unhashed_area = subpacket::write_subpackets(&self.unhashed_subpackets)?;
        Ok(())
    }

    pub fn set_issuer_fingerprint(&mut self, fp: Fingerprint) -> Result<()> {
        self.push_hashed(SubpacketData::IssuerFingerprint(fp))
    }

    pub fn set_created(&mut self, time: DateTime<Utc>) -> Result<()> {
        let secs = u32::try_from(time.timestamp())?;
        self.push_hashed(SubpacketData::SignatureCreationTime(secs))
    }

    pub fn set_key_expiration(&mut self, seconds: u32) -> Result<()> {
        self.push_hashed(SubpacketData::KeyExpirationTime(seconds))
    }

    pub fn set_key_flags(&mut self, flags: KeyFlags) -> Result<()> {
        self.push_hashed(SubpacketData::KeyFlags(flags))
    }

    pub fn set_primary_uid(&mut self, primary: bool) -> Result<()> {
        self.push_hashed(SubpacketData::PrimaryUserId(primary))
    }

    pub fn set_preferred_symmetric_algs(
        &mut self,
        algs: SmallVec<[SymmetricKeyAlgorithm; 8]>,
    ) -> Result<()> {
        self.push_hashed(SubpacketData::PreferredSymmetricAlgorithms(algs))
    }

    pub fn set_preferred_hash_algs(&mut self, algs: SmallVec<[HashAlgorithm; 8]>) -> Result<()> {
        self.push_hashed(SubpacketData::PreferredHashAlgorithms(algs))
    }

    pub fn set_preferred_compression_algs(
        &mut self,
        algs: SmallVec<[CompressionAlgorithm; 8]>,
    ) -> Result<()> {
        self.push_hashed(SubpacketData::PreferredCompressionAlgorithms(algs))
    }

    pub fn set_key_server_prefs(&mut self, prefs: u8) -> Result<()> {
        self.push_hashed(SubpacketData::KeyServerPreferences(
            SmallVec::from_slice(&[prefs]),
        ))
    }

    pub fn set_preferred_key_server(&mut self, url: &str) -> Result<()> {
        self.push_hashed(SubpacketData::PreferredKeyServer(url.to_string()))
    }

    pub fn set_issuer_key_id(&mut self, id: KeyId) -> Result<()> {
        self.push_unhashed(SubpacketData::IssuerKeyId(id))
    }

    pub fn set_embedded_signature(&mut self, sig: Signature) -> Result<()> {
        self.push_unhashed(SubpacketData::EmbeddedSignature(Box::new(sig)))
    }

    // -- hashing and signing ------------------------------------------

    /// Feeds the signature's own hashed data: for v4 the fixed
    /// fields, the frozen hashed area and the final trailer; for
    /// v2/v3 the type and creation time.
    pub(crate) fn hash_signature_data(&self, hasher: &mut dyn Hasher) {
        match self.version {
            SignatureVersion::V4 => {
                let hashed_len = self.hashed_area.len();
                let prefix_len = 6 + hashed_len;

                hasher.update(&[
                    4u8,
                    self.typ.into(),
                    self.pub_alg.into(),
                    self.hash_alg.into(),
                    (hashed_len >> 8) as u8,
                    hashed_len as u8,
                ]);
                hasher.update(&self.hashed_area);
                // v4 trailer
                hasher.update(&[4u8, 0xFF]);
                hasher.update(&(prefix_len as u32).to_be_bytes());
            }
            SignatureVersion::V2 | SignatureVersion::V3 => {
                hasher.update(&[self.typ.into()]);
                hasher.update(&self.created_v3.to_be_bytes());
            }
        }
    }

    /// Finishes the hash, records the left 16 bits and signs the
    /// digest with the given secret material.
    pub(crate) fn calculate<R: CryptoRng + Rng>(
        &mut self,
        rng: &mut R,
        public: &PublicParams,
        secret: &PlainSecretParams,
        mut hasher: Box<dyn Hasher>,
    ) -> Result<()> {
        self.hash_signature_data(hasher.as_mut());
        let digest = hasher.finish();

        self.left16 = [digest[0], digest[1]];
        self.sigs = crate::crypto::sign(rng, public, secret, self.hash_alg, &digest)?;

        Ok(())
    }

    fn verify_digest(&self, signer: &PublicParams, digest: &[u8]) -> Result<()> {
        ensure!(
            digest.len() >= 2 && digest[..2] == self.left16,
            "signature left 16 bits do not match"
        );
        crate::crypto::verify(signer, self.hash_alg, digest, &self.sigs)
    }

    /// Checks a certification over (key, userid), issued by `signer`.
    pub fn verify_certification(
        &self,
        signer: &PublicParams,
        key: &KeyPacket,
        uid: &UserIdPacket,
    ) -> Result<()> {
        let mut hasher = self.hash_alg.new_hasher()?;
        hash_key_data(key, hasher.as_mut())?;
        hash_userid_data(uid, self.version, hasher.as_mut());
        self.hash_signature_data(hasher.as_mut());
        self.verify_digest(signer, &hasher.finish())
    }

    /// Checks a binding-shaped signature over (primary, subkey):
    /// subkey bindings, subkey revocations and the embedded
    /// primary-key-binding all hash the same input.
    pub fn verify_binding(
        &self,
        signer: &PublicParams,
        primary: &KeyPacket,
        subkey: &KeyPacket,
    ) -> Result<()> {
        let mut hasher = self.hash_alg.new_hasher()?;
        hash_key_data(primary, hasher.as_mut())?;
        hash_key_data(subkey, hasher.as_mut())?;
        self.hash_signature_data(hasher.as_mut());
        self.verify_digest(signer, &hasher.finish())
    }

    /// Checks a signature over the primary key alone: direct-key
    /// signatures and key revocations.
    pub fn verify_key(&self, signer: &PublicParams, key: &KeyPacket) -> Result<()> {
        let mut hasher = self.hash_alg.new_hasher()?;
        hash_key_data(key, hasher.as_mut())?;
        self.hash_signature_data(hasher.as_mut());
        self.verify_digest(signer, &hasher.finish())
    }
}

fn read_sig_mpis<B: BufRead>(i: &mut B) -> Result<Vec<Mpi>> {
    let mut sigs = Vec::with_capacity(2);
    while i.has_remaining()? {
        sigs.push(Mpi::try_from_reader(i)?);
    }
    ensure!(!sigs.is_empty(), "signature without mpis");
    Ok(sigs)
}

/// Feeds the canonical key serialization: 0x99, two length octets,
/// then the public key body. Used for every key-related hash input.
pub(crate) fn hash_key_data(key: &KeyPacket, hasher: &mut dyn Hasher) -> Result<()> {
    let body_len = key.public_write_len();
    hasher.update(&[0x99, (body_len >> 8) as u8, body_len as u8]);
    let mut body = Vec::with_capacity(body_len);
    key.to_public_writer(&mut body)?;
    hasher.update(&body);
    Ok(())
}

/// Feeds a userid or attribute body. v4 signatures prefix a type
/// octet and a four octet length; v2/v3 hash the raw payload.
pub(crate) fn hash_userid_data(
    uid: &UserIdPacket,
    version: SignatureVersion,
    hasher: &mut dyn Hasher,
) {
    if version == SignatureVersion::V4 {
        let prefix = if uid.tag() == Tag::UserAttribute {
            0xD1
        } else {
            0xB4
        };
        hasher.update(&[prefix]);
        hasher.update(&(uid.data().len() as u32).to_be_bytes());
    }
    hasher.update(uid.data());
}

impl Serialize for Signature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version.into())?;
        match self.version {
            SignatureVersion::V2 | SignatureVersion::V3 => {
                writer.write_u8(5)?;
                writer.write_u8(self.typ.into())?;
                writer.write_u32::<BigEndian>(self.created_v3)?;
                let signer = self
                    .signer_v3
                    .ok_or_else(|| Error::bad_state("v3 signature without signer key id"))?;
                writer.write_all(signer.as_ref())?;
                writer.write_u8(self.pub_alg.into())?;
                writer.write_u8(self.hash_alg.into())?;
            }
            SignatureVersion::V4 => {
                writer.write_u8(self.typ.into())?;
                writer.write_u8(self.pub_alg.into())?;
                writer.write_u8(self.hash_alg.into())?;
                writer.write_u16::<BigEndian>(self.hashed_area.len() as u16)?;
                writer.write_all(&self.hashed_area)?;
                writer.write_u16::<BigEndian>(self.unhashed_area.len() as u16)?;
                writer.write_all(&self.unhashed_area)?;
            }
        }
        writer.write_all(&self.left16)?;
        for mpi in &self.sigs {
            mpi.to_writer(writer)?;
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        let mpis: usize = self.sigs.iter().map(Serialize::write_len).sum();
        match self.version {
            SignatureVersion::V2 | SignatureVersion::V3 => 1 + 1 + 1 + 4 + 8 + 1 + 1 + 2 + mpis,
            SignatureVersion::V4 => {
                1 + 1 + 1 + 1 + 2 + self.hashed_area.len() + 2 + self.unhashed_area.len() + 2 + mpis
            }
        }
    }
}

impl PacketTrait for Signature {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signature() -> Signature {
        let mut sig = Signature::new_v4(
            SignatureType::CertPositive,
            PublicKeyAlgorithm::RSA,
            HashAlgorithm::SHA2_256,
        );
        sig.set_created(timestamp_to_datetime(1_500_000_000).unwrap())
            .unwrap();
        sig.set_key_flags(KeyFlags::CERTIFY | KeyFlags::SIGN).unwrap();
        sig.set_issuer_key_id(KeyId::from_slice(&[9; 8]).unwrap())
            .unwrap();
        sig.left16 = [0xAA, 0xBB];
        sig.sigs = vec![Mpi::from_slice(&[0x77; 64])];
        sig
    }

    #[test]
    fn v4_roundtrip() {
        let sig = sample_signature();
        let body = sig.to_bytes().unwrap();
        assert_eq!(body.len(), sig.write_len());

        let back =
            Signature::try_from_reader(*sig.packet_header(), &mut &body[..]).unwrap();
        assert_eq!(sig, back);
        assert!(sig.pkt_eq(&back));
    }

    #[test]
    fn accessors_see_both_areas() {
        let sig = sample_signature();
        assert_eq!(
            sig.created().unwrap(),
            timestamp_to_datetime(1_500_000_000).unwrap()
        );
        assert_eq!(sig.key_flags().unwrap(), KeyFlags::CERTIFY | KeyFlags::SIGN);
        // issuer key id sits in the unhashed area
        assert_eq!(sig.issuer_key_id().unwrap().as_ref(), &[9; 8]);
        assert!(!sig.is_primary_uid());
    }

    #[test]
    fn embedded_signature_roundtrip() {
        let inner = sample_signature();
        let mut outer = Signature::new_v4(
            SignatureType::SubkeyBinding,
            PublicKeyAlgorithm::RSA,
            HashAlgorithm::SHA2_256,
        );
        outer.set_embedded_signature(inner.clone()).unwrap();
        outer.left16 = [1, 2];
        outer.sigs = vec![Mpi::from_slice(&[0x33; 64])];

        let body = outer.to_bytes().unwrap();
        let back =
            Signature::try_from_reader(*outer.packet_header(), &mut &body[..]).unwrap();
        assert!(back.embedded_signature().unwrap().pkt_eq(&inner));
    }

    #[test]
    fn expiration() {
        let mut sig = sample_signature();
        assert!(!sig.is_expired(Utc::now()));

        sig.push_hashed(SubpacketData::SignatureExpirationTime(3600))
            .unwrap();
        // created 2017 + 1h is long past
        assert!(sig.is_expired(Utc::now()));
    }

    #[test]
    fn v3_signature_roundtrip() {
        let mut body = vec![3u8, 5];
        body.push(0x10); // generic certification
        body.extend_from_slice(&1_000_000_000u32.to_be_bytes());
        body.extend_from_slice(&[8; 8]);
        body.push(1); // RSA
        body.push(2); // SHA1
        body.extend_from_slice(&[0xCC, 0xDD]);
        body.extend_from_slice(&[0x00, 0x08, 0xEE]);

        let header = PacketHeader::from_tag(Tag::Signature);
        let sig = Signature::try_from_reader(header, &mut &body[..]).unwrap();
        assert_eq!(sig.version(), SignatureVersion::V3);
        assert_eq!(sig.issuer_key_id().unwrap().as_ref(), &[8; 8]);

        assert_eq!(sig.to_bytes().unwrap(), body);
    }
}
