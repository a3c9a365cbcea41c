//! The rich key facade: a parsed key packet together with its
//! derived identifiers (key id, fingerprint, grip), its signatures in
//! decoded form, revocation info, the raw packet cache that keyrings
//! replay on write, and the structural validity bits.

mod store;
mod validate;

pub use self::store::{
    add_transferable_key, add_transferable_subkey, read_keyring, write_keyring, KeySearch,
    KeyStore,
};

use std::io;

use rand::{CryptoRng, Rng};
use smallvec::SmallVec;
use zeroize::Zeroizing;

use crate::composed::{TransferableKey, TransferableSubkey, TransferableUserId, UserPreferences};
use crate::errors::{Error, Result};
use crate::packet::{
    KeyPacket, PacketTrait, RevocationCode, Signature, UserIdPacket,
};
use crate::types::{Fingerprint, KeyFlags, KeyGrip, KeyId, SecretProtection, Tag};

/// A serialized packet as it appeared on (or will appear on) the
/// wire. Element 0 of a key's raw packet list is the key packet
/// itself and is rewritten whenever the secret layer changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub tag: Tag,
    pub bytes: Vec<u8>,
}

impl RawPacket {
    fn from_packet<P: PacketTrait>(packet: &P) -> Result<Self> {
        let mut bytes = Vec::with_capacity(packet.write_len_with_header());
        packet.to_writer_with_header(&mut bytes)?;
        Ok(RawPacket {
            tag: packet.packet_header().tag(),
            bytes,
        })
    }
}

/// A user id attached to a key, with its decoded display string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyUserId {
    pub id: String,
    pub pkt: UserIdPacket,
}

/// A signature attached to a key, with the subpacket values the
/// keyring layer cares about pulled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsig {
    /// Index of the user id this signature follows; `None` for
    /// signatures before the first user id.
    pub uid: Option<usize>,
    pub sig: Signature,
    pub prefs: UserPreferences,
    pub key_flags: KeyFlags,
}

/// A revocation: of the whole key (`uid == None`) or of one user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revoke {
    pub uid: Option<usize>,
    pub code: RevocationCode,
    pub reason: String,
}

/// Origin format of a stored key. Only the OpenPGP packet format
/// exists in this crate; the tag keeps keyring serialization honest
/// about what the raw packets contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyFormat {
    #[default]
    Gpg,
}

/// A primary key or subkey as the keyring sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    packet: KeyPacket,
    key_id: KeyId,
    fingerprint: Fingerprint,
    grip: KeyGrip,
    userids: Vec<KeyUserId>,
    subsigs: Vec<Subsig>,
    revokes: Vec<Revoke>,
    rawpackets: Vec<RawPacket>,
    primary_grip: Option<KeyGrip>,
    subkey_grips: Vec<KeyGrip>,
    format: KeyFormat,
    valid: bool,
    validated: bool,
    revocation: Option<Revoke>,
    /// Key expiration in seconds after creation; 0 for never.
    expiration: u32,
    key_flags: KeyFlags,
    /// Index of the user id flagged as primary, when one is.
    uid0: Option<usize>,
}

impl Key {
    /// Builds a key from a parsed packet, taking ownership.
    ///
    /// Derives key id, fingerprint and grip, seeds the key flags
    /// from the algorithm capabilities, and caches the raw packet.
    /// Unprotected secret blobs are parsed right away so the secret
    /// material is usable without an unlock step.
    pub fn from_pkt(mut packet: KeyPacket) -> Result<Self> {
        if packet.is_secret() && !packet.is_protected() && !packet.has_secret_material() {
            packet.decrypt_secret_key(None)?;
        }

        let key_id = packet.key_id()?;
        let fingerprint = packet.fingerprint()?;
        let grip = packet.grip()?;
        let key_flags = packet.algorithm().default_flags();
        let rawpacket = RawPacket::from_packet(&packet)?;

        Ok(Key {
            packet,
            key_id,
            fingerprint,
            grip,
            userids: Vec::new(),
            subsigs: Vec::new(),
            revokes: Vec::new(),
            rawpackets: vec![rawpacket],
            primary_grip: None,
            subkey_grips: Vec::new(),
            format: KeyFormat::Gpg,
            valid: false,
            validated: false,
            revocation: None,
            expiration: 0,
            key_flags,
            uid0: None,
        })
    }

    /// Builds a primary key from a transferable key: direct-key
    /// signatures first, then each user id with its signatures.
    /// Subkeys are separate [`Key`]s, linked by grip.
    pub fn from_transferable_key(tkey: &TransferableKey) -> Result<Self> {
        let mut key = Key::from_pkt(tkey.key.clone())?;
        for sig in &tkey.signatures {
            key.add_signature(sig)?;
        }
        for tuid in &tkey.userids {
            key.add_userid(tuid)?;
        }
        Ok(key)
    }

    pub fn from_transferable_subkey(tsub: &TransferableSubkey) -> Result<Self> {
        let mut key = Key::from_pkt(tsub.subkey.clone())?;
        for sig in &tsub.signatures {
            key.add_signature(sig)?;
        }
        Ok(key)
    }

    /// Attaches a user id and its certifications.
    pub fn add_userid(&mut self, tuid: &TransferableUserId) -> Result<()> {
        self.rawpackets.push(RawPacket::from_packet(&tuid.userid)?);
        self.userids.push(KeyUserId {
            id: tuid.userid.id(),
            pkt: tuid.userid.clone(),
        });
        for sig in &tuid.signatures {
            self.add_signature(sig)?;
        }
        Ok(())
    }

    /// Attaches one signature: caches its raw packet, decodes the
    /// subpacket values into a [`Subsig`], and mirrors expiration,
    /// key flags, the primary-uid marker and revocations up to the
    /// key.
    pub fn add_signature(&mut self, sig: &Signature) -> Result<()> {
        let uid = self.userids.len().checked_sub(1);

        self.rawpackets.push(RawPacket::from_packet(sig)?);

        let prefs = UserPreferences {
            symmetric_algs: SmallVec::from_slice(sig.preferred_symmetric_algs()),
            hash_algs: SmallVec::from_slice(sig.preferred_hash_algs()),
            compression_algs: SmallVec::from_slice(sig.preferred_compression_algs()),
            key_server_prefs: sig.key_server_prefs().and_then(|p| p.first().copied()),
            key_server: sig.preferred_key_server().map(ToString::to_string),
        };

        if let Some(expiration) = sig.key_expiration() {
            self.expiration = expiration;
        }
        if sig.is_primary_uid() {
            self.uid0 = uid;
        }
        let key_flags = match sig.key_flags() {
            Some(flags) => {
                self.key_flags = flags;
                flags
            }
            None => KeyFlags::empty(),
        };

        if let Some((code, reason)) = sig.revocation_reason() {
            let reason = if reason.is_empty() {
                code.default_reason().to_string()
            } else {
                crate::util::read_string_lossy(reason)
            };
            if self.userids.is_empty() {
                // no user id seen yet: the whole key is revoked
                self.revocation = Some(Revoke {
                    uid: None,
                    code,
                    reason,
                });
            } else {
                self.revokes.push(Revoke {
                    uid,
                    code,
                    reason,
                });
            }
        }

        self.subsigs.push(Subsig {
            uid,
            sig: sig.clone(),
            prefs,
            key_flags,
        });

        Ok(())
    }

    // -- accessors ----------------------------------------------------

    pub fn packet(&self) -> &KeyPacket {
        &self.packet
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn grip(&self) -> &KeyGrip {
        &self.grip
    }

    pub fn format(&self) -> KeyFormat {
        self.format
    }

    pub fn is_primary(&self) -> bool {
        self.packet.tag().is_primary_key()
    }

    pub fn is_subkey(&self) -> bool {
        self.packet.tag().is_subkey()
    }

    pub fn is_secret(&self) -> bool {
        self.packet.is_secret()
    }

    pub fn is_public(&self) -> bool {
        !self.is_secret()
    }

    /// True when the secret material is present but not usable
    /// without a password.
    pub fn is_locked(&self) -> bool {
        self.is_secret() && !self.packet.has_secret_material()
    }

    pub fn userids(&self) -> &[KeyUserId] {
        &self.userids
    }

    pub fn subsigs(&self) -> &[Subsig] {
        &self.subsigs
    }

    pub fn revokes(&self) -> &[Revoke] {
        &self.revokes
    }

    /// The user id revocation covering the given index, if any.
    pub fn userid_revoke(&self, uid: usize) -> Option<&Revoke> {
        self.revokes.iter().find(|revoke| revoke.uid == Some(uid))
    }

    pub fn rawpackets(&self) -> &[RawPacket] {
        &self.rawpackets
    }

    pub fn primary_grip(&self) -> Option<&KeyGrip> {
        self.primary_grip.as_ref()
    }

    pub(crate) fn set_primary_grip(&mut self, grip: KeyGrip) {
        self.primary_grip = Some(grip);
    }

    pub fn subkey_grips(&self) -> &[KeyGrip] {
        &self.subkey_grips
    }

    /// Records a subkey as belonging to this primary, linking both
    /// directions.
    pub fn link_subkey_grip(&mut self, subkey: &mut Key) {
        subkey.set_primary_grip(*self.grip());
        if !self.subkey_grips.contains(subkey.grip()) {
            self.subkey_grips.push(*subkey.grip());
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revocation.is_some()
    }

    pub fn revocation(&self) -> Option<&Revoke> {
        self.revocation.as_ref()
    }

    pub fn expiration(&self) -> u32 {
        self.expiration
    }

    pub fn flags(&self) -> KeyFlags {
        self.key_flags
    }

    pub fn primary_userid(&self) -> Option<usize> {
        self.uid0
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn validated(&self) -> bool {
        self.validated
    }

    pub(crate) fn set_validity(&mut self, valid: bool, validated: bool) {
        self.valid = valid;
        self.validated = validated;
    }

    // -- secret material state transitions ----------------------------

    /// Scrubs the cleartext secret material; the protected blob
    /// stays, so `unlock` can bring the material back.
    pub fn lock(&mut self) -> Result<()> {
        if !self.is_secret() {
            return Err(Error::bad_parameters("cannot lock a public key"));
        }
        self.packet.forget_secret_material();
        Ok(())
    }

    /// Makes the secret material usable. The password provider is
    /// only consulted when the key is actually protected; the
    /// returned password is scrubbed after use.
    pub fn unlock<F: FnOnce() -> String>(&mut self, password_provider: F) -> Result<()> {
        if !self.is_secret() {
            return Err(Error::bad_parameters("cannot unlock a public key"));
        }
        if self.packet.has_secret_material() {
            return Ok(());
        }
        let password = Zeroizing::new(password_provider());
        self.packet.decrypt_secret_key(Some(&password))
    }

    /// Applies fresh default protection under `password` and
    /// rewrites the cached key packet. The key ends up locked.
    pub fn protect<R: CryptoRng + Rng>(&mut self, password: &str, rng: &mut R) -> Result<()> {
        if !self.is_secret() {
            return Err(Error::bad_parameters("cannot protect a public key"));
        }
        if self.is_locked() {
            return Err(Error::bad_state("unlock the key before re-protecting it"));
        }
        self.packet.set_protection(SecretProtection::new_default(rng))?;
        self.packet.encrypt_secret_key(password, rng)?;
        self.rewrite_key_rawpacket()
    }

    /// Removes the protection: decrypts and stores the secret
    /// material cleartext, rewriting the cached packet.
    pub fn unprotect<F: FnOnce() -> String>(&mut self, password_provider: F) -> Result<()> {
        if !self.is_secret() {
            return Err(Error::bad_parameters("cannot unprotect a public key"));
        }
        if !self.packet.has_secret_material() {
            let password = Zeroizing::new(password_provider());
            self.packet.decrypt_secret_key(Some(&password))?;
        }
        self.packet.set_protection(SecretProtection::unprotected())?;
        self.packet.rebuild_cleartext_data()?;
        self.rewrite_key_rawpacket()
    }

    fn rewrite_key_rawpacket(&mut self) -> Result<()> {
        let raw = RawPacket::from_packet(&self.packet)?;
        if self.rawpackets.is_empty() {
            self.rawpackets.push(raw);
        } else {
            self.rawpackets[0] = raw;
        }
        Ok(())
    }

    /// Writes the cached raw packets back out, byte for byte.
    pub fn write_packets<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        ensure!(!self.rawpackets.is_empty(), "key without raw packets");
        for raw in &self.rawpackets {
            writer.write_all(&raw.bytes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::{EccCurve, PublicKeyAlgorithm};
    use crate::packet::timestamp_to_datetime;
    use crate::types::{Mpi, PlainSecretParams, PublicParams};

    fn secret_key_packet() -> KeyPacket {
        let secret = [11u8; 32];
        let signing = ed25519_dalek::SigningKey::from_bytes(&secret);
        let mut point = vec![0x40];
        point.extend_from_slice(signing.verifying_key().as_bytes());

        KeyPacket::new_v4_secret(
            Tag::SecretKey,
            timestamp_to_datetime(1_600_000_000).unwrap(),
            PublicKeyAlgorithm::EdDSA,
            PublicParams::Eddsa {
                curve: EccCurve::Ed25519,
                point: Mpi::from_slice(&point),
            },
            PlainSecretParams::Ec {
                x: Mpi::from_slice(&secret),
            },
        )
        .unwrap()
    }

    #[test]
    fn from_pkt_derives_identifiers() {
        let pkt = secret_key_packet();
        let key = Key::from_pkt(pkt.clone()).unwrap();

        assert_eq!(key.fingerprint(), &pkt.fingerprint().unwrap());
        assert_eq!(key.key_id(), &pkt.key_id().unwrap());
        assert_eq!(key.grip(), &pkt.grip().unwrap());
        assert!(key.is_secret());
        assert!(!key.is_locked());
        assert_eq!(key.rawpackets().len(), 1);
        assert!(key.flags().can_sign());
    }

    #[test]
    fn protect_locks_and_rewrites_rawpacket() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut key = Key::from_pkt(secret_key_packet()).unwrap();
        let before = key.rawpackets()[0].bytes.clone();

        key.protect("sekrit", &mut rng).unwrap();
        assert!(key.is_locked());
        assert_ne!(key.rawpackets()[0].bytes, before);

        key.unlock(|| "sekrit".to_string()).unwrap();
        assert!(!key.is_locked());

        key.lock().unwrap();
        assert!(key.is_locked());

        key.unprotect(|| "sekrit".to_string()).unwrap();
        assert!(!key.is_locked());
        assert_eq!(key.rawpackets()[0].bytes, before);
    }

    #[test]
    fn write_packets_replays_bytes() {
        let key = Key::from_pkt(secret_key_packet()).unwrap();
        let mut out = Vec::new();
        key.write_packets(&mut out).unwrap();
        assert_eq!(out, key.rawpackets()[0].bytes);
    }
}
