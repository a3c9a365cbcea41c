use std::io;

use log::warn;

use crate::armor::{self, BlockType};
use crate::errors::{Error, Result};
use crate::packet::{KeyPacket, PacketTrait, Signature, UserIdPacket};
use crate::ser::Serialize;

/// A user id (or attribute) with its certification signatures, in
/// source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferableUserId {
    pub userid: UserIdPacket,
    pub signatures: Vec<Signature>,
}

/// A subkey with its binding (and revocation) signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferableSubkey {
    pub subkey: KeyPacket,
    pub signatures: Vec<Signature>,
}

/// A transferable key: primary key packet, direct-key signatures,
/// ordered user ids and ordered subkeys.
/// Ref: https://tools.ietf.org/html/rfc4880.html#section-11.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferableKey {
    pub key: KeyPacket,
    /// Direct-key and revocation signatures over the primary alone.
    pub signatures: Vec<Signature>,
    pub userids: Vec<TransferableUserId>,
    pub subkeys: Vec<TransferableSubkey>,
}

/// Appends every signature of `src` that has no byte-equal
/// counterpart in `dst`.
pub(crate) fn merge_signatures(dst: &mut Vec<Signature>, src: &[Signature]) {
    for sig in src {
        if !dst.iter().any(|existing| existing.pkt_eq(sig)) {
            dst.push(sig.clone());
        }
    }
}

impl TransferableUserId {
    /// Merges the signatures of another copy of the same user id.
    pub fn merge(&mut self, other: &TransferableUserId) -> Result<()> {
        if !self.userid.pkt_eq(&other.userid) {
            return Err(Error::bad_parameters("attempt to merge different user ids"));
        }
        merge_signatures(&mut self.signatures, &other.signatures);
        Ok(())
    }
}

impl TransferableSubkey {
    /// Merges the signatures of another copy of the same subkey.
    /// Only the public halves have to match, so a secret subkey can
    /// absorb the signatures of its public rendition.
    pub fn merge(&mut self, other: &TransferableSubkey) -> Result<()> {
        if !self.subkey.pub_eq(&other.subkey) {
            return Err(Error::bad_parameters("attempt to merge different subkeys"));
        }
        merge_signatures(&mut self.signatures, &other.signatures);
        Ok(())
    }

    pub fn pubonly(&self) -> TransferableSubkey {
        TransferableSubkey {
            subkey: self.subkey.pubonly(),
            signatures: self.signatures.clone(),
        }
    }
}

impl TransferableKey {
    /// Merges `other` into `self`: signatures are deduplicated by
    /// byte equality, unknown user ids and subkeys are appended in
    /// `other`'s order.
    pub fn merge(&mut self, other: &TransferableKey) -> Result<()> {
        if !self.key.pub_eq(&other.key) {
            return Err(Error::bad_parameters("attempt to merge different keys"));
        }

        merge_signatures(&mut self.signatures, &other.signatures);

        for uid in &other.userids {
            match self
                .userids
                .iter_mut()
                .find(|existing| existing.userid.pkt_eq(&uid.userid))
            {
                Some(existing) => existing.merge(uid)?,
                None => self.userids.push(uid.clone()),
            }
        }

        for subkey in &other.subkeys {
            if subkey.subkey.is_secret() != self.key.is_secret() {
                warn!(
                    "merging a {} subkey into a {} key",
                    secrecy(subkey.subkey.is_secret()),
                    secrecy(self.key.is_secret())
                );
            }
            match self
                .subkeys
                .iter_mut()
                .find(|existing| existing.subkey.pub_eq(&subkey.subkey))
            {
                Some(existing) => existing.merge(subkey)?,
                None => self.subkeys.push(subkey.clone()),
            }
        }

        Ok(())
    }

    /// A deep copy with all secret material removed: the primary and
    /// every subkey are forced to their public packet variants.
    pub fn pubonly(&self) -> TransferableKey {
        TransferableKey {
            key: self.key.pubonly(),
            signatures: self.signatures.clone(),
            userids: self.userids.clone(),
            subkeys: self.subkeys.iter().map(TransferableSubkey::pubonly).collect(),
        }
    }

    /// Total number of signatures across the whole key.
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
            + self.userids.iter().map(|u| u.signatures.len()).sum::<usize>()
            + self.subkeys.iter().map(|s| s.signatures.len()).sum::<usize>()
    }
}

fn secrecy(is_secret: bool) -> &'static str {
    if is_secret {
        "secret"
    } else {
        "public"
    }
}

fn write_signatures<W: io::Write>(signatures: &[Signature], writer: &mut W) -> Result<()> {
    for sig in signatures {
        sig.to_writer_with_header(writer)?;
    }
    Ok(())
}

fn signatures_write_len(signatures: &[Signature]) -> usize {
    signatures.iter().map(PacketTrait::write_len_with_header).sum()
}

impl Serialize for TransferableKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.key.to_writer_with_header(writer)?;
        write_signatures(&self.signatures, writer)?;

        for uid in &self.userids {
            uid.userid.to_writer_with_header(writer)?;
            write_signatures(&uid.signatures, writer)?;
        }

        for subkey in &self.subkeys {
            subkey.subkey.to_writer_with_header(writer)?;
            write_signatures(&subkey.signatures, writer)?;
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut len = self.key.write_len_with_header() + signatures_write_len(&self.signatures);
        for uid in &self.userids {
            len += uid.userid.write_len_with_header() + signatures_write_len(&uid.signatures);
        }
        for subkey in &self.subkeys {
            len += subkey.subkey.write_len_with_header() + signatures_write_len(&subkey.signatures);
        }
        len
    }
}

/// Serializes a sequence of transferable keys, optionally armored.
/// The armor block kind follows the first primary: a secret primary
/// yields a private key block, anything else a public key block.
pub fn write_keys<W: io::Write>(
    keys: &[TransferableKey],
    writer: &mut W,
    armored: bool,
) -> Result<()> {
    if armored {
        let typ = match keys.first() {
            Some(first) if first.key.is_secret() => BlockType::SecretKey,
            _ => BlockType::PublicKey,
        };
        armor::write(&keys, typ, writer)
    } else {
        for key in keys {
            key.to_writer(writer)?;
        }
        Ok(())
    }
}
