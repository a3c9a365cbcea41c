use std::io;

use log::warn;

use crate::composed::{parse_keys, parse_subkey, TransferableKey, TransferableSubkey, Warning};
use crate::errors::Result;
use crate::key::{Key, KeyFormat};
use crate::types::{Fingerprint, KeyGrip, KeyId, Tag};
use crate::util::PeekReader;

/// Lookup criteria a keyring supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySearch {
    Grip(KeyGrip),
    KeyId(KeyId),
    Fingerprint(Fingerprint),
    UserId(String),
}

impl KeySearch {
    pub fn matches(&self, key: &Key) -> bool {
        match self {
            KeySearch::Grip(grip) => key.grip() == grip,
            KeySearch::KeyId(id) => key.key_id() == id,
            KeySearch::Fingerprint(fp) => key.fingerprint() == fp,
            KeySearch::UserId(id) => key.userids().iter().any(|uid| &uid.id == id),
        }
    }
}

/// The keyring surface this crate needs. Concrete stores (and their
/// indexes) live outside; grips are the primary handle.
pub trait KeyStore {
    fn add_key(&mut self, key: Key) -> Result<&mut Key>;
    fn remove_key(&mut self, grip: &KeyGrip) -> Option<Key>;
    fn key_by_grip(&self, grip: &KeyGrip) -> Option<&Key>;
    fn key_by_grip_mut(&mut self, grip: &KeyGrip) -> Option<&mut Key>;
    fn keys(&self) -> Box<dyn Iterator<Item = &Key> + '_>;

    fn find(&self, search: &KeySearch) -> Option<&Key> {
        self.keys().find(|key| search.matches(key))
    }
}

/// Reads transferable keys (or a lone subkey) from `input` into the
/// store. Subkeys become their own entries, linked to the primary by
/// grip. Returns the parser's non-fatal warnings.
pub fn read_keyring<S: KeyStore + ?Sized, R: io::Read>(
    store: &mut S,
    input: R,
) -> Result<Vec<Warning>> {
    let mut src = PeekReader::new(input);

    // a bare subkey sequence: stored now, linked to its primary later
    if starts_with_subkey(&mut src)? {
        let tsub = parse_subkey(&mut src)?;
        add_transferable_subkey(store, &tsub, None)?;
        return Ok(Vec::new());
    }

    let parsed = parse_keys(&mut src)?;
    for tkey in &parsed.keys {
        add_transferable_key(store, tkey)?;
    }

    Ok(parsed.warnings)
}

fn starts_with_subkey<R: io::Read>(src: &mut PeekReader<R>) -> Result<bool> {
    let peeked = src.peek(1)?;
    let Some(first) = peeked.first() else {
        return Ok(false);
    };
    let tag = match first & 0b1100_0000 {
        0b1100_0000 => Tag::from(first & 0b0011_1111),
        0b1000_0000 => Tag::from((first & 0b0011_1100) >> 2),
        _ => return Ok(false),
    };
    Ok(tag.is_subkey())
}

/// Adds one transferable key and its subkeys to the store. Either
/// everything lands or the store is left without the key.
pub fn add_transferable_key<S: KeyStore + ?Sized>(
    store: &mut S,
    tkey: &TransferableKey,
) -> Result<()> {
    let mut primary = Key::from_transferable_key(tkey)?;

    let mut subkeys = Vec::with_capacity(tkey.subkeys.len());
    for tsub in &tkey.subkeys {
        let mut subkey = Key::from_transferable_subkey(tsub)?;
        primary.link_subkey_grip(&mut subkey);
        subkeys.push(subkey);
    }

    let primary_grip = *primary.grip();
    store.add_key(primary)?;
    for subkey in subkeys {
        if let Err(err) = store.add_key(subkey) {
            store.remove_key(&primary_grip);
            return Err(err);
        }
    }

    Ok(())
}

/// Adds a transferable subkey; when the primary is given the two are
/// linked, otherwise the subkey stays an orphan until its primary
/// arrives.
pub fn add_transferable_subkey<S: KeyStore + ?Sized>(
    store: &mut S,
    tsub: &TransferableSubkey,
    primary_grip: Option<&KeyGrip>,
) -> Result<()> {
    let mut subkey = Key::from_transferable_subkey(tsub)?;
    if let Some(grip) = primary_grip {
        if let Some(primary) = store.key_by_grip_mut(grip) {
            primary.link_subkey_grip(&mut subkey);
        } else {
            subkey.set_primary_grip(*grip);
        }
    }
    store.add_key(subkey)?;
    Ok(())
}

/// Serializes the whole store as packet streams: two passes (public
/// keys first, then secret ones), each primary directly followed by
/// its subkeys of the same kind.
pub fn write_keyring<S: KeyStore + ?Sized, W: io::Write>(store: &S, writer: &mut W) -> Result<()> {
    write_pass(store, writer, false)?;
    write_pass(store, writer, true)
}

fn write_pass<S: KeyStore + ?Sized, W: io::Write>(
    store: &S,
    writer: &mut W,
    secret: bool,
) -> Result<()> {
    for key in store.keys() {
        if key.is_secret() != secret || !key.is_primary() {
            continue;
        }
        ensure!(
            key.format() == KeyFormat::Gpg,
            "cannot serialize key format {:?}",
            key.format()
        );

        key.write_packets(writer)?;
        for grip in key.subkey_grips() {
            let subkey = store
                .keys()
                .find(|candidate| candidate.grip() == grip && candidate.is_secret() == secret);
            match subkey {
                Some(subkey) => subkey.write_packets(writer)?,
                None => warn!("missing subkey {}", grip),
            }
        }
    }
    Ok(())
}
