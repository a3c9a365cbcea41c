//! Structural key validation: sequences the self-certification,
//! binding and revocation checks and folds the results into the
//! `valid`/`validated` bits. The cryptographic verification itself
//! lives with the signature packet.

use chrono::Utc;

use crate::errors::{Error, Result};
use crate::key::store::KeyStore;
use crate::key::{Key, Subsig};
use crate::packet::SignatureType;

fn is_self_certification(key: &Key, subsig: &Subsig) -> bool {
    if !key.is_primary() || !subsig.sig.typ().is_certification() {
        return false;
    }

    // prefer the fingerprint when the signature names one
    if let Some(fp) = subsig.sig.issuer_fingerprint() {
        return fp == key.fingerprint();
    }
    match subsig.sig.issuer_key_id() {
        Some(id) => &id == key.key_id(),
        None => false,
    }
}

fn is_key_revocation(key: &Key, subsig: &Subsig) -> bool {
    key.is_primary() && subsig.sig.typ() == SignatureType::KeyRevocation
}

fn is_subkey_binding(key: &Key, subsig: &Subsig) -> bool {
    key.is_subkey() && subsig.sig.typ() == SignatureType::SubkeyBinding
}

fn is_subkey_revocation(key: &Key, subsig: &Subsig) -> bool {
    key.is_subkey() && subsig.sig.typ() == SignatureType::SubkeyRevocation
}

impl Key {
    /// Validates this key structurally.
    ///
    /// A primary key is valid when it is not revoked by a verifying
    /// key-revocation signature, and either carries at least one
    /// verifying, unexpired self-certification or is a secret key.
    /// A subkey additionally needs its primary (resolved through the
    /// keyring by grip) to be valid, and at least one verifying,
    /// unexpired binding. Revocation signatures never expire for
    /// this purpose.
    pub fn validate<S: KeyStore + ?Sized>(&mut self, store: &S) -> Result<()> {
        let valid = if self.is_primary() {
            validate_primary(self)
        } else {
            let grip = *self
                .primary_grip()
                .ok_or_else(|| Error::bad_parameters("subkey is not linked to a primary"))?;
            let primary = store
                .key_by_grip(&grip)
                .ok_or_else(|| Error::bad_parameters("primary key not present in keyring"))?;
            validate_subkey(self, primary)
        };

        self.set_validity(valid, true);
        Ok(())
    }
}

fn validate_primary(key: &Key) -> bool {
    let now = Utc::now();
    let mut has_cert = false;

    for subsig in key.subsigs() {
        if is_self_certification(key, subsig) && !has_cert {
            let Some(uid) = subsig.uid.and_then(|idx| key.userids().get(idx)) else {
                continue;
            };
            let verified = subsig
                .sig
                .verify_certification(key.packet().public_params(), key.packet(), &uid.pkt)
                .is_ok();
            has_cert = verified && !subsig.sig.is_expired(now);
            continue;
        }

        if is_key_revocation(key, subsig)
            && subsig
                .sig
                .verify_key(key.packet().public_params(), key.packet())
                .is_ok()
        {
            // a verifying revocation beats everything else
            return false;
        }
    }

    has_cert || key.is_secret()
}

fn validate_subkey(subkey: &Key, primary: &Key) -> bool {
    if !primary.valid() {
        return false;
    }

    let now = Utc::now();
    let signer = primary.packet().public_params();
    let mut has_binding = false;

    for subsig in subkey.subsigs() {
        if is_subkey_binding(subkey, subsig) && !has_binding {
            let verified = subsig
                .sig
                .verify_binding(signer, primary.packet(), subkey.packet())
                .is_ok();
            has_binding = verified && !subsig.sig.is_expired(now);
            continue;
        }

        if is_subkey_revocation(subkey, subsig)
            && subsig
                .sig
                .verify_binding(signer, primary.packet(), subkey.packet())
                .is_ok()
        {
            return false;
        }
    }

    has_binding || (subkey.is_secret() && primary.is_secret())
}
