//! Self-signature generation: user id certifications and subkey
//! binding signatures, including the embedded primary-key-binding
//! made by signing subkeys.

use chrono::{DateTime, Utc};
use rand::{CryptoRng, Rng};
use smallvec::SmallVec;

use crate::composed::transferable::{TransferableSubkey, TransferableUserId};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::crypto::adjust_hash_to_key;
use crate::errors::{Error, Result};
use crate::packet::signature::{hash_key_data, hash_userid_data};
use crate::packet::{
    timestamp_to_datetime, KeyPacket, Signature, SignatureType, SignatureVersion,
};
use crate::types::{CompressionAlgorithm, KeyFlags, PlainSecretParams};

/// Algorithm preferences placed into a certification.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserPreferences {
    pub symmetric_algs: SmallVec<[SymmetricKeyAlgorithm; 8]>,
    pub hash_algs: SmallVec<[HashAlgorithm; 8]>,
    pub compression_algs: SmallVec<[CompressionAlgorithm; 8]>,
    /// Key server preferences octet (0x80 = no-modify).
    pub key_server_prefs: Option<u8>,
    pub key_server: Option<String>,
}

/// What goes into a user id self-certification.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CertificationOptions {
    /// Key expiration in seconds after key creation.
    pub key_expiration: Option<u32>,
    pub key_flags: KeyFlags,
    /// Mark the certified user id as the primary one.
    pub primary: bool,
    pub preferences: UserPreferences,
}

/// What goes into a subkey binding signature.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BindingOptions {
    /// Key expiration in seconds after key creation.
    pub key_expiration: Option<u32>,
    pub key_flags: KeyFlags,
}

fn signing_material(signer: &KeyPacket) -> Result<&PlainSecretParams> {
    signer
        .secret_params()
        .ok_or_else(|| Error::bad_parameters("signer carries no usable secret material"))
}

fn signature_time() -> Result<DateTime<Utc>> {
    // second precision, as the wire format stores it
    timestamp_to_datetime(u32::try_from(Utc::now().timestamp())?)
}

/// Certifies a user id of `key` with a v4 positive certification by
/// `signer` and appends the signature to the user id.
///
/// For a self-certification `key` and `signer` are the same packet;
/// `signer` must be unlocked.
pub fn certify_userid<'a, R: CryptoRng + Rng>(
    rng: &mut R,
    key: &KeyPacket,
    userid: &'a mut TransferableUserId,
    signer: &KeyPacket,
    hash_alg: HashAlgorithm,
    options: &CertificationOptions,
) -> Result<&'a Signature> {
    let secret = signing_material(signer)?;
    let hash_alg = adjust_hash_to_key(hash_alg, signer.public_params());

    let mut sig = Signature::new_v4(SignatureType::CertPositive, signer.algorithm(), hash_alg);

    sig.set_issuer_fingerprint(signer.fingerprint()?)?;
    sig.set_created(signature_time()?)?;
    if let Some(expiration) = options.key_expiration {
        sig.set_key_expiration(expiration)?;
    }
    if !options.key_flags.is_empty() {
        sig.set_key_flags(options.key_flags)?;
    }
    if options.primary {
        sig.set_primary_uid(true)?;
    }

    let prefs = &options.preferences;
    if !prefs.symmetric_algs.is_empty() {
        sig.set_preferred_symmetric_algs(prefs.symmetric_algs.clone())?;
    }
    if !prefs.hash_algs.is_empty() {
        sig.set_preferred_hash_algs(prefs.hash_algs.clone())?;
    }
    if !prefs.compression_algs.is_empty() {
        sig.set_preferred_compression_algs(prefs.compression_algs.clone())?;
    }
    if let Some(ks_prefs) = prefs.key_server_prefs {
        sig.set_key_server_prefs(ks_prefs)?;
    }
    if let Some(key_server) = &prefs.key_server {
        sig.set_preferred_key_server(key_server)?;
    }
    sig.set_issuer_key_id(signer.key_id()?)?;

    let mut hasher = hash_alg.new_hasher()?;
    hash_key_data(key, hasher.as_mut())?;
    hash_userid_data(&userid.userid, SignatureVersion::V4, hasher.as_mut());

    sig.calculate(rng, signer.public_params(), secret, hasher)?;

    userid.signatures.push(sig);
    Ok(userid.signatures.last().expect("pushed above"))
}

/// Binds `subkey` to the primary `key` with a v4 subkey binding
/// signature and appends it to the subkey.
///
/// When the effective key flags (the explicit ones, or the subkey
/// algorithm's defaults when none are given) include signing, the
/// binding carries an embedded primary-key-binding back-signature
/// made by the subkey over the identical hash prefix; this requires
/// the subkey's secret material to be available.
pub fn bind_subkey<'a, R: CryptoRng + Rng>(
    rng: &mut R,
    key: &KeyPacket,
    subkey: &'a mut TransferableSubkey,
    hash_alg: HashAlgorithm,
    options: &BindingOptions,
) -> Result<&'a Signature> {
    let secret = signing_material(key)?;
    let outer_hash = adjust_hash_to_key(hash_alg, key.public_params());

    let mut sig = Signature::new_v4(SignatureType::SubkeyBinding, key.algorithm(), outer_hash);

    sig.set_issuer_fingerprint(key.fingerprint()?)?;
    sig.set_created(signature_time()?)?;
    if let Some(expiration) = options.key_expiration {
        sig.set_key_expiration(expiration)?;
    }
    if !options.key_flags.is_empty() {
        sig.set_key_flags(options.key_flags)?;
    }

    let mut hasher = outer_hash.new_hasher()?;
    hash_key_data(key, hasher.as_mut())?;
    hash_key_data(&subkey.subkey, hasher.as_mut())?;
    // the back-signature covers the identical (primary, subkey) prefix
    let hasher_for_embedded = hasher.clone_boxed();

    sig.calculate(rng, key.public_params(), secret, hasher)?;

    let effective_flags = if options.key_flags.is_empty() {
        subkey.subkey.algorithm().default_flags()
    } else {
        options.key_flags
    };
    if effective_flags.can_sign() {
        let embedded = calculate_primary_binding(rng, subkey, outer_hash, hasher_for_embedded)?;
        sig.set_embedded_signature(embedded)?;
    }

    sig.set_issuer_key_id(key.key_id()?)?;

    subkey.signatures.push(sig);
    Ok(subkey.signatures.last().expect("pushed above"))
}

/// The back-signature: type primary-key-binding, issued by the
/// subkey itself, over the already fed (primary, subkey) hash state.
/// It inherits the outer signature's hash algorithm, since both are
/// computed from the same hash state.
fn calculate_primary_binding<R: CryptoRng + Rng>(
    rng: &mut R,
    subkey: &TransferableSubkey,
    hash_alg: HashAlgorithm,
    hasher: Box<dyn crate::crypto::hash::Hasher>,
) -> Result<Signature> {
    let sub_secret = subkey
        .subkey
        .secret_params()
        .ok_or_else(|| Error::bad_parameters("signing subkey carries no secret material"))?;

    let mut sig = Signature::new_v4(
        SignatureType::PrimaryKeyBinding,
        subkey.subkey.algorithm(),
        hash_alg,
    );
    sig.set_created(signature_time()?)?;
    sig.set_issuer_key_id(subkey.subkey.key_id()?)?;

    sig.calculate(rng, subkey.subkey.public_params(), sub_secret, hasher)?;

    Ok(sig)
}
