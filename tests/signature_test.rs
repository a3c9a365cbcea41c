use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pgp_keys::composed::{
    bind_subkey, certify_userid, parse_keys, parse_subkey, write_keys, BindingOptions,
    CertificationOptions, TransferableKey, TransferableSubkey, TransferableUserId,
};
use pgp_keys::crypto::{EccCurve, HashAlgorithm, PublicKeyAlgorithm};
use pgp_keys::key::{read_keyring, write_keyring, KeySearch, KeyStore};
use pgp_keys::packet::{KeyPacket, SignatureType, UserIdPacket};
use pgp_keys::types::{KeyFlags, KeyGrip, Mpi, PlainSecretParams, PublicParams, Tag};
use pgp_keys::Key;

fn created() -> chrono::DateTime<chrono::Utc> {
    chrono::TimeZone::timestamp_opt(&chrono::Utc, 1_650_000_000, 0).unwrap()
}

fn ed25519_primary(seed: u8) -> KeyPacket {
    let secret = [seed; 32];
    let signing = ed25519_dalek::SigningKey::from_bytes(&secret);
    let mut point = vec![0x40];
    point.extend_from_slice(signing.verifying_key().as_bytes());

    KeyPacket::new_v4_secret(
        Tag::SecretKey,
        created(),
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

fn p256_signing_subkey(rng: &mut ChaCha8Rng) -> KeyPacket {
    let signing = p256::ecdsa::SigningKey::random(rng);
    let point = signing.verifying_key().to_encoded_point(false);

    KeyPacket::new_v4_secret(
        Tag::SecretSubkey,
        created(),
        PublicKeyAlgorithm::ECDSA,
        PublicParams::Ecdsa {
            curve: EccCurve::P256,
            point: Mpi::from_slice(point.as_bytes()),
        },
        PlainSecretParams::Ec {
            x: Mpi::from_slice(&signing.to_bytes()),
        },
    )
    .unwrap()
}

#[test]
fn certification_verifies() {
    let mut rng = ChaCha8Rng::seed_from_u64(20);
    let primary = ed25519_primary(1);
    let mut uid = TransferableUserId {
        userid: UserIdPacket::new("Carol <carol@example.com>"),
        signatures: Vec::new(),
    };

    let sig = certify_userid(
        &mut rng,
        &primary,
        &mut uid,
        &primary,
        HashAlgorithm::SHA2_256,
        &CertificationOptions {
            primary: true,
            key_flags: KeyFlags::CERTIFY | KeyFlags::SIGN,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(sig.typ(), SignatureType::CertPositive);
    assert_eq!(
        sig.issuer_fingerprint().unwrap(),
        &primary.fingerprint().unwrap()
    );
    assert_eq!(sig.issuer_key_id().unwrap(), primary.key_id().unwrap());
    assert!(sig.is_primary_uid());

    let sig = uid.signatures[0].clone();
    sig.verify_certification(primary.public_params(), &primary, &uid.userid)
        .unwrap();

    // the same signature over a different user id must not verify
    let other_uid = UserIdPacket::new("Mallory <mallory@example.com>");
    assert!(sig
        .verify_certification(primary.public_params(), &primary, &other_uid)
        .is_err());
}

#[test]
fn sign_capable_subkey_gets_back_signature() {
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let primary = ed25519_primary(2);
    let mut subkey = TransferableSubkey {
        subkey: p256_signing_subkey(&mut rng),
        signatures: Vec::new(),
    };

    bind_subkey(
        &mut rng,
        &primary,
        &mut subkey,
        HashAlgorithm::SHA2_256,
        &BindingOptions {
            key_expiration: Some(86400 * 365),
            key_flags: KeyFlags::SIGN,
        },
    )
    .unwrap();

    let binding = &subkey.signatures[0];
    assert_eq!(binding.typ(), SignatureType::SubkeyBinding);
    assert_eq!(binding.key_expiration(), Some(86400 * 365));

    // outer binding verifies against the primary
    binding
        .verify_binding(primary.public_params(), &primary, &subkey.subkey)
        .unwrap();

    // the embedded back-signature is a primary-key-binding by the
    // subkey itself, over the same (primary, subkey) pair
    let embedded = binding.embedded_signature().expect("back-signature");
    assert_eq!(embedded.typ(), SignatureType::PrimaryKeyBinding);
    assert_eq!(
        embedded.issuer_key_id().unwrap(),
        subkey.subkey.key_id().unwrap()
    );
    embedded
        .verify_binding(subkey.subkey.public_params(), &primary, &subkey.subkey)
        .unwrap();

    // serialize and reparse: the embedded signature survives
    let mut raw = Vec::new();
    {
        use pgp_keys::packet::PacketTrait;
        subkey.subkey.to_writer_with_header(&mut raw).unwrap();
        binding.to_writer_with_header(&mut raw).unwrap();
    }
    let back = parse_subkey(&raw[..]).unwrap();
    let back_embedded = back.signatures[0].embedded_signature().unwrap();
    assert!(back_embedded.pkt_eq(embedded));
}

#[test]
fn encryption_subkey_gets_no_back_signature() {
    let mut rng = ChaCha8Rng::seed_from_u64(22);
    let primary = ed25519_primary(3);
    let mut subkey = TransferableSubkey {
        subkey: p256_signing_subkey(&mut rng),
        signatures: Vec::new(),
    };

    bind_subkey(
        &mut rng,
        &primary,
        &mut subkey,
        HashAlgorithm::SHA2_256,
        &BindingOptions {
            key_expiration: None,
            key_flags: KeyFlags::ENCRYPT,
        },
    )
    .unwrap();

    assert!(subkey.signatures[0].embedded_signature().is_none());
}

#[test]
fn protect_roundtrip_through_serialization() {
    let mut rng = ChaCha8Rng::seed_from_u64(23);

    let mut key = TransferableKey {
        key: ed25519_primary(4),
        signatures: Vec::new(),
        userids: vec![TransferableUserId {
            userid: UserIdPacket::new("Dave <dave@example.com>"),
            signatures: Vec::new(),
        }],
        subkeys: Vec::new(),
    };
    certify_userid(
        &mut rng,
        &key.key,
        &mut key.userids[0],
        &key.key,
        HashAlgorithm::SHA2_256,
        &CertificationOptions::default(),
    )
    .unwrap();

    let original_mpis = key.key.secret_params().unwrap().clone();

    // protect the primary, write it out, read it back
    key.key
        .set_protection(pgp_keys::types::SecretProtection::new_default(&mut rng))
        .unwrap();
    key.key.encrypt_secret_key("p@ss", &mut rng).unwrap();

    let mut data = Vec::new();
    write_keys(std::slice::from_ref(&key), &mut data, true).unwrap();

    let mut parsed = parse_keys(&data[..]).unwrap();
    let packet = &mut parsed.keys[0].key;

    // wrong password fails and leaves the material scrubbed
    assert!(packet.decrypt_secret_key(Some("wrong")).is_err());
    assert!(!packet.has_secret_material());

    packet.decrypt_secret_key(Some("p@ss")).unwrap();
    assert_eq!(packet.secret_params().unwrap(), &original_mpis);
    // the public half never changed
    assert_eq!(packet.public_params(), key.key.public_params());
}

#[derive(Default)]
struct MemoryStore {
    keys: Vec<Key>,
}

impl KeyStore for MemoryStore {
    fn add_key(&mut self, key: Key) -> pgp_keys::errors::Result<&mut Key> {
        self.keys.push(key);
        Ok(self.keys.last_mut().expect("pushed above"))
    }

    fn remove_key(&mut self, grip: &KeyGrip) -> Option<Key> {
        let idx = self.keys.iter().position(|key| key.grip() == grip)?;
        Some(self.keys.remove(idx))
    }

    fn key_by_grip(&self, grip: &KeyGrip) -> Option<&Key> {
        self.keys.iter().find(|key| key.grip() == grip)
    }

    fn key_by_grip_mut(&mut self, grip: &KeyGrip) -> Option<&mut Key> {
        self.keys.iter_mut().find(|key| key.grip() == grip)
    }

    fn keys(&self) -> Box<dyn Iterator<Item = &Key> + '_> {
        Box::new(self.keys.iter())
    }
}

fn full_key(rng: &mut ChaCha8Rng, seed: u8) -> TransferableKey {
    let mut key = TransferableKey {
        key: ed25519_primary(seed),
        signatures: Vec::new(),
        userids: vec![TransferableUserId {
            userid: UserIdPacket::new("Erin <erin@example.com>"),
            signatures: Vec::new(),
        }],
        subkeys: vec![TransferableSubkey {
            subkey: p256_signing_subkey(rng),
            signatures: Vec::new(),
        }],
    };
    certify_userid(
        rng,
        &key.key,
        &mut key.userids[0],
        &key.key,
        HashAlgorithm::SHA2_256,
        &CertificationOptions {
            primary: true,
            key_flags: KeyFlags::CERTIFY | KeyFlags::SIGN,
            ..Default::default()
        },
    )
    .unwrap();
    bind_subkey(
        rng,
        &key.key,
        &mut key.subkeys[0],
        HashAlgorithm::SHA2_256,
        &BindingOptions {
            key_expiration: None,
            key_flags: KeyFlags::SIGN,
        },
    )
    .unwrap();
    key
}

#[test]
fn keyring_read_validate_write() {
    let mut rng = ChaCha8Rng::seed_from_u64(24);
    let tkey = full_key(&mut rng, 5);

    let mut data = Vec::new();
    write_keys(std::slice::from_ref(&tkey), &mut data, false).unwrap();

    let mut store = MemoryStore::default();
    let warnings = read_keyring(&mut store, &data[..]).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(store.keys.len(), 2);

    // grips link primary and subkey both ways
    let primary_grip = *store.keys[0].grip();
    let subkey_grip = *store.keys[1].grip();
    assert_eq!(store.keys[0].subkey_grips(), &[subkey_grip]);
    assert_eq!(store.keys[1].primary_grip(), Some(&primary_grip));

    // search works over every criterion
    assert!(store.find(&KeySearch::Grip(primary_grip)).is_some());
    assert!(store
        .find(&KeySearch::KeyId(*store.keys[0].key_id()))
        .is_some());
    assert!(store
        .find(&KeySearch::Fingerprint(store.keys[0].fingerprint().clone()))
        .is_some());
    assert!(store
        .find(&KeySearch::UserId("Erin <erin@example.com>".to_string()))
        .is_some());

    // primary-uid marker and key flags were mirrored up
    assert_eq!(store.keys[0].primary_userid(), Some(0));
    assert!(store.keys[0].flags().can_certify());

    // validation: secret primary with a good self-cert, subkey bound
    let mut primary = store.keys[0].clone();
    primary.validate(&store).unwrap();
    assert!(primary.valid() && primary.validated());
    *store.key_by_grip_mut(&primary_grip).unwrap() = primary;

    let mut subkey = store.keys[1].clone();
    subkey.validate(&store).unwrap();
    assert!(subkey.valid() && subkey.validated());

    // writing the store replays the original packet bytes
    let mut out = Vec::new();
    write_keyring(&store, &mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn orphan_subkey_ingestion() {
    let mut rng = ChaCha8Rng::seed_from_u64(25);
    let tkey = full_key(&mut rng, 6);

    // serialize only the subkey part
    let mut raw = Vec::new();
    {
        use pgp_keys::packet::PacketTrait;
        tkey.subkeys[0]
            .subkey
            .to_writer_with_header(&mut raw)
            .unwrap();
        for sig in &tkey.subkeys[0].signatures {
            sig.to_writer_with_header(&mut raw).unwrap();
        }
    }

    let mut store = MemoryStore::default();
    read_keyring(&mut store, &raw[..]).unwrap();
    assert_eq!(store.keys.len(), 1);
    assert!(store.keys[0].is_subkey());
    // not linked yet: the primary is expected to arrive later
    assert!(store.keys[0].primary_grip().is_none());
}
