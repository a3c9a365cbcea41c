use std::io::{self, BufRead};

use num_enum::{FromPrimitive, IntoPrimitive};
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;

const EXPBIAS: u32 = 6;
pub const SALT_SIZE: usize = 8;

/// How the secret material of a key packet is protected.
/// The value doubles as the first octet of the secret key layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S2kUsage {
    /// Cleartext MPIs, sum16 trailer.
    None,
    /// Encrypted, sum16 trailer (usage octet 255).
    Encrypted,
    /// Encrypted, SHA-1 trailer (usage octet 254).
    EncryptedAndHashed,
    /// GnuPG legacy form: the octet is the cipher algorithm id itself,
    /// with an implied Simple MD5 s2k. Parsed, never written.
    LegacyCipher(SymmetricKeyAlgorithm),
}

impl S2kUsage {
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => S2kUsage::None,
            254 => S2kUsage::EncryptedAndHashed,
            255 => S2kUsage::Encrypted,
            other => S2kUsage::LegacyCipher(SymmetricKeyAlgorithm::from(other)),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            S2kUsage::None => 0,
            S2kUsage::EncryptedAndHashed => 254,
            S2kUsage::Encrypted => 255,
            S2kUsage::LegacyCipher(alg) => alg.into(),
        }
    }

    /// True when the secret material is encrypted.
    pub fn is_protected(self) -> bool {
        !matches!(self, S2kUsage::None)
    }
}

/// String-To-Key configuration: specifier, hash, salt and count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringToKey {
    typ: StringToKeyType,
    hash: HashAlgorithm,
    salt: Option<[u8; SALT_SIZE]>,
    count: Option<u8>,
}

impl StringToKey {
    pub fn new_default<R: CryptoRng + Rng>(rng: &mut R) -> Self {
        StringToKey::new_iterated(rng, HashAlgorithm::default(), 224)
    }

    pub fn new_iterated<R: CryptoRng + Rng>(rng: &mut R, hash: HashAlgorithm, count: u8) -> Self {
        let mut salt = [0u8; SALT_SIZE];
        rng.fill(&mut salt[..]);

        StringToKey {
            typ: StringToKeyType::IteratedAndSalted,
            hash,
            salt: Some(salt),
            count: Some(count),
        }
    }

    /// The implied s2k of legacy usage octets: Simple MD5.
    pub(crate) fn legacy_md5() -> Self {
        StringToKey {
            typ: StringToKeyType::Simple,
            hash: HashAlgorithm::MD5,
            salt: None,
            count: None,
        }
    }

    pub fn typ(&self) -> StringToKeyType {
        self.typ
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_ref().map(|salt| &salt[..])
    }

    pub fn salt_mut(&mut self) -> Option<&mut [u8]> {
        self.salt.as_mut().map(|salt| &mut salt[..])
    }

    /// Converts the coded count octet into the octet count.
    /// Ref: https://tools.ietf.org/html/rfc4880#section-3.7.1.3
    pub fn count(&self) -> Option<usize> {
        self.count
            .map(|c| ((16u32 + u32::from(c & 15)) << (u32::from(c >> 4) + EXPBIAS)) as usize)
    }

    pub fn try_from_reader<B: BufRead>(i: &mut B) -> Result<Self> {
        let typ = StringToKeyType::from(i.read_u8()?);
        let hash = HashAlgorithm::from(i.read_u8()?);
        let salt = if typ.has_salt() {
            Some(i.read_array::<SALT_SIZE>()?)
        } else {
            None
        };
        let count = if typ.has_count() {
            Some(i.read_u8()?)
        } else {
            None
        };

        Ok(StringToKey {
            typ,
            hash,
            salt,
            count,
        })
    }

    /// String-To-Key methods are used to convert a given password string into a key.
    /// Ref: https://tools.ietf.org/html/rfc4880#section-3.7
    pub fn derive_key(&self, passphrase: &str, key_size: usize) -> Result<Zeroizing<Vec<u8>>> {
        let digest_size = self.hash.digest_size();
        ensure!(digest_size > 0, "unusable hash algorithm {:?}", self.hash);
        let rounds = key_size.div_ceil(digest_size);

        let mut key = Zeroizing::new(Vec::with_capacity(key_size));

        for round in 0..rounds {
            let mut hasher = self.hash.new_hasher()?;

            // each later round hashes one more zero byte of preload
            if round > 0 {
                hasher.update(&vec![0u8; round][..]);
            }

            match self.typ {
                StringToKeyType::Simple => {
                    hasher.update(passphrase.as_bytes());
                }
                StringToKeyType::Salted => {
                    let salt = self.salt.as_ref().ok_or_else(|| {
                        crate::errors::Error::bad_format("salted s2k without salt")
                    })?;
                    hasher.update(salt);
                    hasher.update(passphrase.as_bytes());
                }
                StringToKeyType::IteratedAndSalted => {
                    let salt = self.salt.as_ref().ok_or_else(|| {
                        crate::errors::Error::bad_format("iterated s2k without salt")
                    })?;
                    let pw = passphrase.as_bytes();
                    let data_size = salt.len() + pw.len();
                    let mut count = self
                        .count()
                        .ok_or_else(|| crate::errors::Error::bad_format("iterated s2k without count"))?;

                    // always hash at least one full salt+password set
                    if count < data_size {
                        count = data_size;
                    }

                    while count > data_size {
                        hasher.update(salt);
                        hasher.update(pw);
                        count -= data_size;
                    }

                    if count < salt.len() {
                        hasher.update(&salt[..count]);
                    } else {
                        hasher.update(salt);
                        count -= salt.len();
                        hasher.update(&pw[..count]);
                    }
                }
                _ => unimplemented_err!("S2K {:?} is not available", self.typ),
            }

            let digest = hasher.finish();
            let end = digest_size.min(key_size - key.len());
            key.extend_from_slice(&digest[..end]);
        }

        Ok(key)
    }
}

impl Serialize for StringToKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[u8::from(self.typ), u8::from(self.hash)])?;

        if let Some(ref salt) = self.salt {
            writer.write_all(salt)?;
        }

        if let Some(count) = self.count {
            writer.write_all(&[count])?;
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut len = 2;
        if self.salt.is_some() {
            len += SALT_SIZE;
        }
        if self.count.is_some() {
            len += 1;
        }
        len
    }
}

/// Available String-To-Key types
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum StringToKeyType {
    Simple = 0,
    Salted = 1,
    Reserved = 2,
    IteratedAndSalted = 3,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for StringToKeyType {
    fn default() -> Self {
        Self::IteratedAndSalted
    }
}

impl StringToKeyType {
    fn has_salt(self) -> bool {
        matches!(
            self,
            StringToKeyType::Salted | StringToKeyType::IteratedAndSalted
        )
    }

    fn has_count(self) -> bool {
        matches!(self, StringToKeyType::IteratedAndSalted)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn coded_count_expands() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let s2k = StringToKey::new_iterated(&mut rng, HashAlgorithm::SHA2_256, 224);
        // 224 = 0xE0: (16 + 0) << (14 + 6)
        assert_eq!(s2k.count(), Some(16 << 20));
    }

    #[test]
    fn serialize_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let s2k = StringToKey::new_iterated(&mut rng, HashAlgorithm::SHA1, 96);

        let buf = s2k.to_bytes().unwrap();
        assert_eq!(buf.len(), s2k.write_len());

        let back = StringToKey::try_from_reader(&mut &buf[..]).unwrap();
        assert_eq!(s2k, back);
    }

    #[test]
    fn derived_key_has_requested_size() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let s2k = StringToKey::new_iterated(&mut rng, HashAlgorithm::SHA1, 96);

        for size in [16, 24, 32] {
            let key = s2k.derive_key("password", size).unwrap();
            assert_eq!(key.len(), size);
        }
    }

    #[test]
    fn simple_md5_matches_plain_digest() {
        // Simple s2k with a key size equal to the digest size is just a hash
        let s2k = StringToKey::legacy_md5();
        let key = s2k.derive_key("abc", 16).unwrap();
        assert_eq!(
            key.as_slice(),
            HashAlgorithm::MD5.digest(b"abc").unwrap().as_slice()
        );
    }

    #[test]
    fn usage_octet_roundtrip() {
        for raw in [0u8, 254, 255, 9] {
            assert_eq!(S2kUsage::from_u8(raw).to_u8(), raw);
        }
        assert!(matches!(
            S2kUsage::from_u8(9),
            S2kUsage::LegacyCipher(SymmetricKeyAlgorithm::AES256)
        ));
    }
}
