use std::fmt;

use crate::errors::{Error, Result};
use crate::types::{KeyId, KeyVersion};

/// A key fingerprint: MD5-derived for v3 keys, SHA-1 over the
/// canonical public key serialization for v4 keys.
#[derive(Clone, Eq, PartialEq, Hash)]
pub enum Fingerprint {
    V3([u8; 16]),
    V4([u8; 20]),
}

impl Fingerprint {
    pub fn new(version: KeyVersion, fp: &[u8]) -> Result<Self> {
        let e = |_| {
            Error::bad_parameters(format!(
                "illegal fingerprint length {} for key version {:?}",
                fp.len(),
                version
            ))
        };

        let fp = match version {
            KeyVersion::V3 => Fingerprint::V3(fp.try_into().map_err(e)?),
            KeyVersion::V4 => Fingerprint::V4(fp.try_into().map_err(e)?),
        };

        Ok(fp)
    }

    /// Construct from raw bytes, inferring the version from the length.
    /// Used when decoding issuer fingerprint subpackets.
    pub fn from_bytes(fp: &[u8]) -> Result<Self> {
        match fp.len() {
            16 => Self::new(KeyVersion::V3, fp),
            20 => Self::new(KeyVersion::V4, fp),
            n => Err(Error::bad_format(format!("unknown fingerprint length {}", n))),
        }
    }

    pub fn version(&self) -> KeyVersion {
        match self {
            Self::V3(_) => KeyVersion::V3,
            Self::V4(_) => KeyVersion::V4,
        }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        match self {
            Self::V3(_) => 16,
            Self::V4(_) => 20,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::V3(fp) => &fp[..],
            Self::V4(fp) => &fp[..],
        }
    }

    /// The key id belonging to a v4 fingerprint: its last 8 bytes.
    /// v3 key ids are derived from the RSA modulus, not the fingerprint.
    pub fn key_id(&self) -> Option<KeyId> {
        match self {
            Self::V3(_) => None,
            Self::V4(fp) => KeyId::from_slice(&fp[12..]).ok(),
        }
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", hex::encode(self.as_bytes()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}
