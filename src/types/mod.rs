mod compression;
mod fingerprint;
mod grip;
mod key_flags;
mod key_id;
mod mpi;
pub mod params;
mod s2k;
mod tag;

pub use self::compression::CompressionAlgorithm;
pub use self::fingerprint::Fingerprint;
pub use self::grip::KeyGrip;
pub use self::key_flags::KeyFlags;
pub use self::key_id::KeyId;
pub use self::mpi::Mpi;
pub use self::params::{CipherMode, PlainSecretParams, PublicParams, SecretProtection};
pub use self::s2k::{S2kUsage, StringToKey, StringToKeyType};
pub use self::tag::Tag;

use crate::errors::{Error, Result};

/// Key packet versions this crate handles.
///
/// Version 5 and newer formats are out of scope; version 2 keys exist
/// only as historic curiosities and are rejected alongside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyVersion {
    V3,
    V4,
}

impl KeyVersion {
    pub fn try_from_u8(raw: u8) -> Result<Self> {
        match raw {
            3 => Ok(KeyVersion::V3),
            4 => Ok(KeyVersion::V4),
            _ => Err(Error::bad_format(format!("unsupported key version {}", raw))),
        }
    }
}

impl From<KeyVersion> for u8 {
    fn from(version: KeyVersion) -> u8 {
        match version {
            KeyVersion::V3 => 3,
            KeyVersion::V4 => 4,
        }
    }
}
