use std::fmt;

use crate::errors::{ensure_eq, Result};

pub const KEY_GRIP_SIZE: usize = 20;

/// A key grip: SHA-1 over the raw public key material.
///
/// Unlike the fingerprint it does not cover the creation time, so the
/// public and secret renditions of one key, and the same key imported
/// at different times, all share a grip. Keyrings use it as the
/// stable local identifier and for primary/subkey back-links.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct KeyGrip([u8; KEY_GRIP_SIZE]);

impl KeyGrip {
    pub fn from_slice(input: &[u8]) -> Result<KeyGrip> {
        ensure_eq!(input.len(), KEY_GRIP_SIZE, "invalid input length");
        let mut r = [0u8; KEY_GRIP_SIZE];
        r.copy_from_slice(input);

        Ok(KeyGrip(r))
    }
}

impl From<[u8; KEY_GRIP_SIZE]> for KeyGrip {
    fn from(raw: [u8; KEY_GRIP_SIZE]) -> Self {
        KeyGrip(raw)
    }
}

impl AsRef<[u8]> for KeyGrip {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for KeyGrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyGrip({})", hex::encode(self.0))
    }
}

impl fmt::Display for KeyGrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}
