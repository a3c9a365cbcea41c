use std::fmt;

use crate::errors::{ensure_eq, Result};

pub const KEY_ID_SIZE: usize = 8;

/// Represents a Key ID.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct KeyId([u8; KEY_ID_SIZE]);

impl KeyId {
    pub fn from_slice(input: &[u8]) -> Result<KeyId> {
        ensure_eq!(input.len(), KEY_ID_SIZE, "invalid input length");
        let mut r = [0u8; KEY_ID_SIZE];
        r.copy_from_slice(input);

        Ok(KeyId(r))
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl AsRef<[u8]> for KeyId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(self.0))
    }
}

impl fmt::LowerHex for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::UpperHex for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}
