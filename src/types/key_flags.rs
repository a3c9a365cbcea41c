use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Key usage flags from the key flags signature subpacket.
/// Ref: https://tools.ietf.org/html/rfc4880.html#section-5.2.3.21
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyFlags(u8);

impl KeyFlags {
    pub const CERTIFY: KeyFlags = KeyFlags(0x01);
    pub const SIGN: KeyFlags = KeyFlags(0x02);
    pub const ENCRYPT_COMMS: KeyFlags = KeyFlags(0x04);
    pub const ENCRYPT_STORAGE: KeyFlags = KeyFlags(0x08);
    /// Both encryption flags.
    pub const ENCRYPT: KeyFlags = KeyFlags(0x0C);
    pub const SPLIT: KeyFlags = KeyFlags(0x10);
    pub const AUTH: KeyFlags = KeyFlags(0x20);
    pub const SHARED: KeyFlags = KeyFlags(0x80);

    pub fn empty() -> Self {
        KeyFlags(0)
    }

    pub fn from_bits(bits: u8) -> Self {
        KeyFlags(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: KeyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn can_certify(self) -> bool {
        self.contains(Self::CERTIFY)
    }

    pub fn can_sign(self) -> bool {
        self.contains(Self::SIGN)
    }

    pub fn can_encrypt(self) -> bool {
        self.0 & Self::ENCRYPT.0 != 0
    }

    pub fn can_authenticate(self) -> bool {
        self.contains(Self::AUTH)
    }
}

impl BitOr for KeyFlags {
    type Output = KeyFlags;

    fn bitor(self, rhs: KeyFlags) -> KeyFlags {
        KeyFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for KeyFlags {
    fn bitor_assign(&mut self, rhs: KeyFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for KeyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyFlags({:#04x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_queries() {
        let flags = KeyFlags::CERTIFY | KeyFlags::SIGN;
        assert!(flags.can_certify());
        assert!(flags.can_sign());
        assert!(!flags.can_encrypt());

        assert!(KeyFlags::ENCRYPT_COMMS.can_encrypt());
        assert!(KeyFlags::ENCRYPT_STORAGE.can_encrypt());
        assert!(KeyFlags::empty().is_empty());
    }
}
