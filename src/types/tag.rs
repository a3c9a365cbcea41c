use num_enum::{FromPrimitive, IntoPrimitive};

/// Packet type ids.
/// Ref: https://tools.ietf.org/html/rfc4880.html#section-4.3
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Tag {
    Reserved = 0,
    PublicKeyEncryptedSessionKey = 1,
    Signature = 2,
    SymKeyEncryptedSessionKey = 3,
    OnePassSignature = 4,
    SecretKey = 5,
    PublicKey = 6,
    SecretSubkey = 7,
    CompressedData = 8,
    SymEncryptedData = 9,
    Marker = 10,
    LiteralData = 11,
    Trust = 12,
    UserId = 13,
    PublicSubkey = 14,
    UserAttribute = 17,
    SymEncryptedProtectedData = 18,
    ModDetectionCode = 19,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Tag {
    pub fn is_primary_key(self) -> bool {
        matches!(self, Tag::PublicKey | Tag::SecretKey)
    }

    pub fn is_subkey(self) -> bool {
        matches!(self, Tag::PublicSubkey | Tag::SecretSubkey)
    }

    pub fn is_key(self) -> bool {
        self.is_primary_key() || self.is_subkey()
    }

    pub fn is_secret_key(self) -> bool {
        matches!(self, Tag::SecretKey | Tag::SecretSubkey)
    }

    pub fn is_userid(self) -> bool {
        matches!(self, Tag::UserId | Tag::UserAttribute)
    }

    /// The public counterpart of a key tag; non-key tags pass through.
    pub fn as_public(self) -> Tag {
        match self {
            Tag::SecretKey => Tag::PublicKey,
            Tag::SecretSubkey => Tag::PublicSubkey,
            other => other,
        }
    }
}
