use num_enum::{FromPrimitive, IntoPrimitive};

use crate::types::KeyFlags;

/// Available public key algorithms.
/// Ref: https://tools.ietf.org/html/rfc4880.html#section-9.1
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[non_exhaustive]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt and Sign)
    RSA = 1,
    /// DEPRECATED: RSA (Encrypt-Only)
    RSAEncrypt = 2,
    /// DEPRECATED: RSA (Sign-Only)
    RSASign = 3,
    /// Elgamal (Encrypt-Only)
    ElgamalEncrypt = 16,
    /// DSA (Digital Signature Algorithm)
    DSA = 17,
    /// Elliptic Curve Diffie-Hellman: RFC 6637
    ECDH = 18,
    /// ECDSA: RFC 6637
    ECDSA = 19,
    /// DEPRECATED: Elgamal (Encrypt or Sign)
    Elgamal = 20,
    /// EdDSA (legacy v4 framing)
    EdDSA = 22,
    /// SM2 (chinese national standard GM/T 0003)
    SM2 = 99,

    #[num_enum(catch_all)]
    Unknown(u8),
}

impl PublicKeyAlgorithm {
    pub fn is_rsa(self) -> bool {
        matches!(
            self,
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign
        )
    }

    /// Default key flags granted when a binding signature carries none.
    pub fn default_flags(self) -> KeyFlags {
        match self {
            PublicKeyAlgorithm::RSA => {
                KeyFlags::CERTIFY | KeyFlags::SIGN | KeyFlags::AUTH | KeyFlags::ENCRYPT
            }
            PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::ElgamalEncrypt
            | PublicKeyAlgorithm::ECDH => KeyFlags::ENCRYPT,
            PublicKeyAlgorithm::RSASign => KeyFlags::SIGN,
            PublicKeyAlgorithm::DSA
            | PublicKeyAlgorithm::ECDSA
            | PublicKeyAlgorithm::EdDSA => KeyFlags::CERTIFY | KeyFlags::SIGN | KeyFlags::AUTH,
            PublicKeyAlgorithm::SM2 => {
                KeyFlags::CERTIFY | KeyFlags::SIGN | KeyFlags::AUTH | KeyFlags::ENCRYPT
            }
            // deprecated encrypt-or-sign keys get no capabilities at all
            PublicKeyAlgorithm::Elgamal | PublicKeyAlgorithm::Unknown(_) => KeyFlags::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_roundtrip() {
        for (alg, raw) in [
            (PublicKeyAlgorithm::RSA, 1u8),
            (PublicKeyAlgorithm::DSA, 17),
            (PublicKeyAlgorithm::ECDH, 18),
            (PublicKeyAlgorithm::ECDSA, 19),
            (PublicKeyAlgorithm::EdDSA, 22),
            (PublicKeyAlgorithm::SM2, 99),
        ] {
            assert_eq!(u8::from(alg), raw);
            assert_eq!(PublicKeyAlgorithm::from(raw), alg);
        }
    }

    #[test]
    fn elgamal_encrypt_or_sign_has_no_capabilities() {
        assert!(PublicKeyAlgorithm::Elgamal.default_flags().is_empty());
    }
}
