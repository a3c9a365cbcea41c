use crate::crypto::hash::HashAlgorithm;

/// Named elliptic curves, identified on the wire by their OID.
/// Ref: https://tools.ietf.org/html/rfc6637#section-11
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EccCurve {
    P256,
    P384,
    P521,
    /// For EdDSA keys.
    Ed25519,
    /// For ECDH keys.
    Curve25519,
    Unknown(Vec<u8>),
}

impl EccCurve {
    /// ASN.1 OID, without the tag/length framing, as encoded into key packets.
    pub fn oid(&self) -> &[u8] {
        match self {
            EccCurve::P256 => &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07],
            EccCurve::P384 => &[0x2B, 0x81, 0x04, 0x00, 0x22],
            EccCurve::P521 => &[0x2B, 0x81, 0x04, 0x00, 0x23],
            EccCurve::Ed25519 => &[0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01],
            EccCurve::Curve25519 => {
                &[0x2B, 0x06, 0x01, 0x04, 0x01, 0x97, 0x55, 0x01, 0x05, 0x01]
            }
            EccCurve::Unknown(oid) => oid,
        }
    }

    pub fn from_oid(oid: &[u8]) -> Self {
        for known in [
            EccCurve::P256,
            EccCurve::P384,
            EccCurve::P521,
            EccCurve::Ed25519,
            EccCurve::Curve25519,
        ] {
            if known.oid() == oid {
                return known;
            }
        }
        EccCurve::Unknown(oid.to_vec())
    }

    pub fn name(&self) -> &str {
        match self {
            EccCurve::P256 => "NIST P-256",
            EccCurve::P384 => "NIST P-384",
            EccCurve::P521 => "NIST P-521",
            EccCurve::Ed25519 => "Ed25519",
            EccCurve::Curve25519 => "Curve25519",
            EccCurve::Unknown(_) => "unknown",
        }
    }

    /// Field size in bytes, used to left-pad scalars.
    pub fn field_size(&self) -> usize {
        match self {
            EccCurve::P256 => 32,
            EccCurve::P384 => 48,
            EccCurve::P521 => 66,
            EccCurve::Ed25519 | EccCurve::Curve25519 => 32,
            EccCurve::Unknown(_) => 0,
        }
    }

    /// The weakest hash algorithm acceptable for ECDSA over this curve.
    pub fn min_hash(&self) -> HashAlgorithm {
        match self {
            EccCurve::P256 => HashAlgorithm::SHA2_256,
            EccCurve::P384 => HashAlgorithm::SHA2_384,
            _ => HashAlgorithm::SHA2_512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oid_roundtrip() {
        for curve in [
            EccCurve::P256,
            EccCurve::P384,
            EccCurve::P521,
            EccCurve::Ed25519,
            EccCurve::Curve25519,
        ] {
            assert_eq!(EccCurve::from_oid(curve.oid()), curve);
        }
        assert_eq!(
            EccCurve::from_oid(&[1, 2, 3]),
            EccCurve::Unknown(vec![1, 2, 3])
        );
    }
}
