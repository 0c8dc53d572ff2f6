use std::fmt;

/// DNSSEC signing algorithm numbers (RFC 4034, 5155, 5702, 6605, 8080)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnsSecAlgorithm {
    RsaMd5,
    Dsa,
    RsaSha1,
    DsaNsec3Sha1,
    RsaSha1Nsec3Sha1,
    RsaSha256,
    RsaSha512,
    EccGost,
    EcdsaP256Sha256,
    EcdsaP384Sha384,
    Ed25519,
    Ed448,
    Unknown(u8),
}

impl DnsSecAlgorithm {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::RsaMd5,
            3 => Self::Dsa,
            5 => Self::RsaSha1,
            6 => Self::DsaNsec3Sha1,
            7 => Self::RsaSha1Nsec3Sha1,
            8 => Self::RsaSha256,
            10 => Self::RsaSha512,
            12 => Self::EccGost,
            13 => Self::EcdsaP256Sha256,
            14 => Self::EcdsaP384Sha384,
            15 => Self::Ed25519,
            16 => Self::Ed448,
            other => Self::Unknown(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::RsaMd5 => 1,
            Self::Dsa => 3,
            Self::RsaSha1 => 5,
            Self::DsaNsec3Sha1 => 6,
            Self::RsaSha1Nsec3Sha1 => 7,
            Self::RsaSha256 => 8,
            Self::RsaSha512 => 10,
            Self::EccGost => 12,
            Self::EcdsaP256Sha256 => 13,
            Self::EcdsaP384Sha384 => 14,
            Self::Ed25519 => 15,
            Self::Ed448 => 16,
            Self::Unknown(other) => other,
        }
    }

    /// Whether this validator can check signatures made with the algorithm.
    /// Unsupported algorithms are treated as failed matches, never as
    /// global errors.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            Self::RsaSha1
                | Self::RsaSha1Nsec3Sha1
                | Self::RsaSha256
                | Self::RsaSha512
                | Self::EcdsaP256Sha256
                | Self::EcdsaP384Sha384
                | Self::Ed25519
        )
    }

    pub fn is_rsa(&self) -> bool {
        matches!(
            self,
            Self::RsaMd5 | Self::RsaSha1 | Self::RsaSha1Nsec3Sha1 | Self::RsaSha256 | Self::RsaSha512
        )
    }

    /// The ring verification algorithm for this DNSSEC algorithm. DNSSEC
    /// ECDSA signatures are fixed-width r||s (RFC 6605 §4), so the FIXED
    /// variants apply, not ASN.1.
    pub fn ring_algorithm(&self) -> Option<&'static dyn ring::signature::VerificationAlgorithm> {
        match self {
            Self::RsaSha1 | Self::RsaSha1Nsec3Sha1 => {
                Some(&ring::signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY)
            }
            Self::RsaSha256 => Some(&ring::signature::RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY),
            Self::RsaSha512 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA512),
            Self::EcdsaP256Sha256 => Some(&ring::signature::ECDSA_P256_SHA256_FIXED),
            Self::EcdsaP384Sha384 => Some(&ring::signature::ECDSA_P384_SHA384_FIXED),
            Self::Ed25519 => Some(&ring::signature::ED25519),
            _ => None,
        }
    }
}

impl fmt::Display for DnsSecAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RsaMd5 => write!(f, "RSAMD5"),
            Self::Dsa => write!(f, "DSA"),
            Self::RsaSha1 => write!(f, "RSASHA1"),
            Self::DsaNsec3Sha1 => write!(f, "DSA-NSEC3-SHA1"),
            Self::RsaSha1Nsec3Sha1 => write!(f, "RSASHA1-NSEC3-SHA1"),
            Self::RsaSha256 => write!(f, "RSASHA256"),
            Self::RsaSha512 => write!(f, "RSASHA512"),
            Self::EccGost => write!(f, "ECC-GOST"),
            Self::EcdsaP256Sha256 => write!(f, "ECDSAP256SHA256"),
            Self::EcdsaP384Sha384 => write!(f, "ECDSAP384SHA384"),
            Self::Ed25519 => write!(f, "ED25519"),
            Self::Ed448 => write!(f, "ED448"),
            Self::Unknown(n) => write!(f, "ALG{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        for value in [1u8, 5, 7, 8, 10, 13, 14, 15, 16, 99] {
            assert_eq!(DnsSecAlgorithm::from_u8(value).to_u8(), value);
        }
    }

    #[test]
    fn test_support_matrix() {
        assert!(DnsSecAlgorithm::RsaSha256.is_supported());
        assert!(DnsSecAlgorithm::EcdsaP256Sha256.is_supported());
        assert!(DnsSecAlgorithm::Ed25519.is_supported());
        assert!(!DnsSecAlgorithm::RsaMd5.is_supported());
        assert!(!DnsSecAlgorithm::EccGost.is_supported());
        assert!(!DnsSecAlgorithm::Ed448.is_supported());
        assert!(!DnsSecAlgorithm::Unknown(99).is_supported());
    }
}
