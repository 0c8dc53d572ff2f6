pub mod algorithm;
pub mod classify;
pub mod digest;
pub mod errors;
pub mod find_key;
pub mod key_cache;
pub mod key_tag;
pub mod nsec;
pub mod nsec3;
pub mod trust_anchor;
pub mod validator;
pub mod verify;

pub use algorithm::DnsSecAlgorithm;
pub use classify::ResponseClassification;
pub use digest::DigestType;
pub use errors::ValidationReason;
pub use key_cache::{KeyCache, KeyEntry};
pub use nsec3::{Nsec3Engine, Nsec3IterationPolicy};
pub use trust_anchor::TrustAnchorStore;
pub use validator::ValidatingResolver;
pub use verify::RrsetVerifier;

/// Security status of an RRset or message (RFC 4033 §5)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecurityStatus {
    /// Not validated yet
    #[default]
    Unchecked,
    /// No applicable trust anchor
    Indeterminate,
    /// Provably outside any secure delegation
    Insecure,
    /// Chain of trust verified
    Secure,
    /// Validation failed
    Bogus,
}

/// Outcome of a denial-of-existence proof.
#[derive(Debug, Clone)]
pub struct Proof {
    pub status: SecurityStatus,
    pub reason: Option<ValidationReason>,
}

impl Proof {
    pub fn secure() -> Self {
        Proof {
            status: SecurityStatus::Secure,
            reason: None,
        }
    }

    pub fn insecure(reason: ValidationReason) -> Self {
        Proof {
            status: SecurityStatus::Insecure,
            reason: Some(reason),
        }
    }

    pub fn bogus(reason: ValidationReason) -> Self {
        Proof {
            status: SecurityStatus::Bogus,
            reason: Some(reason),
        }
    }
}

/// DNSSEC constants
pub mod constants {
    /// Reserved QCLASS carrying bogus-reason TXT records (matches the
    /// convention established by validating stub resolvers)
    pub const VALIDATION_REASON_QCLASS: u16 = 65280;

    /// Default TTL for Bad key entries, throttling re-validation of
    /// broken zones
    pub const DEFAULT_BAD_KEY_TTL_SECS: u64 = 60;

    /// NSEC3 hash algorithm number for SHA-1, the only one assigned
    pub const NSEC3_HASH_SHA1: u8 = 1;
}
