use thiserror::Error;

use crate::dns::{Name, RecordType};

/// Catalog of reasons a validation can end bogus or insecure. Each variant
/// has a stable key for tests and telemetry; the Display form is what ends
/// up in the reason TXT record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationReason {
    #[error("signature verification failed for {name}/{rtype}")]
    BadSignature { name: Name, rtype: RecordType },

    #[error("no DNSKEY RRset at {zone}")]
    MissingDnskey { zone: Name },

    #[error("no DS matched a DNSKEY that signs the {zone} key set")]
    DnskeyNotSignedByDs { zone: Name },

    #[error("unexpected response to DS query for {zone}: {detail}")]
    UnexpectedDsResponse { zone: Name, detail: String },

    #[error("negative DS response for {zone} carries no usable denial proof")]
    MissingDsDenial { zone: Name },

    #[error("DS RRset for {zone} lists no supported algorithm")]
    UnsupportedDsAlgorithms { zone: Name },

    #[error("opt-out NSEC3 span covers the delegation {zone}")]
    OptOutDelegation { zone: Name },

    #[error("DS proven absent at {zone}")]
    DsAbsent { zone: Name },

    #[error("all NSEC3 records for {zone} use an unknown hash algorithm")]
    UnknownNsec3Algorithms { zone: Name },

    #[error("NSEC3 records ignored for {qname}: unknown algorithm or excessive iterations")]
    Nsec3Ignored { qname: Name },

    #[error("no NSEC covers the non-existent name {qname}")]
    NameErrorNoCoveringNsec { qname: Name },

    #[error("no proof that no wildcard matches {qname}")]
    NameErrorNoWildcardProof { qname: Name },

    #[error("no proof of non-existence for {qname}/{qtype}")]
    NodataNoProof { qname: Name, qtype: RecordType },

    #[error("wildcard expansion for {qname} lacks a proof that the exact name does not exist")]
    WildcardNoProof { qname: Name },

    #[error("no NSEC3 closest encloser found for {qname}")]
    Nsec3NoClosestEncloser { qname: Name },

    #[error("no NSEC3 covers the next closer name of {qname}")]
    Nsec3NoNextCloserCover { qname: Name },

    #[error("no NSEC3 covers the wildcard of the closest encloser of {qname}")]
    Nsec3NoWildcardCover { qname: Name },

    #[error("CNAME at {name} is not a valid DNAME synthesis")]
    BadDnameSynthesis { name: Name },

    #[error("response classification not handled: {detail}")]
    UnhandledClassification { detail: String },

    #[error("trust chain for {zone} ended bad: {detail}")]
    BadChain { zone: Name, detail: String },
}

impl ValidationReason {
    /// Stable key for this reason, independent of the formatted text.
    pub fn key(&self) -> &'static str {
        match self {
            Self::BadSignature { .. } => "failed.rrset.sig",
            Self::MissingDnskey { .. } => "failed.dnskey.missing",
            Self::DnskeyNotSignedByDs { .. } => "failed.dnskey.nods",
            Self::UnexpectedDsResponse { .. } => "failed.ds.unexpected",
            Self::MissingDsDenial { .. } => "failed.ds.nodenial",
            Self::UnsupportedDsAlgorithms { .. } => "insecure.ds.noalgorithms",
            Self::OptOutDelegation { .. } => "insecure.ds.optout",
            Self::DsAbsent { .. } => "insecure.ds.absent",
            Self::UnknownNsec3Algorithms { .. } => "insecure.nsec3.unknownalg",
            Self::Nsec3Ignored { .. } => "failed.nsec3.ignored",
            Self::NameErrorNoCoveringNsec { .. } => "failed.nxdomain.nocover",
            Self::NameErrorNoWildcardProof { .. } => "failed.nxdomain.nowildcard",
            Self::NodataNoProof { .. } => "failed.nodata.noproof",
            Self::WildcardNoProof { .. } => "failed.wildcard.noproof",
            Self::Nsec3NoClosestEncloser { .. } => "failed.nsec3.noce",
            Self::Nsec3NoNextCloserCover { .. } => "failed.nsec3.nocover",
            Self::Nsec3NoWildcardCover { .. } => "failed.nsec3.nowildcardcover",
            Self::BadDnameSynthesis { .. } => "failed.dname.synthesis",
            Self::UnhandledClassification { .. } => "failed.classification",
            Self::BadChain { .. } => "failed.chain",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_stable_and_formatted() {
        let reason = ValidationReason::NodataNoProof {
            qname: Name::parse("example.com").unwrap(),
            qtype: RecordType::MX,
        };
        assert_eq!(reason.key(), "failed.nodata.noproof");
        assert_eq!(
            reason.to_string(),
            "no proof of non-existence for example.com/MX"
        );
    }
}
