use tracing::trace;

use crate::dns::{RecordType, ResponseCode, SMessage, Section};

/// What shape a response takes, deciding which validator runs (RFC 4035
/// §5 tie-breaks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClassification {
    /// Answer contains the queried RRset (possibly via a CNAME/DNAME chain)
    Positive,
    /// ANY query with at least one answer
    Any,
    /// Answer ends in a CNAME the upstream left unresolved
    Cname,
    /// CNAME chain whose final target has no data of the queried type
    CnameNodata,
    /// CNAME chain whose final target does not exist
    CnameNameError,
    /// NOERROR with an empty answer
    Nodata,
    /// NXDOMAIN
    NameError,
    /// Delegation: NS in authority without SOA
    Referral,
    /// Nothing we can make sense of
    Unknown,
}

/// Classify `response` relative to the question in `request`.
pub fn classify(request: &SMessage, response: &SMessage) -> ResponseClassification {
    use ResponseClassification::*;

    let Some(question) = &request.question else {
        return Unknown;
    };
    let rcode = response.rcode();
    if !matches!(rcode, ResponseCode::NoError | ResponseCode::NXDomain) {
        return Unknown;
    }

    let answers = response.sets(Section::Answer);
    if question.qtype == RecordType::ANY && !answers.is_empty() {
        return Any;
    }

    let mut qname = question.qname.clone();
    let mut had_cname = false;

    for set in answers {
        if set.rclass() != question.qclass {
            return Unknown;
        }
        match set.rtype() {
            RecordType::CNAME if *set.name() == qname => {
                if question.qtype == RecordType::CNAME {
                    return Positive;
                }
                let Some(record) = set.records().first() else {
                    return Unknown;
                };
                let Ok(target) = record.name_target() else {
                    return Unknown;
                };
                trace!(from = %qname, to = %target, "following CNAME in answer");
                qname = target;
                had_cname = true;
            }
            RecordType::DNAME if qname.is_strict_subdomain_of(set.name()) => {
                // The synthesized CNAME follows; nothing to do here
            }
            rtype if rtype == question.qtype && *set.name() == qname => {
                return Positive;
            }
            _ => {
                trace!(name = %set.name(), rtype = %set.rtype(), "answer rrset fits no classification");
                return Unknown;
            }
        }
    }

    if had_cname {
        return match rcode {
            ResponseCode::NXDomain => CnameNameError,
            _ if has_negative_authority(response) => CnameNodata,
            _ => Cname,
        };
    }

    match rcode {
        ResponseCode::NXDomain => NameError,
        _ => {
            let has_ns = !response.sets_of_type(Section::Authority, RecordType::NS).is_empty();
            let has_soa = !response.sets_of_type(Section::Authority, RecordType::SOA).is_empty();
            if has_ns && !has_soa {
                Referral
            } else {
                Nodata
            }
        }
    }
}

fn has_negative_authority(response: &SMessage) -> bool {
    !response.sets_of_type(Section::Authority, RecordType::SOA).is_empty()
        || !response.sets_of_type(Section::Authority, RecordType::NSEC).is_empty()
        || !response.sets_of_type(Section::Authority, RecordType::NSEC3).is_empty()
}
