//! NSEC denial-of-existence proofs (RFC 4035 §5.4).
//!
//! Each function inspects a single NSEC RRset that the caller has already
//! verified; orchestration across multiple NSECs lives in the validators.

use tracing::trace;

use crate::dns::{Name, NsecData, RecordType, SRRset};

/// A NODATA proof outcome. When the proof went through a wildcard-owner
/// NSEC, the wildcard is reported so the caller can check closest-encloser
/// consistency.
#[derive(Debug, Clone, Default)]
pub struct NodataProof {
    pub proven: bool,
    pub wildcard: Option<Name>,
}

impl NodataProof {
    fn no() -> Self {
        NodataProof::default()
    }

    fn yes() -> Self {
        NodataProof {
            proven: true,
            wildcard: None,
        }
    }
}

fn first_nsec(set: &SRRset) -> Option<(Name, NsecData)> {
    let record = set.records().first()?;
    let data = record.as_nsec().ok()?;
    Some((record.owner.clone(), data))
}

/// Canonical-order coverage: `owner < name < next`, wrapping at the zone
/// apex where the last NSEC points back to the first name.
pub fn covers(owner: &Name, next: &Name, name: &Name) -> bool {
    use std::cmp::Ordering::Less;
    if owner.canonical_cmp(next) == Less {
        owner.canonical_cmp(name) == Less && name.canonical_cmp(next) == Less
    } else {
        // Wrap-around span (or a single-name zone where owner == next)
        owner.canonical_cmp(name) == Less || name.canonical_cmp(next) == Less
    }
}

/// True if this NSEC covers `name` (proves it does not exist).
pub fn covers_name(set: &SRRset, name: &Name) -> bool {
    let Some((owner, data)) = first_nsec(set) else {
        return false;
    };
    covers(&owner, &data.next, name)
}

/// Name-error proof: the NSEC covers `qname` and both lie inside the
/// signer's zone.
pub fn proves_name_error(set: &SRRset, qname: &Name, signer: &Name) -> bool {
    let Some((owner, data)) = first_nsec(set) else {
        return false;
    };
    if !qname.is_subdomain_of(signer) || !owner.is_subdomain_of(signer) {
        return false;
    }
    covers(&owner, &data.next, qname)
}

/// NODATA proof at `qname` for `qtype`, including the wildcard-owner and
/// empty-non-terminal variants.
pub fn proves_nodata(set: &SRRset, qname: &Name, qtype: RecordType) -> NodataProof {
    let Some((owner, data)) = first_nsec(set) else {
        return NodataProof::no();
    };

    if owner != *qname {
        // A wildcard NSEC answers for every name below its base
        if owner.is_wildcard() {
            let base = owner.parent().unwrap_or_else(Name::root);
            if qname.is_strict_subdomain_of(&base)
                && !data.types.contains(RecordType::CNAME)
                && !data.types.contains(qtype)
            {
                return NodataProof {
                    proven: true,
                    wildcard: Some(owner),
                };
            }
            return NodataProof::no();
        }

        // Empty non-terminal: qname sits in the covered span and the next
        // name hangs below it, so qname exists but holds no records
        if covers(&owner, &data.next, qname) && data.next.is_strict_subdomain_of(qname) {
            trace!(%qname, "NODATA proven via empty non-terminal");
            return NodataProof::yes();
        }
        return NodataProof::no();
    }

    if data.types.contains(qtype) {
        return NodataProof::no();
    }
    // A CNAME here means the caller should have chased it instead
    if data.types.contains(RecordType::CNAME) {
        return NodataProof::no();
    }
    // Parent-side NSEC at a delegation proves nothing for the child,
    // except for the DS that lives with the parent
    if qtype != RecordType::DS
        && data.types.contains(RecordType::NS)
        && !data.types.contains(RecordType::SOA)
    {
        return NodataProof::no();
    }
    // The apex NSEC cannot prove DS absence; that proof belongs upstairs
    if qtype == RecordType::DS && data.types.contains(RecordType::SOA) {
        return NodataProof::no();
    }

    NodataProof::yes()
}

/// Proof that a delegation at `qname` has no DS: an exact-match NSEC on
/// the parent side with NS set and neither DS nor SOA.
pub fn proves_no_ds(set: &SRRset, qname: &Name) -> bool {
    let Some((owner, data)) = first_nsec(set) else {
        return false;
    };
    owner == *qname
        && data.types.contains(RecordType::NS)
        && !data.types.contains(RecordType::DS)
        && !data.types.contains(RecordType::SOA)
}

/// The closest encloser of `qname` this NSEC demonstrates: the longer of
/// the common ancestors with the owner and the next name.
pub fn closest_encloser(set: &SRRset, qname: &Name) -> Option<Name> {
    let (owner, data) = first_nsec(set)?;
    let from_owner = qname.common_ancestor(&owner);
    let from_next = qname.common_ancestor(&data.next);
    if from_owner.label_count() >= from_next.label_count() {
        Some(from_owner)
    } else {
        Some(from_next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{Record, TypeBitmap};

    fn n(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    fn nsec(owner: &str, next: &str, types: &[RecordType]) -> SRRset {
        SRRset::from_record(Record::nsec(
            n(owner),
            300,
            &n(next),
            &TypeBitmap::from_types(types),
        ))
    }

    #[test]
    fn test_covers_ordering() {
        assert!(covers(&n("a.example"), &n("c.example"), &n("b.example")));
        assert!(!covers(&n("a.example"), &n("c.example"), &n("d.example")));
        assert!(!covers(&n("a.example"), &n("c.example"), &n("a.example")));
        // Wrap at the apex: last NSEC points back to the zone name
        assert!(covers(&n("z.example"), &n("example"), &n("zz.example")));
        assert!(!covers(&n("z.example"), &n("example"), &n("m.example")));
    }

    #[test]
    fn test_name_error_proof() {
        let set = nsec("alpha.example.com", "delta.example.com", &[RecordType::A]);
        assert!(proves_name_error(&set, &n("bravo.example.com"), &n("example.com")));
        // Outside the signer zone
        assert!(!proves_name_error(&set, &n("bravo.example.org"), &n("example.com")));
        // Exists as the owner itself
        assert!(!proves_name_error(&set, &n("alpha.example.com"), &n("example.com")));
    }

    #[test]
    fn test_nodata_exact_match() {
        let set = nsec(
            "example.com",
            "a.example.com",
            &[RecordType::A, RecordType::SOA, RecordType::NS],
        );
        assert!(proves_nodata(&set, &n("example.com"), RecordType::MX).proven);
        assert!(!proves_nodata(&set, &n("example.com"), RecordType::A).proven);
    }

    #[test]
    fn test_nodata_cname_bit_defeats_proof() {
        let set = nsec("www.example.com", "zz.example.com", &[RecordType::CNAME]);
        assert!(!proves_nodata(&set, &n("www.example.com"), RecordType::MX).proven);
    }

    #[test]
    fn test_nodata_parent_side_delegation() {
        // Delegation NSEC: NS without SOA proves only DS absence
        let set = nsec("child.example.com", "next.example.com", &[RecordType::NS]);
        assert!(!proves_nodata(&set, &n("child.example.com"), RecordType::A).proven);
        assert!(proves_nodata(&set, &n("child.example.com"), RecordType::DS).proven);
        assert!(proves_no_ds(&set, &n("child.example.com")));
    }

    #[test]
    fn test_nodata_apex_cannot_prove_ds() {
        let set = nsec(
            "example.com",
            "a.example.com",
            &[RecordType::NS, RecordType::SOA],
        );
        assert!(!proves_nodata(&set, &n("example.com"), RecordType::DS).proven);
    }

    #[test]
    fn test_nodata_empty_non_terminal() {
        // next name below qname: ent.example.com exists only as a path
        let set = nsec("a.example.com", "leaf.ent.example.com", &[RecordType::A]);
        assert!(proves_nodata(&set, &n("ent.example.com"), RecordType::A).proven);
    }

    #[test]
    fn test_nodata_wildcard_owner() {
        let set = nsec("*.example.com", "zz.example.com", &[RecordType::TXT]);
        let proof = proves_nodata(&set, &n("x.example.com"), RecordType::MX);
        assert!(proof.proven);
        assert_eq!(proof.wildcard, Some(n("*.example.com")));
        assert!(!proves_nodata(&set, &n("x.example.com"), RecordType::TXT).proven);
    }

    #[test]
    fn test_closest_encloser() {
        let set = nsec("alpha.example.com", "delta.example.com", &[RecordType::A]);
        assert_eq!(
            closest_encloser(&set, &n("bravo.example.com")),
            Some(n("example.com"))
        );
        assert_eq!(
            closest_encloser(&set, &n("x.alpha.example.com")),
            Some(n("alpha.example.com"))
        );
    }
}
