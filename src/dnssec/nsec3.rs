//! NSEC3 denial-of-existence proofs (RFC 5155).
//!
//! Owner names are hashed, so every proof starts by locating the closest
//! encloser and then reasons about the next-closer name and the wildcard
//! of the encloser. Records with unknown hash algorithms or excessive
//! iteration counts are filtered up front; what that filtering means for
//! the final verdict differs per call site and is decided by the callers.

use tracing::{debug, trace};

use super::constants::NSEC3_HASH_SHA1;
use super::errors::ValidationReason;
use super::{Proof, SecurityStatus};
use crate::dns::{Name, Nsec3Data, RecordType, SRRset};

/// Per-key-size caps on NSEC3 iteration counts. A zone using more
/// iterations than its weakest key allows is treated as unsigned space,
/// never as bogus.
#[derive(Debug, Clone)]
pub struct Nsec3IterationPolicy {
    /// (key bits, max iterations), ascending by key bits
    limits: Vec<(usize, u16)>,
}

impl Default for Nsec3IterationPolicy {
    fn default() -> Self {
        Nsec3IterationPolicy {
            limits: vec![(1024, 150), (2048, 500), (4096, 2500)],
        }
    }
}

impl Nsec3IterationPolicy {
    pub fn new(mut limits: Vec<(usize, u16)>) -> Self {
        limits.sort_unstable_by_key(|(bits, _)| *bits);
        Nsec3IterationPolicy { limits }
    }

    /// The iteration cap for a key of the given strength: the smallest
    /// bucket that fits the key.
    pub fn limit_for(&self, key_bits: usize) -> u16 {
        for (bits, cap) in &self.limits {
            if key_bits <= *bits {
                return *cap;
            }
        }
        self.limits.last().map(|(_, cap)| *cap).unwrap_or(0)
    }
}

/// One usable NSEC3 record with its decoded owner hash.
#[derive(Debug, Clone)]
pub struct Nsec3Entry {
    pub owner: Name,
    pub zone: Name,
    pub owner_hash: Vec<u8>,
    pub data: Nsec3Data,
}

/// Why a set of NSEC3 records cannot be used, when it cannot.
#[derive(Debug)]
pub enum Nsec3Usability {
    Usable(Vec<Nsec3Entry>),
    AllUnknownAlgorithm,
    AllOverIterationLimit,
}

#[derive(Debug, Clone, Default)]
pub struct Nsec3Engine {
    policy: Nsec3IterationPolicy,
}

impl Nsec3Engine {
    pub fn new(policy: Nsec3IterationPolicy) -> Self {
        Nsec3Engine { policy }
    }

    /// Decode NSEC3 sets into entries, dropping records with an unknown
    /// hash algorithm or an undecodable owner label.
    pub fn strip_unknown_algorithms(&self, sets: &[&SRRset]) -> Vec<Nsec3Entry> {
        let mut entries = Vec::new();
        for set in sets {
            for record in set.records() {
                let Ok(data) = record.as_nsec3() else {
                    continue;
                };
                if data.hash_algorithm != NSEC3_HASH_SHA1 {
                    trace!(owner = %record.owner, algorithm = data.hash_algorithm, "skipping NSEC3 with unknown hash algorithm");
                    continue;
                }
                let Some(owner_hash) = decode_hash_label(&record.owner) else {
                    continue;
                };
                let Some(zone) = record.owner.parent() else {
                    continue;
                };
                entries.push(Nsec3Entry {
                    owner: record.owner.clone(),
                    zone,
                    owner_hash,
                    data,
                });
            }
        }
        entries
    }

    /// Filter a set down to records the policy lets us trust, classifying
    /// total losses so callers can pick the right verdict.
    pub fn usable_entries(&self, sets: &[&SRRset], keys: &SRRset) -> Nsec3Usability {
        let entries = self.strip_unknown_algorithms(sets);
        if entries.is_empty() {
            return Nsec3Usability::AllUnknownAlgorithm;
        }
        let cap = self.policy.limit_for(weakest_key_bits(keys));
        let usable: Vec<Nsec3Entry> = entries
            .into_iter()
            .filter(|e| e.data.iterations <= cap)
            .collect();
        if usable.is_empty() {
            debug!(cap, "all NSEC3 records exceed the iteration cap");
            return Nsec3Usability::AllOverIterationLimit;
        }
        Nsec3Usability::Usable(usable)
    }

    /// True when no record in the set can contribute to a proof, either
    /// because of its hash algorithm or its iteration count.
    pub fn all_ignorable(&self, sets: &[&SRRset], keys: &SRRset) -> bool {
        !matches!(self.usable_entries(sets, keys), Nsec3Usability::Usable(_))
    }

    /// Find the closest encloser of `qname`: the longest ancestor whose
    /// hash appears as an NSEC3 owner.
    pub fn find_closest_encloser<'a>(
        &self,
        entries: &'a [Nsec3Entry],
        qname: &Name,
        signer: &Name,
    ) -> Option<(Name, &'a Nsec3Entry)> {
        let mut candidate = qname.clone();
        loop {
            if let Some(entry) = match_hash(entries, &candidate) {
                return Some((candidate, entry));
            }
            if candidate.label_count() <= signer.label_count() {
                return None;
            }
            candidate = candidate.parent()?;
        }
    }

    /// Name-error proof: closest encloser exists, the next-closer name is
    /// covered, and so is the wildcard of the encloser.
    pub fn prove_name_error(&self, entries: &[Nsec3Entry], qname: &Name, signer: &Name) -> Proof {
        let Some((ce, _)) = self.find_closest_encloser(entries, qname, signer) else {
            return Proof::bogus(ValidationReason::Nsec3NoClosestEncloser { qname: qname.clone() });
        };
        trace!(%qname, %ce, "NSEC3 closest encloser located");

        let next_closer = qname.trim_to(ce.label_count() + 1);
        let Some(cover) = find_coverer(entries, &next_closer) else {
            return Proof::bogus(ValidationReason::Nsec3NoNextCloserCover { qname: qname.clone() });
        };

        // The wildcard of the encloser must be proven absent too; a
        // matching NSEC3 there would mean the answer should have been a
        // wildcard expansion
        if find_coverer(entries, &ce.to_wildcard()).is_none() {
            return Proof::bogus(ValidationReason::Nsec3NoWildcardCover { qname: qname.clone() });
        }

        if cover.data.opt_out() {
            // The span may hide an unsigned delegation, so the name error
            // cannot be authenticated
            return Proof::insecure(ValidationReason::OptOutDelegation {
                zone: next_closer,
            });
        }
        Proof::secure()
    }

    /// NODATA proof for `qname`/`qtype`: a direct matching NSEC3 without
    /// the type, a wildcard match without it, or the opt-out DS variants.
    pub fn prove_nodata(
        &self,
        entries: &[Nsec3Entry],
        qname: &Name,
        qtype: RecordType,
        signer: &Name,
    ) -> Proof {
        let no_proof = || {
            Proof::bogus(ValidationReason::NodataNoProof {
                qname: qname.clone(),
                qtype,
            })
        };

        if let Some(entry) = match_hash(entries, qname) {
            if entry.data.types.contains(qtype) || entry.data.types.contains(RecordType::CNAME) {
                return no_proof();
            }
            if qtype == RecordType::DS {
                if entry.data.types.contains(RecordType::SOA) {
                    // Matched the child apex; the DS proof lives upstairs
                    return no_proof();
                }
                return Proof::secure();
            }
            if entry.data.types.contains(RecordType::NS)
                && !entry.data.types.contains(RecordType::SOA)
            {
                // Parent-side NSEC3 at a delegation
                return no_proof();
            }
            return Proof::secure();
        }

        let ce = self.find_closest_encloser(entries, qname, signer);
        let Some((ce, _)) = ce else {
            // An opt-out span can still prove a DS NODATA without a
            // closest encloser match
            if qtype == RecordType::DS {
                if let Some(cover) = find_coverer(entries, qname) {
                    if cover.data.opt_out() {
                        return Proof::insecure(ValidationReason::OptOutDelegation {
                            zone: qname.clone(),
                        });
                    }
                }
            }
            return no_proof();
        };

        let next_closer = qname.trim_to(ce.label_count() + 1);
        let cover = find_coverer(entries, &next_closer);

        if qtype == RecordType::DS {
            if let Some(cover) = cover {
                if cover.data.opt_out() {
                    return Proof::insecure(ValidationReason::OptOutDelegation { zone: next_closer });
                }
            }
        }

        // Wildcard NODATA: *.ce exists but lacks the type
        if let Some(wc) = match_hash(entries, &ce.to_wildcard()) {
            if !wc.data.types.contains(qtype)
                && !wc.data.types.contains(RecordType::CNAME)
                && cover.is_some()
            {
                return Proof::secure();
            }
        }

        no_proof()
    }

    /// Proof that a positive wildcard expansion was legitimate: the next
    /// closer name under `wildcard`'s base must be covered.
    pub fn prove_wildcard(
        &self,
        entries: &[Nsec3Entry],
        qname: &Name,
        wildcard: &Name,
    ) -> Proof {
        let Some(ce) = wildcard.parent() else {
            return Proof::bogus(ValidationReason::WildcardNoProof { qname: qname.clone() });
        };
        if !qname.is_strict_subdomain_of(&ce) {
            return Proof::bogus(ValidationReason::WildcardNoProof { qname: qname.clone() });
        }
        let next_closer = qname.trim_to(ce.label_count() + 1);
        if find_coverer(entries, &next_closer).is_some() {
            Proof::secure()
        } else {
            Proof::bogus(ValidationReason::Nsec3NoNextCloserCover { qname: qname.clone() })
        }
    }

    /// Proof that no DS exists at `qname` (RFC 5155 §8.9). Secure means
    /// the absence is proven; opt-out spans downgrade to insecure.
    pub fn prove_no_ds(&self, entries: &[Nsec3Entry], qname: &Name, signer: &Name) -> Proof {
        if let Some(entry) = match_hash(entries, qname) {
            if entry.data.types.contains(RecordType::DS)
                || entry.data.types.contains(RecordType::SOA)
            {
                return Proof::bogus(ValidationReason::MissingDsDenial { zone: qname.clone() });
            }
            return Proof::secure();
        }

        let Some((ce, _)) = self.find_closest_encloser(entries, qname, signer) else {
            return Proof::bogus(ValidationReason::Nsec3NoClosestEncloser { qname: qname.clone() });
        };
        let next_closer = qname.trim_to(ce.label_count() + 1);
        match find_coverer(entries, &next_closer) {
            Some(cover) if cover.data.opt_out() => {
                Proof::insecure(ValidationReason::OptOutDelegation { zone: qname.clone() })
            }
            _ => Proof::bogus(ValidationReason::MissingDsDenial { zone: qname.clone() }),
        }
    }
}

/// NSEC3 hash of a name: iterated SHA-1 over the wire-format name and the
/// salt (RFC 5155 §5).
pub fn hash_name(name: &Name, salt: &[u8], iterations: u16) -> Vec<u8> {
    use ring::digest;

    let mut input = name.to_wire();
    input.extend_from_slice(salt);
    let mut hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &input)
        .as_ref()
        .to_vec();
    for _ in 0..iterations {
        let mut next = hash;
        next.extend_from_slice(salt);
        hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &next)
            .as_ref()
            .to_vec();
    }
    hash
}

/// The base32hex owner label for a hash, as it appears in a zone.
pub fn hash_to_label(hash: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648Hex { padding: false }, hash).to_lowercase()
}

fn decode_hash_label(owner: &Name) -> Option<Vec<u8>> {
    let label = owner.to_string();
    let first = label.split('.').next()?;
    base32::decode(
        base32::Alphabet::Rfc4648Hex { padding: false },
        &first.to_ascii_uppercase(),
    )
}

fn weakest_key_bits(keys: &SRRset) -> usize {
    keys.records()
        .iter()
        .filter_map(|r| r.as_dnskey().ok())
        .map(|k| k.key_bits())
        .min()
        .unwrap_or(0)
}

fn match_hash<'a>(entries: &'a [Nsec3Entry], name: &Name) -> Option<&'a Nsec3Entry> {
    entries.iter().find(|e| {
        name.is_subdomain_of(&e.zone)
            && e.owner_hash == hash_name(name, &e.data.salt, e.data.iterations)
    })
}

fn find_coverer<'a>(entries: &'a [Nsec3Entry], name: &Name) -> Option<&'a Nsec3Entry> {
    entries.iter().find(|e| {
        if !name.is_subdomain_of(&e.zone) {
            return false;
        }
        let hash = hash_name(name, &e.data.salt, e.data.iterations);
        hash_covered(&e.owner_hash, &e.data.next_hashed, &hash)
    })
}

fn hash_covered(owner: &[u8], next: &[u8], hash: &[u8]) -> bool {
    if owner < next {
        owner < hash && hash < next
    } else {
        // Wrap-around span; owner == next means a single-record chain
        owner < hash || hash < next
    }
}
