use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::trace;

use super::errors::ValidationReason;
use crate::dns::{Name, RecordClass, RecordType, SRRset};

/// The validator's cached assertion about a zone's keys.
///
/// A `Good` entry holds a cryptographically validated DNSKEY set. `Null`
/// marks the top of provably insecure space. `Bad` records a failed chain
/// so broken zones are not re-walked on every query.
#[derive(Debug, Clone)]
pub enum KeyEntry {
    Good {
        rrset: SRRset,
    },
    Null {
        name: Name,
        rclass: RecordClass,
        ttl: u32,
        reason: Option<ValidationReason>,
    },
    Bad {
        name: Name,
        rclass: RecordClass,
        ttl: u32,
        reason: ValidationReason,
    },
}

impl KeyEntry {
    pub fn good(rrset: SRRset) -> Self {
        debug_assert_eq!(rrset.rtype(), RecordType::DNSKEY);
        KeyEntry::Good { rrset }
    }

    pub fn null(name: Name, rclass: RecordClass, ttl: u32, reason: Option<ValidationReason>) -> Self {
        KeyEntry::Null {
            name,
            rclass,
            ttl,
            reason,
        }
    }

    pub fn bad(name: Name, rclass: RecordClass, ttl: u32, reason: ValidationReason) -> Self {
        KeyEntry::Bad {
            name,
            rclass,
            ttl,
            reason,
        }
    }

    pub fn name(&self) -> &Name {
        match self {
            KeyEntry::Good { rrset } => rrset.name(),
            KeyEntry::Null { name, .. } | KeyEntry::Bad { name, .. } => name,
        }
    }

    pub fn rclass(&self) -> RecordClass {
        match self {
            KeyEntry::Good { rrset } => rrset.rclass(),
            KeyEntry::Null { rclass, .. } | KeyEntry::Bad { rclass, .. } => *rclass,
        }
    }

    pub fn ttl(&self) -> u32 {
        match self {
            KeyEntry::Good { rrset } => rrset.ttl(),
            KeyEntry::Null { ttl, .. } | KeyEntry::Bad { ttl, .. } => *ttl,
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self, KeyEntry::Good { .. })
    }

    pub fn is_bad(&self) -> bool {
        matches!(self, KeyEntry::Bad { .. })
    }

    pub fn key_rrset(&self) -> Option<&SRRset> {
        match self {
            KeyEntry::Good { rrset } => Some(rrset),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&ValidationReason> {
        match self {
            KeyEntry::Good { .. } => None,
            KeyEntry::Null { reason, .. } => reason.as_ref(),
            KeyEntry::Bad { reason, .. } => Some(reason),
        }
    }
}

struct CachedEntry {
    entry: KeyEntry,
    expires: Instant,
}

/// TTL-aware cache of KeyEntries, shared across concurrent validations.
/// Lookup walks from the name towards the root and returns the deepest
/// live entry; last writer wins on races, which is fine because every
/// stored entry was independently validated.
pub struct KeyCache {
    entries: DashMap<(Name, u16), CachedEntry>,
    max_ttl: Duration,
    bad_ttl: Duration,
    max_entries: Option<usize>,
}

impl KeyCache {
    pub fn new(max_ttl: Duration, bad_ttl: Duration, max_entries: Option<usize>) -> Self {
        KeyCache {
            entries: DashMap::new(),
            max_ttl,
            bad_ttl,
            max_entries,
        }
    }

    pub fn store(&self, entry: &KeyEntry) {
        let ttl = if entry.is_bad() {
            self.bad_ttl
        } else {
            Duration::from_secs(u64::from(entry.ttl())).min(self.max_ttl)
        };
        trace!(name = %entry.name(), ?ttl, "caching key entry");
        self.entries.insert(
            (entry.name().clone(), entry.rclass().to_u16()),
            CachedEntry {
                entry: entry.clone(),
                expires: Instant::now() + ttl,
            },
        );
        if let Some(cap) = self.max_entries {
            if self.entries.len() > cap {
                self.evict(cap);
            }
        }
    }

    /// The live entry with the longest name equal to or above `name`.
    pub fn find(&self, name: &Name, rclass: RecordClass) -> Option<KeyEntry> {
        let now = Instant::now();
        let mut candidate = Some(name.clone());
        while let Some(apex) = candidate {
            if let Some(cached) = self.entries.get(&(apex.clone(), rclass.to_u16())) {
                if cached.expires > now {
                    return Some(cached.entry.clone());
                }
            }
            candidate = apex.parent();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries, then soonest-to-expire ones until under cap.
    fn evict(&self, cap: usize) {
        let now = Instant::now();
        self.entries.retain(|_, cached| cached.expires > now);
        while self.entries.len() > cap {
            let victim = self
                .entries
                .iter()
                .min_by_key(|item| item.value().expires)
                .map(|item| item.key().clone());
            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::Record;

    fn n(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    fn cache() -> KeyCache {
        KeyCache::new(Duration::from_secs(3600), Duration::from_secs(60), None)
    }

    fn good_entry(zone: &str, ttl: u32) -> KeyEntry {
        KeyEntry::good(SRRset::from_record(Record::dnskey(
            n(zone),
            ttl,
            256,
            15,
            vec![0u8; 32],
        )))
    }

    #[test]
    fn test_find_walks_to_ancestor() {
        let cache = cache();
        cache.store(&good_entry("example.com", 300));

        let hit = cache.find(&n("deep.www.example.com"), RecordClass::IN).unwrap();
        assert_eq!(hit.name(), &n("example.com"));
        assert!(cache.find(&n("example.org"), RecordClass::IN).is_none());
    }

    #[test]
    fn test_deepest_entry_wins() {
        let cache = cache();
        cache.store(&good_entry("com", 300));
        cache.store(&good_entry("example.com", 300));

        let hit = cache.find(&n("www.example.com"), RecordClass::IN).unwrap();
        assert_eq!(hit.name(), &n("example.com"));
    }

    #[test]
    fn test_zero_ttl_entry_is_expired() {
        let cache = cache();
        cache.store(&good_entry("example.com", 0));
        assert!(cache.find(&n("example.com"), RecordClass::IN).is_none());
    }

    #[test]
    fn test_null_and_bad_entries() {
        let cache = cache();
        let null = KeyEntry::null(n("example.org"), RecordClass::IN, 300, None);
        cache.store(&null);
        let bad = KeyEntry::bad(
            n("broken.test"),
            RecordClass::IN,
            300,
            ValidationReason::MissingDnskey { zone: n("broken.test") },
        );
        cache.store(&bad);

        assert!(!cache.find(&n("www.example.org"), RecordClass::IN).unwrap().is_good());
        let bad_hit = cache.find(&n("broken.test"), RecordClass::IN).unwrap();
        assert!(bad_hit.is_bad());
        assert_eq!(bad_hit.reason().unwrap().key(), "failed.dnskey.missing");
    }

    #[test]
    fn test_size_cap_evicts() {
        let cache = KeyCache::new(Duration::from_secs(3600), Duration::from_secs(60), Some(2));
        cache.store(&good_entry("a.test", 300));
        cache.store(&good_entry("b.test", 300));
        cache.store(&good_entry("c.test", 300));
        assert!(cache.len() <= 2);
    }
}
