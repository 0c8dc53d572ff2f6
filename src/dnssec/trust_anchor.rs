use std::collections::HashMap;
use std::path::Path;

use base64::Engine;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::SecurityStatus;
use crate::dns::{Name, Record, RecordClass, RecordType, SRRset};
use crate::error::{Result, VordrError};

/// Store of trust anchors, indexed by apex name and class. An anchor is a
/// DS or DNSKEY RRset the validator trusts a priori; lookups return the
/// closest enclosing anchor for a name.
pub struct TrustAnchorStore {
    anchors: RwLock<HashMap<(Name, u16), Vec<SRRset>>>,
}

impl TrustAnchorStore {
    pub fn new() -> Self {
        TrustAnchorStore {
            anchors: RwLock::new(HashMap::new()),
        }
    }

    /// Store an anchor RRset. Anything that is not DS or DNSKEY is
    /// silently dropped.
    pub fn store(&self, mut rrset: SRRset) {
        if rrset.rtype() != RecordType::DS && rrset.rtype() != RecordType::DNSKEY {
            return;
        }
        rrset.security = SecurityStatus::Secure;
        let key = (rrset.name().clone(), rrset.rclass().to_u16());
        let mut anchors = self.anchors.write();
        let slot = anchors.entry(key).or_default();
        slot.retain(|existing| existing.rtype() != rrset.rtype());
        slot.push(rrset);
    }

    /// The closest enclosing anchor for `name`: the stored anchor with the
    /// longest apex equal to or above `name`. DS anchors win over DNSKEY
    /// anchors at the same apex, since the DS form is what a secure
    /// delegation hands us.
    pub fn find(&self, name: &Name, rclass: RecordClass) -> Option<SRRset> {
        let anchors = self.anchors.read();
        let mut candidate = Some(name.clone());
        while let Some(apex) = candidate {
            if let Some(sets) = anchors.get(&(apex.clone(), rclass.to_u16())) {
                let picked = sets
                    .iter()
                    .find(|s| s.rtype() == RecordType::DS)
                    .or_else(|| sets.first());
                if let Some(set) = picked {
                    return Some(set.clone());
                }
            }
            candidate = apex.parent();
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.anchors.read().len()
    }

    /// Clear all anchors (useful for testing)
    pub fn clear(&self) {
        self.anchors.write().clear();
    }

    /// Load anchors from a zone-file-style stream of DS and DNSKEY
    /// records. Returns the number of anchor RRsets stored.
    pub fn load(&self, input: &str) -> Result<usize> {
        let mut grouped: HashMap<(Name, RecordType, RecordClass), Vec<Record>> = HashMap::new();

        for line in input.lines() {
            let line = line.split(';').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            match parse_anchor_line(line) {
                Ok(Some(record)) => {
                    grouped
                        .entry((record.owner.clone(), record.rtype, record.rclass))
                        .or_default()
                        .push(record);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, line, "skipping unparseable trust anchor line");
                }
            }
        }

        let mut stored = 0usize;
        for ((owner, rtype, _), mut records) in grouped {
            // Canonical sort makes the anchor set independent of file order
            records.sort_by(|a, b| a.rdata.cmp(&b.rdata));
            let set = SRRset::from_records(records);
            debug!(name = %owner, rtype = %rtype, "loaded trust anchor");
            self.store(set);
            stored += 1;
        }
        Ok(stored)
    }

    pub fn load_from_file(&self, path: &Path) -> Result<usize> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| VordrError::TrustAnchorFile(format!("{}: {}", path.display(), e)))?;
        self.load(&contents)
    }
}

impl Default for TrustAnchorStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one `name [ttl] [class] type rdata` line. Non-DS/DNSKEY records
/// parse to `None` and are dropped per the input contract.
fn parse_anchor_line(line: &str) -> Result<Option<Record>> {
    let mut tokens = line.split_whitespace().peekable();
    let owner = Name::parse(
        tokens
            .next()
            .ok_or_else(|| VordrError::TrustAnchorFile("empty record".into()))?,
    )?;

    let mut ttl = 0u32;
    if let Some(token) = tokens.peek() {
        if let Ok(parsed) = token.parse::<u32>() {
            ttl = parsed;
            tokens.next();
        }
    }
    if tokens.peek().is_some_and(|t| t.eq_ignore_ascii_case("IN")) {
        tokens.next();
    }

    let rtype_token = tokens
        .next()
        .ok_or_else(|| VordrError::TrustAnchorFile("missing record type".into()))?;
    let Some(rtype) = RecordType::from_mnemonic(rtype_token) else {
        return Err(VordrError::TrustAnchorFile(format!(
            "unknown record type {}",
            rtype_token
        )));
    };

    let fields: Vec<&str> = tokens.collect();
    match rtype {
        RecordType::DS => {
            if fields.len() < 4 {
                return Err(VordrError::TrustAnchorFile("short DS record".into()));
            }
            let key_tag = fields[0]
                .parse::<u16>()
                .map_err(|e| VordrError::TrustAnchorFile(e.to_string()))?;
            let algorithm = fields[1]
                .parse::<u8>()
                .map_err(|e| VordrError::TrustAnchorFile(e.to_string()))?;
            let digest_type = fields[2]
                .parse::<u8>()
                .map_err(|e| VordrError::TrustAnchorFile(e.to_string()))?;
            let digest = hex::decode(fields[3..].concat())
                .map_err(|e| VordrError::TrustAnchorFile(e.to_string()))?;
            Ok(Some(Record::ds(owner, ttl, key_tag, algorithm, digest_type, digest)))
        }
        RecordType::DNSKEY => {
            if fields.len() < 4 {
                return Err(VordrError::TrustAnchorFile("short DNSKEY record".into()));
            }
            let flags = fields[0]
                .parse::<u16>()
                .map_err(|e| VordrError::TrustAnchorFile(e.to_string()))?;
            let algorithm = fields[2]
                .parse::<u8>()
                .map_err(|e| VordrError::TrustAnchorFile(e.to_string()))?;
            let key = base64::engine::general_purpose::STANDARD
                .decode(fields[3..].concat())
                .map_err(|e| VordrError::TrustAnchorFile(e.to_string()))?;
            Ok(Some(Record::dnskey(owner, ttl, flags, algorithm, key)))
        }
        // The input contract drops everything else silently
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    const ANCHOR_FILE: &str = "\
; root key set, two DS records
. 3600 IN DS 20326 8 2 E06D44B80B8F1D39A95C0B0D7C65D08458E880409BBC683457104237C7F8EC8D
. 3600 IN DS 38696 8 2 683D2D0ACB8C9B712A1948B27F741219298D0A450D612C483AF444A4C0FB2B16
example.com 86400 IN DNSKEY 257 3 8 AwEAAagAIKlVZrpC6Ia7gEza
example.com 86400 IN A 192.0.2.1
junk line that does not parse
";

    #[test]
    fn test_load_groups_and_drops() {
        let store = TrustAnchorStore::new();
        let count = store.load(ANCHOR_FILE).unwrap();
        // root DS set + example.com DNSKEY set; the A record is dropped
        assert_eq!(count, 2);

        let root = store.find(&Name::root(), RecordClass::IN).unwrap();
        assert_eq!(root.rtype(), RecordType::DS);
        assert_eq!(root.records().len(), 2);
        assert_eq!(root.security, SecurityStatus::Secure);
    }

    #[test]
    fn test_load_is_order_insensitive() {
        let store_a = TrustAnchorStore::new();
        store_a.load(ANCHOR_FILE).unwrap();

        let reversed: String = ANCHOR_FILE.lines().rev().collect::<Vec<_>>().join("\n");
        let store_b = TrustAnchorStore::new();
        store_b.load(&reversed).unwrap();

        let a = store_a.find(&Name::root(), RecordClass::IN).unwrap();
        let b = store_b.find(&Name::root(), RecordClass::IN).unwrap();
        assert_eq!(a.records(), b.records());
    }

    #[test]
    fn test_find_closest_enclosing_anchor() {
        let store = TrustAnchorStore::new();
        store.load(ANCHOR_FILE).unwrap();

        // Deep name under an anchored zone finds that zone, not the root
        let anchor = store.find(&n("www.example.com"), RecordClass::IN).unwrap();
        assert_eq!(anchor.name(), &n("example.com"));

        // Unrelated name falls back to the root anchor
        let anchor = store.find(&n("example.org"), RecordClass::IN).unwrap();
        assert_eq!(anchor.name(), &Name::root());
    }

    #[test]
    fn test_no_anchor_for_other_class(){
        let store = TrustAnchorStore::new();
        store.load(ANCHOR_FILE).unwrap();
        assert!(store.find(&n("example.com"), RecordClass::CH).is_none());
    }
}
