use super::enums::{RecordClass, RecordType};
use super::name::Name;
use super::record::{Record, RrsigData};
use crate::dnssec::SecurityStatus;

/// An RRset carrying its covering RRSIGs and a security status — the unit
/// everything in the validator operates on.
#[derive(Debug, Clone, PartialEq)]
pub struct SRRset {
    name: Name,
    rtype: RecordType,
    rclass: RecordClass,
    ttl: u32,
    records: Vec<Record>,
    sigs: Vec<Record>,
    pub security: SecurityStatus,
}

impl SRRset {
    pub fn new(name: Name, rtype: RecordType, rclass: RecordClass, ttl: u32) -> Self {
        SRRset {
            name,
            rtype,
            rclass,
            ttl,
            records: Vec::new(),
            sigs: Vec::new(),
            security: SecurityStatus::Unchecked,
        }
    }

    pub fn from_record(record: Record) -> Self {
        let mut set = SRRset::new(record.owner.clone(), record.rtype, record.rclass, record.ttl);
        set.records.push(record);
        set
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        let mut iter = records.into_iter();
        let first = iter.next().expect("rrset needs at least one record");
        let mut set = SRRset::from_record(first);
        for record in iter {
            set.add_record(record);
        }
        set
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn rtype(&self) -> RecordType {
        self.rtype
    }

    pub fn rclass(&self) -> RecordClass {
        self.rclass
    }

    /// Minimum TTL across data records.
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn sigs(&self) -> &[Record] {
        &self.sigs
    }

    pub fn is_signed(&self) -> bool {
        !self.sigs.is_empty()
    }

    /// True if this set holds records of `rtype` at `name` in `rclass`.
    pub fn matches(&self, name: &Name, rtype: RecordType, rclass: RecordClass) -> bool {
        self.rtype == rtype && self.rclass == rclass && self.name == *name
    }

    pub fn add_record(&mut self, record: Record) {
        debug_assert!(record.rtype == self.rtype && record.owner == self.name);
        self.ttl = self.ttl.min(record.ttl);
        if !self.records.contains(&record) {
            self.records.push(record);
        }
    }

    pub fn add_sig(&mut self, sig: Record) {
        debug_assert!(sig.rtype == RecordType::RRSIG);
        if !self.sigs.contains(&sig) {
            self.sigs.push(sig);
        }
    }

    /// Decoded RRSIGs, skipping any that fail to parse (those surface as
    /// BOGUS later when the verifier finds nothing usable).
    pub fn rrsig_data(&self) -> Vec<RrsigData> {
        self.sigs.iter().filter_map(|s| s.as_rrsig().ok()).collect()
    }

    /// The signer name shared by all RRSIGs; `None` for unsigned sets or
    /// when the RRSIGs disagree.
    pub fn signer_name(&self) -> Option<Name> {
        let mut signer: Option<Name> = None;
        for sig in self.rrsig_data() {
            match &signer {
                None => signer = Some(sig.signer),
                Some(existing) if *existing == sig.signer => {}
                Some(_) => return None,
            }
        }
        signer
    }
}
