use super::enums::{RecordClass, RecordType, ResponseCode};
use super::name::Name;
use super::record::Record;
use super::rrset::SRRset;
use crate::dnssec::constants::VALIDATION_REASON_QCLASS;
use crate::dnssec::SecurityStatus;

/// Header flags the validator reads or rewrites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub qr: bool,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub ad: bool,
    pub cd: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub opcode: u8,
    pub rcode: ResponseCode,
    pub flags: Flags,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            id: 0,
            opcode: 0,
            rcode: ResponseCode::NoError,
            flags: Flags::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub qname: Name,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Answer,
    Authority,
    Additional,
}

impl Section {
    fn index(self) -> usize {
        match self {
            Section::Answer => 0,
            Section::Authority => 1,
            Section::Additional => 2,
        }
    }
}

/// A DNS message as ordered sections of signed RRsets, plus the security
/// verdict the validator attaches. Wire parsing lives with the upstream
/// resolver; this is the in-memory form everything here operates on.
#[derive(Debug, Clone)]
pub struct SMessage {
    pub header: Header,
    pub question: Option<Question>,
    sections: [Vec<SRRset>; 3],
    pub security: SecurityStatus,
    pub bogus_reason: Option<String>,
}

impl SMessage {
    pub fn new(header: Header, question: Option<Question>) -> Self {
        SMessage {
            header,
            question,
            sections: [Vec::new(), Vec::new(), Vec::new()],
            security: SecurityStatus::Unchecked,
            bogus_reason: None,
        }
    }

    /// A fresh recursion-desired query. The validator sets CD itself on
    /// everything it sends upstream.
    pub fn query(qname: Name, qtype: RecordType, qclass: RecordClass) -> Self {
        let header = Header {
            id: rand::random::<u16>(),
            opcode: 0,
            rcode: ResponseCode::NoError,
            flags: Flags {
                rd: true,
                ..Flags::default()
            },
        };
        SMessage::new(header, Some(Question { qname, qtype, qclass }))
    }

    /// A minimal SERVFAIL response to `query`, used when the upstream
    /// fails or a response validates as bogus.
    pub fn servfail(query: &SMessage) -> Self {
        let mut msg = SMessage::new(
            Header {
                id: query.header.id,
                opcode: query.header.opcode,
                rcode: ResponseCode::ServFail,
                flags: Flags {
                    qr: true,
                    rd: query.header.flags.rd,
                    ra: true,
                    ..Flags::default()
                },
            },
            query.question.clone(),
        );
        msg.security = SecurityStatus::Bogus;
        msg
    }

    pub fn rcode(&self) -> ResponseCode {
        self.header.rcode
    }

    pub fn sets(&self, section: Section) -> &[SRRset] {
        &self.sections[section.index()]
    }

    pub fn sets_mut(&mut self, section: Section) -> &mut Vec<SRRset> {
        &mut self.sections[section.index()]
    }

    /// Insert a record, grouping it into the RRset it belongs to. RRSIGs
    /// attach to the set covering their type; a lone RRSIG opens a set so
    /// later data records still join their signatures.
    pub fn add_record(&mut self, section: Section, record: Record) {
        let sets = &mut self.sections[section.index()];
        if record.rtype == RecordType::RRSIG {
            let covered = match record.as_rrsig() {
                Ok(data) => data.type_covered,
                // Keep the unparseable RRSIG as opaque data so the verifier
                // sees the set as signed-but-unusable
                Err(_) => RecordType::RRSIG,
            };
            if let Some(set) = sets
                .iter_mut()
                .find(|s| s.matches(&record.owner, covered, record.rclass))
            {
                set.add_sig(record);
                return;
            }
            let mut set = SRRset::new(record.owner.clone(), covered, record.rclass, record.ttl);
            set.add_sig(record);
            sets.push(set);
            return;
        }

        if let Some(set) = sets
            .iter_mut()
            .find(|s| s.matches(&record.owner, record.rtype, record.rclass))
        {
            set.add_record(record);
            return;
        }
        sets.push(SRRset::from_record(record));
    }

    pub fn add_rrset(&mut self, section: Section, set: SRRset) {
        self.sections[section.index()].push(set);
    }

    pub fn find_rrset(
        &self,
        section: Section,
        name: &Name,
        rtype: RecordType,
        rclass: RecordClass,
    ) -> Option<&SRRset> {
        self.sections[section.index()]
            .iter()
            .find(|s| s.matches(name, rtype, rclass))
    }

    /// All sets of a given type in a section, preserving order.
    pub fn sets_of_type(&self, section: Section, rtype: RecordType) -> Vec<&SRRset> {
        self.sections[section.index()]
            .iter()
            .filter(|s| s.rtype() == rtype)
            .collect()
    }

    pub fn answer_is_empty(&self) -> bool {
        self.sections[Section::Answer.index()].is_empty()
    }

    /// Record a bogus verdict with its human-readable reason. The first
    /// reason wins; bogus is sticky within one validation.
    pub fn set_bogus(&mut self, reason: impl Into<String>) {
        self.security = SecurityStatus::Bogus;
        if self.bogus_reason.is_none() {
            self.bogus_reason = Some(reason.into());
        }
    }

    /// Attach the bogus reason as TXT at the root under the reserved
    /// reason class so clients can surface why a SERVFAIL happened.
    pub fn attach_reason(&mut self, reason: &str) {
        let record = Record::txt(
            Name::root(),
            RecordClass::Unknown(VALIDATION_REASON_QCLASS),
            0,
            reason,
        );
        self.add_record(Section::Additional, record);
    }
}
