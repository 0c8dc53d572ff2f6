use tracing::{debug, trace};

use super::algorithm::DnsSecAlgorithm;
use super::classify::{classify, ResponseClassification};
use super::digest::DigestType;
use super::errors::ValidationReason;
use super::key_cache::KeyEntry;
use super::key_tag::calculate_key_tag;
use super::nsec;
use super::nsec3::{Nsec3Engine, Nsec3Usability};
use super::verify::RrsetVerifier;
use super::SecurityStatus;
use crate::dns::{Name, RecordClass, RecordType, SMessage, SRRset, Section};

/// What the walk wants next. The driver issues the subquery and feeds the
/// response back; every transition below is pure.
#[derive(Debug, Clone)]
pub enum KeyFindAction {
    QueryDs(Name),
    QueryDnskey(Name),
    Done(KeyEntry),
}

/// State of one trust-chain walk from an anchor towards a signer name.
/// Lives for a single `find_key` call and is never shared.
#[derive(Debug, Clone)]
pub struct FindKeyState {
    target: Name,
    rclass: RecordClass,
    /// Validated DNSKEY set for the deepest zone reached so far
    key: Option<SRRset>,
    /// Validated DS set whose DNSKEY we have not fetched yet
    ds: Option<SRRset>,
    /// Deepest name proven (via a CNAME) not to be a delegation point
    empty_ds: Option<Name>,
    terminal: Option<KeyEntry>,
}

impl FindKeyState {
    /// Start a walk from a trust anchor (DS or DNSKEY RRset).
    pub fn from_anchor(target: Name, rclass: RecordClass, anchor: SRRset) -> Self {
        let mut state = FindKeyState {
            target,
            rclass,
            key: None,
            ds: None,
            empty_ds: None,
            terminal: None,
        };
        match anchor.rtype() {
            RecordType::DS => state.ds = Some(anchor),
            RecordType::DNSKEY => state.key = Some(anchor),
            _ => {
                state.terminal = Some(KeyEntry::bad(
                    state.target.clone(),
                    rclass,
                    60,
                    ValidationReason::BadChain {
                        zone: state.target.clone(),
                        detail: "anchor is neither DS nor DNSKEY".into(),
                    },
                ));
            }
        }
        state
    }

    /// Resume a walk from an already-validated DNSKEY set (a cached Good
    /// entry below the anchor).
    pub fn from_trusted_key(target: Name, rclass: RecordClass, key: SRRset) -> Self {
        FindKeyState {
            target,
            rclass,
            key: Some(key),
            ds: None,
            empty_ds: None,
            terminal: None,
        }
    }

    pub fn target(&self) -> &Name {
        &self.target
    }

    /// The next step of the walk.
    pub fn next_action(&self) -> KeyFindAction {
        if let Some(entry) = &self.terminal {
            return KeyFindAction::Done(entry.clone());
        }
        if let Some(ds) = &self.ds {
            return KeyFindAction::QueryDnskey(ds.name().clone());
        }
        let key = self.key.as_ref().expect("walk holds a key or a DS");
        if *key.name() == self.target {
            return KeyFindAction::Done(KeyEntry::good(key.clone()));
        }

        // Step one label towards the target, skipping past names already
        // proven not to be delegation points
        let mut base = key.name().clone();
        if let Some(empty) = &self.empty_ds {
            if empty.label_count() > base.label_count() && empty.is_subdomain_of(&base) {
                base = empty.clone();
            }
        }
        match base.descend_towards(&self.target) {
            Some(next) => KeyFindAction::QueryDs(next),
            None => KeyFindAction::Done(KeyEntry::bad(
                self.target.clone(),
                self.rclass,
                60,
                ValidationReason::BadChain {
                    zone: self.target.clone(),
                    detail: format!("target not below validated zone {}", base),
                },
            )),
        }
    }

    /// Consume the response to a `QueryDs(qname)` action. Returns an entry
    /// worth caching when the transition produced one.
    pub fn process_ds_response(
        &mut self,
        qname: &Name,
        response: &SMessage,
        verifier: &RrsetVerifier,
        engine: &Nsec3Engine,
    ) -> Option<KeyEntry> {
        let request = SMessage::query(qname.clone(), RecordType::DS, self.rclass);
        let classification = classify(&request, response);
        trace!(%qname, ?classification, "processing DS response");

        match classification {
            ResponseClassification::Positive => self.accept_ds(qname, response, verifier),
            ResponseClassification::Cname
            | ResponseClassification::CnameNodata
            | ResponseClassification::CnameNameError => {
                self.skip_non_delegation(qname, response, verifier)
            }
            ResponseClassification::Nodata | ResponseClassification::NameError => {
                self.prove_ds_absence(qname, response, verifier, engine)
            }
            other => self.finish(KeyEntry::bad(
                qname.clone(),
                self.rclass,
                60,
                ValidationReason::UnexpectedDsResponse {
                    zone: qname.clone(),
                    detail: format!("{:?}", other),
                },
            )),
        }
    }

    fn accept_ds(
        &mut self,
        qname: &Name,
        response: &SMessage,
        verifier: &RrsetVerifier,
    ) -> Option<KeyEntry> {
        let Some(ds_set) = response.find_rrset(Section::Answer, qname, RecordType::DS, self.rclass)
        else {
            return self.finish(KeyEntry::bad(
                qname.clone(),
                self.rclass,
                60,
                ValidationReason::UnexpectedDsResponse {
                    zone: qname.clone(),
                    detail: "positive DS response without a DS RRset".into(),
                },
            ));
        };

        let key = self.key.as_ref().expect("DS query only runs with a key");
        if verifier.verify(ds_set, key) != SecurityStatus::Secure {
            return self.finish(KeyEntry::bad(
                qname.clone(),
                self.rclass,
                60,
                ValidationReason::BadSignature {
                    name: qname.clone(),
                    rtype: RecordType::DS,
                },
            ));
        }

        if !ds_set_has_supported_algorithm(ds_set) {
            // A delegation we cannot follow is the end of secure space,
            // not an attack
            debug!(zone = %qname, "DS present but no supported algorithm, treating as insecure");
            return self.finish(KeyEntry::null(
                qname.clone(),
                self.rclass,
                ds_set.ttl(),
                Some(ValidationReason::UnsupportedDsAlgorithms { zone: qname.clone() }),
            ));
        }

        let mut validated = ds_set.clone();
        validated.security = SecurityStatus::Secure;
        self.ds = Some(validated);
        None
    }

    fn skip_non_delegation(
        &mut self,
        qname: &Name,
        response: &SMessage,
        verifier: &RrsetVerifier,
    ) -> Option<KeyEntry> {
        let key = self.key.as_ref().expect("DS query only runs with a key");
        let Some(cname) =
            response.find_rrset(Section::Answer, qname, RecordType::CNAME, self.rclass)
        else {
            return self.finish(KeyEntry::bad(
                qname.clone(),
                self.rclass,
                60,
                ValidationReason::UnexpectedDsResponse {
                    zone: qname.clone(),
                    detail: "CNAME classification without a CNAME".into(),
                },
            ));
        };
        if verifier.verify(cname, key) != SecurityStatus::Secure {
            return self.finish(KeyEntry::bad(
                qname.clone(),
                self.rclass,
                60,
                ValidationReason::BadSignature {
                    name: qname.clone(),
                    rtype: RecordType::CNAME,
                },
            ));
        }
        // A CNAME here means qname is not a zone cut; keep walking below it
        trace!(%qname, "DS query hit a CNAME, not a delegation point");
        self.empty_ds = Some(qname.clone());
        None
    }

    fn prove_ds_absence(
        &mut self,
        qname: &Name,
        response: &SMessage,
        verifier: &RrsetVerifier,
        engine: &Nsec3Engine,
    ) -> Option<KeyEntry> {
        let key = self.key.as_ref().expect("DS query only runs with a key").clone();

        let mut nsecs: Vec<&SRRset> = Vec::new();
        let mut nsec3s: Vec<&SRRset> = Vec::new();
        for set in response.sets(Section::Authority) {
            match set.rtype() {
                RecordType::NSEC | RecordType::NSEC3 | RecordType::SOA => {
                    if verifier.verify(set, &key) != SecurityStatus::Secure {
                        return self.finish(KeyEntry::bad(
                            qname.clone(),
                            self.rclass,
                            60,
                            ValidationReason::BadSignature {
                                name: set.name().clone(),
                                rtype: set.rtype(),
                            },
                        ));
                    }
                }
                _ => continue,
            }
            match set.rtype() {
                RecordType::NSEC => nsecs.push(set),
                RecordType::NSEC3 => nsec3s.push(set),
                _ => {}
            }
        }

        // NSEC first: an exact delegation NSEC or a NODATA proof for DS
        for set in &nsecs {
            if nsec::proves_no_ds(set, qname) || nsec::proves_nodata(set, qname, RecordType::DS).proven
            {
                debug!(zone = %qname, "NSEC proves insecure delegation");
                return self.finish(KeyEntry::null(
                    qname.clone(),
                    self.rclass,
                    set.ttl(),
                    Some(ValidationReason::DsAbsent { zone: qname.clone() }),
                ));
            }
        }

        if !nsec3s.is_empty() {
            let ttl = nsec3s[0].ttl();
            return match engine.usable_entries(&nsec3s, &key) {
                // Unusable NSEC3s end a DS walk as insecure, unlike in the
                // response validators where they are bogus
                Nsec3Usability::AllUnknownAlgorithm => self.finish(KeyEntry::null(
                    qname.clone(),
                    self.rclass,
                    ttl,
                    Some(ValidationReason::UnknownNsec3Algorithms { zone: qname.clone() }),
                )),
                Nsec3Usability::AllOverIterationLimit => self.finish(KeyEntry::null(
                    qname.clone(),
                    self.rclass,
                    ttl,
                    Some(ValidationReason::Nsec3Ignored { qname: qname.clone() }),
                )),
                Nsec3Usability::Usable(entries) => {
                    let proof = engine.prove_no_ds(&entries, qname, key.name());
                    match proof.status {
                        SecurityStatus::Secure | SecurityStatus::Insecure => {
                            self.finish(KeyEntry::null(
                                qname.clone(),
                                self.rclass,
                                ttl,
                                proof
                                    .reason
                                    .or(Some(ValidationReason::DsAbsent { zone: qname.clone() })),
                            ))
                        }
                        _ => self.finish(KeyEntry::bad(
                            qname.clone(),
                            self.rclass,
                            60,
                            proof.reason.unwrap_or(ValidationReason::MissingDsDenial {
                                zone: qname.clone(),
                            }),
                        )),
                    }
                }
            };
        }

        self.finish(KeyEntry::bad(
            qname.clone(),
            self.rclass,
            60,
            ValidationReason::MissingDsDenial { zone: qname.clone() },
        ))
    }

    /// Consume the response to a `QueryDnskey(qname)` action.
    pub fn process_dnskey_response(
        &mut self,
        qname: &Name,
        response: &SMessage,
        verifier: &RrsetVerifier,
    ) -> Option<KeyEntry> {
        let Some(key_set) =
            response.find_rrset(Section::Answer, qname, RecordType::DNSKEY, self.rclass)
        else {
            return self.finish(KeyEntry::bad(
                qname.clone(),
                self.rclass,
                60,
                ValidationReason::MissingDnskey { zone: qname.clone() },
            ));
        };
        let ds_set = self.ds.as_ref().expect("DNSKEY query only runs with a DS");

        match verify_new_dnskeys(key_set, ds_set, verifier) {
            Ok(validated) => {
                debug!(zone = %qname, "DNSKEY set validated against DS");
                self.key = Some(validated.clone());
                self.ds = None;
                // Worth caching, but the walk continues
                Some(KeyEntry::good(validated))
            }
            Err(reason) => self.finish(KeyEntry::bad(qname.clone(), self.rclass, 60, reason)),
        }
    }

    fn finish(&mut self, entry: KeyEntry) -> Option<KeyEntry> {
        self.terminal = Some(entry.clone());
        Some(entry)
    }
}

/// True if any DS in the set names an algorithm and digest type this
/// validator can follow.
pub fn ds_set_has_supported_algorithm(ds_set: &SRRset) -> bool {
    ds_set.records().iter().any(|record| {
        record.as_ds().is_ok_and(|ds| {
            DnsSecAlgorithm::from_u8(ds.algorithm).is_supported()
                && DigestType::from_u8(ds.digest_type).is_supported()
        })
    })
}

/// Cross-check a candidate DNSKEY set against the validated DS set: some
/// DS must match a key's digest, and that key must sign the DNSKEY RRset
/// itself.
pub fn verify_new_dnskeys(
    key_set: &SRRset,
    ds_set: &SRRset,
    verifier: &RrsetVerifier,
) -> std::result::Result<SRRset, ValidationReason> {
    for ds_record in ds_set.records() {
        let Ok(ds) = ds_record.as_ds() else {
            continue;
        };
        if !DnsSecAlgorithm::from_u8(ds.algorithm).is_supported() {
            continue;
        }
        let digest_type = DigestType::from_u8(ds.digest_type);
        if !digest_type.is_supported() {
            continue;
        }

        for key_record in key_set.records() {
            let Ok(key) = key_record.as_dnskey() else {
                continue;
            };
            if key.algorithm != ds.algorithm || calculate_key_tag(key_record) != ds.key_tag {
                continue;
            }
            let Some(digest) = digest_type.dnskey_digest(&key_record.owner, &key_record.rdata)
            else {
                continue;
            };
            if digest != ds.digest {
                continue;
            }

            // This key is anchored by the DS; the key set must be
            // self-signed by it
            let anchor = SRRset::from_record(key_record.clone());
            if verifier.verify(key_set, &anchor) == SecurityStatus::Secure {
                let mut validated = key_set.clone();
                validated.security = SecurityStatus::Secure;
                return Ok(validated);
            }
        }
    }
    Err(ValidationReason::DnskeyNotSignedByDs {
        zone: key_set.name().clone(),
    })
}
