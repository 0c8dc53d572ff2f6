use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::classify::{classify, ResponseClassification};
use super::errors::ValidationReason;
use super::find_key::{FindKeyState, KeyFindAction};
use super::key_cache::{KeyCache, KeyEntry};
use super::nsec;
use super::nsec3::{Nsec3Engine, Nsec3IterationPolicy, Nsec3Usability};
use super::trust_anchor::TrustAnchorStore;
use super::verify::{implied_wildcard, RrsetVerifier};
use super::SecurityStatus;
use crate::config::ValidatorConfig;
use crate::dns::{Name, RecordClass, RecordType, ResponseCode, SMessage, SRRset, Section};
use crate::error::{Result, VordrError};
use crate::upstream::Upstream;

/// The DNSSEC-validating stub resolver: classifies upstream responses,
/// walks the trust chain for every RRset that needs a key, runs the
/// class-specific denial proofs and finalizes the AD bit or a SERVFAIL.
pub struct ValidatingResolver {
    upstream: Arc<dyn Upstream>,
    anchors: Arc<TrustAnchorStore>,
    key_cache: KeyCache,
    verifier: RrsetVerifier,
    nsec3: Nsec3Engine,
    config: ValidatorConfig,
}

/// Result of validating one RRset against its chain.
struct Checked {
    status: SecurityStatus,
    reason: Option<ValidationReason>,
    keys: Option<SRRset>,
}

/// Everything a section sweep learned that later proofs need.
#[derive(Default)]
struct SectionScan {
    /// First bogus reason, if the sweep died
    failed: Option<ValidationReason>,
    /// Set when an RRset proved to sit in insecure space
    insecure: bool,
    nsecs: Vec<SRRset>,
    nsec3s: Vec<SRRset>,
    /// DNSKEY set that validated the NSEC3 records (for iteration policy)
    nsec3_keys: Option<SRRset>,
    /// (expanded name, wildcard) pairs detected from RRSIG label counts
    wildcards: Vec<(Name, Name)>,
}

impl ValidatingResolver {
    pub fn new(upstream: Arc<dyn Upstream>, config: ValidatorConfig) -> Result<Self> {
        let anchors = Arc::new(TrustAnchorStore::new());
        if let Some(path) = &config.trust_anchor_file {
            let loaded = anchors.load_from_file(path)?;
            debug!(loaded, "trust anchors loaded from file");
        }
        Ok(ValidatingResolver {
            key_cache: KeyCache::new(
                config.key_cache_max_ttl,
                config.bad_key_ttl,
                config.key_cache_max_entries,
            ),
            nsec3: Nsec3Engine::new(Nsec3IterationPolicy::new(
                config.nsec3_iteration_limits.clone(),
            )),
            verifier: RrsetVerifier::new(),
            upstream,
            anchors,
            config,
        })
    }

    /// Replace the verifier, e.g. to pin the RRSIG validation clock.
    pub fn with_verifier(mut self, verifier: RrsetVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn trust_anchors(&self) -> &TrustAnchorStore {
        &self.anchors
    }

    pub fn key_cache(&self) -> &KeyCache {
        &self.key_cache
    }

    /// Resolve and validate one query. Transport failures and bogus
    /// responses both surface as SERVFAIL, the latter with a reason TXT.
    pub async fn resolve(&self, request: &SMessage) -> SMessage {
        let mut query = request.clone();
        query.header.flags.cd = true;

        let mut response = match self.send_upstream(query).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "upstream query failed");
                return SMessage::servfail(request);
            }
        };
        response.header.id = request.header.id;

        // Checking disabled: the client wants the raw response, just never
        // with a trust claim on it
        if request.header.flags.cd {
            response.header.flags.ad = false;
            response.security = SecurityStatus::Unchecked;
            return response;
        }

        // Signatures over signatures are undefined; pass RRSIG queries
        // through unvalidated
        let qtype = request.question.as_ref().map(|q| q.qtype);
        if qtype == Some(RecordType::RRSIG)
            && response.rcode() == ResponseCode::NoError
            && !response.answer_is_empty()
        {
            response.header.flags.ad = false;
            response.security = SecurityStatus::Unchecked;
            return response;
        }

        let classification = classify(request, &response);
        debug!(?classification, "validating response");

        let outcome = match classification {
            ResponseClassification::Positive
            | ResponseClassification::Any
            | ResponseClassification::Cname => self.validate_positive(&mut response).await,
            ResponseClassification::CnameNodata => {
                self.validate_cname_negative(request, &mut response, false).await
            }
            ResponseClassification::CnameNameError => {
                self.validate_cname_negative(request, &mut response, true).await
            }
            ResponseClassification::Nodata => {
                let qname = request.question.as_ref().unwrap().qname.clone();
                let qtype = request.question.as_ref().unwrap().qtype;
                self.validate_nodata(&mut response, &qname, qtype).await
            }
            ResponseClassification::NameError => {
                let qname = request.question.as_ref().unwrap().qname.clone();
                self.validate_name_error(&mut response, &qname).await
            }
            ResponseClassification::Referral => {
                response.security = SecurityStatus::Unchecked;
                Ok(())
            }
            ResponseClassification::Unknown => {
                response.set_bogus(
                    ValidationReason::UnhandledClassification {
                        detail: "unrecognized response shape".into(),
                    }
                    .to_string(),
                );
                Ok(())
            }
        };

        if let Err(e) = outcome {
            warn!(error = %e, "validation aborted by transport failure");
            return SMessage::servfail(request);
        }

        self.finalize(request, response)
    }

    /// Apply the final verdict: AD for secure, SERVFAIL plus reason TXT
    /// for bogus, a cleared AD for everything else.
    fn finalize(&self, request: &SMessage, mut response: SMessage) -> SMessage {
        match response.security {
            SecurityStatus::Secure => {
                response.header.flags.ad = true;
                response
            }
            SecurityStatus::Bogus => {
                let reason = response.bogus_reason.clone();
                let mut fail = SMessage::servfail(request);
                // NXDOMAIN/YXDOMAIN carry meaning of their own; keep them
                if matches!(response.rcode(), ResponseCode::NXDomain | ResponseCode::YXDomain) {
                    fail.header.rcode = response.rcode();
                }
                if let Some(reason) = reason {
                    debug!(%reason, "response is bogus");
                    fail.attach_reason(&reason);
                    fail.bogus_reason = Some(reason);
                }
                fail
            }
            _ => {
                response.header.flags.ad = false;
                response
            }
        }
    }

    async fn send_upstream(&self, query: SMessage) -> Result<SMessage> {
        match tokio::time::timeout(self.config.query_timeout, self.upstream.send(query)).await {
            Ok(result) => result,
            Err(_) => Err(VordrError::Timeout),
        }
    }

    async fn subquery(&self, qname: &Name, qtype: RecordType, rclass: RecordClass) -> Result<SMessage> {
        trace!(%qname, %qtype, "issuing subquery");
        let mut query = SMessage::query(qname.clone(), qtype, rclass);
        query.header.flags.cd = true;
        self.send_upstream(query).await
    }

    /// Obtain the KeyEntry for the zone that signed `rrset`, walking the
    /// chain from the closest trust anchor as needed.
    async fn find_key_for(&self, rrset: &SRRset) -> Result<KeyEntry> {
        let signer = rrset.signer_name().unwrap_or_else(|| rrset.name().clone());
        self.find_key(&signer, rrset.rclass()).await
    }

    async fn find_key(&self, signer: &Name, rclass: RecordClass) -> Result<KeyEntry> {
        let Some(anchor) = self.anchors.find(signer, rclass) else {
            trace!(%signer, "no trust anchor encloses signer");
            return Ok(KeyEntry::null(signer.clone(), rclass, 60, None));
        };

        let mut state = match self.key_cache.find(signer, rclass) {
            Some(entry) if entry.name() == signer => return Ok(entry),
            // Insecure space and broken zones cover their descendants
            Some(entry) if !entry.is_good() => return Ok(entry),
            Some(entry) => {
                let key = entry.key_rrset().expect("good entry").clone();
                if key.name().label_count() >= anchor.name().label_count() {
                    FindKeyState::from_trusted_key(signer.clone(), rclass, key)
                } else {
                    FindKeyState::from_anchor(signer.clone(), rclass, anchor)
                }
            }
            None => FindKeyState::from_anchor(signer.clone(), rclass, anchor),
        };

        loop {
            match state.next_action() {
                KeyFindAction::Done(entry) => {
                    self.key_cache.store(&entry);
                    return Ok(entry);
                }
                KeyFindAction::QueryDs(name) => {
                    let response = self.subquery(&name, RecordType::DS, rclass).await?;
                    if let Some(entry) =
                        state.process_ds_response(&name, &response, &self.verifier, &self.nsec3)
                    {
                        self.key_cache.store(&entry);
                    }
                }
                KeyFindAction::QueryDnskey(name) => {
                    let response = self.subquery(&name, RecordType::DNSKEY, rclass).await?;
                    if let Some(entry) =
                        state.process_dnskey_response(&name, &response, &self.verifier)
                    {
                        self.key_cache.store(&entry);
                    }
                }
            }
        }
    }

    async fn check_rrset(&self, set: &mut SRRset) -> Result<Checked> {
        match self.find_key_for(set).await? {
            KeyEntry::Good { rrset: keys } => {
                let status = self.verifier.verify(set, &keys);
                set.security = status;
                let reason = (status == SecurityStatus::Bogus).then(|| {
                    ValidationReason::BadSignature {
                        name: set.name().clone(),
                        rtype: set.rtype(),
                    }
                });
                Ok(Checked {
                    status,
                    reason,
                    keys: Some(keys),
                })
            }
            KeyEntry::Null { reason, .. } => {
                set.security = SecurityStatus::Insecure;
                Ok(Checked {
                    status: SecurityStatus::Insecure,
                    reason,
                    keys: None,
                })
            }
            KeyEntry::Bad { reason, .. } => {
                set.security = SecurityStatus::Bogus;
                Ok(Checked {
                    status: SecurityStatus::Bogus,
                    reason: Some(reason),
                    keys: None,
                })
            }
        }
    }

    /// Validate every RRset in a section, collecting denial records and
    /// wildcard expansions along the way. Stops at the first non-secure
    /// RRset; bogus is sticky, insecure short-circuits.
    async fn scan_section(&self, response: &mut SMessage, section: Section) -> Result<SectionScan> {
        let mut sets = std::mem::take(response.sets_mut(section));
        let mut scan = SectionScan::default();
        // DNAMEs validated earlier in this section legitimize the CNAMEs
        // synthesized from them
        let mut dnames: Vec<(Name, Name)> = Vec::new();

        for set in sets.iter_mut() {
            if set.rtype() == RecordType::OPT {
                continue;
            }

            if set.security != SecurityStatus::Secure {
                if set.rtype() == RecordType::CNAME {
                    if let Some((owner, target)) = dnames
                        .iter()
                        .find(|(owner, _)| set.name().is_strict_subdomain_of(owner))
                        .cloned()
                    {
                        if dname_synthesis_ok(set, &owner, &target) {
                            set.security = SecurityStatus::Secure;
                            continue;
                        }
                        scan.failed = Some(ValidationReason::BadDnameSynthesis {
                            name: set.name().clone(),
                        });
                        break;
                    }
                }

                let checked = self.check_rrset(set).await?;
                match checked.status {
                    SecurityStatus::Secure => {
                        if set.rtype() == RecordType::NSEC3 && scan.nsec3_keys.is_none() {
                            scan.nsec3_keys = checked.keys;
                        }
                    }
                    SecurityStatus::Insecure => {
                        trace!(name = %set.name(), "RRset in insecure space");
                        scan.insecure = true;
                        break;
                    }
                    _ => {
                        scan.failed = checked.reason.or(Some(ValidationReason::BadSignature {
                            name: set.name().clone(),
                            rtype: set.rtype(),
                        }));
                        break;
                    }
                }
            }

            match set.rtype() {
                RecordType::NSEC => scan.nsecs.push(set.clone()),
                RecordType::NSEC3 => {
                    scan.nsec3s.push(set.clone());
                    // Sets validated on an earlier pass skip check_rrset,
                    // so recover their zone keys from the cache
                    if scan.nsec3_keys.is_none() {
                        if let Some(signer) = set.signer_name() {
                            if let Some(KeyEntry::Good { rrset }) =
                                self.key_cache.find(&signer, set.rclass())
                            {
                                scan.nsec3_keys = Some(rrset);
                            }
                        }
                    }
                }
                RecordType::DNAME => {
                    if let Some(record) = set.records().first() {
                        if let Ok(target) = record.name_target() {
                            dnames.push((set.name().clone(), target));
                        }
                    }
                }
                _ => {}
            }

            for sig in set.rrsig_data() {
                if let Some(wildcard) = implied_wildcard(set.name(), &sig) {
                    trace!(name = %set.name(), %wildcard, "wildcard expansion detected");
                    scan.wildcards.push((set.name().clone(), wildcard));
                    break;
                }
            }
        }

        *response.sets_mut(section) = sets;
        Ok(scan)
    }

    /// Positive responses, ANY responses and CNAME chains: every answer
    /// and authority RRset verifies, and any wildcard expansion comes
    /// with proof that the exact name does not exist.
    async fn validate_positive(&self, response: &mut SMessage) -> Result<()> {
        let answer = self.scan_section(response, Section::Answer).await?;
        if let Some(reason) = answer.failed {
            response.set_bogus(reason.to_string());
            return Ok(());
        }
        if answer.insecure {
            response.security = SecurityStatus::Insecure;
            return Ok(());
        }

        let authority = self.scan_section(response, Section::Authority).await?;
        if let Some(reason) = authority.failed {
            response.set_bogus(reason.to_string());
            return Ok(());
        }
        if authority.insecure {
            response.security = SecurityStatus::Insecure;
            return Ok(());
        }

        let mut nsecs = answer.nsecs;
        nsecs.extend(authority.nsecs);
        let mut nsec3s = answer.nsec3s;
        nsec3s.extend(authority.nsec3s);
        let nsec3_keys = answer.nsec3_keys.or(authority.nsec3_keys);

        let mut wildcards = answer.wildcards;
        wildcards.extend(authority.wildcards);

        for (qname, wildcard) in wildcards {
            match self.prove_wildcard_expansion(&qname, &wildcard, &nsecs, &nsec3s, &nsec3_keys) {
                SecurityStatus::Secure => {}
                SecurityStatus::Insecure => {
                    response.security = SecurityStatus::Insecure;
                    return Ok(());
                }
                _ => {
                    response.set_bogus(
                        ValidationReason::WildcardNoProof { qname: qname.clone() }.to_string(),
                    );
                    return Ok(());
                }
            }
        }

        response.security = SecurityStatus::Secure;
        Ok(())
    }

    fn prove_wildcard_expansion(
        &self,
        qname: &Name,
        wildcard: &Name,
        nsecs: &[SRRset],
        nsec3s: &[SRRset],
        nsec3_keys: &Option<SRRset>,
    ) -> SecurityStatus {
        for set in nsecs {
            if !nsec::covers_name(set, qname) {
                continue;
            }
            // The NSEC's closest encloser must agree with the wildcard the
            // RRSIG implied, or the expansion came from somewhere else
            if let Some(ce) = nsec::closest_encloser(set, qname) {
                if ce.to_wildcard() == *wildcard {
                    return SecurityStatus::Secure;
                }
            }
        }

        if !nsec3s.is_empty() {
            if let Some(keys) = nsec3_keys {
                let sets: Vec<&SRRset> = nsec3s.iter().collect();
                return match self.nsec3.usable_entries(&sets, keys) {
                    Nsec3Usability::AllUnknownAlgorithm => SecurityStatus::Bogus,
                    Nsec3Usability::AllOverIterationLimit => SecurityStatus::Insecure,
                    Nsec3Usability::Usable(entries) => {
                        self.nsec3.prove_wildcard(&entries, qname, wildcard).status
                    }
                };
            }
        }

        SecurityStatus::Bogus
    }

    /// NODATA: the answer chain (if any) verifies and an NSEC or NSEC3
    /// proof shows the type really is absent at `qname`.
    async fn validate_nodata(
        &self,
        response: &mut SMessage,
        qname: &Name,
        qtype: RecordType,
    ) -> Result<()> {
        let answer = self.scan_section(response, Section::Answer).await?;
        if let Some(reason) = answer.failed {
            response.set_bogus(reason.to_string());
            return Ok(());
        }
        if answer.insecure {
            response.security = SecurityStatus::Insecure;
            return Ok(());
        }

        let authority = self.scan_section(response, Section::Authority).await?;
        if let Some(reason) = authority.failed {
            response.set_bogus(reason.to_string());
            return Ok(());
        }
        if authority.insecure {
            response.security = SecurityStatus::Insecure;
            return Ok(());
        }

        let mut nsecs = answer.nsecs;
        nsecs.extend(authority.nsecs);
        let mut nsec3s = answer.nsec3s;
        nsec3s.extend(authority.nsec3s);
        let nsec3_keys = answer.nsec3_keys.or(authority.nsec3_keys);

        self.finish_nodata(response, qname, qtype, &nsecs, &nsec3s, &nsec3_keys);
        Ok(())
    }

    fn finish_nodata(
        &self,
        response: &mut SMessage,
        qname: &Name,
        qtype: RecordType,
        nsecs: &[SRRset],
        nsec3s: &[SRRset],
        nsec3_keys: &Option<SRRset>,
    ) {
        for set in nsecs {
            let proof = nsec::proves_nodata(set, qname, qtype);
            if !proof.proven {
                continue;
            }
            if let Some(wildcard) = proof.wildcard {
                // Wildcard NODATA additionally needs an NSEC covering the
                // exact qname whose closest encloser matches the wildcard
                let base = wildcard.parent().unwrap_or_else(Name::root);
                let consistent = nsecs.iter().any(|other| {
                    nsec::covers_name(other, qname)
                        && nsec::closest_encloser(other, qname).as_ref() == Some(&base)
                });
                if !consistent {
                    continue;
                }
            }
            response.security = SecurityStatus::Secure;
            return;
        }

        if !nsec3s.is_empty() {
            if let Some(keys) = nsec3_keys {
                let sets: Vec<&SRRset> = nsec3s.iter().collect();
                match self.nsec3.usable_entries(&sets, keys) {
                    Nsec3Usability::AllUnknownAlgorithm => {
                        response.set_bogus(
                            ValidationReason::Nsec3Ignored { qname: qname.clone() }.to_string(),
                        );
                        return;
                    }
                    Nsec3Usability::AllOverIterationLimit => {
                        response.security = SecurityStatus::Insecure;
                        return;
                    }
                    Nsec3Usability::Usable(entries) => {
                        let proof = self.nsec3.prove_nodata(&entries, qname, qtype, keys.name());
                        match proof.status {
                            SecurityStatus::Secure => {
                                response.security = SecurityStatus::Secure;
                                return;
                            }
                            SecurityStatus::Insecure => {
                                response.security = SecurityStatus::Insecure;
                                return;
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        response.set_bogus(
            ValidationReason::NodataNoProof {
                qname: qname.clone(),
                qtype,
            }
            .to_string(),
        );
    }

    /// NXDOMAIN: both the covering proof for qname and the no-wildcard
    /// proof must be present, from NSEC or NSEC3.
    async fn validate_name_error(&self, response: &mut SMessage, qname: &Name) -> Result<()> {
        let answer = self.scan_section(response, Section::Answer).await?;
        if let Some(reason) = answer.failed {
            response.set_bogus(reason.to_string());
            return Ok(());
        }
        if answer.insecure {
            response.security = SecurityStatus::Insecure;
            return Ok(());
        }

        let authority = self.scan_section(response, Section::Authority).await?;
        if let Some(reason) = authority.failed {
            response.set_bogus(reason.to_string());
            return Ok(());
        }
        if authority.insecure {
            response.security = SecurityStatus::Insecure;
            return Ok(());
        }

        self.finish_name_error(
            response,
            qname,
            &authority.nsecs,
            &authority.nsec3s,
            &authority.nsec3_keys,
        );
        Ok(())
    }

    fn finish_name_error(
        &self,
        response: &mut SMessage,
        qname: &Name,
        nsecs: &[SRRset],
        nsec3s: &[SRRset],
        nsec3_keys: &Option<SRRset>,
    ) {
        let mut name_proven = false;
        let mut closest_encloser: Option<Name> = None;
        for set in nsecs {
            let signer = set.signer_name().unwrap_or_else(|| set.name().clone());
            if nsec::proves_name_error(set, qname, &signer) {
                name_proven = true;
                closest_encloser = nsec::closest_encloser(set, qname);
            }
        }
        let wildcard_proven = closest_encloser
            .map(|ce| {
                let wildcard = ce.to_wildcard();
                nsecs.iter().any(|set| nsec::covers_name(set, &wildcard))
            })
            .unwrap_or(false);

        if name_proven && wildcard_proven {
            response.security = SecurityStatus::Secure;
            return;
        }

        if !nsec3s.is_empty() {
            if let Some(keys) = nsec3_keys {
                let sets: Vec<&SRRset> = nsec3s.iter().collect();
                match self.nsec3.usable_entries(&sets, keys) {
                    Nsec3Usability::AllUnknownAlgorithm => {
                        response.set_bogus(
                            ValidationReason::Nsec3Ignored { qname: qname.clone() }.to_string(),
                        );
                        return;
                    }
                    Nsec3Usability::AllOverIterationLimit => {
                        response.security = SecurityStatus::Insecure;
                        return;
                    }
                    Nsec3Usability::Usable(entries) => {
                        let proof = self.nsec3.prove_name_error(&entries, qname, keys.name());
                        match proof.status {
                            SecurityStatus::Secure => {
                                response.security = SecurityStatus::Secure;
                            }
                            SecurityStatus::Insecure => {
                                response.security = SecurityStatus::Insecure;
                            }
                            _ => {
                                let reason =
                                    proof.reason.unwrap_or(ValidationReason::NameErrorNoCoveringNsec {
                                        qname: qname.clone(),
                                    });
                                response.set_bogus(reason.to_string());
                            }
                        }
                        return;
                    }
                }
            }
        }

        // Distinct reasons depending on which half of the proof is missing
        if !name_proven {
            response.set_bogus(
                ValidationReason::NameErrorNoCoveringNsec { qname: qname.clone() }.to_string(),
            );
        } else {
            response.set_bogus(
                ValidationReason::NameErrorNoWildcardProof { qname: qname.clone() }.to_string(),
            );
        }
    }

    /// CNAME chains ending in NODATA or NXDOMAIN: the chain validates as a
    /// positive response first, then the negative proof applies to the
    /// final target.
    async fn validate_cname_negative(
        &self,
        request: &SMessage,
        response: &mut SMessage,
        name_error: bool,
    ) -> Result<()> {
        self.validate_positive(response).await?;
        match response.security {
            SecurityStatus::Insecure => return Ok(()),
            SecurityStatus::Bogus => return Ok(()),
            _ => {}
        }

        // Chain is fine; restart the verdict and judge the tail
        response.security = SecurityStatus::Unchecked;
        let question = request.question.as_ref().unwrap();
        let tail = chain_tail(response, &question.qname);
        trace!(%tail, "validating negative proof at CNAME chain tail");

        let answer = self.scan_section(response, Section::Answer).await?;
        let authority = self.scan_section(response, Section::Authority).await?;
        let mut nsecs = answer.nsecs;
        nsecs.extend(authority.nsecs);
        let mut nsec3s = answer.nsec3s;
        nsec3s.extend(authority.nsec3s);
        let nsec3_keys = answer.nsec3_keys.or(authority.nsec3_keys);

        if name_error {
            self.finish_name_error(response, &tail, &nsecs, &nsec3s, &nsec3_keys);
        } else {
            self.finish_nodata(response, &tail, question.qtype, &nsecs, &nsec3s, &nsec3_keys);
        }
        Ok(())
    }
}

/// Follow the CNAME chain in the answer from `qname` to its final target.
fn chain_tail(response: &SMessage, qname: &Name) -> Name {
    let answers = response.sets(Section::Answer);
    let mut current = qname.clone();
    // Bounded by the section length to survive malicious cycles
    for _ in 0..=answers.len() {
        let next = answers.iter().find_map(|set| {
            if set.rtype() == RecordType::CNAME && set.name() == &current {
                set.records().first()?.name_target().ok()
            } else {
                None
            }
        });
        match next {
            Some(target) => current = target,
            None => break,
        }
    }
    current
}

/// A CNAME is a valid DNAME synthesis when its target is the qname
/// rewritten from the DNAME owner to the DNAME target.
fn dname_synthesis_ok(cname: &SRRset, dname_owner: &Name, dname_target: &Name) -> bool {
    let Some(record) = cname.records().first() else {
        return false;
    };
    let Ok(actual) = record.name_target() else {
        return false;
    };
    match cname.name().replace_suffix(dname_owner, dname_target) {
        Some(expected) => expected == actual,
        None => false,
    }
}
