//! Shared test fixtures: an Ed25519 zone signer and a scripted upstream.
//!
//! Zones are signed with real keys so the validator exercises the same
//! code paths it would against live data, including the DS digest checks
//! and the canonical signing form.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair};

use vordr::config::ValidatorConfig;
use vordr::dns::{
    Flags, Header, Name, Record, RecordClass, RecordType, ResponseCode, RrsigData, SMessage,
    SRRset, Section, TypeBitmap,
};
use vordr::dnssec::digest::DigestType;
use vordr::dnssec::key_tag::calculate_key_tag;
use vordr::dnssec::nsec3::{hash_name, hash_to_label};
use vordr::dnssec::verify::signed_data;
use vordr::dnssec::ValidatingResolver;
use vordr::error::{Result, VordrError};
use vordr::upstream::Upstream;

pub fn n(s: &str) -> Name {
    Name::parse(s).unwrap()
}

/// Opt-in test diagnostics: RUST_LOG=vordr=trace cargo test
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as u32
}

/// An Ed25519 signer for one zone.
pub struct Signer {
    pub zone: Name,
    keypair: Ed25519KeyPair,
    pub dnskey: Record,
}

impl Signer {
    pub fn new(zone: &str) -> Self {
        let zone = n(zone);
        let doc = Ed25519KeyPair::generate_pkcs8(&SystemRandom::new()).unwrap();
        let keypair = Ed25519KeyPair::from_pkcs8(doc.as_ref()).unwrap();
        let public = keypair.public_key().as_ref().to_vec();
        let dnskey = Record::dnskey(zone.clone(), 3600, 257, 15, public);
        Signer {
            zone,
            keypair,
            dnskey,
        }
    }

    pub fn key_tag(&self) -> u16 {
        calculate_key_tag(&self.dnskey)
    }

    pub fn key_rrset(&self) -> SRRset {
        let mut set = SRRset::from_record(self.dnskey.clone());
        self.sign(&mut set);
        set
    }

    /// DS record for this zone's key, to be published in the parent.
    pub fn ds(&self) -> Record {
        let digest = DigestType::Sha256
            .dnskey_digest(&self.zone, &self.dnskey.rdata)
            .unwrap();
        Record::ds(self.zone.clone(), 3600, self.key_tag(), 15, 2, digest)
    }

    /// Sign an RRset in place with this zone's key.
    pub fn sign(&self, set: &mut SRRset) {
        let labels = set.name().label_count() - usize::from(set.name().is_wildcard());
        self.sign_with_labels(set, labels as u8);
    }

    /// Sign with an explicit RRSIG label count, e.g. to mark a wildcard
    /// expansion.
    pub fn sign_with_labels(&self, set: &mut SRRset, labels: u8) {
        let template = RrsigData {
            type_covered: set.rtype(),
            algorithm: 15,
            labels,
            original_ttl: set.ttl(),
            expiration: now() + 86400,
            inception: now().saturating_sub(3600),
            key_tag: self.key_tag(),
            signer: self.zone.clone(),
            signature: Vec::new(),
        };
        let data = signed_data(set, &template).unwrap();
        let signature = self.keypair.sign(&data).as_ref().to_vec();
        let rrsig = RrsigData {
            signature,
            ..template
        };
        set.add_sig(Record::rrsig(set.name().clone(), set.ttl(), &rrsig));
    }

    /// A signed SRRset from raw records.
    pub fn signed_set(&self, records: Vec<Record>) -> SRRset {
        let mut set = SRRset::from_records(records);
        self.sign(&mut set);
        set
    }

    /// An NSEC3 record matching `name` exactly (hash owner, tiny span).
    pub fn nsec3_matching(&self, name: &Name, types: &[RecordType]) -> SRRset {
        let hash = hash_name(name, &[], 0);
        let mut next = hash.clone();
        let last = *next.last().unwrap();
        *next.last_mut().unwrap() = last.wrapping_add(1);
        let mut set = SRRset::from_record(Record::nsec3(
            self.nsec3_owner(&hash),
            300,
            1,
            0,
            0,
            &[],
            &next,
            &TypeBitmap::from_types(types),
        ));
        self.sign(&mut set);
        set
    }

    /// An NSEC3 record covering every hash except H(`except`).
    pub fn nsec3_covering_all(&self, except: &Name, opt_out: bool) -> SRRset {
        let hash = hash_name(except, &[], 0);
        let mut set = SRRset::from_record(Record::nsec3(
            self.nsec3_owner(&hash),
            300,
            1,
            u8::from(opt_out),
            0,
            &[],
            &hash,
            &TypeBitmap::from_types(&[]),
        ));
        self.sign(&mut set);
        set
    }

    fn nsec3_owner(&self, hash: &[u8]) -> Name {
        let label = hash_to_label(hash);
        if self.zone.is_root() {
            n(&label)
        } else {
            n(&format!("{}.{}", label, self.zone))
        }
    }

    pub fn soa_set(&self) -> SRRset {
        let mut set = SRRset::from_record(Record::soa(
            self.zone.clone(),
            300,
            &n("ns1.invalid"),
            &n("hostmaster.invalid"),
            1,
            7200,
            3600,
            1209600,
            300,
        ));
        self.sign(&mut set);
        set
    }
}

/// Scripted upstream: responses keyed by (qname, qtype). Unscripted
/// queries are an error so tests fail loudly instead of hanging walks.
#[derive(Default)]
pub struct StubUpstream {
    responses: Mutex<HashMap<(Name, u16), SMessage>>,
}

impl StubUpstream {
    pub fn new() -> Self {
        StubUpstream::default()
    }

    pub fn script(&self, qname: &Name, qtype: RecordType, response: SMessage) {
        self.responses
            .lock()
            .insert((qname.clone(), qtype.to_u16()), response);
    }
}

#[async_trait]
impl Upstream for StubUpstream {
    async fn send(&self, query: SMessage) -> Result<SMessage> {
        let question = query.question.as_ref().expect("query has a question");
        let key = (question.qname.clone(), question.qtype.to_u16());
        match self.responses.lock().get(&key) {
            Some(response) => {
                let mut response = response.clone();
                response.header.id = query.header.id;
                Ok(response)
            }
            None => Err(VordrError::Upstream(format!(
                "no scripted response for {}/{}",
                question.qname, question.qtype
            ))),
        }
    }
}

/// An upstream that always fails, for the transient-error path.
pub struct DeadUpstream;

#[async_trait]
impl Upstream for DeadUpstream {
    async fn send(&self, _query: SMessage) -> Result<SMessage> {
        Err(VordrError::Upstream("connection refused".into()))
    }
}

/// Build a response message around answer/authority sets.
pub fn response(rcode: ResponseCode, answer: Vec<SRRset>, authority: Vec<SRRset>) -> SMessage {
    let header = Header {
        id: 0,
        opcode: 0,
        rcode,
        flags: Flags {
            qr: true,
            ra: true,
            ..Flags::default()
        },
    };
    let mut msg = SMessage::new(header, None);
    for set in answer {
        msg.add_rrset(Section::Answer, set);
    }
    for set in authority {
        msg.add_rrset(Section::Authority, set);
    }
    msg
}

/// A signed delegation chain root -> com -> example.com with all the
/// DS/DNSKEY subquery responses scripted.
pub struct TestAuthority {
    pub root: Signer,
    pub com: Signer,
    pub example: Signer,
    pub upstream: Arc<StubUpstream>,
}

impl TestAuthority {
    pub fn new() -> Self {
        init_tracing();
        let root = Signer::new(".");
        let com = Signer::new("com");
        let example = Signer::new("example.com");
        let upstream = Arc::new(StubUpstream::new());

        upstream.script(
            &root.zone,
            RecordType::DNSKEY,
            response(ResponseCode::NoError, vec![root.key_rrset()], vec![]),
        );
        upstream.script(
            &com.zone,
            RecordType::DS,
            response(
                ResponseCode::NoError,
                vec![root.signed_set(vec![com.ds()])],
                vec![],
            ),
        );
        upstream.script(
            &com.zone,
            RecordType::DNSKEY,
            response(ResponseCode::NoError, vec![com.key_rrset()], vec![]),
        );
        upstream.script(
            &example.zone,
            RecordType::DS,
            response(
                ResponseCode::NoError,
                vec![com.signed_set(vec![example.ds()])],
                vec![],
            ),
        );
        upstream.script(
            &example.zone,
            RecordType::DNSKEY,
            response(ResponseCode::NoError, vec![example.key_rrset()], vec![]),
        );

        TestAuthority {
            root,
            com,
            example,
            upstream,
        }
    }

    /// A resolver anchored at the root key's DS.
    pub fn resolver(&self) -> ValidatingResolver {
        self.resolver_with_config(ValidatorConfig::default())
    }

    pub fn resolver_with_config(&self, config: ValidatorConfig) -> ValidatingResolver {
        let resolver = ValidatingResolver::new(self.upstream.clone(), config).unwrap();
        resolver
            .trust_anchors()
            .store(SRRset::from_record(self.root.ds()));
        resolver
    }
}

/// Convenience for issuing a query through the resolver.
pub async fn ask(resolver: &ValidatingResolver, qname: &str, qtype: RecordType) -> SMessage {
    let query = SMessage::query(n(qname), qtype, RecordClass::IN);
    resolver.resolve(&query).await
}
