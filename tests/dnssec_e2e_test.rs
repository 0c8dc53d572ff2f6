//! End-to-end validation scenarios against a scripted upstream, with real
//! Ed25519 signatures over a root -> com -> example.com chain.

mod common;

use common::*;

use vordr::dns::{Name, Record, RecordClass, RecordType, ResponseCode, SMessage, Section, TypeBitmap};
use vordr::dnssec::constants::VALIDATION_REASON_QCLASS;
use vordr::dnssec::SecurityStatus;

/// Signed chain, signed answer: NOERROR with AD set.
#[tokio::test]
async fn test_secure_positive_answer() {
    let authority = TestAuthority::new();
    let answer = authority
        .example
        .signed_set(vec![Record::a(n("www.example.com"), 300, [192, 0, 2, 1])]);
    authority.upstream.script(
        &n("www.example.com"),
        RecordType::A,
        response(ResponseCode::NoError, vec![answer], vec![]),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "www.example.com", RecordType::A).await;

    assert_eq!(result.rcode(), ResponseCode::NoError);
    assert!(result.header.flags.ad);
    assert_eq!(result.security, SecurityStatus::Secure);
    assert_eq!(result.sets(Section::Answer).len(), 1);
}

/// Running the same validated query twice gives the same outcome, with the
/// second run served from the key cache.
#[tokio::test]
async fn test_validation_is_idempotent() {
    let authority = TestAuthority::new();
    let answer = authority
        .example
        .signed_set(vec![Record::a(n("www.example.com"), 300, [192, 0, 2, 1])]);
    authority.upstream.script(
        &n("www.example.com"),
        RecordType::A,
        response(ResponseCode::NoError, vec![answer], vec![]),
    );

    let resolver = authority.resolver();
    let first = ask(&resolver, "www.example.com", RecordType::A).await;
    let cached_entries = resolver.key_cache().len();
    let second = ask(&resolver, "www.example.com", RecordType::A).await;

    assert!(first.header.flags.ad && second.header.flags.ad);
    assert_eq!(first.rcode(), second.rcode());
    assert_eq!(
        first.sets(Section::Answer)[0].records(),
        second.sets(Section::Answer)[0].records()
    );
    assert_eq!(resolver.key_cache().len(), cached_entries);
}

/// A corrupted RRSIG turns an otherwise valid response into SERVFAIL with
/// the reason attached as TXT at the root under the reserved class.
#[tokio::test]
async fn test_corrupted_signature_is_bogus() {
    let authority = TestAuthority::new();
    let good = authority
        .example
        .signed_set(vec![Record::a(n("www.example.com"), 300, [192, 0, 2, 1])]);

    // Flip a byte in the signature material
    let mut corrupt_sig = good.sigs()[0].clone();
    let last = corrupt_sig.rdata.len() - 1;
    corrupt_sig.rdata[last] ^= 0xFF;
    let mut tampered =
        vordr::dns::SRRset::from_record(good.records()[0].clone());
    tampered.add_sig(corrupt_sig);

    authority.upstream.script(
        &n("www.example.com"),
        RecordType::A,
        response(ResponseCode::NoError, vec![tampered], vec![]),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "www.example.com", RecordType::A).await;

    assert_eq!(result.rcode(), ResponseCode::ServFail);
    assert!(!result.header.flags.ad);

    let reason_sets = result.sets(Section::Additional);
    assert_eq!(reason_sets.len(), 1);
    assert_eq!(reason_sets[0].name(), &Name::root());
    assert_eq!(reason_sets[0].rtype(), RecordType::TXT);
    assert_eq!(
        reason_sets[0].rclass(),
        RecordClass::Unknown(VALIDATION_REASON_QCLASS)
    );
    assert!(result
        .bogus_reason
        .as_deref()
        .unwrap()
        .contains("signature verification failed"));
}

/// A DNSKEY set that no DS endorses breaks the chain.
#[tokio::test]
async fn test_unanchored_dnskey_is_bogus() {
    let authority = TestAuthority::new();
    // Replace example.com's DNSKEY response with a key set signed by an
    // unrelated key
    let rogue = Signer::new("example.com");
    authority.upstream.script(
        &n("example.com"),
        RecordType::DNSKEY,
        response(ResponseCode::NoError, vec![rogue.key_rrset()], vec![]),
    );
    let answer = rogue.signed_set(vec![Record::a(n("www.example.com"), 300, [192, 0, 2, 1])]);
    authority.upstream.script(
        &n("www.example.com"),
        RecordType::A,
        response(ResponseCode::NoError, vec![answer], vec![]),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "www.example.com", RecordType::A).await;

    assert_eq!(result.rcode(), ResponseCode::ServFail);
    assert!(result
        .bogus_reason
        .as_deref()
        .unwrap()
        .contains("no DS matched"));
}

/// NODATA with an NSEC proving type absence: NOERROR, empty answer, AD.
#[tokio::test]
async fn test_nodata_with_nsec_proof() {
    let authority = TestAuthority::new();
    let nsec = authority.example.signed_set(vec![Record::nsec(
        n("example.com"),
        300,
        &n("a.example.com"),
        &TypeBitmap::from_types(&[
            RecordType::A,
            RecordType::NS,
            RecordType::SOA,
            RecordType::DNSKEY,
            RecordType::NSEC,
            RecordType::RRSIG,
        ]),
    )]);
    authority.upstream.script(
        &n("example.com"),
        RecordType::MX,
        response(
            ResponseCode::NoError,
            vec![],
            vec![authority.example.soa_set(), nsec],
        ),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "example.com", RecordType::MX).await;

    assert_eq!(result.rcode(), ResponseCode::NoError);
    assert!(result.answer_is_empty());
    assert!(result.header.flags.ad);
}

/// NODATA whose NSEC does not cover the type is bogus.
#[tokio::test]
async fn test_nodata_without_proof_is_bogus() {
    let authority = TestAuthority::new();
    authority.upstream.script(
        &n("example.com"),
        RecordType::MX,
        response(
            ResponseCode::NoError,
            vec![],
            vec![authority.example.soa_set()],
        ),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "example.com", RecordType::MX).await;

    assert_eq!(result.rcode(), ResponseCode::ServFail);
    assert!(result
        .bogus_reason
        .as_deref()
        .unwrap()
        .contains("no proof of non-existence"));
}

/// NXDOMAIN with an NSEC3 closest-encloser proof: rcode preserved, AD set.
#[tokio::test]
async fn test_nxdomain_with_nsec3_proof() {
    let authority = TestAuthority::new();
    let qname = n("nonexistent.example.com");
    let apex_match = authority.example.nsec3_matching(
        &n("example.com"),
        &[RecordType::SOA, RecordType::NS, RecordType::DNSKEY],
    );
    let coverer = authority
        .example
        .nsec3_covering_all(&n("unused.placeholder.invalid"), false);
    authority.upstream.script(
        &qname,
        RecordType::A,
        response(
            ResponseCode::NXDomain,
            vec![],
            vec![authority.example.soa_set(), apex_match, coverer],
        ),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "nonexistent.example.com", RecordType::A).await;

    assert_eq!(result.rcode(), ResponseCode::NXDomain);
    assert!(result.header.flags.ad);
    assert_eq!(result.security, SecurityStatus::Secure);
}

/// A bogus NXDOMAIN keeps its rcode instead of being rewritten to
/// SERVFAIL; only the AD bit and the reason tell the difference.
#[tokio::test]
async fn test_nxdomain_missing_proof_preserves_rcode() {
    let authority = TestAuthority::new();
    let qname = n("nonexistent.example.com");
    authority.upstream.script(
        &qname,
        RecordType::A,
        response(
            ResponseCode::NXDomain,
            vec![],
            vec![authority.example.soa_set()],
        ),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "nonexistent.example.com", RecordType::A).await;

    // Bogus, but NXDOMAIN carries meaning and is preserved
    assert_eq!(result.rcode(), ResponseCode::NXDomain);
    assert!(!result.header.flags.ad);
    assert!(result.bogus_reason.is_some());
}

/// An opt-out NSEC3 span at the parent makes the child insecure: the
/// answer passes through with AD clear.
#[tokio::test]
async fn test_opt_out_delegation_is_insecure() {
    let authority = TestAuthority::new();

    let apex_match = authority.root.nsec3_matching(
        &Name::root(),
        &[RecordType::SOA, RecordType::NS, RecordType::DNSKEY],
    );
    let coverer = authority
        .root
        .nsec3_covering_all(&n("unused.placeholder.invalid"), true);
    authority.upstream.script(
        &n("org"),
        RecordType::DS,
        response(
            ResponseCode::NoError,
            vec![],
            vec![authority.root.soa_set(), apex_match, coverer],
        ),
    );
    authority.upstream.script(
        &n("www.example.org"),
        RecordType::A,
        response(
            ResponseCode::NoError,
            vec![vordr::dns::SRRset::from_record(Record::a(
                n("www.example.org"),
                300,
                [198, 51, 100, 7],
            ))],
            vec![],
        ),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "www.example.org", RecordType::A).await;

    assert_eq!(result.rcode(), ResponseCode::NoError);
    assert!(!result.header.flags.ad);
    assert_eq!(result.security, SecurityStatus::Insecure);
    assert_eq!(result.sets(Section::Answer).len(), 1);
}

/// Wildcard expansion: the RRSIG label count exposes it, and the NSEC3
/// proof that the exact name does not exist makes it secure.
#[tokio::test]
async fn test_wildcard_expansion_with_proof() {
    let authority = TestAuthority::new();
    let qname = n("x.wc.example.com");

    let mut answer = vordr::dns::SRRset::from_record(Record::a(qname.clone(), 300, [192, 0, 2, 7]));
    // Signed as *.wc.example.com: three labels
    authority.example.sign_with_labels(&mut answer, 3);

    let coverer = authority
        .example
        .nsec3_covering_all(&n("unused.placeholder.invalid"), false);
    authority.upstream.script(
        &qname,
        RecordType::A,
        response(ResponseCode::NoError, vec![answer], vec![coverer]),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "x.wc.example.com", RecordType::A).await;

    assert_eq!(result.rcode(), ResponseCode::NoError);
    assert!(result.header.flags.ad);
}

/// The same wildcard expansion without any denial records is bogus.
#[tokio::test]
async fn test_wildcard_expansion_without_proof_is_bogus() {
    let authority = TestAuthority::new();
    let qname = n("x.wc.example.com");

    let mut answer = vordr::dns::SRRset::from_record(Record::a(qname.clone(), 300, [192, 0, 2, 7]));
    authority.example.sign_with_labels(&mut answer, 3);
    authority.upstream.script(
        &qname,
        RecordType::A,
        response(ResponseCode::NoError, vec![answer], vec![]),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "x.wc.example.com", RecordType::A).await;

    assert_eq!(result.rcode(), ResponseCode::ServFail);
    assert!(result.bogus_reason.as_deref().unwrap().contains("wildcard"));
}

/// A CNAME chain into a signed target validates end to end.
#[tokio::test]
async fn test_secure_cname_chain() {
    let authority = TestAuthority::new();
    let cname = authority.example.signed_set(vec![Record::cname(
        n("alias.example.com"),
        300,
        &n("www.example.com"),
    )]);
    let target = authority
        .example
        .signed_set(vec![Record::a(n("www.example.com"), 300, [192, 0, 2, 1])]);
    authority.upstream.script(
        &n("alias.example.com"),
        RecordType::A,
        response(ResponseCode::NoError, vec![cname, target], vec![]),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "alias.example.com", RecordType::A).await;

    assert_eq!(result.rcode(), ResponseCode::NoError);
    assert!(result.header.flags.ad);
}

/// CNAME chain ending in a NODATA at the target: chain validates, then
/// the negative proof applies to the tail.
#[tokio::test]
async fn test_cname_nodata() {
    let authority = TestAuthority::new();
    let cname = authority.example.signed_set(vec![Record::cname(
        n("alias.example.com"),
        300,
        &n("tail.example.com"),
    )]);
    let nsec = authority.example.signed_set(vec![Record::nsec(
        n("tail.example.com"),
        300,
        &n("zz.example.com"),
        &TypeBitmap::from_types(&[RecordType::A, RecordType::NSEC, RecordType::RRSIG]),
    )]);
    authority.upstream.script(
        &n("alias.example.com"),
        RecordType::MX,
        response(
            ResponseCode::NoError,
            vec![cname],
            vec![authority.example.soa_set(), nsec],
        ),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "alias.example.com", RecordType::MX).await;

    assert_eq!(result.rcode(), ResponseCode::NoError);
    assert!(result.header.flags.ad);
    assert_eq!(result.security, SecurityStatus::Secure);
}

/// Queries with CD set are forwarded without validation and without AD.
#[tokio::test]
async fn test_checking_disabled_passthrough() {
    let authority = TestAuthority::new();
    // Deliberately bogus data; CD must let it through
    let unsigned =
        vordr::dns::SRRset::from_record(Record::a(n("www.example.com"), 300, [192, 0, 2, 1]));
    authority.upstream.script(
        &n("www.example.com"),
        RecordType::A,
        response(ResponseCode::NoError, vec![unsigned], vec![]),
    );

    let resolver = authority.resolver();
    let mut query = SMessage::query(n("www.example.com"), RecordType::A, RecordClass::IN);
    query.header.flags.cd = true;
    let result = resolver.resolve(&query).await;

    assert_eq!(result.rcode(), ResponseCode::NoError);
    assert!(!result.header.flags.ad);
    assert_eq!(result.security, SecurityStatus::Unchecked);
    assert_eq!(result.sets(Section::Answer).len(), 1);
}

/// RRSIG queries with answers bypass validation entirely.
#[tokio::test]
async fn test_rrsig_query_bypasses_validation() {
    let authority = TestAuthority::new();
    let answer = authority
        .example
        .signed_set(vec![Record::a(n("www.example.com"), 300, [192, 0, 2, 1])]);
    authority.upstream.script(
        &n("www.example.com"),
        RecordType::RRSIG,
        response(ResponseCode::NoError, vec![answer], vec![]),
    );

    let resolver = authority.resolver();
    let result = ask(&resolver, "www.example.com", RecordType::RRSIG).await;

    assert!(!result.header.flags.ad);
    assert_eq!(result.security, SecurityStatus::Unchecked);
}

/// Upstream failure surfaces as SERVFAIL without a reason TXT.
#[tokio::test]
async fn test_upstream_failure_is_servfail() {
    let resolver = vordr::dnssec::ValidatingResolver::new(
        std::sync::Arc::new(DeadUpstream),
        vordr::config::ValidatorConfig::default(),
    )
    .unwrap();

    let result = ask(&resolver, "www.example.com", RecordType::A).await;
    assert_eq!(result.rcode(), ResponseCode::ServFail);
    assert!(result.bogus_reason.is_none());
    assert!(result.sets(Section::Additional).is_empty());
}

/// A zone with no covering trust anchor validates as insecure, not bogus.
#[tokio::test]
async fn test_no_anchor_means_insecure() {
    let authority = TestAuthority::new();
    let answer = authority
        .example
        .signed_set(vec![Record::a(n("www.example.com"), 300, [192, 0, 2, 1])]);
    authority.upstream.script(
        &n("www.example.com"),
        RecordType::A,
        response(ResponseCode::NoError, vec![answer], vec![]),
    );

    // Resolver without any anchors at all
    let resolver = vordr::dnssec::ValidatingResolver::new(
        authority.upstream.clone(),
        vordr::config::ValidatorConfig::default(),
    )
    .unwrap();

    let result = ask(&resolver, "www.example.com", RecordType::A).await;
    assert_eq!(result.rcode(), ResponseCode::NoError);
    assert!(!result.header.flags.ad);
    assert_eq!(result.security, SecurityStatus::Insecure);
}
