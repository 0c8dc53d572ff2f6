use std::time::{SystemTime, UNIX_EPOCH};

use ring::signature::UnparsedPublicKey;
use tracing::{debug, trace};

use super::algorithm::DnsSecAlgorithm;
use super::key_tag::calculate_key_tag;
use super::SecurityStatus;
use crate::dns::{Name, Record, RrsigData, SRRset};
use crate::error::{Result, VordrError};

/// Verifies one RRset against one DNSKEY set. Every RRSIG is tried against
/// every key whose algorithm, key tag and signer name match; the first
/// cryptographic success wins.
#[derive(Debug, Default, Clone)]
pub struct RrsetVerifier {
    fixed_time: Option<u32>,
}

impl RrsetVerifier {
    pub fn new() -> Self {
        RrsetVerifier { fixed_time: None }
    }

    /// Pin the clock used for RRSIG inception/expiration checks.
    pub fn with_fixed_time(time: u32) -> Self {
        RrsetVerifier {
            fixed_time: Some(time),
        }
    }

    fn now(&self) -> u32 {
        self.fixed_time.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as u32)
                .unwrap_or(0)
        })
    }

    /// Verify `rrset` against the DNSKEY set `keys`.
    pub fn verify(&self, rrset: &SRRset, keys: &SRRset) -> SecurityStatus {
        let now = self.now();

        for sig_record in rrset.sigs() {
            let Ok(sig) = sig_record.as_rrsig() else {
                trace!(name = %rrset.name(), "skipping malformed RRSIG");
                continue;
            };
            if sig.type_covered != rrset.rtype() || sig.signer != *keys.name() {
                continue;
            }
            if sig.labels as usize > rrset.name().label_count() {
                continue;
            }
            if now < sig.inception || now > sig.expiration {
                debug!(
                    name = %rrset.name(),
                    inception = sig.inception,
                    expiration = sig.expiration,
                    now,
                    "RRSIG outside its validity window"
                );
                continue;
            }

            let Ok(data) = signed_data(rrset, &sig) else {
                continue;
            };

            for key_record in keys.records() {
                if self.key_verifies(key_record, &sig, &data) {
                    trace!(name = %rrset.name(), rtype = %rrset.rtype(), "RRSIG verified");
                    return SecurityStatus::Secure;
                }
            }
        }

        debug!(name = %rrset.name(), rtype = %rrset.rtype(), "no RRSIG verified");
        SecurityStatus::Bogus
    }

    fn key_verifies(&self, key_record: &Record, sig: &RrsigData, data: &[u8]) -> bool {
        let Ok(key) = key_record.as_dnskey() else {
            return false;
        };
        if key.algorithm != sig.algorithm || key.protocol != 3 || !key.is_zone_key() {
            return false;
        }
        if calculate_key_tag(key_record) != sig.key_tag {
            return false;
        }

        let algorithm = DnsSecAlgorithm::from_u8(key.algorithm);
        let Some(verify_alg) = algorithm.ring_algorithm() else {
            // Unsupported algorithms count as failed matches, not errors
            return false;
        };

        let key_bytes = if algorithm.is_rsa() {
            match rsa_rfc3110_to_der(&key.public_key) {
                Some(der) => der,
                None => return false,
            }
        } else if matches!(
            algorithm,
            DnsSecAlgorithm::EcdsaP256Sha256 | DnsSecAlgorithm::EcdsaP384Sha384
        ) {
            // DNSKEY stores the bare point; ring wants the SEC1 form
            let mut point = Vec::with_capacity(key.public_key.len() + 1);
            point.push(0x04);
            point.extend_from_slice(&key.public_key);
            point
        } else {
            key.public_key.clone()
        };

        UnparsedPublicKey::new(verify_alg, &key_bytes)
            .verify(data, &sig.signature)
            .is_ok()
    }
}

/// The canonical byte string an RRSIG signature covers (RFC 4035 §5.3.2):
/// the RRSIG rdata up to the signature, then each record with the owner in
/// canonical form — reduced to the wildcard if the RRSIG label count says
/// the set was wildcard-expanded — sorted by rdata.
pub fn signed_data(rrset: &SRRset, sig: &RrsigData) -> Result<Vec<u8>> {
    let mut data = sig.prefix_wire();

    let owner = signature_owner(rrset.name(), sig);
    let owner_wire = owner.to_wire();

    let mut rdatas: Vec<&[u8]> = rrset.records().iter().map(|r| r.rdata.as_slice()).collect();
    rdatas.sort_unstable();
    rdatas.dedup();

    for rdata in rdatas {
        if rdata.len() > u16::MAX as usize {
            return Err(VordrError::MalformedRdata("rrset"));
        }
        data.extend_from_slice(&owner_wire);
        data.extend_from_slice(&rrset.rtype().to_u16().to_be_bytes());
        data.extend_from_slice(&rrset.rclass().to_u16().to_be_bytes());
        data.extend_from_slice(&sig.original_ttl.to_be_bytes());
        data.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        data.extend_from_slice(rdata);
    }

    Ok(data)
}

/// The owner name as it was signed: when the RRSIG covers fewer labels
/// than the owner carries, the signature was made over the wildcard form.
fn signature_owner(owner: &Name, sig: &RrsigData) -> Name {
    let labels = sig.labels as usize;
    if labels < owner.label_count() {
        owner.trim_to(labels).to_wildcard()
    } else {
        owner.clone()
    }
}

/// The wildcard a signature implies, if the covered set was expanded.
pub fn implied_wildcard(owner: &Name, sig: &RrsigData) -> Option<Name> {
    let labels = sig.labels as usize;
    if labels < owner.label_count() {
        Some(owner.trim_to(labels).to_wildcard())
    } else {
        None
    }
}

/// Convert an RFC 3110 RSA public key (exponent length, exponent, modulus)
/// to the DER `RSAPublicKey` form the crypto layer expects.
fn rsa_rfc3110_to_der(key: &[u8]) -> Option<Vec<u8>> {
    if key.is_empty() {
        return None;
    }
    let (exp_len, offset) = if key[0] == 0 {
        if key.len() < 3 {
            return None;
        }
        (u16::from_be_bytes([key[1], key[2]]) as usize, 3)
    } else {
        (key[0] as usize, 1)
    };
    if key.len() < offset + exp_len + 1 {
        return None;
    }
    let exponent = &key[offset..offset + exp_len];
    let modulus = &key[offset + exp_len..];

    let modulus_der = der_integer(modulus);
    let exponent_der = der_integer(exponent);
    let mut body = modulus_der;
    body.extend_from_slice(&exponent_der);

    let mut out = vec![0x30];
    der_length(&mut out, body.len());
    out.extend_from_slice(&body);
    Some(out)
}

fn der_integer(value: &[u8]) -> Vec<u8> {
    let trimmed: &[u8] = {
        let mut v = value;
        while v.len() > 1 && v[0] == 0 {
            v = &v[1..];
        }
        v
    };
    let pad = trimmed.first().is_some_and(|&b| b & 0x80 != 0);
    let mut out = vec![0x02];
    der_length(&mut out, trimmed.len() + usize::from(pad));
    if pad {
        out.push(0);
    }
    out.extend_from_slice(trimmed);
    out
}

fn der_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
    } else if len < 0x100 {
        out.push(0x81);
        out.push(len as u8);
    } else {
        out.push(0x82);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    }
}
