use super::enums::{RecordClass, RecordType};
use super::name::Name;
use crate::error::{Result, VordrError};

/// A single resource record. Rdata is kept in uncompressed wire form; the
/// typed views below decode it on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub owner: Name,
    pub rtype: RecordType,
    pub rclass: RecordClass,
    pub ttl: u32,
    pub rdata: Vec<u8>,
}

impl Record {
    pub fn new(owner: Name, rtype: RecordType, rclass: RecordClass, ttl: u32, rdata: Vec<u8>) -> Self {
        Record {
            owner,
            rtype,
            rclass,
            ttl,
            rdata,
        }
    }

    pub fn a(owner: Name, ttl: u32, addr: [u8; 4]) -> Self {
        Self::new(owner, RecordType::A, RecordClass::IN, ttl, addr.to_vec())
    }

    pub fn ns(owner: Name, ttl: u32, target: &Name) -> Self {
        Self::new(owner, RecordType::NS, RecordClass::IN, ttl, target.to_wire())
    }

    pub fn cname(owner: Name, ttl: u32, target: &Name) -> Self {
        Self::new(owner, RecordType::CNAME, RecordClass::IN, ttl, target.to_wire())
    }

    pub fn dname(owner: Name, ttl: u32, target: &Name) -> Self {
        Self::new(owner, RecordType::DNAME, RecordClass::IN, ttl, target.to_wire())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn soa(
        owner: Name,
        ttl: u32,
        mname: &Name,
        rname: &Name,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    ) -> Self {
        let mut rdata = mname.to_wire();
        rdata.extend_from_slice(&rname.to_wire());
        for v in [serial, refresh, retry, expire, minimum] {
            rdata.extend_from_slice(&v.to_be_bytes());
        }
        Self::new(owner, RecordType::SOA, RecordClass::IN, ttl, rdata)
    }

    /// TXT record with the text chunked into ≤255-octet strings.
    pub fn txt(owner: Name, rclass: RecordClass, ttl: u32, text: &str) -> Self {
        let mut rdata = Vec::new();
        let bytes = text.as_bytes();
        if bytes.is_empty() {
            rdata.push(0);
        }
        for chunk in bytes.chunks(255) {
            rdata.push(chunk.len() as u8);
            rdata.extend_from_slice(chunk);
        }
        Self::new(owner, RecordType::TXT, rclass, ttl, rdata)
    }

    pub fn ds(owner: Name, ttl: u32, key_tag: u16, algorithm: u8, digest_type: u8, digest: Vec<u8>) -> Self {
        let mut rdata = Vec::with_capacity(4 + digest.len());
        rdata.extend_from_slice(&key_tag.to_be_bytes());
        rdata.push(algorithm);
        rdata.push(digest_type);
        rdata.extend_from_slice(&digest);
        Self::new(owner, RecordType::DS, RecordClass::IN, ttl, rdata)
    }

    pub fn dnskey(owner: Name, ttl: u32, flags: u16, algorithm: u8, public_key: Vec<u8>) -> Self {
        let mut rdata = Vec::with_capacity(4 + public_key.len());
        rdata.extend_from_slice(&flags.to_be_bytes());
        rdata.push(3); // protocol, fixed by RFC 4034
        rdata.push(algorithm);
        rdata.extend_from_slice(&public_key);
        Self::new(owner, RecordType::DNSKEY, RecordClass::IN, ttl, rdata)
    }

    pub fn rrsig(owner: Name, ttl: u32, data: &RrsigData) -> Self {
        Self::new(owner, RecordType::RRSIG, RecordClass::IN, ttl, data.to_wire())
    }

    pub fn nsec(owner: Name, ttl: u32, next: &Name, types: &TypeBitmap) -> Self {
        let mut rdata = next.to_wire();
        rdata.extend_from_slice(&types.to_wire());
        Self::new(owner, RecordType::NSEC, RecordClass::IN, ttl, rdata)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn nsec3(
        owner: Name,
        ttl: u32,
        hash_algorithm: u8,
        flags: u8,
        iterations: u16,
        salt: &[u8],
        next_hashed: &[u8],
        types: &TypeBitmap,
    ) -> Self {
        let mut rdata = Vec::new();
        rdata.push(hash_algorithm);
        rdata.push(flags);
        rdata.extend_from_slice(&iterations.to_be_bytes());
        rdata.push(salt.len() as u8);
        rdata.extend_from_slice(salt);
        rdata.push(next_hashed.len() as u8);
        rdata.extend_from_slice(next_hashed);
        rdata.extend_from_slice(&types.to_wire());
        Self::new(owner, RecordType::NSEC3, RecordClass::IN, ttl, rdata)
    }

    pub fn as_rrsig(&self) -> Result<RrsigData> {
        RrsigData::parse(&self.rdata)
    }

    pub fn as_dnskey(&self) -> Result<DnskeyData> {
        DnskeyData::parse(&self.rdata)
    }

    pub fn as_ds(&self) -> Result<DsData> {
        DsData::parse(&self.rdata)
    }

    pub fn as_nsec(&self) -> Result<NsecData> {
        NsecData::parse(&self.rdata)
    }

    pub fn as_nsec3(&self) -> Result<Nsec3Data> {
        Nsec3Data::parse(&self.rdata)
    }

    /// Target of a CNAME or DNAME record.
    pub fn name_target(&self) -> Result<Name> {
        let (name, _) = Name::from_wire(&self.rdata)?;
        Ok(name)
    }

    /// SOA minimum field, used for negative TTLs.
    pub fn soa_minimum(&self) -> Result<u32> {
        let (_, used1) = Name::from_wire(&self.rdata)?;
        let rest = &self.rdata[used1..];
        let (_, used2) = Name::from_wire(rest)?;
        let fields = &rest[used2..];
        if fields.len() < 20 {
            return Err(VordrError::MalformedRdata("SOA"));
        }
        Ok(u32::from_be_bytes([fields[16], fields[17], fields[18], fields[19]]))
    }
}

/// Decoded RRSIG rdata (RFC 4034 §3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RrsigData {
    pub type_covered: RecordType,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer: Name,
    pub signature: Vec<u8>,
}

impl RrsigData {
    pub fn parse(rdata: &[u8]) -> Result<Self> {
        if rdata.len() < 18 {
            return Err(VordrError::MalformedRdata("RRSIG"));
        }
        let type_covered = RecordType::from_u16(u16::from_be_bytes([rdata[0], rdata[1]]));
        let algorithm = rdata[2];
        let labels = rdata[3];
        let original_ttl = u32::from_be_bytes([rdata[4], rdata[5], rdata[6], rdata[7]]);
        let expiration = u32::from_be_bytes([rdata[8], rdata[9], rdata[10], rdata[11]]);
        let inception = u32::from_be_bytes([rdata[12], rdata[13], rdata[14], rdata[15]]);
        let key_tag = u16::from_be_bytes([rdata[16], rdata[17]]);
        let (signer, used) = Name::from_wire(&rdata[18..])?;
        let signature = rdata[18 + used..].to_vec();

        Ok(RrsigData {
            type_covered,
            algorithm,
            labels,
            original_ttl,
            expiration,
            inception,
            key_tag,
            signer,
            signature,
        })
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = self.prefix_wire();
        out.extend_from_slice(&self.signature);
        out
    }

    /// Rdata through the signer name, i.e. everything but the signature.
    /// This is the part that prefixes the data a signature is computed over.
    pub fn prefix_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(18 + self.signer.wire_len());
        out.extend_from_slice(&self.type_covered.to_u16().to_be_bytes());
        out.push(self.algorithm);
        out.push(self.labels);
        out.extend_from_slice(&self.original_ttl.to_be_bytes());
        out.extend_from_slice(&self.expiration.to_be_bytes());
        out.extend_from_slice(&self.inception.to_be_bytes());
        out.extend_from_slice(&self.key_tag.to_be_bytes());
        out.extend_from_slice(&self.signer.to_wire());
        out
    }
}

/// Decoded DNSKEY rdata (RFC 4034 §2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnskeyData {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
}

impl DnskeyData {
    pub fn parse(rdata: &[u8]) -> Result<Self> {
        if rdata.len() < 4 {
            return Err(VordrError::MalformedRdata("DNSKEY"));
        }
        Ok(DnskeyData {
            flags: u16::from_be_bytes([rdata[0], rdata[1]]),
            protocol: rdata[2],
            algorithm: rdata[3],
            public_key: rdata[4..].to_vec(),
        })
    }

    pub fn is_zone_key(&self) -> bool {
        self.flags & 0x0100 != 0
    }

    pub fn is_sep(&self) -> bool {
        self.flags & 0x0001 != 0
    }

    /// Estimated key strength in bits, used by the NSEC3 iteration policy.
    pub fn key_bits(&self) -> usize {
        match self.algorithm {
            // RSA variants store RFC 3110 form: exponent length, exponent,
            // modulus
            1 | 5 | 7 | 8 | 10 => {
                let key = &self.public_key;
                if key.is_empty() {
                    return 0;
                }
                let (exp_len, off) = if key[0] == 0 {
                    if key.len() < 3 {
                        return 0;
                    }
                    (u16::from_be_bytes([key[1], key[2]]) as usize, 3)
                } else {
                    (key[0] as usize, 1)
                };
                key.len().saturating_sub(off + exp_len) * 8
            }
            13 => 256,
            14 => 384,
            15 => 256,
            16 => 456,
            _ => self.public_key.len() * 8,
        }
    }
}

/// Decoded DS rdata (RFC 4034 §5)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsData {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: Vec<u8>,
}

impl DsData {
    pub fn parse(rdata: &[u8]) -> Result<Self> {
        if rdata.len() < 4 {
            return Err(VordrError::MalformedRdata("DS"));
        }
        Ok(DsData {
            key_tag: u16::from_be_bytes([rdata[0], rdata[1]]),
            algorithm: rdata[2],
            digest_type: rdata[3],
            digest: rdata[4..].to_vec(),
        })
    }
}

/// Decoded NSEC rdata (RFC 4034 §4)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsecData {
    pub next: Name,
    pub types: TypeBitmap,
}

impl NsecData {
    pub fn parse(rdata: &[u8]) -> Result<Self> {
        let (next, used) = Name::from_wire(rdata)?;
        let types = TypeBitmap::parse(&rdata[used..])?;
        Ok(NsecData { next, types })
    }
}

/// Decoded NSEC3 rdata (RFC 5155 §3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nsec3Data {
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
    pub next_hashed: Vec<u8>,
    pub types: TypeBitmap,
}

impl Nsec3Data {
    pub fn parse(rdata: &[u8]) -> Result<Self> {
        if rdata.len() < 5 {
            return Err(VordrError::MalformedRdata("NSEC3"));
        }
        let hash_algorithm = rdata[0];
        let flags = rdata[1];
        let iterations = u16::from_be_bytes([rdata[2], rdata[3]]);
        let salt_len = rdata[4] as usize;
        let salt_end = 5 + salt_len;
        if rdata.len() < salt_end + 1 {
            return Err(VordrError::MalformedRdata("NSEC3"));
        }
        let salt = rdata[5..salt_end].to_vec();
        let hash_len = rdata[salt_end] as usize;
        let hash_end = salt_end + 1 + hash_len;
        if rdata.len() < hash_end {
            return Err(VordrError::MalformedRdata("NSEC3"));
        }
        let next_hashed = rdata[salt_end + 1..hash_end].to_vec();
        let types = TypeBitmap::parse(&rdata[hash_end..])?;

        Ok(Nsec3Data {
            hash_algorithm,
            flags,
            iterations,
            salt,
            next_hashed,
            types,
        })
    }

    /// Opt-out flag (RFC 5155 §3.1.2.1)
    pub fn opt_out(&self) -> bool {
        self.flags & 0x01 != 0
    }
}

/// NSEC/NSEC3 type bitmap in window-block encoding (RFC 4034 §4.1.2)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBitmap {
    types: Vec<u16>,
}

impl TypeBitmap {
    pub fn from_types(types: &[RecordType]) -> Self {
        let mut values: Vec<u16> = types.iter().map(|t| t.to_u16()).collect();
        values.sort_unstable();
        values.dedup();
        TypeBitmap { types: values }
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut types = Vec::new();
        let mut pos = 0usize;
        while pos < data.len() {
            if pos + 2 > data.len() {
                return Err(VordrError::MalformedRdata("type bitmap"));
            }
            let window = data[pos] as u16;
            let len = data[pos + 1] as usize;
            pos += 2;
            if len == 0 || len > 32 || pos + len > data.len() {
                return Err(VordrError::MalformedRdata("type bitmap"));
            }
            for (i, &byte) in data[pos..pos + len].iter().enumerate() {
                for bit in 0..8u16 {
                    if byte & (0x80 >> bit) != 0 {
                        types.push(window * 256 + (i as u16) * 8 + bit);
                    }
                }
            }
            pos += len;
        }
        Ok(TypeBitmap { types })
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut sorted = self.types.clone();
        sorted.sort_unstable();
        let mut i = 0usize;
        while i < sorted.len() {
            let window = sorted[i] >> 8;
            let mut bitmap = [0u8; 32];
            let mut max_byte = 0usize;
            while i < sorted.len() && sorted[i] >> 8 == window {
                let low = (sorted[i] & 0xFF) as usize;
                bitmap[low / 8] |= 0x80 >> (low % 8);
                max_byte = max_byte.max(low / 8);
                i += 1;
            }
            out.push(window as u8);
            out.push((max_byte + 1) as u8);
            out.extend_from_slice(&bitmap[..max_byte + 1]);
        }
        out
    }

    pub fn contains(&self, rtype: RecordType) -> bool {
        self.types.contains(&rtype.to_u16())
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
