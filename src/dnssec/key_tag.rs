use crate::dns::Record;

/// Key tag of a DNSKEY record (RFC 4034 Appendix B). Operates on the raw
/// rdata so the tag matches what a signer computed, byte for byte.
pub fn calculate_key_tag(record: &Record) -> u16 {
    let rdata = &record.rdata;

    // RSAMD5 uses the low 16 bits of the modulus instead
    if rdata.len() >= 4 && rdata[3] == 1 {
        if rdata.len() >= 6 {
            return u16::from_be_bytes([rdata[rdata.len() - 3], rdata[rdata.len() - 2]]);
        }
        return 0;
    }

    let mut accumulator: u32 = 0;
    for (i, &byte) in rdata.iter().enumerate() {
        if i % 2 == 0 {
            accumulator += u32::from(byte) << 8;
        } else {
            accumulator += u32::from(byte);
        }
    }
    accumulator += accumulator >> 16;
    (accumulator & 0xFFFF) as u16
}
