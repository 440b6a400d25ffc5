//! Codec for ATSC `cc_data()` blocks.
//!
//! Block format:
//! ```text
//! +--------+-----------------+----------+----------------------------+
//! | Marker | P | - | count   | Reserved |  count x (flags, d1, d2)   |
//! |  0x03  | 0x40    0x1F    |   0xFF   |                            |
//! +--------+-----------------+----------+----------------------------+
//! | 1 byte |     1 byte      |  1 byte  |       3 bytes each         |
//! ```
//!
//! Record flags: `11111 V TT` where `V` marks the record valid and `TT` is
//! the [`CcType`].

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::types::*;

/// Process flag in the second header byte.
pub const PROCESS_FLAG: u8 = 0x40;
/// Record count mask in the second header byte.
pub const COUNT_MASK: u8 = 0x1F;
/// Validity flag in a record's flags byte.
pub const VALID_FLAG: u8 = 0x04;

/// Parsed `cc_data()` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcDataHeader {
    /// Records should be processed at all.
    pub process: bool,
    /// Number of complete records that follow, clamped to the buffer.
    pub count: usize,
}

/// One `cc_data()` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcTriplet {
    pub valid: bool,
    pub cc_type: CcType,
    pub data: [u8; 2],
}

impl CcTriplet {
    pub fn new(cc_type: CcType, valid: bool, d1: u8, d2: u8) -> Self {
        Self { valid, cc_type, data: [d1, d2] }
    }

    fn flags(&self) -> u8 {
        0xF8 | if self.valid { VALID_FLAG } else { 0 } | self.cc_type as u8
    }
}

/// Decode the header of a `cc_data()` block.
///
/// The declared count is clamped to the number of complete records
/// actually present.
pub fn decode_header(buf: &[u8]) -> Result<CcDataHeader, ProtocolError> {
    if buf.len() < CC_DATA_HEADER_SIZE {
        return Err(ProtocolError::IncompleteFrame {
            expected: CC_DATA_HEADER_SIZE,
            actual: buf.len(),
        });
    }

    if buf[0] != CC_DATA_MARKER {
        return Err(ProtocolError::InvalidMarker(buf[0]));
    }

    let declared = (buf[1] & COUNT_MASK) as usize;
    let available = (buf.len() - CC_DATA_HEADER_SIZE) / TRIPLET_SIZE;

    Ok(CcDataHeader {
        process: buf[1] & PROCESS_FLAG != 0,
        count: declared.min(available),
    })
}

/// Decode all records of a `cc_data()` block.
///
/// A block without the process flag yields no records.
pub fn decode_cc_data(buf: &[u8]) -> Result<Vec<CcTriplet>, ProtocolError> {
    let header = decode_header(buf)?;
    if !header.process {
        return Ok(Vec::new());
    }

    let mut records = &buf[CC_DATA_HEADER_SIZE..];
    let mut triplets = Vec::with_capacity(header.count);

    for _ in 0..header.count {
        let flags = records.get_u8();
        let d1 = records.get_u8();
        let d2 = records.get_u8();
        triplets.push(CcTriplet {
            valid: flags & VALID_FLAG != 0,
            cc_type: CcType::from(flags),
            data: [d1, d2],
        });
    }

    Ok(triplets)
}

/// Encode records into a `cc_data()` block with the process flag set.
pub fn encode_cc_data(triplets: &[CcTriplet]) -> Result<Bytes, ProtocolError> {
    if triplets.len() > MAX_TRIPLETS {
        return Err(ProtocolError::TooManyTriplets(triplets.len(), MAX_TRIPLETS));
    }

    let mut buf = BytesMut::with_capacity(CC_DATA_HEADER_SIZE + triplets.len() * TRIPLET_SIZE);
    buf.put_u8(CC_DATA_MARKER);
    buf.put_u8(0x80 | PROCESS_FLAG | triplets.len() as u8);
    buf.put_u8(0xFF);

    for t in triplets {
        buf.put_u8(t.flags());
        buf.put_slice(&t.data);
    }

    Ok(buf.freeze())
}

/// Split a DTVCC packet into `cc_data()` records: one start record followed
/// by continuation records, padding the final record with a zero byte.
pub fn packet_to_triplets(packet: &[u8]) -> Vec<CcTriplet> {
    packet
        .chunks(2)
        .enumerate()
        .map(|(i, chunk)| {
            let cc_type = if i == 0 { CcType::DtvccStart } else { CcType::DtvccData };
            let d2 = chunk.get(1).copied().unwrap_or(0);
            CcTriplet::new(cc_type, true, chunk[0], d2)
        })
        .collect()
}

/// Parse a whitespace-tolerant hex string into bytes.
pub fn parse_hex(s: &str) -> Result<Bytes, ProtocolError> {
    let digits: Vec<u8> = s
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b',')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(ProtocolError::Malformed(format!("odd number of hex digits in {:?}", s)));
    }

    let mut out = BytesMut::with_capacity(digits.len() / 2);
    for pair in digits.chunks(2) {
        let hi = hex_value(pair[0]).ok_or_else(|| bad_digit(pair[0]))?;
        let lo = hex_value(pair[1]).ok_or_else(|| bad_digit(pair[1]))?;
        out.put_u8(hi << 4 | lo);
    }

    Ok(out.freeze())
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

fn bad_digit(digit: u8) -> ProtocolError {
    ProtocolError::Malformed(format!("invalid hex digit {:?}", digit as char))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_header() {
        let header = decode_header(&[0x03, 0xC2, 0xFF, 0xFC, 0x94, 0x20, 0xFC, 0x94, 0x20]).unwrap();
        assert!(header.process);
        assert_eq!(header.count, 2);
    }

    #[test]
    fn test_decode_header_clamps_count() {
        // Declares 5 records, carries one and a half.
        let header = decode_header(&[0x03, 0x45, 0xFF, 0xFC, 0x94, 0x20, 0xFC, 0x94]).unwrap();
        assert_eq!(header.count, 1);
    }

    #[test]
    fn test_decode_header_errors() {
        assert_eq!(
            decode_header(&[0x03]),
            Err(ProtocolError::IncompleteFrame { expected: 3, actual: 1 })
        );
        assert_eq!(decode_header(&[0x04, 0x41, 0xFF]), Err(ProtocolError::InvalidMarker(0x04)));
    }

    #[test]
    fn test_decode_without_process_flag() {
        let triplets = decode_cc_data(&[0x03, 0x01, 0xFF, 0xFC, 0x94, 0x20]).unwrap();
        assert!(triplets.is_empty());
    }

    #[test]
    fn test_decode_records() {
        let triplets =
            decode_cc_data(&[0x03, 0x43, 0xFF, 0xFC, 0x94, 0x20, 0xF9, 0x80, 0x80, 0xFF, 0x02, 0x21])
                .unwrap();
        assert_eq!(triplets.len(), 3);
        assert_eq!(triplets[0], CcTriplet::new(CcType::NtscField1, true, 0x94, 0x20));
        assert_eq!(triplets[1], CcTriplet::new(CcType::NtscField2, false, 0x80, 0x80));
        assert_eq!(triplets[2], CcTriplet::new(CcType::DtvccStart, true, 0x02, 0x21));
    }

    #[test]
    fn test_encode_cc_data() {
        let triplets = [
            CcTriplet::new(CcType::NtscField1, true, 0x94, 0x20),
            CcTriplet::new(CcType::DtvccData, false, 0x00, 0x00),
        ];
        let encoded = encode_cc_data(&triplets).unwrap();
        assert_eq!(&encoded[..], &[0x03, 0xC2, 0xFF, 0xFC, 0x94, 0x20, 0xFA, 0x00, 0x00]);
        assert_eq!(decode_cc_data(&encoded).unwrap(), triplets.to_vec());
    }

    #[test]
    fn test_encode_too_many() {
        let triplets = vec![CcTriplet::new(CcType::DtvccData, true, 0, 0); 32];
        assert_eq!(encode_cc_data(&triplets), Err(ProtocolError::TooManyTriplets(32, 31)));
    }

    #[test]
    fn test_packet_to_triplets() {
        let triplets = packet_to_triplets(&[0x02, 0x21, 0x48]);
        assert_eq!(triplets.len(), 2);
        assert_eq!(triplets[0], CcTriplet::new(CcType::DtvccStart, true, 0x02, 0x21));
        assert_eq!(triplets[1], CcTriplet::new(CcType::DtvccData, true, 0x48, 0x00));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(&parse_hex("03 c1 ff").unwrap()[..], &[0x03, 0xC1, 0xFF]);
        assert_eq!(&parse_hex("94:2C").unwrap()[..], &[0x94, 0x2C]);
        assert!(parse_hex("0").is_err());
        assert!(parse_hex("zz").is_err());
    }
}
