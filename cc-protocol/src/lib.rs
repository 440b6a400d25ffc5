//! Transport framing for broadcast closed caption data.
//!
//! This crate defines how caption bytes arrive from the capture layer:
//! ATSC `cc_data()` blocks carrying EIA-608 byte pairs and CEA-708 (DTVCC)
//! packet fragments, and raw line-21 byte pairs protected by odd parity.
//!
//! # cc_data() layout
//!
//! ```text
//! +------+---------+------+--------------+--------------+-----
//! | 0x03 | P|count | 0xFF | flags d1 d2  | flags d1 d2  | ...
//! +------+---------+------+--------------+--------------+-----
//!                          flags: 11111 V TT
//!                          TT: 0 = field 1, 1 = field 2,
//!                              2 = DTVCC data, 3 = DTVCC start
//! ```
//!
//! # Example
//!
//! ```rust
//! use cc_protocol::{decode_cc_data, encode_cc_data, CcTriplet, CcType};
//!
//! let block = encode_cc_data(&[CcTriplet::new(CcType::NtscField1, true, 0x94, 0x20)]).unwrap();
//! let triplets = decode_cc_data(&block).unwrap();
//! assert_eq!(triplets[0].cc_type, CcType::NtscField1);
//! ```

pub mod codec;
pub mod error;
pub mod parity;
pub mod types;

pub use codec::{
    decode_cc_data, decode_header, encode_cc_data, packet_to_triplets, parse_hex, CcDataHeader,
    CcTriplet,
};
pub use error::ProtocolError;
pub use parity::{par8, unpar8, unpar_pair, XdsChecksum};
pub use types::{
    CaptionEvent, CcType, Field, XdsCategory, CC_DATA_MARKER, FIRST_CC_PAGE, FIRST_DTVCC_PAGE,
    LAST_CC_PAGE, LAST_DTVCC_PAGE, LINE21_FIELD1, LINE22_FIELD1, LINE284_FIELD2,
};
