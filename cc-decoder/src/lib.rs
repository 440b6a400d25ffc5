//! Closed caption decoding for television middleware.
//!
//! Three decoders share one [`CaptionDecoder`] context:
//!
//! - [`dtvcc`]: CEA-708 packet reassembly, service command interpretation
//!   and the window/pen model (pages 9-14);
//! - [`eia608`]: line-21 caption and text channels CC1-CC4, T1-T4
//!   (pages 1-8);
//! - [`xds`]: Extended Data Services program and channel metadata.
//!
//! # Example
//!
//! ```rust
//! use cc_decoder::{CaptionDecoder, DecoderConfig};
//! use cc_protocol::{encode_cc_data, par8, CcTriplet, CcType};
//!
//! let decoder = CaptionDecoder::new(DecoderConfig::default());
//! // RDC, PAC row 1, "OK".
//! for (c1, c2) in [(0x14, 0x29), (0x11, 0x40), (b'O', b'K')] {
//!     let block = encode_cc_data(&[CcTriplet::new(CcType::NtscField1, true, par8(c1), par8(c2))]).unwrap();
//!     decoder.decode(0, &block).unwrap();
//! }
//! let pages = decoder.fetch_page(1).unwrap();
//! assert_eq!(pages[0].row_text(0), "OK");
//! ```

pub mod context;
pub mod dtvcc;
pub mod eia608;
pub mod error;
pub mod event;
pub mod page;
pub mod xds;

pub use context::{CaptionDecoder, DecoderConfig};
pub use error::{DecodeError, Error, XdsError};
pub use event::{DecoderEvent, StreamLine};
pub use page::{Cell, Color, Opacity, Page, WindowInfo};
pub use xds::{XdsDecoder, XdsSnapshot};
