//! Notifications published by [`CaptionDecoder`](crate::CaptionDecoder).

use cc_protocol::{CaptionEvent, XdsCategory};
use serde::Serialize;

/// A completed transcript line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamLine {
    pub pgno: u32,
    pub text: String,
    /// Presentation timestamp of the data that started the line.
    pub pts: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DecoderEvent {
    /// A page changed or carries data for the first time.
    Caption(CaptionEvent),
    /// A caption row was completed.
    Stream(StreamLine),
    /// An XDS packet updated the snapshot.
    Xds(XdsCategory),
}

impl DecoderEvent {
    /// Page number the event refers to, if any.
    pub fn pgno(&self) -> Option<u32> {
        match self {
            DecoderEvent::Caption(ev) => Some(ev.pgno),
            DecoderEvent::Stream(line) => Some(line.pgno),
            DecoderEvent::Xds(_) => None,
        }
    }
}
