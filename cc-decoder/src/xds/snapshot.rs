//! Decoded XDS metadata.

use serde::Serialize;

use super::types::*;

/// Composite packet 1: type, rating, length, time-in-show and title in one
/// packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompositePacket1 {
    pub types: Vec<ProgramType>,
    pub rating: Option<MpaaRating>,
    pub length: Option<HourMinute>,
    pub elapsed: Option<HourMinute>,
    pub title: String,
}

/// Composite packet 2: start time, audio, captions, station and network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompositePacket2 {
    pub start: Option<StartTime>,
    pub audio: Option<AudioServices>,
    pub caption_services: Vec<CaptionService>,
    pub call_letters: String,
    pub channel_number: String,
    pub network_name: String,
}

/// Metadata of the current or of the next program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgramInfo {
    pub start: Option<StartTime>,
    /// Tape delayed start, bit T of the month byte.
    pub tape_delayed: bool,
    pub length: Option<HourMinute>,
    pub elapsed: Option<HourMinute>,
    pub elapsed_seconds: Option<u8>,
    pub name: Option<String>,
    pub types: Vec<ProgramType>,
    pub rating: Option<ContentAdvisory>,
    pub audio: Option<AudioServices>,
    pub caption_services: Vec<CaptionService>,
    pub cgms: Option<Cgms>,
    pub aspect_ratio: Option<AspectRatio>,
    pub composite1: Option<CompositePacket1>,
    pub composite2: Option<CompositePacket2>,
    pub descriptions: [Option<String>; 8],
}

impl ProgramInfo {
    /// Program description rows received so far, in row order.
    pub fn description_lines(&self) -> impl Iterator<Item = &str> {
        self.descriptions.iter().filter_map(|d| d.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub network_name: Option<String>,
    pub call_letters: Option<String>,
    pub channel_number: Option<String>,
    pub tape_delay: Option<HourMinute>,
    pub tsid: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MiscInfo {
    pub time_of_day: Option<TimeOfDay>,
    pub impulse_capture: Option<ImpulseCapture>,
    pub supplemental: Vec<SupplementalLine>,
    pub time_zone: Option<TimeZone>,
    pub oob_channel: Option<u16>,
    pub channel_map: ChannelMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublicServiceInfo {
    pub weather_code: Option<String>,
    pub weather_message: Option<String>,
}

/// Everything decoded from the XDS sideband so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct XdsSnapshot {
    pub current: ProgramInfo,
    pub future: ProgramInfo,
    pub channel: ChannelInfo,
    pub misc: MiscInfo,
    pub public_service: PublicServiceInfo,
}

impl XdsSnapshot {
    /// Program slot of a current or future class packet.
    pub fn program(&self, class: XdsClass) -> Option<&ProgramInfo> {
        match class {
            XdsClass::Current => Some(&self.current),
            XdsClass::Future => Some(&self.future),
            _ => None,
        }
    }
}
