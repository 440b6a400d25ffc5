//! Extended Data Services carried on line 21, field 2.
//!
//! ```text
//! packet:  start(class, type) | info pairs | [continue(class, type) | info pairs] | end(0x0F, checksum)
//! ```
//!
//! Informational bytes are buffered per packet and decoded into the
//! snapshot when the end code arrives.

pub mod snapshot;
pub mod types;

use cc_protocol::{XdsCategory, XdsChecksum};
use log::{debug, trace, warn};

use crate::eia608::charset::caption_unicode;
use crate::error::XdsError;

pub use snapshot::{
    ChannelInfo, CompositePacket1, CompositePacket2, MiscInfo, ProgramInfo, PublicServiceInfo,
    XdsSnapshot,
};
pub use types::*;

/// Most informational bytes any packet carries.
pub const MAX_PAYLOAD: usize = 32;

/// End of packet code.
const END: u8 = 0x0F;

#[derive(Debug, Clone)]
struct Packet {
    class: XdsClass,
    code: u8,
    kind: XdsType,
    checksum: XdsChecksum,
    payload: Vec<u8>,
    /// Informational bytes received, including those past `MAX_PAYLOAD`.
    count: usize,
}

impl Packet {
    fn push(&mut self, byte: u8) {
        self.count += 1;
        if self.payload.len() < MAX_PAYLOAD {
            self.payload.push(byte);
        }
    }

    /// Payload without the null padding of an odd byte count.
    fn data(&self) -> &[u8] {
        let mut data = &self.payload[..];
        while let [rest @ .., 0] = data {
            data = rest;
        }
        data
    }
}

/// XDS text: basic caption characters, trailing blanks removed.
fn text(bytes: &[u8]) -> String {
    let s: String = bytes
        .iter()
        .filter(|&&b| (0x20..=0x7F).contains(&b))
        .filter_map(|&b| caption_unicode(b as u16, false))
        .collect();
    s.trim_end().to_string()
}

fn hour_minute(minute: u8, hour: u8) -> HourMinute {
    HourMinute { hour: hour & 0x3F, minute: minute & 0x3F }
}

/// Six bit low and four bit high channel number of the channel map packets.
fn map_channel(lo: u8, hi: u8) -> u16 {
    (lo & 0x3F) as u16 | ((hi & 0x0F) as u16) << 6
}

/// The XDS packet state machine and its decoded metadata.
#[derive(Debug, Clone, Default)]
pub struct XdsDecoder {
    packet: Option<Packet>,
    snapshot: XdsSnapshot,
    advisory_changed: bool,
    /// Checksum verdict of the last packet that reached its end code.
    checksum_valid: Option<bool>,
    checksum_errors: u32,
}

impl XdsDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the packet in progress and all decoded metadata.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> &XdsSnapshot {
        &self.snapshot
    }

    pub fn is_capturing(&self) -> bool {
        self.packet.is_some()
    }

    /// Whether the current program rating changed since the flag was last
    /// reset.
    pub fn content_advisory_changed(&self) -> bool {
        self.advisory_changed
    }

    pub fn reset_content_advisory_changed(&mut self) {
        self.advisory_changed = false;
    }

    /// Whether the last terminated packet carried a valid checksum. `None`
    /// until a packet end code was seen.
    pub fn last_checksum_valid(&self) -> Option<bool> {
        self.checksum_valid
    }

    /// Packets terminated with a checksum mismatch since the last reset.
    pub fn checksum_errors(&self) -> u32 {
        self.checksum_errors
    }

    /// Feed one byte pair, parity already removed.
    ///
    /// Returns the category of the metadata a completed packet updated.
    /// Errors describe a dropped pair or packet; the decoder stays usable.
    pub fn decode(&mut self, data1: u8, data2: u8) -> Result<Option<XdsCategory>, XdsError> {
        let (d1, d2) = (data1 & 0x7F, data2 & 0x7F);
        match d1 {
            0x01..=0x0E if d1 & 1 == 1 => self.start(d1, d2),
            0x02..=0x0E => self.resume(d1, d2),
            END => self.end(d2),
            0x00 | 0x20..=0x7F => self.informational(d1, d2),
            // Caption control codes.
            _ => Ok(None),
        }
    }

    fn start(&mut self, d1: u8, d2: u8) -> Result<Option<XdsCategory>, XdsError> {
        self.packet = None;
        let unknown = XdsError::UnknownType { class: d1, kind: d2 };
        let class = XdsClass::from_code(d1).ok_or(unknown.clone())?;
        let kind = XdsType::lookup(class, d2).ok_or(unknown)?;
        trace!("XDS start: {:?} {}", class, kind.as_str());
        self.packet = Some(Packet {
            class,
            code: d2,
            kind,
            checksum: XdsChecksum::start(d1, d2),
            payload: Vec::with_capacity(MAX_PAYLOAD),
            count: 0,
        });
        Ok(None)
    }

    fn resume(&mut self, d1: u8, d2: u8) -> Result<Option<XdsCategory>, XdsError> {
        let class = XdsClass::from_code(d1);
        match &self.packet {
            Some(p) if Some(p.class) == class && p.code == d2 => Ok(None),
            _ => {
                self.packet = None;
                Err(XdsError::Interrupted { class: d1, kind: d2 })
            }
        }
    }

    fn informational(&mut self, d1: u8, d2: u8) -> Result<Option<XdsCategory>, XdsError> {
        let packet = self.packet.as_mut().ok_or(XdsError::NotCapturing)?;
        if !(d2 == 0 || (0x20..=0x7F).contains(&d2)) || (d1 == 0 && d2 == 0) {
            return Ok(None);
        }
        packet.checksum.push_pair(d1, d2);
        packet.push(d1);
        packet.push(d2);
        Ok(None)
    }

    fn end(&mut self, checksum: u8) -> Result<Option<XdsCategory>, XdsError> {
        let mut packet = self.packet.take().ok_or(XdsError::NotCapturing)?;
        packet.checksum.push(END);
        let valid = packet.checksum.matches(checksum);
        self.checksum_valid = Some(valid);
        if !valid {
            // Still applied; the verdict stays readable.
            self.checksum_errors = self.checksum_errors.saturating_add(1);
            let e = XdsError::ChecksumMismatch { expected: packet.checksum.expected(), actual: checksum };
            warn!("XDS {}: {}", packet.kind.as_str(), e);
        }
        self.apply(&packet)
    }

    fn apply(&mut self, packet: &Packet) -> Result<Option<XdsCategory>, XdsError> {
        let b = packet.data();
        let n = b.len();
        let accept = |ok: bool| -> Result<(), XdsError> {
            if ok && packet.count <= MAX_PAYLOAD {
                Ok(())
            } else {
                Err(XdsError::Incomplete { kind: packet.kind.as_str(), count: packet.count })
            }
        };
        debug!("XDS {:?} {}: {} bytes", packet.class, packet.kind.as_str(), n);

        let category = match packet.kind {
            XdsType::ProgramId => {
                accept(n == 4)?;
                let program = self.program(packet.class);
                program.start = Some(StartTime::from_bytes(b));
                program.tape_delayed = b[3] & 0x10 != 0;
                Some(XdsCategory::ProgramTime)
            }
            XdsType::LengthTimeInShow => {
                accept((2..=6).contains(&n))?;
                let program = self.program(packet.class);
                program.length = Some(hour_minute(b[0], b[1]));
                if n >= 4 {
                    program.elapsed = Some(hour_minute(b[2], b[3]));
                }
                if n >= 5 {
                    program.elapsed_seconds = Some(b[4] & 0x3F);
                }
                Some(XdsCategory::ProgramTime)
            }
            XdsType::ProgramName => {
                accept(n >= 1)?;
                self.program(packet.class).name = Some(text(b));
                Some(XdsCategory::ProgramName)
            }
            XdsType::ProgramType => {
                accept(n >= 1)?;
                self.program(packet.class).types = b.iter().filter_map(|&c| ProgramType::from_code(c)).collect();
                Some(XdsCategory::ProgramType)
            }
            XdsType::ContentAdvisory => {
                accept(n == 2)?;
                self.set_rating(packet.class, ContentAdvisory::decode(b[0], b[1]));
                Some(XdsCategory::ContentAdvisory)
            }
            XdsType::AudioServices => {
                accept(n == 2)?;
                self.program(packet.class).audio = Some(AudioServices::decode(b[0], b[1]));
                Some(XdsCategory::AudioServices)
            }
            XdsType::CaptionServices => {
                accept((1..=8).contains(&n))?;
                self.program(packet.class).caption_services = b.iter().map(|&c| CaptionService::decode(c)).collect();
                Some(XdsCategory::CaptionServices)
            }
            XdsType::Cgms => {
                accept((1..=2).contains(&n))?;
                self.program(packet.class).cgms = Some(Cgms::decode(b[0]));
                Some(XdsCategory::Cgms)
            }
            XdsType::AspectRatio => {
                accept((2..=4).contains(&n))?;
                self.program(packet.class).aspect_ratio = Some(AspectRatio::decode(b[0], b[1], b.get(2).copied()));
                Some(XdsCategory::AspectRatio)
            }
            XdsType::CompositePacket1 => {
                accept(n >= 1)?;
                self.composite1(packet.class, b);
                Some(XdsCategory::ProgramName)
            }
            XdsType::CompositePacket2 => {
                accept(n >= 4)?;
                self.composite2(packet.class, b);
                Some(XdsCategory::ProgramTime)
            }
            XdsType::ProgramDescription(row) => {
                accept(n >= 1)?;
                self.program(packet.class).descriptions[row as usize] = Some(text(b));
                Some(XdsCategory::ProgramDescription)
            }
            XdsType::NetworkName => {
                accept(n >= 1)?;
                self.snapshot.channel.network_name = Some(text(b));
                Some(XdsCategory::NetworkInfo)
            }
            XdsType::NativeChannel => {
                accept((4..=6).contains(&n))?;
                self.snapshot.channel.call_letters = Some(text(&b[..4]));
                self.snapshot.channel.channel_number = (n > 4).then(|| text(&b[4..]));
                Some(XdsCategory::NetworkInfo)
            }
            XdsType::TapeDelay => {
                accept(n == 2)?;
                self.snapshot.channel.tape_delay = Some(HourMinute { hour: b[1] & 0x1F, minute: b[0] & 0x3F });
                Some(XdsCategory::NetworkInfo)
            }
            XdsType::Tsid => {
                accept(n == 4)?;
                let tsid = b.iter().enumerate().fold(0u16, |acc, (i, &d)| acc | ((d & 0x0F) as u16) << (4 * i));
                self.snapshot.channel.tsid = Some(tsid);
                Some(XdsCategory::NetworkInfo)
            }
            XdsType::TimeOfDay => {
                accept(n == 6)?;
                self.snapshot.misc.time_of_day = Some(TimeOfDay {
                    minute: b[0] & 0x3F,
                    hour: b[1] & 0x1F,
                    date: b[2] & 0x1F,
                    month: b[3] & 0x0F,
                    day_of_week: b[4] & 0x07,
                    year: 1990 + (b[5] & 0x3F) as u16,
                    daylight_saving: b[1] & 0x20 != 0,
                    leap_day: b[2] & 0x20 != 0,
                    zero_seconds: b[3] & 0x20 != 0,
                    tape_delayed: b[3] & 0x10 != 0,
                });
                Some(XdsCategory::DateTime)
            }
            XdsType::ImpulseCapture => {
                accept(n == 6)?;
                self.snapshot.misc.impulse_capture = Some(ImpulseCapture {
                    start: StartTime::from_bytes(b),
                    length: hour_minute(b[4], b[5]),
                });
                Some(XdsCategory::ProgramTime)
            }
            XdsType::SupplementalData => {
                accept(n >= 1)?;
                self.snapshot.misc.supplemental = b
                    .iter()
                    .map(|&d| SupplementalLine { field1: d & 0x20 == 0, line: d & 0x1F })
                    .collect();
                None
            }
            XdsType::LocalTimeZone => {
                accept((1..=2).contains(&n))?;
                self.snapshot.misc.time_zone = Some(TimeZone { offset: b[0] & 0x1F, daylight_saving: b[0] & 0x20 != 0 });
                Some(XdsCategory::DateTime)
            }
            XdsType::OutOfBandChannel => {
                accept(n == 2)?;
                self.snapshot.misc.oob_channel = Some((b[0] & 0x3F) as u16 | ((b[1] & 0x3F) as u16) << 6);
                Some(XdsCategory::NetworkInfo)
            }
            XdsType::ChannelMapPointer => {
                accept(n == 2)?;
                self.snapshot.misc.channel_map.pointer = Some(map_channel(b[0], b[1]));
                Some(XdsCategory::NetworkInfo)
            }
            XdsType::ChannelMapHeader => {
                accept((3..=4).contains(&n))?;
                let map = &mut self.snapshot.misc.channel_map;
                map.channel_count = Some(map_channel(b[0], b[1]));
                map.version = Some(b[2] & 0x3F);
                Some(XdsCategory::NetworkInfo)
            }
            XdsType::ChannelMapPacket => {
                let remapped = n >= 2 && b[1] & 0x20 != 0;
                accept((2..=10).contains(&n) && (!remapped || n >= 4))?;
                let map = &mut self.snapshot.misc.channel_map;
                map.user_channel = Some(map_channel(b[0], b[1]));
                let id_start = if remapped { 4 } else { 2 };
                map.tune_channel = remapped.then(|| map_channel(b[2], b[3]));
                map.channel_id = text(&b[id_start..]);
                Some(XdsCategory::NetworkInfo)
            }
            XdsType::WeatherCode => {
                self.snapshot.public_service.weather_code = Some(text(b));
                Some(XdsCategory::WeatherInfo)
            }
            XdsType::WeatherMessage => {
                accept(n >= 1)?;
                self.snapshot.public_service.weather_message = Some(text(b));
                Some(XdsCategory::WeatherInfo)
            }
        };
        Ok(category)
    }

    /// Program slot of a current or future class packet.
    fn program(&mut self, class: XdsClass) -> &mut ProgramInfo {
        match class {
            XdsClass::Future => &mut self.snapshot.future,
            _ => &mut self.snapshot.current,
        }
    }

    fn set_rating(&mut self, class: XdsClass, rating: ContentAdvisory) {
        let program = self.program(class);
        let changed = program.rating != Some(rating);
        program.rating = Some(rating);
        if class == XdsClass::Current && changed {
            debug!("XDS content advisory changed: {:?}", rating);
            self.advisory_changed = true;
        }
    }

    fn composite1(&mut self, class: XdsClass, b: &[u8]) {
        let n = b.len();
        let mut pkt = CompositePacket1 {
            types: b[..n.min(5)].iter().filter_map(|&c| ProgramType::from_code(c)).collect(),
            ..CompositePacket1::default()
        };
        if n > 5 {
            pkt.rating = Some(MpaaRating::from_bits(b[5]));
        }
        if n > 7 {
            pkt.length = Some(hour_minute(b[6], b[7]));
        }
        if n > 9 {
            pkt.elapsed = Some(hour_minute(b[8], b[9]));
        }
        if n > 10 {
            pkt.title = text(&b[10..]);
        }

        if let Some(rating) = pkt.rating {
            self.set_rating(class, ContentAdvisory::Mpaa(rating));
        }
        let program = self.program(class);
        program.types = pkt.types.clone();
        if pkt.length.is_some() {
            program.length = pkt.length;
        }
        if pkt.elapsed.is_some() {
            program.elapsed = pkt.elapsed;
        }
        if !pkt.title.is_empty() {
            program.name = Some(pkt.title.clone());
        }
        program.composite1 = Some(pkt);
    }

    fn composite2(&mut self, class: XdsClass, b: &[u8]) {
        let n = b.len();
        let mut pkt = CompositePacket2 { start: Some(StartTime::from_bytes(b)), ..CompositePacket2::default() };
        if n >= 6 {
            pkt.audio = Some(AudioServices::decode(b[4], b[5]));
        }
        pkt.caption_services = b.get(6..n.min(8)).unwrap_or(&[]).iter().map(|&c| CaptionService::decode(c)).collect();
        pkt.call_letters = b.get(8..n.min(12)).map(text).unwrap_or_default();
        pkt.channel_number = b.get(12..n.min(14)).map(text).unwrap_or_default();
        pkt.network_name = b.get(14..).map(text).unwrap_or_default();

        let program = self.program(class);
        program.start = pkt.start;
        if pkt.audio.is_some() {
            program.audio = pkt.audio;
        }
        if !pkt.caption_services.is_empty() {
            program.caption_services = pkt.caption_services.clone();
        }
        program.composite2 = Some(pkt);
    }
}
