//! Field types carried by XDS packets.

use serde::Serialize;

/// Packet class, from the start code of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum XdsClass {
    Current,
    Future,
    Channel,
    Misc,
    PublicService,
    Reserved,
    Undefined,
}

impl XdsClass {
    /// Class of a start (odd) or continue (even) code.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x01 | 0x02 => XdsClass::Current,
            0x03 | 0x04 => XdsClass::Future,
            0x05 | 0x06 => XdsClass::Channel,
            0x07 | 0x08 => XdsClass::Misc,
            0x09 | 0x0A => XdsClass::PublicService,
            0x0B | 0x0C => XdsClass::Reserved,
            0x0D | 0x0E => XdsClass::Undefined,
            _ => return None,
        })
    }
}

/// Packet type within a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum XdsType {
    ProgramId,
    LengthTimeInShow,
    ProgramName,
    ProgramType,
    ContentAdvisory,
    AudioServices,
    CaptionServices,
    Cgms,
    AspectRatio,
    CompositePacket1,
    CompositePacket2,
    /// Program description row, 0..8.
    ProgramDescription(u8),
    NetworkName,
    NativeChannel,
    TapeDelay,
    Tsid,
    TimeOfDay,
    ImpulseCapture,
    SupplementalData,
    LocalTimeZone,
    OutOfBandChannel,
    ChannelMapPointer,
    ChannelMapHeader,
    ChannelMapPacket,
    WeatherCode,
    WeatherMessage,
}

impl XdsType {
    pub fn lookup(class: XdsClass, kind: u8) -> Option<Self> {
        use XdsType::*;
        Some(match (class, kind) {
            (XdsClass::Current | XdsClass::Future, kind) => match kind {
                0x01 => ProgramId,
                0x02 => LengthTimeInShow,
                0x03 => ProgramName,
                0x04 => ProgramType,
                0x05 => ContentAdvisory,
                0x06 => AudioServices,
                0x07 => CaptionServices,
                0x08 => Cgms,
                0x09 => AspectRatio,
                0x0C => CompositePacket1,
                0x0D => CompositePacket2,
                0x10..=0x17 => ProgramDescription(kind - 0x10),
                _ => return None,
            },
            (XdsClass::Channel, 0x01) => NetworkName,
            (XdsClass::Channel, 0x02) => NativeChannel,
            (XdsClass::Channel, 0x03) => TapeDelay,
            (XdsClass::Channel, 0x04) => Tsid,
            (XdsClass::Misc, 0x01) => TimeOfDay,
            (XdsClass::Misc, 0x02) => ImpulseCapture,
            (XdsClass::Misc, 0x03) => SupplementalData,
            (XdsClass::Misc, 0x04) => LocalTimeZone,
            (XdsClass::Misc, 0x40) => OutOfBandChannel,
            (XdsClass::Misc, 0x41) => ChannelMapPointer,
            (XdsClass::Misc, 0x42) => ChannelMapHeader,
            (XdsClass::Misc, 0x43) => ChannelMapPacket,
            (XdsClass::PublicService, 0x01) => WeatherCode,
            (XdsClass::PublicService, 0x02) => WeatherMessage,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        use XdsType::*;
        match self {
            ProgramId => "program identification",
            LengthTimeInShow => "length/time-in-show",
            ProgramName => "program name",
            ProgramType => "program type",
            ContentAdvisory => "content advisory",
            AudioServices => "audio services",
            CaptionServices => "caption services",
            Cgms => "CGMS-A",
            AspectRatio => "aspect ratio",
            CompositePacket1 => "composite packet 1",
            CompositePacket2 => "composite packet 2",
            ProgramDescription(_) => "program description",
            NetworkName => "network name",
            NativeChannel => "native channel",
            TapeDelay => "tape delay",
            Tsid => "TSID",
            TimeOfDay => "time of day",
            ImpulseCapture => "impulse capture",
            SupplementalData => "supplemental data location",
            LocalTimeZone => "local time zone",
            OutOfBandChannel => "out-of-band channel",
            ChannelMapPointer => "channel map pointer",
            ChannelMapHeader => "channel map header",
            ChannelMapPacket => "channel map packet",
            WeatherCode => "weather code",
            WeatherMessage => "weather message",
        }
    }
}

/// Hour and minute pair used by durations and clock times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HourMinute {
    pub hour: u8,
    pub minute: u8,
}

/// Program identification number: scheduled start, UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StartTime {
    pub minute: u8,
    pub hour: u8,
    pub date: u8,
    pub month: u8,
}

impl StartTime {
    pub(crate) fn from_bytes(b: &[u8]) -> Self {
        StartTime { minute: b[0] & 0x3F, hour: b[1] & 0x1F, date: b[2] & 0x1F, month: b[3] & 0x0F }
    }
}

/// One program type code, 0x20..=0x7F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProgramType(pub u8);

const PROGRAM_TYPE_KEYWORDS: [&str; 96] = [
    "Education", "Entertainment", "Movie", "News", "Religious", "Sports", "Other", "Action",
    "Advertisement", "Animated", "Anthology", "Automobile", "Awards", "Baseball", "Basketball",
    "Bulletin", "Business", "Classical", "College", "Combat", "Comedy", "Commentary", "Concert",
    "Consumer", "Contemporary", "Crime", "Dance", "Documentary", "Drama", "Elementary", "Erotica",
    "Exercise", "Fantasy", "Farm", "Fashion", "Fiction", "Food", "Football", "Foreign",
    "Fund Raiser", "Game/Quiz", "Garden", "Golf", "Government", "Health", "High School",
    "History", "Hobby", "Hockey", "Home", "Horror", "Information", "Instruction",
    "International", "Interview", "Language", "Legal", "Live", "Local", "Math", "Medical",
    "Meeting", "Military", "Miniseries", "Music", "Mystery", "National", "Nature", "Police",
    "Politics", "Premiere", "Prerecorded", "Product", "Professional", "Public", "Racing",
    "Reading", "Repair", "Repeat", "Review", "Romance", "Science", "Series", "Service",
    "Shopping", "Soap Opera", "Special", "Suspense", "Talk", "Technical", "Tennis", "Travel",
    "Variety", "Video", "Weather", "Western",
];

impl ProgramType {
    pub fn from_code(code: u8) -> Option<Self> {
        (0x20..=0x7F).contains(&code).then_some(ProgramType(code))
    }

    /// Basic types are the seven top level categories, the rest are
    /// detail keywords.
    pub fn is_basic(self) -> bool {
        (0x20..=0x26).contains(&self.0)
    }

    pub fn keyword(self) -> &'static str {
        PROGRAM_TYPE_KEYWORDS
            .get(self.0.wrapping_sub(0x20) as usize)
            .copied()
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MpaaRating {
    NotApplicable,
    G,
    Pg,
    Pg13,
    R,
    Nc17,
    X,
    NotRated,
}

impl MpaaRating {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 7 {
            0 => MpaaRating::NotApplicable,
            1 => MpaaRating::G,
            2 => MpaaRating::Pg,
            3 => MpaaRating::Pg13,
            4 => MpaaRating::R,
            5 => MpaaRating::Nc17,
            6 => MpaaRating::X,
            _ => MpaaRating::NotRated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TvRating {
    None,
    TvY,
    TvY7,
    TvG,
    TvPg,
    Tv14,
    TvMa,
}

impl TvRating {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 7 {
            1 => TvRating::TvY,
            2 => TvRating::TvY7,
            3 => TvRating::TvG,
            4 => TvRating::TvPg,
            5 => TvRating::Tv14,
            6 => TvRating::TvMa,
            _ => TvRating::None,
        }
    }
}

/// U.S. TV content descriptors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TvFlags {
    /// Suggestive dialogue.
    pub dialogue: bool,
    /// Coarse language.
    pub language: bool,
    /// Sexual situations.
    pub sexual: bool,
    /// Violence.
    pub violence: bool,
    /// Fantasy violence.
    pub fantasy_violence: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CanadianEnglishRating {
    Exempt,
    Children,
    Children8,
    General,
    ParentalGuidance,
    FourteenPlus,
    EighteenPlus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CanadianFrenchRating {
    Exempt,
    General,
    EightPlus,
    ThirteenPlus,
    SixteenPlus,
    EighteenPlus,
}

/// Decoded content advisory (V-chip) rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContentAdvisory {
    Mpaa(MpaaRating),
    UsTv { rating: TvRating, flags: TvFlags },
    CanadianEnglish(CanadianEnglishRating),
    CanadianFrench(CanadianFrenchRating),
    /// A reserved system or rating value.
    NotAvailable,
}

impl ContentAdvisory {
    pub fn decode(b1: u8, b2: u8) -> Self {
        match (b1 & 0x18) >> 3 {
            0 | 2 => ContentAdvisory::Mpaa(MpaaRating::from_bits(b1)),
            1 => {
                let rating = TvRating::from_bits(b2);
                let mut flags = TvFlags::default();
                match rating {
                    TvRating::TvY7 => flags.fantasy_violence = b2 & 0x20 != 0,
                    TvRating::TvPg | TvRating::Tv14 | TvRating::TvMa => {
                        if rating != TvRating::TvMa {
                            flags.dialogue = b1 & 0x20 != 0;
                        }
                        flags.language = b2 & 0x08 != 0;
                        flags.sexual = b2 & 0x10 != 0;
                        flags.violence = b2 & 0x20 != 0;
                    }
                    _ => {}
                }
                ContentAdvisory::UsTv { rating, flags }
            }
            _ => {
                let system = ((b1 & 0x20) >> 5) | ((b2 & 0x08) >> 2);
                match system {
                    0 => match b2 & 7 {
                        0 => ContentAdvisory::CanadianEnglish(CanadianEnglishRating::Exempt),
                        1 => ContentAdvisory::CanadianEnglish(CanadianEnglishRating::Children),
                        2 => ContentAdvisory::CanadianEnglish(CanadianEnglishRating::Children8),
                        3 => ContentAdvisory::CanadianEnglish(CanadianEnglishRating::General),
                        4 => ContentAdvisory::CanadianEnglish(CanadianEnglishRating::ParentalGuidance),
                        5 => ContentAdvisory::CanadianEnglish(CanadianEnglishRating::FourteenPlus),
                        6 => ContentAdvisory::CanadianEnglish(CanadianEnglishRating::EighteenPlus),
                        _ => ContentAdvisory::NotAvailable,
                    },
                    1 => match b2 & 7 {
                        0 => ContentAdvisory::CanadianFrench(CanadianFrenchRating::Exempt),
                        1 => ContentAdvisory::CanadianFrench(CanadianFrenchRating::General),
                        2 => ContentAdvisory::CanadianFrench(CanadianFrenchRating::EightPlus),
                        3 => ContentAdvisory::CanadianFrench(CanadianFrenchRating::ThirteenPlus),
                        4 => ContentAdvisory::CanadianFrench(CanadianFrenchRating::SixteenPlus),
                        5 => ContentAdvisory::CanadianFrench(CanadianFrenchRating::EighteenPlus),
                        _ => ContentAdvisory::NotAvailable,
                    },
                    _ => ContentAdvisory::NotAvailable,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Language {
    #[default]
    Unknown,
    English,
    Spanish,
    French,
    German,
    Italian,
    Other,
    None,
}

impl Language {
    /// Language from bits 3..5 of an audio or caption service byte.
    pub fn from_byte(b: u8) -> Self {
        match (b >> 3) & 7 {
            0 => Language::Unknown,
            1 => Language::English,
            2 => Language::Spanish,
            3 => Language::French,
            4 => Language::German,
            5 => Language::Italian,
            6 => Language::Other,
            _ => Language::None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Unknown => "unknown",
            Language::English => "eng",
            Language::Spanish => "spa",
            Language::French => "fre",
            Language::German => "ger",
            Language::Italian => "ita",
            Language::Other => "other",
            Language::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum MainAudio {
    #[default]
    Unknown,
    Mono,
    SimulatedStereo,
    TrueStereo,
    StereoSurround,
    DataService,
    Other,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SapAudio {
    #[default]
    Unknown,
    Mono,
    VideoDescriptions,
    NonProgramAudio,
    SpecialEffects,
    DataService,
    Other,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AudioServices {
    pub main_language: Language,
    pub main_type: MainAudio,
    pub sap_language: Language,
    pub sap_type: SapAudio,
}

impl AudioServices {
    pub fn decode(main: u8, sap: u8) -> Self {
        let main_type = match main & 7 {
            0 => MainAudio::Unknown,
            1 => MainAudio::Mono,
            2 => MainAudio::SimulatedStereo,
            3 => MainAudio::TrueStereo,
            4 => MainAudio::StereoSurround,
            5 => MainAudio::DataService,
            6 => MainAudio::Other,
            _ => MainAudio::None,
        };
        let sap_type = match sap & 7 {
            0 => SapAudio::Unknown,
            1 => SapAudio::Mono,
            2 => SapAudio::VideoDescriptions,
            3 => SapAudio::NonProgramAudio,
            4 => SapAudio::SpecialEffects,
            5 => SapAudio::DataService,
            6 => SapAudio::Other,
            _ => SapAudio::None,
        };
        AudioServices {
            main_language: Language::from_byte(main),
            main_type,
            sap_language: Language::from_byte(sap),
            sap_type,
        }
    }
}

/// Caption or text service, F C T bits of a caption services byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptionServiceKind {
    Cc1,
    T1,
    Cc2,
    T2,
    Cc3,
    T3,
    Cc4,
    T4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptionService {
    pub language: Language,
    pub kind: CaptionServiceKind,
}

impl CaptionService {
    pub fn decode(b: u8) -> Self {
        let kind = match b & 7 {
            0 => CaptionServiceKind::Cc1,
            1 => CaptionServiceKind::T1,
            2 => CaptionServiceKind::Cc2,
            3 => CaptionServiceKind::T2,
            4 => CaptionServiceKind::Cc3,
            5 => CaptionServiceKind::T3,
            6 => CaptionServiceKind::Cc4,
            _ => CaptionServiceKind::T4,
        };
        CaptionService { language: Language::from_byte(b), kind }
    }
}

/// CGMS-A copy generation management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CopyControl {
    CopyPermitted,
    Reserved,
    OneGeneration,
    NeverCopy,
}

/// Analog protection system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Aps {
    None,
    PspOnSplitBurstOff,
    SplitBurst2Line,
    SplitBurst4Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cgms {
    pub copy_control: CopyControl,
    /// Only meaningful while copying is restricted.
    pub aps: Option<Aps>,
    pub analog_source: bool,
}

impl Cgms {
    pub fn decode(b: u8) -> Self {
        let copy_control = match (b & 0x18) >> 3 {
            0 => CopyControl::CopyPermitted,
            1 => CopyControl::Reserved,
            2 => CopyControl::OneGeneration,
            _ => CopyControl::NeverCopy,
        };
        let aps = (copy_control != CopyControl::CopyPermitted).then(|| match (b & 6) >> 1 {
            0 => Aps::None,
            1 => Aps::PspOnSplitBurstOff,
            2 => Aps::SplitBurst2Line,
            _ => Aps::SplitBurst4Line,
        });
        Cgms { copy_control, aps, analog_source: b & 1 != 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AspectKind {
    /// Full 4:3 or an unrecognised letterbox.
    Unknown,
    /// About 1.85:1.
    VistaVision,
    /// About 2.35:1.
    CinemaScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AspectRatio {
    pub start_line: u16,
    pub end_line: u16,
    pub kind: AspectKind,
    pub squeezed: bool,
}

impl AspectRatio {
    pub fn decode(start: u8, end: u8, extra: Option<u8>) -> Self {
        let start_line = (start & 0x3F) as u16 + 22;
        let end_line = 262 - (end & 0x3F) as u16;
        let kind = match end_line.saturating_sub(start_line) {
            173..=180 => AspectKind::VistaVision,
            136..=145 => AspectKind::CinemaScope,
            _ => AspectKind::Unknown,
        };
        AspectRatio { start_line, end_line, kind, squeezed: extra.is_some_and(|b| b & 1 != 0) }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeOfDay {
    pub minute: u8,
    pub hour: u8,
    pub date: u8,
    pub month: u8,
    /// 1 = Sunday.
    pub day_of_week: u8,
    pub year: u16,
    pub daylight_saving: bool,
    pub leap_day: bool,
    pub zero_seconds: bool,
    pub tape_delayed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImpulseCapture {
    pub start: StartTime,
    pub length: HourMinute,
}

/// Line carrying supplemental data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupplementalLine {
    pub field1: bool,
    pub line: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeZone {
    /// Hours west of UTC.
    pub offset: u8,
    pub daylight_saving: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelMap {
    pub pointer: Option<u16>,
    pub channel_count: Option<u16>,
    pub version: Option<u8>,
    pub user_channel: Option<u16>,
    /// Set when the user channel is remapped.
    pub tune_channel: Option<u16>,
    pub channel_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_lookup() {
        assert_eq!(XdsType::lookup(XdsClass::Current, 0x01), Some(XdsType::ProgramId));
        assert_eq!(XdsType::lookup(XdsClass::Future, 0x15), Some(XdsType::ProgramDescription(5)));
        assert_eq!(XdsType::lookup(XdsClass::Channel, 0x04), Some(XdsType::Tsid));
        assert_eq!(XdsType::lookup(XdsClass::Misc, 0x43), Some(XdsType::ChannelMapPacket));
        assert_eq!(XdsType::lookup(XdsClass::Current, 0x0A), None);
        assert_eq!(XdsType::lookup(XdsClass::Reserved, 0x01), None);
        assert_eq!(XdsClass::from_code(0x0F), None);
    }

    #[test]
    fn test_program_type_keywords() {
        assert_eq!(ProgramType(0x22).keyword(), "Movie");
        assert!(ProgramType(0x26).is_basic());
        assert_eq!(ProgramType(0x27).keyword(), "Action");
        assert!(!ProgramType(0x27).is_basic());
        assert_eq!(ProgramType(0x7F).keyword(), "Western");
        assert_eq!(ProgramType::from_code(0x1F), None);
    }

    #[test]
    fn test_content_advisory() {
        assert_eq!(ContentAdvisory::decode(0x43, 0x40), ContentAdvisory::Mpaa(MpaaRating::Pg13));
        // TV-14 with D, L and V.
        let advisory = ContentAdvisory::decode(0x48 | 0x20, 0x40 | 0x20 | 0x08 | 5);
        assert_eq!(
            advisory,
            ContentAdvisory::UsTv {
                rating: TvRating::Tv14,
                flags: TvFlags { dialogue: true, language: true, sexual: false, violence: true, fantasy_violence: false },
            }
        );
        // TV-Y7 FV.
        match ContentAdvisory::decode(0x48, 0x62) {
            ContentAdvisory::UsTv { rating, flags } => {
                assert_eq!(rating, TvRating::TvY7);
                assert!(flags.fantasy_violence);
                assert!(!flags.violence);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            ContentAdvisory::decode(0x58, 0x44),
            ContentAdvisory::CanadianEnglish(CanadianEnglishRating::ParentalGuidance)
        );
        assert_eq!(
            ContentAdvisory::decode(0x78, 0x43),
            ContentAdvisory::CanadianFrench(CanadianFrenchRating::ThirteenPlus)
        );
        assert_eq!(ContentAdvisory::decode(0x58, 0x48), ContentAdvisory::NotAvailable);
    }

    #[test]
    fn test_audio_and_caption_services() {
        let audio = AudioServices::decode(0x40 | (1 << 3) | 3, 0x40 | (2 << 3) | 2);
        assert_eq!(audio.main_language, Language::English);
        assert_eq!(audio.main_type, MainAudio::TrueStereo);
        assert_eq!(audio.sap_language, Language::Spanish);
        assert_eq!(audio.sap_type, SapAudio::VideoDescriptions);

        let service = CaptionService::decode(0x40 | (3 << 3) | 5);
        assert_eq!(service.language, Language::French);
        assert_eq!(service.kind, CaptionServiceKind::T3);
    }

    #[test]
    fn test_cgms_and_aspect_ratio() {
        let cgms = Cgms::decode(0x40 | 0x18 | 0x04 | 1);
        assert_eq!(cgms.copy_control, CopyControl::NeverCopy);
        assert_eq!(cgms.aps, Some(Aps::SplitBurst2Line));
        assert!(cgms.analog_source);
        assert_eq!(Cgms::decode(0x46).aps, None);

        // 1.85:1 letterbox, lines 55..229.
        let ar = AspectRatio::decode(0x40 | 33, 0x40 | 33, None);
        assert_eq!((ar.start_line, ar.end_line), (55, 229));
        assert_eq!(ar.kind, AspectKind::VistaVision);
        let ar = AspectRatio::decode(0x40 | 52, 0x40 | 52, Some(0x41));
        assert_eq!(ar.kind, AspectKind::CinemaScope);
        assert!(ar.squeezed);
        assert_eq!(AspectRatio::decode(0x40, 0x40, None).kind, AspectKind::Unknown);
    }
}
