//! Shared caption data types.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Marker byte at the start of a `cc_data()` block.
pub const CC_DATA_MARKER: u8 = 0x03;
/// Size of one `cc_data()` record.
pub const TRIPLET_SIZE: usize = 3;
/// Size of the `cc_data()` header (marker, flags/count, reserved).
pub const CC_DATA_HEADER_SIZE: usize = 3;
/// Maximum number of records the 5-bit count field can describe.
pub const MAX_TRIPLETS: usize = 0x1F;

/// VBI line carrying field 1 captions on NTSC.
pub const LINE21_FIELD1: u32 = 21;
/// VBI line carrying field 1 captions on PAL/SECAM.
pub const LINE22_FIELD1: u32 = 22;
/// VBI line carrying field 2 captions and XDS on NTSC.
pub const LINE284_FIELD2: u32 = 284;

/// First page number of the EIA-608 channels (CC1).
pub const FIRST_CC_PAGE: u32 = 1;
/// Last page number of the EIA-608 channels (T4).
pub const LAST_CC_PAGE: u32 = 8;
/// Page number of DTVCC service 1.
pub const FIRST_DTVCC_PAGE: u32 = 9;
/// Page number of DTVCC service 6.
pub const LAST_DTVCC_PAGE: u32 = 14;

/// Record type carried in the low two bits of the `cc_data()` flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CcType {
    /// EIA-608 field 1 byte pair.
    NtscField1 = 0,
    /// EIA-608 field 2 byte pair.
    NtscField2 = 1,
    /// DTVCC packet continuation.
    DtvccData = 2,
    /// DTVCC packet start.
    DtvccStart = 3,
}

impl From<u8> for CcType {
    fn from(value: u8) -> Self {
        match value & 3 {
            0 => CcType::NtscField1,
            1 => CcType::NtscField2,
            2 => CcType::DtvccData,
            _ => CcType::DtvccStart,
        }
    }
}

/// Line-21 field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    First = 0,
    Second = 1,
}

impl Field {
    /// Index into per-field arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Map a VBI line number to the caption field it carries.
    pub fn from_line(line: u32) -> Result<Self, ProtocolError> {
        match line {
            LINE21_FIELD1 | LINE22_FIELD1 => Ok(Field::First),
            LINE284_FIELD2 => Ok(Field::Second),
            other => Err(ProtocolError::InvalidLine(other)),
        }
    }

    /// The nominal NTSC line of this field.
    pub fn line(self) -> u32 {
        match self {
            Field::First => LINE21_FIELD1,
            Field::Second => LINE284_FIELD2,
        }
    }
}

/// Caption update notification.
///
/// `pgno` 1..=8 address EIA-608 channels CC1-CC4 and T1-T4, 9..=14 address
/// DTVCC services 1-6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionEvent {
    /// Page whose content changed.
    pub pgno: u32,
    /// The page carries data for the first time, content may not have changed.
    pub first_seen: bool,
    /// EIA-608 roll-up: start a smooth roll of the caption overlay.
    pub rolling: bool,
    /// Presentation timestamp of the data that caused the update.
    pub pts: i64,
}

/// XDS metadata category reported when a packet completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XdsCategory {
    ProgramTime,
    ProgramName,
    ProgramType,
    ProgramDescription,
    CaptionServices,
    ContentAdvisory,
    AudioServices,
    AspectRatio,
    Cgms,
    DateTime,
    NetworkInfo,
    WeatherInfo,
}

impl XdsCategory {
    /// Human readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            XdsCategory::ProgramTime => "program time",
            XdsCategory::ProgramName => "program name",
            XdsCategory::ProgramType => "program type",
            XdsCategory::ProgramDescription => "program description",
            XdsCategory::CaptionServices => "caption services",
            XdsCategory::ContentAdvisory => "content advisory",
            XdsCategory::AudioServices => "audio services",
            XdsCategory::AspectRatio => "aspect ratio",
            XdsCategory::Cgms => "CGMS",
            XdsCategory::DateTime => "date/time",
            XdsCategory::NetworkInfo => "network info",
            XdsCategory::WeatherInfo => "weather info",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cc_type_from_flags() {
        assert_eq!(CcType::from(0xFC), CcType::NtscField1);
        assert_eq!(CcType::from(0xFD), CcType::NtscField2);
        assert_eq!(CcType::from(0xFE), CcType::DtvccData);
        assert_eq!(CcType::from(0xFF), CcType::DtvccStart);
    }

    #[test]
    fn test_field_from_line() {
        assert_eq!(Field::from_line(21), Ok(Field::First));
        assert_eq!(Field::from_line(22), Ok(Field::First));
        assert_eq!(Field::from_line(284), Ok(Field::Second));
        assert_eq!(Field::from_line(23), Err(ProtocolError::InvalidLine(23)));
        assert_eq!(Field::Second.line(), 284);
    }

    #[test]
    fn test_xds_category_names() {
        assert_eq!(XdsCategory::Cgms.as_str(), "CGMS");
        assert_eq!(XdsCategory::ContentAdvisory.as_str(), "content advisory");
    }
}
