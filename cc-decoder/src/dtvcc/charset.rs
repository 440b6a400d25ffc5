//! CEA-708 G0-G3 character mapping.

use super::window::CharCode;

/// G2 code points 0x20-0x7F (stored as 0x1020-0x107F). 0 is unmapped.
const G2: [u16; 96] = [
    0x0020, 0x00A0, 0, 0, 0, 0x2026, 0, 0, 0, 0, 0x0160, 0, 0x0152, 0, 0, 0, //
    0x2588, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0, 0, 0, 0x2122, 0x0161, 0, 0x0153,
    0x2120, 0, 0x0178, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0x215B, 0x215C, 0x215D, 0x215E, 0x2502, 0x2510, 0x2514, 0x2500,
    0x2518, 0x250C,
];

/// G3 closed caption icon, mapped into the private use area.
const CAPTION_ICON: char = '\u{F101}';

/// Codes above this value are double-byte characters passed through as-is.
const DOUBLE_BYTE_BASE: CharCode = 0x1200;

/// Map a stored character code to Unicode.
///
/// Returns `None` for control codes and for reserved G2/G3 positions.
pub fn to_unicode(c: CharCode) -> Option<char> {
    if c > DOUBLE_BYTE_BASE {
        return char::from_u32(c as u32);
    }
    if c & 0x60 == 0 {
        return None;
    }
    match c {
        0xAD => Some('-'),
        0x7F => Some('\u{266A}'),
        0x00..=0xFF => char::from_u32(c as u32),
        0x1020..=0x107F => match G2[(c - 0x1020) as usize] {
            0 => None,
            u => char::from_u32(u as u32),
        },
        0x10A0 => Some(CAPTION_ICON),
        _ => None,
    }
}

/// Map a stored character code for display; unmapped codes render as `_`.
pub fn display_char(c: CharCode) -> char {
    to_unicode(c).unwrap_or('_')
}
