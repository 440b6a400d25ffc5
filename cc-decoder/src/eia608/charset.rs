//! EIA-608 character sets.
//!
//! Codes are stored the way the channel memory keeps them: basic characters
//! as 0x20-0x7F, special characters as 0x1130-0x113F and the two extended
//! sets as 0x1220-0x123F and 0x1320-0x133F (channel bit removed).

/// Special characters, 001 c001 011 xxxx. 0x1139 (transparent space) is
/// never stored.
const SPECIAL: [char; 16] = [
    '\u{00AE}', '\u{00B0}', '\u{00BD}', '\u{00BF}', '\u{2122}', '\u{00A2}', '\u{00A3}', '\u{266A}',
    '\u{00E0}', ' ', '\u{00E8}', '\u{00E2}', '\u{00EA}', '\u{00EE}', '\u{00F4}', '\u{00FB}',
];

/// Extended Spanish/French and miscellaneous characters.
const EXTENDED_1: [char; 32] = [
    '\u{00C1}', '\u{00C9}', '\u{00D3}', '\u{00DA}', '\u{00DC}', '\u{00FC}', '\u{2018}', '\u{00A1}',
    '*', '\u{2019}', '\u{2014}', '\u{00A9}', '\u{2120}', '\u{2022}', '\u{201C}', '\u{201D}',
    '\u{00C0}', '\u{00C2}', '\u{00C7}', '\u{00C8}', '\u{00CA}', '\u{00CB}', '\u{00EB}', '\u{00CE}',
    '\u{00CF}', '\u{00EF}', '\u{00D4}', '\u{00D9}', '\u{00F9}', '\u{00DB}', '\u{00AB}', '\u{00BB}',
];

/// Extended Portuguese/German/Danish characters.
const EXTENDED_2: [char; 32] = [
    '\u{00C3}', '\u{00E3}', '\u{00CD}', '\u{00CC}', '\u{00EC}', '\u{00D2}', '\u{00F2}', '\u{00D5}',
    '\u{00F5}', '{', '}', '\\', '^', '_', '|', '~',
    '\u{00C4}', '\u{00E4}', '\u{00D6}', '\u{00F6}', '\u{00DF}', '\u{00A5}', '\u{00A4}', '\u{2502}',
    '\u{00C5}', '\u{00E5}', '\u{00D8}', '\u{00F8}', '\u{250C}', '\u{2510}', '\u{2514}', '\u{2518}',
];

/// Placeholder stored for a character that failed parity.
pub const SOLID_BLOCK: u16 = 0x7F;

fn basic(c: u8) -> char {
    match c {
        0x2A => '\u{00E1}',
        0x5C => '\u{00E9}',
        0x5E => '\u{00ED}',
        0x5F => '\u{00F3}',
        0x60 => '\u{00FA}',
        0x7B => '\u{00E7}',
        0x7C => '\u{00F7}',
        0x7D => '\u{00D1}',
        0x7E => '\u{00F1}',
        0x7F => '\u{25A0}',
        c => c as char,
    }
}

fn upper(ch: char) -> char {
    ch.to_uppercase().next().unwrap_or(ch)
}

/// Map a stored character code to Unicode, optionally upper-cased.
///
/// Returns `None` for attribute codes and anything outside the character
/// sets.
pub fn caption_unicode(c: u16, to_upper: bool) -> Option<char> {
    let ch = match c {
        0x20..=0x7F => basic(c as u8),
        0x1130..=0x113F => SPECIAL[(c - 0x1130) as usize],
        0x1220..=0x123F => EXTENDED_1[(c - 0x1220) as usize],
        0x1320..=0x133F => EXTENDED_2[(c - 0x1320) as usize],
        _ => return None,
    };
    Some(if to_upper { upper(ch) } else { ch })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_overrides() {
        assert_eq!(caption_unicode(b'A' as u16, false), Some('A'));
        assert_eq!(caption_unicode(0x2A, false), Some('á'));
        assert_eq!(caption_unicode(0x7E, false), Some('ñ'));
        assert_eq!(caption_unicode(SOLID_BLOCK, false), Some('■'));
        assert_eq!(caption_unicode(0x1F, false), None);
    }

    #[test]
    fn test_special_and_extended() {
        assert_eq!(caption_unicode(0x1137, false), Some('♪'));
        assert_eq!(caption_unicode(0x1138, true), Some('À'));
        assert_eq!(caption_unicode(0x1220, false), Some('Á'));
        assert_eq!(caption_unicode(0x123F, false), Some('»'));
        assert_eq!(caption_unicode(0x1334, false), Some('ß'));
        assert_eq!(caption_unicode(0x1040, false), None);
    }

    #[test]
    fn test_to_upper() {
        assert_eq!(caption_unicode(b'a' as u16, true), Some('A'));
        assert_eq!(caption_unicode(0x5C, true), Some('É'));
        assert_eq!(caption_unicode(b'7' as u16, true), Some('7'));
    }
}
