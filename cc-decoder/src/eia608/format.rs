//! Rendering of EIA-608 channel memory.

use crate::page::{Cell, Color, Opacity, Page};

use super::channel::{Channel, COLUMNS, FIRST_COLUMN, LAST_COLUMN, ROWS};
use super::charset::caption_unicode;

/// Colors of PAC, mid-row and background attribute codes.
const COLOR_MAP: [Color; 8] = [
    Color::White,
    Color::Green,
    Color::Blue,
    Color::Cyan,
    Color::Red,
    Color::Yellow,
    Color::Magenta,
    Color::Black,
];

fn clear_attributes(cell: &mut Cell) {
    cell.underline = false;
    cell.italic = false;
    cell.flash = false;
}

/// Resolve one row of a channel memory into cells.
///
/// Every row starts white on black; attributes then follow the PAC and
/// spacing attribute codes stored in the row. Cells without a character
/// are transparent spaces.
pub fn format_row(channel: &Channel, buffer: usize, row: usize, to_upper: bool) -> [Cell; COLUMNS] {
    let mut out = [Cell::default(); COLUMNS];
    if !channel.is_row_dirty(buffer, row) {
        return out;
    }

    let text = &channel.memory(buffer)[row];
    let mut ac = Cell { opacity: Opacity::Opaque, ..Cell::default() };

    for (i, &c) in text.iter().enumerate().take(LAST_COLUMN + 1) {
        ac.ch = ' ';

        match c {
            0 => {
                if i >= FIRST_COLUMN {
                    let mut cell = Cell { opacity: Opacity::TransparentSpace, ..ac };
                    clear_attributes(&mut cell);
                    out[i - FIRST_COLUMN] = cell;
                }
                continue;
            }
            // Background attributes, 001 c000 010 xxxt.
            0x1020..=0x102F => {
                ac.background = COLOR_MAP[((c >> 1) & 7) as usize];
                ac.opacity = if c & 1 != 0 { Opacity::SemiTransparent } else { Opacity::Opaque };
            }
            0x0001..=0x103F => {
                // Lower case was probably sent on purpose.
                let upper = to_upper && !matches!(c, 0x61..=0x7A | 0x7E);
                ac.ch = caption_unicode(c, upper).unwrap_or(' ');
            }
            // PAC, a non-spacing attribute.
            0x1040..=0x111F => {
                if i >= FIRST_COLUMN {
                    let mut cell = Cell { opacity: Opacity::TransparentSpace, ..ac };
                    clear_attributes(&mut cell);
                    out[i - FIRST_COLUMN] = cell;
                }
                ac.underline = c & 1 != 0;
                ac.italic = false;
                if c & 0x10 != 0 {
                    ac.foreground = Color::White;
                } else {
                    match (c >> 1) & 7 {
                        7 => {
                            ac.foreground = Color::White;
                            ac.italic = true;
                        }
                        color => ac.foreground = COLOR_MAP[color as usize],
                    }
                }
                continue;
            }
            // Mid-row codes.
            0x1120..=0x112F => {
                clear_attributes(&mut ac);
                ac.underline = c & 1 != 0;
                match (c >> 1) & 7 {
                    7 => ac.italic = true,
                    color => ac.foreground = COLOR_MAP[color as usize],
                }
            }
            0x1130..=0x121F => ac.ch = caption_unicode(c, to_upper).unwrap_or(' '),
            // Extended sets carry both cases.
            0x1220..=0x1427 => ac.ch = caption_unicode(c, false).unwrap_or(' '),
            // FON
            0x1428..=0x172C => ac.flash = true,
            // BT
            0x172D => ac.opacity = Opacity::TransparentFull,
            // FA, FAU
            0x172E..=0x172F => {
                ac.underline = c & 1 != 0;
                ac.foreground = Color::Black;
            }
            _ => {}
        }

        if i < FIRST_COLUMN {
            continue;
        }
        let mut cell = ac;
        // Spacing attributes show as spaces, which are never underlined.
        if cell.ch == ' ' {
            clear_attributes(&mut cell);
        }
        out[i - FIRST_COLUMN] = cell;
    }
    out
}

/// Transcript text of a row: visible characters with trailing blanks
/// removed.
pub fn row_text(channel: &Channel, buffer: usize, row: usize) -> String {
    let cells = format_row(channel, buffer, row, false);
    let text: String = cells.iter().map(|c| if c.is_visible() { c.ch } else { ' ' }).collect();
    text.trim_end().to_string()
}

/// Render the displayed memory of a channel as a 15 x 32 page.
pub fn render_channel(channel: &Channel, to_upper: bool) -> Page {
    let to_upper = to_upper && channel.is_upper_case();
    let mut page = Page::new(channel.pgno(), 0, ROWS, COLUMNS);
    for row in 0..ROWS {
        if let Some(out) = page.row_mut(row) {
            out.copy_from_slice(&format_row(channel, channel.displayed(), row, to_upper));
        }
    }
    page
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paint_on(codes: &[(u16, bool, bool)]) -> Channel {
        let mut cc = Channel::new(1);
        cc.resume_direct_captioning(0);
        cc.preamble_address_code(0x11, 0x40, 0);
        for &(c, displayable, backspace) in codes {
            cc.put_char(c, displayable, backspace, 0);
        }
        cc
    }

    #[test]
    fn test_clean_row_is_transparent() {
        let cc = Channel::new(1);
        let row = format_row(&cc, 0, 0, false);
        assert!(row.iter().all(|c| c.opacity == Opacity::TransparentSpace && c.ch == ' '));
    }

    #[test]
    fn test_text_is_opaque_white_on_black() {
        let cc = paint_on(&[(b'H' as u16, true, false), (b'i' as u16, true, false)]);
        let row = format_row(&cc, 0, 0, false);
        assert_eq!(row[0].ch, 'H');
        assert_eq!(row[0].foreground, Color::White);
        assert_eq!(row[0].background, Color::Black);
        assert_eq!(row[0].opacity, Opacity::Opaque);
        assert_eq!(row[1].ch, 'i');
        assert_eq!(row[2].opacity, Opacity::TransparentSpace);
    }

    #[test]
    fn test_mid_row_color_and_italics() {
        // Red underline, then italics.
        let cc = paint_on(&[
            (0x1129, false, false),
            (b'R' as u16, true, false),
            (0x112E, false, false),
            (b'I' as u16, true, false),
        ]);
        let row = format_row(&cc, 0, 0, false);
        // Spacing attributes render as plain spaces.
        assert_eq!(row[0].ch, ' ');
        assert!(!row[0].underline);
        assert_eq!(row[1].foreground, Color::Red);
        assert!(row[1].underline);
        assert!(row[3].italic);
        assert!(!row[3].underline);
        assert_eq!(row[3].foreground, Color::Red);
    }

    #[test]
    fn test_pac_color_applies_to_row() {
        let mut cc = Channel::new(1);
        cc.resume_direct_captioning(0);
        // Row 0, cyan.
        cc.preamble_address_code(0x11, 0x46, 0);
        cc.put_char(b'C' as u16, true, false, 0);
        let row = format_row(&cc, 0, 0, false);
        assert_eq!(row[0].foreground, Color::Cyan);
    }

    #[test]
    fn test_flash_background_and_black_foreground() {
        let cc = paint_on(&[
            (b' ' as u16, true, false),
            (0x1029, false, true),
            (b'A' as u16, true, false),
            (0x1428, false, false),
            (b'B' as u16, true, false),
            (b' ' as u16, true, false),
            (0x172F, false, true),
            (b'C' as u16, true, false),
        ]);
        let row = format_row(&cc, 0, 0, false);
        assert_eq!(row[1].background, Color::Red);
        assert_eq!(row[1].opacity, Opacity::SemiTransparent);
        assert!(row[3].flash);
        assert_eq!(row[5].foreground, Color::Black);
        assert!(row[5].underline);
    }

    #[test]
    fn test_to_upper_spares_lower_case_letters() {
        let cc = paint_on(&[(0x2A, true, false), (b'a' as u16, true, false), (0x1138, true, false)]);
        let row = format_row(&cc, 0, 0, true);
        assert_eq!(row[0].ch, 'Á');
        assert_eq!(row[1].ch, 'a');
        assert_eq!(row[2].ch, 'À');
    }

    #[test]
    fn test_render_channel() {
        let cc = paint_on(&[(b'O' as u16, true, false), (b'K' as u16, true, false)]);
        let page = render_channel(&cc, false);
        assert_eq!((page.pgno, page.rows, page.columns), (1, 15, 32));
        assert_eq!(page.row_text(0), "OK");
        assert!(page.window.is_none());
    }
}
