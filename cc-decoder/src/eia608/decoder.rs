//! Line-21 byte pair dispatcher.

use cc_protocol::{unpar_pair, CaptionEvent, Field};
use log::{debug, trace};

use crate::event::DecoderEvent;

use super::channel::{Channel, Mode};

/// CC1-CC4 followed by T1-T4.
pub const CHANNELS: usize = 8;

/// EIA-608 decoder for both fields of line 21.
///
/// Each field addresses its own pair of caption and text channels: field 1
/// carries CC1/CC2/T1/T2, field 2 carries CC3/CC4/T3/T4 and XDS.
#[derive(Debug, Clone)]
pub struct Eia608Decoder {
    channels: [Channel; CHANNELS],
    /// Channel last selected on each field.
    current: [Option<usize>; 2],
    /// Control code pair expected to repeat on each field.
    expect_ctrl: [Option<[u8; 2]>; 2],
    in_xds: bool,
    error_history: u32,
}

impl Default for Eia608Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Eia608Decoder {
    pub fn new() -> Self {
        Self {
            channels: std::array::from_fn(|i| Channel::new(i as u32 + 1)),
            current: [None; 2],
            expect_ctrl: [None; 2],
            in_xds: false,
            error_history: 0,
        }
    }

    pub fn reset(&mut self) {
        self.channels.iter_mut().for_each(Channel::reset);
        self.current = [None; 2];
        self.expect_ctrl = [None; 2];
        self.in_xds = false;
    }

    /// Channel for page 1..=8.
    pub fn channel(&self, pgno: u32) -> Option<&Channel> {
        self.channels.get((pgno as usize).checked_sub(1)?)
    }

    /// One bit per pair received, most recent in bit 0, set if the pair
    /// decoded without error.
    pub fn error_history(&self) -> u32 {
        self.error_history
    }

    /// Whether field 2 is inside an XDS packet.
    pub fn in_xds(&self) -> bool {
        self.in_xds
    }

    /// Decode one byte pair.
    ///
    /// Returns the parity-stripped pair when it belongs to the XDS stream
    /// of field 2; those bytes are not caption data.
    pub fn feed(&mut self, pair: [u8; 2], field: Field, pts: i64) -> Option<[u8; 2]> {
        let f = field.index();
        let (c1, c2) = unpar_pair(pair);

        let Some(c1) = c1 else {
            self.parity_error(f);
            return None;
        };

        // A control code is sent twice; the repeat was already acted upon.
        if let (Some(expected), Some(c2)) = (self.expect_ctrl[f], c2) {
            if expected == [c1, c2] {
                self.expect_ctrl[f] = None;
                self.record(true);
                return None;
            }
        }

        if (0x10..0x20).contains(&c1) {
            if field == Field::Second {
                self.in_xds = false;
            }
            let Some(c2) = c2.filter(|&c| c >= 0x20) else {
                // Invalid control code, hope it repeats.
                self.parity_error(f);
                return None;
            };
            self.control_code(c1, c2, field, pts);
            self.expect_ctrl[f] = Some([c1, c2]);
            self.record(true);
            return None;
        }

        self.expect_ctrl[f] = None;

        let mut c1 = c1;
        if field == Field::Second {
            if c1 == 0x0F {
                self.in_xds = false;
                self.record(c2.is_some());
                return c2.map(|c2| [c1, c2]);
            }
            if (0x01..0x0F).contains(&c1) {
                // Also interrupts a text mode transmission.
                self.in_xds = true;
                self.record(c2.is_some());
                return c2.map(|c2| [c1, c2]);
            }
            if self.in_xds {
                self.record(c2.is_some());
                return c2.map(|c2| [c1, c2]);
            }
        }
        if c1 < 0x10 {
            // A non-printing first byte alone is ignored.
            c1 = 0;
        }

        let Some(current) = self.current[f] else {
            self.record(true);
            return None;
        };
        let channel = &mut self.channels[(current & 5) + f * 2];
        let mut ok = channel.character(Some(c1), pts);
        ok &= channel.character(c2, pts);
        self.record(ok);
        None
    }

    fn record(&mut self, ok: bool) {
        self.error_history = self.error_history << 1 | ok as u32;
    }

    fn parity_error(&mut self, f: usize) {
        self.expect_ctrl[f] = None;
        self.record(false);
    }

    fn switch_channel(&mut self, f: usize, index: usize) -> &mut Channel {
        if self.current[f] != Some(index) {
            debug!("field {}: switching to page {}", f + 1, index + 1);
        }
        self.current[f] = Some(index);
        &mut self.channels[index]
    }

    fn control_code(&mut self, c1: u8, c2: u8, field: Field, pts: i64) {
        let f = field.index();
        // Caption or text, field, primary or secondary channel.
        let num = (self.current[f].unwrap_or(0) & 4) + f * 2 + ((c1 >> 3) & 1) as usize;
        let selected = self.current[f].is_some();

        if c2 >= 0x40 {
            if selected {
                self.channels[num].preamble_address_code(c1, c2, pts);
            }
            return;
        }

        let active = selected && self.channels[num].mode() != Mode::Unknown;
        let channel = &mut self.channels[num];

        match c1 & 7 {
            0 if active && c2 < 0x30 => {
                // Background attribute, replaces the preceding space.
                channel.put_char(0x1000 | c2 as u16, false, true, pts);
            }
            1 if active => {
                if c2 < 0x30 {
                    // Mid-row code, a spacing attribute.
                    channel.put_char(0x1100 | c2 as u16, false, false, pts);
                } else if c2 == 0x39 {
                    // Transparent space.
                    channel.put_char(0, false, false, pts);
                } else {
                    channel.put_char(0x1100 | c2 as u16, true, false, pts);
                }
            }
            2 | 3 if active => {
                // Extended character, replaces the preceding basic one.
                let c = ((c1 as u16) << 8 | c2 as u16) & 0x777F;
                channel.put_char(c, true, true, pts);
            }
            4 | 5 if c2 < 0x30 => self.misc_control_code(c2, num, f, pts),
            7 if active => channel.ext_control(c2, pts),
            _ => trace!("ignoring control code {:02X} {:02X}", c1, c2),
        }
    }

    fn misc_control_code(&mut self, c2: u8, num: usize, f: usize, pts: i64) {
        let caption = num & 3;
        let text = 4 + (num & 3);
        let active = self.current[f].is_some() && self.channels[num].mode() != Mode::Unknown;

        match c2 & 0x0F {
            // RCL
            0x0 => self.switch_channel(f, caption).resume_caption_loading(pts),
            // BS
            0x1 if active => self.channels[num].backspace(),
            // DER
            0x4 if active => self.channels[num].delete_to_end_of_row(),
            // RU2-RU4
            0x5..=0x7 => self.switch_channel(f, caption).roll_up(c2, pts),
            // FON, a spacing attribute.
            0x8 if active => self.channels[num].put_char(0x1428, false, false, pts),
            // RDC
            0x9 => self.switch_channel(f, caption).resume_direct_captioning(pts),
            // TR
            0xA => self.switch_channel(f, text).text_restart(pts),
            // RTD
            0xB => {
                self.switch_channel(f, text);
            }
            // EDM and ENM act on the addressed caption channel without
            // selecting it.
            0xC => self.channels[caption].erase_displayed(pts),
            0xD if self.current[f].is_some() => self.channels[num].carriage_return(pts),
            0xE => self.channels[caption].erase_non_displayed(),
            // EOC
            0xF => self.switch_channel(f, caption).end_of_caption(pts),
            _ => {}
        }
    }

    /// Collect the events raised by the last byte pairs.
    pub fn drain_events(&mut self, pts: i64, events: &mut Vec<DecoderEvent>) {
        for channel in &mut self.channels {
            events.extend(channel.take_lines().into_iter().map(DecoderEvent::Stream));
            if let Some(rolling) = channel.take_update() {
                events.push(DecoderEvent::Caption(CaptionEvent {
                    pgno: channel.pgno(),
                    first_seen: false,
                    rolling,
                    pts,
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_protocol::par8;

    fn pair(c1: u8, c2: u8) -> [u8; 2] {
        [par8(c1), par8(c2)]
    }

    fn feed_text(dec: &mut Eia608Decoder, field: Field, text: &str) {
        for chunk in text.as_bytes().chunks(2) {
            let c2 = chunk.get(1).copied().unwrap_or(0);
            dec.feed(pair(chunk[0], c2), field, 0);
        }
    }

    fn control(dec: &mut Eia608Decoder, field: Field, c1: u8, c2: u8) {
        dec.feed(pair(c1, c2), field, 0);
        dec.feed(pair(c1, c2), field, 0);
    }

    fn text_of(dec: &Eia608Decoder, pgno: u32, row: usize) -> String {
        let channel = dec.channel(pgno).unwrap();
        super::super::format::row_text(channel, channel.displayed(), row)
    }

    #[test]
    fn test_pop_on_caption() {
        let mut dec = Eia608Decoder::new();
        control(&mut dec, Field::First, 0x14, 0x20); // RCL
        control(&mut dec, Field::First, 0x11, 0x40); // PAC row 0, white
        feed_text(&mut dec, Field::First, "HELLO");
        assert_eq!(text_of(&dec, 1, 0), "");
        control(&mut dec, Field::First, 0x14, 0x2F); // EOC

        let page = super::super::format::render_channel(dec.channel(1).unwrap(), false);
        assert_eq!(page.row_text(0), "HELLO");
        let cell = page.row(0).unwrap()[0];
        assert_eq!(cell.opacity, crate::page::Opacity::Opaque);
        assert_eq!(cell.foreground, crate::page::Color::White);
        assert_eq!(cell.background, crate::page::Color::Black);

        // The buffer shown before EOC is now the blank loading buffer.
        let channel = dec.channel(1).unwrap();
        let hidden = channel.displayed() ^ 1;
        for row in 0..15 {
            assert_eq!(super::super::format::row_text(channel, hidden, row), "");
        }

        let mut events = Vec::new();
        dec.drain_events(7, &mut events);
        assert!(events.iter().any(|e| matches!(e, DecoderEvent::Stream(l) if l.text == "HELLO")));
        assert!(events
            .iter()
            .any(|e| matches!(e, DecoderEvent::Caption(c) if c.pgno == 1 && !c.rolling)));

        // Loading the next caption leaves the shown one alone.
        control(&mut dec, Field::First, 0x14, 0x20);
        control(&mut dec, Field::First, 0x11, 0x40);
        feed_text(&mut dec, Field::First, "BYE");
        assert_eq!(text_of(&dec, 1, 0), "HELLO");
        let channel = dec.channel(1).unwrap();
        assert_eq!(super::super::format::row_text(channel, channel.displayed() ^ 1, 0), "BYE");
    }

    #[test]
    fn test_redundant_control_code_applied_once() {
        let mut dec = Eia608Decoder::new();
        control(&mut dec, Field::First, 0x14, 0x29); // RDC
        control(&mut dec, Field::First, 0x11, 0x40);
        feed_text(&mut dec, Field::First, "ABC");

        // BS sent twice deletes one character.
        control(&mut dec, Field::First, 0x14, 0x21);
        assert_eq!(text_of(&dec, 1, 0), "AB");

        // A third copy is a new command.
        dec.feed(pair(0x14, 0x21), Field::First, 0);
        assert_eq!(text_of(&dec, 1, 0), "A");

        // Different pairs back to back are both applied.
        feed_text(&mut dec, Field::First, "BC");
        dec.feed(pair(0x14, 0x21), Field::First, 0);
        dec.feed(pair(0x17, 0x21), Field::First, 0); // TO1
        assert_eq!(dec.channel(1).unwrap().cursor().1, 4);
    }

    #[test]
    fn test_parity_error_voids_expected_repeat() {
        let mut dec = Eia608Decoder::new();
        control(&mut dec, Field::First, 0x14, 0x29);
        control(&mut dec, Field::First, 0x11, 0x40);
        feed_text(&mut dec, Field::First, "ABC");

        dec.feed(pair(0x14, 0x21), Field::First, 0);
        dec.feed([0x14, par8(0x21)], Field::First, 0);
        assert_eq!(dec.error_history() & 1, 0);
        dec.feed(pair(0x14, 0x21), Field::First, 0);
        assert_eq!(text_of(&dec, 1, 0), "A");
    }

    #[test]
    fn test_roll_up_three_carriage_returns() {
        let mut dec = Eia608Decoder::new();
        control(&mut dec, Field::First, 0x14, 0x25); // RU2
        for line in ["ONE", "TWO", "THREE"] {
            feed_text(&mut dec, Field::First, line);
            control(&mut dec, Field::First, 0x14, 0x2D); // CR
        }
        assert_eq!(text_of(&dec, 1, 13), "THREE");
        assert_eq!(text_of(&dec, 1, 14), "");
        assert_eq!(text_of(&dec, 1, 12), "");

        let mut events = Vec::new();
        dec.drain_events(0, &mut events);
        let lines: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                DecoderEvent::Stream(l) => Some(l.text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(lines, ["ONE", "TWO", "THREE"]);
        assert!(events.iter().any(|e| matches!(e, DecoderEvent::Caption(c) if c.rolling)));
    }

    #[test]
    fn test_secondary_channel_and_field_two() {
        let mut dec = Eia608Decoder::new();
        control(&mut dec, Field::First, 0x1C, 0x29); // RDC on CC2
        control(&mut dec, Field::First, 0x19, 0x40);
        feed_text(&mut dec, Field::First, "CC2");
        assert_eq!(text_of(&dec, 2, 0), "CC2");

        control(&mut dec, Field::Second, 0x15, 0x29); // RDC on CC3
        control(&mut dec, Field::Second, 0x11, 0x40);
        feed_text(&mut dec, Field::Second, "CC3");
        assert_eq!(text_of(&dec, 3, 0), "CC3");
        assert_eq!(text_of(&dec, 1, 0), "");
    }

    #[test]
    fn test_text_channel() {
        let mut dec = Eia608Decoder::new();
        control(&mut dec, Field::First, 0x14, 0x2A); // TR
        feed_text(&mut dec, Field::First, "T1");
        control(&mut dec, Field::First, 0x14, 0x2D); // CR
        feed_text(&mut dec, Field::First, "NEXT");
        assert_eq!(text_of(&dec, 5, 0), "T1");
        assert_eq!(text_of(&dec, 5, 1), "NEXT");
    }

    #[test]
    fn test_special_and_extended_characters() {
        let mut dec = Eia608Decoder::new();
        control(&mut dec, Field::First, 0x14, 0x29);
        control(&mut dec, Field::First, 0x11, 0x40);
        control(&mut dec, Field::First, 0x11, 0x37); // music note
        feed_text(&mut dec, Field::First, "E");
        control(&mut dec, Field::First, 0x12, 0x21); // É replaces E
        assert_eq!(text_of(&dec, 1, 0), "♪É");
    }

    #[test]
    fn test_xds_bytes_are_routed_out() {
        let mut dec = Eia608Decoder::new();
        assert_eq!(dec.feed(pair(0x01, 0x03), Field::Second, 0), Some([0x01, 0x03]));
        assert!(dec.in_xds());
        assert_eq!(dec.feed(pair(b'A', b'B'), Field::Second, 0), Some([b'A', b'B']));
        assert_eq!(dec.feed(pair(0x0F, 0x1D), Field::Second, 0), Some([0x0F, 0x1D]));
        assert!(!dec.in_xds());
        assert_eq!(dec.feed(pair(b'A', b'B'), Field::Second, 0), None);

        // Field 1 never carries XDS.
        assert_eq!(dec.feed(pair(0x01, 0x03), Field::First, 0), None);
    }

    #[test]
    fn test_caption_control_code_ends_xds() {
        let mut dec = Eia608Decoder::new();
        dec.feed(pair(0x01, 0x03), Field::Second, 0);
        dec.feed(pair(0x15, 0x2C), Field::Second, 0);
        assert!(!dec.in_xds());
    }

    #[test]
    fn test_erase_displayed_memory_keeps_channel() {
        let mut dec = Eia608Decoder::new();
        control(&mut dec, Field::First, 0x14, 0x29);
        control(&mut dec, Field::First, 0x11, 0x40);
        feed_text(&mut dec, Field::First, "GONE");
        control(&mut dec, Field::First, 0x14, 0x2C); // EDM
        assert_eq!(text_of(&dec, 1, 0), "");
        assert_eq!(dec.channel(1).unwrap().mode(), Mode::PaintOn);
    }

    #[test]
    fn test_reset() {
        let mut dec = Eia608Decoder::new();
        control(&mut dec, Field::First, 0x14, 0x25);
        dec.reset();
        assert_eq!(dec.channel(1).unwrap().mode(), Mode::Unknown);
        assert_eq!(dec.channel(8).unwrap().mode(), Mode::Text);
        assert!(dec.channel(9).is_none());
        assert!(dec.channel(0).is_none());
    }
}
