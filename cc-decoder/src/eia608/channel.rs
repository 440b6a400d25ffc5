//! State of one EIA-608 caption or text channel.

use log::debug;

use crate::event::StreamLine;

use super::charset::SOLID_BLOCK;
use super::format;

pub const ROWS: usize = 15;
pub const COLUMNS: usize = 32;
pub const FIRST_ROW: usize = 0;
pub const LAST_ROW: usize = ROWS - 1;
/// Column 0 only holds the PAC preceding the first character of a row.
pub const FIRST_COLUMN: usize = 1;
pub const LAST_COLUMN: usize = COLUMNS;

/// Snapshot buffer used to detect paint-on rows that changed.
const SNAPSHOT: usize = 2;

/// PAC row for `(c1 & 7) * 2 + ((c2 >> 5) & 1)`.
const PAC_ROW_MAP: [Option<usize>; 16] = [
    Some(10),
    None,
    Some(0),
    Some(1),
    Some(2),
    Some(3),
    Some(11),
    Some(12),
    Some(13),
    Some(14),
    Some(4),
    Some(5),
    Some(6),
    Some(7),
    Some(8),
    Some(9),
];

pub type Row = [u16; COLUMNS + 1];
pub type Memory = [Row; ROWS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No EOC, RCL, RDC or RUx received yet.
    Unknown,
    RollUp,
    PopOn,
    PaintOn,
    /// Text channels are always in this mode.
    Text,
}

#[derive(Debug, Clone)]
pub struct Channel {
    pgno: u32,
    mode: Mode,
    curr_row: usize,
    curr_column: usize,
    window_rows: usize,
    displayed: usize,
    memory: [Memory; 3],
    dirty: [u16; 3],
    last_pac: u16,
    uppercase_predictor: u32,
    first_char_pts: Option<i64>,
    update: bool,
    rolling: bool,
    lines: Vec<StreamLine>,
}

fn row_is_empty(row: &Row) -> bool {
    row[FIRST_COLUMN..=LAST_COLUMN].iter().all(|&c| c == 0)
}

/// Reduce a stored code to what a transcript sees: PACs vanish and
/// spacing attributes read as a space.
fn transcript_code(c: u16) -> u16 {
    match c {
        0x1040..=0x111F => 0,
        0x1120..=0x112F => 0x20,
        c if c >= 0x1428 => 0x20,
        c => c,
    }
}

impl Channel {
    pub fn new(pgno: u32) -> Self {
        let mut channel = Self {
            pgno,
            mode: Mode::Unknown,
            curr_row: LAST_ROW,
            curr_column: FIRST_COLUMN,
            window_rows: 4,
            displayed: 0,
            memory: [[[0; COLUMNS + 1]; ROWS]; 3],
            dirty: [0; 3],
            last_pac: 0,
            uppercase_predictor: 0,
            first_char_pts: None,
            update: false,
            rolling: false,
            lines: Vec::new(),
        };
        channel.reset();
        channel
    }

    /// Page number, 1..=4 for CC1-CC4 and 5..=8 for T1-T4.
    pub fn pgno(&self) -> u32 {
        self.pgno
    }

    pub fn is_text(&self) -> bool {
        self.pgno > 4
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.curr_row, self.curr_column)
    }

    pub fn window_rows(&self) -> usize {
        self.window_rows
    }

    /// Whether the text seen so far looks like upper case only.
    pub fn is_upper_case(&self) -> bool {
        self.uppercase_predictor > 0
    }

    pub(super) fn displayed(&self) -> usize {
        self.displayed
    }

    pub(super) fn memory(&self, buffer: usize) -> &Memory {
        &self.memory[buffer]
    }

    pub(super) fn is_row_dirty(&self, buffer: usize, row: usize) -> bool {
        self.dirty[buffer] & (1 << row) != 0
    }

    pub fn reset(&mut self) {
        if self.is_text() {
            // Text memory starts at the topmost row.
            self.mode = Mode::Text;
            self.curr_row = FIRST_ROW;
            self.window_rows = 0;
        } else {
            // Something suitable for roll-up.
            self.mode = Mode::Unknown;
            self.curr_row = LAST_ROW;
            self.window_rows = 4;
        }
        self.curr_column = FIRST_COLUMN;
        self.displayed = 0;
        self.memory = [[[0; COLUMNS + 1]; ROWS]; 3];
        self.dirty = [0; 3];
        self.last_pac = 0;
        self.uppercase_predictor = 0;
        self.first_char_pts = None;
        self.update = false;
        self.rolling = false;
        self.lines.clear();
    }

    /// Returns the pending display update and whether it starts a roll.
    pub fn take_update(&mut self) -> Option<bool> {
        if !self.update {
            return None;
        }
        self.update = false;
        Some(std::mem::take(&mut self.rolling))
    }

    pub fn take_lines(&mut self) -> Vec<StreamLine> {
        std::mem::take(&mut self.lines)
    }

    /// Buffer that receives characters in the current mode.
    fn write_buffer(&self) -> usize {
        self.displayed ^ (self.mode == Mode::PopOn) as usize
    }

    fn refresh_dirty(&mut self, buffer: usize) {
        self.dirty[buffer] = self.memory[buffer]
            .iter()
            .enumerate()
            .filter(|(_, row)| !row_is_empty(row))
            .fold(0, |bits, (row, _)| bits | 1 << row);
    }

    fn stream_rows(&mut self, first: usize, last: usize, pts: i64) {
        let pts = self.first_char_pts.unwrap_or(pts);
        for row in first..=last {
            let text = format::row_text(self, self.displayed, row);
            if text.is_empty() {
                continue;
            }
            self.lines.push(StreamLine { pgno: self.pgno, text, pts });
        }
        self.first_char_pts = None;
    }

    fn stream_current_row(&mut self, pts: i64) {
        let row = self.curr_row;
        if self.is_row_dirty(self.displayed, row) {
            self.stream_rows(row, row, pts);
        }
    }

    /// Report the current row if it changed since the last report. Paint-on
    /// captioners may rewrite rows in place, so CR alone does not tell when
    /// a line is complete.
    fn stream_if_changed(&mut self, pts: i64) {
        let buffer = self.displayed;
        let row = self.curr_row;
        if !self.is_row_dirty(buffer, row) {
            return;
        }
        let current = &self.memory[buffer][row];
        let snapshot = &self.memory[SNAPSHOT][row];
        let changed = (FIRST_COLUMN..=LAST_COLUMN)
            .any(|i| transcript_code(current[i]) != transcript_code(snapshot[i]));
        if changed {
            self.stream_rows(row, row, pts);
            self.memory[SNAPSHOT][row] = self.memory[buffer][row];
            self.dirty[SNAPSHOT] = self.dirty[buffer];
        }
    }

    /// Store a character or attribute code at the cursor.
    ///
    /// Displayable characters inherit the last PAC when nothing precedes
    /// them on the row. `backspace` overwrites the cell left of the cursor
    /// instead of advancing.
    pub(super) fn put_char(&mut self, c: u16, displayable: bool, backspace: bool, pts: i64) {
        let buffer = self.write_buffer();
        let row = self.curr_row;
        let mut column = self.curr_column;

        if backspace {
            if column > FIRST_COLUMN {
                column -= 1;
            }
        } else if column < LAST_COLUMN {
            self.curr_column = column + 1;
        }

        let last_pac = self.last_pac;
        let text = &mut self.memory[buffer][row];
        text[column] = c;

        if self.mode != Mode::PopOn {
            self.update = true;
        }

        if displayable {
            if column == FIRST_COLUMN || text[column - 1] == 0 {
                text[column - 1] = last_pac;
            }
            if (b'a' as u16..=b'z' as u16).contains(&c) {
                self.uppercase_predictor = 0;
            } else if (b'A' as u16..=b'Z' as u16).contains(&c) {
                self.uppercase_predictor = self.uppercase_predictor.saturating_add(1);
            }
        } else if c == 0 {
            // Transparent space.
            if row_is_empty(text) {
                self.dirty[buffer] &= !(1 << row);
            }
            return;
        }

        self.dirty[buffer] |= 1 << row;
        if self.first_char_pts.is_none() {
            self.first_char_pts = Some(pts);
        }
    }

    /// A printable byte or a parity failure in its place.
    pub(super) fn character(&mut self, c: Option<u8>, pts: i64) -> bool {
        match c {
            Some(0) => true,
            None => {
                if self.mode != Mode::Unknown {
                    self.put_char(SOLID_BLOCK, true, false, pts);
                }
                false
            }
            Some(c) if c < 0x20 => false,
            Some(c) => {
                if self.mode != Mode::Unknown {
                    self.put_char(c as u16, true, false, pts);
                }
                true
            }
        }
    }

    /// Extended control codes, 001 c111 01x xxxx.
    pub(super) fn ext_control(&mut self, c2: u8, pts: i64) {
        match c2 {
            // TO1-TO3
            0x21..=0x23 => {
                self.curr_column = (self.curr_column + (c2 & 3) as usize).min(LAST_COLUMN);
            }
            // Character set selection, unsupported.
            0x24..=0x2A => {}
            // BT, FA, FAU
            0x2D..=0x2F => self.put_char(0x1700 | c2 as u16, false, true, pts),
            _ => {}
        }
    }

    pub(super) fn erase_memory(&mut self, buffer: usize) {
        if self.dirty[buffer] != 0 {
            self.memory[buffer] = [[0; COLUMNS + 1]; ROWS];
            self.dirty[buffer] = 0;
            if buffer == self.displayed {
                self.update = true;
            }
        }
    }

    pub(super) fn erase_non_displayed(&mut self) {
        self.erase_memory(self.displayed ^ 1);
    }

    /// EDM
    pub(super) fn erase_displayed(&mut self, pts: i64) {
        match self.mode {
            Mode::Unknown | Mode::PopOn => {}
            Mode::RollUp => self.stream_current_row(pts),
            Mode::PaintOn => self.stream_if_changed(pts),
            Mode::Text => return,
        }
        self.erase_memory(self.displayed);
    }

    /// TR
    pub(super) fn text_restart(&mut self, pts: i64) {
        self.stream_current_row(pts);
        self.erase_memory(self.displayed);
        self.curr_row = FIRST_ROW;
        self.curr_column = FIRST_COLUMN;
    }

    /// RDC. Does not erase memory or move the cursor.
    pub(super) fn resume_direct_captioning(&mut self, pts: i64) {
        match self.mode {
            Mode::RollUp | Mode::Unknown | Mode::PopOn => {
                if self.mode == Mode::RollUp {
                    self.stream_current_row(pts);
                }
                self.memory[SNAPSHOT] = self.memory[self.displayed];
                self.dirty[SNAPSHOT] = self.dirty[self.displayed];
            }
            Mode::PaintOn => {}
            Mode::Text => return,
        }
        self.mode = Mode::PaintOn;
    }

    /// Shrink the roll-up window, erasing the rows that drop out of it.
    fn resize_window(&mut self, new_rows: usize) {
        let buffer = self.displayed;
        if self.dirty[buffer] == 0 {
            return;
        }
        let row1 = self.curr_row + 1;
        let max_rows = row1 - FIRST_ROW;
        let old_rows = self.window_rows.min(max_rows);
        let new_rows = new_rows.min(max_rows);
        if new_rows == 0 || new_rows >= old_rows {
            return;
        }
        for row in &mut self.memory[buffer][row1 - old_rows..row1 - new_rows] {
            *row = [0; COLUMNS + 1];
        }
        self.refresh_dirty(buffer);
        self.update = true;
    }

    /// RU2, RU3, RU4
    pub(super) fn roll_up(&mut self, c2: u8, pts: i64) {
        let window_rows = ((c2 & 7) - 3) as usize;
        match self.mode {
            Mode::RollUp | Mode::Unknown => {
                if self.mode == Mode::RollUp {
                    self.resize_window(window_rows);
                }
                // No cursor movement, no erasing.
                self.mode = Mode::RollUp;
                self.window_rows = window_rows;
            }
            Mode::PaintOn | Mode::PopOn => {
                if self.mode == Mode::PaintOn {
                    self.stream_if_changed(pts);
                }
                self.mode = Mode::RollUp;
                self.window_rows = window_rows;
                self.curr_row = LAST_ROW;
                self.curr_column = FIRST_COLUMN;
                self.erase_memory(self.displayed);
                self.erase_memory(self.displayed ^ 1);
            }
            Mode::Text => {}
        }
    }

    /// DER
    pub(super) fn delete_to_end_of_row(&mut self) {
        let buffer = self.write_buffer();
        let row = self.curr_row;
        if !self.is_row_dirty(buffer, row) {
            return;
        }
        let column = self.curr_column;
        let text = &mut self.memory[buffer][row];
        text[column..=LAST_COLUMN].fill(0);
        if text[FIRST_COLUMN..column].iter().all(|&c| c == 0) {
            self.dirty[buffer] &= !(1 << row);
        }
        self.update = true;
    }

    /// BS
    pub(super) fn backspace(&mut self) {
        let column = self.curr_column;
        if column <= FIRST_COLUMN {
            return;
        }
        let column = column - 1;
        self.curr_column = column;

        let buffer = self.write_buffer();
        let row = self.curr_row;
        let text = &mut self.memory[buffer][row];
        if text[column] != 0 {
            text[column] = 0;
            if row_is_empty(text) {
                self.dirty[buffer] &= !(1 << row);
            }
            self.update = true;
        }
    }

    /// RCL. Keeps memory and cursor.
    pub(super) fn resume_caption_loading(&mut self, pts: i64) {
        match self.mode {
            Mode::Unknown | Mode::PopOn => {}
            Mode::RollUp => self.stream_current_row(pts),
            Mode::PaintOn => self.stream_if_changed(pts),
            Mode::Text => return,
        }
        self.mode = Mode::PopOn;
    }

    /// Move the roll-up window with its content to a new base row.
    fn move_window(&mut self, new_base_row: usize) {
        let buffer = self.displayed;
        let curr_row = self.curr_row;
        if new_base_row == curr_row || self.dirty[buffer] == 0 {
            return;
        }

        let old_max_rows = curr_row + 1 - FIRST_ROW;
        let new_max_rows = new_base_row + 1 - FIRST_ROW;
        let copy = old_max_rows.min(new_max_rows).min(self.window_rows);
        let memory = &mut self.memory[buffer];

        let (erase_begin, erase_end) = if new_base_row < curr_row {
            let erase_begin = new_base_row + 1;
            let erase_end = curr_row + 1;
            memory.copy_within(erase_end - copy..erase_end, erase_begin - copy);
            (erase_begin, erase_end)
        } else {
            let erase_begin = curr_row + 1 - copy;
            let erase_end = new_base_row + 1 - copy;
            memory.copy_within(erase_begin..erase_begin + copy, erase_end);
            (erase_begin, erase_end)
        };
        for row in &mut memory[erase_begin..erase_end] {
            *row = [0; COLUMNS + 1];
        }

        self.refresh_dirty(buffer);
        self.update = true;
    }

    /// Preamble address code, 001 crrr 1ri xxxu.
    pub(super) fn preamble_address_code(&mut self, c1: u8, c2: u8, pts: i64) {
        let Some(mut row) = PAC_ROW_MAP[((c1 & 7) * 2 + ((c2 >> 5) & 1)) as usize] else {
            return;
        };

        match self.mode {
            Mode::Unknown => return,
            Mode::RollUp => {
                // The base row must leave room for the whole window.
                if self.window_rows > row + 1 {
                    row = self.window_rows - 1;
                }
                self.move_window(row);
                self.curr_row = row;
            }
            Mode::PaintOn | Mode::PopOn => {
                if self.mode == Mode::PaintOn {
                    self.stream_if_changed(pts);
                }
                self.curr_row = row;
            }
            // PACs do not change the row in text mode.
            Mode::Text => {}
        }

        if c2 & 0x10 != 0 {
            self.curr_column = FIRST_COLUMN + (c2 & 0x0E) as usize * 2;
        }

        // Non-spacing attribute for the next character.
        self.last_pac = 0x1000 | c2 as u16;
    }

    /// EOC. Swaps the memories and switches to pop-on.
    pub(super) fn end_of_caption(&mut self, pts: i64) {
        match self.mode {
            Mode::Unknown | Mode::PopOn => {}
            Mode::RollUp => self.stream_current_row(pts),
            Mode::PaintOn => self.stream_if_changed(pts),
            Mode::Text => return,
        }

        self.displayed ^= 1;
        self.mode = Mode::PopOn;
        debug!("CC{}: end of caption, displaying buffer {}", self.pgno, self.displayed);

        if self.dirty[self.displayed] != 0 {
            self.first_char_pts = Some(pts);
            self.stream_rows(FIRST_ROW, LAST_ROW, pts);
            self.update = true;
        }
    }

    /// CR
    pub(super) fn carriage_return(&mut self, pts: i64) {
        let buffer = self.displayed;
        let row = self.curr_row;

        let window_rows = match self.mode {
            Mode::Unknown | Mode::PopOn | Mode::PaintOn => return,
            Mode::RollUp => {
                // The cursor stays on the base row.
                self.curr_column = FIRST_COLUMN;
                self.last_pac = 0;
                if self.dirty[buffer] == 0 {
                    return;
                }
                (row + 1 - FIRST_ROW).min(self.window_rows)
            }
            Mode::Text => {
                self.curr_column = FIRST_COLUMN;
                self.last_pac = 0;
                if row != LAST_ROW {
                    self.stream_current_row(pts);
                    self.curr_row = row + 1;
                    return;
                }
                if self.dirty[buffer] == 0 {
                    return;
                }
                ROWS
            }
        };

        self.stream_current_row(pts);

        // Scroll the window up one row, the base row becomes empty.
        let first_row = row + 1 - window_rows;
        let memory = &mut self.memory[buffer];
        memory.copy_within(first_row + 1..=row, first_row);
        memory[row] = [0; COLUMNS + 1];

        self.refresh_dirty(buffer);
        self.update = true;
        self.rolling = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(channel: &mut Channel, text: &str) {
        for b in text.bytes() {
            channel.character(Some(b), 0);
        }
    }

    fn displayed_text(channel: &Channel, row: usize) -> String {
        format::row_text(channel, channel.displayed(), row)
    }

    #[test]
    fn test_reset_defaults() {
        let cc = Channel::new(1);
        assert_eq!(cc.mode(), Mode::Unknown);
        assert_eq!(cc.cursor(), (LAST_ROW, FIRST_COLUMN));
        assert_eq!(cc.window_rows(), 4);

        let text = Channel::new(5);
        assert_eq!(text.mode(), Mode::Text);
        assert_eq!(text.cursor(), (FIRST_ROW, FIRST_COLUMN));
    }

    #[test]
    fn test_unknown_mode_ignores_characters() {
        let mut cc = Channel::new(1);
        write(&mut cc, "HI");
        assert!(cc.take_update().is_none());
        assert_eq!(cc.dirty, [0; 3]);
    }

    #[test]
    fn test_pop_on_loads_hidden_memory() {
        let mut cc = Channel::new(1);
        cc.resume_caption_loading(0);
        cc.preamble_address_code(0x14, 0x70, 0);
        write(&mut cc, "AB");
        assert!(cc.take_update().is_none());
        assert_eq!(displayed_text(&cc, 14), "");

        cc.end_of_caption(90);
        assert_eq!(displayed_text(&cc, 14), "AB");
        assert_eq!(cc.take_update(), Some(false));
        let lines = cc.take_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!((lines[0].text.as_str(), lines[0].pts), ("AB", 90));
    }

    #[test]
    fn test_pac_inherited_by_first_character() {
        let mut cc = Channel::new(1);
        cc.resume_direct_captioning(0);
        // Row 0, indent 4.
        cc.preamble_address_code(0x11, 0x52, 0);
        assert_eq!(cc.cursor(), (0, 5));
        write(&mut cc, "X");
        assert_eq!(cc.memory(0)[0][4], 0x1052);
        assert_eq!(cc.memory(0)[0][5], b'X' as u16);
    }

    #[test]
    fn test_backspace_and_delete_to_end_of_row() {
        let mut cc = Channel::new(1);
        cc.resume_direct_captioning(0);
        cc.preamble_address_code(0x11, 0x40, 0);
        write(&mut cc, "ABCD");
        cc.backspace();
        assert_eq!(displayed_text(&cc, 0), "ABC");

        cc.curr_column = 2;
        cc.delete_to_end_of_row();
        assert_eq!(displayed_text(&cc, 0), "A");
        assert!(cc.is_row_dirty(0, 0));

        cc.curr_column = FIRST_COLUMN;
        cc.delete_to_end_of_row();
        assert!(!cc.is_row_dirty(0, 0));
    }

    #[test]
    fn test_roll_up_carriage_return() {
        let mut cc = Channel::new(1);
        cc.roll_up(0x25, 0);
        assert_eq!(cc.mode(), Mode::RollUp);
        assert_eq!(cc.window_rows(), 2);

        write(&mut cc, "ONE");
        cc.carriage_return(10);
        write(&mut cc, "TWO");
        cc.carriage_return(20);
        write(&mut cc, "THREE");

        assert_eq!(displayed_text(&cc, 13), "TWO");
        assert_eq!(displayed_text(&cc, 14), "THREE");
        assert_eq!(displayed_text(&cc, 12), "");
        let lines: Vec<String> = cc.take_lines().into_iter().map(|l| l.text).collect();
        assert_eq!(lines, ["ONE", "TWO"]);
        assert_eq!(cc.take_update(), Some(true));
    }

    #[test]
    fn test_roll_up_window_shrinks() {
        let mut cc = Channel::new(1);
        cc.roll_up(0x27, 0);
        for text in ["A", "B", "C"] {
            write(&mut cc, text);
            cc.carriage_return(0);
        }
        write(&mut cc, "D");
        assert_eq!(displayed_text(&cc, 11), "A");

        cc.roll_up(0x25, 0);
        assert_eq!(cc.window_rows(), 2);
        assert_eq!(displayed_text(&cc, 11), "");
        assert_eq!(displayed_text(&cc, 12), "");
        assert_eq!(displayed_text(&cc, 13), "C");
        assert_eq!(displayed_text(&cc, 14), "D");
    }

    #[test]
    fn test_roll_up_pac_moves_window() {
        let mut cc = Channel::new(1);
        cc.roll_up(0x25, 0);
        write(&mut cc, "UP");
        cc.carriage_return(0);
        write(&mut cc, "DOWN");

        // Row 4.
        cc.preamble_address_code(0x15, 0x40, 0);
        assert_eq!(cc.cursor().0, 4);
        assert_eq!(displayed_text(&cc, 3), "UP");
        assert_eq!(displayed_text(&cc, 4), "DOWN");
        assert_eq!(displayed_text(&cc, 14), "");

        // Row 0 is raised to leave room for two rows.
        cc.preamble_address_code(0x11, 0x40, 0);
        assert_eq!(cc.cursor().0, 1);
        assert_eq!(displayed_text(&cc, 0), "UP");
        assert_eq!(displayed_text(&cc, 1), "DOWN");
    }

    #[test]
    fn test_pop_on_to_roll_up_erases() {
        let mut cc = Channel::new(1);
        cc.resume_caption_loading(0);
        write(&mut cc, "HIDDEN");
        cc.end_of_caption(0);
        cc.roll_up(0x26, 0);
        assert_eq!(cc.dirty, [0, 0, 0]);
        assert_eq!(cc.cursor(), (LAST_ROW, FIRST_COLUMN));
    }

    #[test]
    fn test_text_mode_carriage_return() {
        let mut t = Channel::new(5);
        write(&mut t, "FIRST");
        t.carriage_return(0);
        assert_eq!(t.cursor(), (1, FIRST_COLUMN));
        write(&mut t, "SECOND");
        assert_eq!(displayed_text(&t, 0), "FIRST");
        assert_eq!(displayed_text(&t, 1), "SECOND");

        t.curr_row = LAST_ROW;
        write(&mut t, "LAST");
        t.carriage_return(0);
        assert_eq!(displayed_text(&t, 13), "LAST");
        assert_eq!(displayed_text(&t, 14), "");
        assert_eq!(displayed_text(&t, 0), "SECOND");

        t.text_restart(0);
        assert_eq!(t.dirty[0], 0);
        assert_eq!(t.cursor(), (FIRST_ROW, FIRST_COLUMN));
    }

    #[test]
    fn test_paint_on_streams_changed_rows_once() {
        let mut cc = Channel::new(1);
        cc.resume_direct_captioning(0);
        cc.preamble_address_code(0x11, 0x40, 0);
        write(&mut cc, "PAINT");
        cc.preamble_address_code(0x11, 0x40, 0);
        cc.preamble_address_code(0x11, 0x40, 0);
        let lines = cc.take_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "PAINT");
    }

    #[test]
    fn test_transparent_space_keeps_row_clean() {
        let mut cc = Channel::new(1);
        cc.resume_direct_captioning(0);
        cc.put_char(0, false, false, 0);
        assert!(!cc.is_row_dirty(0, LAST_ROW));
        assert_eq!(cc.cursor().1, FIRST_COLUMN + 1);
    }

    #[test]
    fn test_parity_error_stores_placeholder() {
        let mut cc = Channel::new(1);
        cc.resume_direct_captioning(0);
        assert!(!cc.character(None, 0));
        assert_eq!(cc.memory(0)[LAST_ROW][FIRST_COLUMN], SOLID_BLOCK);
    }

    #[test]
    fn test_tab_offset_clamps() {
        let mut cc = Channel::new(1);
        cc.resume_direct_captioning(0);
        cc.curr_column = 31;
        cc.ext_control(0x23, 0);
        assert_eq!(cc.cursor().1, LAST_COLUMN);
    }

    #[test]
    fn test_uppercase_predictor() {
        let mut cc = Channel::new(1);
        cc.resume_direct_captioning(0);
        write(&mut cc, "AB");
        assert!(cc.is_upper_case());
        write(&mut cc, "c");
        assert!(!cc.is_upper_case());
    }
}
