//! CEA-708 window and pen presentation model.
//!
//! A window is a character grid with a parallel grid of per-cell pens. The
//! grids are allocated once at the largest size a service may define
//! ([`MAX_ROWS`] x [`MAX_COLUMNS_WIDE`]) and addressed through checked
//! accessors; `row_count`/`column_count` describe the defined portion.

use std::time::Instant;

use serde::Serialize;

use crate::error::DecodeError;

/// Windows per service.
pub const MAX_WINDOWS: usize = 8;
/// Maximum rows of a window.
pub const MAX_ROWS: usize = 16;
/// Maximum columns of a window.
pub const MAX_COLUMNS: usize = 42;
/// Maximum columns of a window for double-width (Korean) services.
pub const MAX_COLUMNS_WIDE: usize = 84;

/// Character code stored in a grid cell. 0 is an empty cell.
pub type CharCode = u16;

/// Pen size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PenSize {
    Small,
    #[default]
    Standard,
    Large,
}

impl PenSize {
    /// Reserved value 3 is treated as standard.
    pub fn from_bits(v: u8) -> Self {
        match v & 3 {
            0 => PenSize::Small,
            2 => PenSize::Large,
            _ => PenSize::Standard,
        }
    }
}

/// Vertical pen offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PenOffset {
    Subscript,
    #[default]
    Normal,
    Superscript,
}

impl PenOffset {
    /// Reserved value 3 is treated as normal.
    pub fn from_bits(v: u8) -> Self {
        match v & 3 {
            0 => PenOffset::Subscript,
            2 => PenOffset::Superscript,
            _ => PenOffset::Normal,
        }
    }
}

/// Font style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FontStyle {
    #[default]
    Default,
    MonospacedSerif,
    ProportionalSerif,
    MonospacedSansSerif,
    ProportionalSansSerif,
    Casual,
    Cursive,
    SmallCaps,
}

impl FontStyle {
    pub fn from_bits(v: u8) -> Self {
        match v & 7 {
            0 => FontStyle::Default,
            1 => FontStyle::MonospacedSerif,
            2 => FontStyle::ProportionalSerif,
            3 => FontStyle::MonospacedSansSerif,
            4 => FontStyle::ProportionalSansSerif,
            5 => FontStyle::Casual,
            6 => FontStyle::Cursive,
            _ => FontStyle::SmallCaps,
        }
    }
}

/// Character edge type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EdgeType {
    #[default]
    None,
    Raised,
    Depressed,
    Uniform,
    LeftDropShadow,
    RightDropShadow,
}

impl EdgeType {
    /// Values 6 and 7 are reserved.
    pub fn from_bits(v: u8) -> Option<Self> {
        match v {
            0 => Some(EdgeType::None),
            1 => Some(EdgeType::Raised),
            2 => Some(EdgeType::Depressed),
            3 => Some(EdgeType::Uniform),
            4 => Some(EdgeType::LeftDropShadow),
            5 => Some(EdgeType::RightDropShadow),
            _ => None,
        }
    }
}

/// Window border type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BorderType {
    #[default]
    None,
    Raised,
    Depressed,
    Uniform,
    ShadowLeft,
    ShadowRight,
}

impl BorderType {
    /// Values 6 and 7 are reserved.
    pub fn from_bits(v: u8) -> Option<Self> {
        match v {
            0 => Some(BorderType::None),
            1 => Some(BorderType::Raised),
            2 => Some(BorderType::Depressed),
            3 => Some(BorderType::Uniform),
            4 => Some(BorderType::ShadowLeft),
            5 => Some(BorderType::ShadowRight),
            _ => None,
        }
    }
}

/// Foreground, background and fill opacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PenOpacity {
    #[default]
    Solid,
    Flash,
    Translucent,
    Transparent,
}

impl PenOpacity {
    pub fn from_bits(v: u8) -> Self {
        match v & 3 {
            0 => PenOpacity::Solid,
            1 => PenOpacity::Flash,
            2 => PenOpacity::Translucent,
            _ => PenOpacity::Transparent,
        }
    }
}

/// Text justification inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Justify {
    #[default]
    Left,
    Right,
    Center,
    Full,
}

impl Justify {
    pub fn from_bits(v: u8) -> Self {
        match v & 3 {
            0 => Justify::Left,
            1 => Justify::Right,
            2 => Justify::Center,
            _ => Justify::Full,
        }
    }
}

/// Print, scroll and effect direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Direction {
    #[default]
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl Direction {
    pub fn from_bits(v: u8) -> Self {
        match v & 3 {
            0 => Direction::LeftToRight,
            1 => Direction::RightToLeft,
            2 => Direction::TopToBottom,
            _ => Direction::BottomToTop,
        }
    }

    /// Whether text advances along a row.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }
}

/// Window display effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DisplayEffect {
    #[default]
    Snap,
    Fade,
    Wipe,
}

impl DisplayEffect {
    /// Value 3 is reserved.
    pub fn from_bits(v: u8) -> Option<Self> {
        match v {
            0 => Some(DisplayEffect::Snap),
            1 => Some(DisplayEffect::Fade),
            2 => Some(DisplayEffect::Wipe),
            _ => None,
        }
    }
}

/// Progress of a display effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EffectStatus {
    #[default]
    None,
    /// The window is appearing.
    Display,
    /// The window is disappearing.
    Hide,
}

/// Pen text tag.
pub const TEXT_TAG_NOT_DISPLAYABLE: u8 = 15;

/// Per-character style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Pen {
    pub size: PenSize,
    pub font: FontStyle,
    pub offset: PenOffset,
    pub text_tag: u8,
    pub italics: bool,
    pub underline: bool,
    pub edge_type: EdgeType,
    /// Edge color, 2 bits each of R, G, B.
    pub edge_color: u8,
    pub fg_color: u8,
    pub fg_opacity: PenOpacity,
    pub bg_color: u8,
    pub bg_opacity: PenOpacity,
}

impl Pen {
    /// Whether this pen makes any part of its cell blink.
    pub fn flashes(&self) -> bool {
        self.fg_opacity == PenOpacity::Flash || self.bg_opacity == PenOpacity::Flash
    }
}

/// Window-level style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WindowStyle {
    pub justify: Justify,
    pub print_direction: Direction,
    pub scroll_direction: Direction,
    pub wordwrap: bool,
    pub display_effect: DisplayEffect,
    pub effect_direction: Direction,
    /// Effect speed in 0.5 s units.
    pub effect_speed: u8,
    pub fill_color: u8,
    pub fill_opacity: PenOpacity,
    pub border_type: BorderType,
    pub border_color: u8,
}

impl WindowStyle {
    /// Whether the window fill blinks.
    pub fn flashes(&self) -> bool {
        self.fill_opacity == PenOpacity::Flash
    }
}

/// Fixed-capacity two-dimensional array with checked access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    rows: usize,
    columns: usize,
    cells: Vec<T>,
}

impl<T: Copy + Default> Grid<T> {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns, cells: vec![T::default(); rows * columns] }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    fn index(&self, row: usize, column: usize) -> Option<usize> {
        (row < self.rows && column < self.columns).then(|| row * self.columns + column)
    }

    pub fn get(&self, row: usize, column: usize) -> Option<T> {
        self.index(row, column).map(|i| self.cells[i])
    }

    pub fn set(&mut self, row: usize, column: usize, value: T) -> Result<(), DecodeError> {
        let i = self.index(row, column).ok_or(DecodeError::OutOfBounds { row, column })?;
        self.cells[i] = value;
        Ok(())
    }

    pub fn row(&self, row: usize) -> Option<&[T]> {
        (row < self.rows).then(|| &self.cells[row * self.columns..(row + 1) * self.columns])
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut [T]> {
        let columns = self.columns;
        (row < self.rows).then(move || &mut self.cells[row * columns..(row + 1) * columns])
    }

    pub fn clear(&mut self) {
        self.cells.fill(T::default());
    }

    pub fn clear_row(&mut self, row: usize) {
        if let Some(r) = self.row_mut(row) {
            r.fill(T::default());
        }
    }

    pub fn clear_column(&mut self, column: usize, rows: usize) {
        for row in 0..rows.min(self.rows) {
            let _ = self.set(row, column, T::default());
        }
    }

    /// Copy row `from` over row `to`.
    pub fn copy_row(&mut self, from: usize, to: usize) {
        if from < self.rows && to < self.rows && from != to {
            let c = self.columns;
            self.cells.copy_within(from * c..(from + 1) * c, to * c);
        }
    }

    /// Copy column `from` over column `to` in the first `rows` rows.
    pub fn copy_column(&mut self, from: usize, to: usize, rows: usize) {
        for row in 0..rows.min(self.rows) {
            if let Some(v) = self.get(row, from) {
                let _ = self.set(row, to, v);
            }
        }
    }
}

impl Grid<CharCode> {
    /// Whether the first `columns` cells of `row` hold no character.
    pub fn row_is_empty(&self, row: usize, columns: usize) -> bool {
        self.row(row)
            .map(|r| r.iter().take(columns).all(|&c| c == 0))
            .unwrap_or(true)
    }

    /// Whether the first `rows` cells of `column` hold no character.
    pub fn column_is_empty(&self, column: usize, rows: usize) -> bool {
        (0..rows).all(|row| self.get(row, column).unwrap_or(0) == 0)
    }
}

/// One CEA-708 window.
#[derive(Debug, Clone)]
pub struct Window {
    pub id: u8,
    pub visible: bool,
    /// 0 is the highest priority.
    pub priority: u8,

    pub anchor_relative: bool,
    pub anchor_vertical: u8,
    pub anchor_horizontal: u8,
    pub anchor_point: u8,

    pub row_count: usize,
    pub column_count: usize,
    pub row_lock: bool,
    pub column_lock: bool,
    /// Widest row written past `column_count` while the columns are unlocked.
    pub column_no_lock_length: usize,

    pub text: Grid<CharCode>,
    pub pens: Grid<Pen>,

    pub curr_row: usize,
    pub curr_column: usize,
    pub curr_pen: Pen,

    pub style: WindowStyle,

    /// Rows already reported to the transcript stream.
    pub streamed: u128,
    pub effect_status: EffectStatus,
    pub effect_percent: u8,
    pub effect_start: Option<Instant>,

    /// The previous element on this window was a carriage return.
    pub latest_cmd_cr: bool,

    max_columns: usize,
}

/// Outcome of writing one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The character was stored.
    Written,
    /// Both locks are set and the cursor is past the last column.
    Dropped,
}

impl Window {
    pub fn new(id: u8, max_columns: usize) -> Self {
        Self {
            id,
            visible: false,
            priority: 0,
            anchor_relative: false,
            anchor_vertical: 0,
            anchor_horizontal: 0,
            anchor_point: 0,
            row_count: 1,
            column_count: 1,
            row_lock: false,
            column_lock: false,
            column_no_lock_length: 0,
            text: Grid::new(MAX_ROWS, max_columns),
            pens: Grid::new(MAX_ROWS, max_columns),
            curr_row: 0,
            curr_column: 0,
            curr_pen: Pen::default(),
            style: WindowStyle::default(),
            streamed: 0,
            effect_status: EffectStatus::None,
            effect_percent: 0,
            effect_start: None,
            latest_cmd_cr: false,
            max_columns,
        }
    }

    /// Column limit of the service this window belongs to.
    pub fn max_columns(&self) -> usize {
        self.max_columns
    }

    /// Erase text and pens and home the cursor.
    pub fn clear(&mut self) {
        self.text.clear();
        self.pens.clear();
        self.curr_row = 0;
        self.curr_column = 0;
        self.streamed = 0;
        self.effect_status = EffectStatus::None;
        self.effect_percent = 0;
    }

    /// Return to the state of a freshly reset service.
    pub fn reset(&mut self) {
        self.visible = false;
        self.latest_cmd_cr = false;
        self.text.clear();
        self.pens.clear();
        self.effect_status = EffectStatus::None;
        self.effect_percent = 0;
        self.effect_start = None;
        self.streamed = 0;
    }

    #[inline]
    fn stream_bit(index: usize) -> u128 {
        if index < 128 {
            1u128 << index
        } else {
            0
        }
    }

    pub fn is_streamed(&self, index: usize) -> bool {
        self.streamed & Self::stream_bit(index) != 0
    }

    pub fn mark_streamed(&mut self, index: usize) {
        self.streamed |= Self::stream_bit(index);
    }

    pub fn clear_streamed(&mut self, index: usize) {
        self.streamed &= !Self::stream_bit(index);
    }

    /// Whether the row holds any character within the defined columns.
    pub fn row_has_text(&self, row: usize) -> bool {
        !self.text.row_is_empty(row, self.column_count)
    }

    /// Whether any cell of the window uses a flashing pen.
    pub fn has_flashing_pen(&self) -> bool {
        (0..self.row_count).any(|row| {
            self.pens
                .row(row)
                .map(|pens| {
                    pens.iter()
                        .zip(self.text.row(row).unwrap_or(&[]))
                        .take(self.column_count)
                        .any(|(pen, &c)| c != 0 && pen.flashes())
                })
                .unwrap_or(false)
        })
    }

    /// Shift every row up by one, clearing the last defined row.
    fn scroll_rows_up(&mut self) {
        for row in 1..self.row_count {
            self.text.copy_row(row, row - 1);
            self.pens.copy_row(row, row - 1);
        }
        self.text.clear_row(self.row_count - 1);
        self.pens.clear_row(self.row_count - 1);
    }

    /// Shift every row down by one, clearing row 0.
    fn scroll_rows_down(&mut self) {
        for row in (1..self.row_count).rev() {
            self.text.copy_row(row - 1, row);
            self.pens.copy_row(row - 1, row);
        }
        self.text.clear_row(0);
        self.pens.clear_row(0);
    }

    /// Shift every column right by one, clearing column 0.
    fn scroll_columns_right(&mut self) {
        for column in (1..self.column_count).rev() {
            self.text.copy_column(column - 1, column, self.row_count);
            self.pens.copy_column(column - 1, column, self.row_count);
        }
        self.text.clear_column(0, self.row_count);
        self.pens.clear_column(0, self.row_count);
    }

    /// Shift every column left by one, clearing the last defined column.
    fn scroll_columns_left(&mut self) {
        for column in 1..self.column_count {
            self.text.copy_column(column, column - 1, self.row_count);
            self.pens.copy_column(column, column - 1, self.row_count);
        }
        self.text.clear_column(self.column_count - 1, self.row_count);
        self.pens.clear_column(self.column_count - 1, self.row_count);
    }

    /// Move to the start of the next row, scrolling when past the last row.
    fn wrap_to_next_row(&mut self, row: usize) -> usize {
        let row = row + 1;
        if row >= self.row_count {
            self.streamed >>= 1;
            self.scroll_rows_up();
            self.row_count - 1
        } else {
            row
        }
    }

    /// Store a character at the cursor and advance the cursor in the print
    /// direction.
    pub fn put_char(&mut self, c: CharCode) -> Result<PutOutcome, DecodeError> {
        self.latest_cmd_cr = false;

        let mut row = self.curr_row;
        let mut column = self.curr_column;

        if self.style.print_direction == Direction::LeftToRight && column >= self.column_count {
            match (self.row_lock, self.column_lock) {
                (true, true) => return Ok(PutOutcome::Dropped),
                (true, false) if column < self.max_columns => {
                    self.column_no_lock_length = self.column_no_lock_length.max(column + 1);
                }
                (true, false) => return Ok(PutOutcome::Dropped),
                (false, _) => {
                    column = 0;
                    row = self.wrap_to_next_row(row);
                }
            }
        }

        if row >= self.row_count {
            return Err(DecodeError::OutOfBounds { row, column });
        }

        let mut pen = self.curr_pen;
        let stored = match c {
            // Transparent space and non-breaking transparent space.
            0x1020 | 0x1021 => {
                pen.fg_opacity = PenOpacity::Transparent;
                pen.bg_opacity = PenOpacity::Transparent;
                if c == 0x1020 {
                    0x20
                } else {
                    0xA0
                }
            }
            other => other,
        };
        self.text.set(row, column, stored)?;
        self.pens.set(row, column, pen)?;

        match self.style.print_direction {
            Direction::LeftToRight => {
                self.clear_streamed(row);
                column += 1;
            }
            Direction::RightToLeft => {
                self.clear_streamed(row);
                column = column.saturating_sub(1);
            }
            Direction::TopToBottom => {
                self.clear_streamed(column);
                row = (row + 1).min(self.row_count - 1);
            }
            Direction::BottomToTop => {
                self.clear_streamed(column);
                row = row.saturating_sub(1);
            }
        }

        self.curr_row = row;
        self.curr_column = column;
        Ok(PutOutcome::Written)
    }

    /// Carriage return. Returns whether the window content scrolled.
    pub fn carriage_return(&mut self) -> bool {
        self.latest_cmd_cr = true;
        let rows = self.row_count;
        let columns = self.column_count;

        match self.style.scroll_direction {
            Direction::LeftToRight => {
                self.curr_row = if self.style.print_direction == Direction::BottomToTop {
                    rows - 1
                } else {
                    0
                };
                if self.curr_column > 0 {
                    self.curr_column -= 1;
                    return false;
                }
                self.streamed = (self.streamed << 1) & !Self::stream_bit(columns);
                self.scroll_columns_right();
            }
            Direction::RightToLeft => {
                self.curr_row = if self.style.print_direction == Direction::BottomToTop {
                    rows - 1
                } else {
                    0
                };
                if self.curr_column + 1 < columns {
                    self.curr_column += 1;
                    return false;
                }
                self.streamed >>= 1;
                self.scroll_columns_left();
            }
            Direction::TopToBottom => {
                self.curr_column = if self.style.print_direction == Direction::RightToLeft {
                    columns - 1
                } else {
                    0
                };
                if self.curr_row > 0 {
                    self.curr_row -= 1;
                    return false;
                }
                self.streamed = (self.streamed << 1) & !Self::stream_bit(rows);
                self.scroll_rows_down();
            }
            Direction::BottomToTop => {
                self.curr_column = if self.style.print_direction == Direction::RightToLeft {
                    columns - 1
                } else {
                    0
                };
                if self.curr_row + 1 < rows {
                    self.curr_row += 1;
                    return false;
                }
                self.streamed >>= 1;
                self.scroll_rows_up();
            }
        }
        true
    }

    /// Horizontal carriage return: erase the current line and move to its
    /// start.
    pub fn horizontal_carriage_return(&mut self) {
        match self.style.print_direction {
            Direction::LeftToRight | Direction::RightToLeft => {
                let row = self.curr_row;
                self.text.clear_row(row);
                self.pens.clear_row(row);
                self.clear_streamed(row);
                self.curr_column = if self.style.print_direction == Direction::LeftToRight {
                    0
                } else {
                    self.column_count - 1
                };
            }
            Direction::TopToBottom | Direction::BottomToTop => {
                let column = self.curr_column;
                self.text.clear_column(column, self.row_count);
                self.pens.clear_column(column, self.row_count);
                self.clear_streamed(column);
                self.curr_row = if self.style.print_direction == Direction::TopToBottom {
                    0
                } else {
                    self.row_count - 1
                };
            }
        }
    }

    /// Backspace. Returns whether a visible character was erased.
    pub fn backspace(&mut self) -> bool {
        let mut row = self.curr_row;
        let mut column = self.curr_column;

        match self.style.print_direction {
            Direction::LeftToRight => column = column.saturating_sub(1),
            Direction::RightToLeft => {
                if column + 1 < self.column_count {
                    column += 1;
                }
            }
            Direction::TopToBottom => row = row.saturating_sub(1),
            Direction::BottomToTop => {
                if row + 1 < self.row_count {
                    row += 1;
                }
            }
        }

        self.curr_row = row;
        self.curr_column = column;

        if self.text.get(row, column).unwrap_or(0) == 0 {
            return false;
        }
        let _ = self.text.set(row, column, 0);
        let _ = self.pens.set(row, column, Pen::default());
        if self.style.print_direction.is_horizontal() {
            self.clear_streamed(row);
        } else {
            self.clear_streamed(column);
        }
        true
    }

    /// Form feed: erase the window and home the cursor.
    pub fn form_feed(&mut self) {
        self.text.clear();
        self.pens.clear();
        self.streamed = 0;
        self.curr_row = 0;
        self.curr_column = 0;
    }

    /// After two carriage returns in a row, close the gap left by empty
    /// leading or trailing lines so the content stays adjacent to the
    /// cursor line.
    pub fn collapse_after_carriage_return(&mut self) {
        let rows = self.row_count;
        let columns = self.column_count;
        let row = self.curr_row.min(rows - 1);
        let column = self.curr_column.min(columns - 1);

        match self.style.scroll_direction {
            Direction::LeftToRight => {
                let Some(first) = (0..=column).find(|&c| !self.text.column_is_empty(c, rows))
                else {
                    return;
                };
                let off = column - first + 1;
                for c in (column + 1..columns).rev() {
                    if c >= off {
                        self.text.copy_column(c - off, c, rows);
                        self.pens.copy_column(c - off, c, rows);
                    }
                }
                for c in 0..=column {
                    self.text.clear_column(c, rows);
                    self.pens.clear_column(c, rows);
                }
            }
            Direction::RightToLeft => {
                let Some(last) =
                    (column..columns).rev().find(|&c| !self.text.column_is_empty(c, rows))
                else {
                    return;
                };
                let off = last - column + 1;
                for c in 0..column {
                    if c + off < columns {
                        self.text.copy_column(c + off, c, rows);
                        self.pens.copy_column(c + off, c, rows);
                    }
                }
                for c in column..columns {
                    self.text.clear_column(c, rows);
                    self.pens.clear_column(c, rows);
                }
            }
            Direction::TopToBottom => {
                let Some(first) = (0..=row).find(|&r| !self.text.row_is_empty(r, columns)) else {
                    return;
                };
                let off = row - first + 1;
                for r in (row + 1..rows).rev() {
                    if r >= off {
                        self.text.copy_row(r - off, r);
                        self.pens.copy_row(r - off, r);
                    }
                }
                for r in 0..=row {
                    self.text.clear_row(r);
                    self.pens.clear_row(r);
                }
            }
            Direction::BottomToTop => {
                let Some(last) = (row..rows).rev().find(|&r| !self.text.row_is_empty(r, columns))
                else {
                    return;
                };
                let off = last - row + 1;
                for r in 0..row {
                    if r + off < rows {
                        self.text.copy_row(r + off, r);
                        self.pens.copy_row(r + off, r);
                    }
                }
                for r in row..rows {
                    self.text.clear_row(r);
                    self.pens.clear_row(r);
                }
            }
        }
    }

    /// Row-major view of the defined grid.
    pub fn text_rows(&self) -> impl Iterator<Item = &[CharCode]> + '_ {
        (0..self.row_count).map(move |row| {
            let r = self.text.row(row).unwrap_or(&[]);
            &r[..self.column_count.min(r.len())]
        })
    }
}
