//! Render snapshots handed to the presentation layer.

use serde::Serialize;

use crate::dtvcc::window::{
    BorderType, Direction, DisplayEffect, EdgeType, EffectStatus, FontStyle, Justify, PenOffset,
    PenOpacity, PenSize,
};

/// The eight caption colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    /// Reduce a CEA-708 color (2 bits each of R, G, B) to the nearest of
    /// the eight caption colors by its most significant bits.
    pub fn from_rgb222(c: u8) -> Self {
        match c & 0x2A {
            0x00 => Color::Black,
            0x20 => Color::Red,
            0x08 => Color::Green,
            0x28 => Color::Yellow,
            0x02 => Color::Blue,
            0x22 => Color::Magenta,
            0x0A => Color::Cyan,
            _ => Color::White,
        }
    }

    /// 24-bit RGB value.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Color::Black => (0x00, 0x00, 0x00),
            Color::Red => (0xFF, 0x00, 0x00),
            Color::Green => (0x00, 0xFF, 0x00),
            Color::Yellow => (0xFF, 0xFF, 0x00),
            Color::Blue => (0x00, 0x00, 0xFF),
            Color::Magenta => (0xFF, 0x00, 0xFF),
            Color::Cyan => (0x00, 0xFF, 0xFF),
            Color::White => (0xFF, 0xFF, 0xFF),
        }
    }
}

/// How a cell is composited over the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Opacity {
    /// Nothing is drawn; the cell only keeps alignment.
    #[default]
    TransparentSpace,
    /// The glyph is drawn without background.
    TransparentFull,
    /// The background is blended with the video.
    SemiTransparent,
    Opaque,
}

impl From<PenOpacity> for Opacity {
    fn from(value: PenOpacity) -> Self {
        match value {
            PenOpacity::Solid | PenOpacity::Flash => Opacity::Opaque,
            PenOpacity::Translucent => Opacity::SemiTransparent,
            PenOpacity::Transparent => Opacity::TransparentSpace,
        }
    }
}

/// One character cell of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub ch: char,
    pub foreground: Color,
    pub background: Color,
    pub fg_opacity: Opacity,
    /// Background opacity; also the opacity of the cell as a whole.
    pub opacity: Opacity,
    pub italic: bool,
    pub underline: bool,
    pub flash: bool,
    pub size: PenSize,
    pub font: FontStyle,
    pub offset: PenOffset,
    pub edge_type: EdgeType,
    pub edge_color: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            foreground: Color::White,
            background: Color::Black,
            fg_opacity: Opacity::Opaque,
            opacity: Opacity::TransparentSpace,
            italic: false,
            underline: false,
            flash: false,
            size: PenSize::Standard,
            font: FontStyle::Default,
            offset: PenOffset::Normal,
            edge_type: EdgeType::None,
            edge_color: Color::Black,
        }
    }
}

impl Cell {
    /// Whether the cell draws anything.
    pub fn is_visible(&self) -> bool {
        self.opacity != Opacity::TransparentSpace
    }
}

/// Geometry and styling of the DTVCC window a page was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowInfo {
    pub id: u8,
    pub priority: u8,
    pub anchor_relative: bool,
    pub anchor_vertical: u8,
    pub anchor_horizontal: u8,
    pub anchor_point: u8,
    pub justify: Justify,
    pub print_direction: Direction,
    pub fill_color: Color,
    pub fill_opacity: Opacity,
    pub border_type: BorderType,
    pub border_color: Color,
    pub display_effect: DisplayEffect,
    pub effect_direction: Direction,
    pub effect_status: EffectStatus,
    pub effect_percent: u8,
    /// Phase of the shared 2 Hz flash clock: `true` hides flashing content.
    pub flash_phase: bool,
}

/// A rendered caption page.
///
/// EIA-608 pages (`pgno` 1..=8) are always 15 x 32. DTVCC pages
/// (`pgno` 9..=14) take the size of their window and carry its id in
/// `subno`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub pgno: u32,
    pub subno: u32,
    pub rows: usize,
    pub columns: usize,
    pub cells: Vec<Cell>,
    pub window: Option<WindowInfo>,
}

impl Page {
    pub fn new(pgno: u32, subno: u32, rows: usize, columns: usize) -> Self {
        Self { pgno, subno, rows, columns, cells: vec![Cell::default(); rows * columns], window: None }
    }

    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        (row < self.rows).then(|| &self.cells[row * self.columns..(row + 1) * self.columns])
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut [Cell]> {
        let columns = self.columns;
        (row < self.rows).then(move || &mut self.cells[row * columns..(row + 1) * columns])
    }

    /// Text of a row with trailing blanks removed. Transparent cells read
    /// as spaces.
    pub fn row_text(&self, row: usize) -> String {
        let text: String = self
            .row(row)
            .unwrap_or(&[])
            .iter()
            .map(|c| if c.is_visible() { c.ch } else { ' ' })
            .collect();
        text.trim_end().to_string()
    }

    /// Whether no cell of the page draws anything.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| !c.is_visible() || c.ch == ' ')
    }
}
