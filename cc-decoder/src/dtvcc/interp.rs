//! CEA-708 syntactic element framing and command decoding.
//!
//! A service buffer is a sequence of variable-length elements. The first
//! byte selects the code space:
//!
//! ```text
//! 0x00-0x1F  C0 controls, length from the top bits (1, 1, 2 or 3 bytes)
//!            0x10 EXT1 escapes to G2/G3 characters or C2/C3 codes
//!            0x18 P16 carries a 16-bit character in double-width mode
//! 0x20-0x7F  G0 characters
//! 0x80-0x9F  C1 window and pen commands, length from a fixed table
//! 0xA0-0xFF  G1 characters
//! ```

use crate::error::DecodeError;

use super::window::{
    BorderType, CharCode, Direction, DisplayEffect, EdgeType, FontStyle, Justify, PenOffset,
    PenOpacity, PenSize, MAX_COLUMNS, MAX_COLUMNS_WIDE, MAX_ROWS,
};

const C0_LENGTH: [usize; 4] = [1, 1, 2, 3];

#[rustfmt::skip]
const C1_LENGTH: [usize; 32] = [
    // CW0-CW7
    1, 1, 1, 1, 1, 1, 1, 1,
    // CLW DSW HDW TGW DLW DLY DLC RST
    2, 2, 2, 2, 2, 2, 1, 1,
    // SPA SPC SPL, 0x93-0x96 reserved, SWA
    3, 4, 3, 1, 1, 1, 1, 5,
    // DF0-DF7
    7, 7, 7, 7, 7, 7, 7, 7,
];

const EXT1: u8 = 0x10;
const P16: u8 = 0x18;

pub const DLY: u8 = 0x8D;
pub const DLC: u8 = 0x8E;

/// Attributes carried by SetPenAttributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenAttributes {
    pub size: PenSize,
    pub offset: PenOffset,
    pub text_tag: u8,
    pub font: FontStyle,
    pub edge_type: EdgeType,
    pub underline: bool,
    pub italics: bool,
}

/// Colors carried by SetPenColor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenColor {
    pub fg_color: u8,
    pub fg_opacity: PenOpacity,
    pub bg_color: u8,
    pub bg_opacity: PenOpacity,
    pub edge_color: u8,
}

/// Attributes carried by SetWindowAttributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    pub fill_color: u8,
    pub fill_opacity: PenOpacity,
    pub border_type: BorderType,
    pub border_color: u8,
    pub wordwrap: bool,
    pub print_direction: Direction,
    pub scroll_direction: Direction,
    pub justify: Justify,
    pub effect_speed: u8,
    pub effect_direction: Direction,
    pub display_effect: DisplayEffect,
}

/// Parameters of DefineWindow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDefinition {
    pub id: u8,
    pub priority: u8,
    pub column_lock: bool,
    pub row_lock: bool,
    pub visible: bool,
    pub anchor_vertical: u8,
    pub anchor_relative: bool,
    pub anchor_horizontal: u8,
    pub anchor_point: u8,
    pub row_count: usize,
    pub column_count: usize,
    /// Window style preset, 0 keeps the current style.
    pub window_style: u8,
    /// Pen style preset, 0 keeps the current pen.
    pub pen_style: u8,
}

/// A decoded C0 or C1 command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Backspace,
    FormFeed,
    CarriageReturn,
    HorizontalCarriageReturn,
    SetCurrentWindow(u8),
    ClearWindows(u8),
    DisplayWindows(u8),
    HideWindows(u8),
    ToggleWindows(u8),
    DeleteWindows(u8),
    /// Suspend interpretation for the given number of tenths of a second.
    Delay(u8),
    DelayCancel,
    Reset,
    SetPenAttributes(PenAttributes),
    SetPenColor(PenColor),
    SetPenLocation { row: u8, column: u8 },
    SetWindowAttributes(WindowAttributes),
    DefineWindow(WindowDefinition),
}

/// One syntactic element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    /// G0, G1, G2 (0x1020-0x107F), G3 (0x10A0-0x10FF) or a 16-bit character.
    Char(CharCode),
    Command(Command),
    /// C2/C3 extended code. No commands are assigned to these.
    Extended,
    /// Reserved or unassigned control code.
    Ignored,
}

#[inline]
fn need(buf: &[u8], needed: usize) -> Result<usize, DecodeError> {
    if buf.len() < needed {
        Err(DecodeError::IncompleteElement { needed, available: buf.len() })
    } else {
        Ok(needed)
    }
}

/// Length in bytes of the element starting at `buf[0]`.
///
/// Fails with [`DecodeError::IncompleteElement`] when the element extends
/// past the end of `buf`.
pub fn element_length(buf: &[u8], wide: bool) -> Result<usize, DecodeError> {
    let Some(&c) = buf.first() else {
        return Err(DecodeError::IncompleteElement { needed: 1, available: 0 });
    };

    if c == P16 && wide {
        return need(buf, 3);
    }
    if c & 0x60 != 0 {
        return Ok(1);
    }
    if c != EXT1 {
        let len = if c & 0x80 != 0 {
            C1_LENGTH[(c - 0x80) as usize]
        } else {
            C0_LENGTH[(c >> 3) as usize]
        };
        return need(buf, len);
    }

    need(buf, 2)?;
    let c2 = buf[1];
    if c2 & 0x60 != 0 {
        return Ok(2);
    }
    let len = if c2 & 0x80 == 0 {
        // C2: 0x00-0x1F
        (c2 >> 3) as usize + 2
    } else if c2 < 0x90 {
        // C3 fixed length: 0x80-0x8F
        (c2 >> 3) as usize - 10
    } else {
        // C3 variable length: type[2] zero[1] length[5]
        need(buf, 3)?;
        (buf[2] & 0x1F) as usize + 3
    };
    need(buf, len)
}

/// Decode one element. `buf` must hold at least [`element_length`] bytes.
pub fn decode_element(buf: &[u8], wide: bool) -> Result<Element, DecodeError> {
    let len = element_length(buf, wide)?;
    let c = buf[0];

    if c == P16 && wide {
        return Ok(Element::Char(u16::from_be_bytes([buf[1], buf[2]])));
    }
    if c & 0x60 != 0 {
        return Ok(Element::Char(c as CharCode));
    }
    if c == EXT1 {
        let c2 = buf[1];
        return Ok(if c2 & 0x60 != 0 {
            Element::Char(0x1000 | c2 as CharCode)
        } else {
            Element::Extended
        });
    }

    let params = &buf[..len];
    let command = match c {
        0x08 => Command::Backspace,
        0x0C => Command::FormFeed,
        0x0D => Command::CarriageReturn,
        0x0E => Command::HorizontalCarriageReturn,
        0x80..=0x87 => Command::SetCurrentWindow(c & 7),
        0x88 => Command::ClearWindows(params[1]),
        0x89 => Command::DisplayWindows(params[1]),
        0x8A => Command::HideWindows(params[1]),
        0x8B => Command::ToggleWindows(params[1]),
        0x8C => Command::DeleteWindows(params[1]),
        DLY => Command::Delay(params[1]),
        DLC => Command::DelayCancel,
        0x8F => Command::Reset,
        0x90 => Command::SetPenAttributes(pen_attributes(params)?),
        0x91 => Command::SetPenColor(pen_color(params)?),
        0x92 => pen_location(params, wide)?,
        0x97 => Command::SetWindowAttributes(window_attributes(params)?),
        0x98..=0x9F => Command::DefineWindow(window_definition(params, wide)?),
        _ => return Ok(Element::Ignored),
    };
    Ok(Element::Command(command))
}

fn pen_attributes(p: &[u8]) -> Result<PenAttributes, DecodeError> {
    let edge = (p[2] >> 3) & 7;
    let edge_type = EdgeType::from_bits(edge)
        .ok_or(DecodeError::InvalidParameter { command: "SPA", value: p[2] })?;
    Ok(PenAttributes {
        size: PenSize::from_bits(p[1]),
        offset: PenOffset::from_bits(p[1] >> 2),
        text_tag: p[1] >> 4,
        font: FontStyle::from_bits(p[2]),
        edge_type,
        underline: (p[2] >> 6) & 1 != 0,
        italics: p[2] >> 7 != 0,
    })
}

fn pen_color(p: &[u8]) -> Result<PenColor, DecodeError> {
    if p[3] & 0xC0 != 0 {
        return Err(DecodeError::InvalidParameter { command: "SPC", value: p[3] });
    }
    Ok(PenColor {
        fg_color: p[1] & 0x3F,
        fg_opacity: PenOpacity::from_bits(p[1] >> 6),
        bg_color: p[2] & 0x3F,
        bg_opacity: PenOpacity::from_bits(p[2] >> 6),
        edge_color: p[3],
    })
}

fn pen_location(p: &[u8], wide: bool) -> Result<Command, DecodeError> {
    let (row, column) = (p[1], p[2]);
    let max_columns = if wide { MAX_COLUMNS_WIDE } else { MAX_COLUMNS };
    if row as usize >= MAX_ROWS || column as usize >= max_columns {
        return Err(DecodeError::InvalidPenLocation { row, column });
    }
    Ok(Command::SetPenLocation { row, column })
}

fn window_attributes(p: &[u8]) -> Result<WindowAttributes, DecodeError> {
    let border = ((p[3] >> 5) & 0x04) | (p[2] >> 6);
    let border_type = BorderType::from_bits(border)
        .ok_or(DecodeError::InvalidParameter { command: "SWA", value: border })?;
    let display_effect = DisplayEffect::from_bits(p[4] & 3)
        .ok_or(DecodeError::InvalidParameter { command: "SWA", value: p[4] })?;
    Ok(WindowAttributes {
        fill_color: p[1] & 0x3F,
        fill_opacity: PenOpacity::from_bits(p[1] >> 6),
        border_type,
        border_color: p[2] & 0x3F,
        wordwrap: (p[3] >> 6) & 1 != 0,
        print_direction: Direction::from_bits(p[3] >> 4),
        scroll_direction: Direction::from_bits(p[3] >> 2),
        justify: Justify::from_bits(p[3]),
        effect_speed: p[4] >> 4,
        effect_direction: Direction::from_bits(p[4] >> 2),
        display_effect,
    })
}

fn window_definition(p: &[u8], wide: bool) -> Result<WindowDefinition, DecodeError> {
    let invalid = |value| DecodeError::InvalidParameter { command: "DFx", value };

    if (p[1] | p[6]) & 0xC0 != 0 {
        return Err(invalid(p[1] | p[6]));
    }

    let anchor_relative = p[2] & 0x80 != 0;
    let anchor_vertical = p[2] & 0x7F;
    let anchor_horizontal = p[3];
    let (v_limit, h_limit) = if anchor_relative { (100, 100) } else { (75, 210) };
    if anchor_vertical >= v_limit {
        return Err(invalid(p[2]));
    }
    if anchor_horizontal >= h_limit {
        return Err(invalid(p[3]));
    }

    let anchor_point = p[4] >> 4;
    if anchor_point >= 9 {
        return Err(invalid(p[4]));
    }

    let max_columns = if wide { MAX_COLUMNS_WIDE } else { MAX_COLUMNS };
    if p[5] as usize >= max_columns {
        return Err(invalid(p[5]));
    }

    Ok(WindowDefinition {
        id: p[0] & 7,
        priority: p[1] & 7,
        column_lock: (p[1] >> 3) & 1 != 0,
        row_lock: (p[1] >> 4) & 1 != 0,
        visible: (p[1] >> 5) & 1 != 0,
        anchor_vertical,
        anchor_relative,
        anchor_horizontal,
        anchor_point,
        row_count: (p[4] & 0x0F) as usize + 1,
        column_count: p[5] as usize + 1,
        window_style: (p[6] >> 3) & 7,
        pen_style: p[6] & 7,
    })
}
