//! One DTVCC caption service: eight windows and the command interpreter
//! driving them.

use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::error::DecodeError;
use crate::event::StreamLine;

use super::charset::to_unicode;
use super::interp::{
    decode_element, element_length, Command, Element, PenAttributes, PenColor, WindowAttributes,
    WindowDefinition, DLC,
};
use super::styles::{pen_preset, window_preset, DEFAULT_STYLE_ID};
use super::window::{
    DisplayEffect, EffectStatus, Window, MAX_COLUMNS, MAX_COLUMNS_WIDE, MAX_WINDOWS,
    TEXT_TAG_NOT_DISPLAYABLE,
};

/// Capacity of the per-service data buffer.
pub const SERVICE_BUFFER_SIZE: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Display,
    Hide,
    Toggle,
}

/// Iterate the window ids set in a window bitmap.
fn window_ids(map: u8) -> impl Iterator<Item = usize> {
    (0..MAX_WINDOWS).filter(move |i| map & (1 << i) != 0)
}

/// Effect progress in percent after `elapsed` at `speed` half seconds.
pub(crate) fn effect_percent(elapsed: Duration, speed: u8) -> u8 {
    if speed == 0 {
        return 100;
    }
    let percent = elapsed.as_millis() * 100 / (speed as u128 * 500);
    percent.min(100) as u8
}

pub struct Service {
    id: u8,
    wide: bool,
    pub windows: [Window; MAX_WINDOWS],
    /// Bitmap of defined windows.
    pub created: u8,
    /// Index of the window addressed by commands.
    pub current: Option<usize>,
    data: Vec<u8>,
    /// Interpretation is suspended until this deadline.
    delay: Option<Instant>,
    update: bool,
    pts: i64,
    lines: Vec<StreamLine>,
}

impl Service {
    /// `id` is the service number, 1 to 6.
    pub fn new(id: u8, wide: bool) -> Self {
        let max_columns = if wide { MAX_COLUMNS_WIDE } else { MAX_COLUMNS };
        Self {
            id,
            wide,
            windows: std::array::from_fn(|i| Window::new(i as u8, max_columns)),
            created: 0,
            current: None,
            data: Vec::with_capacity(SERVICE_BUFFER_SIZE),
            delay: None,
            update: false,
            pts: -1,
            lines: Vec::new(),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    /// Page number reported for this service.
    pub fn pgno(&self) -> u32 {
        cc_protocol::FIRST_DTVCC_PAGE + self.id as u32 - 1
    }

    /// Delete all windows and drop pending data.
    pub fn reset(&mut self) {
        self.current = None;
        self.created = 0;
        self.delay = None;
        self.data.clear();
        for window in self.windows.iter_mut() {
            window.reset();
        }
        self.update = true;
    }

    /// Append service block data. Returns the number of bytes accepted.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        let room = SERVICE_BUFFER_SIZE - self.data.len();
        if bytes.len() > room {
            warn!(
                "DTVCC service {}: buffer full, dropping {} bytes",
                self.id,
                bytes.len() - room
            );
        }
        let n = bytes.len().min(room);
        self.data.extend_from_slice(&bytes[..n]);
        n
    }

    /// Bytes waiting for interpretation.
    pub fn pending(&self) -> &[u8] {
        &self.data
    }

    pub fn is_delayed(&self) -> bool {
        self.delay.is_some()
    }

    /// Whether a visible window changed since the last call.
    pub fn take_update(&mut self) -> bool {
        std::mem::take(&mut self.update)
    }

    /// Transcript lines completed since the last call.
    pub fn take_lines(&mut self) -> Vec<StreamLine> {
        std::mem::take(&mut self.lines)
    }

    /// Interpret the buffered data unless the service is suspended.
    ///
    /// A suspension ends early when the buffer fills up or when a
    /// DelayCancel code is waiting in it.
    pub fn process(&mut self, now: Instant, pts: i64) {
        if self.data.is_empty() {
            return;
        }
        self.pts = pts;

        if self.delay.is_some() {
            if self.data.len() >= SERVICE_BUFFER_SIZE {
                debug!("DTVCC service {}: buffer full, resuming", self.id);
            } else if self.delay_cancel_pending() {
                debug!("DTVCC service {}: delay cancelled", self.id);
            } else {
                return;
            }
            self.delay = None;
        }

        self.interpret(now);
    }

    fn delay_cancel_pending(&self) -> bool {
        let mut pos = 0;
        while pos < self.data.len() {
            if self.data[pos] == DLC {
                return true;
            }
            match element_length(&self.data[pos..], self.wide) {
                Ok(len) => pos += len,
                Err(_) => break,
            }
        }
        false
    }

    /// Advance time driven state: expire the delay, update effect progress
    /// and detect flashing content when the flash phase flipped.
    pub fn tick(&mut self, now: Instant, flash_changed: bool) {
        if let Some(deadline) = self.delay {
            if now >= deadline {
                debug!("DTVCC service {}: delay elapsed", self.id);
                self.delay = None;
                self.interpret(now);
            }
        }

        if !flash_changed || self.created == 0 {
            return;
        }

        for i in window_ids(self.created) {
            let window = &mut self.windows[i];
            if !window.visible {
                continue;
            }
            if window.style.flashes() || window.has_flashing_pen() {
                self.update = true;
            }
            if window.style.display_effect != DisplayEffect::Snap
                && window.effect_status != EffectStatus::None
            {
                let elapsed = window
                    .effect_start
                    .map(|start| now.saturating_duration_since(start))
                    .unwrap_or_default();
                window.effect_percent = effect_percent(elapsed, window.style.effect_speed);
                self.update = true;
            }
        }
    }

    fn interpret(&mut self, now: Instant) {
        let data = std::mem::take(&mut self.data);
        let mut pos = 0;

        while pos < data.len() {
            let buf = &data[pos..];
            let len = match element_length(buf, self.wide) {
                Ok(len) => len,
                Err(e) => {
                    debug!("DTVCC service {}: {}, dropping {} bytes", self.id, e, buf.len());
                    break;
                }
            };
            pos += len;

            let result = decode_element(&buf[..len], self.wide).and_then(|el| self.apply(el, now));
            if let Err(e) = result {
                trace!("DTVCC service {}: element {:02X?} rejected: {}", self.id, &buf[..len], e);
            }

            if self.delay.is_some() {
                self.data.extend_from_slice(&data[pos..]);
                break;
            }
        }
    }

    fn apply(&mut self, element: Element, now: Instant) -> Result<(), DecodeError> {
        match element {
            Element::Char(c) => {
                let index = self.current.ok_or(DecodeError::NoCurrentWindow)?;
                self.windows[index].put_char(c)?;
                self.touch(index);
                Ok(())
            }
            Element::Command(command) => self.execute(command, now),
            Element::Extended => {
                if let Some(index) = self.current {
                    self.windows[index].latest_cmd_cr = false;
                }
                Ok(())
            }
            Element::Ignored => Ok(()),
        }
    }

    fn current_index(&self) -> Result<usize, DecodeError> {
        self.current.ok_or(DecodeError::NoCurrentWindow)
    }

    /// Flag a redraw when the window is on screen.
    fn touch(&mut self, index: usize) {
        if self.windows[index].visible {
            self.update = true;
        }
    }

    fn execute(&mut self, command: Command, now: Instant) -> Result<(), DecodeError> {
        trace!("DTVCC service {}: {:?}", self.id, command);
        match command {
            Command::Backspace => {
                let index = self.current_index()?;
                if self.windows[index].backspace() {
                    self.touch(index);
                }
            }
            Command::FormFeed => {
                let index = self.current_index()?;
                self.clear_windows(1 << index);
            }
            Command::CarriageReturn => {
                let index = self.current_index()?;
                self.stream_row(index, self.windows[index].curr_row);
                self.windows[index].carriage_return();
                self.touch(index);
            }
            Command::HorizontalCarriageReturn => {
                let index = self.current_index()?;
                self.windows[index].horizontal_carriage_return();
                self.touch(index);
            }
            Command::SetCurrentWindow(id) => {
                if self.created & (1 << id) == 0 {
                    return Err(DecodeError::WindowNotCreated(id));
                }
                self.current = Some(id as usize);
            }
            Command::ClearWindows(map) => self.clear_windows(map),
            Command::DisplayWindows(map) => self.set_visibility(map, Visibility::Display, now),
            Command::HideWindows(map) => self.set_visibility(map, Visibility::Hide, now),
            Command::ToggleWindows(map) => self.set_visibility(map, Visibility::Toggle, now),
            Command::DeleteWindows(map) => self.delete_windows(map),
            Command::Delay(tenths) => {
                debug!("DTVCC service {}: delay {} ms", self.id, tenths as u64 * 100);
                self.delay = Some(now + Duration::from_millis(tenths as u64 * 100));
            }
            Command::DelayCancel => self.delay = None,
            Command::Reset => {
                debug!("DTVCC service {}: reset", self.id);
                self.reset();
            }
            Command::SetPenAttributes(attr) => self.set_pen_attributes(attr)?,
            Command::SetPenColor(color) => self.set_pen_color(color)?,
            Command::SetPenLocation { row, column } => self.set_pen_location(row, column)?,
            Command::SetWindowAttributes(attr) => self.set_window_attributes(attr)?,
            Command::DefineWindow(def) => self.define_window(def),
        }
        Ok(())
    }

    fn set_pen_attributes(&mut self, attr: PenAttributes) -> Result<(), DecodeError> {
        let index = self.current_index()?;
        let pen = &mut self.windows[index].curr_pen;
        pen.size = attr.size;
        pen.offset = attr.offset;
        pen.text_tag = attr.text_tag;
        pen.font = attr.font;
        pen.edge_type = attr.edge_type;
        pen.underline = attr.underline;
        pen.italics = attr.italics;
        Ok(())
    }

    fn set_pen_color(&mut self, color: PenColor) -> Result<(), DecodeError> {
        let index = self.current_index()?;
        let pen = &mut self.windows[index].curr_pen;
        pen.fg_color = color.fg_color;
        pen.fg_opacity = color.fg_opacity;
        pen.bg_color = color.bg_color;
        pen.bg_opacity = color.bg_opacity;
        pen.edge_color = color.edge_color;
        Ok(())
    }

    fn set_pen_location(&mut self, row: u8, column: u8) -> Result<(), DecodeError> {
        let index = self.current_index()?;
        let window = &self.windows[index];
        let column_limit =
            if window.column_lock { window.column_count } else { window.max_columns() };
        if row as usize >= window.row_count || column as usize >= column_limit {
            return Err(DecodeError::InvalidPenLocation { row, column });
        }

        let curr_row = window.curr_row;
        self.stream_row(index, curr_row);

        let window = &mut self.windows[index];
        window.curr_row = row as usize;
        window.curr_column = column as usize;
        if window.latest_cmd_cr {
            window.collapse_after_carriage_return();
            window.latest_cmd_cr = false;
            self.touch(index);
        }
        Ok(())
    }

    fn set_window_attributes(&mut self, attr: WindowAttributes) -> Result<(), DecodeError> {
        let index = self.current_index()?;
        let style = &mut self.windows[index].style;
        style.fill_color = attr.fill_color;
        style.fill_opacity = attr.fill_opacity;
        style.border_type = attr.border_type;
        style.border_color = attr.border_color;
        style.wordwrap = attr.wordwrap;
        style.print_direction = attr.print_direction;
        style.scroll_direction = attr.scroll_direction;
        style.justify = attr.justify;
        style.effect_speed = attr.effect_speed;
        style.effect_direction = attr.effect_direction;
        style.display_effect = attr.display_effect;
        self.touch(index);
        Ok(())
    }

    fn define_window(&mut self, def: WindowDefinition) {
        let index = def.id as usize;
        let map = 1u8 << def.id;
        let existed = self.created & map != 0;

        self.current = Some(index);

        let window = &mut self.windows[index];
        window.visible = def.visible;
        window.row_lock = def.row_lock;
        window.column_lock = def.column_lock;
        window.priority = def.priority;
        window.anchor_relative = def.anchor_relative;
        window.anchor_vertical = def.anchor_vertical;
        window.anchor_horizontal = def.anchor_horizontal;
        window.anchor_point = def.anchor_point;
        window.row_count = def.row_count;
        window.column_count = def.column_count;
        window.column_no_lock_length = 0;

        let window_style = match def.window_style {
            0 if existed => None,
            0 => window_preset(DEFAULT_STYLE_ID),
            id => window_preset(id as usize),
        };
        if let Some(style) = window_style {
            window.style = *style;
        }
        let pen_style = match def.pen_style {
            0 if existed => None,
            0 => pen_preset(DEFAULT_STYLE_ID),
            id => pen_preset(id as usize),
        };
        if let Some(pen) = pen_style {
            window.curr_pen = *pen;
        }

        if existed {
            window.curr_row = window.curr_row.min(window.row_count - 1);
            self.touch(index);
            return;
        }

        debug!(
            "DTVCC service {}: window {} created, {}x{}",
            self.id, def.id, def.row_count, def.column_count
        );
        window.curr_pen.text_tag = TEXT_TAG_NOT_DISPLAYABLE;
        window.curr_row = 0;
        window.curr_column = 0;
        window.streamed = 0;
        self.created |= map;
        self.clear_windows(map);
        self.touch(index);
    }

    fn clear_windows(&mut self, map: u8) {
        for i in window_ids(map & self.created) {
            self.stream_row(i, self.windows[i].curr_row);
            let window = &mut self.windows[i];
            window.clear();
            window.style.display_effect = DisplayEffect::Snap;
            self.touch(i);
        }
    }

    fn set_visibility(&mut self, map: u8, visibility: Visibility, now: Instant) {
        for i in window_ids(map & self.created) {
            let window = &mut self.windows[i];
            let was_visible = window.visible;
            window.visible = match visibility {
                Visibility::Display => true,
                Visibility::Hide => false,
                Visibility::Toggle => !was_visible,
            };
            window.effect_status =
                if window.visible { EffectStatus::Display } else { EffectStatus::Hide };
            window.effect_start = Some(now);
            window.effect_percent = 0;

            if !was_visible {
                for row in 0..self.windows[i].row_count {
                    self.stream_row(i, row);
                }
            }
        }
        self.update = true;
    }

    fn delete_windows(&mut self, map: u8) {
        let map = map & self.created;
        for i in window_ids(map) {
            self.stream_row(i, self.windows[i].curr_row);
            if self.current == Some(i) {
                self.current = None;
            }
            self.touch(i);

            let window = &mut self.windows[i];
            window.text.clear();
            window.pens.clear();
            window.visible = false;
            window.effect_status = EffectStatus::None;
            window.effect_percent = 0;
            window.style.display_effect = DisplayEffect::Snap;
        }
        self.created &= !map;
    }

    /// The window taken to carry the caption: the visible window with the
    /// highest priority, lowest id on ties.
    pub fn caption_window(&self) -> Option<usize> {
        window_ids(self.created)
            .filter(|&i| self.windows[i].visible)
            .min_by_key(|&i| self.windows[i].priority)
    }

    /// Created, visible windows by priority, ties in id order.
    pub fn visible_windows(&self) -> Vec<&Window> {
        let mut windows: Vec<&Window> = window_ids(self.created)
            .map(|i| &self.windows[i])
            .filter(|w| w.visible)
            .collect();
        windows.sort_by_key(|w| w.priority);
        windows
    }

    /// Report a row of the caption window to the transcript once.
    fn stream_row(&mut self, index: usize, row: usize) {
        if self.caption_window() != Some(index) {
            return;
        }
        let window = &mut self.windows[index];
        if row >= window.row_count || window.is_streamed(row) {
            return;
        }
        window.mark_streamed(row);
        if !window.row_has_text(row) {
            return;
        }

        let text: String = window
            .text
            .row(row)
            .unwrap_or(&[])
            .iter()
            .take(window.column_count)
            .map(|&c| if c == 0 { ' ' } else { to_unicode(c).unwrap_or(' ') })
            .collect();

        self.update = true;
        self.lines.push(StreamLine {
            pgno: self.pgno(),
            text: text.trim_end().to_string(),
            pts: self.pts,
        });
    }
}
