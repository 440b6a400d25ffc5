//! Conversion of DTVCC windows to pages.

use crate::page::{Cell, Color, Opacity, Page, WindowInfo};

use super::charset::display_char;
use super::service::Service;
use super::window::Window;

/// Render one window. Empty cells become transparent spaces; every other
/// cell takes the pen it was written with.
pub fn window_to_page(window: &Window, pgno: u32, flash_phase: bool) -> Page {
    let rows = window.row_count;
    let columns = window.column_count.max(window.column_no_lock_length).min(window.max_columns());
    let mut page = Page::new(pgno, window.id as u32, rows, columns);

    for row in 0..rows {
        let (Some(text), Some(pens)) = (window.text.row(row), window.pens.row(row)) else {
            continue;
        };
        let Some(out) = page.row_mut(row) else {
            continue;
        };
        for (cell, (&c, pen)) in out.iter_mut().zip(text.iter().zip(pens.iter())) {
            if c == 0 {
                continue;
            }
            *cell = Cell {
                ch: display_char(c),
                foreground: Color::from_rgb222(pen.fg_color),
                background: Color::from_rgb222(pen.bg_color),
                fg_opacity: pen.fg_opacity.into(),
                opacity: pen.bg_opacity.into(),
                italic: pen.italics,
                underline: pen.underline,
                flash: pen.flashes(),
                size: pen.size,
                font: pen.font,
                offset: pen.offset,
                edge_type: pen.edge_type,
                edge_color: Color::from_rgb222(pen.edge_color),
            };
        }
    }

    let style = &window.style;
    page.window = Some(WindowInfo {
        id: window.id,
        priority: window.priority,
        anchor_relative: window.anchor_relative,
        anchor_vertical: window.anchor_vertical,
        anchor_horizontal: window.anchor_horizontal,
        anchor_point: window.anchor_point,
        justify: style.justify,
        print_direction: style.print_direction,
        fill_color: Color::from_rgb222(style.fill_color),
        fill_opacity: Opacity::from(style.fill_opacity),
        border_type: style.border_type,
        border_color: Color::from_rgb222(style.border_color),
        display_effect: style.display_effect,
        effect_direction: style.effect_direction,
        effect_status: window.effect_status,
        effect_percent: window.effect_percent,
        flash_phase,
    });
    page
}

/// Render every visible window of a service, highest priority first.
pub fn render_service(service: &Service, flash_phase: bool) -> Vec<Page> {
    service
        .visible_windows()
        .into_iter()
        .map(|w| window_to_page(w, service.pgno(), flash_phase))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtvcc::window::{PenOpacity, MAX_COLUMNS};

    #[test]
    fn test_window_to_page_cells() {
        let mut w = Window::new(3, MAX_COLUMNS);
        w.row_count = 2;
        w.column_count = 3;
        w.curr_pen.fg_color = 0x30;
        w.curr_pen.bg_opacity = PenOpacity::Translucent;
        w.put_char(b'A' as u16).unwrap();
        w.put_char(0x1022).unwrap();

        let page = window_to_page(&w, 9, false);
        assert_eq!((page.rows, page.columns, page.subno), (2, 3, 3));
        let row = page.row(0).unwrap();
        assert_eq!(row[0].ch, 'A');
        assert_eq!(row[0].foreground, Color::Red);
        assert_eq!(row[0].opacity, Opacity::SemiTransparent);
        // Unmapped G2 code.
        assert_eq!(row[1].ch, '_');
        assert_eq!(row[2].opacity, Opacity::TransparentSpace);
        assert_eq!(page.window.unwrap().id, 3);
    }

    #[test]
    fn test_render_service_priority_order() {
        let mut s = Service::new(2, false);
        for (id, priority) in [(0u8, 5u8), (1, 1), (2, 5)] {
            let w = &mut s.windows[id as usize];
            w.visible = true;
            w.priority = priority;
            s.created |= 1 << id;
        }
        s.windows[3].visible = true; // not created

        let pages = render_service(&s, false);
        let ids: Vec<u32> = pages.iter().map(|p| p.subno).collect();
        assert_eq!(ids, [1, 0, 2]);
        assert!(pages.iter().all(|p| p.pgno == 10));
    }
}
