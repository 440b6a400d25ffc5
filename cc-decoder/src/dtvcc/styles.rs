//! Predefined window and pen styles selected by DefineWindow.

use super::window::{
    BorderType, DisplayEffect, Direction, EdgeType, FontStyle, Justify, Pen, PenOffset, PenOpacity,
    PenSize, WindowStyle,
};

const fn window_style(
    justify: Justify,
    print_direction: Direction,
    scroll_direction: Direction,
    wordwrap: bool,
    fill_opacity: PenOpacity,
) -> WindowStyle {
    WindowStyle {
        justify,
        print_direction,
        scroll_direction,
        wordwrap,
        display_effect: DisplayEffect::Snap,
        effect_direction: Direction::LeftToRight,
        effect_speed: 0,
        fill_color: 0,
        fill_opacity,
        border_type: BorderType::None,
        border_color: 0,
    }
}

const fn pen_style(font: FontStyle, edge_type: EdgeType, bg_opacity: PenOpacity) -> Pen {
    Pen {
        size: PenSize::Standard,
        font,
        offset: PenOffset::Normal,
        text_tag: 0,
        italics: false,
        underline: false,
        edge_type,
        edge_color: 0,
        fg_color: 0x3F,
        fg_opacity: PenOpacity::Solid,
        bg_color: 0,
        bg_opacity,
    }
}

/// Window style presets 1 to 7.
pub const WINDOW_STYLES: [WindowStyle; 7] = [
    // 1: NTSC style pop-up captions.
    window_style(Justify::Left, Direction::LeftToRight, Direction::BottomToTop, false, PenOpacity::Solid),
    // 2: pop-up captions without black background.
    window_style(Justify::Left, Direction::LeftToRight, Direction::BottomToTop, false, PenOpacity::Transparent),
    // 3: NTSC style centered pop-up captions.
    window_style(Justify::Center, Direction::LeftToRight, Direction::BottomToTop, false, PenOpacity::Solid),
    // 4: NTSC style roll-up captions.
    window_style(Justify::Left, Direction::LeftToRight, Direction::BottomToTop, true, PenOpacity::Solid),
    // 5: roll-up captions without black background.
    window_style(Justify::Left, Direction::LeftToRight, Direction::BottomToTop, true, PenOpacity::Transparent),
    // 6: centered roll-up captions.
    window_style(Justify::Center, Direction::LeftToRight, Direction::BottomToTop, true, PenOpacity::Solid),
    // 7: ticker tape.
    window_style(Justify::Left, Direction::TopToBottom, Direction::RightToLeft, false, PenOpacity::Solid),
];

/// Pen style presets 1 to 7.
pub const PEN_STYLES: [Pen; 7] = [
    pen_style(FontStyle::Default, EdgeType::None, PenOpacity::Solid),
    pen_style(FontStyle::MonospacedSerif, EdgeType::None, PenOpacity::Solid),
    pen_style(FontStyle::ProportionalSerif, EdgeType::None, PenOpacity::Solid),
    pen_style(FontStyle::MonospacedSansSerif, EdgeType::None, PenOpacity::Solid),
    pen_style(FontStyle::ProportionalSansSerif, EdgeType::None, PenOpacity::Solid),
    pen_style(FontStyle::MonospacedSansSerif, EdgeType::Uniform, PenOpacity::Transparent),
    pen_style(FontStyle::ProportionalSansSerif, EdgeType::Uniform, PenOpacity::Transparent),
];

/// Preset applied to a newly created window that names no style.
pub const DEFAULT_STYLE_ID: usize = 2;

/// Look up a window style preset by its 1-based id.
pub fn window_preset(id: usize) -> Option<&'static WindowStyle> {
    id.checked_sub(1).and_then(|i| WINDOW_STYLES.get(i))
}

/// Look up a pen style preset by its 1-based id.
pub fn pen_preset(id: usize) -> Option<&'static Pen> {
    id.checked_sub(1).and_then(|i| PEN_STYLES.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_lookup() {
        assert!(window_preset(0).is_none());
        assert!(window_preset(8).is_none());
        assert_eq!(window_preset(7).unwrap().print_direction, Direction::TopToBottom);
        assert!(window_preset(4).unwrap().wordwrap);
        assert_eq!(pen_preset(6).unwrap().edge_type, EdgeType::Uniform);
        assert_eq!(pen_preset(1).unwrap().fg_color, 0x3F);
    }
}
