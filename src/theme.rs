use ratatui::style::Color;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Role-named color palette for the reader UI.
///
/// `page_white`/`page_black` are the tint endpoints handed to the PDF
/// engine (0xRRGGBB), so rendered pages match the interface.
#[derive(Clone)]
pub struct Palette {
    pub bg: Color,
    pub surface: Color,
    pub border: Color,
    pub border_focus: Color,
    pub text: Color,
    pub text_bright: Color,
    pub muted: Color,
    pub accent: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub match_highlight: Color,
    pub error: Color,
    pub warning: Color,
    pub success: Color,
    pub page_black: i32,
    pub page_white: i32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ThemeId {
    Dark = 0,
    Light = 1,
}

impl ThemeId {
    pub fn name(&self) -> &'static str {
        match self {
            ThemeId::Dark => "Dark",
            ThemeId::Light => "Light",
        }
    }

    pub fn all() -> &'static [ThemeId] {
        &[ThemeId::Dark, ThemeId::Light]
    }

    pub fn toggled(&self) -> Self {
        match self {
            ThemeId::Dark => ThemeId::Light,
            ThemeId::Light => ThemeId::Dark,
        }
    }

    fn from_index(idx: usize) -> Self {
        match idx {
            1 => ThemeId::Light,
            _ => ThemeId::Dark,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ThemeId::all()
            .iter()
            .copied()
            .find(|id| id.name().eq_ignore_ascii_case(name))
    }
}

static CURRENT_THEME_INDEX: AtomicUsize = AtomicUsize::new(0);

pub fn current_theme_id() -> ThemeId {
    ThemeId::from_index(CURRENT_THEME_INDEX.load(Ordering::Relaxed))
}

pub fn set_theme(theme: ThemeId) {
    CURRENT_THEME_INDEX.store(theme as usize, Ordering::Relaxed);
}

pub fn current_palette() -> &'static Palette {
    match current_theme_id() {
        ThemeId::Dark => &DARK_PALETTE,
        ThemeId::Light => &LIGHT_PALETTE,
    }
}

fn rgb(hex: u32) -> Color {
    Color::Rgb(
        ((hex >> 16) & 0xFF) as u8,
        ((hex >> 8) & 0xFF) as u8,
        (hex & 0xFF) as u8,
    )
}

static DARK_PALETTE: LazyLock<Palette> = LazyLock::new(|| Palette {
    bg: rgb(0x1B2B34),
    surface: rgb(0x343D46),
    border: rgb(0x4F5B66),
    border_focus: rgb(0xA7ADBA),
    text: rgb(0xC0C5CE),
    text_bright: rgb(0xF0F4F8),
    muted: rgb(0x65737E),
    accent: rgb(0x6699CC),
    selection_bg: rgb(0x4F5B66),
    selection_fg: rgb(0xCDD3DE),
    match_highlight: rgb(0xFAC863),
    error: rgb(0xEC5F67),
    warning: rgb(0xF99157),
    success: rgb(0x99C794),
    page_black: 0xD8DEE9,
    page_white: 0x1B2B34,
});

static LIGHT_PALETTE: LazyLock<Palette> = LazyLock::new(|| Palette {
    bg: rgb(0xFAFAFA),
    surface: rgb(0xECEFF1),
    border: rgb(0xB0BEC5),
    border_focus: rgb(0x455A64),
    text: rgb(0x37474F),
    text_bright: rgb(0x102027),
    muted: rgb(0x90A4AE),
    accent: rgb(0x1565C0),
    selection_bg: rgb(0xCFD8DC),
    selection_fg: rgb(0x102027),
    match_highlight: rgb(0xF9A825),
    error: rgb(0xC62828),
    warning: rgb(0xEF6C00),
    success: rgb(0x2E7D32),
    page_black: 0x000000,
    page_white: 0xFFFFFF,
});

impl Palette {
    /// Colors for focused/unfocused panels: (text, border, background).
    pub fn panel_colors(&self, is_focused: bool) -> (Color, Color, Color) {
        if is_focused {
            (self.text_bright, self.border_focus, self.bg)
        } else {
            (self.muted, self.border, self.bg)
        }
    }

    /// Selection colors for focused/unfocused states: (bg, fg).
    pub fn selection_colors(&self, is_focused: bool) -> (Color, Color) {
        if is_focused {
            (self.selection_bg, self.selection_fg)
        } else {
            (self.selection_bg, self.muted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn toggle_flips_between_dark_and_light() {
        set_theme(ThemeId::Dark);
        assert_eq!(current_theme_id(), ThemeId::Dark);
        set_theme(current_theme_id().toggled());
        assert_eq!(current_theme_id(), ThemeId::Light);
        set_theme(current_theme_id().toggled());
        assert_eq!(current_theme_id(), ThemeId::Dark);
    }

    #[test]
    fn from_name_ignores_case() {
        assert_eq!(ThemeId::from_name("light"), Some(ThemeId::Light));
        assert_eq!(ThemeId::from_name("DARK"), Some(ThemeId::Dark));
        assert_eq!(ThemeId::from_name("solarized"), None);
    }
}
