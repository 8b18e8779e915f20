//! Top toolbar: title, page position, zoom, bookmark marker

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::UnicodeWidthStr;

use crate::theme::current_palette;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Everything the toolbar shows this frame
pub struct ToolbarStatus<'a> {
    pub title: &'a str,
    /// 0-indexed, shown 1-indexed
    pub current_page: usize,
    pub page_count: usize,
    pub zoom: f32,
    pub bookmarked: bool,
    pub busy: bool,
}

pub enum GotoAction {
    Jump(usize),
    Cancel,
}

pub struct Toolbar {
    goto_input: Option<String>,
    spinner_tick: usize,
}

impl Default for Toolbar {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolbar {
    #[must_use]
    pub fn new() -> Self {
        Self {
            goto_input: None,
            spinner_tick: 0,
        }
    }

    pub fn start_goto(&mut self) {
        self.goto_input = Some(String::new());
    }

    #[must_use]
    pub fn is_goto_active(&self) -> bool {
        self.goto_input.is_some()
    }

    /// Key handling while the go-to-page input is open. Returns the jump
    /// target (0-indexed) on Enter.
    pub fn handle_goto_key(&mut self, key: KeyEvent) -> Option<GotoAction> {
        let input = self.goto_input.as_mut()?;

        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if input.len() < 6 {
                    input.push(c);
                }
                None
            }
            KeyCode::Backspace => {
                input.pop();
                None
            }
            KeyCode::Enter => {
                let parsed = input.parse::<usize>().ok();
                self.goto_input = None;
                match parsed {
                    Some(display_page) if display_page > 0 => {
                        Some(GotoAction::Jump(display_page - 1))
                    }
                    _ => Some(GotoAction::Cancel),
                }
            }
            KeyCode::Esc => {
                self.goto_input = None;
                Some(GotoAction::Cancel)
            }
            _ => None,
        }
    }

    /// Advance the busy spinner one frame
    pub fn tick(&mut self) {
        self.spinner_tick = self.spinner_tick.wrapping_add(1);
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, status: &ToolbarStatus) {
        let palette = current_palette();
        let base = Style::default().fg(palette.text).bg(palette.surface);

        let mut right_spans: Vec<Span> = Vec::new();

        if let Some(input) = &self.goto_input {
            right_spans.push(Span::styled(
                format!("Go to page: {input}▏ "),
                Style::default()
                    .fg(palette.text_bright)
                    .bg(palette.surface)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            if status.busy {
                let frame = SPINNER_FRAMES[self.spinner_tick % SPINNER_FRAMES.len()];
                right_spans.push(Span::styled(
                    format!("{frame} "),
                    Style::default().fg(palette.accent).bg(palette.surface),
                ));
            }
            if status.bookmarked {
                right_spans.push(Span::styled(
                    "♦ ",
                    Style::default().fg(palette.warning).bg(palette.surface),
                ));
            }
            right_spans.push(Span::styled(
                format!(
                    "{}/{}  {:.0}% ",
                    status.current_page + 1,
                    status.page_count,
                    status.zoom * 100.0
                ),
                base,
            ));
        }

        let right_width: usize = right_spans.iter().map(|s| s.content.width()).sum();
        let avail = (area.width as usize).saturating_sub(right_width + 1);
        let title = truncate_to_width(status.title, avail);
        let pad = avail.saturating_sub(title.width());

        let mut spans = vec![
            Span::styled(
                format!(" {title}"),
                Style::default()
                    .fg(palette.text_bright)
                    .bg(palette.surface)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" ".repeat(pad), base),
        ];
        spans.extend(right_spans);

        let bar = Paragraph::new(Line::from(spans)).style(base);
        f.render_widget(bar, area);
    }
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthStr::width(ch.encode_utf8(&mut [0; 4]) as &str);
        if used + w + 1 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn goto_input_collects_digits_and_jumps() {
        let mut toolbar = Toolbar::new();
        toolbar.start_goto();
        assert!(toolbar.is_goto_active());

        assert!(toolbar.handle_goto_key(key(KeyCode::Char('4'))).is_none());
        assert!(toolbar.handle_goto_key(key(KeyCode::Char('2'))).is_none());
        // Non-digits ignored
        assert!(toolbar.handle_goto_key(key(KeyCode::Char('x'))).is_none());

        match toolbar.handle_goto_key(key(KeyCode::Enter)) {
            Some(GotoAction::Jump(page)) => assert_eq!(page, 41),
            other => panic!("expected jump, got {:?}", other.is_some()),
        }
        assert!(!toolbar.is_goto_active());
    }

    #[test]
    fn goto_backspace_edits_input() {
        let mut toolbar = Toolbar::new();
        toolbar.start_goto();

        toolbar.handle_goto_key(key(KeyCode::Char('1')));
        toolbar.handle_goto_key(key(KeyCode::Char('9')));
        toolbar.handle_goto_key(key(KeyCode::Backspace));

        match toolbar.handle_goto_key(key(KeyCode::Enter)) {
            Some(GotoAction::Jump(page)) => assert_eq!(page, 0),
            _ => panic!("expected jump to first page"),
        }
    }

    #[test]
    fn goto_empty_or_zero_cancels() {
        let mut toolbar = Toolbar::new();

        toolbar.start_goto();
        assert!(matches!(
            toolbar.handle_goto_key(key(KeyCode::Enter)),
            Some(GotoAction::Cancel)
        ));

        toolbar.start_goto();
        toolbar.handle_goto_key(key(KeyCode::Char('0')));
        assert!(matches!(
            toolbar.handle_goto_key(key(KeyCode::Enter)),
            Some(GotoAction::Cancel)
        ));
    }

    #[test]
    fn goto_escape_cancels() {
        let mut toolbar = Toolbar::new();
        toolbar.start_goto();
        toolbar.handle_goto_key(key(KeyCode::Char('7')));

        assert!(matches!(
            toolbar.handle_goto_key(key(KeyCode::Esc)),
            Some(GotoAction::Cancel)
        ));
        assert!(!toolbar.is_goto_active());
    }

    #[test]
    fn truncation_keeps_short_titles() {
        assert_eq!(truncate_to_width("short", 20), "short");
        let cut = truncate_to_width("a very long document title", 10);
        assert!(cut.ends_with('…'));
        assert!(UnicodeWidthStr::width(cut.as_str()) <= 10);
    }
}
