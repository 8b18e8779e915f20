//! One-line banner offering to copy the binary into the user's bin dir

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::install;
use crate::theme::current_palette;

pub struct InstallBanner;

impl InstallBanner {
    pub fn render(f: &mut Frame, area: Rect) {
        let palette = current_palette();
        let base = Style::default().fg(palette.text).bg(palette.surface);
        let key_style = Style::default()
            .fg(palette.warning)
            .bg(palette.surface)
            .add_modifier(Modifier::BOLD);

        let target = install::install_target()
            .map_or_else(|| "your bin directory".to_string(), |p| p.display().to_string());

        let line = Line::from(vec![
            Span::styled(" hojear is not installed. Press ", base),
            Span::styled("I", key_style),
            Span::styled(format!(" to copy it to {target}, "), base),
            Span::styled("X", key_style),
            Span::styled(" to dismiss", base),
        ]);

        f.render_widget(Paragraph::new(line).style(base), area);
    }
}
