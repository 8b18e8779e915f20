use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::theme::current_palette;

const HELP_TEXT: &str = "\
Navigation
  l, Right, Space, PgDn   next page
  h, Left, PgUp           previous page
  j / k                   next / previous page
  g / G                   first / last page
  :                       go to page number
  J K H L                 pan a zoomed page

Zoom
  + / =                   zoom in
  -                       zoom out
  0                       reset to fit

Document
  b                       toggle bookmark on this page
  Tab                     open / close the side panel
  /                       search the document
  n / N                   next / previous search result
  T                       translate this page
  c                       copy page text to clipboard
  i                       toggle image inversion
  t                       switch theme

Side panel
  j / k                   move selection
  Enter                   jump to entry
  Space                   fold / unfold outline entry
  r                       rename bookmark
  d                       delete bookmark
  1 / 2 / 3               outline / bookmarks / pages tab

Mouse
  wheel                   turn pages
  Ctrl+wheel              zoom
  click                   follow links, pick panel entries

Other
  ?                       this help
  q                       quit";

pub enum HelpPopupAction {
    Close,
}

pub struct HelpPopup {
    scroll_offset: usize,
    last_popup_area: Option<Rect>,
}

impl Default for HelpPopup {
    fn default() -> Self {
        Self::new()
    }
}

impl HelpPopup {
    #[must_use]
    pub fn new() -> Self {
        HelpPopup {
            scroll_offset: 0,
            last_popup_area: None,
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect) {
        let palette = current_palette();

        let max_content_width = HELP_TEXT
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(80);
        let desired_width = (max_content_width + 6).min(area.width as usize);

        let popup_area = content_sized_rect(desired_width as u16, 90, area);
        self.last_popup_area = Some(popup_area);

        f.render_widget(Clear, popup_area);

        let lines: Vec<Line> = HELP_TEXT
            .lines()
            .skip(self.scroll_offset)
            .map(|line| {
                let style = if line.starts_with(' ') {
                    Style::default().fg(palette.text)
                } else {
                    Style::default().fg(palette.accent)
                };
                Line::from(Span::styled(format!("  {line}"), style))
            })
            .collect();

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .title(" Help - Press ? or Esc to close ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border_focus))
                .style(Style::default().bg(palette.bg)),
        );

        f.render_widget(paragraph, popup_area);
    }

    fn scroll_down(&mut self) {
        let max_lines = HELP_TEXT.lines().count();
        if self.scroll_offset < max_lines.saturating_sub(1) {
            self.scroll_offset += 1;
        }
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<HelpPopupAction> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll_down();
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.scroll_up();
                None
            }
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => Some(HelpPopupAction::Close),
            _ => None,
        }
    }
}

fn content_sized_rect(width: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    let width = width.min(r.width);
    let margin = (r.width.saturating_sub(width)) / 2;

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(width),
            Constraint::Length(margin),
        ])
        .split(popup_layout[1])[1]
}
