//! Full-document search overlay
//!
//! A top sheet with two modes: typing the query, and walking the result
//! list. Results stay around after the overlay closes so `n`/`N` keep
//! working from the page view.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::search::{MAX_HITS, SearchHit};
use crate::theme::current_palette;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Input,
    Results,
}

/// What the app should do in response to overlay input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOverlayAction {
    /// Run a search for this query
    Submit(String),
    /// Navigate to a page (0-indexed) and close the overlay
    Jump(usize),
    /// Export the current result list to a text file
    Export,
    /// Close the overlay
    Close,
}

pub struct SearchOverlay {
    mode: Mode,
    query: String,
    /// Query the current results belong to
    result_query: String,
    hits: Vec<SearchHit>,
    selected: usize,
    list_state: ListState,
    searching: bool,
    searched_once: bool,
    spinner_tick: usize,
    /// Result list area from the last render, for click hit-testing
    last_list_area: Option<Rect>,
}

impl Default for SearchOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: Mode::Input,
            query: String::new(),
            result_query: String::new(),
            hits: Vec::new(),
            selected: 0,
            list_state: ListState::default(),
            searching: false,
            searched_once: false,
            spinner_tick: 0,
            last_list_area: None,
        }
    }

    /// Put the overlay back into input mode. Query and results from the
    /// previous search are kept.
    pub fn open(&mut self) {
        self.mode = Mode::Input;
    }

    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.searching
    }

    #[must_use]
    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Query and hits of the last finished search, for export
    #[must_use]
    pub fn export_payload(&self) -> Option<(&str, &[SearchHit])> {
        if self.hits.is_empty() {
            None
        } else {
            Some((self.result_query.as_str(), self.hits.as_slice()))
        }
    }

    /// Mark a search as submitted; the spinner runs until results land.
    pub fn mark_searching(&mut self) {
        self.searching = true;
        self.searched_once = true;
        self.hits.clear();
        self.selected = 0;
        self.list_state.select(None);
        *self.list_state.offset_mut() = 0;
    }

    /// Install assembled results and switch to result navigation.
    pub fn set_results(&mut self, query: String, hits: Vec<SearchHit>) {
        self.result_query = query;
        self.hits = hits;
        self.searching = false;
        self.selected = 0;
        self.mode = Mode::Results;
        self.list_state
            .select(if self.hits.is_empty() { None } else { Some(0) });
    }

    /// Advance to the next hit, wrapping at the end. Returns the hit to
    /// jump to.
    pub fn next_hit(&mut self) -> Option<&SearchHit> {
        if self.hits.is_empty() {
            return None;
        }
        self.selected = (self.selected + 1) % self.hits.len();
        self.list_state.select(Some(self.selected));
        self.hits.get(self.selected)
    }

    /// Step back to the previous hit, wrapping at the start.
    pub fn prev_hit(&mut self) -> Option<&SearchHit> {
        if self.hits.is_empty() {
            return None;
        }
        self.selected = self.selected.checked_sub(1).unwrap_or(self.hits.len() - 1);
        self.list_state.select(Some(self.selected));
        self.hits.get(self.selected)
    }

    /// Current position as `(index, total)`, 1-based for display
    #[must_use]
    pub fn position(&self) -> Option<(usize, usize)> {
        if self.hits.is_empty() {
            None
        } else {
            Some((self.selected + 1, self.hits.len()))
        }
    }

    pub fn tick(&mut self) {
        self.spinner_tick = self.spinner_tick.wrapping_add(1);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<SearchOverlayAction> {
        match self.mode {
            Mode::Input => self.handle_input_key(key),
            Mode::Results => self.handle_results_key(key),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Option<SearchOverlayAction> {
        match key.code {
            KeyCode::Char(c) => {
                self.query.push(c);
                None
            }
            KeyCode::Backspace => {
                self.query.pop();
                None
            }
            KeyCode::Enter => {
                let trimmed = self.query.trim();
                if trimmed.is_empty() || self.searching {
                    None
                } else {
                    Some(SearchOverlayAction::Submit(trimmed.to_string()))
                }
            }
            KeyCode::Down | KeyCode::Tab => {
                if !self.hits.is_empty() {
                    self.mode = Mode::Results;
                }
                None
            }
            KeyCode::Esc => Some(SearchOverlayAction::Close),
            _ => None,
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) -> Option<SearchOverlayAction> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.hits.is_empty() && self.selected + 1 < self.hits.len() {
                    self.selected += 1;
                    self.list_state.select(Some(self.selected));
                }
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                    self.list_state.select(Some(self.selected));
                }
                None
            }
            KeyCode::Enter => self
                .hits
                .get(self.selected)
                .map(|hit| SearchOverlayAction::Jump(hit.page)),
            KeyCode::Char('s') => {
                if self.hits.is_empty() {
                    None
                } else {
                    Some(SearchOverlayAction::Export)
                }
            }
            KeyCode::Char('/') => {
                self.mode = Mode::Input;
                None
            }
            KeyCode::Esc => {
                // First Esc returns to the query, a second one closes
                self.mode = Mode::Input;
                None
            }
            _ => None,
        }
    }

    /// Click on a result row selects it and jumps.
    pub fn handle_click(&mut self, column: u16, row: u16) -> Option<SearchOverlayAction> {
        let area = self.last_list_area?;
        if column < area.x
            || column >= area.x.saturating_add(area.width)
            || row < area.y
            || row >= area.y.saturating_add(area.height)
        {
            return None;
        }

        let index = self.list_state.offset() + usize::from(row - area.y);
        if index >= self.hits.len() {
            return None;
        }

        self.mode = Mode::Results;
        self.selected = index;
        self.list_state.select(Some(index));
        Some(SearchOverlayAction::Jump(self.hits[index].page))
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect) {
        let palette = current_palette();
        let popup = top_sheet(area, 70);
        f.render_widget(Clear, popup);
        self.last_list_area = None;

        let title = match self.mode {
            Mode::Input => " Search - Enter: run, Esc: close ",
            Mode::Results => " Search - Enter: jump, s: export, Esc: back ",
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(palette.border_focus))
            .style(Style::default().bg(palette.bg));
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        if inner.height < 2 {
            return;
        }

        let input_area = Rect::new(inner.x, inner.y, inner.width, 1);
        let body_area = Rect::new(
            inner.x,
            inner.y + 2,
            inner.width,
            inner.height.saturating_sub(2),
        );

        self.render_input_line(f, input_area);

        if self.searching {
            let frame = SPINNER_FRAMES[self.spinner_tick % SPINNER_FRAMES.len()];
            f.render_widget(
                Paragraph::new(format!("{frame} Searching all pages…"))
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(palette.muted).bg(palette.bg)),
                body_area,
            );
        } else if self.searched_once && self.hits.is_empty() {
            f.render_widget(
                Paragraph::new(format!("No results found for \"{}\"", self.result_query))
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(palette.muted).bg(palette.bg)),
                body_area,
            );
        } else if !self.hits.is_empty() {
            self.render_results(f, body_area);
        }
    }

    fn render_input_line(&self, f: &mut Frame, area: Rect) {
        let palette = current_palette();
        let cursor = if self.mode == Mode::Input { "▏" } else { "" };

        let mut spans = vec![
            Span::styled(" / ", Style::default().fg(palette.accent)),
            Span::styled(
                format!("{}{cursor}", self.query),
                Style::default()
                    .fg(palette.text_bright)
                    .add_modifier(Modifier::BOLD),
            ),
        ];

        if !self.searching && !self.hits.is_empty() {
            let count = if self.hits.len() >= MAX_HITS {
                format!("  first {MAX_HITS} matches")
            } else if self.hits.len() == 1 {
                "  1 match".to_string()
            } else {
                format!("  {} matches", self.hits.len())
            };
            spans.push(Span::styled(count, Style::default().fg(palette.muted)));
        }

        f.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.bg)),
            area,
        );
    }

    fn render_results(&mut self, f: &mut Frame, area: Rect) {
        let palette = current_palette();
        let (selection_bg, selection_fg) = palette.selection_colors(self.mode == Mode::Results);

        let items: Vec<ListItem> = self
            .hits
            .iter()
            .map(|hit| {
                let mut spans = vec![Span::styled(
                    format!(" p.{:<5}", hit.page + 1),
                    Style::default().fg(palette.accent),
                )];
                spans.extend(highlight_snippet(hit, palette.match_highlight, palette.text));
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(items)
            .highlight_style(Style::default().bg(selection_bg).fg(selection_fg))
            .style(Style::default().bg(palette.bg));

        self.last_list_area = Some(area);
        f.render_stateful_widget(list, area, &mut self.list_state);
    }
}

/// Split a hit's snippet into spans with the matched range emphasized.
fn highlight_snippet(
    hit: &SearchHit,
    match_color: ratatui::style::Color,
    text_color: ratatui::style::Color,
) -> Vec<Span<'static>> {
    let snippet = hit.snippet.as_str();
    let start = hit.match_start.min(snippet.len());
    let end = (hit.match_start + hit.match_len).min(snippet.len());

    vec![
        Span::styled(snippet[..start].to_string(), Style::default().fg(text_color)),
        Span::styled(
            snippet[start..end].to_string(),
            Style::default()
                .fg(match_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(snippet[end..].to_string(), Style::default().fg(text_color)),
    ]
}

/// Sheet pinned under the toolbar spanning most of the width.
fn top_sheet(area: Rect, percent_y: u16) -> Rect {
    let height = (u32::from(area.height) * u32::from(percent_y) / 100).max(6) as u16;
    let height = height.min(area.height.saturating_sub(2));
    let margin_x = if area.width > 8 { 2 } else { 0 };

    Rect::new(
        area.x + margin_x,
        area.y + 1,
        area.width.saturating_sub(margin_x * 2),
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn hit(page: usize, snippet: &str) -> SearchHit {
        SearchHit {
            page,
            snippet: snippet.to_string(),
            match_start: 0,
            match_len: snippet.len().min(3),
        }
    }

    #[test]
    fn typing_edits_query_and_enter_submits() {
        let mut overlay = SearchOverlay::new();
        overlay.open();

        for c in "rust".chars() {
            overlay.handle_key(key(KeyCode::Char(c)));
        }
        overlay.handle_key(key(KeyCode::Backspace));
        assert_eq!(overlay.query(), "rus");

        let action = overlay.handle_key(key(KeyCode::Enter));
        assert_eq!(action, Some(SearchOverlayAction::Submit("rus".into())));
    }

    #[test]
    fn empty_query_does_not_submit() {
        let mut overlay = SearchOverlay::new();
        overlay.open();
        assert_eq!(overlay.handle_key(key(KeyCode::Enter)), None);

        overlay.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(overlay.handle_key(key(KeyCode::Enter)), None);
    }

    #[test]
    fn results_arrive_and_enter_jumps() {
        let mut overlay = SearchOverlay::new();
        overlay.open();
        overlay.mark_searching();
        assert!(overlay.is_searching());

        overlay.set_results("abc".into(), vec![hit(2, "abc one"), hit(5, "abc two")]);
        assert!(!overlay.is_searching());

        overlay.handle_key(key(KeyCode::Char('j')));
        let action = overlay.handle_key(key(KeyCode::Enter));
        assert_eq!(action, Some(SearchOverlayAction::Jump(5)));
    }

    #[test]
    fn next_and_prev_wrap_around() {
        let mut overlay = SearchOverlay::new();
        overlay.set_results("x".into(), vec![hit(1, "x"), hit(3, "x"), hit(9, "x")]);

        assert_eq!(overlay.next_hit().map(|h| h.page), Some(3));
        assert_eq!(overlay.next_hit().map(|h| h.page), Some(9));
        assert_eq!(overlay.next_hit().map(|h| h.page), Some(1));
        assert_eq!(overlay.prev_hit().map(|h| h.page), Some(9));
        assert_eq!(overlay.position(), Some((3, 3)));
    }

    #[test]
    fn navigation_with_no_hits_returns_none() {
        let mut overlay = SearchOverlay::new();
        assert!(overlay.next_hit().is_none());
        assert!(overlay.prev_hit().is_none());
        assert_eq!(overlay.position(), None);
    }

    #[test]
    fn escape_in_results_returns_to_input_then_closes() {
        let mut overlay = SearchOverlay::new();
        overlay.open();
        overlay.set_results("q".into(), vec![hit(0, "q")]);

        assert_eq!(overlay.handle_key(key(KeyCode::Esc)), None);
        assert_eq!(
            overlay.handle_key(key(KeyCode::Esc)),
            Some(SearchOverlayAction::Close)
        );
    }

    #[test]
    fn export_requires_hits() {
        let mut overlay = SearchOverlay::new();
        overlay.set_results("q".into(), vec![]);
        assert_eq!(overlay.handle_key(key(KeyCode::Char('s'))), None);
        assert!(overlay.export_payload().is_none());

        overlay.set_results("q".into(), vec![hit(4, "q here")]);
        assert_eq!(
            overlay.handle_key(key(KeyCode::Char('s'))),
            Some(SearchOverlayAction::Export)
        );
        let (query, hits) = overlay.export_payload().unwrap();
        assert_eq!(query, "q");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn submitting_again_clears_previous_hits() {
        let mut overlay = SearchOverlay::new();
        overlay.set_results("old".into(), vec![hit(1, "old")]);
        overlay.mark_searching();
        assert!(overlay.hits().is_empty());
        assert!(overlay.is_searching());
    }

    #[test]
    fn snippet_highlight_splits_on_match_range() {
        let hit = SearchHit {
            page: 0,
            snippet: "before match after".into(),
            match_start: 7,
            match_len: 5,
        };
        let spans = highlight_snippet(
            &hit,
            ratatui::style::Color::Yellow,
            ratatui::style::Color::White,
        );
        assert_eq!(spans[0].content.as_ref(), "before ");
        assert_eq!(spans[1].content.as_ref(), "match");
        assert_eq!(spans[2].content.as_ref(), " after");
    }
}
