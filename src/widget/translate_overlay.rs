//! Page translation overlay
//!
//! Flow: pick a target language, wait for the page text to come back
//! translated, read or copy the result. The network round-trip happens on
//! the translator thread; this widget only tracks the stages.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::theme::current_palette;
use crate::translate::LANGUAGES;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Clone, Debug, PartialEq, Eq)]
enum Stage {
    Languages,
    Busy,
    Done(String),
    Failed(String),
}

/// What the app should do in response to overlay input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranslateOverlayAction {
    /// Translate the current page into this language
    Translate(String),
    /// Put the translated text on the clipboard
    Copy(String),
    /// Close the overlay
    Close,
}

pub struct TranslateOverlay {
    stage: Stage,
    selected: usize,
    list_state: ListState,
    scroll: u16,
    spinner_tick: usize,
    /// Language list area from the last render, for click hit-testing
    last_list_area: Option<Rect>,
}

impl Default for TranslateOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslateOverlay {
    #[must_use]
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        Self {
            stage: Stage::Languages,
            selected: 0,
            list_state,
            scroll: 0,
            spinner_tick: 0,
            last_list_area: None,
        }
    }

    /// Reset to the language list, preselecting the remembered language.
    pub fn open(&mut self, preferred_language: &str) {
        self.stage = Stage::Languages;
        self.scroll = 0;
        self.selected = LANGUAGES
            .iter()
            .position(|lang| lang.eq_ignore_ascii_case(preferred_language))
            .unwrap_or(0);
        self.list_state.select(Some(self.selected));
    }

    /// True while a translation is in flight
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.stage == Stage::Busy
    }

    pub fn set_busy(&mut self) {
        self.stage = Stage::Busy;
    }

    pub fn set_result(&mut self, text: String) {
        self.stage = Stage::Done(text);
        self.scroll = 0;
    }

    pub fn set_error(&mut self, message: String) {
        self.stage = Stage::Failed(message);
    }

    pub fn tick(&mut self) {
        self.spinner_tick = self.spinner_tick.wrapping_add(1);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<TranslateOverlayAction> {
        match &self.stage {
            Stage::Languages => match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    if self.selected + 1 < LANGUAGES.len() {
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
                KeyCode::Enter => Some(TranslateOverlayAction::Translate(
                    LANGUAGES[self.selected].to_string(),
                )),
                KeyCode::Esc => Some(TranslateOverlayAction::Close),
                _ => None,
            },

            Stage::Busy => match key.code {
                // The in-flight job keeps running; its response is dropped
                // as stale once nothing waits for it
                KeyCode::Esc => Some(TranslateOverlayAction::Close),
                _ => None,
            },

            Stage::Done(text) => match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    self.scroll = self.scroll.saturating_add(1);
                    None
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.scroll = self.scroll.saturating_sub(1);
                    None
                }
                KeyCode::Char('y') => Some(TranslateOverlayAction::Copy(text.clone())),
                KeyCode::Char('l') => {
                    self.stage = Stage::Languages;
                    None
                }
                KeyCode::Esc => Some(TranslateOverlayAction::Close),
                _ => None,
            },

            Stage::Failed(_) => match key.code {
                KeyCode::Char('l') | KeyCode::Enter => {
                    self.stage = Stage::Languages;
                    None
                }
                KeyCode::Esc => Some(TranslateOverlayAction::Close),
                _ => None,
            },
        }
    }

    /// Click on a language row selects it and starts the translation.
    pub fn handle_click(&mut self, column: u16, row: u16) -> Option<TranslateOverlayAction> {
        if self.stage != Stage::Languages {
            return None;
        }
        let area = self.last_list_area?;
        if column < area.x
            || column >= area.x.saturating_add(area.width)
            || row < area.y
            || row >= area.y.saturating_add(area.height)
        {
            return None;
        }

        let index = self.list_state.offset() + usize::from(row - area.y);
        if index >= LANGUAGES.len() {
            return None;
        }

        self.selected = index;
        self.list_state.select(Some(index));
        Some(TranslateOverlayAction::Translate(
            LANGUAGES[index].to_string(),
        ))
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, current_page: usize) {
        let palette = current_palette();
        let popup = top_sheet(area, 80);
        f.render_widget(Clear, popup);

        let title = format!(" Translate page {} ", current_page + 1);
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

        match &self.stage {
            Stage::Languages => self.render_languages(f, inner),
            Stage::Busy => {
                let frame = SPINNER_FRAMES[self.spinner_tick % SPINNER_FRAMES.len()];
                f.render_widget(
                    Paragraph::new(format!("{frame} Translating…"))
                        .alignment(Alignment::Center)
                        .style(Style::default().fg(palette.muted).bg(palette.bg)),
                    centered_line(inner),
                );
            }
            Stage::Done(text) => {
                let text = text.clone();
                let hint = "j/k: scroll   y: copy   l: language   Esc: close";
                self.render_text_body(f, inner, &text, hint);
            }
            Stage::Failed(message) => {
                f.render_widget(
                    Paragraph::new(vec![
                        Line::from(Span::styled(
                            message.clone(),
                            Style::default().fg(palette.error),
                        ))
                        .centered(),
                        Line::default(),
                        Line::from(Span::styled(
                            "l: pick language   Esc: close",
                            Style::default().fg(palette.muted),
                        ))
                        .centered(),
                    ])
                    .style(Style::default().bg(palette.bg)),
                    centered_line(inner),
                );
            }
        }
    }

    fn render_languages(&mut self, f: &mut Frame, area: Rect) {
        let palette = current_palette();
        let (selection_bg, selection_fg) = palette.selection_colors(true);

        let header = Rect::new(area.x, area.y, area.width, 1);
        f.render_widget(
            Paragraph::new(" Translate into (Enter to start)")
                .style(Style::default().fg(palette.muted).bg(palette.bg)),
            header,
        );

        let list_area = Rect::new(
            area.x,
            area.y + 2,
            area.width,
            area.height.saturating_sub(2),
        );
        let items: Vec<ListItem> = LANGUAGES
            .iter()
            .map(|lang| {
                ListItem::new(Line::from(Span::styled(
                    format!("  {lang}"),
                    Style::default().fg(palette.text),
                )))
            })
            .collect();

        let list = List::new(items)
            .highlight_style(
                Style::default()
                    .bg(selection_bg)
                    .fg(selection_fg)
                    .add_modifier(Modifier::BOLD),
            )
            .style(Style::default().bg(palette.bg));

        self.last_list_area = Some(list_area);
        f.render_stateful_widget(list, list_area, &mut self.list_state);
    }

    fn render_text_body(&mut self, f: &mut Frame, area: Rect, text: &str, hint: &str) {
        let palette = current_palette();

        let body = Rect::new(
            area.x + 1,
            area.y,
            area.width.saturating_sub(2),
            area.height.saturating_sub(2),
        );
        let wrap_width = body.width.max(1) as usize;
        let lines: Vec<Line> = textwrap::wrap(text, wrap_width)
            .into_iter()
            .map(|cow| Line::from(cow.into_owned()))
            .collect();

        let max_scroll = lines.len().saturating_sub(body.height as usize) as u16;
        self.scroll = self.scroll.min(max_scroll);

        f.render_widget(
            Paragraph::new(lines)
                .scroll((self.scroll, 0))
                .style(Style::default().fg(palette.text).bg(palette.bg)),
            body,
        );

        let hint_area = Rect::new(
            area.x,
            area.y + area.height.saturating_sub(1),
            area.width,
            1,
        );
        f.render_widget(
            Paragraph::new(hint)
                .alignment(Alignment::Center)
                .style(Style::default().fg(palette.muted).bg(palette.bg)),
            hint_area,
        );
    }
}

fn centered_line(area: Rect) -> Rect {
    Rect::new(
        area.x,
        area.y + area.height / 3,
        area.width,
        area.height.saturating_sub(area.height / 3),
    )
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
