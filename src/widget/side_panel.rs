//! Side panel: outline tree, bookmarks, page list
//!
//! Three tabs switched with `1`/`2`/`3`. The outline tab shows the
//! document's own hierarchy with per-node folding; the pages tab is a flat
//! jump list with bookmark markers.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::bookmarks::Bookmark;
use crate::doc::{OutlineNode, OutlineTarget, flatten_visible, resolve_target};
use crate::theme::current_palette;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelTab {
    Outline,
    Bookmarks,
    Pages,
}

impl PanelTab {
    fn label(self) -> &'static str {
        match self {
            PanelTab::Outline => "1 Outline",
            PanelTab::Bookmarks => "2 Bookmarks",
            PanelTab::Pages => "3 Pages",
        }
    }
}

/// What the app should do in response to panel input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelAction {
    /// Navigate to a page (0-indexed) and close the panel
    Jump(usize),
    /// Open an external link target
    OpenExternal(String),
    /// Delete the bookmark with this id
    RemoveBookmark(String),
    /// Rename the bookmark with this id
    RenameBookmark { id: String, title: String },
    /// Close the panel
    Close,
}

/// Everything the panel reads while handling input and drawing
pub struct PanelContext<'a> {
    pub outline: &'a [OutlineNode],
    pub bookmarks: &'a [Bookmark],
    pub page_count: usize,
    pub current_page: usize,
}

struct RenameState {
    id: String,
    input: String,
}

pub struct SidePanel {
    tab: PanelTab,
    selected: usize,
    list_state: ListState,
    /// Outline paths the user folded shut
    collapsed: Vec<Vec<usize>>,
    rename: Option<RenameState>,
    last_list_area: Option<Rect>,
    /// Column spans of the tab labels, rebuilt every render for click
    /// hit-testing
    tab_spans: Vec<(PanelTab, u16, u16)>,
}

impl Default for SidePanel {
    fn default() -> Self {
        Self::new()
    }
}

impl SidePanel {
    #[must_use]
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        Self {
            tab: PanelTab::Outline,
            selected: 0,
            list_state,
            collapsed: Vec::new(),
            rename: None,
            last_list_area: None,
            tab_spans: Vec::new(),
        }
    }

    /// Prepare the panel for opening: pick the default tab (outline when the
    /// document has one, pages otherwise) and align the selection.
    pub fn open_for(&mut self, ctx: &PanelContext) {
        self.tab = if ctx.outline.is_empty() {
            PanelTab::Pages
        } else {
            PanelTab::Outline
        };
        self.rename = None;
        self.reset_selection(ctx);
    }

    #[must_use]
    pub fn tab(&self) -> PanelTab {
        self.tab
    }

    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// True while a bookmark title is being edited; all keys belong to the
    /// panel then.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.rename.is_some()
    }

    fn set_tab(&mut self, tab: PanelTab, ctx: &PanelContext) {
        if self.tab != tab {
            self.tab = tab;
            self.rename = None;
            self.reset_selection(ctx);
        }
    }

    fn reset_selection(&mut self, ctx: &PanelContext) {
        self.selected = match self.tab {
            // Start the pages tab on the page being read
            PanelTab::Pages => ctx.current_page.min(ctx.page_count.saturating_sub(1)),
            _ => 0,
        };
        self.list_state.select(Some(self.selected));
        *self.list_state.offset_mut() = 0;
    }

    fn row_count(&self, ctx: &PanelContext) -> usize {
        match self.tab {
            PanelTab::Outline => flatten_visible(ctx.outline, &self.collapsed).len(),
            PanelTab::Bookmarks => ctx.bookmarks.len(),
            PanelTab::Pages => ctx.page_count,
        }
    }

    fn clamp_selection(&mut self, ctx: &PanelContext) {
        let rows = self.row_count(ctx);
        if rows == 0 {
            self.selected = 0;
            self.list_state.select(None);
        } else {
            self.selected = self.selected.min(rows - 1);
            self.list_state.select(Some(self.selected));
        }
    }

    fn move_selection(&mut self, ctx: &PanelContext, delta: i64) {
        let rows = self.row_count(ctx);
        if rows == 0 {
            return;
        }
        let target = (self.selected as i64 + delta).clamp(0, rows as i64 - 1);
        self.selected = target as usize;
        self.list_state.select(Some(self.selected));
    }

    pub fn handle_key(&mut self, key: KeyEvent, ctx: &PanelContext) -> Option<PanelAction> {
        if self.rename.is_some() {
            return self.handle_rename_key(key);
        }

        match key.code {
            KeyCode::Char('1') => {
                self.set_tab(PanelTab::Outline, ctx);
                None
            }
            KeyCode::Char('2') => {
                self.set_tab(PanelTab::Bookmarks, ctx);
                None
            }
            KeyCode::Char('3') => {
                self.set_tab(PanelTab::Pages, ctx);
                None
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.move_selection(ctx, 1);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.move_selection(ctx, -1);
                None
            }
            KeyCode::Enter => self.activate_selected(ctx),
            KeyCode::Char(' ') => {
                self.toggle_fold(ctx);
                None
            }
            KeyCode::Char('r') => {
                self.start_rename(ctx);
                None
            }
            KeyCode::Char('d') => self.remove_selected(ctx),
            KeyCode::Esc => Some(PanelAction::Close),
            _ => None,
        }
    }

    fn handle_rename_key(&mut self, key: KeyEvent) -> Option<PanelAction> {
        let rename = self.rename.as_mut()?;

        match key.code {
            KeyCode::Char(c) => {
                rename.input.push(c);
                None
            }
            KeyCode::Backspace => {
                rename.input.pop();
                None
            }
            KeyCode::Enter => {
                let rename = self.rename.take()?;
                let title = rename.input.trim().to_string();
                if title.is_empty() {
                    // An emptied title keeps the old one
                    None
                } else {
                    Some(PanelAction::RenameBookmark {
                        id: rename.id,
                        title,
                    })
                }
            }
            KeyCode::Esc => {
                self.rename = None;
                None
            }
            _ => None,
        }
    }

    fn activate_selected(&mut self, ctx: &PanelContext) -> Option<PanelAction> {
        match self.tab {
            PanelTab::Outline => {
                let rows = flatten_visible(ctx.outline, &self.collapsed);
                let row = rows.get(self.selected)?;
                if let Some(page) = resolve_target(&row.target, ctx.page_count) {
                    Some(PanelAction::Jump(page))
                } else if let OutlineTarget::External(uri) = &row.target {
                    Some(PanelAction::OpenExternal(uri.clone()))
                } else {
                    None
                }
            }
            PanelTab::Bookmarks => {
                let bookmark = ctx.bookmarks.get(self.selected)?;
                Some(PanelAction::Jump(
                    bookmark.page.min(ctx.page_count.saturating_sub(1)),
                ))
            }
            PanelTab::Pages => {
                if self.selected < ctx.page_count {
                    Some(PanelAction::Jump(self.selected))
                } else {
                    None
                }
            }
        }
    }

    fn toggle_fold(&mut self, ctx: &PanelContext) {
        if self.tab != PanelTab::Outline {
            return;
        }
        let rows = flatten_visible(ctx.outline, &self.collapsed);
        let Some(row) = rows.get(self.selected) else {
            return;
        };
        if !row.has_children {
            return;
        }

        if let Some(pos) = self.collapsed.iter().position(|p| *p == row.path) {
            self.collapsed.remove(pos);
        } else {
            self.collapsed.push(row.path.clone());
        }
        self.clamp_selection(ctx);
    }

    fn start_rename(&mut self, ctx: &PanelContext) {
        if self.tab != PanelTab::Bookmarks {
            return;
        }
        if let Some(bookmark) = ctx.bookmarks.get(self.selected) {
            self.rename = Some(RenameState {
                id: bookmark.id.clone(),
                input: bookmark.title.clone(),
            });
        }
    }

    fn remove_selected(&mut self, ctx: &PanelContext) -> Option<PanelAction> {
        if self.tab != PanelTab::Bookmarks {
            return None;
        }
        let bookmark = ctx.bookmarks.get(self.selected)?;
        Some(PanelAction::RemoveBookmark(bookmark.id.clone()))
    }

    /// Mouse click inside the panel. Tab labels switch tabs, list rows are
    /// selected and activated in one go.
    pub fn handle_click(
        &mut self,
        column: u16,
        row: u16,
        ctx: &PanelContext,
    ) -> Option<PanelAction> {
        let tab_row = self.tab_row()?;
        let clicked_tab = self
            .tab_spans
            .iter()
            .find(|(_, start, end)| row == tab_row && column >= *start && column < *end)
            .map(|(tab, _, _)| *tab);
        if let Some(tab) = clicked_tab {
            self.set_tab(tab, ctx);
            return None;
        }

        let list_area = self.last_list_area?;
        if column < list_area.x
            || column >= list_area.x.saturating_add(list_area.width)
            || row < list_area.y
            || row >= list_area.y.saturating_add(list_area.height)
        {
            return None;
        }

        let index = self.list_state.offset() + usize::from(row - list_area.y);
        if index >= self.row_count(ctx) {
            return None;
        }

        self.rename = None;
        self.selected = index;
        self.list_state.select(Some(index));
        self.activate_selected(ctx)
    }

    fn tab_row(&self) -> Option<u16> {
        self.last_list_area.map(|area| area.y.saturating_sub(2))
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, ctx: &PanelContext) {
        let palette = current_palette();
        self.clamp_selection(ctx);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Document ")
            .border_style(Style::default().fg(palette.border_focus))
            .style(Style::default().bg(palette.bg));
        let inner = block.inner(area);
        f.render_widget(block, area);

        if inner.height < 3 || inner.width < 4 {
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        self.render_tab_bar(f, chunks[0]);
        self.last_list_area = Some(chunks[2]);

        match self.tab {
            PanelTab::Outline => self.render_outline(f, chunks[2], ctx),
            PanelTab::Bookmarks => self.render_bookmarks(f, chunks[2], ctx),
            PanelTab::Pages => self.render_pages(f, chunks[2], ctx),
        }
    }

    fn render_tab_bar(&mut self, f: &mut Frame, area: Rect) {
        let palette = current_palette();
        self.tab_spans.clear();

        let mut spans = vec![Span::styled(" ", Style::default().bg(palette.bg))];
        let mut column = area.x + 1;

        for tab in [PanelTab::Outline, PanelTab::Bookmarks, PanelTab::Pages] {
            let label = tab.label();
            let width = label.chars().count() as u16 + 2;
            let style = if tab == self.tab {
                Style::default()
                    .fg(palette.selection_fg)
                    .bg(palette.selection_bg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.muted).bg(palette.bg)
            };

            spans.push(Span::styled(format!(" {label} "), style));
            self.tab_spans.push((tab, column, column + width));
            column += width;
        }

        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_outline(&mut self, f: &mut Frame, area: Rect, ctx: &PanelContext) {
        let palette = current_palette();

        if ctx.outline.is_empty() {
            self.render_empty(f, area, "No outline in this document");
            return;
        }

        let rows = flatten_visible(ctx.outline, &self.collapsed);
        let items: Vec<ListItem> = rows
            .iter()
            .map(|row| {
                let icon = if !row.has_children {
                    "  "
                } else if self.collapsed.iter().any(|p| *p == row.path) {
                    "▶ "
                } else {
                    "▼ "
                };

                let style = match row.target {
                    OutlineTarget::External(_) => Style::default().fg(palette.accent),
                    _ => Style::default().fg(palette.text),
                };

                ListItem::new(Line::from(vec![Span::styled(
                    format!("{}{}{}", "  ".repeat(row.depth), icon, row.title),
                    style,
                )]))
            })
            .collect();

        self.render_list(f, area, items);
    }

    fn render_bookmarks(&mut self, f: &mut Frame, area: Rect, ctx: &PanelContext) {
        let palette = current_palette();

        if ctx.bookmarks.is_empty() {
            self.render_empty(f, area, "No bookmarks yet\n\nPress b on a page to add one");
            return;
        }

        let items: Vec<ListItem> = ctx
            .bookmarks
            .iter()
            .map(|bookmark| {
                let editing = self
                    .rename
                    .as_ref()
                    .filter(|rename| rename.id == bookmark.id);

                let mut spans = vec![Span::styled(
                    format!("p.{:<4}", bookmark.page + 1),
                    Style::default().fg(palette.accent),
                )];

                if let Some(rename) = editing {
                    spans.push(Span::styled(
                        format!("{}▏", rename.input),
                        Style::default()
                            .fg(palette.text_bright)
                            .add_modifier(Modifier::BOLD),
                    ));
                } else {
                    spans.push(Span::styled(
                        bookmark.title.clone(),
                        Style::default().fg(palette.text),
                    ));
                }

                ListItem::new(Line::from(spans))
            })
            .collect();

        self.render_list(f, area, items);
    }

    fn render_pages(&mut self, f: &mut Frame, area: Rect, ctx: &PanelContext) {
        let palette = current_palette();

        let items: Vec<ListItem> = (0..ctx.page_count)
            .map(|page| {
                let style = if page == ctx.current_page {
                    Style::default()
                        .fg(palette.text_bright)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(palette.text)
                };

                let mut spans = vec![Span::styled(format!("Page {}", page + 1), style)];
                if ctx.bookmarks.iter().any(|b| b.page == page) {
                    spans.push(Span::styled(
                        "  ♦",
                        Style::default().fg(palette.warning),
                    ));
                }

                ListItem::new(Line::from(spans))
            })
            .collect();

        self.render_list(f, area, items);
    }

    fn render_list(&mut self, f: &mut Frame, area: Rect, items: Vec<ListItem>) {
        let palette = current_palette();
        let (selection_bg, selection_fg) = palette.selection_colors(true);

        let list = List::new(items)
            .highlight_style(Style::default().bg(selection_bg).fg(selection_fg))
            .style(Style::default().bg(palette.bg));

        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_empty(&self, f: &mut Frame, area: Rect, message: &str) {
        let palette = current_palette();
        let lines: Vec<Line> = message
            .lines()
            .map(|line| Line::from(line.to_string()).centered())
            .collect();

        let vertical_offset = area.height.saturating_sub(lines.len() as u16) / 3;
        let text_area = Rect::new(
            area.x,
            area.y + vertical_offset,
            area.width,
            area.height.saturating_sub(vertical_offset),
        );

        f.render_widget(
            Paragraph::new(lines).style(Style::default().fg(palette.muted).bg(palette.bg)),
            text_area,
        );
    }
}
