//! Application controller: owns the document service, widgets, and the
//! event loop.
//!
//! Input is dispatched by focus: one main panel (page view or side panel)
//! plus an optional popup. Popups draw over a dimmed frame and get every
//! key until they close.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use log::{debug, info, warn};
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use crate::bookmarks::{BookmarkStore, BookmarkToggle};
use crate::doc::{Command, DocService, EngineResponse, LinkTarget, RequestId, WorkerFault};
use crate::event_source::EventSource;
use crate::install;
use crate::notification::{NotificationLevel, NotificationManager};
use crate::search;
use crate::settings;
use crate::theme::{self, current_palette};
use crate::translate::{self, TranslateError, Translator};
use crate::watcher::DocWatcher;
use crate::widget::page_view::PAN_STEP;
use crate::widget::side_panel::PanelContext;
use crate::widget::{
    GotoAction, HelpPopup, HelpPopupAction, HudMessage, HudMode, InstallBanner, PageView,
    PanelAction, SearchOverlay, SearchOverlayAction, SidePanel, Toolbar, ToolbarStatus,
    TranslateOverlay, TranslateOverlayAction,
};

const HUD_DURATION: Duration = Duration::from_secs(2);
const HUD_ERROR_DURATION: Duration = Duration::from_secs(5);

/// Pan distance per wheel notch, larger than a keypress
const WHEEL_PAN_STEP: i32 = 24;

const PANEL_WIDTH: u16 = 34;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MainPanel {
    PageView,
    SidePanel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupWindow {
    Search,
    Translate,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusedPanel {
    Main(MainPanel),
    Popup(PopupWindow),
}

/// Translation waiting on page text and/or the translator thread
struct PendingTranslation {
    page: usize,
    language: String,
    text_request: Option<RequestId>,
    translate_request: Option<RequestId>,
}

pub struct AppOptions {
    /// Initial page, 0-indexed
    pub initial_page: usize,
    /// Watch the document file and reload on change
    pub watch: bool,
    /// Offer the install banner when applicable
    pub offer_install: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            initial_page: 0,
            watch: true,
            offer_install: true,
        }
    }
}

pub struct App {
    pub doc: DocService,
    pub bookmarks: BookmarkStore,
    translator: Translator,
    watcher: Option<DocWatcher>,

    pub toolbar: Toolbar,
    pub page_view: PageView,
    pub side_panel: SidePanel,
    pub search: SearchOverlay,
    pub translate: TranslateOverlay,
    pub help: HelpPopup,
    pub notifications: NotificationManager,
    pub hud: Option<HudMessage>,

    pub focused_panel: FocusedPanel,
    pub previous_main_panel: MainPanel,

    /// Key into the bookmark store, the document path as given
    pub doc_key: String,
    pub display_name: String,

    search_request: Option<RequestId>,
    pending_translation: Option<PendingTranslation>,
    copy_request: Option<RequestId>,
    translate_seq: u64,

    pub show_install_banner: bool,
    pub should_quit: bool,

    page_area: Rect,
    panel_area: Option<Rect>,
}

impl App {
    pub fn new(doc_path: PathBuf, bookmarks: BookmarkStore, options: &AppOptions) -> Result<Self> {
        let palette = current_palette();
        let mut doc = DocService::new(doc_path.clone(), palette.page_black, palette.page_white)?;
        doc.set_current_page_no_render(options.initial_page);

        let doc_key = doc_path.to_string_lossy().into_owned();
        let display_name = doc
            .document_info()
            .title
            .clone()
            .unwrap_or_else(|| file_stem(&doc_path));

        let watcher = if options.watch {
            match DocWatcher::new(&doc_path) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    warn!("File watching disabled: {e}");
                    None
                }
            }
        } else {
            None
        };

        let show_install_banner = options.offer_install
            && install::can_install()
            && !settings::is_install_prompt_dismissed();

        info!(
            "Opened {} ({} pages)",
            doc_path.display(),
            doc.document_info().page_count
        );

        Ok(Self {
            doc,
            bookmarks,
            translator: Translator::spawn(),
            watcher,
            toolbar: Toolbar::new(),
            page_view: PageView::new(),
            side_panel: SidePanel::new(),
            search: SearchOverlay::new(),
            translate: TranslateOverlay::new(),
            help: HelpPopup::new(),
            notifications: NotificationManager::new(),
            hud: None,
            focused_panel: FocusedPanel::Main(MainPanel::PageView),
            previous_main_panel: MainPanel::PageView,
            doc_key,
            display_name,
            search_request: None,
            pending_translation: None,
            copy_request: None,
            translate_seq: 0,
            show_install_banner,
            should_quit: false,
            page_area: Rect::default(),
            panel_area: None,
        })
    }

    /// App over an ephemeral store with watching and the install banner
    /// disabled, for driving with a simulated event source.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_test(doc_path: PathBuf) -> Result<Self> {
        settings::set_ephemeral(true);
        Self::new(
            doc_path,
            BookmarkStore::ephemeral(),
            &AppOptions {
                initial_page: 0,
                watch: false,
                offer_install: false,
            },
        )
    }

    // ---- input dispatch ------------------------------------------------

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Release {
                    self.handle_key(key);
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            // Area changes are picked up by the next draw
            Event::Resize(_, _) => {}
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.toolbar.is_goto_active() {
            if let Some(action) = self.toolbar.handle_goto_key(key) {
                match action {
                    GotoAction::Jump(page) => {
                        let count = self.doc.state().page_count;
                        if page < count {
                            self.jump_to_page(page);
                        } else {
                            self.show_hud_error(format!(
                                "No page {} (document has {count})",
                                page + 1
                            ));
                        }
                    }
                    GotoAction::Cancel => {}
                }
            }
            return;
        }

        match self.focused_panel {
            FocusedPanel::Popup(PopupWindow::Help) => {
                if let Some(HelpPopupAction::Close) = self.help.handle_key(key) {
                    self.close_popup();
                }
            }
            FocusedPanel::Popup(PopupWindow::Search) => self.handle_search_key(key),
            FocusedPanel::Popup(PopupWindow::Translate) => self.handle_translate_key(key),
            FocusedPanel::Main(MainPanel::SidePanel) => self.handle_panel_key(key),
            FocusedPanel::Main(MainPanel::PageView) => self.handle_page_key(key),
        }
    }

    fn handle_page_key(&mut self, key: KeyEvent) {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('?') => self.open_popup(PopupWindow::Help),
            KeyCode::Tab => self.toggle_side_panel(),
            KeyCode::Esc => {
                if self.notifications.has_notifications() {
                    self.notifications.dismiss_current();
                }
            }

            KeyCode::Right | KeyCode::Down if shift => self.pan_page(key.code),
            KeyCode::Left | KeyCode::Up if shift => self.pan_page(key.code),

            KeyCode::Char('l')
            | KeyCode::Right
            | KeyCode::Char(' ')
            | KeyCode::PageDown
            | KeyCode::Char('j') => self.next_page(),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp | KeyCode::Char('k') => {
                self.prev_page();
            }
            KeyCode::Char('g') => self.jump_to_page(0),
            KeyCode::Char('G') => {
                let last = self.doc.state().page_count.saturating_sub(1);
                self.jump_to_page(last);
            }
            KeyCode::Char(':') => self.toolbar.start_goto(),

            KeyCode::Char('J') => self.page_view.pan(0, PAN_STEP),
            KeyCode::Char('K') => self.page_view.pan(0, -PAN_STEP),
            KeyCode::Char('H') => self.page_view.pan(-PAN_STEP, 0),
            KeyCode::Char('L') => self.page_view.pan(PAN_STEP, 0),

            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom_in(),
            KeyCode::Char('-') => self.zoom_out(),
            KeyCode::Char('0') => self.reset_zoom(),

            KeyCode::Char('b') => self.toggle_bookmark(),
            KeyCode::Char('/') => self.open_search(),
            KeyCode::Char('n') => self.next_search_hit(),
            KeyCode::Char('N') => self.prev_search_hit(),
            KeyCode::Char('T') => self.open_translate(),
            KeyCode::Char('c') => self.copy_page_text(),
            KeyCode::Char('i') => self.toggle_invert_images(),
            KeyCode::Char('t') => self.toggle_theme(),

            KeyCode::Char('I') if self.show_install_banner => self.run_install(),
            KeyCode::Char('X') if self.show_install_banner => self.dismiss_install_banner(),

            _ => {}
        }
    }

    fn pan_page(&mut self, code: KeyCode) {
        match code {
            KeyCode::Down => self.page_view.pan(0, PAN_STEP),
            KeyCode::Up => self.page_view.pan(0, -PAN_STEP),
            KeyCode::Left => self.page_view.pan(-PAN_STEP, 0),
            KeyCode::Right => self.page_view.pan(PAN_STEP, 0),
            _ => {}
        }
    }

    fn handle_panel_key(&mut self, key: KeyEvent) {
        if !self.side_panel.is_editing() {
            match key.code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('?') => {
                    self.open_popup(PopupWindow::Help);
                    return;
                }
                KeyCode::Tab => {
                    self.toggle_side_panel();
                    return;
                }
                KeyCode::Esc if self.notifications.has_notifications() => {
                    self.notifications.dismiss_current();
                    return;
                }
                _ => {}
            }
        }

        let ctx = Self::panel_ctx(&self.doc, &self.bookmarks, &self.doc_key);
        let action = self.side_panel.handle_key(key, &ctx);
        if let Some(action) = action {
            self.apply_panel_action(action);
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        if let Some(action) = self.search.handle_key(key) {
            match action {
                SearchOverlayAction::Submit(query) => self.submit_search(&query),
                SearchOverlayAction::Jump(page) => {
                    self.jump_to_page(page);
                    self.close_popup();
                }
                SearchOverlayAction::Export => self.export_search_results(),
                SearchOverlayAction::Close => self.close_popup(),
            }
        }
    }

    fn handle_translate_key(&mut self, key: KeyEvent) {
        if let Some(action) = self.translate.handle_key(key) {
            match action {
                TranslateOverlayAction::Translate(language) => self.start_translation(language),
                TranslateOverlayAction::Copy(text) => {
                    self.copy_to_clipboard(&text, "Translation copied");
                }
                TranslateOverlayAction::Close => {
                    self.pending_translation = None;
                    self.close_popup();
                }
            }
        }
    }

    // ---- mouse ---------------------------------------------------------

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollDown => self.handle_wheel(&mouse, 1),
            MouseEventKind::ScrollUp => self.handle_wheel(&mouse, -1),
            MouseEventKind::Down(MouseButton::Left) => self.handle_click(mouse.column, mouse.row),
            _ => {}
        }
    }

    fn handle_wheel(&mut self, mouse: &MouseEvent, direction: i32) {
        if let FocusedPanel::Popup(_) = self.focused_panel {
            self.feed_scroll_key(direction);
            return;
        }

        if let Some(panel_area) = self.panel_area {
            if contains(panel_area, mouse.column, mouse.row) {
                self.feed_scroll_key(direction);
                return;
            }
        }

        if mouse.modifiers.contains(KeyModifiers::CONTROL) {
            if direction > 0 {
                self.zoom_out();
            } else {
                self.zoom_in();
            }
        } else if self.page_overflows() {
            self.page_view.pan(0, direction * WHEEL_PAN_STEP);
        } else if direction > 0 {
            self.next_page();
        } else {
            self.prev_page();
        }
    }

    /// Turn a wheel notch into the focused widget's j/k
    fn feed_scroll_key(&mut self, direction: i32) {
        let code = if direction > 0 {
            KeyCode::Down
        } else {
            KeyCode::Up
        };
        let key = KeyEvent::new(code, KeyModifiers::NONE);

        match self.focused_panel {
            FocusedPanel::Popup(PopupWindow::Search) => {
                let _ = self.search.handle_key(key);
            }
            FocusedPanel::Popup(PopupWindow::Translate) => {
                let _ = self.translate.handle_key(key);
            }
            FocusedPanel::Popup(PopupWindow::Help) => {
                let _ = self.help.handle_key(key);
            }
            FocusedPanel::Main(_) => {
                let ctx = Self::panel_ctx(&self.doc, &self.bookmarks, &self.doc_key);
                let _ = self.side_panel.handle_key(key, &ctx);
            }
        }
    }

    fn handle_click(&mut self, column: u16, row: u16) {
        match self.focused_panel {
            FocusedPanel::Popup(PopupWindow::Search) => {
                if let Some(action) = self.search.handle_click(column, row) {
                    if let SearchOverlayAction::Jump(page) = action {
                        self.jump_to_page(page);
                        self.close_popup();
                    }
                }
            }
            FocusedPanel::Popup(PopupWindow::Translate) => {
                if let Some(TranslateOverlayAction::Translate(language)) =
                    self.translate.handle_click(column, row)
                {
                    self.start_translation(language);
                }
            }
            FocusedPanel::Popup(PopupWindow::Help) => {}
            FocusedPanel::Main(_) => {
                if let Some(panel_area) = self.panel_area {
                    if contains(panel_area, column, row) {
                        let ctx = Self::panel_ctx(&self.doc, &self.bookmarks, &self.doc_key);
                        let action = self.side_panel.handle_click(column, row, &ctx);
                        if let Some(action) = action {
                            self.apply_panel_action(action);
                        }
                        return;
                    }
                }
                self.follow_link_at(column, row);
            }
        }
    }

    fn follow_link_at(&mut self, column: u16, row: u16) {
        let Some(page_data) = self.doc.get_cached_page(self.doc.state().current_page) else {
            return;
        };
        let target = self.page_view.link_at(&page_data, column, row).cloned();

        match target {
            Some(LinkTarget::Internal { page }) => {
                let clamped = page.min(self.doc.state().page_count.saturating_sub(1));
                self.jump_to_page(clamped);
            }
            Some(LinkTarget::External { uri }) => self.open_external(&uri),
            None => {}
        }
    }

    // ---- actions -------------------------------------------------------

    fn next_page(&mut self) {
        self.doc.apply_command(Command::NextPage);
        self.page_view.reset_pan();
    }

    fn prev_page(&mut self) {
        self.doc.apply_command(Command::PrevPage);
        self.page_view.reset_pan();
    }

    fn jump_to_page(&mut self, page: usize) {
        self.doc.apply_command(Command::GoToPage(page));
        self.page_view.reset_pan();
    }

    fn zoom_in(&mut self) {
        self.doc.apply_command(Command::ZoomIn);
        self.show_zoom_hud();
    }

    fn zoom_out(&mut self) {
        self.doc.apply_command(Command::ZoomOut);
        self.show_zoom_hud();
    }

    fn reset_zoom(&mut self) {
        self.doc.apply_command(Command::SetZoom(1.0));
        self.page_view.reset_pan();
        self.show_zoom_hud();
    }

    fn show_zoom_hud(&mut self) {
        let percent = (self.doc.state().zoom * 100.0).round() as i32;
        self.show_hud(format!("Zoom {percent}%"));
    }

    fn toggle_invert_images(&mut self) {
        self.doc.apply_command(Command::ToggleInvertImages);
        let message = if self.doc.state().invert_images {
            "Images keep original colors"
        } else {
            "Images follow the theme"
        };
        self.show_hud(message);
    }

    fn toggle_theme(&mut self) {
        let next = theme::current_theme_id().toggled();
        theme::set_theme(next);
        settings::set_theme_name(next.name());

        let palette = current_palette();
        self.doc.apply_command(Command::SetColors {
            black: palette.page_black,
            white: palette.page_white,
        });
        self.show_hud(format!("Theme: {}", next.name()));
    }

    fn toggle_bookmark(&mut self) {
        let page = self.doc.state().current_page;
        match self.bookmarks.toggle(&self.doc_key, page) {
            BookmarkToggle::Added => self.show_hud(format!("Bookmarked page {}", page + 1)),
            BookmarkToggle::Removed => {
                self.show_hud(format!("Bookmark removed from page {}", page + 1));
            }
        }
        self.persist_bookmarks();
    }

    /// Surface a failed bookmark write; the store already logged it.
    fn persist_bookmarks(&mut self) {
        if let Err(e) = self.bookmarks.save() {
            self.notifications
                .error(format!("Could not save bookmarks: {e}"));
        }
    }

    fn toggle_side_panel(&mut self) {
        match self.focused_panel {
            FocusedPanel::Main(MainPanel::SidePanel) => {
                self.focused_panel = FocusedPanel::Main(MainPanel::PageView);
            }
            _ => {
                let ctx = Self::panel_ctx(&self.doc, &self.bookmarks, &self.doc_key);
                self.side_panel.open_for(&ctx);
                self.focused_panel = FocusedPanel::Main(MainPanel::SidePanel);
            }
        }
    }

    fn apply_panel_action(&mut self, action: PanelAction) {
        match action {
            PanelAction::Jump(page) => {
                self.jump_to_page(page);
                self.focused_panel = FocusedPanel::Main(MainPanel::PageView);
            }
            PanelAction::OpenExternal(uri) => self.open_external(&uri),
            PanelAction::RemoveBookmark(id) => {
                if self.bookmarks.remove(&self.doc_key, &id) {
                    self.persist_bookmarks();
                    self.show_hud("Bookmark deleted");
                }
            }
            PanelAction::RenameBookmark { id, title } => {
                if self.bookmarks.rename(&self.doc_key, &id, &title) {
                    self.persist_bookmarks();
                }
            }
            PanelAction::Close => {
                self.focused_panel = FocusedPanel::Main(MainPanel::PageView);
            }
        }
    }

    fn open_search(&mut self) {
        self.search.open();
        self.open_popup(PopupWindow::Search);
    }

    fn submit_search(&mut self, query: &str) {
        let id = self.doc.request_search(query);
        self.search_request = Some(id);
        self.search.mark_searching();
        debug!("Search {id:?} submitted: {query}");
    }

    fn export_search_results(&mut self) {
        let outcome = match self.search.export_payload() {
            Some((query, hits)) => {
                let filename = search::export_filename(query);
                let report = search::format_export(query, &self.display_name, hits);
                match std::fs::write(&filename, report) {
                    Ok(()) => Ok(format!("Saved {} matches to {filename}", hits.len())),
                    Err(e) => Err(format!("Export failed: {e}")),
                }
            }
            None => return,
        };

        match outcome {
            Ok(message) => self.notifications.info(message),
            Err(message) => self.notifications.error(message),
        }
    }

    fn next_search_hit(&mut self) {
        let target = self.search.next_hit().map(|hit| hit.page);
        self.finish_hit_nav(target);
    }

    fn prev_search_hit(&mut self) {
        let target = self.search.prev_hit().map(|hit| hit.page);
        self.finish_hit_nav(target);
    }

    fn finish_hit_nav(&mut self, target: Option<usize>) {
        match target {
            Some(page) => {
                let info = self
                    .search
                    .position()
                    .map_or(String::new(), |(i, n)| format!("[{i}/{n}] "));
                self.jump_to_page(page);
                self.show_hud(format!("{info}page {}", page + 1));
            }
            None => self.show_hud_error("No search results"),
        }
    }

    fn open_translate(&mut self) {
        self.translate.open(&settings::get_translate_language());
        self.open_popup(PopupWindow::Translate);
    }

    fn start_translation(&mut self, language: String) {
        settings::set_translate_language(&language);
        let page = self.doc.state().current_page;
        self.translate.set_busy();

        if let Some(text) = self.doc.cached_page_text(page) {
            self.dispatch_translation(page, language, text.as_str().to_string());
        } else {
            let id = self.doc.request_page_text(page);
            self.pending_translation = Some(PendingTranslation {
                page,
                language,
                text_request: Some(id),
                translate_request: None,
            });
        }
    }

    fn dispatch_translation(&mut self, page: usize, language: String, text: String) {
        if text.trim().is_empty() {
            self.translate.set_error("No text found on this page".into());
            self.pending_translation = None;
            return;
        }

        let id = self.next_translate_id();
        self.translator.request(id, text, language.clone());
        self.pending_translation = Some(PendingTranslation {
            page,
            language,
            text_request: None,
            translate_request: Some(id),
        });
    }

    fn next_translate_id(&mut self) -> RequestId {
        self.translate_seq += 1;
        RequestId::new(self.translate_seq)
    }

    fn copy_page_text(&mut self) {
        let page = self.doc.state().current_page;
        if let Some(text) = self.doc.cached_page_text(page) {
            let text = text.as_str().to_string();
            self.deliver_page_text_copy(&text);
        } else {
            self.copy_request = Some(self.doc.request_page_text(page));
        }
    }

    fn deliver_page_text_copy(&mut self, text: &str) {
        if text.trim().is_empty() {
            self.show_hud_error("No text on this page");
        } else {
            self.copy_to_clipboard(text, "Page text copied");
        }
    }

    fn copy_to_clipboard(&mut self, text: &str, success_message: &str) {
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => self.show_hud(success_message),
            Err(e) => self
                .notifications
                .error(format!("Clipboard unavailable: {e}")),
        }
    }

    fn open_external(&mut self, uri: &str) {
        info!("Opening external link: {uri}");
        if let Err(e) = open::that(uri) {
            self.notifications
                .error(format!("Could not open link: {e}"));
        }
    }

    fn run_install(&mut self) {
        match install::install() {
            Ok(path) => {
                self.show_install_banner = false;
                self.notifications
                    .info(format!("Installed to {}", path.display()));
            }
            Err(e) => self.notifications.error(format!("Install failed: {e}")),
        }
    }

    fn dismiss_install_banner(&mut self) {
        self.show_install_banner = false;
        settings::set_install_prompt_dismissed(true);
    }

    fn open_popup(&mut self, popup: PopupWindow) {
        if let FocusedPanel::Main(panel) = self.focused_panel {
            self.previous_main_panel = panel;
        }
        self.focused_panel = FocusedPanel::Popup(popup);
    }

    fn close_popup(&mut self) {
        self.focused_panel = FocusedPanel::Main(self.previous_main_panel);
    }

    fn panel_ctx<'a>(
        doc: &'a DocService,
        bookmarks: &'a BookmarkStore,
        doc_key: &'a str,
    ) -> PanelContext<'a> {
        PanelContext {
            outline: &doc.document_info().outline,
            bookmarks: bookmarks.for_document(doc_key),
            page_count: doc.state().page_count,
            current_page: doc.state().current_page,
        }
    }

    fn page_overflows(&self) -> bool {
        if self.page_area.height == 0 {
            return false;
        }
        match self.doc.get_cached_page(self.doc.state().current_page) {
            Some(page) => page.image.height_px > u32::from(self.page_area.height) * 2,
            None => self.doc.state().zoom > 1.0,
        }
    }

    fn is_busy(&self) -> bool {
        self.doc.has_page_request_in_flight()
            || self.search.is_searching()
            || self.translate.is_waiting()
    }

    fn show_hud(&mut self, message: impl Into<String>) {
        self.hud = Some(HudMessage::new(message, HUD_DURATION, HudMode::Normal));
    }

    fn show_hud_error(&mut self, message: impl Into<String>) {
        self.hud = Some(HudMessage::new(message, HUD_ERROR_DURATION, HudMode::Error));
    }

    // ---- background channels -------------------------------------------

    /// Drain finished engine work. Returns true when something on screen
    /// may have changed.
    pub fn poll_engine(&mut self) -> bool {
        let responses = self.doc.poll_responses();
        if responses.is_empty() {
            return false;
        }

        for response in responses {
            match response {
                EngineResponse::Page { page, .. } => {
                    debug!("Page {page} rendered");
                }
                EngineResponse::PageText { id, text, .. } => {
                    self.on_page_text(id, &text);
                }
                EngineResponse::Search { id, query, hits } => {
                    if self.search_request == Some(id) {
                        self.search_request = None;
                        info!("Search \"{query}\" finished with {} hits", hits.len());
                        self.search.set_results(query, hits);
                    } else {
                        debug!("Dropping superseded search {id:?}");
                    }
                }
                // Parts are assembled inside the service
                EngineResponse::SearchPart { .. } => {}
                EngineResponse::Error { id, error } => self.on_engine_error(id, &error),
            }
        }
        true
    }

    fn on_page_text(&mut self, id: RequestId, text: &str) {
        if self.copy_request == Some(id) {
            self.copy_request = None;
            let text = text.to_string();
            self.deliver_page_text_copy(&text);
            return;
        }

        if let Some(pending) = self.pending_translation.take() {
            if pending.text_request == Some(id) {
                self.dispatch_translation(pending.page, pending.language, text.to_string());
            } else {
                self.pending_translation = Some(pending);
            }
        }
    }

    fn on_engine_error(&mut self, id: RequestId, error: &WorkerFault) {
        warn!("Engine request {id:?} failed: {error}");

        if self.copy_request == Some(id) {
            self.copy_request = None;
        }
        if let Some(pending) = &self.pending_translation {
            if pending.text_request == Some(id) {
                self.pending_translation = None;
                self.translate
                    .set_error(format!("Could not read page text: {error}"));
                return;
            }
        }

        self.notifications.error(error.to_string());
    }

    /// Drain the translator thread, dropping superseded responses.
    pub fn poll_translator(&mut self) -> bool {
        let mut changed = false;

        while let Some(outcome) = self.translator.poll() {
            let expected = self
                .pending_translation
                .as_ref()
                .and_then(|pending| pending.translate_request);
            if expected != Some(outcome.id) {
                debug!("Dropping stale translation {:?}", outcome.id);
                continue;
            }

            self.pending_translation = None;
            match outcome.result {
                Ok(text) => self.translate.set_result(text),
                Err(TranslateError::MissingEndpoint) => {
                    self.translate
                        .set_error(TranslateError::MissingEndpoint.to_string());
                    self.notifications.warn(format!(
                        "Set translate_endpoint in the config file or {} to enable translation",
                        translate::ENDPOINT_ENV_VAR
                    ));
                }
                Err(e) => self.translate.set_error(format!("Translation failed: {e}")),
            }
            changed = true;
        }

        changed
    }

    /// Reload when the document file changed on disk.
    pub fn poll_watcher(&mut self) -> bool {
        let changed = self.watcher.as_mut().is_some_and(DocWatcher::poll_changed);
        if changed {
            info!("Document changed on disk, reloading");
            self.doc.apply_command(Command::Reload);
            self.notifications.info("Document reloaded after change on disk");
        }
        changed
    }

    /// Clear an expired HUD message.
    pub fn update_hud(&mut self) -> bool {
        if self.hud.as_ref().is_some_and(HudMessage::is_expired) {
            self.hud = None;
            true
        } else {
            false
        }
    }

    /// Advance spinner animations while background work is in flight.
    pub fn tick_spinners(&mut self) -> bool {
        let busy = self.is_busy();
        if busy {
            self.toolbar.tick();
            self.search.tick();
            self.translate.tick();
        }
        busy
    }

    // ---- drawing -------------------------------------------------------

    pub fn draw(&mut self, f: &mut Frame) {
        let palette = current_palette();
        f.render_widget(
            Block::default().style(Style::default().bg(palette.bg)),
            f.area(),
        );

        let mut constraints = vec![Constraint::Length(1), Constraint::Min(0)];
        if self.show_install_banner {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Length(1));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(f.area());

        let body = chunks[1];
        let panel_open = matches!(self.focused_panel, FocusedPanel::Main(MainPanel::SidePanel));
        let (panel_area, page_area) = if panel_open && body.width > PANEL_WIDTH {
            let halves = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(PANEL_WIDTH), Constraint::Min(0)])
                .split(body);
            (Some(halves[0]), halves[1])
        } else {
            (None, body)
        };
        self.panel_area = panel_area;
        self.page_area = page_area;

        // Adopt the viewport before pulling from the cache so resizes and
        // panel toggles re-render at the right size
        self.doc.apply_command(Command::SetArea(page_area));

        let page_data = self.doc.get_cached_page(self.doc.state().current_page);
        self.page_view.render(f, page_area, page_data.as_deref());

        if let Some(area) = panel_area {
            let ctx = Self::panel_ctx(&self.doc, &self.bookmarks, &self.doc_key);
            self.side_panel.render(f, area, &ctx);
        }

        self.render_toolbar(f, chunks[0]);

        let mut next_chunk = 2;
        if self.show_install_banner {
            InstallBanner::render(f, chunks[next_chunk]);
            next_chunk += 1;
        }
        self.render_status_bar(f, chunks[next_chunk]);

        if let FocusedPanel::Popup(popup) = self.focused_panel {
            let dim_block = Block::default().style(
                Style::default()
                    .bg(Color::Rgb(10, 10, 10))
                    .add_modifier(Modifier::DIM),
            );
            f.render_widget(dim_block, f.area());

            match popup {
                PopupWindow::Search => self.search.render(f, f.area()),
                PopupWindow::Translate => {
                    self.translate
                        .render(f, f.area(), self.doc.state().current_page);
                }
                PopupWindow::Help => self.help.render(f, f.area()),
            }
        }
    }

    fn render_toolbar(&mut self, f: &mut Frame, area: Rect) {
        let state = self.doc.state();
        let status = ToolbarStatus {
            title: &self.display_name,
            current_page: state.current_page,
            page_count: state.page_count,
            zoom: state.zoom,
            bookmarked: self.bookmarks.has_bookmark(&self.doc_key, state.current_page),
            busy: self.doc.has_page_request_in_flight(),
        };
        self.toolbar.render(f, area, &status);

        if let Some(hud) = &self.hud {
            if !hud.is_expired() {
                f.render_widget(Paragraph::new(hud.styled_line(current_palette())), area);
            }
        }
    }

    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let palette = current_palette();
        let base = Style::default().fg(palette.muted).bg(palette.surface);

        if let Some(notification) = self.notifications.current() {
            let (label, color) = match notification.level {
                NotificationLevel::Info => ("INFO", palette.success),
                NotificationLevel::Warning => ("WARN", palette.warning),
                NotificationLevel::Error => ("ERROR", palette.error),
            };
            let line = Line::from(vec![
                Span::styled(
                    format!(" [{label}] "),
                    Style::default()
                        .fg(color)
                        .bg(palette.surface)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    notification.message.clone(),
                    Style::default().fg(palette.text_bright).bg(palette.surface),
                ),
                Span::styled(" | Esc: Dismiss", base),
            ]);
            f.render_widget(Paragraph::new(line).style(base), area);
            return;
        }

        let hint = if self.toolbar.is_goto_active() {
            "Type a page number | Enter: Go | Esc: Cancel"
        } else {
            match self.focused_panel {
                FocusedPanel::Main(MainPanel::PageView) => {
                    "h/l: Pages | g/G: First/Last | /: Search | b: Bookmark | Tab: Panel | ?: Help | q: Quit"
                }
                FocusedPanel::Main(MainPanel::SidePanel) => {
                    "j/k: Move | Enter: Jump | Space: Fold | 1/2/3: Tabs | Tab: Close"
                }
                FocusedPanel::Popup(PopupWindow::Search) => {
                    "Enter: Search/Jump | j/k: Results | s: Export | Esc: Back/Close"
                }
                FocusedPanel::Popup(PopupWindow::Translate) => {
                    "j/k: Move | Enter: Translate | y: Copy | l: Languages | Esc: Close"
                }
                FocusedPanel::Popup(PopupWindow::Help) => "j/k: Scroll | Esc/?: Close",
            }
        };

        f.render_widget(Paragraph::new(format!(" {hint}")).style(base), area);
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |stem| {
            stem.to_string_lossy().into_owned()
        })
}

// ---- event loop --------------------------------------------------------

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();
    let mut first_render = true;

    loop {
        let mut events_processed = 0;
        while event_source.poll(Duration::from_millis(0))? && events_processed < 50 {
            let event = event_source.read()?;
            events_processed += 1;
            app.handle_event(event);
            if app.should_quit {
                break;
            }
        }

        let mut needs_redraw = events_processed > 0;
        if first_render {
            needs_redraw = true;
            first_render = false;
        }

        if last_tick.elapsed() >= tick_rate {
            if app.poll_engine() {
                needs_redraw = true;
            }
            if app.poll_translator() {
                needs_redraw = true;
            }
            if app.poll_watcher() {
                needs_redraw = true;
            }
            if app.notifications.update() {
                needs_redraw = true;
            }
            if app.update_hud() {
                needs_redraw = true;
            }
            if app.tick_spinners() {
                needs_redraw = true;
            }
            last_tick = Instant::now();
        }

        if needs_redraw {
            terminal.draw(|f| app.draw(f))?;
        }

        if app.should_quit {
            return Ok(());
        }

        // Nothing pending: sleep until the next tick or the next event
        if events_processed == 0 {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));
            let _ = event_source.poll(timeout);
        }
    }
}

/// Full-screen error shown when the document cannot be opened at startup.
/// Returns after the next keypress.
pub fn run_fatal_error_screen<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    doc_path: &Path,
    message: &str,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    terminal.draw(|f| draw_fatal_error(f, doc_path, message))?;

    loop {
        if event_source.poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event_source.read()? {
                if key.kind != KeyEventKind::Release {
                    return Ok(());
                }
            }
        }
    }
}

fn draw_fatal_error(f: &mut Frame, doc_path: &Path, message: &str) {
    let palette = current_palette();
    f.render_widget(
        Block::default().style(Style::default().bg(palette.bg)),
        f.area(),
    );

    let lines = vec![
        Line::from(Span::styled(
            "Could not open document",
            Style::default()
                .fg(palette.error)
                .add_modifier(Modifier::BOLD),
        ))
        .centered(),
        Line::default(),
        Line::from(Span::styled(
            doc_path.display().to_string(),
            Style::default().fg(palette.text_bright),
        ))
        .centered(),
        Line::default(),
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(palette.text),
        ))
        .centered(),
        Line::default(),
        Line::from(Span::styled(
            "Press any key to exit",
            Style::default().fg(palette.muted),
        ))
        .centered(),
    ];

    let height = lines.len() as u16;
    let y = f.area().height.saturating_sub(height) / 2;
    let area = Rect::new(f.area().x, f.area().y + y, f.area().width, height);
    f.render_widget(Paragraph::new(lines), area);
}
