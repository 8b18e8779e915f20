//! View state management
//!
//! `ViewState::apply` is the single authority for page/zoom/viewport
//! transitions; callers execute the returned effects.

use std::path::PathBuf;

use ratatui::layout::Rect;

use super::request::RenderParams;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 4.0;
pub const ZOOM_STEP: f32 = 0.25;

/// Current view state for the open document
#[derive(Clone, Debug)]
pub struct ViewState {
    /// Path to the document
    pub doc_path: PathBuf,

    /// Current viewport area in terminal cells
    pub area: Rect,

    /// User zoom factor, 1.0 = fit to viewport
    pub zoom: f32,

    /// Keep embedded images untinted
    pub invert_images: bool,

    /// Current page (0-indexed)
    pub current_page: usize,

    /// Total page count
    pub page_count: usize,

    /// Theme tint endpoints
    pub black: i32,
    pub white: i32,
}

impl ViewState {
    #[must_use]
    pub fn new(doc_path: PathBuf, black: i32, white: i32) -> Self {
        Self {
            doc_path,
            area: Rect::default(),
            zoom: 1.0,
            invert_images: true,
            current_page: 0,
            page_count: 0,
            black,
            white,
        }
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Reload => {
                vec![Effect::InvalidateCache, Effect::ReloadDocument]
            }

            Command::SetArea(area) => {
                if self.area != area {
                    self.area = area;
                    vec![Effect::InvalidateCache, Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::SetZoom(zoom) => self.change_zoom(zoom),
            Command::ZoomIn => self.change_zoom(self.zoom + ZOOM_STEP),
            Command::ZoomOut => self.change_zoom(self.zoom - ZOOM_STEP),

            Command::ToggleInvertImages => {
                self.invert_images = !self.invert_images;
                vec![Effect::InvalidateCache, Effect::RenderCurrentPage]
            }

            Command::GoToPage(page) => self.change_page(page),
            Command::NextPage => self.change_page(self.current_page.saturating_add(1)),
            Command::PrevPage => self.change_page(self.current_page.saturating_sub(1)),

            Command::SetPageCount(count) => {
                self.page_count = count;
                if self.current_page >= count && count > 0 {
                    self.current_page = count - 1;
                }
                vec![]
            }

            Command::SetColors { black, white } => {
                if self.black != black || self.white != white {
                    self.black = black;
                    self.white = white;
                    vec![
                        Effect::InvalidateCache,
                        Effect::RenderCurrentPage,
                        Effect::UpdatePrefetch,
                    ]
                } else {
                    vec![]
                }
            }
        }
    }

    fn change_zoom(&mut self, zoom: f32) -> Vec<Effect> {
        let clamped = clamp_zoom(zoom);
        if (self.zoom - clamped).abs() > f32::EPSILON {
            self.zoom = clamped;
            vec![Effect::InvalidateCache, Effect::RenderCurrentPage]
        } else {
            vec![]
        }
    }

    fn change_page(&mut self, page: usize) -> Vec<Effect> {
        let clamped = page.min(self.page_count.saturating_sub(1));
        if self.current_page != clamped {
            self.current_page = clamped;
            vec![Effect::RenderCurrentPage, Effect::UpdatePrefetch]
        } else {
            vec![]
        }
    }

    /// Get render parameters from current state
    #[must_use]
    pub fn render_params(&self) -> RenderParams {
        RenderParams {
            area: self.area,
            zoom: self.zoom,
            invert_images: self.invert_images,
            black: self.black,
            white: self.white,
        }
    }
}

/// Clamp a zoom factor into the supported range, mapping NaN to fit
#[must_use]
pub fn clamp_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        1.0
    }
}

/// Commands that modify view state
#[derive(Clone, Debug)]
pub enum Command {
    /// Reload the document
    Reload,
    /// Set the viewport area
    SetArea(Rect),
    /// Set the zoom factor
    SetZoom(f32),
    /// Zoom in one step
    ZoomIn,
    /// Zoom out one step
    ZoomOut,
    /// Toggle image inversion
    ToggleInvertImages,
    /// Go to a specific page
    GoToPage(usize),
    /// Advance one page
    NextPage,
    /// Go back one page
    PrevPage,
    /// Update the page count
    SetPageCount(usize),
    /// Update theme colors
    SetColors { black: i32, white: i32 },
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Invalidate entire cache
    InvalidateCache,
    /// Invalidate a specific page
    InvalidatePage(usize),
    /// Render the current page
    RenderCurrentPage,
    /// Render a specific page
    RenderPage(usize),
    /// Reload document metadata
    ReloadDocument,
    /// Update prefetch queue
    UpdatePrefetch,
}
