//! Request and response types for the worker pool

use ratatui::layout::Rect;
use std::sync::Arc;

use crate::search::SearchHit;

use super::types::PageData;

/// Unique identifier for engine requests.
///
/// Superseded requests are never aborted; their ids simply stop being
/// current, and responses carrying a stale id are discarded on arrival.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Parameters for rendering a page
#[derive(Clone, Debug)]
pub struct RenderParams {
    /// Viewport area in terminal cells; workers interpret it as a
    /// `width x height*2` half-block pixel grid
    pub area: Rect,
    /// User zoom multiplier on top of the fit-to-viewport base scale
    pub zoom: f32,
    /// Keep embedded images untinted
    pub invert_images: bool,
    /// Theme tint endpoints (0xRRGGBB)
    pub black: i32,
    pub white: i32,
}

/// Request sent to engine workers
#[derive(Debug)]
pub enum EngineRequest {
    /// Render a page (high priority)
    Page {
        id: RequestId,
        page: usize,
        params: RenderParams,
    },

    /// Prefetch a page (low priority)
    Prefetch {
        id: RequestId,
        page: usize,
        params: RenderParams,
    },

    /// Extract the full text of one page
    PageText { id: RequestId, page: usize },

    /// Scan a page range for a query; one search fans out as several
    /// range requests across the pool
    Search {
        id: RequestId,
        query: String,
        start_page: usize,
        end_page: usize,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Errors from engine workers
#[derive(Debug, thiserror::Error)]
pub enum WorkerFault {
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl WorkerFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Response from engine workers.
///
/// `SearchPart` is pool-internal: the service assembles parts and emits a
/// single `Search` response once every range reported back.
#[derive(Debug)]
pub enum EngineResponse {
    /// Rendered page data
    Page {
        id: RequestId,
        page: usize,
        data: Arc<PageData>,
    },

    /// Extracted page text
    PageText {
        id: RequestId,
        page: usize,
        text: Arc<String>,
    },

    /// Hits from one scanned range
    SearchPart { id: RequestId, hits: Vec<SearchHit> },

    /// Assembled result of a full document scan
    Search {
        id: RequestId,
        query: String,
        hits: Vec<SearchHit>,
    },

    /// Error while serving a request
    Error { id: RequestId, error: WorkerFault },
}
