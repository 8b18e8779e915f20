//! Document engine infrastructure
//!
//! Thin wrappers around mupdf running on a pool of worker threads. The UI
//! thread talks to the pool through [`DocService`] and never blocks on the
//! engine.

mod cache;
mod outline;
mod request;
mod service;
mod state;
mod types;
mod worker;

pub use cache::{CacheKey, PageCache, TextCache};
pub use outline::{OutlineNode, OutlineTarget, VisibleOutlineRow, flatten_visible, resolve_target};
pub use request::{EngineRequest, EngineResponse, RenderParams, RequestId, WorkerFault};
pub use service::DocService;
pub use state::{Command, Effect, MAX_ZOOM, MIN_ZOOM, ViewState, ZOOM_STEP};
pub use types::{DocumentInfo, ImageData, LinkRect, LinkTarget, PageData};

/// Rendered pages kept in the LRU cache
pub const DEFAULT_CACHE_SIZE: usize = 24;

/// Pages prefetched on each side of the current one
pub const DEFAULT_PREFETCH_RADIUS: usize = 2;

/// Upper bound on render worker threads
pub const MAX_WORKERS: usize = 4;

/// Hard cap on either pixmap dimension, pre-zoom viewports stay far below it
pub const MAX_RENDER_DIMENSION: f32 = 4096.0;
