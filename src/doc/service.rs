//! Document service - manages the worker pool, caches, and view state

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use log::warn;
use mupdf::Document;

use super::cache::{CacheKey, PageCache, TextCache};
use super::outline::build_outline;
use super::request::{EngineRequest, EngineResponse, RequestId, WorkerFault};
use super::state::{Command, Effect, ViewState};
use super::types::{DocumentInfo, PageData};
use super::worker::engine_worker;
use super::{DEFAULT_CACHE_SIZE, DEFAULT_PREFETCH_RADIUS, MAX_WORKERS};
use crate::search::{self, SearchHit};

#[derive(Debug)]
enum PendingRequest {
    Page(usize),
    Prefetch(usize),
    PageText(usize),
}

/// A search in flight, waiting for every page-range part to report back
struct SearchAssembly {
    query: String,
    parts_remaining: usize,
    hits: Vec<SearchHit>,
}

/// Manages the document engine with worker threads and caching
pub struct DocService {
    state: ViewState,
    request_tx: Sender<EngineRequest>,
    response_tx: Sender<EngineResponse>,
    response_rx: Receiver<EngineResponse>,
    next_request_id: u64,
    pending_requests: HashMap<RequestId, PendingRequest>,
    pending_searches: HashMap<RequestId, SearchAssembly>,
    page_cache: Arc<Mutex<PageCache>>,
    text_cache: Arc<Mutex<TextCache>>,
    num_workers: usize,
    prefetch_radius: usize,
    prefetch_in_flight: HashSet<usize>,
    doc_info: DocumentInfo,
}

impl DocService {
    /// Create a new service with default configuration
    pub fn new(doc_path: PathBuf, black: i32, white: i32) -> Result<Self, WorkerFault> {
        let num_workers = std::thread::available_parallelism()
            .map_or(2, std::num::NonZero::get)
            .min(MAX_WORKERS);

        Self::with_config(
            doc_path,
            black,
            white,
            num_workers,
            DEFAULT_CACHE_SIZE,
            DEFAULT_PREFETCH_RADIUS,
        )
    }

    /// Create a new service with custom configuration
    pub fn with_config(
        doc_path: PathBuf,
        black: i32,
        white: i32,
        num_workers: usize,
        cache_size: usize,
        prefetch_radius: usize,
    ) -> Result<Self, WorkerFault> {
        let doc_info = Self::load_document_info(&doc_path)?;

        let page_cache = Arc::new(Mutex::new(PageCache::new(cache_size)));
        let text_cache = Arc::new(Mutex::new(TextCache::new()));

        let num_workers = num_workers.max(1);
        let (request_tx, response_tx, response_rx) =
            Self::spawn_workers(&doc_path, num_workers, &page_cache, &text_cache);

        let mut state = ViewState::new(doc_path, black, white);
        state.page_count = doc_info.page_count;

        Ok(Self {
            state,
            request_tx,
            response_tx,
            response_rx,
            next_request_id: 1,
            pending_requests: HashMap::new(),
            pending_searches: HashMap::new(),
            page_cache,
            text_cache,
            num_workers,
            prefetch_radius,
            prefetch_in_flight: HashSet::new(),
            doc_info,
        })
    }

    fn spawn_workers(
        doc_path: &Path,
        num_workers: usize,
        page_cache: &Arc<Mutex<PageCache>>,
        text_cache: &Arc<Mutex<TextCache>>,
    ) -> (
        Sender<EngineRequest>,
        Sender<EngineResponse>,
        Receiver<EngineResponse>,
    ) {
        // We use flume for MPMC (multi-producer, multi-consumer) channels.
        // std::sync::mpsc is MPSC only - its Receiver cannot be cloned. We
        // need multiple workers pulling from one shared request queue.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        for _ in 0..num_workers {
            let path = doc_path.to_path_buf();
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let pages = Arc::clone(page_cache);
            let texts = Arc::clone(text_cache);

            std::thread::spawn(move || {
                engine_worker(&path, rx, tx, pages, texts);
            });
        }

        (request_tx, response_tx, response_rx)
    }

    fn load_document_info(doc_path: &Path) -> Result<DocumentInfo, WorkerFault> {
        let doc = Document::open(doc_path.to_string_lossy().as_ref())?;
        let page_count = doc.page_count()? as usize;

        if page_count == 0 {
            return Err(WorkerFault::generic("Document has no pages"));
        }

        let title = doc
            .metadata(mupdf::MetadataName::Title)
            .ok()
            .filter(|t| !t.is_empty());

        let outline = match doc.outlines() {
            Ok(entries) => build_outline(&entries),
            Err(e) => {
                warn!("Failed to read document outline: {e}");
                Vec::new()
            }
        };

        Ok(DocumentInfo {
            page_count,
            title,
            outline,
        })
    }

    /// Get document metadata
    #[must_use]
    pub fn document_info(&self) -> &DocumentInfo {
        &self.doc_info
    }

    /// Get current view state
    #[must_use]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Set the current page without triggering any render effects.
    /// Use this to sync the initial page before the first render.
    pub fn set_current_page_no_render(&mut self, page: usize) {
        self.state.current_page = page.min(self.state.page_count.saturating_sub(1));
    }

    /// Apply a command to the view state
    pub fn apply_command(&mut self, cmd: Command) {
        let effects = self.state.apply(cmd);
        self.execute_effects(effects);
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::InvalidateCache => {
                    self.page_cache
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .invalidate_all();
                    self.prefetch_in_flight.clear();
                }

                Effect::InvalidatePage(page) => {
                    self.page_cache
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .invalidate_page(page);
                    self.prefetch_in_flight.remove(&page);
                }

                Effect::RenderCurrentPage => {
                    self.request_page(self.state.current_page);
                }

                Effect::RenderPage(page) => {
                    self.request_page(page);
                }

                Effect::ReloadDocument => {
                    self.reload_document();
                }

                Effect::UpdatePrefetch => {
                    self.schedule_prefetch();
                }
            }
        }
    }

    /// Reopen the document: restart the worker pool so every worker gets a
    /// fresh handle, drop cached text, and refresh metadata. On failure the
    /// previous document state stays live.
    fn reload_document(&mut self) {
        let info = match Self::load_document_info(&self.state.doc_path) {
            Ok(info) => info,
            Err(e) => {
                warn!("Reload failed, keeping current document: {e}");
                return;
            }
        };

        self.shutdown();
        let (request_tx, response_tx, response_rx) = Self::spawn_workers(
            &self.state.doc_path,
            self.num_workers,
            &self.page_cache,
            &self.text_cache,
        );
        self.request_tx = request_tx;
        self.response_tx = response_tx;
        self.response_rx = response_rx;

        self.pending_requests.clear();
        self.pending_searches.clear();
        self.prefetch_in_flight.clear();
        self.text_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();

        self.state.page_count = info.page_count;
        if self.state.current_page >= info.page_count {
            self.state.current_page = info.page_count - 1;
        }
        self.doc_info = info;

        self.request_page(self.state.current_page);
    }

    /// Request a page to be rendered
    pub fn request_page(&mut self, page: usize) -> RequestId {
        let id = self.next_id();
        let params = self.state.render_params();

        let _ = self
            .request_tx
            .send(EngineRequest::Page { id, page, params });
        self.pending_requests.insert(id, PendingRequest::Page(page));
        self.prefetch_in_flight.remove(&page);

        id
    }

    /// Request a page only if it is not cached or already in flight.
    pub fn request_page_if_needed(&mut self, page: usize) -> Option<RequestId> {
        if self.is_page_cached(page) || self.is_page_in_flight(page) {
            return None;
        }

        Some(self.request_page(page))
    }

    /// Request the plain text of a page
    pub fn request_page_text(&mut self, page: usize) -> RequestId {
        let id = self.next_id();

        let _ = self.request_tx.send(EngineRequest::PageText { id, page });
        self.pending_requests
            .insert(id, PendingRequest::PageText(page));

        id
    }

    /// Get page text if a worker has already extracted it
    #[must_use]
    pub fn cached_page_text(&self, page: usize) -> Option<Arc<String>> {
        self.text_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(page)
    }

    /// Start a document-wide search, fanning page ranges across the pool.
    /// Any search still assembling is superseded and its late parts dropped.
    pub fn request_search(&mut self, query: &str) -> RequestId {
        self.pending_searches.clear();

        let id = self.next_id();
        let page_count = self.state.page_count;
        let chunk = page_count.div_ceil(self.num_workers).max(1);

        let mut parts = 0;
        let mut start = 0;
        while start < page_count {
            let end = (start + chunk).min(page_count);
            let _ = self.request_tx.send(EngineRequest::Search {
                id,
                query: query.to_string(),
                start_page: start,
                end_page: end,
            });
            parts += 1;
            start = end;
        }

        if parts == 0 {
            let _ = self.response_tx.send(EngineResponse::Search {
                id,
                query: query.to_string(),
                hits: Vec::new(),
            });
        } else {
            self.pending_searches.insert(
                id,
                SearchAssembly {
                    query: query.to_string(),
                    parts_remaining: parts,
                    hits: Vec::new(),
                },
            );
        }

        id
    }

    fn prefetch_page(&mut self, page: usize) -> RequestId {
        let id = self.next_id();
        let params = self.state.render_params();

        let _ = self
            .request_tx
            .send(EngineRequest::Prefetch { id, page, params });
        self.pending_requests
            .insert(id, PendingRequest::Prefetch(page));
        self.prefetch_in_flight.insert(page);

        id
    }

    fn schedule_prefetch(&mut self) {
        let current = self.state.current_page;
        let page_count = self.state.page_count;

        if page_count == 0 {
            return;
        }

        let key = CacheKey::from_params(current, &self.state.render_params());
        let current_cached = self
            .page_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&key);

        if !current_cached && !self.prefetch_in_flight.contains(&current) {
            self.request_page(current);
        }

        for offset in 1..=self.prefetch_radius {
            if current + offset < page_count {
                self.maybe_prefetch(current + offset);
            }
            if current >= offset {
                self.maybe_prefetch(current - offset);
            }
        }
    }

    fn maybe_prefetch(&mut self, page: usize) {
        if self.prefetch_in_flight.contains(&page) {
            return;
        }

        let key = CacheKey::from_params(page, &self.state.render_params());
        let cached = self
            .page_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&key);

        if !cached {
            self.prefetch_page(page);
        }
    }

    fn is_page_in_flight(&self, page: usize) -> bool {
        if self.prefetch_in_flight.contains(&page) {
            return true;
        }

        self.pending_requests.values().any(|request| match request {
            PendingRequest::Page(p) | PendingRequest::Prefetch(p) => *p == page,
            PendingRequest::PageText(_) => false,
        })
    }

    /// A demand render is outstanding. Prefetches do not count, they never
    /// block what the user is looking at.
    #[must_use]
    pub fn has_page_request_in_flight(&self) -> bool {
        self.pending_requests
            .values()
            .any(|request| matches!(request, PendingRequest::Page(_)))
    }

    /// Poll for completed engine responses. Search parts are absorbed here
    /// and surface only as a fully assembled [`EngineResponse::Search`].
    pub fn poll_responses(&mut self) -> Vec<EngineResponse> {
        let mut responses = vec![];

        while let Ok(response) = self.response_rx.try_recv() {
            match response {
                EngineResponse::Page { id, page, data } => {
                    self.pending_requests.remove(&id);
                    self.prefetch_in_flight.remove(&page);
                    responses.push(EngineResponse::Page { id, page, data });
                }

                EngineResponse::PageText { id, page, text } => {
                    self.pending_requests.remove(&id);
                    responses.push(EngineResponse::PageText { id, page, text });
                }

                EngineResponse::SearchPart { id, hits } => {
                    if let Some(done) = self.absorb_search_part(id, hits) {
                        responses.push(done);
                    }
                }

                EngineResponse::Error { id, error } => {
                    if let Some(PendingRequest::Page(page) | PendingRequest::Prefetch(page)) =
                        self.pending_requests.remove(&id)
                    {
                        self.prefetch_in_flight.remove(&page);
                    }
                    responses.push(EngineResponse::Error { id, error });
                }

                other => responses.push(other),
            }
        }

        responses
    }

    fn absorb_search_part(
        &mut self,
        id: RequestId,
        hits: Vec<SearchHit>,
    ) -> Option<EngineResponse> {
        let assembly = self.pending_searches.get_mut(&id)?;
        assembly.hits.extend(hits);
        assembly.parts_remaining = assembly.parts_remaining.saturating_sub(1);
        if assembly.parts_remaining > 0 {
            return None;
        }

        let assembly = self.pending_searches.remove(&id)?;
        let mut hits = assembly.hits;
        // Parts cover disjoint ranges; a stable sort restores page order
        // while keeping in-page match order
        hits.sort_by_key(|hit| hit.page);
        hits.truncate(search::MAX_HITS);

        Some(EngineResponse::Search {
            id,
            query: assembly.query,
            hits,
        })
    }

    /// Check if a page is cached for the current render parameters
    #[must_use]
    pub fn is_page_cached(&self, page: usize) -> bool {
        let key = CacheKey::from_params(page, &self.state.render_params());
        self.page_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&key)
    }

    /// Get a cached page if available
    #[must_use]
    pub fn get_cached_page(&self, page: usize) -> Option<Arc<PageData>> {
        let key = CacheKey::from_params(page, &self.state.render_params());
        self.page_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&key)
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(EngineRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for DocService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
