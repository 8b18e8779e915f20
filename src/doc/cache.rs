//! Page and text caches shared between the service and its workers

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::request::RenderParams;
use super::types::PageData;

/// Cache key for a rendered page
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    page: usize,
    area_width: u16,
    area_height: u16,
    /// Zoom factor quantized to millionths so the key stays hashable
    zoom_millionths: u32,
    invert_images: bool,
}

impl CacheKey {
    #[must_use]
    pub fn from_params(page: usize, params: &RenderParams) -> Self {
        Self {
            page,
            area_width: params.area.width,
            area_height: params.area.height,
            zoom_millionths: (params.zoom * 1_000_000.0) as u32,
            invert_images: params.invert_images,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }
}

/// LRU cache of rendered pages
pub struct PageCache {
    cache: LruCache<CacheKey, Arc<PageData>>,
}

impl PageCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped above zero");
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<PageData>> {
        self.cache.get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert rendered data, returning the shared handle
    pub fn insert(&mut self, key: CacheKey, data: PageData) -> Arc<PageData> {
        let arc = Arc::new(data);
        self.cache.put(key, Arc::clone(&arc));
        arc
    }

    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    pub fn invalidate_page(&mut self, page: usize) {
        let keys: Vec<CacheKey> = self
            .cache
            .iter()
            .filter(|(key, _)| key.page == page)
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            self.cache.pop(&key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Memo cache of extracted page text, keyed by page number alone.
///
/// Text does not depend on render parameters, so entries survive zoom and
/// theme changes and are only dropped on document reload.
#[derive(Default)]
pub struct TextCache {
    pages: HashMap<usize, Arc<String>>,
}

impl TextCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page: usize) -> Option<Arc<String>> {
        self.pages.get(&page).cloned()
    }

    pub fn insert(&mut self, page: usize, text: String) -> Arc<String> {
        let arc = Arc::new(text);
        self.pages.insert(page, Arc::clone(&arc));
        arc
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::types::ImageData;
    use ratatui::layout::Rect;

    fn params(width: u16, height: u16, zoom: f32) -> RenderParams {
        RenderParams {
            area: Rect::new(0, 0, width, height),
            zoom,
            invert_images: false,
            black: 0x000000,
            white: 0xFFFFFF,
        }
    }

    fn page_data(page: usize) -> PageData {
        PageData {
            page_num: page,
            image: ImageData {
                pixels: vec![0; 12],
                width_px: 2,
                height_px: 2,
            },
            links: vec![],
            scale: 1.0,
        }
    }

    #[test]
    fn insert_and_get() {
        let mut cache = PageCache::new(4);
        let key = CacheKey::from_params(0, &params(80, 40, 1.0));

        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), page_data(0));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zoom_change_produces_distinct_keys() {
        let key_fit = CacheKey::from_params(0, &params(80, 40, 1.0));
        let key_zoomed = CacheKey::from_params(0, &params(80, 40, 1.25));
        assert_ne!(key_fit, key_zoomed);
    }

    #[test]
    fn lru_evicts_oldest() {
        let mut cache = PageCache::new(2);
        let keys: Vec<CacheKey> = (0..3)
            .map(|page| CacheKey::from_params(page, &params(80, 40, 1.0)))
            .collect();

        cache.insert(keys[0].clone(), page_data(0));
        cache.insert(keys[1].clone(), page_data(1));
        cache.insert(keys[2].clone(), page_data(2));

        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[1]).is_some());
        assert!(cache.get(&keys[2]).is_some());
    }

    #[test]
    fn invalidate_page_removes_all_variants() {
        let mut cache = PageCache::new(8);
        cache.insert(
            CacheKey::from_params(1, &params(80, 40, 1.0)),
            page_data(1),
        );
        cache.insert(
            CacheKey::from_params(1, &params(80, 40, 2.0)),
            page_data(1),
        );
        cache.insert(
            CacheKey::from_params(2, &params(80, 40, 1.0)),
            page_data(2),
        );

        cache.invalidate_page(1);

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&CacheKey::from_params(2, &params(80, 40, 1.0))));
    }

    #[test]
    fn text_cache_survives_by_page_number() {
        let mut cache = TextCache::new();
        assert!(cache.get(3).is_none());

        cache.insert(3, "hello world".to_string());
        let text = cache.get(3).expect("cached");
        assert_eq!(text.as_str(), "hello world");

        cache.clear();
        assert!(cache.is_empty());
    }
}
