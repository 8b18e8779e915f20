//! Engine worker - runs in separate thread(s), each owning a document handle

use std::path::Path;
use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use log::debug;
use mupdf::text_page::TextBlockType;
use mupdf::{Colorspace, Document, Matrix, Page, Pixmap, TextPageFlags};
use rayon::prelude::*;

use super::MAX_RENDER_DIMENSION;
use super::cache::{CacheKey, PageCache, TextCache};
use super::request::{EngineRequest, EngineResponse, RenderParams, RequestId, WorkerFault};
use super::types::{ImageData, LinkRect, LinkTarget, PageData};
use crate::search::{self, SearchHit};

/// Pre-computed rasterization parameters for a page
struct RasterSpec {
    transform: Matrix,
    mag: f32,
}

impl RasterSpec {
    fn compute(page_bounds: (f32, f32), viewport_px: (f32, f32), user_zoom: f32) -> Self {
        let (page_width, page_height) = page_bounds;
        let (view_width, view_height) = viewport_px;

        let base_mag = if page_width / page_height > view_width / view_height {
            view_width / page_width
        } else {
            view_height / page_height
        };

        let mut mag = base_mag * user_zoom;
        if !mag.is_finite() || mag <= 0.0 {
            mag = 1.0;
        }

        let max_dim = (page_width * mag).max(page_height * mag);
        if max_dim > MAX_RENDER_DIMENSION {
            mag *= MAX_RENDER_DIMENSION / max_dim;
        }

        Self {
            transform: Matrix::new_scale(mag, mag),
            mag,
        }
    }
}

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn engine_worker(
    doc_path: &Path,
    requests: Receiver<EngineRequest>,
    responses: Sender<EngineResponse>,
    page_cache: Arc<Mutex<PageCache>>,
    text_cache: Arc<Mutex<TextCache>>,
) {
    let doc = match Document::open(doc_path.to_string_lossy().as_ref()) {
        Ok(d) => d,
        Err(e) => {
            let _ = responses.send(EngineResponse::Error {
                id: RequestId::new(0),
                error: WorkerFault::Pdf(e),
            });
            return;
        }
    };

    for request in requests {
        match request {
            EngineRequest::Page { id, page, params }
            | EngineRequest::Prefetch { id, page, params } => {
                handle_page_request(&doc, id, page, &params, &page_cache, &responses);
            }

            EngineRequest::PageText { id, page } => {
                match cached_page_text(&doc, page, &text_cache) {
                    Ok(text) => {
                        let _ = responses.send(EngineResponse::PageText { id, page, text });
                    }
                    Err(error) => {
                        let _ = responses.send(EngineResponse::Error { id, error });
                    }
                }
            }

            EngineRequest::Search {
                id,
                query,
                start_page,
                end_page,
            } => {
                handle_search_request(
                    &doc,
                    id,
                    &query,
                    start_page,
                    end_page,
                    &text_cache,
                    &responses,
                );
            }

            EngineRequest::Shutdown => break,
        }
    }
}

fn handle_page_request(
    doc: &Document,
    id: RequestId,
    page_num: usize,
    params: &RenderParams,
    cache: &Arc<Mutex<PageCache>>,
    responses: &Sender<EngineResponse>,
) {
    let key = CacheKey::from_params(page_num, params);

    let cached = cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&key);
    if let Some(cached) = cached {
        let _ = responses.send(EngineResponse::Page {
            id,
            page: page_num,
            data: cached,
        });
        return;
    }

    match render_page(doc, page_num, params) {
        Ok(data) => {
            let cached = cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(key, data);
            let _ = responses.send(EngineResponse::Page {
                id,
                page: page_num,
                data: cached,
            });
        }
        Err(e) => {
            let _ = responses.send(EngineResponse::Error { id, error: e });
        }
    }
}

/// Render a single page to RGB pixels sized for the half-block viewport
pub fn render_page(
    doc: &Document,
    page_num: usize,
    params: &RenderParams,
) -> Result<PageData, WorkerFault> {
    let page = doc.load_page(page_num as i32)?;

    // Half blocks pack two pixel rows into each terminal row
    let viewport_px = (
        f32::from(params.area.width),
        f32::from(params.area.height) * 2.0,
    );

    let bounds = page.bounds()?;
    let page_bounds = (bounds.x1 - bounds.x0, bounds.y1 - bounds.y0);
    let spec = RasterSpec::compute(page_bounds, viewport_px, params.zoom);

    let rgb = Colorspace::device_rgb();
    let mut pixmap = page.to_pixmap(&spec.transform, &rgb, false, false)?;

    let patches = if params.invert_images {
        Vec::new()
    } else {
        snapshot_image_patches(&page, &pixmap, spec.mag)
    };

    pixmap.tint(params.white, params.black)?;
    restore_image_patches(&mut pixmap, &patches);

    let links = extract_link_rects(&page, spec.mag);
    let pixels = pixmap_to_rgb(&pixmap)?;

    Ok(PageData {
        page_num,
        image: ImageData {
            pixels,
            width_px: pixmap.width(),
            height_px: pixmap.height(),
        },
        links,
        scale: spec.mag,
    })
}

struct ImagePatch {
    x0: usize,
    y0: usize,
    width: usize,
    height: usize,
    data: Vec<u8>,
}

/// Copy out raster image regions so they survive the tint pass untouched
fn snapshot_image_patches(page: &Page, pixmap: &Pixmap, mag: f32) -> Vec<ImagePatch> {
    let flags = TextPageFlags::PRESERVE_IMAGES | TextPageFlags::ACCURATE_BBOXES;
    let Ok(text_page) = page.to_text_page(flags) else {
        return Vec::new();
    };

    let max_x = pixmap.width() as f32;
    let max_y = pixmap.height() as f32;
    let n = pixmap.n() as usize;
    let row_px = pixmap.width() as usize;
    let samples = pixmap.samples();

    let mut patches = Vec::new();
    for block in text_page.blocks() {
        if block.r#type() != TextBlockType::Image {
            continue;
        }

        let bbox = block.bounds();
        let x0 = (bbox.x0 * mag).floor().clamp(0.0, max_x) as usize;
        let y0 = (bbox.y0 * mag).floor().clamp(0.0, max_y) as usize;
        let x1 = (bbox.x1 * mag).ceil().clamp(0.0, max_x) as usize;
        let y1 = (bbox.y1 * mag).ceil().clamp(0.0, max_y) as usize;
        if x0 >= x1 || y0 >= y1 {
            continue;
        }

        let width = x1 - x0;
        let row_bytes = width * n;
        let mut data = Vec::with_capacity(row_bytes * (y1 - y0));
        for y in y0..y1 {
            let start = (y * row_px + x0) * n;
            data.extend_from_slice(&samples[start..start + row_bytes]);
        }

        patches.push(ImagePatch {
            x0,
            y0,
            width,
            height: y1 - y0,
            data,
        });
    }

    patches
}

fn restore_image_patches(pixmap: &mut Pixmap, patches: &[ImagePatch]) {
    if patches.is_empty() {
        return;
    }

    let n = pixmap.n() as usize;
    let row_px = pixmap.width() as usize;
    let samples = pixmap.samples_mut();

    for patch in patches {
        let row_bytes = patch.width * n;
        let rows = patch.y0..patch.y0 + patch.height;
        for (y, chunk) in rows.zip(patch.data.chunks_exact(row_bytes)) {
            let start = (y * row_px + patch.x0) * n;
            samples[start..start + row_bytes].copy_from_slice(chunk);
        }
    }
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, WorkerFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(WorkerFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err(WorkerFault::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row = &samples[y * stride..y * stride + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}

pub(crate) fn extract_link_rects(page: &Page, scale_factor: f32) -> Vec<LinkRect> {
    let Ok(links) = page.links() else {
        return Vec::new();
    };

    links
        .filter_map(|link| {
            let target = if let Some(dest) = link.dest {
                Some(LinkTarget::Internal {
                    page: dest.loc.page_number as usize,
                })
            } else if !link.uri.is_empty() {
                Some(LinkTarget::External {
                    uri: link.uri.clone(),
                })
            } else {
                None
            }?;

            let rect = link.bounds;
            if rect.is_empty() {
                return None;
            }

            let x0 = (rect.x0.min(rect.x1) * scale_factor).max(0.0);
            let y0 = (rect.y0.min(rect.y1) * scale_factor).max(0.0);
            let x1 = (rect.x0.max(rect.x1) * scale_factor).max(0.0);
            let y1 = (rect.y0.max(rect.y1) * scale_factor).max(0.0);

            Some(LinkRect {
                x0: x0 as u32,
                y0: y0 as u32,
                x1: x1 as u32,
                y1: y1 as u32,
                target,
            })
        })
        .collect()
}

fn handle_search_request(
    doc: &Document,
    id: RequestId,
    query: &str,
    start_page: usize,
    end_page: usize,
    text_cache: &Arc<Mutex<TextCache>>,
    responses: &Sender<EngineResponse>,
) {
    let mut texts: Vec<(usize, Arc<String>)> =
        Vec::with_capacity(end_page.saturating_sub(start_page));
    for page_num in start_page..end_page {
        match cached_page_text(doc, page_num, text_cache) {
            Ok(text) => texts.push((page_num, text)),
            Err(e) => debug!("Skipping page {page_num} in search: {e}"),
        }
    }

    // rayon preserves input order, so hits arrive page-ordered
    let mut hits: Vec<SearchHit> = texts
        .par_iter()
        .flat_map_iter(|(page_num, text)| search::scan_page(*page_num, text, query))
        .collect();
    hits.truncate(search::MAX_HITS);

    let _ = responses.send(EngineResponse::SearchPart { id, hits });
}

fn cached_page_text(
    doc: &Document,
    page_num: usize,
    text_cache: &Arc<Mutex<TextCache>>,
) -> Result<Arc<String>, WorkerFault> {
    let cached = text_cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(page_num);
    if let Some(text) = cached {
        return Ok(text);
    }

    let page = doc.load_page(page_num as i32)?;
    let text = extract_page_text(&page)?;
    Ok(text_cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .insert(page_num, text))
}

/// Extract the full plain text of a page, line per line
fn extract_page_text(page: &Page) -> Result<String, WorkerFault> {
    let text_page = page.to_text_page(TextPageFlags::empty())?;
    let mut text = String::new();

    for block in text_page.blocks() {
        if block.r#type() != TextBlockType::Text {
            continue;
        }

        for line in block.lines() {
            for ch in line.chars() {
                if let Some(c) = ch.char() {
                    text.push(c);
                }
            }
            text.push('\n');
        }
        text.push('\n');
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_spec_fits_tall_page_to_height() {
        // Page taller than the viewport aspect: height is the limit
        let spec = RasterSpec::compute((100.0, 200.0), (400.0, 400.0), 1.0);
        assert!((spec.mag - 2.0).abs() < 1e-5);
    }

    #[test]
    fn raster_spec_fits_wide_page_to_width() {
        let spec = RasterSpec::compute((200.0, 100.0), (400.0, 400.0), 1.0);
        assert!((spec.mag - 2.0).abs() < 1e-5);
    }

    #[test]
    fn raster_spec_applies_user_zoom() {
        let fit = RasterSpec::compute((100.0, 100.0), (400.0, 400.0), 1.0);
        let zoomed = RasterSpec::compute((100.0, 100.0), (400.0, 400.0), 2.0);
        assert!((zoomed.mag - fit.mag * 2.0).abs() < 1e-5);
    }

    #[test]
    fn raster_spec_clamps_output_dimension() {
        let spec = RasterSpec::compute((1000.0, 1000.0), (2000.0, 2000.0), 4.0);
        assert!(1000.0 * spec.mag <= MAX_RENDER_DIMENSION + 1.0);
    }

    #[test]
    fn raster_spec_survives_zero_viewport() {
        let spec = RasterSpec::compute((100.0, 200.0), (0.0, 0.0), 1.0);
        assert!(spec.mag.is_finite());
        assert!(spec.mag > 0.0);
    }
}
