use std::path::PathBuf;
use std::time::{Duration, Instant};

use hojear::doc::{Command, DocService, EngineResponse, RequestId};
use hojear::search::SearchHit;
use hojear::test_utils::test_helpers::write_minimal_pdf;
use ratatui::layout::Rect;
use tempfile::TempDir;

const BLACK: i32 = 0x000000;
const WHITE: i32 = 0xFFFFFF;

fn temp_doc(pages: usize) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    write_minimal_pdf(&path, pages).unwrap();
    (dir, path)
}

fn wait_until(service: &mut DocService, mut done: impl FnMut(&mut DocService) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while !done(service) {
        assert!(Instant::now() < deadline, "timed out waiting for the engine");
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn open_reports_page_count_and_no_outline() {
    let (_dir, path) = temp_doc(4);
    let service = DocService::new(path, BLACK, WHITE).unwrap();

    assert_eq!(service.document_info().page_count, 4);
    assert_eq!(service.state().page_count, 4);
    assert!(!service.document_info().has_outline());
}

#[test]
fn open_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.pdf");

    assert!(DocService::new(path, BLACK, WHITE).is_err());
}

#[test]
fn rendered_page_fits_the_viewport() {
    let (_dir, path) = temp_doc(2);
    let mut service = DocService::new(path, BLACK, WHITE).unwrap();

    // 80 columns by 40 rows of half blocks is an 80x80 pixel canvas
    service.apply_command(Command::SetArea(Rect::new(0, 0, 80, 40)));

    wait_until(&mut service, |s| {
        s.poll_responses();
        s.is_page_cached(0)
    });

    let page = service.get_cached_page(0).expect("cached page");
    // One pixel of slack for mupdf's bbox rounding
    assert!(page.image.width_px <= 81);
    assert!(page.image.height_px <= 81);
    // US Letter is taller than wide, so height is the binding dimension
    assert!(page.image.height_px >= 70);
    assert!(page.scale > 0.0);
}

#[test]
fn page_text_extraction_round_trip() {
    let (_dir, path) = temp_doc(3);
    let mut service = DocService::new(path, BLACK, WHITE).unwrap();

    let id = service.request_page_text(1);

    let mut text: Option<String> = None;
    wait_until(&mut service, |s| {
        for response in s.poll_responses() {
            if let EngineResponse::PageText {
                id: rid, text: t, ..
            } = response
            {
                if rid == id {
                    text = Some(t.as_str().to_string());
                }
            }
        }
        text.is_some()
    });

    let text = text.unwrap();
    assert!(text.contains("texto de prueba pagina 2"));
    // The second request is served from the text cache
    assert!(service.cached_page_text(1).is_some());
}

fn run_search(service: &mut DocService, query: &str) -> Vec<SearchHit> {
    let id: RequestId = service.request_search(query);

    let mut found: Option<Vec<SearchHit>> = None;
    wait_until(service, |s| {
        for response in s.poll_responses() {
            if let EngineResponse::Search {
                id: rid, hits, ..
            } = response
            {
                if rid == id {
                    found = Some(hits);
                }
            }
        }
        found.is_some()
    });
    found.unwrap()
}

#[test]
fn search_covers_every_page_in_order() {
    let (_dir, path) = temp_doc(5);
    let mut service = DocService::new(path, BLACK, WHITE).unwrap();

    let hits = run_search(&mut service, "pagina");
    let pages: Vec<usize> = hits.iter().map(|hit| hit.page).collect();
    assert_eq!(pages, vec![0, 1, 2, 3, 4]);

    for hit in &hits {
        let matched = &hit.snippet[hit.match_start..hit.match_start + hit.match_len];
        assert!(matched.eq_ignore_ascii_case("pagina"));
    }
}

#[test]
fn search_misses_return_empty() {
    let (_dir, path) = temp_doc(3);
    let mut service = DocService::new(path, BLACK, WHITE).unwrap();

    let hits = run_search(&mut service, "no existe esta palabra");
    assert!(hits.is_empty());
}

#[test]
fn superseded_search_never_surfaces() {
    let (_dir, path) = temp_doc(4);
    let mut service = DocService::new(path, BLACK, WHITE).unwrap();

    let stale = service.request_search("pagina");
    let current = service.request_search("texto");

    let mut results: Vec<(RequestId, usize)> = Vec::new();
    wait_until(&mut service, |s| {
        for response in s.poll_responses() {
            if let EngineResponse::Search { id, hits, .. } = response {
                results.push((id, hits.len()));
            }
        }
        results.iter().any(|(id, _)| *id == current)
    });

    // The older scan's parts are dropped inside the service, so its
    // assembled result can never be emitted
    assert!(results.iter().all(|(id, _)| *id != stale));
    assert_eq!(results, vec![(current, 4)]);
}

#[test]
fn reload_keeps_position_and_metadata() {
    let (_dir, path) = temp_doc(4);
    let mut service = DocService::new(path, BLACK, WHITE).unwrap();

    service.apply_command(Command::GoToPage(2));
    service.apply_command(Command::Reload);

    assert_eq!(service.document_info().page_count, 4);
    assert_eq!(service.state().current_page, 2);

    // The restarted pool must still serve requests
    service.apply_command(Command::SetArea(Rect::new(0, 0, 60, 30)));
    wait_until(&mut service, |s| {
        s.poll_responses();
        s.is_page_cached(2)
    });
}

#[test]
fn zoom_invalidates_and_rerenders_larger() {
    let (_dir, path) = temp_doc(2);
    let mut service = DocService::new(path, BLACK, WHITE).unwrap();

    service.apply_command(Command::SetArea(Rect::new(0, 0, 80, 40)));
    wait_until(&mut service, |s| {
        s.poll_responses();
        s.is_page_cached(0)
    });
    let fit_height = service.get_cached_page(0).unwrap().image.height_px;

    service.apply_command(Command::SetZoom(2.0));

    // The cache was invalidated, so the next hit is the zoomed render
    wait_until(&mut service, |s| {
        s.poll_responses();
        s.is_page_cached(0)
    });
    let zoomed_height = service.get_cached_page(0).unwrap().image.height_px;

    assert!(zoomed_height > fit_height);
}
