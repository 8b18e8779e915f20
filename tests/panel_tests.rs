use std::path::PathBuf;

use hojear::app::{App, FocusedPanel, MainPanel, run_app_with_event_source};
use hojear::event_source::SimulatedEventSource;
use hojear::test_utils::test_helpers::{TestScenarioBuilder, write_minimal_pdf};
use hojear::widget::PanelTab;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use tempfile::TempDir;

fn temp_doc(pages: usize) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    write_minimal_pdf(&path, pages).unwrap();
    (dir, path)
}

fn run(app: &mut App, mut event_source: SimulatedEventSource) {
    app.should_quit = false;
    let backend = TestBackend::new(100, 40);
    let mut terminal = Terminal::new(backend).unwrap();
    let _ = run_app_with_event_source(&mut terminal, app, &mut event_source);
}

#[test]
fn tab_opens_panel_on_pages_tab_without_outline() {
    let (_dir, path) = temp_doc(3);
    let mut app = App::new_for_test(path).unwrap();

    app.handle_event(SimulatedEventSource::key_event(
        crossterm::event::KeyCode::Tab,
        crossterm::event::KeyModifiers::NONE,
    ));

    // The fixture has no outline, so the panel must land on the page list
    assert_eq!(app.focused_panel, FocusedPanel::Main(MainPanel::SidePanel));
    assert_eq!(app.side_panel.tab(), PanelTab::Pages);
}

#[test]
fn panel_enter_jumps_and_closes() {
    let (_dir, path) = temp_doc(5);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new()
        .press_tab()
        .navigate_down(2)
        .press_enter()
        .quit()
        .build();
    run(&mut app, events);

    assert_eq!(app.doc.state().current_page, 2);
    assert_eq!(app.focused_panel, FocusedPanel::Main(MainPanel::PageView));
}

#[test]
fn panel_esc_closes_without_jumping() {
    let (_dir, path) = temp_doc(3);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new()
        .press_tab()
        .navigate_down(1)
        .press_esc()
        .quit()
        .build();
    run(&mut app, events);

    assert_eq!(app.doc.state().current_page, 0);
    assert_eq!(app.focused_panel, FocusedPanel::Main(MainPanel::PageView));
}

#[test]
fn tab_key_toggles_panel_closed_again() {
    let (_dir, path) = temp_doc(3);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new()
        .press_tab()
        .press_tab()
        .quit()
        .build();
    run(&mut app, events);

    assert_eq!(app.focused_panel, FocusedPanel::Main(MainPanel::PageView));
}

#[test]
fn pages_tab_preselects_current_page() {
    let (_dir, path) = temp_doc(4);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new()
        .goto_page(2)
        .press_tab()
        .quit()
        .build();
    run(&mut app, events);

    assert_eq!(app.side_panel.tab(), PanelTab::Pages);
    assert_eq!(app.side_panel.selected(), 1);
}

#[test]
fn bookmarks_tab_jumps_to_saved_page() {
    let (_dir, path) = temp_doc(5);
    let mut app = App::new_for_test(path).unwrap();

    // Bookmark page 3, go back to the start, then jump through the panel
    let events = TestScenarioBuilder::new()
        .goto_page(3)
        .press_char('b')
        .goto_page(1)
        .press_tab()
        .press_char('2')
        .press_enter()
        .quit()
        .build();
    run(&mut app, events);

    assert_eq!(app.doc.state().current_page, 2);
    assert_eq!(app.focused_panel, FocusedPanel::Main(MainPanel::PageView));
}

#[test]
fn bookmark_delete_from_panel() {
    let (_dir, path) = temp_doc(3);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new()
        .press_char('b')
        .press_tab()
        .press_char('2')
        .press_char('d')
        .quit()
        .build();
    run(&mut app, events);

    let doc_key = app.doc_key.clone();
    assert!(app.bookmarks.for_document(&doc_key).is_empty());
}

#[test]
fn bookmark_rename_from_panel() {
    let (_dir, path) = temp_doc(3);
    let mut app = App::new_for_test(path).unwrap();

    // The rename input starts prefilled with "Page 1"; clear it first
    let mut builder = TestScenarioBuilder::new()
        .press_char('b')
        .press_tab()
        .press_char('2')
        .press_char('r');
    for _ in 0..8 {
        builder = builder.press_key(crossterm::event::KeyCode::Backspace);
    }
    let events = builder
        .type_text("capitulo uno")
        .press_enter()
        .quit()
        .build();
    run(&mut app, events);

    let doc_key = app.doc_key.clone();
    let bookmarks = app.bookmarks.for_document(&doc_key);
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].title, "capitulo uno");
}
