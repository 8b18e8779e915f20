use std::path::PathBuf;

use hojear::app::{App, run_app_with_event_source};
use hojear::event_source::SimulatedEventSource;
use hojear::test_utils::test_helpers::{TestScenarioBuilder, write_minimal_pdf};
use hojear::theme;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use serial_test::serial;
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
fn next_page_advances_and_clamps_at_last() {
    let (_dir, path) = temp_doc(3);
    let mut app = App::new_for_test(path).unwrap();

    // Four presses on a three page document must stop at the last page
    let events = TestScenarioBuilder::new()
        .next_page()
        .next_page()
        .next_page()
        .next_page()
        .quit()
        .build();
    run(&mut app, events);

    assert_eq!(app.doc.state().current_page, 2);
    assert!(app.should_quit);
}

#[test]
fn prev_page_clamps_at_first() {
    let (_dir, path) = temp_doc(3);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new()
        .prev_page()
        .prev_page()
        .next_page()
        .next_page()
        .prev_page()
        .quit()
        .build();
    run(&mut app, events);

    assert_eq!(app.doc.state().current_page, 1);
}

#[test]
fn goto_prompt_jumps_to_typed_page() {
    let (_dir, path) = temp_doc(5);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new().goto_page(3).quit().build();
    run(&mut app, events);

    assert_eq!(app.doc.state().current_page, 2);
}

#[test]
fn goto_prompt_rejects_out_of_range() {
    let (_dir, path) = temp_doc(5);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new().goto_page(99).quit().build();
    run(&mut app, events);

    assert_eq!(app.doc.state().current_page, 0);
}

#[test]
fn goto_prompt_esc_cancels_without_jumping() {
    let (_dir, path) = temp_doc(5);
    let mut app = App::new_for_test(path).unwrap();

    // Abort the prompt, then a normal page turn must work again
    let events = TestScenarioBuilder::new()
        .press_char(':')
        .press_char('4')
        .press_esc()
        .next_page()
        .quit()
        .build();
    run(&mut app, events);

    assert_eq!(app.doc.state().current_page, 1);
}

#[test]
fn first_and_last_page_shortcuts() {
    let (_dir, path) = temp_doc(4);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new().press_char('G').quit().build();
    run(&mut app, events);
    assert_eq!(app.doc.state().current_page, 3);

    let events = TestScenarioBuilder::new().press_char('g').quit().build();
    run(&mut app, events);
    assert_eq!(app.doc.state().current_page, 0);
}

#[test]
fn ctrl_c_quits() {
    let (_dir, path) = temp_doc(2);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new().press_ctrl_char('c').build();
    run(&mut app, events);

    assert!(app.should_quit);
}

#[test]
fn zoom_steps_and_reset() {
    let (_dir, path) = temp_doc(2);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new()
        .press_char('+')
        .press_char('+')
        .quit()
        .build();
    run(&mut app, events);
    assert!((app.doc.state().zoom - 1.5).abs() < 1e-5);

    let events = TestScenarioBuilder::new()
        .press_char('-')
        .quit()
        .build();
    run(&mut app, events);
    assert!((app.doc.state().zoom - 1.25).abs() < 1e-5);

    let events = TestScenarioBuilder::new().press_char('0').quit().build();
    run(&mut app, events);
    assert!((app.doc.state().zoom - 1.0).abs() < 1e-5);
}

#[test]
fn invert_images_toggle() {
    let (_dir, path) = temp_doc(2);
    let mut app = App::new_for_test(path).unwrap();
    assert!(app.doc.state().invert_images);

    let events = TestScenarioBuilder::new().press_char('i').quit().build();
    run(&mut app, events);

    assert!(!app.doc.state().invert_images);
}

#[test]
fn bookmark_toggle_adds_per_page() {
    let (_dir, path) = temp_doc(3);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new()
        .press_char('b')
        .next_page()
        .press_char('b')
        .quit()
        .build();
    run(&mut app, events);

    let doc_key = app.doc_key.clone();
    assert_eq!(app.bookmarks.for_document(&doc_key).len(), 2);
    assert!(app.bookmarks.has_bookmark(&doc_key, 0));
    assert!(app.bookmarks.has_bookmark(&doc_key, 1));
}

#[test]
fn bookmark_toggle_twice_removes() {
    let (_dir, path) = temp_doc(3);
    let mut app = App::new_for_test(path).unwrap();

    let events = TestScenarioBuilder::new()
        .press_char('b')
        .press_char('b')
        .quit()
        .build();
    run(&mut app, events);

    let doc_key = app.doc_key.clone();
    assert!(app.bookmarks.for_document(&doc_key).is_empty());
}

#[test]
#[serial]
fn theme_toggle_retints_the_page() {
    let (_dir, path) = temp_doc(2);
    let mut app = App::new_for_test(path).unwrap();

    let before_theme = theme::current_theme_id();
    let before_black = app.doc.state().black;

    app.handle_event(SimulatedEventSource::char_key('t'));

    assert_ne!(theme::current_theme_id(), before_theme);
    assert_ne!(app.doc.state().black, before_black);
    assert_eq!(app.doc.state().black, theme::current_palette().page_black);

    // Toggle back so other tests see the default palette
    app.handle_event(SimulatedEventSource::char_key('t'));
    assert_eq!(theme::current_theme_id(), before_theme);
}

#[test]
fn open_at_requested_page() {
    let (_dir, path) = temp_doc(5);
    let mut app = App::new_for_test(path).unwrap();
    app.doc.set_current_page_no_render(4);

    let events = TestScenarioBuilder::new().next_page().quit().build();
    run(&mut app, events);

    // Already on the last page, the extra press must not move
    assert_eq!(app.doc.state().current_page, 4);
}
