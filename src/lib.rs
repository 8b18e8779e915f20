// Export modules for use in tests
pub mod app;
pub mod bookmarks;
pub mod doc;
pub mod event_source;
pub mod install;
pub mod notification;
pub mod panic_handler;
pub mod search;
pub mod settings;
pub mod theme;
pub mod translate;
pub mod watcher;
pub mod widget;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main app components
pub use app::{App, FocusedPanel, MainPanel, PopupWindow, run_app_with_event_source};
