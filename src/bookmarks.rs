//! Per-page bookmarks with JSON persistence

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

/// A bookmarked page in a document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub page: usize,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a bookmark toggle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookmarkToggle {
    Added,
    Removed,
}

/// All bookmarks, keyed by document path
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BookmarkStore {
    docs: HashMap<String, Vec<Bookmark>>,
    #[serde(skip)]
    file_path: Option<PathBuf>,
}

impl BookmarkStore {
    pub fn ephemeral() -> Self {
        Self {
            docs: HashMap::new(),
            file_path: None,
        }
    }

    pub fn with_file(file_path: &Path) -> Self {
        Self {
            docs: HashMap::new(),
            file_path: Some(file_path.to_path_buf()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&Path>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load bookmarks from {}: {}", path.display(), e);
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        if file_path.exists() {
            let content = fs::read_to_string(file_path)?;
            let mut store: Self = serde_json::from_str(&content)?;
            store.file_path = Some(file_path.to_path_buf());
            Ok(store)
        } else {
            Ok(Self::with_file(file_path))
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.file_path else {
            // Ephemeral stores don't touch disk
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn save_or_log(&self) {
        if let Err(e) = self.save() {
            log::error!("Failed to save bookmarks: {e}");
        }
    }

    /// Bookmarks for one document, ordered by page
    #[must_use]
    pub fn for_document(&self, doc_path: &str) -> &[Bookmark] {
        self.docs.get(doc_path).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn find(&self, doc_path: &str, page: usize) -> Option<&Bookmark> {
        self.for_document(doc_path).iter().find(|b| b.page == page)
    }

    #[must_use]
    pub fn has_bookmark(&self, doc_path: &str, page: usize) -> bool {
        self.find(doc_path, page).is_some()
    }

    /// Add a bookmark on `page`, or remove the existing one. A page holds at
    /// most one bookmark.
    pub fn toggle(&mut self, doc_path: &str, page: usize) -> BookmarkToggle {
        let list = self.docs.entry(doc_path.to_string()).or_default();

        let outcome = if let Some(pos) = list.iter().position(|b| b.page == page) {
            list.remove(pos);
            BookmarkToggle::Removed
        } else {
            list.push(Bookmark {
                id: generate_id(),
                page,
                title: format!("Page {}", page + 1),
                created_at: Utc::now(),
            });
            list.sort_by_key(|b| b.page);
            BookmarkToggle::Added
        };

        if list.is_empty() {
            self.docs.remove(doc_path);
        }
        self.save_or_log();
        outcome
    }

    pub fn rename(&mut self, doc_path: &str, id: &str, title: &str) -> bool {
        let renamed = self
            .docs
            .get_mut(doc_path)
            .and_then(|list| list.iter_mut().find(|b| b.id == id))
            .map(|bookmark| bookmark.title = title.to_string())
            .is_some();

        if renamed {
            self.save_or_log();
        }
        renamed
    }

    pub fn remove(&mut self, doc_path: &str, id: &str) -> bool {
        let Some(list) = self.docs.get_mut(doc_path) else {
            return false;
        };
        let Some(pos) = list.iter().position(|b| b.id == id) else {
            return false;
        };

        list.remove(pos);
        if list.is_empty() {
            self.docs.remove(doc_path);
        }
        self.save_or_log();
        true
    }
}

/// Default location of the bookmark file
#[must_use]
pub fn default_bookmarks_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("hojear").join("bookmarks.json"))
}

/// Timestamp in base36 plus a short random suffix, unique enough for a
/// per-user bookmark file
fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().unsigned_abs();
    let mut id = to_base36(millis);
    id.push('-');
    id.extend(
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(4)
            .map(char::from),
    );
    id
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut buf = Vec::new();
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "/books/example.pdf";

    #[test]
    fn toggle_adds_then_removes() {
        let mut store = BookmarkStore::ephemeral();

        assert_eq!(store.toggle(DOC, 4), BookmarkToggle::Added);
        assert!(store.has_bookmark(DOC, 4));
        assert_eq!(store.for_document(DOC).len(), 1);
        assert_eq!(store.for_document(DOC)[0].title, "Page 5");

        assert_eq!(store.toggle(DOC, 4), BookmarkToggle::Removed);
        assert!(!store.has_bookmark(DOC, 4));
        assert!(store.for_document(DOC).is_empty());
    }

    #[test]
    fn one_bookmark_per_page() {
        let mut store = BookmarkStore::ephemeral();

        store.toggle(DOC, 2);
        store.toggle(DOC, 2);
        store.toggle(DOC, 2);

        assert_eq!(store.for_document(DOC).len(), 1);
    }

    #[test]
    fn bookmarks_stay_sorted_by_page() {
        let mut store = BookmarkStore::ephemeral();

        store.toggle(DOC, 9);
        store.toggle(DOC, 1);
        store.toggle(DOC, 5);

        let pages: Vec<usize> = store.for_document(DOC).iter().map(|b| b.page).collect();
        assert_eq!(pages, vec![1, 5, 9]);
    }

    #[test]
    fn ids_are_distinct() {
        let mut store = BookmarkStore::ephemeral();

        store.toggle(DOC, 0);
        store.toggle(DOC, 1);

        let list = store.for_document(DOC);
        assert_ne!(list[0].id, list[1].id);
    }

    #[test]
    fn rename_updates_title() {
        let mut store = BookmarkStore::ephemeral();
        store.toggle(DOC, 3);
        let id = store.for_document(DOC)[0].id.clone();

        assert!(store.rename(DOC, &id, "Chapter opening"));
        assert_eq!(store.for_document(DOC)[0].title, "Chapter opening");

        assert!(!store.rename(DOC, "missing-id", "nope"));
        assert!(!store.rename("/other.pdf", &id, "nope"));
    }

    #[test]
    fn remove_by_id() {
        let mut store = BookmarkStore::ephemeral();
        store.toggle(DOC, 3);
        store.toggle(DOC, 7);
        let id = store.for_document(DOC)[0].id.clone();

        assert!(store.remove(DOC, &id));
        assert_eq!(store.for_document(DOC).len(), 1);
        assert_eq!(store.for_document(DOC)[0].page, 7);
        assert!(!store.remove(DOC, &id));
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks.json");

        let mut store = BookmarkStore::with_file(&path);
        store.toggle(DOC, 12);
        store.toggle(DOC, 3);
        let id = store.for_document(DOC)[0].id.clone();
        store.rename(DOC, &id, "Intro");

        let reloaded = BookmarkStore::load_from_file(&path).unwrap();
        let list = reloaded.for_document(DOC);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].page, 3);
        assert_eq!(list[0].title, "Intro");
        assert_eq!(list[1].page, 12);
    }

    #[test]
    fn load_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let store = BookmarkStore::load_from_file(&path).unwrap();
        assert!(store.for_document(DOC).is_empty());
    }

    #[test]
    fn ephemeral_store_never_writes() {
        let mut store = BookmarkStore::ephemeral();
        store.toggle(DOC, 1);
        assert!(store.save().is_ok());
        assert!(store.file_path.is_none());
    }
}
