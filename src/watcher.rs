//! Watch the open document for on-disk changes

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use flume::Receiver;
use log::warn;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Quiet period before a change burst triggers a reload. Converters and
/// editors fire several events per save.
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches a single document and reports settled changes
pub struct DocWatcher {
    // Dropping the watcher stops event delivery
    _watcher: RecommendedWatcher,
    events_rx: Receiver<()>,
    pending_since: Option<Instant>,
}

impl DocWatcher {
    pub fn new(path: &Path) -> notify::Result<Self> {
        let watched: PathBuf = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let (tx, events_rx) = flume::unbounded();

        let target = watched.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                    ) && event.paths.iter().any(|p| p == &target);

                    if relevant {
                        let _ = tx.send(());
                    }
                }
                Err(e) => warn!("Document watcher error: {e}"),
            }
        })?;

        // Watch the parent directory: saves usually replace the file, which
        // would orphan a watch on the file itself
        let dir = watched
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            events_rx,
            pending_since: None,
        })
    }

    /// Poll for a settled change. Returns true once per change burst, after
    /// the burst has been quiet for the debounce window.
    pub fn poll_changed(&mut self) -> bool {
        let mut saw_event = false;
        while self.events_rx.try_recv().is_ok() {
            saw_event = true;
        }
        if saw_event {
            self.pending_since = Some(Instant::now());
        }

        if let Some(since) = self.pending_since {
            if since.elapsed() >= DEBOUNCE {
                self.pending_since = None;
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reports_change_after_quiet_period() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"v1").unwrap();

        let mut watcher = DocWatcher::new(&path).unwrap();
        assert!(!watcher.poll_changed());

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        file.write_all(b"v2").unwrap();
        file.sync_all().unwrap();
        drop(file);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut changed = false;
        while Instant::now() < deadline {
            if watcher.poll_changed() {
                changed = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        assert!(changed);
        // One burst reports once
        assert!(!watcher.poll_changed());
    }

    #[test]
    fn untouched_file_stays_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"v1").unwrap();

        let mut watcher = DocWatcher::new(&path).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(!watcher.poll_changed());
    }
}
