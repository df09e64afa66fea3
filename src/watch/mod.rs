use crate::config::FormatConfig;
use crate::files::{format_document, matches_patterns, FileStatus};
use anyhow::{Context, Result};
use glob::Pattern;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Events emitted by the file watcher
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// One or more files changed on disk
    FilesChanged(Vec<PathBuf>),
    /// The underlying watcher reported an error
    Error(String),
}

/// A debounced watcher over a set of files and directories
pub struct FileWatcher {
    _watcher: notify_debouncer_mini::Debouncer<RecommendedWatcher>,
}

impl FileWatcher {
    /// Start watching `roots`. Changed file events are sent to the provided sender.
    /// Events are debounced by `debounce_ms` milliseconds.
    pub fn new(roots: &[PathBuf], debounce_ms: u64, tx: mpsc::Sender<WatchEvent>) -> Result<Self> {
        let mut debouncer = new_debouncer(
            Duration::from_millis(debounce_ms),
            move |result: std::result::Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                let event = match result {
                    Ok(events) => {
                        let paths: Vec<PathBuf> = events
                            .into_iter()
                            .filter(|e| e.kind == DebouncedEventKind::Any)
                            .map(|e| e.path)
                            .collect();
                        if paths.is_empty() {
                            return;
                        }
                        WatchEvent::FilesChanged(paths)
                    }
                    Err(e) => WatchEvent::Error(e.to_string()),
                };
                // receiver gone means the watch loop has exited
                let _ = tx.send(event);
            },
        )?;

        for root in roots {
            let mode = if root.is_dir() {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            debouncer
                .watcher()
                .watch(root, mode)
                .with_context(|| format!("Failed to watch {}", root.display()))?;
        }

        Ok(FileWatcher {
            _watcher: debouncer,
        })
    }
}

/// Compute SHA-256 hash of file contents (for write echo detection)
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Re-formats changed files in place and remembers what it wrote, so the
/// change event caused by its own write is ignored.
#[derive(Debug)]
pub struct Reformatter {
    config: FormatConfig,
    patterns: Vec<Pattern>,
    written: HashMap<PathBuf, String>,
}

impl Reformatter {
    pub fn new(config: FormatConfig, patterns: Vec<Pattern>) -> Self {
        Self {
            config,
            patterns,
            written: HashMap::new(),
        }
    }

    /// Handle one changed path. Returns `None` for paths that are skipped
    /// (not a matching file, gone, or our own write).
    pub fn handle(&mut self, path: &Path) -> Result<Option<FileStatus>> {
        if !path.is_file() || !matches_patterns(path, &self.patterns) {
            return Ok(None);
        }
        let original = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                // deleted or replaced between the event and now
                log::debug!("Skipping {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        let hash = content_hash(&original);
        if self.written.get(path) == Some(&hash) {
            log::debug!("Ignoring own write to {}", path.display());
            return Ok(None);
        }

        let formatted = format_document(&original, &self.config);
        if formatted == original {
            return Ok(Some(FileStatus::Unchanged));
        }
        std::fs::write(path, &formatted)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.written
            .insert(path.to_path_buf(), content_hash(&formatted));
        log::info!("Formatted {}", path.display());
        Ok(Some(FileStatus::Reformatted))
    }
}

/// Block on `rx`, re-formatting every changed file until the channel closes.
pub fn run(rx: mpsc::Receiver<WatchEvent>, reformatter: &mut Reformatter) -> Result<()> {
    for event in rx {
        match event {
            WatchEvent::FilesChanged(mut paths) => {
                paths.sort();
                paths.dedup();
                for path in paths {
                    if let Err(e) = reformatter.handle(&path) {
                        log::warn!("{:#}", e);
                    }
                }
            }
            WatchEvent::Error(e) => log::warn!("Watcher error: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::compile_patterns;
    use std::fs;

    fn reformatter() -> Reformatter {
        Reformatter::new(
            FormatConfig::default(),
            compile_patterns(&["*.txt".to_string()]),
        )
    }

    #[test]
    fn hash_is_stable_hex() {
        let h = content_hash("你好");
        assert_eq!(h.len(), 64);
        assert_eq!(h, content_hash("你好"));
        assert_ne!(h, content_hash("世界"));
    }

    #[test]
    fn reformats_changed_file_and_ignores_echo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapter.txt");
        fs::write(&path, "你好\n世界\n").unwrap();

        let mut r = reformatter();
        assert_eq!(r.handle(&path).unwrap(), Some(FileStatus::Reformatted));
        assert_eq!(fs::read_to_string(&path).unwrap(), "  你好\n\n  世界\n");
        assert_eq!(r.handle(&path).unwrap(), None);
    }

    #[test]
    fn formatted_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("done.txt");
        fs::write(&path, "  你好\n\n  世界\n").unwrap();
        assert_eq!(reformatter().handle(&path).unwrap(), Some(FileStatus::Unchanged));
    }

    #[test]
    fn non_matching_and_missing_paths_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let rs = dir.path().join("main.rs");
        fs::write(&rs, "fn main() {}\n").unwrap();
        let mut r = reformatter();
        assert_eq!(r.handle(&rs).unwrap(), None);
        assert_eq!(r.handle(&dir.path().join("gone.txt")).unwrap(), None);
        assert_eq!(fs::read_to_string(&rs).unwrap(), "fn main() {}\n");
    }

    #[test]
    fn run_drains_events_until_sender_drops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "一\n二\n").unwrap();

        let (tx, rx) = mpsc::channel();
        tx.send(WatchEvent::FilesChanged(vec![path.clone(), path.clone()]))
            .unwrap();
        tx.send(WatchEvent::Error("boom".into())).unwrap();
        drop(tx);

        let mut r = reformatter();
        run(rx, &mut r).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "  一\n\n  二\n");
    }
}
