//! Incremental reading of append-only log files.
//!
//! [`FileRegistry`] remembers how many bytes of each file have been
//! consumed; [`read_appended`] fetches whatever was written since.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::WatcherError;

/// A log file being tailed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFile {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Bytes already consumed.
    pub offset: u64,
}

/// Known log files and their read offsets, keyed by path.
///
/// Iteration is in path order, which fixes the order records from
/// different files are emitted within one tick.
#[derive(Debug, Default)]
pub struct FileRegistry {
    offsets: BTreeMap<PathBuf, u64>,
}

/// Changes applied by [`FileRegistry::reconcile`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Newly registered files, sorted by path.
    pub added: Vec<WatchedFile>,
    /// Files dropped because they no longer exist, sorted by path.
    pub removed: Vec<PathBuf>,
}

impl FileRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` at its current end so existing content is never
    /// replayed. Files whose size cannot be read start at offset 0.
    ///
    /// Returns the offset the file was registered at.
    pub fn register_at_end(&mut self, path: PathBuf) -> u64 {
        let offset = current_len(&path).unwrap_or(0);
        self.offsets.insert(path, offset);
        offset
    }

    /// Register `path` at an explicit offset.
    pub fn register(&mut self, path: PathBuf, offset: u64) {
        self.offsets.insert(path, offset);
    }

    /// Stop tracking `path`, returning its last offset.
    pub fn remove(&mut self, path: &Path) -> Option<u64> {
        self.offsets.remove(path)
    }

    /// Offset recorded for `path`.
    #[must_use]
    pub fn offset(&self, path: &Path) -> Option<u64> {
        self.offsets.get(path).copied()
    }

    /// Record a new offset for an already registered file.
    ///
    /// Unknown paths are ignored.
    pub fn set_offset(&mut self, path: &Path, offset: u64) {
        if let Some(current) = self.offsets.get_mut(path) {
            *current = offset;
        }
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.offsets.contains_key(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Snapshot of all tracked files in path order.
    #[must_use]
    pub fn files(&self) -> Vec<WatchedFile> {
        self.offsets
            .iter()
            .map(|(path, offset)| WatchedFile {
                path: path.clone(),
                offset: *offset,
            })
            .collect()
    }

    /// Bring the registry in line with a fresh scan.
    ///
    /// Paths not yet known are registered at their current end; known paths
    /// missing from `current` are dropped along with their offsets.
    pub fn reconcile(&mut self, current: &HashSet<PathBuf>) -> Reconciliation {
        let removed: Vec<PathBuf> = self
            .offsets
            .keys()
            .filter(|path| !current.contains(*path))
            .cloned()
            .collect();
        for path in &removed {
            self.remove(path);
        }

        let mut new_paths: Vec<&PathBuf> = current
            .iter()
            .filter(|path| !self.offsets.contains_key(*path))
            .collect();
        new_paths.sort();

        let added = new_paths
            .into_iter()
            .map(|path| {
                let offset = self.register_at_end(path.clone());
                WatchedFile {
                    path: path.clone(),
                    offset,
                }
            })
            .collect();

        Reconciliation { added, removed }
    }
}

/// Result of one incremental read.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The file has not grown.
    Unchanged,
    /// The file is now shorter than the recorded offset.
    Truncated { len: u64 },
    /// New bytes were consumed.
    Appended {
        /// Non-blank lines, right-trimmed, in file order.
        lines: Vec<String>,
        /// Offset to record for the next read.
        new_offset: u64,
    },
}

/// Read whatever was appended to `path` after `offset`.
///
/// The unread range is split on `\n` (tolerating `\r\n`) and decoded as
/// UTF-8, replacing invalid sequences. With `hold_partial` unset, a trailing
/// fragment without a newline is returned as a line and the offset moves
/// past everything read. With `hold_partial` set, the offset only moves past
/// the last newline, so the fragment is read again once it is complete.
///
/// # Errors
///
/// Returns an error if the file cannot be inspected, opened or read
/// (deleted, permission denied, other I/O failures).
pub async fn read_appended(
    path: &Path,
    offset: u64,
    hold_partial: bool,
) -> Result<ReadOutcome, WatcherError> {
    let file_len = tokio::fs::metadata(path)
        .await
        .map_err(|e| WatcherError::from_access(path, e))?
        .len();

    if file_len < offset {
        return Ok(ReadOutcome::Truncated { len: file_len });
    }
    if file_len == offset {
        return Ok(ReadOutcome::Unchanged);
    }

    let mut file = File::open(path)
        .await
        .map_err(|e| WatcherError::from_access(path, e))?;
    file.seek(std::io::SeekFrom::Start(offset)).await?;

    let unread = file_len - offset;
    let mut buf = Vec::with_capacity(usize::try_from(unread).unwrap_or(0));
    file.take(unread).read_to_end(&mut buf).await?;

    let consumed = if hold_partial {
        buf.iter().rposition(|&b| b == b'\n').map_or(0, |idx| idx + 1)
    } else {
        buf.len()
    };

    Ok(ReadOutcome::Appended {
        lines: split_lines(&buf[..consumed]),
        new_offset: offset + consumed as u64,
    })
}

/// Split raw bytes into non-blank, right-trimmed lines.
fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .split('\n')
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn current_len(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().map(|m| m.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn create_test_entry(text: &str) -> String {
        format!(
            r#"{{"type":"user","timestamp":"2026-01-29T10:00:00Z","message":{{"role":"user","content":"{text}"}}}}"#
        )
    }

    #[tokio::test]
    async fn test_read_from_start() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", create_test_entry("one")).unwrap();
        writeln!(file, "{}", create_test_entry("two")).unwrap();
        file.flush().unwrap();

        let outcome = read_appended(file.path(), 0, false).await.unwrap();
        let len = std::fs::metadata(file.path()).unwrap().len();
        match outcome {
            ReadOutcome::Appended { lines, new_offset } => {
                assert_eq!(lines.len(), 2);
                assert_eq!(new_offset, len);
            }
            other => panic!("Expected Appended, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_only_new_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", create_test_entry("old")).unwrap();
        file.flush().unwrap();
        let start = std::fs::metadata(file.path()).unwrap().len();

        assert_eq!(
            read_appended(file.path(), start, false).await.unwrap(),
            ReadOutcome::Unchanged
        );

        let new_line = create_test_entry("new");
        writeln!(file, "{new_line}").unwrap();
        file.flush().unwrap();

        let outcome = read_appended(file.path(), start, false).await.unwrap();
        assert_eq!(
            outcome,
            ReadOutcome::Appended {
                lines: vec![new_line.clone()],
                new_offset: start + new_line.len() as u64 + 1,
            }
        );
    }

    #[tokio::test]
    async fn test_read_detects_truncation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "short").unwrap();
        file.flush().unwrap();

        let outcome = read_appended(file.path(), 1024, false).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Truncated { len: 6 });
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let path = Path::new("/tmp/nonexistent-claude-log-tail-12345.jsonl");
        let result = read_appended(path, 0, false).await;
        assert!(matches!(result, Err(WatcherError::FileDeleted(_))));
    }

    #[tokio::test]
    async fn test_read_crlf_and_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "first\r\n\r\n\nsecond\r\n").unwrap();
        file.flush().unwrap();

        match read_appended(file.path(), 0, false).await.unwrap() {
            ReadOutcome::Appended { lines, .. } => assert_eq!(lines, vec!["first", "second"]),
            other => panic!("Expected Appended, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trailing_fragment_consumed_by_default() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "complete\n{{\"type\":\"us").unwrap();
        file.flush().unwrap();
        let len = std::fs::metadata(file.path()).unwrap().len();

        match read_appended(file.path(), 0, false).await.unwrap() {
            ReadOutcome::Appended { lines, new_offset } => {
                assert_eq!(lines, vec!["complete", "{\"type\":\"us"]);
                assert_eq!(new_offset, len);
            }
            other => panic!("Expected Appended, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trailing_fragment_held_back() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "complete\npart").unwrap();
        file.flush().unwrap();

        let new_offset = match read_appended(file.path(), 0, true).await.unwrap() {
            ReadOutcome::Appended { lines, new_offset } => {
                assert_eq!(lines, vec!["complete"]);
                assert_eq!(new_offset, 9);
                new_offset
            }
            other => panic!("Expected Appended, got {other:?}"),
        };

        writeln!(file, "ial").unwrap();
        file.flush().unwrap();

        match read_appended(file.path(), new_offset, true).await.unwrap() {
            ReadOutcome::Appended { lines, new_offset } => {
                assert_eq!(lines, vec!["partial"]);
                assert_eq!(new_offset, 17);
            }
            other => panic!("Expected Appended, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_replaced() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"ok \xff bytes\n").unwrap();
        file.flush().unwrap();

        match read_appended(file.path(), 0, false).await.unwrap() {
            ReadOutcome::Appended { lines, .. } => assert_eq!(lines, vec!["ok \u{fffd} bytes"]),
            other => panic!("Expected Appended, got {other:?}"),
        }
    }

    #[test]
    fn test_register_at_end_uses_size() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "0123456789").unwrap();
        file.flush().unwrap();

        let mut registry = FileRegistry::new();
        let offset = registry.register_at_end(file.path().to_path_buf());
        assert_eq!(offset, 10);
        assert_eq!(registry.offset(file.path()), Some(10));
    }

    #[test]
    fn test_register_at_end_missing_file_starts_at_zero() {
        let mut registry = FileRegistry::new();
        let path = PathBuf::from("/tmp/nonexistent-claude-log-tail-67890.jsonl");
        assert_eq!(registry.register_at_end(path.clone()), 0);
        assert!(registry.contains(&path));
    }

    #[test]
    fn test_set_offset_ignores_unknown() {
        let mut registry = FileRegistry::new();
        registry.set_offset(Path::new("/tmp/unknown.jsonl"), 5);
        assert!(registry.is_empty());

        registry.register(PathBuf::from("/tmp/known.jsonl"), 1);
        registry.set_offset(Path::new("/tmp/known.jsonl"), 5);
        assert_eq!(registry.offset(Path::new("/tmp/known.jsonl")), Some(5));
    }

    #[test]
    fn test_reconcile_adds_and_removes() {
        let temp_dir = TempDir::new().unwrap();
        let kept = temp_dir.path().join("kept.jsonl");
        let gone = temp_dir.path().join("gone.jsonl");
        let b_new = temp_dir.path().join("b.jsonl");
        let a_new = temp_dir.path().join("a.jsonl");
        std::fs::write(&b_new, "abc").unwrap();
        std::fs::write(&a_new, "").unwrap();

        let mut registry = FileRegistry::new();
        registry.register(kept.clone(), 7);
        registry.register(gone.clone(), 3);

        let current: HashSet<PathBuf> = [kept.clone(), a_new.clone(), b_new.clone()]
            .into_iter()
            .collect();
        let result = registry.reconcile(&current);

        assert_eq!(result.removed, vec![gone.clone()]);
        assert_eq!(
            result.added,
            vec![
                WatchedFile {
                    path: a_new,
                    offset: 0
                },
                WatchedFile {
                    path: b_new,
                    offset: 3
                },
            ]
        );
        assert_eq!(registry.offset(&kept), Some(7));
        assert!(!registry.contains(&gone));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_files_in_path_order() {
        let mut registry = FileRegistry::new();
        registry.register(PathBuf::from("/b.jsonl"), 2);
        registry.register(PathBuf::from("/a.jsonl"), 1);
        let paths: Vec<_> = registry.files().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec![PathBuf::from("/a.jsonl"), PathBuf::from("/b.jsonl")]);
    }
}
