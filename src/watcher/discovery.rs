//! Log file discovery and project naming.
//!
//! Locates `.jsonl` conversation logs under a root and derives a readable
//! project label from the directory Claude Code stores them in.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// Default suffix of conversation log files.
pub const DEFAULT_SUFFIX: &str = ".jsonl";

/// Recursively enumerates log files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    suffix: String,
}

impl DirectoryScanner {
    /// Create a scanner matching file names that end with `suffix`.
    #[must_use]
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Walk `root` and collect every regular file whose name ends with the
    /// configured suffix.
    ///
    /// Entries that cannot be read (permission errors, races with deletion)
    /// are skipped and the walk continues over their siblings.
    #[must_use]
    pub fn scan(&self, root: &Path) -> HashSet<PathBuf> {
        WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    tracing::trace!(error = %e, "Skipping unreadable entry during scan");
                    None
                }
            })
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.ends_with(&self.suffix))
            })
            .filter(|entry| entry.path().is_file())
            .map(walkdir::DirEntry::into_path)
            .collect()
    }
}

impl Default for DirectoryScanner {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIX)
    }
}

/// Find all `.jsonl` files under `root`.
#[must_use]
pub fn scan_log_files(root: &Path) -> HashSet<PathBuf> {
    DirectoryScanner::default().scan(root)
}

/// Build the dash-joined prefix Claude Code uses for paths under `home`.
///
/// `/Users/alice` becomes `Users-alice-`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use claude_log_tail::watcher::home_prefix;
///
/// assert_eq!(home_prefix(Path::new("/home/user")), "home-user-");
/// ```
#[must_use]
pub fn home_prefix(home: &Path) -> String {
    let home = home.to_string_lossy();
    let trimmed = home.strip_prefix('/').unwrap_or(&home);
    format!("{}-", trimmed.replace('/', "-"))
}

/// Derive a short project label for `path` relative to `basedir`.
///
/// Takes the first path segment below `basedir`, drops one leading `-`
/// and then the home prefix (see [`home_prefix`]) when present.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use claude_log_tail::watcher::project_name_with_home;
///
/// let name = project_name_with_home(
///     Path::new("/data/logs/-Users-alice-myproj/session.jsonl"),
///     Path::new("/data/logs"),
///     Some(Path::new("/Users/alice")),
/// );
/// assert_eq!(name, "myproj");
/// ```
#[must_use]
pub fn project_name_with_home(path: &Path, basedir: &Path, home: Option<&Path>) -> String {
    let segment = first_segment(path, basedir);
    let project = segment.strip_prefix('-').unwrap_or(&segment);

    if let Some(home) = home {
        let prefix = home_prefix(home);
        if let Some(rest) = project.strip_prefix(prefix.as_str()) {
            return rest.to_string();
        }
    }

    project.to_string()
}

/// First component of `path` below `basedir`.
///
/// Paths outside `basedir` fall back to their parent directory name.
fn first_segment(path: &Path, basedir: &Path) -> String {
    if let Ok(rel) = path.strip_prefix(basedir) {
        if let Some(Component::Normal(first)) = rel.components().next() {
            return first.to_string_lossy().into_owned();
        }
    }

    path.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_home_prefix_simple() {
        assert_eq!(home_prefix(Path::new("/Users/alice")), "Users-alice-");
    }

    #[test]
    fn test_home_prefix_root() {
        assert_eq!(home_prefix(Path::new("/")), "-");
    }

    #[test]
    fn test_project_name_strips_home_prefix() {
        let name = project_name_with_home(
            Path::new("/data/logs/-Users-alice-myproj/session.jsonl"),
            Path::new("/data/logs"),
            Some(Path::new("/Users/alice")),
        );
        assert_eq!(name, "myproj");
    }

    #[test]
    fn test_project_name_keeps_nested_dashes() {
        let name = project_name_with_home(
            Path::new("/data/logs/-home-bob-dev-my-project/a/b.jsonl"),
            Path::new("/data/logs"),
            Some(Path::new("/home/bob")),
        );
        assert_eq!(name, "dev-my-project");
    }

    #[test]
    fn test_project_name_other_home() {
        let name = project_name_with_home(
            Path::new("/data/logs/-opt-work-svc/s.jsonl"),
            Path::new("/data/logs"),
            Some(Path::new("/Users/alice")),
        );
        assert_eq!(name, "opt-work-svc");
    }

    #[test]
    fn test_project_name_without_home() {
        let name = project_name_with_home(
            Path::new("/data/logs/-Users-alice-myproj/s.jsonl"),
            Path::new("/data/logs"),
            None,
        );
        assert_eq!(name, "Users-alice-myproj");
    }

    #[test]
    fn test_project_name_file_directly_in_basedir() {
        let name = project_name_with_home(
            Path::new("/data/logs/session.jsonl"),
            Path::new("/data/logs"),
            None,
        );
        assert_eq!(name, "session.jsonl");
    }

    #[test]
    fn test_project_name_outside_basedir() {
        let name = project_name_with_home(
            Path::new("/elsewhere/proj/s.jsonl"),
            Path::new("/data/logs"),
            None,
        );
        assert_eq!(name, "proj");
    }

    #[test]
    fn test_scan_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(scan_log_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_scan_finds_nested_jsonl_only() {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().join("-home-user-proj");
        let subagents = project.join("subagents");
        std::fs::create_dir_all(&subagents).unwrap();

        std::fs::write(project.join("s1.jsonl"), "{}").unwrap();
        std::fs::write(subagents.join("agent-1.jsonl"), "{}").unwrap();
        std::fs::write(project.join("notes.txt"), "hi").unwrap();
        std::fs::write(project.join("data.json"), "{}").unwrap();
        std::fs::create_dir(project.join("dir.jsonl")).unwrap();

        let found = scan_log_files(temp_dir.path());
        assert_eq!(found.len(), 2);
        assert!(found.contains(&project.join("s1.jsonl")));
        assert!(found.contains(&subagents.join("agent-1.jsonl")));
    }

    #[test]
    fn test_scan_custom_suffix() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.log"), "").unwrap();
        std::fs::write(temp_dir.path().join("b.jsonl"), "").unwrap();

        let scanner = DirectoryScanner::new(".log");
        let found = scanner.scan(temp_dir.path());
        assert_eq!(found.len(), 1);
        assert!(found.contains(&temp_dir.path().join("a.log")));
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let found = scan_log_files(Path::new("/nonexistent/claude-log-tail-root"));
        assert!(found.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("-locked");
        let open = temp_dir.path().join("-open");
        std::fs::create_dir(&locked).unwrap();
        std::fs::create_dir(&open).unwrap();
        std::fs::write(locked.join("hidden.jsonl"), "{}").unwrap();
        std::fs::write(open.join("visible.jsonl"), "{}").unwrap();

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        let privileged = std::fs::read_dir(&locked).is_ok();

        let found = scan_log_files(temp_dir.path());
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if privileged {
            // Permission bits are not enforced (running as root).
            return;
        }
        assert_eq!(found.len(), 1);
        assert!(found.contains(&open.join("visible.jsonl")));
    }
}
