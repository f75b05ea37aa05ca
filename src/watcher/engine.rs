//! Tail engine driving incremental reads and periodic rescans.
//!
//! Two timers share one task: a fast poll that reads appended bytes from
//! every known file, and a slow reconciliation that rescans the root for
//! new and vanished files. Ticks never overlap.

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::discovery::{project_name_with_home, DirectoryScanner};
use super::error::WatcherError;
use super::tailer::{read_appended, FileRegistry, ReadOutcome};
use crate::config::TailConfig;
use crate::display::{format_line_with_limit, local_clock, RenderedRecord};

/// Output of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// A parsed, non-suppressed log record.
    Record(RenderedRecord),
    /// A log file appeared after startup.
    Discovered {
        path: PathBuf,
        project: String,
        /// Local wall-clock time of discovery, `HH:MM:SS`.
        time: String,
    },
}

/// Tails every log file under a root directory.
#[derive(Debug)]
pub struct TailEngine {
    root: PathBuf,
    config: TailConfig,
    scanner: DirectoryScanner,
    registry: FileRegistry,
    home: Option<PathBuf>,
}

impl TailEngine {
    /// Create an engine for `root`. No files are registered until
    /// [`TailEngine::initial_scan`] runs.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::NotADirectory`] if `root` is not a directory.
    pub fn new(root: PathBuf, config: TailConfig) -> Result<Self, WatcherError> {
        if !root.is_dir() {
            return Err(WatcherError::NotADirectory(root));
        }
        Ok(Self {
            scanner: DirectoryScanner::new(config.suffix.clone()),
            root,
            config,
            registry: FileRegistry::new(),
            home: dirs::home_dir(),
        })
    }

    /// Override the home directory used to shorten project names.
    #[must_use]
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    /// Register every existing log file at its current end.
    ///
    /// Returns the number of files found.
    pub fn initial_scan(&mut self) -> usize {
        for path in self.scanner.scan(&self.root) {
            self.registry.register_at_end(path);
        }
        tracing::info!(
            root = %self.root.display(),
            files = self.registry.len(),
            "Initial scan complete"
        );
        self.registry.len()
    }

    /// Project label for a file under the root.
    #[must_use]
    pub fn project_name(&self, path: &Path) -> String {
        project_name_with_home(path, &self.root, self.home.as_deref())
    }

    /// Read newly appended content from every registered file.
    ///
    /// Files that cannot be read this tick are skipped and stay
    /// registered. A file that shrank restarts at offset 0 on the next tick.
    pub async fn poll_tick(&mut self) -> Vec<TailEvent> {
        let mut events = Vec::new();

        for file in self.registry.files() {
            match read_appended(&file.path, file.offset, self.config.hold_partial_lines).await {
                Ok(ReadOutcome::Unchanged) => {}
                Ok(ReadOutcome::Truncated { len }) => {
                    tracing::debug!(
                        path = %file.path.display(),
                        old_offset = file.offset,
                        new_len = len,
                        "File truncated, resetting offset to 0"
                    );
                    self.registry.set_offset(&file.path, 0);
                }
                Ok(ReadOutcome::Appended { lines, new_offset }) => {
                    let project = self.project_name(&file.path);
                    events.extend(
                        lines
                            .iter()
                            .filter_map(|line| {
                                format_line_with_limit(line, &project, self.config.max_content_len)
                            })
                            .map(TailEvent::Record),
                    );
                    self.registry.set_offset(&file.path, new_offset);
                }
                Err(e) => {
                    tracing::debug!(
                        path = %file.path.display(),
                        error = %e,
                        "Skipping unreadable file this tick"
                    );
                }
            }
        }

        events
    }

    /// Rescan the root, registering new files at their current end and
    /// forgetting files that disappeared.
    ///
    /// Only new files produce events.
    pub fn reconcile_tick(&mut self) -> Vec<TailEvent> {
        let current = self.scanner.scan(&self.root);
        let changes = self.registry.reconcile(&current);

        for path in &changes.removed {
            tracing::debug!(path = %path.display(), "Log file removed");
        }

        let time = local_clock();
        changes
            .added
            .into_iter()
            .map(|file| {
                tracing::debug!(
                    path = %file.path.display(),
                    offset = file.offset,
                    "Log file discovered"
                );
                TailEvent::Discovered {
                    project: self.project_name(&file.path),
                    path: file.path,
                    time: time.clone(),
                }
            })
            .collect()
    }

    /// Run both timers until `shutdown` completes, passing every event to
    /// `emit` as it is produced.
    pub async fn run<F, S>(&mut self, mut emit: F, shutdown: S)
    where
        F: FnMut(TailEvent),
        S: Future<Output = ()>,
    {
        let poll_every = self.config.poll_interval();
        let scan_every = self.config.scan_interval();

        let mut poll = interval_at(Instant::now() + poll_every, poll_every);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut scan = interval_at(Instant::now() + scan_every, scan_every);
        scan.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = poll.tick() => {
                    for event in self.poll_tick().await {
                        emit(event);
                    }
                }
                _ = scan.tick() => {
                    for event in self.reconcile_tick() {
                        emit(event);
                    }
                }
            }
        }

        tracing::debug!("Tail engine stopped");
    }
}
