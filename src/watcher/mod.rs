//! Watcher module for Claude Code conversation logs.
//!
//! Discovers JSONL log files, reads what is appended to them, and turns
//! each new line into a compact record.

mod discovery;
mod engine;
mod error;
mod jsonl;
mod tailer;

pub use discovery::{
    home_prefix, project_name_with_home, scan_log_files, DirectoryScanner,
    DEFAULT_SUFFIX,
};
pub use engine::{TailEngine, TailEvent};
pub use error::WatcherError;
pub use jsonl::*;
pub use tailer::{read_appended, FileRegistry, ReadOutcome, Reconciliation, WatchedFile};
