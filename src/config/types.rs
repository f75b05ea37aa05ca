//! Configuration types.

use std::time::Duration;

use is_terminal::IsTerminal;
use serde::{Deserialize, Serialize};

use crate::display::MAX_CONTENT_LEN;
use crate::watcher::DEFAULT_SUFFIX;

/// When to emit ANSI colors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color only when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Whether output written to stdout should be styled.
    #[must_use]
    pub fn should_style(self) -> bool {
        match self {
            Self::Auto => std::io::stdout().is_terminal(),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Settings for tailing a log directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    /// How often appended bytes are read, in milliseconds.
    pub poll_interval_ms: u64,
    /// How often the directory is rescanned, in seconds.
    pub scan_interval_secs: u64,
    /// Maximum characters of text per record.
    pub max_content_len: usize,
    /// File name suffix of log files.
    pub suffix: String,
    /// Leave an unterminated trailing line unread until its newline arrives.
    pub hold_partial_lines: bool,
    pub color: ColorMode,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            scan_interval_secs: 10,
            max_content_len: MAX_CONTENT_LEN,
            suffix: DEFAULT_SUFFIX.to_string(),
            hold_partial_lines: false,
            color: ColorMode::Auto,
        }
    }
}

impl TailConfig {
    /// Poll interval, at least one millisecond.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Rescan interval, at least one second.
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs.max(1))
    }
}
