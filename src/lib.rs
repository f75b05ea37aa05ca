//! Claude Log Tail - Follow Claude Code conversation logs as they are written.

pub mod config;
pub mod display;
pub mod watcher;
