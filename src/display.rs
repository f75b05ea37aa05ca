//! Colored, single-line rendering of conversation events.
//!
//! Turns raw JSONL lines into [`RenderedRecord`]s and prints them, along
//! with the startup, discovery and shutdown notices.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use owo_colors::OwoColorize;

use crate::watcher::{extract_content, Category, RawEvent};

/// Maximum number of characters of text shown per record.
pub const MAX_CONTENT_LEN: usize = 300;

/// Maximum number of fractional-second digits kept when parsing timestamps.
const MAX_FRACTION_DIGITS: usize = 6;

/// ISO-8601 shapes tried after RFC 3339: colon-less offsets and minute
/// precision.
const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

/// Offset-free shapes, read as wall time.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Display color of a record's category label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordColor {
    User,
    Assistant,
    Tool,
    Error,
    Default,
}

impl RecordColor {
    /// Pick the color for a category, overridden to [`RecordColor::Error`]
    /// when the text mentions an error.
    #[must_use]
    pub fn select(category: &Category, text: &str) -> Self {
        if text.to_lowercase().contains("error") {
            return Self::Error;
        }
        match category {
            Category::User => Self::User,
            Category::Assistant => Self::Assistant,
            Category::Tool => Self::Tool,
            Category::Other(_) => Self::Default,
        }
    }

    fn paint(self, s: &str) -> String {
        match self {
            Self::User => s.green().to_string(),
            Self::Assistant => s.yellow().to_string(),
            Self::Tool => s.magenta().to_string(),
            Self::Error => s.red().to_string(),
            Self::Default => s.white().to_string(),
        }
    }
}

/// One user-visible output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRecord {
    /// Local `HH:MM:SS`, or empty if the event had no usable timestamp.
    pub time: String,
    pub project: String,
    pub category: String,
    pub color: RecordColor,
    /// Whitespace-normalized, truncated text.
    pub text: String,
}

impl RenderedRecord {
    /// Render as `[<time>] [<project>] [<category>] <text>`, color-wrapping
    /// each bracketed field when `styled`.
    #[must_use]
    pub fn render(&self, styled: bool) -> String {
        let time = format!("[{}]", self.time);
        let project = format!("[{}]", self.project);
        let category = format!("[{}]", self.category);

        if styled {
            format!(
                "{} {} {} {}",
                time.dimmed(),
                project.blue(),
                self.color.paint(&category),
                self.text
            )
        } else {
            format!("{time} {project} {category} {}", self.text)
        }
    }
}

/// Parse a JSONL line into a record, or `None` if it should be suppressed.
#[must_use]
pub fn format_line(line: &str, project: &str) -> Option<RenderedRecord> {
    format_line_with_limit(line, project, MAX_CONTENT_LEN)
}

/// Like [`format_line`] with a custom text length limit.
///
/// Suppresses malformed JSON, bookkeeping event types, and events with no
/// extractable text. A bad timestamp only blanks the time field.
#[must_use]
pub fn format_line_with_limit(line: &str, project: &str, max_len: usize) -> Option<RenderedRecord> {
    let Some(event) = RawEvent::parse(line) else {
        tracing::trace!(line = %line, "Skipping malformed JSONL line");
        return None;
    };

    let category = event.category();
    if category.is_suppressed() {
        return None;
    }

    let time = parse_timestamp_local(&event.timestamp);

    let text = extract_content(&event.content);
    if text.is_empty() {
        return None;
    }
    let text = truncate(&normalize_whitespace(&text), max_len);
    // Whitespace-only content normalizes away.
    if text.is_empty() {
        return None;
    }

    Some(RenderedRecord {
        time,
        project: project.to_string(),
        color: RecordColor::select(&category, &text),
        category: category.to_string(),
        text,
    })
}

/// Replace newlines with spaces, collapse whitespace runs and trim.
#[must_use]
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep at most `max_chars` characters of `s`.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate to `max_chars` characters, appending `...` if anything was cut.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Parse an ISO-8601 timestamp and format it as local `HH:MM:SS`.
///
/// Returns an empty string when `ts` has no `T` separator or cannot be
/// interpreted at all.
#[must_use]
pub fn parse_timestamp_local(ts: &str) -> String {
    parse_timestamp_in(ts, &Local)
}

/// Parse an ISO-8601 timestamp and format it as `HH:MM:SS` in `tz`.
///
/// A trailing `Z` is read as `+00:00` and fractional seconds are cut to six
/// digits. Timestamps without an offset are taken as wall time. When
/// parsing fails, the text between `T` and the first `.` is used as is.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use claude_log_tail::display::parse_timestamp_in;
///
/// assert_eq!(parse_timestamp_in("2024-03-01T10:15:30.123456789Z", &Utc), "10:15:30");
/// assert_eq!(parse_timestamp_in("not-a-timestamp", &Utc), "");
/// ```
#[must_use]
pub fn parse_timestamp_in<Tz: TimeZone>(ts: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if !ts.contains('T') {
        return String::new();
    }

    let normalized = normalize_timestamp(ts);
    let with_offset = DateTime::parse_from_rfc3339(&normalized).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(&normalized, fmt).ok())
    });
    if let Some(dt) = with_offset {
        return dt.with_timezone(tz).format("%H:%M:%S").to_string();
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok());
    if let Some(naive) = naive {
        return naive.format("%H:%M:%S").to_string();
    }

    tracing::trace!(timestamp = %ts, "Unparseable timestamp, using raw time text");
    ts.split('T')
        .nth(1)
        .and_then(|rest| rest.split('.').next())
        .unwrap_or_default()
        .to_string()
}

/// Rewrite a trailing `Z` as `+00:00` and cap the fractional seconds.
fn normalize_timestamp(ts: &str) -> String {
    let ts = match ts.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => ts.to_string(),
    };

    let Some((head, rest)) = ts.split_once('.') else {
        return ts;
    };
    let tz_start = rest.find(['+', '-']).unwrap_or(rest.len());
    let (fraction, offset) = rest.split_at(tz_start);
    format!(
        "{head}.{}{offset}",
        truncate_chars(fraction, MAX_FRACTION_DIGITS)
    )
}

/// Current local wall-clock time as `HH:MM:SS`.
#[must_use]
pub fn local_clock() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Render the notice for a newly discovered log file.
#[must_use]
pub fn render_discovery(time: &str, project: &str, styled: bool) -> String {
    let time = format!("[{time}]");
    if styled {
        format!("{} {} {project}", time.dimmed(), "[+]".blue())
    } else {
        format!("{time} [+] {project}")
    }
}

/// Short label for a file suffix: `.jsonl` becomes `JSONL`.
#[must_use]
pub fn suffix_label(suffix: &str) -> String {
    suffix.trim_start_matches('.').to_uppercase()
}

/// Format an interval as seconds: `500ms` is `0.5`, `10s` is `10`.
#[must_use]
pub fn format_secs(interval: Duration) -> String {
    interval.as_secs_f64().to_string()
}

/// Print a rendered record.
pub fn print_record(record: &RenderedRecord, styled: bool) {
    println!("{}", record.render(styled));
    let _ = io::stdout().flush();
}

/// Print a file discovery notice.
pub fn print_discovery(time: &str, project: &str, styled: bool) {
    println!("{}", render_discovery(time, project, styled));
    let _ = io::stdout().flush();
}

/// Print the startup banner.
pub fn print_startup(root: &Path, suffix: &str, poll: Duration, scan: Duration) {
    println!(
        "Monitoring {} files in: {}",
        suffix_label(suffix),
        root.display()
    );
    println!(
        "Polling every {}s. New files checked every {}s.",
        format_secs(poll),
        format_secs(scan)
    );
    println!("Press Ctrl+C to exit.");
    println!("---");
    let _ = io::stdout().flush();
}

/// Print the number of files found by the initial scan.
pub fn print_file_count(count: usize, suffix: &str) {
    println!("Monitoring {count} {} files", suffix_label(suffix));
    println!("---");
    let _ = io::stdout().flush();
}

/// Print the shutdown notice.
pub fn print_shutdown(styled: bool) {
    if styled {
        println!("\n{}", "Shutting down...".dimmed());
    } else {
        println!("\nShutting down...");
    }
    let _ = io::stdout().flush();
}
