//! Event model for Claude Code conversation JSONL lines.
//!
//! Decoding is deliberately lenient: the producer's schema is only partly
//! known, so fields that are missing or of an unexpected shape degrade to
//! empty values instead of rejecting the whole line.

use serde::Deserialize;
use serde_json::Value;

use crate::display::truncate_chars;

/// Event types that are internal bookkeeping and never rendered.
pub const SUPPRESSED_TYPES: [&str; 2] = ["file-history-snapshot", "progress"];

/// Separator between fragments of a multi-item message.
const FRAGMENT_SEPARATOR: &str = " | ";

const BASH_COMMAND_LEN: usize = 80;
const GREP_PATTERN_LEN: usize = 50;
const TASK_PROMPT_LEN: usize = 60;
const TOOL_RESULT_LEN: usize = 100;

/// One decoded line of a conversation log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent {
    /// The `type` field, empty when absent.
    pub event_type: String,
    /// The `timestamp` field, empty when absent.
    pub timestamp: String,
    /// `message.content`.
    pub content: MessageContent,
}

impl RawEvent {
    /// Decode a single JSONL line.
    ///
    /// Returns `None` for invalid JSON and for JSON that is not an object.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(line).ok()?;
        Self::from_value(&value)
    }

    /// Build an event from an already decoded JSON value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text_field = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let content = obj
            .get("message")
            .and_then(Value::as_object)
            .and_then(|message| message.get("content"))
            .map(MessageContent::from_value)
            .unwrap_or_default();

        Some(Self {
            event_type: text_field("type"),
            timestamp: text_field("timestamp"),
            content,
        })
    }

    /// Effective category of this event.
    ///
    /// Tool results arrive wrapped in a user-role envelope; those are
    /// reported as [`Category::Tool`] rather than genuine user input.
    #[must_use]
    pub fn category(&self) -> Category {
        if self.event_type == "user" && self.content.has_tool_result() {
            return Category::Tool;
        }
        Category::from_type(&self.event_type)
    }
}

/// Message content: plain text or an ordered list of typed items.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MessageContent {
    /// Plain text content.
    Text(String),
    /// Structured content items, in order.
    Items(Vec<ContentItem>),
    /// Absent, null or any other shape.
    #[default]
    Other,
}

impl MessageContent {
    /// Classify a raw `content` value.
    ///
    /// Array elements that are not well-formed items are dropped.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => {
                Self::Items(items.iter().filter_map(ContentItem::from_value).collect())
            }
            _ => Self::Other,
        }
    }

    /// Whether any item is a tool result.
    #[must_use]
    pub fn has_tool_result(&self) -> bool {
        match self {
            Self::Items(items) => items
                .iter()
                .any(|item| matches!(item, ContentItem::ToolResult { .. })),
            _ => false,
        }
    }
}

/// A typed item within `message.content`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    /// Text content.
    Text {
        #[serde(default)]
        text: String,
    },
    /// Extended thinking; its body is never shown.
    Thinking {},
    /// Tool invocation. `name` stays raw so a non-string name still
    /// renders as `[?]`.
    ToolUse {
        #[serde(default)]
        name: Value,
        #[serde(default)]
        input: Value,
    },
    /// Tool output.
    ToolResult {
        #[serde(default)]
        content: Value,
    },
    /// Unknown item type (forward compatibility).
    #[serde(other)]
    Unknown,
}

impl ContentItem {
    /// Decode one array element, or `None` if it is not a well-formed item.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    /// Compact one-line rendering of this item, empty if it shows nothing.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Thinking {} => "[thinking]".to_string(),
            Self::ToolUse { name, input } => summarize_tool_use(name.as_str(), input),
            Self::ToolResult { content } => truncate_chars(&stringify(content), TOOL_RESULT_LEN),
            Self::Unknown => String::new(),
        }
    }
}

/// Event category used for display and suppression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    User,
    Assistant,
    Tool,
    /// Any other `type` value, verbatim (possibly empty).
    Other(String),
}

impl Category {
    /// Map a raw `type` value to a category.
    #[must_use]
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "tool" => Self::Tool,
            other => Self::Other(other.to_string()),
        }
    }

    /// Label shown in rendered records.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Other(other) => other,
        }
    }

    /// Whether events of this category are internal bookkeeping.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Other(t) if SUPPRESSED_TYPES.contains(&t.as_str()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produce a textual summary of message content.
///
/// Plain strings pass through unchanged. Item lists are summarized item by
/// item and non-empty fragments joined with `" | "`.
#[must_use]
pub fn extract_content(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Items(items) => items
            .iter()
            .map(ContentItem::summary)
            .filter(|fragment| !fragment.is_empty())
            .collect::<Vec<_>>()
            .join(FRAGMENT_SEPARATOR),
        MessageContent::Other => String::new(),
    }
}

/// Render a tool invocation as a short, tool-specific snippet.
///
/// Falls back to `[<name>]` (or `[?]`) when the tool is not recognized or
/// its key input field is missing.
#[must_use]
pub fn summarize_tool_use(name: Option<&str>, input: &Value) -> String {
    let name = name.unwrap_or("?");
    let field = |key: &str| {
        input
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };

    let snippet = match name {
        "Bash" => field("command").map(|cmd| {
            format!(
                "$ {}",
                truncate_chars(cmd, BASH_COMMAND_LEN).replace('\n', " ")
            )
        }),
        "Read" => field("file_path").map(|path| format!("read {path}")),
        "Edit" => field("file_path").map(|path| format!("edit {path}")),
        "Write" => field("file_path").map(|path| format!("write {path}")),
        "Glob" => field("pattern").map(|pattern| format!("glob {pattern}")),
        "Grep" => field("pattern")
            .map(|pattern| format!("grep {}", truncate_chars(pattern, GREP_PATTERN_LEN))),
        "Task" => field("prompt")
            .map(|prompt| format!("task: {}", truncate_chars(prompt, TASK_PROMPT_LEN))),
        _ => None,
    };

    snippet.unwrap_or_else(|| format!("[{name}]"))
}

/// Coerce a tool result body to text. Non-string values are rendered as
/// compact JSON; null becomes empty.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
