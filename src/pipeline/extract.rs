//! Heuristic extractor: structural signals from raw capture content.
//!
//! Pure string and time arithmetic. No external calls, no LLM.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

/// Keywords that make a file name look task-related.
pub const TASK_KEYWORDS: &[&str] = &[
    "task",
    "todo",
    "action",
    "meeting",
    "project",
    "agenda",
    "notes",
    "deadline",
    "assignment",
    "work",
];

/// Keywords that make an email look urgent.
pub const URGENCY_KEYWORDS: &[&str] = &[
    "urgent",
    "asap",
    "immediately",
    "deadline",
    "critical",
    "important",
    "emergency",
];

/// How far back an artifact still counts as recent.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// A list marker at the start of a trimmed line: `-`, `*`, `•`, or `12.`,
/// plus any whitespace after it.
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*•]|[0-9]+\.)\s*").expect("list marker regex is valid"));

/// Pull bullet and numbered lines out of free-form text as candidate task titles.
///
/// Lines are trimmed, blanks skipped, and only lines starting with a list
/// marker are kept, with the marker removed. Source order is preserved and
/// duplicates are kept. A bare marker with nothing after it yields no item.
pub fn extract_line_items(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let marker = LIST_MARKER.find(line)?;
            let item = &line[marker.end()..];
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

/// Number of whitespace-separated words in the content.
pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

/// Case-insensitive substring test against a keyword list. One hit is enough.
pub fn contains_any_keyword(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// Whether `timestamp` is strictly after `now - 7 days`.
pub fn is_recent(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    timestamp > now - Duration::days(RECENT_WINDOW_DAYS)
}

/// First `max_chars` characters of the content with whitespace collapsed,
/// followed by an ellipsis when truncated.
pub fn preview(content: &str, max_chars: usize) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// First non-blank line of the content, trimmed.
pub fn first_line(content: &str) -> Option<&str> {
    content.lines().map(str::trim).find(|l| !l.is_empty())
}
