//! Value formatting and attribute-level diffs
//!
//! Formatting is lossy on purpose: long strings are truncated, long sequences
//! and every mapping are summarized by size. An empty result means the line
//! should be suppressed.

use super::types::{ChangeRecord, Value};

/// Strings longer than this are truncated
const MAX_TEXT_CHARS: usize = 100;

/// Characters kept from a truncated string, before the ellipsis
const TRUNCATED_TEXT_CHARS: usize = 97;

/// Sequences longer than this are summarized by item count
const MAX_INLINE_ITEMS: usize = 5;

/// Marker rendered in place of a sensitive attribute value
pub const SENSITIVE_MARKER: &str = "`(sensitive value)`";

/// Render a value as a bounded display string, prefixed with two spaces per indent level
pub fn format_value(value: &Value, indent: usize) -> String {
    let prefix = "  ".repeat(indent);

    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => format!("{}`{}`", prefix, flag),
        Value::Number(number) => format!("{}`{}`", prefix, number),
        Value::Text(text) if text.is_empty() => String::new(),
        Value::Text(text) if text.chars().count() > MAX_TEXT_CHARS => {
            let truncated: String = text.chars().take(TRUNCATED_TEXT_CHARS).collect();
            format!("{}`{}...`", prefix, truncated)
        }
        Value::Text(text) => format!("{}`{}`", prefix, text),
        Value::Sequence(items) if items.is_empty() => String::new(),
        Value::Sequence(items) if items.len() > MAX_INLINE_ITEMS => {
            format!("{}Sequence with {} items", prefix, items.len())
        }
        Value::Sequence(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| format_value(item, 0).trim().to_string())
                .collect();
            format!("{}{}", prefix, parts.join(", "))
        }
        Value::Mapping(entries) if entries.is_empty() => String::new(),
        Value::Mapping(entries) => format!("{}Object with {} properties", prefix, entries.len()),
    }
}

/// Diff one attribute and return the display lines for it.
///
/// Removals produce no line. Null and empty containers count as absent.
pub fn diff_attribute(
    before: Option<&Value>,
    after: Option<&Value>,
    key: &str,
    indent: usize,
) -> Vec<String> {
    let prefix = "  ".repeat(indent);
    let before = before.filter(|value| !value.is_absent());
    let after = after.filter(|value| !value.is_absent());

    let mut lines = Vec::new();

    match (before, after) {
        (_, None) => {}
        (None, Some(after)) => {
            let after_str = format_value(after, 0);
            let after_str = after_str.trim();
            if !after_str.is_empty() {
                lines.push(format!("{}- **{}**: {}", prefix, key, after_str));
            }
        }
        (Some(before), Some(after)) if before != after => {
            let before_str = format_value(before, 0);
            let after_str = format_value(after, 0);
            let (before_str, after_str) = (before_str.trim(), after_str.trim());

            if !before_str.is_empty() && !after_str.is_empty() {
                lines.push(format!(
                    "{}- **{}**: ~~{}~~ → {}",
                    prefix, key, before_str, after_str
                ));
            } else if !after_str.is_empty() {
                lines.push(format!("{}- **{}**: {}", prefix, key, after_str));
            }
        }
        (Some(_), Some(_)) => {}
    }

    lines
}

/// Diff every attribute of an updated resource, in key order
pub fn change_lines(change: &ChangeRecord) -> Vec<String> {
    let mut keys: Vec<&String> = change.before.keys().chain(change.after.keys()).collect();
    keys.sort();
    keys.dedup();

    let mut lines = Vec::new();

    for key in keys {
        let before = change.before.get(key);
        let after = change.after.get(key);

        if before == after {
            continue;
        }

        if change.is_sensitive(key) {
            lines.push(format!("  - **{}**: {}", key, SENSITIVE_MARKER));
        } else {
            lines.extend(diff_attribute(before, after, key, 1));
        }
    }

    lines
}
