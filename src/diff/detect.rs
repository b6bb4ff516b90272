//! Plan document format detection
//!
//! Only the first non-blank line is inspected. A pretty-printed full document
//! spans many lines, so its first line does not parse on its own and the
//! document is reported as [`PlanFormat::Unknown`].

use serde_json::Value;

/// Shape of a plan document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    /// One JSON event per line (`terraform plan -json`)
    Streaming,
    /// A single JSON document (`terraform show -json`)
    Show,
    /// Neither shape was recognized
    Unknown,
}

impl PlanFormat {
    pub fn description(&self) -> &'static str {
        match self {
            PlanFormat::Streaming => "terraform plan -json format (streaming)",
            PlanFormat::Show => "terraform show -json format",
            PlanFormat::Unknown => "unknown format",
        }
    }
}

/// Decide which parser should handle the document
pub fn detect_format(content: &str) -> PlanFormat {
    let Some(first_line) = content.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return PlanFormat::Unknown;
    };

    let Ok(Value::Object(record)) = serde_json::from_str::<Value>(first_line) else {
        return PlanFormat::Unknown;
    };

    if record.contains_key("@level") || record.contains_key("type") {
        PlanFormat::Streaming
    } else if record.contains_key("terraform_version")
        || record.contains_key("format_version")
        || record.contains_key("resource_changes")
    {
        PlanFormat::Show
    } else {
        PlanFormat::Unknown
    }
}
