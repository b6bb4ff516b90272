//! Data types for plan change reports
//!
//! This module defines the normalized in-memory model that both plan parsers
//! produce and the Markdown renderer consumes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::classify::classify;
use super::detect::PlanFormat;

/// A loosely-typed attribute value taken from a plan document
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
}

impl Value {
    /// Null, an empty sequence and an empty mapping all count as "absent"
    pub fn is_absent(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Sequence(items) => items.is_empty(),
            Value::Mapping(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Whether any nested leaf of a sensitivity/unknown marker is `true`
    pub fn is_flagged(&self) -> bool {
        match self {
            Value::Bool(flag) => *flag,
            Value::Sequence(items) => items.iter().any(Value::is_flagged),
            Value::Mapping(entries) => entries.values().any(Value::is_flagged),
            _ => false,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Null becomes `None`, everything else is kept
    pub fn into_option(self) -> Option<Value> {
        match self {
            Value::Null => None,
            other => Some(other),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Bool(flag),
            serde_json::Value::Number(number) => Value::Number(number),
            serde_json::Value::String(text) => Value::Text(text),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Mapping(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Plain rendering used for tag values: text is shown raw, containers compactly
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(flag) => write!(f, "{}", flag),
            Value::Number(number) => write!(f, "{}", number),
            Value::Text(text) => f.write_str(text),
            Value::Sequence(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Mapping(entries) => {
                f.write_str("{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// A single planned action on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Read,
}

impl ActionKind {
    /// Parse a plan action name; `no-op` and anything unknown yield `None`
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "create" => Some(ActionKind::Create),
            "update" => Some(ActionKind::Update),
            "delete" => Some(ActionKind::Delete),
            "read" => Some(ActionKind::Read),
            _ => None,
        }
    }

    /// Normalize a list of action names into an ordered, duplicate-free set
    pub fn parse_all<'a>(actions: impl IntoIterator<Item = &'a str>) -> Vec<ActionKind> {
        let mut parsed = Vec::new();
        for action in actions.into_iter().filter_map(ActionKind::parse) {
            if !parsed.contains(&action) {
                parsed.push(action);
            }
        }
        parsed
    }
}

/// The mutually exclusive classification of a resource's pending action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Create,
    Update,
    UpdateTagsOnly,
    Replace,
    Delete,
    Read,
    NoOp,
}

impl Bucket {
    /// Get the emoji label for this bucket
    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Create => "➕ **CREATE**",
            Bucket::Update => "🔄 **UPDATE**",
            Bucket::UpdateTagsOnly => "🏷️ **UPDATE (TAGS ONLY)**",
            Bucket::Replace => "🔁 **REPLACE**",
            Bucket::Delete => "🗑️ **DELETE**",
            Bucket::Read => "📖 **READ**",
            Bucket::NoOp => "⚪ **NO-OP**",
        }
    }
}

/// A resource change block in the plan
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Full resource address (e.g., "aws_instance.example", "module.vpc.aws_subnet.main")
    pub address: String,

    /// Module path, empty for root module resources
    pub module: String,

    /// Resource type (e.g., "aws_instance")
    pub resource_type: String,

    /// Resource name (e.g., "example")
    pub resource_name: String,

    /// Planned actions; create together with delete means replacement
    pub actions: Vec<ActionKind>,

    pub before: BTreeMap<String, Value>,
    pub after: BTreeMap<String, Value>,
    pub before_sensitive: BTreeMap<String, bool>,
    pub after_sensitive: BTreeMap<String, bool>,

    /// Attributes whose value is known only after apply
    pub after_unknown: BTreeMap<String, bool>,

    /// Attribute paths the provider reports as forcing replacement
    pub replace_paths: Vec<Vec<Value>>,

    pub action_reason: Option<String>,

    /// Only `tags`/`tags_all` differ between before and after
    pub tags_only: bool,
}

impl ChangeRecord {
    /// Create a change record with no attribute detail
    pub fn new(address: &str, actions: Vec<ActionKind>) -> Self {
        let (module, resource_type, resource_name) = Self::parse_address(address);

        Self {
            address: address.to_string(),
            module: module.unwrap_or_default(),
            resource_type,
            resource_name,
            actions,
            before: BTreeMap::new(),
            after: BTreeMap::new(),
            before_sensitive: BTreeMap::new(),
            after_sensitive: BTreeMap::new(),
            after_unknown: BTreeMap::new(),
            replace_paths: Vec::new(),
            action_reason: None,
            tags_only: false,
        }
    }

    /// Parse a resource address into its components
    fn parse_address(address: &str) -> (Option<String>, String, String) {
        // Handle module prefixes: module.vpc.aws_instance.example
        let parts: Vec<&str> = address.split('.').collect();

        if parts.len() >= 4 && parts[0] == "module" {
            let module_path = parts[..parts.len() - 2].join(".");
            let resource_type = parts[parts.len() - 2].to_string();
            let resource_name = parts[parts.len() - 1].to_string();
            (Some(module_path), resource_type, resource_name)
        } else if parts.len() >= 2 {
            let resource_type = parts[0].to_string();
            let resource_name = parts[1..].join(".");
            (None, resource_type, resource_name)
        } else {
            (None, address.to_string(), String::new())
        }
    }

    pub fn bucket(&self) -> Bucket {
        classify(&self.actions, self.tags_only)
    }

    /// Whether the attribute is flagged sensitive in either state
    pub fn is_sensitive(&self, key: &str) -> bool {
        self.before_sensitive.get(key).copied().unwrap_or(false)
            || self.after_sensitive.get(key).copied().unwrap_or(false)
    }

    /// Attribute names that force replacement, taken from the first path segment
    pub fn forces_replacement(&self) -> BTreeSet<String> {
        self.replace_paths
            .iter()
            .filter_map(|path| path.first())
            .map(|segment| segment.to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// A planned change to a root module output
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputChange {
    pub actions: Vec<ActionKind>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub sensitive: bool,
}

impl OutputChange {
    pub fn bucket(&self) -> Bucket {
        classify(&self.actions, false)
    }
}

/// Source excerpt attached to a diagnostic
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub code: String,
    pub start_line: Option<u64>,
    pub filename: Option<String>,
}

/// An error reported by the planning tool
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub summary: String,
    pub address: Option<String>,
    pub snippet: Option<Snippet>,
}

/// Resource counts per bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub update_tags_only: usize,
    pub replace: usize,
    pub delete: usize,
    pub read: usize,
    pub no_op: usize,
}

impl PlanSummary {
    /// Compute the summary from change records
    pub fn from_changes(changes: &[ChangeRecord]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            summary.record(change.bucket());
        }
        summary
    }

    pub fn record(&mut self, bucket: Bucket) {
        match bucket {
            Bucket::Create => self.create += 1,
            Bucket::Update => self.update += 1,
            Bucket::UpdateTagsOnly => self.update_tags_only += 1,
            Bucket::Replace => self.replace += 1,
            Bucket::Delete => self.delete += 1,
            Bucket::Read => self.read += 1,
            Bucket::NoOp => self.no_op += 1,
        }
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// Get total number of changes
    pub fn total_changes(&self) -> usize {
        self.create + self.update + self.update_tags_only + self.replace + self.delete
    }
}

/// Normalized plan ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDocument {
    /// Version of the tool that produced the plan
    pub tool_version: Option<String>,

    /// Resource changes, unique by address
    pub changes: Vec<ChangeRecord>,

    /// Output changes keyed by output name
    pub output_changes: BTreeMap<String, OutputChange>,

    /// Error diagnostics in the order they were reported
    pub errors: Vec<Diagnostic>,

    /// Shape the document was parsed from
    pub format: PlanFormat,

    /// Streaming lines that could not be parsed and were skipped
    pub skipped_lines: usize,
}

impl PlanDocument {
    pub fn new(format: PlanFormat) -> Self {
        Self {
            tool_version: None,
            changes: Vec::new(),
            output_changes: BTreeMap::new(),
            errors: Vec::new(),
            format,
            skipped_lines: 0,
        }
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary::from_changes(&self.changes)
    }
}
