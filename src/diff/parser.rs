//! Plan parsers for OpenTofu/Terraform JSON output
//!
//! Two shapes are supported: the streaming event log of `terraform plan -json`
//! and the full document of `terraform show -json <planfile>`. Both are
//! normalized into a [`PlanDocument`].

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use super::classify::is_tags_only;
use super::detect::PlanFormat;
use super::types::{
    ActionKind, ChangeRecord, Diagnostic, OutputChange, PlanDocument, Snippet, Value,
};

const NO_SUMMARY: &str = "No summary available.";

/// Parser for OpenTofu/Terraform plan JSON
#[derive(Debug, Default)]
pub struct PlanParser;

impl PlanParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a plan with the parser matching `format`; unknown input is read as streaming
    pub fn parse(&self, content: &str, format: PlanFormat) -> Result<PlanDocument> {
        match format {
            PlanFormat::Show => self.parse_show(content),
            PlanFormat::Streaming | PlanFormat::Unknown => {
                let mut plan = self.parse_streaming(content);
                plan.format = format;
                Ok(plan)
            }
        }
    }

    /// Parse streaming output, one JSON event per line.
    ///
    /// Lines that are not JSON objects are skipped and counted. A later
    /// `planned_change` for an address replaces the earlier one.
    pub fn parse_streaming(&self, content: &str) -> PlanDocument {
        let mut plan = PlanDocument::new(PlanFormat::Streaming);
        let mut planned: IndexMap<String, ChangeRecord> = IndexMap::new();

        for line in content.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let event = match serde_json::from_str::<serde_json::Value>(line) {
                Ok(event) if event.is_object() => event,
                _ => {
                    plan.skipped_lines += 1;
                    continue;
                }
            };

            let event_type = event.get("type").and_then(|t| t.as_str());
            let level = event.get("@level").and_then(|l| l.as_str());

            if level == Some("error") && event_type == Some("diagnostic") {
                plan.errors.push(self.extract_diagnostic(&event));
            }

            match event_type {
                Some("version") => {
                    plan.tool_version = event
                        .get("terraform")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string());
                }
                Some("planned_change") => {
                    if let Some(record) = self.extract_planned_change(&event) {
                        planned.insert(record.address.clone(), record);
                    }
                }
                _ => {}
            }
        }

        plan.changes = planned.into_values().collect();
        plan
    }

    /// Build a change record from a `planned_change` event; data source reads are dropped
    fn extract_planned_change(&self, event: &serde_json::Value) -> Option<ChangeRecord> {
        let change = event.get("change")?;
        let action = change.get("action").and_then(|a| a.as_str()).unwrap_or("");

        if action == "read" {
            return None;
        }

        let resource = change.get("resource");
        let field = |name: &str| {
            resource
                .and_then(|r| r.get(name))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        let address = field("addr");
        let actions = match action {
            "replace" => vec![ActionKind::Delete, ActionKind::Create],
            other => ActionKind::parse_all([other]),
        };

        let mut record = ChangeRecord::new(&address, actions);

        let module = field("module");
        let resource_type = field("resource_type");
        let resource_name = field("resource_name");

        if !module.is_empty() {
            record.module = module;
        }
        if !resource_type.is_empty() {
            record.resource_type = resource_type;
        }
        if !resource_name.is_empty() {
            record.resource_name = resource_name;
        }

        record.action_reason = change
            .get("reason")
            .and_then(|r| r.as_str())
            .map(|s| s.to_string());

        Some(record)
    }

    /// Extract a diagnostic, which may be nested under `diagnostic` or sit at the top level
    fn extract_diagnostic(&self, event: &serde_json::Value) -> Diagnostic {
        let diagnostic = event.get("diagnostic").unwrap_or(event);
        let text = |value: Option<&serde_json::Value>| {
            value.and_then(|v| v.as_str()).map(|s| s.to_string())
        };

        let summary = text(diagnostic.get("summary"))
            .or_else(|| text(event.get("@message")))
            .unwrap_or_else(|| NO_SUMMARY.to_string());

        let snippet = diagnostic.get("snippet").and_then(|snippet| {
            let code = text(snippet.get("code"))?;
            Some(Snippet {
                code,
                start_line: snippet.get("start_line").and_then(|l| l.as_u64()),
                filename: text(diagnostic.get("range").and_then(|r| r.get("filename"))),
            })
        });

        Diagnostic {
            summary,
            address: text(diagnostic.get("address")),
            snippet,
        }
    }

    /// Parse a full plan document
    pub fn parse_show(&self, content: &str) -> Result<PlanDocument> {
        let raw: RawPlan =
            serde_json::from_str(content).context("Failed to parse plan as JSON")?;

        let mut plan = PlanDocument::new(PlanFormat::Show);
        plan.tool_version = raw.terraform_version;

        plan.changes = raw
            .resource_changes
            .unwrap_or_default()
            .into_iter()
            .map(RawResourceChange::into_record)
            .collect();

        plan.output_changes = raw
            .output_changes
            .unwrap_or_default()
            .into_iter()
            .map(|(name, output)| (name, output.into_output_change()))
            .collect();

        Ok(plan)
    }
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    terraform_version: Option<String>,
    #[serde(default)]
    resource_changes: Option<Vec<RawResourceChange>>,
    #[serde(default)]
    output_changes: Option<BTreeMap<String, RawOutputChange>>,
}

#[derive(Debug, Deserialize)]
struct RawResourceChange {
    #[serde(default)]
    address: String,
    #[serde(default)]
    module_address: Option<String>,
    #[serde(rename = "type", default)]
    resource_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    action_reason: Option<String>,
    #[serde(default)]
    change: RawChange,
}

#[derive(Debug, Default, Deserialize)]
struct RawChange {
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    before: serde_json::Value,
    #[serde(default)]
    after: serde_json::Value,
    #[serde(default)]
    before_sensitive: serde_json::Value,
    #[serde(default)]
    after_sensitive: serde_json::Value,
    #[serde(default)]
    after_unknown: serde_json::Value,
    #[serde(default)]
    replace_paths: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(default)]
    action_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOutputChange {
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    before: serde_json::Value,
    #[serde(default)]
    after: serde_json::Value,
    #[serde(default)]
    sensitive: serde_json::Value,
    #[serde(default)]
    before_sensitive: serde_json::Value,
    #[serde(default)]
    after_sensitive: serde_json::Value,
}

impl RawResourceChange {
    fn into_record(self) -> ChangeRecord {
        let change = self.change;
        let actions = ActionKind::parse_all(change.actions.iter().map(String::as_str));

        let address = if self.address.is_empty() {
            format!("{}.{}", self.resource_type, self.name)
        } else {
            self.address
        };

        let mut record = ChangeRecord::new(&address, actions);
        record.module = self.module_address.unwrap_or_default();
        record.resource_type = self.resource_type;
        record.resource_name = self.name;
        record.action_reason = self.action_reason.or(change.action_reason);

        record.before = attribute_map(change.before);
        record.after = attribute_map(change.after);
        record.before_sensitive = flag_map(change.before_sensitive);
        record.after_sensitive = flag_map(change.after_sensitive);
        record.after_unknown = flag_map(change.after_unknown);
        record.replace_paths = change
            .replace_paths
            .unwrap_or_default()
            .into_iter()
            .map(|path| path.into_iter().map(Value::from).collect())
            .collect();

        record.tags_only = is_tags_only(
            &record.actions,
            &record.before,
            &record.after,
            &record.after_unknown,
        );

        record
    }
}

impl RawOutputChange {
    fn into_output_change(self) -> OutputChange {
        let sensitive = [self.sensitive, self.before_sensitive, self.after_sensitive]
            .into_iter()
            .any(|marker| Value::from(marker).is_flagged());

        OutputChange {
            actions: ActionKind::parse_all(self.actions.iter().map(String::as_str)),
            before: Value::from(self.before).into_option(),
            after: Value::from(self.after).into_option(),
            sensitive,
        }
    }
}

/// Attributes of an object state; anything else has none
fn attribute_map(state: serde_json::Value) -> BTreeMap<String, Value> {
    match Value::from(state) {
        Value::Mapping(entries) => entries,
        _ => BTreeMap::new(),
    }
}

/// Per-attribute flags from a (possibly nested) marker object
fn flag_map(markers: serde_json::Value) -> BTreeMap<String, bool> {
    attribute_map(markers)
        .into_iter()
        .map(|(key, marker)| (key, marker.is_flagged()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::types::Bucket;

    fn streaming_sample() -> &'static str {
        r#"{"@level":"info","@message":"Terraform 1.6.0","type":"version","terraform":"1.6.0","ui":"1.2"}
{"@level":"info","@message":"aws_s3_bucket.logs: Plan to create","type":"planned_change","change":{"resource":{"addr":"aws_s3_bucket.logs","module":"","resource":"aws_s3_bucket.logs","resource_type":"aws_s3_bucket","resource_name":"logs"},"action":"create"}}
this line is not json
{"@level":"info","type":"planned_change","change":{"resource":{"addr":"data.aws_ami.ubuntu","resource_type":"aws_ami","resource_name":"ubuntu"},"action":"read"}}
{"@level":"info","type":"planned_change","change":{"resource":{"addr":"aws_instance.web","resource_type":"aws_instance","resource_name":"web"},"action":"replace","reason":"cannot_update"}}
{"@level":"error","@message":"Error: Invalid reference","type":"diagnostic","diagnostic":{"severity":"error","summary":"Invalid reference","address":"aws_instance.web","range":{"filename":"main.tf","start":{"line":12}},"snippet":{"code":"  ami = var.missing","start_line":12}}}
{"@level":"info","type":"change_summary","changes":{"add":1,"change":0,"remove":0,"operation":"plan"}}
"#
    }

    #[test]
    fn test_parse_streaming_version_and_changes() {
        let plan = PlanParser::new().parse_streaming(streaming_sample());

        assert_eq!(plan.tool_version.as_deref(), Some("1.6.0"));
        assert_eq!(plan.format, PlanFormat::Streaming);
        assert_eq!(plan.changes.len(), 2);

        let logs = &plan.changes[0];
        assert_eq!(logs.address, "aws_s3_bucket.logs");
        assert_eq!(logs.resource_type, "aws_s3_bucket");
        assert_eq!(logs.resource_name, "logs");
        assert_eq!(logs.actions, vec![ActionKind::Create]);
        assert!(logs.before.is_empty() && logs.after.is_empty());
        assert!(!logs.tags_only);
    }

    #[test]
    fn test_parse_streaming_skips_reads_and_bad_lines() {
        let plan = PlanParser::new().parse_streaming(streaming_sample());

        assert!(plan.changes.iter().all(|c| c.address != "data.aws_ami.ubuntu"));
        assert_eq!(plan.skipped_lines, 1);
    }

    #[test]
    fn test_parse_streaming_replace_action() {
        let plan = PlanParser::new().parse_streaming(streaming_sample());
        let web = plan
            .changes
            .iter()
            .find(|c| c.address == "aws_instance.web")
            .unwrap();

        assert_eq!(web.bucket(), Bucket::Replace);
        assert_eq!(web.action_reason.as_deref(), Some("cannot_update"));
    }

    #[test]
    fn test_parse_streaming_diagnostic() {
        let plan = PlanParser::new().parse_streaming(streaming_sample());

        assert_eq!(plan.errors.len(), 1);
        let error = &plan.errors[0];
        assert_eq!(error.summary, "Invalid reference");
        assert_eq!(error.address.as_deref(), Some("aws_instance.web"));

        let snippet = error.snippet.as_ref().unwrap();
        assert_eq!(snippet.code, "  ami = var.missing");
        assert_eq!(snippet.start_line, Some(12));
        assert_eq!(snippet.filename.as_deref(), Some("main.tf"));
    }

    #[test]
    fn test_parse_streaming_top_level_diagnostic() {
        let content = r#"{"@level":"error","@message":"Error: backend init required","type":"diagnostic"}"#;
        let plan = PlanParser::new().parse_streaming(content);

        assert_eq!(plan.errors.len(), 1);
        assert_eq!(plan.errors[0].summary, "Error: backend init required");
        assert!(plan.errors[0].address.is_none());
        assert!(plan.errors[0].snippet.is_none());
    }

    #[test]
    fn test_parse_streaming_warning_is_not_error() {
        let content = r#"{"@level":"warn","type":"diagnostic","diagnostic":{"summary":"Deprecated"}}"#;
        let plan = PlanParser::new().parse_streaming(content);
        assert!(plan.errors.is_empty());
    }

    #[test]
    fn test_parse_streaming_last_write_wins() {
        let content = r#"{"type":"planned_change","change":{"resource":{"addr":"aws_iam_role.app"},"action":"create"}}
{"type":"planned_change","change":{"resource":{"addr":"aws_sqs_queue.jobs"},"action":"delete"}}
{"type":"planned_change","change":{"resource":{"addr":"aws_iam_role.app"},"action":"update"}}"#;

        let plan = PlanParser::new().parse_streaming(content);

        let roles: Vec<&ChangeRecord> = plan
            .changes
            .iter()
            .filter(|c| c.address == "aws_iam_role.app")
            .collect();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].actions, vec![ActionKind::Update]);
        assert_eq!(plan.changes.len(), 2);
    }

    #[test]
    fn test_parse_streaming_address_fallback() {
        let content = r#"{"type":"planned_change","change":{"resource":{"addr":"module.net.aws_subnet.a"},"action":"delete"}}"#;
        let plan = PlanParser::new().parse_streaming(content);

        let subnet = &plan.changes[0];
        assert_eq!(subnet.module, "module.net");
        assert_eq!(subnet.resource_type, "aws_subnet");
        assert_eq!(subnet.resource_name, "a");
    }

    #[test]
    fn test_parse_unknown_marks_format() {
        let plan = PlanParser::new().parse("garbage", PlanFormat::Unknown).unwrap();
        assert_eq!(plan.format, PlanFormat::Unknown);
        assert_eq!(plan.skipped_lines, 1);
        assert!(plan.changes.is_empty());
    }

    fn show_sample() -> &'static str {
        r#"{
  "format_version": "1.2",
  "terraform_version": "1.6.0",
  "resource_changes": [
    {
      "address": "aws_instance.web",
      "type": "aws_instance",
      "name": "web",
      "change": {
        "actions": ["update"],
        "before": {"ami": "ami-1", "arn": "arn:1", "tags": {"Name": "a"}, "tags_all": {"Name": "a"}},
        "after": {"ami": "ami-1", "arn": null, "tags": {"Name": "b"}, "tags_all": {"Name": "b"}},
        "after_unknown": {"arn": true, "tags": {}, "tags_all": {}},
        "before_sensitive": {"tags": {}, "tags_all": {}},
        "after_sensitive": {"tags": {}, "tags_all": {}}
      }
    },
    {
      "address": "module.db.aws_db_instance.main",
      "module_address": "module.db",
      "type": "aws_db_instance",
      "name": "main",
      "action_reason": "replace_because_cannot_update",
      "change": {
        "actions": ["delete", "create"],
        "before": {"identifier": "db-old", "password": "x"},
        "after": {"identifier": "db-new", "password": "y"},
        "after_sensitive": {"password": true},
        "replace_paths": [["identifier"]]
      }
    }
  ],
  "output_changes": {
    "db_password": {"actions": ["update"], "before": "x", "after": "y", "sensitive": true},
    "endpoint": {"actions": ["create"], "before": null, "after": "db.example.com", "sensitive": false}
  }
}"#
    }

    #[test]
    fn test_parse_show_tags_only() {
        let plan = PlanParser::new().parse_show(show_sample()).unwrap();

        assert_eq!(plan.tool_version.as_deref(), Some("1.6.0"));
        assert_eq!(plan.format, PlanFormat::Show);

        let web = &plan.changes[0];
        assert!(web.tags_only);
        assert_eq!(web.bucket(), Bucket::UpdateTagsOnly);
    }

    #[test]
    fn test_parse_show_replace() {
        let plan = PlanParser::new().parse_show(show_sample()).unwrap();
        let db = &plan.changes[1];

        assert_eq!(db.module, "module.db");
        assert_eq!(db.resource_type, "aws_db_instance");
        assert_eq!(db.bucket(), Bucket::Replace);
        assert!(!db.tags_only);
        assert!(db.is_sensitive("password"));
        assert_eq!(
            db.action_reason.as_deref(),
            Some("replace_because_cannot_update")
        );
        assert!(db.forces_replacement().contains("identifier"));
    }

    #[test]
    fn test_parse_show_outputs() {
        let plan = PlanParser::new().parse_show(show_sample()).unwrap();

        let endpoint = &plan.output_changes["endpoint"];
        assert_eq!(endpoint.actions, vec![ActionKind::Create]);
        assert!(endpoint.before.is_none());
        assert_eq!(endpoint.after, Some(Value::Text("db.example.com".to_string())));
        assert!(plan.output_changes["db_password"].sensitive);
        assert!(!endpoint.sensitive);
    }

    #[test]
    fn test_parse_show_output_sensitivity_markers() {
        let content = r#"{"output_changes":{"token":{"actions":["create"],"before":null,"after":"t","after_sensitive":true}}}"#;
        let plan = PlanParser::new().parse_show(content).unwrap();

        assert!(plan.output_changes["token"].sensitive);
    }

    #[test]
    fn test_parse_show_update_with_other_change_is_not_tags_only() {
        let content = r#"{"resource_changes":[{"address":"aws_instance.web","type":"aws_instance","name":"web",
            "change":{"actions":["update"],"before":{"ami":"ami-1","tags":{"A":"1"}},"after":{"ami":"ami-2","tags":{"A":"2"}}}}]}"#;
        let plan = PlanParser::new().parse_show(content).unwrap();

        assert!(!plan.changes[0].tags_only);
        assert_eq!(plan.changes[0].bucket(), Bucket::Update);
    }

    #[test]
    fn test_parse_show_malformed_is_error() {
        let err = PlanParser::new().parse_show("{\"resource_changes\": [").unwrap_err();
        assert!(err.to_string().contains("Failed to parse plan as JSON"));

        assert!(PlanParser::new().parse_show("[1, 2]").is_err());
    }

    #[test]
    fn test_parse_show_without_changes() {
        let plan = PlanParser::new()
            .parse_show(r#"{"terraform_version":"1.5.7"}"#)
            .unwrap();

        assert!(plan.changes.is_empty());
        assert!(plan.output_changes.is_empty());
    }
}
