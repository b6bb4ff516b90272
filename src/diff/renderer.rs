//! Markdown renderer for plan change reports
//!
//! Sections are emitted in a fixed order: errors, tool version, summary
//! counts, tag changes, detailed changes, output changes and the footer.
//! Every mapping is walked in sorted key order so the same plan always
//! renders to the same bytes.

use super::format::{SENSITIVE_MARKER, change_lines, format_value};
use super::tags::{TagAggregate, TagChange, TagTransition};
use super::types::{Bucket, ChangeRecord, Diagnostic, OutputChange, PlanDocument, PlanSummary, Value};

/// At most this many attributes are listed for a deleted resource
const MAX_DELETED_ATTRIBUTES: usize = 10;

const FOOTER: &str = "*Generated from Terraform plan JSON output*";

/// Buckets detailed resource by resource, in report order
const DETAILED_BUCKETS: [Bucket; 4] = [Bucket::Create, Bucket::Update, Bucket::Replace, Bucket::Delete];

/// Trait for plan renderers
pub trait DiffRenderer {
    /// Render the plan document to a string
    fn render(&self, plan: &PlanDocument) -> String;
}

/// Markdown renderer for change reports
#[derive(Debug, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    fn render_errors(&self, errors: &[Diagnostic], lines: &mut Vec<String>) {
        if errors.is_empty() {
            return;
        }

        lines.push("## 🚨 Terraform Errors".to_string());
        lines.push(String::new());

        for error in errors {
            match &error.address {
                Some(address) => lines.push(format!("### ❌ Error in `{}`", address)),
                None => lines.push("### ❌ General Error".to_string()),
            }
            lines.push(String::new());
            lines.push(format!("**Summary**: {}", error.summary));
            lines.push(String::new());

            if let Some(snippet) = &error.snippet {
                let start_line = snippet
                    .start_line
                    .map(|line| line.to_string())
                    .unwrap_or_else(|| "unknown".to_string());

                lines.push("```terraform".to_string());
                lines.push(format!(
                    "# File: {}:{}",
                    snippet.filename.as_deref().unwrap_or("unknown"),
                    start_line
                ));
                lines.push(snippet.code.clone());
                lines.push("```".to_string());
            }

            lines.push("---".to_string());
        }

        lines.push(String::new());
    }

    fn render_summary(&self, summary: &PlanSummary, lines: &mut Vec<String>) {
        lines.push("## Summary".to_string());
        lines.push(String::new());
        lines.push(format!("- ➕ **Create**: {} resource(s)", summary.create));
        lines.push(format!("- 🔄 **Update**: {} resource(s)", summary.update));
        if summary.update_tags_only > 0 {
            lines.push(format!(
                "- 🏷️ **Update (tags only)**: {} resource(s)",
                summary.update_tags_only
            ));
        }
        lines.push(format!("- 🔁 **Replace**: {} resource(s)", summary.replace));
        lines.push(format!("- 🗑️ **Delete**: {} resource(s)", summary.delete));
        if summary.read > 0 {
            lines.push(format!("- 📖 **Read**: {} resource(s)", summary.read));
        }
        lines.push(String::new());
    }

    fn render_tag_changes(&self, aggregate: &TagAggregate, lines: &mut Vec<String>) {
        if aggregate.tags.is_empty() {
            return;
        }

        let total = aggregate.total;

        lines.push("### Tag Changes Summary".to_string());
        lines.push(String::new());
        lines.push(format!("Tags being updated across {} resource(s):", total));
        lines.push(String::new());

        let common: Vec<_> = aggregate.common().collect();
        if !common.is_empty() {
            lines.push("#### Common to all resources:".to_string());
            lines.push(String::new());
            for (tag_key, change) in common {
                if let TagChange::Common(transition) = change {
                    lines.push(format!("- **{}**: {}", tag_key, transition_text(transition)));
                }
            }
            lines.push(String::new());
        }

        let varied: Vec<_> = aggregate.varied().collect();
        if !varied.is_empty() {
            lines.push("#### Varies by resource:".to_string());
            lines.push(String::new());
            for (tag_key, change) in varied {
                match change {
                    TagChange::Varied(transitions) => {
                        lines.push(format!("- **{}**: Multiple values", tag_key));
                        for transition in transitions {
                            lines.push(format!(
                                "  - {} ({} resource(s))",
                                transition_text(transition),
                                transition.count
                            ));
                        }
                    }
                    TagChange::Partial(transition) => {
                        lines.push(format!(
                            "- **{}**: {} ({}/{} resource(s))",
                            tag_key,
                            transition_text(transition),
                            transition.count,
                            total
                        ));
                    }
                    TagChange::Common(_) => {}
                }
            }
            lines.push(String::new());
        }
    }

    fn render_details(&self, changes: &[ChangeRecord], lines: &mut Vec<String>) {
        lines.push("## Detailed Changes".to_string());
        lines.push(String::new());

        for bucket in DETAILED_BUCKETS {
            let mut resources: Vec<&ChangeRecord> =
                changes.iter().filter(|change| change.bucket() == bucket).collect();

            if resources.is_empty() {
                continue;
            }

            resources.sort_by(|a, b| a.address.cmp(&b.address));

            lines.push(format!("### {}", section_title(bucket)));
            lines.push(String::new());

            for resource in resources {
                lines.push(format!("#### `{}`", resource.address));
                lines.push(String::new());
                lines.push(format!("**Type**: `{}`", resource.resource_type));
                lines.push(String::new());

                match bucket {
                    Bucket::Create => self.render_configuration(resource, lines),
                    Bucket::Update => self.render_update(resource, lines),
                    Bucket::Replace => self.render_replace(resource, lines),
                    Bucket::Delete => self.render_delete(resource, lines),
                    _ => {}
                }

                lines.push("---".to_string());
                lines.push(String::new());
            }
        }
    }

    /// Post-change configuration, sensitive attributes redacted
    fn render_configuration(&self, resource: &ChangeRecord, lines: &mut Vec<String>) {
        let config_lines: Vec<String> = resource
            .after
            .iter()
            .filter_map(|(key, value)| {
                if resource.after_sensitive.get(key).copied().unwrap_or(false) {
                    return Some(format!("  - **{}**: {}", key, SENSITIVE_MARKER));
                }
                let formatted = format_value(value, 0);
                let formatted = formatted.trim();
                (!formatted.is_empty()).then(|| format!("  - **{}**: {}", key, formatted))
            })
            .collect();

        push_block(lines, "**Configuration**:", config_lines);
    }

    fn render_update(&self, resource: &ChangeRecord, lines: &mut Vec<String>) {
        push_block(lines, "**Changes**:", change_lines(resource));
    }

    fn render_replace(&self, resource: &ChangeRecord, lines: &mut Vec<String>) {
        let forcing: Vec<String> = resource
            .forces_replacement()
            .into_iter()
            .map(|attr| format!("  - `{}`", attr))
            .collect();

        push_block(lines, "**Attributes forcing replacement**:", forcing);
        self.render_configuration(resource, lines);
    }

    fn render_delete(&self, resource: &ChangeRecord, lines: &mut Vec<String>) {
        if let Some(reason) = &resource.action_reason {
            lines.push(format!("**Reason**: {}", title_case(reason)));
            lines.push(String::new());
        }

        let delete_lines: Vec<String> = resource
            .before
            .iter()
            .take(MAX_DELETED_ATTRIBUTES)
            .filter_map(|(key, value)| {
                let formatted = format_value(value, 0);
                let formatted = formatted.trim();
                (!formatted.is_empty()).then(|| format!("  - **{}**: {}", key, formatted))
            })
            .collect();

        push_block(lines, "**Resource being deleted**:", delete_lines);
    }

    fn render_outputs(&self, plan: &PlanDocument, lines: &mut Vec<String>) {
        let changed: Vec<(&String, &OutputChange)> = plan
            .output_changes
            .iter()
            .filter(|(_, output)| output.bucket() != Bucket::NoOp)
            .collect();

        if changed.is_empty() {
            return;
        }

        lines.push("## Output Changes".to_string());
        lines.push(String::new());

        for (name, output) in changed {
            lines.push(format!("### {} `{}`", output.bucket().label(), name));
            lines.push(String::new());

            if output.sensitive {
                lines.push("Value: `(sensitive)`".to_string());
            } else {
                match (&output.before, &output.after) {
                    (None, Some(after)) => {
                        lines.push(format!("Value: {}", format_value(after, 0).trim()));
                    }
                    (before, after) if before != after => {
                        lines.push(format!("Before: {}", optional_value(before)));
                        lines.push(format!("After: {}", optional_value(after)));
                    }
                    _ => {}
                }
            }

            lines.push(String::new());
        }
    }
}

impl DiffRenderer for MarkdownRenderer {
    fn render(&self, plan: &PlanDocument) -> String {
        let mut lines = vec!["# Terraform Summary".to_string(), String::new()];

        self.render_errors(&plan.errors, &mut lines);

        if let Some(version) = &plan.tool_version {
            lines.push(format!("**Terraform Version**: `{}`", version));
            lines.push(String::new());
        }

        if plan.changes.is_empty() {
            lines.push("No resource changes detected.".to_string());
            lines.push(String::new());
        } else {
            let summary = plan.summary();
            self.render_summary(&summary, &mut lines);

            if let Some(aggregate) = TagAggregate::from_changes(&plan.changes) {
                self.render_tag_changes(&aggregate, &mut lines);
            }

            self.render_details(&plan.changes, &mut lines);
        }

        self.render_outputs(plan, &mut lines);

        lines.push(FOOTER.to_string());
        lines.join("\n")
    }
}

fn section_title(bucket: Bucket) -> &'static str {
    match bucket {
        Bucket::Create => "➕ Resources to Create",
        Bucket::Update => "🔄 Resources to Update",
        Bucket::Replace => "🔁 Resources to Replace",
        Bucket::Delete => "🗑️ Resources to Delete",
        Bucket::UpdateTagsOnly => "🏷️ Resources with Tag Updates",
        Bucket::Read => "📖 Resources to Read",
        Bucket::NoOp => "⚪ Unchanged Resources",
    }
}

/// Append a bold heading and its lines, or nothing when there are no lines
fn push_block(lines: &mut Vec<String>, heading: &str, block: Vec<String>) {
    if block.is_empty() {
        return;
    }
    lines.push(heading.to_string());
    lines.push(String::new());
    lines.extend(block);
    lines.push(String::new());
}

fn transition_text(transition: &TagTransition) -> String {
    match (&transition.before, &transition.after) {
        (None, Some(after)) => format!("(new) → `{}`", after),
        (Some(before), None) => format!("`{}` → (removed)", before),
        (before, after) => format!("`{}` → `{}`", plain(before), plain(after)),
    }
}

fn plain(value: &Option<Value>) -> String {
    value.as_ref().map(Value::to_string).unwrap_or_default()
}

fn optional_value(value: &Option<Value>) -> String {
    value
        .as_ref()
        .map(|value| format_value(value, 0).trim().to_string())
        .unwrap_or_default()
}

/// "replace_because_tainted" -> "Replace Because Tainted"
fn title_case(reason: &str) -> String {
    let mut titled = String::with_capacity(reason.len());
    let mut at_word_start = true;

    for ch in reason.replace('_', " ").chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                titled.extend(ch.to_uppercase());
            } else {
                titled.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            titled.push(ch);
            at_word_start = true;
        }
    }

    titled
}
