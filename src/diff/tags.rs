//! Cross-resource aggregation of tag changes
//!
//! Resources whose only change is to their tags are not detailed one by one.
//! Instead every changed tag key is summarized once, either as common to all
//! tag-only resources or as varying between them.

use std::collections::BTreeMap;

use super::classify::TAG_ATTRIBUTES;
use super::types::{ChangeRecord, Value};

/// One distinct before/after transition of a tag and how many resources share it
#[derive(Debug, Clone, PartialEq)]
pub struct TagTransition {
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub count: usize,
}

/// Aggregated change for a single tag key
#[derive(Debug, Clone, PartialEq)]
pub enum TagChange {
    /// Every tag-only resource undergoes this transition
    Common(TagTransition),
    /// A single transition shared by only some resources
    Partial(TagTransition),
    /// Several distinct transitions, most frequent first
    Varied(Vec<TagTransition>),
}

impl TagChange {
    pub fn is_common(&self) -> bool {
        matches!(self, TagChange::Common(_))
    }
}

/// Tag changes across all tag-only resources
#[derive(Debug, Clone, PartialEq)]
pub struct TagAggregate {
    /// Number of tag-only resources
    pub total: usize,
    /// Changes keyed (and therefore sorted) by tag key
    pub tags: BTreeMap<String, TagChange>,
}

impl TagAggregate {
    /// Aggregate tag changes over tag-only records; `None` when there are none
    pub fn from_changes<'a>(changes: impl IntoIterator<Item = &'a ChangeRecord>) -> Option<Self> {
        let records: Vec<&ChangeRecord> =
            changes.into_iter().filter(|change| change.tags_only).collect();

        if records.is_empty() {
            return None;
        }

        let total = records.len();
        let mut transitions: BTreeMap<String, Vec<TagTransition>> = BTreeMap::new();

        for record in records {
            for (tag_key, before, after) in record_tag_changes(record) {
                let entry = transitions.entry(tag_key).or_default();
                match entry
                    .iter()
                    .position(|known| known.before == before && known.after == after)
                {
                    Some(idx) => entry[idx].count += 1,
                    None => entry.push(TagTransition {
                        before,
                        after,
                        count: 1,
                    }),
                }
            }
        }

        let tags = transitions
            .into_iter()
            .map(|(tag_key, mut found)| {
                let change = if found.len() == 1 {
                    let transition = found.remove(0);
                    if transition.count == total {
                        TagChange::Common(transition)
                    } else {
                        TagChange::Partial(transition)
                    }
                } else {
                    found.sort_by(|a, b| {
                        b.count.cmp(&a.count).then_with(|| {
                            transition_sort_key(a).cmp(&transition_sort_key(b))
                        })
                    });
                    TagChange::Varied(found)
                };
                (tag_key, change)
            })
            .collect();

        Some(Self { total, tags })
    }

    pub fn common(&self) -> impl Iterator<Item = (&String, &TagChange)> {
        self.tags.iter().filter(|(_, change)| change.is_common())
    }

    pub fn varied(&self) -> impl Iterator<Item = (&String, &TagChange)> {
        self.tags.iter().filter(|(_, change)| !change.is_common())
    }
}

/// Changed tags of one record as `(key, before, after)`.
///
/// `tags` is read whenever either side holds a non-empty mapping; `tags_all`
/// is read only when `tags` is missing, null or empty on both sides.
fn record_tag_changes(record: &ChangeRecord) -> Vec<(String, Option<Value>, Option<Value>)> {
    let has_entries = |attribute: &str| {
        [record.before.get(attribute), record.after.get(attribute)]
            .into_iter()
            .flatten()
            .filter_map(Value::as_mapping)
            .any(|entries| !entries.is_empty())
    };

    let attribute = TAG_ATTRIBUTES
        .iter()
        .copied()
        .find(|attribute| has_entries(*attribute))
        .unwrap_or(TAG_ATTRIBUTES[1]);

    tag_map_changes(record.before.get(attribute), record.after.get(attribute))
}

fn tag_map_changes(
    before: Option<&Value>,
    after: Option<&Value>,
) -> Vec<(String, Option<Value>, Option<Value>)> {
    let empty = BTreeMap::new();
    let before = before.and_then(Value::as_mapping).unwrap_or(&empty);
    let after = after.and_then(Value::as_mapping).unwrap_or(&empty);

    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter_map(|key| {
            let old = before.get(key).cloned().and_then(Value::into_option);
            let new = after.get(key).cloned().and_then(Value::into_option);
            (old != new).then(|| (key.clone(), old, new))
        })
        .collect()
}

fn transition_sort_key(transition: &TagTransition) -> (String, String) {
    let display = |value: &Option<Value>| value.as_ref().map(Value::to_string).unwrap_or_default();
    (display(&transition.before), display(&transition.after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::types::ActionKind;
    use serde_json::json;

    fn tag_record(address: &str, before: serde_json::Value, after: serde_json::Value) -> ChangeRecord {
        let mut record = ChangeRecord::new(address, vec![ActionKind::Update]);
        record.before.insert("tags".to_string(), Value::from(before.clone()));
        record.after.insert("tags".to_string(), Value::from(after.clone()));
        record.before.insert("tags_all".to_string(), Value::from(before));
        record.after.insert("tags_all".to_string(), Value::from(after));
        record.tags_only = true;
        record
    }

    fn text(value: &str) -> Option<Value> {
        Some(Value::Text(value.to_string()))
    }

    #[test]
    fn test_no_tags_only_records() {
        let record = ChangeRecord::new("aws_instance.web", vec![ActionKind::Update]);
        assert!(TagAggregate::from_changes([&record]).is_none());
        assert!(TagAggregate::from_changes(std::iter::empty()).is_none());
    }

    #[test]
    fn test_common_change() {
        let records: Vec<ChangeRecord> = (0..4)
            .map(|idx| {
                tag_record(
                    &format!("aws_s3_bucket.b{}", idx),
                    json!({"Env": "a"}),
                    json!({"Env": "b"}),
                )
            })
            .collect();

        let aggregate = TagAggregate::from_changes(&records).unwrap();
        assert_eq!(aggregate.total, 4);
        assert_eq!(
            aggregate.tags["Env"],
            TagChange::Common(TagTransition {
                before: text("a"),
                after: text("b"),
                count: 4,
            })
        );
    }

    #[test]
    fn test_one_resource_differs() {
        let mut records: Vec<ChangeRecord> = (0..4)
            .map(|idx| {
                tag_record(
                    &format!("aws_s3_bucket.b{}", idx),
                    json!({"Env": "a"}),
                    json!({"Env": "b"}),
                )
            })
            .collect();
        records.push(tag_record("aws_s3_bucket.odd", json!({"Env": "a"}), json!({"Env": "c"})));

        let aggregate = TagAggregate::from_changes(&records).unwrap();
        assert_eq!(aggregate.total, 5);

        let TagChange::Varied(transitions) = &aggregate.tags["Env"] else {
            panic!("expected varied tag change");
        };
        assert_eq!(transitions.len(), 2);
        assert_eq!((transitions[0].after.clone(), transitions[0].count), (text("b"), 4));
        assert_eq!((transitions[1].after.clone(), transitions[1].count), (text("c"), 1));
    }

    #[test]
    fn test_partial_change() {
        let records = vec![
            tag_record("aws_vpc.a", json!({"Owner": "x"}), json!({"Owner": "y", "Team": "core"})),
            tag_record("aws_vpc.b", json!({"Owner": "x"}), json!({"Owner": "y"})),
        ];

        let aggregate = TagAggregate::from_changes(&records).unwrap();
        assert!(aggregate.tags["Owner"].is_common());
        assert_eq!(
            aggregate.tags["Team"],
            TagChange::Partial(TagTransition {
                before: None,
                after: text("core"),
                count: 1,
            })
        );
        assert_eq!(aggregate.common().count(), 1);
        assert_eq!(aggregate.varied().count(), 1);
    }

    #[test]
    fn test_mirrored_namespaces_counted_once() {
        let records = vec![tag_record("aws_instance.web", json!({"Name": "a"}), json!({"Name": "b"}))];

        let aggregate = TagAggregate::from_changes(&records).unwrap();
        let TagChange::Common(transition) = &aggregate.tags["Name"] else {
            panic!("expected common tag change");
        };
        assert_eq!(transition.count, 1);
    }

    #[test]
    fn test_tags_namespace_wins_when_populated() {
        let mut record = ChangeRecord::new("aws_instance.web", vec![ActionKind::Update]);
        record.before.insert("tags".to_string(), Value::from(json!({"Name": "web"})));
        record.after.insert("tags".to_string(), Value::from(json!({"Name": "web"})));
        record.before.insert("tags_all".to_string(), Value::from(json!({"Name": "web"})));
        record.after.insert(
            "tags_all".to_string(),
            Value::from(json!({"Name": "web", "CostCenter": "42"})),
        );
        record.tags_only = true;

        let aggregate = TagAggregate::from_changes([&record]).unwrap();
        assert_eq!(aggregate.total, 1);
        assert!(aggregate.tags.is_empty());
    }

    #[test]
    fn test_tags_added_to_empty_mapping_counted_once() {
        let records = vec![tag_record("aws_instance.web", json!({}), json!({"Owner": "ops"}))];

        let aggregate = TagAggregate::from_changes(&records).unwrap();
        assert_eq!(
            aggregate.tags["Owner"],
            TagChange::Common(TagTransition {
                before: None,
                after: text("ops"),
                count: 1,
            })
        );
    }

    #[test]
    fn test_falls_back_to_tags_all_without_tags() {
        let mut absent = ChangeRecord::new("aws_instance.web", vec![ActionKind::Update]);
        absent.before.insert("tags_all".to_string(), Value::from(json!({"Env": "dev"})));
        absent.after.insert("tags_all".to_string(), Value::from(json!({"Env": "prod"})));
        absent.tags_only = true;

        let mut empty = absent.clone();
        empty.address = "aws_instance.db".to_string();
        empty.before.insert("tags".to_string(), Value::Null);
        empty.after.insert("tags".to_string(), Value::from(json!({})));

        let aggregate = TagAggregate::from_changes([&absent, &empty]).unwrap();
        assert_eq!(
            aggregate.tags["Env"],
            TagChange::Common(TagTransition {
                before: text("dev"),
                after: text("prod"),
                count: 2,
            })
        );
    }

    #[test]
    fn test_removed_tag() {
        let records = vec![tag_record("aws_instance.web", json!({"Temp": "1"}), json!({}))];

        let aggregate = TagAggregate::from_changes(&records).unwrap();
        assert_eq!(
            aggregate.tags["Temp"],
            TagChange::Common(TagTransition {
                before: text("1"),
                after: None,
                count: 1,
            })
        );
    }
}
