//! Bucket classification for planned resource actions

use std::collections::BTreeMap;

use super::types::{ActionKind, Bucket, Value};

/// Attributes that hold resource tags
pub const TAG_ATTRIBUTES: [&str; 2] = ["tags", "tags_all"];

/// Assign a resource to exactly one bucket; the first matching rule wins
pub fn classify(actions: &[ActionKind], tags_only: bool) -> Bucket {
    let has = |action: ActionKind| actions.contains(&action);

    if has(ActionKind::Create) && has(ActionKind::Delete) {
        Bucket::Replace
    } else if has(ActionKind::Create) {
        Bucket::Create
    } else if has(ActionKind::Delete) {
        Bucket::Delete
    } else if has(ActionKind::Update) && tags_only {
        Bucket::UpdateTagsOnly
    } else if has(ActionKind::Update) {
        Bucket::Update
    } else if has(ActionKind::Read) {
        Bucket::Read
    } else {
        Bucket::NoOp
    }
}

/// Keys whose value differs between before and after, skipping unknown-at-apply keys.
/// A null value and a missing key compare equal.
pub fn changed_attributes(
    before: &BTreeMap<String, Value>,
    after: &BTreeMap<String, Value>,
    after_unknown: &BTreeMap<String, bool>,
) -> Vec<String> {
    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter(|key| !after_unknown.get(*key).copied().unwrap_or(false))
        .filter(|key| present(before.get(*key)) != present(after.get(*key)))
        .cloned()
        .collect()
}

/// Whether an update touches nothing but tag attributes
pub fn is_tags_only(
    actions: &[ActionKind],
    before: &BTreeMap<String, Value>,
    after: &BTreeMap<String, Value>,
    after_unknown: &BTreeMap<String, bool>,
) -> bool {
    if actions != [ActionKind::Update] {
        return false;
    }

    let changed = changed_attributes(before, after, after_unknown);
    !changed.is_empty()
        && changed
            .iter()
            .all(|key| TAG_ATTRIBUTES.contains(&key.as_str()))
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !matches!(value, Value::Null))
}
