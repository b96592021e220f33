//! Change-history records derived from object snapshots.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Anything that can be flattened into a field snapshot.
pub trait Snapshot {
    fn snapshot(&self) -> Map<String, Value>;
}

impl Snapshot for Map<String, Value> {
    fn snapshot(&self) -> Map<String, Value> {
        self.clone()
    }
}

impl Snapshot for Value {
    fn snapshot(&self) -> Map<String, Value> {
        self.as_object().cloned().unwrap_or_default()
    }
}

/// What happened to the object, as reported by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Create,
    Update,
    Delete,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::Create => "create",
            HistoryAction::Update => "update",
            HistoryAction::Delete => "delete",
        }
    }
}

/// One history entry.
///
/// Creates and deletes produce exactly one record with no field; updates
/// produce one record per changed field, ordered by field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub object_id: Value,
    pub timestamp: DateTime<Utc>,
    pub action: HistoryAction,
    pub field: Option<String>,
    pub value_from: Option<String>,
    pub value_to: Option<String>,
}

/// Snapshot pairs the generator rejects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// Neither a source nor a target snapshot was given.
    #[error("at least one of the source and target snapshots is required")]
    BothMissing,

    /// Neither snapshot carries the primary key field.
    #[error("neither snapshot has the primary key field `{0}`")]
    MissingPrimaryKey(String),

    /// Source and target snapshots identify different objects.
    #[error("source and target snapshots have different primary keys")]
    PrimaryKeyMismatch,
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Derive history records from a source and a target snapshot of one object.
///
/// A missing primary key on the target side marks a delete, on the source
/// side a create; either emits exactly one record with no field. With the
/// key present on both sides only the fields whose values differ are
/// recorded, the key field itself excluded, sorted by field name.
pub fn generate_history_records(
    source: Option<&dyn Snapshot>,
    target: Option<&dyn Snapshot>,
    action: HistoryAction,
    timestamp: DateTime<Utc>,
    pk_field: &str,
) -> Result<Vec<HistoryRecord>, HistoryError> {
    if source.is_none() && target.is_none() {
        return Err(HistoryError::BothMissing);
    }
    let source = source.map(Snapshot::snapshot).unwrap_or_default();
    let target = target.map(Snapshot::snapshot).unwrap_or_default();

    let source_pk = source.get(pk_field);
    let target_pk = target.get(pk_field);

    let single = |object_id: Value| {
        vec![HistoryRecord {
            object_id,
            timestamp,
            action,
            field: None,
            value_from: None,
            value_to: None,
        }]
    };

    let object_id = match (source_pk, target_pk) {
        (None, None) => return Err(HistoryError::MissingPrimaryKey(pk_field.to_string())),
        // No target identity: the object is gone.
        (Some(pk), None) => return Ok(single(pk.clone())),
        // No source identity: the object is new.
        (None, Some(pk)) => return Ok(single(pk.clone())),
        (Some(from), Some(to)) => {
            if from != to {
                return Err(HistoryError::PrimaryKeyMismatch);
            }
            from.clone()
        }
    };

    let fields: BTreeSet<&String> = source
        .keys()
        .chain(target.keys())
        .filter(|name| name.as_str() != pk_field)
        .collect();

    let mut records = Vec::new();
    for field in fields {
        let value_from = source.get(field);
        let value_to = target.get(field);
        if value_from == value_to {
            continue;
        }
        records.push(HistoryRecord {
            object_id: object_id.clone(),
            timestamp,
            action,
            field: Some(field.clone()),
            value_from: value_from.map(render),
            value_to: value_to.map(render),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn snap(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_emits_single_record() {
        let source = snap(json!({"title": "broken build"}));
        let target = snap(json!({"id": 7, "title": "broken build", "state": "open"}));
        let records = generate_history_records(
            Some(&source),
            Some(&target),
            HistoryAction::Create,
            now(),
            "id",
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, HistoryAction::Create);
        assert_eq!(records[0].object_id, json!(7));
        assert_eq!(records[0].field, None);
        assert_eq!(records[0].value_from, None);
        assert_eq!(records[0].value_to, None);
    }

    #[test]
    fn test_create_from_absent_source() {
        let target = snap(json!({"id": 7, "title": "broken build"}));
        let records =
            generate_history_records(None, Some(&target), HistoryAction::Create, now(), "id")
                .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].object_id, json!(7));
    }

    #[test]
    fn test_delete_emits_single_record() {
        let source = snap(json!({"id": 7, "title": "broken build"}));
        let records =
            generate_history_records(Some(&source), None, HistoryAction::Delete, now(), "id")
                .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, HistoryAction::Delete);
        assert_eq!(records[0].object_id, json!(7));
        assert_eq!(records[0].field, None);
    }

    #[test]
    fn test_update_diffs_changed_fields_sorted() {
        let source = snap(json!({"id": 7, "title": "broken build", "state": "open", "votes": 3}));
        let target = snap(json!({"id": 7, "title": "broken build", "state": "closed", "votes": 4}));
        let records = generate_history_records(
            Some(&source),
            Some(&target),
            HistoryAction::Update,
            now(),
            "id",
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field.as_deref(), Some("state"));
        assert_eq!(records[0].value_from.as_deref(), Some("open"));
        assert_eq!(records[0].value_to.as_deref(), Some("closed"));
        assert_eq!(records[1].field.as_deref(), Some("votes"));
        assert_eq!(records[1].value_from.as_deref(), Some("3"));
        assert_eq!(records[1].value_to.as_deref(), Some("4"));
    }

    #[test]
    fn test_update_without_changes_is_empty() {
        let source = snap(json!({"id": 7, "title": "broken build"}));
        let records = generate_history_records(
            Some(&source),
            Some(&source.clone()),
            HistoryAction::Update,
            now(),
            "id",
        )
        .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_added_and_removed_fields() {
        let source = snap(json!({"id": 7, "assignee": "sam"}));
        let target = snap(json!({"id": 7, "milestone": "v2"}));
        let records = generate_history_records(
            Some(&source),
            Some(&target),
            HistoryAction::Update,
            now(),
            "id",
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field.as_deref(), Some("assignee"));
        assert_eq!(records[0].value_from.as_deref(), Some("sam"));
        assert_eq!(records[0].value_to, None);
        assert_eq!(records[1].field.as_deref(), Some("milestone"));
        assert_eq!(records[1].value_from, None);
        assert_eq!(records[1].value_to.as_deref(), Some("v2"));
    }

    #[test]
    fn test_primary_key_is_skipped_by_name() {
        // A field whose value equals the primary key value still gets
        // diffed; only the key field itself is exempt.
        let source = snap(json!({"id": 7, "parent": 7}));
        let target = snap(json!({"id": 7, "parent": 8}));
        let records = generate_history_records(
            Some(&source),
            Some(&target),
            HistoryAction::Update,
            now(),
            "id",
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field.as_deref(), Some("parent"));
    }

    #[test]
    fn test_non_string_values_are_rendered_as_json() {
        let source = snap(json!({"id": 7, "tags": ["a"], "flag": true}));
        let target = snap(json!({"id": 7, "tags": ["a", "b"], "flag": false}));
        let records = generate_history_records(
            Some(&source),
            Some(&target),
            HistoryAction::Update,
            now(),
            "id",
        )
        .unwrap();

        assert_eq!(records[0].field.as_deref(), Some("flag"));
        assert_eq!(records[0].value_from.as_deref(), Some("true"));
        assert_eq!(records[1].field.as_deref(), Some("tags"));
        assert_eq!(records[1].value_to.as_deref(), Some("[\"a\",\"b\"]"));
    }

    #[test]
    fn test_both_missing_is_rejected() {
        let err =
            generate_history_records(None, None, HistoryAction::Update, now(), "id").unwrap_err();
        assert_eq!(err, HistoryError::BothMissing);
    }

    #[test]
    fn test_missing_primary_key_on_both_sides_is_rejected() {
        let source = snap(json!({"title": "a"}));
        let target = snap(json!({"title": "b"}));
        let err = generate_history_records(
            Some(&source),
            Some(&target),
            HistoryAction::Update,
            now(),
            "id",
        )
        .unwrap_err();
        assert_eq!(err, HistoryError::MissingPrimaryKey("id".to_string()));
    }

    #[test]
    fn test_primary_key_mismatch_is_rejected() {
        let source = snap(json!({"id": 7}));
        let target = snap(json!({"id": 8}));
        let err = generate_history_records(
            Some(&source),
            Some(&target),
            HistoryAction::Update,
            now(),
            "id",
        )
        .unwrap_err();
        assert_eq!(err, HistoryError::PrimaryKeyMismatch);
    }

    #[test]
    fn test_value_snapshot_source() {
        let source = json!({"id": 7, "state": "open"});
        let target = json!({"id": 7, "state": "closed"});
        let records = generate_history_records(
            Some(&source),
            Some(&target),
            HistoryAction::Update,
            now(),
            "id",
        )
        .unwrap();
        assert_eq!(records.len(), 1);
    }
}
