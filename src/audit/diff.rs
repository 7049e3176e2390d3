/// Audit Diff Engine
///
/// Computes field-level differences between two before/after snapshots for
/// rendering an action's change history. Purely structural; nothing here
/// touches storage.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Classification of a single field change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::Modified => "modified",
        }
    }
}

/// One changed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub field: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub change_type: ChangeType,
}

/// Field-level difference between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDiff {
    pub entries: Vec<DiffEntry>,
    pub has_changes: bool,
}

fn as_object(snapshot: Option<&Value>) -> Option<&Map<String, Value>> {
    match snapshot {
        Some(Value::Object(map)) => Some(map),
        // Absent or non-object snapshots are treated as empty
        _ => None,
    }
}

/// Compute the field-level diff between two snapshots.
///
/// Keys whose values compare deep-equal are skipped; `serde_json::Value`
/// equality recurses through nested objects and arrays and compares
/// primitives by value. Entries come back sorted by field name so the
/// rendered history is stable.
pub fn compute_diff(before: Option<&Value>, after: Option<&Value>) -> AuditDiff {
    let empty = Map::new();
    let before = as_object(before).unwrap_or(&empty);
    let after = as_object(after).unwrap_or(&empty);

    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    let mut entries = Vec::new();
    for key in keys {
        match (before.get(key), after.get(key)) {
            (None, Some(new)) => entries.push(DiffEntry {
                field: key.clone(),
                before: None,
                after: Some(new.clone()),
                change_type: ChangeType::Added,
            }),
            (Some(old), None) => entries.push(DiffEntry {
                field: key.clone(),
                before: Some(old.clone()),
                after: None,
                change_type: ChangeType::Removed,
            }),
            (Some(old), Some(new)) if old != new => entries.push(DiffEntry {
                field: key.clone(),
                before: Some(old.clone()),
                after: Some(new.clone()),
                change_type: ChangeType::Modified,
            }),
            _ => {}
        }
    }

    AuditDiff {
        has_changes: !entries.is_empty(),
        entries,
    }
}
