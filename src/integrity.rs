/// Orphan Integrity Checker
///
/// Cross-references child rows against their parent tables, classifies
/// rows whose parent is missing as orphans, and drives the
/// backup-then-delete cleanup workflow. Detection uses one batched
/// LEFT JOIN per category rather than a lookup per row.
///
/// Orphan classifications go stale the moment the referenced table
/// changes, so cleanup re-verifies every id immediately before deleting.
use crate::audit::{AuditAction, AuditStore, NewAuditEntry};
use crate::error::{ModError, ModResult};
use crate::id::IdGenerator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{Column, Row, SqlitePool};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Orphan categories the checker knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanType {
    HackathonWithoutOrganizer,
    RegistrationWithoutUser,
    RegistrationWithoutHackathon,
    TeamWithoutHackathon,
    SubmissionWithoutHackathon,
}

impl OrphanType {
    pub const ALL: [OrphanType; 5] = [
        OrphanType::HackathonWithoutOrganizer,
        OrphanType::RegistrationWithoutUser,
        OrphanType::RegistrationWithoutHackathon,
        OrphanType::TeamWithoutHackathon,
        OrphanType::SubmissionWithoutHackathon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrphanType::HackathonWithoutOrganizer => "hackathon_without_organizer",
            OrphanType::RegistrationWithoutUser => "registration_without_user",
            OrphanType::RegistrationWithoutHackathon => "registration_without_hackathon",
            OrphanType::TeamWithoutHackathon => "team_without_hackathon",
            OrphanType::SubmissionWithoutHackathon => "submission_without_hackathon",
        }
    }

    pub fn from_str(s: &str) -> ModResult<Self> {
        match s.to_lowercase().as_str() {
            "hackathon_without_organizer" => Ok(OrphanType::HackathonWithoutOrganizer),
            "registration_without_user" => Ok(OrphanType::RegistrationWithoutUser),
            "registration_without_hackathon" => Ok(OrphanType::RegistrationWithoutHackathon),
            "team_without_hackathon" => Ok(OrphanType::TeamWithoutHackathon),
            "submission_without_hackathon" => Ok(OrphanType::SubmissionWithoutHackathon),
            _ => Err(ModError::Validation(format!("Invalid orphan type: {}", s))),
        }
    }

    /// Table holding the child rows
    pub fn child_table(&self) -> &'static str {
        match self {
            OrphanType::HackathonWithoutOrganizer => "hackathons",
            OrphanType::RegistrationWithoutUser => "registrations",
            OrphanType::RegistrationWithoutHackathon => "registrations",
            OrphanType::TeamWithoutHackathon => "teams",
            OrphanType::SubmissionWithoutHackathon => "submissions",
        }
    }

    /// Table the child's reference should resolve in
    pub fn parent_table(&self) -> &'static str {
        match self {
            OrphanType::HackathonWithoutOrganizer => "organizers",
            OrphanType::RegistrationWithoutUser => "users",
            OrphanType::RegistrationWithoutHackathon => "hackathons",
            OrphanType::TeamWithoutHackathon => "hackathons",
            OrphanType::SubmissionWithoutHackathon => "hackathons",
        }
    }

    /// Foreign-key column on the child table
    pub fn reference_column(&self) -> &'static str {
        match self {
            OrphanType::HackathonWithoutOrganizer => "organizer_id",
            OrphanType::RegistrationWithoutUser => "user_id",
            OrphanType::RegistrationWithoutHackathon => "hackathon_id",
            OrphanType::TeamWithoutHackathon => "hackathon_id",
            OrphanType::SubmissionWithoutHackathon => "hackathon_id",
        }
    }
}

/// The reference that failed to resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingReference {
    pub table: String,
    pub column: String,
    pub expected_id: Option<String>,
}

/// A child row whose parent could not be found at scan time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanRecord {
    pub id: String,
    pub orphan_type: OrphanType,
    pub table_name: String,
    pub missing_reference: MissingReference,
    pub detected_at: DateTime<Utc>,
}

/// Result of an orphan scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrphanDetectionResult {
    pub orphans: Vec<OrphanRecord>,
    pub scanned_at: DateTime<Utc>,
    pub total: usize,
}

/// Operator-initiated cleanup request
#[derive(Debug, Clone)]
pub struct CleanupRequest {
    pub orphan_type: OrphanType,
    pub ids: Vec<String>,
    pub reason: String,
    pub create_backup: bool,
    pub admin_id: String,
    pub admin_email: String,
}

/// Per-item cleanup failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupError {
    pub id: String,
    pub message: String,
}

/// Outcome of a cleanup batch. `deleted + failed == total` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResult {
    pub total: usize,
    pub deleted: usize,
    pub failed: usize,
    pub errors: Vec<CleanupError>,
    pub backup_id: Option<String>,
}

/// Integrity checker over the platform database
#[derive(Clone)]
pub struct IntegrityChecker {
    db: SqlitePool,
    audit: AuditStore,
    ids: Arc<dyn IdGenerator>,
}

impl IntegrityChecker {
    pub fn new(db: SqlitePool, audit: AuditStore, ids: Arc<dyn IdGenerator>) -> Self {
        Self { db, audit, ids }
    }

    /// Scan for orphans. `filter` limits the scan to the given categories;
    /// `None` scans all of them.
    pub async fn detect_orphans(
        &self,
        filter: Option<&[OrphanType]>,
    ) -> ModResult<OrphanDetectionResult> {
        let categories = filter.unwrap_or(&OrphanType::ALL);
        let scanned_at = Utc::now();

        let mut orphans = Vec::new();
        for orphan_type in categories {
            let found = self.scan_category(*orphan_type, scanned_at).await?;
            if !found.is_empty() {
                info!(
                    category = orphan_type.as_str(),
                    count = found.len(),
                    "Orphaned rows detected"
                );
            }
            orphans.extend(found);
        }

        Ok(OrphanDetectionResult {
            total: orphans.len(),
            orphans,
            scanned_at,
        })
    }

    /// One batched existence check per category: a LEFT JOIN against the
    /// parent table instead of a round-trip per child row. Table and
    /// column names come from the `OrphanType` enum, never from callers.
    async fn scan_category(
        &self,
        orphan_type: OrphanType,
        detected_at: DateTime<Utc>,
    ) -> ModResult<Vec<OrphanRecord>> {
        let sql = format!(
            "SELECT c.id AS child_id, c.{column} AS expected_id \
             FROM {child} c \
             LEFT JOIN {parent} p ON c.{column} = p.id \
             WHERE p.id IS NULL",
            column = orphan_type.reference_column(),
            child = orphan_type.child_table(),
            parent = orphan_type.parent_table(),
        );

        let rows = sqlx::query(&sql).fetch_all(&self.db).await?;

        let orphans = rows
            .into_iter()
            .map(|row| OrphanRecord {
                id: self.ids.next_id(),
                orphan_type,
                table_name: orphan_type.child_table().to_string(),
                missing_reference: MissingReference {
                    table: orphan_type.parent_table().to_string(),
                    column: orphan_type.reference_column().to_string(),
                    expected_id: row.get("expected_id"),
                },
                detected_at,
            })
            .collect();

        Ok(orphans)
    }

    /// Batch-delete orphaned rows, optionally snapshotting them first.
    ///
    /// The request is validated before any I/O. Every id is re-verified as
    /// still orphaned immediately before deletion; a row whose parent has
    /// reappeared in the meantime is recorded as a failure, not deleted.
    /// Deletions are best-effort: one failure never aborts the batch, and
    /// there is no rollback of already-deleted items.
    pub async fn cleanup(&self, request: &CleanupRequest) -> ModResult<CleanupResult> {
        validate_cleanup_request(request)?;

        let still_orphaned = self
            .verify_orphaned(request.orphan_type, &request.ids)
            .await?;

        let backup_id = if request.create_backup {
            let entry = self
                .write_backup(request, &still_orphaned)
                .await?;
            Some(entry)
        } else {
            None
        };

        let child_table = request.orphan_type.child_table();
        let delete_sql = format!("DELETE FROM {} WHERE id = ?", child_table);

        let mut deleted_ids = Vec::new();
        let mut errors = Vec::new();

        for id in &request.ids {
            if !still_orphaned.contains(id) {
                errors.push(CleanupError {
                    id: id.clone(),
                    message: "No longer orphaned or already removed at cleanup time".to_string(),
                });
                continue;
            }

            match sqlx::query(&delete_sql).bind(id).execute(&self.db).await {
                Ok(result) if result.rows_affected() == 0 => {
                    errors.push(CleanupError {
                        id: id.clone(),
                        message: "Row vanished before deletion".to_string(),
                    });
                }
                Ok(_) => deleted_ids.push(id.clone()),
                Err(e) => {
                    warn!(id = %id, table = child_table, "Orphan deletion failed: {}", e);
                    errors.push(CleanupError {
                        id: id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        // One summary entry per batch, regardless of outcome
        self.audit
            .append(NewAuditEntry {
                action_type: AuditAction::OrphanCleanup,
                admin_id: request.admin_id.clone(),
                admin_email: request.admin_email.clone(),
                target_type: child_table.to_string(),
                target_id: request.orphan_type.as_str().to_string(),
                reason: request.reason.clone(),
                before_state: None,
                after_state: Some(json!({
                    "deleted": &deleted_ids,
                    "failed": &errors,
                })),
            })
            .await?;

        info!(
            category = request.orphan_type.as_str(),
            deleted = deleted_ids.len(),
            failed = errors.len(),
            "Orphan cleanup batch finished"
        );

        Ok(CleanupResult {
            total: request.ids.len(),
            deleted: deleted_ids.len(),
            failed: errors.len(),
            errors,
            backup_id,
        })
    }

    /// Re-check which of the given child ids are still orphaned right now.
    async fn verify_orphaned(
        &self,
        orphan_type: OrphanType,
        ids: &[String],
    ) -> ModResult<HashSet<String>> {
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT c.id AS child_id \
             FROM {child} c \
             LEFT JOIN {parent} p ON c.{column} = p.id \
             WHERE p.id IS NULL AND c.id IN ({placeholders})",
            column = orphan_type.reference_column(),
            child = orphan_type.child_table(),
            parent = orphan_type.parent_table(),
            placeholders = placeholders,
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(|row| row.get("child_id")).collect())
    }

    /// Snapshot the rows about to be deleted into an immutable audit entry.
    /// Written before any deletion starts; its id becomes `backup_id`.
    async fn write_backup(
        &self,
        request: &CleanupRequest,
        still_orphaned: &HashSet<String>,
    ) -> ModResult<String> {
        let ids: Vec<&String> = request
            .ids
            .iter()
            .filter(|id| still_orphaned.contains(*id))
            .collect();

        let rows = if ids.is_empty() {
            Vec::new()
        } else {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let sql = format!(
                "SELECT * FROM {} WHERE id IN ({})",
                request.orphan_type.child_table(),
                placeholders
            );

            let mut query = sqlx::query(&sql);
            for id in &ids {
                query = query.bind(id.as_str());
            }

            query
                .fetch_all(&self.db)
                .await?
                .iter()
                .map(row_to_json)
                .collect()
        };

        let entry = self
            .audit
            .append(NewAuditEntry {
                action_type: AuditAction::OrphanBackup,
                admin_id: request.admin_id.clone(),
                admin_email: request.admin_email.clone(),
                target_type: request.orphan_type.child_table().to_string(),
                target_id: request.orphan_type.as_str().to_string(),
                reason: request.reason.clone(),
                before_state: Some(json!({
                    "orphan_type": request.orphan_type.as_str(),
                    "rows": rows,
                })),
                after_state: None,
            })
            .await?;

        info!(
            backup_id = %entry.id,
            rows = ids.len(),
            "Backup snapshot written before cleanup"
        );

        Ok(entry.id)
    }
}

/// Validate a cleanup request before any I/O happens.
fn validate_cleanup_request(request: &CleanupRequest) -> ModResult<()> {
    if request.ids.is_empty() {
        return Err(ModError::Validation(
            "Cleanup requires at least one record id".to_string(),
        ));
    }
    if request.ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ModError::Validation(
            "Cleanup id list contains an empty id".to_string(),
        ));
    }
    if request.reason.trim().is_empty() {
        return Err(ModError::Validation(
            "Cleanup requires a human-readable reason".to_string(),
        ));
    }
    Ok(())
}

/// Render a SQLite row as a JSON object for backup snapshots.
///
/// SQLite is dynamically typed, so each column is tried as integer, real,
/// then text; anything else becomes null.
fn row_to_json(row: &sqlx::sqlite::SqliteRow) -> Value {
    let mut map = serde_json::Map::new();

    for column in row.columns() {
        let idx = column.ordinal();
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            v.map(Value::from).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            v.map(Value::from).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            v.map(Value::from).unwrap_or(Value::Null)
        } else {
            Value::Null
        };
        map.insert(column.name().to_string(), value);
    }

    Value::Object(map)
}
