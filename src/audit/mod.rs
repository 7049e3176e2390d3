/// Append-only audit log
///
/// The store deliberately exposes only `append`, `get`, and `list`. There
/// is no update or delete, so the immutability of the action history is a
/// property of the interface rather than a convention callers must honor.
pub mod diff;

use crate::error::{ModError, ModResult};
use crate::id::IdGenerator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::info;

/// Administrative actions recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserSuspended,
    UserReinstated,
    OrganizerFlagged,
    RecordUpdated,
    RecordDeleted,
    OrphanBackup,
    OrphanCleanup,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserSuspended => "user_suspended",
            AuditAction::UserReinstated => "user_reinstated",
            AuditAction::OrganizerFlagged => "organizer_flagged",
            AuditAction::RecordUpdated => "record_updated",
            AuditAction::RecordDeleted => "record_deleted",
            AuditAction::OrphanBackup => "orphan_backup",
            AuditAction::OrphanCleanup => "orphan_cleanup",
        }
    }

    pub fn from_str(s: &str) -> ModResult<Self> {
        match s.to_lowercase().as_str() {
            "user_suspended" => Ok(AuditAction::UserSuspended),
            "user_reinstated" => Ok(AuditAction::UserReinstated),
            "organizer_flagged" => Ok(AuditAction::OrganizerFlagged),
            "record_updated" => Ok(AuditAction::RecordUpdated),
            "record_deleted" => Ok(AuditAction::RecordDeleted),
            "orphan_backup" => Ok(AuditAction::OrphanBackup),
            "orphan_cleanup" => Ok(AuditAction::OrphanCleanup),
            _ => Err(ModError::Validation(format!("Invalid audit action: {}", s))),
        }
    }
}

/// One immutable audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub action_type: AuditAction,
    pub admin_id: String,
    pub admin_email: String,
    pub target_type: String,
    pub target_id: String,
    pub reason: String,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when appending an audit entry
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub action_type: AuditAction,
    pub admin_id: String,
    pub admin_email: String,
    pub target_type: String,
    pub target_id: String,
    pub reason: String,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
}

/// Optional filters for listing audit entries
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action_type: Option<AuditAction>,
    pub admin_id: Option<String>,
    pub target_id: Option<String>,
}

/// Append-only audit store
#[derive(Clone)]
pub struct AuditStore {
    db: SqlitePool,
    ids: Arc<dyn IdGenerator>,
}

impl AuditStore {
    pub fn new(db: SqlitePool, ids: Arc<dyn IdGenerator>) -> Self {
        Self { db, ids }
    }

    /// Append a new audit entry. The reason must be non-empty.
    pub async fn append(&self, entry: NewAuditEntry) -> ModResult<AuditLogEntry> {
        if entry.reason.trim().is_empty() {
            return Err(ModError::Validation(
                "Audit entries require a non-empty reason".to_string(),
            ));
        }
        if entry.admin_id.trim().is_empty() {
            return Err(ModError::Validation(
                "Audit entries require an admin id".to_string(),
            ));
        }

        let id = self.ids.next_id();
        let now = Utc::now();

        let before_json = entry
            .before_state
            .as_ref()
            .map(|v| serde_json::to_string(v))
            .transpose()
            .map_err(|e| ModError::Internal(format!("Failed to encode before state: {}", e)))?;
        let after_json = entry
            .after_state
            .as_ref()
            .map(|v| serde_json::to_string(v))
            .transpose()
            .map_err(|e| ModError::Internal(format!("Failed to encode after state: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO audit_log
            (id, action_type, admin_id, admin_email, target_type, target_id,
             reason, before_state, after_state, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(entry.action_type.as_str())
        .bind(&entry.admin_id)
        .bind(&entry.admin_email)
        .bind(&entry.target_type)
        .bind(&entry.target_id)
        .bind(&entry.reason)
        .bind(&before_json)
        .bind(&after_json)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        info!(
            action = entry.action_type.as_str(),
            target = %entry.target_id,
            "Audit entry {} recorded",
            id
        );

        Ok(AuditLogEntry {
            id,
            action_type: entry.action_type,
            admin_id: entry.admin_id,
            admin_email: entry.admin_email,
            target_type: entry.target_type,
            target_id: entry.target_id,
            reason: entry.reason,
            before_state: entry.before_state,
            after_state: entry.after_state,
            created_at: now,
        })
    }

    /// Get an audit entry by id
    pub async fn get(&self, id: &str) -> ModResult<Option<AuditLogEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, action_type, admin_id, admin_email, target_type, target_id,
                   reason, before_state, after_state, created_at
            FROM audit_log
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(parse_entry).transpose()
    }

    /// List audit entries, newest first
    pub async fn list(&self, filter: &AuditFilter, limit: i64) -> ModResult<Vec<AuditLogEntry>> {
        let mut builder = sqlx::QueryBuilder::new(
            "SELECT id, action_type, admin_id, admin_email, target_type, target_id, \
             reason, before_state, after_state, created_at FROM audit_log WHERE 1 = 1",
        );

        if let Some(action) = filter.action_type {
            builder.push(" AND action_type = ").push_bind(action.as_str());
        }
        if let Some(admin_id) = &filter.admin_id {
            builder.push(" AND admin_id = ").push_bind(admin_id.clone());
        }
        if let Some(target_id) = &filter.target_id {
            builder.push(" AND target_id = ").push_bind(target_id.clone());
        }
        builder.push(" ORDER BY created_at DESC LIMIT ").push_bind(limit);

        let rows = builder.build().fetch_all(&self.db).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(parse_entry(row)?);
        }

        Ok(entries)
    }
}

fn parse_entry(row: sqlx::sqlite::SqliteRow) -> ModResult<AuditLogEntry> {
    let action_str: String = row.get("action_type");
    let action_type = AuditAction::from_str(&action_str)?;

    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| ModError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    let before_state = row
        .try_get::<Option<String>, _>("before_state")
        .unwrap_or(None)
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| ModError::Internal(format!("Invalid before state: {}", e)))?;
    let after_state = row
        .try_get::<Option<String>, _>("after_state")
        .unwrap_or(None)
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| ModError::Internal(format!("Invalid after state: {}", e)))?;

    Ok(AuditLogEntry {
        id: row.get("id"),
        action_type,
        admin_id: row.get("admin_id"),
        admin_email: row.get("admin_email"),
        target_type: row.get("target_type"),
        target_id: row.get("target_id"),
        reason: row.get("reason"),
        before_state,
        after_state,
        created_at,
    })
}
