/// Activity stream model and store
///
/// The spike and pattern detectors consume slices of `ActivityItem`; this
/// module also provides the append-only log they are usually fetched from.
use crate::error::{ModError, ModResult};
use crate::id::IdGenerator;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Activity categories tracked by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Registration,
    AccountCreation,
    Submission,
    TeamJoin,
    Report,
    Login,
    ModerationAction,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Registration => "registration",
            ActivityType::AccountCreation => "account_creation",
            ActivityType::Submission => "submission",
            ActivityType::TeamJoin => "team_join",
            ActivityType::Report => "report",
            ActivityType::Login => "login",
            ActivityType::ModerationAction => "moderation_action",
        }
    }

    pub fn from_str(s: &str) -> ModResult<Self> {
        match s.to_lowercase().as_str() {
            "registration" => Ok(ActivityType::Registration),
            "account_creation" => Ok(ActivityType::AccountCreation),
            "submission" => Ok(ActivityType::Submission),
            "team_join" => Ok(ActivityType::TeamJoin),
            "report" => Ok(ActivityType::Report),
            "login" => Ok(ActivityType::Login),
            "moderation_action" => Ok(ActivityType::ModerationAction),
            _ => Err(ModError::Validation(format!("Invalid activity type: {}", s))),
        }
    }
}

/// Entity kinds an activity can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    User,
    Organizer,
    Hackathon,
    Team,
    Submission,
    Registration,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::User => "user",
            TargetType::Organizer => "organizer",
            TargetType::Hackathon => "hackathon",
            TargetType::Team => "team",
            TargetType::Submission => "submission",
            TargetType::Registration => "registration",
        }
    }

    pub fn from_str(s: &str) -> ModResult<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TargetType::User),
            "organizer" => Ok(TargetType::Organizer),
            "hackathon" => Ok(TargetType::Hackathon),
            "team" => Ok(TargetType::Team),
            "submission" => Ok(TargetType::Submission),
            "registration" => Ok(TargetType::Registration),
            _ => Err(ModError::Validation(format!("Invalid target type: {}", s))),
        }
    }
}

/// Severity attached to an activity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivitySeverity {
    Info,
    Warning,
    Critical,
}

impl ActivitySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivitySeverity::Info => "info",
            ActivitySeverity::Warning => "warning",
            ActivitySeverity::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> ModResult<Self> {
        match s.to_lowercase().as_str() {
            "info" => Ok(ActivitySeverity::Info),
            "warning" => Ok(ActivitySeverity::Warning),
            "critical" => Ok(ActivitySeverity::Critical),
            _ => Err(ModError::Validation(format!("Invalid severity: {}", s))),
        }
    }
}

/// One immutable entry in the activity stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub id: String,
    pub activity_type: ActivityType,
    pub actor_id: Option<String>,
    pub target_type: TargetType,
    pub target_id: String,
    pub action: String,
    pub severity: ActivitySeverity,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when recording a new activity
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub activity_type: ActivityType,
    pub actor_id: Option<String>,
    pub target_type: TargetType,
    pub target_id: String,
    pub action: String,
    pub severity: ActivitySeverity,
}

/// Sort activities newest first by `created_at` (the canonical ordering).
///
/// The sort is stable, so it is idempotent even with timestamp ties.
pub fn sort_newest_first(activities: &mut [ActivityItem]) {
    activities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Append-only activity log backed by SQLite
#[derive(Clone)]
pub struct ActivityLog {
    db: SqlitePool,
    ids: Arc<dyn IdGenerator>,
}

impl ActivityLog {
    pub fn new(db: SqlitePool, ids: Arc<dyn IdGenerator>) -> Self {
        Self { db, ids }
    }

    /// Record a new activity entry
    pub async fn record(&self, activity: NewActivity) -> ModResult<ActivityItem> {
        if activity.target_id.trim().is_empty() {
            return Err(ModError::Validation("Target id cannot be empty".to_string()));
        }
        if activity.action.trim().is_empty() {
            return Err(ModError::Validation("Action cannot be empty".to_string()));
        }

        let id = self.ids.next_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO activity_log
            (id, activity_type, actor_id, target_type, target_id, action, severity, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(activity.activity_type.as_str())
        .bind(&activity.actor_id)
        .bind(activity.target_type.as_str())
        .bind(&activity.target_id)
        .bind(&activity.action)
        .bind(activity.severity.as_str())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(ActivityItem {
            id,
            activity_type: activity.activity_type,
            actor_id: activity.actor_id,
            target_type: activity.target_type,
            target_id: activity.target_id,
            action: activity.action,
            severity: activity.severity,
            created_at: now,
        })
    }

    /// List activities recorded within the last `window` (newest first)
    pub async fn list_recent(&self, window: Duration, limit: i64) -> ModResult<Vec<ActivityItem>> {
        let cutoff = Utc::now() - window;
        self.list_since(cutoff, limit).await
    }

    /// List activities at or after `cutoff` (newest first)
    pub async fn list_since(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> ModResult<Vec<ActivityItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, activity_type, actor_id, target_type, target_id, action, severity, created_at
            FROM activity_log
            WHERE created_at >= ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(cutoff.to_rfc3339())
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(parse_activity(row)?);
        }

        Ok(items)
    }
}

fn parse_activity(row: sqlx::sqlite::SqliteRow) -> ModResult<ActivityItem> {
    let activity_type_str: String = row.get("activity_type");
    let target_type_str: String = row.get("target_type");
    let severity_str: String = row.get("severity");

    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| ModError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(ActivityItem {
        id: row.get("id"),
        activity_type: ActivityType::from_str(&activity_type_str)?,
        actor_id: row.get("actor_id"),
        target_type: TargetType::from_str(&target_type_str)?,
        target_id: row.get("target_id"),
        action: row.get("action"),
        severity: ActivitySeverity::from_str(&severity_str)?,
        created_at,
    })
}
