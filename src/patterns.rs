/// Suspicious Pattern Detector
///
/// Counts occurrences of specific activity categories inside fixed
/// lookback windows and flags when the count reaches the pattern's
/// threshold. Pure computation; the caller supplies the clock.
use crate::activity::{ActivityItem, ActivityType};
use crate::error::{ModError, ModResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Known abuse patterns, each with a fixed count threshold and lookback window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    RapidRegistrations,
    BulkAccountCreation,
    SpamSubmissions,
    MassTeamJoins,
    RepeatedReports,
    UnusualLoginPattern,
}

impl PatternType {
    pub const ALL: [PatternType; 6] = [
        PatternType::RapidRegistrations,
        PatternType::BulkAccountCreation,
        PatternType::SpamSubmissions,
        PatternType::MassTeamJoins,
        PatternType::RepeatedReports,
        PatternType::UnusualLoginPattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::RapidRegistrations => "rapid_registrations",
            PatternType::BulkAccountCreation => "bulk_account_creation",
            PatternType::SpamSubmissions => "spam_submissions",
            PatternType::MassTeamJoins => "mass_team_joins",
            PatternType::RepeatedReports => "repeated_reports",
            PatternType::UnusualLoginPattern => "unusual_login_pattern",
        }
    }

    pub fn from_str(s: &str) -> ModResult<Self> {
        match s.to_lowercase().as_str() {
            "rapid_registrations" => Ok(PatternType::RapidRegistrations),
            "bulk_account_creation" => Ok(PatternType::BulkAccountCreation),
            "spam_submissions" => Ok(PatternType::SpamSubmissions),
            "mass_team_joins" => Ok(PatternType::MassTeamJoins),
            "repeated_reports" => Ok(PatternType::RepeatedReports),
            "unusual_login_pattern" => Ok(PatternType::UnusualLoginPattern),
            _ => Err(ModError::Validation(format!("Invalid pattern type: {}", s))),
        }
    }

    /// Count at which the pattern fires
    pub fn threshold(&self) -> usize {
        match self {
            PatternType::RapidRegistrations => 5,
            PatternType::BulkAccountCreation => 10,
            PatternType::SpamSubmissions => 8,
            PatternType::MassTeamJoins => 6,
            PatternType::RepeatedReports => 5,
            PatternType::UnusualLoginPattern => 10,
        }
    }

    /// Lookback window in minutes
    pub fn window_minutes(&self) -> i64 {
        match self {
            PatternType::RapidRegistrations => 10,
            PatternType::BulkAccountCreation => 60,
            PatternType::SpamSubmissions => 30,
            PatternType::MassTeamJoins => 15,
            PatternType::RepeatedReports => 60,
            PatternType::UnusualLoginPattern => 5,
        }
    }

    /// Whether an activity category is relevant to this pattern
    pub fn matches(&self, activity_type: ActivityType) -> bool {
        matches!(
            (self, activity_type),
            (PatternType::RapidRegistrations, ActivityType::Registration)
                | (PatternType::BulkAccountCreation, ActivityType::AccountCreation)
                | (PatternType::SpamSubmissions, ActivityType::Submission)
                | (PatternType::MassTeamJoins, ActivityType::TeamJoin)
                | (PatternType::RepeatedReports, ActivityType::Report)
                | (PatternType::UnusualLoginPattern, ActivityType::Login)
        )
    }
}

/// Outcome of a pattern check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousActivityResult {
    pub detected: bool,
    pub pattern: PatternType,
    pub count: usize,
    pub threshold: usize,
    pub window_minutes: i64,
    pub details: String,
}

/// Check the activity stream for one pattern as of `now`.
///
/// When `actor_id` is given, only that actor's activities are counted;
/// otherwise the pattern is evaluated platform-wide.
pub fn detect_pattern(
    activities: &[ActivityItem],
    pattern: PatternType,
    actor_id: Option<&str>,
    now: DateTime<Utc>,
) -> SuspiciousActivityResult {
    let cutoff = now - Duration::minutes(pattern.window_minutes());

    let count = activities
        .iter()
        .filter(|a| a.created_at > cutoff && a.created_at <= now)
        .filter(|a| pattern.matches(a.activity_type))
        .filter(|a| match actor_id {
            Some(id) => a.actor_id.as_deref() == Some(id),
            None => true,
        })
        .count();

    let threshold = pattern.threshold();
    let detected = count >= threshold;

    let scope = match actor_id {
        Some(id) => format!(" by actor {}", id),
        None => String::new(),
    };
    let details = format!(
        "{} matching activities{} in the last {} minutes (threshold {})",
        count,
        scope,
        pattern.window_minutes(),
        threshold
    );

    SuspiciousActivityResult {
        detected,
        pattern,
        count,
        threshold,
        window_minutes: pattern.window_minutes(),
        details,
    }
}

/// Run every known pattern and return the ones that fired.
pub fn detect_all_patterns(
    activities: &[ActivityItem],
    actor_id: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<SuspiciousActivityResult> {
    PatternType::ALL
        .iter()
        .map(|p| detect_pattern(activities, *p, actor_id, now))
        .filter(|r| r.detected)
        .collect()
}
