/// Trust Scoring Engine
///
/// Converts raw behavioral counters into a bounded 0-100 reputation score
/// for users and organizers. Pure and deterministic: every input maps to
/// exactly one score, there is no error path, and no I/O happens here.
use serde::{Deserialize, Serialize};

/// Starting point before bonuses and penalties
const BASE_SCORE: f64 = 50.0;

/// Combined rejected-hackathon + violation count that auto-flags an organizer
pub const DEFAULT_AUTO_FLAG_THRESHOLD: u32 = 3;

/// Behavioral counters for a participant account
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UserTrustFactors {
    pub account_age_days: u32,
    pub hackathons_completed: u32,
    pub submissions_approved: u32,
    pub reports_received: u32,
    pub moderation_actions: u32,
    pub is_verified: bool,
}

/// Behavioral counters for an organizer account
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OrganizerTrustFactors {
    pub account_age_days: u32,
    pub hackathons_hosted: u32,
    pub hackathons_approved: u32,
    pub hackathons_rejected: u32,
    pub reports_received: u32,
    pub violations: u32,
    pub is_verified: bool,
}

/// How the score was assembled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base_score: f64,
    pub bonuses: f64,
    pub penalties: f64,
    pub final_score: u8,
}

/// Bounded reputation score with its breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustScoreResult {
    pub score: u8,
    pub breakdown: ScoreBreakdown,
}

/// Score bands used by the moderation UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Critical,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Critical => "critical",
            TrustLevel::Poor => "poor",
            TrustLevel::Fair => "fair",
            TrustLevel::Good => "good",
            TrustLevel::Excellent => "excellent",
        }
    }
}

/// Outcome of the organizer auto-flag rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoFlagResult {
    pub should_flag: bool,
    pub reason: Option<String>,
}

fn finalize(bonuses: f64, penalties: f64) -> TrustScoreResult {
    let raw = BASE_SCORE + bonuses - penalties;
    let score = raw.round().clamp(0.0, 100.0) as u8;

    TrustScoreResult {
        score,
        breakdown: ScoreBreakdown {
            base_score: BASE_SCORE,
            bonuses,
            penalties,
            final_score: score,
        },
    }
}

/// Score a participant account.
///
/// Bonuses saturate so a single factor cannot dominate; penalties grow
/// linearly and are absorbed by the final clamp.
pub fn score_user(factors: &UserTrustFactors) -> TrustScoreResult {
    let mut bonuses = 0.0;

    // One point per 30 days of account age, capped at 15
    bonuses += (factors.account_age_days as f64 / 30.0).min(15.0);
    // Two points per completed hackathon, capped at 20
    bonuses += (factors.hackathons_completed as f64 * 2.0).min(20.0);
    // One point per approved submission, capped at 10
    bonuses += (factors.submissions_approved as f64).min(10.0);
    if factors.is_verified {
        bonuses += 5.0;
    }

    let penalties = factors.reports_received as f64 * 5.0
        + factors.moderation_actions as f64 * 10.0;

    finalize(bonuses, penalties)
}

/// Score an organizer account.
pub fn score_organizer(factors: &OrganizerTrustFactors) -> TrustScoreResult {
    let mut bonuses = 0.0;

    bonuses += (factors.account_age_days as f64 / 30.0).min(15.0);
    // Two points per hosted hackathon, capped at 20
    bonuses += (factors.hackathons_hosted as f64 * 2.0).min(20.0);
    // One point per approved hackathon, capped at 10
    bonuses += (factors.hackathons_approved as f64).min(10.0);
    if factors.is_verified {
        bonuses += 5.0;
    }

    let penalties = factors.hackathons_rejected as f64 * 8.0
        + factors.violations as f64 * 10.0
        + factors.reports_received as f64 * 5.0;

    finalize(bonuses, penalties)
}

/// Map a score to its band. Breakpoints at 20/40/60/80, no gaps or overlaps.
pub fn trust_level(score: u8) -> TrustLevel {
    match score {
        80..=u8::MAX => TrustLevel::Excellent,
        60..=79 => TrustLevel::Good,
        40..=59 => TrustLevel::Fair,
        20..=39 => TrustLevel::Poor,
        _ => TrustLevel::Critical,
    }
}

/// Decide whether an organizer should be auto-flagged for review.
///
/// The rule is governed by the combined total of rejected hackathons and
/// violations, not by either counter alone: two rejections plus one
/// violation trips the default threshold of 3 just like three rejections
/// would.
pub fn should_auto_flag_organizer(
    factors: &OrganizerTrustFactors,
    threshold: u32,
) -> AutoFlagResult {
    let combined = factors.hackathons_rejected + factors.violations;

    if combined >= threshold {
        AutoFlagResult {
            should_flag: true,
            reason: Some(format!(
                "{} rejected hackathons and {} violations ({} combined, threshold {})",
                factors.hackathons_rejected, factors.violations, combined, threshold
            )),
        }
    } else {
        AutoFlagResult {
            should_flag: false,
            reason: None,
        }
    }
}
