/// Anomaly & Spike Detector
///
/// Compares the event rate of a short recent window against a longer
/// baseline window and flags when the ratio crosses a configured
/// threshold. Pure computation over an already-fetched activity slice;
/// the caller supplies the clock.
use crate::activity::ActivityItem;
use crate::error::{ModError, ModResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tuning knobs for spike detection
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnomalyDetectionConfig {
    /// Ratio of current rate to baseline rate that counts as a spike
    pub spike_threshold: f64,
    /// Baseline window length in minutes
    pub average_window_minutes: i64,
    /// Recent window length in minutes; must be shorter than the baseline
    pub current_window_minutes: i64,
    /// Below this many activities in the baseline window, never flag
    pub minimum_activities: usize,
}

impl Default for AnomalyDetectionConfig {
    fn default() -> Self {
        Self {
            spike_threshold: 3.0,
            average_window_minutes: 60,
            current_window_minutes: 5,
            minimum_activities: 10,
        }
    }
}

impl AnomalyDetectionConfig {
    pub fn validate(&self) -> ModResult<()> {
        if self.spike_threshold <= 1.0 {
            return Err(ModError::Validation(
                "Spike threshold must be greater than 1".to_string(),
            ));
        }
        if self.current_window_minutes <= 0 || self.average_window_minutes <= 0 {
            return Err(ModError::Validation(
                "Window lengths must be positive".to_string(),
            ));
        }
        if self.current_window_minutes >= self.average_window_minutes {
            return Err(ModError::Validation(
                "Current window must be shorter than the average window".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a spike check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeDetection {
    pub is_spike: bool,
    /// Events per minute in the recent window
    pub current_rate: f64,
    /// Events per minute in the baseline window
    pub average_rate: f64,
    pub threshold: f64,
    /// current_rate / average_rate, or 0 when the baseline is empty
    pub ratio: f64,
}

/// Check the activity stream for a rate spike as of `now`.
///
/// With fewer than `minimum_activities` events in the baseline window the
/// result is never a spike, regardless of the computed ratio; sparse data
/// produces wild ratios that are not actionable.
pub fn detect_spike(
    activities: &[ActivityItem],
    config: &AnomalyDetectionConfig,
    now: DateTime<Utc>,
) -> SpikeDetection {
    let current_cutoff = now - Duration::minutes(config.current_window_minutes);
    let average_cutoff = now - Duration::minutes(config.average_window_minutes);

    let current_count = activities
        .iter()
        .filter(|a| a.created_at > current_cutoff && a.created_at <= now)
        .count();
    let average_count = activities
        .iter()
        .filter(|a| a.created_at > average_cutoff && a.created_at <= now)
        .count();

    let current_rate = current_count as f64 / config.current_window_minutes as f64;
    let average_rate = average_count as f64 / config.average_window_minutes as f64;

    let ratio = if average_rate == 0.0 {
        0.0
    } else {
        current_rate / average_rate
    };

    let is_spike = average_count >= config.minimum_activities && ratio >= config.spike_threshold;

    SpikeDetection {
        is_spike,
        current_rate,
        average_rate,
        threshold: config.spike_threshold,
        ratio,
    }
}
