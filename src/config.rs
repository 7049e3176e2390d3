/// Configuration management for the moderation analytics core
use crate::anomaly::AnomalyDetectionConfig;
use crate::error::{ModError, ModResult};
use crate::trust::DEFAULT_AUTO_FLAG_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Top-level analytics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub storage: StorageConfig,
    pub anomaly: AnomalyDetectionConfig,
    pub moderation: ModerationConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
}

/// Moderation thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Combined rejected-hackathon + violation count that auto-flags an organizer
    pub auto_flag_threshold: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                database_path: PathBuf::from("./data/moderation.sqlite"),
                max_connections: 10,
            },
            anomaly: AnomalyDetectionConfig::default(),
            moderation: ModerationConfig {
                auto_flag_threshold: DEFAULT_AUTO_FLAG_THRESHOLD,
            },
        }
    }
}

impl AnalyticsConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ModResult<Self> {
        dotenv::dotenv().ok();

        let database_path: PathBuf = env::var("MOD_DATABASE_PATH")
            .unwrap_or_else(|_| "./data/moderation.sqlite".to_string())
            .into();
        let max_connections = env::var("MOD_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let spike_threshold = env::var("MOD_SPIKE_THRESHOLD")
            .unwrap_or_else(|_| "3.0".to_string())
            .parse()
            .map_err(|_| ModError::Validation("Invalid spike threshold".to_string()))?;
        let average_window_minutes = env::var("MOD_AVERAGE_WINDOW_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);
        let current_window_minutes = env::var("MOD_CURRENT_WINDOW_MINUTES")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);
        let minimum_activities = env::var("MOD_MINIMUM_ACTIVITIES")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let auto_flag_threshold = env::var("MOD_AUTO_FLAG_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_AUTO_FLAG_THRESHOLD.to_string())
            .parse()
            .unwrap_or(DEFAULT_AUTO_FLAG_THRESHOLD);

        let config = Self {
            storage: StorageConfig {
                database_path,
                max_connections,
            },
            anomaly: AnomalyDetectionConfig {
                spike_threshold,
                average_window_minutes,
                current_window_minutes,
                minimum_activities,
            },
            moderation: ModerationConfig {
                auto_flag_threshold,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ModResult<()> {
        self.anomaly.validate()?;

        if self.moderation.auto_flag_threshold == 0 {
            return Err(ModError::Validation(
                "Auto-flag threshold must be at least 1".to_string(),
            ));
        }

        if self.storage.max_connections == 0 {
            return Err(ModError::Validation(
                "Database pool needs at least one connection".to_string(),
            ));
        }

        Ok(())
    }
}
