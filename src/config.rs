use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TaskrankError;
use crate::models::DueDateCalculation;

pub const CONFIG_FILE: &str = "config.json";
pub const DB_FILE: &str = "taskrank.db";
pub const DEFAULT_HOME: &str = ".taskrank";

/// Tunables for the priority formula's time-based components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Days before the due date at which urgency starts rising.
    pub urgency_window_days: f64,
    /// Task age at which time decay saturates.
    pub decay_horizon_days: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            urgency_window_days: 14.0,
            decay_horizon_days: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub owner: String,
    pub default_due_date_calculation: DueDateCalculation,
    pub scoring: ScoringConfig,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: "local".to_string(),
            default_due_date_calculation: DueDateCalculation::FromOriginal,
            scoring: ScoringConfig::default(),
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load `config.json` from the data directory. A missing file yields defaults.
    pub fn load(home: &Path) -> Result<Self, TaskrankError> {
        let path = home.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| TaskrankError::config(format!("reading {}: {e}", path.display())))?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| TaskrankError::config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, home: &Path) -> Result<PathBuf, TaskrankError> {
        let path = home.join(CONFIG_FILE);
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| TaskrankError::config(e.to_string()))?;
        fs::write(&path, raw)
            .map_err(|e| TaskrankError::config(format!("writing {}: {e}", path.display())))?;
        Ok(path)
    }

    fn validate(&self) -> Result<(), TaskrankError> {
        if self.owner.trim().is_empty() {
            return Err(TaskrankError::config("owner must not be empty"));
        }
        if self.scoring.urgency_window_days <= 0.0 || self.scoring.decay_horizon_days <= 0.0 {
            return Err(TaskrankError::config(
                "scoring windows must be positive numbers of days",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"default_due_date_calculation":"from_completion","scoring":{"urgency_window_days":7}}"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.owner, "local");
        assert_eq!(
            config.default_due_date_calculation,
            DueDateCalculation::FromCompletion
        );
        assert_eq!(config.scoring.urgency_window_days, 7.0);
        assert_eq!(config.scoring.decay_horizon_days, 30.0);
    }

    #[test]
    fn rejects_non_positive_window() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"scoring":{"urgency_window_days":0}}"#,
        )
        .unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigError);
    }
}
