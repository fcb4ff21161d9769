//! Configuration management for the dependency tracker.
//!
//! Configuration is a YAML file; every field has a default, so an empty file
//! (or no file) yields a working tracker.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Default seconds between monitoring ticks
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 30;

/// Default seconds a single health probe may take
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Default number of failures and cascades kept in history
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default hop bound for path enumeration
pub const DEFAULT_MAX_PATH_LENGTH: usize = 10;

/// Default expansion budget for cycle detection
pub const DEFAULT_CYCLE_SEARCH_BUDGET: usize = 100_000;

/// Default betweenness above which a system is a single point of failure
pub const DEFAULT_SPOF_BETWEENNESS_THRESHOLD: f64 = 0.7;

/// Default response time above which a system is considered slow
pub const DEFAULT_SLOW_RESPONSE_MS: f64 = 5000.0;

/// Default error rate above which a system is considered failing
pub const DEFAULT_ERROR_RATE_THRESHOLD: f64 = 0.1;

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TrackerConfig {
    /// Seconds between monitoring ticks
    pub monitor_interval_secs: u64,

    /// Seconds a single health probe may take before it counts as unknown
    pub probe_timeout_secs: u64,

    /// Bound on cascade depth and trace length
    pub max_cascade_depth: usize,

    /// Failures and cascades kept in history
    pub history_limit: usize,

    /// Betweenness above which `find_single_points_of_failure` reports a
    /// system
    pub spof_threshold: f64,

    /// Combined centrality above which the optimizer suggests removing a
    /// single point of failure
    pub spof_centrality_threshold: f64,

    /// Hop bound for path enumeration
    pub max_path_length: usize,

    /// Expansion budget for cycle detection
    pub cycle_search_budget: usize,

    /// Response time in milliseconds above which a system is slow
    pub slow_response_ms: f64,

    /// Error rate above which a system is failing
    pub error_rate_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: DEFAULT_MONITOR_INTERVAL_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            max_cascade_depth: crate::cascade::DEFAULT_MAX_DEPTH,
            history_limit: DEFAULT_HISTORY_LIMIT,
            spof_threshold: DEFAULT_SPOF_BETWEENNESS_THRESHOLD,
            spof_centrality_threshold: crate::optimization::SPOF_CENTRALITY_THRESHOLD,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
            cycle_search_budget: DEFAULT_CYCLE_SEARCH_BUDGET,
            slow_response_ms: DEFAULT_SLOW_RESPONSE_MS,
            error_rate_threshold: DEFAULT_ERROR_RATE_THRESHOLD,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and `Error::Config` if
    /// it cannot be parsed or fails validation.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if encoding fails and `Error::Io` if the file
    /// cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Reject values that would stall the monitoring loop or make
    /// thresholds meaningless.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.monitor_interval_secs == 0 {
            return Err(Error::Config("monitor-interval-secs must be positive".into()));
        }
        if self.probe_timeout_secs == 0 {
            return Err(Error::Config("probe-timeout-secs must be positive".into()));
        }
        if self.history_limit == 0 {
            return Err(Error::Config("history-limit must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.spof_threshold) {
            return Err(Error::Config(format!(
                "spof-threshold must be within [0, 1], got {}",
                self.spof_threshold
            )));
        }
        if !self.spof_centrality_threshold.is_finite() || self.spof_centrality_threshold < 0.0 {
            return Err(Error::Config(format!(
                "spof-centrality-threshold must be non-negative, got {}",
                self.spof_centrality_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.error_rate_threshold) {
            return Err(Error::Config(format!(
                "error-rate-threshold must be within [0, 1], got {}",
                self.error_rate_threshold
            )));
        }
        Ok(())
    }

    /// Interval between monitoring ticks.
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    /// Timeout for one health probe.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: TrackerConfig = serde_yaml::from_str("monitor-interval-secs: 5\n").unwrap();
        assert_eq!(config.monitor_interval_secs, 5);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = TrackerConfig {
            spof_threshold: 1.5,
            ..TrackerConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_spof_thresholds_are_independent() {
        let config: TrackerConfig =
            serde_yaml::from_str("spof-centrality-threshold: 0.95\n").unwrap();
        assert!((config.spof_centrality_threshold - 0.95).abs() < f64::EPSILON);
        assert!((config.spof_threshold - DEFAULT_SPOF_BETWEENNESS_THRESHOLD).abs() < f64::EPSILON);

        let config = TrackerConfig {
            spof_centrality_threshold: -0.1,
            ..TrackerConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = TrackerConfig {
            monitor_interval_secs: 0,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
