//! Collaborator seams for health signals and alert delivery.
//!
//! The tracker never talks to the network itself. Health comes in through a
//! [`HealthProbe`] (HTTP, ping, log-derived, ...) and alerts leave through an
//! [`AlertSink`] (email, chat, dashboard, ...). Both traits are object-safe
//! so the tracker can hold them as `Arc<dyn ...>`.

use crate::cascade::CascadeFailure;
use crate::domain::{FailureEvent, Severity, SystemId, SystemNode, SystemStatus};
use crate::error::Result;
use crate::impact::ImpactAnalysis;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};

/// One health observation for one system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// System observed
    pub system_id: SystemId,
    /// Observed status
    pub status: SystemStatus,
    /// Response time in milliseconds
    pub response_time_ms: f64,
    /// Fraction of failed requests in `[0, 1]`
    pub error_rate: f64,
}

impl HealthReport {
    /// A healthy observation with the given response time.
    pub fn healthy(system_id: impl Into<SystemId>, response_time_ms: f64) -> Self {
        Self {
            system_id: system_id.into(),
            status: SystemStatus::Healthy,
            response_time_ms,
            error_rate: 0.0,
        }
    }

    /// An observation recorded when the probe gave no answer.
    pub fn unknown(system_id: impl Into<SystemId>) -> Self {
        Self {
            system_id: system_id.into(),
            status: SystemStatus::Unknown,
            response_time_ms: 0.0,
            error_rate: 0.0,
        }
    }
}

/// Source of health observations.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe one system.
    ///
    /// # Errors
    ///
    /// Implementations return `Error::Probe` when the system could not be
    /// probed at all; the tracker records such systems as `unknown`.
    async fn check(&self, system: &SystemNode) -> Result<HealthReport>;
}

/// Which alert channel a failure is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertChannel {
    /// Critical and high severity
    Critical,
    /// Everything else
    Warning,
}

impl AlertChannel {
    /// Route by severity: critical and high go to the critical channel.
    pub fn for_severity(severity: Severity) -> Self {
        if severity.is_critical() {
            Self::Critical
        } else {
            Self::Warning
        }
    }
}

impl fmt::Display for AlertChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Operator-facing summary of one analyzed failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Channel chosen for the failure
    pub channel: AlertChannel,
    /// The failure being reported
    pub failure: FailureEvent,
    /// Number of systems in the blast radius
    pub affected_systems: usize,
    /// Systems reached by the cascade beyond the root
    pub cascade_size: usize,
    /// Estimated users affected
    pub user_impact: u64,
    /// Estimated revenue lost
    pub revenue_impact: f64,
    /// First mitigation steps to take
    pub mitigation_strategies: Vec<String>,
}

impl Alert {
    /// Build an alert from the analyses of a failure.
    pub fn from_analysis(
        failure: &FailureEvent,
        impact: &ImpactAnalysis,
        cascade: &CascadeFailure,
    ) -> Self {
        Self {
            channel: AlertChannel::for_severity(failure.severity),
            failure: failure.clone(),
            affected_systems: impact.affected_systems.len(),
            cascade_size: cascade.cascade_size(),
            user_impact: impact.user_impact,
            revenue_impact: impact.revenue_impact,
            mitigation_strategies: impact.mitigation_strategies.clone(),
        }
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{} {} on {}: {} systems affected, ~{} users, ~${:.0} revenue at risk",
            self.failure.severity,
            self.failure.failure_type,
            self.failure.system_id,
            self.affected_systems,
            self.user_impact,
            self.revenue_impact
        )
    }
}

/// Destination for alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver an alert on the critical channel.
    ///
    /// # Errors
    ///
    /// Returns `Error::Alert` if delivery failed.
    async fn send_critical(&self, alert: &Alert) -> Result<()>;

    /// Deliver an alert on the warning channel.
    ///
    /// # Errors
    ///
    /// Returns `Error::Alert` if delivery failed.
    async fn send_warning(&self, alert: &Alert) -> Result<()>;
}

/// Alert sink that writes alerts to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAlertSink;

#[async_trait]
impl AlertSink for LoggingAlertSink {
    async fn send_critical(&self, alert: &Alert) -> Result<()> {
        error!(
            system_id = %alert.failure.system_id,
            severity = %alert.failure.severity,
            affected = alert.affected_systems,
            "CRITICAL ALERT: {}",
            alert.summary()
        );
        Ok(())
    }

    async fn send_warning(&self, alert: &Alert) -> Result<()> {
        warn!(
            system_id = %alert.failure.system_id,
            severity = %alert.failure.severity,
            affected = alert.affected_systems,
            "Warning alert: {}",
            alert.summary()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_routing() {
        assert_eq!(AlertChannel::for_severity(Severity::Critical), AlertChannel::Critical);
        assert_eq!(AlertChannel::for_severity(Severity::High), AlertChannel::Critical);
        assert_eq!(AlertChannel::for_severity(Severity::Medium), AlertChannel::Warning);
        assert_eq!(AlertChannel::for_severity(Severity::Negligible), AlertChannel::Warning);
    }
}
