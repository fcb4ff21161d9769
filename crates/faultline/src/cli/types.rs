//! CLI value enums and domain type conversions.

use clap::ValueEnum;

use crate::domain::{FailureType, Severity};

/// Failure type for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTypeArg {
    /// System is not serving at all
    #[value(name = "service_down", alias = "service-down")]
    ServiceDown,
    /// Responses exceed latency expectations
    #[value(name = "slow_response", alias = "slow-response")]
    SlowResponse,
    /// Too many requests fail
    #[value(name = "high_error_rate", alias = "high-error-rate")]
    HighErrorRate,
    /// CPU, memory, connections or disk exhausted
    #[value(name = "resource_exhaustion", alias = "resource-exhaustion")]
    ResourceExhaustion,
    /// Connections time out
    #[value(name = "connection_timeout", alias = "connection-timeout")]
    ConnectionTimeout,
    /// Credentials rejected
    #[value(name = "authentication_failure", alias = "authentication-failure")]
    AuthenticationFailure,
    /// Stored data is wrong
    #[value(name = "data_corruption", alias = "data-corruption")]
    DataCorruption,
    /// Bad or missing configuration
    #[value(name = "configuration_error", alias = "configuration-error")]
    ConfigurationError,
}

impl From<FailureTypeArg> for FailureType {
    fn from(arg: FailureTypeArg) -> Self {
        match arg {
            FailureTypeArg::ServiceDown => Self::ServiceDown,
            FailureTypeArg::SlowResponse => Self::SlowResponse,
            FailureTypeArg::HighErrorRate => Self::HighErrorRate,
            FailureTypeArg::ResourceExhaustion => Self::ResourceExhaustion,
            FailureTypeArg::ConnectionTimeout => Self::ConnectionTimeout,
            FailureTypeArg::AuthenticationFailure => Self::AuthenticationFailure,
            FailureTypeArg::DataCorruption => Self::DataCorruption,
            FailureTypeArg::ConfigurationError => Self::ConfigurationError,
        }
    }
}

/// Severity for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityArg {
    /// Page someone now
    Critical,
    /// Urgent
    High,
    /// Needs attention this shift
    Medium,
    /// Minor
    Low,
    /// Informational
    Negligible,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Critical => Self::Critical,
            SeverityArg::High => Self::High,
            SeverityArg::Medium => Self::Medium,
            SeverityArg::Low => Self::Low,
            SeverityArg::Negligible => Self::Negligible,
        }
    }
}
