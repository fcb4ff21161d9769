//! Domain types for dependency and failure modelling.
//!
//! Every "kind" in the model is a closed enum that carries its own behaviour
//! table (criticality score, recovery time, transmission factor) as a pure
//! method, so the analyzers never dispatch on strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Free-form attributes attached to systems and dependencies.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Unique identifier for a system
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SystemId(pub String);

impl SystemId {
    /// Create a new system ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SystemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SystemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for SystemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kind of monitored system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemType {
    /// HTTP front end
    WebServer,
    /// Relational or document store
    Database,
    /// In-memory cache
    Cache,
    /// Broker or queue
    MessageQueue,
    /// Edge API gateway
    ApiGateway,
    /// Internal service
    Microservice,
    /// Traffic distribution tier
    LoadBalancer,
    /// Content delivery network
    Cdn,
    /// Object or block storage
    FileStorage,
    /// Observability stack
    Monitoring,
    /// Third-party API
    ExternalApi,
    /// Standalone container
    Container,
    /// Kubernetes pod
    KubernetesPod,
    /// Serverless function
    ServerlessFunction,
}

impl SystemType {
    /// Infrastructure criticality in `[0, 1]`, database highest, monitoring lowest.
    pub fn base_score(self) -> f64 {
        match self {
            Self::Database => 1.0,
            Self::ApiGateway | Self::LoadBalancer => 0.9,
            Self::MessageQueue => 0.8,
            Self::WebServer | Self::FileStorage => 0.7,
            Self::Microservice | Self::ExternalApi => 0.6,
            Self::Cache | Self::Container | Self::KubernetesPod => 0.5,
            Self::Cdn | Self::ServerlessFunction => 0.4,
            Self::Monitoring => 0.2,
        }
    }

    /// Typical minutes to restore a system of this kind.
    pub fn base_recovery_minutes(self) -> f64 {
        match self {
            Self::Database => 60.0,
            Self::FileStorage => 45.0,
            Self::MessageQueue | Self::ExternalApi => 30.0,
            Self::ApiGateway => 20.0,
            Self::LoadBalancer | Self::Cdn => 15.0,
            Self::WebServer | Self::Microservice | Self::Monitoring => 10.0,
            Self::Cache | Self::Container | Self::KubernetesPod => 5.0,
            Self::ServerlessFunction => 2.0,
        }
    }

    /// Weight used when ordering recovery work.
    ///
    /// database > gateway > load balancer > queue > web > microservice > cache > cdn
    pub fn recovery_weight(self) -> f64 {
        match self {
            Self::Database => 1.0,
            Self::ApiGateway => 0.9,
            Self::LoadBalancer => 0.85,
            Self::MessageQueue => 0.8,
            Self::WebServer => 0.7,
            Self::Microservice => 0.6,
            Self::Cache => 0.5,
            Self::Cdn => 0.4,
            Self::FileStorage => 0.65,
            Self::ExternalApi
            | Self::Container
            | Self::KubernetesPod
            | Self::ServerlessFunction => 0.45,
            Self::Monitoring => 0.3,
        }
    }

    /// Users touched per unit of impact score.
    pub fn user_weight(self) -> f64 {
        match self {
            Self::ApiGateway | Self::LoadBalancer => 5000.0,
            Self::Database => 3000.0,
            Self::Cdn => 2000.0,
            Self::WebServer => 1000.0,
            Self::MessageQueue | Self::FileStorage => 800.0,
            Self::Microservice | Self::ExternalApi => 500.0,
            Self::Cache => 300.0,
            Self::Container | Self::KubernetesPod | Self::ServerlessFunction => 200.0,
            Self::Monitoring => 10.0,
        }
    }

    /// Revenue lost per minute of downtime.
    pub fn revenue_per_minute(self) -> f64 {
        match self {
            Self::Database => 500.0,
            Self::ApiGateway | Self::LoadBalancer => 400.0,
            Self::WebServer => 300.0,
            Self::MessageQueue => 200.0,
            Self::FileStorage | Self::ExternalApi => 150.0,
            Self::Microservice | Self::Cdn => 100.0,
            Self::Cache => 50.0,
            Self::Container | Self::KubernetesPod | Self::ServerlessFunction => 40.0,
            Self::Monitoring => 5.0,
        }
    }

    /// Severity assigned when a system of this kind goes down.
    pub fn outage_severity(self) -> Severity {
        match self {
            Self::Database | Self::ApiGateway | Self::LoadBalancer => Severity::Critical,
            Self::MessageQueue | Self::WebServer | Self::FileStorage => Severity::High,
            Self::Microservice
            | Self::Cache
            | Self::Cdn
            | Self::ExternalApi
            | Self::Container
            | Self::KubernetesPod
            | Self::ServerlessFunction => Severity::Medium,
            Self::Monitoring => Severity::Low,
        }
    }

    /// Whether losing this kind of system warrants a standby replica.
    pub fn needs_redundancy(self) -> bool {
        matches!(
            self,
            Self::Database | Self::ApiGateway | Self::LoadBalancer | Self::MessageQueue
        )
    }

    /// Whether readers of this kind of system benefit from a caching layer.
    pub fn benefits_from_caching(self) -> bool {
        matches!(self, Self::Database | Self::ExternalApi)
    }
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WebServer => "web_server",
            Self::Database => "database",
            Self::Cache => "cache",
            Self::MessageQueue => "message_queue",
            Self::ApiGateway => "api_gateway",
            Self::Microservice => "microservice",
            Self::LoadBalancer => "load_balancer",
            Self::Cdn => "cdn",
            Self::FileStorage => "file_storage",
            Self::Monitoring => "monitoring",
            Self::ExternalApi => "external_api",
            Self::Container => "container",
            Self::KubernetesPod => "kubernetes_pod",
            Self::ServerlessFunction => "serverless_function",
        };
        write!(f, "{s}")
    }
}

/// Health status of a system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    /// Operating normally
    Healthy,
    /// Serving, but outside its SLA
    Degraded,
    /// Not serving
    Down,
    /// No recent health signal
    #[default]
    Unknown,
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Down => "down",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Kind of dependency relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// Request/response on the caller's critical path
    Synchronous,
    /// Fire-and-forget or queued
    Asynchronous,
    /// Periodic bulk exchange
    Batch,
    /// Continuous stream
    Streaming,
    /// Reads configuration at startup or reload
    Configuration,
    /// Reads or writes shared data
    Data,
    /// Shares an underlying resource (disk, network, pool)
    SharedResource,
}

impl DependencyType {
    /// Fraction of impact carried across an edge of this kind when scoring
    /// aggregate blast radius.
    pub fn transmission_factor(self) -> f64 {
        match self {
            Self::Synchronous => 1.0,
            Self::Streaming | Self::Data => 0.8,
            Self::SharedResource => 0.7,
            Self::Asynchronous => 0.5,
            Self::Batch => 0.3,
            Self::Configuration => 0.2,
        }
    }

    /// Base likelihood that a failure crosses an edge of this kind when
    /// tracing a cascade.
    pub fn cascade_probability(self) -> f64 {
        match self {
            Self::Synchronous => 0.9,
            Self::Streaming | Self::Data => 0.7,
            Self::SharedResource => 0.6,
            Self::Asynchronous => 0.4,
            Self::Batch => 0.3,
            Self::Configuration => 0.2,
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Synchronous => "synchronous",
            Self::Asynchronous => "asynchronous",
            Self::Batch => "batch",
            Self::Streaming => "streaming",
            Self::Configuration => "configuration",
            Self::Data => "data",
            Self::SharedResource => "shared_resource",
        };
        write!(f, "{s}")
    }
}

/// Kind of observed or hypothesized fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    /// System is not serving at all
    ServiceDown,
    /// Responses exceed latency expectations
    SlowResponse,
    /// Too many requests fail
    HighErrorRate,
    /// CPU, memory, connections or disk exhausted
    ResourceExhaustion,
    /// Connections time out before completing
    ConnectionTimeout,
    /// Credentials rejected
    AuthenticationFailure,
    /// Stored data is wrong
    DataCorruption,
    /// Bad or missing configuration
    ConfigurationError,
}

impl FailureType {
    /// Multiplier applied to base recovery minutes.
    ///
    /// Data corruption takes longest to undo, slow responses the least.
    pub fn downtime_multiplier(self) -> f64 {
        match self {
            Self::DataCorruption => 4.0,
            Self::ResourceExhaustion | Self::ConfigurationError => 1.5,
            Self::AuthenticationFailure => 1.2,
            Self::ServiceDown => 1.0,
            Self::ConnectionTimeout => 0.8,
            Self::HighErrorRate => 0.7,
            Self::SlowResponse => 0.5,
        }
    }

    /// Multiplier applied to an edge's cascade probability.
    pub fn cascade_multiplier(self) -> f64 {
        match self {
            Self::ServiceDown => 1.0,
            Self::DataCorruption => 0.9,
            Self::ResourceExhaustion | Self::ConnectionTimeout => 0.8,
            Self::HighErrorRate => 0.7,
            Self::ConfigurationError => 0.6,
            Self::SlowResponse => 0.5,
            Self::AuthenticationFailure => 0.3,
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ServiceDown => "service_down",
            Self::SlowResponse => "slow_response",
            Self::HighErrorRate => "high_error_rate",
            Self::ResourceExhaustion => "resource_exhaustion",
            Self::ConnectionTimeout => "connection_timeout",
            Self::AuthenticationFailure => "authentication_failure",
            Self::DataCorruption => "data_corruption",
            Self::ConfigurationError => "configuration_error",
        };
        write!(f, "{s}")
    }
}

/// Severity of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
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

impl Severity {
    /// Scale applied to impact scores, critical 1.0 down to negligible 0.2.
    pub fn weight(self) -> f64 {
        match self {
            Self::Critical => 1.0,
            Self::High => 0.8,
            Self::Medium => 0.6,
            Self::Low => 0.4,
            Self::Negligible => 0.2,
        }
    }

    /// One level less severe; negligible stays negligible.
    #[must_use]
    pub fn downgrade(self) -> Self {
        match self {
            Self::Critical => Self::High,
            Self::High => Self::Medium,
            Self::Medium => Self::Low,
            Self::Low | Self::Negligible => Self::Negligible,
        }
    }

    /// Whether alerts of this severity go to the critical channel.
    pub fn is_critical(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Negligible => "negligible",
        };
        write!(f, "{s}")
    }
}

/// A monitored service or resource.
///
/// Equality and hashing consider only `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemNode {
    /// Unique, stable key
    pub id: SystemId,

    /// Human-readable name
    pub name: String,

    /// Kind of system
    pub system_type: SystemType,

    /// Address used by health probes
    #[serde(default)]
    pub endpoint: String,

    /// Deployed version
    #[serde(default)]
    pub version: String,

    /// Last reported health
    #[serde(default)]
    pub status: SystemStatus,

    /// When health was last reported
    #[serde(default)]
    pub last_health_check: Option<DateTime<Utc>>,

    /// Free-form attributes
    #[serde(default)]
    pub metadata: Metadata,
}

impl SystemNode {
    /// Create a node with unknown status and no endpoint.
    pub fn new(id: impl Into<SystemId>, name: impl Into<String>, system_type: SystemType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            system_type,
            endpoint: String::new(),
            version: String::new(),
            status: SystemStatus::Unknown,
            last_health_check: None,
            metadata: Metadata::new(),
        }
    }

    /// Set the probe endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the deployed version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether the node is marked as already having redundancy, either
    /// `"redundant": true` or `"replicas"` of two or more.
    pub fn is_redundant(&self) -> bool {
        let flagged = self
            .metadata
            .get("redundant")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let replicas = self
            .metadata
            .get("replicas")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(1);
        flagged || replicas >= 2
    }
}

impl PartialEq for SystemNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SystemNode {}

impl Hash for SystemNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Retry behaviour configured on a dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts including the first
    pub max_attempts: u32,
    /// Delay between attempts
    pub backoff_ms: u64,
}

/// Circuit breaker configured on a dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,
    /// Seconds before a half-open probe
    pub reset_timeout_secs: u64,
}

/// Default latency SLA in milliseconds
pub const DEFAULT_LATENCY_SLA_MS: f64 = 1000.0;

/// Default tolerated error rate
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.05;

/// Default call timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

/// A directed "source depends on target" relationship.
///
/// At most one edge exists per ordered `(source_id, target_id)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The dependent system
    pub source_id: SystemId,

    /// The system being depended on
    pub target_id: SystemId,

    /// Kind of dependency
    pub dependency_type: DependencyType,

    /// Dependency strength in `[0, 1]`
    pub weight: f64,

    /// Expected latency in milliseconds
    #[serde(default = "default_latency_sla")]
    pub latency_sla: f64,

    /// Tolerated error rate
    #[serde(default = "default_error_threshold")]
    pub error_threshold: f64,

    /// Call timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Retry configuration, if any
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,

    /// Circuit breaker configuration, if any
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerConfig>,

    /// Free-form attributes
    #[serde(default)]
    pub metadata: Metadata,

    /// When the dependency was recorded
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// When the dependency was last confirmed to exist
    #[serde(default)]
    pub last_verified: Option<DateTime<Utc>>,
}

fn default_latency_sla() -> f64 {
    DEFAULT_LATENCY_SLA_MS
}

fn default_error_threshold() -> f64 {
    DEFAULT_ERROR_THRESHOLD
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

impl DependencyEdge {
    /// Create an edge with default SLA settings. `weight` is clamped to `[0, 1]`.
    pub fn new(
        source_id: impl Into<SystemId>,
        target_id: impl Into<SystemId>,
        dependency_type: DependencyType,
        weight: f64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            dependency_type,
            weight: clamp_unit(weight),
            latency_sla: DEFAULT_LATENCY_SLA_MS,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            timeout: DEFAULT_TIMEOUT_SECS,
            retry_policy: None,
            circuit_breaker: None,
            metadata: Metadata::new(),
            created_at: Utc::now(),
            last_verified: None,
        }
    }

    /// Attach a circuit breaker.
    #[must_use]
    pub fn with_circuit_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    /// Attach a retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Whether a circuit breaker protects this edge.
    pub fn has_circuit_breaker(&self) -> bool {
        self.circuit_breaker.is_some()
    }
}

/// An observed or hypothesized fault on one system.
///
/// Cause fields are fixed at creation; resolution is recorded through
/// [`FailureEvent::resolve`], which returns an updated copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEvent {
    /// The failing system
    pub system_id: SystemId,

    /// Kind of fault
    pub failure_type: FailureType,

    /// How bad it is
    pub severity: Severity,

    /// Operator-facing description
    pub description: String,

    /// When the fault was observed
    pub timestamp: DateTime<Utc>,

    /// When the fault was resolved
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,

    /// Identified root cause
    #[serde(default)]
    pub root_cause: Option<String>,

    /// Minutes from observation to resolution
    #[serde(default)]
    pub recovery_time: Option<f64>,

    /// Users known to be affected
    #[serde(default)]
    pub affected_users: Option<u64>,

    /// Known financial impact
    #[serde(default)]
    pub financial_impact: Option<f64>,
}

impl FailureEvent {
    /// Create an unresolved failure stamped with the current time.
    pub fn new(
        system_id: impl Into<SystemId>,
        failure_type: FailureType,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            failure_type,
            severity,
            description: description.into(),
            timestamp: Utc::now(),
            resolved_at: None,
            root_cause: None,
            recovery_time: None,
            affected_users: None,
            financial_impact: None,
        }
    }

    /// Whether the failure has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// Return a copy marked resolved now, with recovery time derived from
    /// the original timestamp.
    #[must_use]
    pub fn resolve(&self, root_cause: Option<String>) -> Self {
        let resolved_at = Utc::now();
        #[allow(clippy::cast_precision_loss)]
        let minutes = (resolved_at - self.timestamp).num_milliseconds().max(0) as f64 / 60_000.0;
        Self {
            resolved_at: Some(resolved_at),
            root_cause: root_cause.or_else(|| self.root_cause.clone()),
            recovery_time: Some(minutes),
            ..self.clone()
        }
    }
}

/// Clamp a probability or weight into `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_equality_is_by_id() {
        let a = SystemNode::new("db", "Primary", SystemType::Database);
        let b = SystemNode::new("db", "Replica", SystemType::Cache);
        assert_eq!(a, b);
    }

    #[test]
    fn test_edge_weight_is_clamped() {
        let edge = DependencyEdge::new("a", "b", DependencyType::Synchronous, 1.7);
        assert!((edge.weight - 1.0).abs() < f64::EPSILON);
        let edge = DependencyEdge::new("a", "b", DependencyType::Synchronous, -0.3);
        assert!(edge.weight.abs() < f64::EPSILON);
    }

    #[test]
    fn test_severity_downgrade_floors_at_negligible() {
        assert_eq!(Severity::Critical.downgrade(), Severity::High);
        assert_eq!(Severity::Negligible.downgrade(), Severity::Negligible);
    }

    #[test]
    fn test_redundancy_marker() {
        let node = SystemNode::new("db", "db", SystemType::Database);
        assert!(!node.is_redundant());
        assert!(node.clone().with_metadata("redundant", serde_json::json!(true)).is_redundant());
        assert!(node.with_metadata("replicas", serde_json::json!(3)).is_redundant());
    }

    #[test]
    fn test_enum_serde_names() {
        let json = serde_json::to_string(&SystemType::KubernetesPod).unwrap();
        assert_eq!(json, "\"kubernetes_pod\"");
        let parsed: DependencyType = serde_json::from_str("\"shared_resource\"").unwrap();
        assert_eq!(parsed, DependencyType::SharedResource);
        assert_eq!(FailureType::DataCorruption.to_string(), "data_corruption");
    }

    #[test]
    fn test_resolve_keeps_cause() {
        let event = FailureEvent::new("db", FailureType::ServiceDown, Severity::High, "down");
        let resolved = event.resolve(Some("disk full".to_string()));
        assert!(resolved.is_resolved());
        assert!(!event.is_resolved());
        assert_eq!(resolved.failure_type, event.failure_type);
        assert_eq!(resolved.root_cause.as_deref(), Some("disk full"));
        assert!(resolved.recovery_time.unwrap() >= 0.0);
    }
}
