//! The dependency tracker: graph owner, analysis front door and monitor.
//!
//! # Lock Ordering
//!
//! The tracker holds two locks:
//! 1. the graph `RwLock` (one lock for the whole graph)
//! 2. the history `Mutex`
//!
//! The graph lock is always released before the history lock is taken, and
//! no lock is held across a collaborator call (probe or alert sink).
//!
//! # Monitoring
//!
//! [`DependencyTracker::run_monitoring`] is the only writer of system status.
//! Each tick probes every system concurrently, each probe bounded by the
//! configured timeout, then spawns failure handling per unhealthy system so
//! slow analysis or alert delivery never delays the next tick.

use crate::cascade::{CascadeAnalyzer, CascadeFailure};
use crate::config::TrackerConfig;
use crate::domain::{
    DependencyEdge, FailureEvent, FailureType, SystemId, SystemNode, SystemStatus,
};
use crate::error::Result;
use crate::graph::{CentralityScores, DependencyGraph, GraphDocument, GraphMetrics};
use crate::health::{Alert, AlertChannel, AlertSink, HealthProbe, HealthReport, LoggingAlertSink};
use crate::impact::{ImpactAnalysis, ImpactCalculator};
use crate::optimization::{OptimizationEngine, OptimizationSuggestion};
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, watch};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};

/// What to do for one system during recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Fix the system that failed first
    RestoreRootCause,
    /// Check a dependent and restore it if it did not recover on its own
    VerifyAndRestore,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RestoreRootCause => write!(f, "restore_root_cause"),
            Self::VerifyAndRestore => write!(f, "verify_and_restore"),
        }
    }
}

/// One step of a recovery plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStep {
    /// System to act on
    pub system_id: SystemId,
    /// 1-based position in the plan
    pub priority: usize,
    /// What to do
    pub action: RecoveryAction,
    /// Operator-facing instruction
    pub description: String,
    /// Estimated minutes to complete
    pub estimated_minutes: f64,
}

/// Bounded buffers of recent activity.
#[derive(Debug, Default)]
struct History {
    failures: VecDeque<FailureEvent>,
    cascades: VecDeque<CascadeFailure>,
    analysis_time: f64,
}

impl History {
    fn record_failure(&mut self, failure: FailureEvent, limit: usize) {
        if self.failures.len() >= limit {
            self.failures.pop_front();
        }
        self.failures.push_back(failure);
    }

    fn record_cascade(&mut self, cascade: CascadeFailure, limit: usize) {
        if self.cascades.len() >= limit {
            self.cascades.pop_front();
        }
        self.cascades.push_back(cascade);
    }
}

/// Owns the dependency graph and runs every analysis against it.
///
/// Cloning is cheap and yields a handle to the same graph and history.
#[derive(Clone)]
pub struct DependencyTracker {
    graph: Arc<RwLock<DependencyGraph>>,
    history: Arc<Mutex<History>>,
    alerts: Arc<dyn AlertSink>,
    impact: ImpactCalculator,
    cascade: CascadeAnalyzer,
    optimizer: OptimizationEngine,
    config: TrackerConfig,
}

impl fmt::Debug for DependencyTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyTracker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for DependencyTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl DependencyTracker {
    /// Create a tracker with an empty graph that logs its alerts.
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_graph(DependencyGraph::new(), config)
    }

    /// Create a tracker around an existing graph.
    pub fn with_graph(graph: DependencyGraph, config: TrackerConfig) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            history: Arc::new(Mutex::new(History::default())),
            alerts: Arc::new(LoggingAlertSink),
            impact: ImpactCalculator::new(),
            cascade: CascadeAnalyzer::new(),
            optimizer: OptimizationEngine::with_spof_threshold(config.spof_centrality_threshold),
            config,
        }
    }

    /// Replace the alert sink.
    #[must_use]
    pub fn with_alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    /// The tracker's configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Shared read access to the graph.
    pub async fn graph(&self) -> RwLockReadGuard<'_, DependencyGraph> {
        self.graph.read().await
    }

    // ========== Graph mutation ==========

    /// Insert or update a system.
    pub async fn add_system(&self, node: SystemNode) {
        self.graph.write().await.add_system(node);
    }

    /// Insert or update a dependency.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownSystem` if either endpoint is missing.
    pub async fn add_dependency(&self, edge: DependencyEdge) -> Result<()> {
        self.graph.write().await.add_dependency(edge)
    }

    /// Remove a system and its edges.
    pub async fn remove_system(&self, id: &str) -> Option<SystemNode> {
        self.graph.write().await.remove_system(id)
    }

    /// Remove one dependency. Returns whether it existed.
    pub async fn remove_dependency(&self, source: &str, target: &str) -> bool {
        self.graph.write().await.remove_dependency(source, target)
    }

    // ========== Health ==========

    /// Record a health observation and classify it.
    ///
    /// Returns a failure when the system is not healthy. Reports for systems
    /// that are not in the graph are logged and ignored.
    pub async fn report_health(&self, report: &HealthReport) -> Option<FailureEvent> {
        let node = {
            let mut graph = self.graph.write().await;
            if !graph.update_status(report.system_id.as_str(), report.status, Utc::now()) {
                warn!(system_id = %report.system_id, "Health report for unknown system");
                return None;
            }
            graph.system(report.system_id.as_str())?.clone()
        };
        classify_failure(&node, report, &self.config)
    }

    /// Probe every system concurrently and record the results.
    ///
    /// A probe that errors or exceeds the configured timeout is recorded as
    /// `unknown`. Returns the failures found in this round, ordered by id.
    pub async fn check_health(&self, probe: &dyn HealthProbe) -> Vec<FailureEvent> {
        let systems: Vec<SystemNode> = {
            let graph = self.graph.read().await;
            let mut systems: Vec<SystemNode> = graph.systems().cloned().collect();
            systems.sort_by(|a, b| a.id.cmp(&b.id));
            systems
        };

        let probe_timeout = self.config.probe_timeout();
        let reports = join_all(systems.iter().map(|system| async move {
            match timeout(probe_timeout, probe.check(system)).await {
                Ok(Ok(report)) => report,
                Ok(Err(e)) => {
                    warn!(system_id = %system.id, error = %e, "Health probe failed");
                    HealthReport::unknown(system.id.clone())
                }
                Err(_) => {
                    warn!(system_id = %system.id, timeout = ?probe_timeout, "Health probe timed out");
                    HealthReport::unknown(system.id.clone())
                }
            }
        }))
        .await;

        let mut failures = Vec::new();
        for report in &reports {
            if let Some(failure) = self.report_health(report).await {
                failures.push(failure);
            }
        }
        debug!(probed = reports.len(), failures = failures.len(), "Health check complete");
        failures
    }

    /// Run the monitoring loop until `shutdown` becomes `true` or its sender
    /// is dropped.
    pub async fn run_monitoring(
        &self,
        probe: Arc<dyn HealthProbe>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(self.config.monitor_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.config.monitor_interval(), "Starting dependency monitoring");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for failure in self.check_health(probe.as_ref()).await {
                        let tracker = self.clone();
                        tokio::spawn(async move {
                            tracker.handle_failure(&failure).await;
                        });
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Stopped dependency monitoring");
    }

    /// Analyze a failure, record it and dispatch an alert.
    ///
    /// Alert delivery failures are logged, never returned.
    pub async fn handle_failure(&self, failure: &FailureEvent) -> Alert {
        let impact = self.analyze_cascade_impact(failure).await;
        let cascade = self.track_cascade_failure(failure).await;
        self.history
            .lock()
            .await
            .record_failure(failure.clone(), self.config.history_limit);

        let alert = Alert::from_analysis(failure, &impact, &cascade);
        let sent = match alert.channel {
            AlertChannel::Critical => self.alerts.send_critical(&alert).await,
            AlertChannel::Warning => self.alerts.send_warning(&alert).await,
        };
        if let Err(e) = sent {
            warn!(system_id = %failure.system_id, channel = %alert.channel, error = %e, "Alert delivery failed");
        }
        alert
    }

    // ========== Analysis ==========

    /// Quantify the blast radius of a failure.
    pub async fn analyze_cascade_impact(&self, failure: &FailureEvent) -> ImpactAnalysis {
        let started = Instant::now();
        let analysis = {
            let graph = self.graph.read().await;
            self.impact.calculate_impact(failure, &graph, 1.0)
        };
        self.history.lock().await.analysis_time = started.elapsed().as_secs_f64();
        analysis
    }

    /// Trace how a failure cascades and remember the trace.
    pub async fn track_cascade_failure(&self, failure: &FailureEvent) -> CascadeFailure {
        let cascade = {
            let graph = self.graph.read().await;
            self.cascade
                .analyze_cascade(failure, &graph, self.config.max_cascade_depth)
        };
        let mut history = self.history.lock().await;
        history.analysis_time = cascade.propagation_time;
        history.record_cascade(cascade.clone(), self.config.history_limit);
        cascade
    }

    /// Ordered recovery steps: the failed system first, then every other
    /// affected system by descending criticality.
    pub async fn generate_recovery_plan(&self, failure: &FailureEvent) -> Vec<RecoveryStep> {
        let graph = self.graph.read().await;
        let impact = self.impact.calculate_impact(failure, &graph, 1.0);
        let criticality = criticality_scores(&graph);
        drop(graph);

        let root = &failure.system_id;
        let mut steps = vec![RecoveryStep {
            system_id: root.clone(),
            priority: 1,
            action: RecoveryAction::RestoreRootCause,
            description: format!(
                "Restore {root} and resolve the {} failure",
                failure.failure_type
            ),
            estimated_minutes: impact.estimated_downtime.get(root).copied().unwrap_or(0.0),
        }];

        let mut dependents: Vec<(&SystemId, f64)> = impact
            .affected_systems
            .iter()
            .filter(|id| *id != root)
            .map(|id| (id, criticality.get(id).copied().unwrap_or(0.0)))
            .collect();
        dependents.sort_by(|(a_id, a), (b_id, b)| b.total_cmp(a).then_with(|| a_id.cmp(b_id)));

        for (id, _) in dependents {
            steps.push(RecoveryStep {
                system_id: id.clone(),
                priority: steps.len() + 1,
                action: RecoveryAction::VerifyAndRestore,
                description: format!("Verify {id} recovered after {root}; restart if still failing"),
                estimated_minutes: impact.estimated_downtime.get(id).copied().unwrap_or(0.0),
            });
        }
        steps
    }

    /// Systems whose betweenness centrality exceeds the SPOF threshold,
    /// most central first.
    pub async fn find_single_points_of_failure(&self) -> Vec<SystemId> {
        let metrics = self.graph.read().await.centrality_metrics();
        let mut spofs: Vec<(SystemId, f64)> = metrics
            .into_iter()
            .filter(|(_, scores)| scores.betweenness > self.config.spof_threshold)
            .map(|(id, scores)| (id, scores.betweenness))
            .collect();
        spofs.sort_by(|(a_id, a), (b_id, b)| b.total_cmp(a).then_with(|| a_id.cmp(b_id)));
        spofs.into_iter().map(|(id, _)| id).collect()
    }

    /// Criticality in `[0, 1]` for every system.
    pub async fn calculate_system_criticality(&self) -> BTreeMap<SystemId, f64> {
        criticality_scores(&*self.graph.read().await)
    }

    /// Structural improvement suggestions, highest priority first.
    pub async fn optimize_dependency_structure(&self) -> Vec<OptimizationSuggestion> {
        self.optimizer.optimize(&*self.graph.read().await)
    }

    /// Centrality measures for every system.
    pub async fn centrality_metrics(&self) -> BTreeMap<SystemId, CentralityScores> {
        self.graph.read().await.centrality_metrics()
    }

    /// Elementary cycles, bounded by the configured search budget.
    pub async fn detect_cycles(&self) -> Vec<Vec<SystemId>> {
        self.graph
            .read()
            .await
            .detect_cycles(self.config.cycle_search_budget)
    }

    /// Fewest-hop path between two systems.
    pub async fn shortest_path(&self, source: &str, target: &str) -> Option<Vec<SystemId>> {
        self.graph.read().await.shortest_path(source, target)
    }

    /// Simple paths between two systems, bounded by the configured length.
    pub async fn all_paths(&self, source: &str, target: &str) -> Vec<Vec<SystemId>> {
        self.graph
            .read()
            .await
            .all_paths(source, target, self.config.max_path_length)
    }

    // ========== History ==========

    /// Recent failures handled by the tracker, oldest first.
    pub async fn recent_failures(&self) -> Vec<FailureEvent> {
        self.history.lock().await.failures.iter().cloned().collect()
    }

    /// Recent cascade traces, oldest first.
    pub async fn recent_cascades(&self) -> Vec<CascadeFailure> {
        self.history.lock().await.cascades.iter().cloned().collect()
    }

    /// Size, timing and freshness of the graph.
    pub async fn graph_metrics(&self) -> GraphMetrics {
        let mut metrics = self.graph.read().await.metrics();
        metrics.analysis_time = self.history.lock().await.analysis_time;
        metrics
    }

    // ========== Serialization ==========

    /// Capture the graph and its metrics as a document.
    pub async fn serialize(&self) -> GraphDocument {
        let mut document = self.graph.read().await.to_document();
        document.metrics.analysis_time = self.history.lock().await.analysis_time;
        document
    }

    /// Replace the graph with one rebuilt from `document`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownSystem` if the document has a dangling edge; the
    /// current graph is left untouched.
    pub async fn deserialize(&self, document: GraphDocument) -> Result<()> {
        let graph = DependencyGraph::from_document(document)?;
        *self.graph.write().await = graph;
        Ok(())
    }
}

/// Turn a health observation into a failure, or `None` if healthy.
///
/// `down` is a service outage; otherwise a slow response or high error rate
/// is reported when past the configured thresholds, an `unknown` status is
/// a connection timeout and any other degradation is a slow response.
/// Severity comes from the system type and drops one level unless the system
/// is down.
pub fn classify_failure(
    node: &SystemNode,
    report: &HealthReport,
    config: &TrackerConfig,
) -> Option<FailureEvent> {
    if report.status == SystemStatus::Healthy {
        return None;
    }

    let failure_type = if report.status == SystemStatus::Down {
        FailureType::ServiceDown
    } else if report.response_time_ms > config.slow_response_ms {
        FailureType::SlowResponse
    } else if report.error_rate > config.error_rate_threshold {
        FailureType::HighErrorRate
    } else if report.status == SystemStatus::Unknown {
        FailureType::ConnectionTimeout
    } else {
        FailureType::SlowResponse
    };

    let mut severity = node.system_type.outage_severity();
    if report.status != SystemStatus::Down {
        severity = severity.downgrade();
    }

    let description = format!(
        "{} ({}) is {}: response {:.0}ms, error rate {:.1}%",
        node.name,
        node.id,
        report.status,
        report.response_time_ms,
        report.error_rate * 100.0
    );
    Some(FailureEvent::new(
        node.id.clone(),
        failure_type,
        severity,
        description,
    ))
}

/// `0.4 * min(combined centrality, 1) + 0.3 * type score + 0.3 * reach`,
/// where reach is the fraction of other systems that transitively depend on
/// the system.
#[allow(clippy::cast_precision_loss)]
fn criticality_scores(graph: &DependencyGraph) -> BTreeMap<SystemId, f64> {
    let others = graph.node_count().saturating_sub(1);
    graph
        .centrality_metrics()
        .into_iter()
        .map(|(id, scores)| {
            let type_score = graph
                .system(id.as_str())
                .map_or(0.0, |node| node.system_type.base_score());
            let reach = if others == 0 {
                0.0
            } else {
                transitive_dependents(graph, &id) as f64 / others as f64
            };
            let score = 0.4 * scores.combined().min(1.0) + 0.3 * type_score + 0.3 * reach;
            (id, score)
        })
        .collect()
}

fn transitive_dependents(graph: &DependencyGraph, id: &SystemId) -> usize {
    let mut seen: HashSet<SystemId> = HashSet::from([id.clone()]);
    let mut queue = VecDeque::from([id.clone()]);
    while let Some(current) = queue.pop_front() {
        for dependent in graph.dependents(current.as_str()) {
            if seen.insert(dependent.clone()) {
                queue.push_back(dependent);
            }
        }
    }
    seen.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyType, Severity, SystemType};

    fn report(id: &str, status: SystemStatus, response_time_ms: f64, error_rate: f64) -> HealthReport {
        HealthReport {
            system_id: id.into(),
            status,
            response_time_ms,
            error_rate,
        }
    }

    #[test]
    fn test_classify_down_keeps_base_severity() {
        let node = SystemNode::new("db", "Orders DB", SystemType::Database);
        let failure = classify_failure(
            &node,
            &report("db", SystemStatus::Down, 0.0, 1.0),
            &TrackerConfig::default(),
        )
        .unwrap();
        assert_eq!(failure.failure_type, FailureType::ServiceDown);
        assert_eq!(failure.severity, Severity::Critical);
    }

    #[test]
    fn test_classify_degraded_downgrades_severity() {
        let node = SystemNode::new("db", "Orders DB", SystemType::Database);
        let config = TrackerConfig::default();

        let slow = classify_failure(&node, &report("db", SystemStatus::Degraded, 6000.0, 0.0), &config)
            .unwrap();
        assert_eq!(slow.failure_type, FailureType::SlowResponse);
        assert_eq!(slow.severity, Severity::High);

        let errors =
            classify_failure(&node, &report("db", SystemStatus::Degraded, 100.0, 0.25), &config)
                .unwrap();
        assert_eq!(errors.failure_type, FailureType::HighErrorRate);
    }

    #[test]
    fn test_classify_healthy_is_none() {
        let node = SystemNode::new("web", "Web", SystemType::WebServer);
        let config = TrackerConfig::default();
        assert!(classify_failure(&node, &report("web", SystemStatus::Healthy, 9000.0, 0.5), &config).is_none());
    }

    #[test]
    fn test_classify_unknown_is_timeout() {
        let node = SystemNode::new("web", "Web", SystemType::WebServer);
        let failure = classify_failure(
            &node,
            &HealthReport::unknown("web"),
            &TrackerConfig::default(),
        )
        .unwrap();
        assert_eq!(failure.failure_type, FailureType::ConnectionTimeout);
        assert_eq!(failure.severity, Severity::Medium);
    }

    #[test]
    fn test_transitive_dependents() {
        let mut graph = DependencyGraph::new();
        for id in ["db", "api", "web"] {
            graph.add_system(SystemNode::new(id, id, SystemType::Microservice));
        }
        graph
            .add_dependency(DependencyEdge::new("api", "db", DependencyType::Synchronous, 1.0))
            .unwrap();
        graph
            .add_dependency(DependencyEdge::new("web", "api", DependencyType::Synchronous, 1.0))
            .unwrap();
        assert_eq!(transitive_dependents(&graph, &"db".into()), 2);
        assert_eq!(transitive_dependents(&graph, &"web".into()), 0);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let config = TrackerConfig {
            history_limit: 2,
            ..TrackerConfig::default()
        };
        let tracker = DependencyTracker::new(config);
        tracker
            .add_system(SystemNode::new("db", "db", SystemType::Database))
            .await;
        for _ in 0..3 {
            let failure = FailureEvent::new("db", FailureType::ServiceDown, Severity::Low, "x");
            tracker.handle_failure(&failure).await;
        }
        assert_eq!(tracker.recent_failures().await.len(), 2);
        assert_eq!(tracker.recent_cascades().await.len(), 2);
    }
}
