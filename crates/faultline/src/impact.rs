//! Aggregate blast-radius scoring for a single failure.
//!
//! The calculator walks from the failed system to everything that depends on
//! it, attenuating a propagation probability across each edge by the edge's
//! weight and its dependency type's transmission factor. Systems whose
//! probability falls to the threshold or below are not reached.

use crate::domain::{FailureEvent, FailureType, SystemId, clamp_unit};
use crate::graph::DependencyGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::{debug, warn};

/// Probability at or below which impact stops propagating.
pub const IMPACT_PROPAGATION_THRESHOLD: f64 = 0.05;

/// Affected-system count above which incident response is recommended.
pub const ESCALATION_THRESHOLD: usize = 5;

/// Affected-system count above which a major incident is recommended.
pub const MAJOR_INCIDENT_THRESHOLD: usize = 10;

/// Quantified impact of one failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    /// System that failed
    pub system_id: SystemId,
    /// Every system reached by propagation, including the failed one
    pub affected_systems: BTreeSet<SystemId>,
    /// Impact score per affected system
    pub impact_scores: BTreeMap<SystemId, f64>,
    /// Estimated minutes of downtime per affected system
    pub estimated_downtime: BTreeMap<SystemId, f64>,
    /// Estimated users affected
    pub user_impact: u64,
    /// Estimated revenue lost
    pub revenue_impact: f64,
    /// Order in which affected systems should be restored
    pub recovery_priority: Vec<SystemId>,
    /// Suggested mitigations
    pub mitigation_strategies: Vec<String>,
    /// Set when the failed system was not in the graph and the analysis is
    /// a placeholder
    #[serde(default)]
    pub degraded: bool,
}

impl ImpactAnalysis {
    /// Sum of all impact scores.
    pub fn total_impact_score(&self) -> f64 {
        self.impact_scores.values().sum()
    }
}

/// Translates a failure into a quantified blast radius.
#[derive(Debug, Clone, Copy)]
pub struct ImpactCalculator {
    threshold: f64,
}

impl Default for ImpactCalculator {
    fn default() -> Self {
        Self {
            threshold: IMPACT_PROPAGATION_THRESHOLD,
        }
    }
}

impl ImpactCalculator {
    /// Create a calculator with the default propagation threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the impact of `failure`, starting with propagation probability
    /// `failure_probability` at the failed system.
    ///
    /// A dependent's score never exceeds the score of the system it was
    /// reached from, so the failed system always scores highest.
    ///
    /// An unknown `failure.system_id` yields a zero-scored analysis flagged
    /// as [`ImpactAnalysis::degraded`] rather than an error.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn calculate_impact(
        &self,
        failure: &FailureEvent,
        graph: &DependencyGraph,
        failure_probability: f64,
    ) -> ImpactAnalysis {
        let root = &failure.system_id;
        if !graph.contains(root.as_str()) {
            warn!(system_id = %root, "Impact requested for unknown system, returning degraded analysis");
            return degraded_analysis(failure);
        }

        let severity = failure.severity.weight();
        let downtime_multiplier = failure.failure_type.downtime_multiplier();

        let mut analysis = ImpactAnalysis {
            system_id: root.clone(),
            ..ImpactAnalysis::default()
        };
        let mut visited: HashSet<SystemId> = HashSet::from([root.clone()]);
        let mut queue: VecDeque<(SystemId, f64, f64)> =
            VecDeque::from([(root.clone(), clamp_unit(failure_probability), f64::INFINITY)]);
        let mut users = 0.0;

        while let Some((id, probability, ceiling)) = queue.pop_front() {
            let Some(node) = graph.system(id.as_str()) else {
                continue;
            };
            let system_type = node.system_type;

            let score = (system_type.base_score() * severity * probability).min(ceiling);
            let downtime = system_type.base_recovery_minutes() * downtime_multiplier;

            users += system_type.user_weight() * score;
            analysis.revenue_impact += system_type.revenue_per_minute() * downtime;
            analysis.impact_scores.insert(id.clone(), score);
            analysis.estimated_downtime.insert(id.clone(), downtime);
            analysis.affected_systems.insert(id.clone());

            for edge in graph.dependent_edges(id.as_str()) {
                if visited.contains(&edge.source_id) {
                    continue;
                }
                let next = probability * edge.weight * edge.dependency_type.transmission_factor();
                if next > self.threshold {
                    visited.insert(edge.source_id.clone());
                    queue.push_back((edge.source_id.clone(), next, score));
                }
            }
        }

        analysis.user_impact = users.round().max(0.0) as u64;
        analysis.recovery_priority = recovery_priority(&analysis, graph);
        analysis.mitigation_strategies =
            mitigation_strategies(failure.failure_type, analysis.affected_systems.len());

        debug!(
            system_id = %root,
            affected = analysis.affected_systems.len(),
            user_impact = analysis.user_impact,
            revenue_impact = analysis.revenue_impact,
            "Calculated impact"
        );
        analysis
    }
}

fn degraded_analysis(failure: &FailureEvent) -> ImpactAnalysis {
    let id = failure.system_id.clone();
    ImpactAnalysis {
        system_id: id.clone(),
        affected_systems: BTreeSet::from([id.clone()]),
        impact_scores: BTreeMap::from([(id.clone(), 0.0)]),
        estimated_downtime: BTreeMap::from([(id.clone(), 0.0)]),
        user_impact: 0,
        revenue_impact: 0.0,
        recovery_priority: vec![id],
        mitigation_strategies: mitigation_strategies(failure.failure_type, 1),
        degraded: true,
    }
}

/// Order affected systems for recovery: the failed system first, then the
/// rest by `0.4 * impact + 0.3 * dependents + 0.3 * type weight`, highest
/// first, ties broken by id.
#[allow(clippy::cast_precision_loss)]
fn recovery_priority(analysis: &ImpactAnalysis, graph: &DependencyGraph) -> Vec<SystemId> {
    let root = &analysis.system_id;
    let mut ranked: Vec<(SystemId, f64)> = analysis
        .impact_scores
        .iter()
        .filter(|(id, _)| *id != root)
        .map(|(id, &score)| {
            let dependents = graph.dependents(id.as_str()).len() as f64;
            let type_weight = graph
                .system(id.as_str())
                .map_or(0.0, |node| node.system_type.recovery_weight());
            (id.clone(), 0.4 * score + 0.3 * dependents + 0.3 * type_weight)
        })
        .collect();

    ranked.sort_by(|(a_id, a), (b_id, b)| b.total_cmp(a).then_with(|| a_id.cmp(b_id)));
    std::iter::once(root.clone())
        .chain(ranked.into_iter().map(|(id, _)| id))
        .collect()
}

/// Mitigation playbook for a failure type, with escalation steps appended
/// for wide blast radii.
pub fn mitigation_strategies(failure_type: FailureType, affected: usize) -> Vec<String> {
    let playbook: &[&str] = match failure_type {
        FailureType::ServiceDown => &[
            "Enable circuit breakers on callers of the failed service",
            "Route traffic to backup instances",
            "Scale out healthy replicas",
        ],
        FailureType::SlowResponse => &[
            "Tighten client timeouts",
            "Serve hot paths from cache",
            "Optimize slow database queries",
        ],
        FailureType::HighErrorRate => &[
            "Roll back the most recent deployment",
            "Enable retries with exponential backoff",
            "Shed non-critical traffic",
        ],
        FailureType::ResourceExhaustion => &[
            "Scale up compute and memory",
            "Apply rate limiting",
            "Recycle leaking processes",
        ],
        FailureType::ConnectionTimeout => &[
            "Verify network paths and DNS",
            "Increase connection pool size",
            "Fail over to a secondary region",
        ],
        FailureType::AuthenticationFailure => &[
            "Rotate and redeploy credentials",
            "Check identity provider health",
            "Verify certificate validity",
        ],
        FailureType::DataCorruption => &[
            "Stop writes to the affected store",
            "Restore from the last verified backup",
            "Run data integrity checks",
        ],
        FailureType::ConfigurationError => &[
            "Revert to the last known good configuration",
            "Validate configuration before rollout",
            "Audit recent configuration changes",
        ],
    };

    let mut strategies: Vec<String> = playbook.iter().map(ToString::to_string).collect();
    if affected > ESCALATION_THRESHOLD {
        strategies.push(format!(
            "Activate incident response team: {affected} systems affected"
        ));
    }
    if affected > MAJOR_INCIDENT_THRESHOLD {
        strategies.push("Declare a major incident and notify stakeholders".to_string());
    }
    strategies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyEdge, DependencyType, Severity, SystemNode, SystemType};

    fn api_db_graph(dependency_type: DependencyType, weight: f64) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph.add_system(SystemNode::new("db", "Database", SystemType::Database));
        graph.add_system(SystemNode::new("api", "Gateway", SystemType::ApiGateway));
        graph
            .add_dependency(DependencyEdge::new("api", "db", dependency_type, weight))
            .unwrap();
        graph
    }

    fn outage(id: &str) -> FailureEvent {
        FailureEvent::new(id, FailureType::ServiceDown, Severity::Critical, "outage")
    }

    #[test]
    fn test_database_outage_reaches_gateway() {
        let graph = api_db_graph(DependencyType::Synchronous, 1.0);
        let analysis = ImpactCalculator::new().calculate_impact(&outage("db"), &graph, 1.0);

        assert!(!analysis.degraded);
        assert!(analysis.affected_systems.contains("db"));
        assert!(analysis.affected_systems.contains("api"));
        assert!(analysis.impact_scores["db"] > analysis.impact_scores["api"]);
        assert_eq!(analysis.recovery_priority[0].as_str(), "db");
        assert!((analysis.estimated_downtime["db"] - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_weak_edge_stops_propagation() {
        let graph = api_db_graph(DependencyType::Configuration, 0.2);
        let analysis = ImpactCalculator::new().calculate_impact(&outage("db"), &graph, 1.0);
        // 1.0 * 0.2 * 0.2 = 0.04, below the 0.05 threshold
        assert_eq!(analysis.affected_systems.len(), 1);
    }

    #[test]
    fn test_unknown_system_is_degraded() {
        let graph = api_db_graph(DependencyType::Synchronous, 1.0);
        let analysis = ImpactCalculator::new().calculate_impact(&outage("ghost"), &graph, 1.0);
        assert!(analysis.degraded);
        assert_eq!(analysis.affected_systems.len(), 1);
        assert!(analysis.impact_scores["ghost"].abs() < f64::EPSILON);
        assert_eq!(analysis.user_impact, 0);
    }

    #[test]
    fn test_dependent_never_outscores_source() {
        let mut graph = DependencyGraph::new();
        graph.add_system(SystemNode::new("cache", "Cache", SystemType::Cache));
        graph.add_system(SystemNode::new("db", "Database", SystemType::Database));
        graph
            .add_dependency(DependencyEdge::new("db", "cache", DependencyType::Synchronous, 1.0))
            .unwrap();
        let analysis = ImpactCalculator::new().calculate_impact(&outage("cache"), &graph, 1.0);
        assert!(analysis.impact_scores["db"] <= analysis.impact_scores["cache"]);
    }

    #[test]
    fn test_failed_system_recovers_first_despite_busier_dependent() {
        let mut graph = DependencyGraph::new();
        graph.add_system(SystemNode::new("cache", "Cache", SystemType::Cache));
        graph.add_system(SystemNode::new("gw", "Gateway", SystemType::ApiGateway));
        graph
            .add_dependency(DependencyEdge::new("gw", "cache", DependencyType::Synchronous, 1.0))
            .unwrap();
        for id in ["w1", "w2", "w3"] {
            graph.add_system(SystemNode::new(id, id, SystemType::WebServer));
            graph
                .add_dependency(DependencyEdge::new(id, "gw", DependencyType::Synchronous, 1.0))
                .unwrap();
        }

        let analysis = ImpactCalculator::new().calculate_impact(&outage("cache"), &graph, 1.0);
        let order: Vec<&str> = analysis.recovery_priority.iter().map(SystemId::as_str).collect();
        assert_eq!(order.len(), 5);
        assert_eq!(order[0], "cache");
        assert_eq!(order[1], "gw");
    }

    #[test]
    fn test_escalation_strategies() {
        assert_eq!(mitigation_strategies(FailureType::ServiceDown, 1).len(), 3);
        assert_eq!(mitigation_strategies(FailureType::ServiceDown, 6).len(), 4);
        assert_eq!(mitigation_strategies(FailureType::ServiceDown, 11).len(), 5);
    }
}
