//! Failure-independent structural improvement suggestions.
//!
//! The engine runs five read-only passes over the current graph and merges
//! their output, highest priority first:
//!
//! 1. Single points of failure (high combined centrality)
//! 2. Over-coupled systems (many outgoing dependencies)
//! 3. Critical infrastructure without redundancy
//! 4. Synchronous dependencies without circuit breakers
//! 5. Heavily-read data sources without caching

use crate::domain::{DependencyType, SystemId};
use crate::graph::DependencyGraph;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Combined centrality above which a system is a single point of failure.
pub const SPOF_CENTRALITY_THRESHOLD: f64 = 0.7;

/// Outgoing dependencies above which a system is considered over-coupled.
pub const COUPLING_THRESHOLD: usize = 5;

/// Dependents above which critical infrastructure needs redundancy.
pub const REDUNDANCY_DEPENDENTS_THRESHOLD: usize = 2;

/// Dependents above which a data source should sit behind a cache.
pub const CACHING_DEPENDENTS_THRESHOLD: usize = 3;

/// Kind of structural improvement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    /// Remove a single point of failure
    ReduceSpof,
    /// Split or decouple an over-connected system
    ReduceCoupling,
    /// Add a replica or standby
    AddRedundancy,
    /// Protect a synchronous call with a circuit breaker
    CircuitBreaker,
    /// Put a cache in front of a data source
    AddCaching,
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ReduceSpof => "reduce_spof",
            Self::ReduceCoupling => "reduce_coupling",
            Self::AddRedundancy => "add_redundancy",
            Self::CircuitBreaker => "circuit_breaker",
            Self::AddCaching => "add_caching",
        };
        write!(f, "{s}")
    }
}

/// Rough size of the work a suggestion implies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImplementationEffort {
    /// Hours
    Low,
    /// Days
    Medium,
    /// Weeks
    High,
}

impl fmt::Display for ImplementationEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        write!(f, "{s}")
    }
}

/// One proposed structural change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSuggestion {
    /// Kind of change
    pub suggestion_type: SuggestionType,
    /// What to do
    pub description: String,
    /// Systems the change touches
    pub affected_systems: Vec<SystemId>,
    /// What the change buys
    pub expected_benefit: String,
    /// Rough effort
    pub implementation_effort: ImplementationEffort,
    /// Ranking score; higher is more urgent
    pub priority_score: f64,
    /// Estimated cost to implement
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    /// Estimated yearly savings from avoided incidents
    #[serde(default)]
    pub estimated_savings: Option<f64>,
}

/// Proposes structural improvements without mutating the graph.
#[derive(Debug, Clone, Copy)]
pub struct OptimizationEngine {
    spof_threshold: f64,
}

impl Default for OptimizationEngine {
    fn default() -> Self {
        Self {
            spof_threshold: SPOF_CENTRALITY_THRESHOLD,
        }
    }
}

impl OptimizationEngine {
    /// Create an engine with the default SPOF threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom SPOF threshold.
    pub fn with_spof_threshold(spof_threshold: f64) -> Self {
        Self { spof_threshold }
    }

    /// Run every pass and return suggestions sorted by descending priority.
    pub fn optimize(&self, graph: &DependencyGraph) -> Vec<OptimizationSuggestion> {
        let mut suggestions = self.spof_suggestions(graph);
        suggestions.extend(coupling_suggestions(graph));
        suggestions.extend(redundancy_suggestions(graph));
        suggestions.extend(circuit_breaker_suggestions(graph));
        suggestions.extend(caching_suggestions(graph));

        suggestions.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
        debug!(count = suggestions.len(), "Generated optimization suggestions");
        suggestions
    }

    fn spof_suggestions(&self, graph: &DependencyGraph) -> Vec<OptimizationSuggestion> {
        graph
            .centrality_metrics()
            .into_iter()
            .filter_map(|(id, scores)| {
                let combined = scores.combined();
                (combined > self.spof_threshold).then(|| OptimizationSuggestion {
                    suggestion_type: SuggestionType::ReduceSpof,
                    description: format!(
                        "{id} is a single point of failure (centrality {combined:.2}); \
                         deploy redundant instances behind a failover mechanism"
                    ),
                    affected_systems: vec![id],
                    expected_benefit: "Removes a structural bottleneck whose failure \
                                       disconnects large parts of the fleet"
                        .to_string(),
                    implementation_effort: ImplementationEffort::High,
                    priority_score: 8.0 + combined.min(2.0),
                    estimated_cost: Some(10_000.0 * combined),
                    estimated_savings: Some(50_000.0 * combined),
                })
            })
            .collect()
    }
}

#[allow(clippy::cast_precision_loss)]
fn coupling_suggestions(graph: &DependencyGraph) -> Vec<OptimizationSuggestion> {
    graph
        .system_ids()
        .into_iter()
        .filter_map(|id| {
            let dependencies = graph.dependencies(id.as_str());
            let count = dependencies.len();
            (count > COUPLING_THRESHOLD).then(|| {
                let mut affected = vec![id.clone()];
                affected.extend(dependencies);
                OptimizationSuggestion {
                    suggestion_type: SuggestionType::ReduceCoupling,
                    description: format!(
                        "{id} depends on {count} systems; introduce a facade, \
                         event-driven integration or split responsibilities"
                    ),
                    affected_systems: affected,
                    expected_benefit: "Fewer failure paths into the system and simpler \
                                       change management"
                        .to_string(),
                    implementation_effort: ImplementationEffort::Medium,
                    priority_score: (5.0 + (count - COUPLING_THRESHOLD) as f64 * 0.5).min(8.0),
                    estimated_cost: Some(2_000.0 * count as f64),
                    estimated_savings: Some(3_000.0 * count as f64),
                }
            })
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn redundancy_suggestions(graph: &DependencyGraph) -> Vec<OptimizationSuggestion> {
    let mut suggestions = Vec::new();
    for id in graph.system_ids() {
        let Some(node) = graph.system(id.as_str()) else {
            continue;
        };
        if !node.system_type.needs_redundancy() || node.is_redundant() {
            continue;
        }
        let dependents = graph.dependents(id.as_str()).len();
        if dependents <= REDUNDANCY_DEPENDENTS_THRESHOLD {
            continue;
        }
        suggestions.push(OptimizationSuggestion {
            suggestion_type: SuggestionType::AddRedundancy,
            description: format!(
                "{} {id} serves {dependents} dependents without redundancy; add a replica or standby",
                node.system_type
            ),
            affected_systems: vec![id.clone()],
            expected_benefit: "Failover keeps dependents serving during an outage".to_string(),
            implementation_effort: ImplementationEffort::Medium,
            priority_score: (6.0 + dependents as f64 * 0.3).min(9.0),
            estimated_cost: Some(5_000.0 * node.system_type.base_score()),
            estimated_savings: Some(
                node.system_type.revenue_per_minute() * node.system_type.base_recovery_minutes(),
            ),
        });
    }
    suggestions
}

fn circuit_breaker_suggestions(graph: &DependencyGraph) -> Vec<OptimizationSuggestion> {
    let mut edges: Vec<_> = graph
        .edges()
        .filter(|edge| {
            edge.dependency_type == DependencyType::Synchronous
                && !edge.has_circuit_breaker()
        })
        .collect();
    edges.sort_by(|a, b| (&a.source_id, &a.target_id).cmp(&(&b.source_id, &b.target_id)));

    edges
        .into_iter()
        .map(|edge| OptimizationSuggestion {
            suggestion_type: SuggestionType::CircuitBreaker,
            description: format!(
                "Add a circuit breaker on the synchronous call {} -> {}",
                edge.source_id, edge.target_id
            ),
            affected_systems: vec![edge.source_id.clone(), edge.target_id.clone()],
            expected_benefit: "Fails fast instead of tying up callers when the dependency \
                               is unhealthy"
                .to_string(),
            implementation_effort: ImplementationEffort::Low,
            priority_score: 4.0 + 3.0 * edge.weight,
            estimated_cost: Some(500.0),
            estimated_savings: Some(2_000.0 * edge.weight),
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn caching_suggestions(graph: &DependencyGraph) -> Vec<OptimizationSuggestion> {
    let mut suggestions = Vec::new();
    for id in graph.system_ids() {
        let Some(node) = graph.system(id.as_str()) else {
            continue;
        };
        if !node.system_type.benefits_from_caching() {
            continue;
        }
        let dependents = graph.dependents(id.as_str()).len();
        if dependents <= CACHING_DEPENDENTS_THRESHOLD {
            continue;
        }
        suggestions.push(OptimizationSuggestion {
            suggestion_type: SuggestionType::AddCaching,
            description: format!(
                "{} {id} is read by {dependents} systems; add a caching layer",
                node.system_type
            ),
            affected_systems: vec![id.clone()],
            expected_benefit: "Absorbs read load and keeps serving stale data during outages"
                .to_string(),
            implementation_effort: ImplementationEffort::Medium,
            priority_score: (3.0 + dependents as f64 * 0.3).min(7.0),
            estimated_cost: Some(1_500.0),
            estimated_savings: Some(1_000.0 * dependents as f64),
        });
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CircuitBreakerConfig, DependencyEdge, DependencyType, SystemNode, SystemType,
    };

    fn add(graph: &mut DependencyGraph, id: &str, system_type: SystemType) {
        graph.add_system(SystemNode::new(id, id, system_type));
    }

    fn depend(graph: &mut DependencyGraph, source: &str, target: &str, dt: DependencyType) {
        graph
            .add_dependency(DependencyEdge::new(source, target, dt, 1.0))
            .unwrap();
    }

    fn of_type(
        suggestions: &[OptimizationSuggestion],
        kind: SuggestionType,
    ) -> Vec<&OptimizationSuggestion> {
        suggestions
            .iter()
            .filter(|s| s.suggestion_type == kind)
            .collect()
    }

    #[test]
    fn test_star_hub_is_reduce_spof_scaled_by_centrality() {
        let mut graph = DependencyGraph::new();
        add(&mut graph, "hub", SystemType::ApiGateway);
        for leaf in ["a", "b", "c", "d"] {
            add(&mut graph, leaf, SystemType::Microservice);
            depend(&mut graph, leaf, "hub", DependencyType::Synchronous);
            depend(&mut graph, "hub", leaf, DependencyType::Asynchronous);
        }
        let combined = graph.centrality_metrics()[&SystemId::from("hub")].combined();
        assert!(combined > SPOF_CENTRALITY_THRESHOLD);

        let suggestions = OptimizationEngine::new().optimize(&graph);
        let spof = of_type(&suggestions, SuggestionType::ReduceSpof);
        assert_eq!(spof.len(), 1);
        assert_eq!(spof[0].affected_systems, vec![SystemId::from("hub")]);
        assert_eq!(spof[0].implementation_effort, ImplementationEffort::High);
        assert!((spof[0].priority_score - (8.0 + combined.min(2.0))).abs() < 1e-9);
        assert!((spof[0].estimated_cost.unwrap() - 10_000.0 * combined).abs() < 1e-6);
        assert!((spof[0].estimated_savings.unwrap() - 50_000.0 * combined).abs() < 1e-6);
        assert_eq!(
            suggestions[0].suggestion_type,
            SuggestionType::ReduceSpof,
            "SPOF removal outranks every other pass"
        );
    }

    #[test]
    fn test_loosely_connected_graph_has_no_reduce_spof() {
        let mut graph = DependencyGraph::new();
        for id in ["a", "b", "c", "d", "e"] {
            add(&mut graph, id, SystemType::Microservice);
        }
        depend(&mut graph, "a", "b", DependencyType::Asynchronous);

        let metrics = graph.centrality_metrics();
        assert!(metrics.values().all(|s| s.combined() <= SPOF_CENTRALITY_THRESHOLD));
        let suggestions = OptimizationEngine::new().optimize(&graph);
        assert!(of_type(&suggestions, SuggestionType::ReduceSpof).is_empty());
    }

    #[test]
    fn test_coupling_lists_node_and_dependencies() {
        let mut graph = DependencyGraph::new();
        add(&mut graph, "hub", SystemType::Microservice);
        for i in 0..6 {
            let id = format!("svc{i}");
            add(&mut graph, &id, SystemType::Microservice);
            depend(&mut graph, "hub", &id, DependencyType::Asynchronous);
        }
        let suggestions = OptimizationEngine::new().optimize(&graph);
        let coupling = of_type(&suggestions, SuggestionType::ReduceCoupling);
        assert_eq!(coupling.len(), 1);
        assert_eq!(coupling[0].affected_systems.len(), 7);
        assert_eq!(coupling[0].affected_systems[0].as_str(), "hub");
    }

    #[test]
    fn test_redundancy_and_caching_for_shared_database() {
        let mut graph = DependencyGraph::new();
        add(&mut graph, "db", SystemType::Database);
        for i in 0..4 {
            let id = format!("svc{i}");
            add(&mut graph, &id, SystemType::Microservice);
            depend(&mut graph, &id, "db", DependencyType::Data);
        }
        let suggestions = OptimizationEngine::new().optimize(&graph);
        assert_eq!(of_type(&suggestions, SuggestionType::AddRedundancy).len(), 1);
        assert_eq!(of_type(&suggestions, SuggestionType::AddCaching).len(), 1);
    }

    #[test]
    fn test_redundant_database_is_not_flagged() {
        let mut graph = DependencyGraph::new();
        graph.add_system(
            SystemNode::new("db", "db", SystemType::Database)
                .with_metadata("replicas", serde_json::json!(2)),
        );
        for i in 0..3 {
            let id = format!("svc{i}");
            add(&mut graph, &id, SystemType::Microservice);
            depend(&mut graph, &id, "db", DependencyType::Data);
        }
        let suggestions = OptimizationEngine::new().optimize(&graph);
        assert!(of_type(&suggestions, SuggestionType::AddRedundancy).is_empty());
    }

    #[test]
    fn test_circuit_breaker_per_unprotected_synchronous_edge() {
        let mut graph = DependencyGraph::new();
        for id in ["a", "b", "c"] {
            add(&mut graph, id, SystemType::Microservice);
        }
        depend(&mut graph, "a", "b", DependencyType::Synchronous);
        depend(&mut graph, "a", "c", DependencyType::Asynchronous);
        graph
            .add_dependency(
                DependencyEdge::new("b", "c", DependencyType::Synchronous, 1.0)
                    .with_circuit_breaker(CircuitBreakerConfig {
                        failure_threshold: 5,
                        reset_timeout_secs: 30,
                    }),
            )
            .unwrap();
        let suggestions = OptimizationEngine::new().optimize(&graph);
        let breakers = of_type(&suggestions, SuggestionType::CircuitBreaker);
        assert_eq!(breakers.len(), 1);
        assert_eq!(breakers[0].affected_systems[0].as_str(), "a");
    }

    #[test]
    fn test_suggestions_sorted_by_priority() {
        let mut graph = DependencyGraph::new();
        add(&mut graph, "db", SystemType::Database);
        for i in 0..4 {
            let id = format!("svc{i}");
            add(&mut graph, &id, SystemType::Microservice);
            depend(&mut graph, &id, "db", DependencyType::Synchronous);
        }
        let suggestions = OptimizationEngine::new().optimize(&graph);
        assert!(
            suggestions
                .windows(2)
                .all(|w| w[0].priority_score >= w[1].priority_score)
        );
    }
}
