//! Property tests for graph integrity and cascade propagation.

use faultline::cascade::{CascadeAnalyzer, CascadeStep};
use faultline::domain::{
    DependencyEdge, DependencyType, FailureEvent, FailureType, Severity, SystemId, SystemNode,
    SystemType,
};
use faultline::graph::DependencyGraph;
use faultline::impact::ImpactCalculator;
use proptest::prelude::*;
use std::collections::HashMap;

const DEPENDENCY_TYPES: [DependencyType; 7] = [
    DependencyType::Synchronous,
    DependencyType::Asynchronous,
    DependencyType::Batch,
    DependencyType::Streaming,
    DependencyType::Configuration,
    DependencyType::Data,
    DependencyType::SharedResource,
];

const FAILURE_TYPES: [FailureType; 8] = [
    FailureType::ServiceDown,
    FailureType::SlowResponse,
    FailureType::HighErrorRate,
    FailureType::ResourceExhaustion,
    FailureType::ConnectionTimeout,
    FailureType::AuthenticationFailure,
    FailureType::DataCorruption,
    FailureType::ConfigurationError,
];

/// `(source, target, dependency type, weight)` over `nodes` systems.
fn edge_strategy(nodes: usize) -> impl Strategy<Value = (usize, usize, usize, f64)> {
    (0..nodes, 0..nodes, 0..DEPENDENCY_TYPES.len(), 0.0f64..=1.0)
}

fn graph_from(nodes: usize, edges: &[(usize, usize, usize, f64)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for i in 0..nodes {
        graph.add_system(SystemNode::new(format!("s{i}"), format!("System {i}"), SystemType::Microservice));
    }
    for &(source, target, kind, weight) in edges {
        if source == target {
            continue;
        }
        graph
            .add_dependency(DependencyEdge::new(
                format!("s{source}"),
                format!("s{target}"),
                DEPENDENCY_TYPES[kind],
                weight,
            ))
            .unwrap();
    }
    graph
}

proptest! {
    #[test]
    fn cascade_probability_never_increases(
        nodes in 2usize..10,
        edges in prop::collection::vec(edge_strategy(10), 0..30),
        failure_kind in 0..FAILURE_TYPES.len(),
    ) {
        let edges: Vec<_> = edges.into_iter().filter(|(s, t, _, _)| *s < nodes && *t < nodes).collect();
        let graph = graph_from(nodes, &edges);
        let failure = FailureEvent::new("s0", FAILURE_TYPES[failure_kind], Severity::High, "generated");
        let cascade = CascadeAnalyzer::new().analyze_cascade(&failure, &graph, 10);

        prop_assert_eq!(cascade.steps.len(), cascade.cascade_path.len());
        for step in &cascade.steps {
            prop_assert!((0.0..=1.0).contains(&step.probability));
        }
        // Every step is bounded by the step it was reached from, one hop
        // shallower, across a real dependency edge.
        let by_id: HashMap<&SystemId, &CascadeStep> =
            cascade.steps.iter().map(|s| (&s.system_id, s)).collect();
        for step in cascade.steps.iter().skip(1) {
            let parent_id = step.reached_from.as_ref();
            prop_assert!(parent_id.is_some());
            let parent = by_id[parent_id.unwrap()];
            prop_assert!(step.probability <= parent.probability);
            prop_assert_eq!(step.depth, parent.depth + 1);
            prop_assert!(graph.edge(step.system_id.as_str(), parent.system_id.as_str()).is_some());
        }
        prop_assert!(cascade.steps[0].reached_from.is_none());
    }

    #[test]
    fn impact_source_scores_highest(
        nodes in 2usize..10,
        edges in prop::collection::vec(edge_strategy(10), 0..30),
    ) {
        let edges: Vec<_> = edges.into_iter().filter(|(s, t, _, _)| *s < nodes && *t < nodes).collect();
        let graph = graph_from(nodes, &edges);
        let failure = FailureEvent::new("s0", FailureType::ServiceDown, Severity::Critical, "generated");
        let impact = ImpactCalculator::new().calculate_impact(&failure, &graph, 1.0);

        let source = impact.impact_scores[&SystemId::from("s0")];
        for score in impact.impact_scores.values() {
            prop_assert!(*score <= source);
            prop_assert!(*score >= 0.0);
        }
    }

    #[test]
    fn removal_preserves_referential_integrity(
        nodes in 2usize..10,
        edges in prop::collection::vec(edge_strategy(10), 0..30),
        victim in 0usize..10,
    ) {
        let edges: Vec<_> = edges.into_iter().filter(|(s, t, _, _)| *s < nodes && *t < nodes).collect();
        let mut graph = graph_from(nodes, &edges);
        let victim = format!("s{}", victim % nodes);

        prop_assert!(graph.remove_system(&victim).is_some());
        prop_assert!(!graph.contains(&victim));
        for edge in graph.edges() {
            prop_assert!(graph.contains(edge.source_id.as_str()));
            prop_assert!(graph.contains(edge.target_id.as_str()));
            prop_assert!(edge.source_id.as_str() != victim && edge.target_id.as_str() != victim);
        }
    }

    #[test]
    fn repeated_add_system_is_idempotent(count in 1usize..20) {
        let mut graph = DependencyGraph::new();
        for i in 0..count {
            graph.add_system(SystemNode::new("db", format!("v{i}"), SystemType::Database));
        }
        prop_assert_eq!(graph.node_count(), 1);
        prop_assert_eq!(graph.system("db").map(|n| n.name.clone()), Some(format!("v{}", count - 1)));
    }
}
