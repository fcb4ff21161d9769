//! Common graph fixtures shared across integration tests.

#![allow(dead_code)]

use faultline::domain::{
    DependencyEdge, DependencyType, FailureEvent, FailureType, Severity, SystemNode, SystemType,
};
use faultline::graph::DependencyGraph;

/// Build a graph from `(id, type)` systems and `(source, target, type, weight)` edges.
pub fn build_graph(
    systems: &[(&str, SystemType)],
    edges: &[(&str, &str, DependencyType, f64)],
) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (id, system_type) in systems {
        graph.add_system(SystemNode::new(*id, *id, *system_type));
    }
    for (source, target, dependency_type, weight) in edges {
        graph
            .add_dependency(DependencyEdge::new(*source, *target, *dependency_type, *weight))
            .unwrap();
    }
    graph
}

/// A small storefront: two web servers behind a gateway, an orders service
/// backed by a database and a cache, and an async notification path.
///
/// ```text
/// web-a ─┐
///        ├─> gateway ─> orders ─┬─> orders-db
/// web-b ─┘                      ├─> cache ─> orders-db
///                               └~> queue ~> notifier
/// ```
pub fn storefront() -> DependencyGraph {
    use DependencyType::{Asynchronous, Data, Synchronous};
    build_graph(
        &[
            ("web-a", SystemType::WebServer),
            ("web-b", SystemType::WebServer),
            ("gateway", SystemType::ApiGateway),
            ("orders", SystemType::Microservice),
            ("orders-db", SystemType::Database),
            ("cache", SystemType::Cache),
            ("queue", SystemType::MessageQueue),
            ("notifier", SystemType::Microservice),
        ],
        &[
            ("web-a", "gateway", Synchronous, 1.0),
            ("web-b", "gateway", Synchronous, 1.0),
            ("gateway", "orders", Synchronous, 0.9),
            ("orders", "orders-db", Data, 1.0),
            ("orders", "cache", Synchronous, 0.6),
            ("cache", "orders-db", Data, 0.8),
            ("orders", "queue", Asynchronous, 0.5),
            ("notifier", "queue", Asynchronous, 0.7),
        ],
    )
}

/// A critical outage on `id`.
pub fn outage(id: &str) -> FailureEvent {
    FailureEvent::new(id, FailureType::ServiceDown, Severity::Critical, "outage")
}
