//! The service dependency graph.
//!
//! # Architecture
//!
//! - `petgraph::StableGraph` holds nodes and edges; indices stay valid across
//!   removals, so the id map never needs rebuilding
//! - `HashMap<SystemId, NodeIndex>` maps system ids to graph nodes
//! - Structural queries run over an id-sorted [`Adjacency`] snapshot (see
//!   [`algorithms`]) for reproducible output
//!
//! ## Edge Direction Convention
//!
//! Edges point from **dependent -> dependency**: an edge `api -> db` means
//! `api` requires `db` to function. [`DependencyGraph::dependencies`] follows
//! outgoing edges, [`DependencyGraph::dependents`] follows incoming edges, and
//! failures propagate against the edge direction (from `db` to `api`).
//!
//! # Thread Safety
//!
//! The graph itself is not synchronized. Owners that share it wrap it in a
//! single `RwLock`, so mutations are exclusive with every read.

pub mod algorithms;
mod document;

pub use algorithms::{Adjacency, CentralityScores};
pub use document::{GraphDocument, GraphMetrics};

use crate::domain::{DependencyEdge, SystemId, SystemNode, SystemStatus, clamp_unit};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Directed graph of systems and their dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node weights are systems, edge weights are dependency records.
    graph: StableDiGraph<SystemNode, DependencyEdge>,

    /// Mapping from `SystemId` to graph `NodeIndex`.
    ///
    /// Every node in `graph` has exactly one entry here.
    node_map: HashMap<SystemId, NodeIndex>,

    /// Seconds spent building the graph from a document, if it was loaded.
    build_time: f64,

    /// When the graph was last mutated.
    last_update: Option<DateTime<Utc>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a system, replacing the attributes of any existing system with
    /// the same id. Edges touching the system are kept.
    pub fn add_system(&mut self, node: SystemNode) {
        if let Some(&index) = self.node_map.get(&node.id) {
            debug!(system_id = %node.id, "Updating system");
            self.graph[index] = node;
        } else {
            debug!(system_id = %node.id, system_type = %node.system_type, "Adding system");
            let id = node.id.clone();
            let index = self.graph.add_node(node);
            self.node_map.insert(id, index);
        }
        self.touch();
    }

    /// Insert or replace the edge for `(source_id, target_id)`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownSystem` if either endpoint is not in the graph.
    /// Nodes are never created implicitly.
    pub fn add_dependency(&mut self, mut edge: DependencyEdge) -> Result<()> {
        let source = self.index_of(edge.source_id.as_str())?;
        let target = self.index_of(edge.target_id.as_str())?;
        edge.weight = clamp_unit(edge.weight);

        debug!(
            source = %edge.source_id,
            target = %edge.target_id,
            dependency_type = %edge.dependency_type,
            weight = edge.weight,
            "Adding dependency"
        );

        if let Some(existing) = self.graph.find_edge(source, target) {
            self.graph[existing] = edge;
        } else {
            self.graph.add_edge(source, target, edge);
        }
        self.touch();
        Ok(())
    }

    /// Remove a system and every edge touching it.
    ///
    /// Returns the removed system, or `None` if it was not present.
    pub fn remove_system(&mut self, id: &str) -> Option<SystemNode> {
        let index = self.node_map.remove(id)?;
        let node = self.graph.remove_node(index);
        debug!(system_id = id, "Removed system");
        self.touch();
        node
    }

    /// Remove the edge `source -> target`. Returns whether an edge existed.
    pub fn remove_dependency(&mut self, source: &str, target: &str) -> bool {
        let (Some(&s), Some(&t)) = (self.node_map.get(source), self.node_map.get(target)) else {
            return false;
        };
        let Some(edge) = self.graph.find_edge(s, t) else {
            return false;
        };
        self.graph.remove_edge(edge);
        self.touch();
        true
    }

    /// Record a health observation. Returns `false` if the system is unknown.
    pub fn update_status(&mut self, id: &str, status: SystemStatus, at: DateTime<Utc>) -> bool {
        let Some(&index) = self.node_map.get(id) else {
            return false;
        };
        let node = &mut self.graph[index];
        node.status = status;
        node.last_health_check = Some(at);
        true
    }

    /// Look up a system by id.
    pub fn system(&self, id: &str) -> Option<&SystemNode> {
        self.node_map.get(id).map(|&index| &self.graph[index])
    }

    /// Whether a system with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    /// Look up the edge `source -> target`.
    pub fn edge(&self, source: &str, target: &str) -> Option<&DependencyEdge> {
        let s = *self.node_map.get(source)?;
        let t = *self.node_map.get(target)?;
        self.graph.find_edge(s, t).map(|e| &self.graph[e])
    }

    /// All systems, in storage order.
    pub fn systems(&self) -> impl Iterator<Item = &SystemNode> {
        self.graph.node_indices().map(|index| &self.graph[index])
    }

    /// All system ids, sorted.
    pub fn system_ids(&self) -> Vec<SystemId> {
        let mut ids: Vec<SystemId> = self.node_map.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All edges, in storage order.
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.graph.edge_indices().map(|index| &self.graph[index])
    }

    /// Number of systems.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of dependencies.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Ids of the systems `id` depends on, sorted. Empty if `id` is unknown.
    pub fn dependencies(&self, id: &str) -> Vec<SystemId> {
        self.dependency_edges(id)
            .into_iter()
            .map(|edge| edge.target_id.clone())
            .collect()
    }

    /// Ids of the systems that depend on `id`, sorted. Empty if `id` is unknown.
    pub fn dependents(&self, id: &str) -> Vec<SystemId> {
        self.dependent_edges(id)
            .into_iter()
            .map(|edge| edge.source_id.clone())
            .collect()
    }

    /// Outgoing edges of `id`, sorted by target id.
    pub fn dependency_edges(&self, id: &str) -> Vec<&DependencyEdge> {
        self.edges_directed(id, Direction::Outgoing, |e| &e.target_id)
    }

    /// Incoming edges of `id`, sorted by source id.
    pub fn dependent_edges(&self, id: &str) -> Vec<&DependencyEdge> {
        self.edges_directed(id, Direction::Incoming, |e| &e.source_id)
    }

    fn edges_directed(
        &self,
        id: &str,
        direction: Direction,
        key: fn(&DependencyEdge) -> &SystemId,
    ) -> Vec<&DependencyEdge> {
        let Some(&index) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<&DependencyEdge> = self
            .graph
            .edges_directed(index, direction)
            .map(|e| e.weight())
            .collect();
        edges.sort_by(|a, b| key(a).cmp(key(b)));
        edges
    }

    /// Id-sorted adjacency snapshot for the structural algorithms.
    pub fn adjacency(&self) -> Adjacency {
        Adjacency::build(
            self.node_map.keys().cloned(),
            self.edges().map(|e| (&e.source_id, &e.target_id, e.weight)),
        )
    }

    /// Fewest-hop path from `source` to `target`, or `None` if there is none.
    pub fn shortest_path(&self, source: &str, target: &str) -> Option<Vec<SystemId>> {
        algorithms::shortest_path(&self.adjacency(), source, target)
    }

    /// Every simple path from `source` to `target` of at most `max_length` hops.
    pub fn all_paths(&self, source: &str, target: &str, max_length: usize) -> Vec<Vec<SystemId>> {
        algorithms::all_paths(&self.adjacency(), source, target, max_length)
    }

    /// Every elementary cycle, searched with at most `max_iterations` expansions.
    pub fn detect_cycles(&self, max_iterations: usize) -> Vec<Vec<SystemId>> {
        algorithms::detect_cycles(&self.adjacency(), max_iterations)
    }

    /// Degree, closeness, betweenness and PageRank for every system.
    pub fn centrality_metrics(&self) -> BTreeMap<SystemId, CentralityScores> {
        let adj = self.adjacency();
        let scores = algorithms::centrality(&adj);
        adj.ids.into_iter().zip(scores).collect()
    }

    /// Metrics describing the current graph.
    pub fn metrics(&self) -> GraphMetrics {
        GraphMetrics {
            graph_build_time: self.build_time,
            analysis_time: 0.0,
            nodes_count: self.node_count(),
            edges_count: self.edge_count(),
            last_update: self.last_update,
        }
    }

    fn index_of(&self, id: &str) -> Result<NodeIndex> {
        self.node_map
            .get(id)
            .copied()
            .ok_or_else(|| Error::unknown_system(id))
    }

    fn touch(&mut self) {
        self.last_update = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyType, SystemType};

    fn graph_with(ids: &[&str]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for id in ids {
            graph.add_system(SystemNode::new(*id, *id, SystemType::Microservice));
        }
        graph
    }

    #[test]
    fn test_add_system_is_upsert() {
        let mut graph = graph_with(&["a"]);
        graph.add_system(SystemNode::new("a", "renamed", SystemType::Database));
        assert_eq!(graph.node_count(), 1);
        let node = graph.system("a").unwrap();
        assert_eq!(node.name, "renamed");
        assert_eq!(node.system_type, SystemType::Database);
    }

    #[test]
    fn test_add_dependency_requires_both_endpoints() {
        let mut graph = graph_with(&["a"]);
        let err = graph
            .add_dependency(DependencyEdge::new("a", "b", DependencyType::Synchronous, 1.0))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSystem { ref system_id } if system_id == "b"));
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_add_dependency_overwrites_pair() {
        let mut graph = graph_with(&["a", "b"]);
        graph
            .add_dependency(DependencyEdge::new("a", "b", DependencyType::Synchronous, 1.0))
            .unwrap();
        graph
            .add_dependency(DependencyEdge::new("a", "b", DependencyType::Batch, 0.3))
            .unwrap();
        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edge("a", "b").unwrap();
        assert_eq!(edge.dependency_type, DependencyType::Batch);
    }

    #[test]
    fn test_remove_system_drops_incident_edges() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph
            .add_dependency(DependencyEdge::new("a", "b", DependencyType::Synchronous, 1.0))
            .unwrap();
        graph
            .add_dependency(DependencyEdge::new("b", "c", DependencyType::Synchronous, 1.0))
            .unwrap();
        assert!(graph.remove_system("b").is_some());
        assert!(graph.remove_system("b").is_none());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.dependencies("a").is_empty());
        assert!(graph.dependents("c").is_empty());
    }

    #[test]
    fn test_dependencies_and_dependents_are_sorted() {
        let mut graph = graph_with(&["api", "db", "cache", "queue"]);
        for target in ["queue", "db", "cache"] {
            graph
                .add_dependency(DependencyEdge::new(
                    "api",
                    target,
                    DependencyType::Synchronous,
                    1.0,
                ))
                .unwrap();
        }
        let expected: Vec<SystemId> = vec!["cache".into(), "db".into(), "queue".into()];
        assert_eq!(graph.dependencies("api"), expected);
        assert_eq!(graph.dependents("db"), vec![SystemId::from("api")]);
        assert!(graph.dependencies("missing").is_empty());
    }

    #[test]
    fn test_update_status_unknown_system() {
        let mut graph = graph_with(&["a"]);
        assert!(graph.update_status("a", SystemStatus::Down, Utc::now()));
        assert_eq!(graph.system("a").unwrap().status, SystemStatus::Down);
        assert!(!graph.update_status("zzz", SystemStatus::Down, Utc::now()));
    }
}
