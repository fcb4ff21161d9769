//! Structured document form of a [`DependencyGraph`].
//!
//! The document is the exchange format between the graph and its collaborators
//! (config loaders, exporters, the CLI). It carries every node and edge
//! attribute, so `from_document(to_document(g))` reproduces `g`.

use super::DependencyGraph;
use crate::domain::{DependencyEdge, SystemId, SystemNode};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};

/// Timing and size metrics emitted with a serialized graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    /// Seconds spent building the graph from its last document
    #[serde(default)]
    pub graph_build_time: f64,
    /// Seconds spent in the most recent analysis
    #[serde(default)]
    pub analysis_time: f64,
    /// Number of systems
    #[serde(default)]
    pub nodes_count: usize,
    /// Number of dependencies
    #[serde(default)]
    pub edges_count: usize,
    /// When the graph was last mutated
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

/// Serialized graph: systems keyed by id, dependencies sorted by
/// `(source_id, target_id)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Systems keyed by id
    pub systems: BTreeMap<SystemId, SystemNode>,
    /// All dependencies
    pub dependencies: Vec<DependencyEdge>,
    /// Metrics at serialization time
    #[serde(default)]
    pub metrics: GraphMetrics,
}

impl GraphDocument {
    /// Parse a document from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` for malformed JSON or unknown enum values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if a metadata value cannot be encoded.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl DependencyGraph {
    /// Capture every system and dependency in document form.
    pub fn to_document(&self) -> GraphDocument {
        let systems = self
            .systems()
            .map(|node| (node.id.clone(), node.clone()))
            .collect();

        let mut dependencies: Vec<DependencyEdge> = self.edges().cloned().collect();
        dependencies.sort_by(|a, b| {
            (&a.source_id, &a.target_id).cmp(&(&b.source_id, &b.target_id))
        });

        GraphDocument {
            systems,
            dependencies,
            metrics: self.metrics(),
        }
    }

    /// Rebuild a graph from a document.
    ///
    /// Systems are inserted first, then dependencies, so edge order in the
    /// document does not matter. A system stored under a key that differs
    /// from its own `id` is inserted under its `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownSystem` if a dependency names a system the
    /// document does not contain.
    pub fn from_document(document: GraphDocument) -> Result<Self> {
        let started = Instant::now();
        let mut graph = Self::new();

        for (key, node) in document.systems {
            if key != node.id {
                warn!(key = %key, system_id = %node.id, "Document key does not match system id");
            }
            graph.add_system(node);
        }
        for edge in document.dependencies {
            graph.add_dependency(edge)?;
        }

        graph.build_time = started.elapsed().as_secs_f64();
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            build_time = graph.build_time,
            "Loaded dependency graph"
        );
        Ok(graph)
    }
}
