//! Hop-by-hop cascade tracing.
//!
//! Where [`crate::impact`] scores the aggregate blast radius, this module
//! produces one ordered narrative of how a failure spreads: the failed system
//! first, then each dependent in the order the failure reaches it.
//!
//! # Propagation
//!
//! Crossing an edge succeeds with probability
//! `cascade_probability(dependency_type) * weight * cascade_multiplier(failure_type)`,
//! clamped to `[0, 1]`. The running probability is the product along the
//! path, so it never increases from one hop to the next. A dependent is only
//! traced while that product stays above [`CASCADE_CUTOFF`].
//!
//! The trace is bounded twice by `max_depth`: no hop deeper than `max_depth`
//! and no more than `max_depth` entries in the path.

use crate::domain::{FailureEvent, SystemId, clamp_unit};
use crate::graph::DependencyGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::time::Instant;
use tracing::{debug, warn};

/// Probability at or below which a cascade stops spreading.
pub const CASCADE_CUTOFF: f64 = 0.1;

/// Default bound on cascade depth and trace length.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// One system in a cascade trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeStep {
    /// System reached
    pub system_id: SystemId,
    /// Hops from the failed system
    pub depth: usize,
    /// Probability the failure reaches this system
    pub probability: f64,
    /// System the failure crossed from; `None` for the failed system
    #[serde(default)]
    pub reached_from: Option<SystemId>,
}

/// Propagation trace for one failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeFailure {
    /// The failure that started the cascade
    pub root_failure: FailureEvent,
    /// Systems in the order the failure reaches them, root first
    pub cascade_path: Vec<SystemId>,
    /// Same systems as `cascade_path`, as a set
    pub affected_systems: BTreeSet<SystemId>,
    /// Sum of `base_score * probability` over the trace
    pub total_impact_score: f64,
    /// Wall-clock seconds spent computing the trace
    pub propagation_time: f64,
    /// Depth and probability of every traced system, in path order
    pub steps: Vec<CascadeStep>,
}

impl CascadeFailure {
    /// Number of systems affected beyond the root.
    pub fn cascade_size(&self) -> usize {
        self.cascade_path.len().saturating_sub(1)
    }
}

/// Simulates how a single failure propagates through dependents.
#[derive(Debug, Clone, Copy)]
pub struct CascadeAnalyzer {
    cutoff: f64,
}

impl Default for CascadeAnalyzer {
    fn default() -> Self {
        Self {
            cutoff: CASCADE_CUTOFF,
        }
    }
}

impl CascadeAnalyzer {
    /// Create an analyzer with the default cutoff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trace the cascade started by `failure`.
    ///
    /// A failure on an unknown system yields a trace containing only that id.
    pub fn analyze_cascade(
        &self,
        failure: &FailureEvent,
        graph: &DependencyGraph,
        max_depth: usize,
    ) -> CascadeFailure {
        let started = Instant::now();
        let root = failure.system_id.clone();
        let multiplier = failure.failure_type.cascade_multiplier();

        let mut trace = CascadeFailure {
            root_failure: failure.clone(),
            cascade_path: vec![root.clone()],
            affected_systems: BTreeSet::from([root.clone()]),
            total_impact_score: 0.0,
            propagation_time: 0.0,
            steps: vec![CascadeStep {
                system_id: root.clone(),
                depth: 0,
                probability: 1.0,
                reached_from: None,
            }],
        };

        match graph.system(root.as_str()) {
            Some(node) => trace.total_impact_score += node.system_type.base_score(),
            None => warn!(system_id = %root, "Cascade requested for unknown system"),
        }

        let mut queue: VecDeque<(SystemId, usize, f64)> = VecDeque::from([(root, 0, 1.0)]);

        'trace: while let Some((id, depth, probability)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }

            for edge in graph.dependent_edges(id.as_str()) {
                if trace.affected_systems.contains(&edge.source_id) {
                    continue;
                }
                let crossing =
                    clamp_unit(edge.dependency_type.cascade_probability() * edge.weight * multiplier);
                let next = probability * crossing;
                if next <= self.cutoff {
                    continue;
                }
                if trace.cascade_path.len() >= max_depth {
                    break 'trace;
                }

                let dependent = edge.source_id.clone();
                if let Some(node) = graph.system(dependent.as_str()) {
                    trace.total_impact_score += node.system_type.base_score() * next;
                }
                trace.cascade_path.push(dependent.clone());
                trace.affected_systems.insert(dependent.clone());
                trace.steps.push(CascadeStep {
                    system_id: dependent.clone(),
                    depth: depth + 1,
                    probability: next,
                    reached_from: Some(id.clone()),
                });
                queue.push_back((dependent, depth + 1, next));
            }
        }

        trace.propagation_time = started.elapsed().as_secs_f64();
        debug!(
            system_id = %failure.system_id,
            cascade_size = trace.cascade_size(),
            total_impact = trace.total_impact_score,
            "Traced cascade"
        );
        trace
    }
}
