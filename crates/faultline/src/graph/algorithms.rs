//! Structural graph algorithms over an index-based adjacency snapshot.
//!
//! Every algorithm here runs over [`Adjacency`], which orders nodes by id and
//! sorts each neighbour list, so results are reproducible regardless of the
//! insertion order of the underlying petgraph storage. Searches use explicit
//! stacks and queues rather than recursion.

use crate::domain::SystemId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::warn;

/// PageRank damping factor.
pub const PAGERANK_DAMPING: f64 = 0.85;

/// Upper bound on PageRank power iterations.
pub const PAGERANK_MAX_ITERATIONS: usize = 100;

/// Per-node convergence tolerance for PageRank (scaled by node count).
pub const PAGERANK_TOLERANCE: f64 = 1.0e-6;

/// Structural importance of one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CentralityScores {
    /// `(in + out) / (n - 1)`; can reach 2.0 in a fully bidirectional graph
    pub degree: f64,
    /// `in / (n - 1)`
    pub in_degree: f64,
    /// `out / (n - 1)`
    pub out_degree: f64,
    /// Inverse mean distance to reachable nodes, scaled by reachable fraction
    pub closeness: f64,
    /// Fraction of ordered-pair shortest paths passing through the node
    pub betweenness: f64,
    /// Weighted PageRank; sums to 1.0 over the graph
    pub pagerank: f64,
}

impl CentralityScores {
    /// Blend used for single-point-of-failure detection:
    /// `0.4 * betweenness + 0.3 * degree + 0.3 * pagerank`.
    pub fn combined(&self) -> f64 {
        0.4 * self.betweenness + 0.3 * self.degree + 0.3 * self.pagerank
    }
}

/// Index-based, id-sorted view of the graph.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    /// Node ids in ascending order; position is the node index.
    pub ids: Vec<SystemId>,
    /// Reverse lookup from id to index.
    pub index: HashMap<SystemId, usize>,
    /// Outgoing edges `(target, weight)` sorted by target index.
    pub out: Vec<Vec<(usize, f64)>>,
    /// Incoming neighbours sorted by source index.
    pub inc: Vec<Vec<usize>>,
}

impl Adjacency {
    /// Build from ids and `(source, target, weight)` triples.
    ///
    /// Edges naming unknown ids are skipped.
    pub fn build<'a>(
        ids: impl IntoIterator<Item = SystemId>,
        edges: impl IntoIterator<Item = (&'a SystemId, &'a SystemId, f64)>,
    ) -> Self {
        let mut ids: Vec<SystemId> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();

        let index: HashMap<SystemId, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut out = vec![Vec::new(); ids.len()];
        let mut inc = vec![Vec::new(); ids.len()];
        for (source, target, weight) in edges {
            let (Some(&s), Some(&t)) = (index.get(source), index.get(target)) else {
                continue;
            };
            out[s].push((t, weight));
            inc[t].push(s);
        }
        for list in &mut out {
            list.sort_by_key(|(t, _)| *t);
        }
        for list in &mut inc {
            list.sort_unstable();
        }

        Self {
            ids,
            index,
            out,
            inc,
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn successors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.out[node].iter().map(|(t, _)| *t)
    }

    fn to_ids(&self, path: &[usize]) -> Vec<SystemId> {
        path.iter().map(|&i| self.ids[i].clone()).collect()
    }
}

/// Fewest-hop path from `source` to `target`, inclusive of both ends.
///
/// Neighbours are explored in id order, so among equally short paths the
/// lexicographically smallest by id is returned.
pub fn shortest_path(adj: &Adjacency, source: &str, target: &str) -> Option<Vec<SystemId>> {
    let &s = adj.index.get(source)?;
    let &t = adj.index.get(target)?;
    if s == t {
        return Some(adj.to_ids(&[s]));
    }

    let mut parent: Vec<Option<usize>> = vec![None; adj.len()];
    let mut seen = vec![false; adj.len()];
    let mut queue = VecDeque::new();
    seen[s] = true;
    queue.push_back(s);

    while let Some(current) = queue.pop_front() {
        for next in adj.successors(current) {
            if seen[next] {
                continue;
            }
            seen[next] = true;
            parent[next] = Some(current);
            if next == t {
                let mut path = vec![t];
                let mut cursor = t;
                while let Some(p) = parent[cursor] {
                    path.push(p);
                    cursor = p;
                }
                path.reverse();
                return Some(adj.to_ids(&path));
            }
            queue.push_back(next);
        }
    }

    None
}

/// All simple paths from `source` to `target` with at most `max_length` hops.
///
/// Returns an empty list when either end is unknown or `source == target`.
pub fn all_paths(
    adj: &Adjacency,
    source: &str,
    target: &str,
    max_length: usize,
) -> Vec<Vec<SystemId>> {
    let (Some(&s), Some(&t)) = (adj.index.get(source), adj.index.get(target)) else {
        return Vec::new();
    };
    if s == t || max_length == 0 {
        return Vec::new();
    }

    let mut paths = Vec::new();
    let mut on_path = vec![false; adj.len()];
    let mut path = vec![s];
    // Each frame holds the node and the position of the next child to try.
    let mut stack: Vec<(usize, usize)> = vec![(s, 0)];
    on_path[s] = true;

    while let Some((node, child)) = stack.last_mut() {
        let node = *node;
        let hops = path.len() - 1;
        let next = adj.out[node].get(*child).map(|(n, _)| *n);
        *child += 1;

        match next {
            Some(next) if hops < max_length && !on_path[next] => {
                if next == t {
                    let mut found = path.clone();
                    found.push(t);
                    paths.push(adj.to_ids(&found));
                } else if hops + 1 < max_length {
                    on_path[next] = true;
                    path.push(next);
                    stack.push((next, 0));
                }
            }
            Some(_) => {}
            None => {
                stack.pop();
                path.pop();
                on_path[node] = false;
            }
        }
    }

    paths
}

/// All elementary cycles, each rotated to start at its smallest id.
///
/// A cycle is found once, from its smallest member, by a depth-first search
/// restricted to larger-indexed nodes. `max_iterations` caps the number of
/// stack expansions; when it is exhausted the cycles found so far are
/// returned and a warning is logged.
pub fn detect_cycles(adj: &Adjacency, max_iterations: usize) -> Vec<Vec<SystemId>> {
    let mut cycles = Vec::new();
    let mut budget = max_iterations;

    for start in 0..adj.len() {
        let mut on_path = vec![false; adj.len()];
        let mut path = vec![start];
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        on_path[start] = true;

        while let Some((node, child)) = stack.last_mut() {
            let node = *node;
            let next = adj.out[node].get(*child).map(|(n, _)| *n);
            *child += 1;

            match next {
                Some(next) if next == start => cycles.push(adj.to_ids(&path)),
                Some(next) if next > start && !on_path[next] => {
                    if budget == 0 {
                        warn!(
                            found = cycles.len(),
                            max_iterations, "Cycle search budget exhausted, results truncated"
                        );
                        return cycles;
                    }
                    budget -= 1;
                    on_path[next] = true;
                    path.push(next);
                    stack.push((next, 0));
                }
                Some(_) => {}
                None => {
                    stack.pop();
                    path.pop();
                    on_path[node] = false;
                }
            }
        }
    }

    cycles
}

/// Hop distances from `source` to every node reachable from it.
fn bfs_distances(adj: &Adjacency, source: usize) -> Vec<Option<usize>> {
    let mut dist = vec![None; adj.len()];
    let mut queue = VecDeque::new();
    dist[source] = Some(0);
    queue.push_back(source);
    while let Some(current) = queue.pop_front() {
        let d = dist[current].unwrap_or(0);
        for next in adj.successors(current) {
            if dist[next].is_none() {
                dist[next] = Some(d + 1);
                queue.push_back(next);
            }
        }
    }
    dist
}

/// Compute every centrality measure for every node.
#[allow(clippy::cast_precision_loss)]
pub fn centrality(adj: &Adjacency) -> Vec<CentralityScores> {
    let n = adj.len();
    let mut scores = vec![CentralityScores::default(); n];
    if n == 0 {
        return scores;
    }

    if n > 1 {
        let scale = 1.0 / (n - 1) as f64;
        for (i, score) in scores.iter_mut().enumerate() {
            score.in_degree = adj.inc[i].len() as f64 * scale;
            score.out_degree = adj.out[i].len() as f64 * scale;
            score.degree = score.in_degree + score.out_degree;
        }

        for (i, score) in scores.iter_mut().enumerate() {
            let dist = bfs_distances(adj, i);
            let (reachable, total) = dist
                .iter()
                .flatten()
                .filter(|&&d| d > 0)
                .fold((0usize, 0usize), |(r, t), &d| (r + 1, t + d));
            if total > 0 {
                let r = reachable as f64;
                score.closeness = (r / total as f64) * (r * scale);
            }
        }
    }

    let betweenness = betweenness(adj);
    let pagerank = pagerank(adj);
    for (i, score) in scores.iter_mut().enumerate() {
        score.betweenness = betweenness[i];
        score.pagerank = pagerank[i];
    }

    scores
}

/// Brandes' algorithm on the unweighted directed graph, normalized by
/// `(n - 1)(n - 2)`.
#[allow(clippy::cast_precision_loss)]
fn betweenness(adj: &Adjacency) -> Vec<f64> {
    let n = adj.len();
    let mut centrality = vec![0.0; n];
    if n <= 2 {
        return centrality;
    }

    for s in 0..n {
        let mut order = Vec::with_capacity(n);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist: Vec<Option<usize>> = vec![None; n];
        sigma[s] = 1.0;
        dist[s] = Some(0);

        let mut queue = VecDeque::from([s]);
        while let Some(v) = queue.pop_front() {
            order.push(v);
            let dv = dist[v].unwrap_or(0);
            for w in adj.successors(v) {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if dist[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0_f64; n];
        while let Some(w) = order.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }

    let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
    for value in &mut centrality {
        *value *= scale;
    }
    centrality
}

/// Weighted PageRank with uniform teleport and dangling-mass redistribution.
#[allow(clippy::cast_precision_loss)]
fn pagerank(adj: &Adjacency) -> Vec<f64> {
    let n = adj.len();
    if n == 0 {
        return Vec::new();
    }
    let uniform = 1.0 / n as f64;
    let out_weight: Vec<f64> = adj
        .out
        .iter()
        .map(|edges| edges.iter().map(|(_, w)| *w).sum())
        .collect();

    let mut rank = vec![uniform; n];
    for _ in 0..PAGERANK_MAX_ITERATIONS {
        let dangling: f64 = (0..n)
            .filter(|&u| out_weight[u] <= 0.0)
            .map(|u| rank[u])
            .sum();

        let base = (1.0 - PAGERANK_DAMPING) * uniform + PAGERANK_DAMPING * dangling * uniform;
        let mut next = vec![base; n];
        for u in 0..n {
            if out_weight[u] <= 0.0 {
                continue;
            }
            for &(v, w) in &adj.out[u] {
                next[v] += PAGERANK_DAMPING * rank[u] * w / out_weight[u];
            }
        }

        let error: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if error < n as f64 * PAGERANK_TOLERANCE {
            break;
        }
    }
    rank
}
