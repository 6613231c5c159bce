//! Thresholded, aggregated interaction graph.

use std::collections::HashMap;

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::error::{Error, Result};
use crate::input::EdgeRecord;

/// Simple undirected weighted graph keyed by canonical node identity.
///
/// Node indices follow the first appearance of each identity in the surviving
/// records; edge indices follow the first appearance of each unordered pair.
#[derive(Debug, Clone, Default)]
pub struct InteractionGraph {
    graph: UnGraph<String, f64>,
    node_indices: HashMap<String, NodeIndex>,
    degrees: Vec<f64>,
}

impl InteractionGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn index_of(&self, key: &str) -> Option<NodeIndex> {
        self.node_indices.get(key).copied()
    }

    pub fn key(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    pub fn contains(&self, key: &str) -> bool {
        self.node_indices.contains_key(key)
    }

    /// Node identities in index order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(String::as_str)
    }

    /// `(source, target, weight)` in edge index order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].as_str(),
                self.graph[e.target()].as_str(),
                *e.weight(),
            )
        })
    }

    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        let (a, b) = (self.index_of(a)?, self.index_of(b)?);
        self.graph.find_edge(a, b).map(|e| self.graph[e])
    }

    /// Sum of incident edge weights per node, in index order.
    /// A self-loop touches its node twice and counts twice.
    pub fn weighted_degrees(&self) -> Vec<f64> {
        self.degrees.clone()
    }

    pub fn weighted_degree(&self, key: &str) -> Option<f64> {
        self.index_of(key).map(|idx| self.degrees[idx.index()])
    }

    pub fn as_petgraph(&self) -> &UnGraph<String, f64> {
        &self.graph
    }

    fn node_or_insert(&mut self, key: &str) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(key) {
            return idx;
        }
        let idx = self.graph.add_node(key.to_string());
        self.node_indices.insert(key.to_string(), idx);
        self.degrees.push(0.0);
        idx
    }

    /// Adds `weight` to the pair total and to both endpoint degrees. Fails once
    /// any of those running sums stops being finite.
    fn accumulate(&mut self, source: &str, target: &str, weight: f64) -> Result<EdgeIndex> {
        let a = self.node_or_insert(source);
        let b = self.node_or_insert(target);
        let edge = match self.graph.find_edge(a, b) {
            Some(edge) => {
                self.graph[edge] += weight;
                edge
            }
            None => self.graph.add_edge(a, b, weight),
        };
        self.degrees[a.index()] += weight;
        self.degrees[b.index()] += weight;

        let sums = [self.graph[edge], self.degrees[a.index()], self.degrees[b.index()]];
        if sums.iter().all(|w| w.is_finite()) {
            Ok(edge)
        } else {
            Err(Error::WeightOverflow {
                node_a: source.to_string(),
                node_b: target.to_string(),
            })
        }
    }
}

/// Folds raw records into an [`InteractionGraph`].
///
/// Each record is tested against the threshold on its own weight before it is
/// added to its pair's running total; the aggregate itself is never re-tested.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder {
    threshold: f64,
}

impl GraphBuilder {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn build<'a, I>(&self, records: I) -> Result<InteractionGraph>
    where
        I: IntoIterator<Item = &'a EdgeRecord>,
    {
        let mut graph = InteractionGraph::default();
        for record in records {
            if record.weight >= self.threshold {
                graph.accumulate(&record.source, &record.target, record.weight)?;
            }
        }
        Ok(graph)
    }
}
