//! Deterministic force-directed layout.

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::graph::InteractionGraph;

const NODE_MASS: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Spring layout driven by a [`ForceGraph`] simulation.
///
/// Nodes are scattered over a `spread`-sided square from a seeded RNG, the
/// simulation advances a fixed number of `time_step` updates, and the result is
/// recentred at the origin and scaled so the largest absolute coordinate equals
/// `scale`. Identical graph, seed and parameters give bit-identical positions.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    fn parameters(&self) -> SimulationParameters {
        SimulationParameters {
            force_charge: self.config.force_charge,
            force_spring: self.config.force_spring,
            force_max: self.config.force_max,
            node_speed: self.config.node_speed,
            damping_factor: self.config.damping_factor,
        }
    }

    /// One position per node, in graph index order.
    pub fn compute(&self, graph: &InteractionGraph) -> Vec<Position> {
        let n = graph.node_count();
        match n {
            0 => return Vec::new(),
            1 => return vec![Position { x: 0.0, y: 0.0 }],
            _ => {}
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let spread = self.config.spread;
        let mut sim: ForceGraph<usize, ()> = ForceGraph::new(self.parameters());
        let pg = graph.as_petgraph();
        let handles: Vec<_> = pg
            .node_indices()
            .map(|idx| {
                sim.add_node(NodeData {
                    x: rng.gen_range(0.0..1.0f32) * spread,
                    y: rng.gen_range(0.0..1.0f32) * spread,
                    mass: NODE_MASS,
                    is_anchor: false,
                    user_data: idx.index(),
                })
            })
            .collect();
        // self-loops carry no spring
        for edge in pg.edge_references().filter(|e| e.source() != e.target()) {
            sim.add_edge(
                handles[edge.source().index()],
                handles[edge.target().index()],
                EdgeData::default(),
            );
        }

        for _ in 0..self.config.iterations {
            sim.update(self.config.time_step);
        }
        debug!(nodes = n, steps = self.config.iterations, "layout simulated");

        let mut pos = vec![(0.0, 0.0); n];
        sim.visit_nodes(|node| {
            pos[node.data.user_data] = (f64::from(node.x()), f64::from(node.y()));
        });
        rescale(&mut pos, self.config.scale);
        pos.into_iter().map(|(x, y)| Position { x, y }).collect()
    }
}

fn rescale(pos: &mut [(f64, f64)], scale: f64) {
    let n = pos.len() as f64;
    let (cx, cy) = pos
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    let (cx, cy) = (cx / n, cy / n);
    let mut limit: f64 = 0.0;
    for p in pos.iter_mut() {
        p.0 -= cx;
        p.1 -= cy;
        limit = limit.max(p.0.abs()).max(p.1.abs());
    }
    if limit > 0.0 {
        for p in pos.iter_mut() {
            p.0 *= scale / limit;
            p.1 *= scale / limit;
        }
    }
}
