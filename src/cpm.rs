//! Overlapping community detection by clique percolation.
//!
//! A community is the union of all maximal cliques of size >= k that can reach
//! each other through pairs sharing at least k - 1 nodes. Enumeration runs over
//! nodes ordered by key, so community ids are reproducible: they follow the
//! lexicographically smallest clique of each percolation component.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::InteractionGraph;

pub type CommunityId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Community {
    pub id: CommunityId,
    pub members: BTreeSet<String>,
}

impl Community {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }
}

/// Nodes ranked by key with self-loop free adjacency in rank space.
struct RankedGraph {
    nodes: Vec<NodeIndex>,
    adjacency: Vec<BTreeSet<usize>>,
}

impl RankedGraph {
    fn new(graph: &InteractionGraph) -> Self {
        let pg = graph.as_petgraph();
        let mut nodes: Vec<NodeIndex> = pg.node_indices().collect();
        nodes.sort_by(|a, b| pg[*a].cmp(&pg[*b]));

        let mut rank = vec![0; pg.node_count()];
        for (r, idx) in nodes.iter().enumerate() {
            rank[idx.index()] = r;
        }
        let adjacency = nodes
            .iter()
            .map(|&idx| {
                pg.neighbors(idx)
                    .filter(|&n| n != idx)
                    .map(|n| rank[n.index()])
                    .collect()
            })
            .collect();
        Self { nodes, adjacency }
    }
}

struct CliqueSearch<'a> {
    adjacency: &'a [BTreeSet<usize>],
    max_cliques: Option<usize>,
    cancel: Option<&'a AtomicBool>,
    found: Vec<Vec<usize>>,
}

impl CliqueSearch<'_> {
    fn check_cancel(&self) -> Result<()> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    // Bron–Kerbosch with Tomita pivoting. Candidates are visited in ascending
    // rank and the pivot is the first vertex with the most candidate neighbours.
    fn expand(
        &mut self,
        clique: &mut Vec<usize>,
        mut p: BTreeSet<usize>,
        mut x: BTreeSet<usize>,
    ) -> Result<()> {
        self.check_cancel()?;
        if p.is_empty() {
            if x.is_empty() && !clique.is_empty() {
                if let Some(limit) = self.max_cliques {
                    if self.found.len() >= limit {
                        return Err(Error::CliqueLimitExceeded { limit });
                    }
                }
                let mut members = clique.clone();
                members.sort_unstable();
                self.found.push(members);
            }
            return Ok(());
        }

        let adjacency = self.adjacency;
        let pivot = p
            .iter()
            .chain(x.iter())
            .copied()
            .max_by(|&a, &b| {
                let da = adjacency[a].intersection(&p).count();
                let db = adjacency[b].intersection(&p).count();
                // ties resolve to the lower rank
                da.cmp(&db).then(b.cmp(&a))
            })
            .unwrap_or_default();
        let candidates: Vec<usize> = p.difference(&adjacency[pivot]).copied().collect();

        for v in candidates {
            let neighbours = &adjacency[v];
            clique.push(v);
            self.expand(
                clique,
                p.intersection(neighbours).copied().collect(),
                x.intersection(neighbours).copied().collect(),
            )?;
            clique.pop();
            p.remove(&v);
            x.insert(v);
        }
        Ok(())
    }
}

fn shared_count(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    shared
}

/// Clique-percolation community detector for one clique size `k`.
#[derive(Debug, Clone)]
pub struct CommunityDetector {
    k: usize,
    max_cliques: Option<usize>,
    cancel: Option<Arc<AtomicBool>>,
}

impl CommunityDetector {
    pub fn new(k: usize) -> Result<Self> {
        if k < 2 {
            return Err(Error::InvalidConfig(format!("k must be at least 2, got {k}")));
        }
        Ok(Self {
            k,
            max_cliques: None,
            cancel: None,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Fail with [`Error::CliqueLimitExceeded`] instead of enumerating past `limit`
    /// maximal cliques.
    pub fn with_max_cliques(mut self, limit: Option<usize>) -> Self {
        self.max_cliques = limit;
        self
    }

    /// Checked throughout enumeration; raising it aborts with [`Error::Cancelled`].
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Maximal cliques (any size) as sorted member keys, in lexicographic order.
    pub fn maximal_cliques(&self, graph: &InteractionGraph) -> Result<Vec<Vec<String>>> {
        let ranked = RankedGraph::new(graph);
        let cliques = self.enumerate(&ranked)?;
        Ok(cliques
            .into_iter()
            .map(|clique| {
                clique
                    .into_iter()
                    .map(|r| graph.key(ranked.nodes[r]).to_string())
                    .collect()
            })
            .collect())
    }

    fn enumerate(&self, ranked: &RankedGraph) -> Result<Vec<Vec<usize>>> {
        let mut search = CliqueSearch {
            adjacency: &ranked.adjacency,
            max_cliques: self.max_cliques,
            cancel: self.cancel.as_deref(),
            found: Vec::new(),
        };
        let all: BTreeSet<usize> = (0..ranked.nodes.len()).collect();
        search.expand(&mut Vec::new(), all, BTreeSet::new())?;
        let mut cliques = search.found;
        cliques.sort();
        Ok(cliques)
    }

    pub fn detect(&self, graph: &InteractionGraph) -> Result<Vec<Community>> {
        let ranked = RankedGraph::new(graph);
        let cliques: Vec<Vec<usize>> = self
            .enumerate(&ranked)?
            .into_iter()
            .filter(|c| c.len() >= self.k)
            .collect();
        debug!(k = self.k, cliques = cliques.len(), "maximal cliques retained");

        let mut memberships: Vec<Vec<usize>> = vec![Vec::new(); ranked.nodes.len()];
        for (ci, clique) in cliques.iter().enumerate() {
            for &node in clique {
                memberships[node].push(ci);
            }
        }

        let mut clique_graph: UnGraph<usize, ()> = UnGraph::with_capacity(cliques.len(), 0);
        let handles: Vec<NodeIndex> = (0..cliques.len())
            .map(|ci| clique_graph.add_node(ci))
            .collect();
        for (ci, clique) in cliques.iter().enumerate() {
            let mut seen = HashSet::new();
            for &node in clique {
                for &cj in &memberships[node] {
                    if cj > ci
                        && seen.insert(cj)
                        && shared_count(clique, &cliques[cj]) + 1 >= self.k
                    {
                        clique_graph.add_edge(handles[ci], handles[cj], ());
                    }
                }
            }
        }

        let mut components: Vec<Vec<usize>> = tarjan_scc(&clique_graph)
            .into_iter()
            .map(|component| {
                let mut members: Vec<usize> =
                    component.into_iter().map(|h| clique_graph[h]).collect();
                members.sort_unstable();
                members
            })
            .collect();
        components.sort_by_key(|c| c[0]);

        let communities = components
            .into_iter()
            .enumerate()
            .map(|(id, component)| {
                let members = component
                    .into_iter()
                    .flat_map(|ci| cliques[ci].iter())
                    .map(|&r| graph.key(ranked.nodes[r]).to_string())
                    .collect();
                Community { id, members }
            })
            .collect();
        Ok(communities)
    }
}
