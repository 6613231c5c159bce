//! Per-node attributes, degree-based sizing and community labels.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::cpm::{Community, CommunityId};
use crate::graph::InteractionGraph;
use crate::input::AttributeTable;

pub const UNKNOWN_CATEGORY: &str = "Unknown";

pub const MIN_NODE_SIZE: f64 = 8.0;
pub const NODE_SIZE_RANGE: f64 = 28.0;
/// Size used for every node when no node has positive degree.
pub const FLAT_NODE_SIZE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeProfile {
    pub id: String,
    pub label: String,
    pub category: String,
    pub degree: f64,
    /// Community ids in discovery order.
    pub communities: Vec<CommunityId>,
    pub size: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    /// In graph index order.
    pub nodes: Vec<NodeProfile>,
    pub community_labels: BTreeMap<CommunityId, String>,
    /// Nodes with no row in the attribute table.
    pub attribute_misses: usize,
}

pub fn display_label(key: &str) -> String {
    key.replace('_', " ")
}

/// Linear in degree relative to the maximum, never below [`MIN_NODE_SIZE`].
pub fn node_size(degree: f64, max_degree: f64) -> f64 {
    if max_degree > 0.0 {
        MIN_NODE_SIZE + (degree / max_degree).clamp(0.0, 1.0) * NODE_SIZE_RANGE
    } else {
        FLAT_NODE_SIZE
    }
}

fn normalize_category(raw: &str) -> &str {
    if raw.is_empty() { UNKNOWN_CATEGORY } else { raw }
}

/// Majority category among members present in the attribute table, or a
/// synthetic `c{id}` label when none is. Members are visited in key order and
/// ties go to the category reached first.
pub fn community_label(community: &Community, attributes: Option<&AttributeTable>) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    if let Some(table) = attributes {
        for member in &community.members {
            let Some(raw) = table.category(member) else {
                continue;
            };
            let category = normalize_category(raw);
            match counts.iter_mut().find(|(c, _)| *c == category) {
                Some((_, n)) => *n += 1,
                None => counts.push((category, 1)),
            }
        }
    }

    let mut majority: Option<(&str, usize)> = None;
    for &(category, n) in &counts {
        if majority.is_none_or(|(_, best)| n > best) {
            majority = Some((category, n));
        }
    }
    match majority {
        Some((category, _)) => format!("{category} (size={})", community.len()),
        None => format!("c{} (size={})", community.id, community.len()),
    }
}

/// Joins attributes and community memberships onto graph nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Enricher<'a> {
    attributes: Option<&'a AttributeTable>,
}

impl<'a> Enricher<'a> {
    pub fn new(attributes: Option<&'a AttributeTable>) -> Self {
        Self { attributes }
    }

    pub fn enrich(&self, graph: &InteractionGraph, communities: &[Community]) -> Enrichment {
        let mut memberships: HashMap<&str, Vec<CommunityId>> = HashMap::new();
        for community in communities {
            for member in &community.members {
                memberships.entry(member.as_str()).or_default().push(community.id);
            }
        }

        let degrees = graph.weighted_degrees();
        let max_degree = degrees.iter().copied().fold(0.0, f64::max);

        let mut attribute_misses = 0;
        let nodes: Vec<NodeProfile> = graph
            .nodes()
            .zip(&degrees)
            .map(|(key, &degree)| {
                let category = match self.attributes.and_then(|t| t.category(key)) {
                    Some(raw) => normalize_category(raw).to_string(),
                    None => {
                        attribute_misses += 1;
                        UNKNOWN_CATEGORY.to_string()
                    }
                };
                NodeProfile {
                    id: key.to_string(),
                    label: display_label(key),
                    category,
                    degree,
                    communities: memberships.get(key).cloned().unwrap_or_default(),
                    size: node_size(degree, max_degree),
                }
            })
            .collect();

        if self.attributes.is_some() && attribute_misses > 0 {
            warn!(
                missing = attribute_misses,
                "nodes absent from the attribute table fall back to {UNKNOWN_CATEGORY:?}"
            );
        }

        let community_labels: BTreeMap<CommunityId, String> = communities
            .iter()
            .map(|c| (c.id, community_label(c, self.attributes)))
            .collect();
        debug!(nodes = nodes.len(), communities = community_labels.len(), "enriched graph");

        Enrichment {
            nodes,
            community_labels,
            attribute_misses,
        }
    }
}
