//! Filter and search semantics the dashboard implements over a [`ViewModel`].
//!
//! The embedded script mirrors these functions; they exist so the contract can
//! be exercised without a browser.
//!
//! [`ViewModel`]: crate::export::ViewModel

use std::collections::BTreeSet;

use crate::cpm::CommunityId;
use crate::export::{ViewEdge, ViewNode};

/// Active facet selections. An empty facet does not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetFilter {
    pub categories: BTreeSet<String>,
    pub communities: BTreeSet<CommunityId>,
}

impl FacetFilter {
    pub fn new<C, I>(categories: C, communities: I) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        I: IntoIterator<Item = CommunityId>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            communities: communities.into_iter().collect(),
        }
    }

    /// OR within a facet, AND across facets.
    pub fn admits(&self, node: &ViewNode) -> bool {
        let category_ok = self.categories.is_empty() || self.categories.contains(&node.category);
        let community_ok = self.communities.is_empty()
            || node.communities.iter().any(|c| self.communities.contains(c));
        category_ok && community_ok
    }
}

pub fn visible_nodes(nodes: &[ViewNode], filter: &FacetFilter) -> BTreeSet<String> {
    nodes
        .iter()
        .filter(|n| filter.admits(n))
        .map(|n| n.id.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Blank query; the client shows the filtered view.
    Inactive,
    /// Nothing matched; reported to the user, not an error.
    NoMatch { query: String },
    /// Matching nodes plus their direct neighbours.
    Highlight(BTreeSet<String>),
}

/// Case-insensitive substring search over display labels, expanded by one hop.
pub fn search_highlight(nodes: &[ViewNode], edges: &[ViewEdge], query: &str) -> SearchOutcome {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return SearchOutcome::Inactive;
    }

    let matches: BTreeSet<&str> = nodes
        .iter()
        .filter(|n| n.label.to_lowercase().contains(&needle))
        .map(|n| n.id.as_str())
        .collect();
    if matches.is_empty() {
        return SearchOutcome::NoMatch {
            query: query.trim().to_string(),
        };
    }

    let mut highlighted: BTreeSet<String> = matches.iter().map(|id| id.to_string()).collect();
    for edge in edges {
        if matches.contains(edge.source.as_str()) {
            highlighted.insert(edge.target.clone());
        }
        if matches.contains(edge.target.as_str()) {
            highlighted.insert(edge.source.clone());
        }
    }
    SearchOutcome::Highlight(highlighted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, category: &str, communities: &[CommunityId]) -> ViewNode {
        ViewNode {
            id: id.to_string(),
            label: id.replace('_', " "),
            category: category.to_string(),
            degree: 1.0,
            communities: communities.to_vec(),
            x: 0.0,
            y: 0.0,
            size: 10.0,
            color: "#B0B0B0".to_string(),
        }
    }

    fn edge(source: &str, target: &str) -> ViewEdge {
        ViewEdge {
            source: source.to_string(),
            target: target.to_string(),
            weight: 1.0,
        }
    }

    fn ids(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_facet_semantics_for_single_node() {
        let nodes = vec![node("X", "Red", &[0])];
        let none: [&str; 0] = [];

        let filter = FacetFilter::new(["Blue"], []);
        assert!(visible_nodes(&nodes, &filter).is_empty());

        let filter = FacetFilter::new(none, [1]);
        assert!(visible_nodes(&nodes, &filter).is_empty());

        let filter = FacetFilter::new(["Red"], [0]);
        assert_eq!(visible_nodes(&nodes, &filter), ids(&["X"]));
    }

    #[test]
    fn test_no_active_filters_shows_everything() {
        let nodes = vec![node("X", "Red", &[0]), node("Y", "Unknown", &[])];
        assert_eq!(visible_nodes(&nodes, &FacetFilter::default()), ids(&["X", "Y"]));
    }

    #[test]
    fn test_or_within_facet_and_across_facets() {
        let nodes = vec![
            node("A", "Red", &[0]),
            node("B", "Blue", &[1, 2]),
            node("C", "Green", &[2]),
            node("D", "Blue", &[]),
        ];
        let filter = FacetFilter::new(["Red", "Blue"], []);
        assert_eq!(visible_nodes(&nodes, &filter), ids(&["A", "B", "D"]));

        let filter = FacetFilter::new(["Red", "Blue"], [2]);
        assert_eq!(visible_nodes(&nodes, &filter), ids(&["B"]));
    }

    #[test]
    fn test_search_reveals_matches_and_neighbours() {
        let nodes = vec![
            node("Arun_Mozhi", "Chola", &[]),
            node("Vandiya", "Chola", &[]),
            node("Nandini", "Pazhuvettarayar", &[]),
            node("Ravidasan", "Pandya", &[]),
        ];
        let edges = vec![
            edge("Arun_Mozhi", "Vandiya"),
            edge("Nandini", "Arun_Mozhi"),
            edge("Nandini", "Ravidasan"),
        ];
        assert_eq!(
            search_highlight(&nodes, &edges, "  arun MOZ "),
            SearchOutcome::Highlight(ids(&["Arun_Mozhi", "Nandini", "Vandiya"]))
        );
        assert_eq!(
            search_highlight(&nodes, &edges, "dasan"),
            SearchOutcome::Highlight(ids(&["Nandini", "Ravidasan"]))
        );
    }

    #[test]
    fn test_search_matches_display_label_not_key() {
        let nodes = vec![node("Arun_Mozhi", "Chola", &[])];
        assert_eq!(
            search_highlight(&nodes, &[], "arun mozhi"),
            SearchOutcome::Highlight(ids(&["Arun_Mozhi"]))
        );
        assert!(matches!(
            search_highlight(&nodes, &[], "arun_mozhi"),
            SearchOutcome::NoMatch { .. }
        ));
    }

    #[test]
    fn test_search_miss_and_blank_query() {
        let nodes = vec![node("X", "Red", &[0])];
        assert_eq!(
            search_highlight(&nodes, &[], "zzz"),
            SearchOutcome::NoMatch {
                query: "zzz".to_string()
            }
        );
        assert_eq!(search_highlight(&nodes, &[], "   "), SearchOutcome::Inactive);
    }
}
