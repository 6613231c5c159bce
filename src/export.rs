//! Interchange format for the dashboard client and the artifacts written per run.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use petgraph::dot::{Config, Dot};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::cpm::{Community, CommunityId};
use crate::enrich::Enrichment;
use crate::error::{Error, Result};
use crate::graph::InteractionGraph;
use crate::layout::Position;

pub const COMMUNITY_PALETTE: [&str; 10] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];
pub const CATEGORY_PALETTE: [&str; 6] = [
    "#4C9F70", "#2F8AC8", "#C85A7A", "#8C6EFF", "#E99E3A", "#6FB7E6",
];
pub const UNCOLORED: &str = "#B0B0B0";

const DASHBOARD_TEMPLATE: &str = include_str!("assets/dashboard.html");
const DRAGGABLE_TEMPLATE: &str = include_str!("assets/draggable.html");
const VIEW_MODEL_TOKEN: &str = "__VIEW_MODEL__";
const TITLE_TOKEN: &str = "__TITLE__";

pub fn community_color(id: CommunityId) -> &'static str {
    COMMUNITY_PALETTE[id % COMMUNITY_PALETTE.len()]
}

pub fn category_color(position: usize) -> &'static str {
    CATEGORY_PALETTE[position % CATEGORY_PALETTE.len()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewNode {
    pub id: String,
    pub label: String,
    pub category: String,
    pub degree: f64,
    pub communities: Vec<CommunityId>,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Everything the client needs, with no further lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub k: usize,
    pub threshold: f64,
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
    pub community_labels: BTreeMap<CommunityId, String>,
    /// Distinct node categories, sorted.
    pub categories: Vec<String>,
    pub community_palette: Vec<String>,
    pub category_palette: Vec<String>,
}

impl ViewModel {
    pub fn node(&self, id: &str) -> Option<&ViewNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Assembles the [`ViewModel`] for one clique size.
#[derive(Debug, Clone, Copy)]
pub struct ViewModelExporter {
    k: usize,
    threshold: f64,
}

impl ViewModelExporter {
    pub fn new(k: usize, threshold: f64) -> Self {
        Self { k, threshold }
    }

    /// `positions` and `enrichment.nodes` are indexed like the graph's nodes.
    pub fn export(
        &self,
        graph: &InteractionGraph,
        enrichment: &Enrichment,
        positions: &[Position],
    ) -> Result<ViewModel> {
        ensure_per_node(graph, "position", positions.len())?;
        ensure_per_node(graph, "enriched node", enrichment.nodes.len())?;

        let categories: Vec<String> = enrichment
            .nodes
            .iter()
            .map(|n| n.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let nodes = enrichment
            .nodes
            .iter()
            .zip(positions)
            .map(|(node, pos)| {
                let color = match node.communities.first() {
                    Some(&id) => community_color(id),
                    None => categories
                        .binary_search(&node.category)
                        .map(category_color)
                        .unwrap_or(UNCOLORED),
                };
                ViewNode {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    category: node.category.clone(),
                    degree: node.degree,
                    communities: node.communities.clone(),
                    x: pos.x,
                    y: pos.y,
                    size: node.size,
                    color: color.to_string(),
                }
            })
            .collect();

        let edges = graph
            .edges()
            .map(|(source, target, weight)| ViewEdge {
                source: source.to_string(),
                target: target.to_string(),
                weight,
            })
            .collect();

        Ok(ViewModel {
            k: self.k,
            threshold: self.threshold,
            nodes,
            edges,
            community_labels: enrichment.community_labels.clone(),
            categories,
            community_palette: COMMUNITY_PALETTE.iter().map(|c| c.to_string()).collect(),
            category_palette: CATEGORY_PALETTE.iter().map(|c| c.to_string()).collect(),
        })
    }
}

fn ensure_per_node(graph: &InteractionGraph, what: &'static str, actual: usize) -> Result<()> {
    let expected = graph.node_count();
    if actual == expected {
        Ok(())
    } else {
        Err(Error::NodeCountMismatch {
            what,
            expected,
            actual,
        })
    }
}

pub fn view_model_json(view: &ViewModel) -> Result<String> {
    Ok(serde_json::to_string(view)?)
}

fn embed(template: &str, title: &str, view: &ViewModel) -> Result<String> {
    // keep the payload from closing its <script> element
    let payload = view_model_json(view)?.replace("</", "<\\/");
    Ok(template
        .replace(TITLE_TOKEN, title)
        .replace(VIEW_MODEL_TOKEN, &payload))
}

/// Self-contained dashboard document with the view model embedded.
pub fn render_dashboard(view: &ViewModel) -> Result<String> {
    embed(DASHBOARD_TEMPLATE, &format!("CPM network (k={})", view.k), view)
}

/// Same view model in a vis-network page whose nodes can be dragged. Moved
/// positions live in the browser or in a downloaded file only.
pub fn render_draggable(view: &ViewModel) -> Result<String> {
    embed(
        DRAGGABLE_TEMPLATE,
        &format!("CPM network (k={}), draggable", view.k),
        view,
    )
}

#[derive(Serialize)]
struct MembershipRow<'a> {
    community_id: CommunityId,
    member: &'a str,
}

#[derive(Serialize)]
struct NodeMembershipRow<'a> {
    node: &'a str,
    communities: String,
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new())
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// `community_id,member` rows, members in key order.
pub fn communities_csv(communities: &[Community]) -> Result<Vec<u8>> {
    let mut writer = csv_writer();
    writer.write_record(["community_id", "member"])?;
    for community in communities {
        for member in &community.members {
            writer.serialize(MembershipRow {
                community_id: community.id,
                member,
            })?;
        }
    }
    finish_csv(writer)
}

/// `node,communities` rows for every node in at least one community.
pub fn node_membership_csv(view: &ViewModel) -> Result<Vec<u8>> {
    let mut members: Vec<&ViewNode> =
        view.nodes.iter().filter(|n| !n.communities.is_empty()).collect();
    members.sort_by(|a, b| a.id.cmp(&b.id));

    let mut writer = csv_writer();
    writer.write_record(["node", "communities"])?;
    for node in members {
        let ids: Vec<String> = node.communities.iter().map(|id| id.to_string()).collect();
        writer.serialize(NodeMembershipRow {
            node: &node.id,
            communities: format!("[{}]", ids.join(", ")),
        })?;
    }
    finish_csv(writer)
}

fn dot_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Graphviz rendering of the thresholded graph, filled by node colour.
pub fn render_dot(graph: &InteractionGraph, view: &ViewModel) -> Result<String> {
    ensure_per_node(graph, "view node", view.nodes.len())?;
    // the attribute closures are temporaries, so render within one expression
    Ok(format!(
        "{}",
        Dot::with_attr_getters(
            graph.as_petgraph(),
            &[Config::EdgeNoLabel, Config::NodeNoLabel],
            &|_, edge| format!("label=\"{}\"", edge.weight()),
            &|_, (idx, _)| {
                let node = &view.nodes[idx.index()];
                format!(
                    "label=\"{}\", style=filled, fillcolor=\"{}\"",
                    dot_escape(&node.label),
                    node.color
                )
            },
        )
    ))
}

/// A rendered output file, held in memory until the whole run has succeeded.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }
}

/// Writes each artifact through a temporary file in `dir`, so a reader never
/// observes a partially written document.
pub fn write_artifacts(dir: &Path, artifacts: &[Artifact]) -> Result<()> {
    fs::create_dir_all(dir)?;
    for artifact in artifacts {
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&artifact.contents)?;
        file.flush()?;
        let path = dir.join(&artifact.file_name);
        file.persist(&path).map_err(|e| Error::Io(e.error))?;
        debug!(path = %path.display(), bytes = artifact.contents.len(), "wrote artifact");
    }
    Ok(())
}
