//! Batch run: graph construction, layout, then one independent community
//! detection and export per requested k.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::cpm::{Community, CommunityDetector, CommunityId};
use crate::enrich::Enricher;
use crate::error::Result;
use crate::export::{
    Artifact, ViewModel, ViewModelExporter, communities_csv, node_membership_csv,
    render_dashboard, render_dot, render_draggable, write_artifacts,
};
use crate::graph::{GraphBuilder, InteractionGraph};
use crate::input::{AttributeTable, EdgeRecord, read_attributes_from_path, read_edges_from_path};
use crate::layout::{LayoutEngine, Position};

/// Communities and exported view for one clique size.
#[derive(Debug, Clone)]
pub struct CommunityRun {
    pub k: usize,
    pub communities: Vec<Community>,
    pub view: ViewModel,
}

/// Operator-facing summary of one k.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub k: usize,
    pub nodes: usize,
    pub edges: usize,
    pub communities: usize,
    pub labels: BTreeMap<CommunityId, String>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub graph: InteractionGraph,
    pub positions: Vec<Position>,
    pub runs: Vec<CommunityRun>,
}

impl PipelineOutput {
    pub fn reports(&self) -> Vec<RunReport> {
        self.runs
            .iter()
            .map(|run| RunReport {
                k: run.k,
                nodes: self.graph.node_count(),
                edges: self.graph.edge_count(),
                communities: run.communities.len(),
                labels: run.view.community_labels.clone(),
            })
            .collect()
    }

    /// Renders every output file in memory.
    pub fn artifacts(&self, include_dot: bool) -> Result<Vec<Artifact>> {
        let mut artifacts = Vec::new();
        for run in &self.runs {
            let k = run.k;
            artifacts.push(Artifact::new(
                format!("cpm_dashboard_k{k}.html"),
                render_dashboard(&run.view)?,
            ));
            artifacts.push(Artifact::new(
                format!("cpm_vis_k{k}.html"),
                render_draggable(&run.view)?,
            ));
            artifacts.push(Artifact::new(
                format!("cpm_communities_k{k}.csv"),
                communities_csv(&run.communities)?,
            ));
            artifacts.push(Artifact::new(
                format!("node_community_map_k{k}.csv"),
                node_membership_csv(&run.view)?,
            ));
            if include_dot {
                artifacts.push(Artifact::new(
                    format!("cpm_graph_k{k}.dot"),
                    render_dot(&self.graph, &run.view)?,
                ));
            }
        }
        Ok(artifacts)
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared with every community detection of the run.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn detector(&self, k: usize) -> Result<CommunityDetector> {
        let detector = CommunityDetector::new(k)?.with_max_cliques(self.config.max_cliques);
        Ok(match &self.cancel {
            Some(flag) => detector.with_cancel_flag(Arc::clone(flag)),
            None => detector,
        })
    }

    pub fn run(
        &self,
        records: &[EdgeRecord],
        attributes: Option<&AttributeTable>,
    ) -> Result<PipelineOutput> {
        let graph = GraphBuilder::new(self.config.threshold).build(records)?;
        info!(
            records = records.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            threshold = self.config.threshold,
            "built thresholded graph"
        );
        if graph.is_empty() {
            warn!(threshold = self.config.threshold, "no interaction met the weight threshold");
        }

        let positions = LayoutEngine::new(self.config.layout.clone()).compute(&graph);
        let enricher = Enricher::new(attributes);

        let runs = self
            .config
            .distinct_k_values()
            .into_par_iter()
            .map(|k| -> Result<CommunityRun> {
                let communities = self.detector(k)?.detect(&graph)?;
                if communities.is_empty() {
                    warn!(k, "no communities found");
                } else {
                    info!(k, communities = communities.len(), "detected communities");
                }
                let enrichment = enricher.enrich(&graph, &communities);
                let view = ViewModelExporter::new(k, self.config.threshold)
                    .export(&graph, &enrichment, &positions)?;
                Ok(CommunityRun { k, communities, view })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PipelineOutput { graph, positions, runs })
    }
}

/// Reads the optional attribute table; a missing file degrades to no attributes.
pub fn load_attributes(path: Option<&Path>) -> Result<Option<AttributeTable>> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        warn!(path = %path.display(), "attribute file not found, categories default to Unknown");
        return Ok(None);
    }
    let table = read_attributes_from_path(path)?;
    info!(path = %path.display(), rows = table.len(), "loaded node attributes");
    Ok(Some(table))
}

/// Reads inputs, runs every k, and writes all artifacts to `out_dir` only once
/// the whole run has succeeded.
pub fn run_to_dir(
    config: PipelineConfig,
    interactions: &Path,
    attributes: Option<&Path>,
    out_dir: &Path,
    include_dot: bool,
) -> Result<Vec<RunReport>> {
    let pipeline = Pipeline::new(config)?;
    let records = read_edges_from_path(interactions)?;
    let attributes = load_attributes(attributes)?;

    let output = pipeline.run(&records, attributes.as_ref())?;
    let artifacts = output.artifacts(include_dot)?;
    write_artifacts(out_dir, &artifacts)?;
    info!(files = artifacts.len(), dir = %out_dir.display(), "wrote artifacts");
    Ok(output.reports())
}
