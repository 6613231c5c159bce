//! Overlapping community detection over weighted interaction data.
//!
//! Raw `source,target[,weight]` records are folded into a thresholded graph,
//! communities are found by clique percolation, nodes are laid out and
//! enriched with external categories, and the result is exported as a
//! self-contained dashboard document.

pub mod client;
pub mod config;
pub mod cpm;
pub mod enrich;
pub mod error;
pub mod export;
pub mod graph;
pub mod input;
pub mod layout;
pub mod pipeline;

pub use client::{FacetFilter, SearchOutcome, search_highlight, visible_nodes};
pub use config::{LayoutConfig, PipelineConfig};
pub use cpm::{Community, CommunityDetector, CommunityId};
pub use enrich::{Enricher, Enrichment, NodeProfile};
pub use error::{Error, Result};
pub use export::{ViewEdge, ViewModel, ViewModelExporter, ViewNode};
pub use graph::{GraphBuilder, InteractionGraph};
pub use input::{AttributeTable, EdgeRecord};
pub use layout::{LayoutEngine, Position};
pub use pipeline::{Pipeline, PipelineOutput, RunReport, run_to_dir};
