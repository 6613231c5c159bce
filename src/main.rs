use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cpm_network::{PipelineConfig, run_to_dir};
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "cpm-network")]
#[command(
    about = "Clique-percolation communities and an interactive network dashboard",
    long_about = None
)]
struct Cli {
    /// Interaction CSV with source,target[,weight] columns
    #[arg(long)]
    interactions: PathBuf,

    /// Optional attribute CSV with name[,faction] columns
    #[arg(long)]
    characters: Option<PathBuf>,

    /// TOML file with pipeline settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep records whose own weight is at least this value
    #[arg(long)]
    threshold: Option<f64>,

    /// One or more clique sizes
    #[arg(long, num_args = 1..)]
    k: Vec<usize>,

    /// Fail instead of enumerating more maximal cliques than this
    #[arg(long)]
    max_cliques: Option<usize>,

    #[arg(long, default_value = "cpm_output")]
    out_dir: PathBuf,

    /// Skip the Graphviz export
    #[arg(long)]
    no_dot: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if !cli.k.is_empty() {
        config.k_values = cli.k.clone();
    }
    if cli.max_cliques.is_some() {
        config.max_cliques = cli.max_cliques;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = load_config(&cli)?;
    info!(threshold = config.threshold, k = ?config.k_values, "starting run");

    let reports = run_to_dir(
        config,
        &cli.interactions,
        cli.characters.as_deref(),
        &cli.out_dir,
        !cli.no_dot,
    )
    .with_context(|| format!("failed to process {}", cli.interactions.display()))?;

    for report in &reports {
        println!(
            "k={}: {} nodes, {} edges, {} communities",
            report.k, report.nodes, report.edges, report.communities
        );
        for (id, label) in &report.labels {
            println!("  {id}: {label}");
        }
    }
    println!("Output written to {}", cli.out_dir.display());
    Ok(())
}
