//! Run configuration.
//!
//! Every stage receives its parameters from a [`PipelineConfig`] at call time.
//! Values come from defaults, an optional TOML file, and CLI overrides, in that order.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_THRESHOLD: f64 = 4.0;
pub const DEFAULT_K: usize = 3;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_ITERATIONS: usize = 200;
pub const DEFAULT_TIME_STEP: f32 = 0.016;

/// Parameters of the force-directed layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Seed for the initial random placement.
    pub seed: u64,
    /// Simulation steps; the run never stops early.
    pub iterations: usize,
    /// Seconds of simulated time per step.
    pub time_step: f32,
    /// Side of the square the nodes are first scattered over.
    pub spread: f32,
    /// Node-node repulsion.
    pub force_charge: f32,
    /// Edge attraction; balances `force_charge`.
    pub force_spring: f32,
    pub force_max: f32,
    pub node_speed: f32,
    pub damping_factor: f32,
    /// Largest absolute coordinate after rescaling.
    pub scale: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            iterations: DEFAULT_ITERATIONS,
            time_step: DEFAULT_TIME_STEP,
            spread: 200.0,
            force_charge: 150.0,
            force_spring: 0.05,
            force_max: 100.0,
            node_speed: 3000.0,
            damping_factor: 0.9,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Inclusive lower bound on a raw record's own weight.
    pub threshold: f64,
    /// Clique sizes to percolate; each produces an independent community set.
    pub k_values: Vec<usize>,
    /// Abort clique enumeration once this many maximal cliques have been found.
    pub max_cliques: Option<usize>,
    pub layout: LayoutConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            k_values: vec![DEFAULT_K],
            max_cliques: None,
            layout: LayoutConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if self.k_values.is_empty() {
            return Err(Error::InvalidConfig("at least one k value is required".into()));
        }
        if let Some(k) = self.k_values.iter().find(|&&k| k < 2) {
            return Err(Error::InvalidConfig(format!("k must be at least 2, got {k}")));
        }
        if self.max_cliques == Some(0) {
            return Err(Error::InvalidConfig("max_cliques must be positive".into()));
        }
        let layout = &self.layout;
        if layout.iterations == 0 {
            return Err(Error::InvalidConfig("layout iterations must be positive".into()));
        }
        let forces = [
            ("time_step", layout.time_step),
            ("spread", layout.spread),
            ("force_charge", layout.force_charge),
            ("force_spring", layout.force_spring),
            ("force_max", layout.force_max),
            ("node_speed", layout.node_speed),
        ];
        if let Some((name, value)) = forces.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(Error::InvalidConfig(format!(
                "layout {name} must be positive, got {value}"
            )));
        }
        if !(0.0..=1.0).contains(&layout.damping_factor) {
            return Err(Error::InvalidConfig(format!(
                "layout damping_factor must be within [0, 1], got {}",
                layout.damping_factor
            )));
        }
        if !(layout.scale.is_finite() && layout.scale > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "layout scale must be positive, got {}",
                layout.scale
            )));
        }
        Ok(())
    }

    /// Requested k values in ascending order with duplicates removed.
    pub fn distinct_k_values(&self) -> Vec<usize> {
        let mut ks = self.k_values.clone();
        ks.sort_unstable();
        ks.dedup();
        ks
    }
}
