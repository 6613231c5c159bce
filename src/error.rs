use thiserror::Error;

/// Errors raised while turning interaction data into exported communities.
#[derive(Debug, Error)]
pub enum Error {
    /// Required columns are absent from a tabular input.
    #[error("{input} is missing required column(s): {}", missing.join(", "))]
    MissingColumns { input: String, missing: Vec<String> },

    /// A weight cell is present but does not hold a finite number.
    #[error("line {line}: weight {value:?} is not a finite number")]
    InvalidWeight { line: u64, value: String },

    /// A node identity cell is empty after trimming.
    #[error("line {line}: empty node identity in column {column:?}")]
    InvalidNodeKey { line: u64, column: String },

    /// Summing surviving records overflowed a pair weight or a node degree.
    #[error("accumulated weight of {node_a:?} -- {node_b:?} is not finite")]
    WeightOverflow { node_a: String, node_b: String },

    /// Per-node data (positions, enriched nodes) does not line up with the graph.
    #[error("expected one {what} per graph node ({expected}), got {actual}")]
    NodeCountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Clique enumeration produced more maximal cliques than the configured cap.
    #[error("clique enumeration exceeded the limit of {limit} maximal cliques")]
    CliqueLimitExceeded { limit: usize },

    #[error("community detection was cancelled")]
    Cancelled,

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
