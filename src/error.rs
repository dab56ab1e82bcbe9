//! Error types for graph construction and centrality queries

use thiserror::Error;

/// Errors surfaced by the graph store, the traversal engine and the
/// centrality accumulators.
///
/// Empty neighbourhoods and unreachable nodes are never errors: they produce
/// zero-valued results.
#[derive(Debug, Error)]
pub enum CentralityError {
    /// Radius was zero, negative or NaN
    #[error("invalid radius {0}: must be greater than zero")]
    InvalidRadius(f64),

    /// Origin index or coordinate does not resolve to a node
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// A query was issued before a graph was loaded
    #[error("graph store has not been initialised")]
    UninitializedGraph,

    /// Path counts or decay weights left the representable range
    #[error("numeric overflow while computing {0}")]
    NumericOverflow(&'static str),

    #[error("invalid beta {0}: must be finite and non-negative")]
    InvalidBeta(f64),

    #[error("invalid weighting mode {0}")]
    InvalidMode(i64),

    #[error("invalid distance thresholds: {0}")]
    InvalidThresholds(String),

    #[error("invalid edge {start} -> {end}: {reason}")]
    InvalidEdge {
        start: String,
        end: String,
        reason: String,
    },

    #[error("invalid node {id}: {reason}")]
    InvalidNode { id: String, reason: String },

    #[error("duplicate node id {0}")]
    DuplicateNode(String),

    /// A whole-network pass observed its cancellation flag
    #[error("computation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("format error: {0}")]
    Format(String),

    /// A data-layer query named a class no point carries
    #[error("unknown data class: {0}")]
    UnknownClass(String),
}

impl CentralityError {
    /// Stable numeric code reported across the scalar boundary
    pub fn code(&self) -> i32 {
        match self {
            CentralityError::InvalidRadius(_) => 1,
            CentralityError::UnknownNode(_) => 2,
            CentralityError::UninitializedGraph => 3,
            CentralityError::NumericOverflow(_) => 4,
            CentralityError::InvalidBeta(_) => 5,
            CentralityError::InvalidMode(_) => 6,
            CentralityError::InvalidThresholds(_) => 7,
            CentralityError::InvalidEdge { .. } => 8,
            CentralityError::InvalidNode { .. } => 9,
            CentralityError::DuplicateNode(_) => 10,
            CentralityError::Cancelled => 11,
            CentralityError::Io(_) => 12,
            CentralityError::Format(_) => 13,
            CentralityError::UnknownClass(_) => 14,
        }
    }
}

impl From<serde_json::Error> for CentralityError {
    fn from(err: serde_json::Error) -> Self {
        CentralityError::Format(err.to_string())
    }
}

impl From<bincode::Error> for CentralityError {
    fn from(err: bincode::Error) -> Self {
        CentralityError::Format(err.to_string())
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, CentralityError>;
