//! Localised network centrality for spatial street networks

pub mod boundary;
pub mod centrality;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod layers;
pub mod storage;

pub use centrality::{
    compute_centrality, BetaQuery, BetweennessQuery, CancelFlag, Centrality, CentralityReport,
    NodeQuery, NodeRef, Weighting,
};
pub use config::{beta_from_distance, distance_from_beta, Config, DistanceThresholds};
pub use error::{CentralityError, Result};
pub use graph::{traverse, CostModel, GraphBuilder, GraphStore, ShortestPathTree};
