//! Centrality measures built on bounded traversals

pub mod betweenness;
pub mod metrics;
pub mod network;
pub mod query;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use betweenness::{betweenness, betweenness_of, single_source_dependencies, BetweennessScores};
pub use metrics::{accumulate, harmonic_by_cost, NodeMetrics, Weighting};
pub use network::{compute_centrality, CentralityReport, NodeReport, RadiusReport};
pub use query::{BetaQuery, BetweennessQuery, Centrality, NodeQuery, NodeRef};

/// Cooperative cancellation for long whole-network passes.
///
/// Clones share the same flag; workers check it before each origin.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
