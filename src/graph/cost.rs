//! Edge cost models used to rank shortest paths

use serde::{Deserialize, Serialize};

use crate::graph::store::Edge;

/// How a traversal ranks competing paths.
///
/// Both models cut the search off by metric distance; only the ranking
/// differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostModel {
    /// Rank by street length
    #[default]
    Metric,

    /// Rank by street length plus the turn cost of each segment entered.
    /// Turn costs are metre-equivalents, so a straight route ranks exactly
    /// as it would under `Metric`.
    ///
    /// This is not a pure simplest-path model. A simplest-path ranking uses
    /// the accumulated turn angle alone and ignores length, and its angular
    /// harmonic closeness is `1 / (1 + angle / 180)`. Here length always
    /// counts, so among routes with equal turning the shorter one wins, and
    /// a long straight detour can lose to a short route with one turn.
    Angular,
}

impl CostModel {
    /// Cost of traversing `edge` in the given direction
    #[inline]
    pub fn step_cost(self, edge: &Edge, forward: bool) -> f64 {
        match self {
            CostModel::Metric => edge.length,
            CostModel::Angular => edge.length + edge.angle(forward),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CostModel::Metric => "metric",
            CostModel::Angular => "angular",
        }
    }
}
