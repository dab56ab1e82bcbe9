//! Configuration management for centrality computations

use serde::{Deserialize, Serialize};

use crate::centrality::Weighting;
use crate::error::{CentralityError, Result};
use crate::graph::CostModel;

/// Weight remaining at the edge of a radius when deriving beta from it.
/// exp(-4): a beta-weighted measure at distance d uses beta = 4 / d.
pub const MIN_THRESHOLD_WEIGHT: f64 = 0.018_315_638_888_734_18;

/// Decay rate at which the weight at `distance` falls to `MIN_THRESHOLD_WEIGHT`
pub fn beta_from_distance(distance: f64) -> Result<f64> {
    if !(distance > 0.0) {
        return Err(CentralityError::InvalidRadius(distance));
    }
    Ok(-MIN_THRESHOLD_WEIGHT.ln() / distance)
}

/// Radius at which a decay rate of `beta` falls to `MIN_THRESHOLD_WEIGHT`.
/// A zero beta never decays, so its radius is unbounded.
pub fn distance_from_beta(beta: f64) -> Result<f64> {
    if !beta.is_finite() || beta < 0.0 {
        return Err(CentralityError::InvalidBeta(beta));
    }
    if beta == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(-MIN_THRESHOLD_WEIGHT.ln() / beta)
}

/// Ordered set of radii evaluated from a single traversal per origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceThresholds(Vec<f64>);

impl DistanceThresholds {
    /// Validate that radii are non-empty, positive and strictly increasing.
    /// The last radius may be infinite for a network-wide pass.
    pub fn new(distances: Vec<f64>) -> Result<Self> {
        if distances.is_empty() {
            return Err(CentralityError::InvalidThresholds(
                "at least one distance is required".to_string(),
            ));
        }
        for &d in &distances {
            if !(d > 0.0) {
                return Err(CentralityError::InvalidRadius(d));
            }
        }
        for pair in distances.windows(2) {
            if !(pair[0] < pair[1]) {
                return Err(CentralityError::InvalidThresholds(format!(
                    "distances must be strictly increasing, found {} then {}",
                    pair[0], pair[1]
                )));
            }
        }
        if distances[..distances.len() - 1].iter().any(|d| d.is_infinite()) {
            return Err(CentralityError::InvalidThresholds(
                "only the last distance may be unbounded".to_string(),
            ));
        }
        Ok(Self(distances))
    }

    /// A single radius
    pub fn single(distance: f64) -> Result<Self> {
        Self::new(vec![distance])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest radius; the traversal cutoff
    pub fn max(&self) -> f64 {
        self.0[self.0.len() - 1]
    }
}

/// Settings for a whole-network centrality pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Radii at which every measure is evaluated
    pub distances: Vec<f64>,

    /// Cost model used for betweenness and closeness ranking
    pub cost_model: CostModel,

    /// Whether targets contribute 1 or their node weight
    pub weighting: Weighting,

    /// How far a query coordinate may lie from the node it resolves to
    pub snap_tolerance: f64,

    /// Compute betweenness in addition to the closeness family
    pub betweenness: bool,

    /// Origins per betweenness work unit
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            distances: vec![400.0, 800.0, 1600.0],
            cost_model: CostModel::Metric,
            weighting: Weighting::Unweighted,
            snap_tolerance: 1.0,
            betweenness: true,
            chunk_size: 64,
        }
    }
}

impl Config {
    /// Create a new configuration with custom values
    pub fn new(
        distances: Vec<f64>,
        cost_model: CostModel,
        weighting: Weighting,
        snap_tolerance: f64,
    ) -> Self {
        Self {
            distances,
            cost_model,
            weighting,
            snap_tolerance,
            ..Self::default()
        }
    }

    /// Validated threshold set for this configuration
    pub fn thresholds(&self) -> Result<DistanceThresholds> {
        DistanceThresholds::new(self.distances.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beta_distance_conversion() {
        let beta = beta_from_distance(400.0).unwrap();
        assert!((beta - 0.01).abs() < 1e-12);
        let d = distance_from_beta(0.005).unwrap();
        assert!((d - 800.0).abs() < 1e-9);
        assert_eq!(distance_from_beta(0.0).unwrap(), f64::INFINITY);
        assert!(distance_from_beta(-0.01).is_err());
        assert!(beta_from_distance(0.0).is_err());
    }

    #[test]
    fn test_thresholds_validation() {
        assert!(DistanceThresholds::new(vec![]).is_err());
        assert!(DistanceThresholds::new(vec![400.0, 400.0]).is_err());
        assert!(DistanceThresholds::new(vec![800.0, 400.0]).is_err());
        assert!(DistanceThresholds::new(vec![-1.0]).is_err());
        assert!(DistanceThresholds::new(vec![f64::INFINITY, f64::INFINITY]).is_err());

        let t = DistanceThresholds::new(vec![200.0, 400.0, f64::INFINITY]).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.max(), f64::INFINITY);
    }
}
