//! Per-origin closeness-family accumulation

use serde::{Deserialize, Serialize};

use crate::config::DistanceThresholds;
use crate::error::{CentralityError, Result};
use crate::graph::{GraphStore, Node, ShortestPathTree};

/// How much each reached node contributes to a sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Every node counts once
    #[default]
    Unweighted,

    /// Every node counts by its stored weight
    NodeWeighted,
}

impl Weighting {
    /// Decode the integer mode used across the scalar boundary
    pub fn from_mode(mode: i64) -> Result<Self> {
        match mode {
            0 => Ok(Weighting::Unweighted),
            1 => Ok(Weighting::NodeWeighted),
            other => Err(CentralityError::InvalidMode(other)),
        }
    }

    #[inline]
    pub fn weight(self, node: &Node) -> f64 {
        match self {
            Weighting::Unweighted => 1.0,
            Weighting::NodeWeighted => node.weight,
        }
    }
}

/// Closeness-family measures for one origin at one radius.
/// The origin itself never contributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub density: f64,
    pub farness: f64,
    pub harmonic: f64,
    pub gravity: f64,
    pub cycles: u32,
}

pub(crate) fn check_betas(thresholds: &DistanceThresholds, betas: &[f64]) -> Result<()> {
    if betas.len() != thresholds.len() {
        return Err(CentralityError::InvalidThresholds(format!(
            "{} betas supplied for {} distances",
            betas.len(),
            thresholds.len()
        )));
    }
    if let Some(&bad) = betas.iter().find(|b| !b.is_finite() || **b < 0.0) {
        return Err(CentralityError::InvalidBeta(bad));
    }
    Ok(())
}

/// Accumulate density, farness, harmonic closeness, gravity and cycles from
/// one traversal, for every radius in `thresholds` at once.
///
/// `betas[i]` is the decay rate used for the gravity index at
/// `thresholds[i]`. A target counts toward radius `d` when the metric length
/// of its shortest path is at most `d`.
pub fn accumulate(
    store: &GraphStore,
    tree: &ShortestPathTree,
    thresholds: &DistanceThresholds,
    weighting: Weighting,
    betas: &[f64],
) -> Result<Vec<NodeMetrics>> {
    check_betas(thresholds, betas)?;

    let mut results = vec![NodeMetrics::default(); thresholds.len()];

    for entry in tree.targets() {
        let w = weighting.weight(&store.nodes()[entry.node as usize]);
        let d = entry.distance;

        for ((metrics, &radius), &beta) in results
            .iter_mut()
            .zip(thresholds.as_slice())
            .zip(betas)
        {
            if d > radius {
                continue;
            }
            metrics.density += w;
            metrics.farness += w * d;
            metrics.harmonic += w / d;
            metrics.gravity += w * (-beta * d).exp();
        }
    }

    for (metrics, &radius) in results.iter_mut().zip(thresholds.as_slice()) {
        metrics.cycles = tree.cycles_within(radius);
        if !metrics.farness.is_finite() || !metrics.gravity.is_finite() {
            return Err(CentralityError::NumericOverflow("closeness sums"));
        }
    }

    Ok(results)
}

/// Harmonic closeness over the ranking cost of `tree` rather than its
/// metric distance. With an angular tree this is angular harmonic
/// closeness; the radius still applies to metric distance.
pub fn harmonic_by_cost(
    store: &GraphStore,
    tree: &ShortestPathTree,
    thresholds: &DistanceThresholds,
    weighting: Weighting,
) -> Vec<f64> {
    let mut sums = vec![0.0; thresholds.len()];

    for entry in tree.targets() {
        let w = weighting.weight(&store.nodes()[entry.node as usize]);
        for (sum, &radius) in sums.iter_mut().zip(thresholds.as_slice()) {
            if entry.distance <= radius {
                *sum += w / entry.cost;
            }
        }
    }

    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{traverse, CostModel, GraphBuilder};

    /// Star: hub with spokes of length 100, 200 and 300; spoke weights 1, 2, 3
    fn star() -> GraphStore {
        let mut b = GraphBuilder::default();
        b.add_node("hub", 0.0, 0.0).unwrap();
        b.add_node_with("n1", 100.0, 0.0, true, 1.0).unwrap();
        b.add_node_with("n2", 0.0, 200.0, true, 2.0).unwrap();
        b.add_node_with("n3", -300.0, 0.0, true, 3.0).unwrap();
        b.add_edge("hub", "n1", None).unwrap();
        b.add_edge("hub", "n2", None).unwrap();
        b.add_edge("hub", "n3", None).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_multi_threshold_accumulation() {
        let store = star();
        let tree = traverse(&store, 0, CostModel::Metric, 250.0).unwrap();
        let thresholds = DistanceThresholds::new(vec![150.0, 250.0]).unwrap();
        let m = accumulate(&store, &tree, &thresholds, Weighting::Unweighted, &[0.0, 0.0]).unwrap();

        assert_eq!(m[0].density, 1.0);
        assert_eq!(m[0].farness, 100.0);
        assert_eq!(m[1].density, 2.0);
        assert_eq!(m[1].farness, 300.0);
        assert!((m[1].harmonic - (1.0 / 100.0 + 1.0 / 200.0)).abs() < 1e-15);
        // zero beta: gravity equals density
        assert_eq!(m[1].gravity, m[1].density);
        assert_eq!(m[1].cycles, 0);
    }

    #[test]
    fn test_node_weighted_accumulation() {
        let store = star();
        let tree = traverse(&store, 0, CostModel::Metric, 1000.0).unwrap();
        let thresholds = DistanceThresholds::single(1000.0).unwrap();
        let m = accumulate(&store, &tree, &thresholds, Weighting::NodeWeighted, &[0.01]).unwrap();

        assert_eq!(m[0].density, 6.0);
        assert_eq!(m[0].farness, 100.0 + 400.0 + 900.0);
        let gravity = (-1.0f64).exp() + 2.0 * (-2.0f64).exp() + 3.0 * (-3.0f64).exp();
        assert!((m[0].gravity - gravity).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_betas() {
        let store = star();
        let tree = traverse(&store, 0, CostModel::Metric, 1000.0).unwrap();
        let thresholds = DistanceThresholds::single(1000.0).unwrap();
        assert!(matches!(
            accumulate(&store, &tree, &thresholds, Weighting::Unweighted, &[-0.1]),
            Err(CentralityError::InvalidBeta(_))
        ));
        assert!(matches!(
            accumulate(&store, &tree, &thresholds, Weighting::Unweighted, &[0.1, 0.2]),
            Err(CentralityError::InvalidThresholds(_))
        ));
    }

    #[test]
    fn test_weighting_modes() {
        assert_eq!(Weighting::from_mode(0).unwrap(), Weighting::Unweighted);
        assert_eq!(Weighting::from_mode(1).unwrap(), Weighting::NodeWeighted);
        assert!(matches!(Weighting::from_mode(7), Err(CentralityError::InvalidMode(7))));
    }
}
