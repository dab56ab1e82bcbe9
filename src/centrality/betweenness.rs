//! Localised betweenness via Brandes dependency accumulation.
//!
//! # Definition
//!
//! ```text
//! C_B(v) = Σ_{s≠v≠t, d(s,t) ≤ r} c(s,t) · σ_st(v) / σ_st
//! ```
//!
//! with `c(s,t) = 1` for plain betweenness and `c(s,t) = exp(-β·d(s,t))` for
//! the beta-weighted variant. Ordered pairs are counted, so on an undirected
//! network each unordered pair contributes twice.
//!
//! # Accumulation
//!
//! One bounded traversal per source, then a backward pass over the
//! finalisation order:
//!
//! ```text
//! δ_s(v) = Σ_{w: v∈P_s(w)} (σ_sv/σ_sw) × (c(s,w) + δ_s(w))
//! ```
//!
//! Targets beyond the radius contribute nothing, and since every node on a
//! shortest path to a target lies closer than the target, their dependencies
//! are zero too. One traversal at the largest radius serves every radius in
//! the threshold set.

use rayon::prelude::*;

use crate::centrality::CancelFlag;
use crate::config::DistanceThresholds;
use crate::error::{CentralityError, Result};
use crate::graph::{traverse, CostModel, GraphStore, NodeIdx, ShortestPathTree};

/// Betweenness scores indexed `[threshold][node]`
#[derive(Debug, Clone, PartialEq)]
pub struct BetweennessScores {
    pub plain: Vec<Vec<f64>>,

    /// Present when betas were supplied
    pub weighted: Option<Vec<Vec<f64>>>,
}

impl BetweennessScores {
    fn zeros(thresholds: usize, nodes: usize, weighted: bool) -> Self {
        Self {
            plain: vec![vec![0.0; nodes]; thresholds],
            weighted: weighted.then(|| vec![vec![0.0; nodes]; thresholds]),
        }
    }

    fn merge(&mut self, other: &BetweennessScores) {
        add_into(&mut self.plain, &other.plain);
        if let (Some(mine), Some(theirs)) = (self.weighted.as_mut(), other.weighted.as_ref()) {
            add_into(mine, theirs);
        }
    }
}

fn add_into(target: &mut [Vec<f64>], source: &[Vec<f64>]) {
    for (t_row, s_row) in target.iter_mut().zip(source) {
        for (t, s) in t_row.iter_mut().zip(s_row) {
            *t += s;
        }
    }
}

/// Run the backward pass of one traversal for a single radius and pair
/// weighting, reporting each non-origin node's dependency to `sink`.
fn accumulate_dependencies<F>(
    tree: &ShortestPathTree,
    radius: f64,
    beta: Option<f64>,
    delta: &mut Vec<f64>,
    mut sink: F,
) -> Result<()>
where
    F: FnMut(NodeIdx, f64),
{
    delta.clear();
    delta.resize(tree.slot_count(), 0.0);

    // origin is always slot 0 and finalised first
    for &slot in tree.order().iter().rev() {
        let w = tree.entry(slot);
        let contribution = if slot != 0 && w.distance <= radius {
            match beta {
                Some(beta) => (-beta * w.distance).exp(),
                None => 1.0,
            }
        } else {
            0.0
        };

        let carried = contribution + delta[slot as usize];
        if carried == 0.0 {
            continue;
        }

        let coeff = carried / w.path_count;
        for &v_slot in tree.predecessor_slots(slot) {
            delta[v_slot as usize] += tree.entry(v_slot).path_count * coeff;
        }

        if slot != 0 {
            let dependency = delta[slot as usize];
            if !dependency.is_finite() {
                return Err(CentralityError::NumericOverflow("betweenness dependencies"));
            }
            if dependency != 0.0 {
                sink(w.node, dependency);
            }
        }
    }

    Ok(())
}

/// Dependencies of every node on one source's traversal, indexed by node.
///
/// Summing this over all sources gives betweenness. For plain weighting the
/// value at `v` is the expected number of times `v` lies strictly inside a
/// shortest path from the source to a target within `radius`.
pub fn single_source_dependencies(
    store: &GraphStore,
    tree: &ShortestPathTree,
    radius: f64,
    beta: Option<f64>,
) -> Result<Vec<f64>> {
    let mut scores = vec![0.0; store.node_count()];
    let mut delta = Vec::new();
    accumulate_dependencies(tree, radius, beta, &mut delta, |node, dep| {
        scores[node as usize] += dep;
    })?;
    Ok(scores)
}

/// Accumulate one source's traversal into per-threshold score rows
fn accumulate_source(
    tree: &ShortestPathTree,
    thresholds: &DistanceThresholds,
    betas: Option<&[f64]>,
    delta: &mut Vec<f64>,
    scores: &mut BetweennessScores,
) -> Result<()> {
    for (t_idx, &radius) in thresholds.as_slice().iter().enumerate() {
        let row = &mut scores.plain[t_idx];
        accumulate_dependencies(tree, radius, None, delta, |node, dep| {
            row[node as usize] += dep;
        })?;

        if let (Some(betas), Some(weighted)) = (betas, scores.weighted.as_mut()) {
            let row = &mut weighted[t_idx];
            accumulate_dependencies(tree, radius, Some(betas[t_idx]), delta, |node, dep| {
                row[node as usize] += dep;
            })?;
        }
    }
    Ok(())
}

fn run_sources(
    store: &GraphStore,
    sources: &[NodeIdx],
    thresholds: &DistanceThresholds,
    cost_model: CostModel,
    betas: Option<&[f64]>,
    cancel: &CancelFlag,
    chunk_size: usize,
) -> Result<BetweennessScores> {
    if let Some(betas) = betas {
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
    }

    let node_count = store.node_count();
    let weighted = betas.is_some();
    let max_radius = thresholds.max();

    // Each chunk owns its score arrays; partials are summed in chunk order so
    // repeated runs produce identical floating point results.
    let partials: Vec<BetweennessScores> = sources
        .par_chunks(chunk_size.max(1))
        .map(|chunk| {
            let mut partial = BetweennessScores::zeros(thresholds.len(), node_count, weighted);
            let mut delta = Vec::new();
            for &source in chunk {
                if cancel.is_cancelled() {
                    return Err(CentralityError::Cancelled);
                }
                let tree = traverse(store, source, cost_model, max_radius)?;
                accumulate_source(&tree, thresholds, betas, &mut delta, &mut partial)?;
            }
            Ok(partial)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut total = BetweennessScores::zeros(thresholds.len(), node_count, weighted);
    for partial in &partials {
        total.merge(partial);
    }

    Ok(total)
}

/// Betweenness of every node at every radius, using every node as a source.
///
/// `betas`, when given, holds one decay rate per radius and adds the
/// beta-weighted variant to the result.
pub fn betweenness(
    store: &GraphStore,
    thresholds: &DistanceThresholds,
    cost_model: CostModel,
    betas: Option<&[f64]>,
    cancel: &CancelFlag,
    chunk_size: usize,
) -> Result<BetweennessScores> {
    log::info!(
        "Computing {} betweenness for {} sources at {} radii",
        cost_model.name(),
        store.node_count(),
        thresholds.len()
    );

    let sources: Vec<NodeIdx> = (0..store.node_count() as NodeIdx).collect();
    run_sources(store, &sources, thresholds, cost_model, betas, cancel, chunk_size)
}

/// Betweenness of a single node within `radius`.
///
/// A source can only route through `node` if its path to `node` is at most
/// `radius` long, so the candidates are the nodes a metric traversal from
/// `node` reaches. Explicit segment lengths may be shorter than the straight
/// line between their ends, so a crow-flies filter would drop sources.
pub fn betweenness_of(
    store: &GraphStore,
    node: NodeIdx,
    radius: f64,
    cost_model: CostModel,
    beta: Option<f64>,
) -> Result<f64> {
    let thresholds = DistanceThresholds::single(radius)?;

    let reach = traverse(store, node, CostModel::Metric, radius)?;
    let mut sources: Vec<NodeIdx> = reach.targets().map(|e| e.node).collect();
    sources.sort_unstable();
    log::debug!(
        "Betweenness of node {} from {} candidate sources",
        node,
        sources.len()
    );

    let betas = beta.map(|b| vec![b]);
    let scores = run_sources(
        store,
        &sources,
        &thresholds,
        cost_model,
        betas.as_deref(),
        &CancelFlag::default(),
        64,
    )?;

    let value = match scores.weighted {
        Some(weighted) => weighted[0][node as usize],
        None => scores.plain[0][node as usize],
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    /// a - b - c - d, unit lengths
    fn line() -> GraphStore {
        let mut b = GraphBuilder::default();
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            b.add_node(id, i as f64, 0.0).unwrap();
        }
        b.add_edge("a", "b", None).unwrap();
        b.add_edge("b", "c", None).unwrap();
        b.add_edge("c", "d", None).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_line_betweenness() {
        let store = line();
        let thresholds = DistanceThresholds::single(10.0).unwrap();
        let scores = betweenness(
            &store,
            &thresholds,
            CostModel::Metric,
            None,
            &CancelFlag::default(),
            2,
        )
        .unwrap();

        // b lies inside a-c, a-d and their reverses
        assert_eq!(scores.plain[0], vec![0.0, 4.0, 4.0, 0.0]);
        assert!(scores.weighted.is_none());
    }

    #[test]
    fn test_radius_limits_pairs() {
        let store = line();
        let thresholds = DistanceThresholds::new(vec![2.0, 3.0]).unwrap();
        let scores = betweenness(
            &store,
            &thresholds,
            CostModel::Metric,
            None,
            &CancelFlag::default(),
            64,
        )
        .unwrap();

        // within 2: only a-c and b-d pairs have interior nodes
        assert_eq!(scores.plain[0], vec![0.0, 2.0, 2.0, 0.0]);
        assert_eq!(scores.plain[1], vec![0.0, 4.0, 4.0, 0.0]);
    }

    #[test]
    fn test_split_paths_share_dependency() {
        // square a-b-c-d-a: a to c splits evenly through b and d
        let mut b = GraphBuilder::default();
        for (id, x, y) in [("a", 0.0, 0.0), ("b", 1.0, 0.0), ("c", 1.0, 1.0), ("d", 0.0, 1.0)] {
            b.add_node(id, x, y).unwrap();
        }
        b.add_edge("a", "b", None).unwrap();
        b.add_edge("b", "c", None).unwrap();
        b.add_edge("c", "d", None).unwrap();
        b.add_edge("d", "a", None).unwrap();
        let store = b.build().unwrap();

        let tree = traverse(&store, 0, CostModel::Metric, 5.0).unwrap();
        let deps = single_source_dependencies(&store, &tree, 5.0, None).unwrap();
        assert_eq!(deps, vec![0.0, 0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_beta_weighted_betweenness() {
        let store = line();
        let beta = 0.5;
        let thresholds = DistanceThresholds::single(10.0).unwrap();
        let scores = betweenness(
            &store,
            &thresholds,
            CostModel::Metric,
            Some(&[beta]),
            &CancelFlag::default(),
            64,
        )
        .unwrap();

        // b: pairs a-c (2), a-d (3), both directions
        let expected = 2.0 * ((-beta * 2.0f64).exp() + (-beta * 3.0f64).exp());
        let weighted = scores.weighted.unwrap();
        assert!((weighted[0][1] - expected).abs() < 1e-12);
        assert!((weighted[0][2] - expected).abs() < 1e-12);
        assert_eq!(weighted[0][0], 0.0);
    }

    #[test]
    fn test_betweenness_of_matches_full_pass() {
        let store = line();
        let value = betweenness_of(&store, 1, 2.0, CostModel::Metric, None).unwrap();
        assert_eq!(value, 2.0);
    }

    #[test]
    fn test_betweenness_of_with_short_segments() {
        // nodes 100 apart joined by 1 m segments
        let mut b = GraphBuilder::default();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            b.add_node(id, i as f64 * 100.0, 0.0).unwrap();
        }
        b.add_edge("a", "b", Some(1.0)).unwrap();
        b.add_edge("b", "c", Some(1.0)).unwrap();
        let store = b.build().unwrap();

        let thresholds = DistanceThresholds::single(3.0).unwrap();
        let full = betweenness(&store, &thresholds, CostModel::Metric, None, &CancelFlag::default(), 1)
            .unwrap();
        assert_eq!(full.plain[0], vec![0.0, 2.0, 0.0]);

        assert_eq!(betweenness_of(&store, 1, 3.0, CostModel::Metric, None).unwrap(), 2.0);
        assert_eq!(betweenness_of(&store, 1, 3.0, CostModel::Angular, None).unwrap(), 2.0);
    }

    /// a-b-c straight on, plus a detour a-d-c. The straight route is shorter
    /// but pays a large turn at b.
    fn bent_straight() -> GraphStore {
        let mut b = GraphBuilder::default();
        for (id, x, y) in [("a", 0.0, 0.0), ("b", 10.0, 0.0), ("c", 20.0, 0.0), ("d", 10.0, 5.0)] {
            b.add_node(id, x, y).unwrap();
        }
        b.add_edge_with_angles("a", "b", Some(10.0), 0.0, 0.0).unwrap();
        b.add_edge_with_angles("b", "c", Some(10.0), 90.0, 90.0).unwrap();
        b.add_edge_with_angles("a", "d", Some(12.0), 0.0, 0.0).unwrap();
        b.add_edge_with_angles("d", "c", Some(12.0), 0.0, 0.0).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_angular_betweenness_takes_detour() {
        let store = bent_straight();
        let thresholds = DistanceThresholds::single(100.0).unwrap();

        let metric = betweenness(&store, &thresholds, CostModel::Metric, None, &CancelFlag::default(), 2)
            .unwrap();
        // a-c runs through b by length; b-d ties through a and c
        assert_eq!(metric.plain[0], vec![1.0, 2.0, 1.0, 0.0]);

        let angular = betweenness(&store, &thresholds, CostModel::Angular, None, &CancelFlag::default(), 2)
            .unwrap();
        // the turn at b costs 90, so a-c goes round through d and b-c goes
        // back through a and d (34 against 100)
        assert_eq!(angular.plain[0], vec![4.0, 0.0, 0.0, 4.0]);

        for node in 0..4 {
            let single = betweenness_of(&store, node, 100.0, CostModel::Angular, None).unwrap();
            assert_eq!(single, angular.plain[0][node as usize]);
        }
    }

    #[test]
    fn test_cancelled_pass() {
        let store = line();
        let thresholds = DistanceThresholds::single(10.0).unwrap();
        let cancel = CancelFlag::default();
        cancel.cancel();
        let result = betweenness(&store, &thresholds, CostModel::Metric, None, &cancel, 1);
        assert!(matches!(result, Err(CentralityError::Cancelled)));
    }
}
