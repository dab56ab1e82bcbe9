//! Whole-network centrality pass

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::centrality::betweenness::betweenness;
use crate::centrality::metrics::{accumulate, harmonic_by_cost, NodeMetrics, Weighting};
use crate::centrality::CancelFlag;
use crate::config::{beta_from_distance, Config};
use crate::error::{CentralityError, Result};
use crate::graph::{traverse, CostModel, GraphStore};

/// Measures for one node at one radius
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiusReport {
    pub distance: f64,

    /// Decay rate derived from `distance`
    pub beta: f64,

    pub density: f64,
    pub farness: f64,
    pub harmonic: f64,
    pub gravity: f64,
    pub cycles: u32,

    /// Only computed under the angular cost model
    pub harmonic_angular: Option<f64>,

    pub betweenness: Option<f64>,
    pub betweenness_beta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub radii: Vec<RadiusReport>,
}

/// Results of a whole-network pass over every live node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityReport {
    pub cost_model: CostModel,
    pub weighting: Weighting,
    pub distances: Vec<f64>,
    pub nodes: Vec<NodeReport>,
}

/// Compute every measure for every live node at every configured radius.
///
/// Closeness measures use one metric traversal per live origin (plus an
/// angular traversal when the cost model is angular). Betweenness, when
/// enabled, traverses from every node and credits all nodes, then is
/// reported for live nodes.
pub fn compute_centrality(
    store: &GraphStore,
    config: &Config,
    cancel: &CancelFlag,
) -> Result<CentralityReport> {
    let thresholds = config.thresholds()?;
    let betas = thresholds
        .as_slice()
        .iter()
        .map(|&d| beta_from_distance(d))
        .collect::<Result<Vec<_>>>()?;

    let live = store.live_nodes();
    log::info!(
        "Computing closeness for {} live nodes of {} at distances {:?}",
        live.len(),
        store.node_count(),
        thresholds.as_slice()
    );

    // Each origin writes only its own slot
    let closeness: Vec<(Vec<NodeMetrics>, Option<Vec<f64>>)> = live
        .par_iter()
        .map(|&origin| {
            if cancel.is_cancelled() {
                return Err(CentralityError::Cancelled);
            }
            let tree = traverse(store, origin, CostModel::Metric, thresholds.max())?;
            let metrics = accumulate(store, &tree, &thresholds, config.weighting, &betas)?;

            let angular = match config.cost_model {
                CostModel::Angular => {
                    let tree = traverse(store, origin, CostModel::Angular, thresholds.max())?;
                    Some(harmonic_by_cost(store, &tree, &thresholds, config.weighting))
                }
                CostModel::Metric => None,
            };

            Ok((metrics, angular))
        })
        .collect::<Result<Vec<_>>>()?;

    let between = if config.betweenness {
        Some(betweenness(
            store,
            &thresholds,
            config.cost_model,
            Some(&betas),
            cancel,
            config.chunk_size,
        )?)
    } else {
        None
    };

    let nodes = live
        .iter()
        .zip(closeness)
        .map(|(&idx, (metrics, angular))| {
            let node = &store.nodes()[idx as usize];
            let radii = metrics
                .iter()
                .enumerate()
                .map(|(t, m)| RadiusReport {
                    distance: thresholds.as_slice()[t],
                    beta: betas[t],
                    density: m.density,
                    farness: m.farness,
                    harmonic: m.harmonic,
                    gravity: m.gravity,
                    cycles: m.cycles,
                    harmonic_angular: angular.as_ref().map(|a| a[t]),
                    betweenness: between.as_ref().map(|b| b.plain[t][idx as usize]),
                    betweenness_beta: between
                        .as_ref()
                        .and_then(|b| b.weighted.as_ref())
                        .map(|w| w[t][idx as usize]),
                })
                .collect();

            NodeReport {
                id: store.label(idx),
                x: node.x,
                y: node.y,
                radii,
            }
        })
        .collect();

    log::info!("Centrality pass complete for {} nodes", live.len());

    Ok(CentralityReport {
        cost_model: config.cost_model,
        weighting: config.weighting,
        distances: thresholds.as_slice().to_vec(),
        nodes,
    })
}
