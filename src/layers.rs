//! Data layers: classified points (shops, stops, schools) snapped to the
//! street network and counted by network distance from each node.
//!
//! A point is assigned to its nearest network node within a search distance.
//! Its distance from an origin is the metric shortest-path length to that
//! node plus the straight-line offset from the node to the point.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::centrality::metrics::check_betas;
use crate::centrality::CancelFlag;
use crate::config::{beta_from_distance, Config, DistanceThresholds};
use crate::error::{CentralityError, Result};
use crate::graph::spatial::nearest_node;
use crate::graph::{traverse, CostModel, GraphStore, NodeIdx};

/// One classified point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub class: String,
}

/// Where a point joins the network
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub node: NodeIdx,

    /// Straight-line distance from the node to the point
    pub offset: f64,
}

/// Assign every point to its nearest node within `max_dist`.
/// Points with no node in range stay unassigned.
pub fn assign_to_network(
    store: &GraphStore,
    points: &[DataPoint],
    max_dist: f64,
) -> Result<Vec<Option<Assignment>>> {
    if !(max_dist >= 0.0) || !max_dist.is_finite() {
        return Err(CentralityError::InvalidRadius(max_dist));
    }
    if let Some(bad) = points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(CentralityError::InvalidNode {
            id: bad.id.clone(),
            reason: format!("data point coordinates ({}, {}) must be finite", bad.x, bad.y),
        });
    }

    let assigned: Vec<Option<Assignment>> = points
        .par_iter()
        .map(|p| nearest_node(store, p.x, p.y, max_dist).map(|(node, offset)| Assignment { node, offset }))
        .collect();

    let missing = assigned.iter().filter(|a| a.is_none()).count();
    if missing > 0 {
        log::warn!("{} of {} data points have no node within {}", missing, points.len(), max_dist);
    }

    Ok(assigned)
}

/// Points assigned to a network, grouped by node
#[derive(Debug, Clone)]
pub struct DataLayer {
    points: Vec<DataPoint>,
    assignments: Vec<Option<Assignment>>,
    by_node: HashMap<NodeIdx, Vec<u32>>,
    classes: Vec<String>,
    class_of: Vec<u32>,
}

impl DataLayer {
    pub fn new(store: &GraphStore, points: Vec<DataPoint>, max_dist: f64) -> Result<Self> {
        let assignments = assign_to_network(store, &points, max_dist)?;

        let classes: Vec<String> = points
            .iter()
            .map(|p| p.class.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let class_of = points
            .iter()
            .map(|p| classes.binary_search(&p.class).unwrap_or_default() as u32)
            .collect();

        let mut by_node: HashMap<NodeIdx, Vec<u32>> = HashMap::new();
        for (i, a) in assignments.iter().enumerate() {
            if let Some(a) = a {
                by_node.entry(a.node).or_default().push(i as u32);
            }
        }

        log::info!(
            "Data layer: {} points in {} classes on {} nodes",
            points.len(),
            classes.len(),
            by_node.len()
        );

        Ok(Self {
            points,
            assignments,
            by_node,
            classes,
            class_of,
        })
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn assignments(&self) -> &[Option<Assignment>] {
        &self.assignments
    }

    /// Distinct classes, sorted
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn unassigned_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_none()).count()
    }

    /// Indices of the points assigned to `node`
    pub fn points_at(&self, node: NodeIdx) -> &[u32] {
        self.by_node.get(&node).map_or(&[], |v| v.as_slice())
    }

    pub fn class_index(&self, class: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(class))
            .map_err(|_| CentralityError::UnknownClass(class.to_string()))
    }
}

/// Hill number of order `q` for a set of class counts.
///
/// q = 0 is class richness, q = 1 the exponential of Shannon entropy, q = 2
/// the inverse Simpson index. No points gives 0.
pub fn hill_diversity(counts: &[f64], q: f64) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let shares = counts.iter().filter(|&&c| c > 0.0).map(|c| c / total);

    if q == 0.0 {
        shares.count() as f64
    } else if (q - 1.0).abs() < 1e-12 {
        (-shares.map(|p| p * p.ln()).sum::<f64>()).exp()
    } else {
        shares.map(|p| p.powf(q)).sum::<f64>().powf(1.0 / (1.0 - q))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAccessibility {
    pub class: String,

    /// Points within each distance
    pub count: Vec<f64>,

    /// Points within each distance, each weighted by exp(-beta * d)
    pub weighted: Vec<f64>,
}

/// Hill diversity of all classes reachable within one distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diversity {
    pub q0: f64,
    pub q1: f64,
    pub q2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAccessibility {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub classes: Vec<ClassAccessibility>,
    pub diversity: Vec<Diversity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityReport {
    pub distances: Vec<f64>,
    pub betas: Vec<f64>,
    pub unassigned: usize,
    pub nodes: Vec<NodeAccessibility>,
}

/// Count the points reachable from `origin` at every distance in
/// `thresholds`, for the classes at `class_idx` in the layer.
///
/// A point counts toward distance `d` when its network distance is at most
/// `d`. Points assigned to the origin itself are reached at their offset.
/// Diversity always covers every class in the layer.
pub fn accessibility_from(
    store: &GraphStore,
    layer: &DataLayer,
    origin: NodeIdx,
    thresholds: &DistanceThresholds,
    betas: &[f64],
    class_idx: &[usize],
) -> Result<NodeAccessibility> {
    check_betas(thresholds, betas)?;
    if let Some(bad) = class_idx.iter().find(|&&c| c >= layer.classes.len()) {
        return Err(CentralityError::UnknownClass(format!("class index {}", bad)));
    }
    let distances = thresholds.as_slice();
    let tree = traverse(store, origin, CostModel::Metric, thresholds.max())?;

    let n_classes = layer.classes.len();
    let mut count = vec![vec![0.0; distances.len()]; n_classes];
    let mut weighted = vec![vec![0.0; distances.len()]; n_classes];

    for entry in tree.reached() {
        for &p in layer.points_at(entry.node) {
            let Some(a) = layer.assignments[p as usize] else {
                continue;
            };
            let d = entry.distance + a.offset;
            let c = layer.class_of[p as usize] as usize;
            for (t, &limit) in distances.iter().enumerate() {
                if d <= limit {
                    count[c][t] += 1.0;
                    weighted[c][t] += (-betas[t] * d).exp();
                }
            }
        }
    }

    let diversity = (0..distances.len())
        .map(|t| {
            let at: Vec<f64> = count.iter().map(|row| row[t]).collect();
            Diversity {
                q0: hill_diversity(&at, 0.0),
                q1: hill_diversity(&at, 1.0),
                q2: hill_diversity(&at, 2.0),
            }
        })
        .collect();

    let node = store.node(origin)?;
    Ok(NodeAccessibility {
        id: store.label(origin),
        x: node.x,
        y: node.y,
        classes: class_idx
            .iter()
            .map(|&c| ClassAccessibility {
                class: layer.classes[c].clone(),
                count: count[c].clone(),
                weighted: weighted[c].clone(),
            })
            .collect(),
        diversity,
    })
}

/// Accessibility for every live node at every configured distance.
///
/// `classes` selects which classes are reported; empty means all of them.
pub fn compute_accessibility(
    store: &GraphStore,
    layer: &DataLayer,
    config: &Config,
    classes: &[String],
    cancel: &CancelFlag,
) -> Result<AccessibilityReport> {
    let thresholds = config.thresholds()?;
    let betas = thresholds
        .as_slice()
        .iter()
        .map(|&d| beta_from_distance(d))
        .collect::<Result<Vec<_>>>()?;

    let class_idx: Vec<usize> = if classes.is_empty() {
        (0..layer.classes().len()).collect()
    } else {
        classes
            .iter()
            .map(|c| layer.class_index(c))
            .collect::<Result<_>>()?
    };

    let live = store.live_nodes();
    log::info!(
        "Computing accessibility to {} classes for {} live nodes",
        class_idx.len(),
        live.len()
    );

    let nodes = live
        .par_iter()
        .map(|&origin| {
            if cancel.is_cancelled() {
                return Err(CentralityError::Cancelled);
            }
            accessibility_from(store, layer, origin, &thresholds, &betas, &class_idx)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AccessibilityReport {
        distances: thresholds.as_slice().to_vec(),
        betas,
        unassigned: layer.unassigned_count(),
        nodes,
    })
}
