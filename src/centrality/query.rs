//! Per-node query entry points

use serde::{Deserialize, Serialize};

use crate::centrality::betweenness::betweenness_of;
use crate::centrality::metrics::{accumulate, harmonic_by_cost, NodeMetrics, Weighting};
use crate::config::{Config, DistanceThresholds};
use crate::error::{CentralityError, Result};
use crate::graph::spatial::nearest_node;
use crate::graph::{traverse, CostModel, GraphStore, NodeIdx};

/// How a query names its origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NodeRef {
    Index(NodeIdx),

    /// Resolved to the nearest node within the snap tolerance
    Coordinate { x: f64, y: f64 },
}

/// Origin, radius and weighting for a closeness-family query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeQuery {
    pub node: NodeRef,
    pub max_radius: f64,
    pub weighting: Weighting,
}

impl NodeQuery {
    pub fn new(node: NodeRef, max_radius: f64) -> Self {
        Self {
            node,
            max_radius,
            weighting: Weighting::Unweighted,
        }
    }
}

/// Gravity query: a closeness query plus its decay rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaQuery {
    pub node: NodeRef,
    pub max_radius: f64,
    pub beta: f64,
    pub weighting: Weighting,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetweennessQuery {
    pub node: NodeRef,

    /// Pairs farther apart than this are ignored; infinite for network-wide
    pub max_radius: f64,
    pub cost_model: CostModel,
}

/// Query context over a borrowed graph store
#[derive(Debug, Clone, Copy)]
pub struct Centrality<'a> {
    store: &'a GraphStore,
    snap_tolerance: f64,
}

impl<'a> Centrality<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self::from_config(store, &Config::default())
    }

    pub fn from_config(store: &'a GraphStore, config: &Config) -> Self {
        Self {
            store,
            snap_tolerance: config.snap_tolerance,
        }
    }

    pub fn with_snap_tolerance(mut self, snap_tolerance: f64) -> Self {
        self.snap_tolerance = snap_tolerance;
        self
    }

    /// Resolve a node reference to an index
    pub fn resolve(&self, node: &NodeRef) -> Result<NodeIdx> {
        match *node {
            NodeRef::Index(idx) => {
                self.store.node(idx)?;
                Ok(idx)
            }
            NodeRef::Coordinate { x, y } => nearest_node(self.store, x, y, self.snap_tolerance)
                .map(|(idx, _)| idx)
                .ok_or_else(|| {
                    CentralityError::UnknownNode(format!(
                        "no node within {} of ({}, {})",
                        self.snap_tolerance, x, y
                    ))
                }),
        }
    }

    fn closeness(&self, node: &NodeRef, max_radius: f64, weighting: Weighting, beta: f64) -> Result<NodeMetrics> {
        let thresholds = DistanceThresholds::single(max_radius)?;
        let origin = self.resolve(node)?;
        let tree = traverse(self.store, origin, CostModel::Metric, max_radius)?;
        let mut metrics = accumulate(self.store, &tree, &thresholds, weighting, &[beta])?;
        Ok(metrics.remove(0))
    }

    /// Count (or total weight) of nodes reachable within the radius
    pub fn node_density(&self, query: &NodeQuery) -> Result<f64> {
        Ok(self.closeness(&query.node, query.max_radius, query.weighting, 0.0)?.density)
    }

    /// Sum of shortest-path distances to reachable nodes
    pub fn node_farness(&self, query: &NodeQuery) -> Result<f64> {
        Ok(self.closeness(&query.node, query.max_radius, query.weighting, 0.0)?.farness)
    }

    /// Independent cycles closed within the radius. Weighting does not apply.
    pub fn node_cycles(&self, query: &NodeQuery) -> Result<u32> {
        Ok(self.closeness(&query.node, query.max_radius, query.weighting, 0.0)?.cycles)
    }

    pub fn node_harmonic(&self, query: &NodeQuery) -> Result<f64> {
        Ok(self.closeness(&query.node, query.max_radius, query.weighting, 0.0)?.harmonic)
    }

    /// Gravity index: Σ w·exp(-β·d) over reachable nodes
    pub fn node_beta(&self, query: &BetaQuery) -> Result<f64> {
        if !query.beta.is_finite() || query.beta < 0.0 {
            return Err(CentralityError::InvalidBeta(query.beta));
        }
        Ok(self
            .closeness(&query.node, query.max_radius, query.weighting, query.beta)?
            .gravity)
    }

    /// Harmonic closeness over angular cost
    pub fn node_harmonic_angular(&self, query: &NodeQuery) -> Result<f64> {
        let thresholds = DistanceThresholds::single(query.max_radius)?;
        let origin = self.resolve(&query.node)?;
        let tree = traverse(self.store, origin, CostModel::Angular, query.max_radius)?;
        Ok(harmonic_by_cost(self.store, &tree, &thresholds, query.weighting)[0])
    }

    pub fn node_betweenness(&self, query: &BetweennessQuery) -> Result<f64> {
        let node = self.resolve(&query.node)?;
        betweenness_of(self.store, node, query.max_radius, query.cost_model, None)
    }

    /// Betweenness with each pair scaled by exp(-β·d(s,t))
    pub fn node_betweenness_beta(&self, query: &BetweennessQuery, beta: f64) -> Result<f64> {
        if !beta.is_finite() || beta < 0.0 {
            return Err(CentralityError::InvalidBeta(beta));
        }
        let node = self.resolve(&query.node)?;
        betweenness_of(self.store, node, query.max_radius, query.cost_model, Some(beta))
    }
}
