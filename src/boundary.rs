//! Scalar C boundary over a process-wide graph store.
//!
//! Every query takes and returns plain scalars. A failed float query returns
//! NaN and `NodeCycles` returns -1; `LastStatus` reports the error code of
//! the most recent call (0 on success) so callers can tell an invalid input
//! apart from a legitimate zero result.

#![allow(non_snake_case)]

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::centrality::{BetaQuery, BetweennessQuery, Centrality, NodeQuery, NodeRef, Weighting};
use crate::config::distance_from_beta;
use crate::data::load_graph;
use crate::error::{CentralityError, Result};
use crate::graph::{CostModel, GraphStore, NodeIdx};

/// Graph file read by `MakeGraph`
pub const GRAPH_PATH_VAR: &str = "STREET_CENTRALITY_GRAPH";

/// When set to `1`, nodes without explicit weights get half their incident
/// street length
pub const LENGTH_WEIGHTS_VAR: &str = "STREET_CENTRALITY_LENGTH_WEIGHTS";

static GRAPH: RwLock<Option<GraphStore>> = RwLock::new(None);
static LAST_STATUS: AtomicI32 = AtomicI32::new(0);

/// Replace the process-wide store
pub fn install_graph(store: GraphStore) {
    log::info!(
        "Installing graph with {} nodes and {} edges",
        store.node_count(),
        store.edge_count()
    );
    *GRAPH.write().unwrap_or_else(PoisonError::into_inner) = Some(store);
}

/// Drop the process-wide store; later queries fail with `UninitializedGraph`
pub fn clear_graph() {
    *GRAPH.write().unwrap_or_else(PoisonError::into_inner) = None;
}

/// Error code of the most recent boundary call, 0 on success
pub fn last_status() -> i32 {
    LAST_STATUS.load(Ordering::Relaxed)
}

fn with_graph<T, F>(f: F) -> Result<T>
where
    F: FnOnce(&GraphStore) -> Result<T>,
{
    let guard = GRAPH.read().unwrap_or_else(PoisonError::into_inner);
    match guard.as_ref() {
        Some(store) => f(store),
        None => Err(CentralityError::UninitializedGraph),
    }
}

fn record<T>(result: &Result<T>) {
    let code = match result {
        Ok(_) => 0,
        Err(e) => {
            log::warn!("boundary call failed: {}", e);
            e.code()
        }
    };
    LAST_STATUS.store(code, Ordering::Relaxed);
}

fn scalar(result: Result<f64>) -> f64 {
    record(&result);
    result.unwrap_or(f64::NAN)
}

/// Node indices cross the boundary as floats in the betweenness calls
fn index_from_f64(value: f64) -> Result<NodeIdx> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= NodeIdx::MAX as f64 {
        Ok(value as NodeIdx)
    } else {
        Err(CentralityError::UnknownNode(format!("index {}", value)))
    }
}

fn index_from_i64(value: i64) -> Result<NodeIdx> {
    NodeIdx::try_from(value).map_err(|_| CentralityError::UnknownNode(format!("index {}", value)))
}

fn coordinate_query(x: f64, y: f64, max_radius: f64, mode: i64) -> Result<NodeQuery> {
    Ok(NodeQuery {
        node: NodeRef::Coordinate { x, y },
        max_radius,
        weighting: Weighting::from_mode(mode)?,
    })
}

fn load_from_env() -> Result<GraphStore> {
    let path = std::env::var(GRAPH_PATH_VAR)
        .map_err(|_| CentralityError::Format(format!("{} is not set", GRAPH_PATH_VAR)))?;
    let length_weighted = std::env::var(LENGTH_WEIGHTS_VAR).map(|v| v == "1").unwrap_or(false);
    load_graph(&path, length_weighted).map_err(|e| match e.downcast::<CentralityError>() {
        Ok(inner) => inner,
        Err(other) => CentralityError::Format(format!("{:#}", other)),
    })
}

/// Load the process-wide store from the file named by `STREET_CENTRALITY_GRAPH`.
///
/// On failure the previous store, if any, is kept and `LastStatus` is set.
#[no_mangle]
pub extern "C" fn MakeGraph() {
    let result = load_from_env().map(install_graph);
    record(&result);
}

/// Dump the current store to stdout
#[no_mangle]
pub extern "C" fn PrintGraph() {
    let guard = GRAPH.read().unwrap_or_else(PoisonError::into_inner);
    match guard.as_ref() {
        Some(store) => print!("{}", store),
        None => println!("graph: empty"),
    }
}

#[no_mangle]
pub extern "C" fn LastStatus() -> i32 {
    last_status()
}

#[no_mangle]
pub extern "C" fn NodeDensity(x: f64, y: f64, max_radius: f64, mode: i64) -> f64 {
    scalar(with_graph(|store| {
        Centrality::new(store).node_density(&coordinate_query(x, y, max_radius, mode)?)
    }))
}

#[no_mangle]
pub extern "C" fn NodeFarness(x: f64, y: f64, max_radius: f64, mode: i64) -> f64 {
    scalar(with_graph(|store| {
        Centrality::new(store).node_farness(&coordinate_query(x, y, max_radius, mode)?)
    }))
}

#[no_mangle]
pub extern "C" fn NodeCycles(x: f64, y: f64, max_radius: f64, mode: i64) -> i64 {
    let result = with_graph(|store| {
        Centrality::new(store).node_cycles(&coordinate_query(x, y, max_radius, mode)?)
    });
    record(&result);
    result.map(i64::from).unwrap_or(-1)
}

#[no_mangle]
pub extern "C" fn NodeHarmonic(x: f64, y: f64, max_radius: f64, mode: i64) -> f64 {
    scalar(with_graph(|store| {
        Centrality::new(store).node_harmonic(&coordinate_query(x, y, max_radius, mode)?)
    }))
}

#[no_mangle]
pub extern "C" fn NodeBeta(beta: f64, max_radius: f64, origin_id: i64, mode: i64) -> f64 {
    scalar(with_graph(|store| {
        let query = BetaQuery {
            node: NodeRef::Index(index_from_i64(origin_id)?),
            max_radius,
            beta,
            weighting: Weighting::from_mode(mode)?,
        };
        Centrality::new(store).node_beta(&query)
    }))
}

#[no_mangle]
pub extern "C" fn NodeHarmonicAngular(x: f64, y: f64, max_radius: f64, mode: i64) -> f64 {
    scalar(with_graph(|store| {
        Centrality::new(store).node_harmonic_angular(&coordinate_query(x, y, max_radius, mode)?)
    }))
}

#[no_mangle]
pub extern "C" fn NodeBetweenness(max_radius: f64, node_id: f64) -> f64 {
    scalar(with_graph(|store| {
        let query = BetweennessQuery {
            node: NodeRef::Index(index_from_f64(node_id)?),
            max_radius,
            cost_model: CostModel::Metric,
        };
        Centrality::new(store).node_betweenness(&query)
    }))
}

/// Beta-weighted betweenness; the radius is where the decay reaches the
/// minimum threshold weight
#[no_mangle]
pub extern "C" fn NodeBetweennessBeta(beta: f64, node_id: f64) -> f64 {
    scalar(with_graph(|store| {
        let query = BetweennessQuery {
            node: NodeRef::Index(index_from_f64(node_id)?),
            max_radius: distance_from_beta(beta)?,
            cost_model: CostModel::Metric,
        };
        Centrality::new(store).node_betweenness_beta(&query, beta)
    }))
}
