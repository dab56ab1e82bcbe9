//! Crow-flies lookups and spatial clipping

use crate::error::{CentralityError, Result};
use crate::graph::store::{EdgeIdx, GraphStore, NodeIdx};

/// Find the node nearest to (x, y), if one lies within `max_dist`
pub fn nearest_node(store: &GraphStore, x: f64, y: f64, max_dist: f64) -> Option<(NodeIdx, f64)> {
    let mut best: Option<(NodeIdx, f64)> = None;

    for (idx, node) in store.nodes().iter().enumerate() {
        let dist = (node.x - x).hypot(node.y - y);
        if dist > max_dist {
            continue;
        }
        // strict comparison keeps the lowest index on ties
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((idx as NodeIdx, dist));
        }
    }

    best
}

/// Indices of all nodes within `max_dist` of (x, y) as the crow flies
pub fn radial_filter(store: &GraphStore, x: f64, y: f64, max_dist: f64) -> Vec<NodeIdx> {
    store
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, n)| (n.x - x).hypot(n.y - y) <= max_dist)
        .map(|(i, _)| i as NodeIdx)
        .collect()
}

/// Extract the part of the network within `max_dist` of (x, y).
///
/// Only edges with both endpoints inside the circle are kept. Node labels,
/// live flags and weights are carried over.
pub fn clip_to_radius(store: &GraphStore, x: f64, y: f64, max_dist: f64) -> Result<GraphStore> {
    if !(max_dist > 0.0) {
        return Err(CentralityError::InvalidRadius(max_dist));
    }

    let kept = radial_filter(store, x, y, max_dist);

    // Create mapping from original to clipped indices
    let mut orig_to_sub = vec![u32::MAX; store.node_count()];
    for (sub_idx, &orig_idx) in kept.iter().enumerate() {
        orig_to_sub[orig_idx as usize] = sub_idx as u32;
    }

    let mut builder = crate::graph::GraphBuilder::with_capacity(kept.len());
    for &orig_idx in &kept {
        let node = store.nodes()[orig_idx as usize];
        builder.add_node_with(&store.label(orig_idx), node.x, node.y, node.live, node.weight)?;
    }

    for edge_idx in 0..store.edge_count() {
        let edge = store.edge(edge_idx as EdgeIdx);
        let start = orig_to_sub[edge.start as usize];
        let end = orig_to_sub[edge.end as usize];
        // Only include edges where both endpoints are in the clip
        if start != u32::MAX && end != u32::MAX {
            builder.add_edge_idx(start, end, edge.length, edge.angle_forward, edge.angle_reverse)?;
        }
    }

    log::info!(
        "Clipped graph to {} of {} nodes within {} of ({}, {})",
        kept.len(),
        store.node_count(),
        max_dist,
        x,
        y
    );

    builder.build()
}
