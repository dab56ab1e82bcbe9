//! Graph file loading

pub mod json;
pub mod parquet;

use anyhow::Result;

use crate::graph::GraphStore;

/// Load a graph, choosing the reader by file name.
///
/// `*.json` is read as a JSON graph, `*.bin` as a binary snapshot, and
/// anything else is treated as a Parquet dataset stem.
pub fn load_graph(path: &str, length_weighted: bool) -> Result<GraphStore> {
    if path.ends_with(".json") {
        json::load_graph_json(path, length_weighted)
    } else if path.ends_with(".bin") {
        crate::storage::load_snapshot(path)
    } else {
        parquet::load_graph_parquet(path, length_weighted)
    }
}
