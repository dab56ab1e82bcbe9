//! Parquet file handling for street networks

use std::path::Path;

use anyhow::Result;
use polars::prelude::*;

use crate::graph::{GraphBuilder, GraphStore};

/// Node table path for a dataset stem
pub fn nodes_path(stem: &str) -> String {
    format!("{}.nodes.parquet", stem)
}

/// Edge table path for a dataset stem
pub fn edges_path(stem: &str) -> String {
    format!("{}.edges.parquet", stem)
}

fn read_table(path: &str) -> Result<DataFrame> {
    log::info!("Reading parquet file: {}", path);

    // Check if the file exists
    if !Path::new(path).exists() {
        return Err(anyhow::anyhow!("File not found: {}", path));
    }

    let df = LazyFrame::scan_parquet(path, Default::default())?.collect()?;
    log::debug!("File schema: {:?}", df.schema());
    Ok(df)
}

fn float_column(df: &DataFrame, name: &str) -> Result<Column> {
    Ok(df.column(name)?.cast(&DataType::Float64)?)
}

fn string_column(df: &DataFrame, name: &str) -> Result<Column> {
    Ok(df.column(name)?.cast(&DataType::String)?)
}

/// Load a street network from `<stem>.nodes.parquet` and `<stem>.edges.parquet`.
///
/// Node columns: `id`, `x`, `y`, optional `live` and `weight`.
/// Edge columns: `start`, `end`, optional `length`, `angle_forward`,
/// `angle_reverse`.
pub fn load_graph_parquet(stem: &str, length_weighted: bool) -> Result<GraphStore> {
    let nodes = read_table(&nodes_path(stem))?;
    let edges = read_table(&edges_path(stem))?;

    log::info!(
        "Loaded {} node rows and {} edge rows",
        nodes.height(),
        edges.height()
    );

    let ids = string_column(&nodes, "id")?;
    let ids = ids.str()?;
    let xs = float_column(&nodes, "x")?;
    let xs = xs.f64()?;
    let ys = float_column(&nodes, "y")?;
    let ys = ys.f64()?;
    let live = nodes.column("live").ok().map(|c| c.cast(&DataType::Boolean)).transpose()?;
    let live = live.as_ref().map(|c| c.bool()).transpose()?;
    let weights = nodes.column("weight").ok().map(|_| float_column(&nodes, "weight")).transpose()?;
    let weights = weights.as_ref().map(|c| c.f64()).transpose()?;

    let mut builder = GraphBuilder::with_capacity(nodes.height());

    for i in 0..nodes.height() {
        let id = ids
            .get(i)
            .ok_or_else(|| anyhow::anyhow!("node row {} has no id", i))?;
        let x = xs.get(i).ok_or_else(|| anyhow::anyhow!("node {} has no x", id))?;
        let y = ys.get(i).ok_or_else(|| anyhow::anyhow!("node {} has no y", id))?;
        let is_live = live.and_then(|c| c.get(i)).unwrap_or(true);
        let weight = weights.and_then(|c| c.get(i)).unwrap_or(1.0);
        builder.add_node_with(id, x, y, is_live, weight)?;
    }

    let starts = string_column(&edges, "start")?;
    let starts = starts.str()?;
    let ends = string_column(&edges, "end")?;
    let ends = ends.str()?;
    let optional = |name: &str| -> Result<Option<Column>> {
        edges
            .column(name)
            .ok()
            .map(|_| float_column(&edges, name))
            .transpose()
    };
    let lengths = optional("length")?;
    let lengths = lengths.as_ref().map(|c| c.f64()).transpose()?;
    let forward = optional("angle_forward")?;
    let forward = forward.as_ref().map(|c| c.f64()).transpose()?;
    let reverse = optional("angle_reverse")?;
    let reverse = reverse.as_ref().map(|c| c.f64()).transpose()?;

    for i in 0..edges.height() {
        let start = starts
            .get(i)
            .ok_or_else(|| anyhow::anyhow!("edge row {} has no start", i))?;
        let end = ends
            .get(i)
            .ok_or_else(|| anyhow::anyhow!("edge row {} has no end", i))?;
        let length = lengths.and_then(|c| c.get(i));
        let angle_forward = forward.and_then(|c| c.get(i)).unwrap_or(0.0);
        let angle_reverse = reverse.and_then(|c| c.get(i)).unwrap_or(0.0);
        builder.add_edge_with_angles(start, end, length, angle_forward, angle_reverse)?;
    }

    if length_weighted && weights.is_none() {
        builder.length_weighted_nodes();
    }

    let store = builder.build()?;
    log::info!(
        "Built graph with {} nodes and {} edges",
        store.node_count(),
        store.edge_count()
    );

    Ok(store)
}
