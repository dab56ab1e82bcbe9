//! Results persistence module

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, to_string_pretty, Value};
use statrs::statistics::Statistics;

use crate::centrality::{CentralityReport, RadiusReport};
use crate::graph::GraphStore;
use crate::layers::AccessibilityReport;

/// Save analysis results to the specified directory
pub fn save_results(report: &CentralityReport, store: &GraphStore, output_dir: &str) -> Result<()> {
    log::info!("Saving centrality for {} nodes to {}", report.nodes.len(), output_dir);

    // Ensure output directory exists
    fs::create_dir_all(output_dir)?;

    let path = Path::new(output_dir).join("centrality.json");
    let mut file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    file.write_all(to_string_pretty(report)?.as_bytes())?;

    save_summary(report, store, output_dir)?;

    log::info!("Results saved successfully");

    Ok(())
}

/// mean / std-dev / max of one measure across nodes
fn describe(values: &[f64]) -> Value {
    if values.is_empty() {
        return json!({ "count": 0 });
    }
    json!({
        "count": values.len(),
        "mean": Statistics::mean(values.iter()),
        "std_dev": Statistics::std_dev(values.iter()),
        "max": Statistics::max(values.iter()),
    })
}

fn measure_values<F>(report: &CentralityReport, t: usize, pick: F) -> Vec<f64>
where
    F: Fn(&RadiusReport) -> Option<f64>,
{
    report
        .nodes
        .iter()
        .filter_map(|n| n.radii.get(t).and_then(&pick))
        .collect()
}

/// Build the summary document: graph statistics plus per-radius
/// descriptive statistics for every measure
pub fn summarise(report: &CentralityReport, store: &GraphStore) -> Value {
    let radii: Vec<Value> = report
        .distances
        .iter()
        .enumerate()
        .map(|(t, &distance)| {
            json!({
                "distance": distance,
                "density": describe(&measure_values(report, t, |r| Some(r.density))),
                "farness": describe(&measure_values(report, t, |r| Some(r.farness))),
                "harmonic": describe(&measure_values(report, t, |r| Some(r.harmonic))),
                "gravity": describe(&measure_values(report, t, |r| Some(r.gravity))),
                "cycles": describe(&measure_values(report, t, |r| Some(r.cycles as f64))),
                "harmonic_angular": describe(&measure_values(report, t, |r| r.harmonic_angular)),
                "betweenness": describe(&measure_values(report, t, |r| r.betweenness)),
                "betweenness_beta": describe(&measure_values(report, t, |r| r.betweenness_beta)),
            })
        })
        .collect();

    let node_count = store.node_count();
    json!({
        "graph_stats": {
            "node_count": node_count,
            "live_node_count": store.live_nodes().len(),
            "edge_count": store.edge_count(),
            "total_length": store.total_length(),
            "avg_degree": if node_count == 0 { 0.0 } else { 2.0 * store.edge_count() as f64 / node_count as f64 },
        },
        "cost_model": report.cost_model,
        "weighting": report.weighting,
        "radii": radii,
    })
}

fn save_summary(report: &CentralityReport, store: &GraphStore, output_dir: &str) -> Result<()> {
    log::info!("Saving summary information");

    let path = Path::new(output_dir).join("summary.json");
    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(&summarise(report, store))?.as_bytes())?;

    Ok(())
}

/// Save data-layer accessibility as `accessibility.json`
pub fn save_accessibility(report: &AccessibilityReport, output_dir: &str) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    let path = Path::new(output_dir).join("accessibility.json");
    log::info!("Saving accessibility for {} nodes to {}", report.nodes.len(), path.display());

    let mut file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    file.write_all(to_string_pretty(report)?.as_bytes())?;
    Ok(())
}

/// Write a built graph store as a binary snapshot
pub fn save_snapshot(store: &GraphStore, path: &str) -> Result<()> {
    log::info!("Writing graph snapshot to {}", path);
    let writer = BufWriter::new(File::create(path).with_context(|| format!("creating {}", path))?);
    bincode::serialize_into(writer, store)?;
    Ok(())
}

/// Read a graph store from a binary snapshot
pub fn load_snapshot(path: &str) -> Result<GraphStore> {
    log::info!("Reading graph snapshot from {}", path);
    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path))?);
    let store: GraphStore = bincode::deserialize_from(reader)?;
    store
        .validate()
        .with_context(|| format!("validating snapshot {}", path))?;
    log::info!(
        "Loaded graph with {} nodes and {} edges",
        store.node_count(),
        store.edge_count()
    );
    Ok(store)
}
