//! JSON graph files

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CentralityError;
use crate::graph::{GraphBuilder, GraphStore};
use crate::layers::DataPoint;

fn default_live() -> bool {
    true
}

/// A node as written in a graph file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub x: f64,
    pub y: f64,

    #[serde(default = "default_live")]
    pub live: bool,

    /// Missing weights default to 1, or to half the incident street length
    /// when the file is loaded with length weighting
    #[serde(default)]
    pub weight: Option<f64>,
}

/// An edge as written in a graph file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub start: String,
    pub end: String,

    /// Missing lengths default to the straight-line distance
    #[serde(default)]
    pub length: Option<f64>,

    #[serde(default)]
    pub angle_forward: f64,

    #[serde(default)]
    pub angle_reverse: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFile {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphFile {
    /// Validate the records and build a store
    pub fn build(&self, length_weighted: bool) -> std::result::Result<GraphStore, CentralityError> {
        let mut builder = GraphBuilder::with_capacity(self.nodes.len());

        for node in &self.nodes {
            builder.add_node_with(&node.id, node.x, node.y, node.live, node.weight.unwrap_or(1.0))?;
        }
        for edge in &self.edges {
            builder.add_edge_with_angles(
                &edge.start,
                &edge.end,
                edge.length,
                edge.angle_forward,
                edge.angle_reverse,
            )?;
        }

        // explicit weights in the file win over derived ones
        if length_weighted && self.nodes.iter().all(|n| n.weight.is_none()) {
            builder.length_weighted_nodes();
        }

        builder.build()
    }
}

/// Parse a graph from JSON text
pub fn parse_graph_json(text: &str, length_weighted: bool) -> std::result::Result<GraphStore, CentralityError> {
    let file: GraphFile = serde_json::from_str(text)?;
    file.build(length_weighted)
}

/// Load a graph from a JSON file
pub fn load_graph_json(path: &str, length_weighted: bool) -> Result<GraphStore> {
    log::info!("Reading JSON graph: {}", path);

    if !Path::new(path).exists() {
        return Err(anyhow::anyhow!("File not found: {}", path));
    }

    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let store = parse_graph_json(&text, length_weighted).with_context(|| format!("parsing {}", path))?;

    log::info!(
        "Loaded graph with {} nodes and {} edges",
        store.node_count(),
        store.edge_count()
    );

    Ok(store)
}

/// A data-layer file: `{"points": [{"id", "x", "y", "class"}, ...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointsFile {
    pub points: Vec<DataPoint>,
}

pub fn parse_points_json(text: &str) -> std::result::Result<Vec<DataPoint>, CentralityError> {
    let file: PointsFile = serde_json::from_str(text)?;
    Ok(file.points)
}

/// Load data-layer points from a JSON file
pub fn load_points_json(path: &str) -> Result<Vec<DataPoint>> {
    log::info!("Reading data points: {}", path);

    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let points = parse_points_json(&text).with_context(|| format!("parsing {}", path))?;

    log::info!("Loaded {} data points", points.len());
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "nodes": [
            {"id": "a", "x": 0.0, "y": 0.0},
            {"id": "b", "x": 30.0, "y": 40.0, "live": false},
            {"id": "c", "x": 30.0, "y": 0.0}
        ],
        "edges": [
            {"start": "a", "end": "b"},
            {"start": "b", "end": "c", "length": 45.0, "angle_forward": 90.0}
        ]
    }"#;

    #[test]
    fn test_parse_defaults() {
        let store = parse_graph_json(SAMPLE, false).unwrap();
        assert_eq!(store.node_count(), 3);
        assert_eq!(store.edge_count(), 2);
        assert_eq!(store.edge(0).length, 50.0);
        assert_eq!(store.edge(0).angle_forward, 0.0);
        assert_eq!(store.edge(1).angle_forward, 90.0);
        assert!(!store.nodes()[1].live);
        assert_eq!(store.live_nodes(), vec![0, 2]);
        assert_eq!(store.nodes()[0].weight, 1.0);
    }

    #[test]
    fn test_parse_length_weighted() {
        let store = parse_graph_json(SAMPLE, true).unwrap();
        assert_eq!(store.nodes()[0].weight, 25.0);
        assert_eq!(store.nodes()[1].weight, 47.5);
    }

    #[test]
    fn test_parse_rejects_bad_edges() {
        let text = r#"{"nodes": [{"id": "a", "x": 0, "y": 0}], "edges": [{"start": "a", "end": "z"}]}"#;
        assert!(matches!(
            parse_graph_json(text, false),
            Err(CentralityError::UnknownNode(_))
        ));
        assert!(matches!(
            parse_graph_json("not json", false),
            Err(CentralityError::Format(_))
        ));
    }

    #[test]
    fn test_parse_points() {
        let text = r#"{"points": [
            {"id": "p1", "x": 1.0, "y": 2.0, "class": "shop"},
            {"id": "p2", "x": 3.0, "y": 4.0, "class": "school"}
        ]}"#;
        let points = parse_points_json(text).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].class, "school");
        assert!(matches!(
            parse_points_json(r#"{"points": [{"id": "p1"}]}"#),
            Err(CentralityError::Format(_))
        ));
    }
}
