//! Graph construction module

use std::collections::HashMap;

use crate::error::{CentralityError, Result};
use crate::graph::store::{Adjacent, Edge, EdgeIdx, GraphStore, Node, NodeIdx};

/// Largest turn cost an edge may carry, in degrees
pub const MAX_TURN_ANGLE: f64 = 180.0;

/// Builder for incrementally constructing a GraphStore
pub struct GraphBuilder {
    /// Mapping from string IDs to node indices
    id_to_index: HashMap<String, NodeIdx>,

    /// Node string IDs
    node_ids: Vec<String>,

    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl GraphBuilder {
    /// Create a new graph builder with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id_to_index: HashMap::with_capacity(capacity),
            node_ids: Vec::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            edges: Vec::with_capacity(capacity * 2),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add a live node with unit weight
    pub fn add_node(&mut self, id: &str, x: f64, y: f64) -> Result<NodeIdx> {
        self.add_node_with(id, x, y, true, 1.0)
    }

    /// Add a node with explicit live status and weight
    pub fn add_node_with(
        &mut self,
        id: &str,
        x: f64,
        y: f64,
        live: bool,
        weight: f64,
    ) -> Result<NodeIdx> {
        if self.id_to_index.contains_key(id) {
            return Err(CentralityError::DuplicateNode(id.to_string()));
        }
        if !x.is_finite() || !y.is_finite() {
            return Err(CentralityError::InvalidNode {
                id: id.to_string(),
                reason: format!("non-finite coordinates ({}, {})", x, y),
            });
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(CentralityError::InvalidNode {
                id: id.to_string(),
                reason: format!("weight {} must be finite and non-negative", weight),
            });
        }

        let idx = self.nodes.len() as NodeIdx;
        self.id_to_index.insert(id.to_string(), idx);
        self.node_ids.push(id.to_string());
        self.nodes.push(Node { x, y, live, weight });

        Ok(idx)
    }

    /// Index of a previously added node
    pub fn index_of(&self, id: &str) -> Result<NodeIdx> {
        self.id_to_index
            .get(id)
            .copied()
            .ok_or_else(|| CentralityError::UnknownNode(id.to_string()))
    }

    /// Add a segment with no turn cost. A missing length defaults to the
    /// straight-line distance between the endpoints.
    pub fn add_edge(&mut self, start: &str, end: &str, length: Option<f64>) -> Result<EdgeIdx> {
        self.add_edge_with_angles(start, end, length, 0.0, 0.0)
    }

    /// Add a segment with per-direction turn costs
    pub fn add_edge_with_angles(
        &mut self,
        start: &str,
        end: &str,
        length: Option<f64>,
        angle_forward: f64,
        angle_reverse: f64,
    ) -> Result<EdgeIdx> {
        let start_idx = self.index_of(start)?;
        let end_idx = self.index_of(end)?;
        let length = match length {
            Some(length) => length,
            None if start_idx == end_idx => 0.0,
            None => {
                let straight = self.crow_flies(start_idx, end_idx);
                if straight <= 0.0 {
                    return Err(CentralityError::InvalidEdge {
                        start: start.to_string(),
                        end: end.to_string(),
                        reason: "no length given and the endpoints share coordinates, \
                                 so the default straight-line length is zero"
                            .to_string(),
                    });
                }
                straight
            }
        };
        self.push_edge(start_idx, end_idx, length, angle_forward, angle_reverse)
    }

    /// Add a segment between node indices
    pub fn add_edge_idx(
        &mut self,
        start: NodeIdx,
        end: NodeIdx,
        length: f64,
        angle_forward: f64,
        angle_reverse: f64,
    ) -> Result<EdgeIdx> {
        for idx in [start, end] {
            if idx as usize >= self.nodes.len() {
                return Err(CentralityError::UnknownNode(format!("index {}", idx)));
            }
        }
        self.push_edge(start, end, length, angle_forward, angle_reverse)
    }

    fn push_edge(
        &mut self,
        start: NodeIdx,
        end: NodeIdx,
        length: f64,
        angle_forward: f64,
        angle_reverse: f64,
    ) -> Result<EdgeIdx> {
        let invalid = |reason: String| CentralityError::InvalidEdge {
            start: self.node_ids[start as usize].clone(),
            end: self.node_ids[end as usize].clone(),
            reason,
        };

        if start == end {
            return Err(invalid("self-loops are not supported".to_string()));
        }
        if !length.is_finite() || length <= 0.0 {
            return Err(invalid(format!("length {} must be finite and positive", length)));
        }
        for angle in [angle_forward, angle_reverse] {
            if !angle.is_finite() || !(0.0..=MAX_TURN_ANGLE).contains(&angle) {
                return Err(invalid(format!(
                    "turn angle {} outside [0, {}]",
                    angle, MAX_TURN_ANGLE
                )));
            }
        }

        let idx = self.edges.len() as EdgeIdx;
        self.edges.push(Edge {
            start,
            end,
            length,
            angle_forward,
            angle_reverse,
        });
        Ok(idx)
    }

    /// Set every node's weight to half the length of its incident segments,
    /// so that weighted density approximates street length within reach.
    pub fn length_weighted_nodes(&mut self) {
        for node in &mut self.nodes {
            node.weight = 0.0;
        }
        for edge in &self.edges {
            self.nodes[edge.start as usize].weight += edge.length / 2.0;
            self.nodes[edge.end as usize].weight += edge.length / 2.0;
        }
    }

    fn crow_flies(&self, a: NodeIdx, b: NodeIdx) -> f64 {
        let a = &self.nodes[a as usize];
        let b = &self.nodes[b as usize];
        (a.x - b.x).hypot(a.y - b.y)
    }

    /// Build the graph store
    pub fn build(self) -> Result<GraphStore> {
        let node_count = self.nodes.len();

        // Each undirected edge appears in both endpoint lists
        let mut degrees = vec![0u32; node_count];
        for edge in &self.edges {
            degrees[edge.start as usize] += 1;
            degrees[edge.end as usize] += 1;
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        offsets.push(0);
        let mut offset = 0;
        for &degree in &degrees {
            offset += degree;
            offsets.push(offset);
        }

        let placeholder = Adjacent {
            node: 0,
            edge: 0,
            forward: true,
        };
        let mut adjacency = vec![placeholder; offset as usize];
        let mut current_pos = vec![0usize; node_count];

        for (edge_idx, edge) in self.edges.iter().enumerate() {
            let edge_idx = edge_idx as EdgeIdx;
            for (from, to, forward) in [(edge.start, edge.end, true), (edge.end, edge.start, false)] {
                let pos = offsets[from as usize] as usize + current_pos[from as usize];
                adjacency[pos] = Adjacent {
                    node: to,
                    edge: edge_idx,
                    forward,
                };
                current_pos[from as usize] += 1;
            }
        }

        log::debug!(
            "Built graph store with {} nodes and {} edges",
            node_count,
            self.edges.len()
        );

        Ok(GraphStore {
            nodes: self.nodes,
            edges: self.edges,
            offsets,
            adjacency,
            labels: Some(self.node_ids),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_adjacency_both_directions() {
        let mut builder = GraphBuilder::default();
        builder.add_node("a", 0.0, 0.0).unwrap();
        builder.add_node("b", 3.0, 4.0).unwrap();
        builder.add_edge("a", "b", None).unwrap();
        let store = builder.build().unwrap();

        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 1);
        assert_eq!(store.edge(0).length, 5.0);

        let a = store.neighbours(0);
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].node, 1);
        assert!(a[0].forward);

        let b = store.neighbours(1);
        assert_eq!(b[0].node, 0);
        assert!(!b[0].forward);
    }

    #[test]
    fn test_rejects_invalid_edges() {
        let mut builder = GraphBuilder::default();
        builder.add_node("a", 0.0, 0.0).unwrap();
        builder.add_node("b", 1.0, 0.0).unwrap();

        assert!(matches!(
            builder.add_edge("a", "a", Some(1.0)),
            Err(CentralityError::InvalidEdge { .. })
        ));
        assert!(matches!(
            builder.add_edge("a", "b", Some(0.0)),
            Err(CentralityError::InvalidEdge { .. })
        ));
        assert!(matches!(
            builder.add_edge("a", "b", Some(f64::NAN)),
            Err(CentralityError::InvalidEdge { .. })
        ));
        assert!(matches!(
            builder.add_edge_with_angles("a", "b", Some(1.0), -1.0, 0.0),
            Err(CentralityError::InvalidEdge { .. })
        ));
        assert!(matches!(
            builder.add_edge("a", "missing", Some(1.0)),
            Err(CentralityError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_coincident_endpoints_need_a_length() {
        let mut builder = GraphBuilder::default();
        builder.add_node("a", 5.0, 5.0).unwrap();
        builder.add_node("b", 5.0, 5.0).unwrap();

        match builder.add_edge("a", "b", None) {
            Err(CentralityError::InvalidEdge { start, end, reason }) => {
                assert_eq!((start.as_str(), end.as_str()), ("a", "b"));
                assert!(reason.contains("straight-line length is zero"), "{}", reason);
            }
            other => panic!("expected InvalidEdge, got {:?}", other),
        }

        // an explicit length is fine
        assert_eq!(builder.add_edge("a", "b", Some(2.0)).unwrap(), 0);
    }

    #[test]
    fn test_rejects_duplicate_and_invalid_nodes() {
        let mut builder = GraphBuilder::default();
        builder.add_node("a", 0.0, 0.0).unwrap();
        assert!(matches!(
            builder.add_node("a", 1.0, 1.0),
            Err(CentralityError::DuplicateNode(_))
        ));
        assert!(matches!(
            builder.add_node("b", f64::INFINITY, 0.0),
            Err(CentralityError::InvalidNode { .. })
        ));
        assert!(matches!(
            builder.add_node_with("c", 0.0, 0.0, true, -2.0),
            Err(CentralityError::InvalidNode { .. })
        ));
    }

    #[test]
    fn test_length_weighted_nodes() {
        let mut builder = GraphBuilder::default();
        builder.add_node("a", 0.0, 0.0).unwrap();
        builder.add_node("b", 10.0, 0.0).unwrap();
        builder.add_node("c", 10.0, 20.0).unwrap();
        builder.add_edge("a", "b", None).unwrap();
        builder.add_edge("b", "c", None).unwrap();
        builder.length_weighted_nodes();
        let store = builder.build().unwrap();

        assert_eq!(store.nodes()[0].weight, 5.0);
        assert_eq!(store.nodes()[1].weight, 15.0);
        assert_eq!(store.nodes()[2].weight, 10.0);
    }
}
