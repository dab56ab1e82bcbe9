//! Immutable street-network store in compressed sparse row layout

use std::fmt;
use std::mem;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{CentralityError, Result};
use crate::graph::builder::MAX_TURN_ANGLE;

/// Index of a node in the store's flat node array
pub type NodeIdx = u32;

/// Index of an edge in the store's flat edge array
pub type EdgeIdx = u32;

/// A network node: a street intersection or segment end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub x: f64,
    pub y: f64,

    /// Live nodes are computed as origins in a whole-network pass
    pub live: bool,

    /// Contribution scale when accumulating in node-weighted mode
    pub weight: f64,
}

/// An undirected street segment.
///
/// `angle_forward` is the turn cost paid when the segment is entered at
/// `start` and left at `end`; `angle_reverse` covers the opposite direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub start: NodeIdx,
    pub end: NodeIdx,
    pub length: f64,
    pub angle_forward: f64,
    pub angle_reverse: f64,
}

impl Edge {
    /// Turn cost for traversing the edge in the given direction
    pub fn angle(&self, forward: bool) -> f64 {
        if forward {
            self.angle_forward
        } else {
            self.angle_reverse
        }
    }
}

/// One entry of a node's adjacency list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjacent {
    /// Neighbouring node
    pub node: NodeIdx,

    /// Edge leading to it
    pub edge: EdgeIdx,

    /// Whether the edge is traversed start -> end
    pub forward: bool,
}

/// Read-only graph store shared by every traversal.
///
/// Nodes and edges live in flat arrays and refer to each other by index, so
/// cycles in the street network never turn into reference cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStore {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,

    /// offsets[i] to offsets[i+1] is the adjacency range for node i
    pub(crate) offsets: Vec<u32>,
    pub(crate) adjacency: Vec<Adjacent>,

    /// Optional external labels, parallel to `nodes`
    pub(crate) labels: Option<Vec<String>>,
}

impl GraphStore {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Look up a node, failing with `UnknownNode` for out-of-range indices
    pub fn node(&self, idx: NodeIdx) -> Result<&Node> {
        self.nodes
            .get(idx as usize)
            .ok_or_else(|| CentralityError::UnknownNode(format!("index {}", idx)))
    }

    pub fn edge(&self, idx: EdgeIdx) -> &Edge {
        &self.edges[idx as usize]
    }

    /// Adjacency entries for a node
    pub fn neighbours(&self, node: NodeIdx) -> &[Adjacent] {
        let start = self.offsets[node as usize] as usize;
        let end = self.offsets[node as usize + 1] as usize;
        &self.adjacency[start..end]
    }

    pub fn degree(&self, node: NodeIdx) -> usize {
        let start = self.offsets[node as usize] as usize;
        let end = self.offsets[node as usize + 1] as usize;
        end - start
    }

    /// External label of a node, falling back to its index
    pub fn label(&self, node: NodeIdx) -> String {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(node as usize).cloned())
            .unwrap_or_else(|| node.to_string())
    }

    /// Resolve an external label to its index
    pub fn find_label(&self, label: &str) -> Option<NodeIdx> {
        self.labels
            .as_ref()
            .and_then(|labels| labels.iter().position(|l| l == label))
            .map(|idx| idx as NodeIdx)
    }

    /// Indices of all live nodes
    pub fn live_nodes(&self) -> Vec<NodeIdx> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.live)
            .map(|(i, _)| i as NodeIdx)
            .collect()
    }

    /// Total length of all street segments
    pub fn total_length(&self) -> f64 {
        self.edges.iter().map(|e| e.length).sum()
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let base = mem::size_of::<Self>();
        let nodes = self.nodes.capacity() * mem::size_of::<Node>();
        let edges = self.edges.capacity() * mem::size_of::<Edge>();
        let offsets = self.offsets.capacity() * mem::size_of::<u32>();
        let adjacency = self.adjacency.capacity() * mem::size_of::<Adjacent>();

        let labels = self
            .labels
            .as_ref()
            .map(|labels| labels.iter().map(|s| s.capacity()).sum::<usize>())
            .unwrap_or(0);

        base + nodes + edges + offsets + adjacency + labels
    }
}

impl GraphStore {
    /// Check the invariants the builder establishes.
    ///
    /// Stores that did not come out of `GraphBuilder::build` in this process,
    /// such as decoded snapshots, must pass this before they are queried.
    pub fn validate(&self) -> Result<()> {
        let corrupt = |reason: String| -> Result<()> {
            Err(CentralityError::Format(format!("corrupt graph store: {}", reason)))
        };
        let node_count = self.nodes.len();
        let edge_count = self.edges.len();

        if node_count > NodeIdx::MAX as usize || edge_count > EdgeIdx::MAX as usize {
            return corrupt("too many nodes or edges".to_string());
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            if !node.x.is_finite() || !node.y.is_finite() || !node.weight.is_finite() || node.weight < 0.0 {
                return Err(CentralityError::InvalidNode {
                    id: self.label(idx as NodeIdx),
                    reason: "non-finite coordinates or invalid weight".to_string(),
                });
            }
        }

        for edge in &self.edges {
            if edge.start as usize >= node_count || edge.end as usize >= node_count {
                return corrupt(format!("edge {} -> {} refers to a missing node", edge.start, edge.end));
            }
            let angles_ok = [edge.angle_forward, edge.angle_reverse]
                .iter()
                .all(|a| (0.0..=MAX_TURN_ANGLE).contains(a));
            if edge.start == edge.end || !edge.length.is_finite() || edge.length <= 0.0 || !angles_ok {
                return Err(CentralityError::InvalidEdge {
                    start: self.label(edge.start),
                    end: self.label(edge.end),
                    reason: "self-loop, non-positive length or turn angle out of range".to_string(),
                });
            }
        }

        if self.offsets.len() != node_count + 1 || self.offsets.first() != Some(&0) {
            return corrupt(format!("{} offsets for {} nodes", self.offsets.len(), node_count));
        }
        if self.offsets.windows(2).any(|w| w[0] > w[1]) {
            return corrupt("offsets are not monotone".to_string());
        }
        if self.offsets[node_count] as usize != self.adjacency.len() || self.adjacency.len() != 2 * edge_count {
            return corrupt(format!(
                "{} adjacency entries for {} edges",
                self.adjacency.len(),
                edge_count
            ));
        }

        for owner in 0..node_count {
            let range = self.offsets[owner] as usize..self.offsets[owner + 1] as usize;
            for adj in &self.adjacency[range] {
                let Some(edge) = self.edges.get(adj.edge as usize) else {
                    return corrupt(format!("adjacency refers to missing edge {}", adj.edge));
                };
                let (from, to) = if adj.forward {
                    (edge.start, edge.end)
                } else {
                    (edge.end, edge.start)
                };
                if from as usize != owner || to != adj.node {
                    return corrupt(format!("adjacency of node {} disagrees with edge {}", owner, adj.edge));
                }
            }
        }

        if let Some(labels) = &self.labels {
            if labels.len() != node_count {
                return corrupt(format!("{} labels for {} nodes", labels.len(), node_count));
            }
        }

        Ok(())
    }
}

impl fmt::Display for GraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "graph: empty");
        }

        writeln!(
            f,
            "graph: {} nodes, {} edges, {:.1} total length",
            self.node_count(),
            self.edge_count(),
            self.total_length()
        )?;

        for (idx, node) in self.nodes.iter().enumerate() {
            let idx = idx as NodeIdx;
            let neighbours = self
                .neighbours(idx)
                .iter()
                .map(|adj| self.label(adj.node))
                .join(", ");
            writeln!(
                f,
                "  {} ({:.2}, {:.2}) live={} weight={} -> [{}]",
                self.label(idx),
                node.x,
                node.y,
                node.live,
                node.weight,
                neighbours
            )?;
        }

        for edge in &self.edges {
            writeln!(
                f,
                "  {} -- {} length={:.2} angle={:.1}/{:.1}",
                self.label(edge.start),
                self.label(edge.end),
                edge.length,
                edge.angle_forward,
                edge.angle_reverse
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn triangle() -> GraphStore {
        let mut b = GraphBuilder::default();
        b.add_node("a", 0.0, 0.0).unwrap();
        b.add_node("b", 3.0, 0.0).unwrap();
        b.add_node("c", 0.0, 4.0).unwrap();
        b.add_edge("a", "b", None).unwrap();
        b.add_edge("b", "c", None).unwrap();
        b.add_edge("c", "a", None).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_built_store_validates() {
        assert!(triangle().validate().is_ok());
        assert!(GraphBuilder::default().build().unwrap().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_offsets() {
        let mut store = triangle();
        store.offsets = vec![0, 1, 5, 6];
        assert!(matches!(store.validate(), Err(CentralityError::Format(_))));

        let mut store = triangle();
        store.offsets.pop();
        assert!(matches!(store.validate(), Err(CentralityError::Format(_))));
    }

    #[test]
    fn test_validate_rejects_bad_edges_and_adjacency() {
        let mut store = triangle();
        store.edges[0].end = 9;
        assert!(matches!(store.validate(), Err(CentralityError::Format(_))));

        let mut store = triangle();
        store.edges[1].length = 0.0;
        assert!(matches!(store.validate(), Err(CentralityError::InvalidEdge { .. })));

        let mut store = triangle();
        store.adjacency[0].node = 2;
        store.adjacency[0].edge = 1;
        assert!(matches!(store.validate(), Err(CentralityError::Format(_))));

        let mut store = triangle();
        store.labels = Some(vec!["a".to_string()]);
        assert!(matches!(store.validate(), Err(CentralityError::Format(_))));
    }
}
