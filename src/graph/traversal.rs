//! Bounded single-source shortest-path traversal.
//!
//! Every centrality measure in this crate is built from one [`traverse`]
//! call per origin. The traversal is a Dijkstra expansion ranked by a
//! [`CostModel`] but cut off by metric distance, so the work per call stays
//! proportional to the street network within the radius rather than to the
//! whole graph.
//!
//! Alongside distances the traversal records what the accumulators need:
//!
//! - every equal-cost predecessor and the number of shortest paths reaching
//!   each node (for Brandes dependency accumulation);
//! - the order in which nodes were finalised (non-decreasing cost);
//! - the cycles closed inside the searched neighbourhood.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{CentralityError, Result};
use crate::graph::cost::CostModel;
use crate::graph::store::{EdgeIdx, GraphStore, NodeIdx};

/// Relative tolerance under which two path costs count as equal
pub const COST_EPSILON: f64 = 1e-9;

/// Compare two accumulated costs with a relative tolerance
#[inline]
pub fn costs_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= COST_EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Shortest-path state of one reached node
#[derive(Debug, Clone)]
pub struct PathEntry {
    pub node: NodeIdx,

    /// Accumulated cost under the traversal's cost model
    pub cost: f64,

    /// Metric length of the path realising `cost`
    pub distance: f64,

    /// Tree predecessor (first equal-cost predecessor found)
    pub predecessor: Option<NodeIdx>,

    /// Number of equal-cost shortest paths from the origin
    pub path_count: f64,

    /// Cycles closed when this node was finalised
    pub cycles: u32,

    pred_edge: Option<EdgeIdx>,
    pred_slots: Vec<u32>,
    finalised: bool,
}

impl PathEntry {
    fn new(node: NodeIdx, cost: f64, distance: f64) -> Self {
        Self {
            node,
            cost,
            distance,
            predecessor: None,
            path_count: 0.0,
            cycles: 0,
            pred_edge: None,
            pred_slots: Vec::new(),
            finalised: false,
        }
    }
}

#[derive(Debug)]
struct Frontier {
    cost: f64,
    slot: u32,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap on cost, then on discovery order
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.slot.cmp(&self.slot))
    }
}

/// Result of one bounded traversal.
///
/// Reached nodes are stored densely in discovery order; `slots` maps a node
/// index to its position. The tree is exclusively owned by the caller and is
/// rebuilt for every origin.
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    origin: NodeIdx,
    cost_model: CostModel,
    max_radius: f64,
    entries: Vec<PathEntry>,
    slots: HashMap<NodeIdx, u32>,
    order: Vec<u32>,
}

impl ShortestPathTree {
    pub fn origin(&self) -> NodeIdx {
        self.origin
    }

    pub fn cost_model(&self) -> CostModel {
        self.cost_model
    }

    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    /// Number of reached nodes, origin included
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when nothing beyond the origin was reached
    pub fn is_trivial(&self) -> bool {
        self.order.len() <= 1
    }

    pub fn get(&self, node: NodeIdx) -> Option<&PathEntry> {
        self.slots.get(&node).map(|&slot| &self.entries[slot as usize])
    }

    pub fn contains(&self, node: NodeIdx) -> bool {
        self.slots.contains_key(&node)
    }

    /// Reached nodes in finalisation order, origin first
    pub fn reached(&self) -> impl Iterator<Item = &PathEntry> + '_ {
        self.order.iter().map(move |&slot| &self.entries[slot as usize])
    }

    /// Reached nodes other than the origin
    pub fn targets(&self) -> impl Iterator<Item = &PathEntry> + '_ {
        self.reached().skip(1)
    }

    /// Total cycles closed within `radius` of the origin
    pub fn cycles_within(&self, radius: f64) -> u32 {
        self.reached()
            .filter(|e| e.distance <= radius)
            .map(|e| e.cycles)
            .sum()
    }

    /// Slot order used by dependency accumulation
    pub(crate) fn order(&self) -> &[u32] {
        &self.order
    }

    pub(crate) fn entry(&self, slot: u32) -> &PathEntry {
        &self.entries[slot as usize]
    }

    pub(crate) fn predecessor_slots(&self, slot: u32) -> &[u32] {
        &self.entries[slot as usize].pred_slots
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.entries.len()
    }

    /// Tree path from the origin to `node`, both ends included
    pub fn path_to(&self, node: NodeIdx) -> Option<Vec<NodeIdx>> {
        let mut current = self.get(node)?;
        let mut path = vec![current.node];
        while let Some(pred) = current.predecessor {
            path.push(pred);
            current = self.get(pred)?;
        }
        path.reverse();
        Some(path)
    }
}

/// Traverse from `origin`, ranking paths by `cost_model` and discarding any
/// path whose metric length exceeds `max_radius`.
///
/// `max_radius` may be `f64::INFINITY` for a network-wide traversal. An
/// origin without edges yields a tree holding only itself.
pub fn traverse(
    store: &GraphStore,
    origin: NodeIdx,
    cost_model: CostModel,
    max_radius: f64,
) -> Result<ShortestPathTree> {
    if !(max_radius > 0.0) {
        return Err(CentralityError::InvalidRadius(max_radius));
    }
    store.node(origin)?;

    let mut entries = Vec::new();
    let mut slots = HashMap::new();
    let mut order = Vec::new();
    let mut frontier = BinaryHeap::new();

    let mut root = PathEntry::new(origin, 0.0, 0.0);
    root.path_count = 1.0;
    entries.push(root);
    slots.insert(origin, 0u32);
    frontier.push(Frontier { cost: 0.0, slot: 0 });

    while let Some(Frontier { cost, slot }) = frontier.pop() {
        let current = &mut entries[slot as usize];
        if current.finalised || cost > current.cost {
            continue; // stale entry
        }
        current.finalised = true;
        order.push(slot);

        let u = current.node;
        let u_cost = current.cost;
        let u_distance = current.distance;
        let u_paths = current.path_count;
        let u_tree_edge = current.pred_edge;
        let mut closed = 0u32;

        for adj in store.neighbours(u) {
            if Some(adj.edge) == u_tree_edge {
                continue;
            }

            let known = slots.get(&adj.node).copied();
            if let Some(v_slot) = known {
                if entries[v_slot as usize].finalised {
                    // Non-tree edge back into the searched region
                    closed += 1;
                    continue;
                }
            }

            let edge = store.edge(adj.edge);
            let new_distance = u_distance + edge.length;
            if new_distance > max_radius {
                continue;
            }
            let new_cost = u_cost + cost_model.step_cost(edge, adj.forward);

            match known {
                Some(v_slot) => {
                    let v = &mut entries[v_slot as usize];
                    if costs_equal(new_cost, v.cost) {
                        v.pred_slots.push(slot);
                        v.path_count += u_paths;
                        if !v.path_count.is_finite() {
                            return Err(CentralityError::NumericOverflow("shortest path counts"));
                        }
                    } else if new_cost < v.cost {
                        v.cost = new_cost;
                        v.distance = new_distance;
                        v.predecessor = Some(u);
                        v.pred_edge = Some(adj.edge);
                        v.pred_slots.clear();
                        v.pred_slots.push(slot);
                        v.path_count = u_paths;
                        frontier.push(Frontier {
                            cost: new_cost,
                            slot: v_slot,
                        });
                    }
                }
                None => {
                    let v_slot = entries.len() as u32;
                    let mut v = PathEntry::new(adj.node, new_cost, new_distance);
                    v.predecessor = Some(u);
                    v.pred_edge = Some(adj.edge);
                    v.pred_slots.push(slot);
                    v.path_count = u_paths;
                    entries.push(v);
                    slots.insert(adj.node, v_slot);
                    frontier.push(Frontier {
                        cost: new_cost,
                        slot: v_slot,
                    });
                }
            }
        }

        entries[slot as usize].cycles = closed;
    }

    Ok(ShortestPathTree {
        origin,
        cost_model,
        max_radius,
        entries,
        slots,
        order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    /// a - b - c - d in a line, 10m apart
    fn line() -> GraphStore {
        let mut b = GraphBuilder::default();
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            b.add_node(id, i as f64 * 10.0, 0.0).unwrap();
        }
        b.add_edge("a", "b", None).unwrap();
        b.add_edge("b", "c", None).unwrap();
        b.add_edge("c", "d", None).unwrap();
        b.build().unwrap()
    }

    /// Unit square a-b-c-d-a
    fn square() -> GraphStore {
        let mut b = GraphBuilder::default();
        b.add_node("a", 0.0, 0.0).unwrap();
        b.add_node("b", 1.0, 0.0).unwrap();
        b.add_node("c", 1.0, 1.0).unwrap();
        b.add_node("d", 0.0, 1.0).unwrap();
        b.add_edge("a", "b", None).unwrap();
        b.add_edge("b", "c", None).unwrap();
        b.add_edge("c", "d", None).unwrap();
        b.add_edge("d", "a", None).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_line_distances() {
        let store = line();
        let tree = traverse(&store, 0, CostModel::Metric, 100.0).unwrap();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.get(3).unwrap().distance, 30.0);
        assert_eq!(tree.get(3).unwrap().predecessor, Some(2));
        assert_eq!(tree.path_to(3), Some(vec![0, 1, 2, 3]));
        assert_eq!(tree.cycles_within(100.0), 0);
    }

    #[test]
    fn test_radius_cutoff() {
        let store = line();
        let tree = traverse(&store, 0, CostModel::Metric, 25.0).unwrap();
        assert_eq!(tree.len(), 3);
        assert!(!tree.contains(3));

        // exactly on the radius is still reached
        let tree = traverse(&store, 0, CostModel::Metric, 20.0).unwrap();
        assert!(tree.contains(2));
    }

    #[test]
    fn test_equal_cost_paths_counted() {
        let store = square();
        let tree = traverse(&store, 0, CostModel::Metric, 3.0).unwrap();
        let c = tree.get(2).unwrap();
        assert_eq!(c.distance, 2.0);
        assert_eq!(c.path_count, 2.0);
        assert_eq!(tree.get(1).unwrap().path_count, 1.0);
        assert_eq!(tree.cycles_within(3.0), 1);
    }

    #[test]
    fn test_cycle_outside_radius_not_counted() {
        let store = square();
        let tree = traverse(&store, 0, CostModel::Metric, 1.5).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.cycles_within(1.5), 0);
    }

    #[test]
    fn test_invalid_radius_and_origin() {
        let store = line();
        assert!(matches!(
            traverse(&store, 0, CostModel::Metric, 0.0),
            Err(CentralityError::InvalidRadius(_))
        ));
        assert!(matches!(
            traverse(&store, 0, CostModel::Metric, -5.0),
            Err(CentralityError::InvalidRadius(_))
        ));
        assert!(matches!(
            traverse(&store, 0, CostModel::Metric, f64::NAN),
            Err(CentralityError::InvalidRadius(_))
        ));
        assert!(matches!(
            traverse(&store, 99, CostModel::Metric, 10.0),
            Err(CentralityError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_isolated_origin() {
        let mut b = GraphBuilder::default();
        b.add_node("lonely", 0.0, 0.0).unwrap();
        b.add_node("x", 1.0, 0.0).unwrap();
        b.add_node("y", 2.0, 0.0).unwrap();
        b.add_edge("x", "y", None).unwrap();
        let store = b.build().unwrap();

        let tree = traverse(&store, 0, CostModel::Metric, f64::INFINITY).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_trivial());
        assert_eq!(tree.targets().count(), 0);
    }

    #[test]
    fn test_angular_prefers_straight_route() {
        // a -> d either straight through b (long, no turns) or via c (short, sharp turn)
        let mut b = GraphBuilder::default();
        b.add_node("a", 0.0, 0.0).unwrap();
        b.add_node("b", 50.0, 0.0).unwrap();
        b.add_node("c", 40.0, 10.0).unwrap();
        b.add_node("d", 100.0, 0.0).unwrap();
        b.add_edge_with_angles("a", "b", Some(50.0), 0.0, 0.0).unwrap();
        b.add_edge_with_angles("b", "d", Some(55.0), 0.0, 0.0).unwrap();
        b.add_edge_with_angles("a", "c", Some(45.0), 0.0, 0.0).unwrap();
        b.add_edge_with_angles("c", "d", Some(50.0), 90.0, 90.0).unwrap();
        let store = b.build().unwrap();

        let metric = traverse(&store, 0, CostModel::Metric, 500.0).unwrap();
        assert_eq!(metric.path_to(3), Some(vec![0, 2, 3]));

        let angular = traverse(&store, 0, CostModel::Angular, 500.0).unwrap();
        assert_eq!(angular.path_to(3), Some(vec![0, 1, 3]));
        let d = angular.get(3).unwrap();
        assert_eq!(d.cost, 105.0);
        assert_eq!(d.distance, 105.0);
    }

    #[test]
    fn test_angular_cutoff_uses_metric_distance() {
        let mut b = GraphBuilder::default();
        b.add_node("a", 0.0, 0.0).unwrap();
        b.add_node("b", 10.0, 0.0).unwrap();
        b.add_edge_with_angles("a", "b", Some(10.0), 180.0, 180.0).unwrap();
        let store = b.build().unwrap();

        // angular cost 190 exceeds the radius but metric distance 10 does not
        let tree = traverse(&store, 0, CostModel::Angular, 15.0).unwrap();
        let entry = tree.get(1).unwrap();
        assert_eq!(entry.cost, 190.0);
        assert_eq!(entry.distance, 10.0);
    }
}
