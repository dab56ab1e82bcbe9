//! Graph representation and traversal module

pub mod builder;
pub mod cost;
pub mod spatial;
pub mod store;
pub mod traversal;

pub use builder::GraphBuilder;
pub use cost::CostModel;
pub use store::{Adjacent, Edge, EdgeIdx, GraphStore, Node, NodeIdx};
pub use traversal::{traverse, PathEntry, ShortestPathTree};
