//! Traversal primitives for ontology graphs
//!
//! Concepts are addressed by dense index (0..N) inside a [`GraphView`];
//! edges point from a concept to a more general concept. Nothing in this
//! crate knows about SNOMED identifiers.

pub mod common;
pub mod pathfinding;
pub mod topology;

pub use common::{GraphView, NodeId};
pub use pathfinding::{
    ancestor_path, common_ancestors, lowest_common_ancestor, shortest_path_length, AncestorPath,
    LcaResult,
};
pub use topology::{
    descendant_count, descendant_counts, depths_from_root, max_depth, unrooted_nodes, UNREACHABLE,
};
