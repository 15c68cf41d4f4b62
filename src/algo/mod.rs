//! Semantic similarity engine
//!
//! Traversal primitives live in the `ontology-graph-algorithms` crate and
//! work on dense indices. This module is the adapter layer: it maps concept
//! ids to indices, caches ancestor paths and descendant counts per graph,
//! and evaluates the similarity measures on top.

pub mod ic;
pub mod measures;
pub mod paths;

pub use ic::{FrequencyTable, InformationContent};
pub use measures::{Measure, SemanticEngine, UnknownMeasure};
pub use paths::{Lca, PathEngine};
