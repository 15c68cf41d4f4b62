//! Concept graph
//!
//! This module implements the ontology data model:
//! - Concepts with exact integer identifiers
//! - Typed, directed relationships toward more general concepts
//! - A frozen, arena-indexed graph built under a relation policy

pub mod concept;
pub mod relationship;
pub mod store;
pub mod types;

// Re-export main types
pub use concept::{Concept, ConcreteLiteral, ConcreteValue};
pub use relationship::Relationship;
pub use store::{edge_multiset, ConceptGraph, GraphBuilder, GraphError, GraphResult, GraphStatistics};
pub use types::{ConceptId, GraphId, IdParseError, RelationPolicy, FSN_TYPE, IS_A, ROOT_CONCEPT};
