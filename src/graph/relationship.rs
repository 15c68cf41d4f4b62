//! Relationship records
//!
//! A relationship row is a directed edge from a concept to a more general
//! (or otherwise related) concept, tagged with its type.

use super::types::ConceptId;
use serde::{Deserialize, Serialize};

/// A typed, directed relationship between two concepts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship row id
    pub id: ConceptId,

    /// Edge goes FROM this concept
    pub source: ConceptId,

    /// Edge goes TO this concept
    pub destination: ConceptId,

    /// Relationship type (e.g. 116680003 "is a")
    pub type_id: ConceptId,

    /// Role group number
    pub group: u32,

    pub active: bool,

    /// Release date of this row as `YYYYMMDD`
    pub effective_time: u32,
}

impl Relationship {
    pub fn new(
        id: impl Into<ConceptId>,
        source: impl Into<ConceptId>,
        destination: impl Into<ConceptId>,
        type_id: impl Into<ConceptId>,
    ) -> Self {
        Relationship {
            id: id.into(),
            source: source.into(),
            destination: destination.into(),
            type_id: type_id.into(),
            group: 0,
            active: true,
            effective_time: 0,
        }
    }

    /// Identity of the edge this row contributes: duplicate rows across
    /// role groups share it
    pub fn edge_key(&self) -> (ConceptId, ConceptId, ConceptId) {
        (self.source, self.destination, self.type_id)
    }
}
