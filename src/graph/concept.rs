//! Concept records
//!
//! A concept is created once from a concept snapshot row and never changes
//! afterwards.

use super::types::ConceptId;
use serde::{Deserialize, Serialize};

/// A node in the ontology graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Stable SNOMED CT identifier
    pub id: ConceptId,

    /// Release status flag
    pub active: bool,

    /// Release date of this row as `YYYYMMDD`
    pub effective_time: u32,

    /// Module the concept belongs to
    pub module_id: ConceptId,

    /// Primitive / fully defined marker
    pub definition_status_id: Option<ConceptId>,

    /// Fully specified name, for diagnostics only
    pub name: Option<String>,

    /// Concrete-value attributes (`#250`, `"text"`) attached to this concept
    pub concrete_values: Vec<ConcreteValue>,
}

impl Concept {
    pub fn new(id: ConceptId) -> Self {
        Concept {
            id,
            active: true,
            effective_time: 0,
            module_id: ConceptId(0),
            definition_status_id: None,
            name: None,
            concrete_values: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name if known, otherwise the bare id
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{} |{}|", self.id, name),
            None => self.id.to_string(),
        }
    }
}

/// Literal target of a concrete-value relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcreteLiteral {
    /// `#` prefixed number, kept as its exact decimal text
    Numeric(String),
    /// Quoted string
    Text(String),
}

impl ConcreteLiteral {
    /// Parse the RF2 `value` column
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(number) = raw.strip_prefix('#') {
            let valid = !number.is_empty()
                && number
                    .trim_start_matches('-')
                    .chars()
                    .all(|c| c.is_ascii_digit() || c == '.');
            return valid.then(|| ConcreteLiteral::Numeric(number.to_string()));
        }
        raw.strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .map(|text| ConcreteLiteral::Text(text.to_string()))
    }
}

/// A concrete-value attribute of a concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcreteValue {
    pub type_id: ConceptId,
    pub group: u32,
    pub value: ConcreteLiteral,
}
