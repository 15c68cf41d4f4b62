//! Core type definitions for the concept graph

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// SNOMED CT root concept ("SNOMED CT Concept")
pub const ROOT_CONCEPT: ConceptId = ConceptId(138_875_005);

/// "Is a" relationship type
pub const IS_A: ConceptId = ConceptId(116_680_003);

/// Fully specified name description type
pub const FSN_TYPE: ConceptId = ConceptId(900_000_000_000_003_001);

/// SNOMED CT identifier.
///
/// Held as an exact integer from the first parse step onward. Parsing
/// accepts plain decimal digits only, so float renderings such as
/// `1.23e17` or `123.0` are rejected instead of being silently rounded.
/// Human-readable serializers (JSON, YAML) see the canonical decimal
/// string; binary ones see the integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConceptId(pub u64);

impl ConceptId {
    pub fn new(id: u64) -> Self {
        ConceptId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Failure to read an identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdParseError {
    #[error("empty identifier")]
    Empty,

    #[error("identifier {0:?} contains a non-digit character")]
    NotDecimal(String),

    #[error("identifier {0:?} does not fit in 64 bits")]
    Overflow(String),
}

impl FromStr for ConceptId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdParseError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdParseError::NotDecimal(s.to_string()));
        }
        s.parse::<u64>()
            .map(ConceptId)
            .map_err(|_| IdParseError::Overflow(s.to_string()))
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ConceptId {
    fn from(id: u64) -> Self {
        ConceptId(id)
    }
}

impl Serialize for ConceptId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_u64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for ConceptId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            struct IdVisitor;

            impl<'de> de::Visitor<'de> for IdVisitor {
                type Value = ConceptId;

                fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    f.write_str("a concept id as a decimal string or unsigned integer")
                }

                fn visit_u64<E: de::Error>(self, v: u64) -> Result<ConceptId, E> {
                    Ok(ConceptId(v))
                }

                fn visit_i64<E: de::Error>(self, v: i64) -> Result<ConceptId, E> {
                    u64::try_from(v)
                        .map(ConceptId)
                        .map_err(|_| E::custom(format!("negative concept id {}", v)))
                }

                fn visit_str<E: de::Error>(self, v: &str) -> Result<ConceptId, E> {
                    v.parse().map_err(E::custom)
                }
            }

            deserializer.deserialize_any(IdVisitor)
        } else {
            u64::deserialize(deserializer).map(ConceptId)
        }
    }
}

/// Identity of one built graph instance.
///
/// Results derived from one graph (IC tables, engines) carry this id so
/// they cannot be mixed with another instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub Uuid);

impl GraphId {
    pub fn new() -> Self {
        GraphId(Uuid::new_v4())
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which relationships become edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationPolicy {
    /// Only "is a" edges
    HierarchyOnly,
    /// Every active relationship regardless of type
    AllRelations,
    /// Only the listed relationship types
    Selected(Vec<ConceptId>),
}

impl RelationPolicy {
    /// Short label used in snapshot file names
    pub fn label(&self) -> &'static str {
        match self {
            RelationPolicy::HierarchyOnly => "is-a",
            RelationPolicy::AllRelations => "rel",
            RelationPolicy::Selected(_) => "selected",
        }
    }
}

impl fmt::Display for RelationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationPolicy::HierarchyOnly => write!(f, "hierarchy-only"),
            RelationPolicy::AllRelations => write!(f, "all-relations"),
            RelationPolicy::Selected(types) => {
                let ids: Vec<String> = types.iter().map(|t| t.to_string()).collect();
                write!(f, "selected({})", ids.join(","))
            }
        }
    }
}
