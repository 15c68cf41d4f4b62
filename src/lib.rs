//! SNOMED CT semantic similarity engine
//!
//! Loads an RF2 release into an immutable ontology graph, measures how
//! closely two concepts are related, and assembles pairwise matrices over
//! caller-supplied concept lists.
//!
//! # Layers
//!
//! - [`loader`]: RF2 table parsing with exact integer identifiers
//! - [`graph`]: concept arena and graph builder under a relation policy
//! - [`persistence`]: checksummed, compressed graph snapshots
//! - [`algo`]: ancestor paths, LCA, information content and similarity measures
//! - [`matrix`]: parallel matrix assembly, output writers and coverage checks
//! - [`config`]: YAML engine configuration
//!
//! ## Example Usage
//!
//! ```rust
//! use snomed_semsim::algo::{Measure, SemanticEngine};
//! use snomed_semsim::graph::{Concept, ConceptId, GraphBuilder, Relationship, IS_A, ROOT_CONCEPT};
//! use snomed_semsim::loader::LoadedRelease;
//!
//! let a = ConceptId(10);
//! let b = ConceptId(20);
//! let concepts = vec![Concept::new(ROOT_CONCEPT), Concept::new(a), Concept::new(b)];
//! let relationships = vec![
//!     Relationship::new(1u64, a, ROOT_CONCEPT, IS_A),
//!     Relationship::new(2u64, b, ROOT_CONCEPT, IS_A),
//! ];
//! let release = LoadedRelease::from_parts(concepts, relationships);
//! let graph = GraphBuilder::default().build(&release).unwrap();
//!
//! let engine = SemanticEngine::new(&graph);
//! assert_eq!(engine.shortest_path_length(a, b).unwrap(), 2);
//! assert_eq!(engine.score(Measure::WuPalmer, a, a).unwrap(), 1.0);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod config;
pub mod graph;
pub mod loader;
pub mod matrix;
pub mod persistence;
pub mod pipeline;

use thiserror::Error;

// Re-export main types for convenience
pub use algo::{FrequencyTable, InformationContent, Lca, Measure, PathEngine, SemanticEngine};
pub use config::{ConfigError, EngineConfig, IcStrategy};
pub use graph::{
    Concept, ConceptGraph, ConceptId, GraphBuilder, GraphError, GraphId, GraphResult,
    RelationPolicy, Relationship,
};
pub use loader::{LoadedRelease, LoaderError, LoaderResult, ReleaseLoader};
pub use matrix::{DistanceMatrix, MatrixAssembler, MatrixError, MISSING};
pub use persistence::{read_snapshot, write_snapshot, SnapshotError};

/// Any failure of an end-to-end run
#[derive(Error, Debug)]
pub enum SemsimError {
    #[error("load failed: {0}")]
    Loader(#[from] LoaderError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("matrix error: {0}")]
    Matrix(#[from] MatrixError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type SemsimResult<T> = Result<T, SemsimError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
