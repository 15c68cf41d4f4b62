//! Persistence layer
//!
//! A built graph is written once as a compressed, checksummed snapshot and
//! restored by later runs instead of re-parsing release tables.

pub mod snapshot;

pub use snapshot::{
    from_bytes, read_snapshot, snapshot_file_name, to_bytes, write_snapshot, SnapshotData,
    SnapshotInfo,
};

use crate::graph::GraphError;

/// Snapshot errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("not a graph snapshot (bad magic)")]
    BadMagic,

    #[error("unsupported snapshot format version {0}")]
    UnsupportedVersion(u32),

    #[error("snapshot digest mismatch, file is corrupt")]
    DigestMismatch,

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot holds an invalid graph: {0}")]
    Graph(#[from] GraphError),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;
