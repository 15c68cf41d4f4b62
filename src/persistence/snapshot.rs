//! Graph snapshot files
//!
//! Layout: 4-byte magic `SCTG`, little-endian u32 format version, 32-byte
//! SHA-256 of the body, then the body: gzip-compressed bincode of
//! [`SnapshotData`]. Restoring re-runs graph assembly so a restored graph
//! satisfies every builder invariant.

use super::{SnapshotError, SnapshotResult};
use crate::graph::{Concept, ConceptGraph, ConceptId, GraphId, RelationPolicy, Relationship};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const MAGIC: &[u8; 4] = b"SCTG";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 32;

/// Serialized form of a graph
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotData {
    pub graph_id: GraphId,
    pub policy: RelationPolicy,
    pub version: Option<String>,
    pub root: ConceptId,
    /// Unix seconds at which the snapshot was written
    pub created_at: i64,
    pub concepts: Vec<Concept>,
    pub edges: Vec<Relationship>,
}

/// What was written
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub bytes: usize,
    pub concepts: usize,
    pub edges: usize,
    pub digest: String,
}

/// Conventional file name, e.g. `snomed-20230430_dag_is-a.snap`
pub fn snapshot_file_name(version: Option<&str>, policy: &RelationPolicy) -> String {
    format!(
        "snomed-{}_dag_{}.snap",
        version.unwrap_or("unversioned"),
        policy.label()
    )
}

/// Encode a graph into snapshot bytes
pub fn to_bytes(graph: &ConceptGraph) -> SnapshotResult<Vec<u8>> {
    let data = SnapshotData {
        graph_id: graph.id(),
        policy: graph.policy().clone(),
        version: graph.version().map(str::to_string),
        root: graph.root(),
        created_at: chrono::Utc::now().timestamp(),
        concepts: graph.concepts().to_vec(),
        edges: graph.edges().to_vec(),
    };

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    bincode::serialize_into(&mut encoder, &data)?;
    let body = encoder.finish()?;

    let digest = Sha256::digest(&body);

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&digest);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode snapshot bytes back into a graph
pub fn from_bytes(bytes: &[u8]) -> SnapshotResult<ConceptGraph> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(SnapshotError::BadMagic);
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..8]);
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(version));
    }

    let expected = &bytes[8..HEADER_LEN];
    let body = &bytes[HEADER_LEN..];
    if Sha256::digest(body).as_slice() != expected {
        return Err(SnapshotError::DigestMismatch);
    }

    let data: SnapshotData = bincode::deserialize_from(GzDecoder::new(body))?;
    let graph = ConceptGraph::assemble(
        data.graph_id,
        data.policy,
        data.version,
        data.root,
        data.concepts,
        data.edges,
    )?;
    Ok(graph)
}

/// Sibling file a snapshot is staged in before it replaces `path`
fn staging_path(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("snapshot path {:?} has no file name", path),
        )
    })?;
    let mut staged = OsString::from(".");
    staged.push(name);
    staged.push(".tmp");
    Ok(path.with_file_name(staged))
}

fn write_staged(staged: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(staged)?);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()
}

/// Write a snapshot file.
///
/// The bytes go to a staging file next to `path` that is synced and then
/// renamed over it, so an interrupted write leaves any earlier snapshot at
/// `path` intact.
pub fn write_snapshot(graph: &ConceptGraph, path: impl AsRef<Path>) -> SnapshotResult<SnapshotInfo> {
    let path = path.as_ref();
    let bytes = to_bytes(graph)?;

    let staged = staging_path(path)?;
    if let Err(err) = write_staged(&staged, &bytes).and_then(|()| fs::rename(&staged, path)) {
        let _ = fs::remove_file(&staged);
        return Err(err.into());
    }

    let digest = bytes[8..HEADER_LEN]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>();
    info!(
        "Wrote snapshot {:?}: {} bytes, {} concepts, {} edges",
        path,
        bytes.len(),
        graph.concept_count(),
        graph.edge_count()
    );

    Ok(SnapshotInfo {
        bytes: bytes.len(),
        concepts: graph.concept_count(),
        edges: graph.edge_count(),
        digest,
    })
}

/// Restore a graph from a snapshot file
pub fn read_snapshot(path: impl AsRef<Path>) -> SnapshotResult<ConceptGraph> {
    let path = path.as_ref();
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;

    let graph = from_bytes(&bytes)?;
    info!(
        "Restored {} graph from {:?}: {} concepts, {} edges",
        graph.policy(),
        path,
        graph.concept_count(),
        graph.edge_count()
    );
    Ok(graph)
}
