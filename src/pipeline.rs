//! Release-to-matrix driver
//!
//! Thin glue over the loader, builder, snapshot and engine layers, shared
//! by the `semsim` binary and the integration tests. Any loader or builder
//! failure ends the run; no partially built graph is ever returned.

use crate::algo::{FrequencyTable, InformationContent, PathEngine, SemanticEngine};
use crate::config::{EngineConfig, IcStrategy};
use crate::graph::{ConceptGraph, GraphBuilder, GraphStatistics, RelationPolicy};
use crate::loader::{discover_release_files, LoadOptions, LoadedRelease, ReleaseLoader};
use crate::persistence::{snapshot_file_name, write_snapshot, SnapshotInfo};
use crate::{SemsimError, SemsimResult};
use std::path::{Path, PathBuf};
use tracing::info;

/// One graph written to disk
#[derive(Debug, Clone)]
pub struct BuiltSnapshot {
    pub policy: RelationPolicy,
    pub path: PathBuf,
    pub statistics: GraphStatistics,
    pub info: SnapshotInfo,
}

/// Discover and load every release table under `dir`
pub fn load_release(config: &EngineConfig, dir: impl AsRef<Path>) -> SemsimResult<LoadedRelease> {
    let files = discover_release_files(dir)?;
    let loader = ReleaseLoader::new(LoadOptions {
        include_inactive: config.include_inactive,
    });
    Ok(loader.load(&files)?)
}

pub fn build_graph(
    config: &EngineConfig,
    release: &LoadedRelease,
    policy: RelationPolicy,
) -> SemsimResult<ConceptGraph> {
    let graph = GraphBuilder::new(policy)
        .root(config.root)
        .is_a(config.is_a)
        .build(release)?;
    Ok(graph)
}

/// Build one graph per policy and write each as a snapshot into `out_dir`
pub fn build_snapshots(
    config: &EngineConfig,
    release_dir: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    policies: &[RelationPolicy],
) -> SemsimResult<Vec<BuiltSnapshot>> {
    let release = load_release(config, release_dir)?;
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir).map_err(|source| SemsimError::Io {
        path: out_dir.display().to_string(),
        source,
    })?;

    let mut built = Vec::with_capacity(policies.len());
    for policy in policies {
        let graph = build_graph(config, &release, policy.clone())?;
        let path = out_dir.join(snapshot_file_name(graph.version(), graph.policy()));
        let info = write_snapshot(&graph, &path)?;
        built.push(BuiltSnapshot {
            policy: policy.clone(),
            path,
            statistics: graph.statistics(),
            info,
        });
    }

    info!("Wrote {} snapshot(s) to {:?}", built.len(), out_dir);
    Ok(built)
}

/// Engine over `graph` with the configured IC strategy and Choi–Kim constants
pub fn engine<'g>(graph: &'g ConceptGraph, config: &EngineConfig) -> SemsimResult<SemanticEngine<'g>> {
    let paths = PathEngine::new(graph);
    let ic = match (config.ic_strategy, &config.frequency_table) {
        (IcStrategy::Corpus, Some(table)) => {
            let table = FrequencyTable::load(table)?;
            InformationContent::corpus(&paths, &table)
        }
        (IcStrategy::Corpus, None) => {
            return Err(SemsimError::Config(crate::config::ConfigError::Invalid(
                "ic_strategy 'corpus' needs frequency_table".to_string(),
            )));
        }
        (IcStrategy::Structural, _) => InformationContent::structural(graph),
    };
    Ok(SemanticEngine::with_information_content(paths, ic)?.choi_kim(config.choi_kim))
}
