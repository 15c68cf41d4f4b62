//! Information content
//!
//! Structural IC: `-ln((descendants(c) + 1) / (N + 1))` where `N` is the
//! number of concepts in the graph.
//!
//! Corpus IC adds observed concept frequencies, propagated to every
//! ancestor, on top of the structural counts:
//! `-ln((freq(c) + descendants(c) + 1) / (total + N + 1))`.
//! With an empty table this is exactly the structural value, concepts the
//! table never mentions still get a finite IC, and IC never decreases
//! from a concept to any of its descendants.

use super::paths::PathEngine;
use crate::config::IcStrategy;
use crate::graph::{ConceptGraph, ConceptId, GraphId, GraphResult};
use crate::loader::{LoaderError, LoaderResult};
use ontology_graph_algorithms::{descendant_count, descendant_counts};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Observed concept frequencies (`conceptId<TAB>count` per line)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: Vec<(ConceptId, u64)>,
}

impl FrequencyTable {
    pub fn new(counts: Vec<(ConceptId, u64)>) -> Self {
        Self { counts }
    }

    pub fn load(path: impl AsRef<Path>) -> LoaderResult<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| LoaderError::io(&name, e))?;
        Self::read(&name, BufReader::new(file))
    }

    /// Parse a frequency table.
    ///
    /// Fields are separated by a tab, a comma, or spaces. Blank lines and
    /// lines starting with `#` are skipped, as is a header line whose first
    /// field is not a number. Repeated ids add up once propagated.
    pub fn read<R: BufRead>(name: &str, reader: R) -> LoaderResult<Self> {
        let mut counts = Vec::new();

        for (n, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| LoaderError::io(name, e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line
                .split(|c: char| c == '\t' || c == ',' || c == ' ')
                .filter(|f| !f.is_empty());
            let (id, count) = match (fields.next(), fields.next()) {
                (Some(id), Some(count)) => (id, count),
                _ => {
                    return Err(malformed(name, n + 1, "count", "expected two fields".into()));
                }
            };

            let id: ConceptId = match id.parse() {
                Ok(id) => id,
                Err(_) if n == 0 => continue,
                Err(e) => return Err(malformed(name, n + 1, "conceptId", e.to_string())),
            };
            let count: u64 = count
                .parse()
                .map_err(|e: std::num::ParseIntError| malformed(name, n + 1, "count", e.to_string()))?;
            counts.push((id, count));
        }

        Ok(Self { counts })
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConceptId, u64)> + '_ {
        self.counts.iter().copied()
    }
}

fn malformed(file: &str, line: usize, column: &str, reason: String) -> LoaderError {
    LoaderError::MalformedRecord {
        file: file.to_string(),
        line,
        column: column.to_string(),
        reason,
    }
}

struct CorpusCounts {
    /// Frequency of each concept plus all of its descendants
    propagated: Vec<u64>,
    total: u64,
}

/// IC table bound to one graph instance
pub struct InformationContent<'g> {
    graph: &'g ConceptGraph,
    graph_id: GraphId,
    strategy: IcStrategy,
    descendants: Vec<OnceLock<usize>>,
    corpus: Option<CorpusCounts>,
}

impl<'g> InformationContent<'g> {
    pub fn structural(graph: &'g ConceptGraph) -> Self {
        Self {
            graph,
            graph_id: graph.id(),
            strategy: IcStrategy::Structural,
            descendants: (0..graph.concept_count()).map(|_| OnceLock::new()).collect(),
            corpus: None,
        }
    }

    /// Corpus IC from a frequency table.
    ///
    /// Ids absent from the graph are skipped with a warning.
    pub fn corpus(paths: &PathEngine<'g>, table: &FrequencyTable) -> Self {
        let graph = paths.graph();
        let mut propagated = vec![0u64; graph.concept_count()];
        let mut total = 0u64;
        let mut unknown = 0usize;

        for (id, count) in table.iter() {
            let Some(idx) = graph.view().index_of(id.as_u64()) else {
                unknown += 1;
                continue;
            };
            total += count;
            for &(ancestor, _) in paths.ancestor_path_at(idx).entries() {
                propagated[ancestor] += count;
            }
        }

        if unknown > 0 {
            warn!("{} frequency table ids are not in the graph", unknown);
        }
        info!(
            "Corpus IC: {} observations over {} concepts",
            total,
            table.len() - unknown
        );

        Self {
            strategy: IcStrategy::Corpus,
            corpus: Some(CorpusCounts { propagated, total }),
            ..Self::structural(graph)
        }
    }

    pub fn graph_id(&self) -> GraphId {
        self.graph_id
    }

    pub fn strategy(&self) -> IcStrategy {
        self.strategy
    }

    pub fn descendant_count_at(&self, idx: usize) -> usize {
        *self.descendants[idx].get_or_init(|| descendant_count(self.graph.view(), idx))
    }

    /// Number of distinct concepts below `id`
    pub fn descendant_count(&self, id: ConceptId) -> GraphResult<usize> {
        Ok(self.descendant_count_at(self.graph.index_of(id)?))
    }

    pub fn ic_at(&self, idx: usize) -> f64 {
        let n = self.graph.concept_count() as f64;
        let below = self.descendant_count_at(idx) as f64 + 1.0;
        let ic = match &self.corpus {
            None => -(below / (n + 1.0)).ln(),
            Some(counts) => {
                let freq = counts.propagated[idx] as f64 + below;
                -(freq / (counts.total as f64 + n + 1.0)).ln()
            }
        };
        ic.max(0.0)
    }

    pub fn ic(&self, id: ConceptId) -> GraphResult<f64> {
        Ok(self.ic_at(self.graph.index_of(id)?))
    }

    /// Fill the descendant cache for the given concepts in parallel
    pub fn precompute(&self, indices: &[usize]) {
        let missing: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&idx| self.descendants[idx].get().is_none())
            .collect();
        let counts = descendant_counts(self.graph.view(), &missing);
        for (&idx, count) in missing.iter().zip(counts) {
            // a concurrent query may have filled it first with the same value
            let _ = self.descendants[idx].set(count);
        }
        debug!("Precomputed descendant counts for {} concepts", missing.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Concept, GraphBuilder, Relationship, IS_A};
    use crate::loader::LoadedRelease;
    use std::io::Cursor;

    const R: u64 = 138875005;

    /// R <- 1 <- 3, R <- 2, 3 <- 4
    fn graph() -> ConceptGraph {
        let concepts = [R, 1, 2, 3, 4]
            .iter()
            .map(|&id| Concept::new(ConceptId(id)))
            .collect();
        let relationships = vec![
            Relationship::new(11u64, 1u64, R, IS_A),
            Relationship::new(12u64, 2u64, R, IS_A),
            Relationship::new(13u64, 3u64, 1u64, IS_A),
            Relationship::new(14u64, 4u64, 3u64, IS_A),
        ];
        GraphBuilder::default()
            .build(&LoadedRelease::from_parts(concepts, relationships))
            .unwrap()
    }

    #[test]
    fn test_structural_ic() {
        let graph = graph();
        let ic = InformationContent::structural(&graph);

        assert_eq!(ic.descendant_count(ConceptId(R)).unwrap(), 4);
        assert_eq!(ic.descendant_count(ConceptId(4)).unwrap(), 0);

        let root = ic.ic(ConceptId(R)).unwrap();
        assert!((root - (6.0f64 / 5.0).ln()).abs() < 1e-12);
        assert!(root < 0.2);

        // monotone down the hierarchy
        let chain: Vec<f64> = [R, 1, 3, 4]
            .iter()
            .map(|&id| ic.ic(ConceptId(id)).unwrap())
            .collect();
        assert!(chain.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_corpus_ic_propagates_counts() {
        let graph = graph();
        let paths = PathEngine::new(&graph);
        let table = FrequencyTable::new(vec![
            (ConceptId(4), 50),
            (ConceptId(2), 10),
            (ConceptId(555), 7),
        ]);
        let ic = InformationContent::corpus(&paths, &table);
        assert_eq!(ic.strategy(), IcStrategy::Corpus);

        // root sees every observation and every concept
        let root = ic.ic(ConceptId(R)).unwrap();
        assert!((root - (66.0f64 / 65.0).ln()).abs() < 1e-12);

        let ic_1 = ic.ic(ConceptId(1)).unwrap();
        let ic_3 = ic.ic(ConceptId(3)).unwrap();
        let ic_4 = ic.ic(ConceptId(4)).unwrap();
        assert!(ic_1 <= ic_3 && ic_3 <= ic_4);

        // 2 is rarer than 1 in the corpus
        assert!(ic.ic(ConceptId(2)).unwrap() > ic_1);
    }

    #[test]
    fn test_empty_corpus_matches_structural() {
        let graph = graph();
        let paths = PathEngine::new(&graph);
        let corpus = InformationContent::corpus(&paths, &FrequencyTable::default());
        let structural = InformationContent::structural(&graph);
        for id in [R, 1, 2, 3, 4] {
            let a = corpus.ic(ConceptId(id)).unwrap();
            let b = structural.ic(ConceptId(id)).unwrap();
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_read_frequency_table() {
        let text = "conceptId\tcount\n# comment\n\n22298006\t12\n22298006,3\n73211009 4\n";
        let table = FrequencyTable::read("freq.tsv", Cursor::new(text)).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            vec![
                (ConceptId(22298006), 12),
                (ConceptId(22298006), 3),
                (ConceptId(73211009), 4)
            ]
        );

        let err = FrequencyTable::read("freq.tsv", Cursor::new("1\t2\nabc\t5\n")).unwrap_err();
        assert!(matches!(err, LoaderError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn test_precompute_fills_cache() {
        let graph = graph();
        let ic = InformationContent::structural(&graph);
        let all: Vec<usize> = (0..graph.concept_count()).collect();
        ic.descendant_count_at(1);
        ic.precompute(&all);
        assert!(ic.descendants.iter().all(|cell| cell.get().is_some()));
        assert_eq!(ic.descendant_count(ConceptId(R)).unwrap(), 4);
        assert_eq!(ic.descendant_count(ConceptId(3)).unwrap(), 1);
    }
}
