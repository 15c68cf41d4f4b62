//! Pairwise distance/similarity matrices
//!
//! Rows and columns follow the caller's id order. Cells that cannot be
//! computed (ids outside the graph, pairs without a common ancestor) hold
//! [`MISSING`], which is NaN in memory and a configurable label on disk.
//! Only the upper triangle is computed; the lower one is mirrored.

pub mod coverage;
pub mod io;

pub use coverage::CoverageReport;
pub use io::{
    read_concept_list, read_delimited, write_delimited, write_json, write_matrix_file, LabeledMatrix,
    MatrixFormat,
};

use crate::algo::{Measure, SemanticEngine};
use crate::graph::ConceptId;
use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Missing-value marker
pub const MISSING: f64 = f64::NAN;

pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Matrix errors
#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}:{line}: {reason}")]
    Malformed {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MatrixError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        MatrixError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type MatrixResult<T> = Result<T, MatrixError>;

/// Symmetric matrix keyed by the caller's id list
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    measure: Measure,
    labels: Vec<String>,
    ids: Vec<Option<ConceptId>>,
    values: Array2<f64>,
}

impl DistanceMatrix {
    pub fn measure(&self) -> Measure {
        self.measure
    }

    /// Row/column labels as the caller supplied them
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Resolved id per row, `None` where the label was not a graph concept
    pub fn ids(&self) -> &[Option<ConceptId>] {
        &self.ids
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[[row, col]]
    }

    /// Labels that did not resolve to a concept in the graph
    pub fn unresolved(&self) -> Vec<&str> {
        self.labels
            .iter()
            .zip(&self.ids)
            .filter(|(_, id)| id.is_none())
            .map(|(label, _)| label.as_str())
            .collect()
    }

    pub fn summary(&self) -> MatrixSummary {
        let n = self.len();
        let mut finite = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        let mut missing = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                let value = self.values[[i, j]];
                if value.is_finite() {
                    finite.push(value);
                } else {
                    missing += 1;
                }
            }
        }
        finite.sort_by(|a, b| a.total_cmp(b));

        let median = match finite.len() {
            0 => None,
            len if len % 2 == 1 => Some(finite[len / 2]),
            len => Some((finite[len / 2 - 1] + finite[len / 2]) / 2.0),
        };
        let mean = (!finite.is_empty()).then(|| finite.iter().sum::<f64>() / finite.len() as f64);

        MatrixSummary {
            measure: self.measure,
            size: n,
            unresolved: self.unresolved().len(),
            pairs: finite.len() + missing,
            missing_pairs: missing,
            min: finite.first().copied(),
            max: finite.last().copied(),
            mean,
            median,
        }
    }
}

/// Statistics over the off-diagonal upper triangle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixSummary {
    pub measure: Measure,
    pub size: usize,
    pub unresolved: usize,
    pub pairs: usize,
    pub missing_pairs: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Builds matrices from a [`SemanticEngine`], one rayon task per row
pub struct MatrixAssembler<'e, 'g> {
    engine: &'e SemanticEngine<'g>,
    workers: usize,
}

impl<'e, 'g> MatrixAssembler<'e, 'g> {
    pub fn new(engine: &'e SemanticEngine<'g>) -> Self {
        Self { engine, workers: 0 }
    }

    /// Worker thread count; 0 uses the global rayon pool
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn assemble_ids(&self, ids: &[ConceptId], measure: Measure) -> MatrixResult<DistanceMatrix> {
        let labels: Vec<String> = ids.iter().map(ConceptId::to_string).collect();
        self.assemble(&labels, measure)
    }

    /// Compute the matrix for `labels`.
    ///
    /// A label that is not a decimal id, or names a concept outside the
    /// graph, gives a row and column of [`MISSING`]. Nothing else fails per
    /// cell; the only errors are worker pool start-up failures.
    pub fn assemble<S: AsRef<str>>(&self, labels: &[S], measure: Measure) -> MatrixResult<DistanceMatrix> {
        let start = Instant::now();
        let graph = self.engine.graph();

        let labels: Vec<String> = labels.iter().map(|l| l.as_ref().trim().to_string()).collect();
        let ids: Vec<Option<ConceptId>> = labels
            .iter()
            .map(|label| label.parse::<ConceptId>().ok().filter(|id| graph.contains(*id)))
            .collect();
        let indices: Vec<Option<usize>> = ids
            .iter()
            .map(|id| id.and_then(|id| graph.view().index_of(id.as_u64())))
            .collect();

        let unresolved = indices.iter().filter(|idx| idx.is_none()).count();
        if unresolved > 0 {
            warn!("{} of {} ids are not in the graph", unresolved, labels.len());
        }

        let rows = if self.workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()?;
            pool.install(|| self.compute_rows(&indices, measure))
        } else {
            self.compute_rows(&indices, measure)
        };

        let n = labels.len();
        let mut values = Array2::from_elem((n, n), MISSING);
        for (i, row) in rows.into_iter().enumerate() {
            for (offset, value) in row.into_iter().enumerate() {
                let j = i + offset;
                values[[i, j]] = value;
                values[[j, i]] = value;
            }
        }

        info!(
            "Assembled {}x{} {} matrix in {:?} ({} unresolved ids, {} cached paths)",
            n,
            n,
            measure,
            start.elapsed(),
            unresolved,
            self.engine.paths().cached_paths()
        );

        Ok(DistanceMatrix {
            measure,
            labels,
            ids,
            values,
        })
    }

    /// Upper-triangle rows; row `i` holds columns `i..n`
    fn compute_rows(&self, indices: &[Option<usize>], measure: Measure) -> Vec<Vec<f64>> {
        let resolved: Vec<usize> = indices.iter().flatten().copied().collect();

        // Fill the ancestor cache up front so rows do not queue behind each other
        resolved.par_iter().for_each(|&idx| {
            self.engine.paths().ancestor_path_at(idx);
        });
        if measure.uses_ic() {
            self.engine.information_content().precompute(&resolved);
        }
        debug!("Warmed caches for {} concepts", resolved.len());

        let n = indices.len();
        (0..n)
            .into_par_iter()
            .map(|i| {
                (i..n)
                    .map(|j| match (indices[i], indices[j]) {
                        (Some(a), Some(b)) => self.engine.score_at(measure, a, b).unwrap_or(MISSING),
                        _ => MISSING,
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Concept, ConceptGraph, GraphBuilder, Relationship, IS_A};
    use crate::loader::LoadedRelease;

    const R: u64 = 138875005;

    /// A=1 -> R, B=2 -> R, C=3 -> A
    fn graph() -> ConceptGraph {
        let concepts = [R, 1, 2, 3]
            .iter()
            .map(|&id| Concept::new(ConceptId(id)))
            .collect();
        let relationships = vec![
            Relationship::new(11u64, 1u64, R, IS_A),
            Relationship::new(12u64, 2u64, R, IS_A),
            Relationship::new(13u64, 3u64, 1u64, IS_A),
        ];
        GraphBuilder::default()
            .build(&LoadedRelease::from_parts(concepts, relationships))
            .unwrap()
    }

    #[test]
    fn test_unknown_id_row_is_missing() {
        let graph = graph();
        let engine = SemanticEngine::new(&graph);
        let matrix = MatrixAssembler::new(&engine)
            .assemble(&["1", "2", "424242"], Measure::ShortestPath)
            .unwrap();

        assert_eq!(matrix.values().dim(), (3, 3));
        assert_eq!(matrix.get(0, 1), 2.0);
        assert_eq!(matrix.get(1, 0), 2.0);
        assert_eq!(matrix.get(0, 0), 0.0);
        for k in 0..3 {
            assert!(is_missing(matrix.get(2, k)));
            assert!(is_missing(matrix.get(k, 2)));
        }
        assert_eq!(matrix.unresolved(), vec!["424242"]);
    }

    #[test]
    fn test_unparsable_label_is_missing() {
        let graph = graph();
        let engine = SemanticEngine::new(&graph);
        let matrix = MatrixAssembler::new(&engine)
            .assemble(&["3", "1.0e0", "2"], Measure::WuPalmer)
            .unwrap();
        assert!(is_missing(matrix.get(1, 1)));
        assert_eq!(matrix.get(0, 0), 1.0);
        assert_eq!(matrix.get(0, 2), 0.0);
    }

    #[test]
    fn test_fixed_worker_pool_matches_global_pool() {
        let graph = graph();
        let engine = SemanticEngine::new(&graph);
        let ids: Vec<ConceptId> = [R, 1, 2, 3].iter().map(|&id| ConceptId(id)).collect();

        let a = MatrixAssembler::new(&engine)
            .assemble_ids(&ids, Measure::Lin)
            .unwrap();
        let b = MatrixAssembler::new(&engine)
            .workers(2)
            .assemble_ids(&ids, Measure::Lin)
            .unwrap();
        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_summary() {
        let graph = graph();
        let engine = SemanticEngine::new(&graph);
        let matrix = MatrixAssembler::new(&engine)
            .assemble(&["1", "2", "3", "bogus"], Measure::ShortestPath)
            .unwrap();

        // pairs: (1,2)=2 (1,3)=1 (2,3)=3, three missing with "bogus"
        let summary = matrix.summary();
        assert_eq!(summary.size, 4);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.pairs, 6);
        assert_eq!(summary.missing_pairs, 3);
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.max, Some(3.0));
        assert_eq!(summary.median, Some(2.0));
        assert_eq!(summary.mean, Some(2.0));
    }
}
