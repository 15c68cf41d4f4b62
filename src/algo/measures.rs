//! Similarity and distance measures
//!
//! | measure | value |
//! |---|---|
//! | shortest path | hops through the best common ancestor |
//! | Wu–Palmer | `2·depth(LCA) / (depth(A) + depth(B))` |
//! | Leacock–Chodorow | `-ln((len + 1) / (2·maxDepth + 1))` |
//! | Resnik | `IC(LCA)` |
//! | Lin | `2·IC(LCA) / (IC(A) + IC(B))` |
//! | Jiang–Conrath | `IC(A) + IC(B) - 2·IC(LCA)` (a distance) |
//! | Choi–Kim | `exp(-alpha·len) · tanh(beta·depth(LCA))` |
//! | Batet–Sánchez–Valls | `1 - log2(1 + |T(A) Δ T(B)| / |T(A) ∪ T(B)|)` |
//!
//! `T(c)` is the ancestor set of `c`, `c` included. Every measure is
//! symmetric in its two arguments.

use super::ic::InformationContent;
use super::paths::PathEngine;
use crate::config::ChoiKimParams;
use crate::graph::{ConceptGraph, ConceptId, GraphError, GraphResult};
use ontology_graph_algorithms::common_ancestors;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measure {
    ShortestPath,
    WuPalmer,
    LeacockChodorow,
    Resnik,
    Lin,
    JiangConrath,
    ChoiKim,
    BatetSanchezValls,
}

impl Measure {
    pub const ALL: [Measure; 8] = [
        Measure::ShortestPath,
        Measure::WuPalmer,
        Measure::LeacockChodorow,
        Measure::Resnik,
        Measure::Lin,
        Measure::JiangConrath,
        Measure::ChoiKim,
        Measure::BatetSanchezValls,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Measure::ShortestPath => "ShortestPath",
            Measure::WuPalmer => "WuPalmer",
            Measure::LeacockChodorow => "LeacockChodorow",
            Measure::Resnik => "Resnik",
            Measure::Lin => "Lin",
            Measure::JiangConrath => "JiangConrath",
            Measure::ChoiKim => "ChoiKim",
            Measure::BatetSanchezValls => "BatetSanchezValls",
        }
    }

    /// Larger values mean less similar
    pub fn is_distance(&self) -> bool {
        matches!(self, Measure::ShortestPath | Measure::JiangConrath)
    }

    /// Needs an information content table
    pub fn uses_ic(&self) -> bool {
        matches!(self, Measure::Resnik | Measure::Lin | Measure::JiangConrath)
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown measure '{0}'")]
pub struct UnknownMeasure(pub String);

impl FromStr for Measure {
    type Err = UnknownMeasure;

    /// Case-insensitive; `-`, `_` and spaces are ignored, so `wu-palmer`,
    /// `Wu_Palmer` and `WuPalmer` are the same measure
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let measure = match key.as_str() {
            "shortestpath" | "path" | "pathlength" => Measure::ShortestPath,
            "wupalmer" | "wup" => Measure::WuPalmer,
            "leacockchodorow" | "lch" => Measure::LeacockChodorow,
            "resnik" | "res" => Measure::Resnik,
            "lin" => Measure::Lin,
            "jiangconrath" | "jcn" => Measure::JiangConrath,
            "choikim" => Measure::ChoiKim,
            "batetsanchezvalls" | "bsv" => Measure::BatetSanchezValls,
            _ => return Err(UnknownMeasure(s.to_string())),
        };
        Ok(measure)
    }
}

/// Evaluates measures over one graph
pub struct SemanticEngine<'g> {
    paths: PathEngine<'g>,
    ic: InformationContent<'g>,
    choi_kim: ChoiKimParams,
}

impl<'g> SemanticEngine<'g> {
    /// Engine with structural IC
    pub fn new(graph: &'g ConceptGraph) -> Self {
        Self {
            paths: PathEngine::new(graph),
            ic: InformationContent::structural(graph),
            choi_kim: ChoiKimParams::default(),
        }
    }

    /// Engine over an existing path cache and IC table.
    ///
    /// Fails with `GraphMismatch` when the IC table was derived from a
    /// different graph instance.
    pub fn with_information_content(
        paths: PathEngine<'g>,
        ic: InformationContent<'g>,
    ) -> GraphResult<Self> {
        paths.graph().ensure_same(ic.graph_id())?;
        Ok(Self {
            paths,
            ic,
            choi_kim: ChoiKimParams::default(),
        })
    }

    pub fn choi_kim(mut self, params: ChoiKimParams) -> Self {
        self.choi_kim = params;
        self
    }

    pub fn graph(&self) -> &'g ConceptGraph {
        self.paths.graph()
    }

    pub fn paths(&self) -> &PathEngine<'g> {
        &self.paths
    }

    pub fn information_content(&self) -> &InformationContent<'g> {
        &self.ic
    }

    /// Score one pair.
    ///
    /// Fails with `DisconnectedConcept` for ids outside the graph and with
    /// `NoPath` when the measure needs a common ancestor the pair lacks.
    /// Lin returns NaN when both ICs are zero.
    pub fn score(&self, measure: Measure, a: ConceptId, b: ConceptId) -> GraphResult<f64> {
        let graph = self.graph();
        let (ia, ib) = (graph.index_of(a)?, graph.index_of(b)?);
        self.score_at(measure, ia, ib)
            .ok_or(GraphError::NoPath(a, b))
    }

    /// Score by dense index; `None` when the pair has no usable common
    /// ancestor
    pub fn score_at(&self, measure: Measure, a: usize, b: usize) -> Option<f64> {
        match measure {
            Measure::ShortestPath => self.paths.path_length_at(a, b).map(f64::from),
            Measure::WuPalmer => self.wu_palmer_at(a, b),
            Measure::LeacockChodorow => {
                let len = f64::from(self.paths.path_length_at(a, b)?);
                let max_depth = f64::from(self.graph().max_depth());
                Some(-((len + 1.0) / (2.0 * max_depth + 1.0)).ln())
            }
            Measure::Resnik => {
                let lca = self.paths.lca_at(a, b)?;
                Some(self.ic.ic_at(lca.ancestor))
            }
            Measure::Lin => {
                if a == b {
                    return Some(1.0);
                }
                let lca = self.paths.lca_at(a, b)?;
                let total = self.ic.ic_at(a) + self.ic.ic_at(b);
                if total == 0.0 {
                    return Some(f64::NAN);
                }
                Some(2.0 * self.ic.ic_at(lca.ancestor) / total)
            }
            Measure::JiangConrath => {
                if a == b {
                    return Some(0.0);
                }
                let lca = self.paths.lca_at(a, b)?;
                let dist = self.ic.ic_at(a) + self.ic.ic_at(b) - 2.0 * self.ic.ic_at(lca.ancestor);
                Some(dist.max(0.0))
            }
            Measure::ChoiKim => {
                let len = f64::from(self.paths.path_length_at(a, b)?);
                let lca = self.paths.lca_at(a, b)?;
                let depth = f64::from(self.graph().depth_at(lca.ancestor)?);
                let ChoiKimParams { alpha, beta } = self.choi_kim;
                Some((-alpha * len).exp() * (beta * depth).tanh())
            }
            Measure::BatetSanchezValls => Some(self.batet_at(a, b)),
        }
    }

    fn wu_palmer_at(&self, a: usize, b: usize) -> Option<f64> {
        if a == b {
            return Some(1.0);
        }
        let graph = self.graph();
        let (da, db) = (graph.depth_at(a)?, graph.depth_at(b)?);
        let Some(lca) = self.paths.lca_at(a, b) else {
            return Some(0.0);
        };
        let dl = graph.depth_at(lca.ancestor)?;
        if da + db == 0 {
            return Some(1.0);
        }
        Some(2.0 * f64::from(dl) / f64::from(da + db))
    }

    fn batet_at(&self, a: usize, b: usize) -> f64 {
        let (pa, pb) = (self.paths.ancestor_path_at(a), self.paths.ancestor_path_at(b));
        let shared = common_ancestors(pa, pb).len() as f64;
        let union = (pa.len() + pb.len()) as f64 - shared;
        let non_shared = union - shared;
        1.0 - (1.0 + non_shared / union).log2()
    }

    pub fn shortest_path_length(&self, a: ConceptId, b: ConceptId) -> GraphResult<u32> {
        self.paths.shortest_path_length(a, b)
    }

    pub fn lowest_common_ancestor(&self, a: ConceptId, b: ConceptId) -> GraphResult<ConceptId> {
        self.paths.lowest_common_ancestor(a, b)
    }

    pub fn wu_palmer(&self, a: ConceptId, b: ConceptId) -> GraphResult<f64> {
        self.score(Measure::WuPalmer, a, b)
    }

    pub fn leacock_chodorow(&self, a: ConceptId, b: ConceptId) -> GraphResult<f64> {
        self.score(Measure::LeacockChodorow, a, b)
    }

    pub fn resnik(&self, a: ConceptId, b: ConceptId) -> GraphResult<f64> {
        self.score(Measure::Resnik, a, b)
    }

    pub fn lin(&self, a: ConceptId, b: ConceptId) -> GraphResult<f64> {
        self.score(Measure::Lin, a, b)
    }

    pub fn jiang_conrath(&self, a: ConceptId, b: ConceptId) -> GraphResult<f64> {
        self.score(Measure::JiangConrath, a, b)
    }

    pub fn choi_kim_similarity(&self, a: ConceptId, b: ConceptId) -> GraphResult<f64> {
        self.score(Measure::ChoiKim, a, b)
    }

    pub fn batet_sanchez_valls(&self, a: ConceptId, b: ConceptId) -> GraphResult<f64> {
        self.score(Measure::BatetSanchezValls, a, b)
    }
}
