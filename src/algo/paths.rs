//! Path and LCA queries over a frozen graph
//!
//! Each concept's ancestor path is computed at most once per engine and then
//! shared by every query that touches it, including queries running on other
//! threads.

use crate::graph::{ConceptGraph, ConceptId, GraphError, GraphResult};
use ontology_graph_algorithms::{
    ancestor_path, lowest_common_ancestor, shortest_path_length, AncestorPath, LcaResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Lowest common ancestor in concept terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lca {
    pub ancestor: ConceptId,
    /// Hops from the first concept up to the ancestor
    pub dist_a: u32,
    /// Hops from the second concept up to the ancestor
    pub dist_b: u32,
    /// Depth of the ancestor, `None` if it cannot reach the root
    pub depth: Option<u32>,
}

/// Path engine with a per-concept ancestor cache
pub struct PathEngine<'g> {
    graph: &'g ConceptGraph,
    cache: Vec<OnceLock<AncestorPath>>,
    filled: AtomicUsize,
}

impl<'g> PathEngine<'g> {
    pub fn new(graph: &'g ConceptGraph) -> Self {
        let cache = (0..graph.concept_count()).map(|_| OnceLock::new()).collect();
        Self {
            graph,
            cache,
            filled: AtomicUsize::new(0),
        }
    }

    pub fn graph(&self) -> &'g ConceptGraph {
        self.graph
    }

    /// Number of concepts whose ancestor path has been computed
    pub fn cached_paths(&self) -> usize {
        self.filled.load(Ordering::Relaxed)
    }

    /// Ancestor path of the concept at a dense index.
    ///
    /// Concurrent callers asking for the same concept block on a single
    /// computation and then share its result.
    pub fn ancestor_path_at(&self, idx: usize) -> &AncestorPath {
        self.cache[idx].get_or_init(|| {
            self.filled.fetch_add(1, Ordering::Relaxed);
            ancestor_path(self.graph.view(), idx)
        })
    }

    pub fn ancestor_path(&self, id: ConceptId) -> GraphResult<&AncestorPath> {
        Ok(self.ancestor_path_at(self.graph.index_of(id)?))
    }

    /// Every concept reachable upward from `id`, excluding `id` itself,
    /// nearest first
    pub fn ancestors(&self, id: ConceptId) -> GraphResult<Vec<ConceptId>> {
        let path = self.ancestor_path(id)?;
        Ok(path
            .by_distance()
            .into_iter()
            .filter(|&(idx, _)| idx != path.source)
            .map(|(idx, _)| self.graph.concept_at(idx).id)
            .collect())
    }

    /// True when `ancestor` is reachable upward from `descendant`.
    /// A concept counts as its own ancestor.
    pub fn is_ancestor(&self, ancestor: ConceptId, descendant: ConceptId) -> GraphResult<bool> {
        let target = self.graph.index_of(ancestor)?;
        let path = self.ancestor_path(descendant)?;
        Ok(path.distance_to(target).is_some())
    }

    pub fn path_length_at(&self, a: usize, b: usize) -> Option<u32> {
        shortest_path_length(self.ancestor_path_at(a), self.ancestor_path_at(b))
    }

    pub fn lca_at(&self, a: usize, b: usize) -> Option<LcaResult> {
        lowest_common_ancestor(
            self.graph.view(),
            self.graph.depths(),
            self.ancestor_path_at(a),
            self.ancestor_path_at(b),
        )
    }

    /// Hops between two concepts through their best common ancestor.
    ///
    /// `0` when `a == b`. Fails with `DisconnectedConcept` for ids outside
    /// the graph and `NoPath` when the two share no ancestor.
    pub fn shortest_path_length(&self, a: ConceptId, b: ConceptId) -> GraphResult<u32> {
        let (ia, ib) = (self.graph.index_of(a)?, self.graph.index_of(b)?);
        self.path_length_at(ia, ib).ok_or(GraphError::NoPath(a, b))
    }

    pub fn lca_result(&self, a: ConceptId, b: ConceptId) -> GraphResult<Lca> {
        let (ia, ib) = (self.graph.index_of(a)?, self.graph.index_of(b)?);
        let found = self.lca_at(ia, ib).ok_or(GraphError::NoPath(a, b))?;
        Ok(Lca {
            ancestor: self.graph.concept_at(found.ancestor).id,
            dist_a: found.dist_a,
            dist_b: found.dist_b,
            depth: self.graph.depth_at(found.ancestor),
        })
    }

    /// Deepest common ancestor of two concepts
    pub fn lowest_common_ancestor(&self, a: ConceptId, b: ConceptId) -> GraphResult<ConceptId> {
        self.lca_result(a, b).map(|lca| lca.ancestor)
    }

    pub fn depth(&self, id: ConceptId) -> GraphResult<Option<u32>> {
        self.graph.depth(id)
    }

    pub fn max_depth(&self) -> u32 {
        self.graph.max_depth()
    }
}
