//! Frozen concept graph and its builder
//!
//! Concepts live in a dense arena (concept id -> index); adjacency is held
//! as a CSR [`GraphView`] in the toward-root direction with the reverse
//! index alongside. A graph never changes after [`GraphBuilder::build`].

use super::concept::Concept;
use super::relationship::Relationship;
use super::types::{ConceptId, GraphId, RelationPolicy, IS_A, ROOT_CONCEPT};
use crate::loader::{LoadedRelease, LoaderError};
use ontology_graph_algorithms::{depths_from_root, max_depth, unrooted_nodes, GraphView, UNREACHABLE};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while building or querying a graph
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("relationship {relationship} references concept {concept}, which is not in the concept set")]
    DanglingReference {
        relationship: ConceptId,
        concept: ConceptId,
    },

    #[error("root concept {0} is not in the concept set")]
    MissingRoot(ConceptId),

    #[error("concept {0} is not in this graph")]
    DisconnectedConcept(ConceptId),

    #[error("no common ancestor connects {0} and {1}")]
    NoPath(ConceptId, ConceptId),

    #[error("graph mismatch: expected graph {expected}, got {found}")]
    GraphMismatch { expected: GraphId, found: GraphId },

    #[error(transparent)]
    Loader(#[from] LoaderError),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Summary figures for one graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStatistics {
    pub concept_count: usize,
    pub edge_count: usize,
    pub root: ConceptId,
    pub max_depth: u32,
    /// Concepts with no directed path to the root
    pub unrooted: usize,
}

/// An immutable ontology graph for one release and one relation policy
#[derive(Debug)]
pub struct ConceptGraph {
    id: GraphId,
    policy: RelationPolicy,
    version: Option<String>,
    root: ConceptId,
    root_index: usize,
    /// Concept arena, indexed like `view`
    concepts: Vec<Concept>,
    /// Kept typed edges, one per (source, destination, type)
    edges: Vec<Relationship>,
    view: GraphView,
    depths: Vec<u32>,
    max_depth: u32,
}

impl ConceptGraph {
    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn policy(&self) -> &RelationPolicy {
        &self.policy
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn root(&self) -> ConceptId {
        self.root
    }

    pub fn root_index(&self) -> usize {
        self.root_index
    }

    pub fn view(&self) -> &GraphView {
        &self.view
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn edges(&self) -> &[Relationship] {
        &self.edges
    }

    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, id: ConceptId) -> bool {
        self.view.node_to_index.contains_key(&id.as_u64())
    }

    /// Dense index of a concept
    pub fn index_of(&self, id: ConceptId) -> GraphResult<usize> {
        self.view
            .index_of(id.as_u64())
            .ok_or(GraphError::DisconnectedConcept(id))
    }

    pub fn concept_at(&self, idx: usize) -> &Concept {
        &self.concepts[idx]
    }

    pub fn concept(&self, id: ConceptId) -> Option<&Concept> {
        self.view.index_of(id.as_u64()).map(|idx| &self.concepts[idx])
    }

    /// Fully specified name, when descriptions were loaded
    pub fn name(&self, id: ConceptId) -> Option<&str> {
        self.concept(id).and_then(|c| c.name.as_deref())
    }

    /// Direct, more general neighbours
    pub fn parents(&self, id: ConceptId) -> GraphResult<Vec<ConceptId>> {
        let idx = self.index_of(id)?;
        Ok(self
            .view
            .successors(idx)
            .iter()
            .map(|&p| self.concepts[p].id)
            .collect())
    }

    /// Direct, more specific neighbours
    pub fn children(&self, id: ConceptId) -> GraphResult<Vec<ConceptId>> {
        let idx = self.index_of(id)?;
        Ok(self
            .view
            .predecessors(idx)
            .iter()
            .map(|&c| self.concepts[c].id)
            .collect())
    }

    /// Shortest distance to the root, `None` if the root is unreachable
    pub fn depth_at(&self, idx: usize) -> Option<u32> {
        let depth = self.depths[idx];
        (depth != UNREACHABLE).then_some(depth)
    }

    pub fn depth(&self, id: ConceptId) -> GraphResult<Option<u32>> {
        Ok(self.depth_at(self.index_of(id)?))
    }

    /// Raw depth table (`UNREACHABLE` for unrooted concepts)
    pub fn depths(&self) -> &[u32] {
        &self.depths
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Fail with `GraphMismatch` unless `other` names this graph
    pub fn ensure_same(&self, other: GraphId) -> GraphResult<()> {
        if other == self.id {
            Ok(())
        } else {
            Err(GraphError::GraphMismatch {
                expected: self.id,
                found: other,
            })
        }
    }

    pub fn statistics(&self) -> GraphStatistics {
        GraphStatistics {
            concept_count: self.concepts.len(),
            edge_count: self.edges.len(),
            root: self.root,
            max_depth: self.max_depth,
            unrooted: unrooted_nodes(&self.depths).len(),
        }
    }

    /// Assemble from validated parts; shared by the builder and snapshot restore
    pub(crate) fn assemble(
        id: GraphId,
        policy: RelationPolicy,
        version: Option<String>,
        root: ConceptId,
        concepts: Vec<Concept>,
        edges: Vec<Relationship>,
    ) -> GraphResult<Self> {
        let index: FxHashMap<ConceptId, usize> = concepts
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.id, idx))
            .collect();

        let root_index = *index.get(&root).ok_or(GraphError::MissingRoot(root))?;

        let mut pairs = Vec::with_capacity(edges.len());
        for edge in &edges {
            let source = *index.get(&edge.source).ok_or(GraphError::DanglingReference {
                relationship: edge.id,
                concept: edge.source,
            })?;
            let destination =
                *index
                    .get(&edge.destination)
                    .ok_or(GraphError::DanglingReference {
                        relationship: edge.id,
                        concept: edge.destination,
                    })?;
            pairs.push((source, destination));
        }

        let index_to_node = concepts.iter().map(|c| c.id.as_u64()).collect();
        let view = GraphView::from_edges(index_to_node, &pairs);
        let depths = depths_from_root(&view, root_index);
        let deepest = max_depth(&depths);

        let unrooted = unrooted_nodes(&depths).len();
        if unrooted > 0 {
            warn!("{} concepts have no path to root {}", unrooted, root);
        }

        Ok(ConceptGraph {
            id,
            policy,
            version,
            root,
            root_index,
            concepts,
            edges,
            view,
            depths,
            max_depth: deepest,
        })
    }
}

/// Builds a [`ConceptGraph`] from loader output under a relation policy
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    root: ConceptId,
    is_a: ConceptId,
    policy: RelationPolicy,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            root: ROOT_CONCEPT,
            is_a: IS_A,
            policy: RelationPolicy::HierarchyOnly,
        }
    }
}

impl GraphBuilder {
    pub fn new(policy: RelationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn root(mut self, root: ConceptId) -> Self {
        self.root = root;
        self
    }

    pub fn is_a(mut self, is_a: ConceptId) -> Self {
        self.is_a = is_a;
        self
    }

    /// Build the graph.
    ///
    /// Fails with `DanglingReference` if a kept edge names a concept outside
    /// the concept set, `MissingRoot` if the root is absent, and
    /// `UnknownRelationshipType` if the policy names a type no relationship has.
    pub fn build(&self, release: &LoadedRelease) -> GraphResult<ConceptGraph> {
        let selected = release.select_relationships(&self.policy, self.is_a)?;

        let mut seen: FxHashSet<(ConceptId, ConceptId, ConceptId)> = FxHashSet::default();
        let mut edges = Vec::with_capacity(selected.len());
        for rel in selected {
            if seen.insert(rel.edge_key()) {
                edges.push(rel.clone());
            }
        }

        let graph = ConceptGraph::assemble(
            GraphId::new(),
            self.policy.clone(),
            release.version.clone(),
            self.root,
            release.concepts.clone(),
            edges,
        )?;

        info!(
            "Built {} graph: {} concepts, {} edges, max depth {}",
            graph.policy,
            graph.concept_count(),
            graph.edge_count(),
            graph.max_depth
        );
        Ok(graph)
    }
}

/// Edge multiset keyed by (source, destination, type), for equivalence checks
pub fn edge_multiset(graph: &ConceptGraph) -> HashMap<(ConceptId, ConceptId, ConceptId), usize> {
    let mut counts = HashMap::new();
    for edge in graph.edges() {
        *counts.entry(edge.edge_key()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: u64 = 138875005;
    const A: u64 = 10;
    const B: u64 = 20;
    const C: u64 = 30;
    const FINDING_SITE: u64 = 363698007;

    fn release() -> LoadedRelease {
        let concepts = [R, A, B, C]
            .iter()
            .map(|&id| Concept::new(ConceptId(id)))
            .collect();
        let relationships = vec![
            Relationship::new(1u64, A, R, IS_A),
            Relationship::new(2u64, B, R, IS_A),
            Relationship::new(3u64, C, A, IS_A),
            Relationship::new(4u64, C, B, FINDING_SITE),
            // same edge in another role group
            Relationship::new(5u64, C, B, FINDING_SITE),
        ];
        LoadedRelease::from_parts(concepts, relationships)
    }

    #[test]
    fn test_build_hierarchy_only() {
        let graph = GraphBuilder::new(RelationPolicy::HierarchyOnly)
            .build(&release())
            .unwrap();

        assert_eq!(graph.concept_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.parents(ConceptId(C)).unwrap(), vec![ConceptId(A)]);
        assert_eq!(graph.children(ConceptId(R)).unwrap().len(), 2);
        assert_eq!(graph.depth(ConceptId(C)).unwrap(), Some(2));
        assert_eq!(graph.max_depth(), 2);
        assert_eq!(graph.statistics().unrooted, 0);
    }

    #[test]
    fn test_build_all_relations_dedups_typed_edges() {
        let graph = GraphBuilder::new(RelationPolicy::AllRelations)
            .build(&release())
            .unwrap();
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.parents(ConceptId(C)).unwrap().len(), 2);
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let mut release = release();
        release
            .relationships
            .push(Relationship::new(9u64, C, 999u64, IS_A));

        let err = GraphBuilder::default().build(&release).unwrap_err();
        assert!(matches!(
            err,
            GraphError::DanglingReference { relationship, concept }
                if relationship == ConceptId(9) && concept == ConceptId(999)
        ));
    }

    #[test]
    fn test_missing_root_rejected() {
        let err = GraphBuilder::default()
            .root(ConceptId(1))
            .build(&release())
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingRoot(id) if id == ConceptId(1)));
    }

    #[test]
    fn test_unknown_relationship_type_surfaces_loader_error() {
        let err = GraphBuilder::new(RelationPolicy::Selected(vec![ConceptId(42)]))
            .build(&release())
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Loader(LoaderError::UnknownRelationshipType(id)) if id == ConceptId(42)
        ));
    }

    #[test]
    fn test_unknown_concept_lookup() {
        let graph = GraphBuilder::default().build(&release()).unwrap();
        assert!(!graph.contains(ConceptId(777)));
        assert!(matches!(
            graph.index_of(ConceptId(777)),
            Err(GraphError::DisconnectedConcept(_))
        ));
    }

    #[test]
    fn test_graph_ids_differ_between_builds() {
        let a = GraphBuilder::default().build(&release()).unwrap();
        let b = GraphBuilder::default().build(&release()).unwrap();
        assert!(a.ensure_same(a.id()).is_ok());
        assert!(matches!(a.ensure_same(b.id()), Err(GraphError::GraphMismatch { .. })));
    }
}
