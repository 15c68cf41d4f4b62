//! Ancestor paths, shortest paths through common ancestors, and LCA
//!
//! Edges are directed toward generality, so two concepts are usually not
//! mutually reachable. Distances between them are taken through a common
//! ancestor: `min over C of dist(A, C) + dist(B, C)`.

use super::common::{GraphView, NodeId};
use super::topology::UNREACHABLE;
use std::collections::{HashMap, VecDeque};

/// Every ancestor of a node (including itself at distance 0) with its
/// shortest upward distance. Entries are sorted by dense index so two
/// paths can be intersected with a linear merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorPath {
    pub source: usize,
    entries: Vec<(usize, u32)>,
}

impl AncestorPath {
    /// Number of ancestors, the source included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Upward distance from the source to `idx`, if `idx` is an ancestor
    pub fn distance_to(&self, idx: usize) -> Option<u32> {
        self.entries
            .binary_search_by_key(&idx, |&(node, _)| node)
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    /// `(index, distance)` pairs in index order
    pub fn entries(&self) -> &[(usize, u32)] {
        &self.entries
    }

    /// `(index, distance)` pairs ordered from the source outward
    pub fn by_distance(&self) -> Vec<(usize, u32)> {
        let mut ordered = self.entries.clone();
        ordered.sort_unstable_by_key(|&(node, dist)| (dist, node));
        ordered
    }
}

/// Result of a lowest-common-ancestor query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcaResult {
    pub ancestor: usize,
    pub dist_a: u32,
    pub dist_b: u32,
    /// Depth of the ancestor, `UNREACHABLE` if it cannot reach the root
    pub depth: u32,
}

impl LcaResult {
    pub fn total_distance(&self) -> u32 {
        self.dist_a + self.dist_b
    }
}

/// Breadth-first sweep along outgoing edges from `source`
pub fn ancestor_path(view: &GraphView, source: usize) -> AncestorPath {
    let mut visited: HashMap<usize, u32> = HashMap::new();
    let mut queue = VecDeque::new();

    visited.insert(source, 0);
    queue.push_back(source);

    while let Some(current) = queue.pop_front() {
        let dist = visited[&current];
        for &parent in view.successors(current) {
            if !visited.contains_key(&parent) {
                visited.insert(parent, dist + 1);
                queue.push_back(parent);
            }
        }
    }

    let mut entries: Vec<(usize, u32)> = visited.into_iter().collect();
    entries.sort_unstable_by_key(|&(node, _)| node);
    AncestorPath { source, entries }
}

/// Ancestors shared by both paths as `(index, dist_a, dist_b)`
pub fn common_ancestors(a: &AncestorPath, b: &AncestorPath) -> Vec<(usize, u32, u32)> {
    let (xs, ys) = (a.entries(), b.entries());
    let mut shared = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < xs.len() && j < ys.len() {
        match xs[i].0.cmp(&ys[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared.push((xs[i].0, xs[i].1, ys[j].1));
                i += 1;
                j += 1;
            }
        }
    }

    shared
}

/// Minimum hop count between two nodes through any common ancestor
pub fn shortest_path_length(a: &AncestorPath, b: &AncestorPath) -> Option<u32> {
    if a.source == b.source {
        return Some(0);
    }
    common_ancestors(a, b)
        .into_iter()
        .map(|(_, da, db)| da + db)
        .min()
}

/// Deepest common ancestor.
///
/// Depth is the shortest distance to the root, so in a DAG a concept with a
/// short route to the root can have ancestors that are deeper than itself.
/// Such ancestors are not candidates: an LCA is never deeper than
/// `min(depth(a), depth(b))`. Ties on depth go to the smallest total
/// distance, then to the smallest external id. Ancestors that cannot reach
/// the root rank below any rooted one.
pub fn lowest_common_ancestor(
    view: &GraphView,
    depths: &[u32],
    a: &AncestorPath,
    b: &AncestorPath,
) -> Option<LcaResult> {
    let rank = |idx: usize| -> Option<u32> {
        let depth = depths[idx];
        (depth != UNREACHABLE).then_some(depth)
    };
    let id = |idx: usize| -> NodeId { view.index_to_node[idx] };
    let bound = depths[a.source].min(depths[b.source]);

    let mut best: Option<(usize, u32, u32)> = None;
    for (candidate, da, db) in common_ancestors(a, b) {
        if matches!(rank(candidate), Some(depth) if depth > bound) {
            continue;
        }
        let is_better = match best {
            None => true,
            Some((current, ca, cb)) => {
                let (r_new, r_cur) = (rank(candidate), rank(current));
                r_new > r_cur
                    || (r_new == r_cur
                        && (da + db < ca + cb
                            || (da + db == ca + cb && id(candidate) < id(current))))
            }
        };
        if is_better {
            best = Some((candidate, da, db));
        }
    }

    best.map(|(ancestor, dist_a, dist_b)| LcaResult {
        ancestor,
        dist_a,
        dist_b,
        depth: depths[ancestor],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::depths_from_root;

    /// R=0, A=1, B=2, C=3 with A->R, B->R, C->A
    fn scenario() -> GraphView {
        GraphView::from_edges(vec![100, 200, 300, 400], &[(1, 0), (2, 0), (3, 1)])
    }

    #[test]
    fn test_ancestor_path_includes_self() {
        let view = scenario();
        let path = ancestor_path(&view, 3);
        assert_eq!(path.len(), 3);
        assert_eq!(path.distance_to(3), Some(0));
        assert_eq!(path.distance_to(1), Some(1));
        assert_eq!(path.distance_to(0), Some(2));
        assert_eq!(path.distance_to(2), None);
        assert_eq!(path.by_distance(), vec![(3, 0), (1, 1), (0, 2)]);
    }

    #[test]
    fn test_shortest_path_through_root() {
        let view = scenario();
        let c = ancestor_path(&view, 3);
        let b = ancestor_path(&view, 2);
        let a = ancestor_path(&view, 1);
        assert_eq!(shortest_path_length(&c, &b), Some(3));
        assert_eq!(shortest_path_length(&b, &c), Some(3));
        assert_eq!(shortest_path_length(&a, &c), Some(1));
        assert_eq!(shortest_path_length(&a, &a), Some(0));
    }

    #[test]
    fn test_lca_prefers_deepest() {
        let view = scenario();
        let depths = depths_from_root(&view, 0);
        let a = ancestor_path(&view, 1);
        let b = ancestor_path(&view, 2);
        let c = ancestor_path(&view, 3);

        let lca = lowest_common_ancestor(&view, &depths, &c, &b).unwrap();
        assert_eq!(lca.ancestor, 0);
        assert_eq!(lca.total_distance(), 3);

        let lca = lowest_common_ancestor(&view, &depths, &a, &c).unwrap();
        assert_eq!(lca.ancestor, 1);
        assert_eq!((lca.dist_a, lca.dist_b, lca.depth), (0, 1, 1));
    }

    #[test]
    fn test_lca_tie_breaks_on_smallest_id() {
        // Root 0; X=1 and Y=2 both at depth 1; leaves 3 and 4 under both.
        let view = GraphView::from_edges(
            vec![1000, 50, 40, 7, 8],
            &[(1, 0), (2, 0), (3, 1), (3, 2), (4, 1), (4, 2)],
        );
        let depths = depths_from_root(&view, 0);
        let p = ancestor_path(&view, 3);
        let q = ancestor_path(&view, 4);

        let lca = lowest_common_ancestor(&view, &depths, &p, &q).unwrap();
        // Same depth and distance: id 40 beats id 50
        assert_eq!(lca.ancestor, 2);
    }

    #[test]
    fn test_lca_never_deeper_than_inputs() {
        // 0 root; 1 -> 0; 2 -> 1; 3 -> 2; 4 -> 3 and 4 -> 0 (shortcut);
        // 5 -> 3 and 5 -> 0 (shortcut).
        let view = GraphView::from_edges(
            vec![1, 2, 3, 4, 5, 6],
            &[(1, 0), (2, 1), (3, 2), (4, 3), (4, 0), (5, 3), (5, 0)],
        );
        let depths = depths_from_root(&view, 0);
        assert_eq!((depths[3], depths[4], depths[5]), (3, 1, 1));

        let p = ancestor_path(&view, 4);
        let q = ancestor_path(&view, 5);
        let lca = lowest_common_ancestor(&view, &depths, &p, &q).unwrap();
        // node 3 is shared and nearer, but deeper than both inputs
        assert_eq!(lca.ancestor, 0);
        assert!(lca.depth <= depths[4].min(depths[5]));
        // the shortest path still runs through node 3
        assert_eq!(shortest_path_length(&p, &q), Some(2));
    }

    #[test]
    fn test_no_common_ancestor() {
        let view = GraphView::from_edges(vec![1, 2], &[]);
        let depths = depths_from_root(&view, 0);
        let a = ancestor_path(&view, 0);
        let b = ancestor_path(&view, 1);
        assert_eq!(shortest_path_length(&a, &b), None);
        assert!(lowest_common_ancestor(&view, &depths, &a, &b).is_none());
    }
}
