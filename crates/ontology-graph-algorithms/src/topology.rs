//! Whole-graph topology sweeps
//!
//! Depth from the root, descendant counts and rootedness checks.

use super::common::GraphView;
use rayon::prelude::*;
use std::collections::VecDeque;

/// Depth marker for nodes with no path to the root
pub const UNREACHABLE: u32 = u32::MAX;

/// Shortest upward distance of every node to `root`.
///
/// Computed by a single breadth-first sweep from the root along incoming
/// edges, so the whole table costs O(N + E).
pub fn depths_from_root(view: &GraphView, root: usize) -> Vec<u32> {
    let mut depths = vec![UNREACHABLE; view.node_count];
    if root >= view.node_count {
        return depths;
    }

    let mut queue = VecDeque::new();
    depths[root] = 0;
    queue.push_back(root);

    while let Some(current) = queue.pop_front() {
        let next = depths[current] + 1;
        for &child in view.predecessors(current) {
            if depths[child] == UNREACHABLE {
                depths[child] = next;
                queue.push_back(child);
            }
        }
    }

    depths
}

/// Deepest finite depth
pub fn max_depth(depths: &[u32]) -> u32 {
    depths
        .iter()
        .copied()
        .filter(|&d| d != UNREACHABLE)
        .max()
        .unwrap_or(0)
}

/// Indices of nodes that cannot reach the root
pub fn unrooted_nodes(depths: &[u32]) -> Vec<usize> {
    depths
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == UNREACHABLE)
        .map(|(idx, _)| idx)
        .collect()
}

/// Number of distinct nodes reachable from `idx` along incoming edges
/// (the node itself excluded)
pub fn descendant_count(view: &GraphView, idx: usize) -> usize {
    let mut visited = vec![false; view.node_count];
    let mut queue = VecDeque::new();
    let mut count = 0;

    visited[idx] = true;
    queue.push_back(idx);

    while let Some(current) = queue.pop_front() {
        for &child in view.predecessors(current) {
            if !visited[child] {
                visited[child] = true;
                count += 1;
                queue.push_back(child);
            }
        }
    }

    count
}

/// Descendant counts for a batch of nodes, computed in parallel
pub fn descendant_counts(view: &GraphView, indices: &[usize]) -> Vec<usize> {
    indices
        .par_iter()
        .map(|&idx| descendant_count(view, idx))
        .collect()
}
