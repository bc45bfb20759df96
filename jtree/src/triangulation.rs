//! Min-fill triangulation of the interaction graph.
//!
//! Keys are eliminated one at a time. The next key is the one whose elimination adds the fewest
//! fill-in edges, ties being broken by the size of the tensor the elimination would produce
//! (product of the domain sizes of the key and of its remaining neighbors). Eliminating a key
//! connects all its remaining neighbors, which chordalizes the graph, and yields an induced
//! cluster: the key followed by its remaining neighbors.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use itertools::Itertools;

use super::graph::InteractionGraph;
use super::VarId;

/// Elimination score, compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score {
    pub fill_in: usize,
    pub weight: u64,
}

#[derive(Debug, Clone)]
pub struct Triangulation {
    /// Elimination order.
    pub order: Vec<VarId>,
    /// Fill-in edges, in the order they were added.
    pub fill_edges: Vec<(VarId, VarId)>,
    /// One induced cluster per eliminated key, in elimination order.
    pub clusters: Vec<Vec<VarId>>,
    /// Interaction graph with all fill-in edges added.
    pub chordal_graph: InteractionGraph,
}

impl Triangulation {
    /// Size of the largest induced cluster minus one.
    pub fn induced_width(&self) -> usize {
        self.clusters
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .saturating_sub(1)
    }
}

/// Remaining keys with their current score.
///
/// Scores are never updated in place: a re-scored key gets a new heap entry with a fresh
/// version, and entries whose version is outdated (or whose key is already eliminated) are
/// dropped when they reach the top of the heap.
struct EliminationQueue {
    heap: BinaryHeap<Reverse<(Score, VarId, u32)>>,
    version: Vec<u32>,
    eliminated: Vec<bool>,
}

impl EliminationQueue {
    fn new(n_vars: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(n_vars),
            version: vec![0; n_vars],
            eliminated: vec![false; n_vars],
        }
    }
    fn push(&mut self, var: VarId, score: Score) {
        self.version[var] += 1;
        self.heap.push(Reverse((score, var, self.version[var])));
    }
    fn pop(&mut self) -> Option<(VarId, Score)> {
        while let Some(Reverse((score, var, version))) = self.heap.pop() {
            if !self.eliminated[var] && version == self.version[var] {
                self.eliminated[var] = true;
                return Some((var, score));
            }
        }
        None
    }
    fn remaining_neighbors(&self, graph: &InteractionGraph, var: VarId) -> Vec<VarId> {
        graph
            .neighbors(var)
            .iter()
            .filter(|n| !self.eliminated[**n])
            .cloned()
            .collect()
    }
}

fn score(graph: &InteractionGraph, sizes: &[usize], var: VarId, neighbors: &[VarId]) -> Score {
    let fill_in = neighbors
        .iter()
        .tuple_combinations()
        .filter(|(a, b)| !graph.has_edge(**a, **b))
        .count();
    let weight = neighbors
        .iter()
        .fold(sizes[var] as u64, |w, n| w.saturating_mul(sizes[*n] as u64));
    Score { fill_in, weight }
}

/// Triangulate `graph`, where `sizes[v]` is the domain size of vertex `v`.
///
/// Always runs exactly `graph.n_vars()` elimination steps.
pub fn triangulate(graph: &InteractionGraph, sizes: &[usize]) -> Triangulation {
    assert_eq!(graph.n_vars(), sizes.len());
    let n_vars = graph.n_vars();
    let mut chordal_graph = graph.clone();
    let mut queue = EliminationQueue::new(n_vars);
    for var in 0..n_vars {
        let neighbors = queue.remaining_neighbors(&chordal_graph, var);
        let s = score(&chordal_graph, sizes, var, &neighbors);
        queue.push(var, s);
    }
    let mut order = Vec::with_capacity(n_vars);
    let mut fill_edges = Vec::new();
    let mut clusters = Vec::with_capacity(n_vars);
    while let Some((var, s)) = queue.pop() {
        let neighbors = queue.remaining_neighbors(&chordal_graph, var);
        for (a, b) in neighbors.iter().tuple_combinations() {
            if chordal_graph.add_edge(*a, *b) {
                fill_edges.push((*a, *b));
            }
        }
        log::trace!(
            "eliminate {} (fill-in {}, weight {}), {} remaining neighbors",
            var,
            s.fill_in,
            s.weight,
            neighbors.len()
        );
        // Only the neighbors of var have a changed neighborhood.
        for n in neighbors.iter() {
            let n_neighbors = queue.remaining_neighbors(&chordal_graph, *n);
            let s = score(&chordal_graph, sizes, *n, &n_neighbors);
            queue.push(*n, s);
        }
        order.push(var);
        clusters.push(std::iter::once(var).chain(neighbors).collect());
    }
    assert_eq!(order.len(), n_vars);
    log::debug!(
        "triangulation of {} keys: {} fill-in edges",
        n_vars,
        fill_edges.len()
    );
    Triangulation {
        order,
        fill_edges,
        clusters,
        chordal_graph,
    }
}
