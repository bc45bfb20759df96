//! Undirected interaction graph of a factor graph.
//!
//! Two keys are adjacent if they appear together in some factor. Vertices are dense key ids.

use indexmap::IndexSet;
use itertools::Itertools;

use super::VarId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionGraph {
    adjacency: Vec<IndexSet<VarId>>,
}

impl InteractionGraph {
    /// Graph with `n_vars` vertices and no edge.
    pub fn new(n_vars: usize) -> Self {
        Self {
            adjacency: vec![IndexSet::new(); n_vars],
        }
    }

    /// Connect every pair of keys co-occurring in a factor.
    ///
    /// Factors must only refer to vertices `< n_vars`.
    pub fn from_factors<'a>(n_vars: usize, factors: impl IntoIterator<Item = &'a [VarId]>) -> Self {
        let mut graph = Self::new(n_vars);
        for factor in factors {
            for (a, b) in factor.iter().tuple_combinations() {
                graph.add_edge(*a, *b);
            }
        }
        graph
    }

    /// Returns true if the edge was not already present.
    pub fn add_edge(&mut self, a: VarId, b: VarId) -> bool {
        if a == b {
            return false;
        }
        let new = self.adjacency[a].insert(b);
        self.adjacency[b].insert(a);
        new
    }

    pub fn has_edge(&self, a: VarId, b: VarId) -> bool {
        self.adjacency[a].contains(&b)
    }

    pub fn neighbors(&self, v: VarId) -> &IndexSet<VarId> {
        &self.adjacency[v]
    }

    pub fn n_vars(&self) -> usize {
        self.adjacency.len()
    }

    pub fn n_edges(&self) -> usize {
        self.adjacency.iter().map(IndexSet::len).sum::<usize>() / 2
    }

    pub fn edges(&self) -> impl Iterator<Item = (VarId, VarId)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(a, n)| n.iter().filter(move |b| a < **b).map(move |b| (a, *b)))
    }

    /// Connected components, each one listing its vertices in increasing order.
    pub fn components(&self) -> Vec<Vec<VarId>> {
        let mut component = vec![None; self.n_vars()];
        let mut res: Vec<Vec<VarId>> = Vec::new();
        for start in 0..self.n_vars() {
            if component[start].is_some() {
                continue;
            }
            let c = res.len();
            let mut vars = Vec::new();
            let mut visit_stack = vec![start];
            component[start] = Some(c);
            while let Some(v) = visit_stack.pop() {
                vars.push(v);
                for n in self.adjacency[v].iter() {
                    if component[*n].is_none() {
                        component[*n] = Some(c);
                        visit_stack.push(*n);
                    }
                }
            }
            vars.sort_unstable();
            res.push(vars);
        }
        res
    }

    /// Maximum cardinality search: an ordering of the vertices where each vertex is the one with
    /// the most already-numbered neighbors.
    pub fn max_cardinality_order(&self) -> Vec<VarId> {
        let n = self.n_vars();
        let mut cardinality = vec![0usize; n];
        let mut numbered = vec![false; n];
        let mut order = Vec::with_capacity(n);
        for _ in 0..n {
            // Ties are broken by the smallest vertex id.
            let Some(v) = (0..n)
                .filter(|v| !numbered[*v])
                .max_by_key(|v| (cardinality[*v], std::cmp::Reverse(*v)))
            else {
                break;
            };
            numbered[v] = true;
            order.push(v);
            for w in self.adjacency[v].iter() {
                if !numbered[*w] {
                    cardinality[*w] += 1;
                }
            }
        }
        order
    }

    /// Test chordality (no chordless cycle of length >= 4).
    ///
    /// The reverse of a maximum cardinality search order is a perfect elimination ordering
    /// iff the graph is chordal: for every vertex, its neighbors numbered before it must form a
    /// clique.
    pub fn is_chordal(&self) -> bool {
        let order = self.max_cardinality_order();
        let mut position = vec![0; self.n_vars()];
        for (i, v) in order.iter().enumerate() {
            position[*v] = i;
        }
        order.iter().enumerate().all(|(i, v)| {
            let earlier = self.adjacency[*v]
                .iter()
                .filter(|w| position[**w] < i)
                .collect::<Vec<_>>();
            earlier
                .iter()
                .tuple_combinations()
                .all(|(a, b)| self.has_edge(**a, **b))
        })
    }
}
