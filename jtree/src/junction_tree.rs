//! Junction tree (forest) construction and structure.
//!
//! Cliques are connected by a Kruskal-style maximum-weight spanning forest over the
//! clique-intersection graph: candidate separators are the pairs of cliques sharing keys,
//! preferring larger intersections and then smaller combined clique weight. Each tree of the
//! forest is stored as an arena of clique nodes, every clique referring to the separator towards
//! its parent and to the separators towards its children.
//!
//! Node ids: cliques are `0..n_cliques`, separators are `n_cliques..n_cliques+n_separators`.
//! They index the potential table.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::cliques::maximal_clusters;
use super::factor_graph::{FactorGraph, GraphBuildError};
use super::graph::InteractionGraph;
use super::triangulation::triangulate;
use super::{CliqueId, Key, NodeId, Result, VarId};

/// Set of keys shared by two adjacent cliques.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separator {
    id: NodeId,
    keys: Vec<Key>,
    parent: CliqueId,
    child: CliqueId,
}

impl Separator {
    /// Node id in the potential table.
    pub fn id(&self) -> NodeId {
        self.id
    }
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }
    pub fn parent(&self) -> CliqueId {
        self.parent
    }
    pub fn child(&self) -> CliqueId {
        self.child
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CliqueNode {
    keys: Vec<Key>,
    // index in separators
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionTree {
    sizes: IndexMap<Key, usize>,
    cliques: Vec<CliqueNode>,
    separators: Vec<Separator>,
    roots: Vec<CliqueId>,
    key_cliques: IndexMap<Key, Vec<CliqueId>>,
    clique_tree: Vec<usize>,
}

/// Mutable forest used during construction.
struct ForestBuilder {
    cliques: Vec<CliqueNode>,
    separators: Vec<Separator>,
    // union-find over cliques, for tree membership
    tree_of: Vec<usize>,
}

impl ForestBuilder {
    fn new(clique_keys: Vec<Vec<Key>>) -> Self {
        let n = clique_keys.len();
        Self {
            cliques: clique_keys
                .into_iter()
                .map(|keys| CliqueNode {
                    keys,
                    parent: None,
                    children: Vec::new(),
                })
                .collect(),
            separators: Vec::new(),
            tree_of: (0..n).collect(),
        }
    }

    fn find(&mut self, clique: CliqueId) -> usize {
        let mut root = clique;
        while self.tree_of[root] != root {
            root = self.tree_of[root];
        }
        let mut c = clique;
        while self.tree_of[c] != root {
            let next = self.tree_of[c];
            self.tree_of[c] = root;
            c = next;
        }
        root
    }

    /// Make `new_root` the root of its tree by reversing the separators on the path from the
    /// current root to `new_root`. Other subtrees are not modified.
    fn change_root(&mut self, new_root: CliqueId) {
        let mut node = new_root;
        let mut new_parent = None;
        loop {
            let old_parent = std::mem::replace(&mut self.cliques[node].parent, new_parent);
            let Some(sep) = old_parent else {
                break;
            };
            let up = self.separators[sep].parent;
            self.cliques[up].children.retain(|s| *s != sep);
            self.cliques[node].children.push(sep);
            self.separators[sep].parent = node;
            self.separators[sep].child = up;
            new_parent = Some(sep);
            node = up;
        }
    }

    /// Attach the tree rooted at `child` below `parent` with a new separator over `keys`.
    fn attach(&mut self, parent: CliqueId, child: CliqueId, keys: Vec<Key>) {
        assert!(self.cliques[child].parent.is_none());
        let sep = self.separators.len();
        self.separators.push(Separator {
            id: self.cliques.len() + sep,
            keys,
            parent,
            child,
        });
        self.cliques[parent].children.push(sep);
        self.cliques[child].parent = Some(sep);
        let (a, b) = (self.find(parent), self.find(child));
        self.tree_of[b] = a;
    }
}

fn weight(keys: &[Key], sizes: &IndexMap<Key, usize>) -> u64 {
    keys.iter()
        .fold(1u64, |w, k| w.saturating_mul(sizes[k] as u64))
}

impl JunctionTree {
    /// Compile the structure of a factor graph. Factor values are not used.
    pub fn build(fg: &FactorGraph) -> Result<Self> {
        let factors: Vec<Vec<Key>> = fg.factors().iter().map(|f| f.keys().to_vec()).collect();
        Self::from_structure(fg.sizes().clone(), &factors)
    }

    /// Compile a junction tree from the domain size of every key and the key list of every
    /// factor.
    pub fn from_structure(mut sizes: IndexMap<Key, usize>, factors: &[Vec<Key>]) -> Result<Self> {
        for (key, size) in sizes.iter() {
            if *size == 0 {
                return Err(GraphBuildError::EmptyDomain(*key).into());
            }
        }
        sizes.sort_keys();
        let factor_vars = factors
            .iter()
            .map(|f| {
                f.iter()
                    .map(|k| sizes.get_index_of(k).ok_or(GraphBuildError::UnknownKey(*k)))
                    .collect::<std::result::Result<Vec<VarId>, _>>()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let graph = InteractionGraph::from_factors(sizes.len(), factor_vars.iter().map(Vec::as_slice));
        let var_sizes: Vec<usize> = sizes.values().cloned().collect();
        let triangulation = triangulate(&graph, &var_sizes);
        let keys: Vec<Key> = sizes.keys().cloned().collect();
        let clique_keys: Vec<Vec<Key>> = maximal_clusters(&triangulation.clusters)
            .into_iter()
            .map(|c| c.into_iter().map(|v| keys[v]).collect())
            .collect();
        Ok(Self::from_cliques(sizes, clique_keys))
    }

    /// Connect cliques into a junction forest.
    fn from_cliques(sizes: IndexMap<Key, usize>, clique_keys: Vec<Vec<Key>>) -> Self {
        let n_cliques = clique_keys.len();
        // Min-heap over (1/|X ∩ Y|, weight(X) + weight(Y)).
        let mut candidates = BinaryHeap::new();
        for ((x, kx), (y, ky)) in clique_keys.iter().enumerate().tuple_combinations() {
            let n_common = kx.iter().filter(|k| ky.contains(k)).count();
            if n_common != 0 {
                let w = weight(kx, &sizes).saturating_add(weight(ky, &sizes));
                candidates.push(Reverse((Reverse(n_common), w, x, y)));
            }
        }
        let mut forest = ForestBuilder::new(clique_keys);
        while let Some(Reverse((_, _, x, y))) = candidates.pop() {
            if forest.separators.len() + 1 >= n_cliques {
                break;
            }
            if forest.find(x) == forest.find(y) {
                continue;
            }
            let keys: Vec<Key> = forest.cliques[x]
                .keys
                .iter()
                .filter(|k| forest.cliques[y].keys.contains(k))
                .cloned()
                .collect();
            log::trace!("separator {:?} between cliques {} and {}", keys, x, y);
            forest.change_root(y);
            forest.attach(x, y, keys);
        }
        let ForestBuilder {
            cliques,
            separators,
            ..
        } = forest;
        let roots: Vec<CliqueId> = cliques
            .iter()
            .positions(|c| c.parent.is_none())
            .collect();
        let mut key_cliques: IndexMap<Key, Vec<CliqueId>> =
            sizes.keys().map(|k| (*k, Vec::new())).collect();
        for (id, clique) in cliques.iter().enumerate() {
            for k in clique.keys.iter() {
                key_cliques[k].push(id);
            }
        }
        let mut jt = Self {
            sizes,
            cliques,
            separators,
            roots,
            key_cliques,
            clique_tree: vec![0; n_cliques],
        };
        for (t, root) in jt.roots.clone().into_iter().enumerate() {
            for c in jt.preorder(root) {
                jt.clique_tree[c] = t;
            }
        }
        log::debug!(
            "junction forest: {} cliques, {} separators, {} trees, treewidth {}",
            jt.n_cliques(),
            jt.n_separators(),
            jt.n_trees(),
            jt.treewidth()
        );
        jt
    }

    pub fn key_sizes(&self) -> &IndexMap<Key, usize> {
        &self.sizes
    }
    pub fn size(&self, key: Key) -> Option<usize> {
        self.sizes.get(&key).copied()
    }
    /// Dense index of a key (its rank in the sorted key list).
    pub fn find_key(&self, key: Key) -> Option<VarId> {
        self.sizes.get_index_of(&key)
    }
    pub fn n_cliques(&self) -> usize {
        self.cliques.len()
    }
    pub fn n_separators(&self) -> usize {
        self.separators.len()
    }
    /// Number of potential tables: one per clique and one per separator.
    pub fn n_nodes(&self) -> usize {
        self.n_cliques() + self.n_separators()
    }
    pub fn n_trees(&self) -> usize {
        self.roots.len()
    }
    pub fn roots(&self) -> &[CliqueId] {
        &self.roots
    }
    pub fn clique_keys(&self, clique: CliqueId) -> &[Key] {
        &self.cliques[clique].keys
    }
    pub fn separators(&self) -> &[Separator] {
        &self.separators
    }
    /// Keys of a clique or of a separator.
    pub fn node_keys(&self, node: NodeId) -> &[Key] {
        if node < self.n_cliques() {
            &self.cliques[node].keys
        } else {
            &self.separators[node - self.n_cliques()].keys
        }
    }
    /// Shape of the potential of a node.
    pub fn node_shape(&self, node: NodeId) -> Vec<usize> {
        self.node_keys(node).iter().map(|k| self.sizes[k]).collect()
    }
    /// Axis of `key` in the potential of `clique`.
    /// `None` if `clique` does not exist or does not contain `key`.
    pub fn key_position(&self, clique: CliqueId, key: Key) -> Option<usize> {
        self.cliques.get(clique)?.keys.iter().position(|k| *k == key)
    }
    /// Cliques containing `key`, in clique id order.
    pub fn key_cliques(&self, key: Key) -> Option<&[CliqueId]> {
        self.key_cliques.get(&key).map(Vec::as_slice)
    }
    /// Index (in `roots()`) of the tree containing `clique`.
    pub fn clique_tree(&self, clique: CliqueId) -> usize {
        self.clique_tree[clique]
    }
    /// Cliques of a tree, in depth-first order.
    pub fn tree_cliques(&self, tree: usize) -> Vec<CliqueId> {
        self.preorder(self.roots[tree])
    }
    /// Separator towards the parent of `clique`, `None` for roots.
    pub fn parent(&self, clique: CliqueId) -> Option<&Separator> {
        self.cliques[clique].parent.map(|s| &self.separators[s])
    }
    /// Separators towards the children of `clique`.
    pub fn children(&self, clique: CliqueId) -> impl Iterator<Item = &Separator> + '_ {
        self.cliques[clique]
            .children
            .iter()
            .map(move |s| &self.separators[*s])
    }
    pub fn tree(&self, tree: usize) -> TreeView<'_> {
        TreeView {
            jt: self,
            clique: self.roots[tree],
        }
    }
    pub fn trees(&self) -> impl Iterator<Item = TreeView<'_>> + '_ {
        (0..self.n_trees()).map(move |t| self.tree(t))
    }

    /// Depth-first (pre-order) traversal of the subtree rooted at `clique`.
    pub fn preorder(&self, clique: CliqueId) -> Vec<CliqueId> {
        let mut res = Vec::new();
        let mut stack = vec![clique];
        while let Some(c) = stack.pop() {
            res.push(c);
            stack.extend(
                self.cliques[c]
                    .children
                    .iter()
                    .rev()
                    .map(|s| self.separators[*s].child),
            );
        }
        res
    }

    /// Breadth-first traversal of the subtree rooted at `clique`.
    pub fn breadth_first(&self, clique: CliqueId) -> Vec<CliqueId> {
        let mut res = Vec::new();
        let mut queue = VecDeque::from([clique]);
        while let Some(c) = queue.pop_front() {
            res.push(c);
            queue.extend(self.children(c).map(Separator::child));
        }
        res
    }

    /// Size of the largest clique minus one.
    pub fn treewidth(&self) -> usize {
        self.cliques
            .iter()
            .map(|c| c.keys.len())
            .max()
            .unwrap_or(0)
            .saturating_sub(1)
    }

    /// Check that, for every key, the cliques containing it form a connected subtree.
    ///
    /// In a forest, a set of `n` nodes is connected iff `n - 1` edges join two of its nodes.
    pub fn verify_running_intersection(&self) -> bool {
        self.key_cliques.values().all(|cliques| {
            let n_edges = self
                .separators
                .iter()
                .filter(|s| cliques.contains(&s.parent) && cliques.contains(&s.child))
                .count();
            cliques.len() <= 1 || n_edges == cliques.len() - 1
        })
    }

    /// Check that every separator is the intersection of its two cliques.
    pub fn verify_separators(&self) -> bool {
        self.separators.iter().all(|s| {
            let parent = &self.cliques[s.parent].keys;
            let child = &self.cliques[s.child].keys;
            s.keys.iter().all(|k| parent.contains(k) && child.contains(k))
                && parent.iter().filter(|k| child.contains(k)).count() == s.keys.len()
        })
    }
}

/// Borrowed view of a (sub)tree: a clique and the separators towards its children.
///
/// Its `Debug` output is the nested `(clique_id, keys, [(separator_id, separator_keys, child),
/// ...])` representation.
#[derive(Clone, Copy)]
pub struct TreeView<'a> {
    jt: &'a JunctionTree,
    clique: CliqueId,
}

impl<'a> TreeView<'a> {
    pub fn id(&self) -> CliqueId {
        self.clique
    }
    pub fn keys(&self) -> &'a [Key] {
        self.jt.clique_keys(self.clique)
    }
    pub fn children(&self) -> impl Iterator<Item = (&'a Separator, TreeView<'a>)> + 'a {
        let jt = self.jt;
        jt.children(self.clique).map(move |s| {
            (
                s,
                TreeView {
                    jt,
                    clique: s.child,
                },
            )
        })
    }
}

impl fmt::Debug for TreeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Child<'a>(&'a Separator, TreeView<'a>);
        impl fmt::Debug for Child<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple("")
                    .field(&self.0.id)
                    .field(&self.0.keys)
                    .field(&self.1)
                    .finish()
            }
        }
        let children: Vec<Child> = self.children().map(|(s, t)| Child(s, t)).collect();
        f.debug_tuple("")
            .field(&self.clique)
            .field(&self.keys())
            .field(&children)
            .finish()
    }
}
