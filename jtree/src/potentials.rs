//! Potential tables: one tensor per clique and per separator of a junction tree.

use std::ops::Index;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use super::factor_graph::{check_factor, Factor, FactorGraph};
use super::junction_tree::JunctionTree;
use super::tensor::{multiply_into, ones};
use super::{JtError, NodeId, Result};

/// Tensors of a junction tree, indexed by node id. The tensor of a node is over the keys of that
/// node ([`JunctionTree::node_keys`]), in the same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PotentialTable {
    tables: Vec<ArrayD<f64>>,
}

impl PotentialTable {
    pub fn new(tables: Vec<ArrayD<f64>>) -> Self {
        Self { tables }
    }
    pub fn len(&self) -> usize {
        self.tables.len()
    }
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
    pub fn get(&self, node: NodeId) -> Option<&ArrayD<f64>> {
        self.tables.get(node)
    }
    pub fn iter(&self) -> impl Iterator<Item = &ArrayD<f64>> {
        self.tables.iter()
    }
    pub fn into_inner(self) -> Vec<ArrayD<f64>> {
        self.tables
    }
    pub(crate) fn get_mut(&mut self, node: NodeId) -> &mut ArrayD<f64> {
        &mut self.tables[node]
    }
    pub(crate) fn take(&mut self) -> Vec<ArrayD<f64>> {
        std::mem::take(&mut self.tables)
    }
}

impl Index<NodeId> for PotentialTable {
    type Output = ArrayD<f64>;
    fn index(&self, node: NodeId) -> &Self::Output {
        &self.tables[node]
    }
}

impl From<Vec<ArrayD<f64>>> for PotentialTable {
    fn from(tables: Vec<ArrayD<f64>>) -> Self {
        Self::new(tables)
    }
}

impl JunctionTree {
    /// Build the junction tree of `fg` and the initial potentials of its factors.
    pub fn from_factor_graph(fg: &FactorGraph) -> Result<(Self, PotentialTable)> {
        let jt = Self::build(fg)?;
        let potentials = jt.init_potentials(fg.factors())?;
        Ok((jt, potentials))
    }

    /// Initial potentials: all-ones tensors, where each factor is multiplied into the first
    /// clique (in clique id order) containing all its keys.
    ///
    /// `factors` may be any set of factors over keys of this tree, as long as each one fits in a
    /// clique: in particular, the factors the tree was built from with different values.
    pub fn init_potentials(&self, factors: &[Factor]) -> Result<PotentialTable> {
        let mut potentials = PotentialTable::new(
            (0..self.n_nodes())
                .map(|node| ones(self.node_keys(node), |k| self.key_sizes()[&k]))
                .collect(),
        );
        for factor in factors {
            check_factor(self.key_sizes(), factor)?;
            let clique = (0..self.n_cliques())
                .find(|c| {
                    let keys = self.clique_keys(*c);
                    factor.keys().iter().all(|k| keys.contains(k))
                })
                .ok_or_else(|| JtError::NoContainingClique(factor.keys().to_vec()))?;
            log::trace!("factor {:?} assigned to clique {}", factor.keys(), clique);
            multiply_into(
                potentials.get_mut(clique),
                self.clique_keys(clique),
                factor.values().view(),
                factor.keys(),
            );
        }
        Ok(potentials)
    }

    /// Check that `potentials` has one tensor of the right shape per node of this tree.
    pub fn check_potentials(&self, potentials: &PotentialTable) -> Result<()> {
        if potentials.len() != self.n_nodes() {
            return Err(JtError::Uninitialized);
        }
        for (node, table) in potentials.iter().enumerate() {
            let expected = self.node_shape(node);
            if table.shape() != expected.as_slice() {
                return Err(JtError::PotentialShape {
                    node,
                    expected,
                    got: table.shape().to_vec(),
                });
            }
        }
        Ok(())
    }
}
