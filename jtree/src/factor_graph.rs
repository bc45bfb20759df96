//! Factor graph description: keys with their domain sizes, and factors over subsets of keys.
//!
//! A factor graph is only an input: its structure (keys, sizes, and the key list of each factor)
//! is compiled into a junction tree, and its values are embedded into clique potentials.

use indexmap::IndexMap;
use ndarray::ArrayD;
use thiserror::Error;

use super::{Key, VarId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphBuildError {
    #[error("Key {0} declared multiple times.")]
    MultipleKeyDecl(Key),
    #[error("Key {0} has domain size 0.")]
    EmptyDomain(Key),
    #[error("Unknown key {0}.")]
    UnknownKey(Key),
    #[error("Key {0} appears more than once in a factor.")]
    RepeatedKey(Key),
    #[error("Factor over keys {keys:?} has rank {rank}.")]
    FactorRank { keys: Vec<Key>, rank: usize },
    #[error("Factor over keys {keys:?} has shape {got:?}, expected {expected:?}.")]
    FactorShape {
        keys: Vec<Key>,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
}

type Result<T> = std::result::Result<T, GraphBuildError>;

/// A tensor over an ordered list of keys. Axis `i` of `values` corresponds to `keys[i]`.
#[derive(Debug, Clone)]
pub struct Factor {
    keys: Vec<Key>,
    values: ArrayD<f64>,
}

impl Factor {
    /// Only checks that the rank of `values` matches `keys`, domain sizes are checked when the
    /// factor is added to a graph.
    pub fn new(keys: Vec<Key>, values: ArrayD<f64>) -> Result<Self> {
        if values.ndim() != keys.len() {
            return Err(GraphBuildError::FactorRank {
                rank: values.ndim(),
                keys,
            });
        }
        for (i, k) in keys.iter().enumerate() {
            if keys[..i].contains(k) {
                return Err(GraphBuildError::RepeatedKey(*k));
            }
        }
        Ok(Self { keys, values })
    }
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }
    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }
}

#[derive(Debug, Clone, Default)]
pub struct FactorGraph {
    sizes: IndexMap<Key, usize>,
    factors: Vec<Factor>,
}

impl FactorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from all its parts at once.
    pub fn from_parts(
        sizes: impl IntoIterator<Item = (Key, usize)>,
        factors: impl IntoIterator<Item = (Vec<Key>, ArrayD<f64>)>,
    ) -> Result<Self> {
        let mut fg = Self::new();
        for (key, size) in sizes {
            fg.add_key(key, size)?;
        }
        for (keys, values) in factors {
            fg.add_factor(keys, values)?;
        }
        Ok(fg)
    }

    pub fn add_key(&mut self, key: Key, size: usize) -> Result<()> {
        if size == 0 {
            return Err(GraphBuildError::EmptyDomain(key));
        }
        if self.sizes.contains_key(&key) {
            return Err(GraphBuildError::MultipleKeyDecl(key));
        }
        // Dense ids follow the sorted key order.
        self.sizes.insert_sorted(key, size);
        Ok(())
    }

    pub fn add_factor(&mut self, keys: Vec<Key>, values: ArrayD<f64>) -> Result<()> {
        let factor = Factor::new(keys, values)?;
        self.check_factor(&factor)?;
        self.factors.push(factor);
        Ok(())
    }

    /// Check that a factor only refers to declared keys and that its shape matches their sizes.
    pub fn check_factor(&self, factor: &Factor) -> Result<()> {
        check_factor(&self.sizes, factor)
    }

    pub fn sizes(&self) -> &IndexMap<Key, usize> {
        &self.sizes
    }
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }
    pub fn size(&self, key: Key) -> Option<usize> {
        self.sizes.get(&key).copied()
    }
    pub fn var_id(&self, key: Key) -> Result<VarId> {
        self.sizes
            .get_index_of(&key)
            .ok_or(GraphBuildError::UnknownKey(key))
    }
    /// Key lists of the factors, as dense ids.
    pub fn factor_var_ids(&self) -> Result<Vec<Vec<VarId>>> {
        self.factors
            .iter()
            .map(|f| f.keys.iter().map(|k| self.var_id(*k)).collect())
            .collect()
    }
}

pub(crate) fn check_factor(sizes: &IndexMap<Key, usize>, factor: &Factor) -> Result<()> {
    let expected = factor
        .keys
        .iter()
        .map(|k| sizes.get(k).copied().ok_or(GraphBuildError::UnknownKey(*k)))
        .collect::<Result<Vec<_>>>()?;
    if expected.as_slice() != factor.values.shape() {
        return Err(GraphBuildError::FactorShape {
            keys: factor.keys.clone(),
            expected,
            got: factor.values.shape().to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use ndarray::{array, ArrayD, IxDyn};

    #[test]
    fn rejects_invalid_input() {
        let mut fg = FactorGraph::new();
        fg.add_key(3, 2).unwrap();
        fg.add_key(1, 3).unwrap();
        assert_eq!(fg.add_key(3, 4), Err(GraphBuildError::MultipleKeyDecl(3)));
        assert_eq!(fg.add_key(7, 0), Err(GraphBuildError::EmptyDomain(7)));
        assert_eq!(
            fg.add_factor(vec![3, 5], ArrayD::ones(IxDyn(&[2, 2]))),
            Err(GraphBuildError::UnknownKey(5))
        );
        assert_eq!(
            fg.add_factor(vec![3, 3], ArrayD::ones(IxDyn(&[2, 2]))),
            Err(GraphBuildError::RepeatedKey(3))
        );
        assert!(matches!(
            fg.add_factor(vec![3, 1], array![[1.0, 2.0], [3.0, 4.0]].into_dyn()),
            Err(GraphBuildError::FactorShape { .. })
        ));
        assert_eq!(
            fg.add_factor(vec![3], array![[1.0, 2.0], [3.0, 4.0]].into_dyn()),
            Err(GraphBuildError::FactorRank {
                keys: vec![3],
                rank: 2
            })
        );
        assert!(fg.factors().is_empty());
    }

    #[test]
    fn dense_ids_follow_key_order() {
        let fg = FactorGraph::from_parts(
            [(9, 2), (4, 3), (6, 2)],
            [(vec![9, 4], ArrayD::ones(IxDyn(&[2, 3])))],
        )
        .unwrap();
        assert_eq!(fg.var_id(4), Ok(0));
        assert_eq!(fg.var_id(6), Ok(1));
        assert_eq!(fg.var_id(9), Ok(2));
        assert_eq!(fg.factor_var_ids().unwrap(), vec![vec![2, 0]]);
    }

    #[test]
    fn keys_stay_sorted_as_declared() {
        let mut fg = FactorGraph::new();
        for i in 0..200u64 {
            let key = (i * 37) % 200;
            fg.add_key(key as Key, 2 + (key as usize % 3)).unwrap();
        }
        assert!(fg.sizes().keys().tuple_windows().all(|(a, b)| a < b));
        assert_eq!(fg.var_id(0), Ok(0));
        assert_eq!(fg.var_id(199), Ok(199));
        assert_eq!(fg.size(5), Some(4));
        assert_eq!(fg.add_key(37, 2), Err(GraphBuildError::MultipleKeyDecl(37)));
        assert_eq!(fg.sizes().len(), 200);
    }
}
