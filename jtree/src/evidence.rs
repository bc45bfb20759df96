//! Hard evidence: observed values of some keys.
//!
//! An observation is entered as an indicator likelihood vector (1 at the observed value, 0
//! elsewhere) multiplied into the first clique containing the key. Potentials keep their full
//! shape, the shrink mappings give the index that restricts each clique to the observed values.

use indexmap::IndexMap;
use ndarray::{Array1, ArrayViewD, Axis};
use serde::{Deserialize, Serialize};

use super::junction_tree::JunctionTree;
use super::potentials::PotentialTable;
use super::tensor::multiply_into;
use super::{CliqueId, JtError, Key, Result};

/// Observed value of each observed key.
pub type Evidence = IndexMap<Key, usize>;

/// Restriction of a clique potential to the observed values of its keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShrinkMapping {
    index: Vec<Option<usize>>,
    keys: Vec<Key>,
}

impl ShrinkMapping {
    fn new(keys: &[Key]) -> Self {
        Self {
            index: vec![None; keys.len()],
            keys: keys.to_vec(),
        }
    }
    /// For each axis of the clique, the observed value of its key (`None` if unobserved).
    pub fn index(&self) -> &[Option<usize>] {
        &self.index
    }
    /// Keys of the axes left after shrinking.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }
    /// View of `potential` with the observed axes fixed at their value.
    pub fn apply<'a>(&self, potential: ArrayViewD<'a, f64>) -> ArrayViewD<'a, f64> {
        assert_eq!(potential.ndim(), self.index.len());
        let mut res = potential;
        for (ax, value) in self.index.iter().enumerate().rev() {
            if let Some(value) = value {
                res = res.index_axis_move(Axis(ax), *value);
            }
        }
        res
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    likelihoods: IndexMap<Key, Array1<f64>>,
    shrink: Vec<ShrinkMapping>,
}

impl Observation {
    /// Likelihood vector of every key of the tree: an indicator for observed keys, all ones for
    /// the others.
    pub fn likelihoods(&self) -> &IndexMap<Key, Array1<f64>> {
        &self.likelihoods
    }
    pub fn likelihood(&self, key: Key) -> Option<&Array1<f64>> {
        self.likelihoods.get(&key)
    }
    /// Shrink mappings, by clique id.
    pub fn shrink_mappings(&self) -> &[ShrinkMapping] {
        &self.shrink
    }
    pub fn shrink_mapping(&self, clique: CliqueId) -> Option<&ShrinkMapping> {
        self.shrink.get(clique)
    }
}

impl JunctionTree {
    /// Check that every observed key is known and that its value is in its domain.
    pub fn check_evidence(&self, evidence: &Evidence) -> Result<()> {
        for (key, value) in evidence.iter() {
            let size = self.size(*key).ok_or(JtError::UnknownKey(*key))?;
            if *value >= size {
                return Err(JtError::ObservedValueOutOfRange {
                    key: *key,
                    value: *value,
                    size,
                });
            }
        }
        Ok(())
    }

    /// Enter `evidence` into `potentials`.
    ///
    /// Nothing is modified if the evidence or the potentials are invalid.
    pub fn observe(&self, potentials: &mut PotentialTable, evidence: &Evidence) -> Result<Observation> {
        self.check_potentials(potentials)?;
        self.check_evidence(evidence)?;
        let mut likelihoods: IndexMap<Key, Array1<f64>> = self
            .key_sizes()
            .iter()
            .map(|(k, size)| (*k, Array1::ones(*size)))
            .collect();
        let mut shrink: Vec<ShrinkMapping> = (0..self.n_cliques())
            .map(|c| ShrinkMapping::new(self.clique_keys(c)))
            .collect();
        for (key, value) in evidence.iter() {
            let ll = &mut likelihoods[key];
            ll.fill(0.0);
            ll[*value] = 1.0;
            let cliques = self.key_cliques(*key).unwrap_or(&[]);
            if let Some(first) = cliques.first() {
                multiply_into(
                    potentials.get_mut(*first),
                    self.clique_keys(*first),
                    ll.view().into_dyn(),
                    &[*key],
                );
            }
            for c in cliques {
                if let Some(pos) = self.key_position(*c, *key) {
                    shrink[*c].index[pos] = Some(*value);
                    shrink[*c].keys.retain(|k| k != key);
                }
            }
        }
        log::debug!("observed {} keys", evidence.len());
        Ok(Observation { likelihoods, shrink })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FactorGraph;
    use ndarray::{array, ArrayD, IxDyn};

    #[test]
    fn shrink_fixes_observed_axes() {
        let t = ndarray::Array3::from_shape_fn((2, 3, 4), |(i, j, k)| (100 * i + 10 * j + k) as f64)
            .into_dyn();
        let m = ShrinkMapping {
            index: vec![Some(1), None, Some(2)],
            keys: vec![5],
        };
        assert_eq!(m.apply(t.view()), array![102.0, 112.0, 122.0].into_dyn());
    }

    #[test]
    fn indicator_enters_first_clique() {
        let fg = FactorGraph::from_parts(
            [(0, 2), (1, 3), (2, 2)],
            [
                (vec![0, 1], ArrayD::ones(IxDyn(&[2, 3]))),
                (vec![1, 2], ArrayD::ones(IxDyn(&[3, 2]))),
            ],
        )
        .unwrap();
        let (jt, mut phi) = JunctionTree::from_factor_graph(&fg).unwrap();
        let before = phi.clone();
        let evidence: Evidence = [(1, 2)].into_iter().collect();
        let obs = jt.observe(&mut phi, &evidence).unwrap();
        assert_eq!(obs.likelihood(1).unwrap(), &array![0.0, 0.0, 1.0]);
        assert_eq!(obs.likelihood(0).unwrap(), &array![1.0, 1.0]);
        let first = jt.key_cliques(1).unwrap()[0];
        assert_eq!(phi[first].sum(), 2.0);
        for c in jt.key_cliques(1).unwrap().iter().skip(1) {
            assert_eq!(phi[*c], before[*c]);
        }
        assert!(obs.shrink_mapping(jt.n_cliques()).is_none());
        for c in jt.key_cliques(1).unwrap() {
            let m = obs.shrink_mapping(*c).unwrap();
            assert!(!m.keys().contains(&1));
            assert_eq!(m.apply(phi[*c].view()).ndim(), 1);
        }
    }

    #[test]
    fn invalid_evidence_leaves_potentials_untouched() {
        let fg = FactorGraph::from_parts([(0, 2)], [(vec![0], array![0.3, 0.7].into_dyn())]).unwrap();
        let (jt, mut phi) = JunctionTree::from_factor_graph(&fg).unwrap();
        let before = phi.clone();
        let evidence: Evidence = [(0, 1), (4, 0)].into_iter().collect();
        assert_eq!(jt.observe(&mut phi, &evidence), Err(JtError::UnknownKey(4)));
        let evidence: Evidence = [(0, 2)].into_iter().collect();
        assert_eq!(
            jt.observe(&mut phi, &evidence),
            Err(JtError::ObservedValueOutOfRange {
                key: 0,
                value: 2,
                size: 2
            })
        );
        assert_eq!(phi, before);
    }
}
