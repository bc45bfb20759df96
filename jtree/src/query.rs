//! Marginals from calibrated potentials.

use ndarray::Array1;

use super::junction_tree::JunctionTree;
use super::potentials::PotentialTable;
use super::tensor::project_sum;
use super::{CliqueId, JtError, Key, Result};

impl JunctionTree {
    /// Marginal of a single key, read from the first clique containing it.
    ///
    /// With `normalize`, the result is divided by its sum (a zero sum is left as is).
    /// `keys` must contain exactly one key.
    pub fn marginalize(
        &self,
        potentials: &PotentialTable,
        keys: &[Key],
        normalize: bool,
    ) -> Result<Array1<f64>> {
        let [key] = keys else {
            return Err(JtError::MultiKeyMarginal(keys.len()));
        };
        let clique = self
            .key_cliques(*key)
            .and_then(|c| c.first().copied())
            .ok_or(JtError::UnknownKey(*key))?;
        self.clique_marginal(potentials, clique, *key, normalize)
    }

    /// Marginal of `key` read from the potential of `clique`.
    ///
    /// On calibrated potentials, every clique containing `key` gives the same result.
    pub fn clique_marginal(
        &self,
        potentials: &PotentialTable,
        clique: CliqueId,
        key: Key,
        normalize: bool,
    ) -> Result<Array1<f64>> {
        self.check_potentials(potentials)?;
        if clique >= self.n_cliques() {
            return Err(JtError::UnknownClique(clique));
        }
        if self.key_position(clique, key).is_none() {
            return Err(JtError::KeyNotInClique { key, clique });
        }
        let projected = project_sum(potentials[clique].view(), self.clique_keys(clique), &[key]);
        let mut marginal = Array1::from_iter(projected.iter().cloned());
        if normalize {
            let z = marginal.sum();
            marginal /= if z == 0.0 { 1.0 } else { z };
        }
        Ok(marginal)
    }

    /// Sum of the potential of the root clique of each tree, in tree order.
    ///
    /// After sum-product propagation, this is the partition function of each connected
    /// component (the probability of the evidence, for normalized factors).
    pub fn normalization_constants(&self, potentials: &PotentialTable) -> Result<Vec<f64>> {
        self.check_potentials(potentials)?;
        Ok(self.roots().iter().map(|r| potentials[*r].sum()).collect())
    }
}
