// Random factor graphs, and exact inference by enumeration of the joint distribution.
#![allow(dead_code)]

use jtree::tensor::{multiply_into, project_max, project_sum};
use jtree::{FactorGraph, Key};
use ndarray::{Array1, ArrayD, IxDyn};
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256StarStar;

/// Random factor graph with `n_keys` keys of domain size 2 or 3 (labels are not contiguous and
/// declared in random order) and `n_factors` factors over 1 to `max_arity` distinct keys.
pub fn gen_graph(seed: u64, n_keys: usize, n_factors: usize, max_arity: usize) -> FactorGraph {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let mut keys: Vec<Key> = (0..n_keys as Key).map(|i| 7 * i + 3).collect();
    keys.shuffle(&mut rng);
    let mut fg = FactorGraph::new();
    for k in keys.iter() {
        fg.add_key(*k, rng.gen_range(2..=3)).unwrap();
    }
    for _ in 0..n_factors {
        let arity = rng.gen_range(1..=max_arity);
        let fkeys: Vec<Key> = keys.choose_multiple(&mut rng, arity).cloned().collect();
        let shape: Vec<usize> = fkeys.iter().map(|k| fg.size(*k).unwrap()).collect();
        let values = ArrayD::random_using(IxDyn(&shape), Uniform::new(0.1, 1.0), &mut rng);
        fg.add_factor(fkeys, values).unwrap();
    }
    fg
}

/// Same structure as `fg`, with new random values.
pub fn regen_values(fg: &FactorGraph, seed: u64) -> FactorGraph {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    FactorGraph::from_parts(
        fg.sizes().iter().map(|(k, s)| (*k, *s)),
        fg.factors().iter().map(|f| {
            let values =
                ArrayD::random_using(f.values().raw_dim(), Uniform::new(0.1, 1.0), &mut rng);
            (f.keys().to_vec(), values)
        }),
    )
    .unwrap()
}

pub struct BruteForce {
    keys: Vec<Key>,
    joint: ArrayD<f64>,
}

impl BruteForce {
    pub fn new(fg: &FactorGraph, evidence: &[(Key, usize)]) -> Self {
        let keys: Vec<Key> = fg.sizes().keys().cloned().collect();
        let shape: Vec<usize> = fg.sizes().values().cloned().collect();
        let mut joint = ArrayD::ones(IxDyn(&shape));
        for f in fg.factors() {
            multiply_into(&mut joint, &keys, f.values().view(), f.keys());
        }
        for (k, v) in evidence {
            let mut indicator = Array1::<f64>::zeros(fg.size(*k).unwrap());
            indicator[*v] = 1.0;
            multiply_into(&mut joint, &keys, indicator.view().into_dyn(), &[*k]);
        }
        Self { keys, joint }
    }

    pub fn z(&self) -> f64 {
        self.joint.sum()
    }

    /// Unnormalized joint summed onto `keys`, with axes in the order of `keys`.
    pub fn project(&self, keys: &[Key]) -> ArrayD<f64> {
        project_sum(self.joint.view(), &self.keys, keys)
    }

    pub fn marginal(&self, key: Key) -> Array1<f64> {
        let m = to_array1(project_sum(self.joint.view(), &self.keys, &[key]));
        let z = m.sum();
        m / z
    }

    /// Max-marginal, scaled so that its maximum is 1.
    pub fn max_marginal(&self, key: Key) -> Array1<f64> {
        scale_to_max(to_array1(project_max(self.joint.view(), &self.keys, &[key])))
    }
}

pub fn to_array1(a: ArrayD<f64>) -> Array1<f64> {
    Array1::from_iter(a.iter().cloned())
}

pub fn scale_to_max(a: Array1<f64>) -> Array1<f64> {
    let max = a.fold(f64::NEG_INFINITY, |acc, x| acc.max(*x));
    a / max
}
