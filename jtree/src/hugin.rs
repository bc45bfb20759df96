//! Hugin propagation on a junction forest.
//!
//! Each tree is calibrated by a collect pass (messages from the leaves to the root) followed by a
//! distribute pass (messages from the root to the leaves). A message from clique `X` to clique
//! `Y` through separator `S` projects the potential of `X` onto `S`, multiplies the potential of
//! `Y` by the ratio of the new to the old separator potential, and stores the new separator
//! potential.
//!
//! During propagation every node tensor sits behind its own lock, so that independent trees and
//! sibling subtrees can be processed on the rayon pool. Messages into a clique are always
//! absorbed sequentially, in child order.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hytra::TrAdder;
use ndarray::{ArrayD, ArrayViewD, Zip};
use rayon::prelude::*;

use super::evidence::{Evidence, Observation};
use super::junction_tree::{JunctionTree, Separator};
use super::potentials::PotentialTable;
use super::tensor::{broadcast_view, project_max, project_sum};
use super::{CliqueId, Config, Key, Result};

/// Projection and absorption rules of a propagation.
pub trait DistributiveLaw: Send + Sync {
    /// Marginalize `potential` (over `from`) onto `to`.
    fn project(&self, potential: ArrayViewD<f64>, from: &[Key], to: &[Key]) -> ArrayD<f64>;

    /// Update `clique` (over `clique_keys`) with the separator potential (over `sep_keys`)
    /// changing from `old` to `new`: `clique *= new / old`, where `x / 0 = 0`.
    fn absorb(
        &self,
        clique: &mut ArrayD<f64>,
        clique_keys: &[Key],
        old: ArrayViewD<f64>,
        new: ArrayViewD<f64>,
        sep_keys: &[Key],
    ) {
        let mut ratio = new.to_owned();
        Zip::from(&mut ratio).and(&old).for_each(|r, o| {
            *r = if *o == 0.0 { 0.0 } else { *r / *o };
        });
        *clique *= &broadcast_view(ratio.view(), sep_keys, clique_keys);
    }
}

/// Sum-product: calibrated potentials are unnormalized marginals.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumProduct;

impl DistributiveLaw for SumProduct {
    fn project(&self, potential: ArrayViewD<f64>, from: &[Key], to: &[Key]) -> ArrayD<f64> {
        project_sum(potential, from, to)
    }
}

/// Max-product: calibrated potentials are max-marginals.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxProduct;

impl DistributiveLaw for MaxProduct {
    fn project(&self, potential: ArrayViewD<f64>, from: &[Key], to: &[Key]) -> ArrayD<f64> {
        project_max(potential, from, to)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Hugin<L = SumProduct> {
    law: L,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl<L: DistributiveLaw> Hugin<L> {
    pub fn new(law: L) -> Self {
        Self { law }
    }

    pub fn law(&self) -> &L {
        &self.law
    }

    /// Calibrate `potentials` in place, after entering `evidence` if any.
    ///
    /// Nothing is modified if the potentials or the evidence are invalid.
    pub fn propagate(
        &self,
        jt: &JunctionTree,
        potentials: &mut PotentialTable,
        evidence: Option<&Evidence>,
        config: &Config,
    ) -> Result<Option<Observation>> {
        jt.check_potentials(potentials)?;
        let observation = evidence
            .map(|evidence| jt.observe(potentials, evidence))
            .transpose()?;
        let tables: Vec<RwLock<ArrayD<f64>>> =
            potentials.take().into_iter().map(RwLock::new).collect();
        let n_messages = 2 * jt.n_separators() as u64;
        crate::utils::with_progress(
            |cnt| {
                let run_tree = |root: &CliqueId| {
                    self.collect(jt, &tables, *root, cnt, config.parallel);
                    self.distribute(jt, &tables, *root, cnt, config.parallel);
                };
                if config.parallel {
                    jt.roots().par_iter().for_each(run_tree);
                } else {
                    jt.roots().iter().for_each(run_tree);
                }
            },
            n_messages,
            "Propagation",
            config,
        );
        *potentials = tables
            .into_iter()
            .map(|t| t.into_inner().unwrap_or_else(PoisonError::into_inner))
            .collect::<Vec<_>>()
            .into();
        log::debug!(
            "propagated {} trees, {} messages",
            jt.n_trees(),
            n_messages
        );
        Ok(observation)
    }

    /// Messages from the leaves of the subtree of `clique` up to `clique`.
    fn collect(
        &self,
        jt: &JunctionTree,
        tables: &[RwLock<ArrayD<f64>>],
        clique: CliqueId,
        cnt: &TrAdder<u64>,
        parallel: bool,
    ) {
        let children: Vec<&Separator> = jt.children(clique).collect();
        if parallel {
            children
                .par_iter()
                .for_each(|s| self.collect(jt, tables, s.child(), cnt, parallel));
        } else {
            for s in children.iter() {
                self.collect(jt, tables, s.child(), cnt, parallel);
            }
        }
        for s in children {
            self.pass_message(jt, tables, s, s.child(), clique);
            cnt.inc(1);
        }
    }

    /// Messages from `clique` down to the leaves of its subtree.
    fn distribute(
        &self,
        jt: &JunctionTree,
        tables: &[RwLock<ArrayD<f64>>],
        clique: CliqueId,
        cnt: &TrAdder<u64>,
        parallel: bool,
    ) {
        let children: Vec<&Separator> = jt.children(clique).collect();
        for s in children.iter() {
            self.pass_message(jt, tables, s, clique, s.child());
            cnt.inc(1);
        }
        if parallel {
            children
                .par_iter()
                .for_each(|s| self.distribute(jt, tables, s.child(), cnt, parallel));
        } else {
            for s in children {
                self.distribute(jt, tables, s.child(), cnt, parallel);
            }
        }
    }

    fn pass_message(
        &self,
        jt: &JunctionTree,
        tables: &[RwLock<ArrayD<f64>>],
        sep: &Separator,
        from: CliqueId,
        to: CliqueId,
    ) {
        let new = self
            .law
            .project(read(&tables[from]).view(), jt.clique_keys(from), sep.keys());
        let mut old = write(&tables[sep.id()]);
        self.law.absorb(
            &mut write(&tables[to]),
            jt.clique_keys(to),
            old.view(),
            new.view(),
            sep.keys(),
        );
        *old = new;
    }
}

impl JunctionTree {
    /// Sum-product calibration of `potentials` in place, after entering `evidence` if any.
    ///
    /// Returns the observation (likelihoods and shrink mappings) when evidence is given.
    pub fn propagate(
        &self,
        potentials: &mut PotentialTable,
        evidence: Option<&Evidence>,
        config: &Config,
    ) -> Result<Option<Observation>> {
        Hugin::<SumProduct>::default().propagate(self, potentials, evidence, config)
    }

    /// Same as [`JunctionTree::propagate`], on a copy of `potentials`.
    pub fn propagated(
        &self,
        potentials: &PotentialTable,
        evidence: Option<&Evidence>,
        config: &Config,
    ) -> Result<(PotentialTable, Option<Observation>)> {
        let mut potentials = potentials.clone();
        let observation = self.propagate(&mut potentials, evidence, config)?;
        Ok((potentials, observation))
    }
}
