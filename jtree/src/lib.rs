//! Exact inference on factor graphs with the junction tree algorithm.
//!
//! The structure of a factor graph (its keys, their domain sizes and the key lists of its
//! factors) is compiled once into a [`JunctionTree`]: the interaction graph is triangulated with
//! the min-fill heuristic, the maximal induced clusters become cliques, and the cliques are
//! connected into a forest by a maximum-weight spanning tree over their intersections.
//! Factor values are then embedded into a [`PotentialTable`], which the Hugin collect/distribute
//! passes calibrate. The same tree can be reused for any factor values sharing that structure.
//!
//! ```
//! use jtree::{Config, FactorGraph, JunctionTree};
//! use ndarray::array;
//!
//! let mut fg = FactorGraph::new();
//! fg.add_key(0, 2).unwrap();
//! fg.add_key(1, 2).unwrap();
//! fg.add_factor(vec![0, 1], array![[0.4, 0.8], [0.6, 0.2]].into_dyn()).unwrap();
//! fg.add_factor(vec![1], array![0.1, 0.9].into_dyn()).unwrap();
//!
//! let (jt, mut phi) = JunctionTree::from_factor_graph(&fg).unwrap();
//! jt.propagate(&mut phi, None, &Config::no_progress()).unwrap();
//! let p0 = jt.marginalize(&phi, &[0], true).unwrap();
//! assert!((p0[0] - 0.76).abs() < 1e-12);
//! ```

pub mod cliques;
pub mod evidence;
pub mod factor_graph;
pub mod graph;
pub mod hugin;
pub mod junction_tree;
pub mod potentials;
pub mod query;
pub mod tensor;
pub mod triangulation;
pub(crate) mod utils;

pub use evidence::{Evidence, Observation, ShrinkMapping};
pub use factor_graph::{Factor, FactorGraph, GraphBuildError};
pub use hugin::{DistributiveLaw, Hugin, MaxProduct, SumProduct};
pub use junction_tree::{JunctionTree, Separator, TreeView};
pub use potentials::PotentialTable;

use thiserror::Error;

/// Label of a variable of the factor graph.
pub type Key = u32;
/// Dense index of a key, following the sorted key order.
pub type VarId = usize;
/// Index of a clique, or of a separator, in the potential table.
pub type NodeId = usize;
pub type CliqueId = NodeId;

pub type Result<T> = std::result::Result<T, JtError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JtError {
    #[error("Invalid factor graph: {0}")]
    Graph(#[from] GraphBuildError),
    #[error("Key {0} is not part of the junction tree.")]
    UnknownKey(Key),
    #[error("Potentials are not initialized for this junction tree.")]
    Uninitialized,
    #[error("Clique {0} is not part of the junction tree.")]
    UnknownClique(CliqueId),
    #[error("Key {key} is not in clique {clique}.")]
    KeyNotInClique { key: Key, clique: CliqueId },
    #[error("Marginals are computed for a single key, got {0} keys.")]
    MultiKeyMarginal(usize),
    #[error("Observed value {value} for key {key} is out of its domain (size {size}).")]
    ObservedValueOutOfRange { key: Key, value: usize, size: usize },
    #[error("No clique contains all keys {0:?} of a factor.")]
    NoContainingClique(Vec<Key>),
    #[error("Potential of node {node} has shape {got:?}, expected {expected:?}.")]
    PotentialShape {
        node: NodeId,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Propagation time after which a progress bar is displayed.
    /// This avoids showing progress bars for negligible amounts of time.
    /// If None, never display the progress bar.
    progress_min_time: Option<std::time::Duration>,
    /// Propagate independent trees, and sibling subtrees during collect, on the rayon pool.
    parallel: bool,
}

impl Config {
    pub fn with_default_timing() -> Self {
        Self {
            progress_min_time: Some(std::time::Duration::from_millis(500)),
            parallel: false,
        }
    }
    pub fn no_progress() -> Self {
        Self {
            progress_min_time: None,
            parallel: false,
        }
    }
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
    pub fn parallel(&self) -> bool {
        self.parallel
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::no_progress()
    }
}
