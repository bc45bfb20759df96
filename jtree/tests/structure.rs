// Junction tree construction on random factor graphs.
//
// It tests for:
//   - running intersection property and separator contents
//   - factor coverage by cliques, one tree per connected component
//   - traversals, serialization
mod common;

use common::{gen_graph, BruteForce};
use jtree::graph::InteractionGraph;
use jtree::triangulation::triangulate;
use jtree::{Config, JunctionTree, PotentialTable};
use approx::assert_abs_diff_eq;

#[test]
fn running_intersection() {
    for seed in 0..20 {
        let fg = gen_graph(seed, 12, 14, 3);
        let jt = JunctionTree::build(&fg).unwrap();
        assert!(jt.verify_running_intersection(), "seed {}", seed);
        assert!(jt.verify_separators(), "seed {}", seed);
        assert_eq!(jt.n_separators() + jt.n_trees(), jt.n_cliques());
        assert_eq!(jt.n_nodes(), jt.n_cliques() + jt.n_separators());
        for s in jt.separators() {
            assert!(!s.keys().is_empty());
            assert_eq!(s.id(), jt.n_cliques() + jt.separators().iter().position(|x| x == s).unwrap());
        }
    }
}

#[test]
fn cliques_cover_factors_and_components() {
    for seed in 0..20 {
        let fg = gen_graph(1000 + seed, 10, 8, 3);
        let jt = JunctionTree::build(&fg).unwrap();
        for f in fg.factors() {
            assert!((0..jt.n_cliques())
                .any(|c| f.keys().iter().all(|k| jt.clique_keys(c).contains(k))));
        }
        // No clique is contained in another one.
        for a in 0..jt.n_cliques() {
            for b in 0..jt.n_cliques() {
                if a != b {
                    let (ka, kb) = (jt.clique_keys(a), jt.clique_keys(b));
                    assert!(!ka.iter().all(|k| kb.contains(k)));
                }
            }
        }
        let factor_vars = fg.factor_var_ids().unwrap();
        let graph =
            InteractionGraph::from_factors(fg.sizes().len(), factor_vars.iter().map(Vec::as_slice));
        assert_eq!(jt.n_trees(), graph.components().len());
        let sizes: Vec<usize> = fg.sizes().values().cloned().collect();
        let triangulation = triangulate(&graph, &sizes);
        assert!(triangulation.chordal_graph.is_chordal());
        assert_eq!(jt.treewidth(), triangulation.induced_width());
    }
}

#[test]
fn traversals_visit_each_tree_once() {
    let fg = gen_graph(77, 12, 10, 3);
    let jt = JunctionTree::build(&fg).unwrap();
    for (t, tree) in jt.trees().enumerate() {
        let root = tree.id();
        assert!(jt.parent(root).is_none());
        let dfs = jt.preorder(root);
        let mut bfs = jt.breadth_first(root);
        assert_eq!(dfs[0], root);
        assert_eq!(bfs[0], root);
        assert_eq!(dfs, jt.tree_cliques(t));
        // Parents come before their children.
        for (i, c) in dfs.iter().enumerate() {
            if let Some(s) = jt.parent(*c) {
                assert!(dfs[..i].contains(&s.parent()));
                assert_eq!(s.child(), *c);
            }
            assert_eq!(jt.clique_tree(*c), t);
        }
        let mut dfs_sorted = dfs.clone();
        dfs_sorted.sort_unstable();
        bfs.sort_unstable();
        assert_eq!(dfs_sorted, bfs);
        let n_children: usize = dfs.iter().map(|c| jt.children(*c).count()).sum();
        assert_eq!(n_children + 1, dfs.len());
    }
}

#[test]
fn key_lookups() {
    let fg = gen_graph(5, 8, 8, 3);
    let jt = JunctionTree::build(&fg).unwrap();
    for (i, (k, size)) in fg.sizes().iter().enumerate() {
        assert_eq!(jt.find_key(*k), Some(i));
        assert_eq!(jt.size(*k), Some(*size));
        let cliques = jt.key_cliques(*k).unwrap();
        assert!(!cliques.is_empty());
        assert!(cliques.windows(2).all(|w| w[0] < w[1]));
        for c in 0..jt.n_cliques() {
            assert_eq!(cliques.contains(&c), jt.key_position(c, *k).is_some());
        }
    }
    assert_eq!(jt.find_key(1), None);
    assert!(jt.key_cliques(1).is_none());
}

#[test]
fn serialization_round_trip() {
    let fg = gen_graph(9, 8, 10, 3);
    let (jt, phi) = JunctionTree::from_factor_graph(&fg).unwrap();
    let jt2: JunctionTree = bincode::deserialize(&bincode::serialize(&jt).unwrap()).unwrap();
    let phi2: PotentialTable = bincode::deserialize(&bincode::serialize(&phi).unwrap()).unwrap();
    assert_eq!(jt, jt2);
    assert_eq!(phi, phi2);
    let (calibrated, _) = jt2.propagated(&phi2, None, &Config::no_progress()).unwrap();
    let bf = BruteForce::new(&fg, &[]);
    for k in fg.sizes().keys() {
        assert_abs_diff_eq!(
            jt.marginalize(&calibrated, &[*k], true).unwrap(),
            bf.marginal(*k),
            epsilon = 1e-10
        );
    }
}
