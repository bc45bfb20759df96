//! Maximal cliques of a triangulated graph, from the induced clusters of its elimination.

use itertools::Itertools;

use super::VarId;

/// Keep only the clusters that are not contained in another cluster.
///
/// Among identical clusters, only the first one is kept. The remaining clusters keep their
/// relative order and their key order, the position of a cluster in the result is its clique id.
pub fn maximal_clusters(clusters: &[Vec<VarId>]) -> Vec<Vec<VarId>> {
    let sorted: Vec<Vec<VarId>> = clusters
        .iter()
        .map(|c| c.iter().cloned().sorted_unstable().collect())
        .collect();
    clusters
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            !sorted.iter().enumerate().any(|(j, other)| {
                *i != j
                    && is_subset(&sorted[*i], other)
                    && (sorted[*i].len() < other.len() || j < *i)
            })
        })
        .map(|(_, c)| c.clone())
        .collect()
}

/// Both slices are sorted.
fn is_subset(a: &[VarId], b: &[VarId]) -> bool {
    let mut b = b.iter();
    a.iter().all(|x| b.any(|y| y == x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominated_clusters_are_dropped() {
        let clusters = vec![
            vec![0, 1, 3],
            vec![1, 3, 2],
            vec![3, 2],
            vec![2],
            vec![4],
        ];
        assert_eq!(
            maximal_clusters(&clusters),
            vec![vec![0, 1, 3], vec![1, 3, 2], vec![4]]
        );
    }

    #[test]
    fn duplicates_keep_first() {
        let clusters = vec![vec![2, 1], vec![1, 2], vec![0]];
        assert_eq!(maximal_clusters(&clusters), vec![vec![2, 1], vec![0]]);
    }

    #[test]
    fn sorted_subset() {
        assert!(is_subset(&[1, 3], &[0, 1, 2, 3]));
        assert!(!is_subset(&[1, 4], &[0, 1, 2, 3]));
        assert!(is_subset(&[], &[0]));
    }
}
