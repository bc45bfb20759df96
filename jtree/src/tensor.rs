//! Tensors indexed by key lists.
//!
//! Axis `i` of a tensor over `keys` corresponds to `keys[i]`. These are the only contraction
//! primitives the rest of the crate needs: broadcasting a tensor over a subset of keys onto a
//! larger key list, and reducing a tensor onto a subset of its keys.

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};

use super::Key;

fn position(keys: &[Key], key: Key) -> Option<usize> {
    keys.iter().position(|k| *k == key)
}

/// View `tensor` (over `keys`) as a tensor of rank `target.len()` over `target`: its axes are
/// permuted in `target` order and length-1 axes are inserted for the keys of `target` it does
/// not have. The result broadcasts against any tensor over `target`.
///
/// `keys` must be a subset of `target`.
pub fn broadcast_view<'a>(
    tensor: ArrayViewD<'a, f64>,
    keys: &[Key],
    target: &[Key],
) -> ArrayViewD<'a, f64> {
    assert_eq!(tensor.ndim(), keys.len());
    let target_pos = keys
        .iter()
        .filter_map(|k| position(target, *k))
        .collect::<Vec<_>>();
    assert_eq!(target_pos.len(), keys.len(), "Broadcast to a key list that misses a key.");
    let mut perm = (0..keys.len()).collect::<Vec<_>>();
    perm.sort_unstable_by_key(|ax| target_pos[*ax]);
    let mut res = tensor.permuted_axes(perm);
    for (i, k) in target.iter().enumerate() {
        if !keys.contains(k) {
            res = res.insert_axis(Axis(i));
        }
    }
    res
}

/// Multiply `acc` (over `acc_keys`) elementwise by `tensor` (over `keys`, a subset of
/// `acc_keys`), broadcasting `tensor` over the missing keys.
pub fn multiply_into(acc: &mut ArrayD<f64>, acc_keys: &[Key], tensor: ArrayViewD<f64>, keys: &[Key]) {
    let tensor = broadcast_view(tensor, keys, acc_keys);
    *acc *= &tensor;
}

/// Reduce `tensor` (over `from`) onto `to` with `reduce` (e.g. a sum) along every axis of a key
/// not in `to`. The result is in standard layout with axes in `to` order.
///
/// `to` must be a subset of `from`.
pub fn project_with<F>(tensor: ArrayViewD<f64>, from: &[Key], to: &[Key], reduce: F) -> ArrayD<f64>
where
    F: Fn(ArrayViewD<f64>, Axis) -> ArrayD<f64>,
{
    assert_eq!(tensor.ndim(), from.len());
    let mut res = tensor.to_owned();
    // Reduce from the last axis so that the index of the remaining ones does not change.
    for (ax, k) in from.iter().enumerate().rev() {
        if !to.contains(k) {
            res = reduce(res.view(), Axis(ax));
        }
    }
    let kept = from.iter().filter(|k| to.contains(k)).cloned().collect::<Vec<_>>();
    let perm = to
        .iter()
        .filter_map(|k| position(&kept, *k))
        .collect::<Vec<_>>();
    assert_eq!(perm.len(), to.len(), "Projection on a key list that is not a subset.");
    res.permuted_axes(perm).as_standard_layout().into_owned()
}

/// Sum `tensor` over every key of `from` that is not in `to`.
pub fn project_sum(tensor: ArrayViewD<f64>, from: &[Key], to: &[Key]) -> ArrayD<f64> {
    project_with(tensor, from, to, |t, ax| t.sum_axis(ax))
}

/// Maximum of `tensor` over every key of `from` that is not in `to`.
pub fn project_max(tensor: ArrayViewD<f64>, from: &[Key], to: &[Key]) -> ArrayD<f64> {
    project_with(tensor, from, to, |t, ax| {
        t.fold_axis(ax, f64::NEG_INFINITY, |acc, x| acc.max(*x))
    })
}

/// All-ones tensor over `keys`, where `size(k)` is the domain size of `k`.
pub fn ones(keys: &[Key], size: impl Fn(Key) -> usize) -> ArrayD<f64> {
    let shape = keys.iter().map(|k| size(*k)).collect::<Vec<_>>();
    ArrayD::ones(IxDyn(&shape))
}
