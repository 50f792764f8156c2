//! Axis reductions over strided tensors.

use alloc::format;
use alloc::vec::Vec;

use super::dtype::Element;
use super::storage::TensorStorage;
use crate::error::{EinopsError, EinopsResult};
use crate::planning::{ReductionOp, check_axes};

/// Folds `axes` of `input` with `op` into a freshly allocated tensor.
///
/// Reduced axes are dropped, or kept with extent 1 when `keep_dims` is set.
/// Reducing an empty group yields 0 for `sum` and 1 for `prod`; `mean`, `max` and
/// `min` have no value for an empty group and fail with
/// [`EinopsError::ShapeError`]. `max` and `min` propagate NaN.
pub fn reduce<E: Element>(
    input: &TensorStorage<E>,
    op: ReductionOp,
    axes: &[usize],
    keep_dims: bool,
) -> EinopsResult<TensorStorage<E>> {
    let rank = input.rank();
    check_axes(axes, rank)?;

    let (kept, reduced): (Vec<usize>, Vec<usize>) = (0..rank).partition(|axis| !axes.contains(axis));
    let group: usize = reduced.iter().map(|&axis| input.shape()[axis]).product();

    if group == 0 && !op.has_identity() {
        return Err(EinopsError::shape(format!(
            "cannot {} over an empty axis of shape {:?}",
            op,
            input.shape()
        )));
    }

    let out_shape: Vec<usize> = input
        .shape()
        .iter()
        .enumerate()
        .filter_map(|(axis, &dim)| match (axes.contains(&axis), keep_dims) {
            (false, _) => Some(dim),
            (true, true) => Some(1),
            (true, false) => None,
        })
        .collect();

    tracing::trace!(%op, ?axes, keep_dims, from = ?input.shape(), to = ?out_shape, "reduce");

    // Kept axes first, reduced axes last: each output element then reads one
    // consecutive run of `group` values in logical order.
    let order: Vec<usize> = kept.iter().chain(reduced.iter()).copied().collect();
    let grouped = input.permute(&order)?;

    let values: Vec<E> = if group == 0 {
        let identity = match op {
            ReductionOp::Prod => E::one(),
            _ => E::zero(),
        };
        let outputs: usize = kept.iter().map(|&axis| input.shape()[axis]).product();
        alloc::vec![identity; outputs]
    } else {
        grouped
            .to_vec()
            .chunks_exact(group)
            .map(|chunk| fold(op, chunk))
            .collect()
    };

    Ok(TensorStorage::owned(values, &out_shape))
}

fn fold<E: Element>(op: ReductionOp, values: &[E]) -> E {
    match op {
        ReductionOp::Sum => E::sum(values.iter().copied()),
        ReductionOp::Mean => E::sum(values.iter().copied()).div_count(values.len()),
        ReductionOp::Prod => values.iter().fold(E::one(), |acc, &v| acc.times(v)),
        ReductionOp::Max => extremum(values, |v, best| v > best),
        ReductionOp::Min => extremum(values, |v, best| v < best),
    }
}

/// Returns the value preferred by `better`; any NaN wins.
fn extremum<E: Element>(values: &[E], better: impl Fn(E, E) -> bool) -> E {
    let mut best = values[0];
    for &value in &values[1..] {
        if best.is_nan() {
            break;
        }
        if value.is_nan() || better(value, best) {
            best = value;
        }
    }
    best
}
