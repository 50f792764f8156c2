//! Operation planner.
//!
//! Lowers a resolved pattern into the ordered primitive operations that take the
//! input tensor to the output tensor.

use alloc::format;
use alloc::vec::Vec;

use super::operation::Operation;
use crate::error::{EinopsError, EinopsResult};
use crate::notation::{AxisId, EinopsPattern, ResolvedPattern};

/// Plans the operations for a resolved pattern.
///
/// The sequence is, with every step omitted when it would be a no-op:
/// 1. `Reshape` into the decomposed input (composites split, singletons dropped).
/// 2. `Reduce` over axes absent from the output.
/// 3. `Permute` (or `Transpose` for a full reversal) into output axis order.
/// 4. `Reshape` + `Expand` to create the new axes of a repeat.
/// 5. `Reshape` into the literal output shape (merges and singletons).
///
/// When nothing is needed, including reshape chains that return to the input
/// shape, the plan is exactly `[Identity]`.
pub fn plan(
    pattern: &EinopsPattern,
    resolved: &ResolvedPattern,
    input_shape: &[usize],
) -> EinopsResult<Vec<Operation>> {
    let mut operations = Vec::new();

    let decomposed = resolved.decomposed_shape()?;
    if decomposed.as_slice() != input_shape {
        operations.push(Operation::Reshape(decomposed));
    }

    let reduced = resolved.reduced_positions();
    if !reduced.is_empty() {
        let op = resolved.kind.reduction().ok_or_else(|| {
            EinopsError::axis("input axes are missing from the output of a non-reducing pattern")
        })?;
        operations.push(Operation::Reduce {
            op,
            axes: reduced.clone(),
            keep_dims: false,
        });
    }

    let surviving: Vec<&AxisId> = resolved
        .input_axes
        .iter()
        .enumerate()
        .filter(|(i, _)| !reduced.contains(i))
        .map(|(_, axis)| axis)
        .collect();

    let kept: Vec<AxisId> = resolved
        .output_axes
        .iter()
        .filter(|axis| surviving.contains(axis))
        .cloned()
        .collect();

    let permutation = permutation_to(&surviving, &kept)?;
    if !is_identity(&permutation) {
        if permutation.len() >= 2 && is_reversal(&permutation) {
            operations.push(Operation::Transpose);
        } else {
            operations.push(Operation::Permute(permutation));
        }
    }

    let mut current = resolved.shape_of(&kept)?;

    if !resolved.new_axes().is_empty() {
        let with_slots = resolved
            .output_axes
            .iter()
            .map(|axis| {
                if surviving.contains(&axis) {
                    resolved.dimension(axis).ok_or_else(|| {
                        EinopsError::axis(format!("axis '{}' has no resolved size", axis))
                    })
                } else {
                    Ok(1)
                }
            })
            .collect::<EinopsResult<Vec<usize>>>()?;
        let expanded = resolved.shape_of(&resolved.output_axes)?;

        operations.push(Operation::Reshape(with_slots));
        operations.push(Operation::Expand(expanded.clone()));
        current = expanded;
    }

    if current != resolved.output_shape {
        operations.push(Operation::Reshape(resolved.output_shape.clone()));
    }

    // A chain of reshapes that ends on the input shape leaves row-major data unchanged.
    let only_reshapes = operations
        .iter()
        .all(|op| matches!(op, Operation::Reshape(_)));
    if only_reshapes && resolved.output_shape.as_slice() == input_shape {
        operations.clear();
    }

    if operations.is_empty() {
        operations.push(Operation::Identity);
    }

    tracing::trace!(pattern = %pattern, ?operations, "planned operations");

    Ok(operations)
}

/// Computes `order` such that `from[order[i]] == to[i]`.
fn permutation_to(from: &[&AxisId], to: &[AxisId]) -> EinopsResult<Vec<usize>> {
    to.iter()
        .map(|axis| {
            from.iter().position(|a| *a == axis).ok_or_else(|| {
                EinopsError::axis(format!("axis '{}' has no input position", axis))
            })
        })
        .collect()
}

#[inline]
fn is_identity(permutation: &[usize]) -> bool {
    permutation.iter().enumerate().all(|(i, &p)| i == p)
}

#[inline]
fn is_reversal(permutation: &[usize]) -> bool {
    let n = permutation.len();
    permutation.iter().enumerate().all(|(i, &p)| p == n - 1 - i)
}
