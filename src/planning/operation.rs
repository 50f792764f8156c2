//! Primitive operations produced by the planner.

use alloc::format;
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EinopsError, EinopsResult};
use crate::layout::checked_numel;

/// Associative reducer used by [`Operation::Reduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReductionOp {
    Sum,
    Mean,
    Max,
    Min,
    Prod,
}

impl ReductionOp {
    /// Returns true if the reducer has a value for an empty group.
    #[inline]
    pub fn has_identity(&self) -> bool {
        matches!(self, ReductionOp::Sum | ReductionOp::Prod)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReductionOp::Sum => "sum",
            ReductionOp::Mean => "mean",
            ReductionOp::Max => "max",
            ReductionOp::Min => "min",
            ReductionOp::Prod => "prod",
        }
    }
}

impl fmt::Display for ReductionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A primitive tensor operation.
///
/// Preconditions (e.g. contiguity for `Reshape`) are enforced by the layout
/// engine when the operation is applied, not by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Reinterpret as the target shape (same element count).
    Reshape(Vec<usize>),
    /// Reorder axes: output axis `i` is input axis `order[i]`.
    Permute(Vec<usize>),
    /// Reverse all axes.
    Transpose,
    /// Broadcast extent-1 axes to the target shape (same rank).
    Expand(Vec<usize>),
    /// Fold the given axes with `op`.
    Reduce {
        op: ReductionOp,
        axes: Vec<usize>,
        keep_dims: bool,
    },
    /// No buffer work at all.
    Identity,
}

impl Operation {
    /// Returns true if the operation never touches element data.
    ///
    /// `Reshape` is metadata-only for contiguous sources but may still copy.
    pub fn is_metadata_only(&self) -> bool {
        matches!(
            self,
            Operation::Permute(_) | Operation::Transpose | Operation::Expand(_) | Operation::Identity
        )
    }

    /// Computes the shape this operation produces from `input`.
    pub fn output_shape(&self, input: &[usize]) -> EinopsResult<Vec<usize>> {
        match self {
            Operation::Reshape(target) => {
                let count = |shape: &[usize]| {
                    checked_numel(shape).ok_or_else(|| {
                        EinopsError::layout(format!(
                            "element count of shape {:?} overflows usize",
                            shape
                        ))
                    })
                };
                let from = count(input)?;
                let to = count(target)?;
                if from != to {
                    return Err(EinopsError::layout(format!(
                        "cannot reshape {:?} ({} elements) into {:?} ({} elements)",
                        input, from, target, to
                    )));
                }
                Ok(target.clone())
            }
            Operation::Permute(order) => {
                check_permutation(order, input.len())?;
                Ok(order.iter().map(|&axis| input[axis]).collect())
            }
            Operation::Transpose => Ok(input.iter().rev().copied().collect()),
            Operation::Expand(target) => {
                if target.len() != input.len() {
                    return Err(EinopsError::layout(format!(
                        "cannot expand rank {} to rank {}",
                        input.len(),
                        target.len()
                    )));
                }
                for (axis, (&from, &to)) in input.iter().zip(target.iter()).enumerate() {
                    if from != to && from != 1 {
                        return Err(EinopsError::layout(format!(
                            "cannot expand axis {} from {} to {}",
                            axis, from, to
                        )));
                    }
                }
                Ok(target.clone())
            }
            Operation::Reduce { axes, keep_dims, .. } => {
                check_axes(axes, input.len())?;
                Ok(input
                    .iter()
                    .enumerate()
                    .filter_map(|(axis, &dim)| match (axes.contains(&axis), *keep_dims) {
                        (false, _) => Some(dim),
                        (true, true) => Some(1),
                        (true, false) => None,
                    })
                    .collect())
            }
            Operation::Identity => Ok(input.to_vec()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Reshape(shape) => write!(f, "reshape{:?}", shape),
            Operation::Permute(order) => write!(f, "permute{:?}", order),
            Operation::Transpose => write!(f, "transpose"),
            Operation::Expand(shape) => write!(f, "expand{:?}", shape),
            Operation::Reduce { op, axes, keep_dims } => {
                write!(f, "{}{:?}", op, axes)?;
                if *keep_dims {
                    write!(f, " keep_dims")?;
                }
                Ok(())
            }
            Operation::Identity => write!(f, "identity"),
        }
    }
}

/// Checks that `order` is a permutation of `0..rank`.
pub(crate) fn check_permutation(order: &[usize], rank: usize) -> EinopsResult<()> {
    if order.len() != rank {
        return Err(EinopsError::layout(format!(
            "permutation {:?} has {} axes, tensor has {}",
            order,
            order.len(),
            rank
        )));
    }
    check_axes(order, rank)
}

/// Checks that every axis is in range and appears once.
pub(crate) fn check_axes(axes: &[usize], rank: usize) -> EinopsResult<()> {
    let mut seen = alloc::vec![false; rank];
    for &axis in axes {
        if axis >= rank || seen[axis] {
            return Err(EinopsError::layout(format!(
                "invalid axis list {:?} for rank {}",
                axes, rank
            )));
        }
        seen[axis] = true;
    }
    Ok(())
}
