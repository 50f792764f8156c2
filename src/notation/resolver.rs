//! Axis resolution against a concrete input shape.
//!
//! Binds every named axis of a pattern to an integer size, expands the ellipsis
//! into anonymous axes and computes the output shape.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

use super::axis::AxisPattern;
use super::pattern::EinopsPattern;
use crate::error::{EinopsError, EinopsResult};
use crate::planning::ReductionOp;

/// Identity of an elementary axis after ellipsis expansion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AxisId {
    /// A named axis from the pattern.
    Named(String),
    /// The `k`-th input dimension captured by the ellipsis.
    Anonymous(usize),
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisId::Named(name) => write!(f, "{}", name),
            AxisId::Anonymous(k) => write!(f, "...{}", k),
        }
    }
}

/// Which einops transform a pattern is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformKind {
    /// Both sides name exactly the same axes.
    Rearrange,
    /// Input axes missing from the output are folded with the reducer.
    Reduce(ReductionOp),
    /// Output-only axes are created with sizes from the provided axes.
    Repeat,
}

impl TransformKind {
    #[inline]
    pub fn reduction(&self) -> Option<ReductionOp> {
        match self {
            TransformKind::Reduce(op) => Some(*op),
            _ => None,
        }
    }
}

/// A pattern bound to one concrete input shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPattern {
    /// Transform this pattern was resolved for.
    pub kind: TransformKind,
    /// Size of every named axis referenced anywhere in the pattern.
    pub axis_dimensions: BTreeMap<String, usize>,
    /// Input dimensions captured by the ellipsis, in order.
    pub ellipsis_dimensions: Vec<usize>,
    /// Input side as elementary axes (composites split, singletons dropped).
    pub input_axes: Vec<AxisId>,
    /// Output side as elementary axes (composites flattened, singletons dropped).
    pub output_axes: Vec<AxisId>,
    /// Literal output shape.
    pub output_shape: Vec<usize>,
}

impl ResolvedPattern {
    /// Returns the size of an elementary axis.
    pub fn dimension(&self, axis: &AxisId) -> Option<usize> {
        match axis {
            AxisId::Named(name) => self.axis_dimensions.get(name).copied(),
            AxisId::Anonymous(k) => self.ellipsis_dimensions.get(*k).copied(),
        }
    }

    /// Sizes of the given axes, in order.
    pub fn shape_of(&self, axes: &[AxisId]) -> EinopsResult<Vec<usize>> {
        axes.iter()
            .map(|axis| {
                self.dimension(axis)
                    .ok_or_else(|| EinopsError::axis(format!("axis '{}' has no resolved size", axis)))
            })
            .collect()
    }

    /// The input shape with every composite split into its elementary axes.
    pub fn decomposed_shape(&self) -> EinopsResult<Vec<usize>> {
        self.shape_of(&self.input_axes)
    }

    /// Positions (in `input_axes`) of axes that do not survive to the output.
    pub fn reduced_positions(&self) -> Vec<usize> {
        let output: BTreeSet<&AxisId> = self.output_axes.iter().collect();
        self.input_axes
            .iter()
            .enumerate()
            .filter(|(_, axis)| !output.contains(axis))
            .map(|(i, _)| i)
            .collect()
    }

    /// Output axes that have no input counterpart.
    pub fn new_axes(&self) -> Vec<&AxisId> {
        let input: BTreeSet<&AxisId> = self.input_axes.iter().collect();
        self.output_axes.iter().filter(|a| !input.contains(a)).collect()
    }
}

/// Resolves a parsed pattern against an input shape.
///
/// `provided_axes` supplies sizes for axes that cannot be inferred from the
/// shape: the extra factors of a split composite, or new axes of a repeat.
///
/// # Errors
///
/// - [`EinopsError::AxisError`]: duplicate axis on one side, output axis with no
///   binding, input axis missing from a rearrange/repeat output, zero or unused
///   provided size, misplaced ellipsis.
/// - [`EinopsError::ShapeError`]: rank mismatch, composite that does not divide its
///   dimension, more than one unknown factor in a composite, provided size that
///   contradicts the shape, singleton bound to a dimension other than 1.
pub fn resolve(
    pattern: &EinopsPattern,
    input_shape: &[usize],
    provided_axes: &[(&str, usize)],
    kind: TransformKind,
) -> EinopsResult<ResolvedPattern> {
    let provided = collect_provided(pattern, provided_axes)?;

    check_duplicates(pattern.input(), "input")?;
    check_duplicates(pattern.output(), "output")?;
    check_ellipsis(pattern, kind)?;

    let fixed_rank = pattern.fixed_input_rank();
    let ellipsis_len = if pattern.input_has_ellipsis() {
        if input_shape.len() < fixed_rank {
            return Err(EinopsError::shape(format!(
                "pattern '{}' needs at least {} dimensions, input has {}",
                pattern,
                fixed_rank,
                input_shape.len()
            )));
        }
        input_shape.len() - fixed_rank
    } else {
        if input_shape.len() != fixed_rank {
            return Err(EinopsError::shape(format!(
                "pattern '{}' expects {} dimensions, input has {}",
                pattern,
                fixed_rank,
                input_shape.len()
            )));
        }
        0
    };

    let mut axis_dimensions: BTreeMap<String, usize> = BTreeMap::new();
    let mut ellipsis_dimensions = Vec::with_capacity(ellipsis_len);
    let mut input_axes = Vec::with_capacity(input_shape.len());

    let mut dims = input_shape.iter().copied();
    for term in pattern.input() {
        match term {
            AxisPattern::Ellipsis => {
                for k in 0..ellipsis_len {
                    ellipsis_dimensions.extend(dims.next());
                    input_axes.push(AxisId::Anonymous(k));
                }
            }
            _ => {
                let dim = dims
                    .next()
                    .ok_or_else(|| EinopsError::shape("input shape exhausted"))?;
                bind_input_term(term, dim, &provided, &mut axis_dimensions, &mut input_axes)?;
            }
        }
    }

    // Output side: substitute sizes, flatten composites.
    let mut output_axes = Vec::new();
    let mut output_shape = Vec::with_capacity(pattern.output().len());
    for term in pattern.output() {
        let mut size = 1usize;
        match term {
            // A top-level ellipsis keeps every captured dimension separate.
            AxisPattern::Ellipsis => {
                for (k, &dim) in ellipsis_dimensions.iter().enumerate() {
                    output_axes.push(AxisId::Anonymous(k));
                    output_shape.push(dim);
                }
                continue;
            }
            _ => bind_output_term(
                term,
                kind,
                &provided,
                &ellipsis_dimensions,
                &mut axis_dimensions,
                &mut output_axes,
                &mut size,
            )?,
        }
        output_shape.push(size);
    }

    if !matches!(kind, TransformKind::Reduce(_)) {
        let output: BTreeSet<&str> = pattern.output_names().into_iter().collect();
        if let Some(missing) = pattern.input_names().into_iter().find(|n| !output.contains(n)) {
            return Err(EinopsError::axis(format!(
                "axis '{}' is missing from the output of '{}'",
                missing, pattern
            )));
        }
    }

    tracing::trace!(
        pattern = %pattern,
        ?input_shape,
        ?output_shape,
        "resolved pattern"
    );

    Ok(ResolvedPattern {
        kind,
        axis_dimensions,
        ellipsis_dimensions,
        input_axes,
        output_axes,
        output_shape,
    })
}

/// Validates user-supplied axis sizes.
fn collect_provided<'a>(
    pattern: &EinopsPattern,
    provided_axes: &[(&'a str, usize)],
) -> EinopsResult<BTreeMap<&'a str, usize>> {
    let names = pattern.all_names();
    let mut provided = BTreeMap::new();

    for &(name, size) in provided_axes {
        if size == 0 {
            return Err(EinopsError::axis(format!(
                "size of axis '{}' must be a positive integer, got 0",
                name
            )));
        }
        if !names.contains(name) {
            return Err(EinopsError::axis(format!(
                "axis '{}' is not used in pattern '{}'",
                name, pattern
            )));
        }
        if let Some(previous) = provided.insert(name, size) {
            if previous != size {
                return Err(EinopsError::axis(format!(
                    "axis '{}' given two sizes: {} and {}",
                    name, previous, size
                )));
            }
        }
    }

    Ok(provided)
}

fn check_duplicates(terms: &[AxisPattern], side: &str) -> EinopsResult<()> {
    let mut names = Vec::new();
    for term in terms {
        term.collect_names(&mut names);
    }
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(EinopsError::axis(format!(
                "axis '{}' appears more than once on the {} side",
                name, side
            )));
        }
    }
    Ok(())
}

fn check_ellipsis(pattern: &EinopsPattern, kind: TransformKind) -> EinopsResult<()> {
    let nested_input = pattern
        .input()
        .iter()
        .any(|t| t.is_composite() && t.contains_ellipsis());
    if nested_input {
        return Err(EinopsError::axis(
            "ellipsis inside a composite is only allowed on the output side",
        ));
    }

    match (pattern.input_has_ellipsis(), pattern.output_has_ellipsis()) {
        (false, true) => Err(EinopsError::axis(
            "ellipsis in the output has no counterpart in the input",
        )),
        (true, false) if !matches!(kind, TransformKind::Reduce(_)) => Err(EinopsError::axis(
            "ellipsis in the input must also appear in the output",
        )),
        _ => Ok(()),
    }
}

/// Binds one non-ellipsis input term to its dimension.
fn bind_input_term(
    term: &AxisPattern,
    dim: usize,
    provided: &BTreeMap<&str, usize>,
    axis_dimensions: &mut BTreeMap<String, usize>,
    input_axes: &mut Vec<AxisId>,
) -> EinopsResult<()> {
    match term {
        AxisPattern::Name(name) => {
            if let Some(&size) = provided.get(name.as_str()) {
                if size != dim {
                    return Err(EinopsError::shape(format!(
                        "axis '{}' was given size {} but the input dimension is {}",
                        name, size, dim
                    )));
                }
            }
            axis_dimensions.insert(name.clone(), dim);
            input_axes.push(AxisId::Named(name.clone()));
        }
        AxisPattern::Singleton => {
            if dim != 1 {
                return Err(EinopsError::shape(format!(
                    "singleton '1' bound to a dimension of size {}",
                    dim
                )));
            }
        }
        AxisPattern::Composite(_) => {
            let mut leaves = Vec::new();
            collect_leaves(term, &mut leaves);

            let mut known = 1usize;
            let mut unknown = Vec::new();
            for leaf in &leaves {
                match leaf {
                    AxisPattern::Name(name) => match provided.get(name.as_str()) {
                        Some(&size) => {
                            known = known.checked_mul(size).ok_or_else(|| {
                                EinopsError::shape(format!(
                                    "provided sizes of composite {} overflow usize",
                                    term
                                ))
                            })?;
                        }
                        None => unknown.push(name.as_str()),
                    },
                    _ => {}
                }
            }

            match unknown.as_slice() {
                [] => {
                    if known != dim {
                        return Err(EinopsError::shape(format!(
                            "composite {} has size {} but the input dimension is {}",
                            term, known, dim
                        )));
                    }
                }
                [single] => {
                    if known == 0 {
                        return Err(EinopsError::shape(format!(
                            "cannot infer '{}' from zero-sized provided axes in composite {}",
                            single, term
                        )));
                    }
                    if dim % known != 0 {
                        return Err(EinopsError::shape(format!(
                            "input dimension {} is not divisible by {} in composite {}",
                            dim, known, term
                        )));
                    }
                    axis_dimensions.insert(single.to_string(), dim / known);
                }
                many => {
                    return Err(EinopsError::shape(format!(
                        "cannot infer sizes of {} axes ({}) in composite {}; provide all but one",
                        many.len(),
                        many.join(", "),
                        term
                    )));
                }
            }

            for leaf in leaves {
                if let AxisPattern::Name(name) = leaf {
                    if let Some(&size) = provided.get(name.as_str()) {
                        axis_dimensions.insert(name.clone(), size);
                    }
                    input_axes.push(AxisId::Named(name.clone()));
                }
            }
        }
        AxisPattern::Ellipsis => {
            return Err(EinopsError::axis("unexpected ellipsis"));
        }
    }
    Ok(())
}

/// Flattens a composite into its named and singleton leaves.
fn collect_leaves<'a>(term: &'a AxisPattern, out: &mut Vec<&'a AxisPattern>) {
    match term {
        AxisPattern::Composite(children) => {
            for child in children {
                collect_leaves(child, out);
            }
        }
        leaf => out.push(leaf),
    }
}

fn grow_output(size: &mut usize, dim: usize) -> EinopsResult<()> {
    *size = size.checked_mul(dim).ok_or_else(|| {
        EinopsError::shape(format!(
            "output dimension {} * {} overflows usize",
            size, dim
        ))
    })?;
    Ok(())
}

/// Binds one output term, accumulating its flattened size into `size`.
fn bind_output_term(
    term: &AxisPattern,
    kind: TransformKind,
    provided: &BTreeMap<&str, usize>,
    ellipsis_dimensions: &[usize],
    axis_dimensions: &mut BTreeMap<String, usize>,
    output_axes: &mut Vec<AxisId>,
    size: &mut usize,
) -> EinopsResult<()> {
    match term {
        AxisPattern::Name(name) => {
            let dim = match axis_dimensions.get(name) {
                Some(&dim) => dim,
                None => match (kind, provided.get(name.as_str())) {
                    (TransformKind::Repeat, Some(&dim)) => {
                        axis_dimensions.insert(name.clone(), dim);
                        dim
                    }
                    (TransformKind::Repeat, None) => {
                        return Err(EinopsError::axis(format!(
                            "new axis '{}' needs a size in the provided axes",
                            name
                        )));
                    }
                    _ => {
                        return Err(EinopsError::axis(format!(
                            "output axis '{}' does not appear in the input",
                            name
                        )));
                    }
                },
            };
            output_axes.push(AxisId::Named(name.clone()));
            grow_output(size, dim)?;
        }
        AxisPattern::Singleton => {}
        AxisPattern::Ellipsis => {
            for (k, &dim) in ellipsis_dimensions.iter().enumerate() {
                output_axes.push(AxisId::Anonymous(k));
                grow_output(size, dim)?;
            }
        }
        AxisPattern::Composite(children) => {
            for child in children {
                bind_output_term(
                    child,
                    kind,
                    provided,
                    ellipsis_dimensions,
                    axis_dimensions,
                    output_axes,
                    size,
                )?;
            }
        }
    }
    Ok(())
}
