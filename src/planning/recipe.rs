//! Compiled recipes: the full scan → parse → resolve → plan pipeline.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::operation::Operation;
use super::planner::plan;
use crate::error::EinopsResult;
use crate::notation::{EinopsPattern, ResolvedPattern, TransformKind, parse_pattern, resolve};

/// Everything needed to execute one pattern against one input shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Parsed pattern.
    pattern: EinopsPattern,
    /// Pattern bound to `input_shape`.
    resolved: ResolvedPattern,
    /// Operations to apply, in order.
    operations: Vec<Operation>,
    /// Input shape this recipe was compiled for.
    input_shape: Vec<usize>,
    /// Whether the plan is a lone `Identity`.
    is_identity: bool,
}

impl Recipe {
    #[inline]
    pub fn pattern(&self) -> &EinopsPattern {
        &self.pattern
    }

    #[inline]
    pub fn resolved(&self) -> &ResolvedPattern {
        &self.resolved
    }

    #[inline]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    #[inline]
    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    #[inline]
    pub fn output_shape(&self) -> &[usize] {
        &self.resolved.output_shape
    }

    #[inline]
    pub fn kind(&self) -> TransformKind {
        self.resolved.kind
    }

    /// Returns true if executing this recipe does no buffer work.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.is_identity
    }

    #[inline]
    pub fn num_operations(&self) -> usize {
        self.operations.len()
    }
}

/// Compiles a pattern string for one input shape.
///
/// # Example
///
/// ```
/// use cubek_einops::notation::TransformKind;
/// use cubek_einops::planning::{Operation, compile};
///
/// let recipe = compile("h w -> w h", &[2, 3], &[], TransformKind::Rearrange).unwrap();
/// assert_eq!(recipe.output_shape(), &[3, 2]);
/// assert_eq!(recipe.operations(), &[Operation::Transpose]);
/// ```
pub fn compile(
    pattern: &str,
    input_shape: &[usize],
    provided_axes: &[(&str, usize)],
    kind: TransformKind,
) -> EinopsResult<Recipe> {
    compile_pattern(parse_pattern(pattern)?, input_shape, provided_axes, kind)
}

/// Compiles an already parsed pattern for one input shape.
///
/// Useful when the same pattern is applied to many shapes.
pub fn compile_pattern(
    pattern: EinopsPattern,
    input_shape: &[usize],
    provided_axes: &[(&str, usize)],
    kind: TransformKind,
) -> EinopsResult<Recipe> {
    let resolved = resolve(&pattern, input_shape, provided_axes, kind)?;
    let operations = plan(&pattern, &resolved, input_shape)?;
    let is_identity = matches!(operations.as_slice(), [Operation::Identity]);

    Ok(Recipe {
        pattern,
        resolved,
        operations,
        input_shape: input_shape.to_vec(),
        is_identity,
    })
}
