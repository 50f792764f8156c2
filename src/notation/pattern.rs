//! Complete einops pattern representation.

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

use super::axis::{AxisPattern, write_terms};

/// Parsed einops pattern: the AST of both sides of the arrow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EinopsPattern {
    /// Input side terms, in order.
    input: Vec<AxisPattern>,
    /// Output side terms, in order.
    output: Vec<AxisPattern>,
    /// Original pattern string (if available).
    original: Option<String>,
}

impl EinopsPattern {
    /// Creates a pattern from parsed sides.
    pub fn new(input: Vec<AxisPattern>, output: Vec<AxisPattern>) -> Self {
        Self {
            input,
            output,
            original: None,
        }
    }

    /// Sets the original pattern string.
    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        self.original = Some(original.into());
        self
    }

    /// Returns the original pattern string, if recorded.
    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    #[inline]
    pub fn input(&self) -> &[AxisPattern] {
        &self.input
    }

    #[inline]
    pub fn output(&self) -> &[AxisPattern] {
        &self.output
    }

    /// Axis names on the input side, in declaration order (composites flattened).
    pub fn input_names(&self) -> Vec<&str> {
        side_names(&self.input)
    }

    /// Axis names on the output side, in declaration order (composites flattened).
    pub fn output_names(&self) -> Vec<&str> {
        side_names(&self.output)
    }

    /// All distinct axis names across both sides.
    pub fn all_names(&self) -> BTreeSet<&str> {
        self.input_names()
            .into_iter()
            .chain(self.output_names())
            .collect()
    }

    #[inline]
    pub fn input_has_ellipsis(&self) -> bool {
        self.input.iter().any(|t| t.contains_ellipsis())
    }

    #[inline]
    pub fn output_has_ellipsis(&self) -> bool {
        self.output.iter().any(|t| t.contains_ellipsis())
    }

    /// Returns true if the input side splits any dimension.
    pub fn input_has_composite(&self) -> bool {
        self.input.iter().any(|t| t.is_composite())
    }

    /// Returns true if the output side merges any dimensions.
    pub fn output_has_composite(&self) -> bool {
        self.output.iter().any(|t| t.is_composite())
    }

    /// Returns true if the output side is empty (reduction to a scalar).
    #[inline]
    pub fn is_scalar_output(&self) -> bool {
        self.output.is_empty()
    }

    /// Number of top-level input slots that bind exactly one input dimension.
    pub fn fixed_input_rank(&self) -> usize {
        self.input.iter().filter(|t| !t.is_ellipsis()).count()
    }

    /// Names on the output side that never appear on the input side.
    pub fn new_axis_names(&self) -> Vec<&str> {
        let input: BTreeSet<&str> = self.input_names().into_iter().collect();
        self.output_names()
            .into_iter()
            .filter(|n| !input.contains(n))
            .collect()
    }

    /// Names on the input side that never appear on the output side.
    pub fn dropped_axis_names(&self) -> Vec<&str> {
        let output: BTreeSet<&str> = self.output_names().into_iter().collect();
        self.input_names()
            .into_iter()
            .filter(|n| !output.contains(n))
            .collect()
    }
}

fn side_names(terms: &[AxisPattern]) -> Vec<&str> {
    let mut names = Vec::new();
    for term in terms {
        term.collect_names(&mut names);
    }
    names
}

impl fmt::Display for EinopsPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_terms(f, &self.input)?;
        write!(f, " -> ")?;
        write_terms(f, &self.output)
    }
}
