//! Axis pattern AST node.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

/// One term on either side of an einops pattern.
///
/// For example, in `b (h w) ... 1 -> ...`, the input terms are `b`, `(h w)`,
/// `...` and `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisPattern {
    /// A named axis.
    Name(String),
    /// A parenthesized group merging (or splitting) its children. Never empty.
    Composite(Vec<AxisPattern>),
    /// Zero or more anonymous axes.
    Ellipsis,
    /// The literal `1`: an axis of extent one.
    Singleton,
}

impl AxisPattern {
    /// Creates a named axis.
    pub fn name(name: impl Into<String>) -> Self {
        AxisPattern::Name(name.into())
    }

    /// Creates a composite from named children.
    pub fn composite<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AxisPattern::Composite(names.into_iter().map(|n| AxisPattern::Name(n.into())).collect())
    }

    #[inline]
    pub fn is_ellipsis(&self) -> bool {
        matches!(self, AxisPattern::Ellipsis)
    }

    #[inline]
    pub fn is_composite(&self) -> bool {
        matches!(self, AxisPattern::Composite(_))
    }

    /// Returns the axis name if this is a named axis.
    #[inline]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            AxisPattern::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Returns true if this term is, or contains, an ellipsis.
    pub fn contains_ellipsis(&self) -> bool {
        match self {
            AxisPattern::Ellipsis => true,
            AxisPattern::Composite(children) => children.iter().any(|c| c.contains_ellipsis()),
            _ => false,
        }
    }

    /// Counts ellipses at any depth.
    pub fn ellipsis_count(&self) -> usize {
        match self {
            AxisPattern::Ellipsis => 1,
            AxisPattern::Composite(children) => children.iter().map(|c| c.ellipsis_count()).sum(),
            _ => 0,
        }
    }

    /// Appends every axis name at any depth, in declaration order.
    pub fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            AxisPattern::Name(name) => out.push(name),
            AxisPattern::Composite(children) => {
                for child in children {
                    child.collect_names(out);
                }
            }
            AxisPattern::Ellipsis | AxisPattern::Singleton => {}
        }
    }
}

impl fmt::Display for AxisPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisPattern::Name(name) => write!(f, "{}", name),
            AxisPattern::Composite(children) => {
                write!(f, "(")?;
                write_terms(f, children)?;
                write!(f, ")")
            }
            AxisPattern::Ellipsis => write!(f, "..."),
            AxisPattern::Singleton => write!(f, "1"),
        }
    }
}

/// Writes terms separated by single spaces.
pub(crate) fn write_terms(f: &mut fmt::Formatter<'_>, terms: &[AxisPattern]) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", term)?;
    }
    Ok(())
}
