//! Operation planning for einops patterns.
//!
//! Turns a resolved pattern into an ordered list of primitive operations and
//! bundles the whole compilation into a [`Recipe`].

mod operation;
mod planner;
mod recipe;

pub use operation::{Operation, ReductionOp};
pub(crate) use operation::{check_axes, check_permutation};
pub use planner::plan;
pub use recipe::{Recipe, compile, compile_pattern};
