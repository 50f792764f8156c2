//! # CubeK Einops
//!
//! Einops-style tensor rearrangement: a pattern compiler plus a strided layout
//! engine.
//!
//! ## Features
//!
//! - Full einops grammar: named axes, composite `(h w)` groups, ellipsis and `1`
//! - Shape resolution with at most one inferred factor per composite
//! - Planning into primitive reshape/permute/expand/reduce operations
//! - Stride-aware execution that copies only when a reshape needs it, always in
//!   logical row-major order
//! - Recipe caching keyed by pattern, shape and axis sizes (`std` feature)
//!
//! ## Example
//!
//! ```
//! use cubek_einops::layout::TensorStorage;
//! use cubek_einops::{ReductionOp, rearrange, reduce};
//!
//! let image = TensorStorage::from_vec((1..=16).collect::<Vec<i32>>(), &[4, 4]).unwrap();
//!
//! // 2x2 patches, flattened.
//! let patches = rearrange(image.clone(), "(h ph) (w pw) -> h w (ph pw)", &[("ph", 2), ("pw", 2)])
//!     .unwrap();
//! assert_eq!(patches.shape(), &[2, 2, 4]);
//!
//! // Column sums.
//! let sums = reduce(image, "h w -> w", ReductionOp::Sum, &[]).unwrap();
//! assert_eq!(sums.to_vec(), vec![28, 32, 36, 40]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod layout;
pub mod launch;
pub mod notation;
pub mod planning;

#[cfg(feature = "std")]
pub mod cache;

pub use error::{EinopsError, EinopsResult, ErrorClass};
pub use launch::{Einops, EinopsConfig, rearrange, reduce, repeat};
pub use notation::{EinopsPattern, ResolvedPattern, TransformKind, parse_pattern, resolve};
pub use planning::{Operation, Recipe, ReductionOp, compile, plan};

#[cfg(feature = "std")]
pub use cache::{CacheStats, RecipeCache, global_cache};
