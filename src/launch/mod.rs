//! Launch module for einops operations.
//!
//! Provides the high-level API: compile a pattern (optionally through a
//! [`RecipeCache`](crate::cache::RecipeCache)) and apply it to a tensor.

mod config;
mod executor;

pub use config::{DEFAULT_CACHE_CAPACITY, EinopsConfig};
pub use executor::{Einops, execute_recipe, rearrange, reduce, repeat};
