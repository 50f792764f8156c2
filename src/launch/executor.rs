//! Einops execution engine.
//!
//! Orchestrates compilation (through the recipe cache when enabled) and the
//! layout engine.

use alloc::format;
use alloc::sync::Arc;

use super::config::EinopsConfig;
#[cfg(feature = "std")]
use crate::cache::{RecipeCache, global_cache};
use crate::error::{EinopsError, EinopsResult};
use crate::layout::{Element, TensorStorage};
use crate::notation::TransformKind;
use crate::planning::{Recipe, ReductionOp, compile};

/// Executor bundling a configuration with an optional recipe cache.
///
/// # Example
///
/// ```
/// use cubek_einops::launch::{Einops, EinopsConfig};
/// use cubek_einops::layout::TensorStorage;
///
/// let einops = Einops::new(EinopsConfig::default());
/// let x = TensorStorage::from_vec(vec![1, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
/// let y = einops.rearrange(x, "h w -> w h", &[]).unwrap();
/// assert_eq!(y.to_vec(), vec![1, 4, 2, 5, 3, 6]);
/// ```
#[derive(Debug, Clone)]
pub struct Einops {
    config: EinopsConfig,
    #[cfg(feature = "std")]
    cache: Option<Arc<RecipeCache>>,
}

impl Default for Einops {
    fn default() -> Self {
        Self::new(EinopsConfig::default())
    }
}

impl Einops {
    /// Creates an executor. With caching enabled it owns a fresh cache of
    /// `config.cache_capacity` entries.
    pub fn new(config: EinopsConfig) -> Self {
        #[cfg(feature = "std")]
        let cache = config
            .use_cache
            .then(|| Arc::new(RecipeCache::new(config.cache_capacity)));
        Self {
            config,
            #[cfg(feature = "std")]
            cache,
        }
    }

    /// Creates an executor sharing an existing cache.
    #[cfg(feature = "std")]
    pub fn with_cache(config: EinopsConfig, cache: Arc<RecipeCache>) -> Self {
        let cache = config.use_cache.then_some(cache);
        Self { config, cache }
    }

    #[inline]
    pub fn config(&self) -> &EinopsConfig {
        &self.config
    }

    /// The cache backing this executor, if any.
    #[cfg(feature = "std")]
    pub fn cache(&self) -> Option<&RecipeCache> {
        self.cache.as_deref()
    }

    /// Compiles `pattern` for `input_shape`, through the cache when enabled.
    pub fn recipe(
        &self,
        pattern: &str,
        input_shape: &[usize],
        provided_axes: &[(&str, usize)],
        kind: TransformKind,
    ) -> EinopsResult<Arc<Recipe>> {
        #[cfg(feature = "std")]
        {
            if let Some(cache) = &self.cache {
                return cache.get_or_compile(pattern, input_shape, provided_axes, kind);
            }
        }
        compile(pattern, input_shape, provided_axes, kind).map(Arc::new)
    }

    /// Compiles and applies `pattern` to `input`.
    pub fn run<E: Element>(
        &self,
        input: TensorStorage<E>,
        pattern: &str,
        provided_axes: &[(&str, usize)],
        kind: TransformKind,
    ) -> EinopsResult<TensorStorage<E>> {
        let recipe = self.recipe(pattern, input.shape(), provided_axes, kind)?;
        execute_recipe(&recipe, input, self.config.validate_inputs)
    }

    /// Reorders, splits and merges axes.
    pub fn rearrange<E: Element>(
        &self,
        input: TensorStorage<E>,
        pattern: &str,
        provided_axes: &[(&str, usize)],
    ) -> EinopsResult<TensorStorage<E>> {
        self.run(input, pattern, provided_axes, TransformKind::Rearrange)
    }

    /// Rearranges and folds the axes missing from the output with `op`.
    pub fn reduce<E: Element>(
        &self,
        input: TensorStorage<E>,
        pattern: &str,
        op: ReductionOp,
        provided_axes: &[(&str, usize)],
    ) -> EinopsResult<TensorStorage<E>> {
        self.run(input, pattern, provided_axes, TransformKind::Reduce(op))
    }

    /// Rearranges and broadcasts new output axes sized by `provided_axes`.
    pub fn repeat<E: Element>(
        &self,
        input: TensorStorage<E>,
        pattern: &str,
        provided_axes: &[(&str, usize)],
    ) -> EinopsResult<TensorStorage<E>> {
        self.run(input, pattern, provided_axes, TransformKind::Repeat)
    }
}

/// Applies a compiled recipe to `input`.
///
/// An identity recipe returns `input` itself. Intermediate tensors never escape:
/// on error nothing but the error is returned.
///
/// # Errors
///
/// [`EinopsError::ShapeError`] if `validate` is set and `input` does not have the
/// shape the recipe was compiled for; any layout error raised by an operation.
pub fn execute_recipe<E: Element>(
    recipe: &Recipe,
    input: TensorStorage<E>,
    validate: bool,
) -> EinopsResult<TensorStorage<E>> {
    if validate && input.shape() != recipe.input_shape() {
        return Err(EinopsError::shape(format!(
            "recipe for '{}' expects input shape {:?}, got {:?}",
            recipe.pattern(),
            recipe.input_shape(),
            input.shape()
        )));
    }

    if recipe.is_identity() {
        tracing::trace!(pattern = %recipe.pattern(), "identity recipe, skipping buffer work");
        return Ok(input);
    }

    let mut tensor = input;
    for operation in recipe.operations() {
        tracing::trace!(%operation, shape = ?tensor.shape(), "apply");
        tensor = tensor.apply(operation)?;
    }

    if tensor.shape() != recipe.output_shape() {
        return Err(EinopsError::layout(format!(
            "recipe for '{}' produced shape {:?}, expected {:?}",
            recipe.pattern(),
            tensor.shape(),
            recipe.output_shape()
        )));
    }

    Ok(tensor)
}

#[cfg(feature = "std")]
fn default_recipe(
    pattern: &str,
    input_shape: &[usize],
    provided_axes: &[(&str, usize)],
    kind: TransformKind,
) -> EinopsResult<Arc<Recipe>> {
    global_cache().get_or_compile(pattern, input_shape, provided_axes, kind)
}

#[cfg(not(feature = "std"))]
fn default_recipe(
    pattern: &str,
    input_shape: &[usize],
    provided_axes: &[(&str, usize)],
    kind: TransformKind,
) -> EinopsResult<Arc<Recipe>> {
    compile(pattern, input_shape, provided_axes, kind).map(Arc::new)
}

fn run_default<E: Element>(
    input: TensorStorage<E>,
    pattern: &str,
    provided_axes: &[(&str, usize)],
    kind: TransformKind,
) -> EinopsResult<TensorStorage<E>> {
    let recipe = default_recipe(pattern, input.shape(), provided_axes, kind)?;
    execute_recipe(&recipe, input, true)
}

/// Rearranges `input` with the process-wide recipe cache.
///
/// # Example
///
/// ```
/// use cubek_einops::layout::TensorStorage;
///
/// let x = TensorStorage::from_vec((0..6).collect(), &[6]).unwrap();
/// let y = cubek_einops::rearrange(x, "(h w) -> h w", &[("h", 2)]).unwrap();
/// assert_eq!(y.shape(), &[2, 3]);
/// ```
pub fn rearrange<E: Element>(
    input: TensorStorage<E>,
    pattern: &str,
    provided_axes: &[(&str, usize)],
) -> EinopsResult<TensorStorage<E>> {
    run_default(input, pattern, provided_axes, TransformKind::Rearrange)
}

/// Reduces `input` with the process-wide recipe cache.
pub fn reduce<E: Element>(
    input: TensorStorage<E>,
    pattern: &str,
    op: ReductionOp,
    provided_axes: &[(&str, usize)],
) -> EinopsResult<TensorStorage<E>> {
    run_default(input, pattern, provided_axes, TransformKind::Reduce(op))
}

/// Repeats `input` with the process-wide recipe cache.
pub fn repeat<E: Element>(
    input: TensorStorage<E>,
    pattern: &str,
    provided_axes: &[(&str, usize)],
) -> EinopsResult<TensorStorage<E>> {
    run_default(input, pattern, provided_axes, TransformKind::Repeat)
}
