//! Configuration for einops execution.

/// Default number of recipes kept by a [`RecipeCache`](crate::cache::RecipeCache).
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Configuration options for einops execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EinopsConfig {
    /// Whether compiled recipes are memoized. Ignored without the `std` feature.
    pub use_cache: bool,
    /// Maximum number of recipes kept by an executor-owned cache.
    pub cache_capacity: usize,
    /// Whether to check the input tensor's shape against the recipe before
    /// executing.
    pub validate_inputs: bool,
}

impl Default for EinopsConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            validate_inputs: true,
        }
    }
}

impl EinopsConfig {
    /// Creates a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables recipe caching.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    /// Sets the capacity of the executor-owned cache.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Enables or disables input shape validation.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_inputs = enabled;
        self
    }

    /// Creates a config optimized for speed (cached, no input validation).
    pub fn fast() -> Self {
        Self {
            use_cache: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            validate_inputs: false,
        }
    }

    /// Creates a config that recompiles every call.
    pub fn uncached() -> Self {
        Self {
            use_cache: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            validate_inputs: true,
        }
    }
}
