//! Recipe caching.
//!
//! Compiling a pattern (scan, parse, resolve, plan) is cheap but not free, and
//! the same `(pattern, shape, axes)` triple tends to recur on every forward
//! pass. [`RecipeCache`] memoizes compiled [`Recipe`]s behind a single mutex.
//!
//! Eviction is by insertion order: when the cache is full the oldest inserted
//! entry goes, however often it has been hit.
//!
//! Failed compilations are never stored. A shape error for one input says
//! nothing about the next input.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::error::EinopsResult;
use crate::launch::DEFAULT_CACHE_CAPACITY;
use crate::notation::TransformKind;
use crate::planning::{Recipe, compile};

/// Structural cache key: pattern text, input shape, provided axis sizes and
/// transform kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pattern: String,
    input_shape: Vec<usize>,
    /// Sorted by name so that argument order does not matter.
    provided_axes: Vec<(String, usize)>,
    kind: TransformKind,
}

impl CacheKey {
    pub fn new(
        pattern: &str,
        input_shape: &[usize],
        provided_axes: &[(&str, usize)],
        kind: TransformKind,
    ) -> Self {
        let mut provided_axes: Vec<(String, usize)> = provided_axes
            .iter()
            .map(|&(name, size)| (String::from(name), size))
            .collect();
        provided_axes.sort();
        provided_axes.dedup();
        Self {
            pattern: String::from(pattern),
            input_shape: input_shape.to_vec(),
            provided_axes,
            kind,
        }
    }

    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[inline]
    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    #[inline]
    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    fn provided_refs(&self) -> Vec<(&str, usize)> {
        self.provided_axes
            .iter()
            .map(|(name, size)| (name.as_str(), *size))
            .collect()
    }
}

/// A cached recipe with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: CacheKey,
    recipe: Arc<Recipe>,
    created_at: Instant,
    /// 1 on insertion, +1 per hit.
    access_count: u64,
}

impl CacheEntry {
    #[inline]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    #[inline]
    pub fn recipe(&self) -> &Arc<Recipe> {
        &self.recipe
    }

    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    #[inline]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Snapshot of cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    /// Live entries.
    pub size: usize,
    pub capacity: usize,
    /// Sum of `access_count` over live entries.
    pub total_accesses: u64,
    /// `(total_accesses - size) / total_accesses`, or 0 when empty.
    pub hit_ratio: f64,
    /// Entries dropped to make room since creation or the last `clear`.
    pub evictions: u64,
}

struct CacheInner {
    capacity: usize,
    entries: HashMap<CacheKey, CacheEntry>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<CacheKey>,
    evictions: u64,
}

impl CacheInner {
    fn hit(&mut self, key: &CacheKey) -> Option<Arc<Recipe>> {
        let entry = self.entries.get_mut(key)?;
        entry.access_count += 1;
        Some(Arc::clone(&entry.recipe))
    }

    fn insert(&mut self, key: CacheKey, recipe: Recipe) -> Arc<Recipe> {
        // Another caller may have compiled the same key while the lock was free.
        if let Some(existing) = self.hit(&key) {
            return existing;
        }

        let recipe = Arc::new(recipe);
        self.order.push_back(key.clone());
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                recipe: Arc::clone(&recipe),
                created_at: Instant::now(),
                access_count: 1,
            },
        );

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if self.entries.remove(&oldest).is_some() {
                self.evictions += 1;
                tracing::debug!(pattern = oldest.pattern(), shape = ?oldest.input_shape(), "recipe cache evict");
            }
        }

        recipe
    }
}

/// Thread-safe recipe cache with insertion-order eviction.
///
/// # Example
///
/// ```
/// use cubek_einops::cache::RecipeCache;
/// use cubek_einops::notation::TransformKind;
///
/// let cache = RecipeCache::new(16);
/// for _ in 0..4 {
///     let recipe = cache
///         .get_or_compile("b c -> c b", &[2, 3], &[], TransformKind::Rearrange)
///         .unwrap();
///     assert_eq!(recipe.output_shape(), &[3, 2]);
/// }
/// assert_eq!(cache.stats().hit_ratio, 0.75);
/// ```
pub struct RecipeCache {
    inner: Mutex<CacheInner>,
}

impl RecipeCache {
    /// Creates a cache holding at most `capacity` recipes (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                capacity: capacity.max(1),
                entries: HashMap::new(),
                order: VecDeque::new(),
                evictions: 0,
            }),
        }
    }

    /// Looks up a recipe, counting a hit.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Recipe>> {
        let recipe = self.inner.lock().hit(key);
        match &recipe {
            Some(_) => tracing::debug!(pattern = key.pattern(), shape = ?key.input_shape(), "recipe cache hit"),
            None => tracing::debug!(pattern = key.pattern(), shape = ?key.input_shape(), "recipe cache miss"),
        }
        recipe
    }

    /// Stores a freshly compiled recipe, evicting the oldest entry when full.
    ///
    /// If the key is already present the stored recipe is kept, counted as a
    /// hit, and returned.
    pub fn insert(&self, key: CacheKey, recipe: Recipe) -> Arc<Recipe> {
        self.inner.lock().insert(key, recipe)
    }

    /// Returns the cached recipe for `key`, or runs `compile` and caches its
    /// success. The lock is not held while compiling.
    pub fn get_or_insert_with<F>(&self, key: CacheKey, compile: F) -> EinopsResult<Arc<Recipe>>
    where
        F: FnOnce() -> EinopsResult<Recipe>,
    {
        if let Some(recipe) = self.get(&key) {
            return Ok(recipe);
        }
        let recipe = compile()?;
        Ok(self.insert(key, recipe))
    }

    /// Compiles through the cache.
    pub fn get_or_compile(
        &self,
        pattern: &str,
        input_shape: &[usize],
        provided_axes: &[(&str, usize)],
        kind: TransformKind,
    ) -> EinopsResult<Arc<Recipe>> {
        let key = CacheKey::new(pattern, input_shape, provided_axes, kind);
        let compile_key = key.clone();
        self.get_or_insert_with(key, move || {
            compile(
                compile_key.pattern(),
                compile_key.input_shape(),
                &compile_key.provided_refs(),
                compile_key.kind(),
            )
        })
    }

    /// Returns a copy of the entry for `key` without counting a hit.
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.lock().entries.get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Drops every entry and resets the eviction counter.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        inner.evictions = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let size = inner.entries.len();
        let total_accesses: u64 = inner.entries.values().map(|e| e.access_count).sum();
        let hit_ratio = if total_accesses == 0 {
            0.0
        } else {
            (total_accesses - size as u64) as f64 / total_accesses as f64
        };
        CacheStats {
            size,
            capacity: inner.capacity,
            total_accesses,
            hit_ratio,
            evictions: inner.evictions,
        }
    }
}

impl Default for RecipeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl core::fmt::Debug for RecipeCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecipeCache").field("stats", &self.stats()).finish()
    }
}

/// Process-wide cache used by the free functions in [`crate::launch`].
pub fn global_cache() -> &'static RecipeCache {
    static GLOBAL: OnceLock<RecipeCache> = OnceLock::new();
    GLOBAL.get_or_init(RecipeCache::default)
}
