//! Memoized derivations over store state.
//!
//! Entries are keyed by a caller-chosen string and guarded by a fingerprint:
//! the ordered dependency values passed on each call. A matching fingerprint
//! returns the cached `Arc` without running the derivation. When the
//! derivation does run and [`EqualityMode::Deep`] is in effect, a result equal
//! to the cached one keeps the cached `Arc`, so consumers comparing by pointer
//! see no change.
//!
//! The key, not the derivation, identifies an entry. Reusing a key with a
//! different derivation and identical deps returns the earlier result.
//!
//! Entries live in an [`LruCache`]: a hit promotes the entry, and inserts
//! beyond `max_entries` pop the least recently used one. Entries idle for
//! more than `max_idle_generations` are swept separately on flush.

use std::any::Any;
use std::sync::Arc;

use lru::LruCache;
use serde_json::Value;

use crate::config::SelectorConfig;

/// How a freshly derived value is compared against the cached one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EqualityMode {
    /// Always publish the new value.
    Reference,
    /// Keep the cached `Arc` when the new value is equal to it.
    #[default]
    Deep,
}

/// Per-call selector options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectOptions {
    pub equality: EqualityMode,
}

impl SelectOptions {
    pub fn reference() -> Self {
        Self {
            equality: EqualityMode::Reference,
        }
    }

    pub fn deep() -> Self {
        Self {
            equality: EqualityMode::Deep,
        }
    }
}

/// Hit/miss counters, mostly for tests and debugging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectorStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Entry {
    fingerprint: Vec<Value>,
    value: Arc<dyn Any + Send + Sync>,
    touched_generation: u64,
}

/// Size-bounded cache of derived values, keyed by selector name.
pub struct SelectorCache {
    entries: LruCache<String, Entry>,
    config: SelectorConfig,
    stats: SelectorStats,
}

impl SelectorCache {
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            entries: LruCache::unbounded(),
            config,
            stats: SelectorStats::default(),
        }
    }

    /// Returns the cached value for `key` if `deps` match its fingerprint.
    ///
    /// Only a hit promotes the entry; a fingerprint or type mismatch leaves
    /// its recency alone.
    pub fn lookup<T>(&mut self, key: &str, deps: &[Value], generation: u64) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let matches = self
            .entries
            .peek(key)
            .map(|entry| entry.fingerprint.as_slice() == deps && entry.value.is::<T>())
            .unwrap_or(false);

        let hit = if matches {
            self.entries.get_mut(key).and_then(|entry| {
                entry.touched_generation = generation;
                Arc::clone(&entry.value).downcast::<T>().ok()
            })
        } else {
            None
        };

        match hit {
            Some(_) => self.stats.hits += 1,
            None => self.stats.misses += 1,
        }
        hit
    }

    /// Records a freshly derived value under `key` and returns the `Arc` that
    /// consumers should hold.
    pub fn store<T>(
        &mut self,
        key: &str,
        deps: &[Value],
        generation: u64,
        options: SelectOptions,
        value: T,
    ) -> Arc<T>
    where
        T: PartialEq + Send + Sync + 'static,
    {
        let previous = self
            .entries
            .peek(key)
            .and_then(|entry| Arc::clone(&entry.value).downcast::<T>().ok());

        let published = match previous {
            Some(previous) if options.equality == EqualityMode::Deep && *previous == value => {
                previous
            }
            _ => Arc::new(value),
        };

        let erased: Arc<dyn Any + Send + Sync> = published.clone();
        self.entries.put(
            key.to_string(),
            Entry {
                fingerprint: deps.to_vec(),
                value: erased,
                touched_generation: generation,
            },
        );
        self.enforce_capacity();
        published
    }

    /// Lookup, then derive and store on a miss.
    ///
    /// A failing derivation leaves the cache exactly as it was.
    pub fn select<T, E, F>(
        &mut self,
        key: &str,
        deps: &[Value],
        generation: u64,
        options: SelectOptions,
        derive: F,
    ) -> Result<Arc<T>, E>
    where
        T: PartialEq + Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(cached) = self.lookup::<T>(key, deps, generation) {
            return Ok(cached);
        }
        let value = derive()?;
        Ok(self.store(key, deps, generation, options, value))
    }

    /// Drops entries not touched within the configured number of generations.
    pub fn evict_idle(&mut self, generation: u64) -> usize {
        let Some(max_idle) = self.config.max_idle_generations else {
            return 0;
        };
        let idle: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| generation.saturating_sub(entry.touched_generation) > max_idle)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &idle {
            self.entries.pop(key.as_str());
        }
        self.stats.evictions += idle.len() as u64;
        idle.len()
    }

    /// The entry just stored is the most recently used, so it is never the
    /// one popped.
    fn enforce_capacity(&mut self) {
        while self.entries.len() > self.config.max_entries.max(1) {
            if self.entries.pop_lru().is_none() {
                break;
            }
            self.stats.evictions += 1;
        }
    }

    /// Drops the entry for `key`. Returns whether one existed.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.pop(key).is_some()
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether `key` has an entry. Does not count as a use.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit, miss and eviction counters since the cache was created.
    pub fn stats(&self) -> SelectorStats {
        self.stats
    }
}

impl std::fmt::Debug for SelectorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorCache")
            .field("entries", &self.entries.len())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}
