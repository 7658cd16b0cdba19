//! Configuration for the chat store.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

/// Default for notification batching.
pub const DEFAULT_BATCHING: bool = true;

/// Default selector cache capacity.
pub const DEFAULT_SELECTOR_MAX_ENTRIES: usize = 256;

/// Default number of generations a selector entry may sit unused.
pub const DEFAULT_SELECTOR_MAX_IDLE_GENERATIONS: u64 = 64;

/// Main store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Coalesce notifications per scheduling tick. When false every mutation
    /// notifies synchronously.
    #[serde(default = "default_batching")]
    pub batching: bool,
    /// How hydration snapshots interact with already committed messages.
    #[serde(default)]
    pub hydration: HydrationPolicy,
    /// Selector cache bounds.
    #[serde(default)]
    pub selector: SelectorConfig,
}

/// Rules for `hydrate` when the store already holds messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationPolicy {
    /// Keep the current messages when the incoming snapshot is empty.
    #[serde(default = "default_true")]
    pub preserve_on_empty: bool,
    /// Keep the current messages when the incoming snapshot is non-empty but
    /// shorter than what is already committed.
    #[serde(default)]
    pub preserve_on_shorter: bool,
}

/// Bounds for the selector cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Maximum number of cached selector entries.
    #[serde(default = "default_selector_max_entries")]
    pub max_entries: usize,
    /// Entries untouched for more than this many generations are dropped on
    /// flush. `None` disables idle eviction.
    #[serde(default = "default_selector_max_idle_generations")]
    pub max_idle_generations: Option<u64>,
}

fn default_batching() -> bool {
    DEFAULT_BATCHING
}

fn default_true() -> bool {
    true
}

fn default_selector_max_entries() -> usize {
    DEFAULT_SELECTOR_MAX_ENTRIES
}

fn default_selector_max_idle_generations() -> Option<u64> {
    Some(DEFAULT_SELECTOR_MAX_IDLE_GENERATIONS)
}

impl Default for HydrationPolicy {
    fn default() -> Self {
        Self {
            preserve_on_empty: true,
            preserve_on_shorter: false,
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_SELECTOR_MAX_ENTRIES,
            max_idle_generations: Some(DEFAULT_SELECTOR_MAX_IDLE_GENERATIONS),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            batching: DEFAULT_BATCHING,
            hydration: HydrationPolicy::default(),
            selector: SelectorConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Create a new config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Config with batching turned off; every mutation notifies inline.
    pub fn unbatched() -> Self {
        Self {
            batching: false,
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file, then apply environment overrides.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StoreConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Rejects values the store cannot run with.
    pub fn validate(&self) -> StoreResult<()> {
        if self.selector.max_entries == 0 {
            return Err(StoreError::Config(
                "selector.max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(value) = std::env::var("CHAT_STORE_BATCHING") {
            match value.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" => self.batching = false,
                "1" | "true" | "on" => self.batching = true,
                other => tracing::warn!(value = other, "ignoring invalid CHAT_STORE_BATCHING"),
            }
        }
        if let Ok(value) = std::env::var("CHAT_STORE_SELECTOR_MAX_ENTRIES") {
            match value.parse::<usize>() {
                Ok(max) if max > 0 => self.selector.max_entries = max,
                _ => tracing::warn!(value = %value, "ignoring invalid CHAT_STORE_SELECTOR_MAX_ENTRIES"),
            }
        }
    }
}
