//! Configuration for the artifact controller.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ArtifactError, ArtifactResult};

/// Default inactivity timeout for a streaming artifact.
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Default period of the timeout watchdog.
pub const DEFAULT_WATCHDOG_INTERVAL_MS: u64 = 1_000;

/// Artifact controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// An artifact with no update for this long is timed out by
    /// `poll_timeouts`. `None` disables timeouts.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: Option<u64>,
    /// How often the watchdog polls for timeouts.
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,
}

fn default_timeout_ms() -> Option<u64> {
    Some(DEFAULT_TIMEOUT_MS)
}

fn default_watchdog_interval_ms() -> u64 {
    DEFAULT_WATCHDOG_INTERVAL_MS
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            watchdog_interval_ms: DEFAULT_WATCHDOG_INTERVAL_MS,
        }
    }
}

impl ArtifactConfig {
    /// Create a new config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Config without timeouts.
    pub fn without_timeout() -> Self {
        Self {
            timeout_ms: None,
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file, then apply environment overrides.
    pub fn load(path: &Path) -> ArtifactResult<Self> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ArtifactResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ArtifactConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ArtifactResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> ArtifactResult<()> {
        if self.watchdog_interval_ms == 0 {
            return Err(ArtifactError::Config(
                "watchdog_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == Some(0) {
            return Err(ArtifactError::Config(
                "timeout_ms must be at least 1; use null to disable".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms.max(1))
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(value) = std::env::var("ARTIFACT_TIMEOUT_MS") {
            match value.as_str() {
                "" | "0" | "off" | "none" => self.timeout_ms = None,
                other => match other.parse::<u64>() {
                    Ok(ms) => self.timeout_ms = Some(ms),
                    Err(_) => tracing::warn!(value = other, "ignoring invalid ARTIFACT_TIMEOUT_MS"),
                },
            }
        }
    }
}
