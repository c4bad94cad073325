//! Runtime configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.

use chrono::Duration;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::{
    DEFAULT_CACHE_TTL_HOURS, DEFAULT_CARD_GRACE_MS, DEFAULT_DEBOUNCE_MS, DEFAULT_EVICTION_BATCH,
    DEFAULT_INITIAL_SCAN_MS, DEFAULT_KEY_PREFIX,
};

/// Longest accepted cache lifetime, in hours (one year)
pub const MAX_CACHE_TTL_HOURS: i64 = 24 * 366;

/// Longest accepted scheduling delay, in milliseconds (one hour)
pub const MAX_DELAY_MS: i64 = 60 * 60 * 1000;

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SussConfig {
    /// Hours a cached rating stays valid
    pub cache_ttl_hours: i64,
    /// Rows dropped when the store rejects a write
    pub eviction_batch: usize,
    /// Markup-change burst window, in milliseconds
    pub debounce_ms: i64,
    /// Wait before reading a profile card, in milliseconds
    pub card_grace_ms: i64,
    /// Wait before the first username scan, in milliseconds
    pub initial_scan_ms: i64,
    /// Key namespace inside the persisted store
    pub key_prefix: String,
    /// Byte cap on the persisted store
    pub store_quota_bytes: Option<usize>,
}

impl Default for SussConfig {
    fn default() -> Self {
        Self {
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS,
            eviction_batch: DEFAULT_EVICTION_BATCH,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            card_grace_ms: DEFAULT_CARD_GRACE_MS,
            initial_scan_ms: DEFAULT_INITIAL_SCAN_MS,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            store_quota_bytes: None,
        }
    }
}

impl SussConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CACHE_TTL_HOURS).contains(&self.cache_ttl_hours) {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_hours",
                reason: format!("must be between 1 and {}", MAX_CACHE_TTL_HOURS),
            });
        }
        for (field, value) in [
            ("debounce_ms", self.debounce_ms),
            ("card_grace_ms", self.card_grace_ms),
            ("initial_scan_ms", self.initial_scan_ms),
        ] {
            if !(0..=MAX_DELAY_MS).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be between 0 and {}", MAX_DELAY_MS),
                });
            }
        }
        if self.key_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "key_prefix",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    // Accessors clamp into the validated ranges; fields are public and may
    // be set without going through `validate`.

    pub fn cache_ttl(&self) -> Duration {
        Duration::hours(self.cache_ttl_hours.clamp(1, MAX_CACHE_TTL_HOURS))
    }

    pub fn debounce(&self) -> Duration {
        delay(self.debounce_ms)
    }

    pub fn card_grace(&self) -> Duration {
        delay(self.card_grace_ms)
    }

    pub fn initial_scan(&self) -> Duration {
        delay(self.initial_scan_ms)
    }
}

fn delay(ms: i64) -> Duration {
    Duration::milliseconds(ms.clamp(0, MAX_DELAY_MS))
}
