//! Browser configuration.
//!
//! A handful of knobs built in-process from command-line flags. There is no
//! config file; every field has a default that matches the classic filmstrip
//! layout.
//!
//! ## Fields
//!
//! | Field | Default | Meaning |
//! |---|---|---|
//! | `thumbnail_width` | 120 | Maximum thumbnail width in pixels |
//! | `cache_capacity` | 100 | Entries per cache size class |
//! | `max_workers` | cores | Decode worker threads, capped to cores |
//!
//! The CLI never deserializes this struct. The serde derives are for
//! embedding callers that keep browser settings in their own config: values
//! deserialize with `#[serde(default)]`, so a partial object fills the rest
//! from defaults, and unknown keys are rejected.

use crate::cache::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default thumbnail width in pixels.
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 120;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserConfig {
    /// Thumbnails are decoded no wider than this.
    pub thumbnail_width: u32,
    /// Bound on each cache pool.
    pub cache_capacity: usize,
    /// Maximum number of parallel decode workers.
    ///
    /// When absent, defaults to the number of CPU cores. Values larger
    /// than the core count are clamped down.
    pub max_workers: Option<usize>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            thumbnail_width: DEFAULT_THUMBNAIL_WIDTH,
            cache_capacity: DEFAULT_CAPACITY,
            max_workers: None,
        }
    }
}

impl BrowserConfig {
    /// Reject values the browser can't run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnail_width == 0 {
            return Err(ConfigError::Validation(
                "thumbnail_width must be greater than 0".into(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Validation(
                "cache_capacity must be greater than 0".into(),
            ));
        }
        if self.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "max_workers must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Resolve the effective worker thread count.
///
/// Returns the user-configured count, capped to available cores.
/// Without a setting, every core is used.
pub fn effective_threads(config: &BrowserConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_workers.map(|n| n.min(cores)).unwrap_or(cores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_layout() {
        let config = BrowserConfig::default();
        assert_eq!(config.thumbnail_width, 120);
        assert_eq!(config.cache_capacity, 100);
        assert_eq!(config.max_workers, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_width() {
        let config = BrowserConfig {
            thumbnail_width: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("thumbnail_width"));
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let config = BrowserConfig {
            cache_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = BrowserConfig {
            max_workers: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: BrowserConfig = serde_json::from_str(r#"{"thumbnail_width": 200}"#).unwrap();
        assert_eq!(config.thumbnail_width, 200);
        assert_eq!(config.cache_capacity, 100);
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<BrowserConfig, _> = serde_json::from_str(r#"{"thumb_width": 200}"#);
        assert!(result.is_err());
    }

    // =========================================================================
    // effective_threads
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&BrowserConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = BrowserConfig {
            max_workers: Some(99_999),
            ..Default::default()
        };
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = BrowserConfig {
            max_workers: Some(1),
            ..Default::default()
        };
        assert_eq!(effective_threads(&config), 1);
    }
}
