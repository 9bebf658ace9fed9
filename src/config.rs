//! Configuration Module
//!
//! Settings record consumed when constructing a cache. Values can be loaded
//! from environment variables or deserialized from a host application's
//! configuration file.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::policy::PolicyKind;

/// Cache configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on estimated bytes held by the cache (required, > 0)
    pub memory_limit: usize,
    /// Maximum number of entries, 0 = unbounded
    pub capacity: usize,
    /// Period of the background expiration sweep, 0 = sweeper disabled
    #[serde(with = "duration_ms", rename = "cleanup_interval_ms")]
    pub cleanup_interval: Duration,
    /// TTL applied to inserts requesting the default, 0 = never expires
    #[serde(with = "duration_ms", rename = "default_expiration_ms")]
    pub default_expiration: Duration,
    /// Eviction policy selector ("fifo"; empty also selects FIFO)
    pub eviction_policy: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MEMORY_LIMIT` - Memory limit in bytes (no default, required)
    /// - `CACHE_CAPACITY` - Maximum entries (default: 0, unbounded)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Sweep period in ms (default: 1000)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in ms (default: 300000)
    /// - `CACHE_EVICTION_POLICY` - Policy selector (default: "fifo")
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_limit: parse_env("CACHE_MEMORY_LIMIT").unwrap_or(0),
            capacity: parse_env("CACHE_CAPACITY").unwrap_or(defaults.capacity),
            cleanup_interval: parse_env("CACHE_CLEANUP_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.cleanup_interval),
            default_expiration: parse_env("CACHE_DEFAULT_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_expiration),
            eviction_policy: env::var("CACHE_EVICTION_POLICY")
                .unwrap_or(defaults.eviction_policy),
        }
    }

    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_default_expiration(mut self, ttl: Duration) -> Self {
        self.default_expiration = ttl;
        self
    }

    pub fn with_eviction_policy(mut self, selector: impl Into<String>) -> Self {
        self.eviction_policy = selector.into();
        self
    }

    // == Validate ==
    /// Checks the settings and resolves the eviction policy selector.
    ///
    /// Fails if the memory limit is unset or the selector is unrecognized.
    pub fn validate(&self) -> Result<PolicyKind> {
        self.validate_limits()?;
        self.eviction_policy.parse()
    }

    /// Checks the size limits only. Used when the caller supplies its own
    /// policy and the selector does not apply.
    pub fn validate_limits(&self) -> Result<()> {
        if self.memory_limit == 0 {
            return Err(CacheError::Config(
                "memory limit is required and must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_limit: 64 * 1024 * 1024,
            capacity: 0,
            cleanup_interval: Duration::from_secs(1),
            default_expiration: Duration::from_secs(300),
            eviction_policy: "fifo".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Serializes a `Duration` as whole milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
