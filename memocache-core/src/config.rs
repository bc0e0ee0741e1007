//! Cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{sweep_interval_for, DEFAULT_TTL_MS};
use crate::error::{CacheError, Result};

/// Cache configuration.
///
/// `ttl_ms` is signed so that a negative value coming from a config document is
/// reported as [`CacheError::InvalidTtl`] instead of a parse failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live of a resolved value, in milliseconds
    pub ttl_ms: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
        }
    }
}

impl CacheConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self
    }

    /// Parses a configuration from JSON.
    ///
    /// The TTL is checked later, by [`validate`](Self::validate) or when a cache is built.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Checks that the TTL is strictly positive.
    pub fn validate(&self) -> Result<()> {
        if self.ttl_ms <= 0 {
            return Err(CacheError::InvalidTtl {
                ttl_ms: self.ttl_ms,
            });
        }
        Ok(())
    }

    /// Returns the validated TTL.
    pub fn ttl(&self) -> Result<Duration> {
        self.validate()?;
        Ok(Duration::from_millis(self.ttl_ms as u64))
    }

    /// Returns the sweep period derived from the TTL.
    pub fn sweep_interval(&self) -> Result<Duration> {
        self.ttl().map(sweep_interval_for)
    }
}
