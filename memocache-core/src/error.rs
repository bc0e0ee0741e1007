//! Error types for memocache.
//!
//! Only the cache's own failures live here. Errors produced by the caller's
//! producer futures are never wrapped: they reach every waiter unchanged.

use thiserror::Error;

/// Result type alias using `CacheError`.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors raised by the cache itself.
#[derive(Debug, Error)]
pub enum CacheError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CONSTRUCTION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// TTL is zero or negative.
    #[error("TTL must be a positive number of milliseconds, got {ttl_ms}")]
    InvalidTtl {
        /// The rejected TTL
        ttl_ms: i64,
    },

    /// The cache was built outside a tokio runtime, so the sweep cannot be scheduled.
    #[error("No tokio runtime available to schedule the expiry sweep")]
    NoRuntime,

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CacheError {
    /// Returns true if the error comes from configuration rather than the environment.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CacheError::InvalidTtl { .. } | CacheError::JsonError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::InvalidTtl { ttl_ms: -1 };
        assert!(err.to_string().contains("-1"));
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CacheError::InvalidTtl { ttl_ms: 0 }.is_config_error());
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(CacheError::from(json_err).is_config_error());
        assert!(!CacheError::NoRuntime.is_config_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let cache_result: Result<serde_json::Value> = json_result.map_err(CacheError::from);
        assert!(matches!(cache_result, Err(CacheError::JsonError(_))));
    }
}
