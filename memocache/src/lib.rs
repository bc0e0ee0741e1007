//! # memocache
//!
//! Time-bounded memoization for async lookups keyed by string.
//!
//! - **Coalescing**: concurrent lookups for a key share one producer invocation
//! - **TTL**: resolved values are served from memory until they expire
//! - **Retention policy**: failures, and values the policy refuses, are never cached
//! - **Sweep**: a per-cache background task reclaims expired entries
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use memocache::AsyncMemCache;
//!
//! # #[tokio::main]
//! # async fn main() -> memocache::Result<()> {
//! let cache: AsyncMemCache<String, String> = AsyncMemCache::new(Duration::from_secs(30))?;
//!
//! let first = cache.get("greeting", || async { Ok("hello".to_string()) }).await;
//! let second = cache.get("greeting", || async { Ok("ignored".to_string()) }).await;
//! assert_eq!(first, second);
//!
//! cache.destroy();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;

pub use cache::{AsyncMemCache, CacheHandle, CacheStats};
pub use memocache_core::{
    AlwaysRetain, CacheConfig, CacheError, Result, RetentionPolicy, SWEEP_INTERVAL_MULTIPLIER,
};
