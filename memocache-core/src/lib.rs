//! # memocache core
//!
//! Shared building blocks for the memocache crates:
//!
//! - **Errors**: construction and configuration failures
//! - **Constants**: sweep cadence and configuration defaults
//! - **Config**: serializable cache configuration with validation
//! - **Traits**: the retention policy deciding which values are worth keeping
//!
//! ## Example
//!
//! ```rust
//! use memocache_core::{CacheConfig, CacheError};
//!
//! let config = CacheConfig::from_json(r#"{ "ttl_ms": 0 }"#).unwrap();
//! assert!(matches!(config.validate(), Err(CacheError::InvalidTtl { ttl_ms: 0 })));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod traits;

// Re-export commonly used items at crate root
pub use config::CacheConfig;
pub use constants::*;
pub use error::{CacheError, Result};
pub use traits::{AlwaysRetain, RetentionPolicy};
