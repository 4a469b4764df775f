//! # relay-cache-redis
//!
//! Redis cache implementation for the relay directory connector.
//!
//! Implements [`relay_cache::CacheProvider`] with the `fred` client so that
//! several connector processes share one query cache. Each directory
//! connection gets its own key namespace via
//! [`RedisCacheProvider::namespaced`].
//!
//! ## Example
//!
//! ```ignore
//! use relay_cache_redis::{RedisCacheProvider, RedisConfig};
//!
//! let config: RedisConfig = toml::from_str(r#"host = "cache""#)?;
//! let shared = RedisCacheProvider::new(config).await?;
//! let people = shared.namespaced("people");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod provider;

pub use config::RedisConfig;
pub use provider::RedisCacheProvider;
