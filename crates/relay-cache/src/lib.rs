//! # relay-cache
//!
//! Cache abstraction for the relay directory connector.
//!
//! Directory connections keep query results in a [`CacheProvider`] for the
//! configured TTL. The trait is object safe so each connection can be handed
//! its own pool as an `Arc<dyn CacheProvider>`; typed access goes through
//! [`CacheProviderExt`].
//!
//! ## Implementations
//!
//! - [`MemoryCacheProvider`] - in-process map, used by default and in tests
//! - `relay-cache-redis` - shared Redis-backed pool for multi-process deployments
//!
//! ## Example
//!
//! ```ignore
//! use relay_cache::{CacheProviderExt, MemoryCacheProvider};
//! use std::time::Duration;
//!
//! async fn remember(cache: &MemoryCacheProvider) -> relay_cache::CacheResult<()> {
//!     cache.set_json("users:page:1", &vec!["alice", "bob"], Some(Duration::from_secs(60))).await
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod provider;

pub use error::{CacheError, CacheResult};
pub use memory::MemoryCacheProvider;
pub use provider::{CacheProvider, CacheProviderExt};
