//! Cache provider traits.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::CacheResult;

/// Cache provider trait for key-value caching.
///
/// Implementations must be thread-safe and support concurrent access.
/// Values are stored as serialized strings so the trait stays object safe;
/// use [`CacheProviderExt`] for typed access.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Gets a raw value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>>;

    /// Sets a raw value in the cache with optional TTL.
    ///
    /// If `ttl` is `None`, the value will not expire automatically.
    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()>;

    /// Deletes a value from the cache.
    ///
    /// Returns `Ok(())` even if the key doesn't exist.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Checks if a key exists in the cache.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Clears all keys owned by this cache.
    async fn clear(&self) -> CacheResult<()>;
}

/// Typed helpers on top of [`CacheProvider`], encoding values as JSON.
#[async_trait]
pub trait CacheProviderExt: CacheProvider {
    /// Gets and decodes a value from the cache.
    async fn get_json<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encodes and stores a value in the cache.
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()>
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw, ttl).await
    }
}

impl<C: CacheProvider + ?Sized> CacheProviderExt for C {}
