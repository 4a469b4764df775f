//! Redis cache provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;
use fred::types::scan::Scanner;
use futures::TryStreamExt;
use relay_cache::{CacheError, CacheProvider, CacheResult};

use crate::config::{join_key, RedisConfig};
use crate::error::from_redis_error;

/// Redis-based cache provider.
///
/// Every provider owns a key namespace; [`RedisCacheProvider::namespaced`]
/// derives per-connection pools that share one client.
#[derive(Clone)]
pub struct RedisCacheProvider {
    client: Client,
    namespace: String,
}

impl RedisCacheProvider {
    /// Creates a new Redis cache provider and connects it.
    ///
    /// ## Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn new(config: RedisConfig) -> CacheResult<Self> {
        let redis_config = Config::from_url(&config.connection_url())
            .map_err(|e| CacheError::Configuration(e.to_string()))?;

        let client = Client::new(
            redis_config,
            None,
            None,
            Some(ReconnectPolicy::new_exponential(0, 1000, 30_000, 2)),
        );

        client.init().await.map_err(from_redis_error)?;
        tracing::info!(host = %config.host, port = config.port, "connected to redis cache");

        Ok(Self {
            client,
            namespace: config.key_prefix,
        })
    }

    /// Returns a provider that shares this client but stores its keys
    /// under `<namespace>:<name>`.
    #[must_use]
    pub fn namespaced(&self, name: &str) -> Self {
        Self {
            client: self.client.clone(),
            namespace: join_key(&self.namespace, name),
        }
    }

    fn key(&self, key: &str) -> String {
        join_key(&self.namespace, key)
    }

    /// Collects keys from a scan pattern.
    async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut scanner = self.client.scan(pattern, None, None);
        let mut keys = Vec::new();

        while let Some(result) = scanner.try_next().await.map_err(from_redis_error)? {
            if let Some(page) = result.results() {
                for value in page {
                    if let Some(s) = value.as_str() {
                        keys.push(s.to_string());
                    }
                }
            }
        }

        Ok(keys)
    }
}

/// Safely convert seconds to i64 for Redis expiration.
#[allow(clippy::cast_possible_wrap)]
const fn seconds_to_i64(seconds: u64) -> i64 {
    seconds as i64
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>> {
        let key = self.key(key);
        self.client.get(&key).await.map_err(from_redis_error)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let key = self.key(key);
        let expiration = ttl.map(|d| Expiration::EX(seconds_to_i64(d.as_secs().max(1))));

        self.client
            .set::<(), _, _>(&key, value, expiration, None, false)
            .await
            .map_err(from_redis_error)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let key = self.key(key);
        self.client
            .del::<(), _>(&key)
            .await
            .map_err(from_redis_error)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let key = self.key(key);
        let count: i64 = self.client.exists(&key).await.map_err(from_redis_error)?;
        Ok(count > 0)
    }

    async fn clear(&self) -> CacheResult<()> {
        let keys = self.scan_keys(&self.key("*")).await?;
        if keys.is_empty() {
            return Ok(());
        }

        tracing::debug!(namespace = %self.namespace, count = keys.len(), "clearing redis cache namespace");
        self.client
            .del::<(), _>(keys)
            .await
            .map_err(from_redis_error)
    }
}

impl std::fmt::Debug for RedisCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheProvider")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}
