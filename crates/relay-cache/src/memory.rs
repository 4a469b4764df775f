//! In-process cache provider.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::CacheResult;
use crate::provider::CacheProvider;

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Cache provider backed by a concurrent in-process map.
///
/// Expired entries are dropped lazily on access. Suitable for a single
/// process; use the Redis provider when several workers share results.
#[derive(Debug, Default)]
pub struct MemoryCacheProvider {
    slots: DashMap<String, Slot>,
    default_ttl: Option<Duration>,
}

impl MemoryCacheProvider {
    /// Creates an empty cache without a default lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache whose entries expire after `ttl` unless a
    /// write specifies its own lifetime.
    #[must_use]
    pub fn with_default_ttl(ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            default_ttl: Some(ttl),
        }
    }

    /// Number of stored entries, including ones that expired but were not
    /// yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let hit = self
            .slots
            .get(key)
            .map(|slot| (slot.is_live(now), slot.value.clone()));

        match hit {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                self.slots.remove_if(key, |_, slot| !slot.is_live(now));
                tracing::trace!(key, "evicted expired cache entry");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let expires_at = ttl.or(self.default_ttl).map(|ttl| Instant::now() + ttl);
        self.slots
            .insert(key.to_string(), Slot { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.slots.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get_raw(key).await?.is_some())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.slots.clear();
        Ok(())
    }
}
