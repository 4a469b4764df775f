//! Query result caching.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_cache::{CacheError, CacheProvider, CacheResult};
use relay_ldap::{EntriesOptions, LdapConnection};

use crate::common::{config, people, TestEnv};

/// Tests that identical queries within the TTL hit the directory once.
#[tokio::test]
async fn test_identical_queries_are_cached() -> anyhow::Result<()> {
    let env = TestEnv::cached(people(5), 60);

    let first = env.connection.get_entries(1, 2, &EntriesOptions::new()).await?;
    let second = env.connection.get_entries(1, 2, &EntriesOptions::new()).await?;
    assert_eq!(first, second);
    assert_eq!(env.directory.searches(), 1);

    env.connection.get_entries(2, 2, &EntriesOptions::new()).await?;
    assert_eq!(env.directory.searches(), 2);

    env.connection.get_entry_by_attribute("cn", "user3").await?;
    env.connection.get_entry_by_attribute("cn", "user3").await?;
    assert_eq!(env.directory.searches(), 3);
    Ok(())
}

/// Tests that a query after expiry goes back to the directory.
#[tokio::test]
async fn test_expired_results_are_refetched() -> anyhow::Result<()> {
    let env = TestEnv::cached(people(5), 1);

    env.connection.check_connection().await?;
    env.connection.check_connection().await?;
    assert_eq!(env.directory.searches(), 1);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    env.connection.check_connection().await?;
    assert_eq!(env.directory.searches(), 2);
    Ok(())
}

/// Tests that a zero TTL bypasses the cache.
#[tokio::test]
async fn test_zero_ttl_bypasses_cache() -> anyhow::Result<()> {
    let env = TestEnv::cached(people(5), 0);

    env.connection.get_entries(1, 2, &EntriesOptions::new()).await?;
    env.connection.get_entries(1, 2, &EntriesOptions::new()).await?;
    assert_eq!(env.directory.searches(), 2);
    assert!(env.cache.as_ref().is_some_and(|c| c.is_empty()));
    Ok(())
}

/// Tests that a not-found lookup is not turned into an error by the cache.
#[tokio::test]
async fn test_cached_not_found() -> anyhow::Result<()> {
    let env = TestEnv::cached(people(1), 60);

    for _ in 0..2 {
        let err = env
            .connection
            .get_entry_by_attribute("cn", "nobody")
            .await
            .unwrap_err();
        assert_eq!(err.code(), 2);
    }
    assert_eq!(env.directory.searches(), 1);
    Ok(())
}

struct BrokenCache;

#[async_trait]
impl CacheProvider for BrokenCache {
    async fn get_raw(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Connection("down".into()))
    }

    async fn set_raw(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> CacheResult<()> {
        Err(CacheError::Connection("down".into()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    async fn clear(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Tests that cache failures fall back to the directory.
#[tokio::test]
async fn test_cache_failure_is_a_miss() -> anyhow::Result<()> {
    let directory = people(3);
    let connection = LdapConnection::new(
        config().cache_ttl(60),
        Box::new(directory.clone()),
        Some(Arc::new(BrokenCache)),
    );

    assert_eq!(connection.get_entries(1, 10, &EntriesOptions::new()).await?.len(), 3);
    assert_eq!(connection.get_entries(1, 10, &EntriesOptions::new()).await?.len(), 3);
    assert_eq!(directory.searches(), 2);
    Ok(())
}
