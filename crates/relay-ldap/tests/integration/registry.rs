//! Connection provider behaviour.

use std::collections::HashMap;
use std::sync::Arc;

use relay_cache::{CacheProvider, MemoryCacheProvider};
use relay_ldap::{
    ConnectionConfig, EntriesOptions, LdapConnection, LdapConnectionProvider, LdapError,
    MemoryConnector, MemoryDirectory,
};

use crate::common::people;

fn provider(directory: &MemoryDirectory) -> LdapConnectionProvider {
    let connector = MemoryConnector::new().with_directory("people", directory.clone());
    LdapConnectionProvider::with_connector(Arc::new(connector))
}

/// Tests that repeated access reuses one connection and session.
#[tokio::test]
async fn test_connection_is_memoized() -> anyhow::Result<()> {
    let directory = people(3);
    let provider = provider(&directory);
    provider.set_config(vec![ConnectionConfig::new("people", "dir", "o=org")])?;

    let a = provider.get_connection("people")?;
    let b = provider.get_connection("people")?;
    assert!(Arc::ptr_eq(&a, &b));

    a.check_connection().await?;
    b.check_connection().await?;
    assert_eq!(directory.connects(), 1);

    assert!(matches!(
        provider.get_connection("unknown"),
        Err(LdapError::LdapConnectionUndefined(_))
    ));
    Ok(())
}

/// Tests that caches are assigned per identifier.
#[tokio::test]
async fn test_caches_are_assigned() -> anyhow::Result<()> {
    let directory = people(3);
    let provider = provider(&directory);
    provider.set_config(vec![
        ConnectionConfig::new("people", "dir", "o=org").cache_ttl(60)
    ])?;

    let cache = Arc::new(MemoryCacheProvider::new());
    let mut caches: HashMap<String, Arc<dyn CacheProvider>> = HashMap::new();
    caches.insert("people".into(), cache.clone());
    provider.set_caches(caches);

    let connection = provider.get_connection("people")?;
    connection.get_entries(1, 10, &EntriesOptions::new()).await?;
    connection.get_entries(1, 10, &EntriesOptions::new()).await?;
    assert_eq!(directory.searches(), 1);
    assert_eq!(cache.len(), 1);
    Ok(())
}

/// Tests concurrent first access yields one instance.
#[tokio::test]
async fn test_concurrent_first_access() -> anyhow::Result<()> {
    let directory = people(1);
    let provider = Arc::new(provider(&directory));
    provider.set_config(vec![ConnectionConfig::new("people", "dir", "o=org")])?;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.get_connection("people") })
        })
        .collect();

    let mut connections = Vec::new();
    for handle in handles {
        connections.push(handle.await??);
    }
    assert!(connections.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    Ok(())
}

/// Tests registering a ready connection.
#[tokio::test]
async fn test_add_connection() -> anyhow::Result<()> {
    let provider = LdapConnectionProvider::new();
    let directory = people(2);
    let connection = Arc::new(LdapConnection::new(
        ConnectionConfig::new("mem", "memory", "o=org"),
        Box::new(directory.clone()),
        None,
    ));
    provider.add_connection("mem", connection.clone());

    assert_eq!(provider.connection_identifiers(), vec!["mem"]);
    let fetched = provider.get_connection("mem")?;
    assert!(Arc::ptr_eq(&fetched, &connection));
    assert_eq!(fetched.get_entries(1, 10, &EntriesOptions::new()).await?.len(), 2);
    Ok(())
}
