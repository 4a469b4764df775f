//! Common test fixtures.

use std::sync::Arc;

use relay_cache::{CacheProvider, MemoryCacheProvider};
use relay_ldap::{ConnectionConfig, LdapConnection, LdapEntry, MemoryDirectory};

/// Builds a person entry with the given attributes.
pub fn person(cn: &str, attrs: &[(&str, &str)]) -> LdapEntry {
    let mut all = vec![
        ("objectClass".to_string(), vec!["person".to_string()]),
        ("cn".to_string(), vec![cn.to_string()]),
    ];
    all.extend(
        attrs
            .iter()
            .map(|(name, value)| ((*name).to_string(), vec![(*value).to_string()])),
    );
    LdapEntry::new(format!("cn={cn},ou=people,o=org"), all)
}

/// Directory holding `user1` .. `user<count>`, each with a `uidNumber`.
pub fn people(count: usize) -> MemoryDirectory {
    MemoryDirectory::with_entries(
        (1..=count)
            .map(|i| person(&format!("user{i}"), &[("uidNumber", &i.to_string())]))
            .collect(),
    )
}

/// Connection test environment.
pub struct TestEnv {
    /// Directory observed by the test.
    pub directory: MemoryDirectory,
    /// Connection under test.
    pub connection: LdapConnection,
    /// Query cache, if enabled.
    pub cache: Option<Arc<MemoryCacheProvider>>,
}

impl TestEnv {
    /// Uncached connection over `directory`.
    pub fn new(directory: MemoryDirectory) -> Self {
        Self::with_config(directory, config(), None)
    }

    /// Connection with a memory cache and the given TTL.
    pub fn cached(directory: MemoryDirectory, ttl_secs: u64) -> Self {
        let cache = Arc::new(MemoryCacheProvider::new());
        Self::with_config(directory, config().cache_ttl(ttl_secs), Some(cache))
    }

    /// Connection with an explicit config.
    pub fn with_config(
        directory: MemoryDirectory,
        config: ConnectionConfig,
        cache: Option<Arc<MemoryCacheProvider>>,
    ) -> Self {
        let pool = cache
            .clone()
            .map(|cache| cache as Arc<dyn CacheProvider>);
        let connection = LdapConnection::new(config, Box::new(directory.clone()), pool);
        Self {
            directory,
            connection,
            cache,
        }
    }
}

/// Default test connection config.
pub fn config() -> ConnectionConfig {
    ConnectionConfig::new("test", "localhost", "ou=people,o=org")
}

/// DNs' common names in order.
pub fn names(entries: &[LdapEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.first_attribute_value_or("cn", "").to_string())
        .collect()
}
