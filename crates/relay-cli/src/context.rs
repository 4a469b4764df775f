//! Runtime wiring: connection provider, caches and attribute provider built
//! from a [`RelayConfig`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use relay_authz::UserAttributeProvider;
use relay_cache::{CacheProvider, MemoryCacheProvider};
use relay_cache_redis::RedisCacheProvider;
use relay_ldap::{
    ConnectionConfig, Directory, DirectoryConnector, Ldap3Connector, LdapConnectionProvider,
    MemoryConnector, MemoryDirectory,
};

use crate::config::RelayConfig;
use crate::error::{CliError, CliResult};

/// Serves fixture-backed connections from memory and everything else over
/// the network.
#[derive(Debug, Default)]
pub struct FixtureConnector {
    fixtures: MemoryConnector,
    fixture_ids: BTreeSet<String>,
    network: Ldap3Connector,
}

impl FixtureConnector {
    /// Creates a connector without fixtures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `directory` for `identifier`.
    #[must_use]
    pub fn with_fixture(mut self, identifier: impl Into<String>, directory: MemoryDirectory) -> Self {
        let identifier = identifier.into();
        self.fixture_ids.insert(identifier.clone());
        self.fixtures = self.fixtures.with_directory(identifier, directory);
        self
    }

    /// Returns true if `identifier` is served from a fixture.
    #[must_use]
    pub fn is_fixture(&self, identifier: &str) -> bool {
        self.fixture_ids.contains(identifier)
    }
}

impl DirectoryConnector for FixtureConnector {
    fn open(&self, config: &ConnectionConfig) -> Box<dyn Directory> {
        if self.is_fixture(&config.identifier) {
            self.fixtures.open(config)
        } else {
            self.network.open(config)
        }
    }
}

/// Everything a command needs.
pub struct Context {
    /// Loaded configuration.
    pub config: RelayConfig,
    /// Connection registry.
    pub connections: Arc<LdapConnectionProvider>,
    /// User attribute provider, if configured.
    pub attributes: Option<UserAttributeProvider>,
}

impl Context {
    /// Builds the runtime for `config`.
    ///
    /// ## Errors
    ///
    /// Returns an error if a fixture cannot be read, a record is invalid or
    /// the Redis cache is unreachable.
    pub async fn build(config: RelayConfig) -> CliResult<Self> {
        let mut connector = FixtureConnector::new();
        for connection in &config.connections {
            if let Some(entries) = config.fixture_entries(&connection.identifier)? {
                tracing::debug!(
                    connection = %connection.identifier,
                    entries = entries.len(),
                    "serving connection from fixture"
                );
                connector =
                    connector.with_fixture(&connection.identifier, MemoryDirectory::with_entries(entries));
            }
        }

        let connections = Arc::new(LdapConnectionProvider::with_connector(Arc::new(connector)));
        connections.set_caches(build_caches(&config).await?);
        connections.set_config(config.connections.clone())?;

        let attributes = match &config.user_attribute_provider {
            Some(provider_config) => {
                let provider =
                    UserAttributeProvider::new(Arc::clone(&connections), provider_config.clone())?
                        .with_cache(Arc::new(MemoryCacheProvider::new()));
                Some(provider)
            }
            None => None,
        };

        Ok(Self {
            config,
            connections,
            attributes,
        })
    }

    /// Returns the attribute provider.
    ///
    /// ## Errors
    ///
    /// Returns an error if none is configured.
    pub fn attribute_provider(&self) -> CliResult<&UserAttributeProvider> {
        self.attributes.as_ref().ok_or_else(|| {
            CliError::InvalidArgument("no [user_attribute_provider] section configured".to_string())
        })
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("connections", &self.connections)
            .field("attributes", &self.attributes.is_some())
            .finish_non_exhaustive()
    }
}

/// One query cache per connection with a positive TTL: a Redis namespace
/// when `[cache]` is set, otherwise an in-process cache.
async fn build_caches(config: &RelayConfig) -> CliResult<HashMap<String, Arc<dyn CacheProvider>>> {
    let caching: Vec<&ConnectionConfig> = config
        .connections
        .iter()
        .filter(|c| c.cache_ttl > 0)
        .collect();
    if caching.is_empty() {
        return Ok(HashMap::new());
    }

    let mut caches: HashMap<String, Arc<dyn CacheProvider>> = HashMap::new();
    match &config.cache {
        Some(redis) => {
            let base = RedisCacheProvider::new(redis.clone()).await?;
            tracing::info!(host = %redis.host, port = redis.port, "using Redis query cache");
            for connection in caching {
                let cache = base.namespaced(&connection.identifier);
                caches.insert(connection.identifier.clone(), Arc::new(cache));
            }
        }
        None => {
            for connection in caching {
                caches.insert(
                    connection.identifier.clone(),
                    Arc::new(MemoryCacheProvider::new()),
                );
            }
        }
    }
    Ok(caches)
}
