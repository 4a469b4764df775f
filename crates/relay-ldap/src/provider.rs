//! Connection registry.
//!
//! Maps connection identifiers to configs and to lazily constructed,
//! memoized [`LdapConnection`]s. Consumers receive the provider explicitly;
//! there is no process-wide instance.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use relay_cache::CacheProvider;

use crate::config::ConnectionConfig;
use crate::connection::LdapConnection;
use crate::directory::{DirectoryConnector, Ldap3Connector};
use crate::error::{LdapError, LdapResult};

/// Registry of directory connections.
pub struct LdapConnectionProvider {
    configs: RwLock<HashMap<String, ConnectionConfig>>,
    caches: RwLock<HashMap<String, Arc<dyn CacheProvider>>>,
    connections: DashMap<String, Arc<LdapConnection>>,
    connector: Arc<dyn DirectoryConnector>,
}

impl LdapConnectionProvider {
    /// Creates a provider that opens sessions with `ldap3`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(Arc::new(Ldap3Connector))
    }

    /// Creates a provider that opens sessions with `connector`.
    #[must_use]
    pub fn with_connector(connector: Arc<dyn DirectoryConnector>) -> Self {
        Self {
            configs: RwLock::new(HashMap::new()),
            caches: RwLock::new(HashMap::new()),
            connections: DashMap::new(),
            connector,
        }
    }

    /// Replaces all connection configs. Connections already handed out
    /// keep their config.
    ///
    /// ## Errors
    ///
    /// Returns [`LdapError::Configuration`] for an invalid record or a
    /// duplicate identifier; the previous configs stay in place.
    pub fn set_config(&self, connections: Vec<ConnectionConfig>) -> LdapResult<()> {
        let mut configs = HashMap::with_capacity(connections.len());
        for config in connections {
            config.validate()?;
            let identifier = config.identifier.clone();
            if configs.insert(identifier.clone(), config).is_some() {
                return Err(LdapError::config(format!(
                    "duplicate connection identifier '{identifier}'"
                )));
            }
        }

        tracing::info!(count = configs.len(), "LDAP connections configured");
        *self.configs.write() = configs;
        Ok(())
    }

    /// Assigns query caches by connection identifier.
    pub fn set_caches(&self, caches: HashMap<String, Arc<dyn CacheProvider>>) {
        *self.caches.write() = caches;
    }

    /// Returns the connection for `identifier`, constructing it on first
    /// access. Repeated calls return the same instance.
    ///
    /// ## Errors
    ///
    /// Returns [`LdapError::LdapConnectionUndefined`] for an unknown
    /// identifier.
    pub fn get_connection(&self, identifier: &str) -> LdapResult<Arc<LdapConnection>> {
        if let Some(connection) = self.connections.get(identifier) {
            return Ok(Arc::clone(connection.value()));
        }

        let config = self
            .configs
            .read()
            .get(identifier)
            .cloned()
            .ok_or_else(|| LdapError::LdapConnectionUndefined(identifier.to_string()))?;
        let cache = self.caches.read().get(identifier).cloned();

        let connection = self
            .connections
            .entry(identifier.to_string())
            .or_insert_with(|| {
                tracing::debug!(connection = %identifier, cached = cache.is_some(), "creating LDAP connection");
                let directory = self.connector.open(&config);
                Arc::new(LdapConnection::new(config, directory, cache))
            });
        Ok(Arc::clone(connection.value()))
    }

    /// Configured connection identifiers, sorted.
    #[must_use]
    pub fn connection_identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = self.configs.read().keys().cloned().collect();
        identifiers.sort();
        identifiers
    }

    /// Registers a ready connection under `identifier`, replacing any
    /// memoized one. Its config also becomes known to the provider.
    pub fn add_connection(&self, identifier: impl Into<String>, connection: Arc<LdapConnection>) {
        let identifier = identifier.into();
        self.configs
            .write()
            .insert(identifier.clone(), connection.config().clone());
        self.connections.insert(identifier, connection);
    }
}

impl Default for LdapConnectionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LdapConnectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConnectionProvider")
            .field("identifiers", &self.connection_identifiers())
            .field("connected", &self.connections.len())
            .finish_non_exhaustive()
    }
}
