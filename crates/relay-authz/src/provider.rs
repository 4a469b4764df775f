//! User attribute provider.
//!
//! Resolves a user identifier to a directory entry and maps it to the
//! declared attributes. Values come from the mapped directory attribute,
//! else from a [`UserDataLoadedListener`], else from the declared default.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use relay_cache::{CacheProvider, CacheProviderExt, CacheResult};
use relay_ldap::{AttributeValue, LdapConnectionProvider};
use serde_json::Value;

use crate::config::{AttributeDefinition, UserAttributeConfig};
use crate::error::AttributeResult;
use crate::event::{UserDataLoadedEvent, UserDataLoadedListener};
use crate::session::UserSession;

/// Resolved attributes by name.
pub type UserAttributes = BTreeMap<String, Value>;

/// Maps directory users to authorization attributes.
pub struct UserAttributeProvider {
    connections: Arc<LdapConnectionProvider>,
    config: UserAttributeConfig,
    listeners: RwLock<Vec<Arc<dyn UserDataLoadedListener>>>,
    user_cache: Option<Arc<dyn CacheProvider>>,
}

impl UserAttributeProvider {
    /// Creates a provider.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error if an attribute is declared twice.
    pub fn new(
        connections: Arc<LdapConnectionProvider>,
        config: UserAttributeConfig,
    ) -> AttributeResult<Self> {
        config.validate()?;
        Ok(Self {
            connections,
            config,
            listeners: RwLock::new(Vec::new()),
            user_cache: None,
        })
    }

    /// Sets the per-session attribute cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheProvider>) -> Self {
        self.user_cache = Some(cache);
        self
    }

    /// Registers a listener for loaded user data.
    pub fn add_listener(&self, listener: Arc<dyn UserDataLoadedListener>) {
        self.listeners.write().push(listener);
    }

    /// Declared attribute names, in declaration order.
    #[must_use]
    pub fn available_attributes(&self) -> Vec<String> {
        self.config
            .attributes
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    /// Resolves the attributes of `user_id`.
    ///
    /// Without a user id every attribute gets its default. With a session
    /// that has a logged-in user and a configured cache, results are
    /// cached per session.
    ///
    /// ## Errors
    ///
    /// Returns [`AttributeError::Ldap`](crate::AttributeError::Ldap) if the
    /// directory lookup fails.
    pub async fn get_user_attributes(
        &self,
        user_id: Option<&str>,
        session: Option<&UserSession>,
    ) -> AttributeResult<UserAttributes> {
        let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
            return Ok(self.defaults());
        };

        let cache = match (&self.user_cache, session) {
            (Some(cache), Some(session)) if session.user_identifier.is_some() => {
                Some((cache, session))
            }
            _ => None,
        };
        let Some((cache, session)) = cache else {
            return self.load(user_id).await;
        };

        let key = session.user_cache_key(user_id);
        let cached: CacheResult<Option<UserAttributes>> = cache.get_json(&key).await;
        match cached {
            Ok(Some(attributes)) => return Ok(attributes),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "user attribute cache read failed"),
        }

        let attributes = self.load(user_id).await?;
        if let Err(e) = cache
            .set_json(&key, &attributes, Some(session.cache_ttl()))
            .await
        {
            tracing::warn!(error = %e, "user attribute cache write failed");
        }
        Ok(attributes)
    }

    fn defaults(&self) -> UserAttributes {
        self.config
            .attributes
            .iter()
            .map(|a| (a.name.clone(), a.default()))
            .collect()
    }

    async fn load(&self, user_id: &str) -> AttributeResult<UserAttributes> {
        let connection = self.connections.get_connection(&self.config.connection)?;
        let entry = connection
            .get_entry_by_attribute(&self.config.identifier_attribute, user_id)
            .await?;
        tracing::debug!(user = %user_id, dn = %entry.dn(), "loaded user data from LDAP");

        let mut event = UserDataLoadedEvent::new(entry.attribute_values().clone());
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.on_user_data_loaded(&mut event);
        }

        Ok(self
            .config
            .attributes
            .iter()
            .map(|definition| {
                let value = mapped_value(definition, &entry)
                    .or_else(|| event.user_attributes().get(&definition.name).cloned())
                    .unwrap_or_else(|| definition.default());
                (definition.name.clone(), value)
            })
            .collect())
    }
}

fn mapped_value(definition: &AttributeDefinition, entry: &relay_ldap::LdapEntry) -> Option<Value> {
    let value = entry.attribute_value(definition.ldap_attribute.as_deref()?)?;
    match (value, definition.is_array) {
        (AttributeValue::Single(v), false) => Some(Value::String(v.clone())),
        (AttributeValue::Single(v), true) => Some(Value::Array(vec![Value::String(v.clone())])),
        (AttributeValue::Multiple(values), false) => values.first().cloned().map(Value::String),
        (AttributeValue::Multiple(values), true) => Some(Value::Array(
            values.iter().cloned().map(Value::String).collect(),
        )),
    }
}

impl std::fmt::Debug for UserAttributeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAttributeProvider")
            .field("config", &self.config)
            .field("listeners", &self.listeners.read().len())
            .field("cached", &self.user_cache.is_some())
            .finish()
    }
}
