//! Post-load hook for directory user data.

use std::collections::BTreeMap;

use relay_ldap::AttributeValue;
use serde_json::Value;

/// Dispatched after a user's directory entry is loaded.
///
/// Listeners may inspect the raw directory attributes and provide values
/// for declared attributes that have no directory mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDataLoadedEvent {
    user_data: BTreeMap<String, AttributeValue>,
    user_attributes: BTreeMap<String, Value>,
}

impl UserDataLoadedEvent {
    /// Event name.
    pub const NAME: &'static str = "relay.ldap.user_data_loaded";

    /// Creates an event carrying the loaded directory attributes.
    #[must_use]
    pub const fn new(user_data: BTreeMap<String, AttributeValue>) -> Self {
        Self {
            user_data,
            user_attributes: BTreeMap::new(),
        }
    }

    /// Raw directory attributes.
    #[must_use]
    pub const fn user_data(&self) -> &BTreeMap<String, AttributeValue> {
        &self.user_data
    }

    /// Replaces the listener-provided attribute values.
    pub fn set_user_attributes(&mut self, attributes: BTreeMap<String, Value>) {
        self.user_attributes = attributes;
    }

    /// Sets one listener-provided attribute value.
    pub fn set_user_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.user_attributes.insert(name.into(), value);
    }

    /// Listener-provided attribute values.
    #[must_use]
    pub const fn user_attributes(&self) -> &BTreeMap<String, Value> {
        &self.user_attributes
    }
}

/// Receives [`UserDataLoadedEvent`]s.
pub trait UserDataLoadedListener: Send + Sync {
    /// Called once per directory load, in registration order.
    fn on_user_data_loaded(&self, event: &mut UserDataLoadedEvent);
}

impl<F> UserDataLoadedListener for F
where
    F: Fn(&mut UserDataLoadedEvent) + Send + Sync,
{
    fn on_user_data_loaded(&self, event: &mut UserDataLoadedEvent) {
        self(event);
    }
}
