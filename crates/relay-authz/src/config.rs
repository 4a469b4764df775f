//! Attribute provider configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AttributeError, AttributeResult};

/// Declaration of one user attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute name exposed to callers.
    pub name: String,

    /// Directory attribute the value is read from.
    #[serde(default)]
    pub ldap_attribute: Option<String>,

    /// Whether the attribute holds a list.
    #[serde(default)]
    pub is_array: bool,

    /// Default of a scalar attribute.
    #[serde(default)]
    pub default_value: Option<Value>,

    /// Default of a list attribute.
    #[serde(default)]
    pub default_values: Vec<Value>,
}

impl AttributeDefinition {
    /// Scalar attribute without directory mapping.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ldap_attribute: None,
            is_array: false,
            default_value: None,
            default_values: Vec::new(),
        }
    }

    /// Maps the attribute to a directory attribute.
    #[must_use]
    pub fn ldap_attribute(mut self, name: impl Into<String>) -> Self {
        self.ldap_attribute = Some(name.into());
        self
    }

    /// Marks the attribute as a list.
    #[must_use]
    pub const fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// Sets the scalar default.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Sets the list default.
    #[must_use]
    pub fn default_values(mut self, values: Vec<Value>) -> Self {
        self.default_values = values;
        self
    }

    /// Value used when neither the directory nor a listener provides one.
    #[must_use]
    pub fn default(&self) -> Value {
        if self.is_array {
            Value::Array(self.default_values.clone())
        } else {
            self.default_value.clone().unwrap_or(Value::Null)
        }
    }
}

/// Configuration of the user attribute provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAttributeConfig {
    /// Connection identifier users are looked up on.
    pub connection: String,

    /// Directory attribute holding the user identifier.
    #[serde(default = "default_identifier_attribute")]
    pub identifier_attribute: String,

    /// Declared attributes.
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
}

fn default_identifier_attribute() -> String {
    "cn".to_string()
}

impl UserAttributeConfig {
    /// Creates a configuration without attributes.
    #[must_use]
    pub fn new(connection: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            identifier_attribute: default_identifier_attribute(),
            attributes: Vec::new(),
        }
    }

    /// Sets the identifier attribute.
    #[must_use]
    pub fn identifier_attribute(mut self, name: impl Into<String>) -> Self {
        self.identifier_attribute = name.into();
        self
    }

    /// Adds an attribute declaration.
    #[must_use]
    pub fn attribute(mut self, definition: AttributeDefinition) -> Self {
        self.attributes.push(definition);
        self
    }

    /// Validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns [`AttributeError::Configuration`] for an empty connection,
    /// an empty attribute name or an attribute declared twice.
    pub fn validate(&self) -> AttributeResult<()> {
        if self.connection.trim().is_empty() {
            return Err(AttributeError::config("connection is required"));
        }
        let mut seen = HashSet::new();
        for attribute in &self.attributes {
            if attribute.name.trim().is_empty() {
                return Err(AttributeError::config("attribute name must not be empty"));
            }
            if !seen.insert(attribute.name.as_str()) {
                return Err(AttributeError::config(format!(
                    "multiple declaration of attribute '{}'",
                    attribute.name
                )));
            }
        }
        Ok(())
    }
}
