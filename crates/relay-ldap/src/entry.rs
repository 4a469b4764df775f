//! Directory entries returned to callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value of one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Attribute with exactly one value.
    Single(String),
    /// Multi-valued attribute.
    Multiple(Vec<String>),
}

impl AttributeValue {
    /// First value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multiple(values) => values.first().map(String::as_str),
        }
    }

    /// All values as a list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Single(value) => vec![value.clone()],
            Self::Multiple(values) => values.clone(),
        }
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            Self::Single(values.remove(0))
        } else {
            Self::Multiple(values)
        }
    }
}

/// Directory entry: DN plus attributes.
///
/// Attribute names keep the casing the server returned; lookups ignore case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapEntry {
    dn: String,
    attributes: BTreeMap<String, AttributeValue>,
}

impl LdapEntry {
    /// Creates an entry from raw multi-valued attributes.
    ///
    /// Single-element lists become [`AttributeValue::Single`].
    #[must_use]
    pub fn new<I>(dn: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        Self {
            dn: dn.into(),
            attributes: attributes
                .into_iter()
                .map(|(name, values)| (name, AttributeValue::from(values)))
                .collect(),
        }
    }

    /// Creates an entry from an `ldap3` search result.
    #[must_use]
    pub fn from_search_entry(entry: ldap3::SearchEntry) -> Self {
        Self::new(entry.dn, entry.attrs)
    }

    /// Distinguished name.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Value of `name`, if present.
    #[must_use]
    pub fn attribute_value(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .get(name)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
    }

    /// Value of `name`, or `default` if absent.
    #[must_use]
    pub fn attribute_value_or(&self, name: &str, default: AttributeValue) -> AttributeValue {
        self.attribute_value(name).cloned().unwrap_or(default)
    }

    /// First value of `name`, if present.
    #[must_use]
    pub fn first_attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute_value(name).and_then(AttributeValue::first)
    }

    /// First value of `name`, or `default` if absent.
    #[must_use]
    pub fn first_attribute_value_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.first_attribute_value(name).unwrap_or(default)
    }

    /// All attributes.
    #[must_use]
    pub const fn attribute_values(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    /// Checks if the entry has `name`.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_value(name).is_some()
    }
}
