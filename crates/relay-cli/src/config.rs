//! Configuration file.
//!
//! ```toml
//! [[connections]]
//! identifier = "people"
//! host = "ldap.example.com"
//! base_dn = "ou=people,o=example"
//! username = "cn=reader,o=example"
//! password = "secret"
//! encryption = "simple_tls"
//! cache_ttl = 300
//!
//! [cache]
//! host = "redis.example.com"
//!
//! [user_attribute_provider]
//! connection = "people"
//!
//! [[user_attribute_provider.attributes]]
//! name = "email"
//! ldap_attribute = "mail"
//!
//! [fixtures]
//! demo = "people.json"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use relay_authz::UserAttributeConfig;
use relay_cache_redis::RedisConfig;
use relay_ldap::{ConnectionConfig, LdapEntry};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default configuration path.
pub const DEFAULT_CONFIG_PATH: &str = "relay-ldap.toml";

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Directory connections.
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,

    /// Shared Redis query cache; without it caching connections use an
    /// in-process cache.
    #[serde(default)]
    pub cache: Option<RedisConfig>,

    /// User attribute provider.
    #[serde(default)]
    pub user_attribute_provider: Option<UserAttributeConfig>,

    /// JSON entry files served in place of a directory server, by
    /// connection identifier. Relative paths resolve against the config
    /// file's directory.
    #[serde(default)]
    pub fixtures: BTreeMap<String, PathBuf>,
}

impl RelayConfig {
    /// Loads and validates the file at `path`.
    ///
    /// ## Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// record is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(dir) = path.parent() {
            for fixture in config.fixtures.values_mut() {
                if fixture.is_relative() {
                    *fixture = dir.join(&*fixture);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses TOML text.
    ///
    /// ## Errors
    ///
    /// Returns the TOML error.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Validates every record.
    ///
    /// ## Errors
    ///
    /// Returns the first invalid record's error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for connection in &self.connections {
            connection.validate()?;
        }
        if let Some(provider) = &self.user_attribute_provider {
            provider.validate()?;
        }
        Ok(())
    }

    /// Reads the fixture entries of `identifier`, if one is configured.
    ///
    /// ## Errors
    ///
    /// Returns an error if the fixture cannot be read or decoded.
    pub fn fixture_entries(&self, identifier: &str) -> Result<Option<Vec<LdapEntry>>, ConfigError> {
        let Some(path) = self.fixtures.get(identifier) else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Fixture {
                path: path.clone(),
                source,
            })
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
    /// YAML-like format.
    Yaml,
    /// Quiet (minimal output).
    Quiet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_ldap::Encryption;

    #[test]
    fn parses_full_file() {
        let config = RelayConfig::parse(
            r#"
            [[connections]]
            identifier = "people"
            host = "ldap.example.com"
            base_dn = "ou=people,o=example"
            encryption = "simple_tls"
            cache_ttl = 300
            required_attributes = ["mail"]

            [[connections]]
            identifier = "staff"
            host = "ad.example.com"
            base_dn = "o=staff"

            [cache]
            host = "redis"

            [user_attribute_provider]
            connection = "people"

            [[user_attribute_provider.attributes]]
            name = "email"
            ldap_attribute = "mail"
            "#,
        )
        .unwrap();

        assert_eq!(config.connections.len(), 2);
        let people = &config.connections[0];
        assert_eq!(people.encryption, Encryption::SimpleTls);
        assert_eq!(people.transport().port, 636);
        assert_eq!(people.required_attributes, vec!["mail"]);

        let staff = &config.connections[1];
        assert_eq!(staff.encryption, Encryption::StartTls);
        assert_eq!(staff.object_class, "person");
        assert_eq!(staff.sort_limit, 10_000);

        assert_eq!(config.cache.as_ref().map(|c| c.host.as_str()), Some("redis"));
        assert_eq!(
            config
                .user_attribute_provider
                .as_ref()
                .map(|p| p.identifier_attribute.as_str()),
            Some("cn")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_file_is_valid() {
        let config = RelayConfig::parse("").unwrap();
        assert!(config.connections.is_empty());
        assert!(config.cache.is_none());
    }

    #[test]
    fn invalid_records_are_rejected() {
        let config = RelayConfig::parse(
            r#"
            [[connections]]
            identifier = "people"
            host = ""
            base_dn = "o=x"
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Ldap(_))));
    }
}
