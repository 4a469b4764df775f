//! Directory connection configuration.
//!
//! One [`ConnectionConfig`] describes one directory endpoint. Records are
//! loaded once (usually from the TOML config file) and handed to the
//! [`LdapConnectionProvider`](crate::provider::LdapConnectionProvider).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LdapError, LdapResult};

// ============================================================================
// Encryption
// ============================================================================

/// Transport encryption mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encryption {
    /// Cleartext LDAP.
    Plain,
    /// LDAP upgraded with the StartTLS extended operation.
    #[default]
    StartTls,
    /// LDAP over TLS from the first byte (`ldaps://`).
    SimpleTls,
}

impl Encryption {
    /// Port implied by this mode when no override is configured.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Plain | Self::StartTls => 389,
            Self::SimpleTls => 636,
        }
    }

    /// TLS negotiation implied by this mode.
    #[must_use]
    pub const fn tls_mode(self) -> TlsMode {
        match self {
            Self::Plain => TlsMode::None,
            Self::StartTls => TlsMode::StartTls,
            Self::SimpleTls => TlsMode::Implicit,
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::StartTls => "start_tls",
            Self::SimpleTls => "simple_tls",
        })
    }
}

/// How TLS is negotiated on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// No TLS.
    None,
    /// Upgrade an `ldap://` session.
    StartTls,
    /// TLS from connection start.
    Implicit,
}

/// Transport parameters derived from a [`ConnectionConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    /// Connection URL including scheme and port.
    pub url: String,
    /// Effective port.
    pub port: u16,
    /// TLS negotiation.
    pub tls: TlsMode,
}

// ============================================================================
// Connection Configuration
// ============================================================================

/// Configuration of one directory connection.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Unique connection identifier.
    pub identifier: String,

    /// Directory server host name.
    pub host: String,

    /// Base DN all searches start from.
    pub base_dn: String,

    /// Bind DN.
    #[serde(default)]
    pub username: String,

    /// Bind password.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Transport encryption.
    #[serde(default)]
    pub encryption: Encryption,

    /// Object class every query is restricted to.
    #[serde(default = "default_object_class")]
    pub object_class: String,

    /// Query cache lifetime in seconds, 0 disables caching.
    #[serde(default)]
    pub cache_ttl: u64,

    /// Maximum number of entries materialized for a client-side sort.
    #[serde(default = "default_sort_limit")]
    pub sort_limit: usize,

    /// Port override.
    #[serde(default)]
    pub port: Option<u16>,

    /// Connect timeout in seconds.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    /// Attributes the health check expects the directory to know.
    #[serde(default)]
    pub required_attributes: Vec<String>,
}

fn default_object_class() -> String {
    "person".to_string()
}

const fn default_sort_limit() -> usize {
    10_000
}

impl ConnectionConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        host: impl Into<String>,
        base_dn: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            host: host.into(),
            base_dn: base_dn.into(),
            username: String::new(),
            password: String::new(),
            encryption: Encryption::default(),
            object_class: default_object_class(),
            cache_ttl: 0,
            sort_limit: default_sort_limit(),
            port: None,
            connect_timeout_secs: None,
            required_attributes: Vec::new(),
        }
    }

    /// Sets the bind credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the encryption mode.
    #[must_use]
    pub const fn encryption(mut self, encryption: Encryption) -> Self {
        self.encryption = encryption;
        self
    }

    /// Sets the object class.
    #[must_use]
    pub fn object_class(mut self, object_class: impl Into<String>) -> Self {
        self.object_class = object_class.into();
        self
    }

    /// Sets the cache lifetime in seconds.
    #[must_use]
    pub const fn cache_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl = seconds;
        self
    }

    /// Sets the sort-safety limit.
    #[must_use]
    pub const fn sort_limit(mut self, limit: usize) -> Self {
        self.sort_limit = limit;
        self
    }

    /// Overrides the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the attributes required by the health check.
    #[must_use]
    pub fn required_attributes(mut self, names: Vec<String>) -> Self {
        self.required_attributes = names;
        self
    }

    /// Derives URL, port and TLS mode from the encryption setting.
    #[must_use]
    pub fn transport(&self) -> Transport {
        let port = self.port.unwrap_or_else(|| self.encryption.default_port());
        let tls = self.encryption.tls_mode();
        let scheme = match tls {
            TlsMode::Implicit => "ldaps",
            TlsMode::None | TlsMode::StartTls => "ldap",
        };
        Transport {
            url: format!("{scheme}://{}:{port}", self.host),
            port,
            tls,
        }
    }

    /// Cache lifetime, or `None` when caching is disabled.
    #[must_use]
    pub const fn cache_lifetime(&self) -> Option<Duration> {
        if self.cache_ttl == 0 {
            None
        } else {
            Some(Duration::from_secs(self.cache_ttl))
        }
    }

    /// Connect timeout, if configured.
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns [`LdapError::Configuration`] naming the first invalid field.
    pub fn validate(&self) -> LdapResult<()> {
        if self.identifier.trim().is_empty() {
            return Err(LdapError::config("identifier is required"));
        }
        if self.host.trim().is_empty() {
            return Err(LdapError::config(format!(
                "connection '{}': host is required",
                self.identifier
            )));
        }
        if self.base_dn.trim().is_empty() {
            return Err(LdapError::config(format!(
                "connection '{}': base_dn is required",
                self.identifier
            )));
        }
        if self.object_class.trim().is_empty() {
            return Err(LdapError::config(format!(
                "connection '{}': object_class must not be empty",
                self.identifier
            )));
        }
        if self.sort_limit == 0 {
            return Err(LdapError::config(format!(
                "connection '{}': sort_limit must be positive",
                self.identifier
            )));
        }
        Ok(())
    }
}

// Password stays out of logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("identifier", &self.identifier)
            .field("host", &self.host)
            .field("base_dn", &self.base_dn)
            .field("username", &self.username)
            .field("encryption", &self.encryption)
            .field("object_class", &self.object_class)
            .field("cache_ttl", &self.cache_ttl)
            .field("sort_limit", &self.sort_limit)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}
