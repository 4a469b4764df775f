//! Directory error types.
//!
//! ## Security Note
//!
//! Error messages must not leak bind credentials. Transport failures carry
//! the host and the underlying message only.

use thiserror::Error;

/// Errors raised by the directory query engine.
///
/// Every variant has a stable numeric [`code`](LdapError::code) so callers
/// can tell them apart without matching on message text.
#[derive(Debug, Error)]
pub enum LdapError {
    /// Transport, TLS or bind failure against the directory server.
    #[error("LDAP server connection failed: {0}")]
    ServerConnectionFailed(String),

    /// A single-entry lookup matched nothing.
    #[error("LDAP entry not found: {0}")]
    EntryNotFound(String),

    /// One or more attribute names are empty or unknown to the directory.
    #[error("LDAP attribute(s) undefined: {}", .0.join(", "))]
    UserAttributeUndefined(Vec<String>),

    /// No connection is configured under the requested identifier.
    #[error("LDAP connection undefined: '{0}'")]
    LdapConnectionUndefined(String),

    /// Malformed filter tree.
    #[error("invalid filter: {0}")]
    FilterInvalid(String),

    /// Sort requested over more entries than the connection allows.
    #[error("too many results to sort (limit {limit})")]
    TooManyResultsToSort {
        /// Configured sort-safety limit.
        limit: usize,
    },

    /// Invalid connection configuration.
    #[error("LDAP configuration error: {0}")]
    Configuration(String),
}

impl LdapError {
    /// Creates a server connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ServerConnectionFailed(msg.into())
    }

    /// Creates a filter error.
    #[must_use]
    pub fn filter(msg: impl Into<String>) -> Self {
        Self::FilterInvalid(msg.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an undefined-attribute error for a single name.
    #[must_use]
    pub fn attribute_undefined(name: impl Into<String>) -> Self {
        Self::UserAttributeUndefined(vec![name.into()])
    }

    /// Stable numeric code of this error kind.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::ServerConnectionFailed(_) => 1,
            Self::EntryNotFound(_) => 2,
            Self::UserAttributeUndefined(_) => 3,
            Self::LdapConnectionUndefined(_) => 4,
            Self::FilterInvalid(_) => 5,
            Self::TooManyResultsToSort { .. } => 6,
            Self::Configuration(_) => 7,
        }
    }

    /// Checks if this is a transport-level failure.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::ServerConnectionFailed(_))
    }

    /// Checks if this is a lookup that matched nothing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound(_))
    }

    /// Checks if the caller supplied something invalid (filter, attribute
    /// name or connection identifier).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::FilterInvalid(_)
                | Self::UserAttributeUndefined(_)
                | Self::LdapConnectionUndefined(_)
                | Self::TooManyResultsToSort { .. }
        )
    }
}

impl From<ldap3::LdapError> for LdapError {
    fn from(err: ldap3::LdapError) -> Self {
        match err {
            ldap3::LdapError::FilterParsing => Self::FilterInvalid(err.to_string()),
            other => Self::ServerConnectionFailed(other.to_string()),
        }
    }
}

/// Result type for directory operations.
pub type LdapResult<T> = Result<T, LdapError>;
