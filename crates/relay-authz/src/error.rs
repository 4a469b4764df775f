//! Attribute provider error types.

use relay_ldap::LdapError;
use thiserror::Error;

/// Errors raised while resolving user attributes.
#[derive(Debug, Error)]
pub enum AttributeError {
    /// The directory lookup failed.
    #[error("failed to get user data from LDAP: '{0}'")]
    Ldap(#[from] LdapError),

    /// Invalid attribute provider configuration.
    #[error("attribute configuration error: {0}")]
    Configuration(String),
}

impl AttributeError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Checks if an upstream directory failed.
    #[must_use]
    pub const fn is_gateway_error(&self) -> bool {
        matches!(self, Self::Ldap(_))
    }

    /// HTTP status an edge layer should answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Ldap(_) => 502,
            Self::Configuration(_) => 500,
        }
    }
}

/// Result type for attribute operations.
pub type AttributeResult<T> = Result<T, AttributeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_failures_are_gateway_errors() {
        let err: AttributeError = LdapError::connection("refused").into();
        assert!(err.is_gateway_error());
        assert_eq!(err.status_code(), 502);
        assert!(err.to_string().starts_with("failed to get user data from LDAP"));

        let err = AttributeError::config("duplicate");
        assert!(!err.is_gateway_error());
        assert_eq!(err.status_code(), 500);
    }
}
