//! CLI error types.

use std::path::PathBuf;

use relay_authz::AttributeError;
use relay_cache::CacheError;
use relay_ldap::LdapError;
use thiserror::Error;

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for the expected layout.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// A fixture file is not a JSON list of entries.
    #[error("invalid fixture {path}: {source}")]
    Fixture {
        /// Path of the fixture.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// Connection records are invalid.
    #[error(transparent)]
    Ldap(#[from] LdapError),

    /// Attribute provider settings are invalid.
    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Directory error.
    #[error("{0}")]
    Ldap(#[from] LdapError),

    /// Attribute provider error.
    #[error("{0}")]
    Attribute(#[from] AttributeError),

    /// Cache backend error.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Health checks failed.
    #[error("{0} health check(s) failed")]
    HealthCheckFailed(usize),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
