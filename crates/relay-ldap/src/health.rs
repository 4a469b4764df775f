//! Health check over all configured connections.

use std::sync::Arc;

use serde::Serialize;

use crate::provider::LdapConnectionProvider;

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// The check passed.
    Success,
    /// The check failed.
    Failure,
}

/// Result of one health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// What was checked.
    pub description: String,
    /// Outcome.
    pub status: CheckStatus,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    fn from_outcome<E: std::fmt::Display>(description: String, outcome: Result<(), E>) -> Self {
        match outcome {
            Ok(()) => Self {
                description,
                status: CheckStatus::Success,
                message: None,
            },
            Err(e) => Self {
                description,
                status: CheckStatus::Failure,
                message: Some(e.to_string()),
            },
        }
    }

    /// Returns true if the check passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == CheckStatus::Success
    }
}

/// Checks connectivity and required attributes of every connection.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    provider: Arc<LdapConnectionProvider>,
}

impl HealthCheck {
    /// Name under which the check reports.
    pub const NAME: &'static str = "relay-ldap";

    /// Creates a health check over `provider`.
    #[must_use]
    pub const fn new(provider: Arc<LdapConnectionProvider>) -> Self {
        Self { provider }
    }

    /// Runs both checks for each configured connection, in identifier
    /// order.
    pub async fn check(&self) -> Vec<CheckResult> {
        let mut results = Vec::new();
        for identifier in self.provider.connection_identifiers() {
            let connection = match self.provider.get_connection(&identifier) {
                Ok(connection) => connection,
                Err(e) => {
                    results.push(CheckResult::from_outcome(
                        format!("Check if we can connect to the LDAP connection {identifier}"),
                        Err(e),
                    ));
                    continue;
                }
            };

            let connected = connection.check_connection().await;
            results.push(CheckResult::from_outcome(
                format!("Check if we can connect to the LDAP connection {identifier}"),
                connected,
            ));

            let required = &connection.config().required_attributes;
            let attributes = connection.assert_attributes_exist(required.as_slice()).await;
            results.push(CheckResult::from_outcome(
                format!("Check if all attributes are available for {identifier}"),
                attributes,
            ));
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            tracing::warn!(failed, total = results.len(), "LDAP health check failed");
        }
        results
    }
}
