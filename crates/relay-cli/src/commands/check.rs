//! `check` command.

use relay_ldap::{CheckResult, CheckStatus, HealthCheck};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::config::OutputFormat;
use crate::context::Context;
use crate::error::{CliError, CliResult};
use crate::output;

/// Check display struct.
#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
pub struct CheckDisplay {
    /// Check description.
    #[tabled(rename = "Check")]
    pub description: String,
    /// Outcome.
    #[tabled(rename = "Status")]
    pub status: String,
    /// Failure message.
    #[tabled(rename = "Message")]
    pub message: String,
}

impl From<&CheckResult> for CheckDisplay {
    fn from(result: &CheckResult) -> Self {
        Self {
            description: result.description.clone(),
            status: match result.status {
                CheckStatus::Success => "success",
                CheckStatus::Failure => "failure",
            }
            .to_string(),
            message: result.message.clone().unwrap_or_default(),
        }
    }
}

/// Runs the health checks.
///
/// ## Errors
///
/// Returns [`CliError::HealthCheckFailed`] if any check failed.
pub async fn run_check(ctx: &Context, format: OutputFormat) -> CliResult<()> {
    let results = HealthCheck::new(ctx.connections.clone()).check().await;
    let rows: Vec<CheckDisplay> = results.iter().map(CheckDisplay::from).collect();
    output::output(&rows, format, |row| row.status.as_str())?;

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        return Err(CliError::HealthCheckFailed(failed));
    }
    if format == OutputFormat::Table {
        output::success(&format!("{} passed all checks", HealthCheck::NAME));
    }
    Ok(())
}
