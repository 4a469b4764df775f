//! `attributes` command.

use std::time::Duration;

use relay_authz::UserSession;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::cli::AttributesArgs;
use crate::config::OutputFormat;
use crate::context::Context;
use crate::error::CliResult;
use crate::output;

/// Attribute display struct.
#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
pub struct AttributeDisplay {
    /// Attribute name.
    #[tabled(rename = "Name")]
    pub name: String,
    /// Resolved value as JSON.
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Resolves and prints a user's attributes.
///
/// ## Errors
///
/// Returns an error if no attribute provider is configured or the
/// directory lookup fails.
pub async fn run_attributes(
    ctx: &Context,
    args: AttributesArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let provider = ctx.attribute_provider()?;
    let session = match (&args.user_id, args.session_key) {
        (Some(user), Some(key)) => Some(UserSession::new(
            user.clone(),
            key,
            Duration::from_secs(args.session_ttl),
        )),
        _ => None,
    };

    let attributes = provider
        .get_user_attributes(args.user_id.as_deref(), session.as_ref())
        .await?;

    match format {
        OutputFormat::Json | OutputFormat::Yaml => output::output_single(&attributes, format),
        OutputFormat::Table | OutputFormat::Quiet => {
            let rows: Vec<AttributeDisplay> = attributes
                .iter()
                .map(|(name, value)| AttributeDisplay {
                    name: name.clone(),
                    value: value.to_string(),
                })
                .collect();
            output::output(&rows, format, |row| row.name.as_str())
        }
    }
}
