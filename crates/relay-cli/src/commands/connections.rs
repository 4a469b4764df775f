//! `connections` command.

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::config::OutputFormat;
use crate::context::Context;
use crate::error::CliResult;
use crate::output;

/// Connection display struct.
#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
pub struct ConnectionDisplay {
    /// Identifier.
    #[tabled(rename = "Identifier")]
    pub identifier: String,
    /// Server URL.
    #[tabled(rename = "URL")]
    pub url: String,
    /// Search base.
    #[tabled(rename = "Base DN")]
    pub base_dn: String,
    /// Object class restriction.
    #[tabled(rename = "Object Class")]
    pub object_class: String,
    /// Query cache lifetime in seconds.
    #[tabled(rename = "Cache TTL")]
    pub cache_ttl: u64,
    /// Whether entries come from a fixture file.
    #[tabled(rename = "Fixture")]
    pub fixture: bool,
}

/// Lists configured connections.
///
/// ## Errors
///
/// Returns an error if output serialization fails.
pub fn run_connections(ctx: &Context, format: OutputFormat) -> CliResult<()> {
    let rows: Vec<ConnectionDisplay> = ctx
        .config
        .connections
        .iter()
        .map(|c| {
            let transport = c.transport();
            ConnectionDisplay {
                identifier: c.identifier.clone(),
                url: transport.url,
                base_dn: c.base_dn.clone(),
                object_class: c.object_class.clone(),
                cache_ttl: c.cache_ttl,
                fixture: ctx.config.fixtures.contains_key(&c.identifier),
            }
        })
        .collect();
    output::output(&rows, format, |row| row.identifier.as_str())
}
