//! `entry` and `entries` commands.

use relay_ldap::{EntriesOptions, FilterNode, LdapEntry, SortSpec};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::cli::{EntriesArgs, EntryArgs};
use crate::config::OutputFormat;
use crate::context::Context;
use crate::error::CliResult;
use crate::output;

/// Entry display struct.
#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
pub struct EntryDisplay {
    /// Distinguished name.
    #[tabled(rename = "DN")]
    pub dn: String,
    /// Attributes as `name=value` lines.
    #[tabled(rename = "Attributes")]
    pub attributes: String,
}

impl From<&LdapEntry> for EntryDisplay {
    fn from(entry: &LdapEntry) -> Self {
        let attributes = entry
            .attribute_values()
            .iter()
            .map(|(name, value)| format!("{name}={}", value.to_vec().join(", ")))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            dn: entry.dn().to_string(),
            attributes,
        }
    }
}

/// Builds listing options from the raw `--filter` and `--sort` arguments.
///
/// ## Errors
///
/// Returns an error if the filter JSON or the sort keys are malformed.
pub fn parse_options(filter: Option<&str>, sort: Option<&str>) -> CliResult<EntriesOptions> {
    let mut options = EntriesOptions::new();
    if let Some(json) = filter {
        options = options.filter(FilterNode::from_json(json)?);
    }
    if let Some(keys) = sort {
        let spec: SortSpec = keys.parse()?;
        if !spec.is_empty() {
            options = options.sort(spec);
        }
    }
    Ok(options)
}

fn print_entries(entries: &[LdapEntry], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json | OutputFormat::Yaml => output::output_single(&entries, format),
        OutputFormat::Table | OutputFormat::Quiet => {
            let rows: Vec<EntryDisplay> = entries.iter().map(EntryDisplay::from).collect();
            output::output(&rows, format, |row| row.dn.as_str())
        }
    }
}

/// Looks up one entry.
///
/// ## Errors
///
/// Returns an error if the connection is unknown, the lookup fails or no
/// entry matches.
pub async fn run_entry(ctx: &Context, args: EntryArgs, format: OutputFormat) -> CliResult<()> {
    let connection = ctx.connections.get_connection(&args.connection)?;
    let entry = connection
        .get_entry_by_attribute(&args.attribute, &args.value)
        .await?;
    print_entries(std::slice::from_ref(&entry), format)
}

/// Lists one page of entries.
///
/// ## Errors
///
/// Returns an error if the connection is unknown, the arguments are
/// malformed or the search fails.
pub async fn run_entries(ctx: &Context, args: EntriesArgs, format: OutputFormat) -> CliResult<()> {
    let options = parse_options(args.filter.as_deref(), args.sort.as_deref())?;
    let connection = ctx.connections.get_connection(&args.connection)?;
    let entries = connection
        .get_entries(args.page, args.page_size, &options)
        .await?;

    tracing::debug!(
        connection = %args.connection,
        page = args.page,
        count = entries.len(),
        "listed entries"
    );
    print_entries(&entries, format)
}
