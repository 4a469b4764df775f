//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{OutputFormat, DEFAULT_CONFIG_PATH};

/// relay-ldap - query configured directory connections.
#[derive(Debug, Parser)]
#[command(name = "relay-ldap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, env = "RELAY_LDAP_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the health checks of every connection.
    Check,

    /// List configured connections.
    Connections,

    /// Look up one entry by attribute value.
    Entry(EntryArgs),

    /// List a page of entries.
    Entries(EntriesArgs),

    /// Resolve the authorization attributes of a user.
    Attributes(AttributesArgs),
}

/// Arguments of `entry`.
#[derive(Debug, Args)]
pub struct EntryArgs {
    /// Connection identifier.
    pub connection: String,

    /// Attribute to match.
    pub attribute: String,

    /// Value to match exactly.
    pub value: String,
}

/// Arguments of `entries`.
#[derive(Debug, Args)]
pub struct EntriesArgs {
    /// Connection identifier.
    pub connection: String,

    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Entries per page.
    #[arg(long, default_value_t = relay_ldap::DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Filter tree as JSON, e.g. `{"type":"condition","field":"sn","operator":"eq","value":"Doe"}`.
    #[arg(long)]
    pub filter: Option<String>,

    /// Sort keys as `field[:asc|desc]`, comma separated.
    #[arg(long)]
    pub sort: Option<String>,
}

/// Arguments of `attributes`.
#[derive(Debug, Args)]
pub struct AttributesArgs {
    /// User identifier; omit to print the defaults.
    pub user_id: Option<String>,

    /// Session cache key; enables the per-session attribute cache.
    #[arg(long)]
    pub session_key: Option<String>,

    /// Session lifetime in seconds.
    #[arg(long, default_value_t = 300)]
    pub session_ttl: u64,
}
