//! # relay-ldap
//!
//! Command-line tool for the relay directory connector.

#![forbid(unsafe_code)]

use clap::Parser;
use relay_cli::{
    cli::{Cli, Command},
    commands::{run_attributes, run_check, run_connections, run_entries, run_entry},
    output::error,
    CliResult, Context, RelayConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = RelayConfig::load(&cli.config)?;
    tracing::debug!(
        path = %cli.config.display(),
        connections = config.connections.len(),
        "loaded configuration"
    );
    let ctx = Context::build(config).await?;

    match cli.command {
        Command::Check => run_check(&ctx, cli.output).await,
        Command::Connections => run_connections(&ctx, cli.output),
        Command::Entry(args) => run_entry(&ctx, args, cli.output).await,
        Command::Entries(args) => run_entries(&ctx, args, cli.output).await,
        Command::Attributes(args) => run_attributes(&ctx, args, cli.output).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        error(&e.to_string());
        std::process::exit(1);
    }
}
