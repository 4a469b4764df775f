//! # relay-cli
//!
//! Command-line front end of the relay directory connector.
//!
//! Loads connection records from a TOML file and exposes:
//! - Health checks over every connection
//! - Single entry lookup and paged, filtered, sorted listings
//! - User authorization attribute resolution

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::RelayConfig;
pub use context::Context;
pub use error::{CliError, CliResult};
