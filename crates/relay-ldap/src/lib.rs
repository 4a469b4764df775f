//! # relay-ldap
//!
//! Directory query engine.
//!
//! Callers express selection criteria as portable [`FilterNode`] trees and
//! [`SortSpec`]s instead of directory syntax. The engine compiles them into
//! LDAP filters, runs them on a named, lazily established connection and
//! returns normalized [`LdapEntry`] records.
//!
//! - [`filter`] / [`query`]: filter tree compiler
//! - [`sort`]: chunked pagination and bounded client-side sorting
//! - [`connection`]: retrieval operations and the query cache
//! - [`provider`]: connection registry
//! - [`directory`]: transport seam (`ldap3`), [`memory`]: in-memory directory
//! - [`health`]: connectivity and attribute checks
//!
//! ## Example
//!
//! ```ignore
//! use relay_ldap::{ConnectionConfig, EntriesOptions, LdapConnectionProvider, SortSpec};
//!
//! let provider = LdapConnectionProvider::new();
//! provider.set_config(vec![ConnectionConfig::new("main", "ldap.example.com", "o=org")])?;
//!
//! let connection = provider.get_connection("main")?;
//! let page = connection
//!     .get_entries(1, 30, &EntriesOptions::new().sort("sn".parse::<SortSpec>()?))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod connection;
pub mod directory;
pub mod entry;
pub mod error;
pub mod filter;
pub mod health;
pub mod memory;
pub mod provider;
pub mod query;
pub mod sort;

pub use config::{ConnectionConfig, Encryption};
pub use connection::{EntriesOptions, LdapConnection, DEFAULT_PAGE_SIZE};
pub use directory::{Directory, DirectoryConnector, EntryStream, Ldap3Connector};
pub use entry::{AttributeValue, LdapEntry};
pub use error::{LdapError, LdapResult};
pub use filter::{FilterNode, FilterValue, Operator};
pub use health::{CheckResult, CheckStatus, HealthCheck};
pub use memory::{MemoryConnector, MemoryDirectory};
pub use provider::LdapConnectionProvider;
pub use query::{is_attribute_description, LdapFilter, QueryBuilder};
pub use sort::SortSpec;
