//! # relay-authz
//!
//! User attribute provider for authorization.
//!
//! Looks users up in a directory through [`relay_ldap`] and maps their
//! entries to declared attributes with default fallback. Listeners can
//! contribute values after the entry is loaded, and results can be cached
//! per user session.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod provider;
pub mod session;

pub use config::{AttributeDefinition, UserAttributeConfig};
pub use error::{AttributeError, AttributeResult};
pub use event::{UserDataLoadedEvent, UserDataLoadedListener};
pub use provider::{UserAttributeProvider, UserAttributes};
pub use session::UserSession;
