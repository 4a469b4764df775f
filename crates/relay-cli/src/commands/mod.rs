//! Command implementations.

pub mod attributes;
pub mod check;
pub mod connections;
pub mod entries;

pub use attributes::run_attributes;
pub use check::run_check;
pub use connections::run_connections;
pub use entries::{run_entries, run_entry};
