//! Retrieval engine tests against the in-memory directory.

mod common;
mod caching;
mod registry;
mod retrieval;
