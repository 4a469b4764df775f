//! In-memory directory.
//!
//! Evaluates compiled filters against a fixed entry list. Used by tests and
//! by the CLI's demo mode. Counters expose how many searches ran and how
//! many entries were pulled, so callers can observe caching and streaming.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::config::ConnectionConfig;
use crate::directory::{Directory, DirectoryConnector, EntryStream, SearchRequest};
use crate::entry::LdapEntry;
use crate::error::{LdapError, LdapResult};
use crate::query::LdapFilter;

#[derive(Debug, Default)]
struct Store {
    entries: RwLock<Vec<LdapEntry>>,
    unavailable: AtomicBool,
    connects: AtomicUsize,
    searches: AtomicUsize,
    pulled: AtomicUsize,
    abandoned: AtomicUsize,
    last_request: Mutex<Option<SearchRequest>>,
}

/// Directory backed by a shared entry list.
///
/// Clones share entries and counters but each has its own session state.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    store: Arc<Store>,
    connected: bool,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory holding `entries`.
    #[must_use]
    pub fn with_entries(entries: Vec<LdapEntry>) -> Self {
        let directory = Self::new();
        *directory.store.entries.write() = entries;
        directory
    }

    /// Adds an entry.
    pub fn insert(&self, entry: LdapEntry) {
        self.store.entries.write().push(entry);
    }

    /// Makes every connect and search fail while `false`.
    pub fn set_available(&self, available: bool) {
        self.store.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of successful connects.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.store.connects.load(Ordering::SeqCst)
    }

    /// Number of searches started.
    #[must_use]
    pub fn searches(&self) -> usize {
        self.store.searches.load(Ordering::SeqCst)
    }

    /// Number of entries handed out across all searches.
    #[must_use]
    pub fn pulled(&self) -> usize {
        self.store.pulled.load(Ordering::SeqCst)
    }

    /// Number of searches stopped before exhaustion.
    #[must_use]
    pub fn abandoned(&self) -> usize {
        self.store.abandoned.load(Ordering::SeqCst)
    }

    /// The most recent search request.
    #[must_use]
    pub fn last_request(&self) -> Option<SearchRequest> {
        self.store.last_request.lock().clone()
    }

    fn check_available(&self) -> LdapResult<()> {
        if self.store.unavailable.load(Ordering::SeqCst) {
            Err(LdapError::connection("directory unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> LdapResult<()> {
        self.check_available()?;
        self.store.connects.fetch_add(1, Ordering::SeqCst);
        self.connected = true;
        Ok(())
    }

    async fn search<'a>(
        &'a mut self,
        request: SearchRequest,
    ) -> LdapResult<Box<dyn EntryStream + 'a>> {
        if !self.connected {
            return Err(LdapError::connection("session is not connected"));
        }
        if let Err(e) = self.check_available() {
            self.connected = false;
            return Err(e);
        }
        self.store.searches.fetch_add(1, Ordering::SeqCst);
        *self.store.last_request.lock() = Some(request.clone());
        Ok(Box::new(MemoryStream {
            store: Arc::clone(&self.store),
            filter: request.filter,
            remaining: request.size_limit,
            position: 0,
            done: false,
        }))
    }
}

struct MemoryStream {
    store: Arc<Store>,
    filter: LdapFilter,
    remaining: Option<usize>,
    position: usize,
    done: bool,
}

#[async_trait]
impl EntryStream for MemoryStream {
    async fn next_entry(&mut self) -> LdapResult<Option<LdapEntry>> {
        if self.done || self.remaining == Some(0) {
            self.done = true;
            return Ok(None);
        }
        let entries = self.store.entries.read();
        while let Some(entry) = entries.get(self.position) {
            self.position += 1;
            if matches(&self.filter, entry) {
                self.store.pulled.fetch_add(1, Ordering::SeqCst);
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Ok(Some(entry.clone()));
            }
        }
        self.done = true;
        Ok(None)
    }

    async fn abandon(&mut self) -> LdapResult<()> {
        if !self.done {
            self.done = true;
            self.store.abandoned.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Evaluates `filter` against `entry`, ignoring case like the default
/// directory matching rules.
#[must_use]
pub fn matches(filter: &LdapFilter, entry: &LdapEntry) -> bool {
    let values = |attr: &str| {
        entry
            .attribute_value(attr)
            .map(|v| v.to_vec())
            .unwrap_or_default()
    };

    match filter {
        LdapFilter::And(clauses) => clauses.iter().all(|c| matches(c, entry)),
        LdapFilter::Or(clauses) => clauses.iter().any(|c| matches(c, entry)),
        LdapFilter::Not(inner) => !matches(inner, entry),
        LdapFilter::Present { attr } => entry.has_attribute(attr),
        LdapFilter::Equality { attr, value } => {
            values(attr).iter().any(|v| v.eq_ignore_ascii_case(value))
        }
        LdapFilter::Substring {
            attr,
            initial,
            any,
            last,
        } => values(attr)
            .iter()
            .any(|v| substring_matches(v, initial.as_deref(), any, last.as_deref())),
        LdapFilter::GreaterOrEqual { attr, value } => values(attr)
            .iter()
            .any(|v| compare(v, value) != std::cmp::Ordering::Less),
        LdapFilter::LessOrEqual { attr, value } => values(attr)
            .iter()
            .any(|v| compare(v, value) != std::cmp::Ordering::Greater),
    }
}

fn substring_matches(value: &str, initial: Option<&str>, any: &[String], last: Option<&str>) -> bool {
    let value = value.to_lowercase();
    let mut rest = value.as_str();

    if let Some(initial) = initial {
        let initial = initial.to_lowercase();
        match rest.strip_prefix(initial.as_str()) {
            Some(tail) => rest = tail,
            None => return false,
        }
    }
    for fragment in any {
        let fragment = fragment.to_lowercase();
        match rest.find(fragment.as_str()) {
            Some(at) => rest = &rest[at + fragment.len()..],
            None => return false,
        }
    }
    last.map_or(true, |last| rest.ends_with(last.to_lowercase().as_str()))
}

fn compare(value: &str, bound: &str) -> std::cmp::Ordering {
    match (value.parse::<i64>(), bound.parse::<i64>()) {
        (Ok(v), Ok(b)) => v.cmp(&b),
        _ => value.to_lowercase().cmp(&bound.to_lowercase()),
    }
}

/// Connector handing out [`MemoryDirectory`] sessions by connection
/// identifier. Unknown identifiers get an empty directory.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    directories: DashMap<String, MemoryDirectory>,
}

impl MemoryConnector {
    /// Creates a connector without directories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the directory served for `identifier`.
    #[must_use]
    pub fn with_directory(self, identifier: impl Into<String>, directory: MemoryDirectory) -> Self {
        self.directories.insert(identifier.into(), directory);
        self
    }
}

impl DirectoryConnector for MemoryConnector {
    fn open(&self, config: &ConnectionConfig) -> Box<dyn Directory> {
        let directory = self
            .directories
            .entry(config.identifier.clone())
            .or_default()
            .clone();
        Box::new(MemoryDirectory {
            connected: false,
            ..directory
        })
    }
}
