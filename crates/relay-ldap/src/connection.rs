//! Directory connection: retrieval operations over one lazily established
//! session, with an optional query-result cache.
//!
//! The session is opened on first use and re-checked before every query.
//! A failed connect leaves it unconnected, so the next query simply tries
//! again. Queries on one connection are serialized over its session.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use relay_cache::{CacheProvider, CacheProviderExt, CacheResult};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::ConnectionConfig;
use crate::directory::{Directory, SearchRequest};
use crate::entry::LdapEntry;
use crate::error::{LdapError, LdapResult};
use crate::filter::{add_filter, FilterNode};
use crate::query::{attribute_name, LdapFilter, QueryBuilder};
use crate::sort::{self, SortSpec};

/// Default page size of [`LdapConnection::get_entries`].
pub const DEFAULT_PAGE_SIZE: usize = 30;

/// Server page size used while collecting a result set for sorting.
const SORT_FETCH_PAGE_SIZE: usize = 500;

/// Optional filter and sort of a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntriesOptions {
    /// Filter ANDed with the object class restriction.
    #[serde(default)]
    pub filter: Option<FilterNode>,
    /// Sort order; when set the whole result set is sorted client side.
    #[serde(default)]
    pub sort: Option<SortSpec>,
}

impl EntriesOptions {
    /// No filter, no sort.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fetch {
    First,
    Page { page: usize, page_size: usize },
    Sorted { sort: SortSpec, page: usize, page_size: usize },
}

impl Fetch {
    fn page_size(&self, sort_limit: usize) -> Option<usize> {
        match self {
            Self::First => None,
            Self::Page { page_size, .. } => Some(*page_size),
            Self::Sorted { .. } => Some(SORT_FETCH_PAGE_SIZE.min(sort_limit.saturating_add(1))),
        }
    }

    const fn size_limit(&self) -> Option<usize> {
        match self {
            Self::First => Some(1),
            Self::Page { .. } | Self::Sorted { .. } => None,
        }
    }
}

impl fmt::Display for Fetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::Page { page, page_size } => write!(f, "page:{page}:{page_size}"),
            Self::Sorted {
                sort,
                page,
                page_size,
            } => write!(f, "sorted:{sort}:{page}:{page_size}"),
        }
    }
}

/// A query ready to run. `until` is set when its result may be cached.
#[derive(Debug)]
struct Query {
    filter: LdapFilter,
    fetch: Fetch,
    until: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedResult {
    until: DateTime<Utc>,
    entries: Vec<LdapEntry>,
}

/// Connection to one directory endpoint.
pub struct LdapConnection {
    config: ConnectionConfig,
    session: Mutex<Box<dyn Directory>>,
    cache: Option<Arc<dyn CacheProvider>>,
}

impl LdapConnection {
    /// Creates a connection over an unconnected `directory` session.
    ///
    /// Query results are cached in `cache` when the config's `cache_ttl` is
    /// positive.
    #[must_use]
    pub fn new(
        config: ConnectionConfig,
        directory: Box<dyn Directory>,
        cache: Option<Arc<dyn CacheProvider>>,
    ) -> Self {
        Self {
            config,
            session: Mutex::new(directory),
            cache,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns the connection identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.config.identifier
    }

    /// Probes the directory with a first-match search.
    ///
    /// ## Errors
    ///
    /// Any failure is reported as [`LdapError::ServerConnectionFailed`].
    pub async fn check_connection(&self) -> LdapResult<()> {
        let query = self.cached_query(LdapFilter::present("objectClass"), Fetch::First);
        match self.run_query(query).await {
            Ok(_) => Ok(()),
            Err(e @ LdapError::ServerConnectionFailed(_)) => Err(e),
            Err(e) => Err(LdapError::connection(e.to_string())),
        }
    }

    /// Checks that at least one entry of the configured object class has
    /// each of `names`. Empty names are skipped.
    ///
    /// ## Errors
    ///
    /// Returns one [`LdapError::UserAttributeUndefined`] listing every
    /// missing attribute, [`LdapError::FilterInvalid`] for a malformed name
    /// (before any search), or a transport error.
    pub async fn assert_attributes_exist<S>(&self, names: &[S]) -> LdapResult<()>
    where
        S: AsRef<str> + Sync,
    {
        let names = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|n| !n.trim().is_empty())
            .map(attribute_name)
            .collect::<LdapResult<Vec<_>>>()?;

        let mut missing = Vec::new();
        for name in names {
            let mut builder = self.base_query();
            builder.push(LdapFilter::present(name));
            let query = self.cached_query(builder.build(), Fetch::First);
            if self.run_query(query).await?.is_empty() {
                missing.push(name.to_string());
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LdapError::UserAttributeUndefined(missing))
        }
    }

    /// Returns the first entry whose `name` attribute equals `value`.
    ///
    /// ## Errors
    ///
    /// - [`LdapError::UserAttributeUndefined`] if `name` is empty
    /// - [`LdapError::FilterInvalid`] if `name` is not an attribute name
    /// - [`LdapError::EntryNotFound`] if nothing matches
    /// - [`LdapError::ServerConnectionFailed`] on transport failure
    pub async fn get_entry_by_attribute(&self, name: &str, value: &str) -> LdapResult<LdapEntry> {
        if name.trim().is_empty() {
            return Err(LdapError::attribute_undefined("<empty>"));
        }
        let name = attribute_name(name)?;

        let mut builder = self.base_query();
        builder.push(LdapFilter::eq(name, value));
        let query = self.cached_query(builder.build(), Fetch::First);

        self.run_query(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LdapError::EntryNotFound(format!("{name}={value}")))
    }

    /// Returns the 1-based `page` of entries matching `options`.
    ///
    /// Without a sort, entries are streamed in chunks of `page_size` and
    /// the search stops after the requested chunk. With a sort, all
    /// matches are collected (up to the configured sort limit), sorted and
    /// sliced. `page` and `page_size` below 1 count as 1.
    ///
    /// ## Errors
    ///
    /// - [`LdapError::FilterInvalid`] for a malformed filter, before any search
    /// - [`LdapError::TooManyResultsToSort`] past the sort limit
    /// - [`LdapError::ServerConnectionFailed`] on transport failure
    pub async fn get_entries(
        &self,
        page: usize,
        page_size: usize,
        options: &EntriesOptions,
    ) -> LdapResult<Vec<LdapEntry>> {
        let page = page.max(1);
        let page_size = page_size.max(1);

        let mut builder = self.base_query();
        if let Some(filter) = &options.filter {
            add_filter(&mut builder, filter)?;
        }

        let fetch = match &options.sort {
            Some(sort) if !sort.is_empty() => Fetch::Sorted {
                sort: sort.clone(),
                page,
                page_size,
            },
            _ => Fetch::Page { page, page_size },
        };

        let query = self.cached_query(builder.build(), fetch);
        self.run_query(query).await
    }

    fn base_query(&self) -> QueryBuilder {
        let mut builder = QueryBuilder::new();
        builder.push(LdapFilter::object_class(&self.config.object_class));
        builder
    }

    /// Tags the query with an expiry when this connection caches results.
    fn cached_query(&self, filter: LdapFilter, fetch: Fetch) -> Query {
        let until = match (&self.cache, self.config.cache_ttl) {
            (Some(_), ttl) if ttl > 0 => i64::try_from(ttl)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl)),
            _ => None,
        };
        Query {
            filter,
            fetch,
            until,
        }
    }

    fn cache_key(&self, query: &Query) -> String {
        format!(
            "ldap-query:{}:{}:{}",
            self.config.base_dn, query.filter, query.fetch
        )
    }

    async fn run_query(&self, query: Query) -> LdapResult<Vec<LdapEntry>> {
        let (Some(cache), Some(until)) = (&self.cache, query.until) else {
            return self.execute(&query).await;
        };

        let key = self.cache_key(&query);
        let cached: CacheResult<Option<CachedResult>> = cache.get_json(&key).await;
        match cached {
            Ok(Some(hit)) if hit.until > Utc::now() => {
                tracing::trace!(connection = %self.config.identifier, %key, "query served from cache");
                return Ok(hit.entries);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(connection = %self.config.identifier, error = %e, "query cache read failed");
            }
        }

        let entries = self.execute(&query).await?;
        let cached = CachedResult {
            until,
            entries: entries.clone(),
        };
        if let Err(e) = cache
            .set_json(&key, &cached, self.config.cache_lifetime())
            .await
        {
            tracing::warn!(connection = %self.config.identifier, error = %e, "query cache write failed");
        }
        Ok(entries)
    }

    async fn execute(&self, query: &Query) -> LdapResult<Vec<LdapEntry>> {
        let mut session = self.session.lock().await;
        if !session.is_connected() {
            tracing::debug!(connection = %self.config.identifier, "connecting to directory");
            session.connect().await?;
        }

        let request = SearchRequest {
            base: self.config.base_dn.clone(),
            filter: query.filter.clone(),
            page_size: query.fetch.page_size(self.config.sort_limit),
            size_limit: query.fetch.size_limit(),
        };
        tracing::debug!(
            connection = %self.config.identifier,
            filter = %request.filter,
            mode = %query.fetch,
            "directory search"
        );

        let mut stream = session.search(request).await?;
        let result = match &query.fetch {
            Fetch::First => stream
                .next_entry()
                .await
                .map(|entry| entry.into_iter().collect()),
            Fetch::Page { page, page_size } => {
                sort::nth_chunk(stream.as_mut(), *page, *page_size).await
            }
            Fetch::Sorted { .. } => {
                sort::collect_bounded(stream.as_mut(), self.config.sort_limit).await
            }
        };
        if let Err(e) = stream.abandon().await {
            tracing::warn!(connection = %self.config.identifier, error = %e, "failed to abandon search");
        }
        drop(stream);
        drop(session);

        let mut entries = result.map_err(|e| {
            if let LdapError::TooManyResultsToSort { limit } = e {
                tracing::warn!(connection = %self.config.identifier, limit, "sort limit exceeded");
            }
            e
        })?;

        if let Fetch::Sorted {
            sort,
            page,
            page_size,
        } = &query.fetch
        {
            sort::sort_entries(&mut entries, sort);
            entries = sort::slice_page(entries, *page, *page_size);
        }
        Ok(entries)
    }
}

impl fmt::Debug for LdapConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapConnection")
            .field("config", &self.config)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDirectory;

    fn connection(directory: &MemoryDirectory) -> LdapConnection {
        LdapConnection::new(
            ConnectionConfig::new("test", "localhost", "o=org"),
            Box::new(directory.clone()),
            None,
        )
    }

    #[tokio::test]
    async fn connects_lazily_once() {
        let directory = MemoryDirectory::new();
        let conn = connection(&directory);
        assert_eq!(directory.connects(), 0);

        conn.check_connection().await.unwrap();
        conn.check_connection().await.unwrap();
        assert_eq!(directory.connects(), 1);
        assert_eq!(directory.searches(), 2);
    }

    #[tokio::test]
    async fn failed_connect_is_retried_by_next_query() {
        let directory = MemoryDirectory::new();
        let conn = connection(&directory);

        directory.set_available(false);
        let err = conn.check_connection().await.unwrap_err();
        assert_eq!(err.code(), 1);

        directory.set_available(true);
        conn.check_connection().await.unwrap();
        assert_eq!(directory.connects(), 1);
    }

    #[tokio::test]
    async fn empty_attribute_name_is_undefined() {
        let directory = MemoryDirectory::new();
        let err = connection(&directory)
            .get_entry_by_attribute("", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, LdapError::UserAttributeUndefined(_)));
        assert_eq!(directory.searches(), 0);
    }

    #[test]
    fn cache_key_covers_mode() {
        let directory = MemoryDirectory::new();
        let conn = connection(&directory);
        let first = conn.cached_query(LdapFilter::present("cn"), Fetch::First);
        let page = conn.cached_query(
            LdapFilter::present("cn"),
            Fetch::Page {
                page: 2,
                page_size: 10,
            },
        );
        assert_eq!(conn.cache_key(&first), "ldap-query:o=org:(cn=*):first");
        assert_eq!(conn.cache_key(&page), "ldap-query:o=org:(cn=*):page:2:10");
        assert!(first.until.is_none());
    }
}
