//! Directory transport.
//!
//! [`Directory`] is the seam between the query engine and the network
//! client. [`Ldap3Directory`] talks to a real server through `ldap3`;
//! [`MemoryDirectory`](crate::memory::MemoryDirectory) serves tests and demos.

use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{
    Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions, SearchStream,
};

use crate::config::{ConnectionConfig, TlsMode};
use crate::entry::LdapEntry;
use crate::error::{LdapError, LdapResult};
use crate::query::LdapFilter;

/// A subtree search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Search base DN.
    pub base: String,
    /// Compiled filter.
    pub filter: LdapFilter,
    /// Server-side page size (paged results control), `None` to let the
    /// server stream everything in one response.
    pub page_size: Option<usize>,
    /// Maximum number of entries the server should return.
    pub size_limit: Option<usize>,
}

/// Entries of a running search, pulled one at a time.
#[async_trait]
pub trait EntryStream: Send {
    /// Next entry, or `None` once the search is complete.
    async fn next_entry(&mut self) -> LdapResult<Option<LdapEntry>>;

    /// Stops the search before it is exhausted. No-op after completion.
    async fn abandon(&mut self) -> LdapResult<()>;
}

/// One session with a directory server.
#[async_trait]
pub trait Directory: Send {
    /// Returns true once [`connect`](Directory::connect) succeeded and no
    /// transport failure happened since.
    fn is_connected(&self) -> bool;

    /// Opens and binds the session.
    async fn connect(&mut self) -> LdapResult<()>;

    /// Starts a search on the connected session.
    async fn search<'a>(&'a mut self, request: SearchRequest)
        -> LdapResult<Box<dyn EntryStream + 'a>>;
}

/// Creates unconnected sessions for connection configs.
pub trait DirectoryConnector: Send + Sync {
    /// Returns a new, not yet connected session for `config`.
    fn open(&self, config: &ConnectionConfig) -> Box<dyn Directory>;
}

// ============================================================================
// ldap3 transport
// ============================================================================

/// Connector producing [`Ldap3Directory`] sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ldap3Connector;

impl DirectoryConnector for Ldap3Connector {
    fn open(&self, config: &ConnectionConfig) -> Box<dyn Directory> {
        Box::new(Ldap3Directory::new(config.clone()))
    }
}

/// Session with a directory server over `ldap3`.
pub struct Ldap3Directory {
    config: ConnectionConfig,
    ldap: Option<Ldap>,
}

impl Ldap3Directory {
    /// Creates an unconnected session.
    #[must_use]
    pub const fn new(config: ConnectionConfig) -> Self {
        Self { config, ldap: None }
    }
}

#[async_trait]
impl Directory for Ldap3Directory {
    fn is_connected(&self) -> bool {
        self.ldap.is_some()
    }

    async fn connect(&mut self) -> LdapResult<()> {
        let transport = self.config.transport();
        let mut settings =
            LdapConnSettings::new().set_starttls(transport.tls == TlsMode::StartTls);
        if let Some(timeout) = self.config.connect_timeout() {
            settings = settings.set_conn_timeout(timeout);
        }

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &transport.url)
            .await
            .map_err(|e| LdapError::connection(format!("{}: {e}", transport.url)))?;

        let identifier = self.config.identifier.clone();
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(connection = %identifier, error = %e, "LDAP connection driver error");
            }
        });

        if !self.config.username.is_empty() {
            ldap.simple_bind(&self.config.username, &self.config.password)
                .await?
                .success()
                .map_err(|e| LdapError::connection(format!("bind failed: {e}")))?;
        }

        tracing::debug!(
            connection = %self.config.identifier,
            url = %transport.url,
            "LDAP session established"
        );
        self.ldap = Some(ldap);
        Ok(())
    }

    async fn search<'a>(
        &'a mut self,
        request: SearchRequest,
    ) -> LdapResult<Box<dyn EntryStream + 'a>> {
        let ldap = self
            .ldap
            .as_mut()
            .ok_or_else(|| LdapError::connection("session is not connected"))?;

        let mut adapters: Vec<Box<dyn Adapter<'static, String, Vec<String>>>> =
            vec![Box::new(EntriesOnly::new())];
        if let Some(size) = request.page_size {
            let size = i32::try_from(size).unwrap_or(i32::MAX);
            adapters.push(Box::new(PagedResults::new(size)));
        }

        if let Some(limit) = request.size_limit {
            let limit = i32::try_from(limit).unwrap_or(i32::MAX);
            ldap.with_search_options(SearchOptions::new().sizelimit(limit));
        }

        let filter = request.filter.to_string();
        tracing::trace!(base = %request.base, %filter, "LDAP search");

        let result = ldap
            .streaming_search_with(
                adapters,
                &request.base,
                Scope::Subtree,
                &filter,
                vec!["*".to_string()],
            )
            .await;
        match result {
            Ok(stream) => Ok(Box::new(Ldap3Stream {
                stream,
                session: &mut self.ldap,
                done: false,
            })),
            Err(e) => {
                if is_transport_error(&e) {
                    self.ldap = None;
                }
                Err(e.into())
            }
        }
    }
}

/// Errors after which the session can no longer be trusted. Filter parse
/// failures and server result codes leave it usable.
fn is_transport_error(err: &ldap3::LdapError) -> bool {
    !matches!(
        err,
        ldap3::LdapError::FilterParsing
            | ldap3::LdapError::LdapResult { .. }
            | ldap3::LdapError::AdapterInit(_)
    )
}

struct Ldap3Stream<'a> {
    stream: SearchStream<'static, String, Vec<String>>,
    session: &'a mut Option<Ldap>,
    done: bool,
}

impl Ldap3Stream<'_> {
    fn fail(&mut self, err: ldap3::LdapError) -> LdapError {
        self.done = true;
        if is_transport_error(&err) {
            *self.session = None;
        }
        err.into()
    }
}

#[async_trait]
impl EntryStream for Ldap3Stream<'_> {
    async fn next_entry(&mut self) -> LdapResult<Option<LdapEntry>> {
        if self.done {
            return Ok(None);
        }
        match self.stream.next().await {
            Ok(Some(entry)) => Ok(Some(LdapEntry::from_search_entry(SearchEntry::construct(
                entry,
            )))),
            Ok(None) => {
                self.done = true;
                self.stream
                    .finish()
                    .await
                    .success()
                    .map_err(|e| LdapError::connection(format!("search failed: {e}")))?;
                Ok(None)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn abandon(&mut self) -> LdapResult<()> {
        if self.done {
            return Ok(());
        }
        self.done = true;
        let handle = self.stream.ldap_handle();
        let msgid = handle.last_id();
        handle.abandon(msgid).await.map_err(|e| self.fail(e))
    }
}
