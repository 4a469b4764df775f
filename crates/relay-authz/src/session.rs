//! Caller session information.

use std::time::Duration;

/// The authenticated session a lookup is made for.
///
/// Attribute results are cached per session under
/// `<cache_key>-<user identifier>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    /// Identifier of the logged-in user, `None` for anonymous sessions.
    pub user_identifier: Option<String>,
    /// Session-scoped cache key prefix.
    pub cache_key: String,
    /// Remaining session lifetime.
    pub ttl: Duration,
}

impl UserSession {
    /// Creates a session.
    #[must_use]
    pub fn new(user_identifier: impl Into<String>, cache_key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            user_identifier: Some(user_identifier.into()),
            cache_key: cache_key.into(),
            ttl,
        }
    }

    /// Creates a session without a logged-in user.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            user_identifier: None,
            cache_key: String::new(),
            ttl: Duration::ZERO,
        }
    }

    /// Cache key of `user_id`'s attributes in this session.
    #[must_use]
    pub fn user_cache_key(&self, user_id: &str) -> String {
        format!("{}-{user_id}", self.cache_key)
    }

    /// Lifetime of cached attributes: one second past the session.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.ttl + Duration::from_secs(1)
    }
}
