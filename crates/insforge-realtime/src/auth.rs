//! Access-token sources for the socket handshake.
//!
//! The token is resolved on every `connect()` so a session refreshed by the
//! auth layer is picked up by the next connection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RealtimeError;

/// Supplies the bearer token sent in the socket handshake.
///
/// `Ok(None)` means "connect anonymously".
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>, RealtimeError>;
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    async fn access_token(&self) -> Result<Option<String>, RealtimeError> {
        (**self).access_token().await
    }
}

/// Extract the bearer token from an HTTP header map.
///
/// Looks up `Authorization` case-insensitively and strips a `Bearer ` prefix.
pub fn bearer_from_headers(headers: &HashMap<String, String>) -> Option<String> {
    let value = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
        .map(|(_, value)| value.trim_start())?;

    // The scheme may be followed by nothing at all when signed out.
    let token = match value.get(..6) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case("bearer")
                && value[6..].chars().next().map_or(true, char::is_whitespace) =>
        {
            value[6..].trim()
        }
        _ => value.trim(),
    };

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// A fixed token (or none).
#[derive(Clone)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StaticToken")
            .field(&self.0.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<Option<String>, RealtimeError> {
        Ok(self.0.clone())
    }
}

/// Reads the token from the current request headers of the HTTP layer.
pub struct HeaderTokenProvider<F> {
    headers: F,
}

impl<F> HeaderTokenProvider<F>
where
    F: Fn() -> HashMap<String, String> + Send + Sync,
{
    pub fn new(headers: F) -> Self {
        Self { headers }
    }
}

#[async_trait]
impl<F> TokenProvider for HeaderTokenProvider<F>
where
    F: Fn() -> HashMap<String, String> + Send + Sync,
{
    async fn access_token(&self) -> Result<Option<String>, RealtimeError> {
        Ok(bearer_from_headers(&(self.headers)()))
    }
}

/// Adapter for a synchronous closure.
pub struct FnTokenProvider<F>(F);

/// Wrap a closure returning the current token.
pub fn token_fn<F>(f: F) -> FnTokenProvider<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    FnTokenProvider(f)
}

#[async_trait]
impl<F> TokenProvider for FnTokenProvider<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    async fn access_token(&self) -> Result<Option<String>, RealtimeError> {
        Ok((self.0)())
    }
}

/// Falls back to a fixed key (typically the anon key) when the inner
/// provider has no token.
pub struct WithFallback<P> {
    inner: P,
    fallback: String,
}

impl<P: TokenProvider> WithFallback<P> {
    pub fn new(inner: P, fallback: impl Into<String>) -> Self {
        Self {
            inner,
            fallback: fallback.into(),
        }
    }
}

#[async_trait]
impl<P: TokenProvider> TokenProvider for WithFallback<P> {
    async fn access_token(&self) -> Result<Option<String>, RealtimeError> {
        match self.inner.access_token().await? {
            Some(token) => Ok(Some(token)),
            None => Ok(Some(self.fallback.clone())),
        }
    }
}
