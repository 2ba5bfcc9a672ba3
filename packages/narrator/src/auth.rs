//! Credentials and access-token handling for the remote store.
//!
//! Acquiring tokens (OAuth consent, refresh-token exchange) is delegated to an
//! [`AuthProvider`]. The pipeline only ever sees tokens through a
//! [`TokenCache`], which serializes refreshes so concurrent uploads that hit an
//! expired token trigger a single refresh.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretBox};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// An access token or API key. Debug output is redacted.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    /// The raw value, for building a request header.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no access token configured")]
    Missing,

    #[error("access token cannot be refreshed by this provider")]
    RefreshUnsupported,

    #[error("token refresh failed: {0}")]
    Refresh(String),
}

/// Source of access tokens for the remote store.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current token.
    async fn access_token(&self) -> Result<SecretString, AuthError>;

    /// Obtain a new token after the current one was rejected.
    async fn refresh(&self) -> Result<SecretString, AuthError> {
        Err(AuthError::RefreshUnsupported)
    }
}

/// A token handed over at startup, e.g. from `DRIVE_ACCESS_TOKEN`.
pub struct StaticTokenProvider {
    token: Option<SecretString>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// A provider with no token; every request fails with [`AuthError::Missing`].
    pub fn unset() -> Self {
        Self { token: None }
    }

    /// Read the token from an environment variable. Empty values count as unset.
    pub fn from_env(var: &str) -> Self {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Self::new(token),
            _ => Self::unset(),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<SecretString, AuthError> {
        self.token.clone().ok_or(AuthError::Missing)
    }
}

#[derive(Clone)]
struct CachedToken {
    generation: u64,
    token: SecretString,
}

/// Shared, refreshable view of the provider's token.
///
/// Reads are concurrent; a refresh holds the write lock. Each token carries a
/// generation number so a caller holding a stale token can tell whether
/// another worker already refreshed it.
pub struct TokenCache {
    provider: Arc<dyn AuthProvider>,
    current: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            current: RwLock::new(None),
        }
    }

    /// Current token and its generation, fetching it on first use.
    pub async fn current(&self) -> Result<(u64, SecretString), AuthError> {
        if let Some(cached) = self.current.read().await.as_ref() {
            return Ok((cached.generation, cached.token.clone()));
        }

        let mut guard = self.current.write().await;
        if let Some(cached) = guard.as_ref() {
            return Ok((cached.generation, cached.token.clone()));
        }
        let token = self.provider.access_token().await?;
        *guard = Some(CachedToken {
            generation: 0,
            token: token.clone(),
        });
        Ok((0, token))
    }

    /// Replace the token of generation `stale` with a fresh one.
    ///
    /// If another caller already refreshed past `stale`, its token is returned
    /// without asking the provider again.
    pub async fn refresh_after(&self, stale: u64) -> Result<(u64, SecretString), AuthError> {
        let mut guard = self.current.write().await;
        if let Some(cached) = guard.as_ref() {
            if cached.generation > stale {
                return Ok((cached.generation, cached.token.clone()));
            }
        }

        let token = self.provider.refresh().await?;
        let generation = stale + 1;
        info!(generation, "Access token refreshed");
        *guard = Some(CachedToken {
            generation,
            token: token.clone(),
        });
        Ok((generation, token))
    }
}
