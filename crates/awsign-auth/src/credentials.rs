//! Credential resolution.
//!
//! [`CredentialProvider`] is the seam every signing operation resolves its
//! credentials through. [`EnvCredentialProvider`] implements the standard
//! lookup order:
//!
//! 1. `AWS_ACCESS_KEY_ID` + `AWS_SECRET_ACCESS_KEY` (+ optional
//!    `AWS_SESSION_TOKEN`), no I/O.
//! 2. `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`, fetched from the container
//!    metadata endpoint at `169.254.170.2`.
//!
//! Resolution is not cached; wrap a provider in [`CachingCredentialProvider`]
//! to reuse credentials until they approach their expiry.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use awsign_core::{HttpRequest, HttpTransport};
use chrono::{DateTime, TimeDelta, Utc};
use http::{Method, StatusCode};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::CredentialError;

/// Base URL of the container credentials endpoint.
pub const CONTAINER_CREDENTIALS_ENDPOINT: &str = "http://169.254.170.2";

/// An AWS access key pair with optional session token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token for temporary credentials.
    pub session_token: Option<String>,
    /// When temporary credentials stop being valid, if known.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Long-lived credentials without a session token.
    #[must_use]
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expires_at: None,
        }
    }

    /// Attach a session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Attach an expiry.
    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Resolves credentials for a signing operation.
#[async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Resolve a set of credentials.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] when no credentials can be obtained.
    async fn resolve(&self) -> Result<Credentials, CredentialError>;
}

#[async_trait]
impl<P: CredentialProvider + ?Sized> CredentialProvider for Arc<P> {
    async fn resolve(&self) -> Result<Credentials, CredentialError> {
        (**self).resolve().await
    }
}

/// A provider that always returns the same credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credentials: Credentials,
}

impl StaticCredentialProvider {
    /// Wrap fixed credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn resolve(&self) -> Result<Credentials, CredentialError> {
        Ok(self.credentials.clone())
    }
}

/// The credential-related environment variables, captured in one place.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialEnv {
    /// `AWS_ACCESS_KEY_ID`.
    pub access_key_id: Option<String>,
    /// `AWS_SECRET_ACCESS_KEY`.
    pub secret_access_key: Option<String>,
    /// `AWS_SESSION_TOKEN`.
    pub session_token: Option<String>,
    /// `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`.
    pub container_relative_uri: Option<String>,
}

impl CredentialEnv {
    /// Read the variables from the process environment. Empty values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            access_key_id: var("AWS_ACCESS_KEY_ID"),
            secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
            session_token: var("AWS_SESSION_TOKEN"),
            container_relative_uri: var("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI"),
        }
    }
}

impl fmt::Debug for CredentialEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEnv")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field("container_relative_uri", &self.container_relative_uri)
            .finish()
    }
}

/// Body returned by the container credentials endpoint.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: Option<DateTime<Utc>>,
}

impl From<ContainerCredentials> for Credentials {
    fn from(c: ContainerCredentials) -> Self {
        Self {
            access_key_id: c.access_key_id,
            secret_access_key: c.secret_access_key,
            session_token: Some(c.token),
            expires_at: c.expiration,
        }
    }
}

/// Resolves credentials from environment variables, falling back to the
/// container credentials endpoint.
#[derive(Debug)]
pub struct EnvCredentialProvider<T> {
    env: Option<CredentialEnv>,
    transport: T,
    endpoint: String,
}

impl<T: HttpTransport> EnvCredentialProvider<T> {
    /// A provider that re-reads the process environment on every call.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            env: None,
            transport,
            endpoint: CONTAINER_CREDENTIALS_ENDPOINT.to_owned(),
        }
    }

    /// A provider that uses a fixed environment snapshot.
    #[must_use]
    pub fn with_env(env: CredentialEnv, transport: T) -> Self {
        Self {
            env: Some(env),
            transport,
            endpoint: CONTAINER_CREDENTIALS_ENDPOINT.to_owned(),
        }
    }

    /// Override the container credentials base URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn fetch_container(&self, relative_uri: &str) -> Result<Credentials, CredentialError> {
        let url = format!("{}{relative_uri}", self.endpoint);
        debug!(url, "fetching container credentials");

        let response = self
            .transport
            .send(HttpRequest::new(Method::GET, url))
            .await
            .map_err(|e| {
                warn!(error = %e, "container credentials request failed");
                CredentialError::FetchFailed(e.to_string())
            })?;

        if response.status != StatusCode::OK {
            warn!(
                status = response.status.as_u16(),
                "container credentials endpoint returned an error"
            );
            return Err(CredentialError::FetchFailed(format!(
                "unexpected status {}",
                response.status.as_u16()
            )));
        }

        let parsed: ContainerCredentials = serde_json::from_slice(&response.body)
            .map_err(|e| CredentialError::FetchFailed(format!("malformed response: {e}")))?;

        Ok(parsed.into())
    }
}

#[async_trait]
impl<T: HttpTransport> CredentialProvider for EnvCredentialProvider<T> {
    async fn resolve(&self) -> Result<Credentials, CredentialError> {
        let env = self.env.clone().unwrap_or_else(CredentialEnv::from_env);

        if let (Some(access_key_id), Some(secret_access_key)) =
            (env.access_key_id, env.secret_access_key)
        {
            debug!(access_key_id = %access_key_id, "using credentials from environment");
            return Ok(Credentials {
                access_key_id,
                secret_access_key,
                session_token: env.session_token,
                expires_at: None,
            });
        }

        let relative_uri = env
            .container_relative_uri
            .ok_or(CredentialError::NoCredentials)?;
        let credentials = self.fetch_container(&relative_uri).await?;
        info!(
            access_key_id = %credentials.access_key_id,
            expires_at = ?credentials.expires_at,
            "resolved container credentials"
        );
        Ok(credentials)
    }
}

/// Minutes before expiry at which cached credentials are refreshed.
const DEFAULT_REFRESH_WINDOW_MINUTES: i64 = 5;

/// Minutes that credentials without an expiry are reused.
const DEFAULT_MAX_AGE_MINUTES: i64 = 15;

#[derive(Debug, Clone)]
struct CachedCredentials {
    credentials: Credentials,
    fetched_at: DateTime<Utc>,
}

/// Memoizes another provider's credentials until they near expiry.
///
/// Credentials with an `expires_at` are reused until `refresh_window` before
/// that instant. Credentials without one are reused for `max_age`. Failures
/// are never cached. Concurrent callers that all miss may each resolve; the
/// last result is kept.
#[derive(Debug)]
pub struct CachingCredentialProvider<P> {
    inner: P,
    cached: Mutex<Option<CachedCredentials>>,
    refresh_window: TimeDelta,
    max_age: TimeDelta,
}

impl<P: CredentialProvider> CachingCredentialProvider<P> {
    /// Wrap `inner`, refreshing 5 minutes before expiry and reusing
    /// credentials without an expiry for 15 minutes.
    #[must_use]
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
            refresh_window: TimeDelta::minutes(DEFAULT_REFRESH_WINDOW_MINUTES),
            max_age: TimeDelta::minutes(DEFAULT_MAX_AGE_MINUTES),
        }
    }

    /// Set how long before expiry credentials are refreshed.
    #[must_use]
    pub fn with_refresh_window(mut self, window: TimeDelta) -> Self {
        self.refresh_window = window;
        self
    }

    /// Set how long credentials without an expiry are reused.
    #[must_use]
    pub fn with_max_age(mut self, max_age: TimeDelta) -> Self {
        self.max_age = max_age;
        self
    }

    /// Drop any cached credentials.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }

    fn fresh(&self, now: DateTime<Utc>) -> Option<Credentials> {
        let guard = self.cached.lock();
        let cached = guard.as_ref()?;
        let usable = match cached.credentials.expires_at {
            Some(expires_at) => now + self.refresh_window < expires_at,
            None => now - cached.fetched_at < self.max_age,
        };
        usable.then(|| cached.credentials.clone())
    }
}

#[async_trait]
impl<P: CredentialProvider> CredentialProvider for CachingCredentialProvider<P> {
    async fn resolve(&self) -> Result<Credentials, CredentialError> {
        let now = Utc::now();
        if let Some(credentials) = self.fresh(now) {
            return Ok(credentials);
        }

        let credentials = self.inner.resolve().await?;
        *self.cached.lock() = Some(CachedCredentials {
            credentials: credentials.clone(),
            fetched_at: now,
        });
        Ok(credentials)
    }
}
