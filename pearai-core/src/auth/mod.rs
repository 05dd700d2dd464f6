//! Authentication helpers and token providers.
//!
//! An [`AuthProvider`] supplies the identity headers sent with every request
//! and the bearer tokens used by the chat endpoint. Implementations own the
//! token cache and decide when a refresh is needed.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::LlmError;

mod refresh;

pub use refresh::{EXPIRY_SAFETY_WINDOW_SECS, RefreshingAuthProvider, TokenRefresher};

/// Access/refresh token pair.
#[derive(Clone, Debug)]
pub struct AuthTokens {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// Explicit expiry. When absent the access token's JWT `exp` claim is used.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthTokens {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// The bearer value, for building the `Authorization` header.
    pub fn expose_access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Effective expiry, if one is known.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .or_else(|| jwt_expiry(self.access_token.expose_secret()))
    }

    /// Whether the access token expires before `now + window_secs`.
    /// Tokens with no known expiry never expire.
    pub fn expires_within(&self, now: DateTime<Utc>, window_secs: i64) -> bool {
        self.expiry()
            .is_some_and(|exp| exp.timestamp() - window_secs <= now.timestamp())
    }
}

/// Read the `exp` claim of a JWT without verifying it.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    #[derive(Deserialize)]
    struct Claims {
        exp: i64,
    }

    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp, 0)
}

/// Source of identity headers and bearer tokens.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Extra headers asserting caller identity. May be empty.
    async fn headers(&self) -> Result<HashMap<String, String>, LlmError>;

    /// Return a valid token pair, refreshing it first when it has expired.
    async fn check_token_expired(&self) -> Result<AuthTokens, LlmError>;
}

/// A provider whose tokens are managed externally.
#[derive(Clone, Debug, Default)]
pub struct StaticAuthProvider {
    tokens: Option<AuthTokens>,
    headers: HashMap<String, String>,
}

impl StaticAuthProvider {
    pub fn new(tokens: AuthTokens) -> Self {
        Self {
            tokens: Some(tokens),
            headers: HashMap::new(),
        }
    }

    /// A provider with no tokens; chat requests go out unauthenticated.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn headers(&self) -> Result<HashMap<String, String>, LlmError> {
        Ok(self.headers.clone())
    }

    async fn check_token_expired(&self) -> Result<AuthTokens, LlmError> {
        self.tokens
            .clone()
            .ok_or_else(|| LlmError::AuthResolutionFailed("no tokens configured".to_string()))
    }
}
