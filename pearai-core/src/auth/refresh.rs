//! Single-flight token refresh.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{AuthProvider, AuthTokens};
use crate::error::LlmError;

/// Tokens expiring within this many seconds are refreshed early.
pub const EXPIRY_SAFETY_WINDOW_SECS: i64 = 300;

/// Exchanges an expiring token pair for a fresh one.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, current: &AuthTokens) -> Result<AuthTokens, LlmError>;
}

/// Caches a token pair and refreshes it through a [`TokenRefresher`].
///
/// The cache lock is held for the whole refresh, so concurrent callers queue
/// behind one in-flight refresh and all observe its result.
pub struct RefreshingAuthProvider<R> {
    refresher: R,
    tokens: Mutex<AuthTokens>,
    headers: HashMap<String, String>,
    window_secs: i64,
}

impl<R: TokenRefresher> RefreshingAuthProvider<R> {
    pub fn new(initial: AuthTokens, refresher: R) -> Self {
        Self {
            refresher,
            tokens: Mutex::new(initial),
            headers: HashMap::new(),
            window_secs: EXPIRY_SAFETY_WINDOW_SECS,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Refresh tokens this many seconds before they expire instead of
    /// [`EXPIRY_SAFETY_WINDOW_SECS`].
    pub fn with_safety_window(mut self, secs: i64) -> Self {
        self.window_secs = secs;
        self
    }

    /// Cached tokens, without checking expiry.
    pub async fn current(&self) -> AuthTokens {
        self.tokens.lock().await.clone()
    }
}

#[async_trait]
impl<R: TokenRefresher> AuthProvider for RefreshingAuthProvider<R> {
    async fn headers(&self) -> Result<HashMap<String, String>, LlmError> {
        Ok(self.headers.clone())
    }

    async fn check_token_expired(&self) -> Result<AuthTokens, LlmError> {
        let mut cached = self.tokens.lock().await;
        if !cached.expires_within(Utc::now(), self.window_secs) {
            return Ok(cached.clone());
        }

        tracing::debug!("access token expired or about to expire; refreshing");
        let fresh = self
            .refresher
            .refresh(&cached)
            .await
            .map_err(|e| match e {
                LlmError::AuthResolutionFailed(_) => e,
                other => LlmError::AuthResolutionFailed(other.to_string()),
            })?;
        *cached = fresh.clone();
        Ok(fresh)
    }
}
