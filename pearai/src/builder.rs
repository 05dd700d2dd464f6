//! Builder for [`PearAiServer`].
//!
//! ```rust,ignore
//! use pearai::prelude::*;
//!
//! let client = PearAiServer::builder()
//!     .model("gpt-4o")
//!     .unique_id("machine-1")
//!     .auth_provider(StaticAuthProvider::new(AuthTokens::new(access, refresh)))
//!     .usage_recorder(TracingUsageRecorder)
//!     .build()?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pearai_core::auth::{AuthProvider, StaticAuthProvider};
use pearai_core::execution::http::build_http_client;
use pearai_core::retry::RetryPolicy;
use pearai_core::streaming::{DecodeMode, MalformedLinePolicy};
use pearai_core::types::{CompletionOptions, HttpConfig};
use pearai_core::usage::{DisabledUsageRecorder, UsageRecorder};

use crate::LlmError;
use crate::client::PearAiServer;
use crate::config::PearAiConfig;

/// Fluent configuration of a [`PearAiServer`].
///
/// Without an auth provider chat requests are sent unauthenticated; without
/// a usage recorder every request is refused with `UsageAccountingDisabled`.
pub struct PearAiBuilder {
    config: PearAiConfig,
    http_client: Option<reqwest::Client>,
    auth: Option<Arc<dyn AuthProvider>>,
    usage: Option<Arc<dyn UsageRecorder>>,
}

impl Default for PearAiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PearAiBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PearAiBuilder")
            .field("config", &self.config)
            .field("custom_http_client", &self.http_client.is_some())
            .field("has_auth_provider", &self.auth.is_some())
            .field("has_usage_recorder", &self.usage.is_some())
            .finish()
    }
}

impl PearAiBuilder {
    pub fn new() -> Self {
        Self::from_config(PearAiConfig::default())
    }

    pub fn from_config(config: PearAiConfig) -> Self {
        Self {
            config,
            http_client: None,
            auth: None,
            usage: None,
        }
    }

    /// Start from [`PearAiConfig::from_env`].
    pub fn from_env() -> Result<Self, LlmError> {
        Ok(Self::from_config(PearAiConfig::from_env()?))
    }

    pub fn server_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.server_url = url.into();
        self
    }

    /// Model used when a call does not name one.
    pub fn model<S: Into<String>>(mut self, model: S) -> Self {
        self.config.default_options.model = Some(model.into());
        self
    }

    /// Replace the default options wholesale.
    pub fn default_options(mut self, options: CompletionOptions) -> Self {
        self.config.default_options = options;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.config.default_options.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.default_options.max_tokens = Some(max_tokens);
        self
    }

    pub fn unique_id<S: Into<String>>(mut self, unique_id: S) -> Self {
        self.config.identity.unique_id = Some(unique_id.into());
        self
    }

    pub fn extension_version<S: Into<String>>(mut self, version: S) -> Self {
        self.config.identity.extension_version = Some(version.into());
        self
    }

    pub fn os<S: Into<String>>(mut self, os: S) -> Self {
        self.config.identity.os = Some(os.into());
        self
    }

    pub fn decode_mode(mut self, mode: DecodeMode) -> Self {
        self.config.decode_mode = mode;
        self
    }

    pub fn malformed_line_policy(mut self, policy: MalformedLinePolicy) -> Self {
        self.config.malformed_line_policy = policy;
        self
    }

    /// Retry the request handshake under `policy`.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = Some(policy);
        self
    }

    // === HTTP ===

    pub fn http_config(mut self, http: HttpConfig) -> Self {
        self.config.http = http;
        self
    }

    /// Total request timeout, body included. Unset by default.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.http.timeout = timeout;
        self
    }

    /// Idle timeout between reads of the response. `None` disables it.
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.http.read_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.http.connect_timeout = timeout;
        self
    }

    pub fn proxy<S: Into<String>>(mut self, proxy: S) -> Self {
        self.config.http.proxy = Some(proxy.into());
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.http.user_agent = Some(user_agent.into());
        self
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config.http.headers.insert(key.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.config.http.headers.extend(headers);
        self
    }

    /// Use a preconfigured client. Timeouts, proxy and user agent from the
    /// HTTP config are then the caller's responsibility.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    // === Collaborators ===

    pub fn auth_provider<P: AuthProvider + 'static>(self, provider: P) -> Self {
        self.auth_provider_arc(Arc::new(provider))
    }

    pub fn auth_provider_arc(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(provider);
        self
    }

    pub fn usage_recorder<R: UsageRecorder + 'static>(self, recorder: R) -> Self {
        self.usage_recorder_arc(Arc::new(recorder))
    }

    pub fn usage_recorder_arc(mut self, recorder: Arc<dyn UsageRecorder>) -> Self {
        self.usage = Some(recorder);
        self
    }

    pub fn build(self) -> Result<PearAiServer, LlmError> {
        self.config.validate()?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => build_http_client(&self.config.http)?,
        };
        let auth: Arc<dyn AuthProvider> = match self.auth {
            Some(auth) => auth,
            None => Arc::new(StaticAuthProvider::anonymous()),
        };
        let usage: Arc<dyn UsageRecorder> = match self.usage {
            Some(usage) => usage,
            None => Arc::new(DisabledUsageRecorder),
        };

        tracing::debug!(
            server_url = %self.config.server_url,
            model = ?self.config.default_options.model,
            usage_enabled = usage.is_enabled(),
            "built PearAI client"
        );
        Ok(PearAiServer::new(self.config, http_client, auth, usage))
    }
}
