//! Client configuration.
//!
//! [`PearAiConfig`] holds everything a [`crate::PearAiServer`] needs besides
//! its collaborators: where the server lives, the default sampling options,
//! the identity headers and the transport settings. It can be assembled with
//! [`crate::PearAiBuilder`] or read from the environment.

use std::time::Duration;

use pearai_core::execution::http::IdentityHeaders;
use pearai_core::retry::RetryPolicy;
use pearai_core::streaming::{DecodeMode, MalformedLinePolicy};
use pearai_core::types::{CompletionOptions, HttpConfig};

use crate::LlmError;

/// Production endpoint of the PearAI server.
pub const DEFAULT_SERVER_URL: &str = "https://server.trypear.ai/pearai-server-api2";

pub const ENV_SERVER_URL: &str = "PEARAI_SERVER_URL";
pub const ENV_MODEL: &str = "PEARAI_MODEL";
pub const ENV_UNIQUE_ID: &str = "PEARAI_UNIQUE_ID";
pub const ENV_EXTENSION_VERSION: &str = "PEARAI_EXTENSION_VERSION";
pub const ENV_TIMEOUT_SECS: &str = "PEARAI_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct PearAiConfig {
    /// Base URL; endpoint paths are appended to it.
    pub server_url: String,
    /// Options every call starts from. Per-call options win field by field.
    pub default_options: CompletionOptions,
    pub identity: IdentityHeaders,
    /// Framing of `/stream_complete` responses. Chat always uses JSON lines.
    pub decode_mode: DecodeMode,
    pub malformed_line_policy: MalformedLinePolicy,
    /// Retry of the request handshake. `None` sends exactly once.
    pub retry: Option<RetryPolicy>,
    pub http: HttpConfig,
}

impl Default for PearAiConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            default_options: CompletionOptions::default(),
            identity: IdentityHeaders::default(),
            decode_mode: DecodeMode::Auto,
            malformed_line_policy: MalformedLinePolicy::Skip,
            retry: None,
            http: HttpConfig::default(),
        }
    }
}

impl PearAiConfig {
    /// Defaults overridden by the `PEARAI_*` environment variables.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`PearAiConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(ENV_SERVER_URL) {
            config.server_url = url;
        }
        if let Some(model) = get(ENV_MODEL) {
            config.default_options.model = Some(model);
        }
        if let Some(unique_id) = get(ENV_UNIQUE_ID) {
            config.identity.unique_id = Some(unique_id);
        }
        if let Some(version) = get(ENV_EXTENSION_VERSION) {
            config.identity.extension_version = Some(version);
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                LlmError::ConfigurationError(format!("Invalid {ENV_TIMEOUT_SECS} '{secs}': {e}"))
            })?;
            config.http.timeout = Some(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a request URL.
    pub fn validate(&self) -> Result<(), LlmError> {
        let url = reqwest::Url::parse(&self.server_url).map_err(|e| {
            LlmError::ConfigurationError(format!("Invalid server URL '{}': {e}", self.server_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(LlmError::ConfigurationError(format!(
                "Unsupported server URL scheme '{other}'"
            ))),
        }
    }

    /// Full URL of an endpoint path such as `stream_complete`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
