//! HTTP configuration types.
//!
//! `HttpConfig` and its builder configure the transport used for every
//! request to the PearAI server.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default idle timeout between reads of a response.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout, covering the streamed body. Off by default so
    /// long generations are bounded only by `read_timeout`.
    #[serde(with = "duration_option_serde")]
    pub timeout: Option<Duration>,
    /// Maximum silence between two reads of the response
    #[serde(with = "duration_option_serde")]
    pub read_timeout: Option<Duration>,
    /// Connection timeout
    #[serde(with = "duration_option_serde")]
    pub connect_timeout: Option<Duration>,
    /// Custom headers added to every request
    pub headers: HashMap<String, String>,
    /// Proxy settings
    pub proxy: Option<String>,
    /// User agent
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            headers: HashMap::new(),
            proxy: None,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    /// Returns a builder for constructing `HttpConfig`
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::new()
    }
}

/// Builder for `HttpConfig`
#[derive(Debug, Clone, Default)]
pub struct HttpConfigBuilder {
    timeout: Option<Option<Duration>>,
    read_timeout: Option<Option<Duration>>,
    connect_timeout: Option<Option<Duration>>,
    headers: HashMap<String, String>,
    proxy: Option<String>,
    user_agent: Option<String>,
}

impl HttpConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` disables the timeout entirely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = Some(timeout);
        self
    }
    pub fn read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = Some(read_timeout);
        self
    }
    pub fn connect_timeout(mut self, connect_timeout: Option<Duration>) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }
    pub fn user_agent<S: Into<String>>(mut self, user_agent: Option<S>) -> Self {
        self.user_agent = user_agent.map(|s| s.into());
        self
    }
    pub fn proxy<S: Into<String>>(mut self, proxy: Option<S>) -> Self {
        self.proxy = proxy.map(|s| s.into());
        self
    }
    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn build(self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            read_timeout: self.read_timeout.unwrap_or(defaults.read_timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            headers: self.headers,
            proxy: self.proxy,
            user_agent: self.user_agent,
        }
    }
}

mod duration_option_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => d.as_secs().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_default_timeouts() {
        let cfg = HttpConfig::builder().header("x-trace", "1").build();
        assert_eq!(cfg.timeout, None);
        assert_eq!(cfg.read_timeout, Some(DEFAULT_READ_TIMEOUT));
        assert_eq!(cfg.connect_timeout, Some(DEFAULT_CONNECT_TIMEOUT));
        assert_eq!(cfg.headers.get("x-trace").map(String::as_str), Some("1"));
    }

    #[test]
    fn builder_can_disable_read_timeout() {
        let cfg = HttpConfig::builder().read_timeout(None).build();
        assert_eq!(cfg.read_timeout, None);
        assert_eq!(cfg.timeout, None);
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let cfg = HttpConfig::builder()
            .timeout(Some(Duration::from_secs(5)))
            .build();
        let value = serde_json::to_value(&cfg).unwrap();
        assert_eq!(value["timeout"], serde_json::json!(5));
        let back: HttpConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back.timeout, Some(Duration::from_secs(5)));
    }
}
