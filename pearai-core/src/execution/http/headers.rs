//! HTTP Headers Utility
//!
//! Builds the identity, content-type and bearer headers sent to the server.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;

use crate::error::LlmError;

pub const UNIQUE_ID_HEADER: &str = "uniqueId";
pub const EXTENSION_VERSION_HEADER: &str = "extensionVersion";
pub const OS_HEADER: &str = "os";

/// Headers asserting caller identity and version, independent of bearer auth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHeaders {
    pub unique_id: Option<String>,
    pub extension_version: Option<String>,
    pub os: Option<String>,
}

impl Default for IdentityHeaders {
    fn default() -> Self {
        Self {
            unique_id: None,
            extension_version: None,
            os: Some(std::env::consts::OS.to_string()),
        }
    }
}

impl IdentityHeaders {
    /// Header pairs, with the server's fallbacks for missing values.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (UNIQUE_ID_HEADER, self.unique_id.as_deref().unwrap_or("None")),
            (
                EXTENSION_VERSION_HEADER,
                self.extension_version.as_deref().unwrap_or("Unknown"),
            ),
            (OS_HEADER, self.os.as_deref().unwrap_or("Unknown")),
        ]
    }
}

/// HTTP header builder for API requests
pub struct HttpHeaderBuilder {
    headers: HeaderMap,
}

impl HttpHeaderBuilder {
    pub fn new() -> Self {
        Self {
            headers: HeaderMap::new(),
        }
    }

    pub fn with_identity(mut self, identity: &IdentityHeaders) -> Result<Self, LlmError> {
        for (name, value) in identity.pairs() {
            self = self.with_header(name, value)?;
        }
        Ok(self)
    }

    /// Add Bearer token authorization
    pub fn with_bearer_auth(mut self, token: &str) -> Result<Self, LlmError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            LlmError::ConfigurationError(format!("Invalid access token format: {e}"))
        })?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Add JSON content type
    pub fn with_json_content_type(mut self) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }

    /// Add a custom header
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, LlmError> {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            LlmError::ConfigurationError(format!("Invalid header name '{name}': {e}"))
        })?;
        self.headers.insert(
            header_name,
            HeaderValue::from_str(value).map_err(|e| {
                LlmError::ConfigurationError(format!("Invalid header value '{value}': {e}"))
            })?,
        );
        Ok(self)
    }

    /// Add multiple custom headers. Later headers override earlier ones.
    pub fn with_custom_headers(
        mut self,
        custom_headers: &HashMap<String, String>,
    ) -> Result<Self, LlmError> {
        for (key, value) in custom_headers {
            self = self.with_header(key, value)?;
        }
        Ok(self)
    }

    pub fn build(self) -> HeaderMap {
        self.headers
    }
}

impl Default for HttpHeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_defaults_match_server_fallbacks() {
        let identity = IdentityHeaders {
            unique_id: None,
            extension_version: None,
            os: None,
        };
        let headers = HttpHeaderBuilder::new()
            .with_identity(&identity)
            .unwrap()
            .build();
        assert_eq!(headers.get("uniqueid").unwrap(), "None");
        assert_eq!(headers.get("extensionversion").unwrap(), "Unknown");
        assert_eq!(headers.get("os").unwrap(), "Unknown");
    }

    #[test]
    fn bearer_header_is_sensitive() {
        let headers = HttpHeaderBuilder::new()
            .with_json_content_type()
            .with_bearer_auth("tok")
            .unwrap()
            .build();
        let auth = headers.get(AUTHORIZATION).unwrap();
        assert_eq!(auth, "Bearer tok");
        assert!(auth.is_sensitive());
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn custom_headers_override_identity() {
        let extra = HashMap::from([("os".to_string(), "plan9".to_string())]);
        let headers = HttpHeaderBuilder::new()
            .with_identity(&IdentityHeaders::default())
            .unwrap()
            .with_custom_headers(&extra)
            .unwrap()
            .build();
        assert_eq!(headers.get("os").unwrap(), "plan9");
    }

    #[test]
    fn invalid_header_value_is_a_configuration_error() {
        let err = HttpHeaderBuilder::new()
            .with_header("x-bad", "line\nbreak")
            .err()
            .unwrap();
        assert!(matches!(err, LlmError::ConfigurationError(_)));
    }
}
