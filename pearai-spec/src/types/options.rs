//! Completion options and the request arguments derived from them.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Maximum number of stop sequences forwarded to the server.
pub const STOP_SEQUENCE_LIMIT: usize = 2;

/// Model that accepts an unlimited number of stop sequences.
pub const UNLIMITED_STOP_MODEL: &str = "starcoder-7b";

/// Caller-facing sampling options.
///
/// Every field is optional so per-call options can be layered over the
/// client's defaults with [`CompletionOptions::merged_over`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl CompletionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub const fn with_frequency_penalty(mut self, penalty: f64) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }

    pub const fn with_presence_penalty(mut self, penalty: f64) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }

    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop = Some(stop.into_iter().map(Into::into).collect());
        self
    }

    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub const fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Layer `self` over `defaults`: every field set on `self` wins.
    pub fn merged_over(self, defaults: &CompletionOptions) -> Self {
        Self {
            model: self.model.or_else(|| defaults.model.clone()),
            frequency_penalty: self.frequency_penalty.or(defaults.frequency_penalty),
            presence_penalty: self.presence_penalty.or(defaults.presence_penalty),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
            stop: self.stop.or_else(|| defaults.stop.clone()),
            temperature: self.temperature.or(defaults.temperature),
            top_p: self.top_p.or(defaults.top_p),
        }
    }
}

/// Sampling arguments as the server expects them (snake_case, absent fields omitted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionArgs {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl CompletionArgs {
    /// Normalize merged options into server arguments.
    ///
    /// Fails when no model is set. Stop sequences are capped at
    /// [`STOP_SEQUENCE_LIMIT`] unless the model is [`UNLIMITED_STOP_MODEL`].
    pub fn from_options(options: &CompletionOptions) -> Result<Self, LlmError> {
        let model = options
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidParameter("a model is required".to_string()))?
            .to_string();

        let stop = options
            .stop
            .as_deref()
            .map(|stop| truncate_stop_sequences(&model, stop));

        Ok(Self {
            model,
            frequency_penalty: options.frequency_penalty,
            presence_penalty: options.presence_penalty,
            max_tokens: options.max_tokens,
            stop,
            temperature: options.temperature,
            top_p: options.top_p,
        })
    }
}

/// Apply the per-model stop sequence cap.
pub fn truncate_stop_sequences(model: &str, stop: &[String]) -> Vec<String> {
    if model == UNLIMITED_STOP_MODEL {
        stop.to_vec()
    } else {
        stop.iter().take(STOP_SEQUENCE_LIMIT).cloned().collect()
    }
}

/// Body of `POST /stream_complete`.
#[derive(Debug, Serialize)]
pub struct CompletionBody<'a> {
    pub prompt: &'a str,
    #[serde(flatten)]
    pub args: &'a CompletionArgs,
}
