//! Usage accounting events.

use serde::Serialize;

/// Which side of a request an event accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UsageEventKind {
    PromptTokens,
    CompletionTokens,
}

impl UsageEventKind {
    /// Event name reported to the usage sink.
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::PromptTokens => "free_trial_prompt_tokens",
            Self::CompletionTokens => "free_trial_completion_tokens",
        }
    }
}

/// A single usage event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageEvent {
    pub kind: UsageEventKind,
    pub model: String,
    /// The text the event accounts for (prompt or accumulated completion).
    pub text: String,
    /// Estimated token count of `text`.
    pub tokens: usize,
}

impl UsageEvent {
    pub fn new(kind: UsageEventKind, model: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind,
            model: model.into(),
            tokens: estimate_tokens(&text),
            text,
        }
    }

    pub fn prompt(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(UsageEventKind::PromptTokens, model, text)
    }

    pub fn completion(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(UsageEventKind::CompletionTokens, model, text)
    }

    pub const fn name(&self) -> &'static str {
        self.kind.event_name()
    }

    /// Properties forwarded to analytics sinks (`tokens`, `model`).
    pub fn properties(&self) -> serde_json::Value {
        serde_json::json!({
            "tokens": self.tokens,
            "model": self.model,
        })
    }
}

/// Rough token estimate: about four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
