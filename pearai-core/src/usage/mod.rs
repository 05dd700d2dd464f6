//! Usage accounting.
//!
//! Requests to the PearAI server are only allowed while a [`UsageRecorder`]
//! reports itself enabled. Recording itself is best effort: failures are
//! logged and never reach the caller.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::LlmError;
use crate::types::UsageEvent;

/// Message attached to [`LlmError::UsageAccountingDisabled`].
pub const USAGE_DISABLED_MESSAGE: &str = "In order to use the server, usage accounting must be \
     enabled so that we can monitor abuse. Enable it in your settings; requests to your own \
     models (local or API key) never require it.";

/// Opt-in usage sink.
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    /// Whether the user consented to usage accounting.
    fn is_enabled(&self) -> bool;

    async fn capture(&self, event: UsageEvent) -> Result<(), LlmError>;
}

/// Fail with `UsageAccountingDisabled` unless the recorder is enabled.
pub fn ensure_enabled(recorder: &dyn UsageRecorder) -> Result<(), LlmError> {
    if recorder.is_enabled() {
        Ok(())
    } else {
        Err(LlmError::UsageAccountingDisabled(
            USAGE_DISABLED_MESSAGE.to_string(),
        ))
    }
}

/// Capture an event, logging instead of propagating any failure.
pub async fn record_best_effort(recorder: &dyn UsageRecorder, event: UsageEvent) {
    let name = event.name();
    if let Err(e) = recorder.capture(event).await {
        tracing::warn!(event = name, error = %e, "failed to record usage event");
    }
}

/// Recorder for users who did not opt in. Every request is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledUsageRecorder;

#[async_trait]
impl UsageRecorder for DisabledUsageRecorder {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn capture(&self, _event: UsageEvent) -> Result<(), LlmError> {
        Ok(())
    }
}

/// Emits every event as a structured `tracing` record on the `pearai::usage` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUsageRecorder;

#[async_trait]
impl UsageRecorder for TracingUsageRecorder {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn capture(&self, event: UsageEvent) -> Result<(), LlmError> {
        tracing::info!(
            target: "pearai::usage",
            event = event.name(),
            model = %event.model,
            tokens = event.tokens,
            "usage"
        );
        Ok(())
    }
}

/// Keeps events in memory. Handy for tests and local inspection.
#[derive(Debug, Default)]
pub struct MemoryUsageRecorder {
    events: Mutex<Vec<UsageEvent>>,
}

impl MemoryUsageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<UsageEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UsageRecorder for MemoryUsageRecorder {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn capture(&self, event: UsageEvent) -> Result<(), LlmError> {
        self.events
            .lock()
            .map_err(|e| LlmError::UsageRecordingError(format!("recorder poisoned: {e}")))?
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UsageEventKind;
    use tracing_test::traced_test;

    struct FailingRecorder;

    #[async_trait]
    impl UsageRecorder for FailingRecorder {
        fn is_enabled(&self) -> bool {
            true
        }

        async fn capture(&self, _event: UsageEvent) -> Result<(), LlmError> {
            Err(LlmError::UsageRecordingError("sink offline".into()))
        }
    }

    #[test]
    fn disabled_recorder_blocks_requests() {
        let err = ensure_enabled(&DisabledUsageRecorder).unwrap_err();
        assert!(matches!(err, LlmError::UsageAccountingDisabled(_)));
        assert!(ensure_enabled(&TracingUsageRecorder).is_ok());
    }

    #[tokio::test]
    async fn memory_recorder_keeps_events_in_order() {
        let recorder = MemoryUsageRecorder::new();
        record_best_effort(&recorder, UsageEvent::prompt("gpt-4o", "print(")).await;
        record_best_effort(&recorder, UsageEvent::completion("gpt-4o", "hello")).await;
        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, UsageEventKind::PromptTokens);
        assert_eq!(events[1].text, "hello");
    }

    #[tokio::test]
    #[traced_test]
    async fn recording_failures_are_only_logged() {
        record_best_effort(&FailingRecorder, UsageEvent::completion("m", "x")).await;
        assert!(logs_contain("failed to record usage event"));
    }
}
