//! Per-call lifecycle and completion usage accounting.
//!
//! A [`CallLifecycle`] follows one request through
//! `Idle → RequestBuilt → AuthResolved → Sent → Streaming` and into one of
//! `Completed`, `Failed` or `Cancelled`. Once streaming has started the
//! accumulated output is reported exactly once, whichever way the call ends:
//! explicitly through [`CallLifecycle::finish`], or from `Drop` when the
//! consumer stops polling. Calls that fail before streaming report nothing.

use std::sync::Arc;
use tracing::Instrument;

use crate::types::UsageEvent;
use crate::usage::{UsageRecorder, record_best_effort};

/// State of a single completion or chat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    RequestBuilt,
    AuthResolved,
    Sent,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl CallState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub const fn can_advance_to(self, next: CallState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::RequestBuilt)
                | (Self::RequestBuilt, Self::AuthResolved)
                | (Self::AuthResolved, Self::Sent)
                | (Self::Sent, Self::Streaming)
                | (Self::Sent, Self::Failed)
                | (Self::Streaming, Self::Completed)
                | (Self::Streaming, Self::Failed)
                | (Self::Streaming, Self::Cancelled)
        )
    }
}

pub struct CallLifecycle {
    recorder: Arc<dyn UsageRecorder>,
    model: String,
    state: CallState,
    accumulated: String,
    started: bool,
    reported: bool,
}

impl CallLifecycle {
    pub fn new(recorder: Arc<dyn UsageRecorder>, model: impl Into<String>) -> Self {
        Self {
            recorder,
            model: model.into(),
            state: CallState::Idle,
            accumulated: String::new(),
            started: false,
            reported: false,
        }
    }

    pub const fn state(&self) -> CallState {
        self.state
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn advance(&mut self, next: CallState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid call transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(from = ?self.state, to = ?next, "call state");
        self.state = next;
        if next == CallState::Streaming {
            self.started = true;
        }
    }

    /// Append yielded output.
    pub fn accumulate(&mut self, text: &str) {
        self.accumulated.push_str(text);
    }

    /// Move to a terminal state and record the completion usage event.
    pub async fn finish(&mut self, outcome: CallState) {
        self.advance(outcome);
        if let Some(event) = self.take_event() {
            record_best_effort(self.recorder.as_ref(), event).await;
        }
    }

    fn take_event(&mut self) -> Option<UsageEvent> {
        if self.reported {
            return None;
        }
        self.reported = true;
        tracing::debug!(
            state = ?self.state,
            chars = self.accumulated.len(),
            "call finished"
        );
        if !self.started {
            return None;
        }
        Some(UsageEvent::completion(
            self.model.clone(),
            std::mem::take(&mut self.accumulated),
        ))
    }
}

impl Drop for CallLifecycle {
    fn drop(&mut self) {
        match self.state {
            CallState::Streaming => self.advance(CallState::Cancelled),
            state if state.is_terminal() => {}
            state => {
                tracing::trace!(?state, "call abandoned before streaming");
                return;
            }
        }

        let Some(event) = self.take_event() else {
            return;
        };
        let recorder = self.recorder.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(
                    async move { record_best_effort(recorder.as_ref(), event).await }
                        .in_current_span(),
                );
            }
            Err(_) => {
                tracing::warn!("no async runtime available; usage for cancelled call not recorded");
            }
        }
    }
}
