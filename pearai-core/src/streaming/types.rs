//! Core Streaming Types

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use crate::error::LlmError;
use crate::types::{ChatMessage, StreamChunk};
use crate::utils::cancel::CancelHandle;

/// Response body bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>;

/// Decoder output.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LlmError>> + Send>>;

/// Text chunks produced by a completion request.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Assistant message deltas produced by a chat request.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatMessage, LlmError>> + Send>>;

/// A stream paired with a first-class cancellation handle.
///
/// Cancelling ends the stream at its next poll, drops the response body (and
/// with it the connection) and still records usage for what was delivered.
pub struct StreamHandle<T> {
    pub stream: Pin<Box<dyn Stream<Item = Result<T, LlmError>> + Send>>,
    pub cancel: CancelHandle,
}

impl<T> std::fmt::Debug for StreamHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
