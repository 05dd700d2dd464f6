//! # PearAI - Streaming client for the PearAI server
//!
//! Streaming text completion and chat against the PearAI inference server,
//! with incremental decoding of line-delimited JSON responses, opt-in usage
//! accounting and bearer-token auth for chat.
#![deny(unsafe_code)]

//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use pearai::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LlmError> {
//!     let client = PearAiServer::builder()
//!         .model("gpt-4o")
//!         .usage_recorder(TracingUsageRecorder)
//!         .build()?;
//!
//!     let mut stream = client
//!         .stream_chat(&[ChatMessage::user("Hello!")], CompletionOptions::default())
//!         .await?;
//!     while let Some(delta) = stream.next().await {
//!         print!("{}", delta?.content.plain_text());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Requests are refused with [`LlmError::UsageAccountingDisabled`] unless the
//! configured [`UsageRecorder`](pearai_core::usage::UsageRecorder) is enabled.

pub mod builder;
pub mod client;
pub mod config;
pub mod models;
pub mod telemetry;

pub use builder::PearAiBuilder;
pub use client::PearAiServer;
pub use config::PearAiConfig;
pub use pearai_core::LlmError;

/// Lower layers, for callers implementing their own collaborators.
pub use pearai_core as core;
pub use pearai_spec as spec;

pub mod prelude {
    pub use crate::client::{CHAT_ENDPOINT, COMPLETE_ENDPOINT};
    pub use crate::models::SUPPORTED_MODELS;
    pub use crate::{LlmError, PearAiBuilder, PearAiConfig, PearAiServer};

    pub use pearai_core::auth::{
        AuthProvider, AuthTokens, RefreshingAuthProvider, StaticAuthProvider, TokenRefresher,
    };
    pub use pearai_core::retry::RetryPolicy;
    pub use pearai_core::streaming::{
        ChatStream, CompletionStream, DecodeMode, MalformedLinePolicy, StreamHandle,
    };
    pub use pearai_core::types::{
        ChatMessage, CompletionOptions, ContentPart, HttpConfig, ImageDetail, MessageContent,
        MessageRole, UsageEvent, UsageEventKind,
    };
    pub use pearai_core::usage::{
        DisabledUsageRecorder, MemoryUsageRecorder, TracingUsageRecorder, UsageRecorder,
    };
    pub use pearai_core::utils::cancel::CancelHandle;
}
