//! PearAI Server Client
//!
//! Streaming text completion (`/stream_complete`) and chat
//! (`/server_chat`) against the PearAI server. Both operations check the
//! usage precondition and finish the request handshake before returning, so
//! a refused or failed request surfaces as an `Err` from the call itself.
//! Everything after that arrives through the returned stream.

use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, Span};

use pearai_core::auth::AuthProvider;
use pearai_core::execution::http::{HttpHeaderBuilder, StreamingRequest, send_streaming_request};
use pearai_core::streaming::{
    CallLifecycle, CallState, ChatStream, ChunkStream, CompletionStream, DecodeMode, StreamHandle,
    decode_response,
};
use pearai_core::types::{
    ChatBody, ChatMessage, ChatStreamChunk, CompletionArgs, CompletionBody, CompletionOptions,
    StreamChunk, UsageEvent, joined_text,
};
use pearai_core::usage::{UsageRecorder, ensure_enabled, record_best_effort};
use pearai_core::utils::cancel::make_cancellable_stream;

use crate::LlmError;
use crate::builder::PearAiBuilder;
use crate::config::PearAiConfig;
use crate::models;

pub const COMPLETE_ENDPOINT: &str = "stream_complete";
pub const CHAT_ENDPOINT: &str = "server_chat";

/// Client for the PearAI server.
///
/// Cheap to clone; clones share the connection pool and collaborators.
#[derive(Clone)]
pub struct PearAiServer {
    config: Arc<PearAiConfig>,
    http_client: reqwest::Client,
    auth: Arc<dyn AuthProvider>,
    usage: Arc<dyn UsageRecorder>,
}

impl std::fmt::Debug for PearAiServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PearAiServer")
            .field("server_url", &self.config.server_url)
            .field("model", &self.config.default_options.model)
            .field("usage_enabled", &self.usage.is_enabled())
            .field("retry", &self.config.retry.is_some())
            .finish()
    }
}

impl PearAiServer {
    pub fn builder() -> PearAiBuilder {
        PearAiBuilder::new()
    }

    pub(crate) fn new(
        config: PearAiConfig,
        http_client: reqwest::Client,
        auth: Arc<dyn AuthProvider>,
        usage: Arc<dyn UsageRecorder>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            http_client,
            auth,
            usage,
        }
    }

    pub fn config(&self) -> &PearAiConfig {
        &self.config
    }

    /// Models the server accepts.
    pub fn list_models(&self) -> Vec<String> {
        models::model_list()
    }

    /// Stream completion text for `prompt`.
    ///
    /// Fails with `UsageAccountingDisabled` before any I/O when the usage
    /// recorder is not enabled.
    pub async fn stream_complete(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<CompletionStream, LlmError> {
        let args = self.prepare_args(options)?;
        let span = self.call_span(COMPLETE_ENDPOINT, &args.model);
        let (chunks, call) = self
            .open_completion(prompt, &args)
            .instrument(span.clone())
            .await?;
        Ok(completion_stream(chunks, call, span))
    }

    /// [`PearAiServer::stream_complete`] with a cancel handle.
    pub async fn stream_complete_with_cancel(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<StreamHandle<String>, LlmError> {
        let stream = self.stream_complete(prompt, options).await?;
        Ok(make_cancellable_stream(stream))
    }

    /// Stream assistant message deltas for a conversation.
    ///
    /// Chat requests carry a bearer token when the auth provider can supply
    /// one; otherwise they go out unauthenticated and the server decides.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<ChatStream, LlmError> {
        let args = self.prepare_args(options)?;
        let span = self.call_span(CHAT_ENDPOINT, &args.model);
        let (chunks, call) = self
            .open_chat(messages, &args)
            .instrument(span.clone())
            .await?;
        Ok(chat_stream(chunks, call, span))
    }

    /// [`PearAiServer::stream_chat`] with a cancel handle.
    pub async fn stream_chat_with_cancel(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<StreamHandle<ChatMessage>, LlmError> {
        let stream = self.stream_chat(messages, options).await?;
        Ok(make_cancellable_stream(stream))
    }

    fn prepare_args(&self, options: CompletionOptions) -> Result<CompletionArgs, LlmError> {
        let merged = options.merged_over(&self.config.default_options);
        CompletionArgs::from_options(&merged)
    }

    fn call_span(&self, endpoint: &'static str, model: &str) -> Span {
        tracing::info_span!(
            "pearai_request",
            endpoint,
            model,
            request_id = %uuid::Uuid::new_v4()
        )
    }

    async fn open_completion(
        &self,
        prompt: &str,
        args: &CompletionArgs,
    ) -> Result<(ChunkStream, CallLifecycle), LlmError> {
        ensure_enabled(self.usage.as_ref())?;
        record_best_effort(
            self.usage.as_ref(),
            UsageEvent::prompt(args.model.clone(), prompt),
        )
        .await;

        let mut call = CallLifecycle::new(self.usage.clone(), args.model.clone());
        let body = CompletionBody { prompt, args };
        call.advance(CallState::RequestBuilt);

        let headers = self.base_headers().await?.build();
        call.advance(CallState::AuthResolved);

        let request =
            StreamingRequest::json(self.config.endpoint(COMPLETE_ENDPOINT), headers, &body)?;
        let chunks = self
            .send(&mut call, &request, self.config.decode_mode)
            .await?;
        Ok((chunks, call))
    }

    async fn open_chat(
        &self,
        messages: &[ChatMessage],
        args: &CompletionArgs,
    ) -> Result<(ChunkStream, CallLifecycle), LlmError> {
        ensure_enabled(self.usage.as_ref())?;
        record_best_effort(
            self.usage.as_ref(),
            UsageEvent::prompt(args.model.clone(), joined_text(messages)),
        )
        .await;

        let mut call = CallLifecycle::new(self.usage.clone(), args.model.clone());
        let body = ChatBody::new(messages, args);
        call.advance(CallState::RequestBuilt);

        let mut headers = self.base_headers().await?.build();
        match self.bearer_header().await {
            Ok(auth) => headers.extend(auth),
            Err(e) => {
                tracing::warn!(error = %e, "could not resolve auth tokens; sending chat request without a bearer token");
            }
        }
        call.advance(CallState::AuthResolved);

        let request =
            StreamingRequest::json(self.config.endpoint(CHAT_ENDPOINT), headers, &body)?;
        let chunks = self.send(&mut call, &request, DecodeMode::JsonLines).await?;
        Ok((chunks, call))
    }

    /// Identity, configured and provider headers plus the JSON content type.
    async fn base_headers(&self) -> Result<HttpHeaderBuilder, LlmError> {
        let provider_headers = self.auth.headers().await?;
        Ok(HttpHeaderBuilder::new()
            .with_identity(&self.config.identity)?
            .with_custom_headers(&self.config.http.headers)?
            .with_custom_headers(&provider_headers)?
            .with_json_content_type())
    }

    /// `Authorization` for chat, or why it could not be produced.
    async fn bearer_header(&self) -> Result<reqwest::header::HeaderMap, LlmError> {
        let tokens = self.auth.check_token_expired().await?;
        Ok(HttpHeaderBuilder::new()
            .with_bearer_auth(tokens.expose_access_token())?
            .build())
    }

    async fn send(
        &self,
        call: &mut CallLifecycle,
        request: &StreamingRequest,
        mode: DecodeMode,
    ) -> Result<ChunkStream, LlmError> {
        call.advance(CallState::Sent);
        tracing::debug!(url = %request.url, "sending request");
        match send_streaming_request(&self.http_client, request, self.config.retry.as_ref()).await
        {
            Ok(response) => {
                tracing::debug!(status = %response.status(), "response received");
                call.advance(CallState::Streaming);
                Ok(decode_response(
                    response,
                    mode,
                    self.config.malformed_line_policy,
                ))
            }
            Err(e) => {
                tracing::warn!(error = %e, "request failed");
                call.finish(CallState::Failed).await;
                Err(e)
            }
        }
    }
}

fn completion_stream(chunks: ChunkStream, mut call: CallLifecycle, span: Span) -> CompletionStream {
    let stream = async_stream::stream! {
        let mut chunks = chunks;
        while let Some(item) = chunks.next().await {
            match item {
                Ok(StreamChunk::Malformed { line, error }) => {
                    tracing::warn!(parent: &span, %line, %error, "skipping malformed stream line");
                }
                Ok(chunk) => {
                    if let Some(text) = chunk.completion_text().filter(|t| !t.is_empty()) {
                        call.accumulate(&text);
                        yield Ok(text);
                    }
                }
                Err(e) => {
                    tracing::warn!(parent: &span, error = %e, "completion stream failed");
                    call.finish(CallState::Failed).instrument(span.clone()).await;
                    yield Err(e);
                    return;
                }
            }
        }
        call.finish(CallState::Completed).instrument(span.clone()).await;
    };
    Box::pin(stream)
}

fn chat_stream(chunks: ChunkStream, mut call: CallLifecycle, span: Span) -> ChatStream {
    let stream = async_stream::stream! {
        let mut chunks = chunks;
        while let Some(item) = chunks.next().await {
            match item {
                Ok(StreamChunk::Json(value @ Value::Object(_))) => {
                    let chunk: ChatStreamChunk = match serde_json::from_value(value) {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            tracing::warn!(parent: &span, error = %e, "skipping unreadable chat chunk");
                            continue;
                        }
                    };
                    if let Some(metadata) = chunk.metadata() {
                        tracing::debug!(parent: &span, ?metadata, "chat metadata");
                    }
                    if let Some(content) = chunk.content() {
                        call.accumulate(content);
                        yield Ok(ChatMessage::assistant(content));
                    }
                }
                Ok(StreamChunk::Malformed { line, error }) => {
                    tracing::warn!(parent: &span, %line, %error, "skipping malformed stream line");
                }
                Ok(other) => {
                    tracing::warn!(parent: &span, chunk = ?other, "skipping chat chunk that is not a JSON object");
                }
                Err(e) => {
                    tracing::warn!(parent: &span, error = %e, "chat stream failed");
                    call.finish(CallState::Failed).instrument(span.clone()).await;
                    yield Err(e);
                    return;
                }
            }
        }
        call.finish(CallState::Completed).instrument(span.clone()).await;
    };
    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pearai_core::usage::MemoryUsageRecorder;
    use tracing_test::traced_test;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    #[traced_test]
    async fn skipped_lines_and_missing_auth_are_logged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "{bad\n{\"content\":\"ok\"}\n",
                "application/x-ndjson",
            ))
            .mount(&server)
            .await;

        let client = PearAiServer::builder()
            .server_url(server.uri())
            .model("gpt-4o")
            .usage_recorder(MemoryUsageRecorder::new())
            .build()
            .unwrap();
        let out: Vec<_> = client
            .stream_chat(&[ChatMessage::user("hi")], CompletionOptions::default())
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(out, vec![Ok(ChatMessage::assistant("ok"))]);
        assert!(logs_contain("could not resolve auth tokens"));
        assert!(logs_contain("skipping malformed stream line"));
    }

    #[test]
    fn debug_output_hides_collaborators() {
        let client = PearAiServer::builder().model("gpt-4o").build().unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("server.trypear.ai"));
        assert!(debug.contains("usage_enabled: false"));
    }
}
