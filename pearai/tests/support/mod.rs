//! Shared fixtures for the client tests.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use pearai::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

pub const NDJSON: &str = "application/x-ndjson";

/// A 200 response streaming `lines` as newline-delimited JSON.
pub fn ndjson(lines: &[&str]) -> ResponseTemplate {
    let mut body = lines.join("\n");
    body.push('\n');
    ResponseTemplate::new(200).set_body_raw(body, NDJSON)
}

pub fn client(server: &MockServer, recorder: Arc<MemoryUsageRecorder>) -> PearAiBuilder {
    PearAiServer::builder()
        .server_url(server.uri())
        .model("gpt-4o")
        .usage_recorder_arc(recorder)
}

pub async fn collect_ok<T, S>(stream: S) -> Vec<T>
where
    S: Stream<Item = Result<T, LlmError>>,
{
    stream
        .map(|item| item.expect("stream item"))
        .collect()
        .await
}

/// Wait for a usage event recorded from a background task.
pub async fn wait_for_events(recorder: &MemoryUsageRecorder, count: usize) -> Vec<UsageEvent> {
    for _ in 0..100 {
        let events = recorder.events();
        if events.len() >= count {
            return events;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    recorder.events()
}

/// JSON bodies of every request the mock server saw.
pub async fn request_bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).expect("json body"))
        .collect()
}

/// An auth provider whose token lookup always fails.
pub struct FailingAuth;

#[async_trait]
impl AuthProvider for FailingAuth {
    async fn headers(&self) -> Result<HashMap<String, String>, LlmError> {
        Ok(HashMap::from([("x-client".to_string(), "tests".to_string())]))
    }

    async fn check_token_expired(&self) -> Result<AuthTokens, LlmError> {
        Err(LlmError::AuthResolutionFailed("session expired".into()))
    }
}
