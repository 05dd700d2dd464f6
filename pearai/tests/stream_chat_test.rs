//! `/server_chat` against a mock PearAI server.

mod support;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::StreamExt;
use pearai::prelude::*;
use serde_json::json;
use std::sync::Arc;
use support::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer};

fn assistant_texts(messages: &[ChatMessage]) -> Vec<String> {
    messages
        .iter()
        .map(|m| {
            assert_eq!(m.role, MessageRole::Assistant);
            m.content.plain_text()
        })
        .collect()
}

#[tokio::test]
async fn yields_content_deltas_and_hides_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/server_chat"))
        .respond_with(ndjson(&[
            r#"{"metadata":{"citations":["a.rs"]}}"#,
            r#"{"content":"Hel"}"#,
            r#"{"content":"","metadata":{}}"#,
            r#""not an object""#,
            r#"{"content":"lo","metadata":{"tokens":2}}"#,
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = Arc::new(MemoryUsageRecorder::new());
    let client = client(&server, recorder.clone()).build().unwrap();
    let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];

    let deltas = collect_ok(
        client
            .stream_chat(&messages, CompletionOptions::default())
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(assistant_texts(&deltas), vec!["Hel", "lo"]);

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, UsageEventKind::PromptTokens);
    assert_eq!(events[0].text, "be brief\nhi");
    assert_eq!(events[1].kind, UsageEventKind::CompletionTokens);
    assert_eq!(events[1].text, "Hello");
}

#[tokio::test]
async fn messages_are_normalized_for_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ndjson(&[r#"{"content":"ok"}"#]))
        .mount(&server)
        .await;

    let client = client(&server, Arc::new(MemoryUsageRecorder::new()))
        .build()
        .unwrap();
    let messages = vec![
        ChatMessage::user("plain"),
        ChatMessage::with_parts(
            MessageRole::User,
            vec![
                ContentPart::text("what is this?"),
                ContentPart::image_url("https://example.com/cat.png"),
            ],
        ),
    ];
    let options = CompletionOptions::new().with_stop(["a", "b", "c"]).with_temperature(0.1);
    let _ = collect_ok(client.stream_chat(&messages, options).await.unwrap()).await;

    let body = &request_bodies(&server).await[0];
    assert_eq!(
        body["messages"],
        json!([
            { "role": "user", "content": "plain" },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": "what is this?", "image_url": { "detail": "low" } },
                    {
                        "type": "imageUrl",
                        "image_url": { "url": "https://example.com/cat.png", "detail": "low" }
                    }
                ]
            }
        ])
    );
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["stop"], json!(["a", "b"]));
    assert_eq!(body["temperature"], 0.1);
}

#[tokio::test]
async fn bearer_token_is_attached_when_available() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer live-token"))
        .and(header("x-org", "pear"))
        .respond_with(ndjson(&[r#"{"content":"ok"}"#]))
        .expect(1)
        .mount(&server)
        .await;

    let auth = StaticAuthProvider::new(AuthTokens::new("live-token", "refresh"))
        .with_header("x-org", "pear");
    let client = client(&server, Arc::new(MemoryUsageRecorder::new()))
        .auth_provider(auth)
        .build()
        .unwrap();
    let deltas = collect_ok(
        client
            .stream_chat(&[ChatMessage::user("hi")], CompletionOptions::default())
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(assistant_texts(&deltas), vec!["ok"]);
}

#[tokio::test]
async fn auth_failure_sends_request_without_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-client", "tests"))
        .respond_with(ndjson(&[r#"{"content":"anonymous"}"#]))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Arc::new(MemoryUsageRecorder::new()))
        .auth_provider(FailingAuth)
        .build()
        .unwrap();
    let deltas = collect_ok(
        client
            .stream_chat(&[ChatMessage::user("hi")], CompletionOptions::default())
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(assistant_texts(&deltas), vec!["anonymous"]);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn token_unusable_as_header_sends_request_without_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ndjson(&[r#"{"content":"anonymous"}"#]))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Arc::new(MemoryUsageRecorder::new()))
        .auth_provider(StaticAuthProvider::new(AuthTokens::new("tok\nen", "refresh")))
        .build()
        .unwrap();
    let deltas = collect_ok(
        client
            .stream_chat(&[ChatMessage::user("hi")], CompletionOptions::default())
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(assistant_texts(&deltas), vec!["anonymous"]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

struct RotatingRefresher;

#[async_trait]
impl TokenRefresher for RotatingRefresher {
    async fn refresh(&self, current: &AuthTokens) -> Result<AuthTokens, LlmError> {
        Ok(AuthTokens {
            access_token: "rotated".to_string().into(),
            refresh_token: current.refresh_token.clone(),
            expires_at: Some(Utc::now() + Duration::hours(1)),
        })
    }
}

#[tokio::test]
async fn expired_tokens_are_refreshed_before_chat() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer rotated"))
        .respond_with(ndjson(&[r#"{"content":"fresh"}"#]))
        .expect(1)
        .mount(&server)
        .await;

    let stale = AuthTokens::new("stale", "refresh").with_expiry(Utc::now() - Duration::minutes(5));
    let client = client(&server, Arc::new(MemoryUsageRecorder::new()))
        .auth_provider(RefreshingAuthProvider::new(stale, RotatingRefresher))
        .build()
        .unwrap();
    let deltas = collect_ok(
        client
            .stream_chat(&[ChatMessage::user("hi")], CompletionOptions::default())
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(assistant_texts(&deltas), vec!["fresh"]);
}

#[tokio::test]
async fn chat_also_requires_usage_accounting() {
    let server = MockServer::start().await;
    let client = PearAiServer::builder()
        .server_url(server.uri())
        .model("gpt-4o")
        .usage_recorder(DisabledUsageRecorder)
        .build()
        .unwrap();

    let err = client
        .stream_chat(&[ChatMessage::user("hi")], CompletionOptions::default())
        .await
        .err()
        .expect("must be refused");
    assert!(matches!(err, LlmError::UsageAccountingDisabled(_)));
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(0));
}

#[tokio::test]
async fn cancelled_chat_records_partial_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ndjson(&[
            r#"{"content":"one "}"#,
            r#"{"content":"two "}"#,
            r#"{"content":"three"}"#,
        ]))
        .mount(&server)
        .await;

    let recorder = Arc::new(MemoryUsageRecorder::new());
    let client = client(&server, recorder.clone()).build().unwrap();
    let StreamHandle { mut stream, cancel } = client
        .stream_chat_with_cancel(&[ChatMessage::user("count")], CompletionOptions::default())
        .await
        .unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.content.plain_text(), "one ");
    cancel.cancel();
    assert!(stream.next().await.is_none());

    let events = wait_for_events(&recorder, 2).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].text, "one ");
}
