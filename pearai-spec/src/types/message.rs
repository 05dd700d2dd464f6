//! Chat message types and their server wire form.

use serde::{Deserialize, Serialize};

use super::options::CompletionArgs;

/// Message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Image detail level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Auto,
    Low,
    High,
}

/// Image reference carried by a content part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

/// Kind of a content part.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContentPartType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "imageUrl")]
    ImageUrl,
}

/// One element of structured message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: ContentPartType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageUrl>,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: ContentPartType::Text,
            text: Some(text.into()),
            image_url: None,
        }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self {
            kind: ContentPartType::ImageUrl,
            text: None,
            image_url: Some(ImageUrl {
                url: url.into(),
                detail: None,
            }),
        }
    }
}

/// Message content: plain text or an ordered list of parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text view used for usage accounting. Text parts are joined with `\n`.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn with_parts(role: MessageRole, parts: Vec<ContentPart>) -> Self {
        Self::new(role, MessageContent::Parts(parts))
    }
}

/// Join the text of every message with `\n`.
pub fn joined_text(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| m.content.plain_text())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Image reference as forwarded to the server. The detail hint is always `low`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireImageUrl<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    pub detail: ImageDetail,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireContentPart<'a> {
    #[serde(rename = "type")]
    pub kind: ContentPartType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    pub image_url: WireImageUrl<'a>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum WireContent<'a> {
    Text(&'a str),
    Parts(Vec<WireContentPart<'a>>),
}

/// A chat message normalized for `POST /server_chat`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireMessage<'a> {
    pub role: MessageRole,
    pub content: WireContent<'a>,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        let content = match &message.content {
            MessageContent::Text(text) => WireContent::Text(text),
            MessageContent::Parts(parts) => WireContent::Parts(
                parts
                    .iter()
                    .map(|part| WireContentPart {
                        kind: part.kind,
                        text: part.text.as_deref(),
                        image_url: WireImageUrl {
                            url: part.image_url.as_ref().map(|i| i.url.as_str()),
                            detail: ImageDetail::Low,
                        },
                    })
                    .collect(),
            ),
        };
        Self {
            role: message.role,
            content,
        }
    }
}

/// Body of `POST /server_chat`.
#[derive(Debug, Serialize)]
pub struct ChatBody<'a> {
    pub messages: Vec<WireMessage<'a>>,
    #[serde(flatten)]
    pub args: &'a CompletionArgs,
}

impl<'a> ChatBody<'a> {
    pub fn new(messages: &'a [ChatMessage], args: &'a CompletionArgs) -> Self {
        Self {
            messages: messages.iter().map(WireMessage::from).collect(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_content_is_forwarded_unchanged() {
        let msg = ChatMessage::user("hello there");
        let wire = serde_json::to_value(WireMessage::from(&msg)).unwrap();
        assert_eq!(wire, json!({"role": "user", "content": "hello there"}));
    }

    #[test]
    fn every_part_gets_a_low_detail_hint() {
        let mut image = ContentPart::image_url("https://example.com/cat.png");
        if let Some(url) = image.image_url.as_mut() {
            url.detail = Some(ImageDetail::High);
        }
        let msg = ChatMessage::with_parts(
            MessageRole::User,
            vec![ContentPart::text("what is this?"), image],
        );
        let wire = serde_json::to_value(WireMessage::from(&msg)).unwrap();
        assert_eq!(
            wire,
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "what is this?", "image_url": {"detail": "low"}},
                    {
                        "type": "imageUrl",
                        "image_url": {"url": "https://example.com/cat.png", "detail": "low"}
                    }
                ]
            })
        );
    }

    #[test]
    fn joined_text_uses_newlines() {
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::with_parts(
                MessageRole::User,
                vec![
                    ContentPart::text("a"),
                    ContentPart::image_url("https://x/y.png"),
                    ContentPart::text("b"),
                ],
            ),
        ];
        assert_eq!(joined_text(&messages), "be brief\na\nb");
    }

    #[test]
    fn caller_messages_deserialize_from_camel_case_parts() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [{"type": "imageUrl", "imageUrl": {"url": "data:image/png;base64,AA=="}}]
        }))
        .unwrap();
        match msg.content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts[0].kind, ContentPartType::ImageUrl);
                assert_eq!(
                    parts[0].image_url.as_ref().map(|i| i.url.as_str()),
                    Some("data:image/png;base64,AA==")
                );
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }
}
