//! Decoded units of a streamed response.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One unit produced by the stream decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// A complete line parsed as JSON.
    Json(Value),
    /// A raw text segment (text decode mode).
    Text(String),
    /// A line that failed to parse; emitted instead of aborting under the skip policy.
    Malformed { line: String, error: String },
}

impl StreamChunk {
    /// Text a completion stream yields for this chunk.
    ///
    /// JSON strings are used verbatim, objects contribute their `content`
    /// string, `null` contributes nothing and any other JSON value is
    /// rendered as compact JSON.
    pub fn completion_text(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Json(Value::String(text)) => Some(text.clone()),
            Self::Json(Value::Null) => None,
            Self::Json(Value::Object(obj)) => match obj.get("content") {
                Some(Value::String(text)) => Some(text.clone()),
                _ => Some(Value::Object(obj.clone()).to_string()),
            },
            Self::Json(other) => Some(other.to_string()),
            Self::Malformed { .. } => None,
        }
    }
}

/// A chat line: `{ "content"?: string, "metadata"?: object }`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl ChatStreamChunk {
    /// Content worth yielding (non-empty).
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    /// Metadata worth observing (non-empty).
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref().filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn completion_text_variants() {
        assert_eq!(
            StreamChunk::Json(json!("hello")).completion_text().as_deref(),
            Some("hello")
        );
        assert_eq!(
            StreamChunk::Json(json!({"content": "hi"}))
                .completion_text()
                .as_deref(),
            Some("hi")
        );
        assert_eq!(
            StreamChunk::Json(json!(42)).completion_text().as_deref(),
            Some("42")
        );
        assert_eq!(StreamChunk::Json(Value::Null).completion_text(), None);
        assert_eq!(
            StreamChunk::Text("raw".into()).completion_text().as_deref(),
            Some("raw")
        );
        assert_eq!(
            StreamChunk::Malformed {
                line: "{".into(),
                error: "eof".into()
            }
            .completion_text(),
            None
        );
    }

    #[test]
    fn chat_chunk_filters_empty_fields() {
        let chunk: ChatStreamChunk =
            serde_json::from_value(json!({"content": "", "metadata": {}})).unwrap();
        assert_eq!(chunk.content(), None);
        assert_eq!(chunk.metadata(), None);

        let chunk: ChatStreamChunk =
            serde_json::from_value(json!({"metadata": {"model": "gpt-4o"}})).unwrap();
        assert_eq!(chunk.content(), None);
        assert_eq!(
            chunk.metadata().and_then(|m| m.get("model")),
            Some(&json!("gpt-4o"))
        );
    }
}
