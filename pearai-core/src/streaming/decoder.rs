//! Stream Decoder
//!
//! Turns a response body into a lazy sequence of [`StreamChunk`]s, either by
//! parsing newline-delimited JSON or by passing UTF-8 text through as it
//! arrives. One frame is decoded per poll, so the decoder never reads ahead
//! of what the transport already buffered.

use bytes::Bytes;
use futures::Stream;
use futures_util::{StreamExt, TryStreamExt};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tokio_util::io::StreamReader;

use super::types::{ByteStream, ChunkStream};
use super::utf8::Utf8Decoder;
use crate::error::LlmError;
use crate::types::StreamChunk;

/// What to do with a line that is not valid JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedLinePolicy {
    /// Emit [`StreamChunk::Malformed`] and keep going.
    #[default]
    Skip,
    /// Emit [`LlmError::StreamDecodeError`] and end the stream.
    Abort,
}

/// How the body is framed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// One JSON document per line.
    JsonLines,
    /// Plain text, yielded as it arrives.
    RawText,
    /// Pick by `Content-Type`: `text/plain` is raw text, anything else JSON lines.
    #[default]
    Auto,
}

impl DecodeMode {
    /// Resolve `Auto` against a response content type.
    pub fn resolve(self, content_type: Option<&str>) -> Self {
        match self {
            Self::Auto => {
                let is_text = content_type
                    .map(|ct| ct.to_ascii_lowercase().starts_with("text/plain"))
                    .unwrap_or(false);
                if is_text {
                    Self::RawText
                } else {
                    Self::JsonLines
                }
            }
            other => other,
        }
    }
}

/// Body of a response as a stream of bytes, with transport errors classified.
pub fn response_byte_stream(response: reqwest::Response) -> ByteStream {
    Box::pin(
        response
            .bytes_stream()
            .map_err(|e| LlmError::StreamError(format!("Stream error: {e}"))),
    )
}

/// Decode a response, resolving [`DecodeMode::Auto`] from its headers.
pub fn decode_response(
    response: reqwest::Response,
    mode: DecodeMode,
    policy: MalformedLinePolicy,
) -> ChunkStream {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let mode = mode.resolve(content_type.as_deref());
    tracing::trace!(?mode, content_type = ?content_type, "decoding response body");
    decode_bytes(response_byte_stream(response), mode, policy)
}

/// Decode a byte stream in the given mode (`Auto` falls back to JSON lines).
pub fn decode_bytes<S>(bytes: S, mode: DecodeMode, policy: MalformedLinePolicy) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, LlmError>> + Send + 'static,
{
    match mode.resolve(None) {
        DecodeMode::RawText => decode_text(bytes),
        _ => decode_json_lines(bytes, policy),
    }
}

/// Newline-delimited JSON.
///
/// Blank lines are ignored, a trailing `\r` is stripped and a final line
/// without a newline is still parsed. A transport failure ends the stream
/// with one error item after every line completed before it.
pub fn decode_json_lines<S>(bytes: S, policy: MalformedLinePolicy) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, LlmError>> + Send + 'static,
{
    let reader = StreamReader::new(Box::pin(bytes.map_err(std::io::Error::other)));
    let mut lines = FramedRead::new(reader, AnyDelimiterCodec::new(b"\n".to_vec(), Vec::new()));

    let stream = async_stream::stream! {
        while let Some(frame) = lines.next().await {
            let raw = match frame {
                Ok(raw) => raw,
                Err(e) => {
                    yield Err(frame_error(e));
                    return;
                }
            };

            match parse_json_line(&raw) {
                LineOutcome::Blank => continue,
                LineOutcome::Value(value) => yield Ok(StreamChunk::Json(value)),
                LineOutcome::Malformed { line, error } => match policy {
                    MalformedLinePolicy::Skip => {
                        yield Ok(StreamChunk::Malformed { line, error });
                    }
                    MalformedLinePolicy::Abort => {
                        yield Err(LlmError::StreamDecodeError { line, message: error });
                        return;
                    }
                },
            }
        }
    };
    Box::pin(stream)
}

/// Raw UTF-8 text segments, in arrival order.
pub fn decode_text<S>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, LlmError>> + Send + 'static,
{
    let mut bytes = Box::pin(bytes);
    let stream = async_stream::stream! {
        let mut decoder = Utf8Decoder::new();
        while let Some(item) = bytes.next().await {
            match item {
                Ok(chunk) => {
                    let text = decoder.push(&chunk);
                    if !text.is_empty() {
                        yield Ok(StreamChunk::Text(text));
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
        let rest = decoder.finish();
        if !rest.is_empty() {
            yield Ok(StreamChunk::Text(rest));
        }
    };
    Box::pin(stream)
}

enum LineOutcome {
    Blank,
    Value(serde_json::Value),
    Malformed { line: String, error: String },
}

fn parse_json_line(raw: &[u8]) -> LineOutcome {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => {
            return LineOutcome::Malformed {
                line: String::from_utf8_lossy(raw).into_owned(),
                error: format!("invalid UTF-8: {e}"),
            };
        }
    };
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineOutcome::Blank;
    }
    match serde_json::from_str(trimmed) {
        Ok(value) => LineOutcome::Value(value),
        Err(e) => LineOutcome::Malformed {
            line: trimmed.to_string(),
            error: e.to_string(),
        },
    }
}

/// Recover the transport error that was tunnelled through `std::io::Error`.
fn frame_error(e: AnyDelimiterCodecError) -> LlmError {
    match e {
        AnyDelimiterCodecError::Io(io) => io
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<LlmError>())
            .cloned()
            .unwrap_or_else(|| LlmError::StreamError(format!("Stream read error: {io}"))),
        other => LlmError::StreamError(format!("Stream framing error: {other}")),
    }
}
