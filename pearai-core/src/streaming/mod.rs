//! Streaming Module
//!
//! Response body decoding, stream types and per-call usage accounting.

pub mod accounting;
pub mod decoder;
pub mod types;
pub mod utf8;

pub use accounting::{CallLifecycle, CallState};
pub use decoder::{
    DecodeMode, MalformedLinePolicy, decode_bytes, decode_json_lines, decode_response,
    decode_text, response_byte_stream,
};
pub use types::{ByteStream, ChatStream, ChunkStream, CompletionStream, StreamHandle};
pub use utf8::Utf8Decoder;
