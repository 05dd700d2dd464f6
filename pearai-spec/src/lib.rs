//! pearai-spec
//!
//! Wire-level types for the PearAI server client: completion options and the
//! request arguments derived from them, chat messages, decoded stream chunks,
//! usage events and HTTP configuration.
//!
//! Runtime pieces (HTTP, decoding, auth, usage accounting) live in
//! `pearai-core`; the client itself lives in `pearai`.
#![deny(unsafe_code)]

pub mod error;
pub mod types;

pub use error::LlmError;
