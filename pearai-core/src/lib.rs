//! pearai-core
//!
//! Runtime pieces of the PearAI server client: the line-delimited JSON
//! stream decoder, auth and usage collaborators, header building, HTTP
//! status classification, retries and stream cancellation.
#![deny(unsafe_code)]

pub mod auth;
pub mod error;
pub mod execution;
pub mod retry;
pub mod streaming;
pub mod types;
pub mod usage;
pub mod utils;

pub use error::LlmError;
