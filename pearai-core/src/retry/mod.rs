//! Retry module
//!
//! Retries are opt-in: the client only repeats the request handshake when a
//! [`RetryPolicy`] was configured. Nothing is retried once a response stream
//! has started.

pub mod policy;

pub use policy::*;
