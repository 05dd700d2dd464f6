//! Request execution.

pub mod http;
