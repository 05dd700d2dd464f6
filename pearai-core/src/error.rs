//! Error types (re-exported from `pearai-spec`).

pub use pearai_spec::error::*;
