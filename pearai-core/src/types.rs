//! Wire types (re-exported from `pearai-spec`).

pub use pearai_spec::types::*;
