//! Request, message, stream and usage types.

pub mod http;
pub mod message;
pub mod options;
pub mod stream;
pub mod usage;

pub use http::*;
pub use message::*;
pub use options::*;
pub use stream::*;
pub use usage::*;
