//! HTTP protocol layer module
//!
//! Request and response values used by the dispatch core, independent of
//! the transport that produced them.

pub mod body;
pub mod mime;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use body::Body;
pub use request::{Request, RequestBuilder};
pub use response::Response;
