//! Traversal module
//!
//! Resource capabilities, the path segment cursor, the resolution walker
//! and the invocation loop.

pub mod invoke;
pub mod resource;
pub mod segments;
pub mod walker;

pub use invoke::{invoke, DEFAULT_MAX_DELEGATIONS};
pub use resource::{Child, HandlerResult, Node, NotFound, Resource, Respond, Traverse};
pub use segments::Segments;
pub use walker::{Walker, DEFAULT_MAX_STEPS};
