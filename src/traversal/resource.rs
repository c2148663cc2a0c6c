//! Resource capabilities
//!
//! A resource can traverse (consume leading segments and hand back a
//! child), respond (produce a response or delegate), or both. The
//! capabilities are traits; `Resource` is the closed sum over them so the
//! walker and the invocation loop check capability by variant.

use std::fmt;
use std::sync::Arc;

use super::segments::Segments;
use crate::error::Error;
use crate::http::{response, Request, Response};

/// Child resource plus the segments it left unconsumed
pub type Child = (Resource, Segments);

/// Consumes leading path segments
pub trait Traverse: Send + Sync {
    /// Claim zero or more leading `segments` and return the child together
    /// with what remains. `Ok(None)` means no such child.
    fn resolve_child(&self, request: &Request, segments: &Segments) -> Result<Option<Child>, Error>;
}

/// Produces the answer for a fully resolved request
pub trait Respond: Send + Sync {
    fn respond(&self, request: &Request) -> Result<HandlerResult, Error>;
}

impl<F> Respond for F
where
    F: Fn(&Request) -> Result<HandlerResult, Error> + Send + Sync,
{
    fn respond(&self, request: &Request) -> Result<HandlerResult, Error> {
        self(request)
    }
}

/// A resource with both capabilities
pub trait Node: Traverse + Respond {
    fn as_traverse(&self) -> &dyn Traverse;
    fn as_respond(&self) -> &dyn Respond;
}

impl<T: Traverse + Respond> Node for T {
    fn as_traverse(&self) -> &dyn Traverse {
        self
    }

    fn as_respond(&self) -> &dyn Respond {
        self
    }
}

/// What `respond` hands back
#[derive(Debug)]
pub enum HandlerResult {
    /// Final answer
    Response(Response),
    /// Respond with this resource instead
    Delegate(Resource),
}

impl From<Response> for HandlerResult {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Resource> for HandlerResult {
    fn from(resource: Resource) -> Self {
        Self::Delegate(resource)
    }
}

/// A handler object, classified by capability
#[derive(Clone)]
pub enum Resource {
    /// Responds only; reaching it with segments left is a 404
    Invocable(Arc<dyn Respond>),
    /// Traverses only; resolving to it is a programming error
    Traversable(Arc<dyn Traverse>),
    Both(Arc<dyn Node>),
}

impl Resource {
    pub fn invocable(resource: impl Respond + 'static) -> Self {
        Self::Invocable(Arc::new(resource))
    }

    pub fn traversable(resource: impl Traverse + 'static) -> Self {
        Self::Traversable(Arc::new(resource))
    }

    pub fn node(resource: impl Node + 'static) -> Self {
        Self::Both(Arc::new(resource))
    }

    /// Invocable resource from a closure
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Request) -> Result<HandlerResult, Error> + Send + Sync + 'static,
    {
        Self::Invocable(Arc::new(f))
    }

    pub fn as_traverse(&self) -> Option<&dyn Traverse> {
        match self {
            Self::Invocable(_) => None,
            Self::Traversable(t) => Some(t.as_ref()),
            Self::Both(n) => Some(n.as_traverse()),
        }
    }

    pub fn as_respond(&self) -> Option<&dyn Respond> {
        match self {
            Self::Invocable(r) => Some(r.as_ref()),
            Self::Traversable(_) => None,
            Self::Both(n) => Some(n.as_respond()),
        }
    }

    /// Identity comparison: both values point at the same object
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.data_ptr(), other.data_ptr())
    }

    fn data_ptr(&self) -> *const () {
        match self {
            Self::Invocable(r) => Arc::as_ptr(r).cast::<()>(),
            Self::Traversable(t) => Arc::as_ptr(t).cast::<()>(),
            Self::Both(n) => Arc::as_ptr(n).cast::<()>(),
        }
    }

    const fn capability(&self) -> &'static str {
        match self {
            Self::Invocable(_) => "invocable",
            Self::Traversable(_) => "traversable",
            Self::Both(_) => "traversable+invocable",
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resource").field(&self.capability()).finish()
    }
}

/// Terminal resource answering 404 with an empty body
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl NotFound {
    /// The shared instance used as the resolution fallback
    pub fn shared() -> Resource {
        static SHARED: std::sync::OnceLock<Resource> = std::sync::OnceLock::new();
        SHARED.get_or_init(|| Resource::invocable(Self)).clone()
    }
}

impl Respond for NotFound {
    fn respond(&self, _request: &Request) -> Result<HandlerResult, Error> {
        Ok(response::not_found().into())
    }
}
