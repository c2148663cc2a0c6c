//! Application entry point
//!
//! `App::handle` is the single failure boundary of the dispatch core:
//! locate the resource, invoke it, and render client errors. Everything
//! else goes back to the caller.

use hyper::http::Extensions;
use std::sync::Arc;

use crate::config::DispatchConfig;
use crate::error::Error;
use crate::http::{Request, RequestBuilder, Response};
use crate::templating::Templating;
use crate::traversal::{invoke, Resource, Walker, DEFAULT_MAX_DELEGATIONS};

/// Resource tree plus the collaborators handed to every request
#[derive(Debug, Clone)]
pub struct App {
    root: Resource,
    walker: Walker,
    max_delegations: usize,
    context: Extensions,
}

impl App {
    pub fn new(root: Resource) -> Self {
        Self {
            root,
            walker: Walker::new(),
            max_delegations: DEFAULT_MAX_DELEGATIONS,
            context: Extensions::new(),
        }
    }

    /// Replace the shared 404 resource
    #[must_use]
    pub fn with_not_found(mut self, not_found: Resource) -> Self {
        self.walker = self.walker.with_not_found(not_found);
        self
    }

    /// Apply step and delegation caps
    #[must_use]
    pub fn with_limits(mut self, config: &DispatchConfig) -> Self {
        self.walker = self.walker.with_max_steps(config.max_traversal_steps);
        self.max_delegations = config.max_delegations;
        self
    }

    #[must_use]
    pub fn with_templating(self, templating: Arc<dyn Templating>) -> Self {
        self.with_context(templating)
    }

    /// Add a value to the context every request carries
    #[must_use]
    pub fn with_context<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.context.insert(value);
        self
    }

    pub const fn root(&self) -> &Resource {
        &self.root
    }

    /// Request builder seeded with this app's context
    pub fn request(&self) -> RequestBuilder {
        Request::builder().context(self.context.clone())
    }

    /// Resolve and invoke `request`.
    ///
    /// Client errors raised anywhere in the call chain become responses
    /// here. Server errors and unclassified failures are returned as `Err`.
    pub fn handle(&self, request: &Request) -> Result<Response, Error> {
        match self.dispatch(request) {
            Err(Error::Client(err)) => Ok(err.into_response()),
            other => other,
        }
    }

    fn dispatch(&self, request: &Request) -> Result<Response, Error> {
        let resource = self.walker.locate(request, &self.root)?;
        invoke(request, resource, self.max_delegations)
    }
}
