//! Request module
//!
//! A `Request` is created once per inbound call and never mutated. Walking
//! the resource tree narrows it: each step gets a new value that shares the
//! request head and carries a shorter segment cursor.

use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use hyper::http::Extensions;
use hyper::{Method, Uri, Version};
use std::sync::Arc;

use crate::dispatch::media::{self, MediaRange};
use crate::error::ClientError;
use crate::templating::Templating;
use crate::traversal::Segments;

/// Everything read off the wire, shared by all narrowed views
#[derive(Debug)]
struct Head {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    mount_path: String,
    path: Segments,
    context: Extensions,
}

/// Immutable per-call request
#[derive(Debug, Clone)]
pub struct Request {
    head: Arc<Head>,
    remaining: Segments,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// GET request for `uri`, handy in tests and probes
    pub fn blank(uri: &str) -> Result<Self, ClientError> {
        Self::builder().uri(uri).build()
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    pub fn header_str(&self, name: &HeaderName) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.head.body
    }

    /// Mount prefix stripped before segmenting
    pub fn mount_path(&self) -> &str {
        &self.head.mount_path
    }

    /// Every segment below the mount point
    pub fn path_segments(&self) -> &Segments {
        &self.head.path
    }

    /// Segments not consumed by the resolution walk so far
    pub fn remaining(&self) -> &Segments {
        &self.remaining
    }

    /// View of the same request with a different unconsumed suffix
    #[must_use]
    pub fn narrow(&self, remaining: Segments) -> Self {
        Self {
            head: Arc::clone(&self.head),
            remaining,
        }
    }

    /// Parsed `Accept` ranges across all `Accept` headers; `*/*` when absent
    pub fn accept(&self) -> Vec<MediaRange> {
        let mut ranges = Vec::new();
        for value in self.head.headers.get_all(ACCEPT) {
            if let Ok(text) = value.to_str() {
                ranges.extend(media::parse_accept(text));
            }
        }
        if ranges.is_empty() && !self.head.headers.contains_key(ACCEPT) {
            ranges.push(MediaRange::any());
        }
        ranges
    }

    /// Parsed `Content-Type`, if present and well formed
    pub fn content_type(&self) -> Option<MediaRange> {
        self.header_str(&CONTENT_TYPE)
            .and_then(|text| text.parse().ok())
    }

    /// Request-scoped context bag
    pub fn context(&self) -> &Extensions {
        &self.head.context
    }

    pub fn templating(&self) -> Option<&Arc<dyn Templating>> {
        self.head.context.get::<Arc<dyn Templating>>()
    }
}

/// Builds a `Request` from wire-level parts
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    uri: String,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    mount_path: String,
    context: Extensions,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: "/".to_string(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            mount_path: String::new(),
            context: Extensions::new(),
        }
    }
}

impl RequestBuilder {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    #[must_use]
    pub const fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn mount_path(mut self, mount_path: impl Into<String>) -> Self {
        self.mount_path = mount_path.into();
        self
    }

    #[must_use]
    pub fn context(mut self, context: Extensions) -> Self {
        self.context = context;
        self
    }

    /// Parse the URI and segment its path. A malformed URI or undecodable
    /// segment is a bad request; a path outside the mount point is not
    /// found.
    pub fn build(self) -> Result<Request, ClientError> {
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|_| ClientError::bad_request())?;
        let path = Segments::parse_mounted(uri.path(), &self.mount_path)?
            .ok_or_else(ClientError::not_found)?;
        Ok(Request {
            head: Arc::new(Head {
                method: self.method,
                uri,
                version: self.version,
                headers: self.headers,
                body: self.body,
                mount_path: self.mount_path,
                path: path.clone(),
                context: self.context,
            }),
            remaining: path,
        })
    }
}
