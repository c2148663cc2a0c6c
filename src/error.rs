//! Dispatch error taxonomy
//!
//! Client errors (4xx) are the only conditions turned into responses by the
//! dispatch core. Everything else is handed back to the transport.

use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, ALLOW};
use hyper::{Method, StatusCode};
use std::fmt;
use thiserror::Error;

use crate::http::{Body, Response};

/// Errors raised while resolving or invoking a resource
#[derive(Debug, Error)]
pub enum Error {
    /// 4xx condition raised by handler code, rendered by `App::handle`
    #[error(transparent)]
    Client(#[from] ClientError),

    /// 5xx condition raised by handler code, left to the transport
    #[error(transparent)]
    Server(#[from] ServerError),

    /// A resolved resource has no `respond` capability
    #[error("resource resolved for '{path}' is not invocable")]
    NotInvocable { path: String },

    /// The walker kept resolving without exhausting the path
    #[error("traversal of '{path}' exceeded {limit} steps")]
    TraversalLimit { path: String, limit: usize },

    /// Resources kept delegating to each other
    #[error("invocation of '{path}' exceeded {limit} delegations")]
    DelegationLimit { path: String, limit: usize },

    /// Unclassified handler failure
    #[error("handler failed: {0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary failure as an unclassified handler error
    pub fn other<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Handler(err.into())
    }

    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Client(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Handler(Box::new(err))
    }
}

/// An HTTP client error carrying the response it renders to
#[derive(Debug, Clone, Error)]
#[error("client error {status}")]
pub struct ClientError {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Option<Bytes>,
}

impl ClientError {
    /// Build a client error for any status. Statuses outside 4xx are
    /// coerced to 400.
    pub fn new(status: StatusCode) -> Self {
        let status = if status.is_client_error() {
            status
        } else {
            StatusCode::BAD_REQUEST
        };
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// 405 with an `Allow` header listing `allowed` in the given order
    pub fn method_not_allowed(allowed: &[Method]) -> Self {
        let mut names: Vec<&str> = Vec::with_capacity(allowed.len());
        for method in allowed {
            if !names.contains(&method.as_str()) {
                names.push(method.as_str());
            }
        }
        let err = Self::new(StatusCode::METHOD_NOT_ALLOWED);
        match HeaderValue::from_str(&names.join(", ")) {
            Ok(value) => err.with_header(ALLOW, value),
            Err(_) => err,
        }
    }

    pub fn not_acceptable() -> Self {
        Self::new(StatusCode::NOT_ACCEPTABLE)
    }

    pub fn conflict() -> Self {
        Self::new(StatusCode::CONFLICT)
    }

    pub fn gone() -> Self {
        Self::new(StatusCode::GONE)
    }

    pub fn unsupported_media_type() -> Self {
        Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE)
    }

    pub fn payload_too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE)
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }

    /// Render as a response. No body unless one was attached.
    pub fn into_response(self) -> Response {
        let body = self.body.map_or_else(Body::empty, Body::from_bytes);
        Response::new(self.status)
            .with_headers(self.headers)
            .with_body(body)
    }
}

/// An HTTP server error. Never rendered by the dispatch core.
#[derive(Debug, Clone, Error)]
pub struct ServerError {
    status: StatusCode,
    message: Option<String>,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server error {}", self.status)?;
        match &self.message {
            Some(message) => write!(f, ": {message}"),
            None => Ok(()),
        }
    }
}

impl ServerError {
    /// Statuses outside 5xx are coerced to 500.
    pub fn new(status: StatusCode) -> Self {
        let status = if status.is_server_error() {
            status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: None,
        }
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn not_implemented() -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED)
    }

    pub fn bad_gateway() -> Self {
        Self::new(StatusCode::BAD_GATEWAY)
    }

    pub fn service_unavailable() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE)
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_message_is_displayed() {
        let err: Error = ServerError::internal()
            .with_message("no templating engine configured")
            .into();
        assert_eq!(
            err.to_string(),
            "server error 500 Internal Server Error: no templating engine configured"
        );
        assert_eq!(
            ServerError::bad_gateway().to_string(),
            "server error 502 Bad Gateway"
        );
    }

    #[test]
    fn test_client_error_renders_status_without_body() {
        let mut response = ClientError::bad_request().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().is_empty());
        assert!(response.body_mut().collect_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_method_not_allowed_lists_methods_once() {
        let err = ClientError::method_not_allowed(&[Method::GET, Method::PUT, Method::GET]);
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.headers().len(), 1);
        assert_eq!(err.headers()[0].0, ALLOW);
        assert_eq!(err.headers()[0].1, "GET, PUT");
    }

    #[test]
    fn test_client_error_body_is_kept() {
        let mut response = ClientError::conflict()
            .with_body("already exists")
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.body_mut().collect_bytes().unwrap(),
            Bytes::from("already exists")
        );
    }

    #[test]
    fn test_status_coercion() {
        assert_eq!(
            ClientError::new(StatusCode::OK).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::new(StatusCode::NOT_FOUND).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ServerError::bad_gateway().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_io_error_is_unclassified() {
        let err: Error = std::io::Error::other("disk on fire").into();
        assert!(matches!(err, Error::Handler(_)));
        assert!(!err.is_client_error());
    }
}
