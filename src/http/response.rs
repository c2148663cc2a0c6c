//! HTTP response module
//!
//! `Response` is what a terminal resource produces: a status, an ordered
//! header list that may repeat names, and a lazy `Body`. The free functions
//! build the common statuses.

use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use hyper::StatusCode;

use super::body::Body;

/// Final response produced by a resource
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Body,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::empty(),
        }
    }

    /// Append a header. Values that are not valid header text are logged
    /// and dropped.
    #[must_use]
    pub fn header<V>(mut self, name: HeaderName, value: V) -> Self
    where
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Display,
    {
        match value.try_into() {
            Ok(value) => self.headers.push((name, value)),
            Err(e) => log_build_error(self.status, &name, &e),
        }
        self
    }

    #[must_use]
    pub fn with_headers<I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (HeaderName, HeaderValue)>,
    {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }

    /// First value for `name`
    pub fn header_value(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn into_parts(self) -> (StatusCode, Vec<(HeaderName, HeaderValue)>, Body) {
        (self.status, self.headers, self.body)
    }
}

/// 200 OK
pub fn ok(content_type: &str, body: impl Into<Body>) -> Response {
    Response::new(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .with_body(body)
}

/// 201 Created pointing at `location`
pub fn created(location: &str, content_type: &str, body: impl Into<Body>) -> Response {
    Response::new(StatusCode::CREATED)
        .header(LOCATION, location)
        .header(CONTENT_TYPE, content_type)
        .with_body(body)
}

/// 204 No Content
pub fn no_content() -> Response {
    Response::new(StatusCode::NO_CONTENT)
}

/// 301 Moved Permanently
pub fn moved_permanently(location: &str) -> Response {
    redirect(StatusCode::MOVED_PERMANENTLY, location)
}

/// 302 Found
pub fn found(location: &str) -> Response {
    redirect(StatusCode::FOUND, location)
}

/// 303 See Other
pub fn see_other(location: &str) -> Response {
    redirect(StatusCode::SEE_OTHER, location)
}

/// 304 Not Modified
pub fn not_modified() -> Response {
    Response::new(StatusCode::NOT_MODIFIED)
}

/// 404 Not Found with an empty body
pub fn not_found() -> Response {
    Response::new(StatusCode::NOT_FOUND)
}

fn redirect(status: StatusCode, location: &str) -> Response {
    Response::new(status).header(LOCATION, location)
}

/// Log response build error
fn log_build_error(status: StatusCode, name: &HeaderName, error: &dyn std::fmt::Display) {
    crate::logger::log_warning(&format!(
        "Dropping invalid '{name}' header on {} response: {error}",
        status.as_u16()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::body::Bytes;

    #[test]
    fn test_ok_response() {
        let mut response = ok("text/plain", "hello");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.header_value(&CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        assert_eq!(
            response.body_mut().collect_bytes().unwrap(),
            Bytes::from("hello")
        );
    }

    #[test]
    fn test_duplicate_headers_keep_order() {
        let name = HeaderName::from_static("link");
        let response = Response::new(StatusCode::OK)
            .header(name.clone(), "<a>")
            .header(CONTENT_TYPE, "text/plain")
            .header(name.clone(), "<b>");
        let links: Vec<_> = response
            .headers()
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, v)| v.to_str().unwrap())
            .collect();
        assert_eq!(links, vec!["<a>", "<b>"]);
        assert_eq!(response.headers()[1].0, CONTENT_TYPE);
    }

    #[test]
    fn test_invalid_header_value_is_dropped() {
        let response = Response::new(StatusCode::OK).header(LOCATION, "bad\nvalue");
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_redirects() {
        assert_eq!(see_other("/next").status(), StatusCode::SEE_OTHER);
        assert_eq!(
            found("/tmp").header_value(&LOCATION).unwrap(),
            "/tmp"
        );
        assert_eq!(
            moved_permanently("/new").status(),
            StatusCode::MOVED_PERMANENTLY
        );
    }

    #[test]
    fn test_created_sets_location() {
        let response = created("/notes/3", "application/json", "{}");
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.header_value(&LOCATION).unwrap(), "/notes/3");
    }
}
