//! Method/accept dispatch table
//!
//! A resource type registers handler methods keyed by HTTP method, the
//! media type it produces and optionally the media type it consumes. At
//! request time the table picks one handler:
//! 1. method filter (405 with `Allow` when nothing is registered)
//! 2. `Content-Type` filter for handlers that declare one (415)
//! 3. `Accept` negotiation (406 when nothing is acceptable)

use hyper::header::CONTENT_TYPE;
use hyper::Method;
use std::fmt;
use std::sync::Arc;

use super::media::{self, MediaRange, Quality};
use crate::error::{ClientError, Error};
use crate::http::{mime, Request};
use crate::logger;
use crate::traversal::HandlerResult;

type HandlerFn<T> = dyn Fn(&T, &Request) -> Result<HandlerResult, Error> + Send + Sync;

struct Registration<T> {
    method: Method,
    pattern: String,
    /// `None` when the pattern could not be resolved; never matches
    produces: Option<MediaRange>,
    consumes: Option<Consumes>,
    handler: Arc<HandlerFn<T>>,
}

enum Consumes {
    Range(MediaRange),
    Invalid,
}

/// Per-type table of handler methods
pub struct MethodTable<T> {
    registrations: Vec<Registration<T>>,
}

impl<T> fmt::Debug for MethodTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .registrations
            .iter()
            .map(|r| format!("{} {}", r.method, r.pattern))
            .collect();
        f.debug_struct("MethodTable")
            .field("registrations", &entries)
            .finish()
    }
}

impl<T> MethodTable<T> {
    pub fn builder() -> MethodTableBuilder<T> {
        MethodTableBuilder {
            registrations: Vec::new(),
        }
    }

    /// Distinct registered methods, in registration order
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = Vec::new();
        for registration in &self.registrations {
            if !methods.contains(&registration.method) {
                methods.push(registration.method.clone());
            }
        }
        methods
    }

    /// Select the handler for `request` and call it on `resource`
    pub fn dispatch(&self, resource: &T, request: &Request) -> Result<HandlerResult, Error> {
        let handler = self.select(request)?;
        handler(resource, request)
    }

    fn select(&self, request: &Request) -> Result<&Arc<HandlerFn<T>>, ClientError> {
        let method = request.method().as_str();
        let by_method: Vec<&Registration<T>> = self
            .registrations
            .iter()
            .filter(|r| r.method.as_str().eq_ignore_ascii_case(method))
            .collect();
        if by_method.is_empty() {
            return Err(ClientError::method_not_allowed(&self.allowed_methods()));
        }

        let candidates = filter_by_content_type(by_method, request);
        if candidates.is_empty() {
            return Err(ClientError::unsupported_media_type());
        }

        let accepted = request.accept();
        let mut best: Option<((u32, Quality), &Registration<T>)> = None;
        for candidate in candidates {
            let Some(produces) = &candidate.produces else {
                continue;
            };
            let Some(score) = media::fitness_and_quality(produces, &accepted) else {
                continue;
            };
            // Strictly greater keeps the earliest registration on ties
            let better = match &best {
                Some((top, _)) => score > *top,
                None => true,
            };
            if better {
                best = Some((score, candidate));
            }
        }

        best.map(|(_, registration)| &registration.handler)
            .ok_or_else(ClientError::not_acceptable)
    }
}

fn filter_by_content_type<'a, T>(
    candidates: Vec<&'a Registration<T>>,
    request: &Request,
) -> Vec<&'a Registration<T>> {
    if !request.headers().contains_key(CONTENT_TYPE) {
        return candidates;
    }
    let sent = request.content_type();
    candidates
        .into_iter()
        .filter(|r| match (&r.consumes, &sent) {
            (None, _) => true,
            (Some(Consumes::Range(declared)), Some(sent)) => declared.matches(sent),
            (Some(_), _) => false,
        })
        .collect()
}

/// Builds a `MethodTable`, usually once inside a `OnceLock`
pub struct MethodTableBuilder<T> {
    registrations: Vec<Registration<T>>,
}

impl<T> MethodTableBuilder<T> {
    /// Register `handler` for `method`, producing `accept`.
    ///
    /// `accept` is a media type, a wildcard (`text/*`, `*/*`, `*`) or a
    /// short name such as `html` or `json`.
    #[must_use]
    pub fn register<F>(self, method: Method, accept: &str, handler: F) -> Self
    where
        F: Fn(&T, &Request) -> Result<HandlerResult, Error> + Send + Sync + 'static,
    {
        self.push(method, accept, None, handler)
    }

    /// Like `register`, but only for requests whose `Content-Type`
    /// matches `content_type`
    #[must_use]
    pub fn register_consuming<F>(self, method: Method, accept: &str, content_type: &str, handler: F) -> Self
    where
        F: Fn(&T, &Request) -> Result<HandlerResult, Error> + Send + Sync + 'static,
    {
        let consumes = match resolve_pattern(content_type) {
            Some(range) => Consumes::Range(range),
            None => Consumes::Invalid,
        };
        self.push(method, accept, Some(consumes), handler)
    }

    fn push<F>(mut self, method: Method, accept: &str, consumes: Option<Consumes>, handler: F) -> Self
    where
        F: Fn(&T, &Request) -> Result<HandlerResult, Error> + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            method,
            pattern: accept.to_string(),
            produces: resolve_pattern(accept),
            consumes,
            handler: Arc::new(handler),
        });
        self
    }

    pub fn build(self) -> MethodTable<T> {
        MethodTable {
            registrations: self.registrations,
        }
    }
}

fn resolve_pattern(pattern: &str) -> Option<MediaRange> {
    let parsed = mime::expand_pattern(pattern).and_then(|full| full.parse().ok());
    if parsed.is_none() {
        logger::log_warning(&format!(
            "Media pattern '{pattern}' is not a known media type; handler will never match"
        ));
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response;
    use crate::http::Response;
    use hyper::body::Bytes;
    use hyper::header::{HeaderValue, ACCEPT, ALLOW};
    use hyper::StatusCode;

    struct Doc {
        title: &'static str,
    }

    impl Doc {
        fn html(&self, _request: &Request) -> Result<HandlerResult, Error> {
            Ok(response::ok("text/html", format!("<h1>{}</h1>", self.title)).into())
        }

        fn json(&self, _request: &Request) -> Result<HandlerResult, Error> {
            Ok(response::ok("application/json", format!("{{\"title\":\"{}\"}}", self.title)).into())
        }

        fn replace(&self, request: &Request) -> Result<HandlerResult, Error> {
            Ok(response::ok("text/plain", request.body().clone()).into())
        }
    }

    fn table() -> MethodTable<Doc> {
        MethodTable::builder()
            .register(Method::GET, "html", Doc::html)
            .register(Method::GET, "json", Doc::json)
            .register_consuming(Method::PUT, "txt", "json", Doc::replace)
            .build()
    }

    fn run(table: &MethodTable<Doc>, request: Request) -> Result<Response, Error> {
        let doc = Doc { title: "hello" };
        match table.dispatch(&doc, &request)? {
            HandlerResult::Response(response) => Ok(response),
            HandlerResult::Delegate(_) => panic!("unexpected delegation"),
        }
    }

    fn get(accept: Option<&'static str>) -> Request {
        let mut builder = Request::builder().uri("/doc");
        if let Some(accept) = accept {
            builder = builder.header(ACCEPT, HeaderValue::from_static(accept));
        }
        builder.build().unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response.header_value(&CONTENT_TYPE).unwrap().to_str().unwrap()
    }

    fn status_of(result: Result<Response, Error>) -> StatusCode {
        match result {
            Err(Error::Client(e)) => e.status(),
            other => panic!("expected client error, got {other:?}"),
        }
    }

    #[test]
    fn test_negotiates_json() {
        let response = run(&table(), get(Some("application/json"))).unwrap();
        assert_eq!(content_type(&response), "application/json");
    }

    #[test]
    fn test_negotiates_html() {
        let response = run(&table(), get(Some("text/html"))).unwrap();
        assert_eq!(content_type(&response), "text/html");
    }

    #[test]
    fn test_first_registered_wins_without_preference() {
        assert_eq!(content_type(&run(&table(), get(None)).unwrap()), "text/html");
        assert_eq!(content_type(&run(&table(), get(Some("*/*"))).unwrap()), "text/html");
    }

    #[test]
    fn test_quality_breaks_equal_fitness() {
        let response = run(&table(), get(Some("text/html;q=0.4, application/json"))).unwrap();
        assert_eq!(content_type(&response), "application/json");
    }

    #[test]
    fn test_specific_range_beats_wildcard() {
        let response = run(&table(), get(Some("*/*;q=0.9, application/json;q=0.1"))).unwrap();
        assert_eq!(content_type(&response), "application/json");
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/doc")
            .build()
            .unwrap();
        let err = run(&table(), request).unwrap_err();
        let Error::Client(err) = err else {
            panic!("expected client error");
        };
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.headers()[0].0, ALLOW);
        assert_eq!(err.headers()[0].1, "GET, PUT");
    }

    #[test]
    fn test_method_match_ignores_case() {
        let request = Request::builder()
            .method(Method::from_bytes(b"get").unwrap())
            .uri("/doc")
            .build()
            .unwrap();
        assert!(run(&table(), request).is_ok());
    }

    #[test]
    fn test_not_acceptable() {
        let only_json = MethodTable::builder()
            .register(Method::GET, "json", Doc::json)
            .build();
        assert_eq!(
            status_of(run(&only_json, get(Some("text/html")))),
            StatusCode::NOT_ACCEPTABLE
        );
    }

    #[test]
    fn test_zero_quality_is_not_acceptable() {
        assert_eq!(
            status_of(run(&table(), get(Some("text/html;q=0, application/json;q=0")))),
            StatusCode::NOT_ACCEPTABLE
        );
    }

    #[test]
    fn test_unparseable_accept_matches_nothing() {
        assert_eq!(
            status_of(run(&table(), get(Some("garbage")))),
            StatusCode::NOT_ACCEPTABLE
        );
    }

    #[test]
    fn test_content_type_filter() {
        let put = |content_type: &'static str| {
            Request::builder()
                .method(Method::PUT)
                .uri("/doc")
                .header(CONTENT_TYPE, HeaderValue::from_static(content_type))
                .body("{}")
                .build()
                .unwrap()
        };
        let mut response = run(&table(), put("application/json; charset=utf-8")).unwrap();
        assert_eq!(response.body_mut().collect_bytes().unwrap(), Bytes::from("{}"));

        assert_eq!(
            status_of(run(&table(), put("text/csv"))),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn test_content_type_absent_keeps_candidates() {
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/doc")
            .build()
            .unwrap();
        assert!(run(&table(), request).is_ok());
    }

    #[test]
    fn test_unknown_short_name_never_matches() {
        let broken = MethodTable::builder()
            .register(Method::GET, "nonsense", Doc::html)
            .build();
        assert_eq!(
            status_of(run(&broken, get(None))),
            StatusCode::NOT_ACCEPTABLE
        );
    }

    #[test]
    fn test_closure_handlers() {
        let table = MethodTable::<Doc>::builder()
            .register(Method::DELETE, "*", |_doc, _request| Ok(response::no_content().into()))
            .build();
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/doc")
            .build()
            .unwrap();
        assert_eq!(run(&table, request).unwrap().status(), StatusCode::NO_CONTENT);
    }
}
