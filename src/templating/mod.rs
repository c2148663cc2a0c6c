//! Templating collaborator
//!
//! The dispatch core ships no template language. An application installs a
//! `Templating` implementation in the request context (`App::with_templating`)
//! and resources render through the helpers here.
//!
//! Render arguments are layered: `args` holds what every template sees,
//! `element_args` adds the rendered object as `element`, and `page_args`
//! starts from `element_args`. Overriding a lower layer changes every layer
//! above it.

use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::StatusCode;
use serde_json::{json, Map, Value};

use crate::error::{Error, ServerError};
use crate::http::{Request, Response};

/// Named render arguments
pub type Args = Map<String, Value>;

/// Encoding applied to full pages
pub const PAGE_ENCODING: &str = "utf-8";

/// Content type of `page_response`
pub const PAGE_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Template renderer plus the arguments every render receives
pub trait Templating: Send + Sync {
    /// Render `template` with `args`. `encoding` is `None` for fragments,
    /// leaving the choice to the renderer.
    fn render_template(&self, template: &str, args: &Args, encoding: Option<&str>) -> Result<Bytes, Error>;

    /// Arguments common to every render
    fn args(&self, request: &Request) -> Args {
        let root = if request.mount_path().is_empty() {
            "/".to_string()
        } else {
            request.mount_path().to_string()
        };
        let mut args = Args::new();
        args.insert(
            "urls".to_string(),
            json!({
                "root": root,
                "current": request.uri().path(),
            }),
        );
        args
    }

    /// Arguments for rendering one object
    fn element_args(&self, request: &Request, element: &Value) -> Args {
        let mut args = self.args(request);
        args.insert("element".to_string(), element.clone());
        args
    }

    /// Arguments for rendering a full page
    fn page_args(&self, request: &Request, page: &Value) -> Args {
        self.element_args(request, page)
    }
}

impl<F> Templating for F
where
    F: Fn(&str, &Args, Option<&str>) -> Result<Bytes, Error> + Send + Sync,
{
    fn render_template(&self, template: &str, args: &Args, encoding: Option<&str>) -> Result<Bytes, Error> {
        self(template, args, encoding)
    }
}

fn templating(request: &Request) -> Result<&dyn Templating, Error> {
    request
        .templating()
        .map(|engine| &**engine)
        .ok_or_else(|| ServerError::internal().with_message("no templating engine configured").into())
}

fn merged(mut base: Args, extra: Option<Args>) -> Args {
    if let Some(extra) = extra {
        base.extend(extra);
    }
    base
}

/// Render a template with the common arguments
pub fn render(request: &Request, template: &str, args: Option<Args>) -> Result<Bytes, Error> {
    let engine = templating(request)?;
    let args = merged(engine.args(request), args);
    engine.render_template(template, &args, None)
}

/// Render a fragment for `element`
pub fn render_element(request: &Request, element: &Value, template: &str, args: Option<Args>) -> Result<Bytes, Error> {
    let engine = templating(request)?;
    let args = merged(engine.element_args(request, element), args);
    engine.render_template(template, &args, None)
}

/// Render a full page, always encoded as utf-8
pub fn render_page(request: &Request, page: &Value, template: &str, args: Option<Args>) -> Result<Bytes, Error> {
    let engine = templating(request)?;
    let args = merged(engine.page_args(request, page), args);
    engine.render_template(template, &args, Some(PAGE_ENCODING))
}

/// Render a page into a 200 HTML response carrying `headers` as well
pub fn page_response<I>(request: &Request, page: &Value, template: &str, args: Option<Args>, headers: I) -> Result<Response, Error>
where
    I: IntoIterator<Item = (HeaderName, HeaderValue)>,
{
    let body = render_page(request, page, template, args)?;
    Ok(Response::new(StatusCode::OK)
        .header(CONTENT_TYPE, PAGE_CONTENT_TYPE)
        .with_headers(headers)
        .with_body(body))
}
