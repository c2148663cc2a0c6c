//! Access log lines
//!
//! `AccessLogFormat` is read from `logging.access_log_format`:
//! `combined`, `common`, `json`, or a pattern with `$variables` such as
//! `$remote_addr "$request" $status $request_time`.

use chrono::{DateTime, Local};
use hyper::header::{HeaderMap, HeaderName, REFERER, USER_AGENT};
use hyper::{Method, Uri, Version};
use serde::Deserialize;
use serde_json::json;
use std::borrow::Cow;
use std::convert::Infallible;
use std::str::FromStr;
use std::time::Duration;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Shape of one access log line
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum AccessLogFormat {
    /// Common plus quoted referer and user agent
    #[default]
    Combined,
    /// Common Log Format
    Common,
    Json,
    Custom(String),
}

impl From<&str> for AccessLogFormat {
    fn from(s: &str) -> Self {
        match s {
            "combined" => Self::Combined,
            "common" => Self::Common,
            "json" => Self::Json,
            pattern => Self::Custom(pattern.to_string()),
        }
    }
}

impl From<String> for AccessLogFormat {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl FromStr for AccessLogFormat {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// One request as it appears in the access log
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    remote_addr: String,
    started: DateTime<Local>,
    method: String,
    path: String,
    query: Option<String>,
    version: &'static str,
    referer: Option<String>,
    user_agent: Option<String>,
    status: u16,
    /// Body bytes handed to the connection
    body_bytes: u64,
    elapsed: Duration,
}

impl AccessLogEntry {
    /// Start an entry from the request line and headers, timestamped now
    pub fn from_request(
        remote_addr: String,
        method: &Method,
        uri: &Uri,
        version: Version,
        headers: &HeaderMap,
    ) -> Self {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Self {
            remote_addr,
            started: Local::now(),
            method: method.to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(ToString::to_string),
            version: version_label(version),
            referer: header(REFERER),
            user_agent: header(USER_AGENT),
            status: 0,
            body_bytes: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Record the outcome once the response body is done
    pub fn finish(&mut self, status: u16, body_bytes: u64, elapsed: Duration) {
        self.status = status;
        self.body_bytes = body_bytes;
        self.elapsed = elapsed;
    }

    pub fn format(&self, format: &AccessLogFormat) -> String {
        match format {
            AccessLogFormat::Combined => format!(
                "{} \"{}\" \"{}\"",
                self.common_line(),
                dash(self.referer.as_deref()),
                dash(self.user_agent.as_deref()),
            ),
            AccessLogFormat::Common => self.common_line(),
            AccessLogFormat::Json => self.json_line(),
            AccessLogFormat::Custom(pattern) => self.expand(pattern),
        }
    }

    fn request_uri(&self) -> Cow<'_, str> {
        match &self.query {
            Some(query) => Cow::Owned(format!("{}?{query}", self.path)),
            None => Cow::Borrowed(self.path.as_str()),
        }
    }

    fn request_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.request_uri(), self.version)
    }

    fn common_line(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.started.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn json_line(&self) -> String {
        json!({
            "remote_addr": self.remote_addr,
            "time": self.started.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "http_version": self.version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": u64::try_from(self.elapsed.as_micros()).unwrap_or(u64::MAX),
        })
        .to_string()
    }

    /// Value of a `$variable`, `None` for names this log does not know
    fn variable(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "remote_addr" => Cow::Borrowed(self.remote_addr.as_str()),
            "time_local" => Cow::Owned(self.started.format(CLF_TIME).to_string()),
            "time_iso8601" => Cow::Owned(self.started.to_rfc3339()),
            "request" => Cow::Owned(self.request_line()),
            "request_method" => Cow::Borrowed(self.method.as_str()),
            "request_uri" => self.request_uri(),
            "uri" => Cow::Borrowed(self.path.as_str()),
            "args" => Cow::Borrowed(self.query.as_deref().unwrap_or_default()),
            "server_protocol" => Cow::Owned(format!("HTTP/{}", self.version)),
            "status" => Cow::Owned(self.status.to_string()),
            "body_bytes_sent" => Cow::Owned(self.body_bytes.to_string()),
            "http_referer" => Cow::Borrowed(dash(self.referer.as_deref())),
            "http_user_agent" => Cow::Borrowed(dash(self.user_agent.as_deref())),
            "request_time" => Cow::Owned(format!("{:.3}", self.elapsed.as_secs_f64())),
            _ => return None,
        };
        Some(value)
    }

    /// Substitute `$name` tokens (longest `[a-z0-9_]` run); unknown names
    /// are copied through unchanged.
    fn expand(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() * 2);
        let mut rest = pattern;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let len = after
                .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..len];
            match self.variable(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[len..];
        }
        out.push_str(rest);
        out
    }
}

fn dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

#[allow(clippy::missing_const_for_fn)]
fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn entry() -> AccessLogEntry {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://example.com"));
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        let uri: Uri = "/notes/1?page=1".parse().unwrap();
        let mut entry = AccessLogEntry::from_request(
            "192.168.1.1".to_string(),
            &Method::GET,
            &uri,
            Version::HTTP_11,
            &headers,
        );
        entry.finish(200, 1234, Duration::from_micros(1500));
        entry
    }

    fn fmt(text: &str) -> AccessLogFormat {
        text.parse().unwrap()
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(fmt("combined"), AccessLogFormat::Combined);
        assert_eq!(fmt("json"), AccessLogFormat::Json);
        assert_eq!(fmt("$status"), AccessLogFormat::Custom("$status".to_string()));
    }

    #[test]
    fn test_combined_line() {
        let line = entry().format(&AccessLogFormat::Combined);
        assert!(line.starts_with("192.168.1.1 - - ["));
        assert!(line.contains("\"GET /notes/1?page=1 HTTP/1.1\" 200 1234"));
        assert!(line.ends_with("\"https://example.com\" \"Mozilla/5.0\""));
    }

    #[test]
    fn test_common_line_has_no_headers() {
        let line = entry().format(&AccessLogFormat::Common);
        assert!(line.ends_with("\"GET /notes/1?page=1 HTTP/1.1\" 200 1234"));
        assert!(!line.contains("Mozilla"));
    }

    #[test]
    fn test_json_line() {
        let mut entry = entry();
        entry.user_agent = Some("quote \" and \\ slash".to_string());
        entry.referer = None;
        let value: serde_json::Value = serde_json::from_str(&entry.format(&AccessLogFormat::Json)).unwrap();
        assert_eq!(value["remote_addr"], "192.168.1.1");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 1234);
        assert_eq!(value["request_time_us"], 1500);
        assert_eq!(value["user_agent"], "quote \" and \\ slash");
        assert!(value["referer"].is_null());
    }

    #[test]
    fn test_custom_variables() {
        let line = entry().format(&fmt("$remote_addr $request_method $status $request_time \"$request\""));
        assert_eq!(line, "192.168.1.1 GET 200 0.002 \"GET /notes/1?page=1 HTTP/1.1\"");
    }

    #[test]
    fn test_custom_unknown_and_adjacent() {
        let line = entry().format(&fmt("$uri?$args $nope $$status-$server_protocol"));
        assert_eq!(line, "/notes/1?page=1 $nope $200-HTTP/1.1");
    }

    #[test]
    fn test_missing_headers_are_dashes() {
        let uri: Uri = "/".parse().unwrap();
        let entry = AccessLogEntry::from_request(
            "10.0.0.1".to_string(),
            &Method::POST,
            &uri,
            Version::HTTP_10,
            &HeaderMap::new(),
        );
        assert_eq!(
            entry.format(&fmt("$http_referer|$http_user_agent|$server_protocol")),
            "-|-|HTTP/1.0"
        );
    }
}
