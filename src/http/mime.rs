//! MIME short name module
//!
//! Method registrations may name media types by short name (`html`,
//! `json`) the way file extensions name them. This module expands those
//! names to full media types.

use std::borrow::Cow;

/// Full media type for a short name or file extension
///
/// # Examples
/// ```
/// use restwalk::http::mime::media_type_for;
/// assert_eq!(media_type_for("html"), Some("text/html"));
/// assert_eq!(media_type_for("json"), Some("application/json"));
/// assert_eq!(media_type_for("nope"), None);
/// ```
pub fn media_type_for(name: &str) -> Option<&'static str> {
    let media_type = match name.to_ascii_lowercase().as_str() {
        // Text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" | "text" | "plain" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "xml" => "application/xml",

        // Structured data
        "json" => "application/json",
        "js" | "mjs" | "javascript" => "application/javascript",
        "atom" => "application/atom+xml",
        "rss" => "application/rss+xml",
        "xhtml" => "application/xhtml+xml",
        "form" => "application/x-www-form-urlencoded",
        "multipart" => "multipart/form-data",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        // Documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "bin" | "octet-stream" => "application/octet-stream",

        _ => return None,
    };
    Some(media_type)
}

/// Expand a registration pattern: full types (anything holding a `/`)
/// pass through, short names go through `media_type_for`.
pub fn expand_pattern(pattern: &str) -> Option<Cow<'_, str>> {
    let trimmed = pattern.trim();
    if trimmed.contains('/') {
        return Some(Cow::Borrowed(trimmed));
    }
    if trimmed == "*" {
        return Some(Cow::Borrowed("*/*"));
    }
    media_type_for(trimmed).map(Cow::Borrowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(media_type_for("html"), Some("text/html"));
        assert_eq!(media_type_for("HTML"), Some("text/html"));
        assert_eq!(media_type_for("css"), Some("text/css"));
        assert_eq!(media_type_for("txt"), Some("text/plain"));
        assert_eq!(media_type_for("json"), Some("application/json"));
        assert_eq!(media_type_for("png"), Some("image/png"));
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(media_type_for("xyz"), None);
        assert_eq!(expand_pattern("xyz"), None);
    }

    #[test]
    fn test_expand_pattern() {
        assert_eq!(expand_pattern("json").as_deref(), Some("application/json"));
        assert_eq!(expand_pattern(" text/* ").as_deref(), Some("text/*"));
        assert_eq!(expand_pattern("*").as_deref(), Some("*/*"));
        assert_eq!(
            expand_pattern("application/vnd.notes+json").as_deref(),
            Some("application/vnd.notes+json")
        );
    }
}
