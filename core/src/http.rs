//! HTTP request types for the host-does-IO pattern.
//!
//! # Design
//! Requests are plain data. The login flow builds `HttpRequest` values and a
//! `Transport` executes them, so the same request can be handed to the
//! built-in ureq transport, a C host behind the FFI boundary, or a scripted
//! test double without the flow knowing which.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross FFI
//! boundaries without lifetime concerns.

/// Numeric HTTP status code of a completed response.
pub type StatusCode = u16;

/// A single header as a `(name, value)` pair.
pub type Header = (String, String);

/// Ordered header list. Insertion order is wire order.
pub type HeaderList = Vec<Header>;

/// HTTP method for a request. The login protocol only needs these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderList,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, headers: HeaderList, body: String) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers,
            body: Some(body),
        }
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Extract the value of cookie `name` from a single `Set-Cookie` header value.
///
/// Only the leading `name=value` pair is considered; attributes such as
/// `Path` or `HttpOnly` are ignored.
pub fn set_cookie_value<'a>(header_value: &'a str, name: &str) -> Option<&'a str> {
    let pair = header_value.split(';').next()?.trim();
    let (key, value) = pair.split_once('=')?;
    if key.trim() == name && !value.is_empty() {
        Some(value.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest::post(
            "http://localhost/x",
            vec![("Content-Type".to_string(), "application/json".to_string())],
            "{}".to_string(),
        );
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("cookie"), None);
    }

    #[test]
    fn set_cookie_value_reads_leading_pair() {
        let value = "PHPSESSID=abc123; path=/; HttpOnly";
        assert_eq!(set_cookie_value(value, "PHPSESSID"), Some("abc123"));
        assert_eq!(set_cookie_value(value, "other"), None);
    }

    #[test]
    fn set_cookie_value_rejects_empty_value() {
        assert_eq!(set_cookie_value("PHPSESSID=; path=/", "PHPSESSID"), None);
        assert_eq!(set_cookie_value("garbage", "PHPSESSID"), None);
    }
}
