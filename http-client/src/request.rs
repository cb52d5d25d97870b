//! HTTP request: method, resolved URL, merged headers and optional body.
//!
//! Requests are built per call and serialized to HTTP/1.1 by [`Request::encode`].

use http::Method;
use url::Url;

use crate::error::{HttpClientError, HttpClientResult};
use crate::headers::Headers;

const JSON_CONTENT_TYPE: &str = "application/json";

// Computed by the client on every request; values set by the caller are replaced.
const MANAGED_HEADERS: [&str; 3] = ["Host", "Content-Length", "Connection"];

/// A single HTTP request, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl Request {
    /// Builds a request from the client default headers and an optional body.
    ///
    /// Body-bearing methods get `Content-Type: application/json` unless the defaults already
    /// carry a `Content-Type`.
    pub fn new(method: Method, url: Url, defaults: &Headers, body: Option<Vec<u8>>) -> Self {
        let mut extra = Headers::new();
        let bears_body = method == Method::POST || method == Method::PUT || body.is_some();
        if bears_body && !defaults.contains("Content-Type") {
            extra.insert_unchecked("Content-Type", JSON_CONTENT_TYPE);
        }
        let body = match (bears_body, body) {
            (true, None) => Some(Vec::new()),
            (_, body) => body,
        };
        Self {
            method,
            url,
            headers: defaults.merged(&extra),
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Serializes the request as HTTP/1.1: request line, `Host`, caller headers in order,
    /// `Content-Length` when a body is present, `Connection: close`, blank line, body.
    pub fn encode(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\n",
            self.method.as_str(),
            request_target(&self.url),
            host_header(&self.url)
        );
        for (name, value) in self.headers.iter() {
            if MANAGED_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)) {
                continue;
            }
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        if let Some(body) = &self.body {
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        head.push_str("Connection: close\r\n\r\n");

        let mut bytes = head.into_bytes();
        if let Some(body) = &self.body {
            bytes.extend_from_slice(body);
        }
        bytes
    }
}

/// Resolves a request path against an optional base URL.
///
/// An absolute URL (scheme and host) is used unchanged. Otherwise the path is appended to the
/// base URL with exactly one separating slash.
///
/// # Errors
///
/// This function will return an error if no base URL is set for a relative path, or if the
/// result is not a well-formed `http`/`https` URL.
pub fn resolve_url(base_url: Option<&Url>, path: &str) -> HttpClientResult<Url> {
    if let Ok(url) = Url::parse(path) {
        if url.has_host() {
            return check_scheme(url, path);
        }
    }

    let base = base_url.ok_or_else(|| HttpClientError::InvalidUrl {
        url: path.to_string(),
        reason: "relative path without base url".to_string(),
    })?;
    check_joinable(base)?;
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let url = Url::parse(&joined).map_err(|e| HttpClientError::InvalidUrl {
        url: joined.clone(),
        reason: e.to_string(),
    })?;
    check_scheme(url, &joined)
}

/// Paths are appended to the base URL text, so it cannot carry a query or a fragment.
pub(crate) fn check_joinable(base: &Url) -> HttpClientResult<()> {
    if base.query().is_some() || base.fragment().is_some() {
        return Err(HttpClientError::InvalidUrl {
            url: base.to_string(),
            reason: "base url must not have a query or fragment".to_string(),
        });
    }
    Ok(())
}

fn check_scheme(url: Url, raw: &str) -> HttpClientResult<Url> {
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(HttpClientError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme `{scheme}`"),
        }),
    }
}

// origin-form: absolute path plus query, never the fragment
fn request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
