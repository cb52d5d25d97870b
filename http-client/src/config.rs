//! # HTTP Client Configuration.

use std::time::Duration;

use url::Url;

use crate::error::{HttpClientError, HttpClientResult};
use crate::headers::Headers;
use crate::request::check_joinable;

/// Default client timeout is 30 seconds
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

const ACCEPTED_ENCODINGS: &str = "gzip, deflate";

/// A struct representing the configuration of an [`HttpClient`](crate::HttpClient).
///
/// # Examples
///
/// Creating a new `HttpConfig` with a base URL:
///
/// ```rust
/// use http_client::HttpConfig;
///
/// let config = HttpConfig::new().with_base_url("https://my-server.com").unwrap();
/// ```
///
/// Adding custom headers to the configuration:
///
/// ```rust
/// use http_client::HttpConfig;
///
/// let config = HttpConfig::new()
///     .with_headers(vec![("Authorization", "Bearer <token>")])
///     .unwrap();
/// ```
///
/// Setting a custom timeout in the configuration:
///
/// ```rust
/// use std::time::Duration;
/// use http_client::HttpConfig;
///
/// let config = HttpConfig::new().with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub(crate) base_url: Option<Url>,
    pub(crate) headers: Headers,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) compression: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let mut headers = Headers::new();
        headers.insert_unchecked("User-Agent", default_user_agent());
        Self {
            base_url: None,
            headers,
            connect_timeout: DEFAULT_CLIENT_TIMEOUT,
            read_timeout: DEFAULT_CLIENT_TIMEOUT,
            compression: false,
        }
    }
}

impl HttpConfig {
    /// Construct a new `HttpConfig` without base URL and with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL every relative request path is resolved against.
    ///
    /// The URL is kept verbatim; it must be a well-formed `http` or `https` URL without a query
    /// or fragment.
    ///
    /// # Errors
    ///
    /// This function will return an error if the provided URL is not valid.
    pub fn with_base_url(self, base_url: &str) -> HttpClientResult<Self> {
        let url = Url::parse(base_url).map_err(|e| HttpClientError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HttpClientError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme `{}`", url.scheme()),
            });
        }
        check_joinable(&url)?;
        Ok(Self {
            base_url: Some(url),
            ..self
        })
    }

    /// Optionally include custom headers into every request.
    ///
    /// Custom headers can be added using an input iterator that provides key-value pairs.
    ///
    /// If the key already exists in the current header list, the new value will overwrite the old one.
    ///
    /// # Errors
    ///
    /// This function will return an error if the provided key or value is not valid.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> HttpClientResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (ref key, ref val) in headers {
            self.headers.insert(key.as_ref(), val.as_ref())?;
        }
        Ok(self)
    }

    /// Replace the default `User-Agent` header.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value is not a valid header value.
    pub fn with_user_agent(mut self, user_agent: &str) -> HttpClientResult<Self> {
        self.headers.insert("User-Agent", user_agent)?;
        Ok(self)
    }

    /// Advertise gzip and deflate support with an `Accept-Encoding` header.
    ///
    /// Encoded responses are decoded whether or not this is enabled.
    pub fn with_compression(mut self, compression: bool) -> Self {
        if compression {
            self.headers
                .insert_unchecked("Accept-Encoding", ACCEPTED_ENCODINGS);
        } else {
            self.headers.remove("Accept-Encoding");
        }
        self.compression = compression;
        self
    }

    /// Define a custom timeout for both connecting and reading/writing.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            connect_timeout: timeout,
            read_timeout: timeout,
            ..self
        }
    }

    /// Define a custom connect timeout.
    pub fn with_connect_timeout(self, connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            ..self
        }
    }

    /// Define a custom timeout for every read and write on the connection.
    pub fn with_read_timeout(self, read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ..self
        }
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn compression(&self) -> bool {
        self.compression
    }
}

fn default_user_agent() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults() {
        let config = HttpConfig::new();

        assert!(config.base_url().is_none());
        assert_eq!(config.connect_timeout(), DEFAULT_CLIENT_TIMEOUT);
        assert_eq!(config.read_timeout(), DEFAULT_CLIENT_TIMEOUT);
        assert!(!config.compression());
        assert_eq!(config.headers().get("user-agent"), Some(default_user_agent()));
    }

    #[test]
    fn client_compression_headers() {
        let config = HttpConfig::new().with_compression(true);
        assert_eq!(config.headers().get("Accept-Encoding"), Some("gzip, deflate"));

        let config = config.with_compression(false);
        assert!(!config.headers().contains("Accept-Encoding"));
    }

    #[test]
    fn with_headers_overwrites() {
        let config = HttpConfig::new()
            .with_headers([("User-Agent", "Custom Agent"), ("Accept", "application/json")])
            .unwrap();

        let entries: Vec<_> = config.headers().iter().collect();
        assert_eq!(
            entries,
            vec![("User-Agent", "Custom Agent"), ("Accept", "application/json")]
        );
    }

    #[test]
    fn with_base_url_validates() {
        assert!(HttpConfig::new().with_base_url("http://127.0.0.1:8080").is_ok());
        assert_matches!(
            HttpConfig::new().with_base_url("not a url"),
            Err(HttpClientError::InvalidUrl { .. })
        );
        assert_matches!(
            HttpConfig::new().with_base_url("ftp://example.com"),
            Err(HttpClientError::InvalidUrl { .. })
        );
        assert_matches!(
            HttpConfig::new().with_base_url("http://h/api?k=1"),
            Err(HttpClientError::InvalidUrl { .. })
        );
        assert_matches!(
            HttpConfig::new().with_base_url("http://h/api#top"),
            Err(HttpClientError::InvalidUrl { .. })
        );
    }

    #[test]
    fn timeouts() {
        let config = HttpConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_read_timeout(Duration::from_millis(250));

        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.read_timeout(), Duration::from_millis(250));
    }
}
