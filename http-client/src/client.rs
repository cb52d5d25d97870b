//! The [`HttpClient`]: default headers, blocking and asynchronous verbs, last response.

use std::borrow::Cow;
use std::fmt;
use std::mem;
use std::sync::Arc;

use http::Method;
use tracing::{debug, warn};
use url::Url;

use crate::config::HttpConfig;
use crate::error::{HttpClientError, HttpClientResult};
use crate::headers::Headers;
use crate::pending::PendingRequest;
use crate::request::{resolve_url, Request};
use crate::response::Response;
use crate::transport::{AbortHandle, TcpTransport, Transport};

// At most one request in flight per client.
#[derive(Debug, Default)]
enum RequestSlot {
    #[default]
    Idle,
    Pending(PendingRequest),
}

/// An HTTP/1.1 client with a base URL, default headers and the last response received.
///
/// Every request opens a new connection. Blocking verbs (`get`, `post`, ...) return once the
/// whole response has been read; the `*_async` variants return as soon as the request has been
/// handed to a background thread, and [`HttpClient::wait`] collects the result.
///
/// ```no_run
/// use http_client::HttpClient;
///
/// let mut client = HttpClient::new(
///     Some("http://127.0.0.1:8080"),
///     [("Accept", "application/json")],
/// )?;
///
/// let response = client.get("/test")?;
/// println!("{} {}", response.status(), response.text());
///
/// client.get_async("/test")?;
/// // ... other work ...
/// let response = client.wait()?;
/// assert_eq!(client.status_code()?, response.status());
/// # Ok::<(), http_client::HttpClientError>(())
/// ```
pub struct HttpClient {
    base_url: Option<Url>,
    headers: Headers,
    transport: Arc<dyn Transport>,
    last_response: Option<Response>,
    slot: RequestSlot,
}

impl HttpClient {
    /// Creates a client with an optional base URL and a set of default headers.
    ///
    /// # Errors
    ///
    /// This function will return an error if the base URL is not a valid `http`/`https` URL, or
    /// if a header name or value is not valid.
    pub fn new<I, K, V>(base_url: Option<&str>, headers: I) -> HttpClientResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let config = match base_url {
            Some(url) => HttpConfig::new().with_base_url(url)?,
            None => HttpConfig::new(),
        };
        Ok(Self::with_config(config.with_headers(headers)?))
    }

    /// Creates a client from a full configuration, using the TCP transport.
    pub fn with_config(config: HttpConfig) -> Self {
        let transport = Arc::new(TcpTransport::from(&config));
        Self::with_transport(config, transport)
    }

    /// Creates a client that delivers its requests through `transport`.
    pub fn with_transport(config: HttpConfig, transport: Arc<dyn Transport>) -> Self {
        HttpClient {
            base_url: config.base_url,
            headers: config.headers,
            transport,
            last_response: None,
            slot: RequestSlot::Idle,
        }
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Sets a default header sent with every request, replacing any value with the same name.
    ///
    /// # Errors
    ///
    /// This function will return an error if the name or the value is not valid.
    pub fn set_header(&mut self, name: &str, value: &str) -> HttpClientResult<()> {
        self.headers.insert(name, value)
    }

    /// Returns a copy of the default headers.
    pub fn headers(&self) -> Headers {
        self.headers.clone()
    }

    /// Removes a default header, returning its value.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }

    pub fn get(&mut self, path: &str) -> HttpClientResult<Response> {
        self.send(Method::GET, path, None)
    }

    pub fn post(&mut self, path: &str, body: impl Into<Vec<u8>>) -> HttpClientResult<Response> {
        self.send(Method::POST, path, Some(body.into()))
    }

    pub fn put(&mut self, path: &str, body: impl Into<Vec<u8>>) -> HttpClientResult<Response> {
        self.send(Method::PUT, path, Some(body.into()))
    }

    pub fn delete(&mut self, path: &str) -> HttpClientResult<Response> {
        self.send(Method::DELETE, path, None)
    }

    /// Sends a request and blocks until the whole response has been received.
    ///
    /// The response is stored as the last response of the client. A 4xx or 5xx status is a
    /// successful result.
    ///
    /// # Errors
    ///
    /// This function will return an error if the URL cannot be resolved, the request cannot be
    /// delivered or the response is not valid HTTP. The last response is left untouched, and
    /// [`HttpClientError::ConcurrentRequestConflict`] is returned while an asynchronous request
    /// is pending.
    pub fn send(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> HttpClientResult<Response> {
        let request = self.prepare(method, path, body)?;
        debug!(method = %request.method(), url = %request.url(), "sending request");
        let result = self.transport.send(&request, &AbortHandle::new());
        self.complete(result)
    }

    pub fn get_async(&mut self, path: &str) -> HttpClientResult<()> {
        self.dispatch(Method::GET, path, None)
    }

    pub fn post_async(&mut self, path: &str, body: impl Into<Vec<u8>>) -> HttpClientResult<()> {
        self.dispatch(Method::POST, path, Some(body.into()))
    }

    pub fn put_async(&mut self, path: &str, body: impl Into<Vec<u8>>) -> HttpClientResult<()> {
        self.dispatch(Method::PUT, path, Some(body.into()))
    }

    pub fn delete_async(&mut self, path: &str) -> HttpClientResult<()> {
        self.dispatch(Method::DELETE, path, None)
    }

    /// Starts a request on a background thread and returns without waiting for the response.
    ///
    /// # Errors
    ///
    /// URL and header errors are reported immediately. Fails with
    /// [`HttpClientError::ConcurrentRequestConflict`] if a request is already pending.
    pub fn send_async(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> HttpClientResult<()> {
        self.dispatch(method, path, body)
    }

    /// Blocks until the pending request completes, then stores and returns its response.
    ///
    /// The client is idle again afterwards, whether the request succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::NoPendingRequest`] if nothing is pending, or the error the
    /// request failed with; the last response is left untouched in that case.
    pub fn wait(&mut self) -> HttpClientResult<Response> {
        match mem::take(&mut self.slot) {
            RequestSlot::Idle => Err(HttpClientError::NoPendingRequest),
            RequestSlot::Pending(pending) => {
                debug!("waiting for pending request");
                let result = pending.wait();
                self.complete(result)
            }
        }
    }

    /// Aborts the pending request. The last response is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::NoPendingRequest`] if nothing is pending.
    pub fn cancel(&mut self) -> HttpClientResult<()> {
        match mem::take(&mut self.slot) {
            RequestSlot::Idle => Err(HttpClientError::NoPendingRequest),
            RequestSlot::Pending(pending) => {
                debug!("cancelling pending request");
                pending.cancel()
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.slot, RequestSlot::Pending(_))
    }

    /// Status code of the last response.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::NoResponseYet`] before any request has completed.
    pub fn status_code(&self) -> HttpClientResult<u16> {
        self.require_response().map(Response::status)
    }

    /// Body of the last response, after content decoding.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::NoResponseYet`] before any request has completed.
    pub fn response_body(&self) -> HttpClientResult<&[u8]> {
        self.require_response().map(Response::body)
    }

    /// Body of the last response as text; invalid UTF-8 is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::NoResponseYet`] before any request has completed.
    pub fn response_text(&self) -> HttpClientResult<Cow<'_, str>> {
        self.require_response().map(Response::text)
    }

    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    fn require_response(&self) -> HttpClientResult<&Response> {
        self.last_response
            .as_ref()
            .ok_or(HttpClientError::NoResponseYet)
    }

    fn prepare(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> HttpClientResult<Request> {
        if self.is_pending() {
            return Err(HttpClientError::ConcurrentRequestConflict);
        }
        let url = resolve_url(self.base_url.as_ref(), path)?;
        Ok(Request::new(method, url, &self.headers, body))
    }

    fn dispatch(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> HttpClientResult<()> {
        let request = self.prepare(method, path, body)?;
        debug!(method = %request.method(), url = %request.url(), "dispatching asynchronous request");
        self.slot = RequestSlot::Pending(PendingRequest::spawn(self.transport.clone(), request)?);
        Ok(())
    }

    fn complete(&mut self, result: HttpClientResult<Response>) -> HttpClientResult<Response> {
        match result {
            Ok(response) => {
                debug!(
                    status = response.status(),
                    bytes = response.body().len(),
                    "response received"
                );
                self.last_response = Some(response.clone());
                Ok(response)
            }
            Err(err) => {
                warn!(error = %err, "request failed");
                Err(err)
            }
        }
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("headers", &self.headers)
            .field("last_response", &self.last_response)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        if let RequestSlot::Pending(pending) = mem::take(&mut self.slot) {
            debug!("client dropped with a pending request, cancelling it");
            let _ = pending
                .cancel()
                .map_err(|err| warn!(error = %err, "error while cancelling pending request"));
        }
    }
}
