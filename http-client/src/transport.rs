//! # Transport Module
//!
//! Moves a [`Request`] over a fresh TCP (or TLS over TCP) connection and reads back the
//! [`Response`]. One connection is opened per request and closed once the response is read.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use rustls::crypto::ring;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::{HttpClientError, HttpClientResult, TransportError};
use crate::request::Request;
use crate::response::Response;

/// A synchronous trait that defines how a request is delivered and its response obtained.
pub trait Transport: Send + Sync {
    /// Sends the request and blocks until the complete response has been read.
    ///
    /// Implementations must give up with [`HttpClientError::Cancelled`] once `abort` fires.
    fn send(&self, request: &Request, abort: &AbortHandle) -> HttpClientResult<Response>;
}

/// Shared cancellation flag for an in-flight request.
///
/// The transport registers the socket it is using; [`AbortHandle::abort`] shuts that socket
/// down so a blocked read returns immediately.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    inner: Arc<AbortState>,
}

#[derive(Debug, Default)]
struct AbortState {
    aborted: AtomicBool,
    stream: Mutex<Option<TcpStream>>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the request as aborted and shuts down its connection, if one is open.
    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        let stream = self
            .inner
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(stream) = stream.as_ref() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Returns true once the transport has registered its connection.
    pub fn is_connected(&self) -> bool {
        self.inner
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Registers the connection used by the request so `abort` can reach it.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::Cancelled`] if the request was aborted before the connection
    /// was registered; the connection is shut down in that case.
    pub fn register(&self, stream: &TcpStream) -> HttpClientResult<()> {
        let handle = stream.try_clone()?;
        let mut registered = self
            .inner
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_aborted() {
            let _ = handle.shutdown(Shutdown::Both);
            return Err(HttpClientError::Cancelled);
        }
        *registered = Some(handle);
        Ok(())
    }
}

/// An implementation of the `Transport` trait over `std::net::TcpStream`, with TLS provided by
/// rustls for `https` URLs.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TcpTransport {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            read_timeout,
        }
    }

    fn connect(&self, request: &Request) -> HttpClientResult<TcpStream> {
        let url = request.url();
        let host = url.host_str().unwrap_or_default();
        let addrs = url
            .socket_addrs(|| None)
            .map_err(|source| TransportError::Dns {
                host: host.to_string(),
                source,
            })?;

        let mut last_err = None;
        for addr in addrs {
            let attempt = if self.connect_timeout.is_zero() {
                TcpStream::connect(addr)
            } else {
                TcpStream::connect_timeout(&addr, self.connect_timeout)
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    debug!(%addr, error = %err, "connection attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(match last_err {
            Some(err) => TransportError::from(err).into(),
            None => TransportError::NoAddress(host.to_string()).into(),
        })
    }
}

impl From<&HttpConfig> for TcpTransport {
    fn from(value: &HttpConfig) -> Self {
        TcpTransport::new(value.connect_timeout, value.read_timeout)
    }
}

impl Transport for TcpTransport {
    fn send(&self, request: &Request, abort: &AbortHandle) -> HttpClientResult<Response> {
        if abort.is_aborted() {
            return Err(HttpClientError::Cancelled);
        }

        let stream = self.connect(request)?;
        abort.register(&stream)?;

        let timeout = Some(self.read_timeout).filter(|t| !t.is_zero());
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        stream.set_nodelay(true)?;

        let result = match request.url().scheme() {
            "https" => {
                let host = request.url().host_str().unwrap_or_default();
                exchange(tls_stream(host, stream)?, request)
            }
            _ => exchange(stream, request),
        };

        // a shut down socket can look like a short read-until-close body
        if abort.is_aborted() {
            return Err(HttpClientError::Cancelled);
        }
        result
    }
}

fn exchange<S: Read + Write>(mut stream: S, request: &Request) -> HttpClientResult<Response> {
    stream.write_all(&request.encode())?;
    stream.flush()?;
    Response::read_from(stream)
}

fn tls_stream(
    host: &str,
    tcp: TcpStream,
) -> HttpClientResult<StreamOwned<ClientConnection, TcpStream>> {
    let server_name = ServerName::try_from(host.trim_matches(['[', ']']).to_string())
        .map_err(|e| TransportError::Tls(e.to_string()))?;
    let connection = ClientConnection::new(tls_client_config()?, server_name)
        .map_err(|e| TransportError::Tls(e.to_string()))?;
    Ok(StreamOwned::new(connection, tcp))
}

/// TLS client config: ring provider, Mozilla root certificates, no client auth, HTTP/1.1 ALPN.
fn tls_client_config() -> HttpClientResult<Arc<ClientConfig>> {
    static TLS_CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();
    if let Some(config) = TLS_CONFIG.get() {
        return Ok(config.clone());
    }

    let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let mut config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TLS_CONFIG.get_or_init(|| Arc::new(config)).clone())
}
