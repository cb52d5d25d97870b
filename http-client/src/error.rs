//! This module defines the error and result types returned by the HTTP client.

use std::io;

use http::header::{InvalidHeaderName, InvalidHeaderValue};
use thiserror::Error;

/// Represents the errors that can occur while configuring the client or performing a request.
///
/// A response carrying a 4xx/5xx status is not an error: it is returned as a regular
/// [`Response`](crate::Response).
#[derive(Error, Debug)]
pub enum HttpClientError {
    /// The base URL, the request path or their combination is not a well-formed URL.
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl {
        /// The offending URL or path.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
    /// HTTP client with an invalid header name.
    #[error("`{0}`")]
    InvalidHeaderName(#[from] InvalidHeaderName),
    /// HTTP client with an invalid header value.
    #[error("`{0}`")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),
    /// The request could not be delivered or the response could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The server answered with something that is not valid HTTP/1.x.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// Status or body accessed before any request completed on this client.
    #[error("no response has been received yet")]
    NoResponseYet,
    /// `wait` or `cancel` called without an outstanding asynchronous request.
    #[error("there is no pending request")]
    NoPendingRequest,
    /// A request was issued while an asynchronous request is still pending.
    #[error("an asynchronous request is already pending on this client")]
    ConcurrentRequestConflict,
    /// The pending request was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,
    /// The background request thread panicked.
    #[error("error while joining the request thread")]
    WorkerPanicked,
}

/// Errors raised while connecting to the server or moving bytes over the connection.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The host name could not be resolved.
    #[error("could not resolve host `{host}`: {source}")]
    Dns {
        /// Host that failed to resolve.
        host: String,
        /// Resolver error.
        source: io::Error,
    },
    /// The resolver returned no addresses for the host.
    #[error("no addresses found for host `{0}`")]
    NoAddress(String),
    /// The server refused the connection.
    #[error("connection refused by `{0}`")]
    ConnectionRefused(String),
    /// Connecting, reading or writing took longer than the configured timeout.
    #[error("operation timed out")]
    Timeout,
    /// The connection was reset or closed by the peer while writing.
    #[error("connection reset by peer")]
    ConnectionReset,
    /// The TLS handshake or session failed.
    #[error("tls error: {0}")]
    Tls(String),
    /// Any other I/O error.
    #[error("`{0}`")]
    Io(io::Error),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => TransportError::ConnectionReset,
            io::ErrorKind::ConnectionRefused => TransportError::ConnectionRefused(err.to_string()),
            _ => match err.get_ref().and_then(|e| e.downcast_ref::<rustls::Error>()) {
                Some(tls) => TransportError::Tls(tls.to_string()),
                None => TransportError::Io(err),
            },
        }
    }
}

impl From<io::Error> for HttpClientError {
    fn from(err: io::Error) -> Self {
        HttpClientError::Transport(err.into())
    }
}

/// Errors raised while parsing or decoding an HTTP/1.x response.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The first line of the response is not `HTTP/1.x <code> [reason]`.
    #[error("malformed status line: `{0}`")]
    MalformedStatusLine(String),
    /// The status code is outside of the 100-599 range.
    #[error("invalid status code: `{0}`")]
    InvalidStatusCode(u16),
    /// A header line has no `:` separator or contains invalid bytes.
    #[error("malformed header line: `{0}`")]
    MalformedHeader(String),
    /// The response head exceeded the size or header count limit.
    #[error("response head too large")]
    HeadersTooLarge,
    /// The connection closed before the head or the announced body was received.
    #[error("unexpected end of stream: expected {expected} bytes, received {received}")]
    UnexpectedEof {
        /// Bytes announced by `Content-Length` (0 while reading the head).
        expected: usize,
        /// Bytes actually received.
        received: usize,
    },
    /// The server kept sending interim 1xx responses.
    #[error("too many interim responses")]
    TooManyInterimResponses,
    /// `Content-Length` is not a valid number, or repeated values disagree.
    #[error("invalid content-length: `{0}`")]
    InvalidContentLength(String),
    /// The response uses a transfer coding this client does not implement.
    #[error("transfer encoding not supported: `{0}`")]
    UnsupportedTransferEncoding(String),
    /// The response uses a content coding this client cannot decode.
    #[error("content encoding not supported: `{0}`")]
    UnsupportedContentEncoding(String),
    /// The body could not be decoded with its declared content coding.
    #[error("could not decode body: {0}")]
    Decode(io::Error),
}

/// A type alias for results from HTTP client operations.
pub type HttpClientResult<T> = Result<T, HttpClientError>;
