//! Blocking and asynchronous HTTP/1.1 client library.
//!
//! An [`HttpClient`] keeps a base URL, a set of default headers and the last response it
//! received. Requests are sent either on the calling thread (`get`, `post`, `put`, `delete`) or
//! on a background thread (`get_async`, ...) whose result is collected with
//! [`HttpClient::wait`].

mod compression;
mod pending;

pub mod client;
pub use client::HttpClient;

pub mod config;
pub use config::HttpConfig;

pub mod error;
pub use error::{HttpClientError, HttpClientResult, ProtocolError, TransportError};

pub mod headers;
pub use headers::Headers;

pub mod request;
pub use request::{resolve_url, Request};

pub mod response;
pub use response::Response;

pub mod transport;
pub use transport::{AbortHandle, TcpTransport, Transport};
