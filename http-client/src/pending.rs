//! Background execution of a single request.

use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

use crossbeam::channel::{bounded, Receiver};
use tracing::{debug, trace};

use crate::error::{HttpClientError, HttpClientResult, TransportError};
use crate::request::Request;
use crate::response::Response;
use crate::transport::{AbortHandle, Transport};

const REQUEST_THREAD_NAME: &str = "http-client-request";

/// A request running on its own thread.
///
/// The result is delivered once on a bounded channel. [`PendingRequest::wait`] always joins the
/// thread; [`PendingRequest::cancel`] joins it only when its connection could be shut down.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    receiver: Receiver<HttpClientResult<Response>>,
    handle: JoinHandle<()>,
    abort: AbortHandle,
}

impl PendingRequest {
    /// Spawns a thread that sends `request` through `transport`.
    ///
    /// # Errors
    ///
    /// Fails if the operating system refuses to create the thread.
    pub(crate) fn spawn(
        transport: Arc<dyn Transport>,
        request: Request,
    ) -> HttpClientResult<Self> {
        let (sender, receiver) = bounded(1);
        let abort = AbortHandle::new();

        let handle = Builder::new()
            .name(REQUEST_THREAD_NAME.to_string())
            .spawn({
                let abort = abort.clone();
                move || {
                    trace!(
                        method = %request.method(),
                        url = %request.url(),
                        "request thread started"
                    );
                    let result = transport.send(&request, &abort);
                    // the receiving side is gone when the request was cancelled
                    let _ = sender.send(result);
                    trace!("request thread finished");
                }
            })
            .map_err(TransportError::Io)?;

        Ok(PendingRequest {
            receiver,
            handle,
            abort,
        })
    }

    /// Blocks until the request completes and returns its result.
    pub(crate) fn wait(self) -> HttpClientResult<Response> {
        let result = self
            .receiver
            .recv()
            .map_err(|_| HttpClientError::WorkerPanicked);
        self.handle
            .join()
            .map_err(|_| HttpClientError::WorkerPanicked)?;
        result?
    }

    /// Aborts the request. The result, if any, is discarded.
    ///
    /// Once the connection is registered, shutting it down unblocks the thread and it is joined.
    /// Before that the thread may be resolving or connecting; it is detached and gives up with
    /// [`HttpClientError::Cancelled`] as soon as it tries to register its connection.
    pub(crate) fn cancel(self) -> HttpClientResult<()> {
        self.abort.abort();
        if !self.abort.is_connected() && !self.handle.is_finished() {
            debug!("pending request aborted before connecting, detaching request thread");
            return Ok(());
        }
        debug!("pending request aborted, joining request thread");
        self.handle
            .join()
            .map_err(|_| HttpClientError::WorkerPanicked)
    }
}
