//! In-process HTTP fixture serving canned byte responses.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Serves each canned response to one connection, in order, then stops accepting.
///
/// Every received request (head and body) is recorded. Dropping the fixture interrupts any
/// pending delay and joins the server thread.
pub struct FixtureServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FixtureServer {
    pub fn start(responses: Vec<Vec<u8>>) -> Self {
        Self::with_delay(responses, Duration::ZERO)
    }

    /// Waits `delay` after reading each request before answering it.
    pub fn with_delay(responses: Vec<Vec<u8>>, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let (stop, stopped) = bounded::<()>(1);

        let handle = thread::spawn({
            let requests = requests.clone();
            move || serve(listener, responses, delay, requests, stopped)
        });

        FixtureServer {
            addr,
            requests,
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        // disconnects the stop channel, then wakes up a blocked accept
        drop(self.stop.take());
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(
    listener: TcpListener,
    responses: Vec<Vec<u8>>,
    delay: Duration,
    requests: Arc<Mutex<Vec<String>>>,
    stopped: Receiver<()>,
) {
    for response in responses {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        if let Err(TryRecvError::Disconnected) = stopped.try_recv() {
            return;
        }

        let request = read_request(&stream);
        requests.lock().unwrap().push(request);

        match stopped.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => return,
        }

        let _ = stream.write_all(&response);
        let _ = stream.flush();
        let _ = stream.shutdown(Shutdown::Write);
    }
}

fn read_request(stream: &TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut request = String::new();
    let mut content_length = 0;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return request;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
        request.push_str(&line);
        if line == "\r\n" {
            break;
        }
    }

    let mut body = vec![0; content_length];
    if reader.read_exact(&mut body).is_ok() {
        request.push_str(&String::from_utf8_lossy(&body));
    }
    request
}

/// Builds a response with a `Content-Length` matching `body`.
pub fn response(status_line: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut raw = format!("{status_line}\r\nContent-Length: {}\r\n", body.len());
    for (name, value) in headers {
        raw.push_str(&format!("{name}: {value}\r\n"));
    }
    raw.push_str("Connection: close\r\n\r\n");
    let mut raw = raw.into_bytes();
    raw.extend_from_slice(body);
    raw
}

pub fn ok_json(body: &str) -> Vec<u8> {
    response(
        "HTTP/1.1 200 OK",
        &[("Content-Type", "application/json")],
        body.as_bytes(),
    )
}
