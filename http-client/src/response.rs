//! HTTP/1.x response: status, headers and decoded body, plus the blocking reader that parses
//! them off a connection.

use std::borrow::Cow;
use std::io::{BufRead, BufReader, Read};

use http::{HeaderName, StatusCode};
use tracing::trace;

use crate::compression::Decoder;
use crate::error::{HttpClientResult, ProtocolError};
use crate::headers::Headers;

const MAX_HEAD_SIZE: usize = 64 * 1024;
const MAX_HEADERS: usize = 100;
const MAX_INTERIM_RESPONSES: usize = 8;

/// A complete HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Vec<u8>,
}

impl Response {
    /// Construct a response from its parts.
    pub fn new(status: u16, headers: Headers, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The numeric status code, always within 100-599 for parsed responses.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The canonical reason phrase of the status code, if it has one.
    pub fn reason(&self) -> Option<&'static str> {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The entity bytes, after content decoding.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Reads a full response from `reader`: status line, headers up to the empty line and the
    /// body, delimited by `Content-Length` or by the end of the stream.
    ///
    /// Interim 1xx responses (other than 101) are skipped, up to `MAX_INTERIM_RESPONSES`.
    pub(crate) fn read_from<R: Read>(reader: R) -> HttpClientResult<Self> {
        let mut reader = BufReader::new(reader);

        let mut interim = 0;
        let (status, headers) = loop {
            let (status, headers) = read_head(&mut reader)?;
            if (100..200).contains(&status) && status != 101 {
                interim += 1;
                if interim > MAX_INTERIM_RESPONSES {
                    return Err(ProtocolError::TooManyInterimResponses.into());
                }
                trace!(status, "skipping interim response");
                continue;
            }
            break (status, headers);
        };

        let body = if has_body(status) {
            read_body(&mut reader, &headers)?
        } else {
            Vec::new()
        };

        let body = match headers.get("Content-Encoding") {
            Some(encoding) => Decoder::try_from(encoding)?.decode(body)?,
            None => body,
        };

        Ok(Self::new(status, headers, body))
    }
}

fn has_body(status: u16) -> bool {
    !((100..200).contains(&status) || status == 204 || status == 304)
}

fn read_head<R: BufRead>(reader: &mut R) -> HttpClientResult<(u16, Headers)> {
    let mut consumed = 0;

    let line = read_line(reader, &mut consumed)?;
    let status = parse_status_line(&line)?;

    let mut headers = Headers::new();
    loop {
        let line = read_line(reader, &mut consumed)?;
        if line.is_empty() {
            break;
        }
        if headers.len() == MAX_HEADERS {
            return Err(ProtocolError::HeadersTooLarge.into());
        }
        let (name, value) = parse_header_line(&line)?;
        headers.append(name, &value);
    }

    trace!(status, headers = headers.len(), "response head received");
    Ok((status, headers))
}

// Reads one line without its terminator (CRLF or bare LF). Lines are raw bytes: reason phrases
// and header values may carry obs-text.
fn read_line<R: BufRead>(reader: &mut R, consumed: &mut usize) -> HttpClientResult<Vec<u8>> {
    let mut line = Vec::new();
    let limit = (MAX_HEAD_SIZE - *consumed) as u64 + 1;
    let n = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;
    *consumed += n;
    if *consumed > MAX_HEAD_SIZE {
        return Err(ProtocolError::HeadersTooLarge.into());
    }
    if line.last() != Some(&b'\n') {
        return Err(ProtocolError::UnexpectedEof {
            expected: 0,
            received: *consumed,
        }
        .into());
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(line)
}

// HTTP/1.1 200 OK or HTTP/1.1 200; the reason phrase is not inspected
fn parse_status_line(line: &[u8]) -> Result<u16, ProtocolError> {
    let malformed = || ProtocolError::MalformedStatusLine(String::from_utf8_lossy(line).into_owned());

    let mut parts = line.splitn(3, |b| *b == b' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with(b"HTTP/1.") {
        return Err(malformed());
    }
    let code = parts.next().unwrap_or_default();
    if code.len() != 3 || !code.iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }
    let status = code
        .iter()
        .fold(0u16, |acc, digit| acc * 10 + u16::from(digit - b'0'));
    if !(100..600).contains(&status) {
        return Err(ProtocolError::InvalidStatusCode(status));
    }
    Ok(status)
}

// The name must be a token; the value keeps obs-text, decoded lossily.
fn parse_header_line(line: &[u8]) -> Result<(&str, String), ProtocolError> {
    let malformed = || ProtocolError::MalformedHeader(String::from_utf8_lossy(line).into_owned());

    let colon = line.iter().position(|b| *b == b':').ok_or_else(malformed)?;
    let (name, value) = (&line[..colon], &line[colon + 1..]);
    if HeaderName::from_bytes(name).is_err() {
        return Err(malformed());
    }
    let name = std::str::from_utf8(name).map_err(|_| malformed())?;
    let value = String::from_utf8_lossy(value.trim_ascii()).into_owned();
    Ok((name, value))
}

fn read_body<R: BufRead>(reader: &mut R, headers: &Headers) -> HttpClientResult<Vec<u8>> {
    if let Some(coding) = headers.get("Transfer-Encoding") {
        if !coding.trim().eq_ignore_ascii_case("identity") {
            return Err(ProtocolError::UnsupportedTransferEncoding(coding.to_string()).into());
        }
    }

    let mut body = Vec::new();
    match content_length(headers)? {
        Some(expected) => {
            let received = reader.by_ref().take(expected as u64).read_to_end(&mut body)?;
            if received < expected {
                return Err(ProtocolError::UnexpectedEof { expected, received }.into());
            }
        }
        None => {
            reader.read_to_end(&mut body)?;
        }
    }
    Ok(body)
}

// Repeated fields and comma-separated lists are accepted only when every value agrees.
fn content_length(headers: &Headers) -> Result<Option<usize>, ProtocolError> {
    let mut length = None;
    for value in headers.get_all("Content-Length") {
        for item in value.split(',') {
            let parsed = item
                .trim()
                .parse::<usize>()
                .map_err(|_| ProtocolError::InvalidContentLength(value.to_string()))?;
            match length {
                Some(previous) if previous != parsed => {
                    return Err(ProtocolError::InvalidContentLength(value.to_string()));
                }
                _ => length = Some(parsed),
            }
        }
    }
    Ok(length)
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use super::*;
    use crate::compression::test::gzip;
    use crate::error::HttpClientError;

    fn parse(raw: &[u8]) -> HttpClientResult<Response> {
        Response::read_from(raw)
    }

    #[test]
    fn content_length_body() {
        let response = parse(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 20\r\n\r\n{\"status\":\"success\"}",
        )
        .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.reason(), Some("OK"));
        assert_eq!(response.headers().get("content-type"), Some("application/json"));
        assert_eq!(response.body(), br#"{"status":"success"}"#);
    }

    #[test]
    fn extra_bytes_after_content_length_are_ignored() {
        let response = parse(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nokEXTRA").unwrap();
        assert_eq!(response.body(), b"ok");
    }

    #[test]
    fn body_until_close_without_content_length() {
        let response = parse(b"HTTP/1.0 404 Not Found\r\n\r\nno such user").unwrap();
        assert_eq!(response.status(), 404);
        assert!(!response.is_success());
        assert_eq!(response.text(), "no such user");
    }

    #[test]
    fn bare_lf_line_endings_are_accepted() {
        let response = parse(b"HTTP/1.1 201 Created\nContent-Length: 2\n\nok").unwrap();
        assert_eq!(response.status(), 201);
        assert_eq!(response.body(), b"ok");
    }

    #[test]
    fn no_content_has_no_body() {
        let response = parse(b"HTTP/1.1 204 No Content\r\n\r\nleftover").unwrap();
        assert_eq!(response.status(), 204);
        assert!(response.body().is_empty());
    }

    #[test]
    fn interim_response_is_skipped() {
        let response =
            parse(b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\ndone")
                .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), b"done");
    }

    #[test]
    fn endless_interim_responses_are_rejected() {
        let raw = b"HTTP/1.1 100 Continue\r\n\r\n".repeat(MAX_INTERIM_RESPONSES + 1);
        assert_matches!(
            parse(&raw),
            Err(HttpClientError::Protocol(ProtocolError::TooManyInterimResponses))
        );
    }

    #[test]
    fn latin1_reason_phrase_is_accepted() {
        let response = parse(b"HTTP/1.1 200 Tr\xe8s bien\r\nContent-Length: 2\r\n\r\nok").unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), b"ok");
    }

    #[test]
    fn latin1_header_value_is_decoded_lossily() {
        let response =
            parse(b"HTTP/1.1 200 OK\r\nX-Name: caf\xe9\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert_eq!(response.headers().get("x-name"), Some("caf\u{fffd}"));
    }

    #[test]
    fn non_token_header_name_is_malformed() {
        assert_matches!(
            parse(b"HTTP/1.1 200 OK\r\nX-Caf\xe9: 1\r\n\r\n"),
            Err(HttpClientError::Protocol(ProtocolError::MalformedHeader(_)))
        );
    }

    #[test]
    fn repeated_matching_content_length_is_accepted() {
        let response =
            parse(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nContent-Length: 2, 2\r\n\r\nok")
                .unwrap();
        assert_eq!(response.body(), b"ok");
    }

    #[test]
    fn conflicting_content_length_is_rejected() {
        assert_matches!(
            parse(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nContent-Length: 4\r\n\r\nokok"),
            Err(HttpClientError::Protocol(ProtocolError::InvalidContentLength(_)))
        );
        assert_matches!(
            parse(b"HTTP/1.1 200 OK\r\nContent-Length: 2, 3\r\n\r\nokk"),
            Err(HttpClientError::Protocol(ProtocolError::InvalidContentLength(_)))
        );
    }

    #[test]
    fn repeated_headers_are_kept() {
        let response =
            parse(b"HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\nContent-Length: 0\r\n\r\n")
                .unwrap();
        let cookies: Vec<_> = response
            .headers()
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
            .map(|(_, v)| v)
            .collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[test]
    fn gzip_body_is_decoded() {
        let encoded = gzip(b"compressed hello");
        let mut raw = format!(
            "HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\n\r\n",
            encoded.len()
        )
        .into_bytes();
        raw.extend_from_slice(&encoded);

        let response = parse(&raw).unwrap();
        assert_eq!(response.body(), b"compressed hello");
    }

    #[test]
    fn truncated_body_is_unexpected_eof() {
        assert_matches!(
            parse(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort"),
            Err(HttpClientError::Protocol(ProtocolError::UnexpectedEof {
                expected: 10,
                received: 5
            }))
        );
    }

    #[test]
    fn truncated_head_is_unexpected_eof() {
        assert_matches!(
            parse(b"HTTP/1.1 200 OK\r\nContent-Le"),
            Err(HttpClientError::Protocol(ProtocolError::UnexpectedEof { .. }))
        );
        assert_matches!(
            parse(b""),
            Err(HttpClientError::Protocol(ProtocolError::UnexpectedEof { .. }))
        );
    }

    #[test]
    fn malformed_status_lines() {
        for raw in [
            &b"garbage\r\n\r\n"[..],
            b"HTTP/2 200 OK\r\n\r\n",
            b"HTTP/1.1 OK\r\n\r\n",
            b"HTTP/1.1 2000 OK\r\n\r\n",
        ] {
            assert_matches!(
                parse(raw),
                Err(HttpClientError::Protocol(ProtocolError::MalformedStatusLine(_)))
            );
        }
        assert_matches!(
            parse(b"HTTP/1.1 700 Weird\r\n\r\n"),
            Err(HttpClientError::Protocol(ProtocolError::InvalidStatusCode(700)))
        );
    }

    #[test]
    fn malformed_header_line() {
        assert_matches!(
            parse(b"HTTP/1.1 200 OK\r\nno colon here\r\n\r\n"),
            Err(HttpClientError::Protocol(ProtocolError::MalformedHeader(_)))
        );
        assert_matches!(
            parse(b"HTTP/1.1 200 OK\r\nBad Name: x\r\n\r\n"),
            Err(HttpClientError::Protocol(ProtocolError::MalformedHeader(_)))
        );
    }

    #[test]
    fn chunked_transfer_is_rejected() {
        assert_matches!(
            parse(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n0\r\n\r\n"),
            Err(HttpClientError::Protocol(ProtocolError::UnsupportedTransferEncoding(_)))
        );
    }

    #[test]
    fn invalid_content_length() {
        assert_matches!(
            parse(b"HTTP/1.1 200 OK\r\nContent-Length: ten\r\n\r\n"),
            Err(HttpClientError::Protocol(ProtocolError::InvalidContentLength(_)))
        );
    }

    #[test]
    fn oversized_head_is_rejected() {
        let mut raw = b"HTTP/1.1 200 OK\r\n".to_vec();
        let filler = format!("X-Filler: {}\r\n", "a".repeat(1024));
        for _ in 0..70 {
            raw.extend_from_slice(filler.as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        assert_matches!(
            parse(&raw),
            Err(HttpClientError::Protocol(ProtocolError::HeadersTooLarge))
        );
    }
}
