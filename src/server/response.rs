//! Response accumulation and HTTP/1.1 framing.
//!
//! A [`Response`] is a passive bag of status, headers and body. The framing
//! into a send buffer happens when the session consumes it: `respond` emits
//! a full message, `respond_chunk`/`respond_chunk_end` emit chunked pieces.

use std::io::Write;

use crate::buffer::Buffer;

/// A response under construction.
///
/// Headers are emitted on the wire in insertion order. The body is owned by
/// the builder until the response is handed to `respond`, which copies it
/// into the send buffer.
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Response {
        Response {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Set the status code. Values outside 100..=599 map to 500.
    pub fn status(&mut self, status: u16) {
        self.status = if (100..=599).contains(&status) {
            status
        } else {
            500
        };
    }

    /// Append a header. `Date`, `Connection`, `Content-Length` and
    /// `Transfer-Encoding` are emitted by the engine; setting them here
    /// duplicates them on the wire.
    pub fn header(&mut self, key: &str, value: &str) {
        self.headers.push((key.to_string(), value.to_string()));
    }

    /// Set the response body (or the next chunk, for chunked responses).
    pub fn body<B: Into<Vec<u8>>>(&mut self, body: B) {
        self.body = body.into();
    }

    pub(crate) fn status_code(&self) -> u16 {
        self.status
    }

    pub(crate) fn body_bytes(&self) -> &[u8] {
        &self.body
    }
}

impl Default for Response {
    fn default() -> Response {
        Response::new()
    }
}

/// Reason phrase for the standard status codes; empty otherwise.
pub(crate) fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

/// Emit the status line and header block. For chunked responses the
/// `Transfer-Encoding` header replaces `Content-Length`.
pub(crate) fn render_head(
    response: &Response,
    out: &mut Buffer,
    date: &str,
    keep_alive: bool,
    chunked: bool,
) {
    let _ = write!(
        out,
        "HTTP/1.1 {} {}\r\nDate: {}\r\n",
        response.status,
        reason_phrase(response.status),
        date
    );
    for (key, value) in &response.headers {
        let _ = write!(out, "{}: {}\r\n", key, value);
    }
    let _ = write!(
        out,
        "Connection: {}\r\n",
        if keep_alive { "keep-alive" } else { "close" }
    );
    if chunked {
        out.extend(b"Transfer-Encoding: chunked\r\n");
    } else {
        let _ = write!(out, "Content-Length: {}\r\n", response.body.len());
    }
    out.extend(b"\r\n");
}

/// Emit the headers of the final chunked response as trailers, then the
/// terminating blank line.
pub(crate) fn render_trailers(response: &Response, out: &mut Buffer) {
    for (key, value) in &response.headers {
        let _ = write!(out, "{}: {}\r\n", key, value);
    }
    out.extend(b"\r\n");
}

#[cfg(test)]
mod test {
    use super::{reason_phrase, render_head, render_trailers, Response};
    use crate::buffer::{Buffer, MemCounter};

    const DATE: &str = "Thu Jan  1 00:00:00 1970";

    #[test]
    fn head_framing() {
        let mut response = Response::new();
        response.status(200);
        response.header("Content-Type", "text/plain");
        response.body("hi");
        let mut out = Buffer::with_capacity(64, MemCounter::new());
        render_head(&response, &mut out, DATE, true, false);
        let expected = format!(
            "HTTP/1.1 200 OK\r\nDate: {}\r\nContent-Type: text/plain\r\n\
             Connection: keep-alive\r\nContent-Length: 2\r\n\r\n",
            DATE
        );
        assert_eq!(out.bytes(), expected.as_bytes());
    }

    #[test]
    fn chunked_head_has_no_content_length() {
        let mut response = Response::new();
        response.status(200);
        let mut out = Buffer::with_capacity(64, MemCounter::new());
        render_head(&response, &mut out, DATE, false, true);
        let text = String::from_utf8(out.bytes().to_vec()).unwrap();
        assert!(text.contains("Transfer-Encoding: chunked\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(!text.contains("Content-Length"));
    }

    #[test]
    fn trailers() {
        let mut response = Response::new();
        response.header("X-Checksum", "abc");
        let mut out = Buffer::with_capacity(64, MemCounter::new());
        render_trailers(&response, &mut out);
        assert_eq!(out.bytes(), b"X-Checksum: abc\r\n\r\n");
    }

    #[test]
    fn status_is_clamped() {
        let mut response = Response::new();
        response.status(99);
        assert_eq!(response.status_code(), 500);
        response.status(600);
        assert_eq!(response.status_code(), 500);
        response.status(204);
        assert_eq!(response.status_code(), 204);
    }

    #[test]
    fn reason_table() {
        assert_eq!(reason_phrase(200), "OK");
        assert_eq!(reason_phrase(404), "Not Found");
        assert_eq!(reason_phrase(412), "Precondition Failed");
        assert_eq!(reason_phrase(504), "Gateway Timeout");
        assert_eq!(reason_phrase(306), "");
        assert_eq!(reason_phrase(599), "");
    }
}
