//! Per-connection session state machine.
//!
//! One `Session` exists per accepted socket. Each reactor wake-up advances
//! the machine by one transition: drain the socket, run the tokenizer, call
//! the host's handler when a request is complete, push response bytes, and
//! either re-arm for keep-alive or close. All of it runs on the reactor
//! thread; the only suspension points are waiting for readiness events.

use std::any::Any;
use std::io::Write;

use mio::net::TcpStream;
use mio::{Interest, Token};

use crate::buffer::{Buffer, ReadOutcome, WriteOutcome};
use crate::headers;
use crate::reactor::SESSION_START;
use crate::server::error::ParseError;
use crate::server::parser::{Limits, Parsed, Parser, Token as HttpToken, TokenKind};
use crate::server::request::Request;
use crate::server::response::{render_head, render_trailers, Response};
use crate::server::Shared;

/// A request-chunk or chunk-written notification from the host. One-shot:
/// continuing a stream means installing the next callback from inside it.
pub(crate) type ChunkCallback = Box<dyn FnOnce(&mut Request<'_>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    /// Fresh request slot: reset parser state, check the memory cap.
    Init,
    ReadHeaders,
    ReadBody,
    Write,
    /// Waiting for more bytes of a request-body chunk.
    ReadChunk,
    /// Parked. Socket reads are ignored until the host asks for a chunk.
    Nop,
}

/// What the caller should do with the session after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Close,
}

pub(crate) struct Session {
    pub socket: TcpStream,
    pub slot: usize,
    /// Guards stale `ResponseHandle`s after this slot is reused.
    pub serial: u64,
    pub state: SessionState,
    pub buf: Buffer,
    /// Ordered token log for the request being parsed.
    pub tokens: Vec<HttpToken>,
    /// Most recently emitted token; the only one valid across compaction.
    pub current: Option<HttpToken>,
    pub parser: Parser,
    pub keep_alive: bool,
    /// Keep-alive is auto-detected unless the host forced a directive.
    pub automatic: bool,
    pub response_ready: bool,
    pub response_paused: bool,
    pub chunked_response: bool,
    writable_armed: bool,
    pub dead: bool,
    /// Inactivity countdown in seconds, decremented by the reactor tick.
    pub timeout: u32,
    pub chunk_cb: Option<ChunkCallback>,
    pub userdata: Option<Box<dyn Any>>,
}

impl Session {
    pub fn new(socket: TcpStream, slot: usize, serial: u64, shared: &Shared) -> Session {
        Session {
            socket,
            slot,
            serial,
            state: SessionState::Init,
            buf: Buffer::new(shared.memused.clone()),
            tokens: Vec::new(),
            current: None,
            parser: Parser::new(Limits::from_config(&shared.config)),
            keep_alive: false,
            automatic: true,
            response_ready: false,
            response_paused: false,
            chunked_response: false,
            writable_armed: false,
            dead: false,
            timeout: shared.config.request_timeout,
            chunk_cb: None,
            userdata: None,
        }
    }

    fn token(&self) -> Token {
        Token(SESSION_START + self.slot)
    }

    fn kill(&mut self) -> Flow {
        self.dead = true;
        Flow::Close
    }

    /// Run one state transition for an I/O readiness event.
    pub fn advance(&mut self, shared: &mut Shared) -> Flow {
        match self.state {
            SessionState::Init => {
                self.reset_for_request(shared);
                self.state = SessionState::ReadHeaders;
                if shared.memused.get() > shared.config.max_total_mem_usage {
                    warn!(
                        "refusing connection: {} buffer bytes in use",
                        shared.memused.get()
                    );
                    return self.error_response(shared, 503, "Service Unavailable");
                }
                self.read_headers(shared)
            }
            SessionState::ReadHeaders => self.read_headers(shared),
            SessionState::ReadBody => self.read_body(shared),
            SessionState::ReadChunk => self.read_chunk_ready(shared),
            SessionState::Write => self.write_response(shared),
            SessionState::Nop => Flow::Continue,
        }
    }

    fn reset_for_request(&mut self, shared: &Shared) {
        self.keep_alive = false;
        self.automatic = true;
        self.response_ready = false;
        self.response_paused = false;
        self.chunked_response = false;
        self.parser = Parser::new(Limits::from_config(&shared.config));
        self.tokens.clear();
        self.current = None;
        self.chunk_cb = None;
    }

    /// Drain the socket into the session buffer. `false` means hangup.
    fn read_socket(&mut self, shared: &Shared) -> bool {
        let initial = shared.config.request_buf_size;
        match self.buf.read_from(&mut self.socket, initial) {
            ReadOutcome::Drained => true,
            ReadOutcome::Eof => false,
        }
    }

    fn read_headers(&mut self, shared: &mut Shared) -> Flow {
        if !self.read_socket(shared) {
            return self.kill();
        }
        self.timeout = shared.config.request_timeout;
        if let Err(e) = self.parse_tokens() {
            return self.parse_failure(shared, e);
        }
        if self.reading_body() {
            self.state = SessionState::ReadBody;
            Flow::Continue
        } else if self.request_complete() {
            if self.parser.is_chunked() {
                // Chunked request: the handler runs now and pulls chunks on
                // demand; until then the socket is ignored.
                self.state = SessionState::Nop;
                self.parser.start_chunk_mode();
            }
            self.exec_request_handler(shared)
        } else {
            Flow::Continue
        }
    }

    fn read_body(&mut self, shared: &mut Shared) -> Flow {
        if !self.read_socket(shared) {
            return self.kill();
        }
        self.timeout = shared.config.request_timeout;
        if self.reading_body() {
            Flow::Continue
        } else {
            self.exec_request_handler(shared)
        }
    }

    fn read_chunk_ready(&mut self, shared: &mut Shared) -> Flow {
        if !self.read_socket(shared) {
            return self.kill();
        }
        self.timeout = shared.config.request_timeout;
        match self.parser.parse_chunk(&mut self.buf) {
            Parsed::Token(t) => {
                self.current = Some(t);
                self.state = SessionState::Nop;
                self.exec_chunk_cb(shared)
            }
            Parsed::Incomplete => Flow::Continue,
            Parsed::Error(e) => self.parse_failure(shared, e),
        }
    }

    fn parse_tokens(&mut self) -> Result<(), ParseError> {
        loop {
            match self.parser.parse(self.buf.bytes()) {
                Parsed::Token(t) => {
                    self.current = Some(t);
                    self.tokens.push(t);
                    if t.kind == (TokenKind::Body { chunked: true }) {
                        return Ok(());
                    }
                }
                Parsed::Incomplete => return Ok(()),
                Parsed::Error(e) => return Err(e),
            }
        }
    }

    /// A fixed-size body was declared and is not fully buffered yet.
    fn reading_body(&self) -> bool {
        match self.current {
            Some(HttpToken {
                kind: TokenKind::Body { chunked: false },
                start,
                len,
            }) if len > 0 => self.buf.filled() < start + len,
            _ => false,
        }
    }

    fn request_complete(&self) -> bool {
        matches!(
            self.current,
            Some(HttpToken {
                kind: TokenKind::Body { .. },
                ..
            })
        )
    }

    fn parse_failure(&mut self, shared: &mut Shared, e: ParseError) -> Flow {
        debug!("parse error: {}", e);
        let (status, reason) = e.http_status();
        self.error_response(shared, status, reason)
    }

    /// Send an engine-generated error reply and close once it is written.
    fn error_response(&mut self, shared: &mut Shared, status: u16, reason: &str) -> Flow {
        self.automatic = false;
        self.keep_alive = false;
        let mut response = Response::new();
        response.status(status);
        response.header("Content-Type", "text/plain");
        response.body(reason.as_bytes().to_vec());
        self.respond(shared, response);
        self.write_response(shared)
    }

    /// Invoke the host's request handler and then drive the write if it
    /// responded synchronously; otherwise park until `respond` arrives.
    fn exec_request_handler(&mut self, shared: &mut Shared) -> Flow {
        let handler = shared.handler.clone();
        {
            let mut request = Request::new(self, shared);
            (*handler)(&mut request);
        }
        if self.dead {
            return Flow::Close;
        }
        self.pump(shared)
    }

    fn exec_chunk_cb(&mut self, shared: &mut Shared) -> Flow {
        let Some(cb) = self.chunk_cb.take() else {
            return self.pump(shared);
        };
        {
            let mut request = Request::new(self, shared);
            cb(&mut request);
        }
        if self.dead {
            return Flow::Close;
        }
        self.pump(shared)
    }

    /// Start writing if a response is installed; otherwise record that the
    /// host owes one.
    pub fn pump(&mut self, shared: &mut Shared) -> Flow {
        if self.response_ready {
            self.write_response(shared)
        } else {
            self.response_paused = true;
            Flow::Continue
        }
    }

    fn write_response(&mut self, shared: &mut Shared) -> Flow {
        loop {
            match self.buf.write_to(&mut self.socket) {
                WriteOutcome::Closed => return self.kill(),
                WriteOutcome::Partial => {
                    // Kernel buffer is full; resume on the writable event.
                    if self.arm_writable(shared).is_err() {
                        return self.kill();
                    }
                    self.state = SessionState::Write;
                    self.timeout = shared.config.request_timeout;
                    return Flow::Continue;
                }
                WriteOutcome::Done => {}
            }
            if self.disarm_writable(shared).is_err() {
                return self.kill();
            }
            if self.chunked_response {
                // Chunk flushed; ask the host for the next one.
                self.state = SessionState::Write;
                self.timeout = shared.config.request_timeout;
                self.buf.free();
                self.response_ready = false;
                let Some(cb) = self.chunk_cb.take() else {
                    self.response_paused = true;
                    return Flow::Continue;
                };
                {
                    let mut request = Request::new(self, shared);
                    cb(&mut request);
                }
                if self.dead {
                    return Flow::Close;
                }
                if self.response_ready {
                    continue;
                }
                self.response_paused = true;
                return Flow::Continue;
            } else if self.keep_alive {
                self.response_ready = false;
                self.buf.free();
                self.tokens.clear();
                self.current = None;
                self.state = SessionState::Init;
                self.timeout = shared.config.keep_alive_timeout;
                return Flow::Continue;
            } else {
                return self.kill();
            }
        }
    }

    /// Install a complete response as the session's send buffer.
    pub fn respond(&mut self, shared: &mut Shared, response: Response) {
        if self.automatic {
            self.auto_keep_alive();
        }
        let mut out = Buffer::with_capacity(shared.config.response_buf_size, shared.memused.clone());
        render_head(
            &response,
            &mut out,
            shared.date.as_str(),
            self.keep_alive,
            false,
        );
        out.extend(response.body_bytes());
        self.install(out);
    }

    /// Install one response chunk; the first call also emits the header
    /// block. `cb` fires when the chunk has been written out.
    pub fn respond_chunk(&mut self, shared: &mut Shared, response: Response, cb: ChunkCallback) {
        let mut out = Buffer::with_capacity(shared.config.response_buf_size, shared.memused.clone());
        if !self.chunked_response {
            self.chunked_response = true;
            if self.automatic {
                self.auto_keep_alive();
            }
            render_head(
                &response,
                &mut out,
                shared.date.as_str(),
                self.keep_alive,
                true,
            );
        }
        self.chunk_cb = Some(cb);
        let body = response.body_bytes();
        let _ = write!(out, "{:X}\r\n", body.len());
        out.extend(body);
        out.extend(b"\r\n");
        self.install(out);
    }

    /// Terminate a chunked response; headers on `response` become trailers.
    pub fn respond_chunk_end(&mut self, shared: &mut Shared, response: Response) {
        let mut out = Buffer::with_capacity(shared.config.response_buf_size, shared.memused.clone());
        out.extend(b"0\r\n");
        render_trailers(&response, &mut out);
        self.chunked_response = false;
        self.install(out);
    }

    fn install(&mut self, out: Buffer) {
        self.buf.free();
        self.tokens.clear();
        self.current = None;
        self.buf = out;
        self.state = SessionState::Write;
        self.response_ready = true;
        self.response_paused = false;
    }

    /// Host is asking for the next request-body chunk.
    pub fn request_read_chunk(&mut self, shared: &mut Shared, cb: ChunkCallback) -> Flow {
        self.chunk_cb = Some(cb);
        match self.parser.parse_chunk(&mut self.buf) {
            Parsed::Token(t) => {
                // Already buffered; deliver synchronously.
                self.current = Some(t);
                return self.exec_chunk_cb(shared);
            }
            Parsed::Error(e) => return self.parse_failure(shared, e),
            Parsed::Incomplete => {}
        }
        if !self.read_socket(shared) {
            return self.kill();
        }
        match self.parser.parse_chunk(&mut self.buf) {
            Parsed::Token(t) => {
                self.current = Some(t);
                self.exec_chunk_cb(shared)
            }
            Parsed::Error(e) => self.parse_failure(shared, e),
            Parsed::Incomplete => {
                self.state = SessionState::ReadChunk;
                Flow::Continue
            }
        }
    }

    /// Drop the read buffer and token log ahead of the response, for hosts
    /// that hold requests open for a long time.
    pub fn free_request_buffer(&mut self) {
        self.buf.free();
        self.tokens.clear();
        self.current = None;
    }

    /// `Connection: close`, or HTTP/1.0 without a `Connection` header,
    /// closes; everything else keeps the connection alive.
    fn auto_keep_alive(&mut self) {
        let version = self.token_bytes(TokenKind::Version);
        if version.is_empty() {
            // Request views are gone (buffer freed); play it safe.
            self.keep_alive = false;
            return;
        }
        let http11 = version.last() == Some(&b'1');
        self.keep_alive = match self.find_header(b"connection") {
            Some(value) => !headers::is_close(value),
            None => http11,
        };
    }

    /// First token of `kind`, as bytes. Empty when absent or freed.
    pub fn token_bytes(&self, kind: TokenKind) -> &[u8] {
        if !self.buf.is_allocated() {
            return &[];
        }
        for t in &self.tokens {
            if t.kind == kind {
                return self
                    .buf
                    .bytes()
                    .get(t.start..t.start + t.len)
                    .unwrap_or(&[]);
            }
        }
        &[]
    }

    pub fn find_header(&self, name: &[u8]) -> Option<&[u8]> {
        if !self.buf.is_allocated() {
            return None;
        }
        let bytes = self.buf.bytes();
        for (i, t) in self.tokens.iter().enumerate() {
            if t.kind == TokenKind::HeaderKey && t.len == name.len() {
                let key = bytes.get(t.start..t.start + t.len)?;
                if headers::name_eq(key, name) {
                    let value = self.tokens.get(i + 1)?;
                    return bytes.get(value.start..value.start + value.len);
                }
            }
        }
        None
    }

    fn arm_writable(&mut self, shared: &Shared) -> std::io::Result<()> {
        if !self.writable_armed {
            let token = self.token();
            shared.registry.reregister(
                &mut self.socket,
                token,
                Interest::READABLE | Interest::WRITABLE,
            )?;
            self.writable_armed = true;
        }
        Ok(())
    }

    fn disarm_writable(&mut self, shared: &Shared) -> std::io::Result<()> {
        if self.writable_armed {
            let token = self.token();
            shared
                .registry
                .reregister(&mut self.socket, token, Interest::READABLE)?;
            self.writable_armed = false;
        }
        Ok(())
    }
}
