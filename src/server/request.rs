//! Read-only request views and the host-facing response operations.
//!
//! A [`Request`] borrows the session for the duration of a host callback.
//! All views (`method`, `target`, `header`, `chunk`, ...) are byte slices
//! into the session's read buffer; the borrow checker guarantees they are
//! gone before anything invalidates them.
//!
//! Handlers that cannot respond synchronously grab a [`ResponseHandle`]
//! before returning. The handle enqueues the eventual response on the
//! reactor's user-event queue and wakes the loop; it is deliberately not
//! `Send`, so responses can only be resolved from the reactor thread.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use mio::Waker;

use crate::server::parser::TokenKind;
use crate::server::response::Response;
use crate::server::session::{ChunkCallback, Session};
use crate::server::Shared;

/// Directive for [`Request::connection`], overriding automatic keep-alive
/// detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    KeepAlive,
    Close,
}

/// A deferred host operation, applied by the reactor between events.
pub(crate) enum Op {
    Respond(Response),
    RespondChunk(Response, ChunkCallback),
    RespondChunkEnd(Response),
    ReadChunk(ChunkCallback),
}

/// `(slot, serial, op)` triples scheduled from host code.
pub(crate) type PendingOps = Rc<RefCell<Vec<(usize, u64, Op)>>>;

/// The in-flight request handed to host callbacks.
pub struct Request<'a> {
    session: &'a mut Session,
    shared: &'a mut Shared,
}

impl<'a> Request<'a> {
    pub(crate) fn new(session: &'a mut Session, shared: &'a mut Shared) -> Request<'a> {
        Request { session, shared }
    }

    /// The request method, exactly as it appeared on the request line.
    pub fn method(&self) -> &[u8] {
        self.session.token_bytes(TokenKind::Method)
    }

    /// The request target (URL), as an opaque byte range.
    pub fn target(&self) -> &[u8] {
        self.session.token_bytes(TokenKind::Target)
    }

    /// The version token, e.g. `HTTP/1.1`.
    pub fn version(&self) -> &[u8] {
        self.session.token_bytes(TokenKind::Version)
    }

    /// The request body. Empty for bodyless requests and for chunked
    /// requests, whose bodies are read through [`Request::read_chunk`].
    pub fn body(&self) -> &[u8] {
        if !self.session.buf.is_allocated() {
            return &[];
        }
        for t in &self.session.tokens {
            if let TokenKind::Body { chunked } = t.kind {
                if chunked {
                    return &[];
                }
                return self
                    .session
                    .buf
                    .bytes()
                    .get(t.start..t.start + t.len)
                    .unwrap_or(&[]);
            }
        }
        &[]
    }

    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.session.find_header(name.as_bytes())
    }

    /// Iterate over all `(name, value)` header pairs in request order.
    pub fn headers(&self) -> Headers<'_> {
        Headers {
            tokens: &self.session.tokens,
            bytes: if self.session.buf.is_allocated() {
                self.session.buf.bytes()
            } else {
                &[]
            },
            pos: 0,
        }
    }

    /// The most recently delivered request-body chunk. Valid until the next
    /// [`Request::read_chunk`]; a zero-length chunk ends the body.
    pub fn chunk(&self) -> &[u8] {
        match self.session.current {
            Some(t) if t.kind == TokenKind::ChunkBody => self
                .session
                .buf
                .bytes()
                .get(t.start..t.start + t.len)
                .unwrap_or(&[]),
            _ => &[],
        }
    }

    /// Ask for the next chunk of a chunked request body. `cb` runs as soon
    /// as a chunk is buffered, possibly before this call returns.
    pub fn read_chunk<F>(&mut self, cb: F)
    where
        F: FnOnce(&mut Request<'_>) + 'static,
    {
        let _ = self
            .session
            .request_read_chunk(self.shared, Box::new(cb));
    }

    /// Force the connection to stay open or close after this response,
    /// instead of inspecting `Connection` and the HTTP version.
    pub fn connection(&mut self, directive: Connection) {
        self.session.automatic = false;
        self.session.keep_alive = directive == Connection::KeepAlive;
    }

    /// Stash an opaque value on the connection for later callbacks.
    pub fn set_userdata(&mut self, data: Box<dyn Any>) {
        self.session.userdata = Some(data);
    }

    pub fn userdata(&mut self) -> Option<&mut (dyn Any + 'static)> {
        self.session.userdata.as_deref_mut()
    }

    pub fn take_userdata(&mut self) -> Option<Box<dyn Any>> {
        self.session.userdata.take()
    }

    /// Release the read buffer and token log before responding. Useful for
    /// long-running handlers; all request views return empty afterwards,
    /// and automatic keep-alive falls back to closing the connection.
    pub fn free_buffer(&mut self) {
        self.session.free_request_buffer();
    }

    /// Send a complete response. The engine frames it and starts writing
    /// once the current callback returns.
    pub fn respond(&mut self, response: Response) {
        self.session.respond(self.shared, response);
    }

    /// Send one chunk of a chunked response. The first call emits the
    /// header block using this response's status and headers; headers on
    /// later chunks are ignored. `cb` fires when the chunk has been fully
    /// written, to pull the next one.
    pub fn respond_chunk<F>(&mut self, response: Response, cb: F)
    where
        F: FnOnce(&mut Request<'_>) + 'static,
    {
        self.session
            .respond_chunk(self.shared, response, Box::new(cb));
    }

    /// Finish a chunked response. Headers on `response` are sent as
    /// trailers.
    pub fn respond_chunk_end(&mut self, response: Response) {
        self.session.respond_chunk_end(self.shared, response);
    }

    /// A handle for responding after this callback has returned. May be
    /// cloned and stored; it is not `Send` — resolve it from the reactor
    /// thread, typically from another callback.
    pub fn handle(&self) -> ResponseHandle {
        ResponseHandle {
            slot: self.session.slot,
            serial: self.session.serial,
            pending: Rc::clone(&self.shared.pending),
            waker: Rc::clone(&self.shared.waker),
        }
    }
}

/// Cursor over the header tokens of a request.
pub struct Headers<'a> {
    tokens: &'a [crate::server::parser::Token],
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Headers<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.tokens.len() {
            let t = self.tokens[self.pos];
            match t.kind {
                TokenKind::HeaderKey => {
                    let v = *self.tokens.get(self.pos + 1)?;
                    self.pos += 2;
                    let key = self.bytes.get(t.start..t.start + t.len)?;
                    let value = self.bytes.get(v.start..v.start + v.len)?;
                    return Some((key, value));
                }
                TokenKind::Body { .. } => return None,
                _ => self.pos += 1,
            }
        }
        None
    }
}

/// Completion handle for pauseable handlers.
///
/// Created by [`Request::handle`]; resolving it re-enters the session state
/// machine on the reactor thread. Operations against a connection that has
/// since closed are dropped silently.
#[derive(Clone)]
pub struct ResponseHandle {
    slot: usize,
    serial: u64,
    pending: PendingOps,
    waker: Rc<Waker>,
}

impl ResponseHandle {
    pub fn respond(&self, response: Response) {
        self.push(Op::Respond(response));
    }

    pub fn respond_chunk<F>(&self, response: Response, cb: F)
    where
        F: FnOnce(&mut Request<'_>) + 'static,
    {
        self.push(Op::RespondChunk(response, Box::new(cb)));
    }

    pub fn respond_chunk_end(&self, response: Response) {
        self.push(Op::RespondChunkEnd(response));
    }

    pub fn read_chunk<F>(&self, cb: F)
    where
        F: FnOnce(&mut Request<'_>) + 'static,
    {
        self.push(Op::ReadChunk(Box::new(cb)));
    }

    fn push(&self, op: Op) {
        self.pending
            .borrow_mut()
            .push((self.slot, self.serial, op));
        if let Err(e) = self.waker.wake() {
            debug!("failed to wake reactor: {}", e);
        }
    }
}
