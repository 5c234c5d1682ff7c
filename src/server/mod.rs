//! The server: listening socket, accept loop and event dispatch.

mod error;
mod parser;
mod request;
mod response;
mod session;

use std::cell::RefCell;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use mio::net::TcpListener;
use mio::{Interest, Registry, Token, Waker};
use slab::Slab;

use crate::buffer::MemCounter;
use crate::config::Config;
use crate::date::HttpDate;
use crate::reactor::{Reactor, LISTENER, SESSION_START, WAKER};

pub use self::request::{Connection, Headers, Request, ResponseHandle};
pub use self::response::Response;

use self::request::{Op, PendingOps};
use self::session::{Flow, Session};

/// Server state reachable from session code: everything except the session
/// slab itself, so a borrowed session and the shared state can coexist.
pub(crate) struct Shared {
    pub config: Config,
    pub registry: Registry,
    pub date: HttpDate,
    pub memused: MemCounter,
    pub handler: Rc<dyn Fn(&mut Request<'_>)>,
    pub pending: PendingOps,
    pub waker: Rc<Waker>,
}

/// A single-threaded HTTP/1.1 server engine.
///
/// The server owns the event loop. Call [`Server::run`] to hand the thread
/// over, or call [`Server::poll`] from an existing loop to service one
/// ready event at a time.
pub struct Server {
    reactor: Reactor,
    listener: TcpListener,
    local_addr: SocketAddr,
    sessions: Slab<Session>,
    shared: Shared,
    next_serial: u64,
}

impl Server {
    /// Bind to `0.0.0.0:port` with default configuration.
    pub fn new<H>(port: u16, handler: H) -> io::Result<Server>
    where
        H: Fn(&mut Request<'_>) + 'static,
    {
        Server::bind(
            SocketAddr::from(([0, 0, 0, 0], port)),
            Config::default(),
            handler,
        )
    }

    /// Bind a listening socket and set up the reactor. The handler is
    /// called once per parsed request; it may respond synchronously or
    /// stash a [`ResponseHandle`] and respond later.
    pub fn bind<H>(addr: SocketAddr, config: Config, handler: H) -> io::Result<Server>
    where
        H: Fn(&mut Request<'_>) + 'static,
    {
        if config.ignore_sigpipe {
            // Writes to hung-up peers must surface as EPIPE, not kill the
            // process.
            unsafe {
                libc::signal(libc::SIGPIPE, libc::SIG_IGN);
            }
        }
        let reactor = Reactor::new()?;
        let mut listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        reactor
            .registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        let waker = Rc::new(Waker::new(reactor.registry(), WAKER)?);
        let registry = reactor.registry().try_clone()?;
        debug!("listening on {}", local_addr);
        Ok(Server {
            reactor,
            listener,
            local_addr,
            sessions: Slab::new(),
            next_serial: 1,
            shared: Shared {
                config,
                registry,
                date: HttpDate::now(),
                memused: MemCounter::new(),
                handler: Rc::new(handler),
                pending: Rc::new(RefCell::new(Vec::new())),
                waker,
            },
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Total read/write buffer bytes currently allocated across all
    /// connections.
    pub fn memory_used(&self) -> i64 {
        self.shared.memused.get()
    }

    /// Run the event loop forever.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            let timeout = self.reactor.until_tick();
            self.reactor.poll_ready(Some(timeout))?;
            while let Some(token) = self.reactor.next_event() {
                self.dispatch(token);
            }
            self.drain_ops();
            for _ in 0..self.reactor.take_ticks() {
                self.tick();
            }
        }
    }

    /// Service at most one ready event without blocking. Returns whether an
    /// event was handled; call in a loop until it returns `false`.
    pub fn poll(&mut self) -> io::Result<bool> {
        self.drain_ops();
        if !self.reactor.has_queued() {
            self.reactor.poll_ready(Some(Duration::ZERO))?;
        }
        let worked = match self.reactor.next_event() {
            Some(token) => {
                self.dispatch(token);
                true
            }
            None => false,
        };
        self.drain_ops();
        for _ in 0..self.reactor.take_ticks() {
            self.tick();
        }
        Ok(worked)
    }

    fn dispatch(&mut self, token: Token) {
        if token == LISTENER {
            self.accept_ready();
        } else if token == WAKER {
            // User events are applied by drain_ops after dispatch.
        } else {
            let slot = token.0 - SESSION_START;
            let flow = match self.sessions.get_mut(slot) {
                Some(session) => session.advance(&mut self.shared),
                None => return,
            };
            if flow == Flow::Close {
                self.end_session(slot);
            }
        }
    }

    fn accept_ready(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut socket, peer)) => {
                    let entry = self.sessions.vacant_entry();
                    let slot = entry.key();
                    let token = Token(SESSION_START + slot);
                    if let Err(e) =
                        self.shared
                            .registry
                            .register(&mut socket, token, Interest::READABLE)
                    {
                        debug!("failed to register connection: {}", e);
                        continue;
                    }
                    let serial = self.next_serial;
                    self.next_serial += 1;
                    trace!("accepted connection from {}", peer);
                    entry.insert(Session::new(socket, slot, serial, &self.shared));
                    // Bytes may already be queued; advance the new session
                    // right away rather than waiting for an event.
                    let flow = self.sessions[slot].advance(&mut self.shared);
                    if flow == Flow::Close {
                        self.end_session(slot);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!("accept failed: {}", e);
                    break;
                }
            }
        }
    }

    /// Apply operations scheduled through `ResponseHandle`s. Callbacks may
    /// schedule more, so loop until the queue stays empty.
    fn drain_ops(&mut self) {
        loop {
            let ops: Vec<(usize, u64, Op)> =
                self.shared.pending.borrow_mut().drain(..).collect();
            if ops.is_empty() {
                return;
            }
            for (slot, serial, op) in ops {
                let flow = match self.sessions.get_mut(slot) {
                    Some(session) if session.serial == serial && !session.dead => match op {
                        Op::Respond(response) => {
                            session.respond(&mut self.shared, response);
                            session.pump(&mut self.shared)
                        }
                        Op::RespondChunk(response, cb) => {
                            session.respond_chunk(&mut self.shared, response, cb);
                            session.pump(&mut self.shared)
                        }
                        Op::RespondChunkEnd(response) => {
                            session.respond_chunk_end(&mut self.shared, response);
                            session.pump(&mut self.shared)
                        }
                        Op::ReadChunk(cb) => {
                            session.request_read_chunk(&mut self.shared, cb)
                        }
                    },
                    _ => continue,
                };
                if flow == Flow::Close {
                    self.end_session(slot);
                }
            }
        }
    }

    /// The 1-second tick: refresh the date header and age out idle
    /// sessions.
    fn tick(&mut self) {
        self.shared.date.refresh();
        let mut expired = Vec::new();
        for (slot, session) in self.sessions.iter_mut() {
            session.timeout = session.timeout.saturating_sub(1);
            if session.timeout == 0 {
                expired.push(slot);
            }
        }
        for slot in expired {
            debug!("session timed out");
            self.end_session(slot);
        }
    }

    fn end_session(&mut self, slot: usize) {
        if let Some(mut session) = self.sessions.try_remove(slot) {
            let _ = self.shared.registry.deregister(&mut session.socket);
            trace!("session closed");
        }
    }
}
