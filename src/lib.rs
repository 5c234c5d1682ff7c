//! An embeddable, event-driven HTTP/1.1 server engine.
//!
//! One reactor thread multiplexes every connection. Requests are tokenized
//! incrementally from per-connection buffers, handed to a host-supplied
//! handler, and answered with framed HTTP/1.1 responses, including chunked
//! transfer encoding in both directions. The engine owns I/O readiness,
//! connection lifecycle, parsing, response framing, inactivity timeouts and
//! a global cap on buffer memory; the host supplies only the handler.
//!
//! ```no_run
//! use stoker::{Request, Response, Server};
//!
//! fn handle(req: &mut Request) {
//!     let mut response = Response::new();
//!     response.status(200);
//!     response.header("Content-Type", "text/plain");
//!     response.body("Hello, World!");
//!     req.respond(response);
//! }
//!
//! fn main() -> std::io::Result<()> {
//!     let mut server = Server::new(8080, handle)?;
//!     server.run()
//! }
//! ```
//!
//! Handlers must not block the reactor thread. A handler that needs to wait
//! returns without responding and resolves a [`ResponseHandle`] later, from
//! the same thread. Chunked request bodies are pulled on demand with
//! [`Request::read_chunk`]; chunked responses are pushed with
//! [`Request::respond_chunk`].

#[macro_use]
extern crate log;

mod buffer;
mod config;
mod date;
mod headers;
mod reactor;
mod server;

pub use crate::config::Config;
pub use crate::server::{Connection, Headers, Request, Response, ResponseHandle, Server};
