//! Readiness multiplexing and the 1-second tick.
//!
//! Wraps `mio::Poll`. Registrations are edge-triggered, so every consumer
//! must drain its source on each event. Ready tokens are staged in a queue
//! so the server can either drain them all (`run`) or service exactly one
//! per call (`poll`, for embedding in a host loop).
//!
//! There are no per-fd timers: the reactor exposes a repeating 1-second
//! tick, derived from the poll timeout, which drives the cached date header
//! and every session's inactivity countdown.

use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use mio::{Events, Poll, Registry, Token};

/// Token of the listening socket.
pub(crate) const LISTENER: Token = Token(0);
/// Token of the user-event waker.
pub(crate) const WAKER: Token = Token(1);
/// Session slot `n` registers as `Token(SESSION_START + n)`.
pub(crate) const SESSION_START: usize = 2;

const TICK: Duration = Duration::from_secs(1);

pub(crate) struct Reactor {
    poll: Poll,
    events: Events,
    queue: VecDeque<Token>,
    last_tick: Instant,
}

impl Reactor {
    pub fn new() -> io::Result<Reactor> {
        Ok(Reactor {
            poll: Poll::new()?,
            events: Events::with_capacity(256),
            queue: VecDeque::new(),
            last_tick: Instant::now(),
        })
    }

    pub fn registry(&self) -> &Registry {
        self.poll.registry()
    }

    /// Wait up to `timeout` for readiness and stage the ready tokens.
    pub fn poll_ready(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e),
        }
        let Reactor { events, queue, .. } = self;
        for event in events.iter() {
            queue.push_back(event.token());
        }
        Ok(())
    }

    pub fn next_event(&mut self) -> Option<Token> {
        self.queue.pop_front()
    }

    pub fn has_queued(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Time until the next 1-second tick is due.
    pub fn until_tick(&self) -> Duration {
        (self.last_tick + TICK).saturating_duration_since(Instant::now())
    }

    /// Number of whole ticks elapsed since the last call.
    pub fn take_ticks(&mut self) -> u32 {
        let mut ticks = 0;
        while self.last_tick.elapsed() >= TICK {
            self.last_tick += TICK;
            ticks += 1;
        }
        ticks
    }
}
