//! Session byte buffers with global memory accounting.
//!
//! Every read and write buffer in the server mirrors its capacity into a
//! shared counter. The counter is consulted when a new request starts; when
//! it exceeds the configured cap the connection is refused with 503. Buffers
//! subtract themselves on `free` or `Drop`, so the counter always equals the
//! sum of live buffer capacities no matter how a session ends.

use std::cell::Cell;
use std::io::{self, Read, Write};
use std::rc::Rc;

/// Shared signed byte counter, one per server. Single-threaded by design.
#[derive(Clone, Default)]
pub struct MemCounter(Rc<Cell<i64>>);

impl MemCounter {
    pub fn new() -> MemCounter {
        MemCounter::default()
    }

    pub fn get(&self) -> i64 {
        self.0.get()
    }

    fn add(&self, n: i64) {
        self.0.set(self.0.get() + n);
    }

    fn sub(&self, n: i64) {
        self.0.set(self.0.get() - n);
    }
}

pub enum ReadOutcome {
    /// The socket was drained to `WouldBlock`; more data may arrive later.
    Drained,
    /// The peer hung up (or the socket failed, which we treat the same way).
    Eof,
}

pub enum WriteOutcome {
    /// Everything between `written` and `filled` went out.
    Done,
    /// The kernel buffer filled up; wait for a writable event.
    Partial,
    /// The peer is gone.
    Closed,
}

/// A contiguous byte area with a filled prefix and a write cursor.
///
/// Starts unallocated; the first `read_from` or `extend` allocates. Token
/// indices returned by the parser point into `bytes()` and stay valid until
/// the buffer is freed or compacted.
pub struct Buffer {
    data: Vec<u8>,
    filled: usize,
    written: usize,
    counter: MemCounter,
}

impl Buffer {
    pub fn new(counter: MemCounter) -> Buffer {
        Buffer {
            data: Vec::new(),
            filled: 0,
            written: 0,
            counter,
        }
    }

    pub fn with_capacity(capacity: usize, counter: MemCounter) -> Buffer {
        let mut buf = Buffer::new(counter);
        buf.allocate(capacity.max(1));
        buf
    }

    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.filled]
    }

    pub fn has_unwritten(&self) -> bool {
        self.written < self.filled
    }

    /// Rewrite the filled length after compaction. Indices of earlier tokens
    /// are invalid from this point on.
    pub fn set_filled(&mut self, filled: usize) {
        debug_assert!(filled <= self.data.len());
        self.filled = filled;
    }

    /// Move the tail `[src, filled)` down to `dst`. Used by the chunk parser
    /// to slide a partial token back over consumed chunk bytes.
    pub fn shift_tail(&mut self, src: usize, dst: usize) {
        debug_assert!(dst <= src && src <= self.filled);
        let end = self.filled;
        self.data.copy_within(src..end, dst);
    }

    fn allocate(&mut self, capacity: usize) {
        debug_assert!(self.data.is_empty());
        self.data = vec![0; capacity];
        self.counter.add(capacity as i64);
    }

    fn grow_to(&mut self, capacity: usize) {
        self.counter.sub(self.data.len() as i64);
        self.data.resize(capacity, 0);
        self.counter.add(capacity as i64);
    }

    /// Make sure at least one spare byte exists, allocating `initial` bytes
    /// the first time and doubling afterwards.
    fn ensure_spare(&mut self, initial: usize) {
        if !self.is_allocated() {
            self.allocate(initial.max(1));
        } else if self.filled == self.data.len() {
            let capacity = self.data.len() * 2;
            self.grow_to(capacity);
        }
    }

    /// Drain `r` into the buffer, growing as needed.
    pub fn read_from<R: Read>(&mut self, r: &mut R, initial: usize) -> ReadOutcome {
        loop {
            self.ensure_spare(initial);
            match r.read(&mut self.data[self.filled..]) {
                Ok(0) => return ReadOutcome::Eof,
                Ok(n) => self.filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return ReadOutcome::Drained
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => return ReadOutcome::Eof,
            }
        }
    }

    /// Push unwritten bytes to `w` until done or the kernel pushes back.
    pub fn write_to<W: Write>(&mut self, w: &mut W) -> WriteOutcome {
        while self.written < self.filled {
            match w.write(&self.data[self.written..self.filled]) {
                Ok(0) => return WriteOutcome::Closed,
                Ok(n) => self.written += n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return WriteOutcome::Partial
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => return WriteOutcome::Closed,
            }
        }
        WriteOutcome::Done
    }

    /// Append bytes, growing geometrically.
    pub fn extend(&mut self, bytes: &[u8]) {
        let need = self.filled + bytes.len();
        if need > self.data.len() {
            let mut capacity = self.data.len().max(64);
            while capacity < need {
                capacity *= 2;
            }
            if self.is_allocated() {
                self.grow_to(capacity);
            } else {
                self.allocate(capacity);
            }
        }
        self.data[self.filled..need].copy_from_slice(bytes);
        self.filled = need;
    }

    /// Release the allocation and reset all cursors.
    pub fn free(&mut self) {
        if self.is_allocated() {
            self.counter.sub(self.data.len() as i64);
            self.data = Vec::new();
        }
        self.filled = 0;
        self.written = 0;
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.counter.sub(self.data.len() as i64);
    }
}
