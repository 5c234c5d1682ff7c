//! Resumable, byte-at-a-time HTTP/1.1 request tokenizer.
//!
//! The parser walks the session's read buffer and turns it into a stream of
//! tokens: method, target, version, alternating header key/value pairs, and
//! finally a body marker. It never builds an intermediate header map; the
//! two headers it must act on (`Content-Length`, `Transfer-Encoding`) are
//! recognised with rolling per-character matches while the key is scanned.
//!
//! A call to [`Parser::parse`] resumes wherever the previous call stopped
//! and runs until it emits exactly one token or exhausts the filled region
//! of the buffer. Feeding the same bytes in arbitrary splits therefore
//! yields the same token stream as one large parse.
//!
//! After the body marker reports a chunked body, the session switches the
//! parser into chunk mode with [`Parser::start_chunk_mode`] and drives
//! [`Parser::parse_chunk`] instead. In chunk mode the parser is allowed to
//! rewrite the buffer: when it runs dry mid-token it slides the partial
//! token back to the start of the body region so long uploads never grow
//! the buffer. Token indices from before a compaction, other than the one
//! most recently emitted, must not be consulted again.

use crate::buffer::Buffer;
use crate::config::Config;
use crate::server::error::ParseError;

const CONTENT_LENGTH: &[u8] = b"content-length";
const TRANSFER_ENCODING: &[u8] = b"transfer-encoding";
const CHUNKED: &[u8] = b"chunked";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Method,
    Target,
    Version,
    HeaderKey,
    HeaderValue,
    /// End of the header block. `len` is the declared `Content-Length` for
    /// plain bodies and zero when the body is absent or chunked.
    Body {
        chunked: bool,
    },
    /// One request-body chunk, emitted only in chunk mode.
    ChunkBody,
}

/// A half-open byte range inside the session buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub len: usize,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed {
    Token(Token),
    /// The filled region is exhausted; call again after the next read.
    Incomplete,
    Error(ParseError),
}

/// The parser's copy of the request limits.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_token_length: usize,
    pub max_content_length: u64,
    pub max_header_count: u32,
}

impl Limits {
    pub fn from_config(config: &Config) -> Limits {
        Limits {
            max_token_length: config.max_token_length,
            max_content_length: config.max_content_length,
            max_header_count: config.max_header_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Method,
    Target,
    Version,
    HeaderKey,
    HeaderValue,
    HeaderEnd,
    Body,
    ChunkSize,
    ChunkExtn,
    ChunkBody,
    ChunkBodyEnd,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sub {
    None,
    /// Skipping leading whitespace of a header value.
    Lws,
    Cr,
    Crlf,
}

pub struct Parser {
    state: State,
    sub: Sub,
    /// Next byte index to examine.
    scan: usize,
    /// Where the token in progress began.
    token_start: usize,
    /// Running accumulator: decimal while reading `Content-Length`, hex
    /// while reading a chunk size.
    content_length: u64,
    /// First byte index after the header block.
    body_start: usize,
    header_count: u32,
    /// Rolling match cursors. `te_match` is reused against `chunked` while
    /// the `Transfer-Encoding` value is scanned.
    cl_match: usize,
    te_match: usize,
    saw_content_length: bool,
    saw_transfer_encoding: bool,
    chunked: bool,
    error: Option<ParseError>,
    limits: Limits,
}

impl Parser {
    pub fn new(limits: Limits) -> Parser {
        Parser {
            state: State::Method,
            sub: Sub::None,
            scan: 0,
            token_start: 0,
            content_length: 0,
            body_start: 0,
            header_count: 0,
            cl_match: 0,
            te_match: 0,
            saw_content_length: false,
            saw_transfer_encoding: false,
            chunked: false,
            error: None,
            limits,
        }
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    pub fn body_start(&self) -> usize {
        self.body_start
    }

    /// Tokenize the header phase. Emits at most one token per call.
    pub fn parse(&mut self, input: &[u8]) -> Parsed {
        if let Some(err) = self.error {
            return Parsed::Error(err);
        }
        while self.scan < input.len() {
            let i = self.scan;
            let c = input[i];
            self.scan = i + 1;
            match self.state {
                State::Method => {
                    if c == b' ' {
                        let token = self.emit(TokenKind::Method, i);
                        self.state = State::Target;
                        self.token_start = i + 1;
                        return Parsed::Token(token);
                    }
                }
                State::Target => {
                    if c == b' ' {
                        let token = self.emit(TokenKind::Target, i);
                        self.state = State::Version;
                        self.token_start = i + 1;
                        return Parsed::Token(token);
                    }
                }
                State::Version => {
                    if c == b'\r' && self.sub != Sub::Cr {
                        self.sub = Sub::Cr;
                        return Parsed::Token(self.emit(TokenKind::Version, i));
                    } else if self.sub == Sub::Cr && c == b'\n' {
                        // The request line's CRLF counts like a header CRLF:
                        // either a header key or the blank line follows.
                        self.sub = Sub::Crlf;
                        self.token_start = i + 1;
                        self.state = State::HeaderEnd;
                    }
                }
                State::HeaderKey => {
                    if let Some(out) = self.step_header_key(c, i) {
                        return out;
                    }
                }
                State::HeaderValue => {
                    if self.sub == Sub::Lws {
                        match c {
                            b' ' | b'\t' | b'\r' | b'\n' => {}
                            _ => {
                                self.sub = Sub::None;
                                self.token_start = i;
                                if let Some(out) = self.step_header_value(c) {
                                    return out;
                                }
                            }
                        }
                    } else if c == b'\r' {
                        return self.finish_header_value(i);
                    } else if let Some(out) = self.step_header_value(c) {
                        return out;
                    }
                }
                State::HeaderEnd => match (self.sub, c) {
                    (Sub::Cr, b'\n') => self.sub = Sub::Crlf,
                    (Sub::Crlf, b'\r') => {
                        // Blank line: the header block is complete. The body
                        // marker points just past the final CRLF, and the
                        // scan cursor skips the LF we have not seen yet.
                        self.sub = Sub::None;
                        self.state = State::Body;
                        self.body_start = i + 2;
                        self.scan = i + 2;
                        return Parsed::Token(Token {
                            start: self.body_start,
                            len: if self.chunked {
                                0
                            } else {
                                self.content_length as usize
                            },
                            kind: TokenKind::Body {
                                chunked: self.chunked,
                            },
                        });
                    }
                    (Sub::Crlf, _) => {
                        // Another header line begins with this byte.
                        self.sub = Sub::None;
                        self.token_start = i;
                        self.state = State::HeaderKey;
                        if let Some(out) = self.step_header_key(c, i) {
                            return out;
                        }
                    }
                    (Sub::None, b'\r') => self.sub = Sub::Cr,
                    _ => {}
                },
                State::Body => {
                    // Body bytes are addressed by index, not tokenized.
                    self.scan = input.len();
                    return Parsed::Incomplete;
                }
                State::ChunkSize
                | State::ChunkExtn
                | State::ChunkBody
                | State::ChunkBodyEnd => {
                    debug_assert!(false, "parse() called in chunk mode");
                    return Parsed::Incomplete;
                }
                State::Failed => {
                    return Parsed::Error(self.error.unwrap_or(ParseError::BadRequest));
                }
            }
            if self.state != State::Body
                && i + 1 - self.token_start >= self.limits.max_token_length
            {
                return self.fail(ParseError::BadRequest);
            }
        }
        Parsed::Incomplete
    }

    /// Switch to chunk mode. Must be called once, right after the body
    /// marker reported a chunked body.
    pub fn start_chunk_mode(&mut self) {
        debug_assert_eq!(self.state, State::Body);
        self.token_start = self.scan;
        self.content_length = 0;
        self.state = State::ChunkSize;
    }

    /// Tokenize the chunked body phase. Emits at most one `ChunkBody` token
    /// per call; a token of length zero means the body is finished.
    ///
    /// When the buffer runs dry mid-token the partial bytes are moved back
    /// to `body_start` and the filled length is rewritten so subsequent
    /// reads overwrite consumed chunk data.
    pub fn parse_chunk(&mut self, buf: &mut Buffer) -> Parsed {
        if let Some(err) = self.error {
            return Parsed::Error(err);
        }
        let n = buf.filled();
        while self.scan < n {
            let i = self.scan;
            let c = buf.bytes()[i];
            self.scan = i + 1;
            match self.state {
                State::ChunkSize => match c {
                    b';' => self.state = State::ChunkExtn,
                    b'\r' => {}
                    b'\n' => {
                        self.token_start = i + 1;
                        if n >= self.token_start + self.content_length as usize {
                            // The whole chunk is already buffered.
                            return self.emit_chunk_body();
                        }
                        self.state = State::ChunkBody;
                    }
                    _ => {
                        if let Some(digit) = hex_digit(c) {
                            let next = self.content_length * 16 + u64::from(digit);
                            if next > self.limits.max_content_length {
                                return self.fail(ParseError::PayloadTooLarge);
                            }
                            self.content_length = next;
                        }
                    }
                },
                State::ChunkExtn => {
                    if c == b'\n' {
                        self.token_start = i + 1;
                        if n >= self.token_start + self.content_length as usize {
                            return self.emit_chunk_body();
                        }
                        self.state = State::ChunkBody;
                    }
                }
                State::ChunkBody => {
                    if n >= self.token_start + self.content_length as usize {
                        return self.emit_chunk_body();
                    }
                    // Everything buffered belongs to this chunk; wait for
                    // the rest.
                    self.scan = n;
                }
                State::ChunkBodyEnd => {
                    if c == b'\n' {
                        self.state = State::ChunkSize;
                        self.content_length = 0;
                        self.token_start = i + 1;
                    }
                }
                _ => {
                    debug_assert!(false, "parse_chunk() called outside chunk mode");
                    return Parsed::Incomplete;
                }
            }
        }
        self.compact(buf);
        Parsed::Incomplete
    }

    fn emit(&mut self, kind: TokenKind, end: usize) -> Token {
        Token {
            start: self.token_start,
            len: end - self.token_start,
            kind,
        }
    }

    fn fail(&mut self, err: ParseError) -> Parsed {
        self.state = State::Failed;
        self.error = Some(err);
        Parsed::Error(err)
    }

    fn step_header_key(&mut self, c: u8, i: usize) -> Option<Parsed> {
        if c == b':' {
            let len = i - self.token_start;
            self.saw_content_length =
                self.cl_match == CONTENT_LENGTH.len() && len == CONTENT_LENGTH.len();
            self.saw_transfer_encoding = self.te_match == TRANSFER_ENCODING.len()
                && len == TRANSFER_ENCODING.len();
            self.cl_match = 0;
            self.te_match = 0;
            self.state = State::HeaderValue;
            self.sub = Sub::Lws;
            return Some(Parsed::Token(self.emit(TokenKind::HeaderKey, i)));
        }
        let lower = c.to_ascii_lowercase();
        if self.cl_match < CONTENT_LENGTH.len() && lower == CONTENT_LENGTH[self.cl_match] {
            self.cl_match += 1;
        }
        if self.te_match < TRANSFER_ENCODING.len()
            && lower == TRANSFER_ENCODING[self.te_match]
        {
            self.te_match += 1;
        }
        None
    }

    fn step_header_value(&mut self, c: u8) -> Option<Parsed> {
        if self.saw_content_length {
            if !c.is_ascii_digit() {
                return Some(self.fail(ParseError::BadRequest));
            }
            let next = self.content_length * 10 + u64::from(c - b'0');
            if next > self.limits.max_content_length {
                return Some(self.fail(ParseError::PayloadTooLarge));
            }
            self.content_length = next;
        } else if self.saw_transfer_encoding
            && self.te_match < CHUNKED.len()
            && c.to_ascii_lowercase() == CHUNKED[self.te_match]
        {
            self.te_match += 1;
        }
        None
    }

    fn finish_header_value(&mut self, i: usize) -> Parsed {
        let len = i - self.token_start;
        if self.saw_transfer_encoding && self.te_match == CHUNKED.len() && len == CHUNKED.len()
        {
            self.chunked = true;
        }
        self.saw_content_length = false;
        self.saw_transfer_encoding = false;
        self.cl_match = 0;
        self.te_match = 0;
        self.sub = Sub::Cr;
        self.state = State::HeaderEnd;
        if self.header_count == self.limits.max_header_count {
            return self.fail(ParseError::BadRequest);
        }
        self.header_count += 1;
        Parsed::Token(self.emit(TokenKind::HeaderValue, i))
    }

    fn emit_chunk_body(&mut self) -> Parsed {
        let len = self.content_length as usize;
        let token = Token {
            start: self.token_start,
            len,
            kind: TokenKind::ChunkBody,
        };
        self.scan = self.token_start + len;
        self.state = State::ChunkBodyEnd;
        Parsed::Token(token)
    }

    fn compact(&mut self, buf: &mut Buffer) {
        if self.token_start == self.body_start {
            return;
        }
        let partial = buf.filled() - self.token_start;
        if partial > 0 {
            buf.shift_tail(self.token_start, self.body_start);
        }
        self.token_start = self.body_start;
        self.scan = self.body_start + partial;
        buf.set_filled(self.scan);
    }
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::{Limits, Parsed, Parser, Token, TokenKind};
    use crate::buffer::{Buffer, MemCounter};
    use crate::server::error::ParseError;

    fn limits() -> Limits {
        Limits {
            max_token_length: 8192,
            max_content_length: 8 * 1024 * 1024,
            max_header_count: 127,
        }
    }

    fn text<'a>(input: &'a [u8], token: &Token) -> &'a [u8] {
        &input[token.start..token.start + token.len]
    }

    /// Run the parser over `input`, feeding it ever longer prefixes to
    /// simulate data arriving in `step`-byte reads.
    fn tokenize(input: &[u8], step: usize) -> Result<Vec<Token>, ParseError> {
        let mut parser = Parser::new(limits());
        let mut tokens = Vec::new();
        let mut upto = 0;
        loop {
            match parser.parse(&input[..upto]) {
                Parsed::Token(t) => {
                    let body = matches!(t.kind, TokenKind::Body { .. });
                    tokens.push(t);
                    if body {
                        return Ok(tokens);
                    }
                }
                Parsed::Incomplete => {
                    if upto == input.len() {
                        return Ok(tokens);
                    }
                    upto = (upto + step).min(input.len());
                }
                Parsed::Error(e) => return Err(e),
            }
        }
    }

    #[test]
    fn simple_get() {
        let input = b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n";
        let tokens = tokenize(input, input.len()).unwrap();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0].kind, TokenKind::Method);
        assert_eq!(text(input, &tokens[0]), b"GET");
        assert_eq!(text(input, &tokens[1]), b"/x");
        assert_eq!(text(input, &tokens[2]), b"HTTP/1.1");
        assert_eq!(tokens[3].kind, TokenKind::HeaderKey);
        assert_eq!(text(input, &tokens[3]), b"Host");
        assert_eq!(text(input, &tokens[4]), b"a");
        assert_eq!(tokens[5].kind, TokenKind::Body { chunked: false });
        assert_eq!(tokens[5].len, 0);
        assert_eq!(tokens[5].start, input.len());
    }

    #[test]
    fn split_arrival_equals_single_pass() {
        let input =
            b"POST /submit HTTP/1.1\r\nHost: example\r\nContent-Length: 5\r\nX-Pad: y\r\n\r\nhello";
        let whole = tokenize(input, input.len()).unwrap();
        for step in 1..8 {
            let split = tokenize(input, step).unwrap();
            assert_eq!(whole, split, "token stream diverged at step {}", step);
        }
    }

    #[test]
    fn request_without_headers() {
        let input = b"GET / HTTP/1.0\r\n\r\n";
        let tokens = tokenize(input, input.len()).unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Method,
                TokenKind::Target,
                TokenKind::Version,
                TokenKind::Body { chunked: false },
            ]
        );
        assert_eq!(text(input, &tokens[2]), b"HTTP/1.0");
        assert_eq!(tokens[3].len, 0);
    }

    #[test]
    fn content_length_sets_body_token() {
        let input = b"POST /x HTTP/1.1\r\ncOnTeNt-LeNgTh: 5\r\n\r\nhello";
        let tokens = tokenize(input, input.len()).unwrap();
        let body = tokens.last().unwrap();
        assert_eq!(body.kind, TokenKind::Body { chunked: false });
        assert_eq!(body.len, 5);
        assert_eq!(text(input, body), b"hello");
    }

    #[test]
    fn leading_value_whitespace_is_stripped() {
        let input = b"GET / HTTP/1.1\r\nX-A:    \t padded\r\n\r\n";
        let tokens = tokenize(input, input.len()).unwrap();
        assert_eq!(text(input, &tokens[4]), b"padded");
    }

    #[test]
    fn content_prefix_header_is_not_content_length() {
        // "Content" is a strict prefix of "Content-Length" and must not
        // trigger the length accumulator.
        let input = b"GET / HTTP/1.1\r\nContent: 99\r\n\r\n";
        let tokens = tokenize(input, input.len()).unwrap();
        assert_eq!(tokens.last().unwrap().len, 0);
    }

    #[test]
    fn bad_content_length_digit() {
        let input = b"GET / HTTP/1.1\r\nContent-Length: 4x\r\n\r\n";
        assert_eq!(
            tokenize(input, input.len()),
            Err(ParseError::BadRequest)
        );
    }

    #[test]
    fn oversize_content_length() {
        let input = b"POST / HTTP/1.1\r\nContent-Length: 999999999\r\n\r\n";
        assert_eq!(
            tokenize(input, input.len()),
            Err(ParseError::PayloadTooLarge)
        );
    }

    #[test]
    fn transfer_encoding_chunked_detected() {
        for value in ["chunked", "CHUNKED", "ChUnKeD"] {
            let input =
                format!("POST / HTTP/1.1\r\nTransfer-Encoding: {}\r\n\r\n", value);
            let tokens = tokenize(input.as_bytes(), input.len()).unwrap();
            assert_eq!(
                tokens.last().unwrap().kind,
                TokenKind::Body { chunked: true },
                "value {:?}",
                value
            );
        }
    }

    #[test]
    fn chunked_requires_exact_value() {
        for value in ["chunke", "chunkedd", "gzip"] {
            let input =
                format!("POST / HTTP/1.1\r\nTransfer-Encoding: {}\r\n\r\n", value);
            let tokens = tokenize(input.as_bytes(), input.len()).unwrap();
            assert_eq!(
                tokens.last().unwrap().kind,
                TokenKind::Body { chunked: false },
                "value {:?}",
                value
            );
        }
    }

    #[test]
    fn oversize_token_is_rejected() {
        let mut input = b"GET / HTTP/1.1\r\nX-Big: ".to_vec();
        input.extend(std::iter::repeat(b'a').take(10_000));
        input.extend_from_slice(b"\r\n\r\n");
        assert_eq!(tokenize(&input, input.len()), Err(ParseError::BadRequest));
    }

    #[test]
    fn too_many_headers_rejected() {
        let mut input = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..128 {
            input.extend_from_slice(format!("X-{}: v\r\n", i).as_bytes());
        }
        input.extend_from_slice(b"\r\n");
        assert_eq!(tokenize(&input, input.len()), Err(ParseError::BadRequest));
    }

    #[test]
    fn exactly_max_headers_allowed() {
        let mut input = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..127 {
            input.extend_from_slice(format!("X-{}: v\r\n", i).as_bytes());
        }
        input.extend_from_slice(b"\r\n");
        let tokens = tokenize(&input, input.len()).unwrap();
        assert!(matches!(
            tokens.last().unwrap().kind,
            TokenKind::Body { .. }
        ));
    }

    /// Drive a parser through the header phase of `head` and hand back the
    /// parser in chunk mode together with the session buffer.
    fn chunk_fixture(head: &[u8]) -> (Parser, Buffer) {
        let mut parser = Parser::new(limits());
        let mut buf = Buffer::with_capacity(1024, MemCounter::new());
        buf.extend(head);
        loop {
            match parser.parse(buf.bytes()) {
                Parsed::Token(t) => {
                    if t.kind == (TokenKind::Body { chunked: true }) {
                        break;
                    }
                }
                other => panic!("unexpected parse result: {:?}", other),
            }
        }
        parser.start_chunk_mode();
        (parser, buf)
    }

    const CHUNKED_HEAD: &[u8] = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n";

    fn expect_chunk(parser: &mut Parser, buf: &mut Buffer, want: &[u8]) {
        match parser.parse_chunk(buf) {
            Parsed::Token(t) => {
                assert_eq!(t.kind, TokenKind::ChunkBody);
                assert_eq!(&buf.bytes()[t.start..t.start + t.len], want);
            }
            other => panic!("expected chunk {:?}, got {:?}", want, other),
        }
    }

    #[test]
    fn chunked_body_tokens() {
        let (mut parser, mut buf) = chunk_fixture(CHUNKED_HEAD);
        buf.extend(b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n");
        expect_chunk(&mut parser, &mut buf, b"hello");
        expect_chunk(&mut parser, &mut buf, b" world");
        expect_chunk(&mut parser, &mut buf, b"");
    }

    #[test]
    fn chunk_extension_is_skipped() {
        let (mut parser, mut buf) = chunk_fixture(CHUNKED_HEAD);
        buf.extend(b"5;name=value\r\nhello\r\n0\r\n\r\n");
        expect_chunk(&mut parser, &mut buf, b"hello");
        expect_chunk(&mut parser, &mut buf, b"");
    }

    #[test]
    fn split_chunks_reassemble() {
        // Feed the chunked body a few bytes at a time and make sure the
        // delivered chunk bodies concatenate to the payload that was sent.
        let body = b"5\r\nhello\r\n6\r\n world\r\n3\r\n!!!\r\n0\r\n\r\n";
        for step in 1..7 {
            let (mut parser, mut buf) = chunk_fixture(CHUNKED_HEAD);
            let mut collected = Vec::new();
            let mut fed = 0;
            let mut done = false;
            while !done {
                match parser.parse_chunk(&mut buf) {
                    Parsed::Token(t) => {
                        if t.len == 0 {
                            done = true;
                        } else {
                            collected
                                .extend_from_slice(&buf.bytes()[t.start..t.start + t.len]);
                        }
                    }
                    Parsed::Incomplete => {
                        assert!(fed < body.len(), "parser starved at step {}", step);
                        let next = (fed + step).min(body.len());
                        buf.extend(&body[fed..next]);
                        fed = next;
                    }
                    Parsed::Error(e) => panic!("parse error: {}", e),
                }
            }
            assert_eq!(collected, b"hello world!!!", "step {}", step);
        }
    }

    #[test]
    fn compaction_bounds_buffer_growth() {
        let (mut parser, mut buf) = chunk_fixture(CHUNKED_HEAD);
        let body_start = parser.body_start();

        buf.extend(b"5\r\nhello\r\n");
        expect_chunk(&mut parser, &mut buf, b"hello");

        // Start of the next size line, then a dry run: the partial token
        // must land back at body_start, overwriting the consumed chunk.
        buf.extend(b"6\r");
        assert_eq!(parser.parse_chunk(&mut buf), Parsed::Incomplete);
        assert_eq!(buf.filled(), body_start + 2, "partial size line retained");
        assert_eq!(&buf.bytes()[body_start..], b"6\r");

        buf.extend(b"\n world\r\n0\r\n\r\n");
        expect_chunk(&mut parser, &mut buf, b" world");
        expect_chunk(&mut parser, &mut buf, b"");
    }

    #[test]
    fn oversize_chunk_size_rejected() {
        let (mut parser, mut buf) = chunk_fixture(CHUNKED_HEAD);
        buf.extend(b"FFFFFFFF\r\n");
        assert_eq!(
            parser.parse_chunk(&mut buf),
            Parsed::Error(ParseError::PayloadTooLarge)
        );
    }

    #[test]
    fn error_is_sticky() {
        let mut parser = Parser::new(limits());
        let input = b"GET / HTTP/1.1\r\nContent-Length: zz\r\n\r\n";
        assert!(matches!(parser.parse(input), Parsed::Error(_)));
        assert!(matches!(parser.parse(input), Parsed::Error(_)));
    }
}
