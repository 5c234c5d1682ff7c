//! Startup-time server configuration.
//!
//! Every knob has a compile-time default matching the traditional behaviour
//! of small embedded HTTP servers; hosts that need different limits build a
//! `Config` by hand and pass it to `Server::bind`.

/// Initial size in bytes of the per-connection read buffer. The buffer grows
/// geometrically when a request does not fit, so this only needs to cover the
/// common case.
pub const REQUEST_BUF_SIZE: usize = 1024;

/// Initial size in bytes of the response buffer.
pub const RESPONSE_BUF_SIZE: usize = 512;

/// Seconds a connection may sit idle mid-request before it is dropped.
pub const REQUEST_TIMEOUT: u32 = 20;

/// Seconds an idle keep-alive connection is held after a completed response.
pub const KEEP_ALIVE_TIMEOUT: u32 = 120;

/// Maximum declared request body size in bytes. Bodies are buffered in full,
/// so large uploads are better served by chunked encoding.
pub const MAX_CONTENT_LENGTH: u64 = 8 * 1024 * 1024;

/// Total read/write buffer memory allowed across all live connections before
/// new requests are refused with 503.
pub const MAX_TOTAL_EST_MEM_USAGE: i64 = 4 * 1024 * 1024 * 1024;

/// Maximum length of any single non-body token: method, target, header name,
/// header value.
pub const MAX_TOKEN_LENGTH: usize = 8 * 1024;

/// Maximum number of headers in a request.
pub const MAX_HEADER_COUNT: u32 = 127;

/// Tunable server parameters. `Config::default()` matches the constants
/// above.
#[derive(Debug, Clone)]
pub struct Config {
    pub request_buf_size: usize,
    pub response_buf_size: usize,
    /// Inactivity timeout in seconds while a request is in flight.
    pub request_timeout: u32,
    /// Inactivity timeout in seconds for idle keep-alive connections.
    pub keep_alive_timeout: u32,
    pub max_content_length: u64,
    pub max_total_mem_usage: i64,
    pub max_token_length: usize,
    pub max_header_count: u32,
    /// Ignore `SIGPIPE` process-wide so writes to a hung-up peer surface as
    /// errors. Hosts that install their own handler can opt out.
    pub ignore_sigpipe: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            request_buf_size: REQUEST_BUF_SIZE,
            response_buf_size: RESPONSE_BUF_SIZE,
            request_timeout: REQUEST_TIMEOUT,
            keep_alive_timeout: KEEP_ALIVE_TIMEOUT,
            max_content_length: MAX_CONTENT_LENGTH,
            max_total_mem_usage: MAX_TOTAL_EST_MEM_USAGE,
            max_token_length: MAX_TOKEN_LENGTH,
            max_header_count: MAX_HEADER_COUNT,
            ignore_sigpipe: true,
        }
    }
}
