//! Byte-stream transport used to reach the naming service

use core::future::Future;

/// Stream connection errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamError {
    /// Host name could not be resolved
    DnsError,
    /// The remote end refused or did not answer
    ConnectFailed,
}

impl core::fmt::Display for StreamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DnsError => write!(f, "DNS resolution failed"),
            Self::ConnectFailed => write!(f, "Connection failed"),
        }
    }
}

impl core::error::Error for StreamError {}

/// TCP-like stream that can be pointed at a host
///
/// Once [`open`](Self::open) succeeds the `embedded-io-async` halves talk to
/// that host until [`close`](Self::close).
pub trait StreamTransport: embedded_io_async::Read + embedded_io_async::Write {
    /// Resolve `host` and connect to `port`
    fn open(&mut self, host: &str, port: u16) -> impl Future<Output = Result<(), StreamError>>;

    /// Close the connection (idempotent)
    fn close(&mut self);
}
