//! Network error types

use sensor_node_hal::{DatagramError, RtcError, StreamError};

/// Link session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkError {
    /// The link did not come up within the connect timeout
    Timeout,
    /// No credentials are stored and the link is not up on its own
    NoCredentials,
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "Link connect timeout"),
            Self::NoCredentials => write!(f, "No network credentials"),
        }
    }
}

impl core::error::Error for NetworkError {}

/// Naming service errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NamingError {
    /// Could not reach the naming service
    Connect(StreamError),
    /// Socket read/write failed mid-request
    Io,
    /// Response exceeded the receive buffer
    ResponseTooLong,
    /// Malformed HTTP response
    InvalidResponse,
    /// Non-200 HTTP status
    Status(u16),
    /// Body is empty, too long or not a valid name
    InvalidName,
}

impl core::fmt::Display for NamingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "Naming service unreachable: {}", e),
            Self::Io => write!(f, "Naming service I/O error"),
            Self::ResponseTooLong => write!(f, "Naming service response too long"),
            Self::InvalidResponse => write!(f, "Invalid naming service response"),
            Self::Status(code) => write!(f, "Naming service returned status {}", code),
            Self::InvalidName => write!(f, "Naming service returned an invalid name"),
        }
    }
}

impl core::error::Error for NamingError {}

impl From<StreamError> for NamingError {
    fn from(e: StreamError) -> Self {
        NamingError::Connect(e)
    }
}

/// Errors of a single SNTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SntpError {
    /// DNS resolution failed
    DnsError,
    /// Socket bind/send/receive error
    SocketError,
    /// No reply within the request timeout
    Timeout,
    /// Short or malformed reply
    InvalidResponse,
    /// Unsynchronised or too distant server
    InvalidStratum(u8),
    /// RTC write failed
    Rtc(RtcError),
}

impl core::fmt::Display for SntpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DnsError => write!(f, "DNS resolution failed"),
            Self::SocketError => write!(f, "Socket error"),
            Self::Timeout => write!(f, "Request timeout"),
            Self::InvalidResponse => write!(f, "Invalid response"),
            Self::InvalidStratum(s) => write!(f, "Invalid stratum {}", s),
            Self::Rtc(_) => write!(f, "RTC write failed"),
        }
    }
}

impl core::error::Error for SntpError {}

impl From<DatagramError> for SntpError {
    fn from(e: DatagramError) -> Self {
        match e {
            DatagramError::DnsError => SntpError::DnsError,
            DatagramError::SocketError => SntpError::SocketError,
        }
    }
}

impl From<RtcError> for SntpError {
    fn from(e: RtcError) -> Self {
        SntpError::Rtc(e)
    }
}
