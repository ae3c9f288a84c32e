//! Time collaborators: absolute time sync, RTC, uptime and datagrams

use core::future::Future;

/// Timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    /// Unix timestamp in seconds since epoch (1970-01-01 00:00:00 UTC)
    pub unix_secs: u64,
    /// Microseconds component (0-999,999)
    pub micros: u32,
}

impl Timestamp {
    /// Create a new timestamp
    pub const fn new(unix_secs: u64, micros: u32) -> Self {
        Self { unix_secs, micros }
    }

    /// Convert from NTP timestamp (seconds since 1900-01-01)
    ///
    /// Seconds below the Unix epoch offset belong to NTP era 1, which
    /// starts 2036-02-07.
    pub fn from_ntp(ntp_secs: u64, ntp_frac: u32) -> Self {
        /// NTP epoch offset (1900-01-01 to 1970-01-01 in seconds)
        const NTP_UNIX_OFFSET: u64 = 2_208_988_800;
        const NTP_ERA_SECS: u64 = 1 << 32;

        let ntp_secs = if ntp_secs < NTP_UNIX_OFFSET {
            ntp_secs + NTP_ERA_SECS
        } else {
            ntp_secs
        };
        let unix_secs = ntp_secs - NTP_UNIX_OFFSET;
        // Convert NTP fractional part to microseconds (2^-32 seconds)
        let micros = ((ntp_frac as u64 * 1_000_000) >> 32) as u32;
        Self::new(unix_secs, micros)
    }

    /// Shift forward by `micros`, carrying into seconds
    pub fn add_micros(self, micros: u64) -> Self {
        let total = self.micros as u64 + micros;
        Self::new(
            self.unix_secs.saturating_add(total / 1_000_000),
            (total % 1_000_000) as u32,
        )
    }
}

/// Absolute time synchronisation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeSyncError {
    /// No time source answered
    NoResponse,
    /// Every answer was rejected
    InvalidResponse,
    /// The time was obtained but could not be written to the clock
    ClockWriteFailed,
}

impl core::fmt::Display for TimeSyncError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoResponse => write!(f, "No time source answered"),
            Self::InvalidResponse => write!(f, "Invalid time source response"),
            Self::ClockWriteFailed => write!(f, "Clock write failed"),
        }
    }
}

impl core::error::Error for TimeSyncError {}

/// One absolute-time resynchronisation of the device clock
pub trait TimeSync {
    fn sync(&mut self) -> impl Future<Output = Result<Timestamp, TimeSyncError>>;
}

/// RTC operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtcError {
    /// RTC not initialized
    NotInitialized,
    /// RTC hardware error
    HardwareError,
}

/// Battery-backed real-time clock
pub trait RealTimeClock {
    fn set_time(&mut self, timestamp: Timestamp) -> Result<(), RtcError>;
}

/// Free-running time since boot
pub trait MonotonicClock {
    fn now_micros(&self) -> u64;

    fn now_ms(&self) -> u64 {
        self.now_micros() / 1_000
    }
}

/// Datagram errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DatagramError {
    /// Host name could not be resolved
    DnsError,
    /// Socket bind/send/receive error
    SocketError,
}

/// Request/response datagram exchange (UDP)
pub trait DatagramTransport {
    /// Send `request` to `host:port` and wait for one reply from that host
    ///
    /// Returns the number of bytes written into `response`. Callers bound the
    /// wait themselves.
    fn exchange(
        &mut self,
        host: &str,
        port: u16,
        request: &[u8],
        response: &mut [u8],
    ) -> impl Future<Output = Result<usize, DatagramError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ntp_to_unix_conversion() {
        const NTP_UNIX_OFFSET: u64 = 2_208_988_800;
        let ts = Timestamp::from_ntp(NTP_UNIX_OFFSET, 0);
        assert_eq!(ts.unix_secs, 0);
        assert_eq!(ts.micros, 0);

        // Half a second is 2^31 in NTP fraction units
        let ts = Timestamp::from_ntp(NTP_UNIX_OFFSET + 10, 1 << 31);
        assert_eq!(ts.unix_secs, 10);
        assert_eq!(ts.micros, 500_000);
    }

    #[test]
    fn test_ntp_era_rollover() {
        // 2036-02-07 06:28:16 UTC
        let ts = Timestamp::from_ntp(0, 0);
        assert_eq!(ts.unix_secs, 2_085_978_496);

        let ts = Timestamp::from_ntp(100, 0);
        assert_eq!(ts.unix_secs, 2_085_978_596);
    }

    #[test]
    fn test_add_micros_carries() {
        let ts = Timestamp::new(1704067200, 900_000).add_micros(250_000);
        assert_eq!(ts.unix_secs, 1704067201);
        assert_eq!(ts.micros, 150_000);
    }
}
