//! SNTP client
//!
//! Tries each configured server with retries, validates the stratum, applies
//! an RTT/2 correction and writes the result to the RTC.

use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;
use sensor_node_hal::{
    DatagramTransport, MonotonicClock, RealTimeClock, TimeSync, TimeSyncError, Timestamp,
};

use super::error::SntpError;

/// SNTP port (UDP 123)
pub const SNTP_PORT: u16 = 123;

/// Size of an SNTP packet without extensions
const NTP_PACKET_LEN: usize = 48;

/// Upper bound on the RTT/2 correction
///
/// An RTT over two seconds points at a broken exchange rather than a slow one.
const MAX_RTT_CORRECTION_MICROS: u64 = 1_000_000;

/// SNTP client configuration
#[derive(Debug, Clone)]
pub struct SntpConfig {
    /// Servers tried in order
    pub servers: &'static [&'static str],
    pub port: u16,
    /// Per-request receive timeout
    pub timeout_ms: u32,
    /// Attempts per server
    pub retry_count: u8,
    /// Delay after a failed attempt
    pub retry_delay_ms: u32,
    /// Maximum accepted stratum
    ///
    /// Stratum 1 = primary servers, 2 = secondary, 3 = tertiary.
    /// 0 (kiss-o'-death) and 16 (unsynchronised) are always rejected.
    pub max_stratum: u8,
}

impl Default for SntpConfig {
    fn default() -> Self {
        Self {
            servers: &["pool.ntp.org", "time.google.com", "time.cloudflare.com"],
            port: SNTP_PORT,
            timeout_ms: 5000,
            retry_count: 3,
            retry_delay_ms: 2000,
            max_stratum: 3,
        }
    }
}

/// SNTP [`TimeSync`] implementation
pub struct SntpClient<T, C, R, D> {
    config: SntpConfig,
    transport: T,
    uptime: C,
    rtc: R,
    delay: D,
}

impl<T, C, R, D> SntpClient<T, C, R, D>
where
    T: DatagramTransport,
    C: MonotonicClock,
    R: RealTimeClock,
    D: DelayNs,
{
    pub fn new(config: SntpConfig, transport: T, uptime: C, rtc: R, delay: D) -> Self {
        Self {
            config,
            transport,
            uptime,
            rtc,
            delay,
        }
    }

    /// Query the servers in order until one answers acceptably
    pub async fn query(&mut self) -> Result<Timestamp, SntpError> {
        info!("Starting SNTP synchronization");
        let mut last_error = SntpError::Timeout;
        for server in self.config.servers {
            for attempt in 0..self.config.retry_count {
                info!(
                    "Attempting SNTP sync with {} (attempt {})",
                    server,
                    attempt + 1
                );
                match self.request(server).await {
                    Ok(timestamp) => {
                        info!(
                            "SNTP sync successful: {}.{:06} UTC",
                            timestamp.unix_secs, timestamp.micros
                        );
                        return Ok(timestamp);
                    }
                    Err(e) => {
                        warn!("SNTP request failed: {:?}", e);
                        last_error = e;
                        // DNS failure will not fix itself within the retry window
                        if e == SntpError::DnsError {
                            break;
                        }
                        self.delay.delay_ms(self.config.retry_delay_ms).await;
                    }
                }
            }
        }
        error!("All SNTP sync attempts failed");
        Err(last_error)
    }

    async fn request(&mut self, server: &str) -> Result<Timestamp, SntpError> {
        let mut packet = [0u8; NTP_PACKET_LEN];
        packet[0] = 0x1B; // LI=0, VN=3, Mode=3 (client)
        let mut response = [0u8; NTP_PACKET_LEN];

        let sent_at = self.uptime.now_micros();
        let exchange = self
            .transport
            .exchange(server, self.config.port, &packet, &mut response);
        let len = match select(exchange, self.delay.delay_ms(self.config.timeout_ms)).await {
            Either::First(result) => result?,
            Either::Second(()) => return Err(SntpError::Timeout),
        };
        let received_at = self.uptime.now_micros();

        let rtt_micros = received_at.saturating_sub(sent_at);
        parse_response(&response[..len], self.config.max_stratum, rtt_micros)
    }
}

/// Parse an SNTP reply and apply the RTT/2 correction
pub fn parse_response(
    response: &[u8],
    max_stratum: u8,
    rtt_micros: u64,
) -> Result<Timestamp, SntpError> {
    if response.len() < NTP_PACKET_LEN {
        return Err(SntpError::InvalidResponse);
    }
    // Server replies carry mode 4
    if response[0] & 0x07 != 4 {
        return Err(SntpError::InvalidResponse);
    }

    let stratum = response[1];
    debug!("NTP server stratum: {}", stratum);
    if stratum == 0 || stratum > max_stratum {
        warn!("Invalid stratum {} (max {})", stratum, max_stratum);
        return Err(SntpError::InvalidStratum(stratum));
    }

    // Transmit timestamp, bytes 40..48
    let secs = u32::from_be_bytes([response[40], response[41], response[42], response[43]]);
    let frac = u32::from_be_bytes([response[44], response[45], response[46], response[47]]);
    if secs == 0 {
        return Err(SntpError::InvalidResponse);
    }

    let correction = (rtt_micros / 2).min(MAX_RTT_CORRECTION_MICROS);
    let timestamp = Timestamp::from_ntp(secs as u64, frac).add_micros(correction);
    debug!(
        "NTP timestamp: {}.{:06} UTC (RTT correction: {} us)",
        timestamp.unix_secs, timestamp.micros, correction
    );
    Ok(timestamp)
}

impl<T, C, R, D> TimeSync for SntpClient<T, C, R, D>
where
    T: DatagramTransport,
    C: MonotonicClock,
    R: RealTimeClock,
    D: DelayNs,
{
    async fn sync(&mut self) -> Result<Timestamp, TimeSyncError> {
        let timestamp = self.query().await.map_err(|e| match e {
            SntpError::InvalidResponse | SntpError::InvalidStratum(_) => {
                TimeSyncError::InvalidResponse
            }
            _ => TimeSyncError::NoResponse,
        })?;
        self.rtc.set_time(timestamp).map_err(|e| {
            error!("Failed to write RTC: {:?}", e);
            TimeSyncError::ClockWriteFailed
        })?;
        Ok(timestamp)
    }
}
