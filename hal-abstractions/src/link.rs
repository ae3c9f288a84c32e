//! Link-layer network association collaborator

use core::future::Future;

use heapless::{String, Vec};

/// Longest SSID accepted (IEEE 802.11)
pub const MAX_SSID_LEN: usize = 32;

/// Longest passphrase accepted (WPA2 personal)
pub const MAX_PASSPHRASE_LEN: usize = 64;

/// Most access points kept from one scan
pub const MAX_SCAN_RESULTS: usize = 16;

/// Access points found by [`NetworkLink::scan`]
pub type ScanResults = Vec<AccessPoint, MAX_SCAN_RESULTS>;

/// Association state reported by the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// Associated and holding an address
    Connected,
    /// Association or address acquisition in progress
    Connecting,
    /// Not associated
    Disconnected,
    /// The last association attempt was rejected
    ConnectFailed,
}

/// Network credentials pair
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Credentials {
    pub ssid: String<MAX_SSID_LEN>,
    pub passphrase: String<MAX_PASSPHRASE_LEN>,
}

impl Credentials {
    /// Build a credentials pair, `None` if either part exceeds its bound
    pub fn new(ssid: &str, passphrase: &str) -> Option<Self> {
        let mut creds = Self {
            ssid: String::new(),
            passphrase: String::new(),
        };
        creds.ssid.push_str(ssid).ok()?;
        creds.passphrase.push_str(passphrase).ok()?;
        Some(creds)
    }
}

/// One access point seen during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccessPoint {
    pub ssid: String<MAX_SSID_LEN>,
    /// Signal strength in dBm
    pub rssi: i8,
    /// Whether the network requires a passphrase
    pub secured: bool,
}

/// Station-mode network link
///
/// The link does not persist credentials; the caller owns that. Some links
/// reconnect on their own using an internal cache, so [`status`](Self::status)
/// may report `Connected` without a call to [`begin`](Self::begin).
pub trait NetworkLink {
    /// Start associating with the given network (non-blocking)
    fn begin(&mut self, ssid: &str, passphrase: &str);

    /// Current association state
    fn status(&mut self) -> LinkStatus;

    /// Drop the association
    fn disconnect(&mut self);

    /// Switch the radio off
    fn power_down(&mut self);

    /// Scan for nearby networks
    fn scan(&mut self) -> impl Future<Output = ScanResults>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_bounds() {
        assert!(Credentials::new("home", "secret").is_some());

        let long_ssid = "an-ssid-that-is-longer-than-thirty-two-bytes";
        assert!(Credentials::new(long_ssid, "secret").is_none());
    }
}
