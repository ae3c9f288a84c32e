//! Provisioning mode
//!
//! Entered when the provisioning button is held at boot. Stored identity is
//! wiped, nearby networks are listed on the console and credentials are
//! accepted from whichever source delivers first: the automatic pairing
//! protocol, or two lines typed on the console (SSID, then passphrase).

use core::fmt::Write as _;

use embedded_hal_async::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};
use heapless::{String, Vec};
use sensor_node_hal::{
    Credentials, KeyValueStore, NetworkLink, PairingProtocol, ScanResults, MAX_PASSPHRASE_LEN,
    MAX_SSID_LEN,
};

use crate::config::ProvisioningConfig;
use crate::identity::{DeviceStore, IdentityError};

/// Provisioning errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProvisioningError {
    /// Clearing or persisting the identity failed
    Identity(IdentityError),
    /// Console read or write failed
    Console,
}

impl core::fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Identity(e) => write!(f, "Provisioning storage error: {}", e),
            Self::Console => write!(f, "Provisioning console error"),
        }
    }
}

impl core::error::Error for ProvisioningError {}

impl From<IdentityError> for ProvisioningError {
    fn from(e: IdentityError) -> Self {
        ProvisioningError::Identity(e)
    }
}

/// Assembles SSID and passphrase from console bytes
///
/// `\r` is ignored and `\n` ends a line. Blank lines before the SSID are
/// skipped; the passphrase line may be empty for open networks. A line that
/// exceeds its bound or is not UTF-8 is dropped and that field is read again.
#[derive(Debug, Default)]
pub struct CredentialLines {
    line: Vec<u8, MAX_PASSPHRASE_LEN>,
    overflow: bool,
    ssid: Option<String<MAX_SSID_LEN>>,
}

impl CredentialLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the SSID line has been accepted
    pub fn has_ssid(&self) -> bool {
        self.ssid.is_some()
    }

    /// Feed one byte; yields the credentials once both lines are complete
    pub fn push(&mut self, byte: u8) -> Option<Credentials> {
        match byte {
            b'\r' => None,
            b'\n' => self.end_line(),
            _ => {
                if self.line.push(byte).is_err() {
                    self.overflow = true;
                }
                None
            }
        }
    }

    fn end_line(&mut self) -> Option<Credentials> {
        let overflow = core::mem::take(&mut self.overflow);
        let line = core::mem::take(&mut self.line);
        let bound = if self.ssid.is_none() {
            MAX_SSID_LEN
        } else {
            MAX_PASSPHRASE_LEN
        };
        if overflow || line.len() > bound {
            warn!("Console line longer than {} bytes, enter it again", bound);
            return None;
        }
        let Ok(text) = core::str::from_utf8(&line) else {
            warn!("Console line is not UTF-8, enter it again");
            return None;
        };

        match self.ssid.take() {
            None if text.is_empty() => None,
            None => {
                self.ssid = String::try_from(text).ok();
                None
            }
            Some(ssid) => {
                let mut passphrase = String::new();
                // Bounded above
                let _ = passphrase.push_str(text);
                Some(Credentials { ssid, passphrase })
            }
        }
    }
}

/// Runs provisioning mode to completion
pub struct Provisioning<'a> {
    config: &'a ProvisioningConfig,
}

impl<'a> Provisioning<'a> {
    pub fn new(config: &'a ProvisioningConfig) -> Self {
        Self { config }
    }

    /// Wipe the identity, obtain credentials and persist them
    ///
    /// Waits until one of the sources delivers.
    pub async fn run<K, L, P, C, D>(
        &self,
        store: &mut K,
        link: &mut L,
        pairing: &mut P,
        console: &mut C,
        delay: &mut D,
    ) -> Result<Credentials, ProvisioningError>
    where
        K: KeyValueStore,
        L: NetworkLink,
        P: PairingProtocol,
        C: Read + ReadReady + Write,
        D: DelayNs,
    {
        info!("Entering provisioning mode");
        let mut device = DeviceStore::new(store);
        device.clear()?;

        link.disconnect();
        let networks = link.scan().await;
        report_networks(console, &networks)?;
        write_line(console, "Starting config...")?;
        write_line(console, "Enter SSID:")?;

        pairing.start();
        let result = self.wait_for_credentials(pairing, console, delay).await;
        pairing.stop();
        let credentials = result?;

        info!("Got SSID: {}", credentials.ssid.as_str());
        device.write_credentials(
            Some(credentials.ssid.as_str()),
            Some(credentials.passphrase.as_str()),
        )?;
        write_line(console, "Credentials saved")?;
        Ok(credentials)
    }

    async fn wait_for_credentials<P, C, D>(
        &self,
        pairing: &mut P,
        console: &mut C,
        delay: &mut D,
    ) -> Result<Credentials, ProvisioningError>
    where
        P: PairingProtocol,
        C: Read + ReadReady + Write,
        D: DelayNs,
    {
        let mut lines = CredentialLines::new();
        let mut chunk = [0u8; 16];
        loop {
            while console.read_ready().map_err(|_| ProvisioningError::Console)? {
                let n = console
                    .read(&mut chunk)
                    .map_err(|_| ProvisioningError::Console)?;
                if n == 0 {
                    break;
                }
                let had_ssid = lines.has_ssid();
                for &byte in &chunk[..n] {
                    if let Some(credentials) = lines.push(byte) {
                        debug!("Credentials received on console");
                        return Ok(credentials);
                    }
                }
                if !had_ssid && lines.has_ssid() {
                    write_line(console, "Enter passphrase:")?;
                }
            }

            if let Some(credentials) = pairing.poll() {
                debug!("Credentials received by pairing");
                return Ok(credentials);
            }

            delay.delay_ms(self.config.poll_interval_ms).await;
        }
    }
}

fn write_line<C: Write>(console: &mut C, line: &str) -> Result<(), ProvisioningError> {
    console
        .write_all(line.as_bytes())
        .and_then(|()| console.write_all(b"\r\n"))
        .map_err(|_| ProvisioningError::Console)
}

fn report_networks<C: Write>(console: &mut C, networks: &ScanResults) -> Result<(), ProvisioningError> {
    write_line(console, "** Scan Networks **")?;
    let mut line: String<80> = String::new();
    // Lines are sized for the longest SSID
    let _ = write!(line, "SSID List: {}", networks.len());
    write_line(console, &line)?;
    for (index, network) in networks.iter().enumerate() {
        line.clear();
        let _ = write!(
            line,
            "{}) Network: {} ({} dBm{})",
            index,
            network.ssid.as_str(),
            network.rssi,
            if network.secured { ", secured" } else { "" }
        );
        write_line(console, &line)?;
    }
    Ok(())
}
