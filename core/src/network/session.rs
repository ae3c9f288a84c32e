//! Link session manager
//!
//! Associates the link with the stored credentials and polls it up to a
//! timeout. Both the clock-sync and the transmission phase call
//! [`NetworkSession::ensure_connected`]; once the link is up the second call
//! returns without a new association.

use embedded_hal_async::delay::DelayNs;
use sensor_node_hal::{Credentials, LinkStatus, NetworkLink};

use crate::config::NetworkConfig;

use super::error::NetworkError;

/// Proof that the link was up when returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Connected;

/// Per-cycle link session
pub struct NetworkSession<'a> {
    config: &'a NetworkConfig,
    credentials: Option<Credentials>,
    connected: bool,
    attempts: u32,
}

impl<'a> NetworkSession<'a> {
    /// Create a session; `credentials` are the ones read from storage
    pub fn new(config: &'a NetworkConfig, credentials: Option<Credentials>) -> Self {
        Self {
            config,
            credentials,
            connected: false,
            attempts: 0,
        }
    }

    /// Association attempts made this cycle
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Bring the link up unless it already is
    pub async fn ensure_connected<L, D>(
        &mut self,
        link: &mut L,
        delay: &mut D,
    ) -> Result<Connected, NetworkError>
    where
        L: NetworkLink,
        D: DelayNs,
    {
        if self.connected && link.status() == LinkStatus::Connected {
            debug!("Link already up");
            return Ok(Connected);
        }
        self.connected = false;
        self.attempts += 1;

        match &self.credentials {
            Some(_) if link.status() == LinkStatus::Connected => {
                debug!("Link already associated");
            }
            Some(creds) => {
                info!("Connecting to {}", creds.ssid.as_str());
                link.begin(&creds.ssid, &creds.passphrase);
                self.wait_for(link, delay, |status| status != LinkStatus::Connected)
                    .await?;
            }
            None => {
                // The link may still come up from its own cache
                debug!("No stored credentials, checking link state");
                self.wait_for(link, delay, |status| status == LinkStatus::Connecting)
                    .await?;
            }
        }

        if link.status() == LinkStatus::Connected {
            info!("Link is UP");
            self.connected = true;
            Ok(Connected)
        } else if self.credentials.is_none() {
            warn!("Link down and no credentials stored");
            Err(NetworkError::NoCredentials)
        } else {
            warn!("Failed to connect link");
            Err(NetworkError::Timeout)
        }
    }

    /// Poll the link while `pending` holds, up to the connect timeout
    async fn wait_for<L, D>(
        &self,
        link: &mut L,
        delay: &mut D,
        pending: impl Fn(LinkStatus) -> bool,
    ) -> Result<(), NetworkError>
    where
        L: NetworkLink,
        D: DelayNs,
    {
        let step_ms = self.config.poll_interval_ms.max(1);
        let mut waited_ms: u32 = 0;
        while pending(link.status()) {
            delay.delay_ms(step_ms).await;
            waited_ms = waited_ms.saturating_add(step_ms);
            if waited_ms > self.config.connect_timeout_ms {
                warn!("Link not up after {} ms", waited_ms);
                return Err(NetworkError::Timeout);
            }
        }
        Ok(())
    }

    /// Disconnect and switch the radio off
    pub fn shutdown<L: NetworkLink>(&mut self, link: &mut L) {
        link.disconnect();
        link.power_down();
        self.connected = false;
    }
}
