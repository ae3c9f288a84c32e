//! Clock synchronisation gate
//!
//! Decides whether the absolute clock needs a resync and performs it. The
//! accumulator in the retained state is only reset when the resync succeeds,
//! so a failed attempt is retried on the next wake.

use embedded_hal_async::delay::DelayNs;
use sensor_node_hal::{NetworkLink, TimeSync, TimeSyncError, Timestamp};

use crate::config::ClockConfig;
use crate::network::{NetworkError, NetworkSession};
use crate::retained::RetainedState;

/// Whether `elapsed_ms` since the last resync has reached `threshold_ms`
pub const fn is_sync_due(elapsed_ms: u64, threshold_ms: u64) -> bool {
    elapsed_ms >= threshold_ms
}

/// Why a due resync did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncFailure {
    Network(NetworkError),
    TimeSync(TimeSyncError),
}

/// Result of one pass through the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncResult {
    NotDue,
    Synced(Timestamp),
    Failed(SyncFailure),
}

pub struct ClockGate<'a> {
    config: &'a ClockConfig,
}

impl<'a> ClockGate<'a> {
    pub fn new(config: &'a ClockConfig) -> Self {
        Self { config }
    }

    pub fn is_due(&self, state: &RetainedState) -> bool {
        is_sync_due(state.time_since_clock_sync_ms(), self.config.sync_threshold_ms)
    }

    /// Resync the clock if due
    ///
    /// Brings the link up through `session`; calling this again on a session
    /// that is already connected does not re-associate.
    pub async fn run<L, T, D>(
        &self,
        state: &mut RetainedState,
        session: &mut NetworkSession<'_>,
        link: &mut L,
        time_sync: &mut T,
        delay: &mut D,
    ) -> SyncResult
    where
        L: NetworkLink,
        T: TimeSync,
        D: DelayNs,
    {
        if !self.is_due(state) {
            trace!(
                "Clock sync not due ({} ms elapsed)",
                state.time_since_clock_sync_ms()
            );
            return SyncResult::NotDue;
        }

        info!("Updating absolute time");
        if let Err(e) = session.ensure_connected(link, delay).await {
            warn!("No link for clock sync: {:?}", e);
            return SyncResult::Failed(SyncFailure::Network(e));
        }

        match time_sync.sync().await {
            Ok(timestamp) => {
                info!("Updated RTC: {}.{:06} UTC", timestamp.unix_secs, timestamp.micros);
                state.reset_clock_timer();
                SyncResult::Synced(timestamp)
            }
            Err(e) => {
                warn!("Failed to update RTC: {:?}", e);
                SyncResult::Failed(SyncFailure::TimeSync(e))
            }
        }
    }
}
