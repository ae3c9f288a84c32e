//! Batch transmission
//!
//! Opens a publish session under the sensor name, publishes every batched
//! measurement to `{topic_root}/{sensor name}` and empties the batch.
//!
//! A measurement that cannot be encoded or published is logged and dropped;
//! it is not retried or re-queued. The batch is only left untouched when the
//! session could not be opened at all.

use embedded_hal_async::delay::DelayNs;
use sensor_node_hal::PublishTransport;

use crate::config::TransmitConfig;
use crate::measurement::FirmwareVersion;
use crate::network::format_topic;
use crate::retained::RetainedState;
use crate::schema::{MeasurementEncoder, MAX_ENCODED_LEN};

/// Result of one transmission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitOutcome {
    /// Every connection attempt failed; the batch is kept for the next cycle
    ConnectFailed { attempts: u8 },
    /// The batch was drained
    Completed { sent: usize, skipped: usize },
}

pub struct TransmissionPipeline<'a, E> {
    config: &'a TransmitConfig,
    firmware: FirmwareVersion,
    encoder: &'a mut E,
}

impl<'a, E: MeasurementEncoder> TransmissionPipeline<'a, E> {
    pub fn new(config: &'a TransmitConfig, firmware: FirmwareVersion, encoder: &'a mut E) -> Self {
        Self {
            config,
            firmware,
            encoder,
        }
    }

    /// Publish the batch held in `state` under `identity`
    pub async fn transmit<P, D>(
        &mut self,
        state: &mut RetainedState,
        identity: &str,
        publisher: &mut P,
        delay: &mut D,
    ) -> TransmitOutcome
    where
        P: PublishTransport,
        D: DelayNs,
    {
        if let Err(attempts) = self.connect(identity, publisher, delay).await {
            error!("Giving up on publish session after {} attempts", attempts);
            return TransmitOutcome::ConnectFailed { attempts };
        }

        let mut sent = 0;
        let mut skipped = 0;
        match format_topic(self.config.topic_root, identity) {
            Ok(topic) => {
                for (index, measurement) in state.batch().iter().enumerate() {
                    let stamped = measurement.stamped(self.firmware);
                    let mut buf = [0u8; MAX_ENCODED_LEN];
                    let payload = match self.encoder.encode(&stamped, &mut buf) {
                        Ok(payload) => payload,
                        Err(e) => {
                            error!("Failed to encode measurement {}: {:?}", index, e);
                            skipped += 1;
                            continue;
                        }
                    };
                    match publisher.publish(&topic, payload).await {
                        Ok(()) => {
                            debug!("Published measurement {} ({} bytes)", index, payload.len());
                            sent += 1;
                        }
                        Err(e) => {
                            error!("Failed to publish measurement {}: {:?}", index, e);
                            skipped += 1;
                        }
                    }
                }
            }
            Err(e) => {
                error!("Cannot publish under '{}': {:?}", identity, e);
                skipped = state.batch_count();
            }
        }

        info!("Sent {} measurement(s), skipped {}", sent, skipped);
        state.reset_batch();
        publisher.disconnect().await;
        TransmitOutcome::Completed { sent, skipped }
    }

    /// Bounded connect retry; `Err` carries the attempts made
    async fn connect<P, D>(&self, identity: &str, publisher: &mut P, delay: &mut D) -> Result<(), u8>
    where
        P: PublishTransport,
        D: DelayNs,
    {
        let max = self.config.max_connect_attempts;
        info!(
            "Connecting publish session to {}:{}",
            self.config.broker.host, self.config.broker.port
        );
        for attempt in 1..=max {
            match publisher.connect(&self.config.broker, identity).await {
                Ok(()) => {
                    info!("Publish session connected as '{}'", identity);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Publish connect attempt {}/{} failed: {:?}", attempt, max, e);
                    if attempt < max {
                        delay.delay_ms(self.config.connect_retry_delay_ms).await;
                    }
                }
            }
        }
        Err(max)
    }
}
