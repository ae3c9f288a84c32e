//! Wake cycle orchestration
//!
//! [`SensorNode::boot`] is everything one wake does between reset and
//! suspension:
//!
//! 1. restore the retained state (cold boot on a blank or damaged image),
//! 2. run provisioning if the button is held,
//! 3. resync the clock if due,
//! 4. take a measurement unless the batch is already full,
//! 5. with a full batch, connect, resolve the sensor name and transmit,
//! 6. power down and compute the next wake.
//!
//! The board then passes the returned image and schedule to
//! [`SensorNode::suspend`], which does not return.

use sensor_node_hal::{Board, BoardParts, Hibernate, MonotonicClock, ProvisioningButton};

use crate::acquisition::Acquisition;
use crate::clock::{ClockGate, SyncResult};
use crate::config::NodeConfig;
use crate::identity::{DeviceStore, IdentityResolver};
use crate::network::NetworkSession;
use crate::provisioning::Provisioning;
use crate::retained::{RetainedImage, RetainedState};
use crate::scheduler::{CycleOutcome, Scheduler, WakeSchedule};
use crate::schema::{MeasurementEncoder, PostcardEncoder};
use crate::transmit::{TransmissionPipeline, TransmitOutcome};

/// Summary of one wake cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Result of the last clock-sync attempt this cycle
    pub clock: SyncResult,
    pub schedule: WakeSchedule,
    /// Provisioning ran and stored new credentials
    pub provisioned: bool,
}

/// A sensor node running on board `B`
pub struct SensorNode<'c, B: Board, E = PostcardEncoder> {
    config: &'c NodeConfig,
    board: BoardParts<B>,
    encoder: E,
}

impl<'c, B: Board> SensorNode<'c, B> {
    /// Node with the `postcard` measurement encoding
    pub fn new(config: &'c NodeConfig, board: BoardParts<B>) -> Self {
        Self::with_encoder(config, board, PostcardEncoder)
    }
}

impl<'c, B: Board, E: MeasurementEncoder> SensorNode<'c, B, E> {
    pub fn with_encoder(config: &'c NodeConfig, board: BoardParts<B>, encoder: E) -> Self {
        Self {
            config,
            board,
            encoder,
        }
    }

    pub fn board(&self) -> &BoardParts<B> {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut BoardParts<B> {
        &mut self.board
    }

    /// Run one wake cycle from the retained `image`
    ///
    /// Returns the image to retain and the cycle report.
    pub async fn boot(&mut self, image: &[u8]) -> (RetainedImage, CycleReport) {
        let started_ms = self.board.uptime.now_ms();
        info!(
            "Firmware version {}.{}.{}",
            self.config.firmware.major, self.config.firmware.minor, self.config.firmware.patch
        );

        let mut state = RetainedState::restore_or_cold_boot(image);

        let mut provisioned = false;
        if self.board.button.is_held() {
            let b = &mut self.board;
            match Provisioning::new(&self.config.provisioning)
                .run(&mut b.store, &mut b.link, &mut b.pairing, &mut b.console, &mut b.delay)
                .await
            {
                Ok(_) => provisioned = true,
                Err(e) => error!("Provisioning failed: {:?}", e),
            }
        }

        let mut report = self.run_cycle(&mut state, started_ms).await;
        report.provisioned = provisioned;
        (state.snapshot(), report)
    }

    /// One cycle on an already restored state
    ///
    /// `started_ms` is the uptime at wake, used for the active-time estimate.
    pub async fn run_cycle(&mut self, state: &mut RetainedState, started_ms: u64) -> CycleReport {
        let config = self.config;
        let b = &mut self.board;

        let credentials = match DeviceStore::new(&mut b.store).read_credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!("Cannot read stored credentials: {:?}", e);
                None
            }
        };
        let mut session = NetworkSession::new(&config.network, credentials);
        let gate = ClockGate::new(&config.clock);

        let mut clock = gate
            .run(state, &mut session, &mut b.link, &mut b.time_sync, &mut b.delay)
            .await;

        let mut outcome = CycleOutcome::Measured;
        if !state.is_batch_full() {
            outcome = match Acquisition::new(&config.acquisition)
                .acquire(&mut b.power, &mut b.sensors, &mut b.delay)
                .await
            {
                Ok(measurement) => match state.record_measurement(measurement) {
                    Ok(()) => {
                        info!("Batched measurement {}", state.batch_count());
                        CycleOutcome::Measured
                    }
                    Err(e) => {
                        error!("Dropping measurement: {:?}", e);
                        CycleOutcome::MeasurementFailed
                    }
                },
                Err(_) => CycleOutcome::MeasurementFailed,
            };
        }

        if state.is_batch_full() {
            info!("Batch full, transmitting");
            outcome = match session.ensure_connected(&mut b.link, &mut b.delay).await {
                Err(e) => {
                    warn!("Cannot transmit without a link: {:?}", e);
                    CycleOutcome::TransmitFailed
                }
                Ok(_) => {
                    if gate.is_due(state) {
                        clock = gate
                            .run(state, &mut session, &mut b.link, &mut b.time_sync, &mut b.delay)
                            .await;
                    }

                    let name = IdentityResolver::new(&config.naming)
                        .resolve_name(&mut b.store, &mut b.naming)
                        .await;

                    match TransmissionPipeline::new(&config.transmit, config.firmware, &mut self.encoder)
                        .transmit(state, &name, &mut b.publisher, &mut b.delay)
                        .await
                    {
                        TransmitOutcome::Completed { sent, skipped } => {
                            CycleOutcome::Drained { sent, skipped }
                        }
                        TransmitOutcome::ConnectFailed { .. } => CycleOutcome::TransmitFailed,
                    }
                }
            };
        }

        if session.is_connected() {
            session.shutdown(&mut b.link);
        }

        let active_ms = b.uptime.now_ms().saturating_sub(started_ms);
        let schedule = Scheduler::new(&config.schedule).schedule_next_wake(
            state,
            &outcome,
            active_ms,
            &mut b.power,
            &mut b.link,
        );

        CycleReport {
            outcome,
            clock,
            schedule,
            provisioned: false,
        }
    }

    /// Hand the image to the board and suspend until the next wake
    pub fn suspend(&mut self, image: &RetainedImage, schedule: &WakeSchedule) -> ! {
        info!("Suspending for {} ms", schedule.sleep_ms);
        self.board.hibernate.hibernate(image, schedule.sleep_ms)
    }
}
