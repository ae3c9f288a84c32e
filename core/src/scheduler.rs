//! Cycle scheduler
//!
//! Last step of every cycle: powers the peripherals down, settles the clock
//! accumulator and computes the next wake-up. The board then writes the
//! retained image and suspends.

use sensor_node_hal::{NetworkLink, SensorPower};

use crate::config::{ScheduleConfig, BATCH_CAPACITY};
use crate::retained::RetainedState;

/// What the cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// A measurement was added to the batch
    Measured,
    /// Acquisition failed, the batch is unchanged
    MeasurementFailed,
    /// The batch was transmitted and emptied
    Drained { sent: usize, skipped: usize },
    /// The link or the publish session could not be established
    TransmitFailed,
}

/// Next suspension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeSchedule {
    /// Time to sleep
    pub sleep_ms: u64,
    /// Time this cycle was awake, for reporting only
    pub active_ms: u64,
    /// Amount added to the clock-sync accumulator
    pub clock_advanced_ms: u64,
}

pub struct Scheduler<'a> {
    config: &'a ScheduleConfig,
}

impl<'a> Scheduler<'a> {
    pub fn new(config: &'a ScheduleConfig) -> Self {
        Self { config }
    }

    /// Power down, advance the accumulator and compute the next wake
    ///
    /// The accumulator moves by one interval per batched measurement, and
    /// only when a batch is drained. The sleep is always one full interval.
    pub fn schedule_next_wake<P, L>(
        &self,
        state: &mut RetainedState,
        outcome: &CycleOutcome,
        active_ms: u64,
        power: &mut P,
        link: &mut L,
    ) -> WakeSchedule
    where
        P: SensorPower,
        L: NetworkLink,
    {
        power.disable();
        link.disconnect();
        link.power_down();

        let interval = self.config.measurement_interval_ms;
        let clock_advanced_ms = match outcome {
            CycleOutcome::Drained { .. } => interval.saturating_mul(BATCH_CAPACITY as u64),
            CycleOutcome::Measured
            | CycleOutcome::MeasurementFailed
            | CycleOutcome::TransmitFailed => 0,
        };
        state.advance_clock_timer(clock_advanced_ms);

        let schedule = WakeSchedule {
            sleep_ms: interval,
            active_ms,
            clock_advanced_ms,
        };
        info!(
            "Sleeping {} ms after {:?} (awake {} ms, {} measurement(s) batched)",
            schedule.sleep_ms,
            outcome,
            active_ms,
            state.batch_count()
        );
        schedule
    }
}
