//! Wake cycle logic for a battery powered sensor node
//!
//! Each wake is a fresh boot. Whatever the node needs to remember between
//! wakes (the measurement batch and the time since the last clock resync)
//! travels through a small retained memory image; identity and credentials
//! live in durable storage. Hardware is reached only through the traits of
//! `sensor-node-hal`, so this crate has NO hardware dependencies.
//!
//! The entry point is [`SensorNode`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

pub mod acquisition;
pub mod clock;
pub mod config;
pub mod identity;
pub mod measurement;
pub mod network;
pub mod node;
pub mod provisioning;
pub mod retained;
pub mod scheduler;
pub mod schema;
pub mod transmit;

#[cfg(test)]
mod testing;

pub use acquisition::{Acquisition, AcquisitionError};
pub use clock::{is_sync_due, ClockGate, SyncResult};
pub use config::{NodeConfig, BATCH_CAPACITY};
pub use identity::{IdentityResolver, SensorName};
pub use measurement::{FirmwareVersion, Measurement};
pub use node::{CycleReport, SensorNode};
pub use retained::{RetainedImage, RetainedState, RETAINED_IMAGE_LEN};
pub use scheduler::{CycleOutcome, WakeSchedule};
pub use schema::{MeasurementEncoder, PostcardEncoder};
pub use transmit::{TransmissionPipeline, TransmitOutcome};
