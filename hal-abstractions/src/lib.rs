//! Hardware abstraction traits for the sensor node
//!
//! This crate defines the collaborators the node cycle drives. A board
//! support package implements them over its drivers and bundles them through
//! [`Board`]. It has NO hardware dependencies.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod board;
pub mod link;
pub mod naming;
pub mod pairing;
pub mod power;
pub mod publish;
pub mod sensors;
pub mod storage;
pub mod time;

pub use board::{Board, BoardParts};
pub use link::{
    AccessPoint, Credentials, LinkStatus, NetworkLink, ScanResults, MAX_PASSPHRASE_LEN,
    MAX_SCAN_RESULTS, MAX_SSID_LEN,
};
pub use naming::{StreamError, StreamTransport};
pub use pairing::{PairingProtocol, ProvisioningButton};
pub use power::{Hibernate, SensorPower};
pub use publish::{Broker, PublishError, PublishTransport};
pub use sensors::{EnvironmentSensors, SensorError};
pub use storage::{KeyValueStore, StorageError};
pub use time::{
    DatagramError, DatagramTransport, MonotonicClock, RealTimeClock, RtcError, TimeSync,
    TimeSyncError, Timestamp,
};
