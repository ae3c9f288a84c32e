//! Board bundle
//!
//! A board support package names its driver types once through [`Board`] and
//! hands the node one [`BoardParts`] value built at boot.

use embedded_hal_async::delay::DelayNs;

use crate::link::NetworkLink;
use crate::naming::StreamTransport;
use crate::pairing::{PairingProtocol, ProvisioningButton};
use crate::power::{Hibernate, SensorPower};
use crate::publish::PublishTransport;
use crate::sensors::EnvironmentSensors;
use crate::storage::KeyValueStore;
use crate::time::{MonotonicClock, TimeSync};

/// Driver types of one board
pub trait Board {
    type Power: SensorPower;
    type Sensors: EnvironmentSensors;
    type Store: KeyValueStore;
    type Link: NetworkLink;
    type TimeSync: TimeSync;
    type Naming: StreamTransport;
    type Publisher: PublishTransport;
    type Delay: DelayNs;
    type Uptime: MonotonicClock;
    /// Line-oriented provisioning peer (usually the debug UART)
    type Console: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write;
    type Pairing: PairingProtocol;
    type Button: ProvisioningButton;
    type Hibernate: Hibernate;
}

/// Driver instances of one board, live for a single cycle
pub struct BoardParts<B: Board> {
    pub power: B::Power,
    pub sensors: B::Sensors,
    pub store: B::Store,
    pub link: B::Link,
    pub time_sync: B::TimeSync,
    pub naming: B::Naming,
    pub publisher: B::Publisher,
    pub delay: B::Delay,
    pub uptime: B::Uptime,
    pub console: B::Console,
    pub pairing: B::Pairing,
    pub button: B::Button,
    pub hibernate: B::Hibernate,
}
