//! Node configuration structures
//!
//! One [`NodeConfig`] is built at boot and passed by reference to every
//! component. `Default` holds the reference deployment values.

use sensor_node_hal::Broker;

use crate::measurement::FirmwareVersion;

/// Measurements collected before a transmission attempt
///
/// Shared by the retained batch, acquisition and transmission.
pub const BATCH_CAPACITY: usize = 5;

/// Complete node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Version stamped onto every transmitted measurement
    pub firmware: FirmwareVersion,
    pub schedule: ScheduleConfig,
    pub acquisition: AcquisitionConfig,
    pub clock: ClockConfig,
    pub network: NetworkConfig,
    pub naming: NamingConfig,
    pub transmit: TransmitConfig,
    pub provisioning: ProvisioningConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            firmware: FirmwareVersion::CURRENT,
            schedule: ScheduleConfig::default(),
            acquisition: AcquisitionConfig::default(),
            clock: ClockConfig::default(),
            network: NetworkConfig::default(),
            naming: NamingConfig::default(),
            transmit: TransmitConfig::default(),
            provisioning: ProvisioningConfig::default(),
        }
    }
}

/// Suspend scheduling
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Sleep between two wake cycles in milliseconds
    pub measurement_interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            measurement_interval_ms: 2 * 60 * 1000,
        }
    }
}

/// Sensor power-up and bus bring-up timing
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Wait after switching the sensor rail on
    pub power_up_delay_ms: u32,
    /// Backoff between sensor bus initialisation attempts
    pub bus_retry_delay_ms: u32,
    /// Bus initialisation attempts before giving up, `None` retries forever
    pub max_bus_init_attempts: Option<u32>,
    /// Settling time the humidity sensor needs after bus bring-up
    pub settle_delay_ms: u32,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            power_up_delay_ms: 1000,
            bus_retry_delay_ms: 200,
            max_bus_init_attempts: None,
            settle_delay_ms: 2500,
        }
    }
}

/// Absolute clock resynchronisation
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Elapsed time after which a resync is attempted
    pub sync_threshold_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            sync_threshold_ms: 60 * 60 * 1000,
        }
    }
}

/// Link association
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Give up associating after this long
    pub connect_timeout_ms: u32,
    /// Interval between link status polls
    pub poll_interval_ms: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 20 * 1000,
            poll_interval_ms: 500,
        }
    }
}

/// Naming service used to obtain a sensor name
#[derive(Debug, Clone)]
pub struct NamingConfig {
    pub host: &'static str,
    pub port: u16,
    /// Request path returning the next free sensor name
    pub path: &'static str,
    /// Name used when none is stored and the service fails
    pub fallback_name: &'static str,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            host: "ttgo-server",
            port: 1234,
            path: "/sensors/next/",
            fallback_name: "DEFAULT",
        }
    }
}

/// Batch transmission
#[derive(Debug, Clone)]
pub struct TransmitConfig {
    pub broker: Broker,
    /// Topic prefix; measurements go to `{topic_root}/{sensor name}`
    pub topic_root: &'static str,
    /// Publish session connection attempts per cycle
    pub max_connect_attempts: u8,
    /// Wait after a failed connection attempt
    pub connect_retry_delay_ms: u32,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            broker: Broker {
                host: "ttgo-server",
                port: 1883,
            },
            topic_root: "sensors",
            max_connect_attempts: 5,
            connect_retry_delay_ms: 5000,
        }
    }
}

/// Provisioning mode
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    /// Interval between checks of the console and the pairing protocol
    pub poll_interval_ms: u32,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 20,
        }
    }
}
