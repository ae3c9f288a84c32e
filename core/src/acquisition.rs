//! Measurement acquisition
//!
//! Powers the sensors, brings up their bus and takes one reading of every
//! sensor. The sensor rail is switched off again on every return path.

use embedded_hal_async::delay::DelayNs;
use sensor_node_hal::{EnvironmentSensors, SensorError, SensorPower};

use crate::config::AcquisitionConfig;
use crate::measurement::{FirmwareVersion, Measurement};

/// The sensor that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sensor {
    Illuminance,
    HumidityTemperature,
    SoilMoisture,
    Salinity,
}

/// A reading could not be taken this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionError {
    /// The sensor bus never came up within the configured attempt bound
    BusUnavailable { attempts: u32 },
    /// One sensor read failed
    Read { sensor: Sensor, cause: SensorError },
}

impl core::fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BusUnavailable { attempts } => {
                write!(f, "Sensor bus unavailable after {} attempts", attempts)
            }
            Self::Read { sensor, cause } => write!(f, "{:?} read failed: {}", sensor, cause),
        }
    }
}

impl core::error::Error for AcquisitionError {}

/// Takes one measurement per call
pub struct Acquisition<'a> {
    config: &'a AcquisitionConfig,
}

impl<'a> Acquisition<'a> {
    pub fn new(config: &'a AcquisitionConfig) -> Self {
        Self { config }
    }

    /// Take one measurement
    ///
    /// The firmware version is left zero; the transmission pipeline stamps it.
    pub async fn acquire<P, S, D>(
        &self,
        power: &mut P,
        sensors: &mut S,
        delay: &mut D,
    ) -> Result<Measurement, AcquisitionError>
    where
        P: SensorPower,
        S: EnvironmentSensors,
        D: DelayNs,
    {
        info!("Powering on to take measurement");
        power.enable();
        delay.delay_ms(self.config.power_up_delay_ms).await;

        let result = self.read_all(sensors, delay).await;
        power.disable();

        match &result {
            Ok(m) => debug!(
                "Measured {} lux, {} %RH, {} C, soil {}, salt {}",
                m.illuminance_lux,
                m.humidity_percent,
                m.temperature_c,
                m.soil_moisture,
                m.salinity
            ),
            Err(e) => warn!("Failed measurement: {:?}", e),
        }
        result
    }

    async fn read_all<S: EnvironmentSensors, D: DelayNs>(
        &self,
        sensors: &mut S,
        delay: &mut D,
    ) -> Result<Measurement, AcquisitionError> {
        self.init_bus(sensors, delay).await?;

        // The humidity sensor needs time after bus bring-up before it answers
        delay.delay_ms(self.config.settle_delay_ms).await;

        let illuminance_lux = sensors.illuminance().await.map_err(|cause| AcquisitionError::Read {
            sensor: Sensor::Illuminance,
            cause,
        })?;
        let (humidity_percent, temperature_c) =
            sensors.humidity_temperature().await.map_err(|cause| AcquisitionError::Read {
                sensor: Sensor::HumidityTemperature,
                cause,
            })?;
        let soil_moisture = sensors.soil_moisture().await.map_err(|cause| AcquisitionError::Read {
            sensor: Sensor::SoilMoisture,
            cause,
        })?;
        let salinity = sensors.salinity().await.map_err(|cause| AcquisitionError::Read {
            sensor: Sensor::Salinity,
            cause,
        })?;

        Ok(Measurement {
            illuminance_lux,
            humidity_percent,
            temperature_c,
            soil_moisture,
            salinity,
            firmware: FirmwareVersion::default(),
        })
    }

    /// Retry bus bring-up with a fixed backoff
    ///
    /// Unbounded unless `max_bus_init_attempts` is set: nothing else can
    /// proceed without the bus.
    async fn init_bus<S: EnvironmentSensors, D: DelayNs>(
        &self,
        sensors: &mut S,
        delay: &mut D,
    ) -> Result<(), AcquisitionError> {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            match sensors.init_bus().await {
                Ok(()) => {
                    debug!("Sensor bus up after {} attempt(s)", attempts);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Sensor bus init failed: {:?}", e);
                    if let Some(max) = self.config.max_bus_init_attempts {
                        if attempts >= max {
                            return Err(AcquisitionError::BusUnavailable { attempts });
                        }
                    }
                }
            }
            delay.delay_ms(self.config.bus_retry_delay_ms).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDelay, MockPower, MockSensors};
    use embassy_futures::block_on;

    #[test]
    fn test_acquire_reads_all_sensors() {
        let config = AcquisitionConfig::default();
        let mut power = MockPower::default();
        let mut sensors = MockSensors::default();
        let mut delay = MockDelay::default();

        let m = block_on(Acquisition::new(&config).acquire(&mut power, &mut sensors, &mut delay))
            .unwrap();

        assert_eq!(m.illuminance_lux, sensors.illuminance);
        assert_eq!(m.humidity_percent, sensors.humidity);
        assert_eq!(m.temperature_c, sensors.temperature);
        assert_eq!(m.soil_moisture, sensors.soil);
        assert_eq!(m.salinity, sensors.salt);
        assert_eq!(m.firmware, FirmwareVersion::default());

        assert!(!power.enabled);
        assert_eq!(power.enable_count, 1);
        // Power-up delay plus settling delay
        assert_eq!(delay.elapsed_ms, 1000 + 2500);
    }

    #[test]
    fn test_bus_init_retries_until_it_responds() {
        let config = AcquisitionConfig::default();
        let mut power = MockPower::default();
        let mut sensors = MockSensors {
            bus_failures: 7,
            ..MockSensors::default()
        };
        let mut delay = MockDelay::default();

        let result = block_on(Acquisition::new(&config).acquire(&mut power, &mut sensors, &mut delay));

        assert!(result.is_ok());
        assert_eq!(sensors.bus_init_calls, 8);
        assert_eq!(delay.elapsed_ms, 1000 + 7 * 200 + 2500);
    }

    #[test]
    fn test_bounded_bus_init_gives_up() {
        let config = AcquisitionConfig {
            max_bus_init_attempts: Some(3),
            ..AcquisitionConfig::default()
        };
        let mut power = MockPower::default();
        let mut sensors = MockSensors {
            bus_failures: u32::MAX,
            ..MockSensors::default()
        };
        let mut delay = MockDelay::default();

        let result = block_on(Acquisition::new(&config).acquire(&mut power, &mut sensors, &mut delay));

        assert_eq!(result, Err(AcquisitionError::BusUnavailable { attempts: 3 }));
        assert_eq!(sensors.bus_init_calls, 3);
        assert!(!power.enabled);
    }

    #[test]
    fn test_read_failure_powers_down_rail() {
        let config = AcquisitionConfig::default();
        let mut power = MockPower::default();
        let mut sensors = MockSensors {
            failing: Some(Sensor::HumidityTemperature),
            ..MockSensors::default()
        };
        let mut delay = MockDelay::default();

        let result = block_on(Acquisition::new(&config).acquire(&mut power, &mut sensors, &mut delay));

        assert_eq!(
            result,
            Err(AcquisitionError::Read {
                sensor: Sensor::HumidityTemperature,
                cause: SensorError::ReadFailed,
            })
        );
        assert!(!power.enabled);
        assert_eq!(power.disable_count, 1);
    }
}
