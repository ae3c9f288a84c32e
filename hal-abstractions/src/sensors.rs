//! Environmental sensor collaborators

use core::future::Future;

/// Sensor bus and read errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// The shared sensor bus did not respond
    BusUnavailable,
    /// A sensor did not answer or returned a transient failure
    ReadFailed,
    /// A sensor answered with a value outside its physical range
    OutOfRange,
}

impl core::fmt::Display for SensorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BusUnavailable => write!(f, "Sensor bus unavailable"),
            Self::ReadFailed => write!(f, "Sensor read failed"),
            Self::OutOfRange => write!(f, "Sensor value out of range"),
        }
    }
}

impl core::error::Error for SensorError {}

/// The sensors sharing the node's sensor bus
///
/// The bus must be initialised with [`init_bus`](Self::init_bus) after the
/// sensor power rail comes up and before any read.
pub trait EnvironmentSensors {
    /// Bring up the sensor bus and the devices on it
    fn init_bus(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Ambient light in lux
    fn illuminance(&mut self) -> impl Future<Output = Result<f32, SensorError>>;

    /// Relative humidity in percent and temperature in °C, read together
    fn humidity_temperature(&mut self) -> impl Future<Output = Result<(f32, f32), SensorError>>;

    /// Raw soil moisture ADC reading
    fn soil_moisture(&mut self) -> impl Future<Output = Result<u32, SensorError>>;

    /// Raw salinity ADC reading
    fn salinity(&mut self) -> impl Future<Output = Result<u32, SensorError>>;
}
