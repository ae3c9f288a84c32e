//! Measurement record

use serde::Serialize;

/// Firmware version triple stamped onto transmitted measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl FirmwareVersion {
    /// Version of this build, taken from the package manifest
    pub const CURRENT: Self = Self {
        major: parse_component(env!("CARGO_PKG_VERSION_MAJOR")),
        minor: parse_component(env!("CARGO_PKG_VERSION_MINOR")),
        patch: parse_component(env!("CARGO_PKG_VERSION_PATCH")),
    };

    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// Decimal version component; saturates at `u8::MAX`
const fn parse_component(digits: &str) -> u8 {
    let bytes = digits.as_bytes();
    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        value = value * 10 + (bytes[i] - b'0') as u32;
        if value > u8::MAX as u32 {
            return u8::MAX;
        }
        i += 1;
    }
    value as u8
}

/// One environmental reading
///
/// Sensor fields are set at acquisition; `firmware` stays zero until the
/// transmission pipeline stamps it right before encoding. Field order is the
/// wire order of the measurement schema.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Ambient light in lux
    pub illuminance_lux: f32,
    /// Relative humidity in percent
    pub humidity_percent: f32,
    /// Air temperature in °C
    pub temperature_c: f32,
    /// Raw soil moisture reading
    pub soil_moisture: u32,
    /// Raw salinity reading
    pub salinity: u32,
    pub firmware: FirmwareVersion,
}

impl Measurement {
    /// Copy of this reading carrying `firmware`
    pub fn stamped(&self, firmware: FirmwareVersion) -> Self {
        Self { firmware, ..*self }
    }
}
