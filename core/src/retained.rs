//! Retained cycle state
//!
//! The only data that survives suspension. The board keeps it as a fixed
//! byte image in memory that is preserved across suspension but lost on
//! power loss; every boot restores the state from that image and every
//! suspend writes a fresh snapshot back.
//!
//! # Image layout (version 1, little endian)
//!
//! ```text
//! offset  size  field
//! 0       4     magic "SNOD"
//! 4       1     layout version
//! 5       1     batch count
//! 6       2     reserved (zero)
//! 8       8     ms since last clock sync
//! 16      24*N  measurement slots (unused slots zeroed)
//! 16+24N  4     FNV-1a checksum of all preceding bytes
//! ```
//!
//! A slot is illuminance, humidity, temperature (f32 each), soil and
//! salinity (u32 each), firmware major/minor/patch (u8 each) and one pad byte.
//!
//! Any image that fails validation (wrong length or magic, unknown version,
//! bad checksum, impossible count) is treated as a cold boot.

use crate::config::BATCH_CAPACITY;
use crate::measurement::{FirmwareVersion, Measurement};

const MAGIC: [u8; 4] = *b"SNOD";
const LAYOUT_VERSION: u8 = 1;
const HEADER_LEN: usize = 16;
const SLOT_LEN: usize = 24;
const CHECKSUM_OFFSET: usize = HEADER_LEN + SLOT_LEN * BATCH_CAPACITY;

/// Size of the retained image in bytes
pub const RETAINED_IMAGE_LEN: usize = CHECKSUM_OFFSET + 4;

/// Serialized retained state
pub type RetainedImage = [u8; RETAINED_IMAGE_LEN];

/// The batch already holds [`BATCH_CAPACITY`] measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityError;

impl core::fmt::Display for CapacityError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Measurement batch is full")
    }
}

impl core::error::Error for CapacityError {}

/// Reasons an image is not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RestoreError {
    /// Image is not [`RETAINED_IMAGE_LEN`] bytes long
    Length,
    /// No state was ever written (fresh power-up)
    NoMagic,
    /// Written by a firmware with another layout
    UnsupportedVersion(u8),
    /// Image was damaged
    Checksum,
    /// Batch count larger than the batch capacity
    Count(u8),
}

impl core::fmt::Display for RestoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Length => write!(f, "Retained image has the wrong length"),
            Self::NoMagic => write!(f, "Retained image is blank"),
            Self::UnsupportedVersion(v) => write!(f, "Unsupported retained layout {}", v),
            Self::Checksum => write!(f, "Retained image checksum mismatch"),
            Self::Count(c) => write!(f, "Retained batch count {} out of range", c),
        }
    }
}

impl core::error::Error for RestoreError {}

/// State carried from one wake cycle to the next
///
/// Every mutation leaves the state structurally valid, so a snapshot taken
/// at any point is a consistent image.
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedState {
    batch: [Measurement; BATCH_CAPACITY],
    batch_count: usize,
    time_since_clock_sync_ms: u64,
}

impl Default for RetainedState {
    fn default() -> Self {
        Self::cold_boot()
    }
}

impl RetainedState {
    /// State after a full power loss: empty batch, zero accumulator
    pub const fn cold_boot() -> Self {
        Self {
            batch: [Measurement {
                illuminance_lux: 0.0,
                humidity_percent: 0.0,
                temperature_c: 0.0,
                soil_moisture: 0,
                salinity: 0,
                firmware: FirmwareVersion::new(0, 0, 0),
            }; BATCH_CAPACITY],
            batch_count: 0,
            time_since_clock_sync_ms: 0,
        }
    }

    /// Append `measurement` to the batch
    ///
    /// A full batch is left untouched.
    pub fn record_measurement(&mut self, measurement: Measurement) -> Result<(), CapacityError> {
        if self.is_batch_full() {
            return Err(CapacityError);
        }
        self.batch[self.batch_count] = measurement;
        self.batch_count += 1;
        Ok(())
    }

    pub fn is_batch_full(&self) -> bool {
        self.batch_count >= BATCH_CAPACITY
    }

    /// Drop all measurements (slots are only invalidated, not wiped)
    pub fn reset_batch(&mut self) {
        self.batch_count = 0;
    }

    /// Valid measurements, oldest first
    pub fn batch(&self) -> &[Measurement] {
        &self.batch[..self.batch_count]
    }

    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    pub fn advance_clock_timer(&mut self, delta_ms: u64) {
        self.time_since_clock_sync_ms = self.time_since_clock_sync_ms.saturating_add(delta_ms);
    }

    pub fn reset_clock_timer(&mut self) {
        self.time_since_clock_sync_ms = 0;
    }

    pub fn time_since_clock_sync_ms(&self) -> u64 {
        self.time_since_clock_sync_ms
    }

    /// Decode a retained image
    pub fn restore(image: &[u8]) -> Result<Self, RestoreError> {
        if image.len() != RETAINED_IMAGE_LEN {
            return Err(RestoreError::Length);
        }
        if image[0..4] != MAGIC {
            return Err(RestoreError::NoMagic);
        }
        if image[4] != LAYOUT_VERSION {
            return Err(RestoreError::UnsupportedVersion(image[4]));
        }
        let stored = u32::from_le_bytes(read_array(image, CHECKSUM_OFFSET));
        if stored != checksum(&image[..CHECKSUM_OFFSET]) {
            return Err(RestoreError::Checksum);
        }
        let count = image[5];
        if count as usize > BATCH_CAPACITY {
            return Err(RestoreError::Count(count));
        }

        let mut state = Self::cold_boot();
        state.batch_count = count as usize;
        state.time_since_clock_sync_ms = u64::from_le_bytes(read_array(image, 8));
        for (i, slot) in state.batch.iter_mut().take(count as usize).enumerate() {
            *slot = decode_slot(&image[HEADER_LEN + i * SLOT_LEN..][..SLOT_LEN]);
        }
        Ok(state)
    }

    /// Decode a retained image, falling back to a cold boot state
    pub fn restore_or_cold_boot(image: &[u8]) -> Self {
        match Self::restore(image) {
            Ok(state) => {
                debug!(
                    "Retained state restored: {} measurements, {} ms since clock sync",
                    state.batch_count,
                    state.time_since_clock_sync_ms
                );
                state
            }
            Err(RestoreError::NoMagic) => {
                info!("No retained state, cold boot");
                Self::cold_boot()
            }
            Err(e) => {
                warn!("Discarding retained state: {:?}", e);
                Self::cold_boot()
            }
        }
    }

    /// Encode the state into a retained image
    pub fn snapshot(&self) -> RetainedImage {
        let mut image = [0u8; RETAINED_IMAGE_LEN];
        image[0..4].copy_from_slice(&MAGIC);
        image[4] = LAYOUT_VERSION;
        image[5] = self.batch_count as u8;
        image[8..16].copy_from_slice(&self.time_since_clock_sync_ms.to_le_bytes());
        for (i, m) in self.batch().iter().enumerate() {
            encode_slot(m, &mut image[HEADER_LEN + i * SLOT_LEN..][..SLOT_LEN]);
        }
        let sum = checksum(&image[..CHECKSUM_OFFSET]);
        image[CHECKSUM_OFFSET..].copy_from_slice(&sum.to_le_bytes());
        image
    }
}

fn encode_slot(m: &Measurement, slot: &mut [u8]) {
    slot[0..4].copy_from_slice(&m.illuminance_lux.to_le_bytes());
    slot[4..8].copy_from_slice(&m.humidity_percent.to_le_bytes());
    slot[8..12].copy_from_slice(&m.temperature_c.to_le_bytes());
    slot[12..16].copy_from_slice(&m.soil_moisture.to_le_bytes());
    slot[16..20].copy_from_slice(&m.salinity.to_le_bytes());
    slot[20] = m.firmware.major;
    slot[21] = m.firmware.minor;
    slot[22] = m.firmware.patch;
}

fn decode_slot(slot: &[u8]) -> Measurement {
    Measurement {
        illuminance_lux: f32::from_le_bytes(read_array(slot, 0)),
        humidity_percent: f32::from_le_bytes(read_array(slot, 4)),
        temperature_c: f32::from_le_bytes(read_array(slot, 8)),
        soil_moisture: u32::from_le_bytes(read_array(slot, 12)),
        salinity: u32::from_le_bytes(read_array(slot, 16)),
        firmware: FirmwareVersion::new(slot[20], slot[21], slot[22]),
    }
}

fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

/// 32-bit FNV-1a
fn checksum(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5, |hash, &b| {
        (hash ^ b as u32).wrapping_mul(0x0100_0193)
    })
}
