//! Measurement wire schema
//!
//! The byte layout of a published measurement belongs to the schema
//! encoder, not to the cycle. [`PostcardEncoder`] is the shipped encoding;
//! boards speaking another schema provide their own [`MeasurementEncoder`].

use crate::measurement::Measurement;

/// Buffer size that fits any encoded measurement
pub const MAX_ENCODED_LEN: usize = 64;

/// A measurement could not be encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// The output buffer is too small
    BufferFull,
    /// The schema rejected a field value
    InvalidField,
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferFull => write!(f, "Encode buffer full"),
            Self::InvalidField => write!(f, "Field rejected by schema"),
        }
    }
}

impl core::error::Error for EncodeError {}

/// Encodes one measurement record
pub trait MeasurementEncoder {
    /// Encode `measurement` into `buf`, returning the written prefix
    fn encode<'b>(
        &mut self,
        measurement: &Measurement,
        buf: &'b mut [u8],
    ) -> Result<&'b [u8], EncodeError>;
}

/// `postcard` encoding of [`Measurement`] in declaration order
///
/// Floats are little-endian IEEE 754, integers are varints.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostcardEncoder;

impl MeasurementEncoder for PostcardEncoder {
    fn encode<'b>(
        &mut self,
        measurement: &Measurement,
        buf: &'b mut [u8],
    ) -> Result<&'b [u8], EncodeError> {
        match postcard::to_slice(measurement, buf) {
            Ok(bytes) => Ok(bytes),
            Err(postcard::Error::SerializeBufferFull) => Err(EncodeError::BufferFull),
            Err(_) => Err(EncodeError::InvalidField),
        }
    }
}
