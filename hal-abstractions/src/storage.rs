//! Durable key-value storage collaborator
//!
//! Backs the device identity: it survives full power loss, unlike the
//! retained memory region.

/// Key-value storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// The storage partition could not be opened
    Unavailable,
    /// Stored value does not fit the caller's buffer
    ValueTooLong,
    /// Writing or erasing a key failed
    WriteFailed,
    /// Pending writes could not be made durable
    CommitFailed,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "Storage unavailable"),
            Self::ValueTooLong => write!(f, "Stored value too long"),
            Self::WriteFailed => write!(f, "Storage write failed"),
            Self::CommitFailed => write!(f, "Storage commit failed"),
        }
    }
}

impl core::error::Error for StorageError {}

/// Non-volatile key-value store
pub trait KeyValueStore {
    /// Copy the value stored under `key` into `buf`
    ///
    /// Returns `Ok(None)` when the key is absent and the value length
    /// otherwise.
    fn get(&mut self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StorageError>;

    /// Stage a write; `None` erases the key
    fn set(&mut self, key: &str, value: Option<&[u8]>) -> Result<(), StorageError>;

    /// Make staged writes durable
    fn commit(&mut self) -> Result<(), StorageError>;
}
