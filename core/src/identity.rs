//! Device identity
//!
//! The sensor name and link credentials live in the durable key-value store,
//! not in retained memory. [`IdentityResolver`] picks the name a cycle
//! publishes under and never fails: a missing name is requested from the
//! naming service, and if that fails too the configured fallback is used.

use heapless::String;
use sensor_node_hal::{
    Credentials, KeyValueStore, StorageError, StreamTransport, MAX_PASSPHRASE_LEN, MAX_SSID_LEN,
};

use crate::config::NamingConfig;
use crate::network::NamingClient;

/// Maximum sensor name length in bytes
pub const MAX_SENSOR_NAME_LEN: usize = 32;

/// Name a node publishes under
pub type SensorName = String<MAX_SENSOR_NAME_LEN>;

/// Store key of the sensor name
pub const SENSOR_NAME_KEY: &str = "sname";
/// Store key of the link SSID
pub const SSID_KEY: &str = "ssid";
/// Store key of the link passphrase
pub const PASSPHRASE_KEY: &str = "pwd";

/// Identity storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdentityError {
    Storage(StorageError),
    /// A stored value is not valid UTF-8 or breaks the name rules
    InvalidValue,
}

impl core::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "Identity storage error: {}", e),
            Self::InvalidValue => write!(f, "Invalid stored identity value"),
        }
    }
}

impl core::error::Error for IdentityError {}

impl From<StorageError> for IdentityError {
    fn from(e: StorageError) -> Self {
        IdentityError::Storage(e)
    }
}

/// Parse a sensor name
///
/// Surrounding whitespace and one pair of surrounding double quotes are
/// stripped. The name must be non-empty, at most [`MAX_SENSOR_NAME_LEN`]
/// bytes and usable as a single topic level.
pub fn parse_sensor_name(raw: &str) -> Option<SensorName> {
    let mut name = raw.trim();
    if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
        name = name[1..name.len() - 1].trim();
    }
    if name.is_empty() || name.contains(['+', '#', '/', '\0']) {
        return None;
    }
    SensorName::try_from(name).ok()
}

/// Typed access to the identity keys of a [`KeyValueStore`]
pub struct DeviceStore<'s, K> {
    store: &'s mut K,
}

impl<'s, K: KeyValueStore> DeviceStore<'s, K> {
    pub fn new(store: &'s mut K) -> Self {
        Self { store }
    }

    fn read_str<const N: usize>(&mut self, key: &str) -> Result<Option<String<N>>, IdentityError> {
        let mut buf = [0u8; N];
        let Some(len) = self.store.get(key, &mut buf)? else {
            return Ok(None);
        };
        let value = core::str::from_utf8(&buf[..len]).map_err(|_| IdentityError::InvalidValue)?;
        String::try_from(value)
            .map(Some)
            .map_err(|_| IdentityError::InvalidValue)
    }

    pub fn read_sensor_name(&mut self) -> Result<Option<SensorName>, IdentityError> {
        match self.read_str::<MAX_SENSOR_NAME_LEN>(SENSOR_NAME_KEY)? {
            Some(raw) => parse_sensor_name(&raw)
                .map(Some)
                .ok_or(IdentityError::InvalidValue),
            None => Ok(None),
        }
    }

    /// Persist and commit the sensor name
    pub fn write_sensor_name(&mut self, name: &str) -> Result<(), IdentityError> {
        self.store.set(SENSOR_NAME_KEY, Some(name.as_bytes()))?;
        self.store.commit()?;
        Ok(())
    }

    /// Stored link credentials; both keys must be present
    pub fn read_credentials(&mut self) -> Result<Option<Credentials>, IdentityError> {
        let Some(ssid) = self.read_str::<MAX_SSID_LEN>(SSID_KEY)? else {
            return Ok(None);
        };
        let Some(passphrase) = self.read_str::<MAX_PASSPHRASE_LEN>(PASSPHRASE_KEY)? else {
            return Ok(None);
        };
        Ok(Some(Credentials { ssid, passphrase }))
    }

    /// Write or erase (`None`) each credential independently, then commit
    pub fn write_credentials(
        &mut self,
        ssid: Option<&str>,
        passphrase: Option<&str>,
    ) -> Result<(), IdentityError> {
        if ssid.is_some_and(|s| s.len() > MAX_SSID_LEN)
            || passphrase.is_some_and(|p| p.len() > MAX_PASSPHRASE_LEN)
        {
            return Err(IdentityError::InvalidValue);
        }
        self.store.set(SSID_KEY, ssid.map(str::as_bytes))?;
        self.store.set(PASSPHRASE_KEY, passphrase.map(str::as_bytes))?;
        self.store.commit()?;
        Ok(())
    }

    /// Erase name and credentials
    pub fn clear(&mut self) -> Result<(), IdentityError> {
        for key in [SENSOR_NAME_KEY, SSID_KEY, PASSPHRASE_KEY] {
            self.store.set(key, None)?;
        }
        self.store.commit()?;
        Ok(())
    }
}

/// Determines the name a cycle publishes under
pub struct IdentityResolver<'a> {
    config: &'a NamingConfig,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(config: &'a NamingConfig) -> Self {
        Self { config }
    }

    /// Stored name, else a fresh one from the naming service, else the fallback
    ///
    /// Needs an up link for the naming service path.
    pub async fn resolve_name<K, S>(&self, store: &mut K, naming: &mut S) -> SensorName
    where
        K: KeyValueStore,
        S: StreamTransport,
    {
        let mut device = DeviceStore::new(store);
        match device.read_sensor_name() {
            Ok(Some(name)) => {
                debug!("Using stored sensor name '{}'", name.as_str());
                return name;
            }
            Ok(None) => debug!("No stored sensor name"),
            Err(e) => warn!("Ignoring stored sensor name: {:?}", e),
        }

        match NamingClient::new(self.config).fetch_name(naming).await {
            Ok(name) => {
                info!("Retrieved new sensor name: {}", name.as_str());
                if let Err(e) = device.write_sensor_name(&name) {
                    warn!("Failed to save sensor name: {:?}", e);
                }
                name
            }
            Err(_) => {
                warn!("Failed to get sensor name. Using {}", self.config.fallback_name);
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> SensorName {
        parse_sensor_name(self.config.fallback_name).unwrap_or_else(|| {
            let mut name = SensorName::new();
            // "DEFAULT" always fits
            let _ = name.push_str("DEFAULT");
            name
        })
    }
}
