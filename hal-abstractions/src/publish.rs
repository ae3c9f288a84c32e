//! Publish/subscribe transport collaborator

use core::future::Future;

/// Broker endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Broker {
    /// Broker hostname (for DNS)
    pub host: &'static str,
    /// Broker port (typically 1883 for plain MQTT)
    pub port: u16,
}

/// Publish transport errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// Broker unreachable or CONNECT rejected
    ConnectionFailed,
    /// Publish attempted without a session
    NotConnected,
    /// The broker did not accept a publication
    PublishFailed,
}

impl core::fmt::Display for PublishError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "Publish session connection failed"),
            Self::NotConnected => write!(f, "Publish session not connected"),
            Self::PublishFailed => write!(f, "Publish failed"),
        }
    }
}

impl core::error::Error for PublishError {}

/// MQTT-style publish session
pub trait PublishTransport {
    /// Open a session with `broker` identified as `client_id`
    fn connect(
        &mut self,
        broker: &Broker,
        client_id: &str,
    ) -> impl Future<Output = Result<(), PublishError>>;

    /// Publish one payload to `topic`
    fn publish(&mut self, topic: &str, payload: &[u8]) -> impl Future<Output = Result<(), PublishError>>;

    /// Tear the session down
    fn disconnect(&mut self) -> impl Future<Output = ()>;
}
