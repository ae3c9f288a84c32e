//! Provisioning-mode collaborators

use crate::link::Credentials;

/// Automatic credential pairing (e.g. a smart-config style broadcast)
pub trait PairingProtocol {
    /// Start listening for a pairing peer
    fn start(&mut self);

    /// Credentials delivered by a peer, once pairing is done
    fn poll(&mut self) -> Option<Credentials>;

    /// Stop listening
    fn stop(&mut self);
}

/// The button that requests provisioning when held during boot
pub trait ProvisioningButton {
    fn is_held(&mut self) -> bool;
}
