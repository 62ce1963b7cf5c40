//! Transport boundary
//!
//! The BLE transport is an external collaborator. The session only needs
//! an ordered, duplicate-free stream of notification payloads and a way
//! to write command bytes to the control characteristic.

use bytes::Bytes;

use crate::{ContractError, ControlCommand};

/// Ordered source of raw data-characteristic notifications
///
/// Push-based transports (BLE notify callbacks) feed a channel and expose
/// the receiving end through this trait.
#[trait_variant::make(NotificationSource: Send)]
pub trait LocalNotificationSource {
    /// Next payload in device transmission order; `None` when the stream ended
    async fn next_notification(&mut self) -> Option<Bytes>;
}

/// Control characteristic writer
#[trait_variant::make(ControlChannel: Send)]
pub trait LocalControlChannel {
    /// Write one command. Acknowledgements are not interpreted.
    async fn send_command(&mut self, command: &ControlCommand) -> Result<(), ContractError>;
}
