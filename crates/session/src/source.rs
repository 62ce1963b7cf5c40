//! Channel-backed transport adapters

use async_channel::{bounded, Receiver, Sender};
use bytes::Bytes;
use contracts::{ContractError, ControlChannel, ControlCommand, NotificationSource};
use tracing::{debug, info};

/// Notification source fed through a channel
///
/// BLE stacks deliver notifications through callbacks; the callback
/// pushes each payload into the sender and the session pulls from here.
/// The stream ends once every sender is dropped and the channel drained.
#[derive(Debug, Clone)]
pub struct ChannelSource {
    rx: Receiver<Bytes>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<Bytes>) -> Self {
        Self { rx }
    }

    /// Create a bounded channel and the source reading from it
    pub fn bounded(capacity: usize) -> (Sender<Bytes>, Self) {
        let (tx, rx) = bounded(capacity.max(1));
        (tx, Self::new(rx))
    }

    /// Payloads waiting in the channel
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl NotificationSource for ChannelSource {
    async fn next_notification(&mut self) -> Option<Bytes> {
        match self.rx.recv().await {
            Ok(payload) => Some(payload),
            Err(_) => {
                debug!("notification channel closed");
                None
            }
        }
    }
}

/// Control channel that records and logs every command
///
/// Stands in for the control characteristic when no live transport is
/// attached (mock runs, capture replays).
#[derive(Debug, Default, Clone)]
pub struct RecordingControlChannel {
    sent: Vec<ControlCommand>,
    fail_on: Option<String>,
}

impl RecordingControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the command with this name
    pub fn failing_on(name: impl Into<String>) -> Self {
        Self {
            sent: Vec::new(),
            fail_on: Some(name.into()),
        }
    }

    /// Commands written so far, in order
    pub fn sent(&self) -> &[ControlCommand] {
        &self.sent
    }
}

impl ControlChannel for RecordingControlChannel {
    async fn send_command(&mut self, command: &ControlCommand) -> Result<(), ContractError> {
        if self.fail_on.as_deref() == Some(command.name.as_str()) {
            return Err(ContractError::command(&command.name, "rejected by control channel"));
        }
        info!(command = %command.name, bytes = ?command.bytes, "control command");
        self.sent.push(command.clone());
        Ok(())
    }
}
