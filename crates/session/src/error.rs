//! Session error types

use std::path::PathBuf;

use contracts::ContractError;
use decoder::DecodeError;
use thiserror::Error;

/// Device session error
///
/// Decode failures of individual notifications are not errors at this
/// level; they surface as `NotificationOutcome::Rejected`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Control command could not be written
    #[error("control command '{command}' failed: {source}")]
    Command {
        command: String,
        #[source]
        source: ContractError,
    },

    /// Capture file is malformed
    #[error("capture file {}: {source}", path.display())]
    Capture {
        path: PathBuf,
        #[source]
        source: CaptureError,
    },

    /// Synthetic frame could not be encoded
    #[error("mock frame encoding failed: {0}")]
    Encode(#[from] DecodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Create command error
    pub fn command(command: impl Into<String>, source: ContractError) -> Self {
        Self::Command {
            command: command.into(),
            source,
        }
    }

    /// Create capture error
    pub fn capture(path: impl Into<PathBuf>, source: CaptureError) -> Self {
        Self::Capture {
            path: path.into(),
            source,
        }
    }
}

/// Capture encoding error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Payload longer than the u16 length prefix can describe
    #[error("record {index} is {len} bytes, limit is {}", u16::MAX)]
    RecordTooLarge { index: usize, len: usize },

    /// Data ends inside a length prefix
    #[error("truncated length prefix after record {records}")]
    TruncatedPrefix { records: usize },

    /// Data ends inside a payload
    #[error("record {index} declares {declared} bytes, {remaining} left")]
    TruncatedRecord {
        index: usize,
        declared: usize,
        remaining: usize,
    },
}

/// Result alias
pub type Result<T> = std::result::Result<T, SessionError>;
