//! # Session
//!
//! Drives one sensor from connection to fused output.
//!
//! Responsibilities:
//! - Send the device profile's control command sequence
//! - Pull notifications from a `NotificationSource` in arrival order
//! - Decode each payload and feed the synchronizer; bad frames are
//!   logged and skipped
//! - Transport stand-ins: channel-fed source, capture replay, mock device
//!
//! ## Usage Example
//!
//! ```ignore
//! use session::{DeviceSession, MockDevice, RecordingControlChannel, RunLimits, SessionConfig};
//!
//! let mock = MockDevice::for_profile(DeviceProfile::Oh1, Duration::from_secs(5));
//! let mut session = DeviceSession::new(SessionConfig::default(), mock, RecordingControlChannel::new());
//! session.start().await?;
//! let report = session.run(&mut |record| println!("{record:?}"), RunLimits::default()).await;
//! ```

mod capture;
mod error;
mod mock;
mod pacing;
mod session;
mod source;

pub use capture::{decode_capture, encode_capture, read_capture, write_capture, CaptureSource};
pub use error::{CaptureError, Result, SessionError};
pub use mock::{MockDevice, MockDeviceConfig};
pub use session::{
    DeviceSession, NotificationOutcome, RunLimits, SessionConfig, SessionReport, StopReason,
};
pub use source::{ChannelSource, RecordingControlChannel};
