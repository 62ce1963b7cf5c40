//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! sample types, the fused output record, sink and transport traits,
//! device profiles and the session configuration blueprint.
//! Business crates depend on this crate only, never the other way round.
//!
//! ## Time Model
//! - Device clock counts microseconds; samples carry it truncated to
//!   whole milliseconds (`Timestamp`)
//! - Queue order is notification order; nothing here re-sorts samples

mod blueprint;
mod error;
mod fused;
mod layout;
mod profile;
mod sample;
mod sink;
mod source;
mod sync_config;

pub use blueprint::*;
pub use error::*;
pub use fused::FusedRecord;
pub use layout::{FieldWidth, FrameLayout, TIMESTAMP_WIDTH};
pub use profile::{ControlCommand, DeviceProfile, StreamSetting, StreamSettings};
pub use sample::*;
pub use sink::*;
pub use source::*;
pub use sync_config::SyncConfig;
