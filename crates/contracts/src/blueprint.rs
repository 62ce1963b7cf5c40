//! SessionBlueprint - Config Loader output
//!
//! Describes one device session: which sensor model, how its frames are
//! laid out, synchronizer tuning and the output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::{DeviceProfile, FrameLayout, SyncConfig};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Device selection
    #[validate(nested)]
    pub device: DeviceConfig,

    /// Data frame field widths
    #[serde(default)]
    pub frame: FrameLayout,

    /// Synchronizer tuning
    #[serde(default)]
    #[validate(nested)]
    pub sync: SyncConfig,

    /// Output routing
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

/// Device selection
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeviceConfig {
    /// Sensor model
    #[serde(default)]
    pub profile: DeviceProfile,

    /// Display name used in logs
    #[serde(default = "default_device_name")]
    #[validate(length(min = 1))]
    pub name: String,

    /// Peripheral address, informational only (the transport connects)
    #[serde(default)]
    pub address: Option<String>,
}

fn default_device_name() -> String {
    "device".to_string()
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Per-sink queue capacity
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Sink specific parameters (e.g. `path` for the file sink)
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    256
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// tracing log output
    Log,
    /// JSON lines file
    File,
}
