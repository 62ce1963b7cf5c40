//! Decoded samples - FrameDecoder output
//!
//! `RawSample` is the untyped result of decoding one notification;
//! `Sample` is the typed form the synchronizer consumes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Measurement type carried in the first byte of a data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MeasurementKind {
    /// Single-lead ECG (H10)
    Ecg = 0x00,
    /// Optical pulse channels plus ambient reading (OH1 PPG)
    PulseChannels = 0x01,
    /// 3-axis accelerometer in milli-units
    Acceleration = 0x02,
}

impl MeasurementKind {
    /// All recognized kinds, in tag order
    pub const ALL: [MeasurementKind; 3] = [Self::Ecg, Self::PulseChannels, Self::Acceleration];

    /// Map a frame tag to a kind; `None` for tags this decoder does not know
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(Self::Ecg),
            0x01 => Some(Self::PulseChannels),
            0x02 => Some(Self::Acceleration),
            _ => None,
        }
    }

    /// Wire tag
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Number of signed fields that follow the timestamp
    #[must_use]
    pub const fn field_count(self) -> usize {
        match self {
            Self::Ecg => 1,
            Self::PulseChannels => 4,
            Self::Acceleration => 3,
        }
    }

    /// Whether samples of this kind are queued for fusion
    #[must_use]
    pub const fn participates_in_fusion(self) -> bool {
        matches!(self, Self::PulseChannels | Self::Acceleration)
    }

    /// Short label used in logs and metric labels
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ecg => "ecg",
            Self::PulseChannels => "ppg",
            Self::Acceleration => "acc",
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device time truncated to millisecond resolution
///
/// Stored as whole milliseconds so that comparisons between streams are
/// exact. Serialized as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Timestamp(u64);

impl Timestamp {
    /// Convert a raw device clock value.
    ///
    /// Sub-millisecond precision is discarded (`floor(us / 1000)`), which
    /// matches the granularity the device actually delivers.
    #[must_use]
    pub const fn from_device_micros(micros: u64) -> Self {
        Self(micros / 1000)
    }

    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Seconds as a float, e.g. `1.005`
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Signed difference `self - earlier` in milliseconds
    #[must_use]
    pub fn millis_since(self, earlier: Timestamp) -> i64 {
        self.0 as i64 - earlier.0 as i64
    }
}

impl From<Timestamp> for f64 {
    fn from(ts: Timestamp) -> Self {
        ts.as_secs_f64()
    }
}

impl From<f64> for Timestamp {
    fn from(secs: f64) -> Self {
        Self((secs * 1000.0).round().max(0.0) as u64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / 1000, self.0 % 1000)
    }
}

/// Untyped decoder output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    /// Kind named by the frame tag
    pub kind: MeasurementKind,

    /// Device timestamp
    pub timestamp: Timestamp,

    /// Signed channel values in wire order
    pub fields: Vec<i64>,
}

/// Optical pulse sample with the ambient reading already subtracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseSample {
    pub ts: Timestamp,
    pub ch0: i64,
    pub ch1: i64,
    pub ch2: i64,
}

/// Acceleration sample in unit scale (raw milli-units / 1000)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    pub ts: Timestamp,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// ECG sample; decoded but not fused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcgSample {
    pub ts: Timestamp,
    pub microvolts: i64,
}

/// Typed sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sample {
    Pulse(PulseSample),
    Accel(AccelSample),
    Ecg(EcgSample),
}

impl Sample {
    /// Timestamp of the wrapped sample
    pub fn ts(&self) -> Timestamp {
        match self {
            Sample::Pulse(p) => p.ts,
            Sample::Accel(a) => a.ts,
            Sample::Ecg(e) => e.ts,
        }
    }

    /// Kind of the wrapped sample
    pub fn kind(&self) -> MeasurementKind {
        match self {
            Sample::Pulse(_) => MeasurementKind::PulseChannels,
            Sample::Accel(_) => MeasurementKind::Acceleration,
            Sample::Ecg(_) => MeasurementKind::Ecg,
        }
    }
}

impl From<PulseSample> for Sample {
    fn from(sample: PulseSample) -> Self {
        Sample::Pulse(sample)
    }
}

impl From<AccelSample> for Sample {
    fn from(sample: AccelSample) -> Self {
        Sample::Accel(sample)
    }
}

impl From<EcgSample> for Sample {
    fn from(sample: EcgSample) -> Self {
        Sample::Ecg(sample)
    }
}
