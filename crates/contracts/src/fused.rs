//! FusedRecord - StreamSynchronizer output

use serde::{Deserialize, Serialize};

use crate::{AccelSample, PulseSample, Timestamp};

/// One pulse sample paired with the acceleration held at its time
///
/// `ts` is the pulse timestamp; the acceleration timestamp is not kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedRecord {
    pub ts: Timestamp,
    pub ch0: i64,
    pub ch1: i64,
    pub ch2: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl FusedRecord {
    /// Pair a pulse sample with an acceleration sample
    pub fn pair(pulse: &PulseSample, accel: &AccelSample) -> Self {
        Self {
            ts: pulse.ts,
            ch0: pulse.ch0,
            ch1: pulse.ch1,
            ch2: pulse.ch2,
            x: accel.x,
            y: accel.y,
            z: accel.z,
        }
    }
}
