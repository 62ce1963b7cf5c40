//! Frame layout - per-kind field widths of the data characteristic

use serde::{Deserialize, Serialize};

use crate::MeasurementKind;

/// Width of the device timestamp (unsigned, little-endian, microseconds)
pub const TIMESTAMP_WIDTH: usize = 8;

/// Width of one signed little-endian field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldWidth {
    I8,
    I16,
    I24,
    I32,
}

impl FieldWidth {
    /// Bytes per field
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::I8 => 1,
            Self::I16 => 2,
            Self::I24 => 3,
            Self::I32 => 4,
        }
    }

    /// Inclusive value range representable at this width
    #[must_use]
    pub const fn range(self) -> (i64, i64) {
        let bits = self.bytes() as u32 * 8;
        (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
    }
}

/// Field widths per measurement kind
///
/// The tag byte and the 8-byte timestamp are fixed; only the field width
/// varies by device characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLayout {
    /// ECG field width
    #[serde(default = "default_ecg_width")]
    pub ecg: FieldWidth,

    /// Pulse channel field width
    #[serde(default = "default_pulse_width")]
    pub pulse: FieldWidth,

    /// Acceleration field width
    #[serde(default = "default_accel_width")]
    pub acceleration: FieldWidth,
}

fn default_ecg_width() -> FieldWidth {
    FieldWidth::I24
}

fn default_pulse_width() -> FieldWidth {
    FieldWidth::I24
}

fn default_accel_width() -> FieldWidth {
    FieldWidth::I16
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self {
            ecg: default_ecg_width(),
            pulse: default_pulse_width(),
            acceleration: default_accel_width(),
        }
    }
}

impl FrameLayout {
    /// Field width used by `kind`
    #[must_use]
    pub const fn width_of(&self, kind: MeasurementKind) -> FieldWidth {
        match kind {
            MeasurementKind::Ecg => self.ecg,
            MeasurementKind::PulseChannels => self.pulse,
            MeasurementKind::Acceleration => self.acceleration,
        }
    }

    /// Total frame length implied by the tag
    #[must_use]
    pub const fn frame_len(&self, kind: MeasurementKind) -> usize {
        1 + TIMESTAMP_WIDTH + kind.field_count() * self.width_of(kind).bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_frame_lengths() {
        let layout = FrameLayout::default();
        assert_eq!(layout.frame_len(MeasurementKind::PulseChannels), 1 + 8 + 4 * 3);
        assert_eq!(layout.frame_len(MeasurementKind::Acceleration), 1 + 8 + 3 * 2);
        assert_eq!(layout.frame_len(MeasurementKind::Ecg), 1 + 8 + 3);
    }

    #[test]
    fn test_width_ranges() {
        assert_eq!(FieldWidth::I8.range(), (-128, 127));
        assert_eq!(FieldWidth::I24.range(), (-8_388_608, 8_388_607));
    }
}
