//! RawSample -> typed Sample conversion

use contracts::{AccelSample, EcgSample, MeasurementKind, PulseSample, RawSample, Sample};

use crate::error::{DecodeError, Result};

/// Acceleration arrives in milli-units
const ACCEL_SCALE: f64 = 1000.0;

/// Convert a decoded frame into its typed sample
///
/// - pulse: `chN = rawN - ambient`; ambient (4th field) is not kept
/// - acceleration: each axis divided by 1000
///
/// # Errors
/// `MalformedFrame` when the field count does not match the kind. Frames
/// from `FrameDecoder::decode` always have the right count.
pub fn to_sample(raw: RawSample) -> Result<Sample> {
    let RawSample {
        kind,
        timestamp: ts,
        fields,
    } = raw;
    let malformed = || DecodeError::MalformedFrame {
        kind: Some(kind),
        expected: kind.field_count(),
        actual: fields.len(),
    };

    let sample = match kind {
        MeasurementKind::PulseChannels => {
            let &[r0, r1, r2, ambient] = fields.as_slice() else {
                return Err(malformed());
            };
            Sample::Pulse(PulseSample {
                ts,
                ch0: r0 - ambient,
                ch1: r1 - ambient,
                ch2: r2 - ambient,
            })
        }
        MeasurementKind::Acceleration => {
            let &[x, y, z] = fields.as_slice() else {
                return Err(malformed());
            };
            Sample::Accel(AccelSample {
                ts,
                x: x as f64 / ACCEL_SCALE,
                y: y as f64 / ACCEL_SCALE,
                z: z as f64 / ACCEL_SCALE,
            })
        }
        MeasurementKind::Ecg => {
            let &[microvolts] = fields.as_slice() else {
                return Err(malformed());
            };
            Sample::Ecg(EcgSample { ts, microvolts })
        }
    };
    Ok(sample)
}
