//! Mock device
//!
//! Produces the notifications a sensor would send, without hardware.
//! Frames are synthesized from the profile's stream settings, in device
//! timestamp order, and encoded with the configured frame layout.

use std::f64::consts::TAU;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    DeviceProfile, FrameLayout, MeasurementKind, NotificationSource, StreamSetting,
};
use decoder::encode_frame;
use tracing::{debug, error, trace};

use crate::error::Result;
use crate::pacing::Pacer;

/// Mock device configuration
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    /// Which sensor model to imitate
    pub profile: DeviceProfile,

    /// Frame layout used for encoding
    pub layout: FrameLayout,

    /// Length of the recording in device time
    pub duration: Duration,

    /// Device clock at the first sample (µs)
    pub start_micros: u64,

    /// Release frames at `speed` times real time; `None` = as fast as pulled
    pub pace: Option<f64>,

    /// Replace every n-th notification with a truncated frame
    pub corrupt_every: Option<u64>,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self {
            profile: DeviceProfile::default(),
            layout: FrameLayout::default(),
            duration: Duration::from_secs(10),
            start_micros: 1_000_000,
            pace: None,
            corrupt_every: None,
        }
    }
}

#[derive(Debug, Clone)]
struct StreamCursor {
    setting: StreamSetting,
    index: u64,
    next_micros: u64,
}

impl StreamCursor {
    fn elapsed_secs(&self) -> f64 {
        self.index as f64 / f64::from(self.setting.sample_rate_hz.max(1))
    }
}

/// Deterministic synthetic device
///
/// - pulse: three channels following a 72 bpm wave over a slowly drifting
///   ambient level, which is sent as the 4th field
/// - acceleration: a gravity vector rotating at 0.1 Hz, in milli-g
/// - ECG: a 72 bpm sine in µV
#[derive(Debug)]
pub struct MockDevice {
    config: MockDeviceConfig,
    cursors: Vec<StreamCursor>,
    end_micros: u64,
    emitted: u64,
    pacer: Option<Pacer>,
}

const HEART_RATE_HZ: f64 = 1.2;

impl MockDevice {
    pub fn new(config: MockDeviceConfig) -> Self {
        let cursors = config
            .profile
            .stream_settings()
            .streams
            .into_iter()
            .map(|setting| StreamCursor {
                setting,
                index: 0,
                next_micros: config.start_micros,
            })
            .collect();
        // durations past the u64 clock end at its last tick
        let end_micros = u64::try_from(config.duration.as_micros())
            .map_or(u64::MAX, |micros| config.start_micros.saturating_add(micros));
        let pacer = config.pace.map(Pacer::new);

        debug!(
            profile = %config.profile,
            duration_ms = config.duration.as_millis(),
            "mock device created"
        );

        Self {
            config,
            cursors,
            end_micros,
            emitted: 0,
            pacer,
        }
    }

    /// Mock of `profile` lasting `duration`, unpaced
    pub fn for_profile(profile: DeviceProfile, duration: Duration) -> Self {
        Self::new(MockDeviceConfig {
            profile,
            duration,
            ..Default::default()
        })
    }

    /// Notifications produced so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Produce the next frame without pacing
    ///
    /// Streams are interleaved by timestamp; on ties the stream listed
    /// first in the profile goes first.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        let Some(cursor) = self
            .cursors
            .iter_mut()
            .filter(|c| c.next_micros < self.end_micros)
            .min_by_key(|c| c.next_micros)
        else {
            return Ok(None);
        };

        let micros = cursor.next_micros;
        let kind = cursor.setting.kind;
        let fields = synth_fields(kind, cursor.elapsed_secs());
        cursor.index += 1;
        cursor.next_micros = cursor.next_micros.saturating_add(cursor.setting.interval_micros());

        let mut frame = encode_frame(kind, micros, &fields, &self.config.layout)?;
        self.emitted += 1;

        if let Some(every) = self.config.corrupt_every.filter(|n| *n > 0) {
            if self.emitted % every == 0 {
                trace!(micros, "corrupting mock frame");
                frame.truncate(frame.len() - 1);
            }
        }
        Ok(Some(frame))
    }

    /// Every remaining frame
    pub fn collect_frames(&mut self) -> Result<Vec<Bytes>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}

fn synth_fields(kind: MeasurementKind, t: f64) -> Vec<i64> {
    let beat = (TAU * HEART_RATE_HZ * t).sin();
    match kind {
        MeasurementKind::PulseChannels => {
            let ambient = 8_000 + (500.0 * (TAU * 0.05 * t).sin()) as i64;
            let mut fields: Vec<i64> = (0..3)
                .map(|ch| 250_000 + ch * 10_000 + (20_000.0 * beat) as i64 + ambient)
                .collect();
            fields.push(ambient);
            fields
        }
        MeasurementKind::Acceleration => {
            let angle = TAU * 0.1 * t;
            vec![
                (1000.0 * angle.sin()) as i64,
                (50.0 * beat) as i64,
                (1000.0 * angle.cos()) as i64,
            ]
        }
        MeasurementKind::Ecg => vec![(800.0 * beat) as i64],
    }
}

impl NotificationSource for MockDevice {
    async fn next_notification(&mut self) -> Option<Bytes> {
        let frame = match self.next_frame() {
            Ok(frame) => frame?,
            Err(e) => {
                error!(error = %e, "mock device stopped");
                return None;
            }
        };

        if let Some(pacer) = self.pacer.as_mut() {
            if let Some(micros) = crate::pacing::frame_micros(&frame) {
                pacer.wait(micros).await;
            }
        }
        Some(frame)
    }
}
