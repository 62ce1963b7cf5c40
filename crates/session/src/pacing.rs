//! Replay pacing by device clock

use tokio::time::{Duration, Instant};

/// Delays frames so that they are released at the rate the device
/// produced them, scaled by `speed`.
#[derive(Debug, Clone)]
pub(crate) struct Pacer {
    speed: f64,
    origin: Option<(u64, Instant)>,
}

impl Pacer {
    /// `speed` of 1.0 replays in real time, 2.0 twice as fast.
    /// Non-positive or non-finite speeds fall back to real time.
    pub(crate) fn new(speed: f64) -> Self {
        let speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            1.0
        };
        Self {
            speed,
            origin: None,
        }
    }

    /// Wait until the frame stamped `device_micros` is due
    pub(crate) async fn wait(&mut self, device_micros: u64) {
        let (first_micros, started) = *self
            .origin
            .get_or_insert_with(|| (device_micros, Instant::now()));

        let offset_micros = device_micros.saturating_sub(first_micros) as f64 / self.speed;
        let offset = Duration::from_micros(offset_micros as u64);
        match started.checked_add(offset) {
            Some(due) => tokio::time::sleep_until(due).await,
            None => std::future::pending().await,
        }
    }
}

/// Device timestamp of a raw frame, if it is long enough to carry one
pub(crate) fn frame_micros(frame: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = frame.get(1..9)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}
