//! Decoder counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Decoder metrics
#[derive(Debug, Default)]
pub struct DecoderMetrics {
    /// Frames decoded successfully
    pub frames_decoded: AtomicU64,

    /// Frames rejected for length mismatch
    pub frames_malformed: AtomicU64,

    /// Frames rejected for an unknown tag
    pub frames_unknown_kind: AtomicU64,
}

impl DecoderMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record decoded frame
    pub fn record_decoded(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record malformed frame
    pub fn record_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record unknown tag
    pub fn record_unknown_kind(&self) {
        self.frames_unknown_kind.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            decoded: self.frames_decoded.load(Ordering::Relaxed),
            malformed: self.frames_malformed.load(Ordering::Relaxed),
            unknown_kind: self.frames_unknown_kind.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub decoded: u64,
    pub malformed: u64,
    pub unknown_kind: u64,
}

impl MetricsSnapshot {
    /// Frames rejected for any reason
    pub fn rejected(&self) -> u64 {
        self.malformed + self.unknown_kind
    }
}
