//! Metric catalogue and run summaries
//!
//! Counters are emitted where events happen (decoder session, synchronizer,
//! dispatcher). This module describes them for the exporter and keeps an
//! in-memory view of the fused output for end-of-run reports.

use std::collections::BTreeMap;

use contracts::FusedRecord;
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// Register descriptions for every pulsefuse metric
pub fn describe_metrics() {
    describe_counter!(
        "pulsefuse_notifications_total",
        "Data notifications received from the device"
    );
    describe_counter!(
        "pulsefuse_decode_errors_total",
        "Notifications discarded by the frame decoder, by error kind"
    );
    describe_counter!(
        "pulsefuse_fused_records_total",
        "Pulse samples paired with an acceleration sample"
    );
    describe_counter!(
        "pulsefuse_accel_dropped_total",
        "Acceleration samples discarded as older than the pending pulse sample"
    );
    describe_counter!(
        "pulsefuse_pulse_evicted_total",
        "Pulse samples evicted by the queue high-water mark"
    );
    describe_counter!(
        "pulsefuse_dispatch_dropped_total",
        "Fused records lost because the dispatcher input was full"
    );
    describe_counter!(
        "pulsefuse_sink_dropped_total",
        "Fused records lost because a sink queue was full"
    );
    describe_gauge!(
        "pulsefuse_queue_depth",
        "Samples waiting in the synchronizer, by stream"
    );
    describe_histogram!(
        "pulsefuse_hold_age_ms",
        Unit::Milliseconds,
        "Acceleration timestamp minus pulse timestamp of each fused record"
    );
}

/// In-memory aggregation of a session's output
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsAggregator {
    /// Fused records observed
    pub total_records: u64,

    /// Notifications rejected, by error label
    pub rejected: BTreeMap<String, u64>,

    /// Gap between consecutive records (ms)
    pub interval_stats: RunningStats,

    /// Acceleration magnitude of each record
    pub accel_magnitude: RunningStats,

    /// First and last record timestamps (ms)
    first_ts: Option<u64>,
    last_ts: Option<u64>,
}

impl SessionMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one fused record
    pub fn observe_record(&mut self, record: &FusedRecord) {
        let ts = record.ts.as_millis();
        self.total_records += 1;

        if let Some(last) = self.last_ts {
            self.interval_stats.push(ts as f64 - last as f64);
        }
        self.first_ts.get_or_insert(ts);
        self.last_ts = Some(ts);

        let magnitude = (record.x * record.x + record.y * record.y + record.z * record.z).sqrt();
        self.accel_magnitude.push(magnitude);
    }

    /// Account for one discarded notification
    pub fn observe_rejected(&mut self, label: &str) {
        self.add_rejected(label, 1);
    }

    /// Account for `count` discarded notifications of one kind
    pub fn add_rejected(&mut self, label: &str, count: u64) {
        if count > 0 {
            *self.rejected.entry(label.to_string()).or_insert(0) += count;
        }
    }

    /// Generate summary report
    pub fn summary(&self) -> MetricsSummary {
        let span_ms = match (self.first_ts, self.last_ts) {
            (Some(first), Some(last)) => last.saturating_sub(first),
            _ => 0,
        };
        let record_rate_hz = if span_ms > 0 && self.total_records > 1 {
            (self.total_records - 1) as f64 * 1000.0 / span_ms as f64
        } else {
            0.0
        };

        MetricsSummary {
            total_records: self.total_records,
            total_rejected: self.rejected.values().sum(),
            span_ms,
            record_rate_hz,
            interval_ms: StatsSummary::from(&self.interval_stats),
            accel_magnitude: StatsSummary::from(&self.accel_magnitude),
            rejected_by_kind: self.rejected.clone(),
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_records: u64,
    pub total_rejected: u64,
    /// Device time covered by the records
    pub span_ms: u64,
    pub record_rate_hz: f64,
    pub interval_ms: StatsSummary,
    pub accel_magnitude: StatsSummary,
    pub rejected_by_kind: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Fusion Summary ===")?;
        writeln!(f, "Fused records: {}", self.total_records)?;
        writeln!(
            f,
            "Device time: {:.3} s ({:.1} records/s)",
            self.span_ms as f64 / 1000.0,
            self.record_rate_hz
        )?;
        writeln!(f, "Record interval (ms): {}", self.interval_ms)?;
        writeln!(f, "Acceleration magnitude: {}", self.accel_magnitude)?;
        writeln!(f, "Rejected notifications: {}", self.total_rejected)?;

        for (kind, count) in &self.rejected_by_kind {
            writeln!(f, "  {}: {}", kind, count)?;
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
