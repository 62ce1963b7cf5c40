//! Pipeline statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::MetricsSummary;
use serde::Serialize;
use session::SessionReport;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Session counters and synchronizer state at the end of the run
    pub report: SessionReport,

    /// Aggregated view of the fused output
    #[serde(skip)]
    pub summary: MetricsSummary,

    /// Records handed to the dispatcher
    pub dispatch_forwarded: u64,

    /// Records lost because the dispatcher input was full
    pub dispatch_dropped: u64,

    /// Final per-sink counters
    pub sinks: Vec<(String, MetricsSnapshot)>,

    /// Wall time of the run
    pub duration: Duration,
}

impl PipelineStats {
    /// Fused records per second of wall time
    pub fn records_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.report.fused as f64 / secs
        } else {
            0.0
        }
    }

    /// Rejected notifications as a percentage of all notifications
    pub fn reject_rate(&self) -> f64 {
        if self.report.notifications > 0 {
            self.report.rejected as f64 / self.report.notifications as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let report = &self.report;
        let sync = &report.sync;

        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("   ├─ Stopped: {:?}", report.stop_reason);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Notifications: {}", report.notifications);
        println!(
            "   ├─ Rejected: {} ({:.2}%)",
            report.rejected,
            self.reject_rate()
        );
        println!("   ├─ Fused records: {}", report.fused);
        println!("   └─ Records/s: {:.2}", self.records_per_sec());

        println!("\nSynchronizer");
        println!("   ├─ Pulse samples queued: {}", sync.pulse_enqueued);
        println!("   ├─ Accel samples queued: {}", sync.accel_enqueued);
        println!("   ├─ Accel dropped: {}", sync.accel_dropped);
        println!("   ├─ Pulse evicted: {}", sync.pulse_evicted);
        println!(
            "   ├─ Max depth: pulse {} / accel {}",
            sync.max_pulse_depth, sync.max_accel_depth
        );
        println!(
            "   └─ Unpaired at end: pulse {} / accel {}",
            report.pending_pulse, report.pending_accel
        );

        println!("\nDispatch");
        println!("   ├─ Forwarded: {}", self.dispatch_forwarded);
        println!("   └─ Dropped at input: {}", self.dispatch_dropped);
        for (name, snapshot) in &self.sinks {
            println!(
                "      {}: written={}, failed={}, dropped={}",
                name, snapshot.write_count, snapshot.failure_count, snapshot.dropped_count
            );
        }

        println!("\n{}", self.summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use session::StopReason;

    fn empty_report(notifications: u64, rejected: u64, fused: u64) -> SessionReport {
        SessionReport {
            stop_reason: StopReason::SourceEnded,
            notifications,
            decoded: notifications - rejected,
            rejected,
            fused,
            elapsed: Duration::from_secs(1),
            sync: Default::default(),
            pending_pulse: 0,
            pending_accel: 0,
        }
    }

    #[test]
    fn test_rates() {
        let stats = PipelineStats {
            report: empty_report(200, 10, 150),
            summary: MetricsSummary::default(),
            dispatch_forwarded: 150,
            dispatch_dropped: 0,
            sinks: Vec::new(),
            duration: Duration::from_secs(2),
        };
        assert!((stats.records_per_sec() - 75.0).abs() < 1e-9);
        assert!((stats.reject_rate() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration() {
        let stats = PipelineStats {
            report: empty_report(0, 0, 0),
            summary: MetricsSummary::default(),
            dispatch_forwarded: 0,
            dispatch_dropped: 0,
            sinks: Vec::new(),
            duration: Duration::ZERO,
        };
        assert_eq!(stats.records_per_sec(), 0.0);
        assert_eq!(stats.reject_rate(), 0.0);
    }
}
