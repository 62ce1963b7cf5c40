//! Pulse/acceleration stream synchronizer.

use contracts::{AccelSample, FusedRecord, MeasurementSink, PulseSample, Sample};
use serde::Serialize;
use tracing::{instrument, trace, warn};

use crate::queue::StreamQueue;
use crate::SyncConfig;

/// Result of one pairing step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncOutcome {
    /// Pulse head paired with the acceleration head
    Emitted(FusedRecord),
    /// Acceleration head was older than the pulse head and was discarded
    Dropped(AccelSample),
    /// One of the queues is empty
    Blocked,
}

/// What a single `enqueue` call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueReport {
    /// Records handed to the sink
    pub emitted: usize,
    /// Acceleration samples discarded as stale
    pub dropped: usize,
    /// Pulse samples evicted by the high-water mark
    pub evicted: usize,
}

/// Lifetime counters of a synchronizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub pulse_enqueued: u64,
    pub accel_enqueued: u64,
    pub emitted: u64,
    pub accel_dropped: u64,
    pub pulse_evicted: u64,
    /// Samples of kinds that are not fused (ECG)
    pub ignored: u64,
    pub pulse_out_of_order: u64,
    pub accel_out_of_order: u64,
    pub max_pulse_depth: usize,
    pub max_accel_depth: usize,
}

/// Zero-order-hold fusion of one pulse stream and one acceleration stream
///
/// Owned by a single session; not meant to be shared between threads.
#[derive(Debug)]
pub struct StreamSynchronizer {
    config: SyncConfig,
    pulse: StreamQueue<PulseSample>,
    accel: StreamQueue<AccelSample>,
    pulse_enqueued: u64,
    accel_enqueued: u64,
    emitted: u64,
    accel_dropped: u64,
    pulse_evicted: u64,
    ignored: u64,
}

impl Default for StreamSynchronizer {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl StreamSynchronizer {
    /// Create a new synchronizer with the given configuration
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            pulse: StreamQueue::new(),
            accel: StreamQueue::new(),
            pulse_enqueued: 0,
            accel_enqueued: 0,
            emitted: 0,
            accel_dropped: 0,
            pulse_evicted: 0,
            ignored: 0,
        }
    }

    /// Queue a sample and drain every record that can now be paired
    ///
    /// Each emitted record is passed to `sink` before this call returns.
    #[instrument(
        level = "trace",
        name = "synchronizer_enqueue",
        skip(self, sample, sink),
        fields(kind = %sample.kind(), ts = %sample.ts())
    )]
    pub fn enqueue<S>(&mut self, sample: Sample, sink: &mut S) -> EnqueueReport
    where
        S: MeasurementSink + ?Sized,
    {
        match sample {
            Sample::Pulse(pulse) => {
                self.pulse_enqueued += 1;
                if self.pulse.push(pulse) {
                    trace!(ts = %pulse.ts, "pulse sample arrived out of order");
                }
            }
            Sample::Accel(accel) => {
                self.accel_enqueued += 1;
                if self.accel.push(accel) {
                    trace!(ts = %accel.ts, "acceleration sample arrived out of order");
                }
            }
            Sample::Ecg(_) => {
                self.ignored += 1;
                return EnqueueReport::default();
            }
        }

        let mut report = EnqueueReport::default();
        loop {
            match self.try_emit_one() {
                SyncOutcome::Emitted(record) => {
                    report.emitted += 1;
                    sink.on_fused(record);
                }
                SyncOutcome::Dropped(_) => report.dropped += 1,
                SyncOutcome::Blocked => break,
            }
        }

        report.evicted = self.enforce_high_water_mark();
        self.record_depths();
        report
    }

    /// Perform at most one pairing step
    ///
    /// 1. either queue empty -> `Blocked`
    /// 2. accel head older than pulse head -> pop accel, `Dropped`
    /// 3. otherwise pop the pulse head and pair it with the accel head,
    ///    which stays queued for the next pulse sample
    pub fn try_emit_one(&mut self) -> SyncOutcome {
        let (Some(pulse), Some(accel)) = (self.pulse.front(), self.accel.front()) else {
            return SyncOutcome::Blocked;
        };

        if accel.ts < pulse.ts {
            let Some(stale) = self.accel.pop_front() else {
                return SyncOutcome::Blocked;
            };
            self.accel_dropped += 1;
            metrics::counter!("pulsefuse_accel_dropped_total").increment(1);
            trace!(accel_ts = %stale.ts, "stale acceleration sample dropped");
            return SyncOutcome::Dropped(stale);
        }

        let hold_age_ms = accel.ts.millis_since(pulse.ts);
        let accel = *accel;
        let Some(pulse) = self.pulse.pop_front() else {
            return SyncOutcome::Blocked;
        };

        self.emitted += 1;
        metrics::counter!("pulsefuse_fused_records_total").increment(1);
        metrics::histogram!("pulsefuse_hold_age_ms").record(hold_age_ms as f64);

        SyncOutcome::Emitted(FusedRecord::pair(&pulse, &accel))
    }

    fn enforce_high_water_mark(&mut self) -> usize {
        let Some(limit) = self.config.pulse_high_water_mark else {
            return 0;
        };

        let mut evicted = 0;
        while self.pulse.len() > limit {
            if let Some(old) = self.pulse.pop_front() {
                evicted += 1;
                trace!(ts = %old.ts, "pulse sample evicted");
            }
        }

        if evicted > 0 {
            self.pulse_evicted += evicted as u64;
            metrics::counter!("pulsefuse_pulse_evicted_total").increment(evicted as u64);
            warn!(
                evicted,
                limit,
                "pulse queue above high-water mark, oldest samples evicted"
            );
        }
        evicted
    }

    fn record_depths(&self) {
        metrics::gauge!("pulsefuse_queue_depth", "stream" => "ppg").set(self.pulse.len() as f64);
        metrics::gauge!("pulsefuse_queue_depth", "stream" => "acc").set(self.accel.len() as f64);
    }

    /// Pulse samples waiting for a pairing acceleration sample
    pub fn pulse_depth(&self) -> usize {
        self.pulse.len()
    }

    /// Acceleration samples currently held
    pub fn accel_depth(&self) -> usize {
        self.accel.len()
    }

    /// Configuration in use
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Lifetime counters
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            pulse_enqueued: self.pulse_enqueued,
            accel_enqueued: self.accel_enqueued,
            emitted: self.emitted,
            accel_dropped: self.accel_dropped,
            pulse_evicted: self.pulse_evicted,
            ignored: self.ignored,
            pulse_out_of_order: self.pulse.out_of_order_count(),
            accel_out_of_order: self.accel.out_of_order_count(),
            max_pulse_depth: self.pulse.max_depth(),
            max_accel_depth: self.accel.max_depth(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EcgSample, Timestamp};
    use rand::Rng;

    fn pulse(ms: u64, ch0: i64, ch1: i64, ch2: i64) -> Sample {
        Sample::Pulse(PulseSample {
            ts: Timestamp::from_millis(ms),
            ch0,
            ch1,
            ch2,
        })
    }

    fn accel(ms: u64, x: f64, y: f64, z: f64) -> Sample {
        Sample::Accel(AccelSample {
            ts: Timestamp::from_millis(ms),
            x,
            y,
            z,
        })
    }

    fn collect(sync: &mut StreamSynchronizer, samples: Vec<Sample>) -> Vec<FusedRecord> {
        let mut out = Vec::new();
        for sample in samples {
            sync.enqueue(sample, &mut |r: FusedRecord| out.push(r));
        }
        out
    }

    #[test]
    fn test_accel_then_pulse_at_same_time() {
        let mut sync = StreamSynchronizer::default();
        let out = collect(
            &mut sync,
            vec![accel(1000, 1.0, 2.0, 3.0), pulse(1000, 10, 20, 30)],
        );

        assert_eq!(
            out,
            vec![FusedRecord {
                ts: Timestamp::from_millis(1000),
                ch0: 10,
                ch1: 20,
                ch2: 30,
                x: 1.0,
                y: 2.0,
                z: 3.0,
            }]
        );
        // The acceleration sample is held for later pulse samples
        assert_eq!(sync.accel_depth(), 1);
        assert_eq!(sync.pulse_depth(), 0);
    }

    #[test]
    fn test_pulse_waits_for_acceleration() {
        let mut sync = StreamSynchronizer::default();
        let mut out = Vec::new();

        let report = sync.enqueue(pulse(1000, 1, 2, 3), &mut |r: FusedRecord| out.push(r));
        assert_eq!(report, EnqueueReport::default());
        sync.enqueue(pulse(1010, 4, 5, 6), &mut |r: FusedRecord| out.push(r));
        assert!(out.is_empty());
        assert_eq!(sync.try_emit_one(), SyncOutcome::Blocked);

        let report = sync.enqueue(accel(1005, 9.0, 9.0, 9.0), &mut |r: FusedRecord| out.push(r));

        // 1.005 covers the 1.000 pulse; it is older than the 1.010 pulse,
        // so it is dropped and the second pulse keeps waiting.
        assert_eq!(report.emitted, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ts, Timestamp::from_millis(1000));
        assert_eq!((out[0].x, out[0].y, out[0].z), (9.0, 9.0, 9.0));
        assert_eq!(sync.pulse_depth(), 1);
        assert_eq!(sync.accel_depth(), 0);
    }

    #[test]
    fn test_one_acceleration_sample_covers_several_pulses() {
        let mut sync = StreamSynchronizer::default();
        let out = collect(
            &mut sync,
            vec![
                pulse(1000, 1, 1, 1),
                pulse(1010, 2, 2, 2),
                accel(1010, 9.0, 9.0, 9.0),
            ],
        );

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].ts, Timestamp::from_millis(1000));
        assert_eq!(out[1].ts, Timestamp::from_millis(1010));
        assert!(out.iter().all(|r| (r.x, r.y, r.z) == (9.0, 9.0, 9.0)));
        assert_eq!(sync.stats().accel_dropped, 0);
    }

    #[test]
    fn test_stale_acceleration_is_dropped() {
        let mut sync = StreamSynchronizer::default();
        let mut out = Vec::new();
        sync.enqueue(pulse(1000, 1, 2, 3), &mut |r: FusedRecord| out.push(r));

        let report = sync.enqueue(accel(500, 0.1, 0.2, 0.3), &mut |r: FusedRecord| out.push(r));

        assert!(out.is_empty());
        assert_eq!(report.dropped, 1);
        assert_eq!(report.emitted, 0);
        assert_eq!(sync.accel_depth(), 0);
        assert_eq!(sync.pulse_depth(), 1);
        assert_eq!(sync.stats().accel_dropped, 1);
    }

    #[test]
    fn test_try_emit_one_outcomes() {
        let mut sync = StreamSynchronizer::default();
        let mut ignore = |_: FusedRecord| {};

        // Fill queues without draining via a blocked state first
        sync.enqueue(accel(5, 0.0, 0.0, 0.0), &mut ignore);
        assert_eq!(sync.try_emit_one(), SyncOutcome::Blocked);

        sync.pulse.push(PulseSample {
            ts: Timestamp::from_millis(10),
            ch0: 1,
            ch1: 1,
            ch2: 1,
        });
        assert!(matches!(sync.try_emit_one(), SyncOutcome::Dropped(a) if a.ts == Timestamp::from_millis(5)));
        assert_eq!(sync.try_emit_one(), SyncOutcome::Blocked);
    }

    #[test]
    fn test_ecg_samples_are_ignored() {
        let mut sync = StreamSynchronizer::default();
        let mut out = Vec::new();
        let report = sync.enqueue(
            Sample::Ecg(EcgSample {
                ts: Timestamp::from_millis(1),
                microvolts: 100,
            }),
            &mut |r: FusedRecord| out.push(r),
        );

        assert_eq!(report, EnqueueReport::default());
        assert_eq!(sync.stats().ignored, 1);
        assert_eq!(sync.pulse_depth() + sync.accel_depth(), 0);
    }

    #[test]
    fn test_pulse_samples_emitted_once_in_order() {
        let mut rng = rand::rng();
        let mut sync = StreamSynchronizer::default();
        let mut out = Vec::new();

        let mut pulse_ts = 0u64;
        let mut accel_ts = 0u64;
        let mut pulses = Vec::new();
        for i in 0..2000i64 {
            if rng.random_bool(0.7) {
                pulse_ts += rng.random_range(1..10);
                pulses.push(pulse_ts);
                sync.enqueue(pulse(pulse_ts, i, i, i), &mut |r: FusedRecord| out.push(r));
            } else {
                accel_ts += rng.random_range(1..25);
                sync.enqueue(accel(accel_ts, 0.0, 0.0, 1.0), &mut |r: FusedRecord| out.push(r));
            }
        }

        // Every emitted record is a distinct pulse sample, in enqueue order
        let emitted: Vec<u64> = out.iter().map(|r| r.ts.as_millis()).collect();
        assert_eq!(emitted.as_slice(), &pulses[..emitted.len()]);
        assert_eq!(emitted.len() + sync.pulse_depth(), pulses.len());

        let stats = sync.stats();
        assert_eq!(stats.emitted as usize, out.len());
        assert_eq!(stats.pulse_evicted, 0);
    }

    #[test]
    fn test_paired_acceleration_never_older_than_pulse() {
        let mut sync = StreamSynchronizer::default();
        let mut out = Vec::new();

        // accel value encodes its own timestamp
        let mut events: Vec<Sample> = Vec::new();
        for i in 0..500u64 {
            events.push(pulse(i * 7, 0, 0, 0));
            if i % 3 == 0 {
                events.push(accel(i * 7 + 4, (i * 7 + 4) as f64, 0.0, 0.0));
            }
        }
        for sample in events {
            sync.enqueue(sample, &mut |r: FusedRecord| out.push(r));
        }

        assert!(!out.is_empty());
        for record in &out {
            assert!(record.x >= record.ts.as_millis() as f64);
        }
    }

    #[test]
    fn test_depths_stay_bounded_for_steady_streams() {
        let mut sync = StreamSynchronizer::default();
        let mut count = 0usize;

        // 135 Hz pulse, 50 Hz acceleration, merged in timestamp order
        let pulse_period_us = 1_000_000 / 135;
        let accel_period_us = 1_000_000 / 50;
        let (mut next_pulse, mut next_accel) = (0u64, 0u64);

        for _ in 0..20_000 {
            if next_pulse <= next_accel {
                sync.enqueue(pulse(next_pulse / 1000, 1, 2, 3), &mut |_: FusedRecord| count += 1);
                next_pulse += pulse_period_us;
            } else {
                sync.enqueue(accel(next_accel / 1000, 0.0, 0.0, 1.0), &mut |_: FusedRecord| count += 1);
                next_accel += accel_period_us;
            }
            assert!(sync.pulse_depth() <= 4, "pulse depth {}", sync.pulse_depth());
            assert!(sync.accel_depth() <= 2, "accel depth {}", sync.accel_depth());
        }

        assert!(count > 10_000);
        let stats = sync.stats();
        assert!(stats.max_pulse_depth <= 4);
        assert!(stats.max_accel_depth <= 2);
    }

    #[test]
    fn test_high_water_mark_evicts_oldest_pulses() {
        let mut sync = StreamSynchronizer::new(SyncConfig {
            pulse_high_water_mark: Some(3),
        });
        let mut out = Vec::new();

        let mut evicted = 0;
        for ms in 0..5 {
            evicted += sync.enqueue(pulse(ms, 0, 0, 0), &mut |r: FusedRecord| out.push(r)).evicted;
        }
        assert_eq!(evicted, 2);
        assert_eq!(sync.pulse_depth(), 3);

        sync.enqueue(accel(10, 0.0, 0.0, 0.0), &mut |r: FusedRecord| out.push(r));
        let emitted: Vec<u64> = out.iter().map(|r| r.ts.as_millis()).collect();
        assert_eq!(emitted, vec![2, 3, 4]);
        assert_eq!(sync.stats().pulse_evicted, 2);
    }

    #[test]
    fn test_out_of_order_arrivals_are_counted_not_sorted() {
        let mut sync = StreamSynchronizer::default();
        let mut out = Vec::new();
        sync.enqueue(pulse(20, 0, 0, 0), &mut |r: FusedRecord| out.push(r));
        sync.enqueue(pulse(10, 0, 0, 0), &mut |r: FusedRecord| out.push(r));
        sync.enqueue(accel(30, 0.0, 0.0, 0.0), &mut |r: FusedRecord| out.push(r));

        let emitted: Vec<u64> = out.iter().map(|r| r.ts.as_millis()).collect();
        assert_eq!(emitted, vec![20, 10]);
        assert_eq!(sync.stats().pulse_out_of_order, 1);
    }
}
