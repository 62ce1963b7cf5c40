//! Device session: control sequence, notification loop and fusion

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    ControlChannel, DeviceProfile, FrameLayout, MeasurementSink, NotificationSource,
    SessionBlueprint, SyncConfig,
};
use decoder::{DecodeError, DecoderMetrics, FrameDecoder, MetricsSnapshot};
use serde::Serialize;
use sync_engine::{EnqueueReport, StreamSynchronizer, SyncStats};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SessionError};

/// Static parameters of a session
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Device name used in logs
    pub name: String,
    pub profile: DeviceProfile,
    pub layout: FrameLayout,
    pub sync: SyncConfig,
}

impl SessionConfig {
    pub fn from_blueprint(blueprint: &SessionBlueprint) -> Self {
        Self {
            name: blueprint.device.name.clone(),
            profile: blueprint.device.profile,
            layout: blueprint.frame,
            sync: blueprint.sync.clone(),
        }
    }
}

/// Stop conditions for [`DeviceSession::run`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLimits {
    /// Stop once at least this many fused records were produced.
    /// Checked between notifications, so the notification that crosses
    /// the limit still delivers all records it releases.
    pub max_records: Option<u64>,
}

/// What happened to one notification
#[derive(Debug)]
pub enum NotificationOutcome {
    /// Decoded and queued; the report lists what the synchronizer released
    Accepted(EnqueueReport),
    /// Discarded; synchronizer state is untouched
    Rejected(DecodeError),
}

impl NotificationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, NotificationOutcome::Accepted(_))
    }
}

/// Why `run` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    SourceEnded,
    RecordLimit,
    Shutdown,
}

/// Summary of a run
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub stop_reason: StopReason,
    pub notifications: u64,
    pub decoded: u64,
    pub rejected: u64,
    pub fused: u64,
    pub elapsed: Duration,
    pub sync: SyncStats,
    /// Samples still queued when the run ended; they are discarded
    pub pending_pulse: usize,
    pub pending_accel: usize,
}

enum Step {
    Payload(Option<Bytes>),
    Shutdown,
}

/// One connected device
///
/// Owns its decoder and synchronizer; notifications are processed one
/// at a time in arrival order.
pub struct DeviceSession<Src, Ctl> {
    config: SessionConfig,
    source: Src,
    control: Ctl,
    decoder: FrameDecoder,
    synchronizer: StreamSynchronizer,
    notifications: u64,
    fused: u64,
    started: bool,
}

impl<Src, Ctl> DeviceSession<Src, Ctl>
where
    Src: NotificationSource,
    Ctl: ControlChannel,
{
    pub fn new(config: SessionConfig, source: Src, control: Ctl) -> Self {
        let decoder = FrameDecoder::with_metrics(config.layout, Arc::new(DecoderMetrics::new()));
        let synchronizer = StreamSynchronizer::new(config.sync.clone());
        Self {
            config,
            source,
            control,
            decoder,
            synchronizer,
            notifications: 0,
            fused: 0,
            started: false,
        }
    }

    /// Send the profile's command sequence on the control channel
    ///
    /// Settings queries first, then stream starts. Stops at the first
    /// command the channel rejects.
    #[instrument(
        name = "session_start",
        skip(self),
        fields(device = %self.config.name, profile = %self.config.profile)
    )]
    pub async fn start(&mut self) -> Result<()> {
        let commands = self.config.profile.command_sequence();
        for command in &commands {
            self.control
                .send_command(command)
                .await
                .map_err(|e| SessionError::command(&command.name, e))?;
            debug!(command = %command.name, "command sent");
        }
        self.started = true;
        info!(commands = commands.len(), "device streams started");
        Ok(())
    }

    /// Decode one payload and feed it to the synchronizer
    ///
    /// Decode failures are logged and counted, never propagated.
    pub fn process_notification<S>(&mut self, payload: &[u8], sink: &mut S) -> NotificationOutcome
    where
        S: MeasurementSink + ?Sized,
    {
        self.notifications += 1;
        metrics::counter!("pulsefuse_notifications_total").increment(1);

        match self.decoder.decode_sample(payload) {
            Ok(sample) => {
                let report = self.synchronizer.enqueue(sample, sink);
                self.fused += report.emitted as u64;
                NotificationOutcome::Accepted(report)
            }
            Err(e) => {
                warn!(
                    device = %self.config.name,
                    error = %e,
                    len = payload.len(),
                    "notification discarded"
                );
                metrics::counter!("pulsefuse_decode_errors_total", "kind" => e.label())
                    .increment(1);
                NotificationOutcome::Rejected(e)
            }
        }
    }

    /// Pull notifications until the source ends or the limits are hit
    pub async fn run<S>(&mut self, sink: &mut S, limits: RunLimits) -> SessionReport
    where
        S: MeasurementSink + ?Sized,
    {
        self.run_until(sink, limits, std::future::pending()).await
    }

    /// Like [`run`](Self::run), additionally stopping when `shutdown` completes
    #[instrument(
        name = "session_run",
        skip(self, sink, shutdown),
        fields(device = %self.config.name, profile = %self.config.profile)
    )]
    pub async fn run_until<S, F>(
        &mut self,
        sink: &mut S,
        limits: RunLimits,
        shutdown: F,
    ) -> SessionReport
    where
        S: MeasurementSink + ?Sized,
        F: Future<Output = ()>,
    {
        if !self.started {
            debug!("running without start(); streams assumed active");
        }

        let started_at = Instant::now();
        let fused_before = self.fused;
        tokio::pin!(shutdown);

        let stop_reason = loop {
            if limits
                .max_records
                .is_some_and(|max| self.fused - fused_before >= max)
            {
                break StopReason::RecordLimit;
            }

            let step = tokio::select! {
                biased;
                _ = &mut shutdown => Step::Shutdown,
                payload = self.source.next_notification() => Step::Payload(payload),
            };

            match step {
                Step::Payload(Some(payload)) => {
                    self.process_notification(&payload, sink);
                }
                Step::Payload(None) => break StopReason::SourceEnded,
                Step::Shutdown => break StopReason::Shutdown,
            }
        };

        let report = self.report(stop_reason, started_at.elapsed());
        info!(
            stop_reason = ?report.stop_reason,
            notifications = report.notifications,
            fused = report.fused,
            rejected = report.rejected,
            "session finished"
        );
        if report.pending_pulse + report.pending_accel > 0 {
            debug!(
                pending_pulse = report.pending_pulse,
                pending_accel = report.pending_accel,
                "unpaired samples discarded"
            );
        }
        report
    }

    fn report(&self, stop_reason: StopReason, elapsed: Duration) -> SessionReport {
        let decoder = self.decoder.metrics().snapshot();
        SessionReport {
            stop_reason,
            notifications: self.notifications,
            decoded: decoder.decoded,
            rejected: decoder.rejected(),
            fused: self.fused,
            elapsed,
            sync: self.synchronizer.stats(),
            pending_pulse: self.synchronizer.pulse_depth(),
            pending_accel: self.synchronizer.accel_depth(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn synchronizer(&self) -> &StreamSynchronizer {
        &self.synchronizer
    }

    pub fn decoder_metrics(&self) -> MetricsSnapshot {
        self.decoder.metrics().snapshot()
    }

    pub fn control(&self) -> &Ctl {
        &self.control
    }

    /// Tear down, returning the transport halves
    pub fn into_parts(self) -> (Src, Ctl) {
        (self.source, self.control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelSource, MockDevice, RecordingControlChannel};
    use contracts::{FusedRecord, MeasurementKind};
    use decoder::encode_frame;

    fn frame(kind: MeasurementKind, micros: u64, fields: &[i64]) -> Bytes {
        encode_frame(kind, micros, fields, &FrameLayout::default()).unwrap()
    }

    fn session(source: ChannelSource) -> DeviceSession<ChannelSource, RecordingControlChannel> {
        DeviceSession::new(
            SessionConfig {
                name: "test".into(),
                ..Default::default()
            },
            source,
            RecordingControlChannel::new(),
        )
    }

    #[tokio::test]
    async fn test_start_sends_profile_commands() {
        let (_tx, source) = ChannelSource::bounded(1);
        let mut session = session(source);
        session.start().await.unwrap();

        let names: Vec<_> = session.control().sent().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["get_acc_settings", "get_ppg_settings", "start_ppg", "start_acc"]
        );
    }

    #[tokio::test]
    async fn test_start_stops_at_rejected_command() {
        let (_tx, source) = ChannelSource::bounded(1);
        let mut session = DeviceSession::new(
            SessionConfig::default(),
            source,
            RecordingControlChannel::failing_on("start_ppg"),
        );

        let err = session.start().await.unwrap_err();
        assert!(matches!(err, SessionError::Command { ref command, .. } if command == "start_ppg"));
        assert_eq!(session.control().sent().len(), 2);
    }

    #[test]
    fn test_malformed_notification_leaves_state_untouched() {
        let (_tx, source) = ChannelSource::bounded(1);
        let mut session = session(source);
        let mut out: Vec<FusedRecord> = Vec::new();

        let outcome = session.process_notification(
            &frame(MeasurementKind::PulseChannels, 1_000_000, &[10, 20, 30, 5]),
            &mut |r: FusedRecord| out.push(r),
        );
        assert!(outcome.is_accepted());
        let before = session.synchronizer().stats();

        // acceleration frame missing its z field
        let mut short = frame(MeasurementKind::Acceleration, 1_000_000, &[1, 2, 3]).to_vec();
        short.truncate(short.len() - 2);
        let outcome = session.process_notification(&short, &mut |r: FusedRecord| out.push(r));

        assert!(matches!(
            outcome,
            NotificationOutcome::Rejected(DecodeError::MalformedFrame { .. })
        ));
        assert_eq!(session.synchronizer().stats(), before);
        assert_eq!(session.synchronizer().pulse_depth(), 1);
        assert!(out.is_empty());

        let outcome = session.process_notification(&[0x07, 0, 0], &mut |r: FusedRecord| out.push(r));
        assert!(matches!(
            outcome,
            NotificationOutcome::Rejected(DecodeError::UnknownKind { tag: 0x07 })
        ));
        assert_eq!(session.decoder_metrics().rejected(), 2);
    }

    #[tokio::test]
    async fn test_run_fuses_channel_notifications() {
        let (tx, source) = ChannelSource::bounded(16);
        tx.send(frame(MeasurementKind::Acceleration, 1_000_000, &[1000, 2000, 3000]))
            .await
            .unwrap();
        tx.send(frame(MeasurementKind::PulseChannels, 1_000_000, &[110, 120, 130, 100]))
            .await
            .unwrap();
        tx.send(Bytes::from_static(&[0x01, 0x00])).await.unwrap();
        drop(tx);

        let mut session = session(source);
        let mut out = Vec::new();
        let report = session
            .run(&mut |r: FusedRecord| out.push(r), RunLimits::default())
            .await;

        assert_eq!(report.stop_reason, StopReason::SourceEnded);
        assert_eq!(report.notifications, 3);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.fused, 1);
        assert_eq!(report.pending_accel, 1);
        assert_eq!((out[0].ch0, out[0].ch1, out[0].ch2), (10, 20, 30));
        assert_eq!((out[0].x, out[0].y, out[0].z), (1.0, 2.0, 3.0));
    }

    #[tokio::test]
    async fn test_run_stops_at_record_limit() {
        let mock = MockDevice::for_profile(DeviceProfile::Oh1, Duration::from_secs(5));
        let mut session = DeviceSession::new(
            SessionConfig::default(),
            mock,
            RecordingControlChannel::new(),
        );

        let mut count = 0u64;
        let report = session
            .run(
                &mut |_: FusedRecord| count += 1,
                RunLimits {
                    max_records: Some(20),
                },
            )
            .await;

        assert_eq!(report.stop_reason, StopReason::RecordLimit);
        assert!(report.fused >= 20);
        assert_eq!(report.fused, count);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let (_tx, source) = ChannelSource::bounded(1);
        let mut session = session(source);

        let report = session
            .run_until(&mut |_: FusedRecord| {}, RunLimits::default(), async {})
            .await;
        assert_eq!(report.stop_reason, StopReason::Shutdown);
        assert_eq!(report.notifications, 0);
    }
}
