//! Pipeline orchestrator - wires a notification source through a device
//! session into the dispatcher.
//!
//! There is no radio transport in this binary: notifications come from the
//! synthetic device or from a capture file, and control commands are
//! recorded and logged instead of being written to a characteristic.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{FusedRecord, MeasurementSink, NotificationSource, SessionBlueprint};
use dispatcher::{create_dispatcher, dispatch_channel};
use observability::SessionMetricsAggregator;
use session::{
    CaptureSource, DeviceSession, MockDevice, MockDeviceConfig, RecordingControlChannel,
    RunLimits, SessionConfig,
};
use tracing::{info, warn};

use super::PipelineStats;

/// Time allowed for sinks to drain after the session ends
const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Where notifications come from
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Synthetic device of the configured profile
    Mock {
        duration: Duration,
        /// Real-time multiplier; `None` releases frames as fast as pulled
        pace: Option<f64>,
    },
    /// Recorded notification payloads
    Capture {
        path: PathBuf,
        speed: Option<f64>,
    },
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: SessionBlueprint,

    pub input: InputSource,

    /// Maximum number of fused records (None = unlimited)
    pub max_records: Option<u64>,

    /// Dispatcher input buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the source ends, the record limit is hit or `shutdown`
    /// completes
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        match &self.config.input {
            InputSource::Mock { duration, pace } => {
                let blueprint = &self.config.blueprint;
                info!(
                    profile = %blueprint.device.profile,
                    duration_secs = duration.as_secs_f64(),
                    "Running with synthetic device"
                );
                let device = MockDevice::new(MockDeviceConfig {
                    profile: blueprint.device.profile,
                    layout: blueprint.frame,
                    duration: *duration,
                    pace: *pace,
                    ..Default::default()
                });
                self.run_with(device, shutdown).await
            }
            InputSource::Capture { path, speed } => {
                let mut source = CaptureSource::open(path)
                    .with_context(|| format!("Failed to open capture {}", path.display()))?;
                info!(
                    path = %path.display(),
                    notifications = source.remaining(),
                    "Replaying capture"
                );
                if let Some(speed) = speed {
                    source = source.paced(*speed);
                }
                self.run_with(source, shutdown).await
            }
        }
    }

    async fn run_with<Src, F>(&self, source: Src, shutdown: F) -> Result<PipelineStats>
    where
        Src: NotificationSource,
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Dispatcher
        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - fused records will only be counted");
        }
        let (mut dispatch_sink, dispatch_rx) = dispatch_channel(self.config.buffer_size);
        let dispatcher = create_dispatcher(blueprint.sinks.clone(), dispatch_rx)
            .context("Failed to create dispatcher")?;
        let active_sinks = blueprint.sinks.len();
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks, "Dispatcher started");

        // Session
        let mut session = DeviceSession::new(
            SessionConfig::from_blueprint(blueprint),
            source,
            RecordingControlChannel::new(),
        );
        session
            .start()
            .await
            .context("Failed to start device streams")?;

        let mut aggregator = SessionMetricsAggregator::new();
        let limits = RunLimits {
            max_records: self.config.max_records,
        };
        info!(max_records = ?limits.max_records, "Pipeline running");

        let report = {
            let mut sink = |record: FusedRecord| {
                aggregator.observe_record(&record);
                dispatch_sink.on_fused(record);
            };
            session.run_until(&mut sink, limits, shutdown).await
        };

        let decoder = session.decoder_metrics();
        aggregator.add_rejected("malformed_frame", decoder.malformed);
        aggregator.add_rejected("unknown_kind", decoder.unknown_kind);

        // Closing the input lets the dispatcher drain and shut its sinks down
        let dispatch_forwarded = dispatch_sink.forwarded();
        let dispatch_dropped = dispatch_sink.dropped();
        drop(dispatch_sink);

        info!("Waiting for sinks to drain...");
        let sink_metrics =
            match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher_handle).await {
                Ok(Ok(metrics)) => metrics,
                Ok(Err(e)) => {
                    warn!(error = %e, "Dispatcher task failed");
                    Vec::new()
                }
                Err(_) => {
                    warn!(
                        timeout_secs = DISPATCHER_DRAIN_TIMEOUT.as_secs(),
                        "Dispatcher did not drain in time"
                    );
                    Vec::new()
                }
            };

        let stats = PipelineStats {
            report,
            summary: aggregator.summary(),
            dispatch_forwarded,
            dispatch_dropped,
            sinks: sink_metrics,
            duration: start_time.elapsed(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate = format!("{:.2}", stats.records_per_sec()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}
