//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - contract sanity checks
//! - mock device -> session -> dispatcher e2e (no hardware needed)
//! - capture replay and configuration-driven layouts

#[cfg(test)]
mod contract_tests {
    use contracts::{DeviceProfile, FrameLayout, MeasurementKind};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_default_frame_lengths_match_profiles() {
        let layout = FrameLayout::default();
        for profile in [DeviceProfile::Oh1, DeviceProfile::H10] {
            for stream in profile.stream_settings().streams {
                assert!(layout.frame_len(stream.kind) > 9);
            }
        }
        assert_eq!(layout.frame_len(MeasurementKind::Acceleration), 15);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{DeviceProfile, FusedRecord, SinkConfig, SinkType};
    use dispatcher::{create_dispatcher, dispatch_channel};
    use session::{
        write_capture, CaptureSource, ChannelSource, DeviceSession, MockDevice, MockDeviceConfig,
        RecordingControlChannel, RunLimits, SessionConfig, StopReason,
    };

    fn oh1_config() -> SessionConfig {
        SessionConfig {
            name: "armband".into(),
            profile: DeviceProfile::Oh1,
            ..Default::default()
        }
    }

    /// Run a session over `source`, collecting every fused record
    async fn fuse_all<Src>(config: SessionConfig, source: Src) -> (Vec<FusedRecord>, u64)
    where
        Src: contracts::NotificationSource,
    {
        let mut session = DeviceSession::new(config, source, RecordingControlChannel::new());
        session.start().await.unwrap();

        let mut records = Vec::new();
        let report = session
            .run(&mut |r: FusedRecord| records.push(r), RunLimits::default())
            .await;
        assert_eq!(report.stop_reason, StopReason::SourceEnded);
        (records, report.rejected)
    }

    /// End-to-end test: MockDevice -> DeviceSession -> Dispatcher -> FileSink
    ///
    /// Verifies the complete data flow:
    /// 1. the mock device produces interleaved PPG / ACC notifications
    /// 2. the synchronizer pairs every pulse sample with held acceleration
    /// 3. the dispatcher writes each fused record to a JSON lines file
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fused.jsonl");

        let sink_configs = vec![
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 4096,
                params: HashMap::from([("every".to_string(), "50".to_string())]),
            },
            SinkConfig {
                name: "file".to_string(),
                sink_type: SinkType::File,
                queue_capacity: 4096,
                params: HashMap::from([("path".to_string(), path.display().to_string())]),
            },
        ];

        let (mut dispatch_sink, rx) = dispatch_channel(4096);
        let dispatcher = create_dispatcher(sink_configs, rx).unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let device = MockDevice::for_profile(DeviceProfile::Oh1, Duration::from_secs(2));
        let mut session = DeviceSession::new(oh1_config(), device, RecordingControlChannel::new());
        session.start().await.unwrap();
        assert_eq!(session.control().sent().len(), 4);

        let report = session.run(&mut dispatch_sink, RunLimits::default()).await;
        drop(dispatch_sink);

        let sink_metrics = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
            .await
            .expect("dispatcher timed out")
            .unwrap();

        // 2 s at 135 Hz; the last few pulses have no later acceleration
        assert!(report.fused >= 260, "fused {}", report.fused);
        assert_eq!(report.fused + report.pending_pulse as u64, report.sync.pulse_enqueued);
        for (name, snapshot) in &sink_metrics {
            assert_eq!(snapshot.write_count, report.fused, "sink {name}");
            assert_eq!(snapshot.dropped_count, 0, "sink {name}");
        }

        let records: Vec<FusedRecord> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len() as u64, report.fused);
        assert!(records.windows(2).all(|w| w[0].ts < w[1].ts));
        // gravity rotates in the x/z plane
        assert!(records.iter().all(|r| {
            let magnitude = (r.x * r.x + r.z * r.z).sqrt();
            (0.99..=1.01).contains(&magnitude)
        }));
    }

    /// Garbage notifications between valid ones must not change the output
    #[tokio::test]
    async fn test_rejected_notifications_do_not_disturb_fusion() {
        let frames = MockDevice::for_profile(DeviceProfile::Oh1, Duration::from_millis(500))
            .collect_frames()
            .unwrap();

        let (clean, rejected) =
            fuse_all(oh1_config(), CaptureSource::from_frames(frames.clone())).await;
        assert_eq!(rejected, 0);

        let (tx, source) = ChannelSource::bounded(16);
        let producer = tokio::spawn(async move {
            for (i, frame) in frames.into_iter().enumerate() {
                if i % 7 == 3 {
                    // unknown tag
                    tx.send(Bytes::from_static(&[0x7f, 0, 0, 0])).await.unwrap();
                }
                if i % 11 == 5 {
                    // truncated copy
                    tx.send(frame.slice(..frame.len() - 2)).await.unwrap();
                }
                tx.send(frame).await.unwrap();
            }
        });

        let (noisy, rejected) = fuse_all(oh1_config(), source).await;
        producer.await.unwrap();

        assert!(rejected > 0);
        assert_eq!(noisy, clean);
    }

    /// A capture file replays to the same records as the live mock
    #[tokio::test]
    async fn test_capture_replay_matches_live() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oh1.cap");

        let config = MockDeviceConfig {
            duration: Duration::from_millis(800),
            ..Default::default()
        };
        let frames = MockDevice::new(config.clone()).collect_frames().unwrap();
        write_capture(&path, &frames).unwrap();

        let (live, _) = fuse_all(oh1_config(), MockDevice::new(config)).await;
        let (replayed, _) = fuse_all(oh1_config(), CaptureSource::open(&path).unwrap()).await;

        assert!(!live.is_empty());
        assert_eq!(live, replayed);
    }

    /// Frame widths come from the configuration file
    #[tokio::test]
    async fn test_config_layout_drives_decoding() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
            [device]
            profile = "oh1"
            name = "wide"

            [frame]
            pulse = "i32"
            acceleration = "i32"
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let config = SessionConfig::from_blueprint(&blueprint);
        let device = MockDevice::new(MockDeviceConfig {
            layout: blueprint.frame,
            duration: Duration::from_millis(300),
            ..Default::default()
        });
        let (records, rejected) = fuse_all(config.clone(), device).await;
        assert_eq!(rejected, 0);
        assert!(!records.is_empty());

        // The default layout does not match the configured one
        let narrow = MockDevice::new(MockDeviceConfig {
            duration: Duration::from_millis(300),
            ..Default::default()
        });
        let (records, rejected) = fuse_all(config, narrow).await;
        assert!(records.is_empty());
        assert!(rejected > 0);
    }

    /// H10 streams ECG; nothing is fused but acceleration is queued
    #[tokio::test]
    async fn test_h10_produces_no_records() {
        let config = SessionConfig {
            name: "strap".into(),
            profile: DeviceProfile::H10,
            ..Default::default()
        };
        let device = MockDevice::for_profile(DeviceProfile::H10, Duration::from_millis(200));

        let mut session = DeviceSession::new(config, device, RecordingControlChannel::new());
        let mut count = 0u64;
        let report = session
            .run(&mut |_: FusedRecord| count += 1, RunLimits::default())
            .await;

        assert_eq!(count, 0);
        assert_eq!(report.sync.ignored, 40);
        assert_eq!(report.pending_accel, 40);
    }

    /// Aggregator fed by the same closure that forwards to the dispatcher
    #[tokio::test]
    async fn test_aggregator_summary_over_session() {
        let device = MockDevice::for_profile(DeviceProfile::Oh1, Duration::from_secs(1));
        let mut session = DeviceSession::new(oh1_config(), device, RecordingControlChannel::new());

        let mut aggregator = observability::SessionMetricsAggregator::new();
        let report = session
            .run(
                &mut |r: FusedRecord| aggregator.observe_record(&r),
                RunLimits::default(),
            )
            .await;

        let summary = aggregator.summary();
        assert_eq!(summary.total_records, report.fused);
        // pulse samples arrive every 7 ms
        assert!((summary.interval_ms.mean - 7.4).abs() < 0.5, "{}", summary.interval_ms);
    }
}
