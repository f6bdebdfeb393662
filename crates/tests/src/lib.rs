//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 → 相机 → 采集 → sink 的端到端测试
//! - 采集状态机、溢出策略与帧顺序的跨 crate 校验
//! - 直接组装 ingestion / sequencer / observability 的流水线测试

#[cfg(test)]
mod support {
    use std::sync::{Arc, Mutex};

    use contracts::{CameraBlueprint, CameraError, Frame, FrameBuffer, FrameSink, SinkStatus};

    /// 64x64 Mono8，零曝光，固定随机种子
    pub fn blueprint() -> CameraBlueprint {
        let mut blueprint = CameraBlueprint::default();
        blueprint.camera.ccd_width = 64;
        blueprint.camera.ccd_height = 64;
        blueprint.synthesis.exposure_ms = 0.0;
        blueprint.synthesis.seed = Some(7);
        blueprint.sequence.drain_timeout_ms = 50;
        blueprint
    }

    /// 收集所有帧的 sink
    #[derive(Clone, Default)]
    pub struct CollectSink(pub Arc<Mutex<Vec<Frame>>>);

    impl CollectSink {
        pub fn frames(&self) -> Vec<Frame> {
            self.0.lock().unwrap().clone()
        }
    }

    impl FrameSink for CollectSink {
        fn name(&self) -> &str {
            "collect"
        }

        fn insert(&mut self, frame: &Frame) -> Result<SinkStatus, CameraError> {
            self.0.lock().unwrap().push(frame.clone());
            Ok(SinkStatus::Accepted)
        }

        fn clear(&mut self) -> Result<(), CameraError> {
            self.0.lock().unwrap().clear();
            Ok(())
        }
    }

    /// 把交付的帧还原成 FrameBuffer 以便解码
    pub fn to_buffer(frame: &Frame) -> FrameBuffer {
        let mut buffer = FrameBuffer::new(
            frame.geometry.width,
            frame.geometry.height,
            frame.geometry.format,
        );
        buffer.as_bytes_mut().copy_from_slice(&frame.data);
        buffer
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::{FrameCount, RunStatus};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_unbounded_sentinel() {
        assert_eq!(FrameCount::from_raw(u64::MAX), FrameCount::Unbounded);
        assert_eq!(FrameCount::from_raw(3), FrameCount::Bounded(3));
    }

    #[test]
    fn test_run_status_labels() {
        assert_eq!(RunStatus::Overflow.to_string(), "overflow");
        assert_eq!(
            RunStatus::Failed("boom".to_string()).to_string(),
            "failed: boom"
        );
    }
}

#[cfg(test)]
mod config_tests {
    use camera::Camera;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{PixelFormat, RunStatus};
    use std::time::Duration;

    const CONFIG: &str = r#"
[camera]
label = "Bench"
ccd_width = 128
ccd_height = 96
binning = 2
pixel_format = "16bit"
bit_depth = 12

[synthesis]
exposure_ms = 0.0
seed = 3

[sequence]
frame_count = 6
drain_timeout_ms = 50

[sink]
name = "ring"
sink_type = "circular_buffer"
capacity = 8
"#;

    #[test]
    fn test_config_to_camera_to_ring() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let camera = Camera::from_blueprint(&blueprint).unwrap();

        let geometry = camera.status().geometry;
        assert_eq!((geometry.width, geometry.height), (64, 48));
        assert_eq!(geometry.format, PixelFormat::Mono16);
        assert_eq!(geometry.bit_depth, 12);

        camera.start_configured_sequence().unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(5)));

        let status = camera.status();
        assert_eq!(status.acquisition.last_status, Some(RunStatus::Completed));
        let frames = camera.frame_ring().unwrap().drain();
        assert_eq!(frames.len(), 6);
        assert!(frames.iter().all(|f| f.metadata.camera == "Bench"));
        assert!(frames.iter().all(|f| f.data.len() == 64 * 48 * 2));
    }

    #[test]
    fn test_sample_config_validates() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/camera.toml");
        let blueprint = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(blueprint.camera.label, "DemoCam");
        assert!(Camera::from_blueprint(&blueprint).is_ok());
    }

    #[test]
    fn test_invalid_binning_rejected_before_camera() {
        let content = CONFIG.replace("binning = 2", "binning = 3");
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("camera.binning"));
    }
}

#[cfg(test)]
mod sequence_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use camera::Camera;
    use contracts::{
        AcquisitionListener, AcquisitionPhase, CameraError, FrameCount, RunStatus, RunSummary,
        SinkType, SourceConfig,
    };
    use pattern_engine::decode_frame_number;

    use crate::support::{blueprint, to_buffer, CollectSink};

    #[derive(Default)]
    struct Recorder {
        calls: AtomicU64,
        last: Mutex<Option<RunSummary>>,
    }

    impl AcquisitionListener for Recorder {
        fn acquisition_finished(&self, summary: &RunSummary) -> Result<(), CameraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(summary.clone());
            Ok(())
        }
    }

    #[test]
    fn test_state_machine_and_restart() {
        let camera = Camera::from_blueprint(&blueprint()).unwrap();
        let recorder = Arc::new(Recorder::default());
        camera.set_listener(Some(recorder.clone()));
        assert_eq!(camera.controller().phase(), AcquisitionPhase::Idle);

        camera
            .start_sequence(FrameCount::Unbounded, 1.0, false)
            .unwrap();
        assert!(camera.is_capturing());

        let err = camera
            .start_sequence(FrameCount::Bounded(1), 0.0, false)
            .unwrap_err();
        assert!(err.is_busy());
        assert!(camera.set_binning(2).unwrap_err().is_busy());

        std::thread::sleep(Duration::from_millis(20));
        camera.stop_sequence();
        assert!(!camera.is_capturing());
        assert_eq!(camera.controller().phase(), AcquisitionPhase::Stopped);
        assert_eq!(
            recorder.last.lock().unwrap().as_ref().unwrap().status,
            RunStatus::Interrupted
        );

        // a second run starts from zero
        camera
            .start_sequence(FrameCount::Bounded(3), 0.0, false)
            .unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(5)));
        assert_eq!(camera.controller().frames_delivered(), 3);
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 2);

        // stop after completion is a no-op
        camera.stop_sequence();
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_frame_request_rejected() {
        let camera = Camera::from_blueprint(&blueprint()).unwrap();
        let err = camera
            .start_sequence(FrameCount::Bounded(0), 0.0, false)
            .unwrap_err();
        assert!(matches!(err, CameraError::InvalidSize { .. }));
        assert!(!camera.is_capturing());
    }

    #[test]
    fn test_overflow_clears_and_continues() {
        let mut bp = blueprint();
        bp.sink.sink_type = SinkType::CircularBuffer;
        bp.sink.capacity = 4;
        let camera = Camera::from_blueprint(&bp).unwrap();

        camera
            .start_sequence(FrameCount::Bounded(10), 0.0, false)
            .unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(5)));

        let status = camera.status();
        assert_eq!(status.acquisition.last_status, Some(RunStatus::Completed));
        assert_eq!(status.acquisition.frames_delivered, 10);
        assert_eq!(status.sink.clear_count, 2);
        assert_eq!(status.sink.insert_count, 12);

        let kept: Vec<u64> = camera
            .frame_ring()
            .unwrap()
            .drain()
            .iter()
            .map(|f| f.metadata.frame_index)
            .collect();
        assert_eq!(kept, vec![8, 9]);
    }

    #[test]
    fn test_overflow_stops_run() {
        let mut bp = blueprint();
        bp.sink.capacity = 4;
        let camera = Camera::from_blueprint(&bp).unwrap();

        camera
            .start_sequence(FrameCount::Bounded(10), 0.0, true)
            .unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(5)));

        let status = camera.status();
        assert_eq!(status.acquisition.last_status, Some(RunStatus::Overflow));
        assert_eq!(status.acquisition.frames_delivered, 4);
        assert_eq!(status.sink.clear_count, 0);
        assert_eq!(camera.frame_ring().unwrap().len(), 4);
    }

    #[test]
    fn test_synthesized_frames_in_order() {
        let mut bp = blueprint();
        bp.camera.ccd_width = 128;
        bp.synthesis.display_frame_number = true;
        let sink = CollectSink::default();
        let camera = Camera::with_sink(&bp, Box::new(sink.clone())).unwrap();

        camera
            .start_sequence(FrameCount::Bounded(12), 0.0, false)
            .unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(5)));

        let frames = sink.frames();
        let decoded: Vec<u64> = frames
            .iter()
            .map(|f| decode_frame_number(&to_buffer(f)).unwrap())
            .collect();
        assert_eq!(decoded, (0..12).collect::<Vec<_>>());
        let indices: Vec<u64> = frames.iter().map(|f| f.metadata.frame_index).collect();
        assert_eq!(indices, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_mock_hardware_never_delivers_twice() {
        let mut bp = blueprint();
        bp.camera.ccd_width = 128;
        bp.synthesis.display_frame_number = true;
        bp.source = SourceConfig::MockHardware {
            frequency_hz: 500.0,
        };
        let sink = CollectSink::default();
        let camera = Camera::with_sink(&bp, Box::new(sink.clone())).unwrap();

        camera
            .start_sequence(FrameCount::Bounded(20), 0.0, false)
            .unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(10)));

        let frames = sink.frames();
        assert_eq!(frames.len(), 20);
        for pair in frames.windows(2) {
            assert!(pair[0].metadata.sequence_number < pair[1].metadata.sequence_number);
            let a = decode_frame_number(&to_buffer(&pair[0])).unwrap();
            let b = decode_frame_number(&to_buffer(&pair[1])).unwrap();
            assert!(a < b, "frame {a} delivered before {b}");
        }
    }

    #[test]
    fn test_interval_spacing_in_metadata() {
        let sink = CollectSink::default();
        let camera = Camera::with_sink(&blueprint(), Box::new(sink.clone())).unwrap();

        camera
            .start_sequence(FrameCount::Bounded(4), 15.0, false)
            .unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(5)));

        let frames = sink.frames();
        assert_eq!(frames.len(), 4);
        for pair in frames.windows(2) {
            let gap = pair[1].metadata.elapsed_ms - pair[0].metadata.elapsed_ms;
            assert!(gap >= 13.0, "gap {gap} ms");
        }
    }

    #[tokio::test]
    async fn test_async_wait_for_completion() {
        let camera = Arc::new(Camera::from_blueprint(&blueprint()).unwrap());
        camera
            .start_sequence(FrameCount::Bounded(5), 0.0, false)
            .unwrap();

        let waiter = Arc::clone(&camera);
        let stopped = tokio::time::timeout(
            Duration::from_secs(5),
            tokio::task::spawn_blocking(move || waiter.wait_until_stopped(Duration::from_secs(5))),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(stopped);
        assert_eq!(camera.frame_ring().unwrap().len(), 5);
    }
}

#[cfg(test)]
mod synthesis_tests {
    use camera::Camera;
    use contracts::{PixelFormat, Roi, SynthesisMode};
    use pattern_engine::samples::pixel_value;

    use crate::support::blueprint;

    #[test]
    fn test_noise_mean_tracks_photon_flux() {
        let mut bp = blueprint();
        bp.camera.pixel_format = PixelFormat::Mono16;
        bp.synthesis.mode = SynthesisMode::GaussianNoise;
        bp.synthesis.photon_flux = 100.0;
        bp.synthesis.exposure_ms = 10.0;
        let camera = Camera::from_blueprint(&bp).unwrap();

        let frame = camera.snap_single().unwrap();
        let n = frame.pixel_count();
        let mean = (0..n).map(|i| pixel_value(&frame, i)).sum::<f64>() / n as f64;
        // 1000 photons over a background offset of 100
        assert!((mean - 1100.0).abs() < 10.0, "mean {mean}");
    }

    #[test]
    fn test_drop_fraction_is_exact() {
        let mut bp = blueprint();
        bp.camera.ccd_width = 100;
        bp.camera.ccd_height = 100;
        bp.synthesis.exposure_ms = 10.0;
        bp.synthesis.drop_fraction = 0.01;
        let camera = Camera::from_blueprint(&bp).unwrap();

        let frame = camera.snap_single().unwrap();
        let zeros = frame.as_bytes().iter().filter(|&&b| b == 0).count();
        assert_eq!(zeros, 100);
    }

    #[test]
    fn test_multi_roi_masks_outside_rectangles() {
        let mut bp = blueprint();
        bp.camera.ccd_width = 100;
        bp.camera.ccd_height = 100;
        bp.synthesis.exposure_ms = 10.0;
        let camera = Camera::from_blueprint(&bp).unwrap();
        camera
            .set_multi_roi(vec![Roi::new(0, 0, 100, 10), Roi::new(0, 90, 100, 10)])
            .unwrap();

        let frame = camera.snap_single().unwrap();
        let zeros = frame.as_bytes().iter().filter(|&&b| b == 0).count();
        assert_eq!(zeros, 8000);
    }

    #[test]
    fn test_buffer_always_matches_geometry() {
        let camera = Camera::from_blueprint(&blueprint()).unwrap();

        let check = |camera: &Camera| {
            let geometry = camera.status().geometry;
            let frame = camera.snap_single().unwrap();
            assert_eq!(frame.len(), geometry.byte_len());
            assert_eq!((frame.width(), frame.height()), (geometry.width, geometry.height));
        };

        check(&camera);
        camera.set_format(PixelFormat::Rgb64).unwrap();
        check(&camera);
        camera.set_binning(4).unwrap();
        check(&camera);
        camera.set_roi(Roi::new(2, 2, 8, 4)).unwrap();
        check(&camera);
        camera.set_bit_depth(12).unwrap();
        check(&camera);
        camera.clear_roi();
        check(&camera);
    }
}

#[cfg(test)]
mod sink_tests {
    use std::time::Duration;

    use camera::Camera;
    use contracts::{FrameCount, SinkType};
    use dispatcher::INDEX_FILE;

    use crate::support::blueprint;

    #[test]
    fn test_file_sink_writes_frames_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut bp = blueprint();
        bp.sink.name = "disk".to_string();
        bp.sink.sink_type = SinkType::File;
        bp.sink.path = Some(dir.path().to_path_buf());
        let camera = Camera::from_blueprint(&bp).unwrap();
        assert!(camera.frame_ring().is_none());

        camera
            .start_sequence(FrameCount::Bounded(3), 0.0, false)
            .unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(5)));

        for index in 0..3 {
            let path = dir.path().join(format!("frame_{index:06}.raw"));
            assert_eq!(std::fs::metadata(&path).unwrap().len(), 64 * 64);
        }

        let index = std::fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
        let lines: Vec<serde_json::Value> = index
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2]["metadata"]["frame_index"], 2);
    }

    #[test]
    fn test_log_sink_never_overflows() {
        let mut bp = blueprint();
        bp.sink.name = "log".to_string();
        bp.sink.sink_type = SinkType::Log;
        let camera = Camera::from_blueprint(&bp).unwrap();

        camera
            .start_sequence(FrameCount::Bounded(20), 0.0, true)
            .unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(5)));

        let status = camera.status();
        assert_eq!(status.acquisition.frames_delivered, 20);
        assert_eq!(status.sink.overflow_count, 0);
    }
}

#[cfg(test)]
mod pipeline_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use contracts::{
        FrameCount, FrameDriver, PixelFormat, RunStatus, RunSummary, SequenceRequest,
        SynthesisParameters,
    };
    use dispatcher::{CircularBufferSink, SinkAdapter};
    use ingestion::{
        CallbackSource, DrainOutcome, FrameHandoff, FrameSource, MockFrameDriver,
        SynthesizedSource, EMPTY_SEQUENCE,
    };
    use observability::AcquisitionMetricsAggregator;
    use pattern_engine::{FrameSynthesizer, GeometryManager, ParameterStore};
    use sequencer::{ControllerConfig, SequenceController};

    fn synthesizer() -> Arc<FrameSynthesizer> {
        let geometry = Arc::new(GeometryManager::new(32, 32, PixelFormat::Mono8).unwrap());
        let params = SynthesisParameters {
            exposure_ms: 0.0,
            seed: Some(11),
            ..Default::default()
        };
        Arc::new(FrameSynthesizer::new(
            geometry,
            Arc::new(ParameterStore::new(params)),
        ))
    }

    #[test]
    fn test_mock_driver_feeds_handoff_in_order() {
        let driver = Arc::new(MockFrameDriver::with_frequency(synthesizer(), 500.0));
        let source = CallbackSource::new(driver.clone());
        let handoff = Arc::new(FrameHandoff::new());
        source.attach(handoff.clone()).unwrap();
        assert!(driver.is_listening());

        let mut last = EMPTY_SEQUENCE;
        let mut drained = 0;
        let deadline = Instant::now() + Duration::from_secs(5);
        while drained < 10 && Instant::now() < deadline {
            if let DrainOutcome::Frame(frame) = handoff.drain(last, Duration::from_millis(50)) {
                assert!(frame.sequence > last);
                assert_eq!(frame.data.len(), 32 * 32);
                last = frame.sequence;
                drained += 1;
            }
        }
        source.detach();

        assert_eq!(drained, 10);
        assert!(!driver.is_listening());
        assert!(driver.frames_emitted() >= 10);
        assert!(handoff.metrics().snapshot().published >= 10);
    }

    #[test]
    fn test_controller_run_feeds_metrics_aggregator() {
        let sink = CircularBufferSink::new("ring", 16);
        let ring = sink.ring();
        let controller = SequenceController::new(
            ControllerConfig {
                label: "AggCam".to_string(),
                drain_timeout: Duration::from_millis(50),
            },
            Arc::new(SynthesizedSource::new("synth", synthesizer())),
            Arc::new(SinkAdapter::new("AggCam", Box::new(sink))),
        );

        controller
            .start(SequenceRequest::new(FrameCount::Bounded(6), 10.0, false))
            .unwrap();
        assert!(controller.wait_until_stopped(Duration::from_secs(5)));

        let mut aggregator = AcquisitionMetricsAggregator::new();
        for frame in ring.drain() {
            aggregator.update(&frame.metadata);
        }
        let snapshot = controller.snapshot();
        aggregator.finish(&RunSummary {
            frames_delivered: snapshot.frames_delivered,
            status: snapshot.last_status.clone().unwrap(),
            elapsed: snapshot.elapsed.unwrap_or_default(),
        });

        let summary = aggregator.summary();
        assert_eq!(summary.total_frames, 6);
        assert_eq!(summary.superseded_frames, 0);
        assert_eq!(summary.interval_ms.count, 5);
        assert!(summary.interval_ms.min >= 8.0);
        assert_eq!(summary.last_run.unwrap().status, RunStatus::Completed);
    }
}
