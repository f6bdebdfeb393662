//! Camera 设备门面
//!
//! 把各组件按 blueprint 装配起来，并实现设备层看到的操作。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use contracts::{
    AcquisitionListener, AcquisitionSnapshot, CameraBlueprint, CameraError, FrameBuffer,
    FrameCount, FrameGeometry, FrameManipulator, FrameSink, PixelFormat, Roi, SequenceRequest,
    SourceConfig, SynthesisParameters, TriggerDevice,
};
use dispatcher::{create_sink, FrameRing, MetricsSnapshot, SinkAdapter};
use ingestion::{
    millis, wait_for_elapsed, CallbackSource, FrameSource, MockDriverConfig, MockFrameDriver,
    SynthesizedSource,
};
use pattern_engine::{FrameSynthesizer, GeometryManager, ParameterStore};
use sequencer::{ControllerConfig, SequenceController};
use tracing::{debug, info, instrument};

use crate::trigger::SoftwareTrigger;

/// 曝光时间上限 (毫秒)
const MAX_EXPOSURE_MS: f64 = 10_000.0;

type Result<T> = std::result::Result<T, CameraError>;

/// 设备状态快照
#[derive(Debug, Clone)]
pub struct CameraStatus {
    pub label: String,
    pub geometry: FrameGeometry,
    pub roi: Roi,
    pub scan_mode: u32,
    pub exposure_ms: f64,
    pub acquisition: AcquisitionSnapshot,
    pub sink: MetricsSnapshot,
}

/// 模拟相机
pub struct Camera {
    label: String,
    geometry: Arc<GeometryManager>,
    parameters: Arc<ParameterStore>,
    synthesizer: Arc<FrameSynthesizer>,
    controller: SequenceController,
    ring: Option<FrameRing>,
    readout_ms: RwLock<f64>,
    default_request: SequenceRequest,
    snaps: AtomicU64,
}

impl Camera {
    /// 从 blueprint 创建相机（sink 按配置创建）
    #[instrument(name = "camera_from_blueprint", skip(blueprint), fields(camera = %blueprint.camera.label))]
    pub fn from_blueprint(blueprint: &CameraBlueprint) -> Result<Self> {
        let built = create_sink(&blueprint.sink)?;
        let mut camera = Self::with_sink(blueprint, built.sink)?;
        camera.ring = built.ring;
        Ok(camera)
    }

    /// 从 blueprint 创建相机，使用外部提供的 sink
    pub fn with_sink(blueprint: &CameraBlueprint, sink: Box<dyn FrameSink>) -> Result<Self> {
        let label = blueprint.camera.label.clone();

        let geometry = Arc::new(GeometryManager::from_config(&blueprint.camera)?);
        let parameters = Arc::new(ParameterStore::new(blueprint.synthesis.clone()));
        parameters.set_exposure_sequence(blueprint.camera.exposure_sequence.clone());

        let synthesizer = Arc::new(FrameSynthesizer::new(geometry.clone(), parameters.clone()));
        synthesizer.set_fast_image(blueprint.camera.fast_image);

        let source: Arc<dyn FrameSource> = match &blueprint.source {
            SourceConfig::Synthesized => {
                Arc::new(SynthesizedSource::new(label.clone(), synthesizer.clone()))
            }
            SourceConfig::MockHardware { frequency_hz } => {
                let driver = MockFrameDriver::new(
                    MockDriverConfig {
                        name: format!("{label}-mock"),
                        frequency_hz: *frequency_hz,
                    },
                    synthesizer.clone(),
                );
                Arc::new(CallbackSource::new(Arc::new(driver)))
            }
        };

        let adapter = Arc::new(SinkAdapter::new(label.clone(), sink));
        let controller = SequenceController::new(
            ControllerConfig {
                label: label.clone(),
                drain_timeout: Duration::from_millis(blueprint.sequence.drain_timeout_ms),
            },
            source,
            adapter,
        );

        if let Some(trigger) = &blueprint.trigger {
            controller.set_trigger(Some(Arc::new(SoftwareTrigger::new(&trigger.device))));
        }

        info!(
            camera = %label,
            geometry = ?geometry.geometry(),
            source = %controller.source().name(),
            sink = %controller.sink().sink_name(),
            "Camera assembled"
        );

        Ok(Self {
            label,
            geometry,
            parameters,
            synthesizer,
            controller,
            ring: None,
            readout_ms: RwLock::new(blueprint.camera.readout_ms),
            default_request: blueprint.sequence.to_request(),
            snaps: AtomicU64::new(0),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn geometry(&self) -> &Arc<GeometryManager> {
        &self.geometry
    }

    pub fn parameters(&self) -> &Arc<ParameterStore> {
        &self.parameters
    }

    pub fn controller(&self) -> &SequenceController {
        &self.controller
    }

    /// 环形缓冲 sink 的消费端（仅 circular_buffer）
    pub fn frame_ring(&self) -> Option<FrameRing> {
        self.ring.clone()
    }

    fn ensure_idle(&self, operation: &str) -> Result<()> {
        if self.controller.is_capturing() {
            return Err(CameraError::busy(operation));
        }
        Ok(())
    }

    fn geometry_changed(&self) {
        if self.controller.is_capturing() {
            self.controller.invalidate_slots();
        }
    }

    // ===== 格式 / 几何 =====

    pub fn set_format(&self, format: PixelFormat) -> Result<()> {
        self.ensure_idle("change the pixel format")?;
        self.geometry.set_format(format);
        Ok(())
    }

    /// 按设备名称设置格式；未知名称回退到 `8bit` 并返回 `UnknownFormat`
    pub fn set_format_by_name(&self, name: &str) -> Result<()> {
        self.ensure_idle("change the pixel format")?;
        self.geometry.set_format_by_name(name)
    }

    pub fn set_bit_depth(&self, bit_depth: u32) -> Result<()> {
        self.ensure_idle("change the bit depth")?;
        self.geometry.set_bit_depth(bit_depth)
    }

    pub fn set_geometry(&self, ccd_width: u32, ccd_height: u32, binning: u32) -> Result<()> {
        self.ensure_idle("change the geometry")?;
        self.geometry.set_geometry(ccd_width, ccd_height, binning)
    }

    pub fn set_binning(&self, binning: u32) -> Result<()> {
        self.ensure_idle("change binning")?;
        self.geometry.set_binning(binning)
    }

    pub fn set_scan_mode(&self, scan_mode: u32) -> Result<()> {
        self.ensure_idle("change the scan mode")?;
        self.geometry.set_scan_mode(scan_mode)
    }

    // ===== ROI =====

    pub fn set_roi(&self, roi: Roi) -> Result<()> {
        self.geometry.set_roi(roi)?;
        self.geometry_changed();
        Ok(())
    }

    pub fn set_multi_roi(&self, rects: Vec<Roi>) -> Result<()> {
        self.geometry.set_multi_roi(rects)?;
        self.geometry_changed();
        Ok(())
    }

    pub fn clear_roi(&self) {
        self.geometry.clear_roi();
        self.geometry_changed();
    }

    pub fn roi(&self) -> Roi {
        self.geometry.roi()
    }

    // ===== 曝光 / 合成参数 =====

    pub fn exposure_ms(&self) -> f64 {
        self.parameters.exposure_ms()
    }

    pub fn set_exposure(&self, exposure_ms: f64) -> Result<()> {
        check_exposure("exposure_ms", exposure_ms)?;
        self.parameters.set_exposure_ms(exposure_ms);
        Ok(())
    }

    /// 设置曝光序列；空列表表示使用普通曝光
    pub fn set_exposure_sequence(&self, values: Vec<f64>) -> Result<()> {
        for (idx, value) in values.iter().enumerate() {
            check_exposure(&format!("exposure_sequence[{idx}]"), *value)?;
        }
        self.parameters.set_exposure_sequence(values);
        Ok(())
    }

    pub fn update_synthesis(&self, f: impl FnOnce(&mut SynthesisParameters)) {
        self.parameters.update(f);
    }

    pub fn set_fast_image(&self, enabled: bool) {
        self.synthesizer.set_fast_image(enabled);
    }

    pub fn set_readout_ms(&self, readout_ms: f64) {
        *self
            .readout_ms
            .write()
            .unwrap_or_else(PoisonError::into_inner) = readout_ms.max(0.0);
    }

    fn readout_ms(&self) -> f64 {
        *self.readout_ms.read().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== 采集 =====

    /// 启动采集序列
    pub fn start_sequence(
        &self,
        count: FrameCount,
        interval_ms: f64,
        stop_on_overflow: bool,
    ) -> Result<()> {
        self.controller
            .start(SequenceRequest::new(count, interval_ms, stop_on_overflow))
    }

    /// 按 `[sequence]` 配置启动
    pub fn start_configured_sequence(&self) -> Result<()> {
        self.controller.start(self.default_request)
    }

    /// 配置中的默认请求
    pub fn default_request(&self) -> SequenceRequest {
        self.default_request
    }

    /// 停止采集（幂等）
    pub fn stop_sequence(&self) {
        self.controller.stop();
    }

    pub fn is_capturing(&self) -> bool {
        self.controller.is_capturing()
    }

    pub fn suspend(&self) {
        self.controller.suspend();
    }

    pub fn resume(&self) {
        self.controller.resume();
    }

    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        self.controller.wait_until_stopped(timeout)
    }

    /// 单帧采集
    ///
    /// 不早于曝光时间返回，并在曝光后再等待读出时间。采集序列进行中也可调用，
    /// 与采集线程在几何锁上串行。
    #[instrument(name = "camera_snap_single", skip(self), fields(camera = %self.label))]
    pub fn snap_single(&self) -> Result<FrameBuffer> {
        let exposure_ms = if self.controller.is_capturing() {
            self.parameters.next_sequence_exposure()
        } else {
            self.parameters.exposure_ms()
        };
        let frame_number = self.snaps.fetch_add(1, Ordering::SeqCst);

        let start = Instant::now();
        wait_for_elapsed(start, millis(exposure_ms));
        let frame = self.synthesizer.render(frame_number, exposure_ms);
        wait_for_elapsed(start, millis(exposure_ms + self.readout_ms()));

        debug!(
            frame_number,
            exposure_ms,
            bytes = frame.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Snap complete"
        );
        Ok(frame)
    }

    /// 注册帧后处理钩子（在交付前修改生成的帧）
    pub fn register_frame_consumer(&self, manipulator: Arc<dyn FrameManipulator>) {
        self.synthesizer.set_manipulator(Some(manipulator));
    }

    pub fn clear_frame_consumer(&self) {
        self.synthesizer.set_manipulator(None);
    }

    pub fn set_trigger(&self, trigger: Option<Arc<dyn TriggerDevice>>) {
        self.controller.set_trigger(trigger);
    }

    pub fn set_listener(&self, listener: Option<Arc<dyn AcquisitionListener>>) {
        self.controller.set_listener(listener);
    }

    pub fn status(&self) -> CameraStatus {
        CameraStatus {
            label: self.label.clone(),
            geometry: self.geometry.geometry(),
            roi: self.geometry.roi(),
            scan_mode: self.geometry.scan_mode(),
            exposure_ms: self.parameters.exposure_ms(),
            acquisition: self.controller.snapshot(),
            sink: self.controller.sink().snapshot(),
        }
    }
}

fn check_exposure(field: &str, exposure_ms: f64) -> Result<()> {
    if !(0.0..=MAX_EXPOSURE_MS).contains(&exposure_ms) {
        return Err(CameraError::invalid_size(
            field,
            format!("exposure must be within 0..={MAX_EXPOSURE_MS} ms, got {exposure_ms}"),
        ));
    }
    Ok(())
}
