//! Mock 硬件驱动
//!
//! 在无真实相机的环境下模拟厂商 SDK 的回调边界：后台线程按固定频率
//! 用 Pattern Engine 生成帧，并在自己的线程上调用回调。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{FrameCallback, FrameDriver};
use pattern_engine::FrameSynthesizer;
use tracing::{debug, trace, warn};

use crate::signal::StopSignal;

/// Mock 驱动配置
#[derive(Debug, Clone)]
pub struct MockDriverConfig {
    /// 驱动名称
    pub name: String,

    /// 出帧频率 (Hz)
    pub frequency_hz: f64,
}

impl Default for MockDriverConfig {
    fn default() -> Self {
        Self {
            name: "mock_driver".to_string(),
            frequency_hz: 30.0,
        }
    }
}

/// Mock 硬件驱动
pub struct MockFrameDriver {
    config: MockDriverConfig,
    synthesizer: Arc<FrameSynthesizer>,
    listening: AtomicBool,
    frames_emitted: Arc<AtomicU64>,
    stop: StopSignal,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MockFrameDriver {
    /// 创建新的 Mock 驱动
    pub fn new(config: MockDriverConfig, synthesizer: Arc<FrameSynthesizer>) -> Self {
        Self {
            config,
            synthesizer,
            listening: AtomicBool::new(false),
            frames_emitted: Arc::new(AtomicU64::new(0)),
            stop: StopSignal::new(),
            worker: Mutex::new(None),
        }
    }

    /// 以给定频率创建
    pub fn with_frequency(synthesizer: Arc<FrameSynthesizer>, frequency_hz: f64) -> Self {
        Self::new(
            MockDriverConfig {
                frequency_hz,
                ..Default::default()
            },
            synthesizer,
        )
    }

    /// 已回调的帧数
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted.load(Ordering::SeqCst)
    }

    fn period(&self) -> Duration {
        if self.config.frequency_hz.is_finite() && self.config.frequency_hz > 0.0 {
            Duration::from_secs_f64(1.0 / self.config.frequency_hz)
        } else {
            Duration::from_secs(1)
        }
    }
}

impl FrameDriver for MockFrameDriver {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn listen(&self, callback: FrameCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop.reset();

        let name = self.config.name.clone();
        let period = self.period();
        let synthesizer = self.synthesizer.clone();
        let stop = self.stop.clone();
        let emitted = self.frames_emitted.clone();

        let spawned = thread::Builder::new()
            .name(format!("{name}-driver"))
            .spawn(move || {
                debug!(driver = %name, period_ms = period.as_millis() as u64, "Mock driver started");
                let mut frame_number: u64 = 0;
                loop {
                    let tick = Instant::now();
                    if stop.is_stopped() {
                        break;
                    }
                    let exposure_ms = synthesizer.parameters().exposure_ms();
                    synthesizer.render_with(frame_number, exposure_ms, |buffer, geometry| {
                        callback(buffer.as_bytes(), geometry)
                    });
                    emitted.fetch_add(1, Ordering::SeqCst);
                    trace!(driver = %name, frame_number, "Mock frame delivered");
                    frame_number += 1;

                    if stop.wait_until(tick + period) {
                        break;
                    }
                }
                debug!(driver = %name, frames = frame_number, "Mock driver stopped");
            });

        match spawned {
            Ok(handle) => {
                *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
            }
            Err(e) => {
                warn!(driver = %self.config.name, error = %e, "Failed to spawn mock driver thread");
                self.listening.store(false, Ordering::SeqCst);
            }
        }
    }

    fn stop(&self) {
        self.stop.stop();
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!(driver = %self.config.name, "Mock driver thread panicked");
            }
        }
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

impl Drop for MockFrameDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
