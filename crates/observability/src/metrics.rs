//! 采集指标收集模块
//!
//! 基于 FrameMetadata / RunSummary 收集和统计采集流水线的运行指标。

use contracts::{FrameMetadata, RunSummary};
use metrics::{counter, gauge, histogram};

/// 从 FrameMetadata 记录指标
///
/// 每交付一帧调用一次。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_frame_delivered;
///
/// let frame = adapter.frame_from(captured, index, elapsed);
/// adapter.deliver(&frame)?;
/// record_frame_delivered(&frame.metadata);
/// ```
pub fn record_frame_delivered(meta: &FrameMetadata) {
    // 帧计数器
    counter!("camsim_frames_delivered_total", "camera" => meta.camera.clone()).increment(1);

    // 序号 (用于检测被覆盖的帧)
    gauge!("camsim_last_sequence_number", "camera" => meta.camera.clone())
        .set(meta.sequence_number as f64);

    gauge!("camsim_run_elapsed_ms", "camera" => meta.camera.clone()).set(meta.elapsed_ms);
}

/// 记录相邻两帧的交付间隔
pub fn record_frame_interval_ms(camera: &str, interval_ms: f64) {
    histogram!("camsim_frame_interval_ms", "camera" => camera.to_string()).record(interval_ms);
}

/// 记录一次采集结束
pub fn record_run_finished(camera: &str, summary: &RunSummary) {
    counter!(
        "camsim_runs_finished_total",
        "camera" => camera.to_string(),
        "status" => summary.status.label().to_string()
    )
    .increment(1);

    histogram!("camsim_run_frames", "camera" => camera.to_string())
        .record(summary.frames_delivered as f64);
    histogram!("camsim_run_duration_ms", "camera" => camera.to_string())
        .record(summary.elapsed.as_secs_f64() * 1000.0);
}

/// 记录一次运行中交接缓冲区的累计计数
pub fn record_handoff_totals(camera: &str, published: u64, skipped: u64, wait_timeouts: u64) {
    counter!("camsim_frames_published_total", "camera" => camera.to_string()).increment(published);
    counter!("camsim_frames_skipped_total", "camera" => camera.to_string()).increment(skipped);
    counter!("camsim_drain_wait_timeouts_total", "camera" => camera.to_string())
        .increment(wait_timeouts);
}

/// 记录 sink 当前缓存帧数
pub fn record_sink_depth(sink_name: &str, depth: usize) {
    gauge!("camsim_sink_depth", "sink" => sink_name.to_string()).set(depth as f64);
}

/// 记录触发器失败
pub fn record_trigger_failure(device: &str) {
    counter!("camsim_trigger_failures_total", "device" => device.to_string()).increment(1);
}

/// 采集指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct AcquisitionMetricsAggregator {
    /// 总帧数
    pub total_frames: u64,

    /// 被覆盖（未交付）的帧数，由序号间隙推算
    pub superseded_frames: u64,

    /// 帧间隔统计 (毫秒)
    pub interval_stats: RunningStats,

    /// 最近一次运行结果
    pub last_run: Option<RunSummary>,

    last_sequence: Option<i64>,
    last_elapsed_ms: Option<f64>,
}

impl AcquisitionMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, meta: &FrameMetadata) {
        self.total_frames += 1;

        if let Some(last) = self.last_sequence {
            let gap = meta.sequence_number - last - 1;
            if gap > 0 {
                self.superseded_frames += gap as u64;
            }
        }
        self.last_sequence = Some(meta.sequence_number);

        if let Some(last) = self.last_elapsed_ms {
            self.interval_stats.push(meta.elapsed_ms - last);
        }
        self.last_elapsed_ms = Some(meta.elapsed_ms);
    }

    /// 记录运行结束
    pub fn finish(&mut self, summary: &RunSummary) {
        self.last_run = Some(summary.clone());
        self.last_sequence = None;
        self.last_elapsed_ms = None;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let produced = self.total_frames + self.superseded_frames;
        MetricsSummary {
            total_frames: self.total_frames,
            superseded_frames: self.superseded_frames,
            superseded_rate: if produced > 0 {
                self.superseded_frames as f64 / produced as f64 * 100.0
            } else {
                0.0
            },
            interval_ms: StatsSummary::from(&self.interval_stats),
            last_run: self.last_run.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub superseded_frames: u64,
    pub superseded_rate: f64,
    pub interval_ms: StatsSummary,
    pub last_run: Option<RunSummary>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Acquisition Summary ===")?;
        writeln!(f, "Frames delivered: {}", self.total_frames)?;
        writeln!(
            f,
            "Frames superseded: {} ({:.2}%)",
            self.superseded_frames, self.superseded_rate
        )?;
        writeln!(f, "Frame interval (ms): {}", self.interval_ms)?;

        if let Some(run) = &self.last_run {
            writeln!(
                f,
                "Run: {} after {:.3}s",
                run.status,
                run.elapsed.as_secs_f64()
            )?;
        }

        Ok(())
    }
}

/// 统计摘要
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

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
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

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
