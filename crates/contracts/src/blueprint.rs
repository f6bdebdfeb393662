//! CameraBlueprint - Config Loader 输出
//!
//! 描述完整的相机配置：传感器几何、合成参数、帧源、采集序列、输出与触发。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{FrameCount, PixelFormat, SequenceRequest, SynthesisParameters};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的相机配置蓝图
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CameraBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 传感器与几何设置
    #[serde(default)]
    pub camera: CameraConfig,

    /// 图像合成参数
    #[serde(default)]
    pub synthesis: SynthesisParameters,

    /// 帧源
    #[serde(default)]
    pub source: SourceConfig,

    /// 采集序列默认值
    #[serde(default)]
    pub sequence: SequenceConfig,

    /// 输出配置
    #[serde(default)]
    pub sink: SinkConfig,

    /// 外部触发设备 (可选)
    #[serde(default)]
    pub trigger: Option<TriggerConfig>,
}

/// 传感器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// 相机标签，写入每帧元数据
    #[serde(default = "default_label")]
    pub label: String,

    /// CCD 宽度 (未分箱像素)
    #[serde(default = "default_ccd_size")]
    pub ccd_width: u32,

    /// CCD 高度 (未分箱像素)
    #[serde(default = "default_ccd_size")]
    pub ccd_height: u32,

    /// 分箱因子
    #[serde(default = "default_binning")]
    pub binning: u32,

    /// 像素格式
    #[serde(default)]
    pub pixel_format: PixelFormat,

    /// 位深 (缺省时取像素格式的原生位深)
    #[serde(default)]
    pub bit_depth: Option<u32>,

    /// 扫描模式 (1..=3)，决定允许的分箱值
    #[serde(default = "default_scan_mode")]
    pub scan_mode: u32,

    /// 读出时间 (毫秒)
    #[serde(default)]
    pub readout_ms: f64,

    /// 跳过图像生成，重复发送当前缓冲区
    #[serde(default)]
    pub fast_image: bool,

    /// 曝光序列 (毫秒)，按帧循环使用；为空时使用 synthesis.exposure_ms
    #[serde(default)]
    pub exposure_sequence: Vec<f64>,
}

fn default_label() -> String {
    "SimCam".to_string()
}

fn default_ccd_size() -> u32 {
    512
}

fn default_binning() -> u32 {
    1
}

fn default_scan_mode() -> u32 {
    1
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            ccd_width: default_ccd_size(),
            ccd_height: default_ccd_size(),
            binning: default_binning(),
            pixel_format: PixelFormat::default(),
            bit_depth: None,
            scan_mode: default_scan_mode(),
            readout_ms: 0.0,
            fast_image: false,
            exposure_sequence: Vec::new(),
        }
    }
}

impl CameraConfig {
    /// 实际生效的位深
    pub fn effective_bit_depth(&self) -> u32 {
        self.bit_depth
            .unwrap_or_else(|| self.pixel_format.native_bit_depth())
    }
}

/// 帧源配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// 采集线程内同步合成
    #[default]
    Synthesized,
    /// 模拟硬件：后台线程按频率回调
    MockHardware {
        #[serde(default = "default_frequency_hz")]
        frequency_hz: f64,
    },
}

fn default_frequency_hz() -> f64 {
    30.0
}

/// 采集序列配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// 帧数 (缺省 = 无限)
    #[serde(default)]
    pub frame_count: Option<u64>,

    /// 帧间隔 (毫秒)
    #[serde(default)]
    pub interval_ms: f64,

    /// 溢出时停止
    #[serde(default)]
    pub stop_on_overflow: bool,

    /// 等待新帧的超时 (毫秒)
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

fn default_drain_timeout_ms() -> u64 {
    500
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            frame_count: None,
            interval_ms: 0.0,
            stop_on_overflow: false,
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

impl SequenceConfig {
    /// 转换为启动请求
    pub fn to_request(&self) -> SequenceRequest {
        SequenceRequest::new(
            FrameCount::from(self.frame_count),
            self.interval_ms,
            self.stop_on_overflow,
        )
    }
}

/// Sink 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    #[serde(default = "default_sink_name")]
    pub name: String,

    /// Sink 类型
    #[serde(default)]
    pub sink_type: SinkType,

    /// 环形缓冲区容量 (帧)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// 文件输出目录 (file 类型)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_sink_name() -> String {
    "circular_buffer".to_string()
}

fn default_capacity() -> usize {
    16
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            name: default_sink_name(),
            sink_type: SinkType::default(),
            capacity: default_capacity(),
            path: None,
        }
    }
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 内存环形缓冲区
    #[default]
    CircularBuffer,
    /// 日志输出
    Log,
    /// 原始帧 + JSON 元数据写入磁盘
    File,
}

/// 触发设备配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// 设备名称
    pub device: String,
}
