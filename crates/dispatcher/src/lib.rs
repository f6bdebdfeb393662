//! # Dispatcher
//!
//! 帧下发模块。
//!
//! 负责：
//! - 为采集线程包装下游 sink，执行溢出策略（停止或清空后重试一次）
//! - 为帧附加元数据
//! - 提供环形缓冲 / 日志 / 文件三种 sink

pub mod adapter;
pub mod error;
pub mod metrics;
pub mod sinks;

pub use adapter::{create_sink, BuiltSink, DeliveryOutcome, SinkAdapter};
pub use contracts::{Frame, FrameSink, SinkStatus};
pub use error::{DispatcherError, Result};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{CircularBufferSink, FileSink, FrameRing, LogSink, INDEX_FILE};
