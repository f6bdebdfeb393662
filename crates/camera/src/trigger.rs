//! 软件触发器
//!
//! 配置了 `[trigger]` 但没有真实触发硬件时使用：每次触发只计数并记录日志。

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{CameraError, TriggerDevice};
use tracing::trace;

/// 软件触发器
#[derive(Debug)]
pub struct SoftwareTrigger {
    name: String,
    pulses: AtomicU64,
}

impl SoftwareTrigger {
    /// 创建新的软件触发器
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pulses: AtomicU64::new(0),
        }
    }

    /// 已发出的脉冲数
    pub fn pulses(&self) -> u64 {
        self.pulses.load(Ordering::Relaxed)
    }
}

impl TriggerDevice for SoftwareTrigger {
    fn name(&self) -> &str {
        &self.name
    }

    fn fire(&self) -> Result<(), CameraError> {
        let pulse = self.pulses.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(device = %self.name, pulse, "Trigger pulse");
        Ok(())
    }
}
