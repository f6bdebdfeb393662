//! # Camera
//!
//! 相机设备门面模块。
//!
//! 负责：
//! - 从 `CameraBlueprint` 组装几何管理、图案引擎、帧源、sink 适配器与序列控制器
//! - 对外提供 StartSequence / StopSequence / IsCapturing / SnapSingle /
//!   RegisterFrameConsumer 等设备接口
//! - 采集进行中拒绝几何 / 格式修改（`Busy`），ROI 修改时作废交接槽
//!
//! ## 使用示例
//!
//! ```
//! use std::time::Duration;
//! use camera::Camera;
//! use contracts::{CameraBlueprint, FrameCount};
//!
//! let mut blueprint = CameraBlueprint::default();
//! blueprint.camera.ccd_width = 64;
//! blueprint.camera.ccd_height = 64;
//! blueprint.synthesis.exposure_ms = 0.0;
//!
//! let camera = Camera::from_blueprint(&blueprint).unwrap();
//! camera.start_sequence(FrameCount::Bounded(3), 0.0, false).unwrap();
//! assert!(camera.wait_until_stopped(Duration::from_secs(5)));
//! assert_eq!(camera.frame_ring().unwrap().len(), 3);
//! ```

mod device;
mod trigger;

pub use device::{Camera, CameraStatus};
pub use trigger::SoftwareTrigger;

pub use dispatcher::{FrameRing, MetricsSnapshot};
