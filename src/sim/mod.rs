// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 模拟组件: 无设备/无模型时驱动帧循环 (演示程序与测试共用)

pub mod detector;
pub mod frame;
pub mod image;

pub use detector::{DetectorStats, SimDetector, SimDetectorBuilder};
pub use frame::{SimFrameBuilder, SimTrackingFrame, SimWorld};
pub use image::SyntheticImage;
