// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 人体姿态 → AR 锚点
//!
//! 帧线程 (`pipeline`) 每帧获取相机图像, 空闲时交给单个推理线程 (`inference`),
//! 取回最新的姿态结果后把关键点投影到屏幕并命中测试, 在命中的几何上创建锚点。

pub mod anchor; // 命中测试与锚点解析
pub mod config; // 会话配置
pub mod error; // 错误类型
pub mod inference; // 推理桥与检测器接口
pub mod input; // 相机图像与预处理
pub mod pipeline; // 帧循环协调
pub mod scene; // 场景输出
pub mod sim; // 模拟引擎/检测器
pub mod types; // 关键点与姿态结果
pub mod utils; // 仿射变换

pub use crate::anchor::{Anchor, LandmarkSelection, PlacementMode, TrackingFrame, TrackingState};
pub use crate::config::SessionConfig;
pub use crate::error::{AcquireError, ConversionError, PipelineError, SubmitError};
pub use crate::inference::{DetectorMode, InferenceBridge, PoseDetector};
pub use crate::input::{AcquiredImage, CameraImage, PreparedImage, Rotation};
pub use crate::pipeline::{FrameLoopCoordinator, PipelineStats, SubmitStatus, TickOutcome};
pub use crate::scene::{AnchorNode, SceneSink};
pub use crate::types::{Landmark, LandmarkType, Point2, PoseResult, RequestId};
