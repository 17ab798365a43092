// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 姿态推理系统 (Pose Inference System)
///
/// 独立工作线程, 帧线程永远不等待模型
/// - PoseDetector: 外部姿态模型的统一接口
/// - Bridge:       提交请求 → 工作线程推理 → 写入结果槽
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::input::PreparedImage;
use crate::types::PoseResult;

pub mod bridge;

pub use bridge::InferenceBridge;

/// 推理模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorMode {
    /// 连续视频帧, 模型内部保留帧间状态
    #[default]
    Stream,
    /// 相互独立的单张图像
    SingleImage,
}

/// 姿态估计模型接口
///
/// ## 核心流程
/// ```text
/// 竖直RGB图像 → detect → 关键点 (推理图像像素坐标)
/// ```
///
/// 在推理线程上调用, 可以阻塞。Stream 模式下模型带有帧间状态,
/// 不要假设对不相关的图像调用是无状态的。
pub trait PoseDetector: Send + 'static {
    /// 推理前配置一次
    fn configure(&mut self, _mode: DetectorMode) -> Result<()> {
        Ok(())
    }

    /// 关键点坐标使用 `image` 的像素坐标, 由推理桥映射回相机图像
    fn detect(&mut self, image: &PreparedImage) -> Result<PoseResult>;

    fn name(&self) -> &str {
        "pose-detector"
    }
}

impl<D: PoseDetector + ?Sized> PoseDetector for Box<D> {
    fn configure(&mut self, mode: DetectorMode) -> Result<()> {
        (**self).configure(mode)
    }

    fn detect(&mut self, image: &PreparedImage) -> Result<PoseResult> {
        (**self).detect(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
