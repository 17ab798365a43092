// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 跟踪引擎接口 (Tracking engine interface)
//!
//! AR 跟踪引擎本身不在本 crate 内, 这里只定义帧循环需要它提供的能力:
//! 相机图像获取、2D 坐标空间变换、命中测试、在可跟踪物上创建锚点。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

use crate::error::AcquireError;
use crate::input::CameraImage;
use crate::types::Point2;

/// 世界(跟踪)坐标系下的位姿
pub type Pose = Isometry3<f32>;

/// 2D 坐标空间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinates2d {
    /// 相机图像像素坐标 (传感器方向)
    ImagePixels,
    /// 相机图像归一化坐标 [0,1]
    ImageNormalized,
    /// 屏幕视图像素坐标
    View,
    /// 屏幕视图归一化坐标 [0,1]
    ViewNormalized,
}

/// 跟踪状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Tracking,
    Paused,
    Stopped,
}

impl TrackingState {
    pub fn is_tracking(&self) -> bool {
        matches!(self, TrackingState::Tracking)
    }
}

/// 可跟踪的场景几何类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackableKind {
    HorizontalPlane,
    VerticalPlane,
    /// 特征点
    Point,
    /// 深度图表面上的点
    DepthPoint,
    /// 即时放置点 (尚未估计出几何)
    InstantPlacementPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackableId(pub u64);

/// 跟踪引擎重建出的一块几何
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trackable {
    pub id: TrackableId,
    pub kind: TrackableKind,
}

/// 一条命中测试结果
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub trackable: Trackable,
    pub hit_pose: Pose,
    /// 相机到命中点的距离 (米)
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnchorId(u64);

static NEXT_ANCHOR_ID: AtomicU64 = AtomicU64::new(1);

impl AnchorId {
    pub fn next() -> Self {
        Self(NEXT_ANCHOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor-{}", self.0)
    }
}

/// 固定在跟踪空间中的锚点, 归场景所有
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub id: AnchorId,
    pub pose: Pose,
    pub trackable: Trackable,
}

/// 一帧跟踪数据
///
/// 实现方通常包装引擎的帧对象。所有方法都在帧线程上调用。
pub trait TrackingFrame {
    type Image: CameraImage;

    /// 获取本帧相机图像; 尚不可用时返回 [`AcquireError::NotYetAvailable`]
    fn acquire_camera_image(&self) -> Result<Self::Image, AcquireError>;

    fn tracking_state(&self) -> TrackingState;

    /// 坐标空间变换, 结果依赖本帧的显示旋转与相机内参
    fn transform_coordinates_2d(
        &self,
        from: Coordinates2d,
        to: Coordinates2d,
        points: &[Point2],
    ) -> Vec<Point2>;

    /// 视图坐标处的命中测试, 按引擎自己的顺序返回 (通常由近到远)
    fn hit_test(&self, x: f32, y: f32) -> Vec<HitResult>;

    fn create_anchor(&self, trackable: &Trackable, pose: &Pose) -> anyhow::Result<Anchor>;
}
