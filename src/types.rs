// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 姿态结果数据结构 (Pose result data structures)
//!
//! 推理线程 → 结果槽 → 帧循环 之间传递的纯数据类型

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// 二维点 (像素或归一化坐标)
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point2 {
    x: f32,
    y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// 人体关键点类型 (33点人体模型)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkType {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    LeftMouth,
    RightMouth,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl LandmarkType {
    pub const COUNT: usize = 33;

    pub const ALL: [LandmarkType; Self::COUNT] = [
        LandmarkType::Nose,
        LandmarkType::LeftEyeInner,
        LandmarkType::LeftEye,
        LandmarkType::LeftEyeOuter,
        LandmarkType::RightEyeInner,
        LandmarkType::RightEye,
        LandmarkType::RightEyeOuter,
        LandmarkType::LeftEar,
        LandmarkType::RightEar,
        LandmarkType::LeftMouth,
        LandmarkType::RightMouth,
        LandmarkType::LeftShoulder,
        LandmarkType::RightShoulder,
        LandmarkType::LeftElbow,
        LandmarkType::RightElbow,
        LandmarkType::LeftWrist,
        LandmarkType::RightWrist,
        LandmarkType::LeftPinky,
        LandmarkType::RightPinky,
        LandmarkType::LeftIndex,
        LandmarkType::RightIndex,
        LandmarkType::LeftThumb,
        LandmarkType::RightThumb,
        LandmarkType::LeftHip,
        LandmarkType::RightHip,
        LandmarkType::LeftKnee,
        LandmarkType::RightKnee,
        LandmarkType::LeftAnkle,
        LandmarkType::RightAnkle,
        LandmarkType::LeftHeel,
        LandmarkType::RightHeel,
        LandmarkType::LeftFootIndex,
        LandmarkType::RightFootIndex,
    ];

    /// 模型输出中的序号
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// 单个关键点: 图像像素坐标 + 类型
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub kind: LandmarkType,
    /// 图像像素坐标 (IMAGE_PIXELS)
    pub position: Point2,
    /// 相对深度 (模型给出时)
    pub z: Option<f32>,
    pub in_frame_likelihood: f32,
}

impl Landmark {
    pub fn new(kind: LandmarkType, position: Point2) -> Self {
        Self {
            kind,
            position,
            z: None,
            in_frame_likelihood: 1.0,
        }
    }

    pub fn with_likelihood(mut self, likelihood: f32) -> Self {
        self.in_frame_likelihood = likelihood;
        self
    }
}

/// 推理请求ID (单调递增)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

impl RequestId {
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 一次推理的结果: 有序关键点序列
#[derive(Clone, PartialEq, Default)]
pub struct PoseResult {
    landmarks: Vec<Landmark>,
    request_id: Option<RequestId>,
    inference_ms: f64,
}

impl fmt::Debug for PoseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseResult")
            .field("request", &self.request_id)
            .field("landmarks", &self.landmarks.len())
            .field("inference_ms", &format_args!("{:.1}", self.inference_ms))
            .finish()
    }
}

impl PoseResult {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self {
            landmarks,
            ..Default::default()
        }
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn landmarks_mut(&mut self) -> &mut [Landmark] {
        &mut self.landmarks
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn landmark(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    pub fn landmark_of(&self, kind: LandmarkType) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.kind == kind)
    }

    pub fn request_id(&self) -> Option<RequestId> {
        self.request_id
    }

    pub fn inference_ms(&self) -> f64 {
        self.inference_ms
    }

    /// 由推理桥在完成时写入
    pub(crate) fn stamp(&mut self, request_id: RequestId, inference_ms: f64) {
        self.request_id = Some(request_id);
        self.inference_ms = inference_ms;
    }
}
