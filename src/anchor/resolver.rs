// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 关键点 → 锚点 (Landmark-to-Anchor Resolver)
//! 职责: 图像像素坐标 → 视图坐标 → 命中测试 → 在命中几何上创建锚点

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::placement::PlacementMode;
use super::tracking::{Anchor, Coordinates2d, HitResult, TrackingFrame};
use crate::error::PipelineError;
use crate::types::{Landmark, LandmarkType, Point2, PoseResult};

/// 从一次姿态结果中挑选用于放置的关键点
///
/// 多人/多关键点时只用其中一个, 默认取序号0。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkSelection {
    /// 结果序列中的第 n 个
    Index(usize),
    /// 指定类型的关键点
    Type(LandmarkType),
}

impl Default for LandmarkSelection {
    fn default() -> Self {
        LandmarkSelection::Index(0)
    }
}

impl LandmarkSelection {
    pub fn select<'a>(&self, pose: &'a PoseResult) -> Option<&'a Landmark> {
        match self {
            LandmarkSelection::Index(i) => pose.landmark(*i),
            LandmarkSelection::Type(kind) => pose.landmark_of(*kind),
        }
    }
}

/// 图像像素坐标 → 视图坐标, 每帧重新计算
pub fn image_to_view<F: TrackingFrame + ?Sized>(frame: &F, position: Point2) -> Option<Point2> {
    let out = frame.transform_coordinates_2d(
        Coordinates2d::ImagePixels,
        Coordinates2d::View,
        &[position],
    );
    out.first().copied().filter(Point2::is_finite)
}

/// 命中测试, 返回该策略允许的第一个结果 (不重新排序)
pub fn hit_test_landmark<F: TrackingFrame + ?Sized>(
    landmark: &Landmark,
    frame: &F,
    mode: PlacementMode,
) -> Option<HitResult> {
    if !mode.is_enabled() {
        trace!("placement disabled, skipping hit test");
        return None;
    }

    let view = image_to_view(frame, landmark.position)?;
    trace!(
        "landmark {:?} ({:.1}, {:.1}) → view ({:.1}, {:.1})",
        landmark.kind,
        landmark.position.x(),
        landmark.position.y(),
        view.x(),
        view.y()
    );

    frame
        .hit_test(view.x(), view.y())
        .into_iter()
        .find(|hit| mode.allows(hit.trackable.kind))
}

/// 把单个关键点解析为锚点
///
/// 命中测试没有结果时返回 `Ok(None)`, 调用方用下一帧的新结果重试即可。
/// 只有引擎创建锚点失败才返回错误。
pub fn resolve<F: TrackingFrame + ?Sized>(
    landmark: &Landmark,
    frame: &F,
    mode: PlacementMode,
) -> Result<Option<Anchor>, PipelineError> {
    let Some(hit) = hit_test_landmark(landmark, frame, mode) else {
        debug!("hit test miss for {:?} ({})", landmark.kind, mode);
        return Ok(None);
    };

    let anchor = frame
        .create_anchor(&hit.trackable, &hit.hit_pose)
        .map_err(PipelineError::Anchor)?;
    debug!(
        "{} on {:?} at ({:.3}, {:.3}, {:.3})",
        anchor.id,
        hit.trackable.kind,
        anchor.pose.translation.x,
        anchor.pose.translation.y,
        anchor.pose.translation.z
    );
    Ok(Some(anchor))
}

/// 按选择策略从整次结果中挑一个关键点再解析
pub fn resolve_pose<F: TrackingFrame + ?Sized>(
    pose: &PoseResult,
    selection: LandmarkSelection,
    frame: &F,
    mode: PlacementMode,
) -> Result<Option<Anchor>, PipelineError> {
    match selection.select(pose) {
        Some(landmark) => resolve(landmark, frame, mode),
        None => {
            debug!("no landmark for {:?} in {:?}", selection, pose);
            Ok(None)
        }
    }
}

/// 解析所有关键点, 未命中的跳过
pub fn resolve_all<F: TrackingFrame + ?Sized>(
    pose: &PoseResult,
    frame: &F,
    mode: PlacementMode,
) -> Result<Vec<(LandmarkType, Anchor)>, PipelineError> {
    let mut anchors = Vec::new();
    for landmark in pose.landmarks() {
        if let Some(anchor) = resolve(landmark, frame, mode)? {
            anchors.push((landmark.kind, anchor));
        }
    }
    Ok(anchors)
}
