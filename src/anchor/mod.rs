// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 锚点解析系统 (Anchor Resolution)
///
/// 帧线程上同步执行
/// - Tracking:  跟踪引擎接口 (坐标变换 / 命中测试 / 创建锚点)
/// - Placement: 放置策略, 决定命中测试能匹配哪些几何
/// - Resolver:  关键点 → 视图坐标 → 命中 → 锚点
pub mod placement;
pub mod resolver;
pub mod tracking;

pub use placement::PlacementMode;
pub use resolver::{
    hit_test_landmark, image_to_view, resolve, resolve_all, resolve_pose, LandmarkSelection,
};
pub use tracking::{
    Anchor, AnchorId, Coordinates2d, HitResult, Pose, Trackable, TrackableId, TrackableKind,
    TrackingFrame, TrackingState,
};
