// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 场景接口 (Scene sink)
//!
//! 帧循环产出两样东西给场景/界面: 新锚点, 以及跟踪状态变化信号。

use tracing::{debug, info};

use crate::anchor::Anchor;

/// 接收帧循环输出的场景
pub trait SceneSink {
    /// 放置新锚点, 替换掉已有的锚点
    fn apply_anchor(&mut self, anchor: Anchor);

    /// 跟踪丢失/恢复, 只在状态变化时调用
    fn tracking_changed(&mut self, _is_tracking: bool) {}

    /// 放置策略变化或重新放置时, 摘下当前锚点
    fn detach_anchor(&mut self) -> Option<Anchor> {
        None
    }
}

/// 挂载模型的锚点节点
///
/// 同一时刻最多挂一个锚点, 新锚点替换旧锚点。
#[derive(Default)]
pub struct AnchorNode {
    anchor: Option<Anchor>,
    is_tracking: bool,
    placements: u64,
    on_tracking_changed: Option<Box<dyn FnMut(bool) + Send>>,
}

impl AnchorNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// 跟踪状态变化回调 (例如: 跟踪中才显示"放置"按钮)
    pub fn on_tracking_changed(mut self, f: impl FnMut(bool) + Send + 'static) -> Self {
        self.on_tracking_changed = Some(Box::new(f));
        self
    }

    pub fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_tracking(&self) -> bool {
        self.is_tracking
    }

    /// 累计放置次数
    pub fn placements(&self) -> u64 {
        self.placements
    }

    /// 用户请求重新放置: 摘下锚点, 等待下一个解析结果
    pub fn request_placement(&mut self) -> Option<Anchor> {
        self.detach_anchor()
    }
}

impl SceneSink for AnchorNode {
    fn apply_anchor(&mut self, anchor: Anchor) {
        info!(
            "📍 {} placed at ({:.2}, {:.2}, {:.2})",
            anchor.id,
            anchor.pose.translation.x,
            anchor.pose.translation.y,
            anchor.pose.translation.z
        );
        if let Some(old) = self.anchor.replace(anchor) {
            debug!("{} replaced", old.id);
        }
        self.placements += 1;
    }

    fn tracking_changed(&mut self, is_tracking: bool) {
        self.is_tracking = is_tracking;
        if let Some(f) = self.on_tracking_changed.as_mut() {
            f(is_tracking);
        }
    }

    fn detach_anchor(&mut self) -> Option<Anchor> {
        let old = self.anchor.take();
        if let Some(a) = &old {
            debug!("{} detached", a.id);
        }
        old
    }
}
