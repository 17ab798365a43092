// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 帧循环协调器 (Frame Loop Coordinator)
//! 职责: 每个跟踪帧 获取相机图像 → (空闲时) 准备+提交推理 → 取结果 → 解析锚点
//!
//! 在帧线程上运行, 从不等待推理。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use super::{BridgeStats, SharedState};
use crate::anchor::{self, Anchor, LandmarkSelection, PlacementMode, TrackingFrame};
use crate::config::SessionConfig;
use crate::error::{AcquireError, PipelineError, SubmitError};
use crate::inference::{InferenceBridge, PoseDetector};
use crate::input::{AcquiredImage, CameraImage, ImagePreparer};
use crate::scene::SceneSink;
use crate::types::RequestId;

/// 本帧的提交情况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// 相机图像尚不可用
    NoImage,
    /// 引擎获取图像出错, 本帧不提交
    AcquireFailed,
    Submitted(RequestId),
    /// 已有请求在途, 本帧图像丢弃
    DroppedBusy,
    /// 平面布局异常, 本帧图像丢弃
    ConversionFailed,
    /// 推理线程已退出
    WorkerGone,
}

/// 一次 tick 的结果
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub submit: SubmitStatus,
    /// 本帧取到的结果对应的请求
    pub drained: Option<RequestId>,
    pub anchor: Option<Anchor>,
}

impl TickOutcome {
    /// 没有新图像也没有取到结果
    pub fn is_idle(&self) -> bool {
        self.submit == SubmitStatus::NoImage && self.drained.is_none()
    }
}

/// 帧循环计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStats {
    pub ticks: u64,
    pub images_acquired: u64,
    pub images_released: u64,
    pub acquire_failures: u64,
    pub submitted: u64,
    pub dropped_busy: u64,
    pub conversion_failures: u64,
    pub results_drained: u64,
    pub anchors_created: u64,
    pub hit_misses: u64,
}

pub struct FrameLoopCoordinator {
    shared: Arc<SharedState>,
    bridge: InferenceBridge,
    preparer: ImagePreparer,

    placement_mode: PlacementMode,
    landmark_selection: LandmarkSelection,
    rotation_degrees: i32,

    is_tracking: Option<bool>,

    // 统计
    stats: PipelineStats,
    stats_interval: Duration,
    last_report: Instant,
    stall_warn: Duration,
    stall_warned: Option<RequestId>,
}

impl FrameLoopCoordinator {
    /// 启动推理线程并创建协调器
    pub fn new<D: PoseDetector>(detector: D, config: &SessionConfig) -> std::io::Result<Self> {
        let shared = SharedState::new();
        let bridge = InferenceBridge::spawn(detector, config.detector_mode, shared.clone())?;
        Ok(Self {
            shared,
            bridge,
            preparer: ImagePreparer::new(config.max_inference_side),
            placement_mode: config.placement_mode,
            landmark_selection: config.landmark_selection,
            rotation_degrees: config.rotation_degrees,
            is_tracking: None,
            stats: PipelineStats::default(),
            stats_interval: Duration::from_millis(config.stats_interval_ms.max(1)),
            last_report: Instant::now(),
            stall_warn: Duration::from_millis(config.stall_warn_ms),
            stall_warned: None,
        })
    }

    pub fn placement_mode(&self) -> PlacementMode {
        self.placement_mode
    }

    /// 切换放置策略, 同时摘下当前锚点
    pub fn set_placement_mode<S: SceneSink + ?Sized>(&mut self, mode: PlacementMode, scene: &mut S) {
        scene.detach_anchor();
        if mode != self.placement_mode {
            info!("🎯 placement mode: {} → {}", self.placement_mode, mode);
        }
        self.placement_mode = mode;
    }

    pub fn set_rotation_degrees(&mut self, degrees: i32) {
        self.rotation_degrees = degrees;
    }

    pub fn set_landmark_selection(&mut self, selection: LandmarkSelection) {
        self.landmark_selection = selection;
    }

    pub fn is_request_pending(&self) -> bool {
        self.shared.request.is_pending()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn bridge_stats(&self) -> BridgeStats {
        self.shared.counters.snapshot()
    }

    /// 每个跟踪帧调用一次
    pub fn on_frame<F, S>(&mut self, frame: &F, scene: &mut S) -> Result<TickOutcome, PipelineError>
    where
        F: TrackingFrame + ?Sized,
        S: SceneSink + ?Sized,
    {
        self.stats.ticks += 1;

        let tracking = frame.tracking_state().is_tracking();
        if self.is_tracking != Some(tracking) {
            debug!("tracking changed: {}", tracking);
            self.is_tracking = Some(tracking);
            scene.tracking_changed(tracking);
        }

        // 1. Acquire
        let submit = match frame.acquire_camera_image() {
            Ok(image) => {
                // 句柄移入 maybe_submit, 返回时已归还
                let status = self.maybe_submit(AcquiredImage::new(image));
                self.stats.images_released += 1;
                status
            }
            Err(AcquireError::NotYetAvailable) => {
                trace!("camera image not yet available");
                SubmitStatus::NoImage
            }
            Err(AcquireError::Other(e)) => {
                // 与"尚不可用"一样只跳过提交, 结果照常取出
                self.stats.acquire_failures += 1;
                warn!("⚠️ camera image acquisition failed: {:#}", e);
                SubmitStatus::AcquireFailed
            }
        };

        // 2. Drain: 每帧最多处理一个结果
        let mut outcome = TickOutcome {
            submit,
            drained: None,
            anchor: None,
        };
        if let Some(result) = self.shared.slot.take_if_present() {
            self.stats.results_drained += 1;
            outcome.drained = result.request_id();

            if !tracking {
                debug!("not tracking, skipping resolve for {:?}", result);
            } else {
                let anchor =
                    anchor::resolve_pose(&result, self.landmark_selection, frame, self.placement_mode)?;
                match anchor {
                    Some(anchor) => {
                        self.stats.anchors_created += 1;
                        scene.apply_anchor(anchor.clone());
                        outcome.anchor = Some(anchor);
                    }
                    None => self.stats.hit_misses += 1,
                }
            }
        }

        self.report();
        Ok(outcome)
    }

    /// 空闲时准备并提交推理; 相机图像在返回前一定已归还
    fn maybe_submit<I: CameraImage>(&mut self, image: AcquiredImage<I>) -> SubmitStatus {
        self.stats.images_acquired += 1;

        if self.shared.request.is_pending() {
            self.stats.dropped_busy += 1;
            self.check_stall();
            return SubmitStatus::DroppedBusy;
        }

        let prepared = self.preparer.prepare(&*image, self.rotation_degrees);
        // 像素已复制到推理图像, 立即归还缓冲
        image.release();

        let prepared = match prepared {
            Ok(p) => p,
            Err(e) => {
                self.stats.conversion_failures += 1;
                warn!("⚠️ dropping frame: {}", e);
                return SubmitStatus::ConversionFailed;
            }
        };

        match self.bridge.submit(prepared) {
            Ok(id) => {
                self.stats.submitted += 1;
                SubmitStatus::Submitted(id)
            }
            Err(SubmitError::Busy) => {
                self.stats.dropped_busy += 1;
                SubmitStatus::DroppedBusy
            }
            Err(SubmitError::Disconnected) => {
                debug!("inference worker gone, frame not submitted");
                SubmitStatus::WorkerGone
            }
        }
    }

    /// 推理一直不返回时告警, 每个请求只告警一次
    fn check_stall(&mut self) {
        if let Some((id, elapsed)) = self.shared.request.pending_for() {
            if elapsed >= self.stall_warn && self.stall_warned != Some(id) {
                warn!(
                    "⚠️ inference request {} pending for {:.1}s, no new frames will be submitted",
                    id,
                    elapsed.as_secs_f64()
                );
                self.stall_warned = Some(id);
            }
        }
    }

    fn report(&mut self) {
        if self.last_report.elapsed() < self.stats_interval {
            return;
        }
        let bridge = self.bridge_stats();
        info!(
            "📊 ticks={} submitted={} busy={} conv_fail={} drained={} anchors={} misses={} | inference ok={} fail={} overwritten={}",
            self.stats.ticks,
            self.stats.submitted,
            self.stats.dropped_busy,
            self.stats.conversion_failures,
            self.stats.results_drained,
            self.stats.anchors_created,
            self.stats.hit_misses,
            bridge.completed,
            bridge.failed,
            bridge.overwritten
        );
        self.last_report = Instant::now();
    }

    /// 关闭会话并等待推理线程退出
    pub fn shutdown(self, timeout: Duration) -> bool {
        info!("🛑 shutting down frame loop");
        self.bridge.shutdown(timeout)
    }
}
