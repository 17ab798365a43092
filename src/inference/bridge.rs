// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 推理桥 (Inference Bridge)
/// 职责: 帧线程提交推理图像 → 推理线程运行模型 → 结果写入结果槽
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, error, info, warn};

use super::{DetectorMode, PoseDetector};
use crate::error::SubmitError;
use crate::input::PreparedImage;
use crate::pipeline::SharedState;
use crate::types::{PoseResult, RequestId};

/// 一次推理任务
struct Job {
    id: RequestId,
    image: PreparedImage,
}

pub struct InferenceBridge {
    shared: Arc<SharedState>,
    closed: Arc<AtomicBool>,
    tx: Option<Sender<Job>>,
    done: Receiver<()>,
    worker: Option<JoinHandle<()>>,
}

impl InferenceBridge {
    /// 启动推理线程
    ///
    /// 推理线程只持有共享状态的弱引用: 会话销毁后完成的推理直接丢弃。
    pub fn spawn<D: PoseDetector>(
        detector: D,
        mode: DetectorMode,
        shared: Arc<SharedState>,
    ) -> std::io::Result<Self> {
        // 容量1: 同一时刻最多一个在途请求
        let (tx, rx) = crossbeam_channel::bounded::<Job>(1);
        let (done_tx, done) = crossbeam_channel::bounded::<()>(1);
        let closed = Arc::new(AtomicBool::new(false));

        let weak = Arc::downgrade(&shared);
        let worker_closed = closed.clone();
        let worker = thread::Builder::new()
            .name("pose-inference".into())
            .spawn(move || {
                inference_thread(rx, detector, mode, weak, worker_closed);
                let _ = done_tx.send(());
            })?;

        Ok(Self {
            shared,
            closed,
            tx: Some(tx),
            done,
            worker: Some(worker),
        })
    }

    /// 提交推理, 不阻塞
    ///
    /// 已有请求在途时返回 [`SubmitError::Busy`], 图像被丢弃而不是排队。
    pub fn submit(&self, image: PreparedImage) -> Result<RequestId, SubmitError> {
        let tx = match &self.tx {
            Some(tx) if !self.closed.load(Ordering::Acquire) => tx,
            _ => return Err(SubmitError::Disconnected),
        };
        let id = self.shared.request.try_begin().ok_or(SubmitError::Busy)?;

        match tx.try_send(Job { id, image }) {
            Ok(()) => {
                debug!("submitted inference request {}", id);
                Ok(id)
            }
            Err(e) => {
                // 请求没有送出去, 回到 Idle
                self.shared.request.finish(id);
                match e {
                    TrySendError::Full(_) => Err(SubmitError::Busy),
                    TrySendError::Disconnected(_) => Err(SubmitError::Disconnected),
                }
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 关闭并等待推理线程退出
    ///
    /// 模型调用卡住时最多等待 `timeout`, 返回线程是否已退出。
    pub fn shutdown(mut self, timeout: Duration) -> bool {
        self.close();
        let exited = self.done.recv_timeout(timeout).is_ok();
        if let Some(worker) = self.worker.take() {
            if exited {
                let _ = worker.join();
            } else {
                warn!("inference worker still busy after {:?}, detaching", timeout);
            }
        }
        exited
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.tx.take();
    }
}

impl Drop for InferenceBridge {
    fn drop(&mut self) {
        // 不 join: 卡住的模型调用不能拖住帧线程
        self.close();
    }
}

/// 推理线程: 接收推理图像 → 模型 → 映射回相机坐标 → 写入结果槽
fn inference_thread<D: PoseDetector>(
    rx: Receiver<Job>,
    mut detector: D,
    mode: DetectorMode,
    shared: Weak<SharedState>,
    closed: Arc<AtomicBool>,
) {
    info!("✅ inference thread started ({}, {:?})", detector.name(), mode);

    if let Err(e) = detector.configure(mode) {
        error!("❌ pose detector configuration failed: {:#}", e);
        return;
    }

    let mut count = 0u32;
    let mut last = Instant::now();

    while let Ok(Job { id, image }) = rx.recv() {
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(&image)));
        let inference_ms = start.elapsed().as_secs_f64() * 1000.0;

        // 会话已销毁: 结果没有去处
        let Some(shared) = shared.upgrade() else {
            debug!("session gone, dropping result of request {}", id);
            break;
        };
        if closed.load(Ordering::Acquire) {
            shared.counters.record_discarded();
            shared.request.finish(id);
            debug!("bridge closed, discarding result of request {}", id);
            break;
        }

        match outcome {
            Ok(Ok(result)) => {
                let result = to_source_space(result, &image, id, inference_ms);
                let overwrote = shared.slot.set(result).is_some();
                shared.counters.record_completed(overwrote);
                if overwrote {
                    debug!("request {} overwrote an unconsumed result", id);
                }
            }
            Ok(Err(e)) => {
                shared.counters.record_failed();
                warn!("⚠️ pose inference failed for request {}: {:#}", id, e);
            }
            Err(_) => {
                shared.counters.record_failed();
                warn!("⚠️ pose detector panicked on request {}", id);
            }
        }
        // 先写结果再回到 Idle: 帧循环看到 Idle 时结果已经在槽里
        shared.request.finish(id);
        drop(shared);

        count += 1;
        if last.elapsed().as_secs_f64() >= 1.0 {
            let fps = count as f64 / last.elapsed().as_secs_f64();
            debug!(
                "📊 inference: {:.1} req/s | last {:.1}ms",
                fps, inference_ms
            );
            last = Instant::now();
            count = 0;
        }
    }

    info!("✅ inference thread exited");
}

/// 关键点从推理图像坐标映射回相机图像像素坐标
fn to_source_space(
    mut result: PoseResult,
    image: &PreparedImage,
    id: RequestId,
    inference_ms: f64,
) -> PoseResult {
    for landmark in result.landmarks_mut() {
        landmark.position = image.to_source_pixels(landmark.position);
    }
    result.stamp(id, inference_ms);
    result
}
