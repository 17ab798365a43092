// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 帧线程与推理线程之间共享的状态
//!
//! 跨线程可变状态只有两样: 结果槽和请求状态。其余都是只增计数器。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::request_state::RequestState;
use super::result_slot::ResultSlot;
use crate::types::PoseResult;

/// 推理线程统计
#[derive(Debug, Default)]
pub struct BridgeCounters {
    completed: AtomicU64,
    failed: AtomicU64,
    overwritten: AtomicU64,
    discarded: AtomicU64,
}

/// 推理线程统计快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeStats {
    /// 成功完成并写入结果槽
    pub completed: u64,
    /// 模型返回错误或 panic
    pub failed: u64,
    /// 写入时覆盖了未被消费的旧结果
    pub overwritten: u64,
    /// 会话关闭后才完成, 结果被丢弃
    pub discarded: u64,
}

impl BridgeCounters {
    pub fn record_completed(&self, overwrote: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if overwrote {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BridgeStats {
        BridgeStats {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            overwritten: self.overwritten.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// 帧循环与推理线程共享的状态
#[derive(Default)]
pub struct SharedState {
    /// 推理线程写, 帧循环读
    pub slot: ResultSlot<PoseResult>,
    /// 是否有推理请求在途
    pub request: RequestState,
    pub counters: BridgeCounters,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}
