// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 帧处理流水线 (Frame Processing Pipeline)
///
/// 两线程架构, 通过结果槽通信:
/// - 帧线程:   跟踪回调驱动, 获取图像 / 提交推理 / 取结果 / 解析锚点
/// - 推理线程: 姿态模型, 完成后写入结果槽
pub mod coordinator;
pub mod request_state;
pub mod result_slot;
pub mod shared_state;

pub use coordinator::{FrameLoopCoordinator, PipelineStats, SubmitStatus, TickOutcome};
pub use request_state::{RequestPhase, RequestState};
pub use result_slot::ResultSlot;
pub use shared_state::{BridgeCounters, BridgeStats, SharedState};
