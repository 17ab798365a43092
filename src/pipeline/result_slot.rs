// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 结果槽 (Result Slot)
//!
//! 推理线程 (写) 与帧循环 (读) 之间的单元素容器:
//! - 最多保存一个未消费的结果, 新结果直接覆盖旧结果, 不排队
//! - 读取即清空, 同一结果只会被读到一次
//! - 两端都不阻塞等待对方

use parking_lot::Mutex;

pub struct ResultSlot<T> {
    cell: Mutex<Option<T>>,
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResultSlot<T> {
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(None),
        }
    }

    /// 写入结果, 返回被覆盖的未消费结果
    pub fn set(&self, value: T) -> Option<T> {
        self.cell.lock().replace(value)
    }

    /// 取出结果并清空; 槽为空时返回 None
    pub fn take_if_present(&self) -> Option<T> {
        self.cell.lock().take()
    }

    pub fn is_occupied(&self) -> bool {
        self.cell.lock().is_some()
    }
}
