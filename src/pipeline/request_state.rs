// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 推理请求状态 (In-flight request state)
//!
//! 状态转移表:
//!
//! ```text
//! 当前      事件                 下一个
//! Idle      try_begin            Pending(id)
//! Pending   try_begin            Pending (拒绝, 返回 None)
//! Pending   finish(id)           Idle
//! Pending   finish(其它 id)       Pending (忽略)
//! Idle      finish(_)            Idle (忽略)
//! ```
//!
//! 任意时刻最多一个请求处于 Pending。

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::types::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    Pending { id: RequestId, since: Instant },
}

pub struct RequestState {
    phase: Mutex<RequestPhase>,
}

impl Default for RequestState {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestState {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(RequestPhase::Idle),
        }
    }

    pub fn phase(&self) -> RequestPhase {
        *self.phase.lock()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase(), RequestPhase::Pending { .. })
    }

    /// 当前请求已挂起多久
    pub fn pending_for(&self) -> Option<(RequestId, Duration)> {
        match self.phase() {
            RequestPhase::Pending { id, since } => Some((id, since.elapsed())),
            RequestPhase::Idle => None,
        }
    }

    /// Idle → Pending, 已有请求时返回 None
    pub fn try_begin(&self) -> Option<RequestId> {
        let mut phase = self.phase.lock();
        match *phase {
            RequestPhase::Pending { .. } => None,
            RequestPhase::Idle => {
                let id = RequestId::next();
                *phase = RequestPhase::Pending {
                    id,
                    since: Instant::now(),
                };
                Some(id)
            }
        }
    }

    /// Pending(id) → Idle; id 不匹配时不做任何事
    pub fn finish(&self, id: RequestId) -> bool {
        let mut phase = self.phase.lock();
        match *phase {
            RequestPhase::Pending { id: current, .. } if current == id => {
                *phase = RequestPhase::Idle;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        let state = RequestState::new();
        assert!(!state.is_pending());

        let id = state.try_begin().unwrap();
        assert!(state.is_pending());
        assert!(state.try_begin().is_none());

        assert!(!state.finish(RequestId::next()));
        assert!(state.is_pending());

        assert!(state.finish(id));
        assert!(!state.is_pending());
        assert!(!state.finish(id));

        let next = state.try_begin().unwrap();
        assert!(next > id);
    }

    #[test]
    fn test_pending_for_reports_current_request() {
        let state = RequestState::new();
        assert!(state.pending_for().is_none());
        let id = state.try_begin().unwrap();
        let (pending, _) = state.pending_for().unwrap();
        assert_eq!(pending, id);
    }

    #[test]
    fn test_concurrent_begin_admits_one() {
        use std::sync::Arc;

        let state = Arc::new(RequestState::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || state.try_begin().is_some())
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
    }
}
