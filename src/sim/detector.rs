// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 模拟姿态检测器
//!
//! 在推理图像的固定归一化位置输出关键点, 可配置延迟、失败、panic 与手动放行。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use crossbeam_channel::{Receiver, Sender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::inference::PoseDetector;
use crate::input::PreparedImage;
use crate::types::{Landmark, LandmarkType, Point2, PoseResult};

/// 检测器调用观测 (检测器被移入推理线程后仍可读取)
#[derive(Debug, Clone, Default)]
pub struct DetectorStats {
    calls: Arc<AtomicUsize>,
}

impl DetectorStats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub struct SimDetector {
    latency: Duration,
    landmarks: Vec<(LandmarkType, f32, f32)>,
    fail_on: Vec<usize>,
    panic_on: Vec<usize>,
    failure_rate: f64,
    gate: Option<Receiver<()>>,
    stats: DetectorStats,
    rng: StdRng,
}

impl SimDetector {
    pub fn builder() -> SimDetectorBuilder {
        SimDetectorBuilder::default()
    }

    pub fn stats(&self) -> DetectorStats {
        self.stats.clone()
    }
}

impl PoseDetector for SimDetector {
    fn detect(&mut self, image: &PreparedImage) -> Result<PoseResult> {
        let call = self.stats.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(gate) = &self.gate {
            // 发送端关闭也放行
            let _ = gate.recv();
        }
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        if self.panic_on.contains(&call) {
            panic!("simulated detector panic on call {}", call);
        }
        if self.fail_on.contains(&call) || self.rng.gen_bool(self.failure_rate) {
            bail!("simulated inference failure on call {}", call);
        }

        let (w, h) = (image.width() as f32, image.height() as f32);
        let landmarks = self
            .landmarks
            .iter()
            .map(|&(kind, fx, fy)| {
                Landmark::new(kind, Point2::new(fx * w, fy * h)).with_likelihood(0.9)
            })
            .collect();
        Ok(PoseResult::new(landmarks))
    }

    fn name(&self) -> &str {
        "sim"
    }
}

pub struct SimDetectorBuilder {
    latency: Duration,
    landmarks: Vec<(LandmarkType, f32, f32)>,
    fail_on: Vec<usize>,
    panic_on: Vec<usize>,
    failure_rate: f64,
}

impl Default for SimDetectorBuilder {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            landmarks: Vec::new(),
            fail_on: Vec::new(),
            panic_on: Vec::new(),
            failure_rate: 0.0,
        }
    }
}

impl SimDetectorBuilder {
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 在推理图像归一化坐标 (fx, fy) 处输出一个关键点; 不设置时输出图像中心的鼻尖
    pub fn landmark(mut self, kind: LandmarkType, fx: f32, fy: f32) -> Self {
        self.landmarks.push((kind, fx, fy));
        self
    }

    /// 第 n 次调用失败 (从 1 开始计)
    pub fn fail_on_calls(mut self, calls: &[usize]) -> Self {
        self.fail_on = calls.to_vec();
        self
    }

    pub fn panic_on_calls(mut self, calls: &[usize]) -> Self {
        self.panic_on = calls.to_vec();
        self
    }

    pub fn failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    fn finish(self, gate: Option<Receiver<()>>) -> SimDetector {
        let landmarks = if self.landmarks.is_empty() {
            vec![(LandmarkType::Nose, 0.5, 0.5)]
        } else {
            self.landmarks
        };
        SimDetector {
            latency: self.latency,
            landmarks,
            fail_on: self.fail_on,
            panic_on: self.panic_on,
            failure_rate: self.failure_rate,
            gate,
            stats: DetectorStats::default(),
            rng: StdRng::seed_from_u64(0x5eed),
        }
    }

    pub fn build(self) -> SimDetector {
        self.finish(None)
    }

    /// 每次 detect 都等待放行信号
    pub fn gated(self) -> (SimDetector, Sender<()>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (self.finish(Some(rx)), tx)
    }
}
