// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 姿态锚点模拟器 (Pose Anchor Simulator)
///
/// 无设备/无模型时演示完整帧循环:
/// 1. 主线程:   模拟跟踪帧 (偶尔无图像, 偶尔丢失跟踪)
/// 2. 推理线程: 模拟姿态检测 (可配置延迟与失败率)
/// 3. 场景:     锚点节点接收放置结果
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pose_anchor_rs::anchor::{PlacementMode, TrackingState};
use pose_anchor_rs::config::SessionConfig;
use pose_anchor_rs::input::Rotation;
use pose_anchor_rs::pipeline::FrameLoopCoordinator;
use pose_anchor_rs::scene::AnchorNode;
use pose_anchor_rs::sim::{SimDetector, SimTrackingFrame, SimWorld, SyntheticImage};
use pose_anchor_rs::types::LandmarkType;
use pose_anchor_rs::utils::DisplayGeometry;

/// 模拟参数
#[derive(Parser, Debug)]
#[command(author, version, about = "姿态锚点模拟器 - 帧循环 + 推理线程", long_about = None)]
struct Args {
    /// 会话配置文件 (不存在时写入默认值)
    #[arg(short, long, default_value = "pose_anchor.json")]
    config: PathBuf,

    /// 模拟帧数
    #[arg(short, long, default_value_t = 300)]
    frames: u32,

    /// 帧率
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// 模拟推理延迟 (毫秒)
    #[arg(long, default_value_t = 80)]
    latency_ms: u64,

    /// 推理失败概率
    #[arg(long, default_value_t = 0.05)]
    failure_rate: f64,

    /// 放置策略, 覆盖配置文件 (disabled/plane_horizontal/plane_vertical/plane/instant/depth/best)
    #[arg(short, long)]
    placement: Option<PlacementMode>,

    /// 相机图像旋转角度, 覆盖配置文件
    #[arg(short, long)]
    rotation: Option<i32>,

    /// 相机图像宽度
    #[arg(long, default_value_t = 640)]
    camera_width: u32,

    /// 相机图像高度
    #[arg(long, default_value_t = 480)]
    camera_height: u32,

    /// 屏幕视图宽度
    #[arg(long, default_value_t = 1080)]
    view_width: u32,

    /// 屏幕视图高度
    #[arg(long, default_value_t = 1920)]
    view_height: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    let args = Args::parse();

    let mut config = SessionConfig::load(&args.config);
    if let Some(mode) = args.placement {
        config.placement_mode = mode;
    }
    if let Some(rotation) = args.rotation {
        config.rotation_degrees = rotation;
    }
    config.log_summary();

    let display_rotation = Rotation::from_degrees(config.rotation_degrees)?;
    let geometry = DisplayGeometry::new(
        (args.camera_width, args.camera_height),
        (args.view_width, args.view_height),
        display_rotation,
    );

    // 鼻尖位于竖直画面下方, 投到视图中心以下 → 命中地面
    let detector = SimDetector::builder()
        .latency(Duration::from_millis(args.latency_ms))
        .failure_rate(args.failure_rate)
        .landmark(LandmarkType::Nose, 0.5, 0.7)
        .landmark(LandmarkType::LeftAnkle, 0.45, 0.95)
        .build();
    let detector_stats = detector.stats();

    let mut coordinator = FrameLoopCoordinator::new(detector, &config)?;
    let mut scene = AnchorNode::new().on_tracking_changed(|tracking| {
        info!("👁️ tracking {}", if tracking { "resumed" } else { "lost" });
    });

    let frame_interval = Duration::from_secs_f64(1.0 / args.fps.max(1) as f64);
    let mut rng = rand::thread_rng();
    let start = Instant::now();

    info!(
        "🚀 simulating {} frames at {} fps ({}x{} camera → {}x{} view)",
        args.frames, args.fps, args.camera_width, args.camera_height, args.view_width, args.view_height
    );

    for i in 0..args.frames {
        let tick_start = Instant::now();

        // 每 150 帧中有 20 帧丢失跟踪
        let tracking = if i % 150 >= 130 {
            TrackingState::Paused
        } else {
            TrackingState::Tracking
        };
        let mut builder = SimTrackingFrame::builder()
            .geometry(geometry)
            .world(SimWorld::default())
            .tracking(tracking);
        // 偶尔相机图像还没准备好
        if rng.gen_bool(0.9) {
            builder = builder.image(
                SyntheticImage::gradient(args.camera_width, args.camera_height)
                    .with_timestamp(start.elapsed().as_nanos() as i64),
            );
        }
        let frame = builder.build();

        match coordinator.on_frame(&frame, &mut scene) {
            Ok(outcome) => {
                if let Some(anchor) = outcome.anchor {
                    info!(
                        "🎯 frame {} → {} on {:?}",
                        i, anchor.id, anchor.trackable.kind
                    );
                }
            }
            Err(e) => warn!("⚠️ frame {}: {:#}", i, e),
        }

        if let Some(rest) = frame_interval.checked_sub(tick_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    let stats = coordinator.stats();
    let bridge = coordinator.bridge_stats();
    info!(
        "📊 done in {:.1}s: ticks={} images={} submitted={} busy={} drained={} anchors={} misses={}",
        start.elapsed().as_secs_f64(),
        stats.ticks,
        stats.images_acquired,
        stats.submitted,
        stats.dropped_busy,
        stats.results_drained,
        stats.anchors_created,
        stats.hit_misses
    );
    info!(
        "📊 inference: calls={} ok={} failed={} overwritten={} | placements={}",
        detector_stats.calls(),
        bridge.completed,
        bridge.failed,
        bridge.overwritten,
        scene.placements()
    );

    if !coordinator.shutdown(Duration::from_secs(2)) {
        warn!("⚠️ inference thread did not exit in time");
    }
    Ok(())
}
