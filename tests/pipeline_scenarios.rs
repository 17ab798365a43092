// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 帧循环端到端场景: 模拟跟踪帧 + 模拟检测器 + 锚点节点

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use nalgebra::{Isometry3, Vector3};

use pose_anchor_rs::anchor::{LandmarkSelection, PlacementMode, TrackableKind, TrackingState};
use pose_anchor_rs::config::SessionConfig;
use pose_anchor_rs::pipeline::{FrameLoopCoordinator, SubmitStatus, TickOutcome};
use pose_anchor_rs::scene::AnchorNode;
use pose_anchor_rs::sim::{SimDetector, SimTrackingFrame, SimWorld, SyntheticImage};
use pose_anchor_rs::types::{LandmarkType, Point2};

fn floor_hit() -> SimWorld {
    SimWorld::scripted(vec![(
        TrackableKind::HorizontalPlane,
        Isometry3::translation(0.25, -1.0, -2.0),
    )])
}

fn with_image(image: SyntheticImage) -> SimTrackingFrame {
    SimTrackingFrame::builder().image(image).world(floor_hit()).build()
}

fn without_image(size: (u32, u32)) -> SimTrackingFrame {
    SimTrackingFrame::builder()
        .geometry(pose_anchor_rs::utils::DisplayGeometry::new(
            size,
            size,
            pose_anchor_rs::input::Rotation::Deg0,
        ))
        .world(floor_hit())
        .build()
}

/// 不带图像地 tick, 直到取到一个结果
fn tick_until_drained(
    coordinator: &mut FrameLoopCoordinator,
    scene: &mut AnchorNode,
    size: (u32, u32),
) -> (TickOutcome, SimTrackingFrame) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let frame = without_image(size);
        let outcome = coordinator.on_frame(&frame, scene).unwrap();
        if outcome.drained.is_some() {
            return (outcome, frame);
        }
        assert!(Instant::now() < deadline, "no result drained");
        thread::sleep(Duration::from_millis(1));
    }
}

fn wait_until_idle(coordinator: &FrameLoopCoordinator) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while coordinator.is_request_pending() {
        assert!(Instant::now() < deadline, "request never finished");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn landmark_at_center_anchors_at_hit_pose() {
    let mut coordinator =
        FrameLoopCoordinator::new(SimDetector::builder().build(), &SessionConfig::default())
            .unwrap();
    let mut scene = AnchorNode::new();

    let image = SyntheticImage::uniform(100, 100, 120, 128, 128);
    let closes = image.close_counter();
    let outcome = coordinator.on_frame(&with_image(image), &mut scene).unwrap();
    assert!(matches!(outcome.submit, SubmitStatus::Submitted(_)));
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    let (outcome, frame) = tick_until_drained(&mut coordinator, &mut scene, (100, 100));
    let anchor = outcome.anchor.expect("anchor");
    assert_relative_eq!(
        anchor.pose.translation.vector,
        Vector3::new(0.25, -1.0, -2.0)
    );
    assert_eq!(scene.anchor().map(|a| a.id), Some(anchor.id));

    let queries = frame.hit_queries();
    assert_eq!(queries.len(), 1);
    assert_relative_eq!(queries[0].x(), 50.0, epsilon = 1e-3);
    assert_relative_eq!(queries[0].y(), 50.0, epsilon = 1e-3);
    assert!(coordinator.shutdown(Duration::from_secs(5)));
}

#[test]
fn frame_while_pending_is_dropped_not_queued() {
    let (detector, gate) = SimDetector::builder().gated();
    let detector_stats = detector.stats();
    let mut coordinator = FrameLoopCoordinator::new(detector, &SessionConfig::default()).unwrap();
    let mut scene = AnchorNode::new();

    let closes = Arc::new(AtomicUsize::new(0));
    let first = SyntheticImage::uniform(32, 32, 90, 128, 128).with_close_counter(closes.clone());
    let second = SyntheticImage::uniform(32, 32, 90, 128, 128).with_close_counter(closes.clone());

    let a = coordinator.on_frame(&with_image(first), &mut scene).unwrap();
    let b = coordinator.on_frame(&with_image(second), &mut scene).unwrap();
    assert!(matches!(a.submit, SubmitStatus::Submitted(_)));
    assert_eq!(b.submit, SubmitStatus::DroppedBusy);
    assert_eq!(closes.load(Ordering::SeqCst), 2);

    gate.send(()).unwrap();
    let (outcome, _) = tick_until_drained(&mut coordinator, &mut scene, (32, 32));
    if let SubmitStatus::Submitted(id) = a.submit {
        assert_eq!(outcome.drained, Some(id));
    }
    assert_eq!(detector_stats.calls(), 1);
    assert_eq!(coordinator.stats().dropped_busy, 1);
}

#[test]
fn failed_inference_allows_next_frame_to_submit() {
    let detector = SimDetector::builder().fail_on_calls(&[1]).build();
    let mut coordinator = FrameLoopCoordinator::new(detector, &SessionConfig::default()).unwrap();
    let mut scene = AnchorNode::new();

    let first = coordinator
        .on_frame(&with_image(SyntheticImage::uniform(16, 16, 90, 128, 128)), &mut scene)
        .unwrap();
    assert!(matches!(first.submit, SubmitStatus::Submitted(_)));
    wait_until_idle(&coordinator);

    // 失败不写结果槽
    let empty = coordinator.on_frame(&without_image((16, 16)), &mut scene).unwrap();
    assert!(empty.is_idle());

    let retry = coordinator
        .on_frame(&with_image(SyntheticImage::uniform(16, 16, 90, 128, 128)), &mut scene)
        .unwrap();
    assert!(matches!(retry.submit, SubmitStatus::Submitted(_)));
    let (outcome, _) = tick_until_drained(&mut coordinator, &mut scene, (16, 16));
    assert!(outcome.anchor.is_some());
    assert_eq!(coordinator.bridge_stats().failed, 1);
    assert_eq!(coordinator.bridge_stats().completed, 1);
}

#[test]
fn empty_slot_does_nothing() {
    let mut coordinator =
        FrameLoopCoordinator::new(SimDetector::builder().build(), &SessionConfig::default())
            .unwrap();
    let mut scene = AnchorNode::new();
    let frame = without_image((64, 64));

    let outcome = coordinator.on_frame(&frame, &mut scene).unwrap();
    assert!(outcome.is_idle());
    assert!(outcome.anchor.is_none());
    assert!(frame.hit_queries().is_empty());
    assert!(!scene.is_anchored());
}

#[test]
fn every_acquired_image_is_closed_exactly_once() {
    let detector = SimDetector::builder()
        .latency(Duration::from_millis(3))
        .failure_rate(0.3)
        .build();
    let mut coordinator = FrameLoopCoordinator::new(detector, &SessionConfig::default()).unwrap();
    let mut scene = AnchorNode::new();
    let closes = Arc::new(AtomicUsize::new(0));

    let mut provided = 0;
    for i in 0..60 {
        let frame = if i % 4 == 3 {
            SimTrackingFrame::builder().world(floor_hit()).build()
        } else {
            let mut image =
                SyntheticImage::gradient(24, 16).with_close_counter(closes.clone());
            if i % 7 == 0 {
                // 截断的色度平面 → 转换失败
                image.truncate_plane(2, 3);
            }
            provided += 1;
            with_image(image)
        };
        coordinator.on_frame(&frame, &mut scene).unwrap();
        // 返回前已归还
        assert_eq!(closes.load(Ordering::SeqCst), provided);
        thread::sleep(Duration::from_millis(1));
    }

    let stats = coordinator.stats();
    assert_eq!(stats.images_acquired as usize, provided);
    assert_eq!(stats.images_released, stats.images_acquired);
    assert!(stats.conversion_failures > 0);
    assert_eq!(
        stats.images_acquired,
        stats.submitted + stats.dropped_busy + stats.conversion_failures
    );
}

#[test]
fn at_most_one_request_in_flight() {
    let detector = SimDetector::builder()
        .latency(Duration::from_millis(4))
        .build();
    let detector_stats = detector.stats();
    let mut coordinator = FrameLoopCoordinator::new(detector, &SessionConfig::default()).unwrap();
    let mut scene = AnchorNode::new();

    for _ in 0..80 {
        let frame = with_image(SyntheticImage::uniform(16, 16, 60, 128, 128));
        coordinator.on_frame(&frame, &mut scene).unwrap();
        thread::sleep(Duration::from_millis(1));
    }
    wait_until_idle(&coordinator);

    let stats = coordinator.stats();
    let bridge = coordinator.bridge_stats();
    assert!(stats.dropped_busy > 0);
    // 每个被接受的提交恰好对应一次模型调用: 忙碌期间的帧没有排队
    assert_eq!(stats.submitted as usize, detector_stats.calls());
    assert_eq!(stats.submitted, bridge.completed + bridge.failed);
}

#[test]
fn result_is_drained_but_not_resolved_while_not_tracking() {
    let mut coordinator =
        FrameLoopCoordinator::new(SimDetector::builder().build(), &SessionConfig::default())
            .unwrap();
    let mut scene = AnchorNode::new();

    coordinator
        .on_frame(&with_image(SyntheticImage::uniform(20, 20, 90, 128, 128)), &mut scene)
        .unwrap();
    assert!(scene.is_tracking());
    wait_until_idle(&coordinator);

    let paused = SimTrackingFrame::builder()
        .tracking(TrackingState::Paused)
        .world(floor_hit())
        .build();
    let outcome = coordinator.on_frame(&paused, &mut scene).unwrap();
    assert!(outcome.drained.is_some());
    assert!(outcome.anchor.is_none());
    assert!(paused.hit_queries().is_empty());
    assert!(!scene.is_tracking());

    // 结果只读一次
    let next = coordinator.on_frame(&without_image((20, 20)), &mut scene).unwrap();
    assert!(next.drained.is_none());
    assert!(scene.is_tracking());
}

#[test]
fn acquire_failure_still_drains_latched_result() {
    let mut coordinator =
        FrameLoopCoordinator::new(SimDetector::builder().build(), &SessionConfig::default())
            .unwrap();
    let mut scene = AnchorNode::new();

    coordinator
        .on_frame(&with_image(SyntheticImage::uniform(8, 8, 90, 128, 128)), &mut scene)
        .unwrap();
    wait_until_idle(&coordinator);

    let frame = SimTrackingFrame::builder()
        .acquire_error("camera session closed")
        .world(floor_hit())
        .build();
    let outcome = coordinator.on_frame(&frame, &mut scene).unwrap();
    assert_eq!(outcome.submit, SubmitStatus::AcquireFailed);
    assert!(outcome.drained.is_some());
    assert!(outcome.anchor.is_some());
    assert!(scene.is_anchored());
    assert_eq!(coordinator.stats().acquire_failures, 1);
    assert_eq!(coordinator.stats().images_acquired, 1);
}

#[test]
fn disabled_placement_skips_hit_test() {
    let config = SessionConfig {
        placement_mode: PlacementMode::Disabled,
        ..Default::default()
    };
    let mut coordinator = FrameLoopCoordinator::new(SimDetector::builder().build(), &config).unwrap();
    let mut scene = AnchorNode::new();

    coordinator
        .on_frame(&with_image(SyntheticImage::uniform(20, 20, 90, 128, 128)), &mut scene)
        .unwrap();
    let (outcome, frame) = tick_until_drained(&mut coordinator, &mut scene, (20, 20));
    assert!(outcome.anchor.is_none());
    assert!(frame.hit_queries().is_empty());
}

#[test]
fn rotated_landmark_is_projected_back_to_camera_pixels() {
    // 竖直推理图像 60x100 上的 (30, 25)
    let detector = SimDetector::builder()
        .landmark(LandmarkType::Nose, 0.5, 0.25)
        .build();
    let mut coordinator = FrameLoopCoordinator::new(detector, &SessionConfig::default()).unwrap();
    let mut scene = AnchorNode::new();
    // 设备转为竖屏
    coordinator.set_rotation_degrees(90);

    coordinator
        .on_frame(&with_image(SyntheticImage::gradient(100, 60)), &mut scene)
        .unwrap();
    let (outcome, frame) = tick_until_drained(&mut coordinator, &mut scene, (100, 60));
    assert!(outcome.anchor.is_some());

    let queries = frame.hit_queries();
    assert_eq!(queries.len(), 1);
    let expected = Point2::new(25.0, 30.0);
    assert_relative_eq!(queries[0].x(), expected.x(), epsilon = 1e-3);
    assert_relative_eq!(queries[0].y(), expected.y(), epsilon = 1e-3);
}

#[test]
fn landmark_selection_picks_the_hit_test_point() {
    let detector = SimDetector::builder()
        .landmark(LandmarkType::Nose, 0.5, 0.5)
        .landmark(LandmarkType::LeftWrist, 0.1, 0.2)
        .build();
    let mut coordinator = FrameLoopCoordinator::new(detector, &SessionConfig::default()).unwrap();
    let mut scene = AnchorNode::new();
    coordinator.set_landmark_selection(LandmarkSelection::Type(LandmarkType::LeftWrist));

    coordinator
        .on_frame(&with_image(SyntheticImage::uniform(100, 50, 90, 128, 128)), &mut scene)
        .unwrap();
    let (outcome, frame) = tick_until_drained(&mut coordinator, &mut scene, (100, 50));
    assert!(outcome.anchor.is_some());

    let queries = frame.hit_queries();
    assert_eq!(queries.len(), 1);
    assert_relative_eq!(queries[0].x(), 10.0, epsilon = 1e-3);
    assert_relative_eq!(queries[0].y(), 10.0, epsilon = 1e-3);
}

#[test]
fn changing_placement_mode_detaches_anchor() {
    let mut coordinator =
        FrameLoopCoordinator::new(SimDetector::builder().build(), &SessionConfig::default())
            .unwrap();
    let mut scene = AnchorNode::new();

    coordinator
        .on_frame(&with_image(SyntheticImage::uniform(20, 20, 90, 128, 128)), &mut scene)
        .unwrap();
    tick_until_drained(&mut coordinator, &mut scene, (20, 20));
    assert!(scene.is_anchored());

    coordinator.set_placement_mode(PlacementMode::Depth, &mut scene);
    assert!(!scene.is_anchored());
    assert_eq!(coordinator.placement_mode(), PlacementMode::Depth);
}

#[test]
fn shutdown_does_not_hang_on_stuck_detector() {
    let (detector, gate) = SimDetector::builder().gated();
    let mut coordinator = FrameLoopCoordinator::new(detector, &SessionConfig::default()).unwrap();
    let mut scene = AnchorNode::new();
    coordinator
        .on_frame(&with_image(SyntheticImage::uniform(8, 8, 90, 128, 128)), &mut scene)
        .unwrap();

    let start = Instant::now();
    assert!(!coordinator.shutdown(Duration::from_millis(50)));
    assert!(start.elapsed() < Duration::from_secs(2));
    // 放行后线程自行退出
    drop(gate);
}
