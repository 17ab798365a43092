// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 模拟跟踪引擎帧
//!
//! 坐标变换由 [`DisplayGeometry`] 给出, 命中测试由 [`SimWorld`] 给出。

use parking_lot::Mutex;
use nalgebra::{Isometry3, Vector3};

use super::image::SyntheticImage;
use crate::anchor::{
    Anchor, AnchorId, Coordinates2d, HitResult, Pose, Trackable, TrackableId, TrackableKind,
    TrackingFrame, TrackingState,
};
use crate::error::AcquireError;
use crate::input::Rotation;
use crate::types::Point2;
use crate::utils::affine_transform::{AffineMatrix, DisplayGeometry};

/// 模拟场景几何
#[derive(Debug, Clone)]
pub enum SimWorld {
    /// 不论查询位置, 按顺序返回固定的命中列表
    Scripted(Vec<HitResult>),
    /// 相机位于原点朝 -Z 看, 地面为 y = height 的水平面
    Floor {
        height: f32,
        /// 视图像素焦距
        focal: f32,
    },
}

impl SimWorld {
    pub fn scripted(hits: Vec<(TrackableKind, Pose)>) -> Self {
        let hits = hits
            .into_iter()
            .enumerate()
            .map(|(i, (kind, pose))| HitResult {
                trackable: Trackable {
                    id: TrackableId(i as u64 + 1),
                    kind,
                },
                hit_pose: pose,
                distance: pose.translation.vector.norm(),
            })
            .collect();
        SimWorld::Scripted(hits)
    }

    pub fn floor(height: f32, focal: f32) -> Self {
        SimWorld::Floor { height, focal }
    }

    fn hit_test(&self, x: f32, y: f32, geometry: &DisplayGeometry) -> Vec<HitResult> {
        match self {
            SimWorld::Scripted(hits) => hits.clone(),
            SimWorld::Floor { height, focal } => {
                let cx = geometry.view_width as f32 * 0.5;
                let cy = geometry.view_height as f32 * 0.5;
                let ray = Vector3::new((x - cx) / focal, -(y - cy) / focal, -1.0);
                // 射线与地面平行或朝上
                if ray.y.abs() < f32::EPSILON || *height / ray.y <= 0.0 {
                    return Vec::new();
                }
                let point = ray * (*height / ray.y);
                vec![HitResult {
                    trackable: Trackable {
                        id: TrackableId(1),
                        kind: TrackableKind::HorizontalPlane,
                    },
                    hit_pose: Isometry3::translation(point.x, point.y, point.z),
                    distance: point.norm(),
                }]
            }
        }
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        SimWorld::floor(-1.5, 500.0)
    }
}

/// 一帧模拟跟踪数据
pub struct SimTrackingFrame {
    image: Mutex<Option<SyntheticImage>>,
    acquire_error: Option<String>,
    tracking: TrackingState,
    geometry: DisplayGeometry,
    world: SimWorld,
    fail_anchor_creation: bool,
    hit_queries: Mutex<Vec<Point2>>,
}

impl SimTrackingFrame {
    pub fn builder() -> SimFrameBuilder {
        SimFrameBuilder::default()
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    /// 已执行的命中测试查询 (视图坐标)
    pub fn hit_queries(&self) -> Vec<Point2> {
        self.hit_queries.lock().clone()
    }

    fn to_image_pixels(&self, from: Coordinates2d) -> Option<AffineMatrix> {
        let g = &self.geometry;
        match from {
            Coordinates2d::ImagePixels => Some(AffineMatrix::identity()),
            Coordinates2d::ImageNormalized => g.image_normalizer().inverse(),
            Coordinates2d::View => g.view_to_image(),
            Coordinates2d::ViewNormalized => {
                let denorm = g.view_normalizer().inverse()?;
                Some(g.view_to_image()?.compose(&denorm))
            }
        }
    }

    fn from_image_pixels(&self, to: Coordinates2d) -> AffineMatrix {
        let g = &self.geometry;
        match to {
            Coordinates2d::ImagePixels => AffineMatrix::identity(),
            Coordinates2d::ImageNormalized => g.image_normalizer(),
            Coordinates2d::View => g.image_to_view(),
            Coordinates2d::ViewNormalized => g.view_normalizer().compose(&g.image_to_view()),
        }
    }
}

impl TrackingFrame for SimTrackingFrame {
    type Image = SyntheticImage;

    fn acquire_camera_image(&self) -> Result<SyntheticImage, AcquireError> {
        if let Some(msg) = &self.acquire_error {
            return Err(AcquireError::Other(anyhow::anyhow!("{}", msg)));
        }
        self.image.lock().take().ok_or(AcquireError::NotYetAvailable)
    }

    fn tracking_state(&self) -> TrackingState {
        self.tracking
    }

    fn transform_coordinates_2d(
        &self,
        from: Coordinates2d,
        to: Coordinates2d,
        points: &[Point2],
    ) -> Vec<Point2> {
        match self.to_image_pixels(from) {
            Some(m) => {
                let m = self.from_image_pixels(to).compose(&m);
                points.iter().map(|p| m.apply(*p)).collect()
            }
            None => vec![Point2::new(f32::NAN, f32::NAN); points.len()],
        }
    }

    fn hit_test(&self, x: f32, y: f32) -> Vec<HitResult> {
        self.hit_queries.lock().push(Point2::new(x, y));
        self.world.hit_test(x, y, &self.geometry)
    }

    fn create_anchor(&self, trackable: &Trackable, pose: &Pose) -> anyhow::Result<Anchor> {
        if self.fail_anchor_creation {
            anyhow::bail!("anchor creation rejected on {:?}", trackable.kind);
        }
        Ok(Anchor {
            id: AnchorId::next(),
            pose: *pose,
            trackable: *trackable,
        })
    }
}

#[derive(Default)]
pub struct SimFrameBuilder {
    image: Option<SyntheticImage>,
    acquire_error: Option<String>,
    tracking: Option<TrackingState>,
    geometry: Option<DisplayGeometry>,
    world: Option<SimWorld>,
    fail_anchor_creation: bool,
}

impl SimFrameBuilder {
    pub fn image(mut self, image: SyntheticImage) -> Self {
        self.image = Some(image);
        self
    }

    /// 获取图像时返回非 NotYetAvailable 的错误
    pub fn acquire_error(mut self, msg: impl Into<String>) -> Self {
        self.acquire_error = Some(msg.into());
        self
    }

    pub fn tracking(mut self, state: TrackingState) -> Self {
        self.tracking = Some(state);
        self
    }

    pub fn geometry(mut self, geometry: DisplayGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn world(mut self, world: SimWorld) -> Self {
        self.world = Some(world);
        self
    }

    pub fn fail_anchor_creation(mut self, fail: bool) -> Self {
        self.fail_anchor_creation = fail;
        self
    }

    pub fn build(self) -> SimTrackingFrame {
        use crate::input::CameraImage;

        // 默认视图与图像同尺寸, 不旋转 (图像坐标 = 视图坐标)
        let size = self
            .image
            .as_ref()
            .map(|img| (img.width(), img.height()))
            .unwrap_or((640, 480));
        SimTrackingFrame {
            image: Mutex::new(self.image),
            acquire_error: self.acquire_error,
            tracking: self.tracking.unwrap_or(TrackingState::Tracking),
            geometry: self
                .geometry
                .unwrap_or_else(|| DisplayGeometry::new(size, size, Rotation::Deg0)),
            world: self.world.unwrap_or_default(),
            fail_anchor_creation: self.fail_anchor_creation,
            hit_queries: Mutex::new(Vec::new()),
        }
    }
}
