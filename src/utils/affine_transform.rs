// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 2D 仿射变换
//!
//! 相机图像像素坐标 ↔ 旋转/缩放后的推理图像坐标 ↔ 屏幕视图坐标。
use nalgebra::{Matrix3, Point2 as NPoint2};

use crate::input::Rotation;
use crate::types::Point2;

/// 齐次坐标下的 2D 仿射变换, 最后一行恒为 `[0, 0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMatrix {
    m: Matrix3<f32>,
}

impl Default for AffineMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineMatrix {
    pub fn identity() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }

    /// 按行给出上面两行 `[[a, b, tx], [c, d, ty]]`
    pub fn from_rows(rows: [[f32; 3]; 2]) -> Self {
        let [[a, b, tx], [c, d, ty]] = rows;
        Self {
            m: Matrix3::new(a, b, tx, c, d, ty, 0.0, 0.0, 1.0),
        }
    }

    pub fn rows(&self) -> [[f32; 3]; 2] {
        let m = &self.m;
        [[m[(0, 0)], m[(0, 1)], m[(0, 2)]], [m[(1, 0)], m[(1, 1)], m[(1, 2)]]]
    }

    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        let p = self.m.transform_point(&NPoint2::new(x, y));
        (p.x, p.y)
    }

    pub fn apply(&self, p: Point2) -> Point2 {
        self.transform_point(p.x(), p.y()).into()
    }

    /// 退化矩阵 (某个方向被压成0) 没有逆
    pub fn inverse(&self) -> Option<Self> {
        let linear = self.m.fixed_view::<2, 2>(0, 0);
        if linear.determinant().abs() < 1e-10 {
            return None;
        }
        self.m.try_inverse().map(|m| Self { m })
    }

    pub fn translation(dx: f32, dy: f32) -> Self {
        Self::from_rows([[1.0, 0.0, dx], [0.0, 1.0, dy]])
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self::from_rows([[sx, 0.0, 0.0], [0.0, sy, 0.0]])
    }

    /// 图像整体顺时针旋转后的坐标映射 (连续像素坐标)
    ///
    /// `width`/`height` 为旋转前的图像尺寸, 结果把旋转前的坐标映射到旋转后的图像中。
    /// 与 `image::imageops::rotate90/180/270` 的像素搬移方向一致。
    pub fn quarter_turn(rotation: Rotation, width: f32, height: f32) -> Self {
        match rotation {
            Rotation::Deg0 => Self::identity(),
            // x' = H - y, y' = x
            Rotation::Deg90 => Self::from_rows([[0.0, -1.0, height], [1.0, 0.0, 0.0]]),
            // x' = W - x, y' = H - y
            Rotation::Deg180 => Self::from_rows([[-1.0, 0.0, width], [0.0, -1.0, height]]),
            // x' = y, y' = W - x
            Rotation::Deg270 => Self::from_rows([[0.0, 1.0, 0.0], [-1.0, 0.0, width]]),
        }
    }

    /// 组合 (self ∘ other): 先应用 other, 再应用 self
    pub fn compose(&self, other: &Self) -> Self {
        Self { m: self.m * other.m }
    }
}

/// 相机图像 → 屏幕视图 的显示几何
///
/// 相机图像按传感器方向输出, 显示时先旋转到屏幕方向,
/// 再等比缩放铺满视图 (居中裁剪)。跟踪引擎的 `transform_coordinates_2d`
/// 就是这个映射; 每帧的显示旋转/视图尺寸可能变化, 不要跨帧缓存。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    pub image_width: u32,
    pub image_height: u32,
    pub view_width: u32,
    pub view_height: u32,
    pub rotation: Rotation,
}

impl DisplayGeometry {
    pub fn new(
        image_size: (u32, u32),
        view_size: (u32, u32),
        rotation: Rotation,
    ) -> Self {
        Self {
            image_width: image_size.0,
            image_height: image_size.1,
            view_width: view_size.0,
            view_height: view_size.1,
            rotation,
        }
    }

    /// IMAGE_PIXELS → VIEW
    pub fn image_to_view(&self) -> AffineMatrix {
        let (iw, ih) = (self.image_width as f32, self.image_height as f32);
        let (vw, vh) = (self.view_width as f32, self.view_height as f32);
        let rotate = AffineMatrix::quarter_turn(self.rotation, iw, ih);
        let (rw, rh) = if self.rotation.swaps_axes() {
            (ih, iw)
        } else {
            (iw, ih)
        };
        if rw <= 0.0 || rh <= 0.0 {
            return rotate;
        }

        // 铺满视图, 多余部分两侧等量裁掉
        let s = (vw / rw).max(vh / rh);
        let crop = AffineMatrix::translation((vw - rw * s) * 0.5, (vh - rh * s) * 0.5);
        crop.compose(&AffineMatrix::scale(s, s)).compose(&rotate)
    }

    /// VIEW → IMAGE_PIXELS
    pub fn view_to_image(&self) -> Option<AffineMatrix> {
        self.image_to_view().inverse()
    }

    /// IMAGE_PIXELS → [0,1] 归一化
    pub fn image_normalizer(&self) -> AffineMatrix {
        AffineMatrix::scale(
            1.0 / (self.image_width.max(1) as f32),
            1.0 / (self.image_height.max(1) as f32),
        )
    }

    /// VIEW → [0,1] 归一化
    pub fn view_normalizer(&self) -> AffineMatrix {
        AffineMatrix::scale(
            1.0 / (self.view_width.max(1) as f32),
            1.0 / (self.view_height.max(1) as f32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(p: (f32, f32), expected: (f32, f32)) {
        assert!(
            (p.0 - expected.0).abs() < 1e-4 && (p.1 - expected.1).abs() < 1e-4,
            "{:?} != {:?}",
            p,
            expected
        );
    }

    #[test]
    fn test_scale_then_translate() {
        let m = AffineMatrix::translation(5.0, -1.0).compose(&AffineMatrix::scale(2.0, 3.0));
        assert_close(m.transform_point(1.0, 1.0), (7.0, 2.0));
        assert_eq!(AffineMatrix::default(), AffineMatrix::identity());
    }

    #[test]
    fn test_inverse() {
        let matrix = AffineMatrix::translation(5.0, 10.0).compose(&AffineMatrix::scale(2.0, 4.0));
        let inv = matrix.inverse().unwrap();
        let [[a, b, tx], [c, d, ty]] = matrix.compose(&inv).rows();
        for (got, want) in [(a, 1.0), (b, 0.0), (tx, 0.0), (c, 0.0), (d, 1.0), (ty, 0.0)] {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_singular_has_no_inverse() {
        assert!(AffineMatrix::scale(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn test_quarter_turn_corners() {
        // 4x2 图像: 顺时针90° 后左上角落到右上角
        let m = AffineMatrix::quarter_turn(Rotation::Deg90, 4.0, 2.0);
        assert_close(m.transform_point(0.0, 0.0), (2.0, 0.0));
        assert_close(m.transform_point(4.0, 2.0), (0.0, 4.0));

        let m = AffineMatrix::quarter_turn(Rotation::Deg180, 4.0, 2.0);
        assert_close(m.transform_point(0.0, 0.0), (4.0, 2.0));

        let m = AffineMatrix::quarter_turn(Rotation::Deg270, 4.0, 2.0);
        assert_close(m.transform_point(0.0, 0.0), (0.0, 4.0));
        assert_close(m.transform_point(4.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_quarter_turns_compose_to_identity() {
        let a = AffineMatrix::quarter_turn(Rotation::Deg90, 6.0, 3.0);
        let b = AffineMatrix::quarter_turn(Rotation::Deg270, 3.0, 6.0);
        assert_close(b.compose(&a).transform_point(1.5, 2.5), (1.5, 2.5));
    }

    #[test]
    fn test_display_same_aspect_is_scale() {
        let g = DisplayGeometry::new((640, 480), (1280, 960), Rotation::Deg0);
        assert_close(g.image_to_view().transform_point(320.0, 240.0), (640.0, 480.0));
        assert_close(g.image_to_view().transform_point(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_display_center_crop() {
        // 640x480 横屏图像 → 1080x1920 竖屏视图
        let g = DisplayGeometry::new((640, 480), (1080, 1920), Rotation::Deg90);
        let m = g.image_to_view();
        // 图像中心 → 视图中心
        assert_close(m.transform_point(320.0, 240.0), (540.0, 960.0));
        let back = g.view_to_image().unwrap();
        assert_close(back.transform_point(540.0, 960.0), (320.0, 240.0));
    }
}
