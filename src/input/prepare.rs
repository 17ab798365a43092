// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 推理前图像准备模块
/// Image preparation: YUV_420_888 → RGB → upright rotation → optional downscale
use fast_image_resize as fr;
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

use super::camera::{CameraImage, ImageFormat, PlaneRef};
use crate::error::ConversionError;
use crate::types::Point2;
use crate::utils::affine_transform::AffineMatrix;

/// 顺时针旋转角度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// 从设备方向角度解析, 接受负数和超过360的倍数
    pub fn from_degrees(degrees: i32) -> Result<Self, ConversionError> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(ConversionError::UnsupportedRotation(degrees)),
        }
    }

    /// 旋转后宽高是否互换
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// 推理用图像: 竖直方向的单平面RGB, 与相机图像生命周期无关
#[derive(Debug, Clone)]
pub struct PreparedImage {
    image: RgbImage,
    rotation: Rotation,
    source_size: (u32, u32),
    // 推理图像坐标 → 相机图像像素坐标
    to_source: AffineMatrix,
}

impl PreparedImage {
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// 相机图像尺寸 (旋转前)
    pub fn source_size(&self) -> (u32, u32) {
        self.source_size
    }

    /// 推理图像中的点 → 相机图像像素坐标 (IMAGE_PIXELS)
    pub fn to_source_pixels(&self, p: Point2) -> Point2 {
        self.to_source.apply(p)
    }
}

/// 相机图像 → 推理图像, 不做缩放
///
/// 只读取输入图像, 不负责归还。
pub fn prepare<I: CameraImage + ?Sized>(
    frame: &I,
    rotation_degrees: i32,
) -> Result<PreparedImage, ConversionError> {
    ImagePreparer::new(None).prepare(frame, rotation_degrees)
}

/// 带缩放器缓存的图像准备器
pub struct ImagePreparer {
    max_side: Option<u32>,
    resizer: fr::Resizer,
}

impl ImagePreparer {
    /// `max_side`: 推理图像最长边上限, None 表示保持原尺寸
    pub fn new(max_side: Option<u32>) -> Self {
        Self {
            max_side: max_side.filter(|&s| s > 0),
            resizer: fr::Resizer::new(),
        }
    }

    pub fn prepare<I: CameraImage + ?Sized>(
        &mut self,
        frame: &I,
        rotation_degrees: i32,
    ) -> Result<PreparedImage, ConversionError> {
        let rotation = Rotation::from_degrees(rotation_degrees)?;
        if frame.format() != ImageFormat::Yuv420_888 {
            return Err(ConversionError::UnsupportedFormat(frame.format()));
        }

        let (w, h) = (frame.width(), frame.height());
        let planes = frame.planes();
        let rgb = yuv420_to_rgb(&planes, w, h)?;

        // 1. 旋转到竖直方向 (模型在竖直图像上效果最好)
        let upright = match rotation {
            Rotation::Deg0 => rgb,
            Rotation::Deg90 => imageops::rotate90(&rgb),
            Rotation::Deg180 => imageops::rotate180(&rgb),
            Rotation::Deg270 => imageops::rotate270(&rgb),
        };
        let rotate = AffineMatrix::quarter_turn(rotation, w as f32, h as f32);

        // 2. 可选缩放: 最长边不超过 max_side
        let (uw, uh) = upright.dimensions();
        let (image, forward) = match self.target_size(uw, uh) {
            Some((tw, th)) => {
                let resized = self.resize(upright, tw, th)?;
                let scale = AffineMatrix::scale(tw as f32 / uw as f32, th as f32 / uh as f32);
                (resized, scale.compose(&rotate))
            }
            None => (upright, rotate),
        };

        Ok(PreparedImage {
            image,
            rotation,
            source_size: (w, h),
            to_source: forward.inverse().unwrap_or_default(),
        })
    }

    fn target_size(&self, w: u32, h: u32) -> Option<(u32, u32)> {
        let max_side = self.max_side?;
        let longest = w.max(h);
        if longest <= max_side {
            return None;
        }
        let s = max_side as f32 / longest as f32;
        let tw = ((w as f32 * s).round() as u32).max(1);
        let th = ((h as f32 * s).round() as u32).max(1);
        Some((tw, th))
    }

    fn resize(&mut self, src: RgbImage, tw: u32, th: u32) -> Result<RgbImage, ConversionError> {
        let (w, h) = src.dimensions();
        let src_image = fr::images::Image::from_vec_u8(w, h, src.into_raw(), fr::PixelType::U8x3)
            .map_err(|e| ConversionError::Resize(e.to_string()))?;
        let mut dst_image = fr::images::Image::new(tw, th, fr::PixelType::U8x3);

        self.resizer
            .resize(
                &src_image,
                &mut dst_image,
                &fr::ResizeOptions::new()
                    .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
            )
            .map_err(|e| ConversionError::Resize(e.to_string()))?;

        RgbImage::from_raw(tw, th, dst_image.into_vec())
            .ok_or_else(|| ConversionError::Resize("destination buffer size mismatch".into()))
    }
}

/// 检查单个平面的布局
///
/// 步长来自外部缓冲描述, 一律用 checked 运算, 溢出视为布局非法。
fn check_plane(
    index: usize,
    plane: &PlaneRef<'_>,
    cols: usize,
    rows: usize,
) -> Result<(), ConversionError> {
    if plane.pixel_stride == 0 || plane.pixel_stride > 2 || (index == 0 && plane.pixel_stride != 1)
    {
        return Err(ConversionError::PixelStride {
            plane: index,
            pixel_stride: plane.pixel_stride,
        });
    }

    let row_bytes = (cols - 1) * plane.pixel_stride + 1;
    if plane.row_stride < row_bytes {
        return Err(ConversionError::RowStride {
            plane: index,
            row_stride: plane.row_stride,
            needed: row_bytes,
        });
    }

    // 最后一行不要求补齐到 row_stride
    let needed = plane
        .row_stride
        .checked_mul(rows - 1)
        .and_then(|n| n.checked_add(row_bytes))
        .unwrap_or(usize::MAX);
    if plane.data.len() < needed {
        return Err(ConversionError::BufferTooShort {
            plane: index,
            len: plane.data.len(),
            needed,
        });
    }
    Ok(())
}

/// YUV_420_888 → 交错RGB (BT.601)
///
/// 兼容三平面 (I420, pixel_stride = 1) 和半平面 (NV21/NV12, pixel_stride = 2)。
pub fn yuv420_to_rgb(
    planes: &[PlaneRef<'_>],
    width: u32,
    height: u32,
) -> Result<RgbImage, ConversionError> {
    if planes.len() != 3 {
        return Err(ConversionError::PlaneCount(planes.len()));
    }
    if width == 0 || height == 0 {
        return Err(ConversionError::InvalidSize { width, height });
    }

    let (w, h) = (width as usize, height as usize);
    let (cw, ch) = ((w + 1) / 2, (h + 1) / 2);
    check_plane(0, &planes[0], w, h)?;
    check_plane(1, &planes[1], cw, ch)?;
    check_plane(2, &planes[2], cw, ch)?;

    let (y_plane, u_plane, v_plane) = (&planes[0], &planes[1], &planes[2]);
    let len = w
        .checked_mul(h)
        .and_then(|n| n.checked_mul(3))
        .ok_or(ConversionError::InvalidSize { width, height })?;
    let mut buffer = vec![0u8; len];
    let mut out_idx = 0;
    for y in 0..h {
        let y_row = y * y_plane.row_stride;
        let u_row = (y >> 1) * u_plane.row_stride;
        let v_row = (y >> 1) * v_plane.row_stride;

        for x in 0..w {
            let y_val = y_plane.data[y_row + x] as i32;
            let u_val = u_plane.data[u_row + (x >> 1) * u_plane.pixel_stride] as i32 - 128;
            let v_val = v_plane.data[v_row + (x >> 1) * v_plane.pixel_stride] as i32 - 128;

            buffer[out_idx] = (y_val + ((v_val * 179) >> 7)).clamp(0, 255) as u8;
            buffer[out_idx + 1] =
                (y_val - ((u_val * 44) >> 7) - ((v_val * 91) >> 7)).clamp(0, 255) as u8;
            buffer[out_idx + 2] = (y_val + ((u_val * 227) >> 7)).clamp(0, 255) as u8;
            out_idx += 3;
        }
    }

    RgbImage::from_raw(width, height, buffer).ok_or(ConversionError::InvalidSize { width, height })
}
