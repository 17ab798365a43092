// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 合成相机图像 (YUV_420_888)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::input::{CameraImage, ImageFormat, PlaneRef};

#[derive(Debug, Clone)]
struct Plane {
    data: Vec<u8>,
    row_stride: usize,
    pixel_stride: usize,
}

/// 内存中的 YUV_420_888 图像, 记录 close 次数
#[derive(Debug, Clone)]
pub struct SyntheticImage {
    width: u32,
    height: u32,
    format: ImageFormat,
    planes: Vec<Plane>,
    timestamp_ns: i64,
    closes: Arc<AtomicUsize>,
}

impl SyntheticImage {
    fn planar(width: u32, height: u32, pixel: impl Fn(usize, usize) -> (u8, u8, u8)) -> Self {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = ((w + 1) / 2, (h + 1) / 2);
        let mut y_plane = vec![0u8; w * h];
        let mut u_plane = vec![0u8; cw * ch];
        let mut v_plane = vec![0u8; cw * ch];
        for y in 0..h {
            for x in 0..w {
                let (yv, uv, vv) = pixel(x, y);
                y_plane[y * w + x] = yv;
                if x % 2 == 0 && y % 2 == 0 {
                    u_plane[(y / 2) * cw + x / 2] = uv;
                    v_plane[(y / 2) * cw + x / 2] = vv;
                }
            }
        }

        Self {
            width,
            height,
            format: ImageFormat::Yuv420_888,
            planes: vec![
                Plane {
                    data: y_plane,
                    row_stride: w,
                    pixel_stride: 1,
                },
                Plane {
                    data: u_plane,
                    row_stride: cw,
                    pixel_stride: 1,
                },
                Plane {
                    data: v_plane,
                    row_stride: cw,
                    pixel_stride: 1,
                },
            ],
            timestamp_ns: 0,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 纯色图像
    pub fn uniform(width: u32, height: u32, y: u8, u: u8, v: u8) -> Self {
        Self::planar(width, height, |_, _| (y, u, v))
    }

    /// 亮度与色度随坐标变化的图像, 每个像素位置可区分
    pub fn gradient(width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as usize, height.max(1) as usize);
        Self::planar(width, height, |x, y| {
            (
                ((x * 255 / w + y * 97) % 256) as u8,
                (x * 255 / w) as u8,
                (y * 255 / h) as u8,
            )
        })
    }

    /// 转为半平面布局 (NV21: V/U 交错, pixel_stride = 2)
    pub fn to_semi_planar(&self) -> Self {
        let cw = (self.width as usize + 1) / 2;
        let ch = (self.height as usize + 1) / 2;
        let (u, v) = (&self.planes[1], &self.planes[2]);

        let mut vu = Vec::with_capacity(cw * ch * 2);
        for row in 0..ch {
            for col in 0..cw {
                vu.push(v.data[row * v.row_stride + col * v.pixel_stride]);
                vu.push(u.data[row * u.row_stride + col * u.pixel_stride]);
            }
        }

        let mut out = self.clone();
        out.closes = Arc::new(AtomicUsize::new(0));
        out.planes[1] = Plane {
            data: vu[1..].to_vec(),
            row_stride: cw * 2,
            pixel_stride: 2,
        };
        out.planes[2] = Plane {
            data: vu,
            row_stride: cw * 2,
            pixel_stride: 2,
        };
        out
    }

    /// 共享 close 计数器 (多帧统计)
    pub fn with_close_counter(mut self, closes: Arc<AtomicUsize>) -> Self {
        self.closes = closes;
        self
    }

    pub fn with_timestamp(mut self, timestamp_ns: i64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    // ========== 构造异常布局 ==========

    pub fn truncate_plane(&mut self, plane: usize, len: usize) {
        if let Some(p) = self.planes.get_mut(plane) {
            p.data.truncate(len);
        }
    }

    pub fn drop_plane(&mut self, plane: usize) {
        if plane < self.planes.len() {
            self.planes.remove(plane);
        }
    }

    pub fn set_row_stride(&mut self, plane: usize, row_stride: usize) {
        if let Some(p) = self.planes.get_mut(plane) {
            p.row_stride = row_stride;
        }
    }

    pub fn set_format(&mut self, format: ImageFormat) {
        self.format = format;
    }
}

impl CameraImage for SyntheticImage {
    fn format(&self) -> ImageFormat {
        self.format
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn planes(&self) -> Vec<PlaneRef<'_>> {
        self.planes
            .iter()
            .map(|p| PlaneRef::new(&p.data, p.row_stride, p.pixel_stride))
            .collect()
    }

    fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
