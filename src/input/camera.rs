// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 相机图像句柄 (Camera image handle)
//!
//! 跟踪引擎每帧给出的硬件图像缓冲, 来自有限大小的缓冲池。
//! 每个句柄必须且只能归还 (close) 一次, 否则缓冲池耗尽后再也拿不到新图像。

use std::ops::{Deref, DerefMut};

/// 相机图像像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Y + U + V 三平面, 色度 2x2 下采样, 平面内可能交错 (pixel_stride = 2)
    Yuv420_888,
    Other(i32),
}

/// 单个平面的只读视图
#[derive(Debug, Clone, Copy)]
pub struct PlaneRef<'a> {
    pub data: &'a [u8],
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl<'a> PlaneRef<'a> {
    pub fn new(data: &'a [u8], row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }
}

/// 跟踪引擎提供的相机图像
pub trait CameraImage {
    fn format(&self) -> ImageFormat;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// 按 Y, U, V 顺序返回平面
    fn planes(&self) -> Vec<PlaneRef<'_>>;

    fn timestamp_ns(&self) -> i64 {
        0
    }

    /// 归还缓冲到相机缓冲池
    fn close(&mut self);
}

/// 作用域内持有的相机图像
///
/// 离开作用域 (正常返回、提前返回、错误传播、panic 展开) 时自动归还,
/// 也可以调用 [`AcquiredImage::release`] 提前归还。两条路径合起来只会 close 一次。
pub struct AcquiredImage<I: CameraImage> {
    image: I,
    released: bool,
}

impl<I: CameraImage> AcquiredImage<I> {
    pub fn new(image: I) -> Self {
        Self {
            image,
            released: false,
        }
    }

    /// 立即归还图像
    pub fn release(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if !self.released {
            self.released = true;
            self.image.close();
        }
    }
}

impl<I: CameraImage> Deref for AcquiredImage<I> {
    type Target = I;

    fn deref(&self) -> &I {
        &self.image
    }
}

impl<I: CameraImage> DerefMut for AcquiredImage<I> {
    fn deref_mut(&mut self) -> &mut I {
        &mut self.image
    }
}

impl<I: CameraImage> Drop for AcquiredImage<I> {
    fn drop(&mut self) {
        self.close_once();
    }
}
