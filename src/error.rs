// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 错误类型 (Error taxonomy)
//!
//! - 瞬时错误: 相机图像尚不可用 / 命中测试无结果 → 下一帧重试
//! - 转换错误: 平面布局异常 → 丢弃本帧
//! - 推理错误: 由推理线程吞掉, 不写入结果槽

use thiserror::Error;

/// 多平面图像 → 单平面RGB 转换失败
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("unsupported image format {0:?}, expected YUV_420_888")]
    UnsupportedFormat(crate::input::ImageFormat),
    #[error("expected 3 planes, got {0}")]
    PlaneCount(usize),
    #[error("invalid image size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("plane {plane}: row stride {row_stride} too small for {needed} bytes per row")]
    RowStride {
        plane: usize,
        row_stride: usize,
        needed: usize,
    },
    #[error("plane {plane}: pixel stride {pixel_stride} not supported")]
    PixelStride { plane: usize, pixel_stride: usize },
    #[error("plane {plane}: buffer holds {len} bytes, layout needs {needed}")]
    BufferTooShort {
        plane: usize,
        len: usize,
        needed: usize,
    },
    #[error("rotation {0} is not a multiple of 90 degrees")]
    UnsupportedRotation(i32),
    #[error("resize failed: {0}")]
    Resize(String),
}

/// 相机图像获取失败
#[derive(Debug, Error)]
pub enum AcquireError {
    /// 本帧相机图像还没准备好, 不是错误
    #[error("camera image not yet available")]
    NotYetAvailable,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 推理提交失败
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("an inference request is already pending")]
    Busy,
    #[error("inference worker has shut down")]
    Disconnected,
}

/// 帧循环顶层错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("anchor creation failed: {0}")]
    Anchor(#[source] anyhow::Error),
}
