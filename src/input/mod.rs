// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 相机输入系统 (Camera Input System)
///
/// 帧线程上运行, 负责相机图像句柄与推理前预处理
/// - CameraImage:   跟踪引擎提供的多平面相机图像
/// - AcquiredImage: 作用域持有, 离开作用域必定归还
/// - Prepare:       YUV → RGB, 旋转到竖直方向, 可选缩放
pub mod camera;
pub mod prepare;

pub use camera::{AcquiredImage, CameraImage, ImageFormat, PlaneRef};
pub use prepare::{prepare, yuv420_to_rgb, ImagePreparer, PreparedImage, Rotation};
