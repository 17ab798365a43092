// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 会话配置 - 通过JSON文件调整参数

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::anchor::{LandmarkSelection, PlacementMode};
use crate::inference::DetectorMode;

/// 会话参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    // === 放置参数 ===
    pub placement_mode: PlacementMode,             // 命中测试允许的几何
    pub landmark_selection: LandmarkSelection,     // 用哪个关键点放置

    // === 推理参数 ===
    pub rotation_degrees: i32,           // 相机图像 → 竖直方向的顺时针角度
    pub detector_mode: DetectorMode,     // 固定为 Stream
    pub max_inference_side: Option<u32>, // 推理图像最长边, None 不缩放

    // === 监控 ===
    pub stats_interval_ms: u64, // 统计日志间隔
    pub stall_warn_ms: u64,     // 推理挂起超过此时长告警
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            placement_mode: PlacementMode::BestAvailable,
            landmark_selection: LandmarkSelection::Index(0),

            rotation_degrees: 0,
            detector_mode: DetectorMode::Stream,
            max_inference_side: None,

            stats_interval_ms: 1000,
            stall_warn_ms: 2000,
        }
    }
}

impl SessionConfig {
    /// 从JSON文件加载配置; 文件不存在时写入默认配置, 解析失败时用默认值
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️ config parse failed: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 no config at {}, writing defaults", path.display());
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("⚠️ {:#}", e);
                }
                config
            }
        }
    }

    /// 从JSON文件加载配置, 任何失败都返回错误
    pub fn load_strict(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing config {}", path.display()))
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("serializing config")?;
        fs::write(path, json).with_context(|| format!("writing config {}", path.display()))?;
        info!("💾 config saved to {}", path.display());
        Ok(())
    }

    /// 打印当前配置
    pub fn log_summary(&self) {
        info!(
            "🎛️ placement={} landmark={:?} rotation={}° mode={:?} max_side={:?}",
            self.placement_mode,
            self.landmark_selection,
            self.rotation_degrees,
            self.detector_mode,
            self.max_inference_side
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LandmarkType;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pose-anchor-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "placement_mode": "depth", "rotation_degrees": 90 }"#)
                .unwrap();
        assert_eq!(config.placement_mode, PlacementMode::Depth);
        assert_eq!(config.rotation_degrees, 90);
        assert_eq!(config.detector_mode, DetectorMode::Stream);
        assert_eq!(config.landmark_selection, LandmarkSelection::Index(0));
    }

    #[test]
    fn test_selection_by_type_parses() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "landmark_selection": { "type": "left_wrist" } }"#).unwrap();
        assert_eq!(
            config.landmark_selection,
            LandmarkSelection::Type(LandmarkType::LeftWrist)
        );
    }

    #[test]
    fn test_save_then_load_strict() {
        let path = temp_path("roundtrip");
        let config = SessionConfig {
            placement_mode: PlacementMode::PlaneHorizontal,
            max_inference_side: Some(256),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(SessionConfig::load_strict(&path).unwrap(), config);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);
        assert_eq!(SessionConfig::load(&path), SessionConfig::default());
        assert!(path.exists());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_bad_json_falls_back_but_strict_fails() {
        let path = temp_path("bad");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(SessionConfig::load(&path), SessionConfig::default());
        assert!(SessionConfig::load_strict(&path).is_err());
        let _ = fs::remove_file(&path);
    }
}
