// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 放置策略 (Placement mode)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::tracking::TrackableKind;

/// 命中测试允许匹配的几何类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMode {
    /// 不放置, 跳过命中测试
    Disabled,
    PlaneHorizontal,
    PlaneVertical,
    PlaneHorizontalAndVertical,
    /// 即时放置点
    Instant,
    /// 深度表面
    Depth,
    /// 任意可用几何, 按引擎顺序取第一个
    #[default]
    BestAvailable,
}

impl PlacementMode {
    pub const ALL: [PlacementMode; 7] = [
        PlacementMode::Disabled,
        PlacementMode::PlaneHorizontal,
        PlacementMode::PlaneVertical,
        PlacementMode::PlaneHorizontalAndVertical,
        PlacementMode::Instant,
        PlacementMode::Depth,
        PlacementMode::BestAvailable,
    ];

    pub fn is_enabled(&self) -> bool {
        !matches!(self, PlacementMode::Disabled)
    }

    /// 该策略下命中测试能否落在此类几何上
    pub fn allows(&self, kind: TrackableKind) -> bool {
        use TrackableKind::*;
        match self {
            PlacementMode::Disabled => false,
            PlacementMode::PlaneHorizontal => kind == HorizontalPlane,
            PlacementMode::PlaneVertical => kind == VerticalPlane,
            PlacementMode::PlaneHorizontalAndVertical => {
                matches!(kind, HorizontalPlane | VerticalPlane)
            }
            PlacementMode::Instant => kind == InstantPlacementPoint,
            PlacementMode::Depth => kind == DepthPoint,
            PlacementMode::BestAvailable => true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlacementMode::Disabled => "disabled",
            PlacementMode::PlaneHorizontal => "plane_horizontal",
            PlacementMode::PlaneVertical => "plane_vertical",
            PlacementMode::PlaneHorizontalAndVertical => "plane",
            PlacementMode::Instant => "instant",
            PlacementMode::Depth => "depth",
            PlacementMode::BestAvailable => "best",
        }
    }
}

impl fmt::Display for PlacementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlacementMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(PlacementMode::Disabled),
            "plane_horizontal" | "horizontal" => Ok(PlacementMode::PlaneHorizontal),
            "plane_vertical" | "vertical" => Ok(PlacementMode::PlaneVertical),
            "plane" | "plane_horizontal_and_vertical" => {
                Ok(PlacementMode::PlaneHorizontalAndVertical)
            }
            "instant" => Ok(PlacementMode::Instant),
            "depth" => Ok(PlacementMode::Depth),
            "best" | "best_available" => Ok(PlacementMode::BestAvailable),
            other => anyhow::bail!("unknown placement mode: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_allows_nothing() {
        for kind in [
            TrackableKind::HorizontalPlane,
            TrackableKind::VerticalPlane,
            TrackableKind::Point,
            TrackableKind::DepthPoint,
            TrackableKind::InstantPlacementPoint,
        ] {
            assert!(!PlacementMode::Disabled.allows(kind));
            assert!(PlacementMode::BestAvailable.allows(kind));
        }
    }

    #[test]
    fn test_plane_modes() {
        let mode = PlacementMode::PlaneHorizontalAndVertical;
        assert!(mode.allows(TrackableKind::HorizontalPlane));
        assert!(mode.allows(TrackableKind::VerticalPlane));
        assert!(!mode.allows(TrackableKind::DepthPoint));
        assert!(!PlacementMode::PlaneHorizontal.allows(TrackableKind::VerticalPlane));
    }

    #[test]
    fn test_name_parse_roundtrip() {
        for mode in PlacementMode::ALL {
            assert_eq!(mode.name().parse::<PlacementMode>().unwrap(), mode);
        }
        assert!("sideways".parse::<PlacementMode>().is_err());
    }
}
