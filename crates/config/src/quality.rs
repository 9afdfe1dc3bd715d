//! Quality presets
//!
//! Five ordered tiers, each bundling renderer hints with the holographic
//! effect parameters that tier can afford.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

use crate::capabilities::{Capabilities, PowerPreference};
use crate::error::ConfigError;

/// Named quality tier, ordered from cheapest to most expensive
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum QualityLevel {
    UltraLow,
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

impl QualityLevel {
    /// All tiers in ascending order
    pub const ALL: [QualityLevel; 5] = [
        QualityLevel::UltraLow,
        QualityLevel::Low,
        QualityLevel::Medium,
        QualityLevel::High,
        QualityLevel::Ultra,
    ];

    /// Stable identifier, matching the serde form
    pub fn as_str(self) -> &'static str {
        match self {
            QualityLevel::UltraLow => "ultra-low",
            QualityLevel::Low => "low",
            QualityLevel::Medium => "medium",
            QualityLevel::High => "high",
            QualityLevel::Ultra => "ultra",
        }
    }

    /// Short description for quality pickers
    pub fn description(self) -> &'static str {
        match self {
            QualityLevel::UltraLow => "2GB RAM - Minimal (30 FPS, no glitch)",
            QualityLevel::Low => "4GB RAM - Basic (45 FPS, subtle glitch)",
            QualityLevel::Medium => "6GB RAM - Balanced (60 FPS, smooth)",
            QualityLevel::High => "8GB+ RAM - Quality (60 FPS, full effects)",
            QualityLevel::Ultra => "Desktop - Maximum (60 FPS, all features)",
        }
    }

    /// The preset bundle for this tier
    pub fn settings(self) -> QualitySettings {
        QualitySettings::preset(self)
    }

    /// Suggest a tier for the device. Never applied automatically; the stored
    /// preference (or `medium`) wins unless the user opts in.
    pub fn recommend(caps: &Capabilities) -> QualityLevel {
        let memory = caps.memory_hint_gb;
        let level = if memory <= 2.0 {
            QualityLevel::UltraLow
        } else if memory <= 4.0 || caps.cores < 4 {
            QualityLevel::Low
        } else if caps.is_mobile && memory <= 6.0 {
            QualityLevel::Medium
        } else if caps.is_mobile || memory <= 8.0 {
            QualityLevel::High
        } else {
            QualityLevel::Ultra
        };
        debug!(
            "Recommended quality {} (cores={}, memory={}GB, mobile={})",
            level, caps.cores, memory, caps.is_mobile
        );
        level
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownQualityLevel(s.to_string()))
    }
}

/// Holographic effect parameters bundled with a tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HolographicQuality {
    /// Effect strength at head height (0.0-1.0)
    pub face_intensity: f32,
    /// Effect strength at waist height (0.0-1.0)
    pub body_intensity: f32,
    /// Whether glitch code is compiled into the shader at all
    pub enable_glitch: bool,
    /// 0.0-1.0
    pub glitch_intensity: f32,
    /// Lower = smoother
    pub glitch_frequency: f32,
    /// Lower = less detail
    pub stripe_count: f32,
}

/// Full settings bundle for a quality tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
pub struct QualitySettings {
    pub pixel_ratio: f32,
    pub antialias: bool,
    pub shadow_map_enabled: bool,
    pub power_preference: PowerPreference,
    pub holographic: HolographicQuality,
    pub target_fps: u32,
    pub reduced_motion: bool,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self::preset(QualityLevel::default())
    }
}

impl QualitySettings {
    /// Preset table. Tiers are tuned by device RAM class.
    pub fn preset(level: QualityLevel) -> Self {
        match level {
            // 2GB RAM devices
            QualityLevel::UltraLow => Self {
                pixel_ratio: 0.75,
                antialias: false,
                shadow_map_enabled: false,
                power_preference: PowerPreference::LowPower,
                holographic: HolographicQuality {
                    face_intensity: 0.05,
                    body_intensity: 0.3,
                    enable_glitch: false,
                    glitch_intensity: 0.0,
                    glitch_frequency: 0.0,
                    stripe_count: 10.0,
                },
                target_fps: 30,
                reduced_motion: true,
            },
            // 4GB RAM low-end devices
            QualityLevel::Low => Self {
                pixel_ratio: 1.0,
                antialias: false,
                shadow_map_enabled: false,
                power_preference: PowerPreference::LowPower,
                holographic: HolographicQuality {
                    face_intensity: 0.1,
                    body_intensity: 0.5,
                    enable_glitch: true,
                    glitch_intensity: 0.15,
                    glitch_frequency: 0.5,
                    stripe_count: 15.0,
                },
                target_fps: 45,
                reduced_motion: false,
            },
            // 6GB RAM mid-range devices
            QualityLevel::Medium => Self {
                pixel_ratio: 1.5,
                antialias: true,
                shadow_map_enabled: false,
                power_preference: PowerPreference::Default,
                holographic: HolographicQuality {
                    face_intensity: 0.4,
                    body_intensity: 0.9,
                    enable_glitch: true,
                    glitch_intensity: 0.12,
                    glitch_frequency: 0.5,
                    stripe_count: 12.0,
                },
                target_fps: 60,
                reduced_motion: false,
            },
            // 8GB+ RAM high-end mobile
            QualityLevel::High => Self {
                pixel_ratio: 2.0,
                antialias: true,
                shadow_map_enabled: false,
                power_preference: PowerPreference::HighPerformance,
                holographic: HolographicQuality {
                    face_intensity: 0.2,
                    body_intensity: 0.9,
                    enable_glitch: true,
                    glitch_intensity: 0.35,
                    glitch_frequency: 1.5,
                    stripe_count: 20.0,
                },
                target_fps: 60,
                reduced_motion: false,
            },
            // Desktop / gaming phones
            QualityLevel::Ultra => Self {
                pixel_ratio: 2.0,
                antialias: true,
                shadow_map_enabled: true,
                power_preference: PowerPreference::HighPerformance,
                holographic: HolographicQuality {
                    face_intensity: 0.2,
                    body_intensity: 1.0,
                    enable_glitch: true,
                    glitch_intensity: 0.5,
                    glitch_frequency: 2.0,
                    stripe_count: 25.0,
                },
                target_fps: 60,
                reduced_motion: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{PlatformSignals, detect};

    fn caps(ua: &str, cores: u32, memory: f32) -> Capabilities {
        detect(&PlatformSignals {
            user_agent: Some(ua.to_string()),
            hardware_concurrency: Some(cores),
            device_memory_gb: Some(memory),
            device_pixel_ratio: Some(2.0),
        })
    }

    #[test]
    fn test_default_level_is_medium() {
        assert_eq!(QualityLevel::default(), QualityLevel::Medium);
        assert_eq!(QualitySettings::default(), QualityLevel::Medium.settings());
    }

    #[test]
    fn test_tiers_are_ordered() {
        let mut sorted = QualityLevel::ALL;
        sorted.sort();
        assert_eq!(sorted, QualityLevel::ALL);
        assert!(QualityLevel::UltraLow < QualityLevel::Ultra);
    }

    #[test]
    fn test_level_string_round_trip() {
        for level in QualityLevel::ALL {
            assert_eq!(level.as_str().parse::<QualityLevel>().unwrap(), level);
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", level.as_str()));
        }
        assert!("extreme".parse::<QualityLevel>().is_err());
    }

    #[test]
    fn test_ultra_low_disables_glitch() {
        let settings = QualityLevel::UltraLow.settings();
        assert!(!settings.holographic.enable_glitch);
        assert_eq!(settings.holographic.glitch_intensity, 0.0);
        assert!(settings.reduced_motion);
        assert_eq!(settings.target_fps, 30);
    }

    #[test]
    fn test_only_ultra_enables_shadows() {
        for level in QualityLevel::ALL {
            assert_eq!(
                level.settings().shadow_map_enabled,
                level == QualityLevel::Ultra
            );
        }
    }

    #[test]
    fn test_recommendation_by_memory_class() {
        let desktop = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
        let phone = "Mozilla/5.0 (Linux; Android 14) Mobile";
        assert_eq!(QualityLevel::recommend(&caps(desktop, 8, 2.0)), QualityLevel::UltraLow);
        assert_eq!(QualityLevel::recommend(&caps(desktop, 8, 4.0)), QualityLevel::Low);
        assert_eq!(QualityLevel::recommend(&caps(desktop, 2, 16.0)), QualityLevel::Low);
        assert_eq!(QualityLevel::recommend(&caps(phone, 8, 6.0)), QualityLevel::Medium);
        assert_eq!(QualityLevel::recommend(&caps(phone, 8, 12.0)), QualityLevel::High);
        assert_eq!(QualityLevel::recommend(&caps(desktop, 8, 8.0)), QualityLevel::High);
        assert_eq!(QualityLevel::recommend(&caps(desktop, 16, 32.0)), QualityLevel::Ultra);
    }
}
