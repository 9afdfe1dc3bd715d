//! Device capability detection
//!
//! Classifies the host into a performance tier from the handful of signals a
//! browser exposes (user agent, core count, memory hint, pixel density).
//! Detection is pure: callers gather [`PlatformSignals`] however their platform
//! allows and pass them in.

use serde::{Deserialize, Serialize};

/// Core count assumed when the platform does not report one
pub const FALLBACK_CORES: u32 = 4;

/// Memory hint (GB) assumed when the platform does not report one
pub const FALLBACK_MEMORY_GB: f32 = 4.0;

/// User agent fragments that mark a mobile device
const MOBILE_MARKERS: [&str; 5] = ["android", "iphone", "ipad", "ipod", "mobile"];

/// Raw platform readings. Every field is optional since browsers expose them
/// inconsistently (`deviceMemory` is Chromium-only, for instance).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformSignals {
    pub user_agent: Option<String>,
    pub hardware_concurrency: Option<u32>,
    pub device_memory_gb: Option<f32>,
    pub device_pixel_ratio: Option<f32>,
}

/// Classified device capabilities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    pub is_mobile: bool,
    pub is_low_end: bool,
    /// Pixel ratio to render at (already capped for the tier)
    pub pixel_ratio: f32,
    pub cores: u32,
    pub memory_hint_gb: f32,
}

impl Default for Capabilities {
    fn default() -> Self {
        detect(&PlatformSignals::default())
    }
}

/// Classify the device. Never fails; missing signals fall back to 4 cores,
/// 4 GB and a pixel ratio of 1.
pub fn detect(signals: &PlatformSignals) -> Capabilities {
    let is_mobile = signals
        .user_agent
        .as_deref()
        .map(is_mobile_user_agent)
        .unwrap_or(false);

    let cores = signals
        .hardware_concurrency
        .filter(|&c| c > 0)
        .unwrap_or(FALLBACK_CORES);
    let memory_hint_gb = signals
        .device_memory_gb
        .filter(|m| m.is_finite() && *m > 0.0)
        .unwrap_or(FALLBACK_MEMORY_GB);
    let raw_pixel_ratio = signals
        .device_pixel_ratio
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(1.0);

    let is_low_end =
        cores < 4 || memory_hint_gb < 4.0 || (is_mobile && raw_pixel_ratio < 2.0);

    let cap = if is_low_end { 1.5 } else { 2.0 };

    Capabilities {
        is_mobile,
        is_low_end,
        pixel_ratio: raw_pixel_ratio.min(cap),
        cores,
        memory_hint_gb,
    }
}

fn is_mobile_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    MOBILE_MARKERS.iter().any(|marker| ua.contains(marker))
}

/// WebGL context power preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    LowPower,
    #[default]
    Default,
    HighPerformance,
}

/// Renderer settings derived directly from capabilities, used when no quality
/// preset has been chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RendererHints {
    pub antialias: bool,
    pub power_preference: PowerPreference,
    pub pixel_ratio: f32,
    pub shadow_map_enabled: bool,
    pub max_lights: u32,
}

impl RendererHints {
    pub fn for_capabilities(caps: &Capabilities) -> Self {
        if caps.is_low_end {
            Self {
                antialias: false,
                power_preference: PowerPreference::LowPower,
                pixel_ratio: 1.0,
                shadow_map_enabled: false,
                max_lights: 2,
            }
        } else if caps.is_mobile {
            Self {
                antialias: true,
                power_preference: PowerPreference::Default,
                pixel_ratio: 1.5,
                shadow_map_enabled: false,
                max_lights: 3,
            }
        } else {
            Self {
                antialias: true,
                power_preference: PowerPreference::HighPerformance,
                pixel_ratio: 2.0,
                shadow_map_enabled: true,
                max_lights: 4,
            }
        }
    }
}

/// Holographic effect strength derived directly from capabilities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HolographicHints {
    pub face_intensity: f32,
    pub body_intensity: f32,
    pub enable_glitch: bool,
}

impl HolographicHints {
    pub fn for_capabilities(caps: &Capabilities) -> Self {
        if caps.is_low_end {
            // Glitch displaces every vertex every frame; skip it entirely
            Self {
                face_intensity: 0.15,
                body_intensity: 0.6,
                enable_glitch: false,
            }
        } else if caps.is_mobile {
            Self {
                face_intensity: 0.2,
                body_intensity: 0.8,
                enable_glitch: true,
            }
        } else {
            Self {
                face_intensity: 0.2,
                body_intensity: 1.0,
                enable_glitch: true,
            }
        }
    }
}
