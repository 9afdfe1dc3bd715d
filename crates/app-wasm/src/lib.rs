//! Holoavatar WASM build
//!
//! Browser glue around the holographic effect. The page owns the avatar and
//! the UI; this crate supplies capability detection, the persisted quality
//! tier, a `requestAnimationFrame` frame loop and the CustomEvent bridge.
//! An [`AvatarHost`] connects the bridge to an avatar's effect controls.

use holoavatar_config::{
    Capabilities, ConfigError, QualityLevel, QualitySettings, QualityStore, capabilities,
};
use holoavatar_hologram::{Clock, EffectSession};
use serde::Serialize;
use std::rc::Rc;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;

mod bridge;
pub mod host;
pub mod logging;
pub mod platform;

pub use bridge::{
    AVATAR_TO_UI_EVENT, BridgeListener, UI_TO_AVATAR_EVENT, listen, poll_ui_message, send_to_ui,
};
pub use host::AvatarHost;
pub use platform::{
    AnimationFrameScheduler, LocalStorageStore, PerformanceClock, platform_signals,
};

/// Main entry point for the WASM module
#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    logging::init_logging("info");
    info!("Holoavatar WASM ready");
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn quality_store() -> Result<QualityStore<LocalStorageStore>, JsValue> {
    let storage = LocalStorageStore::new().map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(QualityStore::new(storage))
}

fn detect() -> Capabilities {
    capabilities::detect(&platform_signals())
}

/// Device capabilities as JSON
#[wasm_bindgen(js_name = detectCapabilities)]
pub fn detect_capabilities() -> Result<String, JsValue> {
    to_json(&detect())
}

/// Persisted quality tier, `medium` when unset or storage is unavailable
#[wasm_bindgen(js_name = currentQuality)]
pub fn current_quality() -> String {
    match quality_store() {
        Ok(store) => store.current().as_str().to_string(),
        Err(e) => {
            warn!("Quality storage unavailable: {:?}", e);
            QualityLevel::default().as_str().to_string()
        }
    }
}

/// Suggested tier for this device; not persisted
#[wasm_bindgen(js_name = recommendedQuality)]
pub fn recommended_quality() -> String {
    QualityLevel::recommend(&detect()).as_str().to_string()
}

#[wasm_bindgen(js_name = saveQuality)]
pub fn save_quality(level: &str) -> Result<(), JsValue> {
    let level: QualityLevel = level
        .parse()
        .map_err(|e: ConfigError| JsValue::from_str(&e.to_string()))?;
    quality_store()?
        .save(level)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Preset for a tier as JSON
#[wasm_bindgen(js_name = qualitySettings)]
pub fn quality_settings(level: &str) -> Result<String, JsValue> {
    let level: QualityLevel = level
        .parse()
        .map_err(|e: ConfigError| JsValue::from_str(&e.to_string()))?;
    to_json(&QualitySettings::preset(level))
}

#[derive(Debug, Serialize)]
struct QualityOption {
    level: QualityLevel,
    description: &'static str,
}

fn quality_options() -> Vec<QualityOption> {
    QualityLevel::ALL
        .iter()
        .map(|&level| QualityOption {
            level,
            description: level.description(),
        })
        .collect()
}

/// All tiers with their descriptions, for a quality picker
#[wasm_bindgen(js_name = qualityLevels)]
pub fn quality_levels() -> Result<String, JsValue> {
    to_json(&quality_options())
}

/// Effect session animated by `requestAnimationFrame` and timed by
/// `performance.now()`, limited to the persisted tier's frame rate.
pub fn new_session() -> Result<EffectSession, JsValue> {
    let level = quality_store()
        .map(|store| store.current())
        .unwrap_or_default();
    session_for(level)
}

pub(crate) fn session_for(level: QualityLevel) -> Result<EffectSession, JsValue> {
    let scheduler = Rc::new(AnimationFrameScheduler::new()?);
    Ok(EffectSession::new(scheduler)
        .with_clock_source(|| -> Rc<dyn Clock> { Rc::new(PerformanceClock::new()) })
        .with_frame_rate_limit(Some(level.settings().target_fps)))
}
